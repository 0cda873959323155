//! # dqm_monitor_cli
//!
//! Part of the dqm_monitor crate family.
//!
//! This is the command line data quality monitor. It reads a YAML configuration (see the
//! `libdqm_monitor` docs for the format) and serves histograms from replies recorded on
//! disk under `replay_path`.
//!
//! ## Use
//!
//! ```bash
//! dqm_monitor_cli -p config.yml new        # write a template configuration
//! dqm_monitor_cli -p config.yml fixture    # record demo replies into replay_path
//! dqm_monitor_cli -p config.yml list
//! dqm_monitor_cli -p config.yml show demo/hitmap
//! dqm_monitor_cli -p config.yml clear demo
//! dqm_monitor_cli -p config.yml watch -c 10
//! ```
//!
//! Library diagnostics are written to `./dqm_monitor.log`.
mod display;
mod fixture;
mod replay;

use clap::{value_parser, Arg, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use libdqm_monitor::config::Config;
use libdqm_monitor::cycle_status::CycleStatus;
use libdqm_monitor::error::{ConfigError, TransportError, UpdaterError};
use libdqm_monitor::scheduler::UpdateScheduler;
use libdqm_monitor::source::PlotBinding;
use libdqm_monitor::transport::TransportClient;
use libdqm_monitor::updater::PlotAutoUpdater;

use display::{describe, LogDisplay};
use replay::ReplayRpc;

fn make_template_config(path: &Path) -> Result<(), ConfigError> {
    Config::default().write_config_file(path)
}

/// Send the library's spdlog output to a log file
fn init_file_logger() -> Result<(), spdlog::Error> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./dqm_monitor.log"))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()?,
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn list(config: &Config, rpc: ReplayRpc) -> Result<(), TransportError> {
    let client = TransportClient::new(rpc);
    let names = client.list_names(&config.run_numbers, &config.program)?;
    log::info!("{} has {} histograms:", config.program, names.len());
    for name in names {
        log::info!("  {name}");
    }
    Ok(())
}

fn show(config: &Config, rpc: ReplayRpc, name: &str) -> Result<(), TransportError> {
    let client = TransportClient::new(rpc);
    let histogram = client.retrieve_histogram(name, &config.run_numbers, &config.program)?;
    log::info!("{name}: {}", describe(&histogram));
    Ok(())
}

fn clear(config: &Config, rpc: ReplayRpc, selector: &str) -> Result<(), TransportError> {
    let client = TransportClient::new(rpc);
    client.clear_histograms(selector, &config.program)?;
    log::info!("Cleared '{selector}' in {}", config.program);
    Ok(())
}

/// Keep every configured plot updated until `cycles` update cycles have finished (0 runs
/// forever). With an update interval of zero a single cycle is run.
fn watch(
    config: &Config,
    rpc: ReplayRpc,
    cycles: u64,
    pb_manager: &MultiProgress,
) -> Result<(), UpdaterError> {
    let titles = config.plots.iter().map(|plot| plot.title.clone()).collect();
    let (tx, rx) = mpsc::channel::<CycleStatus>();
    let mut scheduler = UpdateScheduler::new(rpc, LogDisplay::new(titles)).with_status_sender(tx);
    scheduler.set_default_run_numbers(config.run_numbers.clone());
    scheduler.set_default_program(&config.program);
    for plot in config.plots.iter() {
        scheduler.add_plot(PlotBinding::new(), plot.source());
    }

    let updater = PlotAutoUpdater::spawn(scheduler)?;
    updater.start(config.interval())?;

    let pb = pb_manager.add(ProgressBar::new(config.plots.len() as u64));
    let mut finished: u64 = 0;
    while let Ok(status) = rx.recv() {
        pb.set_length(status.plots_total as u64);
        pb.set_position(status.plots_done as u64);
        if !status.is_finished() {
            continue;
        }
        finished += 1;
        if status.failures > 0 {
            log::warn!(
                "Cycle {} done, {} plots failed. Check the log file for details.",
                status.cycle,
                status.failures
            );
        } else {
            log::info!("Cycle {} done.", status.cycle);
        }
        if config.interval().is_zero() || (cycles != 0 && finished >= cycles) {
            break;
        }
        pb.reset();
    }
    pb.finish();
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("dqm_monitor_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("fixture").about("Record demo histogram replies into the replay path"),
        )
        .subcommand(Command::new("list").about("List the histograms the backend knows about"))
        .subcommand(
            Command::new("show")
                .about("Retrieve a single histogram and summarize it")
                .arg(Arg::new("name").required(true).help("Histogram name")),
        )
        .subcommand(
            Command::new("clear")
                .about("Clear histogram content in the backend")
                .arg(
                    Arg::new("selector")
                        .default_value("")
                        .help("Collection or collection/name to clear; empty clears everything"),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Keep the configured plots updated")
                .arg(
                    Arg::new("cycles")
                        .short('c')
                        .long("cycles")
                        .value_parser(value_parser!(u64))
                        .default_value("0")
                        .help("Stop after this many update cycles, 0 runs forever"),
                ),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .default_value("config.yml")
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }
    if let Err(e) = init_file_logger() {
        log::warn!("Could not create log file, library diagnostics will be lost: {e}");
    }
    spdlog::info!("Starting DQM monitor");

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from("config.yml"),
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("{e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Program: {}", config.program);
    log::info!("Runs: {:?}", config.run_numbers);
    log::info!("Replay Path: {}", config.replay_path.to_string_lossy());
    log::info!("Update Interval: {} ms", config.update_interval_ms);

    let rpc = ReplayRpc::new(&config.replay_path);

    if let Some(("fixture", _)) = matches.subcommand() {
        if let Err(e) = std::fs::create_dir_all(&config.replay_path) {
            log::error!("Could not create the replay path: {e}");
            return;
        }
        match fixture::write_demo_replies(&rpc) {
            Ok(names) => log::info!("Recorded {} demo histograms: {:?}", names.len(), names),
            Err(e) => log::error!("Could not record demo histograms: {e}"),
        }
        return;
    }

    if let Err(e) = config.get_replay_directory() {
        log::error!("{e}");
        return;
    }

    let result = match matches.subcommand() {
        Some(("list", _)) => list(&config, rpc).map_err(|e| e.to_string()),
        Some(("show", args)) => match args.get_one::<String>("name") {
            Some(name) => show(&config, rpc, name).map_err(|e| e.to_string()),
            None => Err(String::from("show requires a histogram name")),
        },
        Some(("clear", args)) => {
            let selector = args
                .get_one::<String>("selector")
                .map(|s| s.as_str())
                .unwrap_or_default();
            clear(&config, rpc, selector).map_err(|e| e.to_string())
        }
        Some(("watch", args)) => {
            if !config.has_plots() {
                log::warn!("No plots are configured, there is nothing to watch.");
            }
            let cycles = args.get_one::<u64>("cycles").copied().unwrap_or_default();
            watch(&config, rpc, cycles, &pb_manager).map_err(|e| e.to_string())
        }
        _ => Err(String::from("No command given, see --help")),
    };

    match result {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("{e}"),
    }
}

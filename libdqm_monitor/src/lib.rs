//! # dqm_monitor
//!
//! dqm_monitor is the histogram retrieval and live-update engine of a data quality monitor,
//! written in Rust. It asks a running analysis program for its histograms over a binary RPC
//! call, decodes the versioned wire format they are shipped in, and keeps a set of plots
//! refreshed on a timer without ever having two requests in flight at once.
//!
//! The RPC transport itself and the drawing of plots are not part of this library. They
//! are reached through the [`rpc::RpcClient`] and [`display::PlotDisplay`] traits.
//!
//! ## Installation
//!
//! In the future we may depoly to crates.io, but currently the only method of install is
//! from source. Clone the repository and use `cargo install --path ./dqm_monitor_cli` to
//! install the command line monitor.
//!
//! ## Use
//!
//! Plots are registered with an [`scheduler::UpdateScheduler`], which is then handed to a
//! [`updater::PlotAutoUpdater`] that runs it on a worker thread:
//!
//! ```ignore
//! let mut scheduler = UpdateScheduler::new(my_rpc, my_display);
//! scheduler.set_default_run_numbers(vec![0]);
//! let hitmap = scheduler.add_plot(PlotBinding::new(), Some("quad/hitmap_00000".into()));
//! let mut updater = PlotAutoUpdater::spawn(scheduler)?;
//! updater.start(Duration::from_secs(2))?;
//! // Later, point the plot at something else and show it right away
//! updater.change_source(hitmap, Some("quad/hitToT_00000".into()), true)?;
//! ```
//!
//! Dropping the updater stops the worker once the request in flight has been answered.
//!
//! ## Configuration
//!
//! The command line monitor is configured with a YAML file of the following format:
//!
//! ```yml
//! program: ana
//! run_numbers:
//! - 0
//! update_interval_ms: 2000
//! replay_path: ./replies
//! plots:
//! - title: Hit pattern
//!   series:
//!   - name: demo/hitmap
//! - title: Pad plane
//!   series:
//!   - name: demo/pad_plane
//!     runs: [0, 412]
//!     program: ana2
//! ```
//!
//! Run number 0 stands for the run currently being taken. A series without `runs` or
//! `program` uses the top level values.
//!
//! ## Wire Format
//!
//! Every reply starts with an 8 byte header: the full message length as a little endian
//! u32 followed by a four character message type (`hist` or `list`). A histogram payload
//! is laid out as follows, with every multi-byte field aligned to its own size relative to
//! the start of the payload:
//!
//! ```text
//! version(u8) type(u8) dims(u8) abscissa_size(u8 x dims) ordinate_size(u8)
//! bins(u32 x dims)
//! low_edge, high_edge (abscissa_size float each, per axis)
//! entries(u64)
//! content(ordinate_size x prod(bins + 2))
//! ```
//!
//! The content includes an underflow and an overflow bin on each axis.
pub mod config;
pub mod constants;
pub mod cycle_status;
pub mod display;
pub mod error;
pub mod histogram;
pub mod rpc;
pub mod scheduler;
pub mod source;
pub mod transport;
pub mod updater;
pub mod wire;

#[cfg(test)]
mod testing;

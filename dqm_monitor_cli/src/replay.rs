use std::path::{Path, PathBuf};

use libdqm_monitor::constants::*;
use libdqm_monitor::error::RpcError;
use libdqm_monitor::rpc::{RpcCall, RpcClient};
use libdqm_monitor::transport::wrap_envelope;

const REPLY_EXTENSION: &str = "dqm";

/// Answers the analyzer's DQM commands from replies recorded on disk.
///
/// Each histogram reply lives in its own file, named after the histogram with `/` swapped
/// for `%`. Like the real backend, a reply is cut short to the reply size hint of the call.
#[derive(Debug, Clone)]
pub struct ReplayRpc {
    directory: PathBuf,
}

impl ReplayRpc {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
        }
    }

    pub fn reply_path(&self, name: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{REPLY_EXTENSION}", name.replace('/', "%")))
    }

    /// Store a full reply (transport header included) for a histogram
    pub fn record(&self, name: &str, reply: &[u8]) -> Result<(), std::io::Error> {
        std::fs::write(self.reply_path(name), reply)
    }

    fn histogram_reply(&self, args: &str) -> Result<Vec<u8>, RpcError> {
        let args: serde_json::Value =
            serde_json::from_str(args).map_err(|e| RpcError::Backend(e.to_string()))?;
        let name = args["name"]
            .as_str()
            .ok_or_else(|| RpcError::Backend(String::from("histogram request without a name")))?;
        let path = self.reply_path(name);
        if !path.exists() {
            return Err(RpcError::Backend(format!("no histogram named {name}")));
        }
        Ok(std::fs::read(path)?)
    }

    fn list_reply(&self) -> Result<Vec<u8>, RpcError> {
        let mut names = vec![];
        for entry in std::fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(REPLY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.replace('%', "/"));
            }
        }
        names.sort();
        Ok(wrap_envelope(MESSAGE_TYPE_LIST, names.join("\n").as_bytes()))
    }
}

impl RpcClient for ReplayRpc {
    fn call(&self, call: &RpcCall) -> Result<Vec<u8>, RpcError> {
        if !self.directory.is_dir() {
            return Err(RpcError::Unreachable(call.program.clone()));
        }
        let mut reply = match call.command.as_str() {
            HISTOGRAM_COMMAND => self.histogram_reply(&call.args)?,
            LIST_COMMAND => self.list_reply()?,
            CLEAR_COMMAND => {
                // Recorded replies are never modified
                log::info!("Replay ignores clear request for '{}'", call.args);
                vec![]
            }
            other => return Err(RpcError::Backend(format!("unknown command {other}"))),
        };
        if let Some(limit) = call.reply_size_hint {
            reply.truncate(limit);
        }
        Ok(reply)
    }
}

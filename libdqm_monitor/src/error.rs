use std::path::PathBuf;
use thiserror::Error;

use super::constants::*;
use super::updater::Command;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Histogram has format version {0}; only version {exp} can be decoded", exp=HISTOGRAM_FORMAT_VERSION)]
    UnsupportedVersion(u8),
    #[error("Unknown histogram type tag {0}")]
    UnknownHistogramKind(u8),
    #[error("Histogram type {kind} has {expected} dimensions but the buffer declares {found}")]
    DimensionMismatch {
        kind: &'static str,
        expected: usize,
        found: u8,
    },
    #[error("Can't decode histogram because an abscissa of size {0} was requested")]
    UnknownAbscissaSize(u8),
    #[error("Don't know how to decode a histogram with ordinate size {0}")]
    UnknownOrdinateSize(u8),
    #[error("Histogram type {kind} stores {expected} byte bins but the buffer declares {found}")]
    OrdinateSizeMismatch {
        kind: &'static str,
        expected: usize,
        found: u8,
    },
    #[error("Histogram axes declare more bins than can be addressed")]
    TooManyBins,
    #[error("Histogram content has {found} bins; its axes require {expected}")]
    BadContentLength { expected: usize, found: usize },
    #[error("Failed to parse buffer into a histogram: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Backend program {0} could not be reached")]
    Unreachable(String),
    #[error("Backend rejected the call: {0}")]
    Backend(String),
    #[error("RPC call failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Empty response")]
    EmptyResponse,
    #[error("Reply of {0} bytes is too short to hold the transport header")]
    MalformedEnvelope(usize),
    #[error("Transport failed due to RPC error: {0}")]
    Rpc(#[from] RpcError),
    #[error("Transport failed due to histogram decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Transport received a histogram listing that is not valid UTF-8: {0}")]
    BadListing(#[from] std::string::FromUtf8Error),
    #[error("Transport failed to encode call arguments: {0}")]
    BadArguments(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("No plot is registered with id {0}")]
    UnknownPlot(usize),
}

#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("Updater failed to spawn its worker thread: {0}")]
    SpawnError(#[from] std::io::Error),
    #[error("Updater failed due to Send error, the worker is no longer running: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<Command>),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

// Wire format
/// The only histogram format version we know how to read
pub const HISTOGRAM_FORMAT_VERSION: u8 = 1;
/// Size of the transport header (declared length + message type)
pub const ENVELOPE_SIZE: usize = 8;
/// The 4 byte sequence "hist" read as a big endian u32
pub const MESSAGE_TYPE_HIST: u32 = 0x6869_7374;
/// The 4 byte sequence "list" read as a big endian u32
pub const MESSAGE_TYPE_LIST: u32 = 0x6C69_7374;

// Transport
/// Reply budget for a first histogram request (1 MiB)
pub const DEFAULT_HISTOGRAM_REPLY_SIZE: usize = 1_048_576;
/// Reply budget for a first listing request (2 MiB)
pub const DEFAULT_LIST_REPLY_SIZE: usize = 2_097_152;
pub const HISTOGRAM_COMMAND: &str = "dqm::histogram";
pub const LIST_COMMAND: &str = "dqm::list";
pub const CLEAR_COMMAND: &str = "dqm::clear";

// Scheduler defaults
/// The analyzer registers itself under this program name unless told otherwise
pub const DEFAULT_PROGRAM: &str = "ana";
/// Run number zero means "the current run"
pub const CURRENT_RUN: u32 = 0;

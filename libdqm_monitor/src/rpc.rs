use super::error::RpcError;

/// One binary RPC call addressed to a backend analysis program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCall {
    /// Name the backend program registered itself under
    pub program: String,
    pub command: String,
    pub args: String,
    /// Largest reply the backend is allowed to send; None lets the transport decide
    pub reply_size_hint: Option<usize>,
}

impl RpcCall {
    pub fn new(program: &str, command: &str, args: String, reply_size_hint: Option<usize>) -> Self {
        Self {
            program: program.to_string(),
            command: command.to_string(),
            args,
            reply_size_hint,
        }
    }
}

/// The generic request/reply primitive the histogram transport is built on.
///
/// Implementations must honour the reply size hint (a reply larger than the hint is cut
/// short, not rejected) and return the raw reply bytes. Timeouts are theirs to enforce.
pub trait RpcClient {
    fn call(&self, call: &RpcCall) -> Result<Vec<u8>, RpcError>;
}

impl<T: RpcClient + ?Sized> RpcClient for &T {
    fn call(&self, call: &RpcCall) -> Result<Vec<u8>, RpcError> {
        (**self).call(call)
    }
}

impl<T: RpcClient + ?Sized> RpcClient for Box<T> {
    fn call(&self, call: &RpcCall) -> Result<Vec<u8>, RpcError> {
        (**self).call(call)
    }
}

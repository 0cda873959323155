use byteorder::{BigEndian, ByteOrder, LittleEndian};
use human_bytes::human_bytes;
use serde::Serialize;

use super::constants::*;
use super::error::TransportError;
use super::histogram::HistogramSnapshot;
use super::rpc::{RpcCall, RpcClient};
use super::wire::decode_histogram;

/// The 8 byte transport header in front of every binary reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Length of the whole message (header included) as the backend wrote it
    pub declared_length: u32,
    /// Four characters, read as a big endian u32 so that byte order is preserved
    pub message_type: u32,
}

impl Envelope {
    /// Read the header of a reply
    pub fn parse(reply: &[u8]) -> Result<Self, TransportError> {
        if reply.is_empty() {
            return Err(TransportError::EmptyResponse);
        }
        if reply.len() < ENVELOPE_SIZE {
            return Err(TransportError::MalformedEnvelope(reply.len()));
        }
        Ok(Self {
            declared_length: LittleEndian::read_u32(&reply[0..4]),
            message_type: BigEndian::read_u32(&reply[4..8]),
        })
    }

    pub fn is_truncated(&self, received: usize) -> bool {
        (received as u64) < self.declared_length as u64
    }
}

/// Prefix a payload with a transport header declaring its full length
pub fn wrap_envelope(message_type: u32, payload: &[u8]) -> Vec<u8> {
    let mut message = vec![0u8; ENVELOPE_SIZE];
    LittleEndian::write_u32(&mut message[0..4], (ENVELOPE_SIZE + payload.len()) as u32);
    BigEndian::write_u32(&mut message[4..8], message_type);
    message.extend_from_slice(payload);
    message
}

fn message_type_str(message_type: u32) -> String {
    String::from_utf8_lossy(&message_type.to_be_bytes()).into_owned()
}

#[derive(Serialize)]
struct HistogramArgs<'a> {
    name: &'a str,
    runs: &'a [u32],
}

#[derive(Serialize)]
struct ListArgs<'a> {
    runs: &'a [u32],
}

/// Client side of the analyzer's DQM commands.
///
/// Every binary reply is checked against the length declared in its header. A reply that
/// the RPC layer cut short is requested exactly once more with a reply budget that fits the
/// declared length. If that is still short we warn and carry on with what we have rather
/// than retrying forever.
#[derive(Debug)]
pub struct TransportClient<C> {
    rpc: C,
}

impl<C: RpcClient> TransportClient<C> {
    pub fn new(rpc: C) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &C {
        &self.rpc
    }

    /// Retrieve and decode one histogram. `runs` of `[0]` means the current run.
    pub fn retrieve_histogram(
        &self,
        name: &str,
        runs: &[u32],
        program: &str,
    ) -> Result<HistogramSnapshot, TransportError> {
        let args = serde_json::to_string(&HistogramArgs { name, runs })?;
        let reply = self.fetch(
            program,
            HISTOGRAM_COMMAND,
            args,
            DEFAULT_HISTOGRAM_REPLY_SIZE,
            MESSAGE_TYPE_HIST,
        )?;
        Ok(decode_histogram(&reply[ENVELOPE_SIZE..])?)
    }

    /// List the names of every histogram the analyzer knows about
    pub fn list_names(&self, runs: &[u32], program: &str) -> Result<Vec<String>, TransportError> {
        let args = serde_json::to_string(&ListArgs { runs })?;
        let mut reply = self.fetch(
            program,
            LIST_COMMAND,
            args,
            DEFAULT_LIST_REPLY_SIZE,
            MESSAGE_TYPE_LIST,
        )?;
        let payload = reply.split_off(ENVELOPE_SIZE);
        // Splitting an empty string would give [""]
        if payload.is_empty() {
            return Ok(vec![]);
        }
        let text = String::from_utf8(payload)?;
        Ok(text.split('\n').map(String::from).collect())
    }

    /// Clear histogram content in the analyzer.
    ///
    /// `selector` is empty to clear everything, a collection name to clear that collection,
    /// or `collection/name` to clear a single histogram.
    pub fn clear_histograms(&self, selector: &str, program: &str) -> Result<(), TransportError> {
        let call = RpcCall::new(program, CLEAR_COMMAND, selector.to_string(), None);
        self.rpc.call(&call)?;
        spdlog::debug!("Cleared histograms matching '{}' in {}", selector, program);
        Ok(())
    }

    /// Issue a call, retrying once with a larger reply budget if the reply came back short.
    ///
    /// Returns the whole reply, header included.
    fn fetch(
        &self,
        program: &str,
        command: &str,
        args: String,
        reply_size: usize,
        expected_type: u32,
    ) -> Result<Vec<u8>, TransportError> {
        let call = RpcCall::new(program, command, args, Some(reply_size));
        let reply = self.rpc.call(&call)?;
        let envelope = Self::check_reply(&reply, command, expected_type)?;
        if !envelope.is_truncated(reply.len()) {
            return Ok(reply);
        }

        spdlog::warn!(
            "{} reply of size {} was truncated to {}. Trying again with an adequate reply budget.",
            command,
            human_bytes(envelope.declared_length as f64),
            human_bytes(reply.len() as f64)
        );
        let retry = RpcCall {
            reply_size_hint: Some(envelope.declared_length as usize),
            ..call
        };
        let reply = self.rpc.call(&retry)?;
        let envelope = Self::check_reply(&reply, command, expected_type)?;
        if envelope.is_truncated(reply.len()) {
            // No third attempt, we could end up looping forever
            spdlog::warn!(
                "{} reply of size {} was still truncated to {} after second attempt. Result may be incomplete.",
                command,
                human_bytes(envelope.declared_length as f64),
                human_bytes(reply.len() as f64)
            );
        }
        Ok(reply)
    }

    fn check_reply(
        reply: &[u8],
        command: &str,
        expected_type: u32,
    ) -> Result<Envelope, TransportError> {
        let envelope = Envelope::parse(reply)?;
        if envelope.message_type != expected_type {
            spdlog::warn!(
                "{} got unexpected message type '{}'",
                command,
                message_type_str(envelope.message_type)
            );
        }
        Ok(envelope)
    }
}

//! Fakes shared by the unit tests
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::constants::MESSAGE_TYPE_HIST;
use crate::display::PlotDisplay;
use crate::error::RpcError;
use crate::histogram::{Axis, BinContent, HistogramKind, HistogramSnapshot};
use crate::rpc::{RpcCall, RpcClient};
use crate::source::PlotId;
use crate::transport::wrap_envelope;
use crate::wire::encode_histogram;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Fetch(String),
    Display(PlotId, usize, u64),
    Clear(PlotId),
    Note(&'static str),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

/// A 1-D histogram whose entry counter identifies it
pub fn sample_histogram(entries: u64) -> HistogramSnapshot {
    HistogramSnapshot::new(
        HistogramKind::Histogram1DI,
        vec![Axis::new(8, 0.0, 8.0)],
        entries,
        BinContent::U32(vec![1; 10]),
    )
    .unwrap()
}

/// Replies with queued results, in order
pub struct ScriptedRpc {
    replies: Mutex<VecDeque<Result<Vec<u8>, RpcError>>>,
    calls: Mutex<Vec<RpcCall>>,
}

impl ScriptedRpc {
    pub fn new(replies: Vec<Result<Vec<u8>, RpcError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<RpcCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl RpcClient for ScriptedRpc {
    fn call(&self, call: &RpcCall) -> Result<Vec<u8>, RpcError> {
        self.calls.lock().unwrap().push(call.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RpcError::Backend(String::from("no more replies"))))
    }
}

/// Serves histograms by name, honouring the reply size hint like the real backend
#[derive(Clone)]
pub struct FakeBackend {
    replies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    calls: Arc<Mutex<Vec<RpcCall>>>,
    log: EventLog,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new(log: EventLog) -> Self {
        Self {
            replies: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(vec![])),
            log,
            delay: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every call take this long
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn insert(&self, name: &str, histogram: &HistogramSnapshot) {
        let reply = wrap_envelope(MESSAGE_TYPE_HIST, &encode_histogram(histogram).unwrap());
        self.replies.lock().unwrap().insert(name.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<RpcCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Most calls that were ever being served at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn serve(&self, call: &RpcCall) -> Result<Vec<u8>, RpcError> {
        let args: serde_json::Value =
            serde_json::from_str(&call.args).map_err(|e| RpcError::Backend(e.to_string()))?;
        let name = args["name"].as_str().unwrap_or_default().to_string();
        self.log.lock().unwrap().push(Event::Fetch(name.clone()));
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match self.replies.lock().unwrap().get(&name) {
            Some(reply) => {
                let limit = call.reply_size_hint.unwrap_or(reply.len()).min(reply.len());
                Ok(reply[..limit].to_vec())
            }
            None => Err(RpcError::Backend(format!("no histogram named {name}"))),
        }
    }
}

impl RpcClient for FakeBackend {
    fn call(&self, call: &RpcCall) -> Result<Vec<u8>, RpcError> {
        self.calls.lock().unwrap().push(call.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.serve(call);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub struct RecordingDisplay {
    log: EventLog,
}

impl RecordingDisplay {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl PlotDisplay for RecordingDisplay {
    fn display(&mut self, plot: PlotId, series: usize, histogram: &HistogramSnapshot) {
        self.log
            .lock()
            .unwrap()
            .push(Event::Display(plot, series, histogram.entries()));
    }

    fn clear(&mut self, plot: PlotId) {
        self.log.lock().unwrap().push(Event::Clear(plot));
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

//! Matches inbound responses to in-flight requests.
//!
//! Two tables, independently locked: pending synchronous requests keyed by
//! sequence number, and navigation-completion callbacks keyed the same way.
//! A sequence number lives in at most one of the two. No lock is held while
//! user code runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Mutex;
use std::time::Duration;

use patrolhound_proto::{wall_clock_timestamp, Message, MessageType};
use tracing::{debug, error, warn};

use crate::results::NavigationResult;

/// Callback invoked with the outcome of a navigation task submission.
pub type NavigationCallback = Box<dyn FnOnce(NavigationResult) + Send + 'static>;

/// Outcome of waiting on a synchronous response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Received,
    TimedOut,
}

/// One-shot handle a caller blocks on until its response is signaled.
///
/// Consuming `wait_for` makes a second completion unobservable no matter how
/// many duplicate frames arrive.
pub struct ResponseWaiter {
    rx: Receiver<()>,
}

impl ResponseWaiter {
    /// Block until the response is signaled or `timeout` elapses.
    pub fn wait_for(self, timeout: Duration) -> WaitOutcome {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => WaitOutcome::Received,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                WaitOutcome::TimedOut
            }
        }
    }
}

struct PendingRequest {
    expected: MessageType,
    signal: SyncSender<()>,
    response: Option<Message>,
}

/// The request/response correlation engine.
pub struct Correlator {
    next_seq: AtomicU16,
    pending: Mutex<HashMap<u16, PendingRequest>>,
    nav_callbacks: Mutex<HashMap<u16, NavigationCallback>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicU16::new(0),
            pending: Mutex::new(HashMap::new()),
            nav_callbacks: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate the next sequence number: increment first, then use, so the
    /// first value is 1. Wraps modulo 65536. A still-live collision after a
    /// full cycle is tolerated; the earlier holder's scoped cleanup keeps
    /// the tables consistent.
    fn next_sequence(&self) -> u16 {
        self.next_seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Begin a synchronous exchange: allocate a sequence number, insert the
    /// pending entry, and hand back the waiter. The caller must `cancel` the
    /// sequence number on every exit path.
    pub fn begin_sync(&self, expected: MessageType) -> (u16, ResponseWaiter) {
        let seq = self.next_sequence();
        let (tx, rx) = mpsc::sync_channel(1);
        let entry = PendingRequest {
            expected,
            signal: tx,
            response: None,
        };
        self.pending.lock().unwrap().insert(seq, entry);
        (seq, ResponseWaiter { rx })
    }

    /// Register a navigation completion callback. Returns the sequence
    /// number the outbound request must carry.
    pub fn begin_async(&self, callback: NavigationCallback) -> u16 {
        let seq = self.next_sequence();
        self.nav_callbacks.lock().unwrap().insert(seq, callback);
        seq
    }

    /// Remove and return the stored response, or `None` if it has not
    /// arrived or was already taken.
    pub fn take_response(&self, seq: u16) -> Option<Message> {
        let mut pending = self.pending.lock().unwrap();
        pending.get_mut(&seq).and_then(|entry| entry.response.take())
    }

    /// Remove and return the registered navigation callback, if any.
    pub fn take_nav_callback(&self, seq: u16) -> Option<NavigationCallback> {
        self.nav_callbacks.lock().unwrap().remove(&seq)
    }

    /// Drop the entry for `seq` from whichever table holds it.
    pub fn cancel(&self, seq: u16) {
        if self.pending.lock().unwrap().remove(&seq).is_some() {
            return;
        }
        self.nav_callbacks.lock().unwrap().remove(&seq);
    }

    /// Number of pending synchronous entries. Diagnostic only.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Route one inbound message. Called from the connection's reader
    /// thread.
    ///
    /// Navigation completions run their callback here, on the reader
    /// thread; callbacks must not block. A frame whose sequence number is
    /// unknown, or whose type does not match the pending entry, is dropped.
    pub fn deliver(&self, message: Message) {
        if message.message_type() == MessageType::NavTaskResp {
            let seq = message.seq;
            let callback = self.nav_callbacks.lock().unwrap().remove(&seq);
            match callback {
                Some(callback) => {
                    let result = NavigationResult::from_message(&message);
                    invoke_guarded(callback, result);
                }
                None => debug!(seq, "dropping unsolicited navigation completion"),
            }
            return;
        }

        let mut pending = self.pending.lock().unwrap();
        match pending.get_mut(&message.seq) {
            Some(entry) if entry.expected == message.message_type() => {
                entry.response = Some(message);
                // Duplicate signals collapse in the single-slot channel.
                let _ = entry.signal.try_send(());
            }
            Some(entry) => warn!(
                seq = message.seq,
                expected = ?entry.expected,
                got = ?message.message_type(),
                "response type mismatch; dropping frame"
            ),
            None => debug!(seq = message.seq, "dropping stale or unsolicited response"),
        }
    }

    /// Invoke every registered navigation callback with a terminal result
    /// and clear the table. Used on teardown; completions can no longer
    /// arrive.
    pub fn fail_nav_callbacks(&self, make_result: impl Fn() -> NavigationResult) {
        let callbacks: Vec<NavigationCallback> = {
            let mut table = self.nav_callbacks.lock().unwrap();
            table.drain().map(|(_, callback)| callback).collect()
        };
        for callback in callbacks {
            invoke_guarded(callback, make_result());
        }
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a user callback, containing any panic it raises. A misbehaving
/// callback must never take down the reader thread.
pub(crate) fn invoke_guarded(callback: NavigationCallback, result: NavigationResult) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || callback(result)));
    if let Err(panic) = outcome {
        error!(
            at = %wall_clock_timestamp(),
            "navigation callback panicked: {}",
            panic_message(&panic)
        );
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

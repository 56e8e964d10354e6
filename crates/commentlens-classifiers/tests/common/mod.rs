//! Mock chat clients for testing
//!
//! Provides configurable implementations of the ChatClient trait for
//! testing batching, retries, partial failures and cancellation.

#![allow(dead_code)]

use async_trait::async_trait;
use commentlens_classifiers::{ChatClient, ChatRequest};
use commentlens_core::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

/// Text marker that makes the whole call fail
pub const FAIL_MARKER: &str = "FAIL";

/// Text marker that makes the reply unparseable
pub const GARBLE_MARKER: &str = "GARBLED";

/// A mock classification service.
///
/// Labels each `index:text` line by keyword: "good" is positive, "bad" is
/// negative, anything else neutral. Replies use the compact `{i,s}` form.
pub struct MockChatClient {
    latency: Option<Duration>,
    fail_first: AtomicU32,
    calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            latency: None,
            fail_first: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Set simulated latency for every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the first `n` calls regardless of content
    pub fn with_failures(self, n: u32) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// User messages received, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn respond(&self, user: &str) -> Result<String> {
        let forced = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Err(Error::classifier("API error (503 Service Unavailable): overloaded"));
        }
        if user.contains(FAIL_MARKER) {
            return Err(Error::classifier("API error (500 Internal Server Error)"));
        }
        if user.contains(GARBLE_MARKER) {
            return Ok("Sorry, I cannot help with that.".to_string());
        }

        let items: Vec<String> = user
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(index, text)| {
                let label = if text.contains("good") {
                    "positive"
                } else if text.contains("bad") {
                    "negative"
                } else {
                    "neutral"
                };
                format!(r#"{{"i":{index},"s":"{label}"}}"#)
            })
            .collect();

        Ok(format!("```json\n[{}]\n```", items.join(",")))
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let user = request.user_content().unwrap_or_default().to_string();
        self.requests.lock().push(user.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.respond(&user)
    }
}

/// A client that echoes the user message back
pub struct EchoChatClient;

#[async_trait]
impl ChatClient for EchoChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        Ok(request.user_content().unwrap_or_default().to_string())
    }
}

/// A client that always fails - for testing error paths
pub struct FailingChatClient {
    calls: AtomicU32,
}

impl FailingChatClient {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for FailingChatClient {
    async fn complete(&self, _request: &ChatRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::classifier("Simulated service failure"))
    }
}

/// `n` document texts; the ones at `marked` positions get `marker` appended
pub fn texts(n: usize, marked: &[usize], marker: &str) -> Vec<String> {
    (0..n)
        .map(|i| {
            let base = match i % 3 {
                0 => format!("good video {i}"),
                1 => format!("bad audio {i}"),
                _ => format!("plain comment {i}"),
            };
            if marked.contains(&i) {
                format!("{base} {marker}")
            } else {
                base
            }
        })
        .collect()
}

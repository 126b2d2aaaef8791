//! In-memory [`HttpClient`] for tests.
//!
//! Replies are scripted per URL. Each URL holds a queue of replies; every
//! call pops the front until one reply is left, which then repeats. URLs
//! with no script answer 404. Every call is recorded with its start and
//! finish instants (tokio clock, so paused-time tests see virtual time),
//! and the peak number of concurrent calls is tracked.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::FetchError;
use crate::client::{HttpClient, HttpRequest, HttpResponse};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A response with this status and body.
    Response(u16, Vec<u8>),
    /// A transport failure with this message.
    TransportError(String),
}

/// A call the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The request as sent.
    pub request: HttpRequest,
    /// When the call entered the client.
    pub started: Instant,
    /// When the reply was returned.
    pub finished: Instant,
}

/// Scripted in-memory HTTP client.
#[derive(Debug, Default)]
pub struct MockClient {
    routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockClient {
    /// Creates a client with no routes and no latency.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call take `latency` (on the tokio clock).
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Appends a reply to `url`'s script.
    #[must_use]
    pub fn route(self, url: &str, reply: MockReply) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_owned())
            .or_default()
            .push_back(reply);
        self
    }

    /// Appends a `200` HTML reply.
    #[must_use]
    pub fn html(self, url: &str, body: &str) -> Self {
        self.route(url, MockReply::Response(200, body.as_bytes().to_vec()))
    }

    /// Appends a `200` binary reply.
    #[must_use]
    pub fn bytes(self, url: &str, body: &[u8]) -> Self {
        self.route(url, MockReply::Response(200, body.to_vec()))
    }

    /// Appends an empty reply with `status`.
    #[must_use]
    pub fn status(self, url: &str, status: u16) -> Self {
        self.route(url, MockReply::Response(status, Vec::new()))
    }

    /// Appends a transport failure.
    #[must_use]
    pub fn transport_error(self, url: &str, message: &str) -> Self {
        self.route(url, MockReply::TransportError(message.to_owned()))
    }

    /// Every call received so far, in completion order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Calls made to exactly `url`.
    #[must_use]
    pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.request.url == url)
            .collect()
    }

    /// Most calls that were ever in progress at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, url: &str) -> MockReply {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        match routes.get_mut(url) {
            Some(script) if script.len() > 1 => script
                .pop_front()
                .unwrap_or(MockReply::Response(404, Vec::new())),
            Some(script) => script
                .front()
                .cloned()
                .unwrap_or(MockReply::Response(404, Vec::new())),
            None => MockReply::Response(404, Vec::new()),
        }
    }
}

impl HttpClient for MockClient {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let started = Instant::now();
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self.next_reply(&request.url);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                request: request.clone(),
                started,
                finished: Instant::now(),
            });

        match reply {
            MockReply::Response(status, body) => Ok(HttpResponse { status, body }),
            MockReply::TransportError(message) => Err(FetchError::Transport(message)),
        }
    }
}

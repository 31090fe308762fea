//! Transport boundary: the probe executor and the verifier.
//!
//! The engine only needs two things from a target: "send this candidate and
//! tell me how long it took" and "is this candidate accepted". Every transport
//! failure (connect error, timeout, unreadable body) collapses to "no
//! information".

use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::blocking::Client;

use crate::config::TargetConfig;
use crate::error::{Error, Result};

/// A target that can be probed for latency.
///
/// Implementations are called from many worker threads at once and must not
/// rely on shared mutable state.
pub trait Transport: Send + Sync {
    /// Send one candidate and return the elapsed time, or `None` on any failure.
    fn probe(&self, candidate: &str) -> Option<Duration>;

    /// Send one candidate and report whether the target accepted it.
    fn verify(&self, candidate: &str) -> bool;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn probe(&self, candidate: &str) -> Option<Duration> {
        (**self).probe(candidate)
    }

    fn verify(&self, candidate: &str) -> bool {
        (**self).verify(candidate)
    }
}

/// HTTP transport for targets of the form
/// `GET {base}/?user=..&password=..&difficulty=..`.
pub struct HttpTransport {
    client: Client,
    url: String,
    user: String,
    difficulty: String,
    success_marker: String,
}

impl HttpTransport {
    /// Build a transport with the per-request timeout from `target`.
    pub fn new(target: &TargetConfig) -> Result<Self> {
        target.validate()?;
        let client = Client::builder()
            .timeout(target.timeout())
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        let base = target.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            url: format!("{base}/"),
            user: target.user.clone(),
            difficulty: target.difficulty.to_string(),
            success_marker: target.success_marker.clone(),
        })
    }

    fn send(&self, candidate: &str) -> reqwest::Result<reqwest::blocking::Response> {
        self.client
            .get(&self.url)
            .query(&[
                ("user", self.user.as_str()),
                ("password", candidate),
                ("difficulty", self.difficulty.as_str()),
            ])
            .send()
    }
}

impl Transport for HttpTransport {
    fn probe(&self, candidate: &str) -> Option<Duration> {
        let start = Instant::now();
        // The body is part of the measured work.
        let result = self.send(candidate).and_then(|r| r.bytes());
        let elapsed = start.elapsed();
        match result {
            Ok(_) => Some(elapsed),
            Err(e) => {
                debug!("probe {candidate:?} failed: {e}");
                None
            }
        }
    }

    fn verify(&self, candidate: &str) -> bool {
        match self.send(candidate).and_then(|r| r.text()) {
            Ok(body) => body.contains(&self.success_marker),
            Err(e) => {
                warn!("verification request failed: {e}");
                false
            }
        }
    }
}

//! # Feed rate checkup
//!
//! Monitors the arrival of the samples of a single data feed, estimating its rate and detecting
//! when it stops.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;

use chrono::Duration;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{Diagnostic, DiagnosticReport};
use util::time::duration_to_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the checkup of a single feed.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedParams {
    /// Rate below which the feed is reported in error
    #[serde(default)]
    pub minimal_rate_hz: f64,

    /// Maximum time allowed between two samples before the feed is considered timed out
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,

    /// Number of intervals between samples the rate is averaged over
    #[serde(default = "default_rate_window_size")]
    pub rate_window_size: usize,
}

/// Rate and liveness monitor of a feed.
#[derive(Debug, Clone)]
pub struct RateCheckup {
    name: String,

    params: FeedParams,

    /// Stamps of the most recent samples, oldest first
    stamps: VecDeque<Duration>,

    state: FeedState,

    report: DiagnosticReport,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Liveness of a feed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum FeedState {
    /// No sample has ever been received
    NoData,

    /// Samples are being received
    Live,

    /// The last sample is older than the feed's timeout
    Timeout,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            minimal_rate_hz: 0.0,
            timeout_s: default_timeout_s(),
            rate_window_size: default_rate_window_size(),
        }
    }
}

impl RateCheckup {
    pub fn new<S: Into<String>>(name: S, params: FeedParams) -> Self {
        let mut checkup = Self {
            name: name.into(),
            params,
            stamps: VecDeque::with_capacity(params.rate_window_size + 1),
            state: FeedState::NoData,
            report: DiagnosticReport::new(),
        };
        checkup.update_report();
        checkup
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    /// Key of the rate in the report's info.
    pub fn rate_key(&self) -> String {
        format!("{}_rate", self.name)
    }

    /// Record the arrival of a sample.
    pub fn evaluate(&mut self, stamp: Duration) {
        if let Some(&last) = self.stamps.back() {
            if stamp < last {
                debug!(
                    "{} sample older than the previous one, restarting the rate estimation",
                    self.name
                );
                self.stamps.clear();
            }
        }

        self.stamps.push_back(stamp);
        while self.stamps.len() > self.params.rate_window_size.max(1) + 1 {
            self.stamps.pop_front();
        }

        if self.state == FeedState::Timeout {
            info!("{} feed is live again", self.name);
        }
        self.state = FeedState::Live;

        self.update_report();
    }

    /// Check the feed against its timeout, returns `true` if it is live.
    pub fn heartbeat(&mut self, now: Duration) -> bool {
        if let (FeedState::Live, Some(&last)) = (self.state, self.stamps.back()) {
            let gap_s = duration_to_seconds(now - last).unwrap_or(f64::INFINITY);

            if gap_s > self.params.timeout_s {
                warn!(
                    "No {} sample received for {:.3} s, feed timed out",
                    self.name, gap_s
                );
                self.state = FeedState::Timeout;
                self.stamps.clear();
                self.update_report();
            }
        }

        self.state == FeedState::Live
    }

    /// Average rate of the feed over the last samples, `None` if not enough samples have been
    /// received.
    pub fn rate_hz(&self) -> Option<f64> {
        let first = self.stamps.front()?;
        let last = self.stamps.back()?;
        let span_s = duration_to_seconds(*last - *first)?;

        if self.stamps.len() < 2 || span_s <= 0.0 {
            return None;
        }

        Some((self.stamps.len() - 1) as f64 / span_s)
    }

    pub fn report(&self) -> &DiagnosticReport {
        &self.report
    }

    fn update_report(&mut self) {
        let mut report = DiagnosticReport::new();
        let rate_key = self.rate_key();

        match self.state {
            FeedState::NoData => {
                report.push(Diagnostic::error(format!(
                    "no data received from {}",
                    self.name
                )));
                report.set_info(rate_key, "");
            }
            FeedState::Live => {
                let rate_hz = self.rate_hz();

                match rate_hz {
                    Some(r) if r < self.params.minimal_rate_hz => {
                        report.push(Diagnostic::error(format!("{} is too low.", rate_key)))
                    }
                    _ => report.push(Diagnostic::ok(format!("{} is OK.", rate_key))),
                }

                report.set_info(
                    rate_key,
                    rate_hz.map(format_rate).unwrap_or_else(String::new),
                );
            }
            FeedState::Timeout => {
                report.push(Diagnostic::error(format!("{} timeout.", rate_key)));
                report.set_info(rate_key, "");
            }
        }

        self.report = report;
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_timeout_s() -> f64 {
    0.5
}

fn default_rate_window_size() -> usize {
    10
}

/// Format a rate rounded to the millihertz, without trailing zeros.
fn format_rate(rate_hz: f64) -> String {
    format!("{}", (rate_hz * 1000.0).round() / 1000.0)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

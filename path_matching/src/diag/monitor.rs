//! # Health monitor
//!
//! Aggregates the checkups of the localisation feeds a matcher depends on with the status of its
//! last matching attempt.
//!
//! The matching status is sticky: it is kept from one report to the next until a new attempt is
//! recorded, but is cleared as soon as one of the feeds isn't live, since a result computed from
//! stale data can't be trusted.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Duration;
use log::trace;

use super::{Diagnostic, DiagnosticReport, FeedParams, FeedState, RateCheckup};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PATH_MATCHING_KEY: &str = "path_matching";
const PATH_FILE_DIRECTORY_KEY: &str = "path_file_directory";
const PATH_FILE_NAME_KEY: &str = "path_file_name";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a feed registered in a [`HealthMonitor`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FeedId(usize);

#[derive(Debug, Clone)]
pub struct HealthMonitor {
    /// Info which never changes, such as the path source
    static_info: DiagnosticReport,

    feeds: Vec<RateCheckup>,

    /// Status of the last matching attempt
    match_status: DiagnosticReport,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HealthMonitor {
    /// Create a monitor with no feed.
    pub fn new() -> Self {
        let mut monitor = Self {
            static_info: DiagnosticReport::new(),
            feeds: Vec::new(),
            match_status: DiagnosticReport::new(),
        };
        monitor.clear_match_status();
        monitor
    }

    /// Register a new feed, reported in the order feeds are added.
    pub fn add_feed<S: Into<String>>(&mut self, name: S, params: FeedParams) -> FeedId {
        self.feeds.push(RateCheckup::new(name, params));
        FeedId(self.feeds.len() - 1)
    }

    /// Add the directory and the name of the path file to the report's info.
    pub fn with_path_source(mut self, path_source: &str) -> Self {
        let (directory, name) = split_path_source(path_source);
        self.static_info.set_info(PATH_FILE_DIRECTORY_KEY, directory);
        self.static_info.set_info(PATH_FILE_NAME_KEY, name);
        self
    }

    /// Record the arrival of a sample of the given feed.
    pub fn record_sample(&mut self, feed: FeedId, stamp: Duration) {
        if let Some(checkup) = self.feeds.get_mut(feed.0) {
            checkup.evaluate(stamp);
        }
    }

    /// Check the feed against its timeout, returns `true` if it is live.
    pub fn evaluate_timeout(&mut self, feed: FeedId, now: Duration) -> bool {
        self.feeds
            .get_mut(feed.0)
            .map(|c| c.heartbeat(now))
            .unwrap_or(false)
    }

    pub fn feed_state(&self, feed: FeedId) -> Option<FeedState> {
        self.feeds.get(feed.0).map(|c| c.state())
    }

    /// Record the outcome of a matching attempt, replacing the previous one.
    pub fn record_match_outcome(&mut self, success: bool) {
        let mut status = DiagnosticReport::new();

        if success {
            status.push(Diagnostic::ok("path matching succeeded."));
        } else {
            status.push(Diagnostic::error("path matching failed."));
        }
        status.set_info(PATH_MATCHING_KEY, if success { "true" } else { "false" });

        self.match_status = status;
    }

    /// Build the report at the given time.
    ///
    /// The report contains the static info, then one diagnostic per feed in registration order,
    /// then the status of the last matching attempt if there is one.
    pub fn build_report(&mut self, now: Duration) -> DiagnosticReport {
        let mut all_live = true;
        for checkup in self.feeds.iter_mut() {
            all_live &= checkup.heartbeat(now);
        }

        if !all_live && !self.match_status.diagnostics.is_empty() {
            trace!("Clearing the path matching status, not all feeds are live");
            self.clear_match_status();
        }

        let mut report = self.static_info.clone();
        for checkup in self.feeds.iter() {
            report += checkup.report();
        }
        report += &self.match_status;

        report
    }

    fn clear_match_status(&mut self) {
        self.match_status = DiagnosticReport::new();
        self.match_status.set_info(PATH_MATCHING_KEY, "");
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Split a path source into its directory and file name.
///
/// A bare file name has an empty directory, the file being relative to the working directory.
fn split_path_source(path_source: &str) -> (String, String) {
    match path_source.rsplit_once('/') {
        Some((directory, name)) => (directory.to_string(), name.to_string()),
        None => (String::new(), path_source.to_string()),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::diag::DiagnosticStatus;
    use util::time::duration_from_seconds;

    /// Monitor of a follower matching against a path built from a leader.
    struct ConvoyMonitor {
        monitor: HealthMonitor,
        leader: FeedId,
        follower: FeedId,
    }

    impl ConvoyMonitor {
        fn new() -> Self {
            let mut monitor = HealthMonitor::new();
            let leader = monitor.add_feed("leader_localisation", FeedParams::default());
            let follower = monitor.add_feed("follower_localisation", FeedParams::default());
            Self {
                monitor,
                leader,
                follower,
            }
        }

        fn report(
            &mut self,
            leader_live: bool,
            follower_live: bool,
            matched: bool,
            stamp_s: f64,
        ) -> DiagnosticReport {
            for n in 0..=10 {
                let stamp = duration_from_seconds(n as f64 * 0.1);
                if follower_live {
                    self.monitor.record_sample(self.follower, stamp);
                }
                if leader_live {
                    self.monitor.record_sample(self.leader, stamp);
                }
            }

            if leader_live && follower_live {
                self.monitor.record_match_outcome(matched);
            }

            self.monitor.build_report(duration_from_seconds(stamp_s))
        }
    }

    #[test]
    fn test_initial_report() {
        let report = ConvoyMonitor::new().report(false, false, false, 1.0);

        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::error("no data received from leader_localisation"),
                Diagnostic::error("no data received from follower_localisation"),
            ]
        );
        assert_eq!(report.info.len(), 3);
        assert_eq!(report.info("leader_localisation_rate"), Some(""));
        assert_eq!(report.info("follower_localisation_rate"), Some(""));
        assert_eq!(report.info("path_matching"), Some(""));
    }

    #[test]
    fn test_single_feed() {
        let report = ConvoyMonitor::new().report(true, false, false, 1.0);
        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::ok("leader_localisation_rate is OK."),
                Diagnostic::error("no data received from follower_localisation"),
            ]
        );
        assert_eq!(report.info("leader_localisation_rate"), Some("10"));
        assert_eq!(report.info("follower_localisation_rate"), Some(""));
        assert_eq!(report.info("path_matching"), Some(""));

        let report = ConvoyMonitor::new().report(false, true, false, 1.0);
        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::error("no data received from leader_localisation"),
                Diagnostic::ok("follower_localisation_rate is OK."),
            ]
        );
        assert_eq!(report.info("leader_localisation_rate"), Some(""));
        assert_eq!(report.info("follower_localisation_rate"), Some("10"));
        assert_eq!(report.info("path_matching"), Some(""));
    }

    #[test]
    fn test_match_outcome() {
        let report = ConvoyMonitor::new().report(true, true, false, 1.0);
        assert_eq!(report.diagnostics.len(), 3);
        assert_eq!(
            report.diagnostics[2],
            Diagnostic::error("path matching failed.")
        );
        assert_eq!(report.info.len(), 3);
        assert_eq!(report.info("leader_localisation_rate"), Some("10"));
        assert_eq!(report.info("follower_localisation_rate"), Some("10"));
        assert_eq!(report.info("path_matching"), Some("false"));

        let report = ConvoyMonitor::new().report(true, true, true, 1.0);
        assert_eq!(report.diagnostics.len(), 3);
        assert_eq!(
            report.diagnostics[2],
            Diagnostic::ok("path matching succeeded.")
        );
        assert_eq!(report.info("path_matching"), Some("true"));
    }

    #[test]
    fn test_outcome_is_replaced() {
        let mut convoy = ConvoyMonitor::new();
        convoy.report(true, true, false, 1.0);
        convoy.monitor.record_match_outcome(true);

        let report = convoy.monitor.build_report(duration_from_seconds(1.0));
        assert_eq!(report.diagnostics.len(), 3);
        assert_eq!(report.diagnostics[2].status, DiagnosticStatus::Ok);
    }

    #[test]
    fn test_timeout_clears_status() {
        let mut convoy = ConvoyMonitor::new();
        let report = convoy.report(true, true, true, 10.0);

        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::error("leader_localisation_rate timeout."),
                Diagnostic::error("follower_localisation_rate timeout."),
            ]
        );
        assert_eq!(report.info.len(), 3);
        assert_eq!(report.info("leader_localisation_rate"), Some(""));
        assert_eq!(report.info("follower_localisation_rate"), Some(""));
        assert_eq!(report.info("path_matching"), Some(""));
        assert_eq!(convoy.monitor.feed_state(convoy.leader), Some(FeedState::Timeout));
    }

    #[test]
    fn test_single_stale_feed_clears_status() {
        let mut convoy = ConvoyMonitor::new();
        convoy.report(true, true, true, 1.0);

        // Only the follower keeps publishing
        for n in 11..=30 {
            convoy
                .monitor
                .record_sample(convoy.follower, duration_from_seconds(n as f64 * 0.1));
        }

        let report = convoy.monitor.build_report(duration_from_seconds(3.0));
        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::error("leader_localisation_rate timeout."),
                Diagnostic::ok("follower_localisation_rate is OK."),
            ]
        );
        assert_eq!(report.info("path_matching"), Some(""));
    }

    #[test]
    fn test_path_source() {
        let mut monitor = HealthMonitor::new().with_path_source("/foo/bar.json");
        let localisation = monitor.add_feed("localisation", FeedParams::default());

        let report = monitor.build_report(duration_from_seconds(1.0));
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::error("no data received from localisation")]
        );
        assert_eq!(report.info.len(), 4);
        assert_eq!(report.info("path_file_directory"), Some("/foo"));
        assert_eq!(report.info("path_file_name"), Some("bar.json"));
        assert_eq!(report.info("localisation_rate"), Some(""));
        assert_eq!(report.info("path_matching"), Some(""));

        for n in 0..=10 {
            monitor.record_sample(localisation, duration_from_seconds(n as f64 * 0.1));
        }
        monitor.record_match_outcome(false);

        let report = monitor.build_report(duration_from_seconds(1.0));
        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::ok("localisation_rate is OK."),
                Diagnostic::error("path matching failed."),
            ]
        );
        assert_eq!(report.info("localisation_rate"), Some("10"));
        assert_eq!(report.info("path_matching"), Some("false"));
        assert!(monitor.evaluate_timeout(localisation, duration_from_seconds(1.2)));
    }

    #[test]
    fn test_split_path_source() {
        assert_eq!(
            split_path_source("/foo/bar.json"),
            (String::from("/foo"), String::from("bar.json"))
        );
        assert_eq!(
            split_path_source("bar.json"),
            (String::new(), String::from("bar.json"))
        );
    }
}

//! # On-the-fly path matching
//!
//! Matching of a follower vehicle against the path travelled by a leader vehicle, the path being
//! built as the leader's poses are received.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Duration;

use super::params::OnTheFlyParams;
use crate::{
    builder::IncrementalPathBuilder,
    diag::{DiagnosticReport, FeedId, HealthMonitor},
    loc::{Pose2D, Twist2D},
    path::{MatchedPoint, PathSection},
    tracker::{MatchTracker, SearchOutcome, TrackerParams},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Matches a follower against the path of a leader.
///
/// Leader and follower poses are expected in the same planar frame. Both feeds are monitored
/// and reported by [`OnTheFlyPathMatching::get_report`].
#[derive(Debug, Clone)]
pub struct OnTheFlyPathMatching {
    builder: IncrementalPathBuilder,

    /// Owns the path the builder grows
    tracker: MatchTracker<PathSection>,

    monitor: HealthMonitor,

    leader_feed: FeedId,

    follower_feed: FeedId,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OnTheFlyPathMatching {
    pub fn new(params: &OnTheFlyParams) -> Self {
        let tracker_params = TrackerParams {
            prediction_time_horizon_s: params.prediction_time_horizon_s,
            maximal_research_radius_m: params.maximal_research_radius_m,
            tracking_window_size: params.tracking_window_size,
            first_waypoint_fallback: true,
        };

        let mut monitor = HealthMonitor::new();
        let leader_feed = monitor.add_feed("leader_localisation", params.leader_localisation);
        let follower_feed =
            monitor.add_feed("follower_localisation", params.follower_localisation);

        Self {
            builder: IncrementalPathBuilder::new(
                params.minimal_distance_between_two_points_m,
                params.minimal_vehicle_speed_to_insert_point_ms,
            ),
            tracker: MatchTracker::new(
                PathSection::new(params.interpolation_window_length_m),
                tracker_params,
            ),
            monitor,
            leader_feed,
            follower_feed,
        }
    }

    /// Process a new leader pose, returns `true` if it was appended to the path.
    pub fn update_path(
        &mut self,
        stamp: Duration,
        leader_pose: &Pose2D,
        leader_twist: &Twist2D,
    ) -> bool {
        self.monitor.record_sample(self.leader_feed, stamp);
        self.builder
            .grow(self.tracker.path_mut(), leader_pose, leader_twist)
    }

    /// Match a follower pose against the path built so far.
    pub fn match_vehicle(
        &mut self,
        stamp: Duration,
        follower_pose: &Pose2D,
        follower_twist: &Twist2D,
    ) -> Option<MatchedPoint> {
        self.monitor.record_sample(self.follower_feed, stamp);

        let matched_point = self.tracker.match_pose(follower_pose, follower_twist);
        self.monitor.record_match_outcome(matched_point.is_some());

        matched_point
    }

    /// Build the health report at the given time.
    pub fn get_report(&mut self, stamp: Duration) -> DiagnosticReport {
        self.monitor.build_report(stamp)
    }

    /// Forget the follower's previous match. The path is kept.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    pub fn path(&self) -> &PathSection {
        self.tracker.path()
    }

    /// The strategy which produced the last match.
    pub fn last_search(&self) -> SearchOutcome {
        self.tracker.last_search()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

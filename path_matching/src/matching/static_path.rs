//! # Static path matching
//!
//! Matching of a vehicle against a fixed path loaded from a file when the matcher is created.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Duration;
use log::info;

use super::params::StaticPathParams;
use crate::{
    diag::{DiagnosticReport, FeedId, HealthMonitor},
    loc::{Pose2D, Twist2D},
    path::{
        full::PathError, GeodeticCoordinates, MatchedPoint, Path, PathFile, PathFileError,
        PathGeometry,
    },
    tracker::{MatchTracker, SearchOutcome, TrackerParams},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Matches a vehicle against a path loaded from a file.
#[derive(Debug, Clone)]
pub struct StaticPathMatching {
    tracker: MatchTracker<Path>,

    monitor: HealthMonitor,

    localisation_feed: FeedId,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathMatchingError {
    #[error("Cannot load the path file: {0}")]
    PathFileError(PathFileError),

    #[error("Cannot build the path: {0}")]
    PathError(PathError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StaticPathMatching {
    /// Load the path file and create the matcher.
    ///
    /// If a local anchor is given the path is expressed in the tangent plane at this anchor,
    /// which requires the path file to have an origin.
    pub fn new<P: AsRef<std::path::Path>>(
        path_file_path: P,
        params: &StaticPathParams,
        local_anchor: Option<GeodeticCoordinates>,
    ) -> Result<Self, PathMatchingError> {
        let path_file =
            PathFile::load(path_file_path.as_ref()).map_err(PathMatchingError::PathFileError)?;

        Self::from_path_file(path_file, params, local_anchor)
    }

    /// Create the matcher from an already loaded path file.
    pub fn from_path_file(
        mut path_file: PathFile,
        params: &StaticPathParams,
        local_anchor: Option<GeodeticCoordinates>,
    ) -> Result<Self, PathMatchingError> {
        if let Some(anchor) = local_anchor {
            path_file
                .reanchor(&anchor)
                .map_err(PathMatchingError::PathFileError)?;
        }

        let path_source = path_file
            .file_path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (way_points, annotations) = path_file.into_parts();
        let path = Path::new(way_points, params.interpolation_window_length_m, annotations)
            .map_err(PathMatchingError::PathError)?;

        info!(
            "Matching against {:?}, {:.2} m long in {} section(s)",
            path_source,
            path.length(),
            path.sections().len()
        );

        let tracker_params = TrackerParams {
            prediction_time_horizon_s: params.prediction_time_horizon_s,
            maximal_research_radius_m: params.maximal_research_radius_m,
            tracking_window_size: params.tracking_window_size,
            first_waypoint_fallback: false,
        };

        let mut monitor = HealthMonitor::new().with_path_source(&path_source);
        let localisation_feed = monitor.add_feed("localisation", params.localisation);

        Ok(Self {
            tracker: MatchTracker::new(path, tracker_params),
            monitor,
            localisation_feed,
        })
    }

    /// Match the vehicle using the prediction horizon of the parameters.
    ///
    /// Returns every candidate found, the one selected as the vehicle's match being given by
    /// [`StaticPathMatching::tracked_point`].
    pub fn match_vehicle(
        &mut self,
        stamp: Duration,
        pose: &Pose2D,
        twist: &Twist2D,
    ) -> Vec<MatchedPoint> {
        let horizon_s = self.tracker.params().prediction_time_horizon_s;
        self.match_vehicle_with_horizon(stamp, pose, twist, horizon_s)
    }

    /// Match the vehicle with a specific prediction horizon.
    pub fn match_vehicle_with_horizon(
        &mut self,
        stamp: Duration,
        pose: &Pose2D,
        twist: &Twist2D,
        prediction_time_horizon_s: f64,
    ) -> Vec<MatchedPoint> {
        self.monitor.record_sample(self.localisation_feed, stamp);

        let matched = self
            .tracker
            .match_pose_with_horizon(pose, twist, prediction_time_horizon_s)
            .is_some();
        self.monitor.record_match_outcome(matched);

        self.tracker.candidates().to_vec()
    }

    /// The candidate selected by the last match.
    pub fn tracked_point(&self) -> Option<&MatchedPoint> {
        self.tracker.tracked_point()
    }

    /// Build the health report at the given time.
    pub fn get_report(&mut self, stamp: Duration) -> DiagnosticReport {
        self.monitor.build_report(stamp)
    }

    /// Forget the previous match. The path is kept.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    pub fn path(&self) -> &Path {
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

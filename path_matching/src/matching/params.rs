//! Path matching parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::diag::FeedParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for matching a follower against the path of a leader.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OnTheFlyParams {
    /// Time horizon used to compute the future curvature
    pub prediction_time_horizon_s: f64,

    /// Maximum distance between the follower and its matched point
    pub maximal_research_radius_m: f64,

    /// Length of the window course and curvature are interpolated over
    pub interpolation_window_length_m: f64,

    /// Leader poses closer than this to the last waypoint are not inserted
    pub minimal_distance_between_two_points_m: f64,

    /// Leader poses are only inserted if the leader moves faster than this
    pub minimal_vehicle_speed_to_insert_point_ms: f64,

    /// Number of segments searched on each side of the previous match
    #[serde(default = "default_on_the_fly_window_size")]
    pub tracking_window_size: usize,

    #[serde(default)]
    pub leader_localisation: FeedParams,

    #[serde(default)]
    pub follower_localisation: FeedParams,
}

/// Parameters for matching a vehicle against a path loaded from a file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StaticPathParams {
    /// Maximum distance between the vehicle and its matched point
    pub maximal_research_radius_m: f64,

    /// Length of the window course and curvature are interpolated over
    pub interpolation_window_length_m: f64,

    /// Time horizon used to compute the future curvature
    #[serde(default)]
    pub prediction_time_horizon_s: f64,

    /// Number of segments searched on each side of the previous match
    #[serde(default = "default_static_window_size")]
    pub tracking_window_size: usize,

    #[serde(default)]
    pub localisation: FeedParams,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_on_the_fly_window_size() -> usize {
    10
}

fn default_static_window_size() -> usize {
    2
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

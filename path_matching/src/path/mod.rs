//! # Path
//!
//! This module defines the reference paths vehicles are matched against, and the result of a
//! match expressed in path-relative (Frenet) coordinates.
//!
//! The matching logic only relies on the [`PathGeometry`] contract. Two implementations are
//! provided:
//! - [`PathSection`] - a single polyline which can be grown one waypoint at a time, used when
//!   the path is built on the fly from a leader vehicle's trajectory.
//! - [`Path`] - a fixed sequence of sections loaded from a [`PathFile`], split wherever the
//!   desired direction of travel reverses.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod anchor;
pub mod file;
pub mod full;
pub mod section;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::loc::Pose2D;

pub use anchor::GeodeticCoordinates;
pub use file::{PathFile, PathFileError};
pub use full::{Path, PathAnnotation};
pub use section::PathSection;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point inserted into a path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct WayPoint {
    /// Position of the point
    pub position_m: Vector2<f64>,

    /// Speed the vehicle should have when passing this point. A negative value means the point
    /// should be driven through in reverse.
    pub desired_speed_ms: Option<f64>,
}

/// The local geometric state of a path at a given curvilinear abscissa.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PathPosture {
    /// Course (direction of the tangent) of the path
    pub course_rad: f64,

    /// Curvature of the path, in 1/meters. Positive when turning left.
    pub curvature_m: f64,

    /// Derivative of the curvature with respect to the curvilinear abscissa, in 1/meters^2.
    pub curvature_rate_m2: f64,

    /// Position of the point on the path
    pub position_m: Vector2<f64>,
}

/// Vehicle pose relative to a path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FrenetPose {
    /// Signed distance to the path, positive when the vehicle is on the left of the path.
    pub lateral_deviation_m: f64,

    /// Vehicle heading minus path course, in (-pi, pi].
    pub course_deviation_rad: f64,

    /// Arc length from the start of the path to the projected point. Negative values mean the
    /// vehicle hasn't reached the start of the path yet.
    pub curvilinear_abscissa_m: f64,
}

/// The result of matching a vehicle pose against a path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MatchedPoint {
    /// Geometry of the path at the projected point
    pub path_posture: PathPosture,

    /// Pose of the vehicle relative to the path
    pub frenet_pose: FrenetPose,

    /// Curvature of the path at the look-ahead point, i.e. where the vehicle is predicted to be
    /// after the prediction time horizon.
    pub future_curvature_m: f64,

    /// Index of the path section the point lies on
    pub section_index: usize,

    /// Direction the section the point lies on is meant to be driven in
    pub direction: PathDirection,

    /// Desired speed at the matched point, if the path carries one
    pub desired_speed_ms: Option<f64>,
}

/// The previous match used to restrict a search to the neighbourhood of a known position.
#[derive(Debug, Copy, Clone)]
pub struct SearchSeed<'a> {
    /// The previous match
    pub matched_point: &'a MatchedPoint,

    /// Number of interpolation cells searched on each side of the previous match
    pub window_size: usize,
}

/// Parameters of a single geometric search.
#[derive(Debug, Copy, Clone)]
pub struct SearchQuery<'a> {
    /// Signed longitudinal speed of the vehicle, used for the look-ahead
    pub vehicle_speed_ms: f64,

    /// Time horizon of the look-ahead
    pub prediction_time_horizon_s: f64,

    /// Maximum distance between the vehicle and the matched point
    pub maximal_research_radius_m: f64,

    /// If present the search is restricted to a window around this previous match
    pub seed: Option<SearchSeed<'a>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The direction a path section is meant to be driven in.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PathDirection {
    Forward,
    Reverse,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A path a vehicle can be matched against.
pub trait PathGeometry {
    /// Total arc length of the path.
    fn length(&self) -> f64;

    /// Returns `true` if the path has enough points to be matched against.
    fn is_matchable(&self) -> bool;

    /// Position of the very first waypoint of the path, `None` if the path is empty.
    fn first_waypoint_position(&self) -> Option<Vector2<f64>>;

    /// Direction of the first segment of the path, `None` if the path can't be matched against.
    fn first_segment_direction(&self) -> Option<Vector2<f64>>;

    /// Project the vehicle onto the path.
    ///
    /// Returns every candidate found within the research radius, an empty vector meaning the
    /// vehicle couldn't be matched.
    fn search_match(&self, vehicle_pose: &Pose2D, query: &SearchQuery) -> Vec<MatchedPoint>;
}

/// A path which can be extended at its end.
pub trait GrowablePath: PathGeometry {
    /// Append a waypoint to the end of the path, returning `true` if it was inserted.
    fn append(&mut self, way_point: WayPoint) -> bool;

    /// Number of waypoints in the path.
    fn num_way_points(&self) -> usize;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WayPoint {
    /// Create a waypoint without any desired speed.
    pub fn new(x_m: f64, y_m: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            desired_speed_ms: None,
        }
    }

    pub fn from_position(position_m: Vector2<f64>) -> Self {
        Self {
            position_m,
            desired_speed_ms: None,
        }
    }

    pub fn with_speed(mut self, desired_speed_ms: f64) -> Self {
        self.desired_speed_ms = Some(desired_speed_ms);
        self
    }
}

impl PathDirection {
    /// Direction matching the sign of a speed, `None` for a null speed.
    pub fn from_speed(speed_ms: f64) -> Option<Self> {
        if speed_ms > 0.0 {
            Some(Self::Forward)
        } else if speed_ms < 0.0 {
            Some(Self::Reverse)
        } else {
            None
        }
    }

    /// `1.0` when driving forward, `-1.0` in reverse.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }
}

impl Default for PathDirection {
    fn default() -> Self {
        Self::Forward
    }
}

impl fmt::Display for MatchedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path posture:")?;
        writeln!(
            f,
            "  position: ({:.3}, {:.3}) m",
            self.path_posture.position_m[0], self.path_posture.position_m[1]
        )?;
        writeln!(f, "  course: {:.4} rad", self.path_posture.course_rad)?;
        writeln!(f, "  curvature: {:.4} 1/m", self.path_posture.curvature_m)?;
        writeln!(
            f,
            "  curvature rate: {:.4} 1/m^2",
            self.path_posture.curvature_rate_m2
        )?;
        writeln!(f, "Frenet pose:")?;
        writeln!(
            f,
            "  curvilinear abscissa: {:.3} m",
            self.frenet_pose.curvilinear_abscissa_m
        )?;
        writeln!(
            f,
            "  lateral deviation: {:.3} m",
            self.frenet_pose.lateral_deviation_m
        )?;
        writeln!(
            f,
            "  course deviation: {:.4} rad",
            self.frenet_pose.course_deviation_rad
        )?;
        write!(
            f,
            "Future curvature: {:.4} 1/m, section: {} ({:?})",
            self.future_curvature_m, self.section_index, self.direction
        )
    }
}

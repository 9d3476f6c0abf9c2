//! # Incremental path builder
//!
//! Grows a path from the poses of a leader vehicle. A pose is only inserted if the leader has
//! moved far enough from the last inserted waypoint and is moving fast enough, so that a
//! stationary or jittering leader doesn't flood the path with waypoints.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{trace, warn};
use nalgebra::Vector2;

use crate::{
    loc::{Pose2D, Twist2D},
    path::{GrowablePath, WayPoint},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IncrementalPathBuilder {
    /// A pose closer than this to the last inserted waypoint is discarded
    minimal_distance_between_two_points_m: f64,

    /// A pose is discarded if the leader moves at this speed or slower
    minimal_vehicle_speed_to_insert_point_ms: f64,

    /// Position distances are measured from, the last inserted waypoint or the first pose seen
    reference_position_m: Option<Vector2<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl IncrementalPathBuilder {
    pub fn new(
        minimal_distance_between_two_points_m: f64,
        minimal_vehicle_speed_to_insert_point_ms: f64,
    ) -> Self {
        Self {
            minimal_distance_between_two_points_m,
            minimal_vehicle_speed_to_insert_point_ms,
            reference_position_m: None,
        }
    }

    /// Position the spacing of the next waypoint is measured from.
    pub fn reference_position_m(&self) -> Option<&Vector2<f64>> {
        self.reference_position_m.as_ref()
    }

    /// Insert the leader's position into the path if it has moved far enough and fast enough.
    ///
    /// Returns `true` if a waypoint was appended. The very first pose only initialises the
    /// reference the spacing is measured from. Poses or twists with non-finite components are
    /// discarded without touching the reference.
    pub fn grow<P>(&mut self, path: &mut P, leader_pose: &Pose2D, leader_twist: &Twist2D) -> bool
    where
        P: GrowablePath + ?Sized,
    {
        if !leader_pose.is_finite() || !leader_twist.is_finite() {
            warn!("Discarding non-finite leader sample");
            return false;
        }

        let reference_m = *self
            .reference_position_m
            .get_or_insert(leader_pose.position_m);

        let distance_m = (leader_pose.position_m - reference_m).norm();
        let speed_ms = leader_twist.speed_ms();

        if distance_m <= self.minimal_distance_between_two_points_m
            || speed_ms <= self.minimal_vehicle_speed_to_insert_point_ms
        {
            return false;
        }

        if !path.append(WayPoint::from_position(leader_pose.position_m)) {
            return false;
        }

        trace!(
            "Waypoint {} inserted at ({:.3}, {:.3})",
            path.num_way_points(),
            leader_pose.position_m[0],
            leader_pose.position_m[1]
        );

        self.reference_position_m = Some(leader_pose.position_m);
        true
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

//! # Localisation types
//!
//! Planar pose and twist of a vehicle, as provided by the upstream localisation feeds of both the
//! leader and the follower.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading) of a vehicle in the shared planar frame.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Pose2D {
    /// The position of the vehicle
    pub position_m: Vector2<f64>,

    /// The heading of the vehicle, the angle to the positive X axis.
    pub heading_rad: f64,
}

/// The velocities of a vehicle, expressed in the vehicle's body frame.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Twist2D {
    /// Linear velocity, X is the longitudinal (forward) component and Y the lateral one.
    pub linear_velocity_ms: Vector2<f64>,

    /// Angular rate about the vertical axis
    pub angular_rate_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2D {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }

    /// Returns `true` if the position and the heading are all finite.
    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|c| c.is_finite()) && self.heading_rad.is_finite()
    }
}

impl Twist2D {
    pub fn new(longitudinal_ms: f64, lateral_ms: f64, angular_rate_rads: f64) -> Self {
        Self {
            linear_velocity_ms: Vector2::new(longitudinal_ms, lateral_ms),
            angular_rate_rads,
        }
    }

    /// Signed speed along the vehicle's longitudinal axis, negative when reversing.
    pub fn longitudinal_speed_ms(&self) -> f64 {
        self.linear_velocity_ms[0]
    }

    pub fn is_finite(&self) -> bool {
        self.linear_velocity_ms.iter().all(|c| c.is_finite()) && self.angular_rate_rads.is_finite()
    }

    /// Magnitude of the linear velocity.
    pub fn speed_ms(&self) -> f64 {
        self.linear_velocity_ms.norm()
    }
}

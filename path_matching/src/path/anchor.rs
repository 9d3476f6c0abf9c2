//! WGS84 coordinates and projection onto a local tangent plane

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Equatorial radius of the WGS84 ellipsoid
const EARTH_RADIUS_M: f64 = 6_378_137.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position on the WGS84 ellipsoid.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeodeticCoordinates {
    pub latitude_deg: f64,

    pub longitude_deg: f64,

    #[serde(default)]
    pub altitude_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GeodeticCoordinates {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    /// Returns `true` if the latitude and longitude are finite and within their ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude_deg.is_finite()
            && self.longitude_deg.is_finite()
            && self.latitude_deg.abs() <= 90.0
            && self.longitude_deg.abs() <= 180.0
    }

    /// East and north position of `self` in the tangent plane at `anchor`.
    ///
    /// Uses an equirectangular projection, only accurate over the few kilometres a path spans.
    pub fn enu_offset_m(&self, anchor: &GeodeticCoordinates) -> Vector2<f64> {
        let mut delta_lon_deg = self.longitude_deg - anchor.longitude_deg;
        if delta_lon_deg > 180.0 {
            delta_lon_deg -= 360.0;
        } else if delta_lon_deg < -180.0 {
            delta_lon_deg += 360.0;
        }

        let east_m =
            delta_lon_deg.to_radians() * EARTH_RADIUS_M * anchor.latitude_deg.to_radians().cos();
        let north_m = (self.latitude_deg - anchor.latitude_deg).to_radians() * EARTH_RADIUS_M;

        Vector2::new(east_m, north_m)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

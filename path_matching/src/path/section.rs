//! # Path section
//!
//! A single polyline path parameterised by its arc length. Course and curvature are obtained by
//! interpolating the polyline over a sliding window, which smooths out the noise of waypoints
//! recorded from a real vehicle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{trace, warn};
use nalgebra::Vector2;
use serde::Serialize;

use super::{
    FrenetPose, GrowablePath, MatchedPoint, PathDirection, PathGeometry, PathPosture, SearchQuery,
    WayPoint,
};
use crate::loc::Pose2D;
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distances below this are considered null.
const DISTANCE_EPSILON_M: f64 = 1e-9;

/// Smallest half window used for the interpolation, prevents a null window length from producing
/// a degenerate chord.
const MIN_HALF_WINDOW_M: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A path made of a single polyline.
#[derive(Debug, Clone, Serialize)]
pub struct PathSection {
    /// Length of the window over which course and curvature are interpolated
    interpolation_window_length_m: f64,

    way_points: Vec<WayPoint>,

    /// Arc length from the start of the section to each waypoint
    abscissas_m: Vec<f64>,

    /// Curvilinear abscissa of the first point of the section within its parent path
    abscissa_offset_m: f64,

    /// Index of the section within its parent path
    section_index: usize,

    direction: PathDirection,
}

/// Location of the projection of a point on the section.
#[derive(Debug, Copy, Clone)]
struct Projection {
    segment_index: usize,
    segment_ratio: f64,
    distance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathSection {
    /// Create a new empty section.
    pub fn new(interpolation_window_length_m: f64) -> Self {
        Self::with_offset(interpolation_window_length_m, 0.0, 0, PathDirection::Forward)
    }

    /// Create a new empty section starting at the given abscissa of a parent path.
    pub fn with_offset(
        interpolation_window_length_m: f64,
        abscissa_offset_m: f64,
        section_index: usize,
        direction: PathDirection,
    ) -> Self {
        Self {
            interpolation_window_length_m,
            way_points: Vec::new(),
            abscissas_m: Vec::new(),
            abscissa_offset_m,
            section_index,
            direction,
        }
    }

    /// Create a section from a list of waypoints.
    ///
    /// Waypoints coincident with their predecessor are dropped.
    pub fn from_way_points<I>(interpolation_window_length_m: f64, way_points: I) -> Self
    where
        I: IntoIterator<Item = WayPoint>,
    {
        let mut section = Self::new(interpolation_window_length_m);
        for wp in way_points {
            section.append(wp);
        }
        section
    }

    pub fn way_points(&self) -> &[WayPoint] {
        &self.way_points
    }

    pub fn interpolation_window_length_m(&self) -> f64 {
        self.interpolation_window_length_m
    }

    pub fn section_index(&self) -> usize {
        self.section_index
    }

    pub fn direction(&self) -> PathDirection {
        self.direction
    }

    /// Curvilinear abscissa of the first point of the section.
    pub fn start_abscissa_m(&self) -> f64 {
        self.abscissa_offset_m
    }

    /// Curvilinear abscissa of the last point of the section.
    pub fn end_abscissa_m(&self) -> f64 {
        self.abscissa_offset_m + self.length()
    }

    /// Number of segments (pairs of consecutive waypoints) in the section.
    pub fn num_segments(&self) -> usize {
        self.way_points.len().saturating_sub(1)
    }

    /// Index of the segment containing the given curvilinear abscissa, clamped to the section.
    ///
    /// Returns `None` if the section has no segment.
    pub fn segment_index(&self, abscissa_m: f64) -> Option<usize> {
        if self.num_segments() == 0 {
            return None;
        }

        let local_m = abscissa_m - self.abscissa_offset_m;
        let above = self.abscissas_m.partition_point(|&s| s <= local_m);

        Some(above.saturating_sub(1).min(self.num_segments() - 1))
    }

    /// Geometric state of the section at the given curvilinear abscissa.
    ///
    /// Returns `None` if the section can't be interpolated (fewer than 2 waypoints).
    pub fn posture_at(&self, abscissa_m: f64) -> Option<PathPosture> {
        if !self.is_matchable() {
            return None;
        }

        let local_m = (abscissa_m - self.abscissa_offset_m).clamp(0.0, self.length());

        Some(PathPosture {
            course_rad: self.local_course(local_m),
            curvature_m: self.local_curvature(local_m),
            curvature_rate_m2: self.local_curvature_rate(local_m),
            position_m: self.local_position(local_m),
        })
    }

    /// Search for the closest point of the section within the given range of segments.
    ///
    /// Projections lying before the start of `first_segment` or after the end of `last_segment`
    /// are rejected, so that a vehicle outside of the range isn't matched onto its boundary.
    pub fn search_segments(
        &self,
        vehicle_pose: &Pose2D,
        query: &SearchQuery,
        first_segment: usize,
        last_segment: usize,
    ) -> Option<MatchedPoint> {
        if !self.is_matchable() {
            return None;
        }

        let last_segment = last_segment.min(self.num_segments() - 1);
        if first_segment > last_segment {
            return None;
        }

        let projection = self.project(&vehicle_pose.position_m, first_segment, last_segment)?;

        if projection.distance_m > query.maximal_research_radius_m {
            trace!(
                "Closest point of section {} is {:.3} m away, outside the research radius",
                self.section_index,
                projection.distance_m
            );
            return None;
        }

        Some(self.build_matched_point(vehicle_pose, query, &projection))
    }

    // ---- PRIVATE HELPERS ----

    /// Arc length of a single segment.
    fn segment_length(&self, index: usize) -> f64 {
        self.abscissas_m[index + 1] - self.abscissas_m[index]
    }

    fn half_window(&self) -> f64 {
        (0.5 * self.interpolation_window_length_m).max(MIN_HALF_WINDOW_M)
    }

    fn local_position(&self, local_m: f64) -> Vector2<f64> {
        if self.way_points.len() < 2 {
            return self.way_points[0].position_m;
        }

        let local_m = local_m.clamp(0.0, self.length());
        let index = self
            .abscissas_m
            .partition_point(|&s| s <= local_m)
            .saturating_sub(1)
            .min(self.num_segments() - 1);

        let start = self.way_points[index].position_m;
        let end = self.way_points[index + 1].position_m;
        let seg_length_m = self.segment_length(index);

        if seg_length_m > DISTANCE_EPSILON_M {
            start + (end - start) * ((local_m - self.abscissas_m[index]) / seg_length_m)
        } else {
            start
        }
    }

    /// Course of the chord spanning the interpolation window around the abscissa.
    fn local_course(&self, local_m: f64) -> f64 {
        let half_window_m = self.half_window();
        let before = self.local_position((local_m - half_window_m).max(0.0));
        let after = self.local_position((local_m + half_window_m).min(self.length()));
        let chord = after - before;

        if chord.norm() > DISTANCE_EPSILON_M {
            chord[1].atan2(chord[0])
        } else {
            // Degenerate chord, use the direction of the first segment instead
            let dir = self.way_points[1].position_m - self.way_points[0].position_m;
            dir[1].atan2(dir[0])
        }
    }

    /// Signed curvature of the circle passing through the points at either end and at the centre
    /// of the interpolation window.
    ///
    /// Close to the ends of the section the window is shifted so that it stays inside it.
    fn local_curvature(&self, local_m: f64) -> f64 {
        let length_m = self.length();
        if length_m <= DISTANCE_EPSILON_M {
            return 0.0;
        }

        let half_window_m = self.half_window().min(0.5 * length_m);
        let centre_m = local_m.clamp(half_window_m, length_m - half_window_m);

        let a = self.local_position(centre_m - half_window_m);
        let b = self.local_position(centre_m);
        let c = self.local_position(centre_m + half_window_m);

        menger_curvature(&a, &b, &c)
    }

    fn local_curvature_rate(&self, local_m: f64) -> f64 {
        let half_window_m = self.half_window();
        let lower_m = (local_m - half_window_m).max(0.0);
        let upper_m = (local_m + half_window_m).min(self.length());

        if upper_m - lower_m <= DISTANCE_EPSILON_M {
            return 0.0;
        }

        (self.local_curvature(upper_m) - self.local_curvature(lower_m)) / (upper_m - lower_m)
    }

    /// Orthogonal projection of a position onto the segments of the given range.
    fn project(
        &self,
        position_m: &Vector2<f64>,
        first_segment: usize,
        last_segment: usize,
    ) -> Option<Projection> {
        let mut best: Option<Projection> = None;

        for index in first_segment..=last_segment {
            let start = self.way_points[index].position_m;
            let dir = self.way_points[index + 1].position_m - start;
            let ratio = self.raw_ratio(position_m, index).clamp(0.0, 1.0);
            let distance_m = (position_m - (start + dir * ratio)).norm();

            if best.map_or(true, |b| distance_m < b.distance_m) {
                best = Some(Projection {
                    segment_index: index,
                    segment_ratio: ratio,
                    distance_m,
                });
            }
        }

        let best = best?;
        let local_m = self.abscissas_m[best.segment_index]
            + best.segment_ratio * self.segment_length(best.segment_index);

        // The closest point is an outer end of the range and the vehicle lies beyond it
        if local_m <= self.abscissas_m[first_segment] + DISTANCE_EPSILON_M
            && self.raw_ratio(position_m, first_segment) < 0.0
        {
            return None;
        }
        if local_m >= self.abscissas_m[last_segment + 1] - DISTANCE_EPSILON_M
            && self.raw_ratio(position_m, last_segment) > 1.0
        {
            return None;
        }

        Some(best)
    }

    /// Unclamped ratio of the orthogonal projection of a position along a segment.
    fn raw_ratio(&self, position_m: &Vector2<f64>, index: usize) -> f64 {
        let start = self.way_points[index].position_m;
        let dir = self.way_points[index + 1].position_m - start;
        let length_sq = dir.norm_squared();

        if length_sq > 0.0 {
            (position_m - start).dot(&dir) / length_sq
        } else {
            0.0
        }
    }

    fn build_matched_point(
        &self,
        vehicle_pose: &Pose2D,
        query: &SearchQuery,
        projection: &Projection,
    ) -> MatchedPoint {
        let index = projection.segment_index;
        let start = &self.way_points[index];
        let end = &self.way_points[index + 1];
        let dir = end.position_m - start.position_m;

        let local_m =
            self.abscissas_m[index] + projection.segment_ratio * self.segment_length(index);
        let position_m = start.position_m + dir * projection.segment_ratio;

        // Left of the path is positive
        let offset = vehicle_pose.position_m - position_m;
        let cross = dir[0] * offset[1] - dir[1] * offset[0];
        let lateral_deviation_m = if cross < 0.0 {
            -projection.distance_m
        } else {
            projection.distance_m
        };

        let path_posture = PathPosture {
            course_rad: self.local_course(local_m),
            curvature_m: self.local_curvature(local_m),
            curvature_rate_m2: self.local_curvature_rate(local_m),
            position_m,
        };

        let look_ahead_m = (local_m + query.vehicle_speed_ms * query.prediction_time_horizon_s)
            .clamp(0.0, self.length());

        let desired_speed_ms = match (start.desired_speed_ms, end.desired_speed_ms) {
            (Some(a), Some(b)) => Some(a + (b - a) * projection.segment_ratio),
            (a, b) => a.or(b),
        };

        MatchedPoint {
            frenet_pose: FrenetPose {
                lateral_deviation_m,
                course_deviation_rad: wrap_to_pi(vehicle_pose.heading_rad - path_posture.course_rad),
                curvilinear_abscissa_m: self.abscissa_offset_m + local_m,
            },
            path_posture,
            future_curvature_m: self.local_curvature(look_ahead_m),
            section_index: self.section_index,
            direction: self.direction,
            desired_speed_ms,
        }
    }
}

impl PathGeometry for PathSection {
    fn length(&self) -> f64 {
        self.abscissas_m.last().copied().unwrap_or(0.0)
    }

    fn is_matchable(&self) -> bool {
        self.way_points.len() >= 2
    }

    fn first_waypoint_position(&self) -> Option<Vector2<f64>> {
        self.way_points.first().map(|wp| wp.position_m)
    }

    fn first_segment_direction(&self) -> Option<Vector2<f64>> {
        match self.way_points.as_slice() {
            [first, second, ..] => Some(second.position_m - first.position_m),
            _ => None,
        }
    }

    fn search_match(&self, vehicle_pose: &Pose2D, query: &SearchQuery) -> Vec<MatchedPoint> {
        if !self.is_matchable() {
            return Vec::new();
        }

        let (first, last) = match query.seed {
            Some(seed) => {
                let seed_m = seed.matched_point.frenet_pose.curvilinear_abscissa_m;
                match self.segment_index(seed_m) {
                    Some(i) => (
                        i.saturating_sub(seed.window_size),
                        i.saturating_add(seed.window_size),
                    ),
                    None => return Vec::new(),
                }
            }
            None => (0, self.num_segments() - 1),
        };

        self.search_segments(vehicle_pose, query, first, last)
            .into_iter()
            .collect()
    }
}

impl GrowablePath for PathSection {
    fn append(&mut self, way_point: WayPoint) -> bool {
        if !way_point.position_m.iter().all(|c| c.is_finite()) {
            warn!("Ignoring waypoint with a non-finite position");
            return false;
        }

        match (self.way_points.last(), self.abscissas_m.last()) {
            (Some(last), Some(&last_m)) => {
                let distance_m = (way_point.position_m - last.position_m).norm();
                if distance_m <= DISTANCE_EPSILON_M {
                    trace!("Ignoring waypoint coincident with the end of the section");
                    return false;
                }
                self.abscissas_m.push(last_m + distance_m);
            }
            _ => self.abscissas_m.push(0.0),
        }

        self.way_points.push(way_point);
        true
    }

    fn num_way_points(&self) -> usize {
        self.way_points.len()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Signed curvature of the circle passing through three points, positive when `a -> b -> c`
/// turns left. Aligned or coincident points give a null curvature.
fn menger_curvature(a: &Vector2<f64>, b: &Vector2<f64>, c: &Vector2<f64>) -> f64 {
    let ab = b - a;
    let bc = c - b;
    let ac = c - a;

    let denom = ab.norm() * bc.norm() * ac.norm();
    if denom <= DISTANCE_EPSILON_M {
        return 0.0;
    }

    2.0 * (ab[0] * bc[1] - ab[1] * bc[0]) / denom
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

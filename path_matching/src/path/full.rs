//! # Full path
//!
//! A fixed path made of one or more [`PathSection`]s. A new section is started each time the
//! desired speed of the waypoints changes sign, so that a manoeuvre including reversals (for
//! instance a three point turn) is split into sections each driven in a single direction.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::{
    GrowablePath, MatchedPoint, PathDirection, PathGeometry, PathSection, SearchQuery, WayPoint,
};
use crate::loc::Pose2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A fixed path split into sections of constant driving direction.
#[derive(Debug, Clone, Serialize)]
pub struct Path {
    sections: Vec<PathSection>,

    /// Annotations sorted by curvilinear abscissa
    annotations: Vec<PathAnnotation>,

    num_way_points: usize,
}

/// An annotation as found in a path file, attached to one of the path's waypoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationRecord {
    /// Index of the waypoint the annotation is attached to
    pub point_index: usize,

    #[serde(rename = "type")]
    pub kind: String,

    pub value: String,
}

/// An annotation located along the path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathAnnotation {
    pub kind: String,

    pub value: String,

    /// Index of the waypoint the annotation is attached to
    pub point_index: usize,

    /// Curvilinear abscissa of the waypoint
    pub curvilinear_abscissa_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("The interpolation window length must be a finite positive number, got {0}")]
    InvalidWindowLength(f64),

    #[error("Waypoint {0} has a non-finite coordinate")]
    NonFiniteWayPoint(usize),

    #[error("Annotation attached to waypoint {point_index} but the path only has {num_way_points} waypoints")]
    AnnotationOutOfRange {
        point_index: usize,
        num_way_points: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Build a new path from its waypoints.
    ///
    /// A path with fewer than two waypoints is valid but can't be matched against.
    pub fn new(
        way_points: Vec<WayPoint>,
        interpolation_window_length_m: f64,
        annotations: Vec<AnnotationRecord>,
    ) -> Result<Self, PathError> {
        if !interpolation_window_length_m.is_finite() || interpolation_window_length_m < 0.0 {
            return Err(PathError::InvalidWindowLength(interpolation_window_length_m));
        }

        if let Some(index) = way_points
            .iter()
            .position(|wp| !wp.position_m.iter().all(|c| c.is_finite()))
        {
            return Err(PathError::NonFiniteWayPoint(index));
        }

        let num_way_points = way_points.len();

        // Curvilinear abscissa of every input waypoint, used to locate the annotations
        let mut point_abscissas_m = Vec::with_capacity(num_way_points);

        let mut direction = way_points
            .iter()
            .find_map(|wp| wp.desired_speed_ms.and_then(PathDirection::from_speed))
            .unwrap_or_default();

        let mut sections = Vec::new();
        let mut current =
            PathSection::with_offset(interpolation_window_length_m, 0.0, 0, direction);
        let mut abscissa_m = 0.0;
        let mut previous: Option<Vector2<f64>> = None;

        for wp in way_points {
            if let Some(prev) = previous {
                abscissa_m += (wp.position_m - prev).norm();
            }
            point_abscissas_m.push(abscissa_m);
            previous = Some(wp.position_m);

            let wp_direction = wp.desired_speed_ms.and_then(PathDirection::from_speed);

            if let Some(new_direction) = wp_direction.filter(|d| *d != direction) {
                // The reversal point is shared by both sections
                let start_m = current.end_abscissa_m();
                let reversal_point = current.way_points().last().copied();

                sections.push(current);
                current = PathSection::with_offset(
                    interpolation_window_length_m,
                    start_m,
                    sections.len(),
                    new_direction,
                );
                if let Some(point) = reversal_point {
                    current.append(point);
                }

                direction = new_direction;
            }

            current.append(wp);
        }

        if current.num_way_points() > 0 {
            sections.push(current);
        }

        let mut path_annotations = Vec::with_capacity(annotations.len());
        for record in annotations {
            let curvilinear_abscissa_m = *point_abscissas_m.get(record.point_index).ok_or(
                PathError::AnnotationOutOfRange {
                    point_index: record.point_index,
                    num_way_points,
                },
            )?;

            path_annotations.push(PathAnnotation {
                kind: record.kind,
                value: record.value,
                point_index: record.point_index,
                curvilinear_abscissa_m,
            });
        }
        path_annotations.sort_by(|a, b| {
            a.curvilinear_abscissa_m
                .partial_cmp(&b.curvilinear_abscissa_m)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            "Built path of {:.2} m from {} waypoints in {} section(s)",
            sections.last().map(|s| s.end_abscissa_m()).unwrap_or(0.0),
            num_way_points,
            sections.len()
        );

        Ok(Self {
            sections,
            annotations: path_annotations,
            num_way_points,
        })
    }

    pub fn sections(&self) -> &[PathSection] {
        &self.sections
    }

    pub fn annotations(&self) -> &[PathAnnotation] {
        &self.annotations
    }

    /// Number of waypoints the path was built from.
    pub fn num_way_points(&self) -> usize {
        self.num_way_points
    }

    /// Annotations located in the given range of curvilinear abscissa (inclusive).
    pub fn annotations_between(
        &self,
        from_m: f64,
        to_m: f64,
    ) -> impl Iterator<Item = &PathAnnotation> {
        self.annotations.iter().filter(move |a| {
            a.curvilinear_abscissa_m >= from_m && a.curvilinear_abscissa_m <= to_m
        })
    }
}

impl PathGeometry for Path {
    fn length(&self) -> f64 {
        self.sections
            .last()
            .map(|s| s.end_abscissa_m())
            .unwrap_or(0.0)
    }

    fn is_matchable(&self) -> bool {
        self.sections.iter().any(|s| s.is_matchable())
    }

    fn first_waypoint_position(&self) -> Option<Vector2<f64>> {
        self.sections
            .first()
            .and_then(|s| s.first_waypoint_position())
    }

    fn first_segment_direction(&self) -> Option<Vector2<f64>> {
        self.sections
            .first()
            .and_then(|s| s.first_segment_direction())
    }

    fn search_match(&self, vehicle_pose: &Pose2D, query: &SearchQuery) -> Vec<MatchedPoint> {
        let seed = match query.seed {
            Some(s) => s,
            // One candidate per section
            None => {
                return self
                    .sections
                    .iter()
                    .flat_map(|s| s.search_match(vehicle_pose, query))
                    .collect()
            }
        };

        let index = seed.matched_point.section_index;
        let section = match self.sections.get(index) {
            Some(s) => s,
            None => return Vec::new(),
        };

        let mut candidates = section.search_match(vehicle_pose, query);

        // Close to the end of the section the vehicle may be moving onto the next one
        let seed_segment = section
            .segment_index(seed.matched_point.frenet_pose.curvilinear_abscissa_m)
            .unwrap_or(0);
        if seed_segment
            .saturating_add(seed.window_size)
            .saturating_add(1)
            >= section.num_segments()
        {
            if let Some(next) = self.sections.get(index + 1) {
                candidates.extend(next.search_segments(
                    vehicle_pose,
                    query,
                    0,
                    seed.window_size,
                ));
            }
        }

        candidates
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

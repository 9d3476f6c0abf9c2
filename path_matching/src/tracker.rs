//! # Match tracker
//!
//! Matches successive poses of a vehicle against a path, reusing the previous match to restrict
//! each new search to its neighbourhood. When tracking is lost the whole path is searched again,
//! and as a last resort a vehicle which hasn't reached the path yet can be matched onto the
//! path's first waypoint.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cmp::Ordering;

use log::{debug, trace, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{
    loc::{Pose2D, Twist2D},
    path::{
        FrenetPose, MatchedPoint, PathDirection, PathGeometry, PathPosture, SearchQuery,
        SearchSeed,
    },
};
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of a [`MatchTracker`].
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerParams {
    /// Time horizon used to compute the future curvature
    pub prediction_time_horizon_s: f64,

    /// Maximum distance between the vehicle and its matched point
    pub maximal_research_radius_m: f64,

    /// Number of segments searched on each side of the previous match
    pub tracking_window_size: usize,

    /// If `true` a vehicle close to the start of the path is matched onto the first waypoint
    /// when it can't be projected onto the path
    pub first_waypoint_fallback: bool,
}

/// Tracks the match of a vehicle along a path.
#[derive(Debug, Clone)]
pub struct MatchTracker<G> {
    path: G,

    params: TrackerParams,

    /// Candidates found by the last search
    candidates: Vec<MatchedPoint>,

    /// Index of the candidate selected as the vehicle's match
    tracked_index: usize,

    last_search: SearchOutcome,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The strategy which produced the last matching result.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum SearchOutcome {
    /// No search was performed, either nothing was matched since the last reset or the path is
    /// too short to be matched against
    NotAttempted,

    /// Found around the previous match
    Tracked,

    /// Found by searching the whole path
    Full,

    /// Matched onto the first waypoint of the path
    FirstWaypoint,

    /// No match found
    Failed,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<G> MatchTracker<G>
where
    G: PathGeometry,
{
    pub fn new(path: G, params: TrackerParams) -> Self {
        Self {
            path,
            params,
            candidates: Vec::new(),
            tracked_index: 0,
            last_search: SearchOutcome::NotAttempted,
        }
    }

    pub fn path(&self) -> &G {
        &self.path
    }

    /// Mutable access to the path, used to grow it between two matches.
    pub fn path_mut(&mut self) -> &mut G {
        &mut self.path
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Match the vehicle using the prediction horizon of the parameters.
    pub fn match_pose(&mut self, pose: &Pose2D, twist: &Twist2D) -> Option<MatchedPoint> {
        self.match_pose_with_horizon(pose, twist, self.params.prediction_time_horizon_s)
    }

    /// Match the vehicle, returning the selected candidate.
    ///
    /// All candidates found by the search are available from [`MatchTracker::candidates`]
    /// afterwards.
    pub fn match_pose_with_horizon(
        &mut self,
        pose: &Pose2D,
        twist: &Twist2D,
        prediction_time_horizon_s: f64,
    ) -> Option<MatchedPoint> {
        if !self.path.is_matchable() {
            trace!("Path too short to be matched against");
            self.reset();
            return None;
        }

        let vehicle_speed_ms = twist.longitudinal_speed_ms();
        let previous = self.tracked_point().copied();
        let mut query = SearchQuery {
            vehicle_speed_ms,
            prediction_time_horizon_s,
            maximal_research_radius_m: self.params.maximal_research_radius_m,
            seed: None,
        };

        let mut outcome = SearchOutcome::Failed;
        let mut candidates = Vec::new();

        if let Some(previous) = previous.as_ref() {
            query.seed = Some(SearchSeed {
                matched_point: previous,
                window_size: self.params.tracking_window_size,
            });
            candidates = self.path.search_match(pose, &query);

            if candidates.is_empty() {
                debug!(
                    "Tracking lost around s = {:.3} m, searching the whole path",
                    previous.frenet_pose.curvilinear_abscissa_m
                );
            } else {
                outcome = SearchOutcome::Tracked;
            }
        }

        if candidates.is_empty() {
            query.seed = None;
            candidates = self.path.search_match(pose, &query);
            if !candidates.is_empty() {
                outcome = SearchOutcome::Full;
            }
        }

        if candidates.is_empty() && self.params.first_waypoint_fallback {
            if let (Some(first_m), Some(start_dir)) = (
                self.path.first_waypoint_position(),
                self.path.first_segment_direction(),
            ) {
                if let Some(point) = first_waypoint_match(
                    &first_m,
                    &start_dir,
                    pose,
                    self.params.maximal_research_radius_m,
                ) {
                    debug!(
                        "Vehicle not on the path yet, matched onto the first waypoint {:.3} m away",
                        -point.frenet_pose.curvilinear_abscissa_m
                    );
                    candidates.push(point);
                    outcome = SearchOutcome::FirstWaypoint;
                }
            }
        }

        if candidates.is_empty() && self.last_search != SearchOutcome::Failed {
            warn!("Vehicle couldn't be matched against the path");
        }

        self.tracked_index = best_candidate_index(&candidates, vehicle_speed_ms).unwrap_or(0);
        self.candidates = candidates;
        self.last_search = outcome;

        self.tracked_point().copied()
    }

    /// The candidate selected by the last search, if any.
    pub fn tracked_point(&self) -> Option<&MatchedPoint> {
        self.candidates.get(self.tracked_index)
    }

    /// Every candidate found by the last search.
    pub fn candidates(&self) -> &[MatchedPoint] {
        &self.candidates
    }

    pub fn last_search(&self) -> SearchOutcome {
        self.last_search
    }

    /// Forget the previous match, the next search covers the whole path.
    pub fn reset(&mut self) {
        self.candidates.clear();
        self.tracked_index = 0;
        self.last_search = SearchOutcome::NotAttempted;
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Select the candidate the vehicle is most likely following.
///
/// Candidates on a section meant to be driven in the direction the vehicle is moving are
/// preferred (a stopped vehicle agrees with every direction), then the smallest lateral
/// deviation, then the smallest course deviation, then the lowest section index. Remaining ties
/// keep the first candidate.
pub fn best_candidate_index(candidates: &[MatchedPoint], vehicle_speed_ms: f64) -> Option<usize> {
    let agrees = |mp: &MatchedPoint| {
        vehicle_speed_ms == 0.0 || mp.direction.sign() * vehicle_speed_ms > 0.0
    };
    let abs_cmp = |a: f64, b: f64| a.abs().partial_cmp(&b.abs()).unwrap_or(Ordering::Equal);

    candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            agrees(b)
                .cmp(&agrees(a))
                .then_with(|| {
                    abs_cmp(
                        a.frenet_pose.lateral_deviation_m,
                        b.frenet_pose.lateral_deviation_m,
                    )
                })
                .then_with(|| {
                    abs_cmp(
                        a.frenet_pose.course_deviation_rad,
                        b.frenet_pose.course_deviation_rad,
                    )
                })
                .then_with(|| a.section_index.cmp(&b.section_index))
        })
        .map(|(i, _)| i)
}

/// Pseudo match of a vehicle which hasn't reached the start of the path yet.
///
/// The path is considered to start with a straight line from the vehicle to the first waypoint,
/// the curvilinear abscissa being minus the distance to that waypoint. Returns `None` if the
/// first waypoint isn't within the research radius, or if the vehicle isn't behind the start of
/// the path along `first_segment_direction`.
pub fn first_waypoint_match(
    first_way_point_m: &Vector2<f64>,
    first_segment_direction: &Vector2<f64>,
    pose: &Pose2D,
    maximal_research_radius_m: f64,
) -> Option<MatchedPoint> {
    let to_first = first_way_point_m - pose.position_m;
    let distance_m = to_first.norm();

    if distance_m >= maximal_research_radius_m {
        return None;
    }

    if to_first.dot(first_segment_direction) <= 0.0 {
        return None;
    }

    let course_rad = if distance_m > 0.0 {
        to_first[1].atan2(to_first[0])
    } else {
        pose.heading_rad
    };

    Some(MatchedPoint {
        path_posture: PathPosture {
            course_rad,
            curvature_m: 0.0,
            curvature_rate_m2: 0.0,
            position_m: pose.position_m,
        },
        frenet_pose: FrenetPose {
            lateral_deviation_m: 0.0,
            course_deviation_rad: wrap_to_pi(pose.heading_rad - course_rad),
            curvilinear_abscissa_m: -distance_m,
        },
        future_curvature_m: 0.0,
        section_index: 0,
        direction: PathDirection::Forward,
        desired_speed_ms: None,
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::{GrowablePath, PathSection, WayPoint};
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// Path section counting the searches performed on it.
    struct CountingPath {
        section: PathSection,
        seeded_searches: Cell<usize>,
        full_searches: Cell<usize>,
    }

    impl CountingPath {
        fn straight(length_m: f64) -> Self {
            let num_points = (length_m / 0.2).round() as usize;
            Self {
                section: PathSection::from_way_points(
                    3.0,
                    (0..=num_points).map(|i| WayPoint::new(i as f64 * 0.2, 0.0)),
                ),
                seeded_searches: Cell::new(0),
                full_searches: Cell::new(0),
            }
        }
    }

    impl PathGeometry for CountingPath {
        fn length(&self) -> f64 {
            self.section.length()
        }

        fn is_matchable(&self) -> bool {
            self.section.is_matchable()
        }

        fn first_waypoint_position(&self) -> Option<Vector2<f64>> {
            self.section.first_waypoint_position()
        }

        fn first_segment_direction(&self) -> Option<Vector2<f64>> {
            self.section.first_segment_direction()
        }

        fn search_match(&self, pose: &Pose2D, query: &SearchQuery) -> Vec<MatchedPoint> {
            let counter = match query.seed {
                Some(_) => &self.seeded_searches,
                None => &self.full_searches,
            };
            counter.set(counter.get() + 1);
            self.section.search_match(pose, query)
        }
    }

    fn params(first_waypoint_fallback: bool) -> TrackerParams {
        TrackerParams {
            prediction_time_horizon_s: 0.5,
            maximal_research_radius_m: 5.0,
            tracking_window_size: 10,
            first_waypoint_fallback,
        }
    }

    fn forward() -> Twist2D {
        Twist2D::new(1.0, 0.0, 0.0)
    }

    fn candidate(
        lateral_m: f64,
        course_rad: f64,
        section: usize,
        dir: PathDirection,
    ) -> MatchedPoint {
        MatchedPoint {
            frenet_pose: FrenetPose {
                lateral_deviation_m: lateral_m,
                course_deviation_rad: course_rad,
                curvilinear_abscissa_m: 0.0,
            },
            section_index: section,
            direction: dir,
            ..MatchedPoint::default()
        }
    }

    #[test]
    fn test_unmatchable_path() {
        let mut tracker = MatchTracker::new(PathSection::new(3.0), params(true));
        assert_eq!(tracker.match_pose(&Pose2D::new(0.0, 0.0, 0.0), &forward()), None);
        assert_eq!(tracker.last_search(), SearchOutcome::NotAttempted);

        // A single waypoint is not enough, even within the fallback radius
        tracker.path_mut().append(WayPoint::new(1.0, 0.0));
        assert_eq!(tracker.match_pose(&Pose2D::new(0.0, 0.0, 0.0), &forward()), None);
        assert!(tracker.candidates().is_empty());
    }

    #[test]
    fn test_tracked_search_narrows() {
        let mut tracker = MatchTracker::new(CountingPath::straight(20.0), params(false));

        for i in 0..50 {
            let pose = Pose2D::new(1.0 + i as f64 * 0.3, 0.5, 0.0);
            let mp = tracker.match_pose(&pose, &forward()).unwrap();
            assert_relative_eq!(
                mp.frenet_pose.curvilinear_abscissa_m,
                pose.position_m[0],
                epsilon = 1e-9
            );
            assert_eq!(
                tracker.last_search(),
                if i == 0 {
                    SearchOutcome::Full
                } else {
                    SearchOutcome::Tracked
                }
            );
        }

        assert_eq!(tracker.path().full_searches.get(), 1);
        assert_eq!(tracker.path().seeded_searches.get(), 49);
    }

    #[test]
    fn test_tracking_lost() {
        let mut tracker = MatchTracker::new(CountingPath::straight(20.0), params(false));

        tracker.match_pose(&Pose2D::new(2.0, 0.5, 0.0), &forward());

        // Jump far beyond the tracking window
        let mp = tracker
            .match_pose(&Pose2D::new(15.0, -0.5, 0.0), &forward())
            .unwrap();
        assert_eq!(tracker.last_search(), SearchOutcome::Full);
        assert_relative_eq!(mp.frenet_pose.curvilinear_abscissa_m, 15.0, epsilon = 1e-9);
        assert_relative_eq!(mp.frenet_pose.lateral_deviation_m, -0.5, epsilon = 1e-9);
        assert_eq!(tracker.path().seeded_searches.get(), 1);
        assert_eq!(tracker.path().full_searches.get(), 2);
    }

    #[test]
    fn test_reset_forces_full_search() {
        let mut tracker = MatchTracker::new(CountingPath::straight(20.0), params(false));

        tracker.match_pose(&Pose2D::new(2.0, 0.5, 0.0), &forward());
        tracker.reset();
        assert_eq!(tracker.tracked_point(), None);
        assert_eq!(tracker.last_search(), SearchOutcome::NotAttempted);

        tracker.match_pose(&Pose2D::new(2.1, 0.5, 0.0), &forward());
        assert_eq!(tracker.last_search(), SearchOutcome::Full);
        assert_eq!(tracker.path().seeded_searches.get(), 0);
        assert_eq!(tracker.path().full_searches.get(), 2);
    }

    #[test]
    fn test_first_waypoint_fallback() {
        let path = PathSection::from_way_points(
            3.0,
            vec![WayPoint::new(0.0, 0.0), WayPoint::new(10.0, 0.0)],
        );
        let mut tracker = MatchTracker::new(path, params(true));

        let mp = tracker
            .match_pose(&Pose2D::new(-2.0, 0.5, 0.0), &forward())
            .unwrap();
        assert_eq!(tracker.last_search(), SearchOutcome::FirstWaypoint);

        let course_rad = (-0.5f64).atan2(2.0);
        assert_relative_eq!(mp.frenet_pose.curvilinear_abscissa_m, -(4.25f64.sqrt()));
        assert_relative_eq!(mp.frenet_pose.lateral_deviation_m, 0.0);
        assert_relative_eq!(mp.path_posture.course_rad, course_rad);
        assert_relative_eq!(mp.frenet_pose.course_deviation_rad, -course_rad);
        assert_relative_eq!(mp.path_posture.curvature_m, 0.0);
        assert_relative_eq!(mp.path_posture.curvature_rate_m2, 0.0);

        // Once on the path the vehicle is projected normally
        let mp = tracker
            .match_pose(&Pose2D::new(1.0, 0.5, 0.0), &forward())
            .unwrap();
        assert_ne!(tracker.last_search(), SearchOutcome::FirstWaypoint);
        assert_relative_eq!(mp.frenet_pose.curvilinear_abscissa_m, 1.0, epsilon = 1e-9);

        // Beyond the radius of the first waypoint
        tracker.reset();
        assert_eq!(
            tracker.match_pose(&Pose2D::new(-6.0, 0.0, 0.0), &forward()),
            None
        );
        assert_eq!(tracker.last_search(), SearchOutcome::Failed);
    }

    #[test]
    fn test_no_fallback_past_the_end() {
        let mut tracker = MatchTracker::new(PathSection::new(3.0), params(true));
        for i in 0..15 {
            tracker
                .path_mut()
                .append(WayPoint::new(i as f64 * 0.2, 0.0));
        }
        assert_relative_eq!(tracker.path().length(), 2.8, epsilon = 1e-9);

        // Just past the end, within the radius of the first waypoint
        assert_eq!(
            tracker.match_pose(&Pose2D::new(3.5, 0.0, 0.0), &forward()),
            None
        );
        assert_eq!(tracker.last_search(), SearchOutcome::Failed);

        // Behind the start the fallback still applies
        tracker
            .match_pose(&Pose2D::new(-0.5, 0.0, 0.0), &forward())
            .unwrap();
        assert_eq!(tracker.last_search(), SearchOutcome::FirstWaypoint);
    }

    #[test]
    fn test_no_fallback() {
        let path = PathSection::from_way_points(
            3.0,
            vec![WayPoint::new(0.0, 0.0), WayPoint::new(10.0, 0.0)],
        );
        let mut tracker = MatchTracker::new(path, params(false));

        assert_eq!(
            tracker.match_pose(&Pose2D::new(-2.0, 0.5, 0.0), &forward()),
            None
        );
        assert_eq!(tracker.last_search(), SearchOutcome::Failed);

        // Beside the path but outside the research radius
        assert_eq!(
            tracker.match_pose(&Pose2D::new(5.0, 6.0, 0.0), &forward()),
            None
        );
        assert!(tracker.candidates().is_empty());
    }

    #[test]
    fn test_first_waypoint_match() {
        let first = Vector2::new(3.0, 4.0);
        let along_x = Vector2::new(1.0, 0.0);

        let mp =
            first_waypoint_match(&first, &along_x, &Pose2D::new(0.0, 0.0, 0.0), 10.0).unwrap();
        assert_relative_eq!(mp.frenet_pose.curvilinear_abscissa_m, -5.0);
        assert_relative_eq!(mp.path_posture.course_rad, 4f64.atan2(3.0));
        assert_eq!(mp.path_posture.position_m, Vector2::zeros());

        // Radius is exclusive
        assert!(
            first_waypoint_match(&first, &along_x, &Pose2D::new(0.0, 0.0, 0.0), 5.0).is_none()
        );

        // Ahead of or level with the start of the path
        assert!(
            first_waypoint_match(&first, &along_x, &Pose2D::new(4.0, 4.0, 0.0), 10.0).is_none()
        );
        assert!(
            first_waypoint_match(&first, &along_x, &Pose2D::new(3.0, 6.0, 0.0), 10.0).is_none()
        );

        // Course deviation is wrapped
        let mp = first_waypoint_match(
            &first,
            &Vector2::new(0.0, -1.0),
            &Pose2D::new(3.0, 5.0, 3.0),
            10.0,
        )
        .unwrap();
        assert_relative_eq!(mp.path_posture.course_rad, -std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(
            mp.frenet_pose.course_deviation_rad,
            3.0 + std::f64::consts::FRAC_PI_2 - std::f64::consts::TAU,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_best_candidate_index() {
        assert_eq!(best_candidate_index(&[], 1.0), None);

        let candidates = vec![
            candidate(0.1, 0.0, 0, PathDirection::Forward),
            candidate(-0.05, 0.0, 1, PathDirection::Reverse),
        ];

        // Direction first
        assert_eq!(best_candidate_index(&candidates, 1.0), Some(0));
        assert_eq!(best_candidate_index(&candidates, -1.0), Some(1));

        // Stopped, the closest one
        assert_eq!(best_candidate_index(&candidates, 0.0), Some(1));

        // Lateral deviation ties broken by course deviation, then section
        let candidates = vec![
            candidate(0.1, 0.3, 0, PathDirection::Forward),
            candidate(-0.1, -0.2, 1, PathDirection::Forward),
            candidate(0.1, 0.2, 2, PathDirection::Forward),
        ];
        assert_eq!(best_candidate_index(&candidates, 1.0), Some(1));

        let candidates = vec![
            candidate(0.1, 0.2, 3, PathDirection::Forward),
            candidate(0.1, 0.2, 2, PathDirection::Forward),
        ];
        assert_eq!(best_candidate_index(&candidates, 1.0), Some(1));
    }
}

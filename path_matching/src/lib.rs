//! # Path matching library
//!
//! This library localises a vehicle relative to a reference path, giving the matched point in
//! path-relative (Frenet) coordinates for use by a trajectory controller. The path is either
//! built on the fly from the trajectory of a leader vehicle (convoy and follow-me scenarios) or
//! loaded from a file.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Incremental path builder - grows a path from the poses of a leader
pub mod builder;

/// Diagnostics - liveness of the localisation feeds and status of the matching
pub mod diag;

/// Localisation types - poses and twists of the vehicles
pub mod loc;

/// Matching entry points
pub mod matching;

/// Path definitions and geometry
pub mod path;

/// Match tracker - reuses the previous match to bound the next search
pub mod tracker;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use diag::{Diagnostic, DiagnosticReport, DiagnosticStatus};
pub use loc::{Pose2D, Twist2D};
pub use matching::{
    OnTheFlyParams, OnTheFlyPathMatching, PathMatchingError, StaticPathMatching, StaticPathParams,
};
pub use path::MatchedPoint;

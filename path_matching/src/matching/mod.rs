//! # Matching
//!
//! The two entry points of the library, each combining a path, a [`MatchTracker`] and a
//! [`HealthMonitor`]:
//!
//! - [`OnTheFlyPathMatching`] - a follower is matched against the path of a leader, grown as the
//!   leader's poses are received.
//! - [`StaticPathMatching`] - a vehicle is matched against a path loaded from a file.
//!
//! Neither is synchronised internally. If the leader and the follower are processed on different
//! threads the matcher must be shared behind a single lock, as growing the path and matching
//! against it touch the same data.
//!
//! [`MatchTracker`]: crate::tracker::MatchTracker
//! [`HealthMonitor`]: crate::diag::HealthMonitor

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// On-the-fly matching against the path of a leader
pub mod on_the_fly;

/// Parameters of both matchers
pub mod params;

/// Matching against a path loaded from a file
pub mod static_path;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use on_the_fly::OnTheFlyPathMatching;
pub use params::{OnTheFlyParams, StaticPathParams};
pub use static_path::{PathMatchingError, StaticPathMatching};

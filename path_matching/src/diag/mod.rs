//! # Diagnostics
//!
//! Health reporting of the path matching: liveness of the localisation feeds and status of the
//! last matching attempt. Reports are built on demand by the [`HealthMonitor`] and consumed by
//! whatever supervises the vehicle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod monitor;
pub mod rate;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{collections::BTreeMap, fmt, ops::AddAssign};

use serde::Serialize;

pub use monitor::{FeedId, HealthMonitor};
pub use rate::{FeedParams, FeedState, RateCheckup};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Severity of a single diagnostic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum DiagnosticStatus {
    Ok,
    Error,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub status: DiagnosticStatus,
    pub message: String,
}

/// A list of diagnostics plus a set of named values describing the state of the system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    pub diagnostics: Vec<Diagnostic>,
    pub info: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Diagnostic {
    pub fn new<S: Into<String>>(status: DiagnosticStatus, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self::new(DiagnosticStatus::Ok, message)
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self::new(DiagnosticStatus::Error, message)
    }
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Set the value of an info entry, replacing any previous value.
    pub fn set_info<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.info.insert(key.into(), value.into());
    }

    pub fn info(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(|v| v.as_str())
    }

    /// Returns `true` if no diagnostic is in error.
    pub fn is_ok(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.status == DiagnosticStatus::Ok)
    }
}

impl AddAssign<&DiagnosticReport> for DiagnosticReport {
    /// Diagnostics are concatenated, info entries of `other` override those of `self`.
    fn add_assign(&mut self, other: &DiagnosticReport) {
        self.diagnostics.extend(other.diagnostics.iter().cloned());
        for (key, value) in other.info.iter() {
            self.info.insert(key.clone(), value.clone());
        }
    }
}

impl AddAssign for DiagnosticReport {
    fn add_assign(&mut self, other: DiagnosticReport) {
        self.diagnostics.extend(other.diagnostics);
        self.info.extend(other.info);
    }
}

impl fmt::Display for DiagnosticStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Diagnostics:")?;
        for d in self.diagnostics.iter() {
            writeln!(f, "  [{}] {}", d.status, d.message)?;
        }
        write!(f, "Info:")?;
        for (key, value) in self.info.iter() {
            write!(f, "\n  {}: {}", key, value)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

//! Admission gates evaluated before any download side effect
//!
//! - [`WhitelistGate`] - exact host match against permitted domains
//! - [`DiskSpaceGate`] - free bytes on the target filesystem vs a threshold

mod disk;
mod whitelist;

pub use disk::{DiskSpaceGate, FsSpaceProbe, SpaceProbe};
pub use whitelist::WhitelistGate;

use std::fmt;

/// What a gate looked at when deciding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionSubject {
    /// Host of the requested URL (empty when it could not be parsed)
    Domain(String),
    BytesFree { free: u64, threshold: u64 },
    /// No threshold configured
    Unlimited,
    ProbeFailed(String),
}

/// Outcome of an admission gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub admitted: bool,
    pub subject: AdmissionSubject,
}

impl AdmissionDecision {
    pub fn admit(subject: AdmissionSubject) -> Self {
        Self {
            admitted: true,
            subject,
        }
    }

    pub fn reject(subject: AdmissionSubject) -> Self {
        Self {
            admitted: false,
            subject,
        }
    }
}

impl fmt::Display for AdmissionSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionSubject::Domain(domain) => write!(f, "domain '{}'", domain),
            AdmissionSubject::BytesFree { free, threshold } => {
                write!(f, "{} bytes free (threshold {} bytes)", free, threshold)
            }
            AdmissionSubject::Unlimited => write!(f, "no threshold configured"),
            AdmissionSubject::ProbeFailed(reason) => {
                write!(f, "free space unknown: {}", reason)
            }
        }
    }
}

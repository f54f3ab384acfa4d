use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{AdmissionDecision, AdmissionSubject};
use crate::humanize::ByteSize;

/// Source of free-space figures for a directory
pub trait SpaceProbe: Send + Sync {
    fn bytes_free(&self, directory: &Path) -> io::Result<u64>;
}

/// Space available to the current user on the filesystem holding `directory`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSpaceProbe;

impl SpaceProbe for FsSpaceProbe {
    fn bytes_free(&self, directory: &Path) -> io::Result<u64> {
        fs2::available_space(directory)
    }
}

/// Refuses work when free space is at or below a threshold
#[derive(Clone)]
pub struct DiskSpaceGate {
    threshold: Option<ByteSize>,
    probe: Arc<dyn SpaceProbe>,
}

impl DiskSpaceGate {
    pub fn new(threshold: Option<ByteSize>) -> Self {
        Self::with_probe(threshold, Arc::new(FsSpaceProbe))
    }

    pub fn with_probe(threshold: Option<ByteSize>, probe: Arc<dyn SpaceProbe>) -> Self {
        Self { threshold, probe }
    }

    pub fn threshold(&self) -> Option<ByteSize> {
        self.threshold
    }

    /// Free bytes must be strictly greater than the threshold.
    pub fn check(&self, directory: &Path) -> AdmissionDecision {
        let Some(threshold) = self.threshold else {
            return AdmissionDecision::admit(AdmissionSubject::Unlimited);
        };

        match self.probe.bytes_free(directory) {
            Ok(free) => {
                let subject = AdmissionSubject::BytesFree {
                    free,
                    threshold: threshold.as_u64(),
                };
                debug!(
                    dir = %directory.display(),
                    free,
                    threshold = threshold.as_u64(),
                    "Checked free space"
                );
                if free > threshold.as_u64() {
                    AdmissionDecision::admit(subject)
                } else {
                    AdmissionDecision::reject(subject)
                }
            }
            Err(e) => {
                warn!(dir = %directory.display(), error = %e, "Could not determine free space");
                AdmissionDecision::reject(AdmissionSubject::ProbeFailed(e.to_string()))
            }
        }
    }

    pub fn within_threshold(&self, directory: &Path) -> bool {
        self.check(directory).admitted
    }
}

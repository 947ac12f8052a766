//! Permission filtering seam
//!
//! Policy evaluation lives outside this crate; a resolver only reports what
//! the current actor may read, expressed as a criterion.

use crate::search::criterion::Criterion;
use std::collections::BTreeSet;

/// Resolves read permissions of the current actor into a criterion
pub trait PermissionResolver: Send + Sync {
    /// Criterion limiting results to readable items; `None` means unrestricted
    fn permission_criterion(&self) -> Option<Criterion>;
}

/// Grants read access to everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionResolver for AllowAll {
    fn permission_criterion(&self) -> Option<Criterion> {
        None
    }
}

/// Grants read access to the listed sections only
#[derive(Debug, Clone, Default)]
pub struct SectionPermissions {
    readable: BTreeSet<u64>,
}

impl SectionPermissions {
    pub fn new(readable: impl IntoIterator<Item = u64>) -> Self {
        Self {
            readable: readable.into_iter().collect(),
        }
    }
}

impl PermissionResolver for SectionPermissions {
    fn permission_criterion(&self) -> Option<Criterion> {
        if self.readable.is_empty() {
            Some(Criterion::MatchNone)
        } else {
            Some(Criterion::SectionId(self.readable.iter().copied().collect()))
        }
    }
}

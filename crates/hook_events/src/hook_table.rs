//! In-process [`PatchProvider`] backed by a routing table
//!
//! Hosts that can consult a table before running a member use this instead
//! of rewriting code: the host asks [`HookTable::is_active`] and routes
//! through [`Interceptors`](crate::Interceptors) only when the point is
//! installed. Each installed point remembers the identity that installed it,
//! so removal under a stale identity is rejected instead of silently
//! tearing down a newer install.

use crate::error::PatchError;
use crate::intercept::{interception_catalog, InterceptionPoint};
use crate::patch::{ExclusionList, PatchId, PatchProvider, PatchTarget};
use dashmap::DashMap;
use tracing::{debug, trace};

/// Installed interception points, keyed by host member
#[derive(Debug)]
pub struct HookTable {
    catalog: Vec<InterceptionPoint>,
    installed: DashMap<PatchTarget, PatchId>,
}

impl HookTable {
    /// A table that installs every point of [`interception_catalog`]
    pub fn new() -> Self {
        Self::with_catalog(interception_catalog())
    }

    /// A table that installs only the given points
    pub fn with_catalog(catalog: Vec<InterceptionPoint>) -> Self {
        Self {
            catalog,
            installed: DashMap::new(),
        }
    }

    /// Whether the host should route `target::member` through the interceptors
    pub fn is_active(&self, target: &str, member: &str) -> bool {
        self.installed.contains_key(&PatchTarget::new(target, member))
    }

    /// Identity that owns an installed point
    pub fn owner(&self, target: &PatchTarget) -> Option<PatchId> {
        self.installed.get(target).map(|entry| entry.value().clone())
    }

    /// Number of points installed right now
    pub fn installed_count(&self) -> usize {
        self.installed.len()
    }

    /// Installed points, sorted
    pub fn installed(&self) -> Vec<PatchTarget> {
        let mut points: Vec<PatchTarget> = self.installed.iter().map(|entry| entry.key().clone()).collect();
        points.sort();
        points
    }
}

impl Default for HookTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchProvider for HookTable {
    fn apply_all(&self, id: &PatchId, exclusions: &ExclusionList) -> Result<usize, PatchError> {
        // Refuse before touching anything so a collision never leaves a half-applied set.
        for point in &self.catalog {
            if let Some(owner) = self.installed.get(&point.target) {
                if owner.value() != id {
                    return Err(PatchError::Conflict {
                        target: point.target.to_string(),
                        owner: owner.value().to_string(),
                    });
                }
            }
        }

        let mut count = 0;
        for point in &self.catalog {
            if exclusions.contains(&point.target) {
                debug!("Skipping excluded interception point {}", point.target);
                continue;
            }
            self.installed.insert(point.target.clone(), id.clone());
            trace!("Installed {} -> {} under '{}'", point.target, point.channel, id);
            count += 1;
        }
        Ok(count)
    }

    fn remove_all(&self, id: &PatchId) -> Result<(), PatchError> {
        self.installed.retain(|_, owner| owner != id);
        Ok(())
    }

    fn remove_one(&self, target: &PatchTarget, id: &PatchId) -> Result<(), PatchError> {
        match self.installed.remove_if(target, |_, owner| owner == id) {
            Some(_) => Ok(()),
            None => match self.installed.get(target) {
                Some(owner) => Err(PatchError::Conflict {
                    target: target.to_string(),
                    owner: owner.value().to_string(),
                }),
                None => Err(PatchError::NotInstalled {
                    target: target.to_string(),
                    id: id.to_string(),
                }),
            },
        }
    }
}

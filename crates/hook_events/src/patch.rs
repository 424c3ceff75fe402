//! Patch lifecycle: installing and removing host interception points
//!
//! The technology that actually intercepts host calls sits behind
//! [`PatchProvider`]. This module owns the state machine around it:
//!
//! ```text
//! Unpatched --install_all (ok)--> Patched(epoch n) --uninstall_all--> Unpatched
//! Patched   --install_all-------> PatchError::AlreadyInstalled
//! ```
//!
//! Every install gets a fresh [`PatchId`] built from an epoch drawn from one
//! process-wide counter. Identities never repeat, even across managers, so a
//! reload or a rebuilt manager never collides with points left by an earlier
//! cycle, and removal always names the identity the points were installed under.

use crate::error::PatchError;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Prefix of every patch identity produced by this layer
pub const PATCH_ID_PREFIX: &str = "hook_events.events";

/// Next epoch to hand out, shared by every manager in the process
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

fn next_epoch() -> u64 {
    NEXT_EPOCH.fetch_add(1, Ordering::Relaxed)
}

/// A host member an interception point attaches to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchTarget {
    /// Host type, e.g. `HostRoundManager`
    pub target: CompactString,
    /// Member on that type, e.g. `EndRound`
    pub member: CompactString,
}

impl PatchTarget {
    pub fn new(target: &str, member: &str) -> Self {
        Self {
            target: CompactString::new(target),
            member: CompactString::new(member),
        }
    }
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.target, self.member)
    }
}

/// Interception points that must not be installed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    entries: BTreeSet<PatchTarget>,
}

impl ExclusionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: PatchTarget) -> bool {
        self.entries.insert(target)
    }

    pub fn contains(&self, target: &PatchTarget) -> bool {
        self.entries.contains(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatchTarget> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Both lists combined
    pub fn union(&self, other: &ExclusionList) -> ExclusionList {
        ExclusionList {
            entries: self.entries.union(&other.entries).cloned().collect(),
        }
    }
}

impl FromIterator<PatchTarget> for ExclusionList {
    fn from_iter<I: IntoIterator<Item = PatchTarget>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Identity of one install cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId {
    epoch: u64,
    id: String,
}

impl PatchId {
    fn for_epoch(epoch: u64) -> Self {
        Self {
            epoch,
            id: format!("{}.{}", PATCH_ID_PREFIX, epoch),
        }
    }

    /// The epoch this identity was built from. Greater epochs were handed out later.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The textual identity, `hook_events.events.{epoch}`
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// The capability that applies and removes interception points in the host
pub trait PatchProvider: Send + Sync {
    /// Installs every eligible point not in `exclusions` under `id`. Returns the number installed.
    fn apply_all(&self, id: &PatchId, exclusions: &ExclusionList) -> Result<usize, PatchError>;

    /// Removes every point installed under `id`
    fn remove_all(&self, id: &PatchId) -> Result<(), PatchError>;

    /// Removes a single point installed under `id`
    fn remove_one(&self, target: &PatchTarget, id: &PatchId) -> Result<(), PatchError>;
}

/// Where the patch lifecycle currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchState {
    Unpatched,
    Patched(PatchId),
}

/// Drives a [`PatchProvider`] through install/uninstall cycles
pub struct PatchManager {
    provider: Arc<dyn PatchProvider>,
    exclusions: ExclusionList,
    suppressed: ExclusionList,
    /// Exclusions handed to the provider by the current install
    applied: ExclusionList,
    epoch: u64,
    installs: u64,
    state: PatchState,
    verbose: bool,
}

impl PatchManager {
    /// Creates an unpatched manager.
    ///
    /// # Arguments
    ///
    /// * `provider` - The capability that actually installs interception points
    /// * `exclusions` - Points never to install, usually from configuration
    pub fn new(provider: Arc<dyn PatchProvider>, exclusions: ExclusionList) -> Self {
        Self {
            provider,
            exclusions,
            suppressed: ExclusionList::new(),
            applied: ExclusionList::new(),
            epoch: 0,
            installs: 0,
            state: PatchState::Unpatched,
            verbose: false,
        }
    }

    /// Logs each lifecycle step at info instead of debug
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Installs every interception point under a new identity.
    ///
    /// The epoch is drawn before the provider is called, so even a failed
    /// attempt consumes its identity. On failure the manager stays unpatched.
    ///
    /// # Returns
    ///
    /// The identity the points were installed under, or
    /// [`PatchError::AlreadyInstalled`] when this manager is already patched.
    pub fn install_all(&mut self) -> Result<PatchId, PatchError> {
        if let PatchState::Patched(id) = &self.state {
            return Err(PatchError::AlreadyInstalled(id.to_string()));
        }

        self.epoch = next_epoch();
        let id = PatchId::for_epoch(self.epoch);
        let exclusions = self.exclusions.union(&self.suppressed);

        match self.provider.apply_all(&id, &exclusions) {
            Ok(count) => {
                self.installs += 1;
                self.applied = exclusions.clone();
                self.trace(&format!(
                    "Events patched successfully under '{}' ({} points, {} excluded)",
                    id,
                    count,
                    exclusions.len()
                ));
                self.state = PatchState::Patched(id.clone());
                Ok(id)
            }
            Err(e) => {
                error!("❌ Patching failed! {}", e);
                Err(e)
            }
        }
    }

    /// Removes everything installed under the current identity. No-op when unpatched.
    pub fn uninstall_all(&mut self) -> Result<(), PatchError> {
        let PatchState::Patched(id) = &self.state else {
            debug!("Uninstall requested while unpatched, nothing to do");
            return Ok(());
        };

        self.trace("Unpatching events...");
        if let Err(e) = self.provider.remove_all(id) {
            error!("❌ Unpatching '{}' failed! {}", id, e);
            return Err(e);
        }

        self.trace(&format!("All events under '{}' have been unpatched", id));
        self.state = PatchState::Unpatched;
        self.applied = ExclusionList::new();
        Ok(())
    }

    /// Removes each excluded point that is currently installed.
    ///
    /// Points the current install already skipped are not touched. A point
    /// removed this way stays suppressed for the lifetime of this manager,
    /// including later install cycles. Every point is attempted; the last
    /// failure, if any, is returned.
    ///
    /// # Returns
    ///
    /// The number of points removed. `Ok(0)` while unpatched.
    pub fn reapply_exclusions(&mut self) -> Result<usize, PatchError> {
        let PatchState::Patched(id) = &self.state else {
            return Ok(0);
        };
        let id = id.clone();

        let mut removed = 0;
        let mut last_error = None;
        let pending: Vec<PatchTarget> = self
            .exclusions
            .iter()
            .filter(|t| !self.applied.contains(t))
            .cloned()
            .collect();

        for target in pending {
            match self.provider.remove_one(&target, &id) {
                Ok(()) => {
                    info!("🚫 Disabled patch {} until restart", target);
                    self.applied.insert(target.clone());
                    self.suppressed.insert(target);
                    removed += 1;
                }
                Err(e) => {
                    warn!("⚠️ Could not disable patch {}: {}", target, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Adds a point to the exclusion list. Takes effect on the next
    /// [`reapply_exclusions`](Self::reapply_exclusions) or install.
    pub fn exclude(&mut self, target: PatchTarget) -> bool {
        self.exclusions.insert(target)
    }

    /// Current lifecycle state
    pub fn state(&self) -> &PatchState {
        &self.state
    }

    pub fn is_patched(&self) -> bool {
        matches!(self.state, PatchState::Patched(_))
    }

    /// Identity of the current install, if any
    pub fn current_id(&self) -> Option<&PatchId> {
        match &self.state {
            PatchState::Patched(id) => Some(id),
            PatchState::Unpatched => None,
        }
    }

    /// Epoch of this manager's latest install attempt; 0 before the first.
    ///
    /// Epochs come from a process-wide counter, so consecutive installs of
    /// one manager are increasing but not necessarily adjacent.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of successful installs made by this manager
    pub fn installs(&self) -> u64 {
        self.installs
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    /// Points removed by [`reapply_exclusions`](Self::reapply_exclusions)
    pub fn suppressed(&self) -> &ExclusionList {
        &self.suppressed
    }

    fn trace(&self, message: &str) {
        if self.verbose {
            info!("🔧 {}", message);
        } else {
            debug!("{}", message);
        }
    }
}

impl fmt::Debug for PatchManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchManager")
            .field("state", &self.state)
            .field("epoch", &self.epoch)
            .field("installs", &self.installs)
            .field("exclusions", &self.exclusions.len())
            .field("suppressed", &self.suppressed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedProvider {
        fail_apply: AtomicBool,
        fail_remove: AtomicBool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PatchProvider for ScriptedProvider {
        fn apply_all(&self, id: &PatchId, exclusions: &ExclusionList) -> Result<usize, PatchError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("apply {} excluding {}", id, exclusions.len()));
            if self.fail_apply.load(Ordering::SeqCst) {
                return Err(PatchError::Provider("assembly locked".into()));
            }
            Ok(10 - exclusions.len())
        }

        fn remove_all(&self, id: &PatchId) -> Result<(), PatchError> {
            self.calls.lock().unwrap().push(format!("remove {}", id));
            if self.fail_remove.load(Ordering::SeqCst) {
                return Err(PatchError::Provider("still in use".into()));
            }
            Ok(())
        }

        fn remove_one(&self, target: &PatchTarget, id: &PatchId) -> Result<(), PatchError> {
            self.calls.lock().unwrap().push(format!("remove {} from {}", target, id));
            Ok(())
        }
    }

    fn manager(exclusions: ExclusionList) -> (PatchManager, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::default());
        (PatchManager::new(provider.clone(), exclusions), provider)
    }

    #[test]
    fn uninstall_without_install_is_a_no_op() {
        let (mut patches, provider) = manager(ExclusionList::new());

        assert_eq!(patches.uninstall_all(), Ok(()));
        assert_eq!(patches.state(), &PatchState::Unpatched);
        assert_eq!(patches.epoch(), 0);
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn every_cycle_gets_a_greater_epoch() {
        let (mut patches, provider) = manager(ExclusionList::new());
        let mut ids = Vec::new();

        for _ in 0..5 {
            let id = patches.install_all().unwrap();
            patches.uninstall_all().unwrap();
            ids.push(id);
        }

        assert!(ids.windows(2).all(|w| w[1].epoch() > w[0].epoch()));
        assert_eq!(patches.installs(), 5);
        assert_eq!(ids[0].as_str(), format!("hook_events.events.{}", ids[0].epoch()));
        assert_eq!(
            provider.calls()[..2],
            [
                format!("apply {} excluding 0", ids[0]),
                format!("remove {}", ids[0]),
            ]
        );
    }

    #[test]
    fn separate_managers_never_share_an_identity() {
        let (mut first, _) = manager(ExclusionList::new());
        let (mut second, _) = manager(ExclusionList::new());

        let a = first.install_all().unwrap();
        let b = second.install_all().unwrap();

        assert_ne!(a, b);
        assert!(b.epoch() > a.epoch());
    }

    #[test]
    fn install_while_patched_is_refused() {
        let (mut patches, _) = manager(ExclusionList::new());
        let id = patches.install_all().unwrap();

        assert_eq!(
            patches.install_all(),
            Err(PatchError::AlreadyInstalled(id.to_string()))
        );
        assert_eq!(patches.current_id(), Some(&id));
    }

    #[test]
    fn failed_install_leaves_the_manager_unpatched_and_consumes_the_epoch() {
        let (mut patches, provider) = manager(ExclusionList::new());
        provider.fail_apply.store(true, Ordering::SeqCst);

        assert!(patches.install_all().is_err());
        assert!(!patches.is_patched());
        let consumed = patches.epoch();
        assert!(consumed > 0);
        assert_eq!(patches.installs(), 0);

        provider.fail_apply.store(false, Ordering::SeqCst);
        assert!(patches.install_all().unwrap().epoch() > consumed);
    }

    #[test]
    fn failed_uninstall_keeps_the_current_identity() {
        let (mut patches, provider) = manager(ExclusionList::new());
        let id = patches.install_all().unwrap();
        provider.fail_remove.store(true, Ordering::SeqCst);

        assert!(patches.uninstall_all().is_err());
        assert_eq!(patches.current_id(), Some(&id));
    }

    #[test]
    fn reapplied_exclusions_stay_suppressed_across_cycles() {
        let (mut patches, provider) = manager(ExclusionList::new());
        let first = patches.install_all().unwrap();

        let end_round = PatchTarget::new("HostRoundManager", "EndRound");
        patches.exclude(end_round.clone());
        assert_eq!(patches.reapply_exclusions(), Ok(1));
        assert_eq!(patches.reapply_exclusions(), Ok(0));
        assert!(patches.suppressed().contains(&end_round));

        patches.uninstall_all().unwrap();
        let second = patches.install_all().unwrap();

        let calls = provider.calls();
        assert!(calls.contains(&format!("remove HostRoundManager::EndRound from {}", first)));
        assert_eq!(calls.last().unwrap(), &format!("apply {} excluding 1", second));
    }

    #[test]
    fn configured_exclusions_are_not_removed_again() {
        let configured = PatchTarget::new("HostRoundManager", "EndRound");
        let (mut patches, provider) = manager([configured.clone()].into_iter().collect());
        let id = patches.install_all().unwrap();

        let drop_item = PatchTarget::new("HostInventory", "DropItem");
        patches.exclude(drop_item.clone());

        assert_eq!(patches.reapply_exclusions(), Ok(1));
        assert_eq!(patches.reapply_exclusions(), Ok(0));
        let removals: Vec<String> = provider
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("remove "))
            .collect();
        assert_eq!(removals, vec![format!("remove {} from {}", drop_item, id)]);
        assert!(!patches.suppressed().contains(&configured));
    }

    #[test]
    fn reapply_while_unpatched_does_nothing() {
        let exclusions: ExclusionList = [PatchTarget::new("HostInventory", "DropItem")].into_iter().collect();
        let (mut patches, provider) = manager(exclusions);

        assert_eq!(patches.reapply_exclusions(), Ok(0));
        assert!(provider.calls().is_empty());
    }
}

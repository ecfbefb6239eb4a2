use crate::core::validator;
use crate::models::error::SError;
use crate::models::mod_dto::{LocalMod, RemoteMod, UnsafeLocalMod};
use crate::models::transition::{Lifecycle, Phase};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Immutable view of every known mod at one revision.
///
/// Local records are keyed by unique name, except invalid records and second
/// copies of an already taken unique name, which are keyed by their path.
#[derive(Clone, Debug, Default)]
pub struct RegistrySnapshot {
    pub revision: u64,
    pub local_revision: u64,
    pub remote_revision: u64,
    pub local: BTreeMap<String, UnsafeLocalMod>,
    pub remote: BTreeMap<String, RemoteMod>,
    by_name: BTreeMap<String, Vec<String>>,
}

impl RegistrySnapshot {
    /// Keys, indexes and validates a set of scanned records.
    pub fn build(records: Vec<UnsafeLocalMod>, remote: BTreeMap<String, RemoteMod>) -> Self {
        let mut snapshot = Self {
            local: assign_keys(records),
            remote,
            ..Default::default()
        };
        snapshot.reindex();
        snapshot.stamp_errors();
        snapshot
    }

    fn reindex(&mut self) {
        let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, record) in &self.local {
            if let Some(name) = record.unique_name() {
                by_name.entry(name.to_string()).or_default().push(key.clone());
            }
        }
        // The copy keyed by its unique name is the primary one.
        for (name, keys) in by_name.iter_mut() {
            keys.sort_by_key(|k| k != name);
        }
        self.by_name = by_name;
    }

    fn stamp_errors(&mut self) {
        let computed: Vec<(String, Vec<_>)> = self
            .local
            .iter()
            .filter_map(|(key, record)| {
                record
                    .as_valid()
                    .map(|m| (key.clone(), validator::check_mod(m, self)))
            })
            .collect();

        for (key, errors) in computed {
            if let Some(UnsafeLocalMod::Valid(m)) = self.local.get_mut(&key) {
                m.errors = errors;
            }
        }
    }

    /// Record by registry key (unique name or path).
    pub fn get(&self, key: &str) -> Option<&UnsafeLocalMod> {
        self.local.get(key)
    }

    /// The primary valid record for a unique name.
    pub fn find(&self, unique_name: &str) -> Option<&LocalMod> {
        self.copies(unique_name).next()
    }

    /// Every valid record declaring this unique name, primary first.
    pub fn copies<'a>(&'a self, unique_name: &str) -> impl Iterator<Item = &'a LocalMod> + 'a {
        self.by_name
            .get(unique_name)
            .into_iter()
            .flatten()
            .filter_map(|key| self.local.get(key).and_then(UnsafeLocalMod::as_valid))
    }

    pub fn is_installed(&self, unique_name: &str) -> bool {
        self.by_name.contains_key(unique_name)
    }

    pub fn is_enabled(&self, unique_name: &str) -> bool {
        self.copies(unique_name).any(|m| m.enabled)
    }

    pub fn remote(&self, unique_name: &str) -> Option<&RemoteMod> {
        self.remote.get(unique_name)
    }

    pub fn valid_mods(&self) -> impl Iterator<Item = &LocalMod> {
        self.local.values().filter_map(UnsafeLocalMod::as_valid)
    }

    pub fn records(&self) -> Vec<UnsafeLocalMod> {
        self.local.values().cloned().collect()
    }
}

fn assign_keys(mut records: Vec<UnsafeLocalMod>) -> BTreeMap<String, UnsafeLocalMod> {
    records.sort_by(|a, b| a.mod_path().cmp(b.mod_path()));

    let mut keyed = BTreeMap::new();
    for record in records {
        let key = match record.unique_name() {
            Some(name) if !keyed.contains_key(name) => name.to_string(),
            _ => record.mod_path().to_string(),
        };
        keyed.insert(key, record);
    }
    keyed
}

/// Single owner of mod records. Readers take cheap snapshots; writers build a
/// new snapshot and swap it in whole.
pub struct ModRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    writer: Mutex<()>,
    in_flight: Mutex<HashMap<String, Phase>>,
    revision_tx: watch::Sender<u64>,
}

impl ModRegistry {
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
            writer: Mutex::new(()),
            in_flight: Mutex::new(HashMap::new()),
            revision_tx,
        }
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().clone()
    }

    /// Receives the revision number after every publish.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    fn publish(
        &self,
        local_changed: bool,
        f: impl FnOnce(&RegistrySnapshot) -> (Vec<UnsafeLocalMod>, BTreeMap<String, RemoteMod>),
    ) -> Arc<RegistrySnapshot> {
        let _writer = self.writer.lock();
        let old = self.snapshot();
        let (records, remote) = f(&old);

        let mut next = RegistrySnapshot::build(records, remote);
        next.revision = old.revision + 1;
        next.local_revision = old.local_revision + u64::from(local_changed);
        next.remote_revision = old.remote_revision + u64::from(!local_changed);

        let next = Arc::new(next);
        *self.current.write() = next.clone();
        self.revision_tx.send_replace(next.revision);
        debug!(revision = next.revision, "Published registry snapshot");
        next
    }

    /// Replaces every local record, e.g. after a directory scan.
    pub fn replace_local(&self, records: Vec<UnsafeLocalMod>) -> Arc<RegistrySnapshot> {
        self.publish(true, |old| (records, old.remote.clone()))
    }

    /// Replaces the catalog after a refresh.
    pub fn replace_remote(&self, remote: BTreeMap<String, RemoteMod>) -> Arc<RegistrySnapshot> {
        self.publish(false, |old| (old.records(), remote))
    }

    /// Applies an edit to the local records and republishes them validated.
    pub fn update_local(
        &self,
        edit: impl FnOnce(&mut Vec<UnsafeLocalMod>),
    ) -> Arc<RegistrySnapshot> {
        self.publish(true, |old| {
            let mut records = old.records();
            edit(&mut records);
            (records, old.remote.clone())
        })
    }

    /// Claims `unique_name` for one transition. Fails if another one holds it.
    pub fn begin(&self, unique_name: &str, phase: Phase) -> Result<TransitionGuard<'_>, SError> {
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains_key(unique_name) {
            return Err(SError::TransitionInProgress(unique_name.to_string()));
        }
        in_flight.insert(unique_name.to_string(), phase);
        Ok(TransitionGuard {
            registry: self,
            unique_name: unique_name.to_string(),
        })
    }

    pub fn phase_of(&self, unique_name: &str) -> Option<Phase> {
        self.in_flight.lock().get(unique_name).copied()
    }

    pub fn lifecycle(&self, unique_name: &str) -> Lifecycle {
        if let Some(phase) = self.phase_of(unique_name) {
            return Lifecycle::Transitioning(phase);
        }
        let snapshot = self.snapshot();
        if snapshot.is_enabled(unique_name) {
            Lifecycle::Enabled
        } else if snapshot.is_installed(unique_name) || snapshot.get(unique_name).is_some() {
            Lifecycle::Disabled
        } else {
            Lifecycle::Removed
        }
    }
}

impl Default for ModRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of a transition; releases the mod on drop.
pub struct TransitionGuard<'a> {
    registry: &'a ModRegistry,
    unique_name: String,
}

impl TransitionGuard<'_> {
    pub fn set_phase(&self, phase: Phase) {
        self.registry
            .in_flight
            .lock()
            .insert(self.unique_name.clone(), phase);
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.registry.in_flight.lock().remove(&self.unique_name);
    }
}

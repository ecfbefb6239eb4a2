use crate::core::registry::RegistrySnapshot;
use crate::core::validator::{self, ValidationReport};
use parking_lot::Mutex;
use std::sync::Arc;

/// Remembers the last validation report, keyed on the local and remote
/// revisions it was computed from.
#[derive(Default)]
pub struct ValidationCache {
    last: Mutex<Option<((u64, u64), Arc<ValidationReport>)>>,
}

impl ValidationCache {
    pub fn get_or_compute(&self, snapshot: &RegistrySnapshot) -> Arc<ValidationReport> {
        let key = (snapshot.local_revision, snapshot.remote_revision);
        let mut last = self.last.lock();

        if let Some((cached_key, report)) = last.as_ref() {
            if *cached_key == key {
                return report.clone();
            }
        }

        let report = Arc::new(validator::validate(snapshot));
        *last = Some((key, report.clone()));
        report
    }
}

//! Registry of monitored deployments

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::models::deployment::DeploymentRecord;

/// A record shared between its poller (the only writer) and any number of readers
pub type SharedRecord = Arc<RwLock<DeploymentRecord>>;

/// Read a shared record, recovering from a poisoned lock
pub fn read_record(record: &SharedRecord) -> std::sync::RwLockReadGuard<'_, DeploymentRecord> {
    record.read().unwrap_or_else(|e| e.into_inner())
}

/// Write a shared record, recovering from a poisoned lock
pub fn write_record(record: &SharedRecord) -> std::sync::RwLockWriteGuard<'_, DeploymentRecord> {
    record.write().unwrap_or_else(|e| e.into_inner())
}

/// Store of what is being monitored right now
pub trait Registry: Send + Sync {
    /// Insert or replace the record for an operation
    fn put(&self, operation_id: &str, record: SharedRecord);

    fn get(&self, operation_id: &str) -> Option<SharedRecord>;

    fn remove(&self, operation_id: &str) -> Option<SharedRecord>;

    /// Remove the entry only if it still holds `record`
    fn remove_if_same(&self, operation_id: &str, record: &SharedRecord) -> bool;

    /// Snapshot of every tracked record
    fn list_all(&self) -> HashMap<String, DeploymentRecord>;

    /// Snapshot of one record
    fn snapshot(&self, operation_id: &str) -> Option<DeploymentRecord> {
        self.get(operation_id).map(|r| read_record(&r).clone())
    }
}

/// In-memory registry
#[derive(Default)]
pub struct InMemoryRegistry {
    entries: RwLock<HashMap<String, SharedRecord>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Registry for InMemoryRegistry {
    fn put(&self, operation_id: &str, record: SharedRecord) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(operation_id.to_string(), record);
    }

    fn get(&self, operation_id: &str) -> Option<SharedRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(operation_id).cloned()
    }

    fn remove(&self, operation_id: &str) -> Option<SharedRecord> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(operation_id)
    }

    fn remove_if_same(&self, operation_id: &str, record: &SharedRecord) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get(operation_id) {
            Some(current) if Arc::ptr_eq(current, record) => {
                entries.remove(operation_id);
                true
            }
            _ => false,
        }
    }

    fn list_all(&self) -> HashMap<String, DeploymentRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|(id, record)| (id.clone(), read_record(record).clone()))
            .collect()
    }
}

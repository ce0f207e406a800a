//! In-memory stand-in for the parish data service.
//!
//! Mutations are async and can be slowed down or made to fail, so the
//! loading and refresh paths of the screen can be exercised without a
//! backend.

use super::{Sacrament, SacramentRecord};
use crate::screen::Enumeration;
use anyhow::{Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A failure injected into one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum StoreFault {
    /// The next mutation on the category fails, then the fault clears.
    NextMutation(String),
    /// Every fetch of the category fails until cleared.
    Fetches(String),
}

#[derive(Debug, Default)]
struct StoreInner {
    records: HashMap<Sacrament, Vec<SacramentRecord>>,
    faults: HashMap<Sacrament, Vec<StoreFault>>,
    next_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with a couple of entries in the main registers.
    pub fn with_sample_data() -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            let samples = [
                (Sacrament::Baptism, "Lucia Fernandez", "2023-04-09"),
                (Sacrament::Baptism, "Mateo Rossi", "2023-06-18"),
                (Sacrament::FirstCommunion, "Sofia Novak", "2024-05-05"),
                (Sacrament::Confirmation, "Daniel Okafor", "2024-10-20"),
                (Sacrament::Marriage, "Ines Duarte & Tomas Keller", "2022-09-03"),
                (Sacrament::Funeral, "Herbert Lang", "2024-01-27"),
            ];
            for (category, person, date) in samples {
                let id = next_record_id(&mut inner, category);
                inner
                    .records
                    .entry(category)
                    .or_default()
                    .push(SacramentRecord::new(id, category, person, date));
            }
        }
        store
    }

    /// Simulated round-trip time for every mutation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn inject(&self, category: Sacrament, fault: StoreFault) {
        debug!("Injecting store fault for {}: {:?}", category, fault);
        self.lock().faults.entry(category).or_default().push(fault);
    }

    pub fn clear_faults(&self, category: Sacrament) {
        self.lock().faults.remove(&category);
    }

    /// Current records of a category, as a list query would return them.
    pub fn fetch(&self, category: Sacrament) -> Result<Vec<SacramentRecord>> {
        let inner = self.lock();
        let failing = inner.faults.get(&category).and_then(|faults| {
            faults.iter().find_map(|fault| match fault {
                StoreFault::Fetches(message) => Some(message.clone()),
                StoreFault::NextMutation(_) => None,
            })
        });
        if let Some(message) = failing {
            bail!("fetching {} failed: {}", category, message);
        }
        Ok(inner.records.get(&category).cloned().unwrap_or_default())
    }

    pub fn get(&self, category: Sacrament, id: &str) -> Option<SacramentRecord> {
        self.lock()
            .records
            .get(&category)
            .and_then(|records| records.iter().find(|record| record.id == id).cloned())
    }

    pub async fn create(
        &self,
        category: Sacrament,
        person: &str,
        date: &str,
    ) -> Result<SacramentRecord> {
        self.round_trip(category).await?;
        let mut inner = self.lock();
        let id = next_record_id(&mut inner, category);
        let record = SacramentRecord::new(id, category, person, date);
        inner
            .records
            .entry(category)
            .or_default()
            .push(record.clone());
        debug!("Created {} record {}", category, record.id);
        Ok(record)
    }

    pub async fn update(&self, record: SacramentRecord) -> Result<SacramentRecord> {
        self.round_trip(record.category).await?;
        let mut inner = self.lock();
        let Some(existing) = inner
            .records
            .get_mut(&record.category)
            .and_then(|records| records.iter_mut().find(|r| r.id == record.id))
        else {
            bail!("{} record '{}' not found", record.category, record.id);
        };
        *existing = record.clone();
        Ok(record)
    }

    pub async fn delete(&self, category: Sacrament, id: &str) -> Result<()> {
        self.round_trip(category).await?;
        let mut inner = self.lock();
        let records = inner.records.entry(category).or_default();
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            bail!("{} record '{}' not found", category, id);
        }
        Ok(())
    }

    /// Issue a certificate number for a record.
    pub async fn issue_certificate(&self, category: Sacrament, id: &str) -> Result<String> {
        self.round_trip(category).await?;
        if self.get(category, id).is_none() {
            bail!("{} record '{}' not found", category, id);
        }
        Ok(format!("CERT-{}", id.to_ascii_uppercase()))
    }

    /// Export a category register; returns the number of rows written.
    pub async fn export(&self, category: Sacrament) -> Result<usize> {
        self.round_trip(category).await?;
        Ok(self.fetch(category)?.len())
    }

    async fn round_trip(&self, category: Sacrament) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut inner = self.lock();
        if let Some(faults) = inner.faults.get_mut(&category) {
            if let Some(position) = faults
                .iter()
                .position(|fault| matches!(fault, StoreFault::NextMutation(_)))
            {
                if let StoreFault::NextMutation(message) = faults.remove(position) {
                    bail!("{} mutation rejected: {}", category, message);
                }
            }
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn next_record_id(inner: &mut StoreInner, category: Sacrament) -> String {
    inner.next_id += 1;
    format!(
        "{}-{}",
        category.key().to_ascii_lowercase().replace('_', "-"),
        inner.next_id
    )
}

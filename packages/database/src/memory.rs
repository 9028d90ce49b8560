//! In-process incident store.
//!
//! Holds every incident in a `BTreeMap` behind a `tokio` read/write lock.
//! Used by the test suites and by the server's `memory` backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use crime_insights_analytics_models::{GroupCount, GroupKey, tally};
use crime_insights_database_models::{IncidentFilter, PageRequest};
use crime_insights_incident_models::{IncidentPatch, IncidentRecord, NewIncident};
use tokio::sync::RwLock;

use crate::{DbError, IncidentStore};

#[derive(Debug)]
struct State {
    next_id: i64,
    rows: BTreeMap<i64, IncidentRecord>,
}

impl State {
    fn insert(&mut self, incident: NewIncident) -> IncidentRecord {
        let id = self.next_id;
        self.next_id += 1;
        let record = IncidentRecord::from_new(id, incident, Utc::now());
        self.rows.insert(id, record.clone());
        record
    }
}

/// An incident store that lives in memory.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    /// Creates a store pre-filled with `incidents`.
    #[must_use]
    pub fn with_incidents(incidents: impl IntoIterator<Item = NewIncident>) -> Self {
        let mut state = State {
            next_id: 1,
            rows: BTreeMap::new(),
        };
        for incident in incidents {
            state.insert(incident);
        }
        Self {
            state: RwLock::new(state),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn create(&self, incident: &NewIncident) -> Result<IncidentRecord, DbError> {
        Ok(self.state.write().await.insert(incident.clone()))
    }

    async fn get(&self, id: i64) -> Result<Option<IncidentRecord>, DbError> {
        Ok(self.state.read().await.rows.get(&id).cloned())
    }

    async fn update(
        &self,
        id: i64,
        patch: &IncidentPatch,
    ) -> Result<Option<IncidentRecord>, DbError> {
        let mut state = self.state.write().await;
        Ok(state.rows.get_mut(&id).map(|record| {
            record.apply(patch, Utc::now());
            record.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<Option<IncidentRecord>, DbError> {
        Ok(self.state.write().await.rows.remove(&id))
    }

    async fn count(&self, filter: &IncidentFilter) -> Result<u64, DbError> {
        let state = self.state.read().await;
        Ok(state.rows.values().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn find(
        &self,
        filter: &IncidentFilter,
        page: &PageRequest,
    ) -> Result<Vec<IncidentRecord>, DbError> {
        let state = self.state.read().await;
        let mut rows: Vec<&IncidentRecord> =
            state.rows.values().filter(|r| filter.matches(r)).collect();
        rows.sort_by(|a, b| page.sort.compare(a, b));

        let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);

        Ok(rows.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn aggregate(
        &self,
        filter: &IncidentFilter,
        key: GroupKey,
    ) -> Result<Vec<GroupCount>, DbError> {
        let state = self.state.read().await;
        Ok(tally(
            state.rows.values().filter(|r| filter.matches(r)),
            key,
        ))
    }

    async fn insert_many(&self, incidents: &[NewIncident]) -> Result<u64, DbError> {
        let mut state = self.state.write().await;
        for incident in incidents {
            state.insert(incident.clone());
        }
        Ok(incidents.len() as u64)
    }

    async fn clear(&self) -> Result<u64, DbError> {
        let mut state = self.state.write().await;
        let removed = state.rows.len() as u64;
        state.rows.clear();
        Ok(removed)
    }
}

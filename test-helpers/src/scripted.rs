//! An in-memory [`ResourceService`] whose failures and timing are scripted by
//! the test.

use std::{
    collections::VecDeque,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use cms::{Activation, Failure, Resource, ResourceService};
use payloads::RecordId;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub is_active: bool,
}

impl Resource for Record {
    fn id(&self) -> RecordId {
        self.id
    }

    fn is_active(&self) -> Option<bool> {
        Some(self.is_active)
    }
}

pub fn record(id: i64, title: &str) -> Record {
    Record {
        id: RecordId(id),
        title: title.to_string(),
        is_active: true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub title: String,
}

pub fn draft(title: &str) -> Draft {
    Draft {
        title: title.to_string(),
    }
}

/// Failure with an optional message, like a rejected promise with or without
/// `message`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.as_deref().unwrap_or("scripted failure"))]
pub struct ScriptedError(pub Option<String>);

impl Failure for ScriptedError {
    fn message(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Backend double holding a list of [`Record`]s.
///
/// Filters are matched against titles; `"active"` selects active records.
pub struct ScriptedService {
    records: Mutex<Vec<Record>>,
    next_id: AtomicI64,
    failures: Mutex<VecDeque<ScriptedError>>,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    calls: Mutex<Vec<String>>,
    supports_activation: bool,
}

impl ScriptedService {
    pub fn new(records: Vec<Record>) -> Self {
        let next_id = records.iter().map(|r| r.id.0).max().unwrap_or(0) + 1;
        Self {
            records: Mutex::new(records),
            next_id: AtomicI64::new(next_id),
            failures: Mutex::new(VecDeque::new()),
            gates: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            supports_activation: false,
        }
    }

    pub fn with_activation(mut self) -> Self {
        self.supports_activation = true;
        self
    }

    /// Id the next create will assign.
    pub fn with_next_id(self, id: i64) -> Self {
        self.next_id.store(id, Ordering::SeqCst);
        self
    }

    /// Make the next call fail with `message`.
    pub fn fail_next(&self, message: Option<&str>) {
        let failure = ScriptedError(message.map(String::from));
        lock(&self.failures).push_back(failure);
    }

    /// Hold the next call until the returned sender fires (or is dropped).
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        lock(&self.gates).push_back(gate);
        release
    }

    /// Names of the calls made so far, e.g. `get_all(active)`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Backend-side records, independent of any store.
    pub fn records(&self) -> Vec<Record> {
        lock(&self.records).clone()
    }

    /// Record the call and wait for its gate, then report the scripted
    /// failure if one was queued.
    async fn enter(&self, call: String) -> Result<(), ScriptedError> {
        lock(&self.calls).push(call);
        let failure = lock(&self.failures).pop_front();
        let gate = lock(&self.gates).pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn set_active(
        &self,
        id: RecordId,
        active: bool,
    ) -> Result<(), ScriptedError> {
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ScriptedError(Some("Record not found".into())))?;
        record.is_active = active;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ResourceService for ScriptedService {
    type Item = Record;
    type Write = Draft;
    type Filter = String;
    type Error = ScriptedError;

    async fn get_all(
        &self,
        filters: Option<&String>,
    ) -> Result<Vec<Record>, ScriptedError> {
        let label = filters.map(String::as_str).unwrap_or("");
        self.enter(format!("get_all({label})")).await?;
        let records = lock(&self.records);
        Ok(records
            .iter()
            .filter(|r| match filters.map(String::as_str) {
                None => true,
                Some("active") => r.is_active,
                Some(term) => r.title.contains(term),
            })
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Record, ScriptedError> {
        self.enter(format!("get_by_id({id})")).await?;
        lock(&self.records)
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| ScriptedError(Some("Record not found".into())))
    }

    async fn create(&self, data: &Draft) -> Result<Record, ScriptedError> {
        self.enter(format!("create({})", data.title)).await?;
        let created = Record {
            id: RecordId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: data.title.clone(),
            is_active: true,
        };
        lock(&self.records).push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: RecordId,
        data: &Draft,
    ) -> Result<Record, ScriptedError> {
        self.enter(format!("update({id})")).await?;
        let mut records = lock(&self.records);
        match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                existing.title = data.title.clone();
                Ok(existing.clone())
            }
            // the backend knows records the store never listed
            None => Ok(Record {
                id,
                title: data.title.clone(),
                is_active: true,
            }),
        }
    }

    async fn delete(&self, id: RecordId) -> Result<(), ScriptedError> {
        self.enter(format!("delete({id})")).await?;
        lock(&self.records).retain(|r| r.id != id);
        Ok(())
    }

    fn activation(&self) -> Option<&dyn Activation<Error = ScriptedError>> {
        if self.supports_activation {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl Activation for ScriptedService {
    type Error = ScriptedError;

    async fn activate(&self, id: RecordId) -> Result<(), ScriptedError> {
        self.enter(format!("activate({id})")).await?;
        self.set_active(id, true)
    }

    async fn deactivate(&self, id: RecordId) -> Result<(), ScriptedError> {
        self.enter(format!("deactivate({id})")).await?;
        self.set_active(id, false)
    }
}

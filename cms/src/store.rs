//! Client-side state for one resource type.
//!
//! A [`ResourceStore`] wraps a [`ResourceService`] and keeps four pieces of
//! state in step with it: the last fetched list, a single "current" record,
//! a loading flag and the message of the last failure. Every operation follows
//! the same protocol:
//!
//! 1. set loading and clear the error,
//! 2. call the service,
//! 3. on success apply the operation's effect and return the result,
//! 4. on failure record the failure's message (or the operation's fallback
//!    wording) and hand the failure back to the caller,
//! 5. reset loading either way.
//!
//! The store is meant to be owned by a single task. Operations take `&self`,
//! so several of them may be in flight at once (for example under
//! `tokio::join!`); they then share one loading flag and one error slot and the
//! last one to settle wins.

use std::cell::{Cell, RefCell};

use payloads::RecordId;

use crate::service::{Failure, Resource, ResourceService};

/// Operations exposed by [`ResourceStore`], used for logging and fallback
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchAll,
    FetchById,
    Create,
    Update,
    Remove,
    Activate,
    Deactivate,
}

impl Operation {
    /// Message recorded when a failure carries none of its own.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::FetchAll => "Failed to load data",
            Self::FetchById => "Failed to load record",
            Self::Create => "Failed to create record",
            Self::Update => "Failed to update record",
            Self::Remove => "Failed to delete record",
            Self::Activate => "Failed to activate record",
            Self::Deactivate => "Failed to deactivate record",
        }
    }
}

/// Owned copy of a store's state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot<T> {
    pub items: Vec<T>,
    pub current_item: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct ResourceStore<S: ResourceService> {
    service: S,
    items: RefCell<Vec<S::Item>>,
    current_item: RefCell<Option<S::Item>>,
    is_loading: Cell<bool>,
    error: RefCell<Option<String>>,
}

/// State accessors
impl<S: ResourceService> ResourceStore<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            items: RefCell::new(Vec::new()),
            current_item: RefCell::new(None),
            is_loading: Cell::new(false),
            error: RefCell::new(None),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn items(&self) -> Vec<S::Item> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Look up a record in the list without going to the backend.
    pub fn find(&self, id: RecordId) -> Option<S::Item> {
        self.items.borrow().iter().find(|item| item.id() == id).cloned()
    }

    pub fn current_item(&self) -> Option<S::Item> {
        self.current_item.borrow().clone()
    }

    /// Replace the current record directly, e.g. when a form is opened for a
    /// row that is already in the list.
    pub fn set_current_item(&self, item: Option<S::Item>) {
        *self.current_item.borrow_mut() = item;
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.get()
    }

    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn clear_error(&self) {
        *self.error.borrow_mut() = None;
    }

    pub fn snapshot(&self) -> StoreSnapshot<S::Item> {
        StoreSnapshot {
            items: self.items(),
            current_item: self.current_item(),
            is_loading: self.is_loading(),
            error: self.error(),
        }
    }
}

/// Operations
impl<S: ResourceService> ResourceStore<S> {
    /// Replace the list with everything the backend returns for `filters`.
    pub async fn fetch_all(
        &self,
        filters: Option<&S::Filter>,
    ) -> Result<Vec<S::Item>, S::Error> {
        self.begin(Operation::FetchAll);
        let result = self.service.get_all(filters).await;
        if let Ok(items) = &result {
            *self.items.borrow_mut() = items.clone();
        }
        self.settle(Operation::FetchAll, result)
    }

    /// Load one record into the current slot. The list is left alone.
    pub async fn fetch_by_id(&self, id: RecordId) -> Result<S::Item, S::Error> {
        self.begin(Operation::FetchById);
        let result = self.service.get_by_id(id).await;
        if let Ok(item) = &result {
            *self.current_item.borrow_mut() = Some(item.clone());
        }
        self.settle(Operation::FetchById, result)
    }

    /// Create a record and put it at the front of the list.
    pub async fn create(&self, data: &S::Write) -> Result<S::Item, S::Error> {
        self.begin(Operation::Create);
        let result = self.service.create(data).await;
        if let Ok(item) = &result {
            self.items.borrow_mut().insert(0, item.clone());
        }
        self.settle(Operation::Create, result)
    }

    /// Update a record, replacing it in place in the list and in the current
    /// slot. A record that is not in the list is not added to it.
    pub async fn update(
        &self,
        id: RecordId,
        data: &S::Write,
    ) -> Result<S::Item, S::Error> {
        self.begin(Operation::Update);
        let result = self.service.update(id, data).await;
        if let Ok(updated) = &result {
            for item in self.items.borrow_mut().iter_mut() {
                if item.id() == id {
                    *item = updated.clone();
                }
            }
            *self.current_item.borrow_mut() = Some(updated.clone());
        }
        self.settle(Operation::Update, result)
    }

    /// Delete a record and drop it from the list. An id that is not listed
    /// only affects the backend.
    pub async fn remove(&self, id: RecordId) -> Result<(), S::Error> {
        self.begin(Operation::Remove);
        let result = self.service.delete(id).await;
        if result.is_ok() {
            self.items.borrow_mut().retain(|item| item.id() != id);
        }
        self.settle(Operation::Remove, result)
    }

    /// Activate a record, then reload the whole list. Does nothing when the
    /// service has no activation support.
    pub async fn activate(&self, id: RecordId) -> Result<(), S::Error> {
        self.toggle(Operation::Activate, id).await
    }

    /// Deactivate a record, then reload the whole list. Does nothing when the
    /// service has no activation support.
    pub async fn deactivate(&self, id: RecordId) -> Result<(), S::Error> {
        self.toggle(Operation::Deactivate, id).await
    }

    async fn toggle(
        &self,
        operation: Operation,
        id: RecordId,
    ) -> Result<(), S::Error> {
        let Some(activation) = self.service.activation() else {
            tracing::debug!(?operation, %id, "activation not supported");
            return Ok(());
        };

        self.begin(operation);
        let result = if operation == Operation::Activate {
            activation.activate(id).await
        } else {
            activation.deactivate(id).await
        };
        // Reload is unfiltered.
        let result = match result {
            Ok(()) => self.service.get_all(None).await.map(|items| {
                *self.items.borrow_mut() = items;
            }),
            Err(e) => Err(e),
        };
        self.settle(operation, result)
    }

    fn begin(&self, operation: Operation) {
        tracing::debug!(?operation, "starting");
        self.is_loading.set(true);
        *self.error.borrow_mut() = None;
    }

    fn settle<T>(
        &self,
        operation: Operation,
        result: Result<T, S::Error>,
    ) -> Result<T, S::Error> {
        if let Err(e) = &result {
            let message = e
                .message()
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| operation.fallback_message().to_string());
            tracing::warn!(?operation, error = %message, "operation failed");
            *self.error.borrow_mut() = Some(message);
        }
        self.is_loading.set(false);
        result
    }
}

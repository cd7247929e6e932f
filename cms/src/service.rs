//! The capability contract between [`ResourceStore`](crate::ResourceStore)
//! and whatever talks to the backend for one resource type.

use async_trait::async_trait;
use payloads::{AdoptionChild, Event, Project, RecordId};

/// Minimal shape the store needs from a managed record.
pub trait Resource: Clone + Send + Sync + 'static {
    fn id(&self) -> RecordId;

    /// `None` for resources without an activation flag.
    fn is_active(&self) -> Option<bool> {
        None
    }
}

impl Resource for Event {
    fn id(&self) -> RecordId {
        self.id
    }

    fn is_active(&self) -> Option<bool> {
        Some(self.is_active)
    }
}

impl Resource for Project {
    fn id(&self) -> RecordId {
        self.id
    }

    fn is_active(&self) -> Option<bool> {
        Some(self.is_active)
    }
}

impl Resource for AdoptionChild {
    fn id(&self) -> RecordId {
        self.id
    }

    fn is_active(&self) -> Option<bool> {
        Some(self.is_active)
    }
}

/// A failure that can be shown to a person.
pub trait Failure: std::error::Error + Send + Sync + 'static {
    /// Human readable message, or `None` when the failure carries none and the
    /// caller should substitute its own wording.
    fn message(&self) -> Option<String>;
}

/// Verbs every resource backend supports.
///
/// Implement this trait to put a [`ResourceStore`](crate::ResourceStore) in
/// front of a new resource type.
///
/// # Example
///
/// ```ignore
/// struct Sponsors { client: APIClient }
///
/// #[async_trait::async_trait]
/// impl ResourceService for Sponsors {
///     type Item = Sponsor;
///     type Write = SponsorRequest;
///     type Filter = ();
///     type Error = ServiceError;
///
///     async fn get_all(
///         &self,
///         _: Option<&()>,
///     ) -> Result<Vec<Sponsor>, ServiceError> {
///         // ...
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait ResourceService: Send + Sync {
    type Item: Resource;
    /// Fields accepted by create and update.
    type Write: Send + Sync;
    /// Opaque list filter, forwarded verbatim.
    type Filter: Send + Sync;
    type Error: Failure;

    async fn get_all(
        &self,
        filters: Option<&Self::Filter>,
    ) -> Result<Vec<Self::Item>, Self::Error>;

    /// A missing record is a failure.
    async fn get_by_id(&self, id: RecordId) -> Result<Self::Item, Self::Error>;

    /// The returned item carries the id assigned by the backend.
    async fn create(
        &self,
        data: &Self::Write,
    ) -> Result<Self::Item, Self::Error>;

    async fn update(
        &self,
        id: RecordId,
        data: &Self::Write,
    ) -> Result<Self::Item, Self::Error>;

    async fn delete(&self, id: RecordId) -> Result<(), Self::Error>;

    /// Activation toggles, when the backend supports them.
    fn activation(&self) -> Option<&dyn Activation<Error = Self::Error>> {
        None
    }
}

/// Optional capability of a [`ResourceService`].
#[async_trait]
pub trait Activation: Send + Sync {
    type Error: Failure;

    async fn activate(&self, id: RecordId) -> Result<(), Self::Error>;

    async fn deactivate(&self, id: RecordId) -> Result<(), Self::Error>;
}

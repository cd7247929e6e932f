//! [`ResourceService`] implementations backed by the CMS REST API.

use std::marker::PhantomData;

use async_trait::async_trait;
use payloads::{
    APIClient, AdoptionChild, AdoptionStatus, ClientError, Event, Project,
    ProjectStatus, RecordId, api_client::record_path, requests,
};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::ServiceError,
    service::{Activation, Resource, ResourceService},
};

/// Static description of one REST resource collection.
pub trait ResourceKind: Send + Sync + 'static {
    /// Collection path below `/api`.
    const COLLECTION: &'static str;
    /// Capitalized singular noun used in messages.
    const NOUN: &'static str;
    const PLURAL: &'static str;
    /// Query parameter the search endpoint expects.
    const SEARCH_PARAM: &'static str;

    type Item: Resource + DeserializeOwned;
    type Write: Serialize + Send + Sync;
    type Filter: Serialize + Send + Sync;
}

pub struct Events;

impl ResourceKind for Events {
    const COLLECTION: &'static str = "cms/events";
    const NOUN: &'static str = "Event";
    const PLURAL: &'static str = "events";
    const SEARCH_PARAM: &'static str = "title";

    type Item = Event;
    type Write = requests::EventRequest;
    type Filter = requests::EventFilters;
}

pub struct Projects;

impl ResourceKind for Projects {
    const COLLECTION: &'static str = "cms/projects";
    const NOUN: &'static str = "Project";
    const PLURAL: &'static str = "projects";
    const SEARCH_PARAM: &'static str = "title";

    type Item = Project;
    type Write = requests::ProjectRequest;
    type Filter = requests::ProjectFilters;
}

pub struct Children;

impl ResourceKind for Children {
    const COLLECTION: &'static str = "cms/children";
    const NOUN: &'static str = "Child";
    const PLURAL: &'static str = "children";
    const SEARCH_PARAM: &'static str = "name";

    type Item = AdoptionChild;
    type Write = requests::AdoptionChildRequest;
    type Filter = requests::ChildFilters;
}

pub type EventService = RestService<Events>;
pub type ProjectService = RestService<Projects>;
pub type ChildService = RestService<Children>;

/// A resource collection reached through an [`APIClient`].
pub struct RestService<K> {
    client: APIClient,
    kind: PhantomData<fn() -> K>,
}

impl<K> Clone for RestService<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> RestService<K> {
    pub fn new(client: APIClient) -> Self {
        Self {
            client,
            kind: PhantomData,
        }
    }

    pub fn client(&self) -> &APIClient {
        &self.client
    }

    fn record(&self, id: RecordId) -> String {
        record_path(K::COLLECTION, id)
    }

    fn action(&self, id: RecordId, action: &str) -> String {
        format!("{}/{action}", self.record(id))
    }

    fn not_found(&self) -> ServiceError {
        ServiceError::NotFound(format!("{} not found", K::NOUN))
    }

    fn failed(&self, verb: &str) -> String {
        format!("Failed to {verb} {}", K::NOUN.to_lowercase())
    }

    /// Records whose search field matches `term`.
    pub async fn search(
        &self,
        term: &str,
    ) -> Result<Vec<K::Item>, ServiceError> {
        let path = format!("{}/search", K::COLLECTION);
        self.client
            .list(&path, &[(K::SEARCH_PARAM, term)])
            .await
            .map_err(|e| api_failure(e, |_| unknown("Search failed")))
    }

    /// `PATCH` an action endpoint that answers with the modified record.
    async fn patch_record(
        &self,
        id: RecordId,
        action: &str,
        body: &impl Serialize,
        failure: &str,
    ) -> Result<K::Item, ServiceError> {
        self.client
            .patch(&self.action(id, action), body)
            .await
            .map_err(|e| api_failure(e, |_| unknown(failure)))?
            .ok_or_else(|| unknown(failure))
    }
}

#[async_trait]
impl<K: ResourceKind> ResourceService for RestService<K> {
    type Item = K::Item;
    type Write = K::Write;
    type Filter = K::Filter;
    type Error = ServiceError;

    async fn get_all(
        &self,
        filters: Option<&K::Filter>,
    ) -> Result<Vec<K::Item>, ServiceError> {
        self.client
            .list(K::COLLECTION, &filters)
            .await
            .map_err(|e| {
                api_failure(e, |_| {
                    unknown(&format!("Failed to fetch {}", K::PLURAL))
                })
            })
    }

    async fn get_by_id(&self, id: RecordId) -> Result<K::Item, ServiceError> {
        self.client
            .get(&self.record(id))
            .await
            .map_err(|e| api_failure(e, |_| self.not_found()))?
            .ok_or_else(|| self.not_found())
    }

    async fn create(&self, data: &K::Write) -> Result<K::Item, ServiceError> {
        let failure = self.failed("create");
        self.client
            .post(K::COLLECTION, data)
            .await
            .map_err(|e| api_failure(e, |message| rejected(message, &failure)))?
            .ok_or_else(|| unknown(&failure))
    }

    async fn update(
        &self,
        id: RecordId,
        data: &K::Write,
    ) -> Result<K::Item, ServiceError> {
        let failure = self.failed("update");
        self.client
            .put(&self.record(id), data)
            .await
            .map_err(|e| api_failure(e, |message| rejected(message, &failure)))?
            .ok_or_else(|| unknown(&failure))
    }

    async fn delete(&self, id: RecordId) -> Result<(), ServiceError> {
        let failure = self.failed("delete");
        self.client
            .delete(&self.record(id))
            .await
            .map_err(|e| api_failure(e, |message| rejected(message, &failure)))
    }

    fn activation(&self) -> Option<&dyn Activation<Error = ServiceError>> {
        Some(self)
    }
}

#[async_trait]
impl<K: ResourceKind> Activation for RestService<K> {
    type Error = ServiceError;

    async fn activate(&self, id: RecordId) -> Result<(), ServiceError> {
        self.client
            .empty_patch(&self.action(id, "activate"))
            .await
            .map_err(|e| api_failure(e, |_| unknown(&self.failed("activate"))))
    }

    async fn deactivate(&self, id: RecordId) -> Result<(), ServiceError> {
        self.client
            .empty_patch(&self.action(id, "deactivate"))
            .await
            .map_err(|e| {
                api_failure(e, |_| unknown(&self.failed("deactivate")))
            })
    }
}

impl RestService<Projects> {
    /// Record the total raised for a project.
    pub async fn update_funds(
        &self,
        id: RecordId,
        amount: Decimal,
    ) -> Result<Project, ServiceError> {
        let body = requests::UpdateFunds { amount };
        self.patch_record(id, "funds", &body, "Failed to update funds")
            .await
    }

    pub async fn update_status(
        &self,
        id: RecordId,
        status: ProjectStatus,
    ) -> Result<Project, ServiceError> {
        let body = requests::UpdateProjectStatus { status };
        self.patch_record(id, "status", &body, "Failed to update status")
            .await
    }
}

impl RestService<Children> {
    pub async fn assign_sponsor(
        &self,
        id: RecordId,
        sponsor_id: RecordId,
    ) -> Result<AdoptionChild, ServiceError> {
        let failure = "Failed to assign sponsor";
        let body = requests::AssignSponsor { sponsor_id };
        self.client
            .post(&self.action(id, "sponsor"), &body)
            .await
            .map_err(|e| api_failure(e, |_| unknown(failure)))?
            .ok_or_else(|| unknown(failure))
    }

    pub async fn remove_sponsor(
        &self,
        id: RecordId,
    ) -> Result<AdoptionChild, ServiceError> {
        let failure = "Failed to remove sponsor";
        self.client
            .delete_returning(&self.action(id, "sponsor"))
            .await
            .map_err(|e| api_failure(e, |_| unknown(failure)))?
            .ok_or_else(|| unknown(failure))
    }

    pub async fn update_status(
        &self,
        id: RecordId,
        status: AdoptionStatus,
    ) -> Result<AdoptionChild, ServiceError> {
        let body = requests::UpdateAdoptionStatus { status };
        self.patch_record(id, "status", &body, "Failed to update status")
            .await
    }
}

/// Transport failures keep their own message; rejections by the backend are
/// turned into a [`ServiceError`] by `map`, which receives the server message.
fn api_failure(
    e: ClientError,
    map: impl FnOnce(Option<String>) -> ServiceError,
) -> ServiceError {
    match e {
        ClientError::APIError(_, message) => map(message),
        other => ServiceError::Transport(other),
    }
}

fn unknown(message: &str) -> ServiceError {
    ServiceError::Unknown(Some(message.to_string()))
}

fn rejected(message: Option<String>, fallback: &str) -> ServiceError {
    ServiceError::Rejected(message.unwrap_or_else(|| fallback.to_string()))
}

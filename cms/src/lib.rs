//! Client core for the foundation CMS: resource state stores over pluggable
//! services, REST services for events, projects and sponsorship children, and
//! the login session.

pub mod auth;
pub mod config;
pub mod error;
pub mod rest;
pub mod service;
pub mod session;
pub mod store;
pub mod telemetry;

pub use auth::{AuthError, AuthStore};
pub use config::Config;
pub use error::ServiceError;
pub use rest::{ChildService, EventService, ProjectService, RestService};
pub use service::{Activation, Failure, Resource, ResourceService};
pub use session::{Session, SessionStore};
pub use store::{Operation, ResourceStore, StoreSnapshot};

pub type EventStore = ResourceStore<EventService>;
pub type ProjectStore = ResourceStore<ProjectService>;
pub type ChildStore = ResourceStore<ChildService>;

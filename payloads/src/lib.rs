pub mod api_client;
pub mod requests;
pub mod responses;

pub use api_client::{APIClient, ClientError, SharedToken};
pub use responses::{AdoptionChild, ApiResponse, Event, Project};

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Numeric identifier assigned by the backend to every CMS record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
pub enum ProjectStatus {
    #[display("PLANIFICACION")]
    #[serde(rename = "PLANIFICACION")]
    Planning,
    #[display("EN_PROGRESO")]
    #[serde(rename = "EN_PROGRESO")]
    InProgress,
    #[display("PAUSADO")]
    #[serde(rename = "PAUSADO")]
    Paused,
    #[display("COMPLETADO")]
    #[serde(rename = "COMPLETADO")]
    Completed,
    #[display("CANCELADO")]
    #[serde(rename = "CANCELADO")]
    Cancelled,
}

impl ProjectStatus {
    /// Human readable label, as the backend reports in `statusDisplayName`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::InProgress => "In progress",
            Self::Paused => "Paused",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Sponsorship state of a child.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
pub enum AdoptionStatus {
    #[display("DISPONIBLE")]
    #[serde(rename = "DISPONIBLE")]
    Available,
    #[display("EN_PROCESO")]
    #[serde(rename = "EN_PROCESO")]
    InProcess,
    #[display("APADRINADO")]
    #[serde(rename = "APADRINADO")]
    Sponsored,
    #[display("NO_DISPONIBLE")]
    #[serde(rename = "NO_DISPONIBLE")]
    Unavailable,
}

impl AdoptionStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::InProcess => "In process",
            Self::Sponsored => "Sponsored",
            Self::Unavailable => "Unavailable",
        }
    }
}

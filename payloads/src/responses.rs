use crate::{AdoptionStatus, ProjectStatus, RecordId};
use jiff::civil::{Date, DateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Envelope the CMS backend wraps around every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default = "Option::default",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            total: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            total: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub event_date: DateTime,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub current_participants: u32,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    #[serde(default)]
    pub has_available_spots: bool,
    #[serde(default)]
    pub is_past_event: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub status_display_name: String,
    pub image_url: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub budget: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub funds_raised: Decimal,
    /// Percentage of the budget raised so far, 0 when there is no budget.
    #[serde(default)]
    pub funding_percentage: f64,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub is_active: bool,
    #[serde(default)]
    pub is_funded: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionChild {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub full_name: String,
    pub birth_date: Date,
    #[serde(default)]
    pub age: u32,
    pub gender: Option<String>,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub special_needs: Option<String>,
    pub current_location: Option<String>,
    pub adoption_status: AdoptionStatus,
    #[serde(default)]
    pub adoption_status_display_name: String,
    pub sponsor_id: Option<RecordId>,
    pub sponsor_assigned_at: Option<DateTime>,
    #[serde(default)]
    pub has_sponsor: bool,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// The authenticated user as reported by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: RecordId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub message: Option<String>,
}

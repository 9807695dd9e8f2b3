//! Scheduled call request/response models

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

use crate::entities::scheduled_calls::{self, CallStatus};

/// Longest call that can be booked
pub const MAX_CALL_DURATION_MINUTES: i32 = 480;
const DEFAULT_CALL_DURATION_MINUTES: i32 = 30;
const MAX_CALL_TITLE_LENGTH: usize = 200;

/// Body of POST /calls
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCallRequest {
    pub receiver_id: i32,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub title: Option<String>,
    pub notes: Option<String>,
    /// Links the call to a deal; both users must then be its participants
    pub deal_id: Option<i32>,
}

fn default_duration() -> i32 {
    DEFAULT_CALL_DURATION_MINUTES
}

impl CreateCallRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.duration_minutes < 1 || self.duration_minutes > MAX_CALL_DURATION_MINUTES {
            return Err(format!(
                "durationMinutes must be between 1 and {}",
                MAX_CALL_DURATION_MINUTES
            ));
        }
        if self.scheduled_at <= now {
            return Err("scheduledAt must be in the future".to_string());
        }
        if let Some(ref title) = self.title {
            if title.chars().count() > MAX_CALL_TITLE_LENGTH {
                return Err(format!("title cannot exceed {} characters", MAX_CALL_TITLE_LENGTH));
            }
        }
        Ok(())
    }
}

/// Body of PATCH /calls/{id}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCallRequest {
    pub status: CallStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub id: i32,
    pub scheduler_id: i32,
    pub receiver_id: i32,
    pub deal_id: Option<i32>,
    pub title: String,
    pub notes: Option<String>,
    pub scheduled_at: DateTimeWithTimeZone,
    pub duration_minutes: i32,
    pub status: CallStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<scheduled_calls::Model> for CallResponse {
    fn from(model: scheduled_calls::Model) -> Self {
        Self {
            id: model.id,
            scheduler_id: model.scheduler_id,
            receiver_id: model.receiver_id,
            deal_id: model.deal_id,
            title: model.title,
            notes: model.notes,
            scheduled_at: model.scheduled_at,
            duration_minutes: model.duration_minutes,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallListResponse {
    pub calls: Vec<CallResponse>,
}

//! Deal request/response models
//!
//! Models for the /deals endpoints.

use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

use crate::entities::{deal_events, deals, users};
use crate::entities::deal_events::DealEventType;
use crate::entities::deals::DealStage;
use crate::models::call::CallResponse;
use crate::models::document::DocumentResponse;
use crate::services::listing_lookup::ListingSummary;

/// Longest accepted notes field
pub const MAX_NOTES_LENGTH: usize = 5000;

fn validate_offer_and_notes(offer_amount: Option<i64>, notes: Option<&str>) -> Result<(), String> {
    if let Some(amount) = offer_amount {
        if amount < 0 {
            return Err("offerAmount cannot be negative".to_string());
        }
    }
    if let Some(notes) = notes {
        if notes.chars().count() > MAX_NOTES_LENGTH {
            return Err(format!("notes cannot exceed {} characters", MAX_NOTES_LENGTH));
        }
    }
    Ok(())
}

/// Body of POST /deals. The seller is always taken from the listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateDealRequest {
    pub listing_id: i32,
    /// Opening offer in the smallest currency unit
    pub offer_amount: Option<i64>,
    pub notes: Option<String>,
}

impl CreateDealRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_offer_and_notes(self.offer_amount, self.notes.as_deref())
    }
}

/// Body of PATCH /deals/{id}
///
/// Without `stage` the request only updates the offer and/or notes, which is
/// allowed at any non-terminal stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateDealRequest {
    pub stage: Option<DealStage>,
    pub offer_amount: Option<i64>,
    pub notes: Option<String>,
}

impl UpdateDealRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.stage.is_none() && self.offer_amount.is_none() && self.notes.is_none() {
            return Err("At least one of stage, offerAmount or notes is required".to_string());
        }
        validate_offer_and_notes(self.offer_amount, self.notes.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealResponse {
    pub id: i32,
    pub listing_id: i32,
    pub buyer_id: i32,
    pub seller_id: i32,
    pub stage: DealStage,
    pub offer_amount: Option<i64>,
    pub notes: Option<String>,
    /// Optimistic-lock counter, bumped on every stage/offer/notes change
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<deals::Model> for DealResponse {
    fn from(model: deals::Model) -> Self {
        Self {
            id: model.id,
            listing_id: model.listing_id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            stage: model.stage,
            offer_amount: model.offer_amount,
            notes: model.notes,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// One timeline entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealEventResponse {
    pub id: i32,
    pub deal_id: i32,
    pub event_type: DealEventType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub actor_id: i32,
    pub created_at: DateTimeWithTimeZone,
}

impl From<deal_events::Model> for DealEventResponse {
    fn from(model: deal_events::Model) -> Self {
        Self {
            id: model.id,
            deal_id: model.deal_id,
            event_type: model.event_type,
            title: model.title,
            details: model.details,
            actor_id: model.actor_id,
            created_at: model.created_at,
        }
    }
}

/// Public view of a deal participant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub id: i32,
    pub name: String,
}

impl From<users::Model> for ParticipantSummary {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Response for GET /deals/{id}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDetailResponse {
    #[serde(flatten)]
    pub deal: DealResponse,
    pub listing: Option<ListingSummary>,
    pub buyer: Option<ParticipantSummary>,
    pub seller: Option<ParticipantSummary>,
    /// Newest first
    pub timeline: Vec<DealEventResponse>,
    pub documents: Vec<DocumentResponse>,
    pub calls: Vec<CallResponse>,
}

/// Entry of GET /deals
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealListEntry {
    #[serde(flatten)]
    pub deal: DealResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_title: Option<String>,
    /// "buyer" or "seller", from the caller's point of view
    pub role: &'static str,
    pub latest_event: Option<DealEventResponse>,
}

/// Response for GET /deals
#[derive(Debug, Clone, Serialize)]
pub struct DealListResponse {
    pub deals: Vec<DealListEntry>,
    pub total: usize,
}

/// Response for GET /deals/{id}/timeline
#[derive(Debug, Clone, Serialize)]
pub struct TimelineResponse {
    pub events: Vec<DealEventResponse>,
}

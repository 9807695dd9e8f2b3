//! SeaORM Entity for deals
//!
//! One row per buyer/listing negotiation. `version` is bumped on every
//! pipeline write and used as the optimistic lock for stage and offer updates.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "deals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub listing_id: i32,
    pub buyer_id: i32,
    /// Copied from the listing when the deal is opened, never changed afterwards
    pub seller_id: i32,
    pub stage: DealStage,
    /// Offer in the smallest currency unit
    pub offer_amount: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    /// "<buyer_id>:<listing_id>" while open, NULL once terminal (unique)
    #[sea_orm(unique)]
    pub active_pair: Option<String>,
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_participant(&self, user_id: i32) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// The other side of the deal, if `user_id` is a participant
    pub fn counterparty_of(&self, user_id: i32) -> Option<i32> {
        if user_id == self.buyer_id {
            Some(self.seller_id)
        } else if user_id == self.seller_id {
            Some(self.buyer_id)
        } else {
            None
        }
    }
}

/// Key stored in `active_pair` for an open deal
pub fn active_pair_key(buyer_id: i32, listing_id: i32) -> String {
    format!("{}:{}", buyer_id, listing_id)
}

/// Position of a deal in the acquisition pipeline
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStage {
    #[sea_orm(string_value = "INQUIRY")]
    Inquiry,
    #[sea_orm(string_value = "OFFER")]
    Offer,
    #[sea_orm(string_value = "NEGOTIATION")]
    Negotiation,
    #[sea_orm(string_value = "DUE_DILIGENCE")]
    DueDiligence,
    #[sea_orm(string_value = "CLOSING")]
    Closing,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl DealStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, DealStage::Completed | DealStage::Cancelled)
    }

    /// Wire name, e.g. "DUE_DILIGENCE"
    pub fn as_str(self) -> &'static str {
        match self {
            DealStage::Inquiry => "INQUIRY",
            DealStage::Offer => "OFFER",
            DealStage::Negotiation => "NEGOTIATION",
            DealStage::DueDiligence => "DUE_DILIGENCE",
            DealStage::Closing => "CLOSING",
            DealStage::Completed => "COMPLETED",
            DealStage::Cancelled => "CANCELLED",
        }
    }

    /// Display name with underscores replaced, e.g. "Due Diligence"
    pub fn label(self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let lower = word.to_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::listings::Entity",
        from = "Column::ListingId",
        to = "super::listings::Column::Id"
    )]
    Listing,
    #[sea_orm(has_many = "super::deal_events::Entity")]
    DealEvents,
    #[sea_orm(has_many = "super::deal_documents::Entity")]
    DealDocuments,
    #[sea_orm(has_many = "super::scheduled_calls::Entity")]
    ScheduledCalls,
}

impl Related<super::listings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listing.def()
    }
}

impl Related<super::deal_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DealEvents.def()
    }
}

impl Related<super::deal_documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DealDocuments.def()
    }
}

impl Related<super::scheduled_calls::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduledCalls.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn test_stage_labels() {
        assert_eq!(DealStage::Offer.label(), "Offer");
        assert_eq!(DealStage::DueDiligence.label(), "Due Diligence");
        assert_eq!(DealStage::Cancelled.label(), "Cancelled");
    }

    #[test]
    fn test_terminal_stages() {
        let terminal: Vec<_> = DealStage::iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![DealStage::Completed, DealStage::Cancelled]);
    }

    #[test]
    fn test_stage_serde_uses_wire_names() {
        let json = serde_json::to_string(&DealStage::DueDiligence).unwrap();
        assert_eq!(json, "\"DUE_DILIGENCE\"");
        let parsed: DealStage = serde_json::from_str("\"CLOSING\"").unwrap();
        assert_eq!(parsed, DealStage::Closing);
    }
}

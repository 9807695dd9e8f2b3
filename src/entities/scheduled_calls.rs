//! SeaORM Entity for scheduled_calls

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "scheduled_calls")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub scheduler_id: i32,
    pub receiver_id: i32,
    pub deal_id: Option<i32>,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub scheduled_at: DateTimeWithTimeZone,
    pub duration_minutes: i32,
    pub status: CallStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_participant(&self, user_id: i32) -> bool {
        self.scheduler_id == user_id || self.receiver_id == user_id
    }

    pub fn counterparty_of(&self, user_id: i32) -> Option<i32> {
        if user_id == self.scheduler_id {
            Some(self.receiver_id)
        } else if user_id == self.receiver_id {
            Some(self.scheduler_id)
        } else {
            None
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl CallStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Pending => "PENDING",
            CallStatus::Confirmed => "CONFIRMED",
            CallStatus::Completed => "COMPLETED",
            CallStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deals::Entity",
        from = "Column::DealId",
        to = "super::deals::Column::Id"
    )]
    Deal,
}

impl Related<super::deals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

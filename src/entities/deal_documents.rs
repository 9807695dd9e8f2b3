//! SeaORM Entity for deal_documents

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "deal_documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub deal_id: i32,
    pub uploader_id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub file_url: String,
    pub file_type: Option<String>,
    /// Size in bytes
    pub file_size: Option<i64>,
    pub category: DocumentCategory,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    #[sea_orm(string_value = "FINANCIAL")]
    Financial,
    #[sea_orm(string_value = "LEGAL")]
    Legal,
    #[sea_orm(string_value = "OPERATIONAL")]
    Operational,
    #[sea_orm(string_value = "TECHNICAL")]
    Technical,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

impl DocumentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentCategory::Financial => "FINANCIAL",
            DocumentCategory::Legal => "LEGAL",
            DocumentCategory::Operational => "OPERATIONAL",
            DocumentCategory::Technical => "TECHNICAL",
            DocumentCategory::Other => "OTHER",
        }
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

//! Timeline/Event Recorder
//!
//! Append-only access to `deal_events`. Writers take a `ConnectionTrait` so
//! the caller's open transaction is used; there is no update or delete.

use sea_orm::{
    prelude::DateTimeWithTimeZone, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::entities::deal_events::{self, DealEventType};
use crate::entities::prelude::DealEvents;
use crate::error::PipelineResult;

/// An event waiting to be stamped and written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDealEvent {
    pub event_type: DealEventType,
    pub title: String,
    pub details: Option<String>,
}

impl NewDealEvent {
    pub fn new(event_type: DealEventType, title: impl Into<String>) -> Self {
        Self {
            event_type,
            title: title.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Append `event` to the deal's timeline, stamped with `actor_id` and `at`
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    deal_id: i32,
    actor_id: i32,
    at: DateTimeWithTimeZone,
    event: NewDealEvent,
) -> PipelineResult<deal_events::Model> {
    let row = deal_events::ActiveModel {
        deal_id: Set(deal_id),
        event_type: Set(event.event_type),
        title: Set(event.title),
        details: Set(event.details),
        actor_id: Set(actor_id),
        created_at: Set(at),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    debug!(
        deal_id = deal_id,
        event_id = row.id,
        event_type = ?row.event_type,
        "Deal event recorded"
    );

    Ok(row)
}

/// Append several events in order, all with the same timestamp
pub async fn record_all<C: ConnectionTrait>(
    conn: &C,
    deal_id: i32,
    actor_id: i32,
    at: DateTimeWithTimeZone,
    events: Vec<NewDealEvent>,
) -> PipelineResult<Vec<deal_events::Model>> {
    let mut rows = Vec::with_capacity(events.len());
    for event in events {
        rows.push(record(conn, deal_id, actor_id, at, event).await?);
    }
    Ok(rows)
}

/// Timeline for one deal, newest first. Authorization is the caller's job.
pub async fn list_for_deal<C: ConnectionTrait>(
    db: &C,
    deal_id: i32,
) -> PipelineResult<Vec<deal_events::Model>> {
    let events = DealEvents::find()
        .filter(deal_events::Column::DealId.eq(deal_id))
        .order_by_desc(deal_events::Column::CreatedAt)
        .order_by_desc(deal_events::Column::Id)
        .all(db)
        .await?;

    Ok(events)
}

/// Most recent event of a deal
pub async fn latest_for_deal<C: ConnectionTrait>(
    db: &C,
    deal_id: i32,
) -> PipelineResult<Option<deal_events::Model>> {
    let event = DealEvents::find()
        .filter(deal_events::Column::DealId.eq(deal_id))
        .order_by_desc(deal_events::Column::CreatedAt)
        .order_by_desc(deal_events::Column::Id)
        .one(db)
        .await?;

    Ok(event)
}

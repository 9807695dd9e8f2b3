//! Deal Store
//!
//! Owns the canonical state of a deal. Every mutation runs in one database
//! transaction together with the timeline events that describe it, and is
//! guarded by an optimistic lock on `deals.version`. Notifications go out
//! only after the commit.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use tracing::{info, warn};

use crate::entities::deal_events::DealEventType;
use crate::entities::deals::{self, active_pair_key, DealStage};
use crate::entities::prelude::{DealDocuments, Deals, ScheduledCalls, Users};
use crate::entities::{deal_documents, scheduled_calls};
use crate::error::{PipelineError, PipelineResult};
use crate::models::deal::{
    CreateDealRequest, DealDetailResponse, DealEventResponse, DealListEntry, DealResponse,
    UpdateDealRequest,
};
use crate::services::listing_lookup;
use crate::services::notifications::{Notification, Notifier};
use crate::services::stage_machine;
use crate::services::timeline::{self, NewDealEvent};

pub struct DealStore<'a> {
    db: &'a DatabaseConnection,
    notifier: &'a Notifier,
}

impl<'a> DealStore<'a> {
    pub fn new(db: &'a DatabaseConnection, notifier: &'a Notifier) -> Self {
        Self { db, notifier }
    }

    /// Open a deal in INQUIRY between `buyer_id` and the listing's seller
    pub async fn create_deal(
        &self,
        buyer_id: i32,
        req: CreateDealRequest,
    ) -> PipelineResult<deals::Model> {
        req.validate().map_err(PipelineError::Validation)?;

        let txn = self.db.begin().await?;

        let listing = listing_lookup::find(&txn, req.listing_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Listing {} not found", req.listing_id)))?;

        if !listing.status.is_purchasable() {
            return Err(PipelineError::InvalidState(format!(
                "Listing {} is not open for offers",
                listing.id
            )));
        }

        if listing.seller_id == buyer_id {
            return Err(PipelineError::Forbidden(
                "You cannot open a deal on your own listing".to_string(),
            ));
        }

        if Users::find_by_id(buyer_id).one(&txn).await?.is_none() {
            return Err(PipelineError::NotFound(format!("User {} not found", buyer_id)));
        }

        if let Some(existing) = find_active_deal(&txn, buyer_id, listing.id).await? {
            return Err(active_deal_conflict(Some(existing.id)));
        }

        let now = Utc::now().fixed_offset();
        let deal = deals::ActiveModel {
            listing_id: Set(listing.id),
            buyer_id: Set(buyer_id),
            seller_id: Set(listing.seller_id),
            stage: Set(DealStage::Inquiry),
            offer_amount: Set(req.offer_amount),
            notes: Set(req.notes.clone()),
            active_pair: Set(Some(active_pair_key(buyer_id, listing.id))),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let deal = match deal {
            Ok(deal) => deal,
            Err(err) if is_unique_violation(&err) => {
                // Another request opened the same deal after our pre-check
                txn.rollback().await?;
                let existing = find_by_active_pair(self.db, buyer_id, listing.id).await?;
                warn!(
                    buyer_id = buyer_id,
                    listing_id = listing.id,
                    existing_deal_id = ?existing.as_ref().map(|d| d.id),
                    "Concurrent deal creation detected"
                );
                return Err(active_deal_conflict(existing.map(|d| d.id)));
            }
            Err(err) => return Err(err.into()),
        };

        let mut details = format!("Stage: {}", DealStage::Inquiry.label());
        if let Some(notes) = req.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            details.push_str("\nNotes: ");
            details.push_str(notes);
        }
        let mut events =
            vec![NewDealEvent::new(DealEventType::StageChange, "Deal created").with_details(details)];
        if let Some(amount) = req.offer_amount {
            events.push(
                NewDealEvent::new(DealEventType::OfferMade, "Offer made")
                    .with_details(format!("Initial offer: {}", amount)),
            );
        }
        timeline::record_all(&txn, deal.id, buyer_id, now, events).await?;

        txn.commit().await?;

        info!(
            deal_id = deal.id,
            listing_id = deal.listing_id,
            buyer_id = deal.buyer_id,
            seller_id = deal.seller_id,
            "Deal created"
        );

        let mut body = format!("A buyer has opened a deal on \"{}\".", listing.title);
        if let Some(amount) = deal.offer_amount {
            body.push_str(&format!(" Opening offer: {}.", amount));
        }
        self.notifier.notify(Notification {
            recipient_id: deal.seller_id,
            deal_id: Some(deal.id),
            subject: format!("New inquiry: {}", listing.title),
            body,
        });

        Ok(deal)
    }

    /// Apply a stage transition and/or offer and notes change
    pub async fn update_stage(
        &self,
        deal_id: i32,
        actor_id: i32,
        req: UpdateDealRequest,
    ) -> PipelineResult<deals::Model> {
        let txn = self.db.begin().await?;

        let deal = load_for_participant(&txn, deal_id, actor_id).await?;
        req.validate().map_err(PipelineError::Validation)?;

        let mut events = Vec::new();

        let new_stage = match req.stage {
            Some(target) => {
                let outcome =
                    stage_machine::request_transition(&deal, target, actor_id, req.notes.as_deref())?;
                events.push(
                    NewDealEvent::new(DealEventType::StageChange, outcome.title)
                        .with_details(outcome.details),
                );
                outcome.to
            }
            None => {
                if deal.stage.is_terminal() {
                    return Err(stage_machine::invalid_transition(deal.stage, None));
                }
                deal.stage
            }
        };

        let offer_changed = req.offer_amount.is_some() && req.offer_amount != deal.offer_amount;
        if offer_changed {
            let previous = deal
                .offer_amount
                .map(|a| a.to_string())
                .unwrap_or_else(|| "none".to_string());
            let amount = req.offer_amount.unwrap_or_default();
            events.push(
                NewDealEvent::new(DealEventType::OfferMade, "Offer amount updated")
                    .with_details(format!("Offer changed from {} to {}", previous, amount)),
            );
        }

        let notes_changed = req.notes.is_some() && req.notes != deal.notes;
        if notes_changed && events.is_empty() {
            events.push(NewDealEvent::new(DealEventType::NotesUpdated, "Notes updated"));
        }

        if events.is_empty() {
            return Err(PipelineError::Validation(
                "Update does not change the deal".to_string(),
            ));
        }

        let now = Utc::now().fixed_offset();
        let changes = DealChanges {
            stage: new_stage,
            offer_amount: if offer_changed { req.offer_amount } else { None },
            notes: if notes_changed { req.notes.clone() } else { None },
        };
        write_deal_changes(&txn, &deal, &changes, now).await?;

        let titles: Vec<String> = events.iter().map(|e| e.title.clone()).collect();
        timeline::record_all(&txn, deal.id, actor_id, now, events).await?;

        txn.commit().await?;

        info!(
            deal_id = deal.id,
            actor_id = actor_id,
            from = %deal.stage,
            to = %new_stage,
            "Deal updated"
        );

        let counterparty = deal.counterparty_of(actor_id);
        let mut updated = deal;
        updated.stage = changes.stage;
        updated.version += 1;
        updated.updated_at = now;
        if changes.offer_amount.is_some() {
            updated.offer_amount = changes.offer_amount;
        }
        if changes.notes.is_some() {
            updated.notes = changes.notes;
        }
        if new_stage.is_terminal() {
            updated.active_pair = None;
        }

        if let Some(recipient_id) = counterparty {
            self.notifier.notify(Notification {
                recipient_id,
                deal_id: Some(updated.id),
                subject: format!("Deal #{} updated", updated.id),
                body: titles.join("\n"),
            });
        }

        Ok(updated)
    }

    /// A deal with its listing, participants, timeline, documents and calls
    pub async fn get_deal(&self, deal_id: i32, actor_id: i32) -> PipelineResult<DealDetailResponse> {
        let deal = load_for_participant(self.db, deal_id, actor_id).await?;

        let listing = listing_lookup::find(self.db, deal.listing_id).await?;
        let buyer = Users::find_by_id(deal.buyer_id).one(self.db).await?;
        let seller = Users::find_by_id(deal.seller_id).one(self.db).await?;
        let events = timeline::list_for_deal(self.db, deal.id).await?;

        let documents = DealDocuments::find()
            .filter(deal_documents::Column::DealId.eq(deal.id))
            .order_by_desc(deal_documents::Column::CreatedAt)
            .order_by_desc(deal_documents::Column::Id)
            .all(self.db)
            .await?;

        let calls = ScheduledCalls::find()
            .filter(scheduled_calls::Column::DealId.eq(deal.id))
            .order_by_asc(scheduled_calls::Column::ScheduledAt)
            .all(self.db)
            .await?;

        Ok(DealDetailResponse {
            deal: deal.into(),
            listing,
            buyer: buyer.map(Into::into),
            seller: seller.map(Into::into),
            timeline: events.into_iter().map(Into::into).collect(),
            documents: documents.into_iter().map(Into::into).collect(),
            calls: calls.into_iter().map(Into::into).collect(),
        })
    }

    /// Timeline of a deal, newest first
    pub async fn get_timeline(
        &self,
        deal_id: i32,
        actor_id: i32,
    ) -> PipelineResult<Vec<DealEventResponse>> {
        let deal = load_for_participant(self.db, deal_id, actor_id).await?;
        let events = timeline::list_for_deal(self.db, deal.id).await?;
        Ok(events.into_iter().map(Into::into).collect())
    }

    /// Every deal the user takes part in, most recently updated first
    pub async fn list_deals_for_user(&self, user_id: i32) -> PipelineResult<Vec<DealListEntry>> {
        let deals = Deals::find()
            .filter(
                Condition::any()
                    .add(deals::Column::BuyerId.eq(user_id))
                    .add(deals::Column::SellerId.eq(user_id)),
            )
            .order_by_desc(deals::Column::UpdatedAt)
            .order_by_desc(deals::Column::Id)
            .all(self.db)
            .await?;

        let mut entries = Vec::with_capacity(deals.len());
        for deal in deals {
            let latest_event = timeline::latest_for_deal(self.db, deal.id).await?;
            let listing = listing_lookup::find(self.db, deal.listing_id).await?;
            let role = if deal.buyer_id == user_id { "buyer" } else { "seller" };

            entries.push(DealListEntry {
                deal: DealResponse::from(deal),
                listing_title: listing.map(|l| l.title),
                role,
                latest_event: latest_event.map(Into::into),
            });
        }

        Ok(entries)
    }
}

/// Load a deal and check that `actor_id` takes part in it
pub(crate) async fn load_for_participant<C: ConnectionTrait>(
    conn: &C,
    deal_id: i32,
    actor_id: i32,
) -> PipelineResult<deals::Model> {
    let deal = Deals::find_by_id(deal_id)
        .one(conn)
        .await?
        .ok_or_else(|| deal_not_found(deal_id))?;

    if !deal.is_participant(actor_id) {
        return Err(not_participant());
    }

    Ok(deal)
}

/// Bump `updated_at` after satellite activity (documents, calls). The
/// optimistic-lock version is left alone.
pub(crate) async fn touch<C: ConnectionTrait>(
    conn: &C,
    deal_id: i32,
    at: sea_orm::prelude::DateTimeWithTimeZone,
) -> PipelineResult<()> {
    Deals::update_many()
        .col_expr(deals::Column::UpdatedAt, Expr::value(at))
        .filter(deals::Column::Id.eq(deal_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn find_active_deal<C: ConnectionTrait>(
    conn: &C,
    buyer_id: i32,
    listing_id: i32,
) -> PipelineResult<Option<deals::Model>> {
    let deal = Deals::find()
        .filter(deals::Column::BuyerId.eq(buyer_id))
        .filter(deals::Column::ListingId.eq(listing_id))
        .filter(deals::Column::Stage.is_not_in([DealStage::Completed, DealStage::Cancelled]))
        .one(conn)
        .await?;
    Ok(deal)
}

/// Fields an update writes. `None` leaves the column untouched.
struct DealChanges {
    stage: DealStage,
    offer_amount: Option<i64>,
    notes: Option<String>,
}

/// Write `changes` only if the row still carries `deal.version`. Zero rows
/// affected means someone else updated the deal since it was read.
async fn write_deal_changes<C: ConnectionTrait>(
    conn: &C,
    deal: &deals::Model,
    changes: &DealChanges,
    now: sea_orm::prelude::DateTimeWithTimeZone,
) -> PipelineResult<()> {
    let mut update = Deals::update_many()
        .col_expr(deals::Column::Stage, Expr::value(changes.stage))
        .col_expr(deals::Column::Version, Expr::value(deal.version + 1))
        .col_expr(deals::Column::UpdatedAt, Expr::value(now));
    if let Some(amount) = changes.offer_amount {
        update = update.col_expr(deals::Column::OfferAmount, Expr::value(amount));
    }
    if let Some(ref notes) = changes.notes {
        update = update.col_expr(deals::Column::Notes, Expr::value(notes.clone()));
    }
    if changes.stage.is_terminal() {
        update = update.col_expr(deals::Column::ActivePair, Expr::value(Option::<String>::None));
    }

    let result = update
        .filter(deals::Column::Id.eq(deal.id))
        .filter(deals::Column::Version.eq(deal.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        warn!(
            deal_id = deal.id,
            expected_version = deal.version,
            "Concurrent deal update detected"
        );
        return Err(PipelineError::Conflict {
            message: "Deal was modified concurrently; reload and retry".to_string(),
            existing_deal_id: None,
        });
    }

    Ok(())
}

async fn find_by_active_pair<C: ConnectionTrait>(
    conn: &C,
    buyer_id: i32,
    listing_id: i32,
) -> PipelineResult<Option<deals::Model>> {
    let deal = Deals::find()
        .filter(deals::Column::ActivePair.eq(active_pair_key(buyer_id, listing_id)))
        .one(conn)
        .await?;
    Ok(deal)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn active_deal_conflict(existing_deal_id: Option<i32>) -> PipelineError {
    PipelineError::Conflict {
        message: "You already have an active deal for this listing".to_string(),
        existing_deal_id,
    }
}

fn deal_not_found(deal_id: i32) -> PipelineError {
    PipelineError::NotFound(format!("Deal {} not found", deal_id))
}

fn not_participant() -> PipelineError {
    PipelineError::Forbidden("Only the buyer or seller can access this deal".to_string())
}

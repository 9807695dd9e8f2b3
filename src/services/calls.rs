//! Scheduled calls between two users, optionally tied to a deal
//!
//! Creating a call linked to a deal appends CALL_SCHEDULED to the deal's
//! timeline. Later status changes only touch the call itself.

use chrono::Utc;
use sea_orm::{
    prelude::DateTimeWithTimeZone, sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition,
    ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{info, warn};

use crate::entities::deal_events::DealEventType;
use crate::entities::prelude::{ScheduledCalls, Users};
use crate::entities::scheduled_calls::{self, CallStatus};
use crate::error::{PipelineError, PipelineResult};
use crate::models::call::{CreateCallRequest, UpdateCallRequest};
use crate::services::call_machine;
use crate::services::deal_store::{load_for_participant, touch};
use crate::services::notifications::{Notification, Notifier};
use crate::services::timeline::{self, NewDealEvent};

const DEFAULT_CALL_TITLE: &str = "Call";

pub struct CallService<'a> {
    db: &'a DatabaseConnection,
    notifier: &'a Notifier,
}

impl<'a> CallService<'a> {
    pub fn new(db: &'a DatabaseConnection, notifier: &'a Notifier) -> Self {
        Self { db, notifier }
    }

    pub async fn create(
        &self,
        scheduler_id: i32,
        req: CreateCallRequest,
    ) -> PipelineResult<scheduled_calls::Model> {
        req.validate(Utc::now()).map_err(PipelineError::Validation)?;

        if req.receiver_id == scheduler_id {
            return Err(PipelineError::Validation(
                "You cannot schedule a call with yourself".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        for user_id in [scheduler_id, req.receiver_id] {
            if Users::find_by_id(user_id).one(&txn).await?.is_none() {
                return Err(PipelineError::NotFound(format!("User {} not found", user_id)));
            }
        }

        let deal = match req.deal_id {
            Some(deal_id) => {
                let deal = load_for_participant(&txn, deal_id, scheduler_id).await?;
                if deal.counterparty_of(scheduler_id) != Some(req.receiver_id) {
                    return Err(PipelineError::Forbidden(
                        "Calls on a deal must be between its buyer and seller".to_string(),
                    ));
                }
                if deal.stage.is_terminal() {
                    return Err(PipelineError::InvalidState(format!(
                        "Deal is {}; calls can no longer be scheduled",
                        deal.stage
                    )));
                }
                Some(deal)
            }
            None => None,
        };

        let title = req
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CALL_TITLE)
            .to_string();
        let now = Utc::now().fixed_offset();
        let scheduled_at = req.scheduled_at.fixed_offset();

        let call = scheduled_calls::ActiveModel {
            scheduler_id: Set(scheduler_id),
            receiver_id: Set(req.receiver_id),
            deal_id: Set(deal.as_ref().map(|d| d.id)),
            title: Set(title.clone()),
            notes: Set(req.notes),
            scheduled_at: Set(scheduled_at),
            duration_minutes: Set(req.duration_minutes),
            status: Set(scheduled_calls::CallStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(ref deal) = deal {
            timeline::record(
                &txn,
                deal.id,
                scheduler_id,
                now,
                NewDealEvent::new(DealEventType::CallScheduled, format!("Call scheduled: {}", title))
                    .with_details(format!(
                        "{} for {} minutes",
                        scheduled_at.to_rfc3339(),
                        call.duration_minutes
                    )),
            )
            .await?;
            touch(&txn, deal.id, now).await?;
        }

        txn.commit().await?;

        info!(
            call_id = call.id,
            scheduler_id = scheduler_id,
            receiver_id = call.receiver_id,
            deal_id = ?call.deal_id,
            "Call scheduled"
        );

        self.notifier.notify(Notification {
            recipient_id: call.receiver_id,
            deal_id: call.deal_id,
            subject: format!("Call request: {}", call.title),
            body: format!(
                "A call has been proposed for {} ({} minutes).",
                scheduled_at.to_rfc3339(),
                call.duration_minutes
            ),
        });

        Ok(call)
    }

    /// Move a call to a new status. The write is conditional on the status
    /// read, so two racing updates cannot both succeed.
    pub async fn update_status(
        &self,
        call_id: i32,
        actor_id: i32,
        req: UpdateCallRequest,
    ) -> PipelineResult<scheduled_calls::Model> {
        let txn = self.db.begin().await?;

        let call = ScheduledCalls::find_by_id(call_id)
            .one(&txn)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Call {} not found", call_id)))?;

        call_machine::request_call_transition(&call, req.status, actor_id)?;

        let now = Utc::now().fixed_offset();
        write_call_status(&txn, &call, req.status, now).await?;

        txn.commit().await?;

        info!(
            call_id = call.id,
            actor_id = actor_id,
            from = %call.status,
            to = %req.status,
            "Call status updated"
        );

        let counterparty = call.counterparty_of(actor_id);
        let mut updated = call;
        updated.status = req.status;
        updated.updated_at = now;

        if let Some(recipient_id) = counterparty {
            self.notifier.notify(Notification {
                recipient_id,
                deal_id: updated.deal_id,
                subject: format!("Call {}: {}", updated.status.as_str().to_lowercase(), updated.title),
                body: format!("The call \"{}\" is now {}.", updated.title, updated.status),
            });
        }

        Ok(updated)
    }

    /// Calls the user schedules or receives, soonest first
    pub async fn list_for_user(&self, user_id: i32) -> PipelineResult<Vec<scheduled_calls::Model>> {
        let calls = ScheduledCalls::find()
            .filter(
                Condition::any()
                    .add(scheduled_calls::Column::SchedulerId.eq(user_id))
                    .add(scheduled_calls::Column::ReceiverId.eq(user_id)),
            )
            .order_by_asc(scheduled_calls::Column::ScheduledAt)
            .order_by_asc(scheduled_calls::Column::Id)
            .all(self.db)
            .await?;

        Ok(calls)
    }
}

/// Set the status only if the row still holds the status `call` was read with
async fn write_call_status<C: ConnectionTrait>(
    conn: &C,
    call: &scheduled_calls::Model,
    status: CallStatus,
    now: DateTimeWithTimeZone,
) -> PipelineResult<()> {
    let result = ScheduledCalls::update_many()
        .col_expr(scheduled_calls::Column::Status, Expr::value(status))
        .col_expr(scheduled_calls::Column::UpdatedAt, Expr::value(now))
        .filter(scheduled_calls::Column::Id.eq(call.id))
        .filter(scheduled_calls::Column::Status.eq(call.status))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        warn!(call_id = call.id, expected_status = %call.status, "Concurrent call update detected");
        return Err(PipelineError::Conflict {
            message: "Call was modified concurrently; reload and retry".to_string(),
            existing_deal_id: None,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{setup_db, user};
    use chrono::Duration;

    #[tokio::test]
    async fn test_stale_status_write_is_rejected() {
        let db = setup_db().await;
        let (notifier, _rx) = Notifier::channel();
        let buyer = user(&db, "Bianca").await;
        let seller = user(&db, "Samir").await;
        let service = CallService::new(&db, &notifier);

        let call = service
            .create(
                buyer.id,
                CreateCallRequest {
                    receiver_id: seller.id,
                    scheduled_at: Utc::now() + Duration::days(1),
                    duration_minutes: 30,
                    title: None,
                    notes: None,
                    deal_id: None,
                },
            )
            .await
            .unwrap();

        service
            .update_status(
                call.id,
                seller.id,
                UpdateCallRequest {
                    status: CallStatus::Confirmed,
                },
            )
            .await
            .unwrap();

        // `call` still says PENDING
        let err = write_call_status(&db, &call, CallStatus::Cancelled, Utc::now().fixed_offset())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Conflict { .. }));

        let current = ScheduledCalls::find_by_id(call.id).one(&db).await.unwrap().unwrap();
        assert_eq!(current.status, CallStatus::Confirmed);
    }
}

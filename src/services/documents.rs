//! Due-diligence documents attached to a deal

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

use crate::entities::deal_documents;
use crate::entities::deal_events::DealEventType;
use crate::entities::prelude::DealDocuments;
use crate::error::{PipelineError, PipelineResult};
use crate::models::document::AddDocumentRequest;
use crate::services::deal_store::{load_for_participant, touch};
use crate::services::notifications::{Notification, Notifier};
use crate::services::timeline::{self, NewDealEvent};

pub struct DocumentService<'a> {
    db: &'a DatabaseConnection,
    notifier: &'a Notifier,
}

impl<'a> DocumentService<'a> {
    pub fn new(db: &'a DatabaseConnection, notifier: &'a Notifier) -> Self {
        Self { db, notifier }
    }

    pub async fn list(
        &self,
        deal_id: i32,
        actor_id: i32,
    ) -> PipelineResult<Vec<deal_documents::Model>> {
        let deal = load_for_participant(self.db, deal_id, actor_id).await?;

        let documents = DealDocuments::find()
            .filter(deal_documents::Column::DealId.eq(deal.id))
            .order_by_desc(deal_documents::Column::CreatedAt)
            .order_by_desc(deal_documents::Column::Id)
            .all(self.db)
            .await?;

        Ok(documents)
    }

    /// Attach a document and record a DOCUMENT_ADDED event in the same transaction
    pub async fn add(
        &self,
        deal_id: i32,
        actor_id: i32,
        req: AddDocumentRequest,
    ) -> PipelineResult<deal_documents::Model> {
        let txn = self.db.begin().await?;
        let deal = load_for_participant(&txn, deal_id, actor_id).await?;
        req.validate().map_err(PipelineError::Validation)?;

        if deal.stage.is_terminal() {
            return Err(PipelineError::InvalidState(format!(
                "Deal is {}; documents can no longer be added",
                deal.stage
            )));
        }

        let name = req.name.trim().to_string();
        let now = Utc::now().fixed_offset();
        let document = deal_documents::ActiveModel {
            deal_id: Set(deal.id),
            uploader_id: Set(actor_id),
            name: Set(name.clone()),
            file_url: Set(req.file_url),
            file_type: Set(req.file_type),
            file_size: Set(req.file_size),
            category: Set(req.category),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        timeline::record(
            &txn,
            deal.id,
            actor_id,
            now,
            NewDealEvent::new(DealEventType::DocumentAdded, format!("Document added: {}", name))
                .with_details(format!("Category: {}", document.category.as_str())),
        )
        .await?;
        touch(&txn, deal.id, now).await?;

        txn.commit().await?;

        info!(
            deal_id = deal.id,
            document_id = document.id,
            actor_id = actor_id,
            "Deal document added"
        );

        if let Some(recipient_id) = deal.counterparty_of(actor_id) {
            self.notifier.notify(Notification {
                recipient_id,
                deal_id: Some(deal.id),
                subject: format!("New document on deal #{}", deal.id),
                body: format!("\"{}\" was added to the deal room.", name),
            });
        }

        Ok(document)
    }
}

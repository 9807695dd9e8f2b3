//! Fire-and-forget deal notifications
//!
//! Services push a `Notification` onto an unbounded channel after their
//! transaction commits. A dispatcher task resolves the recipient's address
//! and hands the email to a `NotificationSink`. Delivery failures are logged
//! and dropped; they never reach the request that caused them.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::entities::prelude::Users;

/// Something a user should hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient_id: i32,
    pub deal_id: Option<i32>,
    pub subject: String,
    pub body: String,
}

/// Sending half handed to services
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Create a notifier and the receiver the dispatcher should drain
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a notification. Never fails the caller.
    pub fn notify(&self, notification: Notification) {
        let recipient_id = notification.recipient_id;
        if self.tx.send(notification).is_err() {
            warn!(recipient_id = recipient_id, "Notification dispatcher is gone, dropping notification");
        }
    }
}

/// Email as handed to the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug)]
pub enum NotificationError {
    UnknownRecipient(i32),
    Lookup(String),
    Transport(String),
}

impl std::fmt::Display for NotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationError::UnknownRecipient(id) => write!(f, "Unknown recipient: {}", id),
            NotificationError::Lookup(msg) => write!(f, "Recipient lookup failed: {}", msg),
            NotificationError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for NotificationError {}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

/// Sink that only logs; used when no mail gateway is configured
#[derive(Clone, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        info!(to = %message.to, subject = %message.subject, "Email (log only)");
        Ok(())
    }
}

/// Posts each email as JSON to a mail gateway
#[derive(Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Transport(format!(
                "mail gateway returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Drains the notification channel
pub struct NotificationDispatcher {
    db: DatabaseConnection,
    sink: Arc<dyn NotificationSink>,
    from: String,
}

impl NotificationDispatcher {
    pub fn new(db: DatabaseConnection, sink: Arc<dyn NotificationSink>, from: String) -> Self {
        Self { db, sink, from }
    }

    /// Run until every `Notifier` has been dropped
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<Notification>) {
        info!("Notification dispatcher started");
        while let Some(notification) = rx.recv().await {
            let recipient_id = notification.recipient_id;
            let deal_id = notification.deal_id;
            if let Err(e) = self.dispatch(notification).await {
                warn!(
                    recipient_id = recipient_id,
                    deal_id = ?deal_id,
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        }
        info!("Notification dispatcher stopped");
    }

    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        let recipient = Users::find_by_id(notification.recipient_id)
            .one(&self.db)
            .await
            .map_err(|e| NotificationError::Lookup(e.to_string()))?
            .ok_or(NotificationError::UnknownRecipient(notification.recipient_id))?;

        let message = EmailMessage {
            to: recipient.email,
            from: self.from.clone(),
            subject: notification.subject,
            body: notification.body,
        };

        self.sink.deliver(&message).await?;
        debug!(to = %message.to, subject = %message.subject, "Notification delivered");
        Ok(())
    }
}

/// Spawn the dispatcher on the current runtime
pub fn spawn_dispatcher(
    dispatcher: NotificationDispatcher,
    rx: mpsc::UnboundedReceiver<Notification>,
) -> JoinHandle<()> {
    tokio::spawn(dispatcher.run(rx))
}

//! Proactive notify: resume a user's last known conversation and deliver a message.
//!
//! Never fails: a missing reference, a delivery error, a cancellation, or a panic in the
//! adapter all come back as a [`NotifyOutcome`] for the caller to report.

use crate::channels::{callback, ChannelAdapter, ChannelError};
use crate::store::ConversationReferenceStore;
use chrono::{DateTime, Local};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of one notify call.
#[derive(Debug)]
pub enum NotifyOutcome {
    /// No conversation has been seen for the user; nothing was attempted.
    NoConversation,
    Delivered {
        timestamp: DateTime<Local>,
    },
    /// The continuation was attempted and failed. The stored reference is kept.
    DeliveryFailed {
        timestamp: DateTime<Local>,
        error: ChannelError,
    },
}

impl NotifyOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered { .. })
    }
}

/// Looks up conversation references and resumes them through a channel adapter.
pub struct Notifier {
    app_id: String,
    store: Arc<ConversationReferenceStore>,
    adapter: Arc<dyn ChannelAdapter>,
}

impl Notifier {
    pub fn new(
        app_id: impl Into<String>,
        store: Arc<ConversationReferenceStore>,
        adapter: Arc<dyn ChannelAdapter>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            store,
            adapter,
        }
    }

    /// Send `message` to the last conversation seen for `user_id`. `cancel` is handed to the
    /// adapter unchanged; if it fires first the outcome is `DeliveryFailed(Cancelled)`.
    pub async fn notify(
        &self,
        user_id: &str,
        message: &str,
        cancel: CancellationToken,
    ) -> NotifyOutcome {
        let Some(reference) = self.store.lookup(user_id) else {
            log::info!("notify: no conversation registered for {}", user_id);
            return NotifyOutcome::NoConversation;
        };

        let payload = message.to_string();
        let send = callback(move |ctx| async move {
            ctx.send_activity(&payload).await.map(|_| ())
        });
        let attempt = AssertUnwindSafe(self.adapter.continue_conversation(
            &self.app_id,
            &reference,
            send,
            cancel.clone(),
        ))
        .catch_unwind();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChannelError::Cancelled),
            res = attempt => match res {
                Ok(res) => res,
                Err(panic) => Err(ChannelError::Panicked(panic_message(&*panic))),
            },
        };

        let timestamp = Local::now();
        match result {
            Ok(()) => {
                log::debug!(
                    "notify: delivered to {} in conversation {}",
                    user_id,
                    reference.conversation.id
                );
                NotifyOutcome::Delivered { timestamp }
            }
            Err(error) => {
                log::warn!(
                    "notify: delivery to {} via {} failed: {}",
                    user_id,
                    self.adapter.id(),
                    error
                );
                NotifyOutcome::DeliveryFailed { timestamp, error }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Channel adapter trait, turn context, and the continuation callback type.

use crate::activity::{Activity, ConversationReference};
use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Errors from resuming a conversation or sending into it.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("connector request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("channel rejected activity: {status} {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid service url {url:?}: {reason}")]
    InvalidServiceUrl { url: String, reason: String },
    #[error("no credentials for app id {0:?}")]
    UnknownApp(String),
    #[error("continuation cancelled")]
    Cancelled,
    #[error("continuation panicked: {0}")]
    Panicked(String),
}

/// Connector reply to a sent activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResponse {
    #[serde(default)]
    pub id: String,
}

/// Delivers one outbound activity to the conversation described by `reference`.
#[async_trait]
pub trait ActivitySender: Send + Sync {
    async fn send_activity(
        &self,
        reference: &ConversationReference,
        activity: Activity,
    ) -> Result<ResourceResponse, ChannelError>;
}

/// Handle for one conversation: anything holding it may send into that conversation.
#[derive(Clone)]
pub struct TurnContext {
    reference: ConversationReference,
    sender: Arc<dyn ActivitySender>,
}

impl TurnContext {
    pub fn new(reference: ConversationReference, sender: Arc<dyn ActivitySender>) -> Self {
        Self { reference, sender }
    }

    /// Send a text message into the conversation as the bot.
    pub async fn send_activity(&self, text: &str) -> Result<ResourceResponse, ChannelError> {
        let activity = self.reference.message(text);
        self.sender.send_activity(&self.reference, activity).await
    }
}

/// Logic run inside a resumed conversation. Receives the live turn context.
pub type BotCallback =
    Box<dyn FnOnce(TurnContext) -> BoxFuture<'static, Result<(), ChannelError>> + Send>;

/// Box an async closure as a [`BotCallback`].
pub fn callback<F, Fut>(f: F) -> BotCallback
where
    F: FnOnce(TurnContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ChannelError>> + Send + 'static,
{
    Box::new(move |ctx| f(ctx).boxed())
}

/// Transport adapter: builds turn contexts for inbound activities and resumes stored
/// conversations for proactive sends.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Adapter id (e.g. "connector").
    fn id(&self) -> &str;

    /// Turn context for replying to an inbound activity.
    fn turn_context(&self, reference: ConversationReference) -> TurnContext;

    /// Resume the conversation denoted by `reference` as `app_id` and run `callback` in it.
    /// Completes when the callback completes, fails, or `cancel` fires.
    async fn continue_conversation(
        &self,
        app_id: &str,
        reference: &ConversationReference,
        callback: BotCallback,
        cancel: CancellationToken,
    ) -> Result<(), ChannelError>;
}

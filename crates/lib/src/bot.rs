//! Conversation handler: greets new members, echoes messages, and remembers where each
//! user can be reached so a later notify can resume the conversation.

use crate::activity::{Activity, ActivityType};
use crate::channels::{ChannelError, TurnContext};
use crate::store::ConversationReferenceStore;
use std::sync::Arc;

const WELCOME_MESSAGE: &str = "Welcome to the Proactive Bot sample";

/// Hint telling the user how to trigger a proactive message to themselves.
/// `server_url` must end in `/`.
pub fn notify_hint(server_url: &str, user_id: &str) -> String {
    format!(
        "Navigate to {}api/notify?user={}&message=Test to proactively message the user.",
        server_url, user_id
    )
}

/// Turn handler for inbound activities.
pub struct ProactiveBot {
    store: Arc<ConversationReferenceStore>,
}

impl ProactiveBot {
    pub fn new(store: Arc<ConversationReferenceStore>) -> Self {
        Self { store }
    }

    /// Handle one inbound activity. Replies go through `ctx`; `server_url` is this gateway's
    /// public base url, used in the notify hint.
    pub async fn on_turn(
        &self,
        ctx: &TurnContext,
        activity: &Activity,
        server_url: &str,
    ) -> Result<(), ChannelError> {
        match activity.typ {
            ActivityType::ConversationUpdate => {
                self.on_members_added(ctx, activity, server_url).await
            }
            ActivityType::Message => self.on_message(ctx, activity, server_url).await,
            ActivityType::Other(ref t) => {
                log::debug!("bot: ignoring {} activity", t);
                Ok(())
            }
        }
    }

    async fn on_members_added(
        &self,
        ctx: &TurnContext,
        activity: &Activity,
        server_url: &str,
    ) -> Result<(), ChannelError> {
        self.remember(activity);
        // The bot itself shows up in membersAdded when it joins; never greet it.
        let added = activity
            .members_added
            .iter()
            .filter(|m| m.id != activity.recipient.id);
        for member in added {
            log::debug!("bot: member {} added to {}", member.id, activity.conversation.id);
            ctx.send_activity(WELCOME_MESSAGE).await?;
            ctx.send_activity(&notify_hint(server_url, &activity.from.id))
                .await?;
        }
        Ok(())
    }

    async fn on_message(
        &self,
        ctx: &TurnContext,
        activity: &Activity,
        server_url: &str,
    ) -> Result<(), ChannelError> {
        self.remember(activity);
        let text = activity.text.as_deref().unwrap_or("");
        ctx.send_activity(&format!("You sent '{}'", text)).await?;
        ctx.send_activity(&notify_hint(server_url, &activity.from.id))
            .await?;
        Ok(())
    }

    /// Store the sender's conversation reference, unless the sender is the bot itself.
    fn remember(&self, activity: &Activity) {
        if activity.is_from_recipient() || activity.from.id.is_empty() {
            return;
        }
        let reference = activity.conversation_reference();
        if self.store.upsert(reference.user.id.clone(), reference) {
            log::info!(
                "bot: registered conversation {} for {}",
                activity.conversation.id,
                activity.from.id
            );
        }
    }
}

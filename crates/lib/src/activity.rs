//! Activity schema: inbound/outbound activities, channel accounts, and conversation references.
//!
//! Wire shape follows the Bot Framework connector JSON (camelCase keys). Only the fields
//! needed for routing and text messages are modelled; unknown fields are ignored on input.

use serde::{Deserialize, Serialize};

/// Activity type tag. Anything other than `message` / `conversationUpdate` is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    Message,
    ConversationUpdate,
    Other(String),
}

impl From<String> for ActivityType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "message" => ActivityType::Message,
            "conversationUpdate" => ActivityType::ConversationUpdate,
            _ => ActivityType::Other(s),
        }
    }
}

impl From<ActivityType> for String {
    fn from(t: ActivityType) -> Self {
        match t {
            ActivityType::Message => "message".to_string(),
            ActivityType::ConversationUpdate => "conversationUpdate".to_string(),
            ActivityType::Other(s) => s,
        }
    }
}

/// A user or bot account on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            role: None,
        }
    }
}

/// Conversation identity on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl ConversationAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Addressing record for resuming a conversation: who (user), as whom (bot), where
/// (conversation, channel), and through which endpoint (service url).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReference {
    /// Id of the activity the reference was captured from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    pub user: ChannelAccount,
    pub bot: ChannelAccount,
    pub conversation: ConversationAccount,
    pub channel_id: String,
    pub service_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// One activity on the wire (inbound from the channel, or outbound to it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub typ: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub service_url: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub from: ChannelAccount,
    #[serde(default)]
    pub recipient: ChannelAccount,
    #[serde(default)]
    pub conversation: ConversationAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Activity {
    /// Capture the reference needed to message the sender later. The sender becomes `user`,
    /// the recipient (this bot) becomes `bot`.
    pub fn conversation_reference(&self) -> ConversationReference {
        ConversationReference {
            activity_id: self.id.clone(),
            user: self.from.clone(),
            bot: self.recipient.clone(),
            conversation: self.conversation.clone(),
            channel_id: self.channel_id.clone(),
            service_url: self.service_url.clone(),
            locale: self.locale.clone(),
        }
    }

    /// True when the sender is the bot itself (e.g. the channel echoing our own join).
    pub fn is_from_recipient(&self) -> bool {
        self.from.id == self.recipient.id
    }
}

impl ConversationReference {
    /// Outbound text message addressed to this conversation, sent as the bot.
    pub fn message(&self, text: impl Into<String>) -> Activity {
        Activity {
            typ: ActivityType::Message,
            id: None,
            timestamp: Some(chrono::Utc::now()),
            service_url: self.service_url.clone(),
            channel_id: self.channel_id.clone(),
            from: self.bot.clone(),
            recipient: self.user.clone(),
            conversation: self.conversation.clone(),
            text: Some(text.into()),
            members_added: Vec::new(),
            reply_to_id: self.activity_id.clone(),
            locale: self.locale.clone(),
        }
    }
}

//! Channel transport.
//!
//! Adapter trait and turn context so the gateway can reply to inbound activities and
//! resume stored conversations for proactive messages. The connector adapter delivers
//! activities to the channel's service url over HTTP.

mod adapter;
mod connector;

pub use adapter::{
    callback, ActivitySender, BotCallback, ChannelAdapter, ChannelError, ResourceResponse,
    TurnContext,
};
pub use connector::{activities_url, ConnectorAdapter, ConnectorClient};

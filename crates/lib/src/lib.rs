//! Proactive core library: conversation reference store, proactive notifier, channel
//! adapter, the sample conversation handler, and the HTTP gateway used by the CLI.

pub mod activity;
pub mod bot;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod init;
pub mod notify;
pub mod store;

//! Gateway: HTTP front for the bot.
//!
//! Single port serves the inbound activity endpoint (`POST /api/messages`), the proactive
//! notify trigger (`GET /api/notify`), and a health probe (`GET /`).

mod render;
mod server;

pub use render::notify_page;
pub use server::{run_gateway, serve, GatewayState};

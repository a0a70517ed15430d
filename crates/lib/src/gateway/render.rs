//! HTML pages returned by the notify trigger.

use crate::notify::NotifyOutcome;

/// Render the notify result page. Every outcome, including failures, is a normal page;
/// failures show the error text in the `Exception:` line.
pub fn notify_page(user: &str, outcome: &NotifyOutcome) -> String {
    match outcome {
        NotifyOutcome::NoConversation => format!(
            "<html><body><h1>No messages sent</h1> <br/>There are no conversations registered to receive proactive messages for {}.</body></html>",
            escape_html(user)
        ),
        NotifyOutcome::Delivered { timestamp } => sent_page(&timestamp.to_rfc2822(), ""),
        NotifyOutcome::DeliveryFailed { timestamp, error } => {
            sent_page(&timestamp.to_rfc2822(), &escape_html(&error.to_string()))
        }
    }
}

fn sent_page(timestamp: &str, exception: &str) -> String {
    format!(
        "<html><body><h1>Proactive messages have been sent</h1> <br/> Timestamp: {} <br /> Exception: {}</body></html>",
        timestamp, exception
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

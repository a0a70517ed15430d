//! Connector adapter: posts activities to the channel's service url over HTTP.
//!
//! Outbound activities go to `{serviceUrl}/v3/conversations/{conversationId}/activities`.
//! Requests are unauthenticated; token acquisition for hosted channels is not handled here.

use crate::activity::{Activity, ConversationReference};
use crate::channels::adapter::{
    ActivitySender, BotCallback, ChannelAdapter, ChannelError, ResourceResponse, TurnContext,
};
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// HTTP client for the connector REST API.
#[derive(Clone)]
pub struct ConnectorClient {
    client: reqwest::Client,
}

impl Default for ConnectorClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

/// Build the activities url for a conversation; conversation ids are percent-encoded as one path segment.
pub fn activities_url(service_url: &str, conversation_id: &str) -> Result<Url, ChannelError> {
    let invalid = |reason: &str| ChannelError::InvalidServiceUrl {
        url: service_url.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(service_url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    url.path_segments_mut()
        .map_err(|_| invalid("cannot be a base url"))?
        .pop_if_empty()
        .extend(["v3", "conversations", conversation_id, "activities"]);
    Ok(url)
}

#[async_trait]
impl ActivitySender for ConnectorClient {
    async fn send_activity(
        &self,
        reference: &ConversationReference,
        activity: Activity,
    ) -> Result<ResourceResponse, ChannelError> {
        let url = activities_url(&reference.service_url, &reference.conversation.id)?;
        log::debug!(
            "connector: sending activity to conversation {} on {}",
            reference.conversation.id,
            reference.channel_id
        );
        let res = self.client.post(url).json(&activity).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected { status, body });
        }
        // Some channels answer 200/201 with an empty body.
        let body = res.bytes().await?;
        if body.is_empty() {
            return Ok(ResourceResponse::default());
        }
        match serde_json::from_slice(&body) {
            Ok(resp) => Ok(resp),
            Err(e) => {
                log::debug!(
                    "connector: unreadable reply from conversation {}: {}",
                    reference.conversation.id,
                    e
                );
                Ok(ResourceResponse::default())
            }
        }
    }
}

/// Channel adapter backed by [`ConnectorClient`].
pub struct ConnectorAdapter {
    id: String,
    app_id: String,
    client: Arc<ConnectorClient>,
}

impl ConnectorAdapter {
    /// `app_id` is the bot's own app id; continuations for any other non-empty id are refused.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            id: "connector".to_string(),
            app_id: app_id.into(),
            client: Arc::new(ConnectorClient::new()),
        }
    }
}

#[async_trait]
impl ChannelAdapter for ConnectorAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn turn_context(&self, reference: ConversationReference) -> TurnContext {
        TurnContext::new(reference, self.client.clone())
    }

    async fn continue_conversation(
        &self,
        app_id: &str,
        reference: &ConversationReference,
        callback: BotCallback,
        cancel: CancellationToken,
    ) -> Result<(), ChannelError> {
        if !app_id.is_empty() && app_id != self.app_id {
            return Err(ChannelError::UnknownApp(app_id.to_string()));
        }
        let ctx = self.turn_context(reference.clone());
        tokio::select! {
            _ = cancel.cancelled() => Err(ChannelError::Cancelled),
            res = callback(ctx) => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ChannelAccount, ConversationAccount};
    use crate::channels::adapter::callback;
    use axum::{extract::Path, http::StatusCode, routing::post, Json, Router};
    use std::sync::Mutex;

    fn reference(service_url: &str) -> ConversationReference {
        ConversationReference {
            activity_id: Some("in-1".to_string()),
            user: ChannelAccount::new("alice"),
            bot: ChannelAccount::new("bot"),
            conversation: ConversationAccount::new("conv/1"),
            channel_id: "test".to_string(),
            service_url: service_url.to_string(),
            locale: None,
        }
    }

    type Received = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

    async fn spawn_connector(status: StatusCode) -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/v3/conversations/:conversation_id/activities",
            post(move |Path(conversation_id): Path<String>, Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push((conversation_id, body));
                    (status, Json(serde_json::json!({ "id": "out-1" })))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}/", addr), received)
    }

    #[test]
    fn activities_url_encodes_conversation_id() {
        let url = activities_url("https://smba.example.com/amer/", "a:b/c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://smba.example.com/amer/v3/conversations/a:b%2Fc/activities"
        );
        let url = activities_url("http://localhost:3979", "conv-1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3979/v3/conversations/conv-1/activities");
    }

    #[test]
    fn activities_url_rejects_non_http() {
        assert!(matches!(
            activities_url("mailto:bot@example.com", "c"),
            Err(ChannelError::InvalidServiceUrl { .. })
        ));
        assert!(matches!(
            activities_url("not a url", "c"),
            Err(ChannelError::InvalidServiceUrl { .. })
        ));
    }

    #[tokio::test]
    async fn continuation_posts_message_to_conversation() {
        let (url, received) = spawn_connector(StatusCode::OK).await;
        let adapter = ConnectorAdapter::new("app-1");
        let callback = callback(|ctx| async move {
            let res = ctx.send_activity("hello").await?;
            assert_eq!(res.id, "out-1");
            Ok::<(), ChannelError>(())
        });
        adapter
            .continue_conversation("app-1", &reference(&url), callback, CancellationToken::new())
            .await
            .unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let (conversation_id, body) = &received[0];
        assert_eq!(conversation_id, "conv/1");
        assert_eq!(body["type"], "message");
        assert_eq!(body["text"], "hello");
        assert_eq!(body["from"]["id"], "bot");
        assert_eq!(body["recipient"]["id"], "alice");
    }

    #[tokio::test]
    async fn unreadable_reply_defaults_to_empty_response() {
        let app = Router::new().route(
            "/v3/conversations/:conversation_id/activities",
            post(|| async { (StatusCode::CREATED, "not json") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        let client = ConnectorClient::new();
        let r = reference(&format!("http://{}/", addr));
        let res = client.send_activity(&r, r.message("x")).await.unwrap();
        assert_eq!(res, ResourceResponse::default());
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let (url, _received) = spawn_connector(StatusCode::FORBIDDEN).await;
        let client = ConnectorClient::new();
        let r = reference(&url);
        let err = client.send_activity(&r, r.message("x")).await.unwrap_err();
        assert!(matches!(err, ChannelError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn foreign_app_id_is_refused() {
        let adapter = ConnectorAdapter::new("app-1");
        let callback = callback(|_ctx| async { Ok(()) });
        let err = adapter
            .continue_conversation(
                "someone-else",
                &reference("http://127.0.0.1:1/"),
                callback,
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::UnknownApp(id) if id == "someone-else"));
    }

    #[tokio::test]
    async fn cancelled_token_stops_continuation() {
        let adapter = ConnectorAdapter::new("");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let callback = callback(|_ctx| std::future::pending());
        let err = adapter
            .continue_conversation("", &reference("http://127.0.0.1:1/"), callback, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Cancelled));
    }
}

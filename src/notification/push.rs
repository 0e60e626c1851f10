//! Mobile push delivery over the Expo push service and FCM.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Expo accepts at most this many messages per request.
pub const EXPO_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRecipient {
    pub user_id: Uuid,
    pub token_expo: Option<String>,
    pub fcm_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    NoToken,
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push rejected: {0}")]
    Rejected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    fn channel(&self) -> &'static str;

    async fn send(
        &self,
        recipient: &PushRecipient,
        message: &PushMessage,
    ) -> Result<PushOutcome, PushError>;
}

pub fn is_expo_push_token(token: &str) -> bool {
    (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
        && token.ends_with(']')
}

#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    sound: &'static str,
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    message: Option<String>,
}

#[derive(Clone)]
pub struct ExpoPushSender {
    client: reqwest::Client,
    url: String,
}

impl ExpoPushSender {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn post(&self, messages: &[ExpoMessage<'_>]) -> Result<Vec<ExpoTicket>, PushError> {
        let response = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(messages)
            .send()
            .await?
            .error_for_status()?
            .json::<ExpoResponse>()
            .await?;

        Ok(response.data)
    }

    /// Sends one message to many Expo tokens in batches. Invalid tokens are
    /// skipped and a failed batch does not stop the remaining ones.
    /// Returns the number of tickets Expo accepted.
    pub async fn send_many(&self, tokens: &[String], message: &PushMessage) -> usize {
        let valid: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| is_expo_push_token(t))
            .collect();

        if valid.len() < tokens.len() {
            debug!("Skipping {} invalid Expo tokens", tokens.len() - valid.len());
        }

        let mut accepted = 0;
        for chunk in valid.chunks(EXPO_BATCH_SIZE) {
            let batch: Vec<ExpoMessage> = chunk
                .iter()
                .map(|to| ExpoMessage {
                    to,
                    sound: "default",
                    title: &message.title,
                    body: &message.body,
                    data: message.data.as_ref(),
                })
                .collect();

            match self.post(&batch).await {
                Ok(tickets) => {
                    accepted += tickets.iter().filter(|t| t.status == "ok").count();
                }
                Err(e) => warn!("Expo batch of {} failed: {}", chunk.len(), e),
            }
        }

        accepted
    }
}

#[async_trait]
impl PushSender for ExpoPushSender {
    fn channel(&self) -> &'static str {
        "expo"
    }

    async fn send(
        &self,
        recipient: &PushRecipient,
        message: &PushMessage,
    ) -> Result<PushOutcome, PushError> {
        let Some(token) = recipient.token_expo.as_deref().filter(|t| is_expo_push_token(t)) else {
            return Ok(PushOutcome::NoToken);
        };

        let tickets = self
            .post(&[ExpoMessage {
                to: token,
                sound: "default",
                title: &message.title,
                body: &message.body,
                data: message.data.as_ref(),
            }])
            .await?;

        match tickets.into_iter().find(|t| t.status != "ok") {
            Some(ticket) => Err(PushError::Rejected(
                ticket.message.unwrap_or(ticket.status),
            )),
            None => Ok(PushOutcome::Delivered),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    failure: i64,
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Clone)]
pub struct FcmPushSender {
    client: reqwest::Client,
    url: String,
    server_key: String,
}

impl FcmPushSender {
    pub fn new(client: reqwest::Client, url: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            server_key: server_key.into(),
        }
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    fn channel(&self) -> &'static str {
        "fcm"
    }

    async fn send(
        &self,
        recipient: &PushRecipient,
        message: &PushMessage,
    ) -> Result<PushOutcome, PushError> {
        let Some(token) = recipient.fcm_token.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Ok(PushOutcome::NoToken);
        };

        let payload = json!({
            "to": token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data.clone().unwrap_or(Value::Null),
        });

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json::<FcmResponse>()
            .await?;

        if response.failure > 0 {
            return Err(PushError::Rejected(
                response
                    .results
                    .first()
                    .and_then(|r| r.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("FCM delivery failed")
                    .to_string(),
            ));
        }

        Ok(PushOutcome::Delivered)
    }
}

/// Delivers over every configured channel concurrently. A channel failing is
/// logged and never surfaces to the caller.
#[derive(Clone)]
pub struct MultiChannelPush {
    channels: Vec<Arc<dyn PushSender>>,
}

impl MultiChannelPush {
    pub fn new(channels: Vec<Arc<dyn PushSender>>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl PushSender for MultiChannelPush {
    fn channel(&self) -> &'static str {
        "multi"
    }

    async fn send(
        &self,
        recipient: &PushRecipient,
        message: &PushMessage,
    ) -> Result<PushOutcome, PushError> {
        let results = futures::future::join_all(
            self.channels
                .iter()
                .map(|channel| async move { (channel.channel(), channel.send(recipient, message).await) }),
        )
        .await;

        let mut outcome = PushOutcome::NoToken;
        for (channel, result) in results {
            match result {
                Ok(PushOutcome::Delivered) => outcome = PushOutcome::Delivered,
                Ok(PushOutcome::NoToken) => {
                    debug!("No {} token for user {}", channel, recipient.user_id)
                }
                Err(e) => warn!(
                    "Push over {} failed for user {}: {}",
                    channel, recipient.user_id, e
                ),
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> PushRecipient {
        PushRecipient {
            user_id: Uuid::new_v4(),
            token_expo: Some("ExponentPushToken[abc]".to_string()),
            fcm_token: Some("fcm-token".to_string()),
        }
    }

    fn message() -> PushMessage {
        PushMessage {
            title: "t".to_string(),
            body: "b".to_string(),
            data: None,
        }
    }

    fn mock_channel(
        name: &'static str,
        result: fn() -> Result<PushOutcome, PushError>,
    ) -> Arc<dyn PushSender> {
        let mut mock = MockPushSender::new();
        mock.expect_channel().return_const(name);
        mock.expect_send().times(1).returning(move |_, _| result());
        Arc::new(mock)
    }

    #[test]
    fn test_expo_token_format() {
        assert!(is_expo_push_token("ExponentPushToken[xxxxxxxx]"));
        assert!(is_expo_push_token("ExpoPushToken[xxxxxxxx]"));
        assert!(!is_expo_push_token("ExponentPushToken[unterminated"));
        assert!(!is_expo_push_token("fcm:abcdef"));
        assert!(!is_expo_push_token(""));
    }

    #[tokio::test]
    async fn test_one_failing_channel_does_not_fail_delivery() {
        let push = MultiChannelPush::new(vec![
            mock_channel("expo", || Err(PushError::Rejected("DeviceNotRegistered".into()))),
            mock_channel("fcm", || Ok(PushOutcome::Delivered)),
        ]);

        let outcome = push.send(&recipient(), &message()).await.unwrap();
        assert_eq!(outcome, PushOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_all_channels_failing_is_swallowed() {
        let push = MultiChannelPush::new(vec![
            mock_channel("expo", || Err(PushError::Rejected("boom".into()))),
            mock_channel("fcm", || Ok(PushOutcome::NoToken)),
        ]);

        let outcome = push.send(&recipient(), &message()).await.unwrap();
        assert_eq!(outcome, PushOutcome::NoToken);
    }

    #[tokio::test]
    async fn test_expo_without_valid_token_skips_request() {
        // Unroutable URL: a request attempt would surface as an error.
        let sender = ExpoPushSender::new(reqwest::Client::new(), "http://127.0.0.1:1/push");
        let mut r = recipient();
        r.token_expo = Some("not-a-token".to_string());

        let outcome = sender.send(&r, &message()).await.unwrap();
        assert_eq!(outcome, PushOutcome::NoToken);
        assert_eq!(sender.send_many(&["bad".to_string()], &message()).await, 0);
    }

    #[tokio::test]
    async fn test_fcm_without_token_skips_request() {
        let sender = FcmPushSender::new(reqwest::Client::new(), "http://127.0.0.1:1/fcm", "key");
        let mut r = recipient();
        r.fcm_token = None;

        assert_eq!(sender.send(&r, &message()).await.unwrap(), PushOutcome::NoToken);
    }
}

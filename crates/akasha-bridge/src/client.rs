//! GoWA bridge HTTP client.
//!
//! Basic-auth REST client for the GoWA WhatsApp service. Sends carry a
//! small bounded retry; downloads handle GoWA's JSON-instead-of-binary
//! quirk where an auto-downloaded file comes back as a success notice
//! pointing at a static path.

use akasha_core::{
    config::BridgeConfig,
    error::AkashaError,
    message::{HistoryMessage, MediaPayload, OutboundDispatch, SendReceipt},
    traits::MessagingGateway,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SEND_ATTEMPTS: usize = 3;
const DOWNLOAD_ATTEMPTS: usize = 2;
const DOWNLOAD_NOTICE: &str = "downloaded successfully to ";

/// HTTP client for the GoWA WhatsApp bridge.
pub struct BridgeClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl BridgeClient {
    /// Create from config values.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .basic_auth(&self.username, Some(&self.password))
            .timeout(REQUEST_TIMEOUT)
    }

    /// Whether a failed attempt is worth retrying: transport errors and
    /// server-side status codes.
    fn retryable(result: &Result<reqwest::Response, reqwest::Error>) -> bool {
        match result {
            Ok(resp) => resp.status().is_server_error(),
            Err(_) => true,
        }
    }

    async fn get_with_retry(
        &self,
        path: &str,
        query: &[(&str, &str)],
        attempts: usize,
    ) -> Result<reqwest::Response, AkashaError> {
        let mut delay = Duration::from_secs(1);
        for attempt in 1..=attempts {
            let result = self.get(path).query(query).send().await;
            if attempt < attempts && Self::retryable(&result) {
                warn!("bridge: GET {path} attempt {attempt}/{attempts} failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }
            return result.map_err(|e| AkashaError::Bridge(format!("GET {path} failed: {e}")));
        }
        unreachable!("retry loop always returns on the last attempt")
    }

    async fn post_json_with_retry<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
        attempts: usize,
    ) -> Result<reqwest::Response, AkashaError> {
        let mut delay = Duration::from_secs(2);
        for attempt in 1..=attempts {
            let result = self
                .client
                .post(self.url(path))
                .basic_auth(&self.username, Some(&self.password))
                .timeout(REQUEST_TIMEOUT)
                .json(body)
                .send()
                .await;
            if attempt < attempts && Self::retryable(&result) {
                warn!("bridge: POST {path} attempt {attempt}/{attempts} failed, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(10));
                continue;
            }
            return result.map_err(|e| AkashaError::Bridge(format!("POST {path} failed: {e}")));
        }
        unreachable!("retry loop always returns on the last attempt")
    }

    /// Content-Type with any parameters stripped.
    fn mime_of(resp: &reqwest::Response) -> String {
        resp.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .split(';')
            .next()
            .unwrap_or("application/octet-stream")
            .trim()
            .to_string()
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    phone: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_message_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    results: Option<SendResult>,
}

#[derive(Deserialize)]
struct SendResult {
    #[serde(default)]
    message_id: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    results: Vec<HistoryMessage>,
}

#[derive(Deserialize)]
struct DownloadNotice {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl MessagingGateway for BridgeClient {
    async fn send(&self, dispatch: &OutboundDispatch) -> Result<SendReceipt, AkashaError> {
        let body = SendMessageRequest {
            phone: &dispatch.destination,
            message: &dispatch.body,
            reply_message_id: dispatch.reply_to.as_deref(),
        };

        let resp = self
            .post_json_with_retry("/send/message", &body, SEND_ATTEMPTS)
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AkashaError::Bridge(format!(
                "send returned {status}: {text}"
            )));
        }

        let parsed: SendResponse = resp
            .json()
            .await
            .map_err(|e| AkashaError::Bridge(format!("send: failed to parse response: {e}")))?;

        if parsed.code != "SUCCESS" {
            return Err(AkashaError::Bridge(format!(
                "send rejected: {} {}",
                parsed.code, parsed.message
            )));
        }

        let results = parsed
            .results
            .ok_or_else(|| AkashaError::Bridge("send: missing results".to_string()))?;

        info!(
            "message sent to {}: {}",
            dispatch.destination, results.message_id
        );
        Ok(SendReceipt {
            message_id: results.message_id,
            status: results.status,
        })
    }

    async fn download(&self, message_id: &str, phone: &str) -> Result<MediaPayload, AkashaError> {
        let path = format!("/message/{message_id}/download");
        let resp = self
            .get_with_retry(&path, &[("phone", phone)], DOWNLOAD_ATTEMPTS)
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AkashaError::Bridge(format!(
                "download of {message_id} returned {status}"
            )));
        }

        let mime_type = Self::mime_of(&resp);

        // GoWA answers with JSON in two cases: no downloadable media
        // (error), or the media was auto-downloaded to disk and the
        // body names the static path.
        if mime_type == "application/json" {
            let notice: DownloadNotice = resp.json().await.map_err(|e| {
                AkashaError::Bridge(format!("download: unreadable JSON body: {e}"))
            })?;
            if let Some(pos) = notice.message.find(DOWNLOAD_NOTICE) {
                let file_path = notice.message[pos + DOWNLOAD_NOTICE.len()..].trim();
                info!("media was auto-downloaded, fetching from path: {file_path}");
                return self.download_from_path(file_path).await;
            }
            return Err(AkashaError::Bridge(format!(
                "no downloadable media: {}",
                notice.message
            )));
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| AkashaError::Bridge(format!("download: failed to read body: {e}")))?
            .to_vec();

        info!(
            "downloaded media from message {message_id}: {mime_type}, {} bytes",
            data.len()
        );
        Ok(MediaPayload { data, mime_type })
    }

    async fn download_from_path(&self, file_path: &str) -> Result<MediaPayload, AkashaError> {
        // GoWA serves static files at the root path.
        let resp = self
            .get_with_retry(file_path, &[], DOWNLOAD_ATTEMPTS)
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AkashaError::Bridge(format!(
                "static fetch of {file_path} returned {status}"
            )));
        }

        let mime_type = Self::mime_of(&resp);
        if mime_type == "application/json" {
            return Err(AkashaError::Bridge(format!(
                "failed to download media from path: {file_path}"
            )));
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| AkashaError::Bridge(format!("static fetch: failed to read body: {e}")))?
            .to_vec();

        info!(
            "downloaded media from path {file_path}: {mime_type}, {} bytes",
            data.len()
        );
        Ok(MediaPayload { data, mime_type })
    }

    async fn fetch_history(
        &self,
        chat_jid: &str,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, AkashaError> {
        let path = format!("/chat/{chat_jid}/messages");
        let limit = limit.to_string();
        let resp = self
            .get_with_retry(&path, &[("limit", limit.as_str())], DOWNLOAD_ATTEMPTS)
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AkashaError::Bridge(format!(
                "history fetch for {chat_jid} returned {status}"
            )));
        }

        let parsed: HistoryResponse = resp
            .json()
            .await
            .map_err(|e| AkashaError::Bridge(format!("history: failed to parse response: {e}")))?;

        if parsed.code != "SUCCESS" {
            return Err(AkashaError::Bridge(format!(
                "history fetch rejected: {} {}",
                parsed.code, parsed.message
            )));
        }

        info!(
            "fetched {} messages from {chat_jid}",
            parsed.results.len()
        );
        Ok(parsed.results)
    }

    async fn check_health(&self) -> bool {
        match self.get("/app/devices").send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                error!("bridge health check failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BridgeClient {
        BridgeClient::from_config(&BridgeConfig {
            base_url: "http://whatsapp:3000/".into(),
            username: "user1".into(),
            password: "pass1".into(),
        })
    }

    #[test]
    fn test_url_joining() {
        let c = client();
        assert_eq!(c.url("/send/message"), "http://whatsapp:3000/send/message");
        assert_eq!(
            c.url("statics/media/a.jpg"),
            "http://whatsapp:3000/statics/media/a.jpg"
        );
    }

    #[test]
    fn test_send_request_serialization() {
        let body = SendMessageRequest {
            phone: "62811@s.whatsapp.net",
            message: "hello",
            reply_message_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["phone"], "62811@s.whatsapp.net");
        assert!(json.get("reply_message_id").is_none());

        let body = SendMessageRequest {
            phone: "62811@s.whatsapp.net",
            message: "hello",
            reply_message_id: Some("MSG-1"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["reply_message_id"], "MSG-1");
    }

    #[test]
    fn test_send_response_parsing() {
        let json = r#"{"code":"SUCCESS","message":"ok",
            "results":{"message_id":"3EB0","status":"sent"}}"#;
        let resp: SendResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.code, "SUCCESS");
        assert_eq!(resp.results.unwrap().message_id, "3EB0");
    }

    #[test]
    fn test_history_response_parsing() {
        let json = r#"{"code":"SUCCESS","message":"ok","results":[
            {"sender_jid":"62811@s.whatsapp.net","content":"hi"},
            {"sender_jid":"62822@s.whatsapp.net","content":"hello"}
        ]}"#;
        let resp: HistoryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[1].content, "hello");
    }

    #[test]
    fn test_download_notice_path_extraction() {
        let notice = "Media downloaded successfully to statics/media/16-xyz.jpg";
        let pos = notice.find(DOWNLOAD_NOTICE).unwrap();
        let path = notice[pos + DOWNLOAD_NOTICE.len()..].trim();
        assert_eq!(path, "statics/media/16-xyz.jpg");
    }
}

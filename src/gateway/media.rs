//! Media resolution for triggered image messages.

use akasha_core::{
    error::AkashaError,
    jid,
    message::MediaPayload,
    track::MediaPathCache,
    traits::MessagingGateway,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Fetches media bytes for a message, trying the cheapest source first:
/// the path delivered in the webhook itself, then the cached path from
/// an earlier webhook, then the on-demand download API.
pub struct MediaResolver {
    bridge: Arc<dyn MessagingGateway>,
    cache: Arc<MediaPathCache>,
}

impl MediaResolver {
    pub fn new(bridge: Arc<dyn MessagingGateway>, cache: Arc<MediaPathCache>) -> Self {
        Self { bridge, cache }
    }

    /// Resolve the media for `message_id`. Each source failure falls
    /// through to the next; only full exhaustion is an error.
    pub async fn resolve(
        &self,
        message_id: &str,
        delivered_path: Option<&str>,
        sender_jid: &str,
    ) -> Result<MediaPayload, AkashaError> {
        if let Some(path) = delivered_path {
            match self.bridge.download_from_path(path).await {
                Ok(payload) => {
                    info!(
                        "downloaded media from delivered path: {} ({} bytes)",
                        payload.mime_type,
                        payload.data.len()
                    );
                    return Ok(payload);
                }
                Err(e) => warn!("failed to download from delivered path {path}: {e}"),
            }
        }

        if let Some(path) = self.cache.get(message_id).await {
            match self.bridge.download_from_path(&path).await {
                Ok(payload) => {
                    info!(
                        "downloaded media from cached path: {} ({} bytes)",
                        payload.mime_type,
                        payload.data.len()
                    );
                    return Ok(payload);
                }
                Err(e) => warn!("failed to download from cached path {path}: {e}"),
            }
        }

        let phone = jid::download_phone(sender_jid);
        match self.bridge.download(message_id, &phone).await {
            Ok(payload) => {
                info!(
                    "downloaded media via API: {} ({} bytes)",
                    payload.mime_type,
                    payload.data.len()
                );
                Ok(payload)
            }
            Err(e) => {
                warn!("failed to download media for {message_id} via API: {e}");
                Err(AkashaError::MediaUnavailable(format!(
                    "could not fetch media for message {message_id}"
                )))
            }
        }
    }
}

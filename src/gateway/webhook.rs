//! Webhook payload parsing and normalization.
//!
//! GoWA delivers an inconsistent shape: text messages carry their ID
//! and reply context inside the `message` object, media messages at
//! the top level. Everything funnels into `InboundMessage` here so the
//! rest of the pipeline never sees the raw payload.

use akasha_core::message::{InboundMessage, MediaKind};
use chrono::Utc;
use serde::Deserialize;

/// Raw webhook event as GoWA posts it. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub pushname: String,
    #[serde(default)]
    pub message: Option<MessageBody>,
    #[serde(default)]
    pub image: Option<MediaInfo>,
    #[serde(default)]
    pub video: Option<MediaInfo>,
    #[serde(default)]
    pub audio: Option<MediaInfo>,
    #[serde(default)]
    pub reaction: Option<serde_json::Value>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub replied_id: Option<String>,
    #[serde(default)]
    pub quoted_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub replied_id: Option<String>,
    #[serde(default)]
    pub quoted_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub caption: String,
}

impl WebhookPayload {
    pub fn is_reaction(&self) -> bool {
        self.reaction.is_some()
    }

    fn media_kind(&self) -> Option<MediaKind> {
        if self.image.is_some() {
            Some(MediaKind::Image)
        } else if self.video.is_some() {
            Some(MediaKind::Video)
        } else if self.audio.is_some() {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    fn caption(&self) -> &str {
        [&self.image, &self.video, &self.audio]
            .into_iter()
            .flatten()
            .map(|m| m.caption.as_str())
            .next()
            .unwrap_or("")
    }

    /// Flatten into the normalized inbound shape.
    pub fn normalize(&self) -> InboundMessage {
        let media = self.media_kind();

        let (id, text, replied_id, quoted_text) = if media.is_some() {
            // Media: ID is documented at top level, but some bridge
            // versions put it in the message object.
            let id = if !self.id.is_empty() {
                self.id.clone()
            } else {
                self.message.as_ref().map(|m| m.id.clone()).unwrap_or_default()
            };
            (
                id,
                self.caption().to_string(),
                self.replied_id.clone(),
                self.quoted_message.clone(),
            )
        } else {
            let body = self.message.as_ref();
            (
                body.map(|m| m.id.clone()).unwrap_or_default(),
                body.map(|m| m.text.clone()).unwrap_or_default(),
                body.and_then(|m| m.replied_id.clone()),
                body.and_then(|m| m.quoted_message.clone()),
            )
        };

        InboundMessage {
            id,
            sender_jid: self.from.clone(),
            sender_name: self.pushname.clone(),
            text,
            media,
            file_path: self.file_path.clone(),
            replied_id: replied_id.filter(|r| !r.is_empty()),
            quoted_text: quoted_text.filter(|q| !q.is_empty()),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> WebhookPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_text_message() {
        let payload = parse(
            r#"{
                "from": "628123@s.whatsapp.net",
                "pushname": "Alice",
                "message": {
                    "id": "MSG1",
                    "text": "hey akasha, hello",
                    "replied_id": "PREV1",
                    "quoted_message": "earlier text"
                }
            }"#,
        );
        let msg = payload.normalize();
        assert_eq!(msg.id, "MSG1");
        assert_eq!(msg.sender_jid, "628123@s.whatsapp.net");
        assert_eq!(msg.sender_name, "Alice");
        assert_eq!(msg.text, "hey akasha, hello");
        assert_eq!(msg.media, None);
        assert_eq!(msg.replied_id.as_deref(), Some("PREV1"));
        assert_eq!(msg.quoted_text.as_deref(), Some("earlier text"));
    }

    #[test]
    fn test_normalize_image_uses_top_level_fields() {
        let payload = parse(
            r#"{
                "id": "IMG1",
                "from": "628123@s.whatsapp.net",
                "pushname": "Bob",
                "image": {"caption": "hey akasha, what is this?"},
                "file_path": "statics/media/a.jpg",
                "replied_id": "PREV2"
            }"#,
        );
        let msg = payload.normalize();
        assert_eq!(msg.id, "IMG1");
        assert_eq!(msg.media, Some(MediaKind::Image));
        assert_eq!(msg.text, "hey akasha, what is this?");
        assert_eq!(msg.file_path.as_deref(), Some("statics/media/a.jpg"));
        assert_eq!(msg.replied_id.as_deref(), Some("PREV2"));
    }

    #[test]
    fn test_normalize_media_id_falls_back_to_message_object() {
        let payload = parse(
            r#"{
                "from": "628123@s.whatsapp.net",
                "image": {"caption": ""},
                "message": {"id": "NESTED1", "text": ""}
            }"#,
        );
        let msg = payload.normalize();
        assert_eq!(msg.id, "NESTED1");
        assert_eq!(msg.media, Some(MediaKind::Image));
    }

    #[test]
    fn test_empty_reply_fields_become_none() {
        let payload = parse(
            r#"{
                "from": "x@s.whatsapp.net",
                "message": {"id": "M", "text": "hi", "replied_id": "", "quoted_message": ""}
            }"#,
        );
        let msg = payload.normalize();
        assert_eq!(msg.replied_id, None);
        assert_eq!(msg.quoted_text, None);
    }

    #[test]
    fn test_reaction_detection() {
        let payload = parse(r#"{"from": "x@s.whatsapp.net", "reaction": {"text": "👍"}}"#);
        assert!(payload.is_reaction());
        assert!(!parse(r#"{"from": "x@s.whatsapp.net"}"#).is_reaction());
    }

    #[test]
    fn test_video_and_audio_kinds() {
        let video = parse(r#"{"id": "V", "video": {"caption": "clip"}}"#).normalize();
        assert_eq!(video.media, Some(MediaKind::Video));
        let audio = parse(r#"{"id": "A", "audio": {}}"#).normalize();
        assert_eq!(audio.media, Some(MediaKind::Audio));
    }
}

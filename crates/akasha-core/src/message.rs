use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media kinds the bridge delivers on webhook events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// A normalized inbound webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Bridge-assigned message ID. Empty when the payload carried none.
    pub id: String,
    /// Raw sender JID as delivered, possibly compound ("device in group").
    pub sender_jid: String,
    pub sender_name: String,
    /// Text body, or the caption for media messages.
    pub text: String,
    pub media: Option<MediaKind>,
    /// Static file path the bridge already saved this media to, if any.
    pub file_path: Option<String>,
    /// ID of the message this one replies to.
    pub replied_id: Option<String>,
    /// Text of the quoted message, when replying.
    pub quoted_text: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An outgoing message routed through the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundDispatch {
    /// Destination JID (group or individual).
    pub destination: String,
    pub body: String,
    /// Message ID to attach this as a reply to.
    pub reply_to: Option<String>,
}

/// Acknowledgement from the bridge for a sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub status: String,
}

/// Raw media bytes with their MIME type.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// A single entry of chat history fetched from the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub sender_jid: String,
    #[serde(default)]
    pub content: String,
}

/// One web search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Image input attached to a completion request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Request for the tool-calling completion path.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub image: Option<ImageInput>,
}

/// Final text of a completion plus every source URL surfaced by tool calls,
/// in order of appearance.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub sources: Vec<String>,
}

/// Request for the plain generation path (no tools).
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

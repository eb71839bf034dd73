//! Gateway: turns normalized webhook events into LLM replies.
//!
//! The pipeline order is load-bearing: self-sent check, atomic
//! claim-as-processed, media path caching, lazy sweep, then trigger
//! dispatch. Claiming before processing prevents double replies when
//! the bridge redelivers on timeout.

mod apology;
mod media;
mod trigger;
pub mod webhook;

use akasha_core::{
    config::ReplyConfig,
    jid,
    message::{ImageInput, InboundMessage, MediaKind, OutboundDispatch},
    track::{MediaPathCache, TrackedIdStore},
    traits::MessagingGateway,
};
use akasha_llm::ProviderRouter;
use media::MediaResolver;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use trigger::ReplyDecisionEngine;
use webhook::WebhookPayload;

use crate::summarizer::ChatSummarizer;

/// How long dedup and media path entries live.
const ID_TTL: Duration = Duration::from_secs(86_400);

pub struct Gateway {
    router: Arc<ProviderRouter>,
    bridge: Arc<dyn MessagingGateway>,
    trigger: ReplyDecisionEngine,
    resolver: MediaResolver,
    media_paths: Arc<MediaPathCache>,
    /// IDs of messages we sent, so replies to them trigger without a prefix.
    self_sent: TrackedIdStore,
    /// IDs already handled, against bridge redelivery.
    processed: TrackedIdStore,
    summarizer: Option<ChatSummarizer>,
    reply: ReplyConfig,
}

impl Gateway {
    pub fn new(
        router: Arc<ProviderRouter>,
        bridge: Arc<dyn MessagingGateway>,
        reply: ReplyConfig,
        summarizer: Option<ChatSummarizer>,
    ) -> Self {
        let media_paths = Arc::new(MediaPathCache::new());
        let resolver = MediaResolver::new(bridge.clone(), media_paths.clone());
        let trigger = ReplyDecisionEngine::new(&reply.trigger_phrase);
        Self {
            router,
            bridge,
            trigger,
            resolver,
            media_paths,
            self_sent: TrackedIdStore::new(),
            processed: TrackedIdStore::new(),
            summarizer,
            reply,
        }
    }

    pub fn trigger_phrase(&self) -> &str {
        self.trigger.trigger_phrase()
    }

    /// Handle one webhook event end to end.
    pub async fn handle_event(&self, payload: WebhookPayload) {
        if payload.is_reaction() {
            debug!("ignoring reaction event from {}", payload.from);
            return;
        }

        let msg = payload.normalize();
        info!(
            "webhook event: media={:?} from={} ({})",
            msg.media, msg.sender_name, msg.sender_jid
        );

        if !msg.id.is_empty() {
            if self.self_sent.contains(&msg.id).await {
                debug!("skipping own message {}", msg.id);
                return;
            }
            // Claiming the ID and checking it happen under one lock so
            // concurrently redelivered copies cannot both proceed.
            if !self.processed.mark(&msg.id).await {
                debug!("skipping already processed message {}", msg.id);
                return;
            }
        }

        if let (false, Some(path)) = (msg.id.is_empty(), &msg.file_path) {
            self.media_paths.insert(&msg.id, path).await;
            debug!("cached media path for {}: {path}", msg.id);
        }

        self.sweep().await;

        if let Some(count) = self.summarize_request(&msg) {
            self.handle_summary(&msg, count).await;
            return;
        }

        if !self.reply.enabled {
            return;
        }

        match msg.media {
            None if !msg.text.is_empty() => self.handle_text(&msg).await,
            Some(MediaKind::Image) => self.handle_image(&msg).await,
            _ => debug!("no actionable content in event"),
        }
    }

    async fn sweep(&self) {
        let removed = self.self_sent.sweep(ID_TTL).await
            + self.processed.sweep(ID_TTL).await
            + self.media_paths.sweep(ID_TTL).await;
        if removed > 0 {
            debug!("swept {removed} expired tracking entries");
        }
    }

    fn summarize_request(&self, msg: &InboundMessage) -> Option<usize> {
        if msg.media.is_some() {
            return None;
        }
        self.summarizer.as_ref()?.parse_trigger(&msg.text)
    }

    async fn handle_summary(&self, msg: &InboundMessage, count: usize) {
        // Checked by summarize_request.
        let Some(summarizer) = &self.summarizer else {
            return;
        };
        let destination = jid::reply_destination(&msg.sender_jid);
        info!("summarize command from {}: {count} messages", msg.sender_name);

        match summarizer.summarize(&destination, count).await {
            Ok(text) => self.send_and_track(&destination, text, reply_to(msg)).await,
            Err(e) => {
                error!("chat summary failed: {e}");
                let text = apology::apology_for(&e.to_string()).to_string();
                self.send_and_track(&destination, text, reply_to(msg)).await;
            }
        }
    }

    async fn handle_text(&self, msg: &InboundMessage) {
        let is_reply_to_self = match &msg.replied_id {
            Some(replied) => self.self_sent.contains(replied).await,
            None => false,
        };

        let query = if self.trigger.should_trigger(&msg.text) {
            self.trigger.extract_query(&msg.text)
        } else if is_reply_to_self {
            // Replying to one of our messages needs no prefix.
            msg.text.clone()
        } else {
            return;
        };

        info!("reply triggered by {}: {query}", msg.sender_name);
        let destination = jid::reply_destination(&msg.sender_jid);

        // When replying to a media message, try to attach its image.
        let mut image = None;
        if let Some(replied) = &msg.replied_id {
            match self
                .resolver
                .resolve(replied, msg.file_path.as_deref(), &msg.sender_jid)
                .await
            {
                Ok(payload) => {
                    image = Some(ImageInput {
                        data: payload.data,
                        mime_type: payload.mime_type,
                    })
                }
                Err(e) => debug!("no quoted media for {replied}: {e}"),
            }
        }

        match self
            .router
            .process(&query, msg.quoted_text.as_deref(), image)
            .await
        {
            Ok(completion) => {
                self.send_and_track(&destination, completion.text, reply_to(msg))
                    .await
            }
            Err(e) => {
                error!("reply processing failed: {e}");
                let text = apology::apology_for(&e.to_string()).to_string();
                self.send_and_track(&destination, text, reply_to(msg)).await;
            }
        }
    }

    async fn handle_image(&self, msg: &InboundMessage) {
        let is_reply_to_self = match &msg.replied_id {
            Some(replied) => self.self_sent.contains(replied).await,
            None => false,
        };

        if !self.trigger.should_trigger(&msg.text) && !is_reply_to_self {
            return;
        }

        if msg.id.is_empty() {
            warn!("image trigger without a message ID, cannot download; dropping");
            return;
        }

        let destination = jid::reply_destination(&msg.sender_jid);

        let payload = match self
            .resolver
            .resolve(&msg.id, msg.file_path.as_deref(), &msg.sender_jid)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                error!("image download failed: {e}");
                let text = apology::image_apology_for(&e.to_string()).to_string();
                self.send_and_track(&destination, text, reply_to(msg)).await;
                return;
            }
        };

        let mut query = self.trigger.extract_query(&msg.text);
        if query.is_empty() {
            query = self.reply.default_image_query.clone();
        }
        info!("image reply triggered by {}: {query}", msg.sender_name);

        let image = ImageInput {
            data: payload.data,
            mime_type: payload.mime_type,
        };
        match self
            .router
            .process(&query, msg.quoted_text.as_deref(), Some(image))
            .await
        {
            Ok(completion) => {
                self.send_and_track(&destination, completion.text, reply_to(msg))
                    .await
            }
            Err(e) => {
                error!("image reply processing failed: {e}");
                let text = apology::image_apology_for(&e.to_string()).to_string();
                self.send_and_track(&destination, text, reply_to(msg)).await;
            }
        }
    }

    /// Send a message and remember its ID so replies to it trigger us.
    /// Send failures are logged; there is nobody left to notify.
    async fn send_and_track(&self, destination: &str, body: String, reply_to: Option<String>) {
        let dispatch = OutboundDispatch {
            destination: destination.to_string(),
            body,
            reply_to,
        };
        match self.bridge.send(&dispatch).await {
            Ok(receipt) => {
                if !receipt.message_id.is_empty() {
                    self.self_sent.mark(&receipt.message_id).await;
                }
            }
            Err(e) => error!("failed to send message to {destination}: {e}"),
        }
    }
}

fn reply_to(msg: &InboundMessage) -> Option<String> {
    (!msg.id.is_empty()).then(|| msg.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use akasha_core::error::{AkashaError, ProviderError};
    use akasha_core::message::{
        Completion, CompletionRequest, GenerateRequest, HistoryMessage, MediaPayload, SendReceipt,
    };
    use akasha_core::traits::LlmProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct RecordingBridge {
        sends: Mutex<Vec<OutboundDispatch>>,
        counter: AtomicUsize,
        media_ok: bool,
    }

    impl RecordingBridge {
        fn new(media_ok: bool) -> Self {
            Self {
                sends: Mutex::new(Vec::new()),
                counter: AtomicUsize::new(0),
                media_ok,
            }
        }

        async fn sent(&self) -> Vec<OutboundDispatch> {
            self.sends.lock().await.clone()
        }
    }

    #[async_trait]
    impl MessagingGateway for RecordingBridge {
        async fn send(&self, dispatch: &OutboundDispatch) -> Result<SendReceipt, AkashaError> {
            self.sends.lock().await.push(dispatch.clone());
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(SendReceipt {
                message_id: format!("SENT-{n}"),
                status: "sent".to_string(),
            })
        }

        async fn download(&self, _m: &str, _p: &str) -> Result<MediaPayload, AkashaError> {
            if self.media_ok {
                Ok(MediaPayload {
                    data: b"img".to_vec(),
                    mime_type: "image/jpeg".to_string(),
                })
            } else {
                Err(AkashaError::Bridge("download failed".to_string()))
            }
        }

        async fn download_from_path(&self, _f: &str) -> Result<MediaPayload, AkashaError> {
            Err(AkashaError::Bridge("no static file".to_string()))
        }

        async fn fetch_history(
            &self,
            _chat_jid: &str,
            _limit: usize,
        ) -> Result<Vec<HistoryMessage>, AkashaError> {
            Ok(vec![])
        }

        async fn check_health(&self) -> bool {
            true
        }
    }

    struct EchoProvider {
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }
        fn key_count(&self) -> usize {
            1
        }
        fn rotate_key(&self) {}
        async fn complete(&self, r: &CompletionRequest) -> Result<Completion, ProviderError> {
            if self.fail {
                return Err(ProviderError::fatal("echo", "quota exceeded"));
            }
            Ok(Completion {
                text: format!("echo: {}", r.prompt),
                sources: vec![],
            })
        }
        async fn generate(&self, r: &GenerateRequest) -> Result<String, ProviderError> {
            Ok(format!("echo: {}", r.prompt))
        }
    }

    fn gateway(bridge: Arc<RecordingBridge>, fail: bool) -> Gateway {
        let router = Arc::new(ProviderRouter::new(
            Arc::new(EchoProvider { fail }),
            None,
            "be helpful".to_string(),
        ));
        Gateway::new(router, bridge, ReplyConfig::default(), None)
    }

    fn text_event(id: &str, from: &str, text: &str) -> WebhookPayload {
        serde_json::from_value(serde_json::json!({
            "from": from,
            "pushname": "Tester",
            "message": {"id": id, "text": text}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_trigger_produces_reply() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        gw.handle_event(text_event("M1", "628@s.whatsapp.net", "hey akasha, what is rust?"))
            .await;

        let sent = bridge.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, "628@s.whatsapp.net");
        assert_eq!(sent[0].body, "echo: what is rust?");
        assert_eq!(sent[0].reply_to.as_deref(), Some("M1"));
    }

    #[tokio::test]
    async fn test_non_trigger_text_is_ignored() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        gw.handle_event(text_event("M1", "628@s.whatsapp.net", "just chatting"))
            .await;

        assert!(bridge.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_event_processed_once() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        gw.handle_event(text_event("M1", "628@s.whatsapp.net", "hey akasha, hi"))
            .await;
        gw.handle_event(text_event("M1", "628@s.whatsapp.net", "hey akasha, hi"))
            .await;

        assert_eq!(bridge.sent().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redelivery_replies_once() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = Arc::new(gateway(bridge.clone(), false));
        let barrier = Arc::new(tokio::sync::Barrier::new(4));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gw = gw.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                gw.handle_event(text_event("M1", "628@s.whatsapp.net", "hey akasha, hi"))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(bridge.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reply_to_own_message_triggers_without_prefix() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        gw.handle_event(text_event("M1", "628@s.whatsapp.net", "hey akasha, hi"))
            .await;
        // First reply got receipt SENT-0; replying to it needs no prefix.
        let mut followup = text_event("M2", "628@s.whatsapp.net", "tell me more");
        if let Some(body) = followup.message.as_mut() {
            body.replied_id = Some("SENT-0".to_string());
        }
        gw.handle_event(followup).await;

        let sent = bridge.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].body, "echo: tell me more");
    }

    #[tokio::test]
    async fn test_own_messages_are_skipped() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        gw.handle_event(text_event("M1", "628@s.whatsapp.net", "hey akasha, hi"))
            .await;
        // The bridge echoes our own outbound message back as a webhook.
        gw.handle_event(text_event("SENT-0", "akasha@s.whatsapp.net", "hey akasha, hi"))
            .await;

        assert_eq!(bridge.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_sends_apology() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), true);

        gw.handle_event(text_event("M1", "628@s.whatsapp.net", "hey akasha, hi"))
            .await;

        let sent = bridge.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("rate limit"));
    }

    #[tokio::test]
    async fn test_group_reply_goes_to_group() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        gw.handle_event(text_event(
            "M1",
            "628@s.whatsapp.net in 12036@g.us",
            "hey akasha, hi",
        ))
        .await;

        let sent = bridge.sent().await;
        assert_eq!(sent[0].destination, "12036@g.us");
    }

    #[tokio::test]
    async fn test_image_trigger_replies_with_analysis() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "id": "IMG1",
            "from": "628@s.whatsapp.net",
            "pushname": "Tester",
            "image": {"caption": "hey akasha, describe this"}
        }))
        .unwrap();
        gw.handle_event(payload).await;

        let sent = bridge.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "echo: describe this");
    }

    #[tokio::test]
    async fn test_image_download_failure_sends_apology() {
        let bridge = Arc::new(RecordingBridge::new(false));
        let gw = gateway(bridge.clone(), false);

        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "id": "IMG1",
            "from": "628@s.whatsapp.net",
            "image": {"caption": "hey akasha, describe this"}
        }))
        .unwrap();
        gw.handle_event(payload).await;

        let sent = bridge.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("couldn't download the image"));
    }

    #[tokio::test]
    async fn test_image_without_id_is_dropped() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "from": "628@s.whatsapp.net",
            "image": {"caption": "hey akasha, describe this"}
        }))
        .unwrap();
        gw.handle_event(payload).await;

        assert!(bridge.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_reaction_is_ignored() {
        let bridge = Arc::new(RecordingBridge::new(true));
        let gw = gateway(bridge.clone(), false);

        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "from": "628@s.whatsapp.net",
            "reaction": {"text": "👍"},
            "message": {"id": "M1", "text": "hey akasha, hi"}
        }))
        .unwrap();
        gw.handle_event(payload).await;

        assert!(bridge.sent().await.is_empty());
    }
}

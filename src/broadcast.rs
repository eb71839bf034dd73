//! Daily Mandarin passage generation and broadcast fan-out.

use akasha_core::{
    config::BroadcastConfig,
    error::AkashaError,
    message::{GenerateRequest, OutboundDispatch},
    track::SendLedger,
    traits::{MessagingGateway, SearchTool},
};
use akasha_llm::ProviderRouter;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

const PASSAGE_TEMPERATURE: f32 = 0.9;
const TOPIC_TEMPERATURE: f32 = 0.7;

/// A generated passage together with the topic label it was written for.
#[derive(Debug, Clone)]
pub struct GeneratedPassage {
    pub passage: String,
    pub topic: String,
}

/// Outcome of one daily broadcast run.
#[derive(Debug, Clone)]
pub struct BroadcastReport {
    pub job_key: String,
    pub topic: String,
    /// Recipients delivered, counting earlier attempts for the same day.
    pub success_count: usize,
    pub failures: Vec<(String, String)>,
}

/// Generates HSK 3-4 reading passages, optionally sourcing the topic
/// from a web search over current news.
pub struct PassageGenerator {
    router: Arc<ProviderRouter>,
    search: Arc<dyn SearchTool>,
    config: BroadcastConfig,
    topic_search_results: usize,
}

impl PassageGenerator {
    pub fn new(
        router: Arc<ProviderRouter>,
        search: Arc<dyn SearchTool>,
        config: BroadcastConfig,
        topic_search_results: usize,
    ) -> Self {
        Self {
            router,
            search,
            config,
            topic_search_results,
        }
    }

    /// Generate a passage. An explicit topic overrides topic selection.
    pub async fn generate(&self, topic: Option<&str>) -> Result<GeneratedPassage, AkashaError> {
        let (prompt, display_topic, system) = match topic {
            Some(t) => (
                format!("请写一篇关于\"{t}\"的短文。"),
                t.to_string(),
                self.config.system_instruction.clone(),
            ),
            None if self.config.topic_mode == "web_search" => match self.select_topic().await {
                Some(t) => (
                    format!("请写一篇关于\"{t}\"的短文。"),
                    format!("网络话题: {t}"),
                    self.config.news_system_instruction.clone(),
                ),
                None => {
                    warn!("topic search failed, falling back to free topic");
                    (
                        self.config.free_topic_prompt.clone(),
                        "自由话题 (搜索失败)".to_string(),
                        self.config.system_instruction.clone(),
                    )
                }
            },
            None => (
                self.config.free_topic_prompt.clone(),
                "自由话题".to_string(),
                self.config.system_instruction.clone(),
            ),
        };

        let request = GenerateRequest {
            prompt: format!("{prompt}\n\n{}", passage_requirements()),
            system: Some(system),
            temperature: Some(PASSAGE_TEMPERATURE),
            max_tokens: None,
        };
        let passage = self.router.generate(&request).await?;
        let passage = passage.trim().to_string();

        info!(
            "generated passage for topic '{display_topic}': {} characters",
            passage.chars().count()
        );
        Ok(GeneratedPassage {
            passage,
            topic: display_topic,
        })
    }

    /// Search current news and let the model pick a passage topic from
    /// the result snippets. Any failure returns `None` so the caller
    /// can fall back to a free topic.
    async fn select_topic(&self) -> Option<String> {
        let results = self
            .search
            .search(&self.config.topic_search_query, self.topic_search_results)
            .await;
        if results.is_empty() {
            warn!("topic search returned no results");
            return None;
        }

        let content = results
            .iter()
            .map(|r| format!("{}\n{}", r.title, r.snippet))
            .collect::<Vec<_>>()
            .join("\n\n");

        let request = GenerateRequest {
            prompt: topic_selection_prompt(&content),
            system: None,
            temperature: Some(TOPIC_TEMPERATURE),
            max_tokens: None,
        };
        match self.router.generate(&request).await {
            Ok(topic) => {
                let topic = topic.trim().to_string();
                if topic.is_empty() {
                    None
                } else {
                    info!("selected topic via web search: '{topic}'");
                    Some(topic)
                }
            }
            Err(e) => {
                warn!("topic selection failed: {e}");
                None
            }
        }
    }
}

fn passage_requirements() -> &'static str {
    "要求: \n\
     - 适合HSK 3-4级学习者阅读\n\
     - 只用汉字, 不要拼音\n\
     - 300-500个汉字 (必须写完整) \n\
     - 内容有趣、实用\n\
     - 文章要有完整的开头、中间和结尾\n\n\
     直接输出文章内容, 不要任何标题或额外说明。"
}

fn topic_selection_prompt(content: &str) -> String {
    format!(
        "基于以下新闻/网页内容, 选择一个适合HSK 3-4级学习者阅读的有趣话题。\n\n\
         内容: \n{content}\n\n\
         要求: \n\
         1. 只输出话题名称, 不要其他文字\n\
         2. 话题要具体、有趣\n\
         3. 话题要适合用300-500个汉字写短文\n\
         4. 话题应该来源于提供的新闻内容\n\n\
         直接输出话题名称。"
    )
}

/// Wrap the passage in the standard broadcast header.
pub fn format_passage_message(passage: &str) -> String {
    format!("📖 每日中文阅读 | Daily Mandarin Reading\n\n{passage}")
}

/// Send `message` to every recipient with bounded concurrency.
/// Returns delivered recipients and per-recipient failures.
pub async fn fan_out(
    bridge: Arc<dyn MessagingGateway>,
    recipients: &[String],
    message: &str,
    max_concurrent: usize,
) -> (Vec<String>, Vec<(String, String)>) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(recipients.len());

    for recipient in recipients {
        let bridge = bridge.clone();
        let semaphore = semaphore.clone();
        let recipient = recipient.clone();
        let body = message.to_string();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await;
            let dispatch = OutboundDispatch {
                destination: recipient.clone(),
                body,
                reply_to: None,
            };
            match bridge.send(&dispatch).await {
                Ok(_) => (recipient, Ok(())),
                Err(e) => (recipient, Err(e.to_string())),
            }
        }));
    }

    let mut sent = Vec::new();
    let mut failures = Vec::new();
    for handle in handles {
        match handle.await {
            Ok((recipient, Ok(()))) => sent.push(recipient),
            Ok((recipient, Err(e))) => failures.push((recipient, e)),
            Err(e) => error!("send task panicked: {e}"),
        }
    }
    (sent, failures)
}

/// The daily passage job: generate once, fan out to pending recipients,
/// track delivery per day so reruns never double-send.
pub struct DailyBroadcast {
    generator: Arc<PassageGenerator>,
    bridge: Arc<dyn MessagingGateway>,
    ledger: Arc<SendLedger>,
    config: BroadcastConfig,
}

impl DailyBroadcast {
    pub fn new(
        generator: Arc<PassageGenerator>,
        bridge: Arc<dyn MessagingGateway>,
        ledger: Arc<SendLedger>,
        config: BroadcastConfig,
    ) -> Self {
        Self {
            generator,
            bridge,
            ledger,
            config,
        }
    }

    pub fn ledger(&self) -> Arc<SendLedger> {
        self.ledger.clone()
    }

    /// Run the job for the given local date.
    ///
    /// Generation failure is a total failure: no partial sends happen.
    /// Send failures are recorded in the report; already-delivered
    /// recipients count toward success.
    pub async fn run_for(&self, date: NaiveDate) -> Result<BroadcastReport, AkashaError> {
        let job_key = format!("daily_passage_{date}");

        if self.config.recipients.is_empty() {
            warn!("no broadcast recipients configured, skipping");
            return Ok(BroadcastReport {
                job_key,
                topic: String::new(),
                success_count: 0,
                failures: vec![],
            });
        }

        let already = self.ledger.confirmed(&job_key).await;
        let pending: Vec<String> = self
            .config
            .recipients
            .iter()
            .filter(|r| !already.contains(r.as_str()))
            .cloned()
            .collect();

        if pending.is_empty() {
            info!("all recipients already received today's passage ({job_key})");
            return Ok(BroadcastReport {
                job_key,
                topic: String::new(),
                success_count: already.len(),
                failures: vec![],
            });
        }
        if !already.is_empty() {
            info!(
                "resuming broadcast: {} already sent, {} pending",
                already.len(),
                pending.len()
            );
        }

        let generated = self.generator.generate(None).await?;
        let message = format_passage_message(&generated.passage);

        let (sent, failures) = fan_out(
            self.bridge.clone(),
            &pending,
            &message,
            self.config.max_concurrent_sends,
        )
        .await;

        for recipient in &sent {
            self.ledger.confirm(&job_key, recipient).await;
            info!("daily passage sent to {recipient}");
        }
        for (recipient, error) in &failures {
            error!("failed to send daily passage to {recipient}: {error}");
        }

        let report = BroadcastReport {
            job_key,
            topic: generated.topic,
            success_count: already.len() + sent.len(),
            failures,
        };
        info!(
            "daily passage completed: {}/{} recipients (topic: {})",
            report.success_count,
            self.config.recipients.len(),
            report.topic
        );
        Ok(report)
    }
}

mod broadcast;
mod gateway;
mod scheduler;
mod server;
mod summarizer;

use akasha_bridge::BridgeClient;
use akasha_core::{
    config::{self, Config},
    traits::{LlmProvider, MessagingGateway, SearchTool},
};
use akasha_llm::{GeminiProvider, GoogleSearch, OpenAiProvider, ProviderRouter};
use broadcast::{DailyBroadcast, PassageGenerator};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use summarizer::ChatSummarizer;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "akasha",
    version,
    about = "Akasha: WhatsApp AI gateway with LLM replies and daily broadcasts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and scheduler.
    Start,
    /// Check bridge connectivity and provider configuration.
    Status,
    /// Run the daily passage broadcast once and exit.
    Broadcast {
        /// Passage topic; picked automatically when omitted.
        #[arg(long)]
        topic: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;
            cfg.validate()?;

            let (router, search) = build_provider_router(&cfg)?;
            let router = Arc::new(router);
            let bridge: Arc<dyn MessagingGateway> =
                Arc::new(BridgeClient::from_config(&cfg.bridge));

            let summarizer = if cfg.summarizer.enabled {
                Some(ChatSummarizer::new(
                    cfg.summarizer.max_messages,
                    router.clone(),
                    bridge.clone(),
                )?)
            } else {
                None
            };

            let gw = Arc::new(gateway::Gateway::new(
                router.clone(),
                bridge.clone(),
                cfg.reply.clone(),
                summarizer,
            ));

            let generator = Arc::new(PassageGenerator::new(
                router.clone(),
                search,
                cfg.broadcast.clone(),
                cfg.search.max_results,
            ));
            let daily = Arc::new(DailyBroadcast::new(
                generator.clone(),
                bridge.clone(),
                Arc::new(akasha_core::track::SendLedger::new()),
                cfg.broadcast.clone(),
            ));

            let scheduler_running = cfg.broadcast.enabled;
            if scheduler_running {
                tokio::spawn(scheduler::run(daily.clone(), cfg.broadcast.clone()));
            }

            let limiter = server::AppState::rate_limiter(cfg.server.rate_limit_per_minute);
            let state = server::AppState {
                gateway: gw,
                router,
                bridge,
                generator,
                broadcast: daily,
                config: Arc::new(cfg),
                limiter,
                scheduler_running,
            };
            server::serve(state).await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Akasha Status Check\n");
            println!("Config: {}", cli.config);
            println!("Primary provider: {}", cfg.provider.primary);
            println!(
                "Fallback: {}",
                if cfg.provider.fallback_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!(
                "Web search: {}",
                if cfg.search.api_key.is_empty() || cfg.search.engine_id.is_empty() {
                    "not configured"
                } else {
                    "configured"
                }
            );
            println!();

            let bridge = BridgeClient::from_config(&cfg.bridge);
            let connected = bridge.check_health().await;
            println!(
                "  bridge ({}): {}",
                cfg.bridge.base_url,
                if connected { "connected" } else { "unreachable" }
            );
        }
        Commands::Broadcast { topic } => {
            let cfg = config::load(&cli.config)?;
            cfg.validate()?;

            let (router, search) = build_provider_router(&cfg)?;
            let router = Arc::new(router);

            if let Some(topic) = topic {
                let generator = PassageGenerator::new(
                    router,
                    search,
                    cfg.broadcast.clone(),
                    cfg.search.max_results,
                );
                let generated = generator.generate(Some(&topic)).await?;
                println!("Topic: {}\n\n{}", generated.topic, generated.passage);
            } else {
                let generator = Arc::new(PassageGenerator::new(
                    router,
                    search,
                    cfg.broadcast.clone(),
                    cfg.search.max_results,
                ));
                let bridge: Arc<dyn MessagingGateway> =
                    Arc::new(BridgeClient::from_config(&cfg.bridge));
                let daily = DailyBroadcast::new(
                    generator,
                    bridge,
                    Arc::new(akasha_core::track::SendLedger::new()),
                    cfg.broadcast.clone(),
                );
                let offset = scheduler::schedule_offset(cfg.broadcast.utc_offset_hours);
                let today = Utc::now().with_timezone(&offset).date_naive();
                let report = daily.run_for(today).await?;
                println!(
                    "Broadcast {}: {} delivered, {} failed (topic: {})",
                    report.job_key,
                    report.success_count,
                    report.failures.len(),
                    report.topic
                );
                for (recipient, error) in &report.failures {
                    println!("  failed: {recipient}: {error}");
                }
            }
        }
    }

    Ok(())
}

/// Build the provider router from config: the primary provider, plus a
/// fallback on the other vendor when enabled and configured.
fn build_provider_router(
    cfg: &Config,
) -> anyhow::Result<(ProviderRouter, Arc<dyn SearchTool>)> {
    let search: Arc<dyn SearchTool> = Arc::new(GoogleSearch::from_config(&cfg.search));
    let max_tool_calls = cfg.reply.max_tool_calls;

    let primary: Arc<dyn LlmProvider> = match cfg.provider.primary.as_str() {
        "gemini" => Arc::new(GeminiProvider::from_config(
            &cfg.provider.gemini,
            search.clone(),
            max_tool_calls,
        )?),
        "openai" => Arc::new(OpenAiProvider::from_config(
            &cfg.provider.openai,
            search.clone(),
            max_tool_calls,
        )?),
        other => anyhow::bail!("unsupported provider: {other}"),
    };

    let fallback: Option<Arc<dyn LlmProvider>> = if cfg.provider.fallback_enabled {
        match cfg.provider.primary.as_str() {
            "gemini" if !cfg.provider.openai.api_keys.is_empty() => {
                Some(Arc::new(OpenAiProvider::from_config(
                    &cfg.provider.openai,
                    search.clone(),
                    max_tool_calls,
                )?))
            }
            "openai" if !cfg.provider.gemini.api_keys.is_empty() => {
                Some(Arc::new(GeminiProvider::from_config(
                    &cfg.provider.gemini,
                    search.clone(),
                    max_tool_calls,
                )?))
            }
            _ => {
                warn!("fallback enabled but the other provider has no API keys");
                None
            }
        }
    } else {
        None
    };

    let router = ProviderRouter::new(primary, fallback, cfg.reply.system_instruction.clone());
    Ok((router, search))
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::EnvFilter;

use insights_gateway::api::ApiServerBuilder;
use insights_gateway::{
    ChatCompletionClient, Config, InsightsEngine, MetricsAggregator, MetricsStore, Snapshot,
    SpeechToText, SqliteStore, TextToSpeech,
};

/// Insights - Voice business insights for engineering leadership
#[derive(Parser)]
#[command(name = "insights", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server (default)
    Serve {
        /// Port to listen on (overrides PORT and the config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer one query and print the response
    Ask {
        /// Question to answer
        query: String,
        /// Response language ("en" or "hi")
        #[arg(short, long, default_value = "en")]
        language: String,
    },
    /// Replace the store contents with a JSON snapshot export
    Import {
        /// Snapshot file with tasks, contributors and ticket records
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,insights_gateway=info",
        1 => "info,insights_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, port).await,
        Command::Ask { query, language } => ask(config, &query, &language).await,
        Command::Import { file } => import(&config, &file),
    }
}

/// Run the HTTP server until interrupted
async fn serve(mut config: Config, port: Option<u16>) -> anyhow::Result<()> {
    config.validate_for_serving()?;

    let store = Arc::new(SqliteStore::open(&config.store_path)?);
    let engine = build_engine(&mut config, store.clone())?;

    let voice_key = config
        .voice
        .api_key
        .take()
        .context("SARVAM_API_KEY not set")?;
    let stt = SpeechToText::new(
        SecretString::from(voice_key.expose_secret().to_string()),
        &config.voice.base_url,
        &config.voice.stt_model,
        config.voice.timeout,
    )?;
    let tts = TextToSpeech::new(
        voice_key,
        &config.voice.base_url,
        config.voice.tts.clone(),
        config.voice.timeout,
    )?;

    let port = port.unwrap_or(config.server.port);
    tracing::info!(
        port,
        store = %config.store_path.display(),
        model = %config.llm.model,
        "starting insights gateway"
    );

    let server = ApiServerBuilder::new(engine, store.clone(), port)
        .transcriber(Arc::new(stt))
        .synthesizer(Arc::new(tts))
        .llm_model(config.llm.model.clone())
        .rate_limit_rpm(config.server.rate_limit_rpm)
        .build();

    server.run().await?;

    match Arc::try_unwrap(store) {
        Ok(store) => store.close(),
        Err(_) => tracing::debug!("store still shared at shutdown"),
    }
    Ok(())
}

/// Answer a single query from the command line
async fn ask(mut config: Config, query: &str, language: &str) -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::open(&config.store_path)?);
    let engine = build_engine(&mut config, store)?;

    let answer = engine.process_query(query, language).await;
    println!("{answer}");
    Ok(())
}

/// Load a snapshot export into the store
fn import(config: &Config, file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("invalid snapshot {}", file.display()))?;

    let store = SqliteStore::open(&config.store_path)?;
    let summary = store.import(&snapshot)?;
    store.close();

    println!(
        "Imported {} tasks, {} contributors, {} ticket records into {}",
        summary.tasks,
        summary.contributors,
        summary.ticket_records,
        config.store_path.display()
    );
    Ok(())
}

/// Wire the language model and store into an engine
fn build_engine(config: &mut Config, store: Arc<SqliteStore>) -> anyhow::Result<InsightsEngine> {
    let api_key = config.llm.api_key.take().context("GROQ_API_KEY not set")?;
    let llm = ChatCompletionClient::new(
        api_key,
        &config.llm.base_url,
        &config.llm.model,
        config.llm.timeout,
    )?;

    let store: Arc<dyn MetricsStore> = store;
    let metrics = MetricsAggregator::new(store, config.metrics.clone());

    Ok(InsightsEngine::new(
        config.keywords.clone(),
        metrics,
        Arc::new(llm),
        config.llm.generation.clone(),
    ))
}

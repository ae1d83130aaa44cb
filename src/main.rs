use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vigia_speech::api::{ApiServer, ApiState};
use vigia_speech::{Catalog, Config, HttpSynthesizer, Language, SpeechCache};

/// Vigia - text-to-speech cache and queue for the VÍGIA reporting app
#[derive(Parser)]
#[command(name = "vigia", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "VIGIA_PORT")]
    port: Option<u16>,

    /// Statement catalog TOML file (overrides config)
    #[arg(long, env = "VIGIA_CATALOG_PATH")]
    catalog: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the speech API and warm the catalog in the background (default)
    Serve,
    /// Synthesize one text and write the audio to a file
    Speak {
        /// Text to speak
        text: String,
        /// Output file
        #[arg(short, long, default_value = "speech.mp3")]
        out: PathBuf,
    },
    /// Warm the whole catalog and report the outcome
    Warm,
    /// Print the statement catalog
    Statements {
        /// Title language (en, es)
        #[arg(short, long, default_value = "en")]
        lang: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,vigia_speech=info",
        1 => "info,vigia_speech=debug",
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
    let mut config = Config::load();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.catalog.is_some() {
        config.catalog_path = cli.catalog;
    }

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Statements { lang } => print_statements(&catalog, &lang),
        Command::Speak { text, out } => speak(&config, catalog, &text, &out).await,
        Command::Warm => warm(&config, catalog).await,
        Command::Serve => serve(config, catalog).await,
    }
}

fn build_cache(config: &Config, catalog: Catalog) -> anyhow::Result<SpeechCache> {
    let synthesizer = HttpSynthesizer::from_config(&config.speech)?;
    tracing::debug!(?synthesizer, "speech synthesizer configured");
    Ok(SpeechCache::new(
        Arc::new(synthesizer),
        catalog,
        &config.speech,
    ))
}

async fn serve(config: Config, catalog: Catalog) -> anyhow::Result<()> {
    tracing::info!(
        port = config.server.port,
        statements = catalog.len(),
        "starting vigia speech service"
    );

    let cache = build_cache(&config, catalog)?;

    // Warm-up is an optimization; the API serves on-demand requests meanwhile
    drop(cache.initialize());

    let mut state = ApiState::new(cache);
    if let Some(rpm) = config.server.requests_per_minute {
        state = state.with_rate_limit(rpm);
    }

    ApiServer::new(state, config.server.port).run().await?;
    Ok(())
}

async fn speak(
    config: &Config,
    catalog: Catalog,
    text: &str,
    out: &std::path::Path,
) -> anyhow::Result<()> {
    let cache = build_cache(config, catalog)?;

    let handle = cache.get_audio(text).await?;
    let bytes = handle
        .bytes()
        .ok_or_else(|| anyhow::anyhow!("audio handle released before it could be written"))?;
    std::fs::write(out, bytes)?;

    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

async fn warm(config: &Config, catalog: Catalog) -> anyhow::Result<()> {
    let cache = build_cache(config, catalog)?;

    println!(
        "Warming {} statements (first request in {}s)...",
        cache.catalog().len(),
        config.speech.startup_delay.as_secs()
    );
    let report = cache.initialize().await;

    println!("Warmed: {}", report.warmed);
    if report.failed.is_empty() {
        println!("All statements cached.");
    } else {
        println!("Failed: {}", report.failed.join(", "));
    }
    Ok(())
}

fn print_statements(catalog: &Catalog, lang: &str) -> anyhow::Result<()> {
    let lang: Language = lang.parse()?;

    for statement in catalog {
        println!("{:<16} {}", statement.id, statement.title.get(lang));
        println!("{:<16} \"{}\"", "", statement.text);
    }
    Ok(())
}

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use prisoner::application::session::ExperimentSession;
use prisoner::config::ExperimentConfig;
use prisoner::domain::ports::{ParticipantStoreBox, PlayerStoreBox, WaitPageBox};
use prisoner::infrastructure::in_memory::{InMemoryParticipantStore, InMemoryPlayerStore};
use prisoner::infrastructure::wait_page::InMemoryWaitPage;
use prisoner::interfaces::csv::results_writer::ResultsWriter;
use prisoner::interfaces::csv::script_reader::ScriptReader;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Decision script CSV file (participant, round, decision, response_ms)
    input: PathBuf,

    /// JSON config overriding payoffs, number of rounds or the decision deadline
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every participant's page transcript as JSON lines instead of the results CSV
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "prisoner={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = match cli.config {
        Some(path) => ExperimentConfig::load(path).into_diagnostic()?,
        None => ExperimentConfig::default(),
    };

    let file = File::open(cli.input).into_diagnostic()?;
    let script = ScriptReader::new(file).into_script(|e| {
        eprintln!("Error reading decision: {}", e);
    });

    let player_store: PlayerStoreBox = Box::new(InMemoryPlayerStore::new());
    let participant_store: ParticipantStoreBox = Box::new(InMemoryParticipantStore::new());
    let wait_page: WaitPageBox = Box::new(InMemoryWaitPage::new());
    let session = ExperimentSession::create(
        &config,
        &script.participants(),
        player_store,
        participant_store,
        wait_page,
    )
    .await
    .into_diagnostic()?;
    let session = Arc::new(session);

    let transcripts = session.run(&script).await.into_diagnostic()?;

    let stdout = io::stdout();
    if cli.json {
        let mut out = stdout.lock();
        for transcript in &transcripts {
            let line = serde_json::to_string(transcript).into_diagnostic()?;
            writeln!(out, "{}", line).into_diagnostic()?;
        }
    } else {
        let summaries = session.summaries().await.into_diagnostic()?;
        let mut writer = ResultsWriter::new(stdout.lock());
        writer.write_summaries(summaries).into_diagnostic()?;
    }

    Ok(())
}

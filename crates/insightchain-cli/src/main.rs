use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use insightchain_core::{
    Config, ConfigLoader, EventCollector, HistoryEntry, PipelineEvent, ResearchHistory,
    ResearchOrchestrator, ResearchRecord, Role, TelemetryOptions, init_telemetry,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const DEFAULT_MAX_HISTORY: usize = 10;
const HISTORY_VIEW: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "insightchain",
    version,
    about = "Sequential multi-agent research assistant"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Research a single query and print the report.
    Run(RunArgs),
    /// Interactive session with in-memory history.
    Shell(ShellArgs),
    /// Show agent status and configured credentials.
    Status,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Research topic or question.
    #[arg(long)]
    query: String,

    /// Output format for the research record.
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    /// Abort the whole pipeline after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct ShellArgs {
    /// Output format for research records.
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = ConfigLoader::load(cli.config.clone()).context("failed to load configuration")?;

    init_telemetry(TelemetryOptions {
        env_filter: Some(format!("warn,insightchain_core={}", config.logging.level)),
        ..TelemetryOptions::default()
    })?;
    insightchain_core::metrics::init_metrics_from_env("insightchain-cli");

    let rt = Runtime::new()?;
    rt.block_on(async move {
        match cli.command {
            Command::Run(args) => run_command(&config, args).await,
            Command::Shell(args) => shell_command(&config, args).await,
            Command::Status => status_command(&config),
        }
    })
}

fn build_orchestrator(
    config: &Config,
    capacity: usize,
) -> Result<(ResearchOrchestrator, UnboundedReceiver<PipelineEvent>)> {
    let (collector, receiver) = EventCollector::new();
    let orchestrator = ResearchOrchestrator::from_config(config)?
        .with_history(ResearchHistory::with_capacity(capacity))
        .with_events(collector);
    Ok((orchestrator, receiver))
}

fn spawn_progress(mut receiver: UnboundedReceiver<PipelineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                PipelineEvent::StageStarted { role, .. } => {
                    eprintln!("{} {}: {}", icon(role), role.profile().agent_name, activity(role));
                }
                PipelineEvent::StageFinished {
                    role, duration_ms, ..
                } => {
                    eprintln!("   done in {:.1}s", duration_ms as f64 / 1000.0);
                    info!(%role, duration_ms, "stage finished");
                }
                PipelineEvent::PipelineFailed { stage, reason, .. } => {
                    eprintln!("❌ Research failed while {stage}: {reason}");
                }
                PipelineEvent::PipelineCompleted { duration_ms, .. } => {
                    eprintln!(
                        "✅ Research completed in {:.1}s",
                        duration_ms as f64 / 1000.0
                    );
                }
            }
        }
    })
}

fn icon(role: Role) -> &'static str {
    match role {
        Role::Gatherer => "🔍",
        Role::Analyzer => "📊",
        Role::Summarizer => "📝",
        Role::InsightGenerator => "💡",
    }
}

fn activity(role: Role) -> &'static str {
    match role {
        Role::Gatherer => "Collecting information...",
        Role::Analyzer => "Analyzing data...",
        Role::Summarizer => "Creating summary...",
        Role::InsightGenerator => "Generating insights...",
    }
}

fn render(record: &ResearchRecord, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Markdown => record.to_markdown(),
        OutputFormat::Json => serde_json::to_string_pretty(record)?,
    })
}

async fn run_command(config: &Config, args: RunArgs) -> Result<()> {
    if args.query.trim().is_empty() {
        bail!("please enter a research query");
    }

    let (mut orchestrator, receiver) = build_orchestrator(config, 1)?;
    if let Some(secs) = args.deadline_secs {
        orchestrator = orchestrator.with_deadline(Duration::from_secs(secs));
    }
    let progress = spawn_progress(receiver);

    let outcome = orchestrator.conduct_research(&args.query).await;
    drop(orchestrator);
    progress.await.ok();

    let record = outcome.context("error during research")?;
    println!("{}", render(&record, args.format)?);
    Ok(())
}

async fn shell_command(config: &Config, args: ShellArgs) -> Result<()> {
    let capacity = config.pipeline.max_history.unwrap_or(DEFAULT_MAX_HISTORY);
    let (orchestrator, receiver) = build_orchestrator(config, capacity)?;
    let progress = spawn_progress(receiver);

    eprintln!("InsightChain research shell. Enter a topic, or :help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("research> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => eprintln!("Please enter a research query!"),
            ":quit" | ":q" | ":exit" => break,
            ":help" => print_help(),
            ":status" => print_status(&orchestrator),
            ":clear" => {
                orchestrator.clear_history().await;
                eprintln!("History cleared.");
            }
            ":history" => print_history(&orchestrator.recent_history(HISTORY_VIEW).await),
            _ if line.starts_with(":show") => {
                let history = orchestrator.recent_history(capacity).await;
                match line[":show".len()..].trim().parse::<usize>() {
                    Ok(n) if n >= 1 && n <= history.len() => {
                        println!("{}", render(&history[n - 1].record, args.format)?);
                    }
                    _ => eprintln!("Usage: :show <n> where n is listed by :history"),
                }
            }
            _ if line.starts_with(':') => eprintln!("Unknown command {line}; try :help"),
            query => match orchestrator.conduct_research(query).await {
                Ok(record) => println!("{}", render(&record, args.format)?),
                Err(err) => {
                    warn!(error = %err, "research failed");
                    eprintln!("❌ Error during research: {err}");
                }
            },
        }
    }

    drop(orchestrator);
    progress.await.ok();
    Ok(())
}

fn print_help() {
    eprintln!(
        "Commands:\n  :history   list the {HISTORY_VIEW} most recent runs\n  :show <n>  print run n from :history\n  :status    agent status\n  :clear     clear history\n  :quit      leave the shell"
    );
}

fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        eprintln!("No research history yet.");
        return;
    }
    for (idx, entry) in entries.iter().enumerate() {
        let query: String = entry.record.query.chars().take(50).collect();
        let ellipsis = if entry.record.query.chars().count() > 50 {
            "..."
        } else {
            ""
        };
        eprintln!("{:>2}. {query}{ellipsis} - {}", idx + 1, entry.label);
    }
}

fn print_status(orchestrator: &ResearchOrchestrator) {
    for (role, status) in orchestrator.get_agent_status() {
        let profile = role.profile();
        eprintln!(
            "{} {:<13} {:<34} {}",
            icon(role),
            profile.agent_name,
            profile.role_description,
            status.as_str()
        );
    }
}

fn status_command(config: &Config) -> Result<()> {
    for role in Role::PIPELINE {
        let profile = role.profile();
        println!(
            "{} {:<13} {:<34} active",
            icon(role),
            profile.agent_name,
            profile.role_description
        );
    }

    match config.resolved_provider() {
        Some(provider) if config.has_credential() => {
            println!(
                "✅ {provider} API key configured (model {})",
                config.generation_settings().model
            );
        }
        _ => println!("❌ No API key found; set GROQ_API_KEY or OPENAI_API_KEY"),
    }
    Ok(())
}

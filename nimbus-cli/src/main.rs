use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nimbus_core::task::{
    AiMetadata, AttachmentDraft, Sentiment, Task, TaskDraft, TaskStatus, UrgencyLevel,
};
use nimbus_core::{TaskStore, generate_task_id};
use nimbus_enrich::{AttachmentPipeline, EnrichmentClient, EnrichmentPath, TaskEnrichmentOrchestrator};

mod config;

#[derive(Parser, Debug)]
#[command(name = "nimbus", version, about = "AI-enriched task tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a task: AI enrichment with local fallback, optional attachment
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Due date, YYYY-MM-DD (default: tomorrow)
        #[arg(long)]
        due: Option<String>,

        /// Force a 2-letter language code instead of auto-detection
        #[arg(long)]
        language: Option<String>,

        /// File to upload and label alongside the task
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Print the demo store snapshot
    List,

    /// Mark a demo-store task completed
    Done { id: String },

    /// Mark a demo-store task active again
    Activate { id: String },

    /// Walk through the store's observer contract on demo data
    Demo,

    /// Translate text through the backend
    Translate {
        text: String,

        /// Target 2-letter language code
        #[arg(long, default_value = "es")]
        to: String,
    },

    /// Detect the dominant language of a text
    Detect { text: String },

    /// Generate an audio reminder for a task-shaped input
    Remind {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        due: Option<String>,

        #[arg(long, default_value = "en")]
        language: String,
    },

    /// Config management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default ~/.nimbus/config.toml
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;

    match cli.command {
        Command::Add {
            title,
            description,
            due,
            language,
            file,
        } => add_task(&cfg, title, description, due, language, file).await?,

        Command::List => {
            let store = seeded_store()?;
            print_tasks(&store.tasks());
        }

        Command::Done { id } => {
            let store = seeded_store()?;
            store.mark_complete(&id);
            print_tasks(&store.tasks());
        }

        Command::Activate { id } => {
            let store = seeded_store()?;
            store.mark_active(&id);
            print_tasks(&store.tasks());
        }

        Command::Demo => demo()?,

        Command::Translate { text, to } => {
            let client = enrichment_client(&cfg);
            match client.translate(&text, &to).await {
                Ok(translated) => println!("{translated}"),
                Err(err) => println!("Warning: translation unavailable: {err}"),
            }
        }

        Command::Detect { text } => {
            let client = enrichment_client(&cfg);
            match client.detect_language(&text).await {
                Ok(guess) => println!(
                    "{} ({}) confidence {:.2}",
                    guess.language, guess.language_code, guess.confidence
                ),
                Err(err) => println!("Warning: language detection unavailable: {err}"),
            }
        }

        Command::Remind {
            title,
            description,
            due,
            language,
        } => {
            let due_date = parse_due(due)?;
            let text = format!("Reminder: {title}. {description}. Due date: {due_date}.");
            println!("{text}");
            let client = enrichment_client(&cfg);
            match client.synthesize_speech(&text, &language).await {
                Ok(audio_url) => println!("Audio: {audio_url}"),
                Err(err) => println!("Warning: speech synthesis unavailable: {err}"),
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                println!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

async fn add_task(
    cfg: &config::Config,
    title: String,
    description: String,
    due: Option<String>,
    language: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let store = Arc::new(TaskStore::new());
    let orchestrator = TaskEnrichmentOrchestrator::new(enrichment_client(cfg), store.clone());

    let attachment = match &file {
        Some(path) => Some(read_attachment(path)?),
        None => None,
    };
    let draft = TaskDraft {
        title,
        description,
        due_date: parse_due(due)?,
        force_language: language,
        attachment,
    };

    let task_id = generate_task_id();
    let outcome = match draft.attachment.clone() {
        Some(att) => {
            // Task creation and the attachment pipeline run concurrently;
            // the attachment's fate never gates the task itself.
            let pipeline = AttachmentPipeline::with_timeout(
                &cfg.api.base_url,
                Duration::from_secs(cfg.api.timeout_secs),
            );
            let (created, uploaded) = tokio::join!(
                orchestrator.create_task_with_id(task_id.clone(), draft),
                pipeline.run(&task_id, &att),
            );
            match uploaded {
                Ok(out) => {
                    println!("Uploaded {}", out.file_url);
                    for label in &out.labels {
                        println!("  label: {} ({})", label.name, label.confidence);
                    }
                }
                Err(err) => println!("Warning: {err}"),
            }
            created?
        }
        None => orchestrator.create_task_with_id(task_id, draft).await?,
    };

    if outcome.path == EnrichmentPath::Fallback {
        println!("Warning: AI analysis unavailable; metadata derived locally");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&outcome.task).context("serialize task")?
    );
    Ok(())
}

fn enrichment_client(cfg: &config::Config) -> EnrichmentClient {
    EnrichmentClient::with_timeout(&cfg.api.base_url, Duration::from_secs(cfg.api.timeout_secs))
}

fn parse_due(due: Option<String>) -> Result<NaiveDate> {
    match due {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("invalid due date: {s} (expected YYYY-MM-DD)")),
        None => Utc::now()
            .date_naive()
            .checked_add_days(Days::new(1))
            .context("compute default due date"),
    }
}

fn read_attachment(path: &Path) -> Result<AttachmentDraft> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("attachment path has no file name")?
        .to_string();
    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    };
    Ok(AttachmentDraft {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}

/// Process-lifetime demo data; durable storage is out of scope.
fn seeded_store() -> Result<Arc<TaskStore>> {
    let store = Arc::new(TaskStore::new());
    let today = Utc::now().date_naive();
    let in_days = |n| today.checked_add_days(Days::new(n)).unwrap_or(today);

    let mut proposal = Task::new(
        "1",
        "Complete project proposal",
        "Finish the Q4 project proposal for the new client",
        in_days(5),
    )
    .with_ai(AiMetadata {
        category: Some("work".to_string()),
        urgency: Some(UrgencyLevel::High),
        ..AiMetadata::default()
    });
    proposal.has_attachment = true;

    let groceries = Task::new(
        "2",
        "Buy groceries",
        "Get milk, bread, and vegetables from the store",
        in_days(2),
    )
    .with_ai(AiMetadata {
        sentiment: Sentiment::Positive,
        category: Some("shopping".to_string()),
        urgency: Some(UrgencyLevel::Medium),
        ..AiMetadata::default()
    });

    let call_mom = Task::new("3", "Call mom", "Remember to call mom this weekend", in_days(1))
        .with_ai(AiMetadata {
            sentiment: Sentiment::Positive,
            category: Some("personal".to_string()),
            urgency: Some(UrgencyLevel::Low),
            ..AiMetadata::default()
        });

    // add() front-inserts, so push oldest first to end up most-recent-first
    store.add(call_mom)?;
    store.add(groceries)?;
    store.add(proposal)?;
    Ok(store)
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    for t in tasks {
        let status = match t.status {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "done",
        };
        let category = t.ai.category.as_deref().unwrap_or("-");
        let urgency = t
            .ai
            .urgency
            .map(|u| format!("{u:?}").to_lowercase())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "[{status:>6}] {}: {} (due {}, {category}/{urgency}{})",
            t.id,
            t.title,
            t.due_date,
            if t.has_attachment { ", attachment" } else { "" },
        );
    }
}

fn demo() -> Result<()> {
    let store = seeded_store()?;

    let sub = store.subscribe(|tasks| {
        let done = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        println!("[observer] {} task(s), {done} completed", tasks.len());
    });

    println!("-- mark 1 complete");
    store.mark_complete("1");
    println!("-- mark 1 active again");
    store.mark_active("1");
    println!("-- mark unknown id (silent no-op)");
    store.mark_complete("does-not-exist");

    store.unsubscribe(sub);
    println!("-- final snapshot");
    print_tasks(&store.tasks());
    Ok(())
}

//! folio: command-line front end for the document-analysis backend.
//!
//! Lists and mutates collections and documents through the entity cache,
//! submits files for analysis, and works with document text locally:
//! sections, search, highlighting, notes and Markdown export.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use folio_cache::{CacheConfig, DataStore, EntityCache, FetchMode, RevalidationScheduler};
use folio_client::{ApiClient, ClientConfig};
use folio_core::defaults::ONBOARDING_STEPS;
use folio_core::{Credentials, DocumentApi, FileStore, KeyValueStore, SystemClock, UploadFile};
use folio_text::highlight::{render, KeywordMatcher, SpanKind};
use folio_text::{export, split_sections, DocumentView, NoteBook, Preferences};

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about = "Document-analysis client")]
#[command(propagate_version = true)]
struct Cli {
    /// Bearer token (overrides FOLIO_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Language sent as Accept-Language (overrides the stored preference)
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Directory for session snapshots, notes and preferences
    /// (default: FOLIO_DATA_DIR or ./.folio)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List collections
    Collections {
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },

    /// List documents. With --collection, every document of that
    /// collection is read from the server.
    Documents {
        #[arg(short, long)]
        collection: Option<i64>,
    },

    /// Create a collection
    CreateCollection { name: String },

    /// Delete a collection
    DeleteCollection { id: i64 },

    /// Save a document into a collection
    Save {
        document_id: i64,
        collection_id: i64,
    },

    /// Submit files for analysis
    Analyze {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Collection to file the documents under
        #[arg(short, long)]
        collection: Option<i64>,
    },

    /// Show the latest analysis of a document
    Analysis { document_id: i64 },

    /// Generate a quiz from a text file
    Quiz { file: PathBuf },

    /// Export the latest analysis summary of a document as Markdown
    ExportSummary {
        document_id: i64,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Split a text file into sections
    Sections { file: PathBuf },

    /// Find case-insensitive matches in a text file
    Search { file: PathBuf, query: String },

    /// Render one section with search or keyword highlighting
    Highlight {
        file: PathBuf,

        /// Section ID (sec-1, sec-2, ...)
        #[arg(short, long, default_value = "sec-1")]
        section: String,

        #[arg(short, long)]
        query: Option<String>,

        /// Keywords to highlight (can specify multiple)
        #[arg(short, long)]
        keyword: Vec<String>,
    },

    /// Manage notes on a text file
    Notes {
        #[command(subcommand)]
        command: NotesCommand,
    },

    /// Show or change preferences
    Prefs {
        #[command(subcommand)]
        command: Option<PrefsCommand>,
    },

    /// Keep the lists fresh and print changes until interrupted
    Watch {
        /// Revalidation period in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
enum NotesCommand {
    /// Add a note to a section
    Add {
        file: PathBuf,
        section: String,
        text: String,
    },
    /// List notes by section
    List { file: PathBuf },
    /// Replace the text of a note
    Edit {
        file: PathBuf,
        id: String,
        text: String,
    },
    /// Delete a note
    Delete { file: PathBuf, id: String },
    /// Export notes as Markdown
    Export {
        file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum PrefsCommand {
    /// Set the preferred language
    Lang { lang: String },
    /// Set the active analysis tab
    Tab { tab: String },
    /// Turn keyword highlighting on or off
    Keywords {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Advance the onboarding walkthrough
    Onboarding {
        /// Finish immediately
        #[arg(long)]
        skip: bool,
    },
}

/// Session and durable stores plus resolved credentials.
struct AppContext {
    data_dir: PathBuf,
    session: Arc<dyn KeyValueStore>,
    durable: Arc<dyn KeyValueStore>,
    prefs: Preferences,
    creds: Credentials,
}

impl AppContext {
    async fn new(cli: &Cli) -> Self {
        let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
            std::env::var("FOLIO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".folio"))
        });
        let session: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir.join("session")));
        let durable: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir.join("durable")));
        let prefs = Preferences::new(durable.clone());

        let lang = match &cli.lang {
            Some(lang) => Some(lang.clone()),
            None => Some(prefs.language().await),
        };
        let creds = Credentials {
            token: cli.token.clone(),
            lang,
        };

        Self {
            data_dir,
            session,
            durable,
            prefs,
            creds,
        }
    }

    async fn data_store(&self) -> anyhow::Result<DataStore> {
        let client = ApiClient::new(ClientConfig::from_env())?;
        let config = CacheConfig::from_env();
        config.validate()?;
        let cache = EntityCache::new(Arc::new(client), self.session.clone(), config);
        let restored = cache.hydrate().await;
        debug!(restored, "Session snapshots restored");
        Ok(DataStore::new(cache))
    }

    fn api(&self) -> anyhow::Result<ApiClient> {
        Ok(ApiClient::new(ClientConfig::from_env())?)
    }

    async fn notebook(&self, file: &Path) -> anyhow::Result<(NoteBook, String)> {
        let text = read_text(file)?;
        let book = NoteBook::open(
            self.durable.clone(),
            Arc::new(SystemClock),
            file_label(file).as_deref(),
            &text,
        )
        .await;
        Ok((book, text))
    }
}

fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // LOG_FORMAT  - "json" or "text" (default: "text")
    // LOG_FILE    - path to log file (optional, enables file logging)
    // RUST_LOG    - standard env filter (default: "folio=info")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "folio=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("folio.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .init();
        }
        Some(guard)
    } else {
        // Logs go to stderr so command output stays parseable.
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    let ctx = AppContext::new(&cli).await;
    run(cli.command, &ctx).await
}

async fn run(command: Commands, ctx: &AppContext) -> anyhow::Result<()> {
    match command {
        Commands::Collections { refresh } => {
            let store = ctx.data_store().await?;
            // The process exits after printing, so a refresh spawned on a
            // soft-stale hit would never land.
            let mode = if refresh {
                FetchMode::Force
            } else {
                FetchMode::Background
            };
            let collections = store.cache().collections(&ctx.creds, mode).await?;
            print_json(collections.as_ref())?;
        }
        Commands::Documents { collection } => {
            let store = ctx.data_store().await?;
            match collection {
                Some(id) => {
                    let page = store.collection_documents(id, &ctx.creds).await?;
                    print_json(&page.items)?;
                }
                None => {
                    let page = store
                        .cache()
                        .documents(&ctx.creds, FetchMode::Background)
                        .await?;
                    print_json(&page.items)?;
                }
            }
        }
        Commands::CreateCollection { name } => {
            let store = ctx.data_store().await?;
            let created = store.create_collection(name.trim(), &ctx.creds).await?;
            print_json(&created)?;
        }
        Commands::DeleteCollection { id } => {
            let store = ctx.data_store().await?;
            store.delete_collection(id, &ctx.creds).await?;
            println!("Deleted collection {}", id);
        }
        Commands::Save {
            document_id,
            collection_id,
        } => {
            let store = ctx.data_store().await?;
            store
                .save_document_to_collection(document_id, collection_id, &ctx.creds)
                .await?;
            println!("Saved document {} to collection {}", document_id, collection_id);
        }
        Commands::Analyze { files, collection } => {
            let uploads = files
                .iter()
                .map(|path| upload_file(path))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let results = ctx.api()?.analyze(uploads, collection, &ctx.creds).await?;
            print_json(&results)?;
        }
        Commands::Analysis { document_id } => {
            let analysis = ctx.api()?.latest_analysis(document_id, &ctx.creds).await?;
            print_json(&analysis)?;
        }
        Commands::Quiz { file } => {
            let text = read_text(&file)?;
            let quiz = ctx.api()?.generate_quiz(&text, &ctx.creds).await?;
            print_json(&quiz)?;
        }
        Commands::ExportSummary {
            document_id,
            output,
        } => {
            let analysis = ctx.api()?.latest_analysis(document_id, &ctx.creds).await?;
            let sentiment = Some(analysis.sentiment.as_str()).filter(|s| !s.is_empty());
            let file = export::export_summary(
                &analysis.file_name,
                &analysis.summary,
                sentiment,
                chrono::Local::now().naive_local(),
            );
            write_export(&output, &file)?;
        }
        Commands::Sections { file } => {
            let text = read_text(&file)?;
            for section in split_sections(&text) {
                println!("{}\t{}", section.id, section.title);
            }
        }
        Commands::Search { file, query } => {
            let mut view = DocumentView::new(read_text(&file)?);
            view.set_query(query);
            let state = view.state();
            println!("{} matches", state.matches.len());
            for offset in state.matches {
                println!("{}", offset);
            }
        }
        Commands::Highlight {
            file,
            section,
            query,
            keyword,
        } => {
            let text = read_text(&file)?;
            let sections = split_sections(&text);
            let Some(found) = sections.iter().find(|s| s.id == section) else {
                bail!("No section {} ({} sections)", section, sections.len());
            };
            let highlight = !keyword.is_empty() || ctx.prefs.keyword_highlight().await;
            let matcher = KeywordMatcher::new(&keyword);
            let spans = render(
                &found.content,
                query.as_deref().unwrap_or(""),
                &matcher,
                highlight,
            );
            let rendered: String = spans
                .iter()
                .map(|span| match span.kind {
                    SpanKind::Plain => span.text.to_string(),
                    SpanKind::SearchMatch => format!("[{}]", span.text),
                    SpanKind::Keyword => format!("*{}*", span.text),
                })
                .collect();
            println!("{}", rendered);
        }
        Commands::Notes { command } => run_notes(command, ctx).await?,
        Commands::Prefs { command } => run_prefs(command, ctx).await?,
        Commands::Watch { interval } => run_watch(interval, ctx).await?,
    }
    Ok(())
}

async fn run_notes(command: NotesCommand, ctx: &AppContext) -> anyhow::Result<()> {
    match command {
        NotesCommand::Add {
            file,
            section,
            text,
        } => {
            let (mut book, body) = ctx.notebook(&file).await?;
            if !split_sections(&body).iter().any(|s| s.id == section) {
                bail!("No section {} in {}", section, file.display());
            }
            book.set_draft(&section, text);
            match book.add_note(&section).await? {
                Some(note) => print_json(&note)?,
                None => bail!("Note text is empty"),
            }
        }
        NotesCommand::List { file } => {
            let (book, body) = ctx.notebook(&file).await?;
            for section in split_sections(&body) {
                let notes = book.section_notes(&section.id);
                if notes.is_empty() {
                    continue;
                }
                println!("{}\t{}", section.id, section.title);
                for note in notes {
                    println!("  {}\t{}", note.id, note.text);
                }
            }
        }
        NotesCommand::Edit { file, id, text } => {
            let (mut book, _) = ctx.notebook(&file).await?;
            if !book.start_edit(&id) {
                bail!("No note {}", id);
            }
            book.set_edit_draft(text);
            if let Some(note) = book.save_edit().await? {
                print_json(&note)?;
            }
        }
        NotesCommand::Delete { file, id } => {
            let (mut book, _) = ctx.notebook(&file).await?;
            if !book.delete_note(&id).await? {
                bail!("No note {}", id);
            }
            println!("Deleted note {}", id);
        }
        NotesCommand::Export { file, output } => {
            let (book, body) = ctx.notebook(&file).await?;
            let export = export::export_notes(
                book.notes(),
                &split_sections(&body),
                chrono::Local::now().naive_local(),
            );
            write_export(&output, &export)?;
        }
    }
    Ok(())
}

async fn run_prefs(command: Option<PrefsCommand>, ctx: &AppContext) -> anyhow::Result<()> {
    let prefs = &ctx.prefs;
    match command {
        None => {
            let onboarding = prefs.onboarding(ONBOARDING_STEPS).await;
            print_json(&serde_json::json!({
                "language": prefs.language().await,
                "activeTab": prefs.active_tab().await,
                "keywordHighlight": prefs.keyword_highlight().await,
                "currentIndex": prefs.current_index().await,
                "onboardingStep": onboarding.step(),
                "dataDir": ctx.data_dir.to_string_lossy(),
            }))?;
        }
        Some(PrefsCommand::Lang { lang }) => {
            let stored = prefs.set_language(&lang).await?;
            println!("Language set to {}", stored);
        }
        Some(PrefsCommand::Tab { tab }) => {
            prefs.set_active_tab(&tab).await?;
        }
        Some(PrefsCommand::Keywords { enabled }) => {
            prefs.set_keyword_highlight(enabled).await?;
        }
        Some(PrefsCommand::Onboarding { skip }) => {
            let mut onboarding = prefs.onboarding(ONBOARDING_STEPS).await;
            if skip {
                onboarding.skip().await?;
            } else {
                onboarding.next().await?;
            }
            println!("Onboarding step {}", onboarding.step());
        }
    }
    Ok(())
}

async fn run_watch(interval: Option<u64>, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.data_store().await?;
    store.fetch_collections(&ctx.creds).await?;
    store.fetch_documents(&ctx.creds).await?;

    let mirror = store.spawn_mirror();
    let mut scheduler = RevalidationScheduler::new(store.cache().clone());
    if let Some(secs) = interval {
        scheduler = scheduler.with_interval(Duration::from_secs(secs.max(1)));
    }
    let handle = scheduler.start();

    let mut state = store.subscribe();
    loop {
        {
            let current = state.borrow_and_update();
            println!(
                "{} collections, {} documents",
                current.collections.len(),
                current.documents_total
            );
        }
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await?;
    mirror.abort();
    Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn file_label(path: &Path) -> Option<String> {
    path.file_name().map(|f| f.to_string_lossy().into_owned())
}

fn upload_file(path: &Path) -> anyhow::Result<UploadFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => Some("application/pdf"),
        Some("txt") => Some("text/plain"),
        Some("md") => Some("text/markdown"),
        Some("docx") => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        _ => None,
    };
    Ok(UploadFile {
        file_name: file_label(path).unwrap_or_else(|| "upload".to_string()),
        content_type: content_type.map(str::to_string),
        bytes,
    })
}

fn write_export(dir: &Path, file: &export::ExportFile) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&file.file_name);
    std::fs::write(&path, &file.contents)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

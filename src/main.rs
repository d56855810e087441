use clap::{Parser, Subcommand};
use newt::backend::{PlaceholderImages, ReplayBackend};
use newt::driver::{self, Generators};
use newt::extract::extract_headings;
use newt::session::{Explorer, GenerationMode, SessionContent, SessionStatus};
use newt::storage::{FileStore, clear_history, load_history};
use newt::{config, navigation, output, render};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Number of suggestions listed by `newt suggest`.
const SUGGESTION_LIMIT: usize = 6;

/// Release builds report the package version; anything else reports the
/// commit it was built from, marked `+dirty` for uncommitted changes.
fn version_string() -> &'static str {
    if env!("ON_RELEASE_TAG") == "true" && env!("GIT_DIRTY") == "false" {
        return env!("CARGO_PKG_VERSION");
    }
    let hash = env!("GIT_HASH");
    let suffix = if env!("GIT_DIRTY") == "true" { "+dirty" } else { "" };
    match hash {
        "" => "dev@unknown",
        // Leaked once at startup
        hash => Box::leak(format!("dev@{hash}{suffix}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "newt")]
#[command(about = "Incremental renderer for a fully generated encyclopedia")]
#[command(long_about = "\
Incremental renderer for a fully generated encyclopedia

Every page is generated on demand. A topic starts a generation session; the
page is rebuilt after every streamed fragment, internal links lead to new
topics, and a cover image is requested once the article's title and lead
have settled.

Offline, content is replayed from a directory of pre-written pages:

  pages/
  ├── hogwarts.md          # Article for the topic \"Hogwarts\"
  ├── black-holes.md       # Article for \"Black Holes\" (slugged file name)
  └── spotify.json         # Site document for the query \"Spotify\"

Logging goes to stderr and is controlled by RUST_LOG (default: newt=info).

Run 'newt gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Directory for persisted state (recent-topic history)
    #[arg(long, default_value = ".newt", global = true)]
    state_dir: PathBuf,

    /// Directory of pre-written pages to replay
    #[arg(long, default_value = "pages", global = true)]
    source: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an article for a topic and write the rendered page
    Article {
        topic: String,
        /// Output HTML file (default: <slug>.html, or page.html)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a site for a query and write the rendered page
    Site {
        query: String,
        /// Output HTML file (default: <slug>.html, or page.html)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the table of contents of a markdown file
    Toc { file: PathBuf },
    /// Show recent topics
    History {
        /// Forget all recent topics
        #[arg(long)]
        clear: bool,
    },
    /// List suggested topics, optionally filtered
    Suggest { prefix: Option<String> },
    /// Print a random suggested topic
    Random,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Article { topic, out } => {
            let config = config::load_config(&cli.config_dir)?;
            generate(&cli.state_dir, &cli.source, &config, GenerationMode::Article, &topic, out)?;
        }
        Command::Site { query, out } => {
            let config = config::load_config(&cli.config_dir)?;
            generate(&cli.state_dir, &cli.source, &config, GenerationMode::Site, &query, out)?;
        }
        Command::Toc { file } => {
            let text = std::fs::read_to_string(&file)?;
            output::print_toc(&extract_headings(&text));
        }
        Command::History { clear } => {
            let config = config::load_config(&cli.config_dir)?;
            let mut store = FileStore::new(&cli.state_dir);
            if clear {
                clear_history(&mut store, &config.history.storage_key)?;
                println!("History cleared");
            } else {
                let history =
                    load_history(&store, &config.history.storage_key, config.history.capacity);
                output::print_history(&history);
            }
        }
        Command::Suggest { prefix } => {
            let matches = navigation::suggest(prefix.as_deref().unwrap_or_default(), SUGGESTION_LIMIT);
            output::print_suggestions(&matches);
        }
        Command::Random => {
            println!("{}", navigation::random_topic(&mut rand::thread_rng()));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newt=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one session through the replay backend and write the rendered page.
fn generate(
    state_dir: &Path,
    source: &Path,
    config: &config::NewtConfig,
    mode: GenerationMode,
    input: &str,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut explorer = Explorer::new(FileStore::new(state_dir), config, mode);
    let request = explorer.visit(input)?;

    let replay = ReplayBackend::new(source, config.stream.chunk_size);
    let generators = Generators {
        text: &replay,
        site: &replay,
        images: &PlaceholderImages,
    };

    println!("{}", output::format_run_header(&request.topic, mode));
    let summary = driver::run(&mut explorer, &request, generators, |_, event| {
        output::print_driver_event(&event)
    });

    let view = explorer.view();
    let page = render::render_page(&view, config).into_string();
    let out = out.unwrap_or_else(|| output::page_filename(&request.topic));
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&out, page)?;
    output::print_run_summary(&summary, view.cover, Some(out.as_path()));
    if let Some(SessionContent::Article(doc)) = view.content {
        output::print_related(&doc.links());
    }

    match summary.status {
        Some(SessionStatus::Failed(message)) => Err(message.into()),
        _ => Ok(()),
    }
}

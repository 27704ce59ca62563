//! # Journal Harness CLI (`jrnl`)
//!
//! A local-first journal that answers questions over your own entries.
//!
//! ## Usage
//!
//! ```bash
//! jrnl --config ./config/jrnl.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `jrnl init` | Create the SQLite database and the index directory |
//! | `jrnl add "<text>"` | Save an entry, chunk it, and rebuild the index |
//! | `jrnl entries` | List entries |
//! | `jrnl ask "<question>"` | Answer a question from entries or summaries |
//! | `jrnl index rebuild` | Re-embed every chunk into a fresh index |
//! | `jrnl index reindex` | Rechunk every entry, then rebuild |
//! | `jrnl index status` | Compare the index with stored chunks |
//! | `jrnl summarize weekly` | Summarize last week |
//! | `jrnl summarize monthly` | Summarize last month |
//! | `jrnl summaries` | List stored summaries |
//! | `jrnl history` | Show past questions and answers, optionally filtered |
//! | `jrnl completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! jrnl init
//! jrnl add --date 2024-03-04 "Long run by the river, felt great afterwards."
//! jrnl ask "When did I last go running?"
//! jrnl ask "How was my mood overall?" --from 2024-03-01 --to 2024-03-31
//! ```
//!
//! Logging goes to stderr and is controlled by `JRNL_LOG`
//! (e.g. `JRNL_LOG=debug`), defaulting to `warn`.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use journal_harness::journal_cmd::EntrySource;
use journal_harness::{
    app, ask, config, history, index_cmd, journal_cmd, migrate, summarize_cmd,
};
use journal_harness_core::models::Granularity;

/// Journal Harness: ask questions over your own journal.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/jrnl.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "jrnl",
    about = "Journal Harness: a local-first journal with retrieval-grounded answers",
    version,
    long_about = "Journal Harness stores dated journal entries, indexes them for semantic \
    search, keeps weekly and monthly summaries, and answers questions by assembling the \
    smallest context that covers them for a language model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/jrnl.toml")]
    config: PathBuf,

    /// Journal owner. Defaults to `$USER`, then `default`.
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and the index directory.
    ///
    /// Idempotent: running it again is safe.
    Init,

    /// Add a journal entry.
    ///
    /// The entry is split into overlapping word windows, stored, and the
    /// owner's vector index is rebuilt.
    Add {
        /// Entry text. Omit when using `--file`.
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,

        /// Read the entry text from a file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Entry date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },

    /// List journal entries, newest first.
    Entries {
        /// Only entries on or after this date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Only entries on or before this date (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,
    },

    /// Ask a question about your journal.
    ///
    /// Specific questions are answered from the closest entry passages.
    /// Questions about patterns or periods are answered from summaries and
    /// entries in the `--from`/`--to` range (default: the last 7 days).
    Ask {
        query: String,

        /// Range start (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Range end (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        to: Option<String>,

        /// Print the assembled context before the answer.
        #[arg(long)]
        show_context: bool,
    },

    /// Manage the vector index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Generate the summary for the previous week or month.
    Summarize {
        #[arg(value_enum)]
        granularity: GranularityArg,

        /// Reference date (YYYY-MM-DD); the period before it is summarized.
        #[arg(long)]
        date: Option<String>,
    },

    /// List stored summaries.
    Summaries {
        #[arg(long, value_enum)]
        granularity: Option<GranularityArg>,
    },

    /// Show past questions and answers.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only records asked on or after this date (YYYY-MM-DD, UTC).
        #[arg(long)]
        since: Option<String>,

        /// Only records asked on or before this date (YYYY-MM-DD, UTC).
        #[arg(long)]
        until: Option<String>,

        /// Only records whose question or answer contains this keyword
        /// (case-insensitive).
        #[arg(long)]
        search: Option<String>,
    },

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Re-embed every stored chunk into a fresh index.
    Rebuild,
    /// Rechunk every entry with the configured window, then rebuild.
    Reindex,
    /// Report vectors missing from, or orphaned in, the index.
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum GranularityArg {
    Weekly,
    Monthly,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Weekly => Granularity::Weekly,
            GranularityArg::Monthly => Granularity::Monthly,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("JRNL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    // Commands that don't require config
    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "jrnl", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    let owner = app::resolve_owner(cli.user);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            std::fs::create_dir_all(&cfg.index.dir)?;
            println!("Database initialized successfully.");
        }
        Commands::Add { text, file, date } => {
            let source = match (&text, &file) {
                (_, Some(path)) => EntrySource::File(path),
                (Some(text), None) => EntrySource::Inline(text),
                (None, None) => anyhow::bail!("Provide entry text or --file"),
            };
            journal_cmd::run_add(&cfg, &owner, date, source).await?;
        }
        Commands::Entries { since, until } => {
            journal_cmd::run_entries(&cfg, &owner, since, until).await?;
        }
        Commands::Ask {
            query,
            from,
            to,
            show_context,
        } => {
            ask::run_ask(&cfg, &owner, &query, from, to, show_context).await?;
        }
        Commands::Index { action } => match action {
            IndexAction::Rebuild => index_cmd::run_rebuild(&cfg, &owner).await?,
            IndexAction::Reindex => index_cmd::run_reindex(&cfg, &owner).await?,
            IndexAction::Status => index_cmd::run_status(&cfg, &owner).await?,
        },
        Commands::Summarize { granularity, date } => {
            summarize_cmd::run_summarize(&cfg, &owner, granularity.into(), date).await?;
        }
        Commands::Summaries { granularity } => {
            summarize_cmd::run_summaries(&cfg, &owner, granularity.map(Into::into)).await?;
        }
        Commands::History {
            limit,
            since,
            until,
            search,
        } => {
            history::run_history(&cfg, &owner, limit, since, until, search).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}

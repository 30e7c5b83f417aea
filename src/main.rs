//! # plagscan CLI
//!
//! The `plagscan` binary indexes source files and reports how much of each
//! new file closely matches code already indexed.
//!
//! ## Usage
//!
//! ```bash
//! plagscan --config ./plagscan.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `plagscan ingest <files…>` | Index files as reference submissions |
//! | `plagscan check <file>` | Score a file against the index, then index it |
//! | `plagscan recheck <id>` | Re-score a stored submission against all others |
//! | `plagscan compare <files…>` | Originality leaderboard for a batch of files |
//! | `plagscan submissions` | List stored submissions |
//! | `plagscan show <id>` | Print a submission and its chunks |
//! | `plagscan stats` | Index statistics |
//!
//! State is kept in the JSON snapshot named by `[store] snapshot`, loaded
//! before every command and rewritten after commands that add submissions,
//! including when such a command fails after some submissions were added.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use plagscan::ingest::SubmissionMeta;
use plagscan::{check, compare, config, detector, get, ingest, logging, snapshot, stats};

/// plagscan: embedding-based code plagiarism detection.
#[derive(Parser)]
#[command(
    name = "plagscan",
    about = "plagscan — embedding-based code plagiarism detection",
    version,
    long_about = "plagscan splits source files into overlapping word windows, embeds each \
    window, and flags windows whose nearest neighbour from another submission is above the \
    similarity threshold. Reports give a plagiarism percentage and the strongest matches."
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when it is missing.
    #[arg(long, global = true, default_value = "./plagscan.toml")]
    config: PathBuf,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct MetaArgs {
    /// Team that owns the submission.
    #[arg(long)]
    team: Option<String>,

    /// Display name of the submission.
    #[arg(long)]
    name: Option<String>,

    /// Source language. Detected from the file extension when omitted.
    #[arg(long)]
    language: Option<String>,
}

impl From<MetaArgs> for SubmissionMeta {
    fn from(args: MetaArgs) -> Self {
        Self {
            team_name: args.team,
            submission_name: args.name,
            language: args.language,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index files as reference submissions without scoring them.
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        meta: MetaArgs,
    },

    /// Score a file against everything indexed, then index it.
    Check {
        file: PathBuf,

        #[command(flatten)]
        meta: MetaArgs,
    },

    /// Re-score a stored submission against every other submission.
    Recheck {
        /// Submission UUID.
        id: String,
    },

    /// Index several files and rank them by originality.
    Compare {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        /// Team names become `<prefix>-1`, `<prefix>-2`, ...
        #[arg(long, default_value = "Team")]
        team_prefix: String,

        /// Source language for every file. Detected per file when omitted.
        #[arg(long)]
        language: Option<String>,
    },

    /// List stored submissions.
    Submissions,

    /// Print a stored submission and its chunks.
    Show {
        /// Submission UUID.
        id: String,
    },

    /// Show index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_or_default(&cli.config)?;
    logging::init_with_config(&cfg.logging);

    let detector = detector::build_detector(&cfg)?;
    let loaded = snapshot::load(&cfg.store.snapshot, &detector).await?;
    tracing::debug!(submissions = loaded, "state loaded");

    let json = cli.json;
    let (mutating, result) = match cli.command {
        Commands::Ingest { files, meta } => (
            true,
            ingest::run_ingest(&detector, &files, &meta.into(), json).await,
        ),
        Commands::Check { file, meta } => (
            true,
            check::run_check(&detector, &file, &meta.into(), json).await,
        ),
        Commands::Recheck { id } => (false, check::run_recheck(&detector, &id, json).await),
        Commands::Compare {
            files,
            team_prefix,
            language,
        } => (
            true,
            compare::run_compare(&detector, &files, &team_prefix, language.as_deref(), json)
                .await,
        ),
        Commands::Submissions => (false, get::run_submissions(&detector, json).await),
        Commands::Show { id } => (false, get::run_show(&detector, &id, json).await),
        Commands::Stats => (false, stats::run_stats(&cfg, &detector, json).await),
    };

    // Commands that fail part-way may already have committed submissions.
    if mutating {
        let saved = snapshot::save(&cfg.store.snapshot, &detector).await;
        result?;
        saved?;
    } else {
        result?;
    }

    Ok(())
}

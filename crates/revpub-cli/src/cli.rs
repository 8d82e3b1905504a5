use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "revpub",
    version,
    about = "Publish artifact batches to a versioned store in one commit",
    after_help = "\
Configuration file lookup order:
  1. --config <path>             (explicit flag)
  2. $REVPUB_CONFIG              (environment variable)
  3. ./revpub.yaml               (project)

Module ids are written organisation#module;revision, e.g. acme#widget;1.0"
)]
pub(crate) struct Cli {
    /// Path to configuration file (overrides REVPUB_CONFIG and ./revpub.yaml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Write a starter configuration file
    Config {
        /// Destination path (default: ./revpub.yaml)
        dest: Option<String>,
    },

    /// Create an empty store in a local directory
    Init {
        /// Directory to hold the store
        path: String,
    },

    /// Publish files for one module revision as a single commit
    Publish {
        /// Module id: organisation#module;revision
        #[arg(short, long)]
        module: String,

        /// Replace files (and, in alias mode, folders) that already exist
        #[arg(long)]
        overwrite: bool,

        /// Files to publish; each lands at the configured pattern
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Download one file from the store
    Fetch {
        /// Path relative to the repository URL, or a full URL under it
        path: String,

        /// Local destination, or "-" for stdout
        dest: String,
    },

    /// List a folder
    List {
        /// Folder relative to the repository URL (default: the root)
        #[arg(default_value = "")]
        path: String,
    },

    /// Show metadata for one path
    Info {
        path: String,
    },

    /// Show the most recent commits
    Log {
        /// Number of revisions to show
        #[arg(long, default_value_t = 20)]
        last: usize,
    },
}

impl Commands {
    /// Commands that run without a configuration file.
    pub fn needs_config(&self) -> bool {
        !matches!(self, Commands::Config { .. } | Commands::Init { .. })
    }
}

//! CLI argument definitions for nexstage.
//!
//! Uses `clap` derive macros to define the goals. Each goal corresponds to a
//! handler in the [`super::commands`] module. Staging settings given as
//! flags override the `[staging]` section of `Nexstage.toml`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "nexstage",
    version,
    about = "Stage Maven artifacts through a Nexus repository manager",
    long_about = "nexstage gathers the artifacts of a multi-module build into a local staging \
                  area and drives Nexus staging repositories through open, upload, close, \
                  release and drop."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to Nexstage.toml (defaults to the nearest one upwards)
    #[arg(long, global = true, env = "NEXSTAGE_MANIFEST")]
    pub manifest_path: Option<PathBuf>,

    #[command(flatten)]
    pub staging: StagingArgs,
}

/// Overrides for `[staging]` settings.
#[derive(Args, Debug, Default)]
pub struct StagingArgs {
    /// Repository manager base URL
    #[arg(long, global = true, env = "NEXSTAGE_NEXUS_URL")]
    pub nexus_url: Option<String>,

    /// Server entry in ~/.nexstage/config.toml holding the credentials
    #[arg(long, global = true, env = "NEXSTAGE_SERVER_ID")]
    pub server_id: Option<String>,

    /// Staging profile ID (skips profile matching)
    #[arg(long, global = true)]
    pub profile_id: Option<String>,

    /// Upload into this existing staging repository instead of opening one
    #[arg(long, global = true)]
    pub repository_id: Option<String>,

    /// Description attached to staging actions
    #[arg(short = 'm', long, global = true)]
    pub description: Option<String>,

    /// Local staging directory
    #[arg(long, global = true)]
    pub staging_dir: Option<PathBuf>,

    /// Tag for newly opened repositories (key=value, repeatable)
    #[arg(long = "tag", global = true, value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Stage locally only; finish later with `deploy-staged`
    #[arg(long, global = true)]
    pub skip_remote: bool,

    /// Leave staging repositories open after upload
    #[arg(long, global = true)]
    pub skip_close: bool,

    /// Release repositories right after they close
    #[arg(long, global = true)]
    pub auto_release: bool,

    /// Keep released repositories on the server
    #[arg(long, global = true)]
    pub no_auto_drop: bool,

    /// Do not drop repositories after upload or close errors
    #[arg(long, global = true)]
    pub keep_on_failure: bool,

    /// Do not drop repositories that failed staging rules
    #[arg(long, global = true)]
    pub keep_on_rule_failure: bool,

    /// Stage remotely even if other modules failed
    #[arg(long, global = true)]
    pub fail_at_end: bool,

    /// Refuse plain HTTP URLs
    #[arg(long, global = true)]
    pub require_tls: bool,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub ssl_insecure: bool,

    /// Also write SHA-256 and SHA-512 checksums
    #[arg(long, global = true)]
    pub extra_checksums: bool,
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy every module of the build
    Deploy {
        /// Run modules in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Upload and finish what `deploy --skip-remote` staged locally
    DeployStaged,

    /// Stage a prepared Maven repository directory
    DeployStagedRepository {
        /// Directory in Maven repository layout
        directory: PathBuf,
    },

    /// Open a staging repository for --profile-id
    Open,

    /// Close staging repositories
    Close {
        /// Repository IDs (prompted for when omitted on a terminal)
        ids: Vec<String>,
    },

    /// Drop staging repositories
    Drop {
        /// Repository IDs (prompted for when omitted on a terminal)
        ids: Vec<String>,
    },

    /// Release closed staging repositories
    Release {
        /// Repository IDs (prompted for when omitted on a terminal)
        ids: Vec<String>,
    },

    /// Promote closed staging repositories to a build promotion profile
    Promote {
        /// Build promotion profile ID
        #[arg(long)]
        group: String,
        /// Repository IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Close and release (or drop) the repositories recorded by the last deploy
    Finish {
        /// Drop instead of releasing
        #[arg(long)]
        drop: bool,
    },

    /// List the staging profiles visible to these credentials
    ListProfiles,

    /// List staging repositories
    ListRepositories {
        /// Ignore --profile-id and list every profile's repositories
        #[arg(long)]
        all: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

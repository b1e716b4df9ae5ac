//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::filters::ConfigPlanFilter;
use crate::models::{LogLevel, PlanType};

/// goldencfg - Approve and deploy golden config plans.
#[derive(Parser, Debug)]
#[command(name = "goldencfg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(short, long, global = true, env = "GOLDEN_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit process logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a settings template and `.env.example`.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the settings file.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Manage config plans.
    Plans {
        /// Plans subcommand.
        #[command(subcommand)]
        command: PlanCommands,
    },

    /// Deploy the selected config plans.
    Deploy {
        /// Plan selection.
        #[command(flatten)]
        filter: FilterArgs,

        /// Stamp the plans and log the payloads without pushing.
        #[arg(long)]
        dry_run: bool,

        /// Lowest level kept in the job log.
        #[arg(long, default_value = "info")]
        log_level: LogLevel,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect job results.
    Jobs {
        /// Jobs subcommand.
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Check secrets resolution.
    Secrets {
        /// Secrets subcommand.
        #[command(subcommand)]
        command: SecretCommands,
    },
}

/// Config plan subcommands.
#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// List plans.
    List {
        /// Plan selection.
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show one plan with its config set.
    Show {
        /// Plan id.
        id: Uuid,
    },

    /// Approve plans for deployment.
    Approve {
        /// Plan ids.
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },

    /// Import devices and plans from a YAML file.
    Import {
        /// File to import.
        file: PathBuf,
    },
}

/// Job result subcommands.
#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// List job results, newest first.
    List {
        /// Maximum number of jobs to show.
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show one job result and its log.
    Show {
        /// Job result id.
        id: Uuid,
    },
}

/// Secrets subcommands.
#[derive(Subcommand, Debug)]
pub enum SecretCommands {
    /// Report whether repository tokens and device credentials resolve.
    Check,
}

/// Config plan filter options.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Free-text search.
    #[arg(short = 'q', long = "search")]
    pub q: Option<String>,

    /// Device name or id.
    #[arg(long)]
    pub device: Vec<String>,

    /// Platform name or network driver.
    #[arg(long)]
    pub platform: Vec<String>,

    /// Status name.
    #[arg(long)]
    pub status: Vec<String>,

    /// Device role.
    #[arg(long)]
    pub role: Vec<String>,

    /// Device location.
    #[arg(long)]
    pub location: Vec<String>,

    /// Device tenant.
    #[arg(long)]
    pub tenant: Vec<String>,

    /// Plan type.
    #[arg(long)]
    pub plan_type: Vec<PlanType>,

    /// Change control id.
    #[arg(long)]
    pub change_control_id: Vec<String>,

    /// Plan id.
    #[arg(long)]
    pub id: Vec<String>,
}

impl From<FilterArgs> for ConfigPlanFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            q: args.q,
            device: args.device,
            platform: args.platform,
            status: args.status,
            role: args.role,
            location: args.location,
            tenant: args.tenant,
            plan_type: args.plan_type,
            change_control_id: args.change_control_id,
            id: args.id,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_arguments() {
        let cli = Cli::try_parse_from([
            "goldencfg",
            "deploy",
            "--device",
            "edge-1",
            "--status",
            "Approved",
            "--plan-type",
            "remediation",
            "--dry-run",
            "--log-level",
            "debug",
            "-y",
        ])
        .expect("parse");

        let Commands::Deploy { filter, dry_run, log_level, yes } = cli.command else {
            panic!("expected deploy");
        };
        assert!(dry_run && yes);
        assert_eq!(log_level, LogLevel::Debug);

        let filter = ConfigPlanFilter::from(filter);
        assert_eq!(filter.device, vec![String::from("edge-1")]);
        assert_eq!(filter.plan_type, vec![PlanType::Remediation]);
    }

    #[test]
    fn test_approve_requires_ids() {
        assert!(Cli::try_parse_from(["goldencfg", "plans", "approve"]).is_err());
        let id = Uuid::new_v4().to_string();
        assert!(Cli::try_parse_from(["goldencfg", "plans", "approve", &id]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["goldencfg", "jobs", "list", "--output", "json", "--log-json"])
            .expect("parse");
        assert!(matches!(cli.output, OutputFormat::Json));
        assert!(cli.log_json);
    }
}

//! goldencfg CLI entrypoint.
//!
//! This is the main entrypoint for the goldencfg command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use golden_config_deploy::cli::{
    Cli, Commands, JobCommands, OutputFormatter, PlanCommands, SecretCheck, SecretCommands,
};
use golden_config_deploy::config::{find_config_file, Settings, SettingsParser, SettingsValidator};
use golden_config_deploy::credentials::provider_from_settings;
use golden_config_deploy::deploy::{approve_plans, ConfigDeployment};
use golden_config_deploy::error::{GoldenConfigError, Result};
use golden_config_deploy::filters::ConfigPlanFilter;
use golden_config_deploy::models::{JobResult, LogLevel};
use golden_config_deploy::secrets::SecretResolver;
use golden_config_deploy::store::{LocalPlanStore, PlanImport, PlanStore};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);
    let config = cli.config.as_ref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force).map(|()| ExitCode::SUCCESS),
        Commands::Validate { warnings } => cmd_validate(config, warnings, &formatter),
        Commands::Plans { command } => cmd_plans(config, command, &formatter).await,
        Commands::Deploy {
            filter,
            dry_run,
            log_level,
            yes,
        } => cmd_deploy(config, filter.into(), dry_run, log_level, yes, &formatter).await,
        Commands::Jobs { command } => cmd_jobs(config, command, &formatter).await,
        Commands::Secrets { command } => match command {
            SecretCommands::Check => cmd_secrets_check(config, &formatter).await,
        },
    }
}

/// Initialize a new settings directory.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing golden config settings in: {}", path.display());

    let config_path = path.join("golden-config.yaml");
    let env_path = path.join(".env.example");

    if !force && config_path.exists() {
        eprintln!("Settings file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, include_str!("../templates/golden-config.yaml"))?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    eprintln!("\nNext steps:");
    eprintln!("  1. Copy .env.example to .env and fill in device credentials");
    eprintln!("  2. Map your platforms to drivers in golden-config.yaml");
    eprintln!("  3. Run 'goldencfg validate' to check your settings");
    eprintln!("  4. Run 'goldencfg plans import <file>' to load config plans");

    Ok(())
}

/// Validate settings.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool, formatter: &OutputFormatter) -> Result<ExitCode> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating settings: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let settings = parser.load_with_env(&config_file)?;

    let result = SettingsValidator::collect(&settings);
    OutputFormatter::emit(&formatter.format_validation(&result, show_warnings));

    if result.is_valid() {
        eprintln!("\nSettings summary:");
        eprintln!("  Commit: {}", settings.deploy.commit);
        eprintln!("  Workers: {}", settings.effective_workers());
        eprintln!("  Drivers: {}", settings.drivers.len());
        eprintln!("  Platform mappings: {}", settings.platform_network_driver_map.len());
        eprintln!("  Store: {}", parser.store_path(&settings).display());
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Config plan commands.
async fn cmd_plans(config_path: Option<&PathBuf>, command: PlanCommands, formatter: &OutputFormatter) -> Result<ExitCode> {
    let (settings, store) = load_settings_and_store(config_path)?;

    match command {
        PlanCommands::List { filter } => {
            let plans = store.list_plans(&filter.into()).await?;
            let devices = store.list_devices().await?;
            let statuses = store.statuses().await?;
            OutputFormatter::emit(&formatter.format_plans(&plans, &devices, &statuses));
        }
        PlanCommands::Show { id } => {
            let plan = store.get_plan(id).await?;
            let statuses = store.statuses().await?;
            let device = store.get_device(&plan.device.to_string()).await?;
            let status = statuses.name_of(plan.status).unwrap_or("unknown");
            OutputFormatter::emit(&formatter.format_plan(&plan, &device.name, status));
        }
        PlanCommands::Approve { ids } => {
            let updated = approve_plans(store.as_ref(), &ids).await?;
            eprintln!("Approved {updated} plan(s).");
        }
        PlanCommands::Import { file } => {
            let content = std::fs::read_to_string(&file)?;
            let import = PlanImport::from_yaml(&content)?;
            let report = import
                .apply(store.as_ref(), &settings.deploy.not_approved_status)
                .await?;
            eprintln!(
                "Imported {} device(s) and {} plan(s) from {}.",
                report.devices,
                report.plans,
                file.display()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Deploy selected config plans.
async fn cmd_deploy(
    config_path: Option<&PathBuf>,
    filter: ConfigPlanFilter,
    dry_run: bool,
    log_level: LogLevel,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let (settings, store) = load_settings_and_store(config_path)?;

    let plans = store.list_plans(&filter).await?;
    if plans.is_empty() {
        eprintln!("No config plans match the selection.");
        return Ok(ExitCode::SUCCESS);
    }

    let devices = store.list_devices().await?;
    let statuses = store.statuses().await?;
    eprintln!("{}", formatter.format_plans(&plans, &devices, &statuses));

    let deployment = ConfigDeployment::from_settings(&settings, Arc::clone(&store))?
        .with_commit(settings.deploy.commit && !dry_run);
    if !deployment.commit() {
        eprintln!("Commit is disabled: plans will be stamped but nothing is pushed.");
    }

    if !auto_approve {
        eprint!("Deploy {} plan(s)? [y/N]: ", plans.len());
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Deployment cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let mut job = JobResult::new("Deploy config plans");
    debug!("Starting job {}", job.id);
    let summary = deployment.deploy(plans, log_level, &mut job).await?;
    OutputFormatter::emit(&formatter.format_summary(&summary));

    if summary.all_successful() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("See 'goldencfg jobs show {}' for the job log.", job.id);
        Ok(ExitCode::FAILURE)
    }
}

/// Job result commands.
async fn cmd_jobs(config_path: Option<&PathBuf>, command: JobCommands, formatter: &OutputFormatter) -> Result<ExitCode> {
    let (_settings, store) = load_settings_and_store(config_path)?;

    match command {
        JobCommands::List { limit } => {
            let mut jobs = store.list_job_results().await?;
            jobs.truncate(limit);
            OutputFormatter::emit(&formatter.format_jobs(&jobs));
        }
        JobCommands::Show { id } => {
            let job = store
                .get_job_result(id)
                .await?
                .ok_or_else(|| GoldenConfigError::internal(format!("Job result not found: {id}")))?;
            OutputFormatter::emit(&formatter.format_job(&job));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Check that repository tokens and device credentials resolve.
async fn cmd_secrets_check(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<ExitCode> {
    let (settings, store) = load_settings_and_store(config_path)?;
    let resolver = SecretResolver::from_settings(&settings);
    let mut checks = Vec::new();

    for repository in &settings.repositories {
        let (resolved, error) = match resolver.repository_token(repository) {
            Ok(token) => (token.is_some(), None),
            Err(err) => (false, Some(err.to_string())),
        };
        checks.push(SecretCheck {
            subject: repository.name.clone(),
            kind: String::from("token"),
            resolved,
            error,
        });
    }

    let provider = provider_from_settings(&settings, &resolver);
    for device in store.list_devices().await? {
        let (resolved, error) = match provider.credentials_for(&device) {
            Ok(_) => (true, None),
            Err(err) => (false, Some(err.to_string())),
        };
        checks.push(SecretCheck {
            subject: device.name.clone(),
            kind: String::from("credentials"),
            resolved,
            error,
        });
    }

    OutputFormatter::emit(&formatter.format_secret_checks(&checks));
    if checks.iter().all(|c| c.error.is_none()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the settings file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Creates a parser rooted at the settings file's directory.
fn parser_for(config_file: &Path) -> SettingsParser {
    SettingsParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Loads validated settings and opens the plan store.
fn load_settings_and_store(config_path: Option<&PathBuf>) -> Result<(Settings, Arc<dyn PlanStore>)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading settings from: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;

    let settings = parser.load_with_env(&config_file)?;
    SettingsValidator::new().validate(&settings)?;

    let store: Arc<dyn PlanStore> = Arc::new(LocalPlanStore::with_data_path(parser.store_path(&settings)));

    Ok((settings, store))
}

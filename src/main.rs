//! junos-ops CLI entrypoint.
//!
//! This is the main entrypoint for the junos-ops command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use junos_ops::cli::{Cli, Commands, LogFormat, OutputFormatter};
use junos_ops::config::{
    ConfigValidator, HostDescriptor, InventoryParser, find_config_file, load_commands,
    resolve_targets,
};
use junos_ops::device::{DeviceConnector, SimulatorConnector};
use junos_ops::error::{ConfigError, Result};
use junos_ops::fleet::{
    ConfigRequest, DEFAULT_RSI_WORKERS, FleetExecutor, Operation, WorkflowContext,
};
use junos_ops::lifecycle::{LifecycleOptions, parse_reboot_at};
use junos_ops::package::{HashCache, PackageStager};

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.debug, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

/// Initializes the logging system. `RUST_LOG` wins over `--debug`.
fn init_logging(debug: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point. Returns the fleet result code.
async fn run(cli: Cli) -> Result<i32> {
    let formatter = OutputFormatter::new(cli.output);
    let command = cli.command.unwrap_or(Commands::Facts { hosts: Vec::new() });

    let hosts = load_inventory(cli.config.as_ref(), &formatter)?;
    let targets = resolve_targets(&hosts, command.hosts(), cli.tags.as_deref())?;
    info!("{} hosts targeted", targets.len());

    let workers = cli.workers.unwrap_or(match command {
        Commands::Rsi { .. } => DEFAULT_RSI_WORKERS,
        _ => 1,
    });
    let operation = build_operation(command)?;
    let connector = create_connector(cli.simulate.as_deref())?;

    let options = LifecycleOptions {
        force: cli.force,
        dry_run: cli.dry_run,
    };
    if options.dry_run {
        info!("dry-run: mutating steps are logged and skipped");
    }

    let context = Arc::new(WorkflowContext::new(
        connector,
        PackageStager::new(Arc::new(HashCache::new())),
        options,
        operation,
    ));
    let report = FleetExecutor::new(workers)
        .run(targets, move |host| {
            let context = Arc::clone(&context);
            async move { context.run_host(&host).await }
        })
        .await;

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", formatter.format_report(&report))?;
    stdout.flush()?;

    let code = report.exit_code();
    debug!("exit code {code}");
    Ok(code)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the inventory file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads, validates and resolves the inventory.
fn load_inventory(
    config_path: Option<&PathBuf>,
    formatter: &OutputFormatter,
) -> Result<Vec<HostDescriptor>> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading inventory from: {}", config_file.display());

    let parser = InventoryParser::new().with_base_path(
        config_file
            .parent()
            .unwrap_or_else(|| Path::new(".")),
    );
    parser.load_dotenv()?;

    let inventory = parser.load_with_env(&config_file)?;
    let validation = ConfigValidator::new().validate(&inventory)?;
    eprint!("{}", formatter.format_validation(&validation));

    Ok(inventory.resolve())
}

/// Turns the parsed subcommand into a fleet operation.
fn build_operation(command: Commands) -> Result<Operation> {
    Ok(match command {
        Commands::Facts { .. } => Operation::Facts,
        Commands::Upgrade { .. } => Operation::Upgrade,
        Commands::Copy { .. } => Operation::Copy,
        Commands::Install { .. } => Operation::Install,
        Commands::Rollback { .. } => Operation::Rollback,
        Commands::Version { .. } => Operation::Version,
        Commands::Reboot { at, .. } => Operation::Reboot {
            at: parse_reboot_at(&at)?,
        },
        Commands::Ls { long, .. } => Operation::List { long },
        Commands::Rsi { .. } => Operation::Rsi,
        Commands::Show { command, .. } => Operation::Show { command },
        Commands::Config {
            file,
            confirm_timeout,
            no_health_check,
            health_check,
            ..
        } => {
            let commands = load_commands(&file)?;
            info!("{} set commands loaded from {}", commands.len(), file.display());
            Operation::Config(ConfigRequest {
                commands,
                confirm_timeout,
                no_health_check,
                health_check,
            })
        }
    })
}

/// Creates the device connector.
fn create_connector(simulate: Option<&Path>) -> Result<Arc<dyn DeviceConnector>> {
    let Some(dir) = simulate else {
        return Err(ConfigError::NoTransport {
            message: String::from("no NETCONF transport is built in, pass --simulate <dir>"),
        }
        .into());
    };
    info!("Using simulated devices from: {}", dir.display());
    Ok(Arc::new(SimulatorConnector::from_dir(dir)))
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use zbx_logmon::app::{logging, Config, Overrides};
use zbx_logmon::logwatch::{self, rules, DiscoveryMode, FilePositionStore};

/// Log keyword monitor and discovery helper for Zabbix agents
#[derive(Parser)]
#[command(name = "zbx-logmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/zbx-logmon/config.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Directory holding the rules file and state directory
    #[arg(long, env = "ZBX_SCRIPTS_DIR", global = true)]
    scripts_dir: Option<PathBuf>,

    /// Rules file, relative to the scripts directory unless absolute
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Position files directory, relative to the scripts directory unless absolute
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan new log lines for the rules of one severity and print OK or PROBLEM lines
    Check {
        /// Severity whose rules are evaluated (case-insensitive)
        #[arg(short, long)]
        severity: String,
    },
    /// Print the discovery JSON for the rules of one severity
    Discover {
        /// Severity whose rules are listed (case-insensitive)
        #[arg(short, long)]
        severity: String,
        /// Treat file names as patterns and list every matching file under the directory
        #[arg(long)]
        expand: bool,
    },
    /// Create the scripts and state directories, rules template and settings file
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // init may be asked to create a settings file that does not exist yet
    let base = match (&cli.command, cli.settings.as_deref()) {
        (Commands::Init, Some(path)) if !path.exists() => Config::default(),
        (_, settings) => Config::load(settings)?,
    };
    let config = base.with_overrides(Overrides {
        scripts_dir: cli.scripts_dir,
        rules_file: cli.rules,
        state_dir: cli.state_dir,
        log_level: cli.log_level,
    });

    let _log_guard = init_logging(&config);

    match cli.command {
        Commands::Check { severity } => run_check(&config, &severity),
        Commands::Discover { severity, expand } => run_discover(&config, &severity, expand),
        Commands::Init => run_init(&config, cli.settings),
    }
}

/// Log to daily rotated files; stdout belongs to the agent
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let log_path = config.log_path();
    match logging::rolling_appender(&log_path) {
        Ok(appender) => {
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(file_writer),
                )
                .init();
            Some(guard)
        }
        Err(e) => {
            eprintln!("Warning: logging disabled for {}: {:#}", log_path.display(), e);
            None
        }
    }
}

fn run_check(config: &Config, severity: &str) -> Result<()> {
    let rules_path = config.rules_path();
    let rules = logwatch::load_rules(&rules_path)?;

    // Created on first position write
    let mut store = FilePositionStore::new(config.state_path());

    debug!(
        "Checking severity {} with rules from {}",
        severity,
        rules_path.display()
    );
    let report = logwatch::run_check(&rules, severity, &mut store);
    println!("{}", report);

    Ok(())
}

fn run_discover(config: &Config, severity: &str, expand: bool) -> Result<()> {
    let rules = logwatch::load_or_bootstrap(&config.rules_path())?;
    let mode = if expand {
        DiscoveryMode::Expand
    } else {
        DiscoveryMode::Literal
    };

    let items = logwatch::discover(&rules, severity, mode);
    print!("{}", logwatch::discovery::to_json(&items)?);

    Ok(())
}

fn run_init(config: &Config, settings: Option<PathBuf>) -> Result<()> {
    std::fs::create_dir_all(&config.scripts_dir).with_context(|| {
        format!(
            "Failed to create scripts directory {}",
            config.scripts_dir.display()
        )
    })?;

    let store = FilePositionStore::new(config.state_path());
    store.ensure_dir()?;

    let rules_path = config.rules_path();
    if rules::bootstrap_rules_file(&rules_path)? {
        info!("Created rules template {}", rules_path.display());
    }

    let settings_path = match settings {
        Some(p) => p,
        None => Config::config_path()?,
    };
    if !settings_path.exists() {
        config.save(&settings_path)?;
        info!("Wrote settings {}", settings_path.display());
    }

    println!("scripts:  {}", config.scripts_dir.display());
    println!("rules:    {}", rules_path.display());
    println!("state:    {}", store.dir().display());
    println!("settings: {}", settings_path.display());

    Ok(())
}

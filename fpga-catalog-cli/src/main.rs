//! fpga-catalog CLI
//!
//! Adds, checks and installs core catalogs for FPGA gaming platforms.

mod commands;
mod error;
mod prompt;
mod spinner;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fpga_catalog_core::{Overrides, Settings};

use commands::Context;
pub(crate) use error::CliError;

#[derive(Parser)]
#[command(name = "fpga-catalog")]
#[command(about = "Manage core catalogs and their downloads", long_about = None)]
struct Cli {
    /// Catalog database path (overrides config and environment)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory cores, systems and releases are downloaded under
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Hide progress spinners
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a catalog and add it to the database
    Add {
        /// Catalog URL; https:// is assumed when no scheme is given
        url: String,

        /// Lower values are listed and checked first
        #[arg(short, long, default_value_t = 0)]
        priority: i64,
    },

    /// List installed catalogs
    List {
        /// Also list registered cores and systems
        #[arg(short, long)]
        detailed: bool,
    },

    /// Check catalogs for newer versions
    Check {
        /// Unique name of a single catalog to check
        catalog: Option<String>,
    },

    /// Show pending updates found by `check`
    Updates {
        /// Unique name of a single catalog
        catalog: Option<String>,
    },

    /// Download cores and systems of an installed catalog
    Install {
        /// Unique name of the catalog
        catalog: String,

        /// Cores or systems to install (default: all)
        #[arg(value_delimiter = ',')]
        names: Vec<String>,
    },

    /// Apply the pending update of a catalog
    Update {
        /// Unique name of the catalog
        catalog: String,

        /// Cores or systems to update (default: all)
        #[arg(value_delimiter = ',')]
        names: Vec<String>,
    },

    /// Download a newer signed platform release
    Upgrade {
        /// Unique name of the catalog publishing the release
        catalog: String,

        /// Release name within the catalog
        #[arg(short, long, default_value = "1fpga")]
        name: String,

        /// Version currently running
        #[arg(long)]
        running_version: String,
    },

    /// Show or locate settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show resolved settings and their sources
    Show,

    /// Print the config file path
    Path,
}

/// Log an empty line at info level.
pub(crate) fn log_blank() {
    log::info!("");
}

fn init_logger(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level, record.args()),
        })
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Config {
        action: ConfigAction::Path,
    } = cli.command
    {
        commands::config::run_config_path();
        return Ok(());
    }

    let settings = Settings::load(Overrides {
        database: cli.db,
        root: cli.root,
    })
    .map_err(|e| CliError::config(e.to_string()))?;
    let ctx = Context::new(settings, cli.quiet);

    match cli.command {
        Commands::Add { url, priority } => commands::add::run_add(&ctx, &url, priority),
        Commands::List { detailed } => commands::list::run_list(&ctx, detailed),
        Commands::Check { catalog } => commands::check::run_check(&ctx, catalog),
        Commands::Updates { catalog } => commands::updates::run_updates(&ctx, catalog),
        Commands::Install { catalog, names } => {
            commands::install::run_install(&ctx, &catalog, names)
        }
        Commands::Update { catalog, names } => commands::install::run_update(&ctx, &catalog, names),
        Commands::Upgrade {
            catalog,
            name,
            running_version,
        } => commands::upgrade::run_upgrade(&ctx, &catalog, &name, &running_version),
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => commands::config::run_config_show(&ctx),
                ConfigAction::Path => commands::config::run_config_path(),
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn install_names_split_on_commas() {
        let cli = Cli::parse_from(["fpga-catalog", "install", "cores", "nes,snes", "--db", "x.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
        match cli.command {
            Commands::Install { catalog, names } => {
                assert_eq!(catalog, "cores");
                assert_eq!(names, ["nes", "snes"]);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn upgrade_defaults_to_platform_release() {
        let cli = Cli::parse_from(["fpga-catalog", "upgrade", "main", "--running-version", "0.1.0"]);
        match cli.command {
            Commands::Upgrade { name, running_version, .. } => {
                assert_eq!(name, "1fpga");
                assert_eq!(running_version, "0.1.0");
            }
            _ => panic!("expected upgrade"),
        }
    }
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ccswitch::{
    commands,
    manager::Manager,
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "ccswitch")]
#[command(about = "Claude Code Settings Switcher - save, activate, and back up settings profiles")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored settings and their status
    List,

    /// Show the active settings name and the state of settings.json
    Current,

    /// Activate stored settings (interactive selection when no name given)
    Use {
        /// Name of the settings to activate
        name: Option<String>,
    },

    /// Save the current settings.json under a name and activate it
    Save {
        /// Destination name (interactive selection when omitted)
        name: Option<String>,

        /// Overwrite an existing entry without asking
        #[arg(long)]
        yes: bool,
    },

    /// Remove backups not used within a retention window
    PruneBackups {
        /// Retention window, e.g. 30d, 12h, 1d12h
        #[arg(long, value_name = "DURATION")]
        older_than: Option<String>,

        /// Do not prompt for confirmation
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let paths = Paths::new()?;
    let mgr = Manager::new(paths);
    let ui = Ui::new(cli.color, cli.no_color);

    match cli.command {
        Commands::List => commands::list(&mgr, &ui),
        Commands::Current => commands::current(&mgr, &ui),
        Commands::Use { name } => commands::use_profile(&mgr, &ui, name.as_deref()),
        Commands::Save { name, yes } => commands::save(&mgr, &ui, name.as_deref(), yes),
        Commands::PruneBackups { older_than, force } => {
            commands::prune_backups(&mgr, &ui, older_than.as_deref(), force)
        }
    }
}

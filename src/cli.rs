use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "fleetseek",
    about = "Keyword search over managed endpoints, with hunt-id lookup"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage stored client records
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Manage known hunts
    Hunt {
        #[command(subcommand)]
        action: HuntAction,
    },
    /// Search clients, or open a hunt by id
    Search(SearchArgs),
    /// Complete a label for the search box
    Complete(CompleteArgs),
    /// Show or change runtime settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show system status and statistics
    Status(StatusArgs),
    /// Start MCP server for AI agent integration
    Mcp,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Client subcommands --

#[derive(Debug, Subcommand)]
pub enum ClientAction {
    /// Import client records from a JSON Lines snapshot
    Import {
        /// Path to the snapshot file
        path: PathBuf,
    },
    /// List stored clients
    List {
        /// Only clients whose id or hostname matches this glob
        #[arg(long)]
        glob: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a stored client
    Remove {
        /// Client id
        client_id: String,
    },
}

// -- Hunt subcommands --

#[derive(Debug, Subcommand)]
pub enum HuntAction {
    /// Register a hunt id
    Add {
        /// Hunt id (e.g. H:1A2B3C4D)
        hunt_id: String,
        /// Free-text description
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Forget a hunt id
    Remove {
        /// Hunt id
        hunt_id: String,
    },
    /// List known hunts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// -- Config subcommands --

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print a setting
    Get {
        /// Setting name
        key: String,
    },
    /// Store a setting
    Set {
        /// Setting name (e.g. registry_policy)
        key: String,
        /// New value
        value: String,
    },
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query (empty lists every client)
    #[arg(default_value = "")]
    pub query: String,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Complete --

#[derive(Debug, Parser)]
pub struct CompleteArgs {
    /// Partial search box input
    pub prefix: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "fleetseek",
            &mut std::io::stdout(),
        );
    }
}

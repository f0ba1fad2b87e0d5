use clap::{Parser, Subcommand};

/// `lidwake` keeps the machine awake with the lid open and with the lid closed.
#[derive(Parser, Debug)]
#[command(name = "lidwake")]
#[command(version)]
#[command(about = "Keep the machine awake with the lid open or closed.", long_about = None)]
pub struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enable Full Awake and hold it until interrupted
    Run,

    /// Show setup state, pending restore and preferences
    Status,

    /// Register the privileged helper and wait until it is reachable
    Setup {
        /// Open the approval settings if an administrator still has to approve the helper
        #[arg(long)]
        approve: bool,
    },

    /// Put back sleep settings left behind by an interrupted session
    Restore,

    /// Manage starting at login
    LoginItem {
        #[command(subcommand)]
        login_item_command: LoginItemCommands,
    },

    /// Run the privileged helper server (started by the service manager)
    #[command(hide = true)]
    Helper,
}

/// Login item subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginItemCommands {
    /// Start lidwake at login
    Enable,
    /// Stop starting lidwake at login
    Disable,
    /// Show whether lidwake starts at login
    Status,
}

pub mod bsa;
pub mod esm;
pub mod scripts;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle plugin files (esm, esp, omwaddon)
    Esm {
        #[command(subcommand)]
        command: esm::EsmCommands,
    },
    /// Handle omwscripts files
    Scripts {
        #[command(subcommand)]
        command: scripts::ScriptsCommands,
    },
    /// Handle BSA archives
    Bsa {
        #[command(subcommand)]
        command: bsa::BsaCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Esm { command } => command.handle(),
            Commands::Scripts { command } => command.handle(),
            Commands::Bsa { command } => command.handle(),
        }
    }
}

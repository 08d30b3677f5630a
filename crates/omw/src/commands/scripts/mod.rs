pub mod extract;
pub mod pack;

#[derive(clap::Subcommand)]
pub enum ScriptsCommands {
    /// Pack an omwscripts file into a plugin
    Pack(pack::PackArgs),
    /// Extract the scripts of a plugin as omwscripts
    Extract(extract::ExtractArgs),
}

impl ScriptsCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            ScriptsCommands::Pack(pack) => pack.handle(),
            ScriptsCommands::Extract(extract) => extract.handle(),
        }
    }
}

pub mod extract;
pub mod list;

#[derive(clap::Subcommand)]
pub enum BsaCommands {
    /// Extract a BSA archive into a directory
    Extract(extract::ExtractArgs),
    /// List the files in a BSA archive
    List(list::ListArgs),
}

impl BsaCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            BsaCommands::Extract(extract) => extract.handle(),
            BsaCommands::List(list) => list.handle(),
        }
    }
}

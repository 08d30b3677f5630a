use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use std::{fs, path::PathBuf};
use tes3_esm::{omwscripts, read_plugin_file, tag, Subrecord};
use tracing::{info, warn};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input plugin
    #[arg(short, long, value_name = "PLUGIN")]
    file: PathBuf,

    /// A target omwscripts file, stdout if not given
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let records = read_plugin_file(&self.file)?;

        let subrecords: Vec<Subrecord> = records
            .iter()
            .filter(|record| record.tag == tag::LUAL)
            .flat_map(|record| record.subrecords.iter().cloned())
            .collect();
        if subrecords.is_empty() {
            warn!("{} has no lua scripts", self.file.display());
        }

        let content = omwscripts::extract(&subrecords)?;
        match &self.output {
            Some(path) => {
                info!("writing {}", path.display());
                fs::write(path, content)
                    .into_diagnostic()
                    .context(format!("path: {}", path.display()))?;
            }
            None => print!("{}", content),
        }
        Ok(())
    }
}

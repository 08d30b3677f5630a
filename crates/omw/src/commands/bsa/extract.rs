use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::BufReader,
    path::{Component, Path, PathBuf},
};
use tes3_bsa::BsaArchive;
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input BSA file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

/// Resolve an archive name below `directory`, refusing names that would leave it
fn target_path(directory: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(miette!("refusing to extract {} outside of the target", name));
    }
    Ok(directory.join(relative))
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let f = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let mut bsa = BsaArchive::new(BufReader::new(f))?;

        for i in 0..bsa.len() {
            let mut entry = bsa.by_index(i)?;

            let p = target_path(&self.directory, entry.name())?;
            info!("writing {}", p.display());

            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)
                    .into_diagnostic()
                    .context(format!("creating {}", parent.display()))?;
            }
            let mut out = if !self.overwrite {
                File::create_new(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            } else {
                File::create(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            };

            std::io::copy(&mut entry, &mut out).into_diagnostic()?;
        }
        Ok(())
    }
}

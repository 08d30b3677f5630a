use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::{fs, io::Cursor, path::PathBuf};
use tes3_esm::{read_plugin_data, write_records};
use tracing::{error, info};
use walkdir::WalkDir;

use super::is_plugin;

#[derive(Args)]
pub struct VerifyArgs {
    /// A directory to search for plugins
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,
}

/// Read `data` and write it back, returning the offset of the first differing byte
fn round_trip(name: &str, data: &[u8]) -> Result<Option<usize>> {
    let records = read_plugin_data(name, Cursor::new(data))?;

    let mut written = Vec::with_capacity(data.len());
    write_records(&mut written, &records)?;

    if written == data {
        return Ok(None);
    }
    Ok(Some(
        written
            .iter()
            .zip(data)
            .position(|(a, b)| a != b)
            .unwrap_or(written.len().min(data.len())),
    ))
}

impl VerifyArgs {
    pub fn handle(&self) -> Result<()> {
        let plugins = WalkDir::new(&self.directory)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_plugin(e.path()))
            .collect::<Vec<_>>();

        if plugins.is_empty() {
            return Err(miette!("no plugins in {}", self.directory.display()));
        }

        let mut failed = 0;
        for plugin in &plugins {
            let path = plugin.path();
            info!("verifying {}", path.display());

            let data = fs::read(path)
                .into_diagnostic()
                .context(format!("path: {}", path.display()))?;
            let name = plugin.file_name().to_string_lossy().to_lowercase();

            match round_trip(&name, &data) {
                Ok(None) => println!("{} {}", "ok".green(), path.display()),
                Ok(Some(offset)) => {
                    failed += 1;
                    println!(
                        "{} {} differs at byte {:#x}",
                        "mismatch".red(),
                        path.display(),
                        offset
                    );
                }
                Err(e) => {
                    failed += 1;
                    error!("{:?}", e);
                    println!("{} {}", "unreadable".red(), path.display());
                }
            }
        }

        if failed > 0 {
            return Err(miette!(
                "{} of {} plugins did not round trip",
                failed,
                plugins.len()
            ));
        }
        Ok(())
    }
}

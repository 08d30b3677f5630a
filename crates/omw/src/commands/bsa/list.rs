use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::{fs::File, io::BufReader, path::PathBuf};
use tes3_bsa::BsaArchive;

#[derive(Args)]
pub struct ListArgs {
    /// An input BSA file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let f = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let mut bsa = BsaArchive::new(BufReader::new(f))?;

        println!(
            "{:>10} {:>10} {}",
            "size".bold(),
            "offset".bold(),
            "name".bold()
        );
        for i in 0..bsa.len() {
            let entry = bsa.by_index(i)?;
            println!("{:>10} {:>10} {}", entry.size(), entry.data_start(), entry.name());
        }
        println!("{} files, {} bytes", bsa.len(), bsa.total_size());

        Ok(())
    }
}

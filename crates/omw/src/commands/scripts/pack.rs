use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use std::{fs, path::PathBuf};
use tes3_esm::{
    header::Tes3, omwscripts, read_plugin_file, tag, write_plugin_file, Record, Subrecord,
};
use tracing::{debug, info};

/// Description written into plugins created from scratch
const GENERATED_DESCRIPTION: &str = "Generated by omw";

#[derive(Args)]
pub struct PackArgs {
    /// An input omwscripts file
    #[arg(short, long, value_name = "SCRIPTS")]
    file: PathBuf,

    /// The plugin to write, updated in place if it exists
    #[arg(short, long, value_name = "PLUGIN")]
    output: PathBuf,
}

/// Replace the scripts of the first `LUAL` record, adding one if there is none
fn replace_scripts(records: &mut Vec<Record>, scripts: Vec<Subrecord>) {
    match records.iter_mut().find(|record| record.tag == tag::LUAL) {
        Some(record) => {
            record.retain(|subrecord| subrecord.tag != tag::LUAS && subrecord.tag != tag::LUAF);
            scripts.into_iter().for_each(|s| record.push(s));
        }
        None => records.push(Record::with_subrecords(tag::LUAL, 0, scripts)),
    }
}

/// Make the header count every record after it
fn refresh_header(records: &mut [Record]) -> Result<()> {
    let count = records.len().saturating_sub(1) as u32;
    let Some(first) = records.first_mut() else {
        return Ok(());
    };

    let mut header = Tes3::from_record(first).context("reading plugin header")?;
    header.header.num_records = count;
    *first = header.to_record()?;
    Ok(())
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        let content = fs::read_to_string(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let scripts = omwscripts::package(&content)
            .context(format!("packaging {}", &self.file.display()))?;
        debug!("packaged {} scripts", scripts.len() / 2);

        let mut records = if self.output.exists() {
            let mut backup = self.output.clone().into_os_string();
            backup.push(".bak");
            info!("backing up {} to {:?}", self.output.display(), backup);
            fs::copy(&self.output, &backup)
                .into_diagnostic()
                .context(format!("creating backup of {}", &self.output.display()))?;

            read_plugin_file(&self.output)?
        } else {
            info!("creating {}", self.output.display());
            vec![Tes3::new("", GENERATED_DESCRIPTION).to_record()?]
        };

        replace_scripts(&mut records, scripts);
        refresh_header(&mut records)?;

        write_plugin_file(&self.output, &records)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scripts(path: &str) -> Result<Vec<Subrecord>> {
        Ok(omwscripts::package(&format!("PLAYER: {}", path))?)
    }

    #[test]
    fn new_plugin() -> Result<()> {
        let mut records = vec![Tes3::new("", GENERATED_DESCRIPTION).to_record()?];
        replace_scripts(&mut records, scripts("scripts/a.lua")?);
        refresh_header(&mut records)?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tag, tag::LUAL);
        assert_eq!(records[1].subrecords.len(), 2);

        let header = Tes3::from_record(&records[0])?;
        assert_eq!(header.header.num_records, 1);
        assert_eq!(header.header.description, GENERATED_DESCRIPTION);

        Ok(())
    }

    #[test]
    fn existing_scripts_are_replaced() -> Result<()> {
        let kept = Subrecord::new(tag::LUAD, vec![1, 2, 3]);
        let mut lual = Record::with_subrecords(tag::LUAL, 0, scripts("scripts/old.lua")?);
        lual.push(kept.clone());

        let mut records = vec![
            Tes3::new("", "").to_record()?,
            Record::new(tag::CELL),
            lual,
        ];
        let new = scripts("scripts/new.lua")?;
        replace_scripts(&mut records, new.clone());
        refresh_header(&mut records)?;

        let mut expected = vec![kept];
        expected.extend(new);
        assert_eq!(records[2].subrecords, expected);
        assert_eq!(Tes3::from_record(&records[0])?.header.num_records, 2);

        Ok(())
    }
}

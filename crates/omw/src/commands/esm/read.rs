use clap::Args;
use miette::{miette, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tes3_esm::{cell::Cell, header::Tes3, land::Land, tag, Record, Tag};

use super::{hex_dump, load_plugins, record_key};

/// A subrecord that must be present with a payload containing `value`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    tag: Tag,
    value: Vec<u8>,
}

impl FieldFilter {
    fn matches(&self, record: &Record) -> bool {
        record.subrecords_by_tag(self.tag).any(|subrecord| {
            self.value.is_empty()
                || subrecord
                    .data
                    .windows(self.value.len())
                    .any(|window| window == self.value.as_slice())
        })
    }
}

fn parse_hex(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {}", hex));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex value {}", hex))
        })
        .collect()
}

/// Parse `TAG=VALUE`, where a VALUE starting with `0x` is hex
fn parse_field_filter(arg: &str) -> Result<FieldFilter, String> {
    let (tag, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=VALUE, got {}", arg))?;
    let tag = tag.parse::<Tag>().map_err(|e| e.to_string())?;
    let value = match value.strip_prefix("0x") {
        Some(hex) => parse_hex(hex)?,
        None => value.as_bytes().to_vec(),
    };
    Ok(FieldFilter { tag, value })
}

#[derive(Args)]
pub struct ReadArgs {
    /// An input plugin or openmw.cfg
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Only show records of this type
    #[arg(short, long = "record", value_name = "TAG")]
    records: Vec<Tag>,

    /// Only show subrecords of this type
    #[arg(short, long = "subrecord", value_name = "TAG")]
    subrecords: Vec<Tag>,

    /// Only show records with a subrecord containing a value, e.g. NAME=fargoth or DATA=0x0a00
    #[arg(long = "field", value_name = "TAG=VALUE", value_parser = parse_field_filter)]
    fields: Vec<FieldFilter>,

    /// Print known records as JSON
    #[arg(long, default_value_t = false)]
    decode: bool,
}

impl ReadArgs {
    fn wanted(&self, record: &Record) -> bool {
        (self.records.is_empty() || self.records.contains(&record.tag))
            && self.fields.iter().all(|filter| filter.matches(record))
    }

    fn decode_record(&self, record: &Record) -> Result<Option<String>> {
        let json = match record.tag {
            tag::TES3 => serde_json::to_string_pretty(&Tes3::from_record(record)?),
            tag::CELL => serde_json::to_string_pretty(&Cell::from_record(record)?),
            tag::LAND => serde_json::to_string_pretty(&Land::from_record(record)?),
            _ => return Ok(None),
        };
        json.into_diagnostic().map(Some)
    }

    fn print_record(&self, record: &Record) -> Result<()> {
        println!(
            "{} {} flags {:#010x} at {:#x}",
            record.tag.bold().blue(),
            record_key(record),
            record.flags,
            record.plugin_offset
        );

        if self.decode {
            if let Some(json) = self.decode_record(record)? {
                println!("{}", json);
                return Ok(());
            }
        }

        for subrecord in &record.subrecords {
            if !self.subrecords.is_empty() && !self.subrecords.contains(&subrecord.tag) {
                continue;
            }
            println!("  {} {} bytes", subrecord.tag.green(), subrecord.data.len());
            for line in hex_dump(&subrecord.data) {
                println!("    {}", line.dimmed());
            }
        }
        Ok(())
    }

    pub fn handle(&self) -> Result<()> {
        let plugins = load_plugins(&self.file)?;
        if plugins.is_empty() {
            return Err(miette!("no plugins in {}", self.file.display()));
        }

        for (path, records) in plugins {
            println!("{}", path.display().underline());
            for record in records.iter().filter(|record| self.wanted(record)) {
                self.print_record(record)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tes3_esm::Subrecord;

    use super::*;

    #[test]
    fn field_filters() -> Result<(), String> {
        assert_eq!(
            parse_field_filter("NAME=fargoth")?,
            FieldFilter {
                tag: tag::NAME,
                value: b"fargoth".to_vec()
            }
        );
        assert_eq!(parse_field_filter("DATA=0x0aFF")?.value, vec![0x0A, 0xFF]);
        assert!(parse_field_filter("DATA=0x0a0").is_err());
        assert!(parse_field_filter("NAME").is_err());
        assert!(parse_field_filter("NAMES=x").is_err());

        Ok(())
    }

    #[test]
    fn field_filter_matches_payload() -> Result<(), String> {
        let record = Record::with_subrecords(
            tag::CELL,
            0,
            vec![Subrecord::new(tag::NAME, b"Balmora, Council Club\0".to_vec())],
        );
        assert!(parse_field_filter("NAME=Council")?.matches(&record));
        assert!(parse_field_filter("NAME=")?.matches(&record));
        assert!(!parse_field_filter("NAME=Vivec")?.matches(&record));
        assert!(!parse_field_filter("RGNN=Council")?.matches(&record));

        Ok(())
    }
}

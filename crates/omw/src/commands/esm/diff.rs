use clap::{Args, ValueEnum};
use itertools::Itertools;
use miette::{miette, Context, Result};
use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt::Display,
    path::PathBuf,
};
use tes3_esm::{read_plugin_file, Record, Subrecord};

use super::{hex_dump, record_key};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    #[default]
    Symantic,
    Full,
}

#[derive(Debug, Eq, PartialEq)]
enum Change {
    Added(String, String),
    Removed(String, String),
    Comparison(String, String, String),
    Context(Vec<String>),
    Modified(String, String, Vec<Change>, Vec<Change>),
}

impl Change {
    fn modified(section: &str, name: &str) -> Self {
        Change::Modified(section.into(), name.into(), Vec::new(), Vec::new())
    }

    pub fn with_children(&mut self, children: Vec<Change>) -> Result<()> {
        match self {
            Change::Modified(_, _, vec, _) => {
                vec.extend(children);
                vec.sort();
                Ok(())
            }
            _ => Err(miette!("tried to add children to an addition or removal")),
        }
    }

    pub fn with_related(&mut self, related: Vec<Change>) -> Result<()> {
        match self {
            Change::Modified(_, _, _, vec) => {
                vec.extend(related);
                Ok(())
            }
            _ => Err(miette!("tried to add related to an addition or removal")),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Change::Added(..) => 0,
            Change::Removed(..) => 1,
            Change::Modified(..) => 2,
            Change::Comparison(..) => 3,
            Change::Context(_) => 4,
        }
    }

    fn key(&self) -> Option<(&str, &str)> {
        match self {
            Change::Added(section, name)
            | Change::Removed(section, name)
            | Change::Comparison(section, name, _)
            | Change::Modified(section, name, _, _) => Some((section.as_str(), name.as_str())),
            Change::Context(_) => None,
        }
    }
}

impl Ord for Change {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.key().cmp(&other.key()))
    }
}

impl PartialOrd for Change {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Added(_, v) => {
                writeln!(f, "✅ {}", v.green())
            }
            Change::Removed(_, v) => {
                writeln!(f, "❌ {}", v.red())
            }
            Change::Comparison(key, old, new) => {
                writeln!(f, "* {}: {} vs {}", key, old.red(), new.green())
            }
            Change::Context(values) => {
                writeln!(f, "{}", values.iter().map(|l| format!(" {}", l)).join("\n"))
            }
            Change::Modified(_, v, children, related) => {
                let mut txt_final = related.iter().map(|c| format!("{}", c)).join("");

                let mut section = String::new();
                let mut current_key = String::new();
                for c in children {
                    let key = match c {
                        Change::Added(key, _) => format!("* {} added:\n", key),
                        Change::Removed(key, _) => format!("* {} removed:\n", key),
                        Change::Modified(key, _, _, _) => format!("* {} modified:\n", key),
                        _ => current_key.clone(),
                    };

                    if current_key != key {
                        if !section.is_empty() {
                            txt_final.push_str(
                                &section.split('\n').map(|l| "  ".to_string() + l).join("\n"),
                            );
                            txt_final.push('\n');
                        }
                        section.clear();

                        txt_final.push_str(&key);
                        current_key = key
                    }

                    section.push_str(&format!("{}\n", c));
                }

                txt_final.push_str(&section.split('\n').map(|l| "  ".to_string() + l).join("\n"));

                writeln!(f, "🔃 {}", v.blue())?;
                writeln!(
                    f,
                    "{}",
                    txt_final
                        .split('\n')
                        .filter(|l| l.trim().len() > 1)
                        .map(|l| "  ".to_string() + l)
                        .join("\n")
                )
            }
        }
    }
}

/// Key every item, numbering repeated keys in order of appearance
fn keyed<'a, T>(items: &'a [T], key: impl Fn(&T) -> String) -> BTreeMap<String, &'a T> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    items
        .iter()
        .map(|item| {
            let base = key(item);
            let count = seen.entry(base.clone()).or_default();
            let name = if *count == 0 {
                base
            } else {
                format!("{} #{}", base, count)
            };
            *count += 1;
            (name, item)
        })
        .collect()
}

#[derive(Args)]
pub struct DiffArgs {
    /// An input plugin
    #[arg(short, long, value_name = "FILE")]
    left: PathBuf,

    /// An input plugin
    #[arg(short, long, value_name = "FILE")]
    right: PathBuf,

    /// Comparison mode
    #[arg(short, long, value_enum, default_value_t=Mode::Symantic)]
    mode: Mode,
}

impl DiffArgs {
    fn inline_hex(&self, left: &[u8], right: &[u8]) -> Vec<String> {
        let old = hex_dump(left).join("\n");
        let new = hex_dump(right).join("\n");

        let diff = TextDiff::from_lines(&old, &new);
        let mut comparison = Vec::new();
        for op in diff.ops().iter() {
            for change in diff.iter_inline_changes(op) {
                let mut context = match change.tag() {
                    ChangeTag::Insert => format!("{} ", "+".green()),
                    ChangeTag::Delete => format!("{} ", "-".red()),
                    ChangeTag::Equal => "  ".to_string(),
                };
                for (emphasized, value) in change.iter_strings_lossy() {
                    let value = value.trim_end_matches('\n');
                    if emphasized {
                        if change.tag() == ChangeTag::Insert {
                            context.push_str(&format!("{}", value.green().underline()));
                        } else {
                            context.push_str(&format!("{}", value.red().underline()));
                        }
                    } else {
                        context.push_str(&format!("{}", value.dimmed()));
                    }
                }
                comparison.push(context);
            }
        }
        comparison
    }

    fn handle_subrecords(&self, left: &[Subrecord], right: &[Subrecord]) -> Vec<Change> {
        let left = keyed(left, |s| s.tag.to_string());
        let right = keyed(right, |s| s.tag.to_string());
        let mut result = Vec::new();

        right
            .keys()
            .filter(|k| !left.contains_key(k.as_str()))
            .map(|k| Change::Added("subrecords".into(), k.to_string()))
            .for_each(|c| result.push(c));

        left.keys()
            .filter(|k| !right.contains_key(k.as_str()))
            .map(|k| Change::Removed("subrecords".into(), k.to_string()))
            .for_each(|c| result.push(c));

        for (key, old) in &left {
            let Some(new) = right.get(key) else {
                continue;
            };
            if old.data == new.data {
                continue;
            }

            let mut related = Vec::new();
            if old.data.len() != new.data.len() {
                related.push(Change::Comparison(
                    "size".into(),
                    old.data.len().to_string(),
                    new.data.len().to_string(),
                ));
            }
            if self.mode == Mode::Full {
                related.push(Change::Context(self.inline_hex(&old.data, &new.data)));
            }
            result.push(Change::Modified(
                "subrecords".into(),
                key.clone(),
                Vec::new(),
                related,
            ));
        }

        result
    }

    fn handle_record(&self, key: &str, left: &Record, right: &Record) -> Result<Option<Change>> {
        if left == right {
            return Ok(None);
        }

        let mut result = Change::modified("records", key);
        if left.flags != right.flags {
            result.with_related(vec![Change::Comparison(
                "flags".into(),
                format!("{:#x}", left.flags),
                format!("{:#x}", right.flags),
            )])?;
        }
        if left.subrecords.len() != right.subrecords.len() {
            result.with_related(vec![Change::Comparison(
                "subrecords".into(),
                left.subrecords.len().to_string(),
                right.subrecords.len().to_string(),
            )])?;
        }
        result.with_children(self.handle_subrecords(&left.subrecords, &right.subrecords))?;

        Ok(Some(result))
    }

    fn handle_plugin(&self, name: &str, left: &[Record], right: &[Record]) -> Result<Option<Change>> {
        let mut result: Option<Change> = None;

        if left.len() != right.len() {
            result
                .get_or_insert(Change::modified("plugin", name))
                .with_related(vec![Change::Comparison(
                    "records".into(),
                    left.len().to_string(),
                    right.len().to_string(),
                )])?;
        }

        let left = keyed(left, record_key);
        let right = keyed(right, record_key);

        let added: Vec<Change> = right
            .keys()
            .filter(|k| !left.contains_key(k.as_str()))
            .map(|k| Change::Added("records".into(), k.to_string()))
            .collect();
        if !added.is_empty() {
            result
                .get_or_insert(Change::modified("plugin", name))
                .with_children(added)?;
        }

        let removed: Vec<Change> = left
            .keys()
            .filter(|k| !right.contains_key(k.as_str()))
            .map(|k| Change::Removed("records".into(), k.to_string()))
            .collect();
        if !removed.is_empty() {
            result
                .get_or_insert(Change::modified("plugin", name))
                .with_children(removed)?;
        }

        for (key, old) in &left {
            let Some(new) = right.get(key) else {
                continue;
            };
            if let Some(c) = self.handle_record(key, old, new)? {
                result
                    .get_or_insert(Change::modified("plugin", name))
                    .with_children(vec![c])?;
            }
        }

        Ok(result)
    }

    pub fn handle(&self) -> Result<()> {
        let left = read_plugin_file(&self.left)
            .with_context(|| format!("path: {}", &self.left.display()))?;
        let right = read_plugin_file(&self.right)
            .with_context(|| format!("path: {}", &self.right.display()))?;

        let difference = self.handle_plugin(&self.left.to_string_lossy(), &left, &right)?;

        if let Some(d) = difference {
            println!("{}", d);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tes3_esm::tag;

    use super::*;

    fn named(tag: tes3_esm::Tag, name: &str, data: &[u8]) -> Record {
        let mut name = name.as_bytes().to_vec();
        name.push(0);
        Record::with_subrecords(
            tag,
            0,
            vec![
                Subrecord::new(tag::NAME, name),
                Subrecord::new(tag::DATA, data.to_vec()),
            ],
        )
    }

    fn args() -> DiffArgs {
        DiffArgs {
            left: PathBuf::from("left.esp"),
            right: PathBuf::from("right.esp"),
            mode: Mode::Symantic,
        }
    }

    #[test]
    fn identical_plugins() -> Result<()> {
        let records = vec![named(tag::CELL, "Balmora", &[1])];
        assert_eq!(args().handle_plugin("left.esp", &records, &records)?, None);

        Ok(())
    }

    #[test]
    fn record_changes() -> Result<()> {
        let left = vec![
            named(tag::CELL, "Balmora", &[1]),
            named(tag::CELL, "Vivec", &[2]),
        ];
        let mut changed = named(tag::CELL, "Balmora", &[1, 2]);
        changed.flags = 0x400;
        let right = vec![changed, named(tag::CELL, "Ald'ruhn", &[3])];

        let Some(Change::Modified(_, _, children, related)) =
            args().handle_plugin("left.esp", &left, &right)?
        else {
            return Err(miette!("expected a modification"));
        };

        assert!(related.is_empty());
        assert_eq!(
            children,
            vec![
                Change::Added("records".into(), "CELL Ald'ruhn".into()),
                Change::Removed("records".into(), "CELL Vivec".into()),
                Change::Modified(
                    "records".into(),
                    "CELL Balmora".into(),
                    vec![Change::Modified(
                        "subrecords".into(),
                        "DATA".into(),
                        vec![],
                        vec![Change::Comparison("size".into(), "1".into(), "2".into())]
                    )],
                    vec![Change::Comparison(
                        "flags".into(),
                        "0x0".into(),
                        "0x400".into()
                    )]
                ),
            ]
        );

        Ok(())
    }

    #[test]
    fn repeated_keys_are_numbered() {
        let subrecords = vec![
            Subrecord::new(tag::FRMR, vec![1]),
            Subrecord::new(tag::NAME, vec![2]),
            Subrecord::new(tag::FRMR, vec![3]),
        ];
        let keys: Vec<_> = keyed(&subrecords, |s| s.tag.to_string())
            .into_keys()
            .collect();
        assert_eq!(keys, vec!["FRMR", "FRMR #1", "NAME"]);
    }
}

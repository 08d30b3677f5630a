//! Reading whole plugins

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};
use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    record::Record,
};

/// Iterator over the records of a plugin stream
///
/// Every record is stamped with the plugin name and the offset of its header. Iteration ends at a
/// clean end of stream, or right after the first error is yielded.
///
/// ```
/// use std::io::Cursor;
/// use tes3_esm::{read::RecordReader, record::Record, tag};
///
/// let mut data = Vec::new();
/// Record::new(tag::LUAL).write(&mut data)?;
///
/// let records = RecordReader::new("test.omwaddon", Cursor::new(data))
///     .collect::<tes3_esm::error::Result<Vec<_>>>()?;
/// assert_eq!(records[0].plugin_name.as_deref(), Some("test.omwaddon"));
/// # Ok::<(), tes3_esm::error::Error>(())
/// ```
pub struct RecordReader<R> {
    reader: R,
    plugin_name: String,
    offset: u64,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(plugin_name: impl Into<String>, reader: R) -> Self {
        RecordReader {
            reader,
            plugin_name: plugin_name.into(),
            offset: 0,
            done: false,
        }
    }

    /// Byte offset of the next record header
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match Record::read(&mut self.reader) {
            Ok(Some(mut record)) => {
                record.plugin_name = Some(self.plugin_name.clone());
                record.plugin_offset = self.offset;
                self.offset += record.serialized_size() as u64;
                Some(Ok(record))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Read every record of a plugin from a stream
pub fn read_plugin_data<R: Read>(plugin_name: &str, reader: R) -> Result<Vec<Record>> {
    let records = RecordReader::new(plugin_name, reader).collect::<Result<Vec<_>>>()?;
    debug!("read {} records from {}", records.len(), plugin_name);
    Ok(records)
}

/// Read every record of a plugin file.
///
/// The records carry the lowercase file name as their plugin name.
#[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
pub fn read_plugin_file<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let plugin_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .ok_or_else(|| Error::CustomError(format!("{} is not a file", path.display())))?;

    let file = File::open(path)?;
    read_plugin_data(&plugin_name, BufReader::new(file))
}

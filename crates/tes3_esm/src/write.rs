//! Writing whole plugins

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use tracing::{debug, instrument};

use crate::{error::Result, record::Record};

/// Write `records` in order
pub fn write_records<'a, W, I>(mut writer: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Record>,
{
    let mut count = 0;
    for record in records {
        record.write(&mut writer)?;
        count += 1;
    }
    writer.flush()?;
    debug!("wrote {} records", count);
    Ok(())
}

/// Create or truncate the file at `path` and write `records` to it
#[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
pub fn write_plugin_file<P: AsRef<Path>>(path: P, records: &[Record]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_records(BufWriter::new(file), records)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use super::*;
    use crate::{read::read_plugin_data, subrecord::Subrecord, tag};

    #[test]
    fn records_round_trip() -> Result<()> {
        let records = vec![
            Record::with_subrecords(
                tag::CELL,
                0x400,
                vec![Subrecord::new(tag::NAME, b"Balmora\0".to_vec())],
            ),
            Record::new(tag::LUAL),
        ];

        let mut data = Vec::new();
        write_records(&mut data, &records)?;
        assert_eq!(data.len(), records.iter().map(Record::serialized_size).sum::<usize>());
        assert_eq!(read_plugin_data("x.esp", Cursor::new(data))?, records);

        Ok(())
    }
}

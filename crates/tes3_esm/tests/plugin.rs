use std::io::Cursor;

use pretty_assertions::assert_eq;
use tes3_esm::{
    error::{Error, Result},
    field::Field,
    header::{FileHeader, Tes3, HEADER_SIZE},
    lua::{LuaAttachment, LuaScriptPath},
    omwscripts,
    read::{read_plugin_data, read_plugin_file, RecordReader},
    record::Record,
    subrecord::Subrecord,
    tag,
    write::{write_plugin_file, write_records},
};
use tracing_test::traced_test;

fn lua_plugin() -> Result<Vec<u8>> {
    let mut hedr = vec![0u8; HEADER_SIZE];
    hedr[0..4].copy_from_slice(&1.3f32.to_le_bytes());
    hedr[296..300].copy_from_slice(&1u32.to_le_bytes());

    let records = vec![
        Record::with_subrecords(tag::TES3, 0, vec![Subrecord::new(tag::HEDR, hedr)]),
        Record::with_subrecords(
            tag::LUAL,
            0,
            vec![
                LuaScriptPath::new("scripts/foo.lua").to_subrecord()?,
                LuaAttachment::new(0, vec!["NPC".into()]).to_subrecord()?,
            ],
        ),
    ];

    let mut data = Vec::new();
    write_records(&mut data, &records)?;
    Ok(data)
}

#[test]
#[traced_test]
fn read_lua_plugin() -> Result<()> {
    let records = read_plugin_data("test.omwaddon", Cursor::new(lua_plugin()?))?;
    assert_eq!(records.len(), 2);

    let tes3 = Tes3::from_record(&records[0])?;
    assert_eq!(
        tes3.header,
        FileHeader::builder().version(1.3).num_records(1).build()
    );

    let lual = &records[1];
    assert_eq!(lual.subrecords[0].tag, tag::LUAS);
    assert_eq!(
        LuaScriptPath::from_subrecord(&lual.subrecords[0])?.value,
        "scripts/foo.lua"
    );
    assert_eq!(
        LuaAttachment::from_subrecord(&lual.subrecords[1])?.targets,
        vec!["NPC_"]
    );
    assert_eq!(
        omwscripts::extract(&lual.subrecords)?,
        "NPC: scripts/foo.lua\n"
    );

    Ok(())
}

#[test]
fn records_round_trip_byte_for_byte() -> Result<()> {
    let data = lua_plugin()?;
    let records = read_plugin_data("test.omwaddon", Cursor::new(data.clone()))?;

    let mut written = Vec::new();
    write_records(&mut written, &records)?;
    assert_eq!(written, data);

    Ok(())
}

#[test]
fn truncated_record_keeps_earlier_records() -> Result<()> {
    let mut data = lua_plugin()?;
    let full = data.len();
    data.truncate(full - 3);

    let results: Vec<_> = RecordReader::new("broken.esp", Cursor::new(data)).collect();
    assert_eq!(results.len(), 2);
    assert!(matches!(&results[0], Ok(record) if record.tag == tag::TES3));
    assert!(matches!(results[1], Err(Error::Truncated { .. })));

    Ok(())
}

#[test]
fn unknown_records_are_preserved() -> Result<()> {
    let record = Record::with_subrecords(
        "NPC_".parse()?,
        0x2000,
        vec![
            Subrecord::new(tag::NAME, b"fargoth\0".to_vec()),
            Subrecord::new("FNAM".parse()?, b"Fargoth\0".to_vec()),
            Subrecord::new("NPDT".parse()?, vec![0xFF; 52]),
        ],
    );

    let mut data = Vec::new();
    record.write(&mut data)?;
    let records = read_plugin_data("npc.esp", Cursor::new(data))?;
    assert_eq!(records, vec![record]);

    Ok(())
}

#[test]
fn plugin_file_round_trip() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("tes3_esm_plugin_{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("Round.Trip.ESP");

    let records = read_plugin_data("x", Cursor::new(lua_plugin()?))?;
    write_plugin_file(&path, &records)?;

    let reread = read_plugin_file(&path)?;
    assert_eq!(reread, records);
    assert_eq!(reread[1].plugin_name.as_deref(), Some("round.trip.esp"));
    assert_eq!(reread[1].plugin_offset, records[0].serialized_size() as u64);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

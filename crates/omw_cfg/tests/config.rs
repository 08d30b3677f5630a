use std::{
    fs,
    path::{Path, PathBuf},
};

use omw_cfg::{
    error::{Error, Result},
    find_root, MorrowindIni, OpenMwConfig,
};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

fn resources() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources")
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn find_root_from_directory_and_file() -> Result<()> {
    let dir = resources().join("root");
    let expected = dir.join("openmw.cfg");

    assert_eq!(find_root(Some(dir.as_path()))?, expected);
    assert_eq!(find_root(Some(expected.as_path()))?, expected);

    Ok(())
}

#[traced_test]
#[test]
fn nested_configs() -> Result<()> {
    let root = resources().join("root");
    let config = OpenMwConfig::load(root.join("openmw.cfg"))?;

    let root = fs::canonicalize(root)?;
    assert_eq!(
        config.sources,
        vec![root.join("openmw.cfg"), root.join("nested").join("openmw.cfg")]
    );
    assert!(logs_contain("already loaded"));

    let data: Vec<_> = config
        .data
        .iter()
        .map(fs::canonicalize)
        .collect::<std::io::Result<_>>()?;
    assert_eq!(
        data,
        vec![
            root.join("data/base"),
            root.join("data/mod"),
            root.join("data/override")
        ]
    );

    assert_eq!(
        file_names(&config.content),
        vec!["Base.esm", "Mod.esp", "Override.esp"]
    );
    assert_eq!(
        fs::canonicalize(&config.content[2])?,
        root.join("data/override/Override.esp")
    );
    assert!(logs_contain("skipping content Scripts.omwscripts"));

    assert_eq!(config.archives, vec![root.join("Base.bsa")]);
    assert!(logs_contain("Base.bsa not found in any data directory"));

    Ok(())
}

#[test]
fn replace_config_discards_earlier_files() -> Result<()> {
    let dir = resources().join("replace");
    let config = OpenMwConfig::load(dir.join("openmw.cfg"))?;

    let dir = fs::canonicalize(dir)?;
    assert_eq!(config.sources, vec![dir.join("inner").join("openmw.cfg")]);
    assert_eq!(config.data.len(), 1);
    assert_eq!(file_names(&config.content), vec!["Base.esm"]);
    assert_eq!(
        fs::canonicalize(&config.content[0])?,
        fs::canonicalize(resources().join("root/data/base/Base.esm"))?
    );

    Ok(())
}

#[test]
fn missing_config() {
    let result = OpenMwConfig::load(resources().join("no_such_dir").join("openmw.cfg"));
    assert!(matches!(result, Err(Error::IOError(_))));
}

#[traced_test]
#[test]
fn morrowind_ini() -> Result<()> {
    let dir = resources().join("vanilla");
    let ini = MorrowindIni::load(dir.join("Morrowind.ini"))?;

    assert_eq!(ini.data, dir.join("Data Files"));
    assert_eq!(file_names(&ini.plugins), vec!["Base.esm", "Mod.esp"]);
    assert!(ini.archives.is_empty());
    assert!(logs_contain("skipping Missing.esp"));
    assert!(logs_contain("skipping Missing.bsa"));

    Ok(())
}

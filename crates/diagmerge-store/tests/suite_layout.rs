//! Loading and saving the stores of a suite laid out on disk.

use diagmerge_store::{RoseConfig, SuiteLayout, XmlTree};
use diagmerge_types::StashFlavor;
use std::fs;
use std::path::Path;

const UM_APP: &str = "\
[namelist:umstash_domain(diag_11111111)]
dom_name='DIAG'
iopl=5

[namelist:umstash_streq(03236_55555555)]
dom_name='DIAG'
isec=3
item=236
tim_name='TMONMN'
use_name='UPM'
";

const XML_APP: &str = "\
[file:iodef_nemo.xml]
source=$NEMO_DIR/xml/iodef_nemo.xml
";

const IODEF: &str = r#"<?xml version="1.0"?>
<context id="nemo">
  <file_definition>
    <file_group id="1m" output_freq="1mo">
      <file id="file1" name_suffix="_grid_T">
        <field field_ref="sst" name="tos"/>
      </file>
    </file_group>
  </file_definition>
</context>
"#;

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

#[test]
fn test_stores_are_found_and_survive_a_save() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SuiteLayout::new(dir.path().join("u-ab123"));

    // XIOS requests and the iodef file section share the xml app.
    let um = layout.atmosphere_store(StashFlavor::Xios);
    assert_eq!(um, layout.ocean_app());
    write(&um, &format!("{}\n{}", UM_APP, XML_APP));

    let ocean_app = RoseConfig::load(&layout.ocean_app()).unwrap();
    let iodef = layout.ocean_request(&ocean_app).unwrap();
    assert!(iodef.ends_with("app/xml/file/iodef_nemo.xml"));
    write(&iodef, IODEF);

    let site = RoseConfig::load(&um).unwrap();
    assert_eq!(site.len(), 3);
    let tree = XmlTree::load(&iodef).unwrap();

    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let saved_site = out.join(layout.output_name(&um));
    let saved_tree = out.join(layout.output_name(&iodef));
    site.save(&saved_site).unwrap();
    tree.save(&saved_tree).unwrap();

    assert!(saved_site
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("u-ab123__app__"));
    assert_eq!(RoseConfig::load(&saved_site).unwrap().render(), site.render());
    assert_eq!(XmlTree::load(&saved_tree).unwrap().render(), tree.render());
}

#[test]
fn test_missing_request_section_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SuiteLayout::new(dir.path());
    let app = RoseConfig::parse("xml/rose-app.conf", "[env]\nNEMO_DIR=/opt/nemo\n").unwrap();
    let err = layout.ocean_request(&app).unwrap_err();
    assert!(err.to_string().contains("iodef_nemo.xml"));
}

#[test]
fn test_unreadable_store_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RoseConfig::load(&dir.path().join("absent.conf")).unwrap_err();
    assert!(err.to_string().starts_with("I/O error on"));
}

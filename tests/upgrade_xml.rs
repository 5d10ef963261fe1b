//! Stylesheet upgrades through the file API.

#![cfg(feature = "upgrade")]

use std::fs;
use std::path::PathBuf;

use mapsheet::upgrade::{UpgradeError, UpgradeOptions, upgrade_file, upgrade_str};
use pretty_assertions::assert_eq;

const OLD_STYLESHEET: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE Map [
  <!ENTITY epsg4326 "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs">
]>
<Map bgcolor="#b5d0d0" srs="&epsg4326;">
  <Style name="coast">
    <Rule>
      <PolygonSymbolizer>
        <CssParameter name="fill">#f2efe9</CssParameter>
      </PolygonSymbolizer>
      <LineSymbolizer>
        <CssParameter name="stroke">#85c5d3</CssParameter>
        <CssParameter name="stroke-width">0.5</CssParameter>
      </LineSymbolizer>
    </Rule>
  </Style>
  <Style name="places">
    <Rule>
      <MaxScaleDenominator>5000000</MaxScaleDenominator>
      <TextSymbolizer name="name" face_name="DejaVu Sans Book" size="9" text_convert="tolower" min_distance="10"/>
      <PointSymbolizer file="town.png" type="png" width="4" height="4"/>
    </Rule>
  </Style>
  <Layer name="coastline" status="on">
    <StyleName>coast</StyleName>
  </Layer>
</Map>
"##;

const UPGRADED: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<Map srs="+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs" background-color="#b5d0d0" minimum_version="0.7.2">
  <Style name="coast">
    <Rule>
      <PolygonSymbolizer fill="#f2efe9"/>
      <LineSymbolizer stroke="#85c5d3" stroke-width="0.5"/>
    </Rule>
  </Style>
  <Style name="places">
    <Rule>
      <MaxScaleDenominator>5000000</MaxScaleDenominator>
      <TextSymbolizer name="[name]" face_name="DejaVu Sans Book" size="9" text_transform="lowercase" minimum_distance="10"/>
      <PointSymbolizer file="town.png"/>
    </Rule>
  </Style>
  <Layer name="coastline" status="on">
    <StyleName>coast</StyleName>
  </Layer>
</Map>
"##;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "mapsheet_upgrade_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    fs::create_dir_all(&dir).expect("mkdir");
    dir
}

#[test]
fn upgrades_full_stylesheet() {
    let out = upgrade_str(OLD_STYLESHEET, &UpgradeOptions::default()).unwrap();
    assert_eq!(out.xml, UPGRADED);
    assert_eq!(out.report.styles, 2);
    assert_eq!(out.report.symbolizers, 4);
    assert_eq!(out.report.fixed_names, ["name"]);
    assert!(out.report.warnings.is_empty());
}

#[test]
fn upgraded_output_is_stable() {
    let once = upgrade_str(OLD_STYLESHEET, &UpgradeOptions::default()).unwrap();
    let twice = upgrade_str(&once.xml, &UpgradeOptions::default()).unwrap();
    assert_eq!(twice.xml, once.xml);
    assert!(twice.report.fixed_names.is_empty());
}

#[test]
fn file_round_trip() {
    let dir = scratch_dir("file");
    let input = dir.join("old.xml");
    let output = dir.join("new.xml");
    fs::write(&input, OLD_STYLESHEET).unwrap();

    let report = upgrade_file(&input, &output, &UpgradeOptions::default()).unwrap();
    assert_eq!(report.styles, 2);
    assert_eq!(fs::read_to_string(&output).unwrap(), UPGRADED);
    // Input untouched.
    assert_eq!(fs::read_to_string(&input).unwrap(), OLD_STYLESHEET);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn refuses_to_overwrite_input() {
    let dir = scratch_dir("same");
    let input = dir.join("map.xml");
    fs::write(&input, OLD_STYLESHEET).unwrap();

    let err = upgrade_file(&input, &input, &UpgradeOptions::default()).unwrap_err();
    assert!(matches!(err, UpgradeError::SamePath(_)));

    // Same file through a different spelling.
    let dotted = dir.join(".").join("map.xml");
    let err = upgrade_file(&input, &dotted, &UpgradeOptions::default()).unwrap_err();
    assert!(matches!(err, UpgradeError::SamePath(_)));
    assert_eq!(fs::read_to_string(&input).unwrap(), OLD_STYLESHEET);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_input_is_io_error() {
    let dir = scratch_dir("missing");
    let err = upgrade_file(
        &dir.join("nope.xml"),
        &dir.join("out.xml"),
        &UpgradeOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, UpgradeError::Io(_)));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn external_entities_inlined_from_input_directory() {
    let dir = scratch_dir("entity");
    fs::create_dir_all(dir.join("inc")).unwrap();
    fs::write(
        dir.join("inc").join("layers.xml"),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Style name=\"pois\"><Rule><PointSymbolizer file=\"poi.png\" width=\"8\"/></Rule></Style>",
    )
    .unwrap();
    let input = dir.join("map.xml");
    fs::write(
        &input,
        r#"<?xml version="1.0"?>
<!DOCTYPE Map [
  <!ENTITY layers SYSTEM "inc/layers.xml">
  <!ENTITY srs "+proj=merc">
]>
<Map srs="&srs;"><Style name="s"/>&layers;</Map>"#,
    )
    .unwrap();
    let output = dir.join("out.xml");

    let report = upgrade_file(&input, &output, &UpgradeOptions::default()).unwrap();
    assert_eq!(report.styles, 2);
    let xml = fs::read_to_string(&output).unwrap();
    assert!(xml.contains(r#"<PointSymbolizer file="poi.png"/>"#), "{xml}");
    assert!(xml.contains(r#"srs="+proj=merc""#));
    assert!(!xml.contains("&layers;"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_entity_file_names_the_entity() {
    let dir = scratch_dir("entity_missing");
    let input = dir.join("map.xml");
    fs::write(
        &input,
        r#"<!DOCTYPE Map [ <!ENTITY layers SYSTEM "layers.xml"> ]>
<Map srs="x"><Style name="s"/>&layers;</Map>"#,
    )
    .unwrap();

    let err = upgrade_file(&input, &dir.join("out.xml"), &UpgradeOptions::default()).unwrap_err();
    match err {
        UpgradeError::EntityFile { name, path, .. } => {
            assert_eq!(name, "layers");
            assert_eq!(path, dir.join("layers.xml"));
        }
        other => panic!("expected EntityFile, got {other:?}"),
    }
    assert!(!dir.join("out.xml").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn xinclude_written_back_unchanged() {
    let xml = r#"<Map xmlns:xi="http://www.w3.org/2001/XInclude" srs="x"><xi:include href="styles.xml"/><Style name="s"/></Map>"#;
    let out = upgrade_str(xml, &UpgradeOptions::default()).unwrap();
    assert!(out.xml.contains(
        r#"<Map xmlns:xi="http://www.w3.org/2001/XInclude" srs="x" minimum_version="0.7.2">"#
    ));
    assert!(out.xml.contains(r#"<xi:include href="styles.xml"/>"#));
}

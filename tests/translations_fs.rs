//! Filesystem tests for the translation key rewriter

use std::fs;
use std::path::Path;
use storefront_ops::translations::{fix_directory, fix_file, section_files, TranslationMap};

const FOOTER_SCHEMA: &str = r#"{% schema %}
{
  "name": "t:sections.footer.name",
  "settings": [
    {"type": "select", "id": "padding_top", "label": "t:sections.all.padding.padding_top"}
  ]
}
{% endschema %}
"#;

const PLAIN_SECTION: &str = r#"{% schema %}
{"name": "Announcement bar"}
{% endschema %}
"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write fixture");
}

#[test]
fn test_fix_directory_rewrites_only_matching_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "footer.liquid", FOOTER_SCHEMA);
    write(dir.path(), "announcement.liquid", PLAIN_SECTION);
    write(dir.path(), "notes.txt", FOOTER_SCHEMA);

    let mut visited = Vec::new();
    let report = fix_directory(
        dir.path(),
        "liquid",
        TranslationMap::builtin(),
        false,
        |path, changed| visited.push((path.file_name().unwrap().to_owned(), changed)),
    )
    .unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.fixed, vec![dir.path().join("footer.liquid")]);

    // Sorted order
    assert_eq!(visited[0].0, "announcement.liquid");
    assert!(!visited[0].1);
    assert!(visited[1].1);

    let footer = fs::read_to_string(dir.path().join("footer.liquid")).unwrap();
    assert!(footer.contains(r#""name": "Footer""#));
    assert!(footer.contains(r#""label": "Top padding""#));
    assert!(!footer.contains("t:sections"));

    // Other extensions are left alone
    let notes = fs::read_to_string(dir.path().join("notes.txt")).unwrap();
    assert_eq!(notes, FOOTER_SCHEMA);
}

#[test]
fn test_second_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "footer.liquid", FOOTER_SCHEMA);

    let map = TranslationMap::builtin();
    let first = fix_directory(dir.path(), "liquid", map, false, |_, _| {}).unwrap();
    let second = fix_directory(dir.path(), ".liquid", map, false, |_, _| {}).unwrap();

    assert_eq!(first.fixed.len(), 1);
    assert!(second.fixed.is_empty());
    assert_eq!(second.scanned, 1);
}

#[test]
fn test_dry_run_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "footer.liquid", FOOTER_SCHEMA);

    let path = dir.path().join("footer.liquid");
    assert!(fix_file(&path, TranslationMap::builtin(), true).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), FOOTER_SCHEMA);
}

#[test]
fn test_missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = section_files(&dir.path().join("sections"), "liquid").unwrap_err();
    assert!(err.to_string().contains("Sections directory not found"));
}

#[test]
fn test_directory_without_matches_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "readme.md", "nothing here");
    fs::create_dir(dir.path().join("nested.liquid")).unwrap();

    let err = section_files(dir.path(), "liquid").unwrap_err();
    assert!(err.to_string().contains("No .liquid files"));
}

#[test]
fn test_custom_mapping_file() {
    let dir = tempfile::tempdir().unwrap();
    let mapping = dir.path().join("mapping.json");
    fs::write(&mapping, r#"{"t:sections.custom.name": "Custom"}"#).unwrap();

    let map = TranslationMap::load(&mapping).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.rewrite("'t:sections.custom.name'").content, "'Custom'");
    assert!(TranslationMap::load(&dir.path().join("absent.json")).is_err());
}

#[test]
fn test_identity_mapping_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "footer.liquid", FOOTER_SCHEMA);

    let map = TranslationMap::from_json(r#"{"t:sections.footer.name": "t:sections.footer.name"}"#)
        .unwrap();
    let path = dir.path().join("footer.liquid");
    let modified = fs::metadata(&path).unwrap().modified().unwrap();

    let report = fix_directory(dir.path(), "liquid", &map, false, |_, _| {}).unwrap();
    assert!(report.fixed.is_empty());
    assert!(!fix_file(&path, &map, false).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), FOOTER_SCHEMA);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
}

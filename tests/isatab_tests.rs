//! Library-level tests over the BII-I-1 fixture
//!
//! The fixture under tests/data is a trimmed ISA-Tab archive: one study,
//! one metabolite profiling assay, three samples.

use std::path::{Path, PathBuf};

use isakit::errors::Code;
use isakit::isatab::{self, read_investigation_file, Table, TabOptions};
use isakit::model::{Measured, Value};
use isakit::{isajson, Validator};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/BII-I-1")
}

fn investigation_text(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("i_investigation.txt")).unwrap()
}

fn normalized_table(path: &Path) -> Table {
    let mut table = Table::read(path, false).unwrap();
    table.normalize();
    table
}

// ============================================================================
// Reading
// ============================================================================

#[test]
fn test_fixture_loads_without_findings() {
    let loaded = isatab::load(&fixture(), &TabOptions::default()).unwrap();
    assert!(loaded.report.is_valid(), "{:?}", loaded.report.errors);

    let study = &loaded.investigation.studies[0];
    assert_eq!(loaded.investigation.identifier, "BII-I-1");
    assert_eq!(study.sources.len(), 2);
    assert_eq!(study.samples.len(), 3);
    assert_eq!(study.protocols.len(), 3);
    assert_eq!(study.assays[0].data_files.len(), 3);
    assert_eq!(loaded.tables.len(), 2);
}

#[test]
fn test_fixture_values() {
    let loaded = isatab::load(&fixture(), &TabOptions::default()).unwrap();
    let study = &loaded.investigation.studies[0];

    let culture = study.source_by_name("culture1").unwrap();
    let organism = culture.characteristics[0].value().as_term().unwrap();
    assert_eq!(organism.term, "Saccharomyces cerevisiae");
    assert_eq!(organism.term_source, "NCBITAXON");

    let sample = study.sample_by_name("N-0.1-aliquot1").unwrap();
    let nutrient = study.factor_by_name("limiting nutrient").unwrap();
    let value = sample
        .factor_values
        .iter()
        .find(|fv| fv.factor == nutrient.id)
        .unwrap();
    assert_eq!(value.value(), &Value::from("nitrogen"));
}

// ============================================================================
// Load then dump
// ============================================================================

#[test]
fn test_load_then_dump_keeps_investigation_file() {
    let out = TempDir::new().unwrap();
    let loaded = isatab::load(&fixture(), &TabOptions::default()).unwrap();
    isatab::dump(&loaded.investigation, out.path(), &TabOptions::default()).unwrap();

    let (original, _) = read_investigation_file(&investigation_text(&fixture()));
    let (dumped, _) = read_investigation_file(&investigation_text(out.path()));
    assert_eq!(dumped.normalized(), original.normalized());
}

#[test]
fn test_load_then_dump_keeps_tables() {
    let out = TempDir::new().unwrap();
    let loaded = isatab::load(&fixture(), &TabOptions::default()).unwrap();
    isatab::dump(&loaded.investigation, out.path(), &TabOptions::default()).unwrap();

    for name in ["s_BII-S-1.txt", "a_metabolome.txt"] {
        let original = normalized_table(&fixture().join(name));
        let dumped = normalized_table(&out.path().join(name));
        assert_eq!(dumped.header, original.header, "{}", name);
        assert_eq!(dumped.rows, original.rows, "{}", name);
    }
}

#[test]
fn test_second_dump_is_identical() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let options = TabOptions::default();

    let loaded = isatab::load(&fixture(), &options).unwrap();
    isatab::dump(&loaded.investigation, first.path(), &options).unwrap();
    let reloaded = isatab::load(first.path(), &options).unwrap();
    isatab::dump(&reloaded.investigation, second.path(), &options).unwrap();

    for name in ["i_investigation.txt", "s_BII-S-1.txt", "a_metabolome.txt"] {
        let a = std::fs::read_to_string(first.path().join(name)).unwrap();
        let b = std::fs::read_to_string(second.path().join(name)).unwrap();
        assert_eq!(a, b, "{}", name);
    }
}

#[test]
fn test_quoted_cells_option() {
    let out = TempDir::new().unwrap();
    let loaded = isatab::load(&fixture(), &TabOptions::default()).unwrap();
    let options = TabOptions {
        write_cell_quotes: true,
        ..Default::default()
    };
    isatab::dump(&loaded.investigation, out.path(), &options).unwrap();

    let study = std::fs::read_to_string(out.path().join("s_BII-S-1.txt")).unwrap();
    assert!(study.starts_with("\"Source Name\"\t"));
    let reloaded = isatab::load(out.path(), &TabOptions::default()).unwrap();
    assert_eq!(reloaded.investigation.studies[0].samples.len(), 3);
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merge_rows_come_from_both_tables() {
    let study = Table::read(&fixture().join("s_BII-S-1.txt"), false).unwrap();
    let mut assay = Table::read(&fixture().join("a_metabolome.txt"), false).unwrap();
    assay.rows.push(vec![
        "stray".to_string(),
        "metabolite extraction".to_string(),
        "stray.e1".to_string(),
        "mass spectrometry".to_string(),
        "run9".to_string(),
        "run9.mzML".to_string(),
    ]);

    let merged = isatab::merge_study_with_assay(&study, &assay);
    assert!(merged.rows.len() <= assay.rows.len());
    assert_eq!(merged.rows.len(), 3);

    let sample = merged.column("Sample Name").unwrap();
    let study_sample = study.column("Sample Name").unwrap();
    let assay_sample = assay.column("Sample Name").unwrap();
    for row in &merged.rows {
        assert!(study.rows.iter().any(|r| r[study_sample] == row[sample]));
        assert!(assay.rows.iter().any(|r| r[assay_sample] == row[sample]));
    }
    assert_eq!(merged.columns("Sample Name").len(), 1);
}

// ============================================================================
// ISA-JSON
// ============================================================================

#[test]
fn test_tab_to_json_and_back() {
    let out = TempDir::new().unwrap();
    let loaded = isatab::load(&fixture(), &TabOptions::default()).unwrap();
    let json = out.path().join("BII-I-1.json");
    isajson::dump(&loaded.investigation, &json).unwrap();

    let (investigation, report) = isajson::load(&json, &Default::default()).unwrap();
    assert!(report.is_valid(), "{:?}", report.errors);

    let tab = out.path().join("tab");
    std::fs::create_dir(&tab).unwrap();
    isatab::dump(&investigation, &tab, &TabOptions::default()).unwrap();
    for name in ["s_BII-S-1.txt", "a_metabolome.txt"] {
        let original = normalized_table(&fixture().join(name));
        let converted = normalized_table(&tab.join(name));
        assert_eq!(converted.rows, original.rows, "{}", name);
    }
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_fixture_validates_against_embedded_configs() {
    let report = Validator::embedded().unwrap().validate_tab_dir(&fixture());
    assert!(report.is_valid(), "{:?}", report.errors);
    assert!(!report.contains(Code::NoConfiguration));
    assert!(!report.contains(Code::RequiredColumnMissing));
    assert!(report.contains(Code::StudyGroupInfo));
}

#[test]
fn test_fixture_with_unknown_parameter() {
    let dir = TempDir::new().unwrap();
    for name in ["i_investigation.txt", "s_BII-S-1.txt", "a_metabolome.txt"] {
        std::fs::copy(fixture().join(name), dir.path().join(name)).unwrap();
    }
    let study = std::fs::read_to_string(dir.path().join("s_BII-S-1.txt")).unwrap();
    std::fs::write(
        dir.path().join("s_BII-S-1.txt"),
        study.replace("Parameter Value[rate]", "Parameter Value[dilution]"),
    )
    .unwrap();

    let report = Validator::without_configs().validate_tab_dir(dir.path());
    assert_eq!(report.error_codes(), vec![1009]);
}

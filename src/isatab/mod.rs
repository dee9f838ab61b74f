//! ISA-Tab serialization
//!
//! An ISA-Tab document is a directory holding one investigation file
//! (`i_*.txt`) plus the study (`s_*.txt`) and assay (`a_*.txt`) tables it
//! names. [`load`] rebuilds the model and a report of non-fatal findings;
//! [`dump`] writes the model back.

pub mod columns;
pub mod investigation;
pub mod merge;
pub mod read;
pub mod table;
pub mod write;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::IsaError;
use crate::errors::{Code, Finding, ValidationReport};
use crate::labels::RX_INVESTIGATION_FILE;
use crate::model::{Assay, Investigation, Study};

pub use investigation::{parse_investigation, read_investigation_file, render_investigation, InvestigationFile};
pub use merge::merge_study_with_assay;
pub use read::{read_table, Catalog, TableGraph};
pub use table::Table;
pub use write::{assay_table, study_table};

pub const DEFAULT_INVESTIGATION_FILE: &str = "i_investigation.txt";

/// Reading and writing switches for ISA-Tab
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TabOptions {
    /// Leave surrounding double quotes on cells when reading
    pub keep_cell_quotes: bool,
    /// Quote every cell when writing
    pub write_cell_quotes: bool,
    pub write_factor_values_in_assay_table: bool,
}

/// A table as read, tagged with the study/assay it belongs to
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub study: usize,
    pub assay: Option<usize>,
    pub table: Table,
}

#[derive(Debug)]
pub struct Loaded {
    pub investigation: Investigation,
    pub report: ValidationReport,
    pub path: PathBuf,
    pub tables: Vec<LoadedTable>,
}

/// Locate the single `i_*.txt` file of a directory
pub fn find_investigation_file(dir: &Path) -> Result<PathBuf, IsaError> {
    let pattern = dir.join("i_*.txt");
    let mut found: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .map_err(|_| IsaError::InvestigationNotFound { dir: dir.to_path_buf() })?
        .filter_map(Result::ok)
        .collect();
    found.sort();
    if found.len() > 1 {
        tracing::warn!(dir = %dir.display(), count = found.len(), "several investigation files, using the first");
    }
    found
        .into_iter()
        .next()
        .ok_or_else(|| IsaError::InvestigationNotFound { dir: dir.to_path_buf() })
}

fn fill_study(study: &mut Study, table: &Table, report: &mut ValidationReport) -> Result<(), IsaError> {
    let mut catalog = Catalog {
        protocols: &mut study.protocols,
        factors: &study.factors,
        study_samples: None,
        categories: &mut study.characteristic_categories,
        units: &mut study.units,
    };
    let graph = read_table(table, &mut catalog, report)?;
    study.sources = graph.sources;
    study.samples = graph.samples;
    study.other_material = graph.materials;
    study.process_sequence = graph.processes;
    Ok(())
}

fn fill_assay(study: &mut Study, assay: &mut Assay, table: &Table, report: &mut ValidationReport) -> Result<(), IsaError> {
    let mut catalog = Catalog {
        protocols: &mut study.protocols,
        factors: &study.factors,
        study_samples: Some(&study.samples),
        categories: &mut study.characteristic_categories,
        units: &mut study.units,
    };
    let graph = read_table(table, &mut catalog, report)?;
    assay.samples = graph.samples;
    assay.other_material = graph.materials;
    assay.data_files = graph.data_files;
    assay.process_sequence = graph.processes;
    assay.characteristic_categories = graph.categories;
    assay.units = graph.units;
    Ok(())
}

/// Read a table, turning a missing file into a finding
fn read_listed(
    dir: &Path,
    filename: &str,
    missing: Code,
    owner: &str,
    options: &TabOptions,
    report: &mut ValidationReport,
) -> Result<Option<Table>, IsaError> {
    if filename.is_empty() {
        report.add(Finding::new(Code::MissingFileName, format!("{} has no file name", owner)));
        return Ok(None);
    }
    match Table::read(&dir.join(filename), options.keep_cell_quotes) {
        Ok(table) => Ok(Some(table)),
        Err(IsaError::TableNotFound { .. }) => {
            report.add(Finding::new(missing, format!("{} not found in {}", filename, dir.display())));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Load an ISA-Tab directory
///
/// A missing investigation file, non-UTF-8 text or a table without a
/// `Sample Name` column is fatal. Missing study or assay files and cell
/// level problems end up in the returned report.
pub fn load(dir: &Path, options: &TabOptions) -> Result<Loaded, IsaError> {
    let path = find_investigation_file(dir)?;
    let text = table::read_utf8(&path)?;
    let (file, orphans) = read_investigation_file(&text);
    if let Some(&line) = orphans.first() {
        return Err(IsaError::MalformedInvestigation {
            line,
            details: "row appears before any section header".to_string(),
        });
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_INVESTIGATION_FILE.to_string());
    let mut report = ValidationReport::new(&name);
    let mut investigation = parse_investigation(&file, &mut report);
    investigation.filename = name;

    let mut tables = Vec::new();
    for (s, study) in investigation.studies.iter_mut().enumerate() {
        let owner = format!("Study '{}'", study.identifier);
        let Some(table) = read_listed(dir, &study.filename, Code::StudyFile, &owner, options, &mut report)? else {
            continue;
        };
        fill_study(study, &table, &mut report)?;
        tables.push(LoadedTable {
            study: s,
            assay: None,
            table,
        });

        for a in 0..study.assays.len() {
            let filename = study.assays[a].filename.clone();
            let owner = format!("Assay {} of study '{}'", a + 1, study.identifier);
            let Some(table) = read_listed(dir, &filename, Code::AssayFile, &owner, options, &mut report)? else {
                continue;
            };
            let mut assay = std::mem::take(&mut study.assays[a]);
            let filled = fill_assay(study, &mut assay, &table, &mut report);
            study.assays[a] = assay;
            filled?;
            tables.push(LoadedTable {
                study: s,
                assay: Some(a),
                table,
            });
        }

        study.characteristic_categories.sort_by(|x, y| x.term.cmp(&y.term));
        study.units.sort_by(|x, y| x.term.cmp(&y.term));
    }

    report.validation_finished = true;
    tracing::info!(
        dir = %dir.display(),
        studies = investigation.studies.len(),
        tables = tables.len(),
        errors = report.errors.len(),
        "loaded ISA-Tab"
    );
    Ok(Loaded {
        investigation,
        report,
        path,
        tables,
    })
}

/// Write an investigation as an ISA-Tab directory
pub fn dump(investigation: &Investigation, dir: &Path, options: &TabOptions) -> Result<(), IsaError> {
    if !dir.is_dir() {
        return Err(IsaError::OutputDirMissing { dir: dir.to_path_buf() });
    }
    let name = if investigation.filename.is_empty() {
        DEFAULT_INVESTIGATION_FILE
    } else {
        investigation.filename.as_str()
    };
    if !RX_INVESTIGATION_FILE.is_match(name) {
        return Err(IsaError::InvalidInvestigationFileName { name: name.to_string() });
    }

    let quote = options.write_cell_quotes;
    std::fs::write(dir.join(name), render_investigation(investigation).to_tsv(quote))?;
    for study in &investigation.studies {
        if study.filename.is_empty() {
            tracing::warn!(study = %study.identifier, "study has no file name, table not written");
            continue;
        }
        study_table(study)?.write(&dir.join(&study.filename), quote)?;
        for assay in &study.assays {
            if assay.filename.is_empty() {
                tracing::warn!(study = %study.identifier, "assay has no file name, table not written");
                continue;
            }
            assay_table(study, assay, options)?.write(&dir.join(&assay.filename), quote)?;
        }
    }
    tracing::info!(dir = %dir.display(), studies = investigation.studies.len(), "wrote ISA-Tab");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_investigation_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(dir.path(), &TabOptions::default()),
            Err(IsaError::InvestigationNotFound { .. })
        ));
    }

    #[test]
    fn test_orphan_rows_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("i_x.txt"), "Investigation Title\tx\nINVESTIGATION\n").unwrap();
        assert!(matches!(
            load(dir.path(), &TabOptions::default()),
            Err(IsaError::MalformedInvestigation { line: 1, .. })
        ));
    }

    #[test]
    fn test_dump_checks_name_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut investigation = Investigation::new();
        assert!(matches!(
            dump(&investigation, &dir.path().join("nope"), &TabOptions::default()),
            Err(IsaError::OutputDirMissing { .. })
        ));
        investigation.filename = "investigation.txt".to_string();
        assert!(matches!(
            dump(&investigation, dir.path(), &TabOptions::default()),
            Err(IsaError::InvalidInvestigationFileName { .. })
        ));
    }

    #[test]
    fn test_tab_options_defaults_from_yaml() {
        let options: TabOptions = serde_yaml::from_str("write_cell_quotes: true").unwrap();
        assert!(options.write_cell_quotes);
        assert!(!options.keep_cell_quotes);
    }
}

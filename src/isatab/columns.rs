//! Column grouping of study and assay table headers
//!
//! Qualifier columns (`Term Source REF`, `Term Accession Number`, `Unit`,
//! `Performer`, `Date`) are folded into the preceding subject column. The
//! result is a flat list of [`ColumnGroup`]s the process-sequence reader
//! walks left to right.

use crate::errors::{Code, Finding, ValidationReport};
use crate::labels::{
    bracketed, is_assay_name, ARRAY_DESIGN_REF, DATE, LABEL, LABELED_EXTRACT_NAME, EXTRACT_NAME, MATERIAL_TYPE,
    PERFORMER, PROTOCOL_REF, RX_CHARACTERISTICS, RX_COMMENT, RX_FACTOR_VALUE, RX_PARAMETER_VALUE, SAMPLE_NAME,
    SOURCE_NAME, TERM_ACCESSION_NUMBER, TERM_SOURCE_REF, UNIT,
};
use crate::model::{DataFileKind, MaterialType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Source,
    Sample,
    Material(MaterialType),
    DataFile(DataFileKind),
    ProtocolRef,
    /// Assay-name style process naming column
    ProcessName,
    ArrayDesignRef,
    Characteristic(String),
    FactorValue(String),
    ParameterValue(String),
    Comment(String),
}

impl ColumnKind {
    pub fn is_node(&self) -> bool {
        matches!(
            self,
            ColumnKind::Source | ColumnKind::Sample | ColumnKind::Material(_) | ColumnKind::DataFile(_)
        )
    }

    pub fn is_process(&self) -> bool {
        matches!(self, ColumnKind::ProtocolRef | ColumnKind::ProcessName)
    }

    fn takes_unit(&self) -> bool {
        matches!(
            self,
            ColumnKind::Characteristic(_) | ColumnKind::FactorValue(_) | ColumnKind::ParameterValue(_)
        )
    }

    fn takes_term(&self) -> bool {
        self.takes_unit() || matches!(self, ColumnKind::ProtocolRef)
    }
}

/// Positions of the qualifier columns attached to an attribute or unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermColumns {
    pub term_source: Option<usize>,
    pub term_accession: Option<usize>,
}

impl TermColumns {
    pub fn is_present(&self) -> bool {
        self.term_source.is_some() || self.term_accession.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    pub kind: ColumnKind,
    /// Header label of the subject column
    pub label: String,
    /// Position of the subject column
    pub index: usize,
    pub term: TermColumns,
    pub unit: Option<usize>,
    pub unit_term: TermColumns,
    pub performer: Option<usize>,
    pub date: Option<usize>,
}

impl ColumnGroup {
    fn new(kind: ColumnKind, label: &str, index: usize) -> Self {
        Self {
            kind,
            label: label.to_string(),
            index,
            term: TermColumns::default(),
            unit: None,
            unit_term: TermColumns::default(),
            performer: None,
            date: None,
        }
    }

    /// Every header position this group covers
    pub fn positions(&self) -> Vec<usize> {
        [
            Some(self.index),
            self.term.term_source,
            self.term.term_accession,
            self.unit,
            self.unit_term.term_source,
            self.unit_term.term_accession,
            self.performer,
            self.date,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Classify a non-qualifier header label
pub fn classify(label: &str) -> Option<ColumnKind> {
    let kind = match label {
        SOURCE_NAME => ColumnKind::Source,
        SAMPLE_NAME => ColumnKind::Sample,
        EXTRACT_NAME | LABELED_EXTRACT_NAME => ColumnKind::Material(MaterialType::from_label(label).ok()?),
        PROTOCOL_REF => ColumnKind::ProtocolRef,
        ARRAY_DESIGN_REF => ColumnKind::ArrayDesignRef,
        MATERIAL_TYPE => ColumnKind::Characteristic(MATERIAL_TYPE.to_string()),
        LABEL => ColumnKind::Characteristic(LABEL.to_string()),
        l if is_assay_name(l) => ColumnKind::ProcessName,
        l => {
            if let Ok(kind) = DataFileKind::from_label(l) {
                ColumnKind::DataFile(kind)
            } else if let Some(c) = bracketed(&RX_CHARACTERISTICS, l) {
                ColumnKind::Characteristic(c.to_string())
            } else if let Some(f) = bracketed(&RX_FACTOR_VALUE, l) {
                ColumnKind::FactorValue(f.to_string())
            } else if let Some(p) = bracketed(&RX_PARAMETER_VALUE, l) {
                ColumnKind::ParameterValue(p.to_string())
            } else if let Some(c) = bracketed(&RX_COMMENT, l) {
                ColumnKind::Comment(c.to_string())
            } else {
                return None;
            }
        }
    };
    Some(kind)
}

/// Group a header row, reporting unknown labels (4014) and misplaced
/// qualifiers (3012)
pub fn group_columns(header: &[String], file: &str, report: &mut ValidationReport) -> Vec<ColumnGroup> {
    let mut groups: Vec<ColumnGroup> = Vec::new();
    // index into `groups` of the last ProtocolRef since the last node
    let mut open_protocol: Option<usize> = None;

    for (i, raw) in header.iter().enumerate() {
        let label = raw.trim();
        match label {
            UNIT => match groups.last_mut() {
                Some(g) if g.kind.takes_unit() && g.unit.is_none() => g.unit = Some(i),
                _ => misplaced(report, file, label, i),
            },
            TERM_SOURCE_REF | TERM_ACCESSION_NUMBER => {
                let Some(g) = groups.last_mut() else {
                    misplaced(report, file, label, i);
                    continue;
                };
                let target = if g.unit.is_some() {
                    &mut g.unit_term
                } else if g.kind.takes_term() {
                    &mut g.term
                } else {
                    misplaced(report, file, label, i);
                    continue;
                };
                let slot = if label == TERM_SOURCE_REF {
                    &mut target.term_source
                } else {
                    &mut target.term_accession
                };
                if slot.is_some() {
                    misplaced(report, file, label, i);
                } else {
                    *slot = Some(i);
                }
            }
            PERFORMER | DATE => match open_protocol.and_then(|p| groups.get_mut(p)) {
                Some(g) => {
                    let slot = if label == PERFORMER { &mut g.performer } else { &mut g.date };
                    if slot.is_some() {
                        misplaced(report, file, label, i);
                    } else {
                        *slot = Some(i);
                    }
                }
                None => misplaced(report, file, label, i),
            },
            _ => match classify(label) {
                Some(kind) => {
                    if kind.is_node() {
                        open_protocol = None;
                    } else if kind == ColumnKind::ProtocolRef {
                        open_protocol = Some(groups.len());
                    }
                    groups.push(ColumnGroup::new(kind, label, i));
                }
                None => {
                    let detail = if label.is_empty() {
                        format!("Column {} of {} has no heading", i + 1, file)
                    } else {
                        format!("'{}' in {}", label, file)
                    };
                    report.add(Finding::new(Code::UnrecognisedHeading, detail));
                }
            },
        }
    }
    groups
}

fn misplaced(report: &mut ValidationReport, file: &str, label: &str, i: usize) {
    report.add(Finding::new(
        Code::QualifierPlacement,
        format!("'{}' at column {} of {} has no subject column", label, i + 1, file),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_qualifiers_fold_into_subject() {
        let h = header(&[
            "Source Name",
            "Characteristics[organism]",
            "Term Source REF",
            "Term Accession Number",
            "Protocol REF",
            "Parameter Value[volume]",
            "Unit",
            "Term Source REF",
            "Term Accession Number",
            "Performer",
            "Date",
            "Sample Name",
            "Factor Value[dose]",
            "Unit",
        ]);
        let mut report = ValidationReport::new("s.txt");
        let groups = group_columns(&h, "s.txt", &mut report);
        assert!(report.is_valid());
        assert!(!report.has_warnings());
        assert_eq!(groups.len(), 6);

        let organism = &groups[1];
        assert_eq!(organism.kind, ColumnKind::Characteristic("organism".into()));
        assert_eq!(organism.term.term_source, Some(2));
        assert_eq!(organism.term.term_accession, Some(3));

        let protocol = &groups[2];
        assert_eq!(protocol.performer, Some(9));
        assert_eq!(protocol.date, Some(10));

        let volume = &groups[3];
        assert_eq!(volume.unit, Some(6));
        assert_eq!(volume.unit_term.term_source, Some(7));
        assert!(!volume.term.is_present());

        assert_eq!(groups[5].unit, Some(13));
    }

    #[test]
    fn test_material_type_and_label_become_characteristics() {
        let h = header(&["Labeled Extract Name", "Label", "Term Source REF", "Material Type"]);
        let mut report = ValidationReport::new("a.txt");
        let groups = group_columns(&h, "a.txt", &mut report);
        assert_eq!(groups[0].kind, ColumnKind::Material(MaterialType::LabeledExtract));
        assert_eq!(groups[1].kind, ColumnKind::Characteristic("Label".into()));
        assert_eq!(groups[1].term.term_source, Some(2));
        assert_eq!(groups[2].kind, ColumnKind::Characteristic("Material Type".into()));
    }

    #[test]
    fn test_unknown_and_misplaced_headings_reported() {
        let h = header(&["Unit", "Sample Name", "Colour", "", "Date"]);
        let mut report = ValidationReport::new("a.txt");
        let groups = group_columns(&h, "a.txt", &mut report);
        assert_eq!(groups.len(), 1);
        assert_eq!(report.error_codes(), vec![4014, 4014]);
        assert_eq!(report.warnings.iter().filter(|f| f.code == Code::QualifierPlacement).count(), 2);
    }

    #[test]
    fn test_data_file_and_assay_name_columns() {
        assert_eq!(classify("Raw Data File"), Some(ColumnKind::DataFile(DataFileKind::Raw)));
        assert_eq!(classify("MS Assay Name"), Some(ColumnKind::ProcessName));
        assert_eq!(classify("Array Design REF"), Some(ColumnKind::ArrayDesignRef));
        assert_eq!(classify("Characteristic[age]"), Some(ColumnKind::Characteristic("age".into())));
        assert_eq!(classify("Whatever"), None);
    }
}

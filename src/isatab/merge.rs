//! Study/assay table join on `Sample Name`

use std::collections::HashMap;

use super::table::Table;
use crate::labels::SAMPLE_NAME;

/// Join a study table with one of its assay tables
///
/// Each assay row whose sample appears in the study is prefixed with the
/// first study row producing that sample. Unmatched assay rows are
/// dropped. The assay's own `Sample Name` column is not repeated.
pub fn merge_study_with_assay(study: &Table, assay: &Table) -> Table {
    let study_key = study.columns(SAMPLE_NAME).last().copied();
    let assay_key = assay.column(SAMPLE_NAME);

    let mut header = study.header.clone();
    let assay_columns: Vec<usize> = (0..assay.width()).filter(|&c| Some(c) != assay_key).collect();
    header.extend(assay_columns.iter().map(|&c| assay.header[c].clone()));
    let mut merged = Table::new(format!("{}+{}", study.name, assay.name), header);

    let (Some(study_key), Some(assay_key)) = (study_key, assay_key) else {
        tracing::warn!(study = %study.name, assay = %assay.name, "no Sample Name column to join on");
        return merged;
    };

    let mut by_sample: HashMap<&str, &Vec<String>> = HashMap::new();
    for row in &study.rows {
        by_sample.entry(row[study_key].as_str()).or_insert(row);
    }

    for row in &assay.rows {
        let Some(study_row) = by_sample.get(row[assay_key].as_str()) else {
            continue;
        };
        let mut cells = (*study_row).clone();
        cells.extend(assay_columns.iter().map(|&c| row[c].clone()));
        merged.rows.push(cells);
    }
    tracing::debug!(rows = merged.rows.len(), dropped = assay.rows.len() - merged.rows.len(), "merged tables");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDY: &str = "Source Name\tProtocol REF\tSample Name\n\
                         source1\tsample collection\tsample1\n\
                         source2\tsample collection\tsample2\n";
    const ASSAY: &str = "Sample Name\tProtocol REF\tExtract Name\n\
                         sample1\textraction\textract1\n\
                         sample1\textraction\textract1b\n\
                         sample9\textraction\textract9\n";

    #[test]
    fn test_merge_joins_on_sample_and_drops_unmatched() {
        let study = Table::parse("s_study.txt", STUDY, false).unwrap();
        let assay = Table::parse("a_assay.txt", ASSAY, false).unwrap();
        let merged = merge_study_with_assay(&study, &assay);

        assert_eq!(
            merged.header,
            vec!["Source Name", "Protocol REF", "Sample Name", "Protocol REF", "Extract Name"]
        );
        assert_eq!(merged.rows.len(), 2);
        assert!(merged.rows.len() <= assay.rows.len());
        assert_eq!(merged.rows[1], vec!["source1", "sample collection", "sample1", "extraction", "extract1b"]);
    }

    #[test]
    fn test_merge_without_sample_column_is_empty() {
        let study = Table::parse("s_study.txt", "Source Name\nsource1\n", false).unwrap();
        let assay = Table::parse("a_assay.txt", ASSAY, false).unwrap();
        assert!(merge_study_with_assay(&study, &assay).rows.is_empty());
    }
}

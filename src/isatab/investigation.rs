//! Investigation file (`i_*.txt`) reading and writing
//!
//! The file is a list of sections. A section starts with an all-uppercase
//! single-cell row (`STUDY PROTOCOLS`) and holds `<Label>\t<value>...`
//! rows, one value column per entity.

use crate::errors::{Code, Finding, ValidationReport};
use crate::labels::{bracketed, RX_COMMENT};
use crate::model::{
    Assay, Comment, Investigation, OntologyAnnotation, OntologySource, Person, Protocol, ProtocolComponent,
    ProtocolParameter, Publication, Study, StudyFactor,
};

use super::table::split_line;

pub const ONTOLOGY_SOURCE_REFERENCE: &str = "ONTOLOGY SOURCE REFERENCE";
pub const INVESTIGATION: &str = "INVESTIGATION";
pub const INVESTIGATION_PUBLICATIONS: &str = "INVESTIGATION PUBLICATIONS";
pub const INVESTIGATION_CONTACTS: &str = "INVESTIGATION CONTACTS";
pub const STUDY: &str = "STUDY";
pub const STUDY_DESIGN_DESCRIPTORS: &str = "STUDY DESIGN DESCRIPTORS";
pub const STUDY_PUBLICATIONS: &str = "STUDY PUBLICATIONS";
pub const STUDY_FACTORS: &str = "STUDY FACTORS";
pub const STUDY_ASSAYS: &str = "STUDY ASSAYS";
pub const STUDY_PROTOCOLS: &str = "STUDY PROTOCOLS";
pub const STUDY_CONTACTS: &str = "STUDY CONTACTS";

/// Sections every study block carries, in file order
pub const STUDY_SECTIONS: [&str; 7] = [
    STUDY,
    STUDY_DESIGN_DESCRIPTORS,
    STUDY_PUBLICATIONS,
    STUDY_FACTORS,
    STUDY_ASSAYS,
    STUDY_PROTOCOLS,
    STUDY_CONTACTS,
];

/// One `<Label>\t<values>` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRow {
    pub label: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    pub name: String,
    pub rows: Vec<SectionRow>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, values: Vec<String>) {
        self.rows.push(SectionRow {
            label: label.into(),
            values,
        });
    }

    pub fn row(&self, label: &str) -> Option<&SectionRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.row(label).is_some()
    }

    /// Cell of the `i`-th entity, empty when absent
    pub fn value(&self, label: &str, i: usize) -> &str {
        self.row(label)
            .and_then(|r| r.values.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Number of entities, ignoring trailing all-empty columns
    pub fn entity_count(&self) -> usize {
        let width = self.rows.iter().map(|r| r.values.len()).max().unwrap_or(0);
        (0..width)
            .rev()
            .find(|&i| {
                self.rows
                    .iter()
                    .any(|r| r.values.get(i).is_some_and(|v| !v.trim().is_empty()))
            })
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Comments of the `i`-th entity, empty values skipped
    pub fn comments(&self, i: usize) -> Vec<Comment> {
        self.rows
            .iter()
            .filter_map(|r| {
                let name = bracketed(&RX_COMMENT, &r.label)?;
                let value = r.values.get(i)?;
                (!value.is_empty()).then(|| Comment::new(name, value.clone()))
            })
            .collect()
    }

    fn normalized(&self) -> Section {
        let mut rows: Vec<SectionRow> = self
            .rows
            .iter()
            .map(|r| {
                let mut values = r.values.clone();
                while values.last().is_some_and(|v| v.is_empty()) {
                    values.pop();
                }
                SectionRow {
                    label: r.label.clone(),
                    values,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.label.cmp(&b.label));
        Section {
            name: self.name.clone(),
            rows,
        }
    }
}

/// Sections of an investigation file in file order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvestigationFile {
    pub sections: Vec<Section>,
}

impl InvestigationFile {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Study blocks: each `STUDY` section with the sections following it
    pub fn study_blocks(&self) -> Vec<Vec<&Section>> {
        let mut blocks: Vec<Vec<&Section>> = Vec::new();
        for section in &self.sections {
            if section.name == STUDY {
                blocks.push(vec![section]);
            } else if section.name.starts_with("STUDY ") {
                if let Some(block) = blocks.last_mut() {
                    block.push(section);
                }
            }
        }
        blocks
    }

    /// Rows sorted by label and trailing empty values dropped, for comparisons
    pub fn normalized(&self) -> InvestigationFile {
        InvestigationFile {
            sections: self.sections.iter().map(Section::normalized).collect(),
        }
    }

    pub fn to_tsv(&self, quote: bool) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&section.name);
            out.push('\n');
            for row in &section.rows {
                let mut cells = Vec::with_capacity(row.values.len() + 1);
                cells.push(row.label.clone());
                cells.extend(row.values.iter().map(|v| {
                    if quote {
                        format!("\"{}\"", v)
                    } else {
                        v.clone()
                    }
                }));
                out.push_str(&cells.join("\t"));
                out.push('\n');
            }
        }
        out
    }
}

fn is_section_header(cells: &[String]) -> bool {
    let filled: Vec<&String> = cells.iter().filter(|c| !c.trim().is_empty()).collect();
    filled.len() == 1
        && !cells[0].trim().is_empty()
        && cells[0]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == ' ')
}

/// Split investigation text into sections
///
/// Comment lines (`#`) and blank lines are skipped; rows before the first
/// section header are reported through the returned line numbers.
pub fn read_investigation_file(text: &str) -> (InvestigationFile, Vec<usize>) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut file = InvestigationFile::default();
    let mut orphans = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let cells = split_line(line, false);
        if is_section_header(&cells) {
            file.sections.push(Section::new(cells[0].trim()));
            continue;
        }
        match file.sections.last_mut() {
            Some(section) => {
                let mut cells = cells.into_iter();
                let label = cells.next().unwrap_or_default().trim().to_string();
                section.push(label, cells.collect());
            }
            None => orphans.push(n + 1),
        }
    }
    (file, orphans)
}

// ─────────────────────────────────────────────────────────────
// File -> model
// ─────────────────────────────────────────────────────────────

fn annotation(section: &Section, prefix: &str, i: usize) -> OntologyAnnotation {
    OntologyAnnotation::sourced(
        section.value(prefix, i),
        section.value(&format!("{} Term Source REF", prefix), i),
        section.value(&format!("{} Term Accession Number", prefix), i),
    )
}

/// `;`-joined annotation lists (roles, parameters, component types)
fn annotation_list(section: &Section, prefix: &str, i: usize) -> Vec<OntologyAnnotation> {
    let terms = split_list(section.value(prefix, i));
    let sources = split_list(section.value(&format!("{} Term Source REF", prefix), i));
    let accessions = split_list(section.value(&format!("{} Term Accession Number", prefix), i));
    terms
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_empty())
        .map(|(j, t)| {
            OntologyAnnotation::sourced(
                t.clone(),
                sources.get(j).cloned().unwrap_or_default(),
                accessions.get(j).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

fn split_list(cell: &str) -> Vec<String> {
    if cell.is_empty() {
        return Vec::new();
    }
    cell.split(';').map(|s| s.trim().to_string()).collect()
}

fn publications(section: Option<&Section>, prefix: &str) -> Vec<Publication> {
    let Some(section) = section else {
        return Vec::new();
    };
    (0..section.entity_count())
        .map(|i| {
            let status = annotation(section, &format!("{} Publication Status", prefix), i);
            Publication {
                pubmed_id: section.value(&format!("{} PubMed ID", prefix), i).to_string(),
                doi: section.value(&format!("{} Publication DOI", prefix), i).to_string(),
                author_list: section.value(&format!("{} Publication Author List", prefix), i).to_string(),
                title: section.value(&format!("{} Publication Title", prefix), i).to_string(),
                status: (!status.is_empty()).then_some(status),
                comments: section.comments(i),
            }
        })
        .collect()
}

fn contacts(section: Option<&Section>, prefix: &str) -> Vec<Person> {
    let Some(section) = section else {
        return Vec::new();
    };
    let v = |label: &str, i: usize| section.value(&format!("{} Person {}", prefix, label), i).to_string();
    (0..section.entity_count())
        .map(|i| Person {
            last_name: v("Last Name", i),
            first_name: v("First Name", i),
            mid_initials: v("Mid Initials", i),
            email: v("Email", i),
            phone: v("Phone", i),
            fax: v("Fax", i),
            address: v("Address", i),
            affiliation: v("Affiliation", i),
            roles: annotation_list(section, &format!("{} Person Roles", prefix), i),
            comments: section.comments(i),
        })
        .collect()
}

fn ontology_sources(section: Option<&Section>) -> Vec<OntologySource> {
    let Some(section) = section else {
        return Vec::new();
    };
    (0..section.entity_count())
        .map(|i| OntologySource {
            name: section.value("Term Source Name", i).to_string(),
            file: section.value("Term Source File", i).to_string(),
            version: section.value("Term Source Version", i).to_string(),
            description: section.value("Term Source Description", i).to_string(),
            comments: section.comments(i),
        })
        .collect()
}

fn protocols(section: Option<&Section>) -> Vec<Protocol> {
    let Some(section) = section else {
        return Vec::new();
    };
    (0..section.entity_count())
        .map(|i| {
            let mut protocol = Protocol::new(section.value("Study Protocol Name", i));
            let protocol_type = annotation(section, "Study Protocol Type", i);
            protocol.protocol_type = (!protocol_type.is_empty()).then_some(protocol_type);
            protocol.description = section.value("Study Protocol Description", i).to_string();
            protocol.uri = section.value("Study Protocol URI", i).to_string();
            protocol.version = section.value("Study Protocol Version", i).to_string();
            protocol.parameters = annotation_list(section, "Study Protocol Parameters Name", i)
                .into_iter()
                .map(ProtocolParameter::new)
                .collect();
            let component_types = annotation_list(section, "Study Protocol Components Type", i);
            protocol.components = split_list(section.value("Study Protocol Components Name", i))
                .into_iter()
                .filter(|n| !n.is_empty())
                .enumerate()
                .map(|(j, name)| ProtocolComponent {
                    name,
                    component_type: component_types.get(j).cloned(),
                    comments: Vec::new(),
                })
                .collect();
            protocol.comments = section.comments(i);
            protocol
        })
        .collect()
}

fn factors(section: Option<&Section>) -> Vec<StudyFactor> {
    let Some(section) = section else {
        return Vec::new();
    };
    (0..section.entity_count())
        .map(|i| {
            let mut factor = StudyFactor::new(section.value("Study Factor Name", i));
            let factor_type = annotation(section, "Study Factor Type", i);
            factor.factor_type = (!factor_type.is_empty()).then_some(factor_type);
            factor.comments = section.comments(i);
            factor
        })
        .collect()
}

fn assays(section: Option<&Section>) -> Vec<Assay> {
    let Some(section) = section else {
        return Vec::new();
    };
    (0..section.entity_count())
        .map(|i| {
            let mut assay = Assay::new(section.value("Study Assay File Name", i));
            assay.measurement_type = annotation(section, "Study Assay Measurement Type", i);
            assay.technology_type = annotation(section, "Study Assay Technology Type", i);
            assay.technology_platform = section.value("Study Assay Technology Platform", i).to_string();
            assay.comments = section.comments(i);
            assay
        })
        .collect()
}

fn design_descriptors(section: Option<&Section>) -> Vec<OntologyAnnotation> {
    let Some(section) = section else {
        return Vec::new();
    };
    (0..section.entity_count())
        .map(|i| {
            let mut oa = annotation(section, "Study Design Type", i);
            oa.comments = section.comments(i);
            oa
        })
        .collect()
}

/// Build the investigation-level model (no tables) from parsed sections
///
/// Missing sections are reported, not fatal.
pub fn parse_investigation(file: &InvestigationFile, report: &mut ValidationReport) -> Investigation {
    let mut investigation = Investigation::new();
    for required in [
        ONTOLOGY_SOURCE_REFERENCE,
        INVESTIGATION,
        INVESTIGATION_PUBLICATIONS,
        INVESTIGATION_CONTACTS,
    ] {
        if file.section(required).is_none() {
            report.add(Finding::new(
                Code::InvestigationLabelMissing,
                format!("Section {} is missing", required),
            ));
        }
    }

    investigation.ontology_source_references = ontology_sources(file.section(ONTOLOGY_SOURCE_REFERENCE));
    if let Some(section) = file.section(INVESTIGATION) {
        investigation.identifier = section.value("Investigation Identifier", 0).to_string();
        investigation.title = section.value("Investigation Title", 0).to_string();
        investigation.description = section.value("Investigation Description", 0).to_string();
        investigation.submission_date = section.value("Investigation Submission Date", 0).to_string();
        investigation.public_release_date = section.value("Investigation Public Release Date", 0).to_string();
        investigation.comments = section.comments(0);
    }
    investigation.publications = publications(file.section(INVESTIGATION_PUBLICATIONS), "Investigation");
    investigation.contacts = contacts(file.section(INVESTIGATION_CONTACTS), "Investigation");

    for block in file.study_blocks() {
        let find = |name: &str| block.iter().copied().find(|s| s.name == name);
        for name in STUDY_SECTIONS {
            if find(name).is_none() {
                report.add(Finding::new(
                    Code::InvestigationLabelMissing,
                    format!("Section {} is missing from a study block", name),
                ));
            }
        }
        let mut study = Study::default();
        if let Some(section) = find(STUDY) {
            study.identifier = section.value("Study Identifier", 0).to_string();
            study.title = section.value("Study Title", 0).to_string();
            study.description = section.value("Study Description", 0).to_string();
            study.submission_date = section.value("Study Submission Date", 0).to_string();
            study.public_release_date = section.value("Study Public Release Date", 0).to_string();
            study.filename = section.value("Study File Name", 0).to_string();
            study.comments = section.comments(0);
        }
        study.design_descriptors = design_descriptors(find(STUDY_DESIGN_DESCRIPTORS));
        study.publications = publications(find(STUDY_PUBLICATIONS), "Study");
        study.factors = factors(find(STUDY_FACTORS));
        study.assays = assays(find(STUDY_ASSAYS));
        study.protocols = protocols(find(STUDY_PROTOCOLS));
        study.contacts = contacts(find(STUDY_CONTACTS), "Study");
        tracing::debug!(
            study = %study.identifier,
            protocols = study.protocols.len(),
            assays = study.assays.len(),
            "parsed study block"
        );
        investigation.studies.push(study);
    }
    investigation
}

// ─────────────────────────────────────────────────────────────
// Model -> file
// ─────────────────────────────────────────────────────────────

/// Column-per-entity section builder
struct SectionBuilder {
    section: Section,
    width: usize,
}

impl SectionBuilder {
    fn new(name: &str, width: usize) -> Self {
        Self {
            section: Section::new(name),
            width,
        }
    }

    fn row<T>(&mut self, label: impl Into<String>, items: &[T], cell: impl Fn(&T) -> String) {
        let values = items.iter().map(cell).collect();
        self.section.push(label, values);
    }

    fn single(&mut self, label: &str, value: &str) {
        self.section.push(label, vec![value.to_string()]);
    }

    fn annotation_rows<T>(&mut self, prefix: &str, items: &[T], get: impl Fn(&T) -> Option<&OntologyAnnotation>) {
        self.row(prefix, items, |x| get(x).map(|a| a.term.clone()).unwrap_or_default());
        self.row(format!("{} Term Accession Number", prefix), items, |x| {
            get(x).map(|a| a.term_accession.clone()).unwrap_or_default()
        });
        self.row(format!("{} Term Source REF", prefix), items, |x| {
            get(x).map(|a| a.term_source.clone()).unwrap_or_default()
        });
    }

    fn list_rows<T>(&mut self, prefix: &str, items: &[T], get: impl Fn(&T) -> Vec<&OntologyAnnotation>) {
        let join = |v: Vec<String>| v.join(";");
        self.row(prefix, items, |x| join(get(x).iter().map(|a| a.term.clone()).collect()));
        self.row(format!("{} Term Accession Number", prefix), items, |x| {
            join(get(x).iter().map(|a| a.term_accession.clone()).collect())
        });
        self.row(format!("{} Term Source REF", prefix), items, |x| {
            join(get(x).iter().map(|a| a.term_source.clone()).collect())
        });
    }

    /// `Comment[...]` rows: union of names in first-appearance order
    fn comment_rows<T>(&mut self, items: &[T], get: impl Fn(&T) -> &[Comment]) {
        let mut names: Vec<&str> = Vec::new();
        for item in items {
            for c in get(item) {
                if !names.contains(&c.name.as_str()) {
                    names.push(&c.name);
                }
            }
        }
        for name in names {
            self.row(format!("Comment[{}]", name), items, |x| {
                get(x)
                    .iter()
                    .find(|c| c.name == name)
                    .map(|c| c.value.clone())
                    .unwrap_or_default()
            });
        }
    }

    fn finish(self) -> Section {
        debug_assert!(self.section.rows.iter().all(|r| r.values.len() == self.width));
        self.section
    }
}

fn publication_section(name: &str, prefix: &str, items: &[Publication]) -> Section {
    let mut b = SectionBuilder::new(name, items.len());
    b.row(format!("{} PubMed ID", prefix), items, |p| p.pubmed_id.clone());
    b.row(format!("{} Publication DOI", prefix), items, |p| p.doi.clone());
    b.row(format!("{} Publication Author List", prefix), items, |p| p.author_list.clone());
    b.row(format!("{} Publication Title", prefix), items, |p| p.title.clone());
    b.annotation_rows(&format!("{} Publication Status", prefix), items, |p| p.status.as_ref());
    b.comment_rows(items, |p| &p.comments);
    b.finish()
}

fn contact_section(name: &str, prefix: &str, items: &[Person]) -> Section {
    let mut b = SectionBuilder::new(name, items.len());
    let label = |l: &str| format!("{} Person {}", prefix, l);
    b.row(label("Last Name"), items, |p| p.last_name.clone());
    b.row(label("First Name"), items, |p| p.first_name.clone());
    b.row(label("Mid Initials"), items, |p| p.mid_initials.clone());
    b.row(label("Email"), items, |p| p.email.clone());
    b.row(label("Phone"), items, |p| p.phone.clone());
    b.row(label("Fax"), items, |p| p.fax.clone());
    b.row(label("Address"), items, |p| p.address.clone());
    b.row(label("Affiliation"), items, |p| p.affiliation.clone());
    b.list_rows(&label("Roles"), items, |p| p.roles.iter().collect());
    b.comment_rows(items, |p| &p.comments);
    b.finish()
}

/// Render the investigation file sections for a model
pub fn render_investigation(investigation: &Investigation) -> InvestigationFile {
    let mut file = InvestigationFile::default();

    let sources = &investigation.ontology_source_references;
    let mut b = SectionBuilder::new(ONTOLOGY_SOURCE_REFERENCE, sources.len());
    b.row("Term Source Name", sources, |s| s.name.clone());
    b.row("Term Source File", sources, |s| s.file.clone());
    b.row("Term Source Version", sources, |s| s.version.clone());
    b.row("Term Source Description", sources, |s| s.description.clone());
    b.comment_rows(sources, |s| &s.comments);
    file.sections.push(b.finish());

    let mut b = SectionBuilder::new(INVESTIGATION, 1);
    b.single("Investigation Identifier", &investigation.identifier);
    b.single("Investigation Title", &investigation.title);
    b.single("Investigation Description", &investigation.description);
    b.single("Investigation Submission Date", &investigation.submission_date);
    b.single("Investigation Public Release Date", &investigation.public_release_date);
    b.comment_rows(std::slice::from_ref(investigation), |i| &i.comments);
    file.sections.push(b.finish());

    file.sections.push(publication_section(
        INVESTIGATION_PUBLICATIONS,
        "Investigation",
        &investigation.publications,
    ));
    file.sections.push(contact_section(
        INVESTIGATION_CONTACTS,
        "Investigation",
        &investigation.contacts,
    ));

    for study in &investigation.studies {
        let mut b = SectionBuilder::new(STUDY, 1);
        b.single("Study Identifier", &study.identifier);
        b.single("Study Title", &study.title);
        b.single("Study Description", &study.description);
        b.single("Study Submission Date", &study.submission_date);
        b.single("Study Public Release Date", &study.public_release_date);
        b.single("Study File Name", &study.filename);
        b.comment_rows(std::slice::from_ref(study), |s| &s.comments);
        file.sections.push(b.finish());

        let descriptors = &study.design_descriptors;
        let mut b = SectionBuilder::new(STUDY_DESIGN_DESCRIPTORS, descriptors.len());
        b.annotation_rows("Study Design Type", descriptors, |d| Some(d));
        b.comment_rows(descriptors, |d| &d.comments);
        file.sections.push(b.finish());

        file.sections.push(publication_section(STUDY_PUBLICATIONS, "Study", &study.publications));

        let factors = &study.factors;
        let mut b = SectionBuilder::new(STUDY_FACTORS, factors.len());
        b.row("Study Factor Name", factors, |f| f.name.clone());
        b.annotation_rows("Study Factor Type", factors, |f| f.factor_type.as_ref());
        b.comment_rows(factors, |f| &f.comments);
        file.sections.push(b.finish());

        let assays = &study.assays;
        let mut b = SectionBuilder::new(STUDY_ASSAYS, assays.len());
        b.row("Study Assay File Name", assays, |a| a.filename.clone());
        b.annotation_rows("Study Assay Measurement Type", assays, |a| Some(&a.measurement_type));
        b.annotation_rows("Study Assay Technology Type", assays, |a| Some(&a.technology_type));
        b.row("Study Assay Technology Platform", assays, |a| a.technology_platform.clone());
        b.comment_rows(assays, |a| &a.comments);
        file.sections.push(b.finish());

        let protocols = &study.protocols;
        let mut b = SectionBuilder::new(STUDY_PROTOCOLS, protocols.len());
        b.row("Study Protocol Name", protocols, |p| p.name.clone());
        b.annotation_rows("Study Protocol Type", protocols, |p| p.protocol_type.as_ref());
        b.row("Study Protocol Description", protocols, |p| p.description.clone());
        b.row("Study Protocol URI", protocols, |p| p.uri.clone());
        b.row("Study Protocol Version", protocols, |p| p.version.clone());
        b.list_rows("Study Protocol Parameters Name", protocols, |p| {
            p.parameters.iter().map(|x| &x.name).collect()
        });
        b.row("Study Protocol Components Name", protocols, |p| {
            p.components
                .iter()
                .map(|c| c.name.clone())
                .collect::<Vec<_>>()
                .join(";")
        });
        b.list_rows("Study Protocol Components Type", protocols, |p| {
            p.components
                .iter()
                .filter_map(|c| c.component_type.as_ref())
                .collect()
        });
        b.comment_rows(protocols, |p| &p.comments);
        file.sections.push(b.finish());

        file.sections.push(contact_section(STUDY_CONTACTS, "Study", &study.contacts));
    }
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    const I_FILE: &str = "\
# exported by hand
ONTOLOGY SOURCE REFERENCE
Term Source Name\tOBI\tNCBITAXON\t
Term Source File\thttp://obi\thttp://ncbi\t
Term Source Version\t1\t2
Term Source Description\tOBI ontology\tNCBI taxonomy
INVESTIGATION
Investigation Identifier\tBII-I-1
Investigation Title\tGrowth control of the eukaryote cell
Investigation Description\t
Investigation Submission Date\t2007-04-30
Investigation Public Release Date\t2009-03-10
Comment[Created With Configuration]\tisaconfig
INVESTIGATION PUBLICATIONS
Investigation PubMed ID\t17439666
Investigation Publication DOI\tdoi:10.1186/jbiol54
Investigation Publication Author List\tCastrillo JI
Investigation Publication Title\tGrowth control
Investigation Publication Status\tpublished
Investigation Publication Status Term Accession Number\t
Investigation Publication Status Term Source REF\t
INVESTIGATION CONTACTS
Investigation Person Last Name\tOliver\tJuan
Investigation Person First Name\tStephen\tCastrillo
Investigation Person Mid Initials\tG
Investigation Person Email\t
Investigation Person Phone\t
Investigation Person Fax\t
Investigation Person Address\tOxford Road, Manchester
Investigation Person Affiliation\tFaculty of Life Sciences; Michael Smith Building
Investigation Person Roles\tcorresponding author;investigator\tauthor
Investigation Person Roles Term Accession Number\t;\t
Investigation Person Roles Term Source REF\t;\t
STUDY
Study Identifier\tBII-S-1
Study Title\tStudy of the impact of changes in flux
Study Description\t
Study Submission Date\t2007-04-30
Study Public Release Date\t2009-03-10
Study File Name\ts_BII-S-1.txt
STUDY DESIGN DESCRIPTORS
Study Design Type\tintervention design
Study Design Type Term Accession Number\tOBI:0000115
Study Design Type Term Source REF\tOBI
STUDY PUBLICATIONS
Study PubMed ID
Study Publication DOI
Study Publication Author List
Study Publication Title
Study Publication Status
Study Publication Status Term Accession Number
Study Publication Status Term Source REF
STUDY FACTORS
Study Factor Name\tlimiting nutrient\trate
Study Factor Type\tchemical compound\trate
Study Factor Type Term Accession Number\t\t
Study Factor Type Term Source REF\t\t
STUDY ASSAYS
Study Assay File Name\ta_proteome.txt
Study Assay Measurement Type\tprotein expression profiling
Study Assay Measurement Type Term Accession Number\t
Study Assay Measurement Type Term Source REF\tOBI
Study Assay Technology Type\tmass spectrometry
Study Assay Technology Type Term Accession Number\t
Study Assay Technology Type Term Source REF\tOBI
Study Assay Technology Platform\tiTRAQ
STUDY PROTOCOLS
Study Protocol Name\tgrowth protocol\tmetabolite extraction
Study Protocol Type\tgrowth\textraction
Study Protocol Type Term Accession Number\t\t
Study Protocol Type Term Source REF\t\tOBI
Study Protocol Description\t\t
Study Protocol URI\t\t
Study Protocol Version\t\t
Study Protocol Parameters Name\trate;volume\t
Study Protocol Parameters Name Term Accession Number\t;\t
Study Protocol Parameters Name Term Source REF\t;\t
Study Protocol Components Name\t\t
Study Protocol Components Type\t\t
Study Protocol Components Type Term Accession Number\t\t
Study Protocol Components Type Term Source REF\t\t
STUDY CONTACTS
Study Person Last Name\tOliver
Study Person First Name\tStephen
Study Person Mid Initials\tG
Study Person Email\t
Study Person Phone\t
Study Person Fax\t
Study Person Address\t
Study Person Affiliation\t
Study Person Roles\tcorresponding author
Study Person Roles Term Accession Number\t
Study Person Roles Term Source REF\t
";

    #[test]
    fn test_sections_detected_in_order() {
        let (file, orphans) = read_investigation_file(I_FILE);
        assert!(orphans.is_empty());
        let names: Vec<_> = file.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names[0], ONTOLOGY_SOURCE_REFERENCE);
        assert_eq!(names.len(), 4 + STUDY_SECTIONS.len());
        assert_eq!(file.study_blocks().len(), 1);
    }

    #[test]
    fn test_entity_count_ignores_trailing_blank_columns() {
        let (file, _) = read_investigation_file(I_FILE);
        assert_eq!(file.section(ONTOLOGY_SOURCE_REFERENCE).unwrap().entity_count(), 2);
        assert_eq!(file.section(STUDY_PUBLICATIONS).unwrap().entity_count(), 0);
    }

    #[test]
    fn test_parse_investigation_model() {
        let (file, _) = read_investigation_file(I_FILE);
        let mut report = ValidationReport::new("i_investigation.txt");
        let inv = parse_investigation(&file, &mut report);
        assert!(report.is_valid());
        assert!(!report.has_warnings());

        assert_eq!(inv.identifier, "BII-I-1");
        assert_eq!(inv.comments, vec![Comment::new("Created With Configuration", "isaconfig")]);
        assert_eq!(inv.ontology_source_references.len(), 2);
        assert_eq!(inv.contacts.len(), 2);
        assert_eq!(inv.contacts[0].roles.len(), 2);
        assert_eq!(inv.contacts[0].affiliation, "Faculty of Life Sciences; Michael Smith Building");

        let study = &inv.studies[0];
        assert_eq!(study.filename, "s_BII-S-1.txt");
        assert_eq!(study.design_descriptors[0].term_source, "OBI");
        assert_eq!(study.factors.len(), 2);
        assert_eq!(study.protocols[0].parameters.len(), 2);
        assert!(study.protocols[1].parameters.is_empty());
        assert_eq!(study.protocols[1].type_term(), "extraction");
        assert_eq!(study.assays[0].technology_type.term, "mass spectrometry");
        assert!(study.publications.is_empty());
    }

    #[test]
    fn test_render_then_read_is_stable() {
        let (file, _) = read_investigation_file(I_FILE);
        let mut report = ValidationReport::new("i.txt");
        let inv = parse_investigation(&file, &mut report);
        let rendered = render_investigation(&inv);
        let (reread, _) = read_investigation_file(&rendered.to_tsv(false));
        assert_eq!(reread.normalized(), rendered.normalized());

        let mut report = ValidationReport::new("i.txt");
        let again = parse_investigation(&reread, &mut report);
        assert_eq!(again.studies[0].protocols[0].parameters[1].name.term, "volume");
        assert_eq!(again.contacts[0].roles, inv.contacts[0].roles);
        assert_eq!(again.contacts[0].affiliation, "Faculty of Life Sciences; Michael Smith Building");
    }

    #[test]
    fn test_missing_section_is_reported() {
        let mut report = ValidationReport::new("i.txt");
        let (file, _) = read_investigation_file("INVESTIGATION\nInvestigation Identifier\tX\n");
        let inv = parse_investigation(&file, &mut report);
        assert_eq!(inv.identifier, "X");
        assert!(report.contains(Code::InvestigationLabelMissing));
    }

    #[test]
    fn test_comment_union_in_first_appearance_order() {
        let mut a = OntologySource::new("A");
        a.comments.push(Comment::new("second", "1"));
        let mut b = OntologySource::new("B");
        b.comments.push(Comment::new("first", "2"));
        b.comments.push(Comment::new("second", "3"));
        let mut inv = Investigation::new();
        inv.ontology_source_references = vec![a, b];
        let file = render_investigation(&inv);
        let section = file.section(ONTOLOGY_SOURCE_REFERENCE).unwrap();
        let labels: Vec<_> = section.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(&labels[4..], &["Comment[second]", "Comment[first]"]);
        assert_eq!(section.value("Comment[first]", 0), "");
        assert_eq!(section.value("Comment[second]", 1), "3");
    }
}

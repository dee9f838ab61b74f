//! Rectangular tab-separated tables (study and assay files)

use std::path::Path;

use crate::error::IsaError;

/// Read a file as UTF-8 text, dropping a leading byte-order mark
pub fn read_utf8(path: &Path) -> Result<String, IsaError> {
    if !path.exists() {
        return Err(IsaError::TableNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|_| IsaError::NotUtf8 {
        path: path.to_path_buf(),
    })?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Strip one pair of surrounding double quotes
pub fn unquote(cell: &str) -> &str {
    let trimmed = cell.trim_end_matches(['\r', '\n']);
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Split one line into cells
pub fn split_line(line: &str, keep_quotes: bool) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split('\t')
        .map(|c| if keep_quotes { c.to_string() } else { unquote(c).to_string() })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    /// File name the table was read from or will be written to
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            name: name.into(),
            header,
            rows: Vec::new(),
        }
    }

    /// Parse tab-separated text; rows are padded or cut to the header width
    pub fn parse(name: &str, text: &str, keep_quotes: bool) -> Result<Self, IsaError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = match lines.next() {
            Some(line) => split_line(line, keep_quotes),
            None => {
                return Err(IsaError::EmptyTable {
                    file: name.to_string(),
                })
            }
        };
        let width = header.len();
        let rows = lines
            .map(|line| {
                let mut row = split_line(line, keep_quotes);
                row.resize(width, String::new());
                row
            })
            .collect();
        Ok(Self {
            name: name.to_string(),
            header,
            rows,
        })
    }

    pub fn read(path: &Path, keep_quotes: bool) -> Result<Self, IsaError> {
        let text = read_utf8(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&name, &text, keep_quotes)
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// First column with this exact label
    pub fn column(&self, label: &str) -> Option<usize> {
        self.header.iter().position(|h| h == label)
    }

    /// Every column with this exact label
    pub fn columns(&self, label: &str) -> Vec<usize> {
        self.header
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_str() == label)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Stable sort by the first cell, drop repeated rows, drop empty columns
    pub fn normalize(&mut self) {
        self.rows.sort_by(|a, b| a.first().cmp(&b.first()));
        let mut seen = std::collections::HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));

        let keep: Vec<bool> = (0..self.width())
            .map(|c| self.rows.iter().any(|r| r.get(c).is_some_and(|v| !v.is_empty())))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }
        let filter = |cells: &mut Vec<String>| {
            let mut i = 0;
            cells.retain(|_| {
                let k = keep.get(i).copied().unwrap_or(false);
                i += 1;
                k
            });
        };
        filter(&mut self.header);
        for row in &mut self.rows {
            filter(row);
        }
    }

    pub fn to_tsv(&self, quote: bool) -> String {
        let render = |cells: &[String]| -> String {
            if quote {
                cells
                    .iter()
                    .map(|c| format!("\"{}\"", c))
                    .collect::<Vec<_>>()
                    .join("\t")
            } else {
                cells.join("\t")
            }
        };
        let mut out = render(&self.header);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&render(row));
            out.push('\n');
        }
        out
    }

    pub fn write(&self, path: &Path, quote: bool) -> Result<(), IsaError> {
        std::fs::write(path, self.to_tsv(quote))?;
        tracing::debug!(file = %path.display(), rows = self.rows.len(), "wrote table");
        Ok(())
    }
}

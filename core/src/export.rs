use crate::error::{Result, VocabError};
use crate::index::{TermCategory, TermInfo};
use crate::vocabulary::VocabularyIndex;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = VocabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "txt" => Ok(Self::Txt),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(VocabError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Serialize)]
struct ExportedTerm<'a> {
    term: &'a str,
    weight: f64,
    document_freq: usize,
    total_freq: usize,
    category: TermCategory,
    last_seen: String,
}

fn timestamp(t: &TermInfo) -> String {
    t.last_seen.format(&Rfc3339).unwrap_or_default()
}

/// Render terms in the given format.
pub fn render_terms(terms: &[TermInfo], format: ExportFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        ExportFormat::Txt => {
            for t in terms {
                let _ = writeln!(
                    out,
                    "{}\t{:.6}\t{}\t{}\t{}",
                    t.term, t.weight, t.document_freq, t.total_freq, t.category
                );
            }
        }
        ExportFormat::Csv => {
            out.push_str("term,weight,document_freq,total_freq,category,last_seen\n");
            for t in terms {
                let _ = writeln!(
                    out,
                    "{},{:.6},{},{},{},{}",
                    t.term,
                    t.weight,
                    t.document_freq,
                    t.total_freq,
                    t.category,
                    timestamp(t)
                );
            }
        }
        ExportFormat::Json => {
            let rows: Vec<ExportedTerm<'_>> = terms
                .iter()
                .map(|t| ExportedTerm {
                    term: &t.term,
                    weight: t.weight,
                    document_freq: t.document_freq,
                    total_freq: t.total_freq,
                    category: t.category,
                    last_seen: timestamp(t),
                })
                .collect();
            out = serde_json::to_string_pretty(&rows).map_err(|e| VocabError::Encode(e.to_string()))?;
            out.push('\n');
        }
    }
    Ok(out)
}

/// Write the top `limit` terms (all of them when `limit == 0`) to `path`.
/// Returns the number of terms written.
pub fn export_vocabulary<P: AsRef<Path>>(
    index: &VocabularyIndex,
    path: P,
    format: ExportFormat,
    limit: usize,
) -> Result<usize> {
    let limit = if limit == 0 { usize::MAX } else { limit };
    let terms = index.get_top_terms(limit, None);
    let content = render_terms(&terms, format)?;
    let path = path.as_ref();
    fs::write(path, content).map_err(|e| VocabError::io(path, e))?;
    tracing::info!(path = %path.display(), terms = terms.len(), ?format, "exported vocabulary");
    Ok(terms.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use time::OffsetDateTime;

    fn term(name: &str, weight: f64) -> TermInfo {
        TermInfo {
            term: name.to_string(),
            document_freq: 1,
            total_freq: 2,
            documents: BTreeMap::new(),
            positions: BTreeMap::new(),
            last_seen: OffsetDateTime::UNIX_EPOCH,
            weight,
            category: TermCategory::General,
        }
    }

    #[test]
    fn parses_known_formats_only() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!("xml".parse::<ExportFormat>(), Err(VocabError::UnsupportedFormat(_))));
    }

    #[test]
    fn txt_and_csv_layouts() {
        let terms = vec![term("parser", 1.5)];
        let txt = render_terms(&terms, ExportFormat::Txt).unwrap();
        assert_eq!(txt, "parser\t1.500000\t1\t2\tgeneral\n");

        let csv = render_terms(&terms, ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "term,weight,document_freq,total_freq,category,last_seen");
        assert_eq!(lines[1], "parser,1.500000,1,2,general,1970-01-01T00:00:00Z");
    }

    #[test]
    fn json_is_an_array_of_objects() {
        let json = render_terms(&[term("lexer", 0.25)], ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["term"], "lexer");
        assert_eq!(value[0]["category"], "general");
    }
}

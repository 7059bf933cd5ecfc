//! Batch processing
//!
//! Reads expression files (one expression per line, `#` and `//` comment
//! lines skipped), analyzes every expression and exports the results as
//! text, CSV or JSON.

use crate::render::Renderer;
use crate::{AnalysisResult, Analyzer, Status};
use lexparse_core::{format, LexparseError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Accepted input file extensions
pub const INPUT_EXTENSIONS: &[&str] = &["txt", "expr"];

/// Supported export formats
pub const EXPORT_FORMATS: &[&str] = &["txt", "csv", "json"];

const RULE: &str = "================================================================================";

/// One expression with its 1-based source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionLine {
    pub expression: String,
    pub line_number: usize,
}

/// Extract expressions from file content
pub fn parse_expression_lines(content: &str) -> Vec<ExpressionLine> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                return None;
            }
            Some(ExpressionLine {
                expression: line.to_string(),
                line_number: i + 1,
            })
        })
        .collect()
}

/// Read expressions from a `.txt` or `.expr` file
pub fn read_expressions(path: impl AsRef<Path>) -> Result<Vec<ExpressionLine>> {
    let path = path.as_ref();
    let ext = extension_of(path);
    if !INPUT_EXTENSIONS.contains(&ext.as_str()) {
        warn!(path = %path.display(), "unsupported input file");
        return Err(LexparseError::unsupported_format(ext, INPUT_EXTENSIONS));
    }

    let content = std::fs::read_to_string(path).map_err(|e| LexparseError::io(path, e))?;
    let lines = parse_expression_lines(&content);
    info!(path = %path.display(), expressions = lines.len(), "read expression file");
    Ok(lines)
}

/// One analyzed line of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub line_number: usize,
    pub result: AnalysisResult,
}

pub fn analyze_all(analyzer: &Analyzer, lines: &[ExpressionLine]) -> Vec<BatchEntry> {
    lines
        .iter()
        .map(|line| BatchEntry {
            line_number: line.line_number,
            result: analyzer.analyze(&line.expression),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl BatchSummary {
    pub fn accepted_percent(&self) -> f64 {
        percent(self.accepted, self.total)
    }

    pub fn rejected_percent(&self) -> f64 {
        percent(self.rejected, self.total)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

pub fn summarize(entries: &[BatchEntry]) -> BatchSummary {
    let accepted = entries.iter().filter(|e| e.result.is_accepted()).count();
    BatchSummary {
        total: entries.len(),
        accepted,
        rejected: entries.len() - accepted,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = LexparseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "txt" => Ok(ExportFormat::Txt),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(LexparseError::unsupported_format(s, EXPORT_FORMATS)),
        }
    }
}

impl ExportFormat {
    /// Format implied by a file extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        extension_of(path.as_ref()).parse()
    }
}

/// Flat per-expression record used by the CSV and JSON exports
#[derive(Debug, Clone, Serialize)]
struct ExportRecord<'a> {
    expression: &'a str,
    line_number: usize,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<String>,
    token_count: usize,
    unique_symbols: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> ExportRecord<'a> {
    fn new(entry: &'a BatchEntry) -> Self {
        let result = &entry.result;
        Self {
            expression: &result.source,
            line_number: entry.line_number,
            status: result.status(),
            tree: result.tree.as_ref().map(|t| t.to_string()),
            // EOF is not counted
            token_count: result.tokens.iter().filter(|t| !t.is_eof()).count(),
            unique_symbols: result.symbols.len(),
            error: result.first_error(),
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    metadata: BatchSummary,
    results: Vec<ExportRecord<'a>>,
}

pub fn export_to_string(entries: &[BatchEntry], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Txt => Ok(export_txt(entries)),
        ExportFormat::Csv => Ok(export_csv(entries)),
        ExportFormat::Json => {
            let export = JsonExport {
                metadata: summarize(entries),
                results: entries.iter().map(ExportRecord::new).collect(),
            };
            Ok(serde_json::to_string_pretty(&export)?)
        }
    }
}

/// Write `entries` to `path` in the given format
pub fn export(entries: &[BatchEntry], path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    let content = export_to_string(entries, format)?;
    std::fs::write(path, content).map_err(|e| LexparseError::io(path, e))?;
    info!(path = %path.display(), entries = entries.len(), ?format, "exported batch results");
    Ok(())
}

fn export_txt(entries: &[BatchEntry]) -> String {
    let renderer = Renderer::new();
    let summary = summarize(entries);
    let mut out = String::new();

    out.push_str(&format!("{}\n", RULE));
    out.push_str("EXPRESSION ANALYSIS - BATCH RESULTS\n");
    out.push_str(&format!("Total expressions: {}\n", summary.total));
    out.push_str(&format!("{}\n", RULE));

    for (i, entry) in entries.iter().enumerate() {
        let result = &entry.result;
        out.push_str(&format!("\n{}\n", RULE));
        out.push_str(&format!("EXPRESSION #{}\n", i + 1));
        out.push_str(&format!("{}\n", RULE));
        out.push_str(&format!("Input: {}\n", result.source));
        out.push_str(&format!("Source Line: {}\n", entry.line_number));
        out.push_str(&format!("Status: {}\n", result.status()));

        match (result.status(), &result.tree) {
            (Status::Accepted, Some(tree)) => {
                out.push_str(&format!("Tree: {}\n", tree));
                out.push_str(&format!("\nSymbol Table:\n{}\n", "-".repeat(40)));
                out.push_str(&renderer.render_symbols(&result.symbols));
                out.push_str(&format!("\nParse Tree:\n{}\n", "-".repeat(40)));
                out.push_str(&renderer.render_tree(tree));
            }
            _ => {
                for d in &result.diagnostics {
                    out.push_str(&format!("Error: {}\n", format(d)));
                }
            }
        }
    }

    out.push_str(&format!("\n{}\n", RULE));
    out.push_str("SUMMARY\n");
    out.push_str(&format!("{}\n", RULE));
    out.push_str(&format!("Total expressions: {}\n", summary.total));
    out.push_str(&format!("Accepted: {} ({:.1}%)\n", summary.accepted, summary.accepted_percent()));
    out.push_str(&format!("Rejected: {} ({:.1}%)\n", summary.rejected, summary.rejected_percent()));
    out
}

fn export_csv(entries: &[BatchEntry]) -> String {
    let mut out = String::from("Expression,Line Number,Status,Tree,Token Count,Unique Symbols,Error\n");
    for entry in entries {
        let record = ExportRecord::new(entry);
        let fields = [
            csv_field(record.expression),
            record.line_number.to_string(),
            record.status.to_string(),
            csv_field(record.tree.as_deref().unwrap_or("")),
            record.token_count.to_string(),
            record.unique_symbols.to_string(),
            csv_field(record.error.as_deref().unwrap_or("")),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Quote a CSV field when it contains a delimiter, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Contents of a starter expression file
pub fn sample_file_contents() -> String {
    let lines = [
        "# Sample input file for the expression analyzer",
        "# Lines starting with # or // are comments",
        "# Each line holds one expression",
        "",
        "# Valid expressions",
        "3+4*5",
        "a+b",
        "(1+2)*3",
        "x",
        "(a+b)*(c+d)",
        "1*2*3*4",
        "((1+2)+(3+4))*5",
        "2 ^ 3 ^ 2",
        "",
        "// Invalid expressions",
        "3+",
        "3**4",
        "(1+2",
        ")",
        "+3 )",
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

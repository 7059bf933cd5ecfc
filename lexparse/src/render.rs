//! Plain-text renderer
//!
//! Turns analysis artifacts into text for terminals and tool responses.
//! Tables use markdown pipe syntax.

use crate::ast::ParseNode;
use crate::parser::ParseStep;
use crate::symbols::{SymbolEntry, SymbolStats};
use crate::AnalysisResult;
use lexparse_core::{Diagnostic, Token};

/// Positions listed per symbol before eliding the rest
const MAX_LISTED_POSITIONS: usize = 5;

/// Analysis renderer
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Hierarchical tree with box-drawing connectors
    pub fn render_tree(&self, root: &ParseNode) -> String {
        let mut output = root.label();
        output.push('\n');
        self.render_children(root, "", &mut output);
        output
    }

    fn render_children(&self, node: &ParseNode, prefix: &str, output: &mut String) {
        let children = node.children();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate() {
            let (branch, indent) = if i == last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            output.push_str(&format!("{}{}{}\n", prefix, branch, child.label()));
            self.render_children(child, &format!("{}{}", prefix, indent), output);
        }
    }

    pub fn render_tokens(&self, tokens: &[Token]) -> String {
        let mut output = String::new();
        output.push_str("| # | kind | lexeme | position | line:col |\n");
        output.push_str("|---|------|--------|----------|----------|\n");
        for (i, token) in tokens.iter().enumerate() {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {}:{} |\n",
                i + 1,
                token.kind,
                escape_cell(&token.lexeme),
                token.position,
                token.line,
                token.column
            ));
        }
        output
    }

    /// Symbol table followed by a statistics block
    pub fn render_symbols(&self, symbols: &[SymbolEntry]) -> String {
        if symbols.is_empty() {
            return "(no symbols)\n".to_string();
        }

        let mut output = String::new();
        output.push_str("| name | kind | count | first | positions | attributes |\n");
        output.push_str("|------|------|-------|-------|-----------|------------|\n");
        for entry in symbols {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                escape_cell(&entry.name),
                entry.kind,
                entry.occurrence_count,
                entry.first_position,
                self.render_positions(&entry.positions),
                entry.attributes
            ));
        }

        let stats = SymbolStats::from_entries(symbols);
        output.push_str("\nStatistics:\n");
        output.push_str(&format!("  total occurrences: {}\n", stats.total_occurrences));
        output.push_str(&format!("  unique symbols:    {}\n", stats.unique));
        output.push_str(&format!("  identifiers:       {}\n", stats.identifiers));
        output.push_str(&format!("  operators:         {}\n", stats.operators));
        output.push_str(&format!("  numbers:           {}\n", stats.numbers));
        output
    }

    fn render_positions(&self, positions: &[usize]) -> String {
        let listed: Vec<String> = positions
            .iter()
            .take(MAX_LISTED_POSITIONS)
            .map(|p| p.to_string())
            .collect();
        let mut out = listed.join(", ");
        if positions.len() > MAX_LISTED_POSITIONS {
            out.push_str(&format!(" (+{} more)", positions.len() - MAX_LISTED_POSITIONS));
        }
        out
    }

    /// Numbered derivation trace, indented by rule depth
    pub fn render_steps(&self, steps: &[ParseStep]) -> String {
        let mut output = String::new();
        for (i, step) in steps.iter().enumerate() {
            output.push_str(&format!(
                "{:>3}. {}{}\n",
                i + 1,
                "  ".repeat(step.depth),
                step.description
            ));
        }
        output
    }

    pub fn render_diagnostics(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| format!("- {}\n", d))
            .collect()
    }

    /// Full report: status, tokens, symbols, tree, steps and diagnostics
    pub fn render_report(&self, result: &AnalysisResult) -> String {
        let mut output = String::new();
        output.push_str(&format!("Expression: {}\n", result.source));
        output.push_str(&format!("Status: {}\n\n", result.status()));

        output.push_str(&format!("## Tokens ({})\n\n", result.tokens.len()));
        output.push_str(&self.render_tokens(&result.tokens));
        output.push('\n');

        output.push_str(&format!("## Symbols ({})\n\n", result.symbols.len()));
        output.push_str(&self.render_symbols(&result.symbols));
        output.push('\n');

        output.push_str("## Parse Tree\n\n");
        match result.tree {
            Some(ref tree) => {
                output.push_str(&self.render_tree(tree));
                output.push_str(&format!(
                    "\nS-expression: {}\ndepth: {}, nodes: {}\n",
                    tree, tree.depth(), tree.node_count()
                ));
            }
            None => output.push_str("(no tree)\n"),
        }

        if !result.steps.is_empty() {
            output.push_str("\n## Derivation\n\n");
            output.push_str(&self.render_steps(&result.steps));
        }

        if !result.diagnostics.is_empty() {
            output.push_str(&format!("\n## Diagnostics ({})\n\n", result.diagnostics.len()));
            output.push_str(&self.render_diagnostics(&result.diagnostics));
        }

        output
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep `|` lexemes from breaking the table
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

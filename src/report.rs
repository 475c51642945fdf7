//! Output formatting for stacklens results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the serialized result, for programmatic consumption

use colored::*;
use serde::Serialize;
use serde_json::Value;

use crate::analysis::CodebaseAnalysis;
use crate::features::{FeatureKind, GapReport};
use crate::stack::{Language, Stack};

/// Default number of sample records shown per category.
pub const DEFAULT_SAMPLES: usize = 5;

// =============================================================================
// JSON Format
// =============================================================================

/// Serialize any result as pretty-printed JSON.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write a result to stdout as JSON.
pub fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn header(out: &mut String, label: &str, path: &str) {
    out.push('\n');
    out.push_str(&format!(
        "  {} v{}\n\n",
        "stacklens".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    ));
    out.push_str(&format!("  {}{}\n", format!("{:<11}", label).dimmed(), path));
}

fn stack_line(out: &mut String, stack: &Stack) {
    let text = stack.to_string();
    let colored = if stack.language == Language::Unknown {
        text.yellow()
    } else {
        text.green().bold()
    };
    out.push_str(&format!("  {}{}\n", format!("{:<11}", "Stack:").dimmed(), colored));
}

/// Print `items` under a titled heading, at most `samples` of them.
fn section<T>(out: &mut String, title: &str, items: &[T], samples: usize, line: impl Fn(&T) -> String) {
    out.push_str(&format!("  {} ({}):\n", title.bold(), items.len()));
    for item in items.iter().take(samples) {
        out.push_str(&format!("    {}\n", line(item)));
    }
    if items.len() > samples {
        out.push_str(&format!(
            "    {}\n",
            format!("... and {} more", items.len() - samples).dimmed()
        ));
    }
    out.push('\n');
}

fn config_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(config_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Render an analysis for the terminal.
pub fn render_analysis(analysis: &CodebaseAnalysis, samples: usize) -> String {
    let mut out = String::new();
    header(&mut out, "Analyzing:", &analysis.path);
    stack_line(&mut out, &analysis.stack());
    out.push('\n');

    let summary: Vec<String> = analysis
        .counts()
        .iter()
        .map(|(name, n)| format!("{} {}", n.to_string().bold(), name))
        .collect();
    out.push_str(&format!("  {}\n\n", summary.join("  ")));

    section(&mut out, "Routes", &analysis.routes, samples, |r| {
        let handler = r.handler.as_deref().map(|h| format!("  {}", h.dimmed())).unwrap_or_default();
        format!("{:<7} {}{}  {}", r.method.cyan(), r.path, handler, r.file.blue())
    });
    section(&mut out, "Models", &analysis.models, samples, |m| {
        let plural = if m.fields.len() != 1 { "s" } else { "" };
        format!(
            "{:<24} {}  {}",
            m.name,
            format!("{} field{}", m.fields.len(), plural).dimmed(),
            m.file.blue()
        )
    });
    section(&mut out, "Controllers", &analysis.controllers, samples, |c| {
        format!("{:<24} {}  {}", c.name, c.actions.join(", ").dimmed(), c.file.blue())
    });
    section(&mut out, "Components", &analysis.components, samples, |c| {
        let props = if c.props.is_empty() {
            String::new()
        } else {
            format!("props: {}", c.props.join(", "))
        };
        format!("{:<24} {}  {}", c.name, props.dimmed(), c.file.blue())
    });
    section(&mut out, "Services", &analysis.services, samples, |s| {
        format!("{:<24} {}  {}", s.name, s.functions.join(", ").dimmed(), s.file.blue())
    });

    if !analysis.config.is_empty() {
        out.push_str(&format!("  {}\n", "Config:".bold()));
        for (key, value) in &analysis.config {
            out.push_str(&format!("    {:<16} {}\n", key, config_value(value)));
        }
        out.push('\n');
    }

    match &analysis.readme {
        Some(readme) => out.push_str(&format!(
            "  {} {}\n",
            "README:".bold(),
            format!("{} lines", readme.lines().count()).dimmed()
        )),
        None => out.push_str(&format!("  {} {}\n", "README:".bold(), "none".dimmed())),
    }
    out
}

/// Render a stack classification for the terminal.
pub fn render_stack(path: &str, stack: &Stack) -> String {
    let mut out = String::new();
    header(&mut out, "Detecting:", path);
    stack_line(&mut out, stack);
    out
}

fn kind_tag(kind: FeatureKind) -> ColoredString {
    match kind {
        FeatureKind::Route => "ROUTE ".cyan(),
        FeatureKind::Entity => "ENTITY".magenta(),
        FeatureKind::Interaction => "ACTION".yellow(),
    }
}

/// Render a gap report for the terminal.
pub fn render_gaps(path: &str, report: &GapReport) -> String {
    let mut out = String::new();
    header(&mut out, "Checking:", path);
    out.push_str(&format!(
        "  {}{}\n\n",
        format!("{:<11}", "Documents:").dimmed(),
        report.documents
    ));

    out.push_str(&format!(
        "  {} features, {} undocumented\n\n",
        report.features.len().to_string().bold(),
        report.gaps.len().to_string().bold()
    ));

    if !report.gaps.is_empty() {
        out.push_str(&format!("  {} ({}):\n\n", "Gaps".bold(), report.gaps.len()));
        for gap in &report.gaps {
            out.push_str(&format!("    {}  {:<24} {}\n", kind_tag(gap.kind), gap.name, gap.origin.blue()));
        }
        out.push('\n');
    }

    if report.gaps.is_empty() {
        out.push_str(&format!("  {}\n", "✓ All features documented".green()));
    } else {
        out.push_str(&format!(
            "  {}\n",
            format!("✗ {} feature(s) without documentation", report.gaps.len()).red()
        ));
    }
    out
}

pub fn write_analysis_pretty(analysis: &CodebaseAnalysis, samples: usize) {
    print!("{}", render_analysis(analysis, samples));
    println!();
}

pub fn write_stack_pretty(path: &str, stack: &Stack) {
    print!("{}", render_stack(path, stack));
    println!();
}

pub fn write_gaps_pretty(path: &str, report: &GapReport) {
    print!("{}", render_gaps(path, report));
    println!();
}

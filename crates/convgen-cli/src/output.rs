//! Output formatting and writing utilities
//!
//! This module provides utilities for formatting and writing output
//! in various formats (JSON, YAML, human-readable) with specialized
//! rendering for generated mappers, check summaries and parsed tags.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use convgen_core::generation::steps::{
    Adapt, Argument, Callee, Expr, Invocation, Operand, Place, SynthesisStep,
};
use convgen_core::{Directive, GeneratedMapper, TransformRef};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// Condensed view of one generated interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub interface: String,
    pub implementation: String,
    pub units: usize,
    pub entry_points: usize,
    pub transforms: usize,
    /// Fallible signatures with the field that made them fallible
    pub fallible_signatures: Vec<FallibleSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallibleSignature {
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,
}

impl CheckSummary {
    pub fn from_mapper(mapper: &GeneratedMapper) -> Self {
        Self {
            interface: mapper.interface.to_string(),
            implementation: mapper.implementation.clone(),
            units: mapper.metadata.unit_count,
            entry_points: mapper.metadata.entry_point_count,
            transforms: mapper.metadata.transform_count,
            fallible_signatures: mapper
                .signatures
                .iter()
                .filter(|record| record.fallible)
                .map(|record| FallibleSignature {
                    signature: record.signature.to_string(),
                    culprit: record.culprit.clone(),
                })
                .collect(),
        }
    }
}

/// Result of parsing a single tag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagReport {
    pub raw: String,
    pub directive: Option<Directive>,
}

/// Trait for formatting output with specialized support for common types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a generated mapper; `detailed` adds the synthesized steps
    fn format_mapper(&self, mapper: &GeneratedMapper, detailed: bool) -> Result<String>;

    /// Format a parsed tag
    fn format_tag(&self, report: &TagReport) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Human => {
                // For human format, use pretty JSON as fallback
                Ok(serde_json::to_string_pretty(value)?)
            }
        }
    }

    fn format_mapper(&self, mapper: &GeneratedMapper, detailed: bool) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_mapper_human(mapper, detailed)),
            _ => self.format(mapper),
        }
    }

    fn format_tag(&self, report: &TagReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_tag_human(report)),
            _ => self.format(report),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    verbose: u8,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            format,
            use_color,
            show_progress: !quiet && format == OutputFormat::Human && io::stderr().is_terminal(),
            quiet,
            verbose,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        verbose: u8,
        writer: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            use_color,
            show_progress: false, // No progress bars with custom writers
            quiet,
            verbose,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Check if verbose output should be shown
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        debug!("Output info: {}", message);

        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let formatted = self.format.format(value)?;
        trace!(bytes = formatted.len(), "Outputting data");

        if formatted.ends_with('\n') {
            self.write(&formatted)
        } else {
            self.writeln(&formatted)
        }
    }

    /// Write a generated mapper
    pub fn mapper(&mut self, mapper: &GeneratedMapper, detailed: bool) -> Result<()> {
        let formatted = self.format.format_mapper(mapper, detailed)?;
        self.write_block(&formatted)
    }

    /// Write a parsed tag
    pub fn tag(&mut self, report: &TagReport) -> Result<()> {
        let formatted = self.format.format_tag(report)?;
        self.write_block(&formatted)
    }

    fn write_block(&mut self, formatted: &str) -> Result<()> {
        if formatted.ends_with('\n') {
            self.write(formatted)
        } else {
            self.writeln(formatted)
        }
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(default_spinner_style());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        // Calculate column widths
        let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let header_row = headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" │ ");

        if self.use_color {
            self.writeln(&header_row.bold().to_string())?;
        } else {
            self.writeln(&header_row)?;
        }

        let separator = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        self.writeln(&separator)?;

        for row in rows {
            let row_str = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i < widths.len() {
                        format!("{:width$}", cell, width = widths[i])
                    } else {
                        cell.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" │ ");
            self.writeln(row_str.trim_end())?;
        }

        Ok(())
    }
}

/// Helper function to create a spinner style
pub fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Format a generated mapper for human reading
fn format_mapper_human(mapper: &GeneratedMapper, detailed: bool) -> String {
    let mut output = String::new();
    let receiver = mapper.receiver.as_str();

    let _ = writeln!(
        output,
        "═══ {} → {} ═══\n",
        mapper.interface.short(),
        mapper.implementation
    );
    let _ = writeln!(output, "Constructor: {}", mapper.constructor);
    let _ = writeln!(
        output,
        "Units: {}  Entry points: {}  Transforms: {}  Fallible signatures: {}",
        mapper.metadata.unit_count,
        mapper.metadata.entry_point_count,
        mapper.metadata.transform_count,
        mapper.metadata.fallible_signature_count
    );

    if !mapper.dependencies.is_empty() {
        output.push_str("\nDependencies:\n");
        for (name, identity) in &mapper.dependencies {
            let _ = writeln!(output, "  {}: {}", name, identity);
        }
    }

    output.push_str("\nEntry points:\n");
    for entry in &mapper.entry_points {
        let source = if entry.variadic {
            format!("...{}", entry.source)
        } else {
            entry.source.to_string()
        };
        let _ = writeln!(
            output,
            "  {}({}) -> {}{}  [{}]",
            entry.name,
            source,
            entry.destination,
            if entry.fallible { ", error" } else { "" },
            entry.unit
        );
        if detailed {
            render_steps(&entry.steps, receiver, 2, &mut output);
        }
    }

    output.push_str("\nUnits:\n");
    for unit in &mapper.units {
        let _ = writeln!(
            output,
            "  {}  ({}{}, {} reference{})",
            unit.name,
            unit.signature,
            if unit.fallible { ", fallible" } else { "" },
            unit.references,
            if unit.references == 1 { "" } else { "s" }
        );
        for plan in &unit.fields {
            let route = plan
                .route()
                .map(|link| link.name())
                .collect::<Vec<_>>()
                .join(" → ");
            let _ = writeln!(
                output,
                "    {}: {}{}",
                plan.destination.name,
                route,
                if plan.fallible { " (fallible)" } else { "" }
            );
            if detailed {
                render_steps(&plan.steps, receiver, 3, &mut output);
            }
        }
        if !unit.skipped.is_empty() {
            let _ = writeln!(output, "    skipped: {}", unit.skipped.join(", "));
        }
    }

    output
}

/// Render steps as indented pseudo-code
fn render_steps(steps: &[SynthesisStep], receiver: &str, depth: usize, output: &mut String) {
    let indent = "    ".repeat(depth);
    for step in steps {
        match step {
            SynthesisStep::Assign { target, value } => {
                let _ = writeln!(
                    output,
                    "{}{} = {}",
                    indent,
                    place(target),
                    expr(value, receiver)
                );
            }
            SynthesisStep::CheckedAssign { target, call } => {
                let _ = writeln!(
                    output,
                    "{}{}, err = {}; return on err",
                    indent,
                    place(target),
                    invocation(call, receiver)
                );
            }
            SynthesisStep::GuardedAssign {
                subject,
                declare,
                body,
            } => {
                if let Some(declared) = declare {
                    let _ = writeln!(output, "{}var {}", indent, place(declared));
                }
                let _ = writeln!(output, "{}if {} != nil {{", indent, operand(subject));
                render_steps(body, receiver, depth + 1, output);
                let _ = writeln!(output, "{}}}", indent);
            }
            SynthesisStep::Dereference { target, from } => {
                let _ = writeln!(output, "{}{} = *{}", indent, place(target), operand(from));
            }
            SynthesisStep::AddressOf { target, from } => {
                let _ = writeln!(output, "{}{} = &{}", indent, place(target), operand(from));
            }
            SynthesisStep::CollectLoop {
                target,
                over,
                element,
                presized,
                body,
            } => {
                let _ = writeln!(
                    output,
                    "{}for t{} in {} into {}{} {{",
                    indent,
                    element.0,
                    operand(over),
                    place(target),
                    if *presized { " (presized)" } else { "" }
                );
                render_steps(body, receiver, depth + 1, output);
                let _ = writeln!(output, "{}}}", indent);
            }
        }
    }
}

fn operand(value: &Operand) -> String {
    match value {
        Operand::Parameter => "src".to_string(),
        Operand::Field(name) => format!("src.{}", name),
        Operand::Slot(slot) => format!("t{}", slot.0),
    }
}

fn place(value: &Place) -> String {
    match value {
        Place::Slot(slot) => format!("t{}", slot.0),
        Place::Field(name) => format!("dst.{}", name),
        Place::Item => "item".to_string(),
        Place::Result => "dst".to_string(),
    }
}

fn argument(value: &Argument) -> String {
    let rendered = operand(&value.operand);
    match value.adapt {
        Adapt::AsIs => rendered,
        Adapt::AddressOf => format!("&{}", rendered),
        Adapt::Dereference => format!("*{}", rendered),
    }
}

fn invocation(call: &Invocation, receiver: &str) -> String {
    let argument = call.argument.as_ref().map(argument).unwrap_or_default();
    match &call.callee {
        Callee::Accessor { receiver: on, name } => format!("{}.{}()", operand(on), name),
        Callee::Transform {
            reference,
            binding: Some(binding),
        } => {
            let method = match reference {
                TransformRef::TypeMethod { method_name, .. } => method_name,
                TransformRef::Function { name, .. } => name,
            };
            format!("{}.{}.{}({})", receiver, binding, method, argument)
        }
        Callee::Transform {
            reference,
            binding: None,
        } => format!("{}({})", reference, argument),
        Callee::SubMapper { unit, .. } => format!("{}.{}({})", receiver, unit, argument),
    }
}

fn expr(value: &Expr, receiver: &str) -> String {
    match value {
        Expr::Value(value) => operand(value),
        Expr::Call(call) => invocation(call, receiver),
    }
}

/// Format a parsed tag for human reading
fn format_tag_human(report: &TagReport) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Tag: {:?}", report.raw);

    let Some(directive) = &report.directive else {
        output.push_str("  (no directive: the field maps by name)\n");
        return output;
    };

    if directive.ignored {
        output.push_str("  ignored: the field is skipped\n");
        return output;
    }
    if let Some(rename) = &directive.rename {
        let _ = writeln!(output, "  source: {} ({:?})", rename.name, rename.origin);
    }
    if let Some(transform) = &directive.transform {
        let kind = match transform {
            TransformRef::Function { .. } => "function",
            TransformRef::TypeMethod { .. } => "type method",
        };
        let _ = writeln!(output, "  transform: {} ({})", transform, kind);
    }
    let _ = writeln!(output, "  canonical: {}", directive);
    output
}

#[cfg(test)]
mod tests {
    include!("output/tests.rs");
}

use std::fmt::Write;

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use serde::Serialize;

use crate::analyzer::AnalysisReport;
use crate::classifier::{CategoryMatch, RiskLevel};
use crate::narrative::NarrativeOutcome;

pub const REPORT_TITLE: &str = "Contract Risk Assessment Report";

/// Format styles supported by the text renderers.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Produce a report string from an `AnalysisReport` using the desired format.
pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport::from(report))?),
    }
}

fn render_human(report: &AnalysisReport) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "Risk Level: {} ({} categor{} matched)",
        report.risk_level,
        report.matches.len(),
        if report.matches.len() == 1 { "y" } else { "ies" }
    )?;
    writeln!(out, "Input Length: {} chars", report.input_chars)?;
    writeln!(out)?;

    if report.matches.is_empty() {
        writeln!(out, "No risk categories detected.")?;
    } else {
        writeln!(out, "Risk Categories:")?;
        for found in &report.matches {
            writeln!(
                out,
                "  - {label} @ {start}..{end}",
                label = found.label,
                start = found.span.0,
                end = found.span.1,
            )?;
            if !found.excerpt.is_empty() {
                writeln!(out, "    \"{}\"", found.excerpt)?;
            }
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "Clauses: {} (showing {})",
        report.clause_count,
        report.excerpts.len()
    )?;
    for (idx, excerpt) in report.excerpts.iter().enumerate() {
        writeln!(out, "  [{}] {}", idx + 1, flatten_whitespace(excerpt))?;
    }

    Ok(out)
}

/// Render a narrative outcome, flagging when the fallback text is shown.
pub fn render_narrative(outcome: &NarrativeOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Human => {
            let mut out = String::new();
            if let NarrativeOutcome::Fallback { reason, .. } = outcome {
                writeln!(out, "Note: live analysis unavailable ({reason}).")?;
                writeln!(out, "Showing the offline fallback analysis instead.")?;
                writeln!(out)?;
            }
            out.push_str(outcome.narrative());
            if !out.ends_with('\n') {
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn flatten_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    risk_level: RiskLevel,
    matched_categories: Vec<&'a str>,
    matches: &'a [CategoryMatch],
    clause_count: usize,
    excerpts: &'a [String],
    input_chars: usize,
}

impl<'a> From<&'a AnalysisReport> for JsonReport<'a> {
    fn from(report: &'a AnalysisReport) -> Self {
        Self {
            risk_level: report.risk_level,
            matched_categories: report.matched_labels(),
            matches: &report.matches,
            clause_count: report.clause_count,
            excerpts: &report.excerpts,
            input_chars: report.input_chars,
        }
    }
}

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 18.0;
const LINE_H: f32 = 5.5;
const BODY_SIZE: f32 = 10.0;
const HEADING_SIZE: f32 = 13.0;
const TITLE_SIZE: f32 = 20.0;
const WRAP_CHARS: usize = 95;

/// Render the downloadable PDF report: title, timestamp, risk level, categories, clause excerpts.
pub fn render_pdf(report: &AnalysisReport, generated_at: DateTime<Utc>) -> anyhow::Result<Vec<u8>> {
    let doc = PdfDocument::empty(REPORT_TITLE);
    {
        let mut page = PdfPageWriter::new(&doc)?;
        page.line(REPORT_TITLE, TITLE_SIZE, true);
        page.gap();
        page.line(
            &format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
            BODY_SIZE,
            false,
        );
        page.line(&format!("Risk Level: {}", report.risk_level), HEADING_SIZE, true);
        page.gap();

        page.line("Detected Risk Categories", HEADING_SIZE, true);
        if report.matches.is_empty() {
            page.line("None", BODY_SIZE, false);
        }
        for found in &report.matches {
            page.paragraph(&format!("- {}", found.label));
        }
        page.gap();

        page.line(
            &format!(
                "Clause Excerpts ({} of {} clauses)",
                report.excerpts.len(),
                report.clause_count
            ),
            HEADING_SIZE,
            true,
        );
        for (idx, excerpt) in report.excerpts.iter().enumerate() {
            page.paragraph(&format!("[{}] {}", idx + 1, flatten_whitespace(excerpt)));
            page.gap();
        }
    }
    Ok(doc.save_to_bytes()?)
}

/// Top-down text cursor that opens a new page when the current one is full.
struct PdfPageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl<'a> PdfPageWriter<'a> {
    fn new(doc: &'a PdfDocumentReference) -> anyhow::Result<Self> {
        let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Page 1");
        Ok(Self {
            doc,
            layer: doc.get_page(page_idx).get_layer(layer_idx),
            regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
            y: PAGE_H - MARGIN,
            pages: 1,
        })
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        self.pages += 1;
        let (page_idx, layer_idx) =
            self.doc
                .add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Page {}", self.pages));
        self.layer = self.doc.get_page(page_idx).get_layer(layer_idx);
        self.y = PAGE_H - MARGIN;
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        let height = LINE_H.max(size * 0.5);
        self.ensure_room(height);
        self.y -= height;
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(pdf_safe(text), size, Mm(MARGIN), Mm(self.y), font);
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap_text(text, WRAP_CHARS) {
            self.line(&line, BODY_SIZE, false);
        }
    }

    fn gap(&mut self) {
        self.y -= LINE_H / 2.0;
    }
}

/// Builtin PDF fonts only cover a Latin subset; anything else is replaced.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            c if c.is_ascii_graphic() || c == ' ' => c,
            c if c.is_whitespace() => ' ',
            _ => '?',
        })
        .collect()
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(max_chars) {
            if current_len > 0 && current_len + 1 + piece.len() > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(piece);
            current_len += piece.len();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

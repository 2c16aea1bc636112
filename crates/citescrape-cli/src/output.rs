//! Output formatting for the CLI.

use crate::error::Result;
use citescrape_extractor::{OutputList, PipelineOutcome, TaskTemplate, CITATIONS_FIELD};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One row per extracted record
    Table,
    /// The result envelope
    Json,
    /// The results file path only
    Quiet,
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the outcome of a run.
    pub fn format_outcome(&self, outcome: &PipelineOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(outcome.envelope.to_json_pretty()?),
            OutputFormat::Quiet => Ok(outcome
                .output_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default()),
            OutputFormat::Table => {
                let mut out = match &outcome.parsed {
                    Some(parsed) => self.format_records_table(parsed),
                    None => self.warning("The engine produced no result"),
                };
                if let Some(path) = &outcome.output_path {
                    out.push('\n');
                    out.push_str(&self.success(&format!("Saved to {}", path.display())));
                }
                Ok(out)
            }
        }
    }

    /// Format extracted records as a table.
    fn format_records_table(&self, parsed: &OutputList) -> String {
        let records: Vec<_> = parsed.records().collect();
        let Some(first) = records.first() else {
            return self.colorize("No records found.", "yellow");
        };

        let mut header: Vec<String> = first.values().iter().map(|(name, _)| name.clone()).collect();
        let cited = first.citations().is_some();
        if cited {
            header.push(CITATIONS_FIELD.to_string());
        }

        let mut builder = Builder::default();
        builder.push_record(header);
        for record in records {
            let mut row: Vec<String> = record
                .values()
                .iter()
                .map(|(_, value)| value.as_ref().map(|v| v.display()).unwrap_or_else(|| "-".to_string()))
                .collect();
            if cited {
                row.push(record.citations().map_or(0, <[_]>::len).to_string());
            }
            builder.push_record(row);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format the template catalog.
    pub fn format_templates(&self, templates: &[TaskTemplate]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let list: Vec<serde_json::Value> = templates
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "name": t.name,
                            "payload": t.payload.as_str(),
                            "citations": t.requests_citations,
                            "description": t.description,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&list)?)
            }
            OutputFormat::Quiet => Ok(templates.iter().map(|t| t.name).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Name", "Payload", "Citations", "Description"]);
                for t in templates {
                    builder.push_record([
                        t.name,
                        t.payload.as_str(),
                        if t.requests_citations { "yes" } else { "no" },
                        t.description,
                    ]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

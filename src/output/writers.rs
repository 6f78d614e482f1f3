//! Built-in output writers selected by `output.format`

use crate::config::{Config, OutputFormat};
use crate::output::traits::{OutputResult, OutputWriter};
use crate::state::{PageError, PageRecord};
use indexmap::IndexMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Returns the writer for an output format
pub fn writer_for(format: OutputFormat) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleWriter),
        OutputFormat::Csv => Box::new(CsvWriter),
        OutputFormat::Json => Box::new(JsonWriter),
        OutputFormat::Blank => Box::new(BlankWriter),
    }
}

/// Prints the records to stdout as pretty JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleWriter;

impl OutputWriter for ConsoleWriter {
    fn write(
        &self,
        _config: &Config,
        _start_timestamp: &str,
        output_data: &IndexMap<String, PageRecord>,
        _output_path: &Path,
    ) -> OutputResult<()> {
        println!("{}", serde_json::to_string_pretty(output_data)?);
        Ok(())
    }
}

/// Writes `{id}.csv`, one row per page
///
/// Link lists are joined with `|`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvWriter;

const CSV_HEADER: [&str; 9] = [
    "id", "url", "title", "status", "links", "mailto", "tel", "hash", "error",
];

impl OutputWriter for CsvWriter {
    fn write(
        &self,
        config: &Config,
        _start_timestamp: &str,
        output_data: &IndexMap<String, PageRecord>,
        output_path: &Path,
    ) -> OutputResult<()> {
        let path = output_path.join(format!("{}.csv", config.id));
        let mut writer = csv::Writer::from_path(&path)?;

        writer.write_record(CSV_HEADER)?;
        for record in output_data.values() {
            writer.write_record(csv_row(record))?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} page(s) to {}", output_data.len(), path.display());
        Ok(())
    }
}

fn csv_row(record: &PageRecord) -> [String; 9] {
    let error = match &record.error {
        PageError::None => "false".to_string(),
        PageError::Status(code) => code.to_string(),
        PageError::Message(msg) => msg.clone(),
    };

    [
        record.id.to_string(),
        record.url.clone(),
        record.title.clone().unwrap_or_default(),
        record.status.map(|s| s.to_string()).unwrap_or_default(),
        record.links.url.join("|"),
        record.links.mailto.join("|"),
        record.links.tel.join("|"),
        record.links.hash.join("|"),
        error,
    ]
}

/// Writes `{id}.json` as pretty JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonWriter;

impl OutputWriter for JsonWriter {
    fn write(
        &self,
        config: &Config,
        _start_timestamp: &str,
        output_data: &IndexMap<String, PageRecord>,
        output_path: &Path,
    ) -> OutputResult<()> {
        let path = output_path.join(format!("{}.json", config.id));
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(output_data)?.as_bytes())?;

        tracing::info!("Wrote {} page(s) to {}", output_data.len(), path.display());
        Ok(())
    }
}

/// Writes nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankWriter;

impl OutputWriter for BlankWriter {
    fn write(
        &self,
        config: &Config,
        start_timestamp: &str,
        output_data: &IndexMap<String, PageRecord>,
        _output_path: &Path,
    ) -> OutputResult<()> {
        tracing::info!(
            "Crawl {} ({}) collected {} page(s); blank output writes nothing",
            config.id,
            start_timestamp,
            output_data.len()
        );
        Ok(())
    }
}

//! Report rendering
//!
//! One row per build record in ascending key order, with a fixed column
//! set. Delta columns are appended only when a baseline comparison is
//! supplied. Absent values are empty cells (CSV) or omitted keys (JSON).

use crate::config::ToolConfig;
use crate::dataset::Dataset;
use crate::delta::Comparison;
use crate::error::{ReportError, Result};
use crate::measure::Measure;
use crate::record::{BuildRecord, RecordKey};
use crate::scanner::RecordScanner;
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Comma-separated values (default)
    Csv,
    /// JSON array of row objects
    Json,
}

impl ReportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "data.csv",
            ReportFormat::Json => "data.json",
        }
    }
}

/// Report columns in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Buildset,
    Source,
    Target,
    Status,
    ProgramSize,
    DataSize,
    DeltaStatus,
    DeltaProgramSize,
    DeltaDataSize,
    IsBase,
}

impl Column {
    pub const BASE: [Column; 6] = [
        Column::Buildset,
        Column::Source,
        Column::Target,
        Column::Status,
        Column::ProgramSize,
        Column::DataSize,
    ];

    pub const DELTA: [Column; 4] = [
        Column::DeltaStatus,
        Column::DeltaProgramSize,
        Column::DeltaDataSize,
        Column::IsBase,
    ];

    /// Header label
    pub fn header(&self) -> &'static str {
        match self {
            Column::Buildset => "Buildset",
            Column::Source => "Sketch",
            Column::Target => "Board",
            Column::Status => "Status",
            Column::ProgramSize => "Program size",
            Column::DataSize => "Data size",
            Column::DeltaStatus => "Δ status",
            Column::DeltaProgramSize => "Δ program size",
            Column::DeltaDataSize => "Δ data size",
            Column::IsBase => "In base buildset",
        }
    }

    /// Field name used as JSON key
    pub fn field(&self) -> &'static str {
        match self {
            Column::Buildset => "buildset",
            Column::Source => "source",
            Column::Target => "target",
            Column::Status => "status",
            Column::ProgramSize => "program_size",
            Column::DataSize => "data_size",
            Column::DeltaStatus => "delta_status",
            Column::DeltaProgramSize => "delta_program_size",
            Column::DeltaDataSize => "delta_data_size",
            Column::IsBase => "is_base",
        }
    }
}

/// Renders a dataset, optionally with its baseline comparison
#[derive(Debug)]
pub struct ReportRenderer<'a> {
    dataset: &'a Dataset,
    comparison: Option<&'a Comparison>,
    format: ReportFormat,
}

impl<'a> ReportRenderer<'a> {
    pub fn new(dataset: &'a Dataset, comparison: Option<&'a Comparison>, format: ReportFormat) -> Self {
        Self {
            dataset,
            comparison,
            format,
        }
    }

    /// Columns emitted by this renderer
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = Column::BASE.to_vec();
        if self.comparison.is_some() {
            columns.extend(Column::DELTA);
        }
        columns
    }

    fn cell(&self, column: Column, key: &RecordKey, record: &BuildRecord) -> Option<Value> {
        let delta = self.comparison.and_then(|c| c.get(key));
        match column {
            Column::Buildset => Some(Value::from(record.buildset())),
            Column::Source => Some(Value::from(record.source_id())),
            Column::Target => Some(Value::from(record.target())),
            Column::Status => Some(Value::from(record.status.label())),
            Column::ProgramSize => record.program_size().map(Value::from),
            Column::DataSize => record.data_size().map(Value::from),
            Column::DeltaStatus => delta.map(|d| Value::from(d.status.label())),
            Column::DeltaProgramSize => delta.and_then(|d| d.delta_program_size).map(Value::from),
            Column::DeltaDataSize => delta.and_then(|d| d.delta_data_size).map(Value::from),
            Column::IsBase => delta.map(|d| Value::from(d.is_base)),
        }
    }

    /// Write the report to `writer`
    pub fn render<W: Write>(&self, writer: W) -> Result<()> {
        match self.format {
            ReportFormat::Csv => self.render_csv(writer),
            ReportFormat::Json => self.render_json(writer),
        }
    }

    fn render_csv<W: Write>(&self, writer: W) -> Result<()> {
        let columns = self.columns();
        let mut wtr = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(writer);

        wtr.write_record(columns.iter().map(Column::header))?;
        for (key, record) in self.dataset.iter() {
            let row = columns
                .iter()
                .map(|&column| csv_cell(self.cell(column, key, record)));
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn render_json<W: Write>(&self, writer: W) -> Result<()> {
        let columns = self.columns();
        let rows: Vec<Value> = self
            .dataset
            .iter()
            .map(|(key, record)| {
                let mut row = Map::new();
                for &column in &columns {
                    if let Some(value) = self.cell(column, key, record) {
                        row.insert(column.field().to_string(), value);
                    }
                }
                Value::Object(row)
            })
            .collect();

        serde_json::to_writer_pretty(writer, &rows)?;
        Ok(())
    }

    /// Render the report into a string
    pub fn render_to_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.render(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the report into `<results_dir>/<report_subdir>/`
    ///
    /// Creates the report directory if needed and returns the file path.
    pub fn write_to_dir(&self, results_dir: &Path, report_subdir: &str) -> Result<PathBuf> {
        let report_dir = results_dir.join(report_subdir);
        fs::create_dir_all(&report_dir).map_err(|source| ReportError::Write {
            path: report_dir.clone(),
            source,
        })?;

        let path = report_dir.join(self.format.file_name());
        self.write_to_file(&path)?;

        tracing::info!("Wrote {} report rows to {}", self.dataset.len(), path.display());
        Ok(path)
    }

    /// Render the report into `path`, failing if any buffered byte is lost
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = std::io::BufWriter::new(file);
        self.render(&mut out)?;
        out.flush().map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Outcome of a full report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub records: usize,
    pub baseline: Option<String>,
    pub missing_baseline: usize,
}

/// Scan `results_dir`, measure, compare and write the report
///
/// The baseline is `base_set` if given, else `config.auto_baseline` when
/// several buildsets are present and one of them carries that name.
pub fn generate_report<M: Measure + ?Sized>(
    config: &ToolConfig,
    results_dir: &Path,
    base_set: Option<&str>,
    format: ReportFormat,
    measurer: &M,
) -> Result<ReportSummary> {
    let scanner = RecordScanner::new(results_dir, &config.marker_file);
    let dataset = Dataset::collect(scanner, measurer)?;

    let baseline = dataset.select_baseline(base_set, &config.auto_baseline);
    let comparison = baseline
        .as_deref()
        .map(|name| Comparison::compute(&dataset, name));

    let path = ReportRenderer::new(&dataset, comparison.as_ref(), format)
        .write_to_dir(results_dir, &config.report_subdir)?;

    Ok(ReportSummary {
        path,
        records: dataset.len(),
        baseline,
        missing_baseline: comparison.as_ref().map_or(0, |c| c.missing_baseline().len()),
    })
}

/// CSV text of a cell: strings unquoted, booleans as Yes/No, absent as empty
fn csv_cell(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(Value::Bool(true)) => "Yes".to_string(),
        Some(Value::Bool(false)) => "No".to_string(),
        Some(other) => other.to_string(),
    }
}

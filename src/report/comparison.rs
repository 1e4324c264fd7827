//! Comparison report (CSV)

use serde::Serialize;
use std::io::Write;

use crate::error::MigrateError;
use crate::types::ClassificationResult;

/// CSV header, in `ComparisonRow` field order
pub const HEADERS: [&str; 9] = [
	"Status",
	"Action",
	"SourcePath",
	"DestinationPath",
	"SourceSize",
	"SourceModified",
	"RemoteSize",
	"RemoteModified",
	"ResolvedUrl",
];

/// One CSV row
#[derive(Debug, Serialize)]
pub struct ComparisonRow {
	#[serde(rename = "Status")]
	pub status: &'static str,
	#[serde(rename = "Action")]
	pub action: &'static str,
	#[serde(rename = "SourcePath")]
	pub source_path: String,
	#[serde(rename = "DestinationPath")]
	pub destination_path: String,
	#[serde(rename = "SourceSize")]
	pub source_size: Option<u64>,
	#[serde(rename = "SourceModified")]
	pub source_modified: Option<String>,
	#[serde(rename = "RemoteSize")]
	pub remote_size: Option<u64>,
	#[serde(rename = "RemoteModified")]
	pub remote_modified: Option<String>,
	#[serde(rename = "ResolvedUrl")]
	pub resolved_url: Option<String>,
}

impl From<&ClassificationResult> for ComparisonRow {
	fn from(r: &ClassificationResult) -> Self {
		ComparisonRow {
			status: r.status.as_str(),
			action: r.action.as_str(),
			source_path: r.source_path.display().to_string(),
			destination_path: r.destination_path.as_display(),
			source_size: r.source_size,
			source_modified: r.source_modified.map(|t| t.to_rfc3339()),
			remote_size: r.remote_size,
			remote_modified: r.remote_modified.map(|t| t.to_rfc3339()),
			resolved_url: r.resolved_url.clone(),
		}
	}
}

/// Incremental CSV writer
///
/// The header is written up front so a run without rows still leaves a
/// readable file.
pub struct ComparisonWriter<W: Write> {
	writer: csv::Writer<W>,
	rows: usize,
}

impl<W: Write> ComparisonWriter<W> {
	pub fn new(inner: W) -> Result<Self, MigrateError> {
		let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(inner);
		writer.write_record(HEADERS)?;
		Ok(ComparisonWriter { writer, rows: 0 })
	}

	pub fn write(&mut self, result: &ClassificationResult) -> Result<(), MigrateError> {
		self.writer.serialize(ComparisonRow::from(result))?;
		self.rows += 1;
		Ok(())
	}

	pub fn rows(&self) -> usize {
		self.rows
	}

	pub fn flush(&mut self) -> Result<(), MigrateError> {
		self.writer.flush()?;
		Ok(())
	}

	pub fn into_inner(self) -> Result<W, MigrateError> {
		self.writer
			.into_inner()
			.map_err(|e| MigrateError::Report { message: format!("cannot finish comparison report: {}", e) })
	}
}


// vim: ts=4

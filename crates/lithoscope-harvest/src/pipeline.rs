//! Batch orchestration: read, build, write, report.

use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, instrument};
use uuid::Uuid;

use lithoscope_common::{HarvestError, Result};
use lithoscope_transform::builder::RecordBuilder;

use crate::reader::{HarvestSelection, InspireReader};
use crate::writer::{RecordWriter, WriteOutcome};

/// A validated harvest request.
#[derive(Debug, Clone)]
pub struct HarvestJob {
    pub selection: HarvestSelection,
}

impl HarvestJob {
    /// `until` needs `since`; an exact date excludes a range; at least one
    /// selector must be present.
    pub fn new(selection: HarvestSelection) -> Result<Self> {
        if selection.until.is_some() && selection.since.is_none() {
            return Err(HarvestError::Config(
                "'until' requires 'since'".to_string(),
            ));
        }
        if selection.on_date.is_some()
            && (selection.since.is_some() || selection.until.is_some())
        {
            return Err(HarvestError::Config(
                "'on_date' cannot be combined with a date range".to_string(),
            ));
        }
        if selection.inspire_id.is_none()
            && selection.on_date.is_none()
            && selection.since.is_none()
        {
            return Err(HarvestError::Config(
                "one of 'inspire_id', 'on_date' or 'since' is required".to_string(),
            ));
        }
        Ok(Self { selection })
    }
}

/// One run's outcome. Per-record problems land in `errors`, merge
/// conflicts and soft warnings in `warnings`; neither aborts the batch.
#[derive(Debug)]
pub struct HarvestReport {
    pub run_id: Uuid,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub duration_ms: u128,
}

pub struct HarvestPipeline {
    reader: InspireReader,
    builder: RecordBuilder,
    writer: RecordWriter,
}

impl HarvestPipeline {
    pub fn new(reader: InspireReader, builder: RecordBuilder, writer: RecordWriter) -> Self {
        Self { reader, builder, writer }
    }

    pub async fn run(&self, job: &HarvestJob) -> Result<HarvestReport> {
        let records = self.reader.read(&job.selection).await?;
        Ok(self.process(&records).await)
    }

    /// Record-at-a-time loop. One bad record never aborts the batch.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn process(&self, records: &[Value]) -> HarvestReport {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let mut report = HarvestReport {
            run_id,
            created: 0,
            updated: 0,
            skipped: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        };

        for record in records {
            let inspire_id = record
                .get("id")
                .map(|id| id.to_string().trim_matches('"').to_string())
                .unwrap_or_default();

            let (payload, build_errors) = self.builder.build(record).await;
            if !build_errors.is_empty() {
                report.skipped += 1;
                for err in build_errors {
                    error!(%inspire_id, %err, "record skipped");
                    report.errors.push(format!("[inspire_id={inspire_id}] {err}"));
                }
                continue;
            }
            let Some(payload) = payload else {
                report.skipped += 1;
                continue;
            };

            match self.writer.write(&payload).await {
                Ok(WriteOutcome::Created { record_id }) => {
                    info!(%inspire_id, %record_id, "created");
                    report.created += 1;
                }
                Ok(WriteOutcome::Updated { record_id, conflicts }) => {
                    info!(%inspire_id, %record_id, "updated");
                    report.updated += 1;
                    for conflict in conflicts {
                        report.warnings.push(format!(
                            "[inspire_id={inspire_id}] conflict at {}: {} ({})",
                            conflict.path, conflict.message, conflict.kind
                        ));
                    }
                }
                Err(err) => {
                    error!(%inspire_id, %err, "write failed");
                    report.skipped += 1;
                    report.errors.push(format!("[inspire_id={inspire_id}] {err}"));
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis();
        info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "harvest run finished"
        );
        report
    }
}

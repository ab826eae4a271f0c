use crate::core::assembler::assemble;
use crate::core::output::OutputFormat;
use crate::core::row_source::{InputFormat, RowSource};
use crate::core::session::VerificationSession;
use crate::domain::model::{BatchOutcome, InputBatch, RunSummary};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::Result;
use std::io::Write;
use std::time::Instant;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone)]
pub struct LoadSettings {
    /// Output files are named `<stem>.<ext>`.
    pub stem: String,
    pub formats: Vec<OutputFormat>,
    pub bundle: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            stem: "results".to_string(),
            formats: vec![OutputFormat::Csv],
            bundle: false,
        }
    }
}

/// Upload in, verified table out: parse rows, verify each through the
/// session, assemble, then write results through the output storage.
pub struct VerificationPipeline<S: Storage> {
    input_storage: S,
    output_storage: S,
    input_path: String,
    session: VerificationSession,
    settings: LoadSettings,
}

impl<S: Storage> VerificationPipeline<S> {
    pub fn new(
        input_storage: S,
        output_storage: S,
        input_path: impl Into<String>,
        session: VerificationSession,
        settings: LoadSettings,
    ) -> Self {
        Self {
            input_storage,
            output_storage,
            input_path: input_path.into(),
            session,
            settings,
        }
    }

    pub fn session(&self) -> &VerificationSession {
        &self.session
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for VerificationPipeline<S> {
    async fn extract(&self) -> Result<InputBatch> {
        let format = InputFormat::from_path(&self.input_path)?;
        tracing::debug!("Reading {:?} upload from {}", format, self.input_path);

        let data = self.input_storage.read_file(&self.input_path).await?;
        let required = self.session.client().descriptor().required_columns();
        RowSource::parse(&data, format, &required)
    }

    async fn transform(&self, batch: InputBatch) -> Result<BatchOutcome> {
        let started = Instant::now();
        let descriptor = self.session.client().descriptor();

        let outcomes = self.session.process_batch(&batch).await?;
        let assembled = assemble(&batch, &outcomes, descriptor);

        let mut summary = RunSummary {
            endpoint: descriptor.name.clone(),
            total_rows: outcomes.len(),
            expanded_rows: assembled.expanded.len(),
            cache_hits: self.session.cache().hits(),
            cache_misses: self.session.cache().misses(),
            ..Default::default()
        };
        for outcome in &outcomes {
            match outcome.result.failure {
                None => summary.verified_rows += 1,
                Some(kind) => {
                    summary.failed_rows += 1;
                    *summary.failures.entry(kind.as_str().to_string()).or_insert(0) += 1;
                }
            }
        }
        summary.duration_ms = started.elapsed().as_millis() as u64;

        Ok(BatchOutcome {
            table: assembled.table,
            outcomes,
            expanded: assembled.expanded,
            summary,
        })
    }

    async fn load(&self, outcome: BatchOutcome) -> Result<String> {
        let mut files = Vec::with_capacity(self.settings.formats.len());
        for format in &self.settings.formats {
            let name = format!("{}.{}", self.settings.stem, format.extension());
            let data = format.render(&outcome.table)?;
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.output_storage.write_file(&name, &data).await?;
            files.push((name, data));
        }

        if !self.settings.bundle {
            return Ok(files
                .first()
                .map(|(name, _)| name.clone())
                .unwrap_or_default());
        }

        let zip_name = format!("{}.zip", self.settings.stem);
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            for (name, data) in &files {
                zip.start_file(name.as_str(), SimpleFileOptions::default())?;
                zip.write_all(data)?;
            }

            zip.start_file(SUMMARY_FILE, SimpleFileOptions::default())?;
            let summary = serde_json::to_string_pretty(&outcome.summary)?;
            zip.write_all(summary.as_bytes())?;

            zip.finish()?.into_inner()
        };

        tracing::debug!("Writing {} ({} bytes)", zip_name, zip_data.len());
        self.output_storage.write_file(&zip_name, &zip_data).await?;
        Ok(zip_name)
    }
}

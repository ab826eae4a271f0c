use crate::domain::model::RunSummary;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub output_path: String,
    pub summary: RunSummary,
}

/// Drives a pipeline through extract, transform and load.
pub struct BatchEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> BatchEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("📥 Reading upload...");
        let batch = self.pipeline.extract().await?;
        tracing::info!("📥 Read {} rows", batch.records.len());

        tracing::info!("🔍 Verifying rows...");
        let outcome = self.pipeline.transform(batch).await?;
        let summary = outcome.summary.clone();
        tracing::info!(
            verified = summary.verified_rows,
            failed = summary.failed_rows,
            expanded = summary.expanded_rows,
            cache_hits = summary.cache_hits,
            "🔍 Verified {} rows in {} ms",
            summary.total_rows,
            summary.duration_ms
        );

        tracing::info!("💾 Writing results...");
        let output_path = self.pipeline.load(outcome).await?;
        tracing::info!("💾 Output saved to: {}", output_path);

        Ok(RunReport {
            output_path,
            summary,
        })
    }
}

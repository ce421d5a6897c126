use crate::core::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting consolidation...");

        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} autoridades, {} entidades, {} personas",
            dataset.autoridades.len(),
            dataset.entidades.len(),
            dataset.personas.len()
        );

        let result = self.pipeline.transform(dataset).await?;
        tracing::info!("Consolidated {} rows", result.consolidated.len());

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}

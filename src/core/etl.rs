use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Fetches and projects one dataset at a time, then combines. The first
    /// error aborts the run, so no later dataset is requested after a failure.
    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting ETL process...");
        self.monitor.log_stats("Start");

        let datasets = self.pipeline.datasets();
        let total = datasets.len();
        let mut projected = Vec::with_capacity(total);

        for (i, dataset) in datasets.iter().enumerate() {
            tracing::info!(
                "Downloading dataset {}/{}: {} ({})",
                i + 1,
                total,
                dataset.name,
                dataset.code
            );
            let fetched = self.pipeline.extract(dataset).await?;
            projected.push(self.pipeline.transform(dataset, fetched).await?);
            self.monitor.log_stats(&dataset.code);
        }
        tracing::info!("Projected {} datasets", projected.len());

        let output_path = self.pipeline.load(projected).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}

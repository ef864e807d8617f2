use crate::core::combine;
use crate::core::fetch::DatasetFetcher;
use crate::core::projection::project_file;
use crate::core::registry::VariableRegistry;
use crate::core::{ConfigProvider, FetchedDataset, Pipeline, ProjectedDataset, Storage};
use crate::domain::model::DatasetSpec;
use crate::utils::error::Result;

/// Fetch every dataset in the registry, project each one, join them all.
pub struct SurveyPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    registry: VariableRegistry,
    fetcher: DatasetFetcher,
}

impl<S: Storage, C: ConfigProvider> SurveyPipeline<S, C> {
    pub fn new(storage: S, config: C, registry: VariableRegistry) -> Self {
        let fetcher = DatasetFetcher::new(config.base_url());
        Self {
            storage,
            config,
            registry,
            fetcher,
        }
    }

    /// Loads the registry from the configured variables file.
    pub fn from_config(storage: S, config: C) -> Result<Self> {
        let registry = VariableRegistry::from_file(config.variables_file())?;
        Ok(Self::new(storage, config, registry))
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SurveyPipeline<S, C> {
    fn datasets(&self) -> &[DatasetSpec] {
        self.registry.datasets()
    }

    async fn extract(&self, dataset: &DatasetSpec) -> Result<FetchedDataset> {
        self.fetcher
            .fetch(
                &self.storage,
                dataset,
                self.config.year_block(),
                self.config.url_override(&dataset.code),
            )
            .await
    }

    async fn transform(
        &self,
        dataset: &DatasetSpec,
        fetched: FetchedDataset,
    ) -> Result<ProjectedDataset> {
        project_file(&self.storage, &fetched, dataset).await
    }

    async fn load(&self, projected: Vec<ProjectedDataset>) -> Result<String> {
        tracing::info!("Combining all datasets into a single CSV file ...");
        tracing::debug!("{} datasets projected in this run", projected.len());

        let summary = combine::combine(&self.storage).await?;
        tracing::info!(
            "Combined {} files into {} rows x {} columns",
            summary.inputs.len(),
            summary.rows,
            summary.columns.len()
        );

        Ok(summary.location)
    }
}

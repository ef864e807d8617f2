use crate::domain::model::{DatasetSpec, FetchedDataset, ProjectedDataset};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Flat directory of files addressed by bare file name.
pub trait Storage: Send + Sync {
    fn ensure_root(&self) -> impl std::future::Future<Output = Result<()>> + Send;
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Names of the regular files in the root, in no particular order.
    fn list_files(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    /// Human-readable location of `path`, for logs and results.
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn year_block(&self) -> &str;
    fn output_path(&self) -> &str;
    fn variables_file(&self) -> &str;
    /// Explicit download URL for a dataset code, bypassing base URL and year block.
    fn url_override(&self, dataset_code: &str) -> Option<&str>;
}

/// Each dataset is extracted and transformed before the next one is extracted;
/// `load` runs once all of them are done.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Datasets in processing order.
    fn datasets(&self) -> &[DatasetSpec];
    async fn extract(&self, dataset: &DatasetSpec) -> Result<FetchedDataset>;
    async fn transform(
        &self,
        dataset: &DatasetSpec,
        fetched: FetchedDataset,
    ) -> Result<ProjectedDataset>;
    async fn load(&self, projected: Vec<ProjectedDataset>) -> Result<String>;
}

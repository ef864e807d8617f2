pub mod combine;
pub mod etl;
pub mod fetch;
pub mod pipeline;
pub mod projection;
pub mod registry;
pub mod table_io;
pub mod xport;

pub use crate::domain::model::{FetchedDataset, ProjectedDataset};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;

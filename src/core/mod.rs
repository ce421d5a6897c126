pub mod consolidate;
pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{Dataset, Table, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;

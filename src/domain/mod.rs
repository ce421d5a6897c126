pub mod model;
pub mod ports;

pub use model::{Dataset, Table, TransformResult};
pub use ports::{ConfigProvider, Pipeline, Storage};

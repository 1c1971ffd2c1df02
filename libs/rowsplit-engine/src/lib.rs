pub mod compute;
pub mod config;
pub mod document;
pub mod error;
pub mod executor;
pub mod expand;
pub mod extension;
pub mod payload;
pub mod planner;
pub mod stream;

pub use compute::PartitionCompute;
pub use error::EngineError;
pub use expand::EventExpander;
pub use planner::{PartitionDescriptor, PartitionPlanner};
pub use stream::RowStream;

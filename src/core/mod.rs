pub mod assembler;
pub mod cache;
pub mod client;
pub mod endpoint;
pub mod engine;
pub mod extractor;
pub mod flatten;
pub mod output;
pub mod pipeline;
pub mod poller;
pub mod row_source;
pub mod session;

pub use crate::domain::ports::{Pipeline, Storage, Transport};
pub use crate::utils::error::Result;

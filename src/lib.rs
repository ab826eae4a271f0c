pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{http::HttpTransport, storage::LocalStorage};
#[cfg(feature = "cli")]
pub use crate::config::CliArgs;
pub use crate::config::VerifyConfig;
pub use crate::core::{
    client::{Credentials, RunOptions, VerificationClient},
    endpoint::{builtin_endpoints, EndpointDescriptor},
    engine::{BatchEngine, RunReport},
    pipeline::{LoadSettings, VerificationPipeline},
    session::VerificationSession,
};
pub use crate::utils::error::{Result, VerifyError};

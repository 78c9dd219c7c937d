#![doc = include_str!("../README.md")]

pub mod detect;
pub mod error_mapping;
pub mod schema_clean;

pub use detect::{detect_provider, ProviderKind};
pub use error_mapping::{map_http_status, map_reqwest_error};
pub use schema_clean::clean_schema;

#![doc = include_str!("../README.md")]

pub mod client;
pub mod mapping;
pub mod model_map;
pub mod streaming;

pub use client::OpenAiCompatibleProvider;
pub use mapping::{parse_response, to_api_request, ALLOWED_SCHEMA_KEYS};
pub use model_map::{map_model_name, profile_for, AuthStyle, OpenAiCompatibleProfile, PROFILES};

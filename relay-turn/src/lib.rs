#![doc = include_str!("../README.md")]

pub mod config;
pub mod engine;
pub mod event;
pub mod state;

pub use config::TurnConfig;
pub use engine::{Turn, TurnOutcome};
pub use event::TurnEvent;
pub use state::TurnState;

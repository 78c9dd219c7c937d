#![doc = include_str!("../README.md")]

pub mod confirmation;
pub mod config;
pub mod session;
pub mod stats;
pub mod subagent;

pub use confirmation::AlwaysApprove;
pub use config::{CompressionStrategyKind, RelayConfig};
pub use session::Session;
pub use stats::SessionStats;
pub use subagent::{SubagentProfile, SubagentRegistry};

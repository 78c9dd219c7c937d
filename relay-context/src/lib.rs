#![doc = include_str!("../README.md")]

pub mod counter;
pub mod limits;
pub mod manager;
pub mod strategies;

pub use counter::TokenCounter;
pub use limits::{limits_for_model, TokenLimits};
pub use manager::{prepare_messages_for_generation, AutoCompressThreshold, CompressionDiagnostic};
pub use strategies::{
    BoxedStrategy, CompressionStrategy, SlidingWindowStrategy, SummarizeMiddleStrategy,
    TruncateOldestStrategy,
};

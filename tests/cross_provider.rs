//! Cross-provider integration tests against live backends.
//!
//! Run with API keys set:
//! ```bash
//! GEMINI_API_KEY=... cargo test --test cross_provider -- --ignored gemini
//! MOONSHOT_API_KEY=... cargo test --test cross_provider -- --ignored moonshot
//! ```
//!
//! All tests require live API keys and are `#[ignore]` by default. They
//! verify that a full `Session` turn behaves the same shape across
//! providers: `Finished` as the last event, non-empty history growth.

use std::collections::HashMap;
use std::path::PathBuf;

use relay_orch::{RelayConfig, Session};
use relay_provider_gemini::GeminiProvider;
use relay_provider_openai::OpenAiCompatibleProvider;
use relay_tool::ToolRegistry;
use relay_turn::TurnEvent;
use tokio_util::sync::CancellationToken;

#[tokio::test]
#[ignore]
async fn gemini_session_simple_prompt() {
    let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");
    let provider = GeminiProvider::new("gemini-2.0-flash", api_key);
    let config = RelayConfig::new("gemini-2.0-flash");

    let mut session = Session::new(provider, ToolRegistry::new(), config, PathBuf::from("."), "cross-gemini", HashMap::new());

    let abort = CancellationToken::new();
    let events = session.send_message("Say hello in exactly three words.", &abort).await;

    assert!(matches!(events.last(), Some(TurnEvent::Finished { .. })), "turn should finish cleanly");
    assert!(session.history().len() >= 2, "history should contain the user message and a reply");
}

#[tokio::test]
#[ignore]
async fn moonshot_session_simple_prompt() {
    let api_key = std::env::var("MOONSHOT_API_KEY").expect("MOONSHOT_API_KEY must be set");
    let provider =
        OpenAiCompatibleProvider::new("moonshot", "kimi-k2-instruct", api_key).expect("moonshot is a known profile");
    let config = RelayConfig::new("kimi-k2-instruct");

    let mut session = Session::new(provider, ToolRegistry::new(), config, PathBuf::from("."), "cross-moonshot", HashMap::new());

    let abort = CancellationToken::new();
    let events = session.send_message("Say hello in exactly three words.", &abort).await;

    assert!(matches!(events.last(), Some(TurnEvent::Finished { .. })), "turn should finish cleanly");
    assert!(session.history().len() >= 2, "history should contain the user message and a reply");
}

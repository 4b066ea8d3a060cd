//! Tool orchestration demo
//!
//! Asks one question of an agent that owns a single `get_weather` tool.
//! Uses an OpenAI-compatible endpoint when `OPENAI_API_KEY` is set,
//! otherwise a local Ollama.
//!
//! ```text
//! cargo run -p agent-demo -- "What's the weather in Virginia?"
//! ```

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{
    schema::{Arguments, ParamType, ParameterSchema},
    tool::FnTool,
    Agent, AgentConfig, LlmProvider, ProviderInfo, RunOutcome, ToolProtocol,
};
use agent_runtime::{openai, OllamaProvider, OpenAiProvider};

const DEFAULT_QUESTION: &str = "What's the weather in Virginia?";

fn weather_tool() -> FnTool {
    FnTool::new("get_weather", |args: Arguments| async move {
        match args.str("location") {
            Some(location) => Ok(json!(format!("{location}: 70 degrees and sunny."))),
            None => Err(anyhow::anyhow!("location is required")),
        }
    })
    .description("Get the current weather for a location.")
    .param(ParameterSchema::required("location", ParamType::String).describe("City, region or country"))
}

/// Fill in what the environment left unset with values suited to the backend
fn apply_backend_defaults(
    config: &mut AgentConfig,
    info: &ProviderInfo,
    default_model: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if lookup("AGENT_PROTOCOL").is_none() {
        config.protocol = ToolProtocol::for_provider(info);
    }
    if let (None, Some(model)) = (lookup("AGENT_MODEL"), default_model) {
        config.generation.model = model.to_string();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,agent_core=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (provider, default_model): (Arc<dyn LlmProvider>, Option<&str>) =
        if std::env::var("OPENAI_API_KEY").is_ok() {
            (Arc::new(OpenAiProvider::from_env()?), Some(openai::DEFAULT_MODEL))
        } else {
            (Arc::new(OllamaProvider::from_env()), None)
        };

    let info = provider.info();
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to {}", info.name),
        Ok(false) | Err(_) => tracing::warn!("⚠ {} not available - requests will fail", info.name),
    }

    let mut config = AgentConfig::from_env()?;
    apply_backend_defaults(&mut config, &info, default_model, |key| std::env::var(key).ok());
    tracing::info!(protocol = ?config.protocol, model = %config.generation.model, "Agent configured");

    let mut agent = Agent::builder()
        .provider(provider)
        .config(config)
        .tool(weather_tool())
        .build()?;

    let question = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let question = if question.trim().is_empty() {
        DEFAULT_QUESTION.to_string()
    } else {
        question
    };

    let outcome = agent.run(question).await?;
    tracing::info!(iterations = outcome.iterations(), "Done");
    match outcome {
        RunOutcome::Final { answer, .. } => println!("{answer}"),
        RunOutcome::BudgetExhausted { iterations, transcript } => {
            println!("No final answer after {iterations} iterations.");
            for turn in &transcript {
                println!("  [{}] {}", turn.role(), turn.content());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_info() -> ProviderInfo {
        ProviderInfo { name: "OpenAI".into(), supports_tools: true }
    }

    #[test]
    fn test_backend_defaults_fill_unset_model() {
        let mut config = AgentConfig::default();
        config.protocol = ToolProtocol::TextPrompt;
        apply_backend_defaults(&mut config, &openai_info(), Some(openai::DEFAULT_MODEL), |_| None);

        assert_eq!(config.generation.model, "gpt-4");
        assert_eq!(config.protocol, ToolProtocol::Native);
    }

    #[test]
    fn test_backend_defaults_keep_explicit_settings() {
        let mut config = AgentConfig::default();
        config.generation.model = "gpt-4o-mini".into();
        config.protocol = ToolProtocol::TextPrompt;
        apply_backend_defaults(&mut config, &openai_info(), Some(openai::DEFAULT_MODEL), |key| {
            matches!(key, "AGENT_MODEL" | "AGENT_PROTOCOL").then(|| "set".to_string())
        });

        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert_eq!(config.protocol, ToolProtocol::TextPrompt);
    }

    #[test]
    fn test_ollama_keeps_generation_default() {
        let mut config = AgentConfig::default();
        let info = ProviderInfo { name: "Ollama".into(), supports_tools: false };
        apply_backend_defaults(&mut config, &info, None, |_| None);

        assert_eq!(config.generation.model, "llama3.2");
        assert_eq!(config.protocol, ToolProtocol::TextPrompt);
    }
}

//! Builds the model backends from configuration.

use std::sync::Arc;
use std::time::Duration;
use intellicore_config::AppConfig;
use intellicore_core::model::{Embedder, LanguageModel, ProviderEmbedder, ProviderModel};
use intellicore_core::provider::Provider;
use tracing::info;
use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Stop sequence for the reasoning loop: the model must hand control back
/// before writing an observation of its own.
pub const OBSERVATION_STOP: &str = "\nObservation:";

/// The model backends every stage and tool draws from.
pub struct ModelBackends {
    pub provider: Arc<dyn Provider>,
    pub model: Arc<dyn LanguageModel>,
    /// Same model, stopped at [`OBSERVATION_STOP`].
    pub research_model: Arc<dyn LanguageModel>,
    /// Absent when no API key is configured.
    pub embedder: Option<Arc<dyn Embedder>>,
}

/// Build providers from configuration.
///
/// The OpenAI-compatible endpoint is wrapped in a single-entry fallback chain
/// so every call is bounded by `request_timeout_secs`.
pub fn build_from_config(config: &AppConfig) -> ModelBackends {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let api_key = config.api_key.clone().unwrap_or_default();
    let name = provider_name(&config.base_url);

    let endpoint = Arc::new(OpenAiCompatProvider::with_timeout(
        name,
        &config.base_url,
        &api_key,
        timeout,
    ));
    let provider: Arc<dyn Provider> =
        Arc::new(FallbackProvider::new(name).add(endpoint, timeout));

    info!(
        provider = name,
        model = %config.default_model,
        base_url = %config.base_url,
        "Model backend configured"
    );

    let model: Arc<dyn LanguageModel> = Arc::new(chat_model(&provider, config));
    let research_model: Arc<dyn LanguageModel> = Arc::new(research_model(&provider, config));

    let embedder: Option<Arc<dyn Embedder>> = config.has_api_key().then(|| {
        Arc::new(ProviderEmbedder::new(provider.clone(), &config.embedding_model))
            as Arc<dyn Embedder>
    });

    ModelBackends {
        provider,
        model,
        research_model,
        embedder,
    }
}

fn chat_model(provider: &Arc<dyn Provider>, config: &AppConfig) -> ProviderModel {
    ProviderModel::new(provider.clone(), &config.default_model)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
}

fn research_model(provider: &Arc<dyn Provider>, config: &AppConfig) -> ProviderModel {
    chat_model(provider, config).with_stop(vec![OBSERVATION_STOP.to_string()])
}

/// Short provider name derived from a well-known base URL.
fn provider_name(base_url: &str) -> &'static str {
    const KNOWN: &[(&str, &str)] = &[
        ("api.openai.com", "openai"),
        ("siliconflow", "siliconflow"),
        ("api.deepseek.com", "deepseek"),
        ("openrouter.ai", "openrouter"),
        ("localhost:11434", "ollama"),
        ("localhost:8000", "vllm"),
    ];

    KNOWN
        .iter()
        .find(|(needle, _)| base_url.contains(needle))
        .map(|(_, name)| *name)
        .unwrap_or("openai-compat")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_for_known_urls() {
        assert_eq!(provider_name("https://api.openai.com/v1"), "openai");
        assert_eq!(provider_name("https://api.siliconflow.cn/v1"), "siliconflow");
        assert_eq!(provider_name("http://localhost:11434/v1"), "ollama");
        assert_eq!(provider_name("https://llm.internal/v1"), "openai-compat");
    }

    #[test]
    fn build_from_default_config_has_no_embedder() {
        let config = AppConfig::default();
        let backends = build_from_config(&config);
        assert_eq!(backends.provider.name(), "openai");
        assert!(backends.embedder.is_none());
    }

    #[test]
    fn research_model_stops_before_observations() {
        let config = AppConfig::default();
        let backends = build_from_config(&config);

        let research = research_model(&backends.provider, &config);
        assert_eq!(research.stop(), [OBSERVATION_STOP.to_string()]);
        assert_eq!(research.model(), config.default_model);
        assert!(chat_model(&backends.provider, &config).stop().is_empty());
    }

    #[test]
    fn api_key_enables_embedder() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).embedder.is_some());
    }
}

//! Prompt-level model seams.
//!
//! The reasoning loop and stage functions only ever need `complete(prompt)`
//! and `embed(text)`. [`ProviderModel`] and [`ProviderEmbedder`] adapt any
//! [`Provider`] to those two calls.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::ProviderError;
use crate::message::Message;
use crate::provider::{EmbeddingRequest, Provider, ProviderRequest};

/// A text-completion backend: one prompt in, one completion out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError>;
}

/// A text embedding function.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;

    /// One vector per input, in order. Defaults to one `embed` call each.
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Adapts a chat [`Provider`] into a [`LanguageModel`].
///
/// The prompt is sent as a single user message.
pub struct ProviderModel {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    stop: Vec<String>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            stop: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn stop(&self) -> &[String] {
        &self.stop
    }
}

#[async_trait]
impl LanguageModel for ProviderModel {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: self.stop.clone(),
        };

        let response = self.provider.complete(request).await?;
        debug!(
            provider = %self.provider.name(),
            model = %response.model,
            chars = response.message.content.len(),
            "Completion received"
        );
        Ok(response.message.content)
    }
}

/// Adapts a [`Provider`]'s embedding endpoint into an [`Embedder`].
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("embedding response was empty".into()))
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await?;

        if response.embeddings.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{EmbeddingResponse, ProviderResponse};
    use std::sync::Mutex;

    struct RecordingProvider {
        last: Mutex<Option<ProviderRequest>>,
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            let reply = format!("echo: {}", request.messages[0].content);
            *self.last.lock().unwrap() = Some(request);
            Ok(ProviderResponse {
                message: Message::assistant(reply),
                usage: None,
                model: "m".into(),
            })
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> std::result::Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|s| vec![s.len() as f32]).collect(),
                model: request.model,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn provider_model_sends_prompt_as_user_message() {
        let provider = Arc::new(RecordingProvider {
            last: Mutex::new(None),
        });
        let model = ProviderModel::new(provider.clone(), "test-model")
            .with_temperature(0.2)
            .with_stop(vec!["\nObservation:".into()]);

        let out = model.complete("hello").await.unwrap();
        assert_eq!(out, "echo: hello");

        let sent = provider.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.model, "test-model");
        assert_eq!(sent.messages.len(), 1);
        assert_eq!(sent.stop, vec!["\nObservation:".to_string()]);
        assert!((sent.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn provider_embedder_returns_first_vector() {
        let provider = Arc::new(RecordingProvider {
            last: Mutex::new(None),
        });
        let embedder = ProviderEmbedder::new(provider, "embed-model");
        assert_eq!(embedder.embed("abcd").await.unwrap(), vec![4.0]);
    }

    #[tokio::test]
    async fn provider_embedder_batches_in_order() {
        let provider = Arc::new(RecordingProvider {
            last: Mutex::new(None),
        });
        let embedder = ProviderEmbedder::new(provider, "embed-model");
        let texts = vec!["a".to_string(), "abc".to_string(), "ab".to_string()];

        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![3.0], vec![2.0]]);
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}

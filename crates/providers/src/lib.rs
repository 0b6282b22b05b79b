//! LLM provider implementations for IntelliCore.
//!
//! All providers implement the `intellicore_core::Provider` trait.
//! `build_from_config` wires the configured endpoint into the prompt-level
//! `LanguageModel` and `Embedder` seams.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ModelBackends, OBSERVATION_STOP, build_from_config};

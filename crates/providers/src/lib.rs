//! Reasoning-service clients for Quarry.
//!
//! All providers implement the `quarry_core::Provider` trait. Today that is
//! one OpenAI-compatible client; `build_from_config` wires it from settings.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use quarry_config::AppConfig;
use quarry_core::error::ProviderError;
use quarry_core::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured provider.
///
/// A missing API key is a setup error, reported before any task runs.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(
                "no API key: set QUARRY_API_KEY or SILICONFLOW_API_KEY, or api_key in the config file".into(),
            )
        })?;

    let provider = OpenAiCompatProvider::new(
        "openai-compatible",
        &config.api_base,
        api_key,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    tracing::debug!(base = %config.api_base, model = %config.model, "Provider configured");
    Ok(Arc::new(provider))
}

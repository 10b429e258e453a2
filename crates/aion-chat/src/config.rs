//! Provider defaults.

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-sonnet-20240229";

/// Token budget for Anthropic completions (the Messages API requires one).
pub const ANTHROPIC_MAX_TOKENS: u32 = 1024;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Ollama ignores the bearer token but OpenAI-compatible clients send one.
pub const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

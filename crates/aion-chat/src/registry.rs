//! Provider selection by name.

use std::collections::HashMap;

use aion_core::ProviderSettings;
use reqwest::Client;
use tracing::debug;

use crate::providers::{Provider, ProviderKind};

/// Maps request provider names onto provider variants.
///
/// Lookup is case-insensitive. Names missing from the table (and an absent
/// name) fall back to OpenAI rather than being rejected. Anthropic is not
/// in the default table; it becomes selectable only through [`register`].
///
/// [`register`]: ProviderRegistry::register
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    settings: ProviderSettings,
    client: Client,
    table: HashMap<String, ProviderKind>,
    fallback: ProviderKind,
}

impl ProviderRegistry {
    pub fn new(settings: ProviderSettings) -> Self {
        Self::with_client(settings, Client::new())
    }

    /// Share an existing HTTP client (and its connection pool).
    pub fn with_client(settings: ProviderSettings, client: Client) -> Self {
        let table = HashMap::from([
            ("openai".to_string(), ProviderKind::OpenAI),
            ("ollama".to_string(), ProviderKind::Ollama),
        ]);

        Self {
            settings,
            client,
            table,
            fallback: ProviderKind::OpenAI,
        }
    }

    /// Make `name` select `kind`.
    pub fn register(&mut self, name: &str, kind: ProviderKind) {
        self.table.insert(name.to_lowercase(), kind);
    }

    /// Which variant `name` selects.
    pub fn resolve(&self, name: Option<&str>) -> ProviderKind {
        name.and_then(|n| self.table.get(&n.to_lowercase()).copied())
            .unwrap_or(self.fallback)
    }

    /// Build the provider `name` selects.
    pub fn get(&self, name: Option<&str>) -> Provider {
        let kind = self.resolve(name);
        debug!("Provider {:?} resolved to {}", name, kind);
        Provider::new(kind, &self.settings, self.client.clone())
    }
}

//! Chat request orchestration: recall, augment, remember, stream.

use aion_core::{Error, Result};
use aion_store::{MemoryStore, Metadata, DEFAULT_SEARCH_RESULTS};
use tracing::info;

use crate::prompt::augment_messages;
use crate::providers::TextStream;
use crate::registry::ProviderRegistry;
use crate::types::ChatRequest;
use crate::writer::MemoryWriter;

/// Handles one chat request end to end, up to the point of streaming.
pub struct ChatHandler {
    registry: ProviderRegistry,
    memory: MemoryStore,
    writer: MemoryWriter,
    search_results: usize,
}

impl ChatHandler {
    pub fn new(registry: ProviderRegistry, memory: MemoryStore, writer: MemoryWriter) -> Self {
        Self {
            registry,
            memory,
            writer,
            search_results: DEFAULT_SEARCH_RESULTS,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Recall memories for the latest message, merge them into the system
    /// prompt, queue the latest message for storage and start generation.
    ///
    /// The memory write is queued before the stream is returned and is not
    /// tied to it: it is attempted whether or not generation succeeds.
    /// An empty `messages` list is rejected before anything else happens.
    pub async fn handle(&self, request: ChatRequest) -> Result<TextStream> {
        let provider = self.registry.get(request.provider.as_deref());

        let query = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .ok_or_else(|| Error::InvalidRequest("messages must not be empty".into()))?;

        let memories = self.memory.search_memories(&query, self.search_results).await?;

        info!(
            "Chat request: provider={}, conversation={}, messages={}, memories={}",
            provider.kind(),
            request.conversation_id.as_deref().unwrap_or("-"),
            request.messages.len(),
            memories.len()
        );

        let messages = augment_messages(request.messages, &memories);

        let mut metadata = Metadata::new();
        metadata.insert("role".into(), "user".into());
        self.writer.schedule(query, metadata);

        Ok(provider.stream(messages, request.model.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use aion_core::ProviderSettings;
    use aion_store::{MetadataValue, QueryResult, VectorCollection};
    use serde_json::{json, Value};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_stream::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::types::{Message, Role};
    use crate::writer::MemoryWrite;

    /// Collection returning canned search hits and recording queries.
    struct CannedCollection {
        hits: Vec<String>,
        queries: Mutex<Vec<String>>,
    }

    impl VectorCollection for CannedCollection {
        fn name(&self) -> &str {
            "canned"
        }

        fn add(&self, _: &[String], _: &[String], _: &[Metadata]) -> Result<()> {
            Ok(())
        }

        fn query(&self, query_texts: &[String], _: usize) -> Result<QueryResult> {
            self.queries.lock().unwrap().extend(query_texts.iter().cloned());
            Ok(QueryResult {
                ids: vec![self.hits.iter().enumerate().map(|(i, _)| i.to_string()).collect()],
                documents: vec![self.hits.clone()],
                metadatas: vec![vec![Metadata::new(); self.hits.len()]],
                distances: vec![vec![0.1; self.hits.len()]],
            })
        }

        fn count(&self) -> Result<usize> {
            Ok(self.hits.len())
        }
    }

    fn openai_reply(fragments: &[&str]) -> ResponseTemplate {
        let mut body = String::new();
        for f in fragments {
            body.push_str(&format!(
                "data: {}\n\n",
                json!({"choices": [{"delta": {"content": f}}]})
            ));
        }
        body.push_str("data: [DONE]\n\n");
        ResponseTemplate::new(200).set_body_string(body)
    }

    fn handler(
        server: &MockServer,
        hits: &[&str],
    ) -> (ChatHandler, Arc<CannedCollection>, UnboundedReceiver<MemoryWrite>) {
        let settings = ProviderSettings {
            openai_api_key: Some("sk-test".into()),
            openai_base_url: server.uri(),
            ..ProviderSettings::from_lookup(|_| None)
        };
        let collection = Arc::new(CannedCollection {
            hits: hits.iter().map(|h| h.to_string()).collect(),
            queries: Mutex::new(Vec::new()),
        });
        let (writer, rx) = MemoryWriter::channel();
        let handler = ChatHandler::new(
            ProviderRegistry::new(settings),
            MemoryStore::new(collection.clone()),
            writer,
        );
        (handler, collection, rx)
    }

    fn request(value: Value) -> ChatRequest {
        serde_json::from_value(value).unwrap()
    }

    async fn forwarded_messages(server: &MockServer) -> Vec<Message> {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        serde_json::from_value(body["messages"].clone()).unwrap()
    }

    async fn drain(stream: TextStream) -> String {
        let parts: Vec<Result<String>> = stream.collect().await;
        parts.into_iter().map(|p| p.unwrap()).collect()
    }

    #[tokio::test]
    async fn test_empty_store_streams_reply_and_schedules_one_write() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(openai_reply(&["AION ", "is ", "a cognitive system."]))
            .mount(&server)
            .await;

        let (handler, collection, mut rx) = handler(&server, &[]);
        let stream = handler
            .handle(request(json!({
                "messages": [{"role": "user", "content": "What is AION?"}],
                "provider": "openai",
            })))
            .await
            .unwrap();

        assert_eq!(drain(stream).await, "AION is a cognitive system.");
        assert_eq!(*collection.queries.lock().unwrap(), vec!["What is AION?".to_string()]);
        assert_eq!(forwarded_messages(&server).await, vec![Message::user("What is AION?")]);

        let write = rx.try_recv().unwrap();
        assert_eq!(write.content, "What is AION?");
        assert_eq!(write.metadata.get("role"), Some(&MetadataValue::Str("user".into())));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_memories_merge_into_existing_system_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(openai_reply(&["ok"]))
            .mount(&server)
            .await;

        let (handler, _collection, _rx) = handler(&server, &["AION was started in 2024"]);
        let stream = handler
            .handle(request(json!({
                "messages": [
                    {"role": "system", "content": "Be terse."},
                    {"role": "user", "content": "When did AION start?"},
                ],
            })))
            .await
            .unwrap();
        drain(stream).await;

        let forwarded = forwarded_messages(&server).await;
        assert_eq!(forwarded.len(), 2);
        assert_eq!(forwarded[0].role, Role::System);
        assert!(forwarded[0].content.contains("Be terse."));
        assert!(forwarded[0].content.contains("AION was started in 2024"));
        assert_eq!(forwarded[1], Message::user("When did AION start?"));
    }

    #[tokio::test]
    async fn test_memories_insert_system_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(openai_reply(&["ok"]))
            .mount(&server)
            .await;

        let (handler, _collection, _rx) = handler(&server, &["likes rust", "lives in Lisbon"]);
        let stream = handler
            .handle(request(json!({
                "messages": [{"role": "user", "content": "Recommend a language"}],
            })))
            .await
            .unwrap();
        drain(stream).await;

        let forwarded = forwarded_messages(&server).await;
        assert_eq!(forwarded.len(), 2);
        assert_eq!(forwarded[0].role, Role::System);
        assert!(forwarded[0].content.contains("likes rust"));
        assert!(forwarded[0].content.contains("lives in Lisbon"));
    }

    #[tokio::test]
    async fn test_write_is_scheduled_even_when_generation_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (handler, _collection, mut rx) = handler(&server, &[]);
        let stream = handler
            .handle(request(json!({
                "messages": [{"role": "user", "content": "still remember me"}],
            })))
            .await
            .unwrap();

        let items: Vec<Result<String>> = stream.collect().await;
        assert!(matches!(items.as_slice(), [Err(Error::Provider(_))]));
        assert_eq!(rx.try_recv().unwrap().content, "still remember me");
    }

    #[tokio::test]
    async fn test_empty_messages_rejected_without_side_effects() {
        let server = MockServer::start().await;
        let (handler, collection, mut rx) = handler(&server, &["unused"]);

        let err = match handler.handle(request(json!({"messages": []}))).await {
            Err(e) => e,
            Ok(_) => panic!("empty conversation was accepted"),
        };

        assert!(err.is_client_error());
        assert!(collection.queries.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

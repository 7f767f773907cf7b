//! The assistant facade: one `chat` call per user query.
//!
//! A [`Runtime`] holds the process-wide handles (provider, similarity index,
//! record store, conversation stores, event bus) and is built once at
//! startup. Everything scoped to a single query (bound identity, tool
//! registry, session memory, reasoning loop) is built inside
//! [`Assistant::chat`] and dropped when it returns.

use chrono::Utc;
use folio_config::{AgentConfig, AppConfig};
use folio_core::error::{Error, ToolError};
use folio_core::event::{DomainEvent, EventBus};
use folio_core::memory::{ConversationStore, SessionId};
use folio_core::provider::Provider;
use folio_core::record::RecordStore;
use folio_core::search::VectorStore;
use folio_core::tool::{BoundParams, ToolRegistry};
use folio_memory::{
    FileConversationStore, InMemoryConversationStore, InMemoryRecordStore, InMemoryVectorStore,
    SimilarityIndex, SqliteDatabase,
};
use folio_tools::{FaqSearchSettings, Toolkit, full_registry, reduced_registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::loop_runner::{AgentLoop, Termination};
use crate::prompt::{full_system_prompt, reduced_system_prompt};
use crate::response::{ChatResponse, ResponseAssembler};
use crate::session::SessionMemory;

/// Model and loop settings applied to every query.
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub search: FaqSearchSettings,
    pub agent: AgentConfig,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".into(),
            temperature: 0.3,
            max_tokens: Some(2048),
            search: FaqSearchSettings::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl AssistantSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model_for(&config.default_provider).to_string(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            search: FaqSearchSettings {
                top_k: config.search.top_k,
                min_similarity: config.search.min_similarity,
            },
            agent: config.agent.clone(),
        }
    }
}

/// Process-wide shared handles.
pub struct Runtime {
    pub provider: Arc<dyn Provider>,
    pub toolkit: Toolkit,
    pub durable: Arc<dyn ConversationStore>,
    pub fallback: Arc<dyn ConversationStore>,
    pub events: EventBus,
    pub settings: AssistantSettings,
    database: Option<SqliteDatabase>,
}

impl Runtime {
    /// A runtime with volatile conversation stores and default settings.
    pub fn new(provider: Arc<dyn Provider>, toolkit: Toolkit) -> Self {
        Self {
            provider,
            toolkit,
            durable: Arc::new(InMemoryConversationStore::new()),
            fallback: Arc::new(InMemoryConversationStore::new()),
            events: EventBus::default(),
            settings: AssistantSettings::default(),
            database: None,
        }
    }

    pub fn with_conversations(mut self, durable: Arc<dyn ConversationStore>) -> Self {
        self.durable = durable;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_settings(mut self, settings: AssistantSettings) -> Self {
        self.toolkit.search = settings.search;
        self.settings = settings;
        self
    }

    /// Build every shared handle the configuration names.
    ///
    /// An unreachable SQLite database does not stop startup: passages fall
    /// back to memory, conversations to the volatile store, and the record
    /// tools are left out so queries run on the reduced toolset.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let router = folio_providers::build_from_config(config)?;
        let provider = router.chat()?;
        let embedder = Arc::new(router.embedder(&config.search.embedding_model)?);
        let events = EventBus::default();

        let wants_sqlite = [
            config.search.store.as_str(),
            config.records.backend.as_str(),
            config.memory.backend.as_str(),
        ]
        .contains(&"sqlite");

        let database = if wants_sqlite {
            let path = config.database_path();
            match SqliteDatabase::open(&path).await {
                Ok(db) => Some(db),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "SQLite unavailable, continuing degraded");
                    events.publish(DomainEvent::ErrorOccurred {
                        context: "database".into(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    None
                }
            }
        } else {
            None
        };

        let vectors: Arc<dyn VectorStore> = match (config.search.store.as_str(), &database) {
            ("sqlite", Some(db)) => Arc::new(db.vectors()),
            _ => Arc::new(InMemoryVectorStore::new()),
        };

        let records: Option<Arc<dyn RecordStore>> =
            match (config.records.backend.as_str(), &database) {
                ("sqlite", Some(db)) => Some(Arc::new(db.records())),
                ("sqlite", None) => None,
                _ => Some(Arc::new(InMemoryRecordStore::new())),
            };

        let fallback: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let durable: Arc<dyn ConversationStore> =
            match (config.memory.backend.as_str(), &database) {
                ("sqlite", Some(db)) => Arc::new(db.conversations()),
                ("file", _) => Arc::new(FileConversationStore::new(config.sessions_dir())),
                _ => fallback.clone(),
            };

        let index = SimilarityIndex::new(embedder, vectors)
            .with_partition(&config.search.partition)
            .with_events(events.clone());

        let settings = AssistantSettings::from_config(config);
        let mut toolkit = Toolkit::new(Arc::new(index)).with_search(settings.search);
        toolkit.records = records;

        info!(
            provider = provider.name(),
            model = %settings.model,
            index = toolkit.index.store_name(),
            records = toolkit.records.as_ref().map(|r| r.name()).unwrap_or("none"),
            memory = durable.name(),
            "Runtime ready"
        );

        Ok(Self {
            provider,
            toolkit,
            durable,
            fallback,
            events,
            settings,
            database,
        })
    }

    /// The shared SQLite database, when one is open.
    pub fn database(&self) -> Option<&SqliteDatabase> {
        self.database.as_ref()
    }

    pub async fn shutdown(&self) {
        if let Some(db) = &self.database {
            db.close().await;
        }
    }
}

/// One user query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub verbose: bool,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            verbose: false,
        }
    }

    /// Attach the reasoning trace to the response.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub backend: String,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn up(backend: &str, detail: Option<String>) -> Self {
        Self {
            backend: backend.to_string(),
            healthy: true,
            detail,
        }
    }

    fn down(backend: &str, detail: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            healthy: false,
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub provider: ComponentHealth,
    pub index: ComponentHealth,
    pub records: ComponentHealth,
    pub memory: ComponentHealth,
}

pub struct Assistant {
    runtime: Arc<Runtime>,
}

impl Assistant {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Answer one query for `identity` (anonymous when `None`).
    ///
    /// Only an empty query is rejected. Every failure after that is folded
    /// into the response, with `success = false` when the reasoning service
    /// itself could not be reached.
    pub async fn chat(
        &self,
        identity: Option<&str>,
        request: ChatRequest,
    ) -> Result<ChatResponse, Error> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Error::InvalidQuery("query must not be empty".into()));
        }

        let rt = &self.runtime;
        let agent = &rt.settings.agent;
        let session = SessionId::for_identity(identity);
        info!(session = %session, verbose = request.verbose, "Chat request");

        let memory = SessionMemory::start(
            rt.durable.clone(),
            rt.fallback.clone(),
            session.clone(),
            &rt.events,
        )
        .await
        .with_history_limit(agent.history_limit);
        let history = memory.history().await;

        let bound = BoundParams::new(session.clone());
        let (registry, max_iterations, prompt) = match self.full_tier(&bound).await {
            Ok(registry) => (
                registry,
                agent.max_iterations,
                full_system_prompt(rt.settings.search.min_similarity),
            ),
            Err(e) => {
                warn!(session = %session, error = %e, "Full toolset unavailable, using FAQ-only tools");
                rt.events.publish(DomainEvent::ReducedMode {
                    session: session.to_string(),
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                (
                    reduced_registry(&rt.toolkit),
                    agent.reduced_max_iterations,
                    reduced_system_prompt(),
                )
            }
        };

        let mut agent_loop = AgentLoop::new(
            rt.provider.clone(),
            Arc::new(registry),
            &rt.settings.model,
            prompt,
        )
        .with_temperature(rt.settings.temperature)
        .with_max_iterations(max_iterations)
        .with_argument_retries(agent.max_argument_retries)
        .with_events(rt.events.clone());
        if let Some(max_tokens) = rt.settings.max_tokens {
            agent_loop = agent_loop.with_max_tokens(max_tokens);
        }

        let assembler = ResponseAssembler::new(request.verbose, agent.trace_output_limit);

        match agent_loop.run(&history, query).await {
            Ok(outcome) => {
                let response = assembler.assemble(&outcome, session.as_str(), query);
                memory.record_exchange(query, &response.answer).await;

                let exhausted = outcome.termination == Termination::Exhausted;
                rt.events.publish(DomainEvent::ResponseGenerated {
                    session: session.to_string(),
                    iterations: outcome.iterations,
                    exhausted,
                    timestamp: Utc::now(),
                });
                info!(
                    session = %session,
                    iterations = outcome.iterations,
                    tool_steps = outcome.trace.len(),
                    exhausted,
                    "Chat response ready"
                );
                Ok(response)
            }
            Err(e) => {
                error!(session = %session, error = %e, "Reasoning failed");
                rt.events.publish(DomainEvent::ErrorOccurred {
                    context: "chat".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Ok(assembler.degraded(&e, session.as_str(), query))
            }
        }
    }

    /// The full registry, provided the record store is present and answers.
    async fn full_tier(&self, bound: &BoundParams) -> Result<ToolRegistry, ToolError> {
        let toolkit = &self.runtime.toolkit;
        if let Some(records) = &toolkit.records {
            records.health_check().await.map_err(|e| {
                ToolError::NotConfigured(format!("record store '{}': {e}", records.name()))
            })?;
        }
        full_registry(toolkit, bound)
    }

    pub async fn health(&self) -> HealthReport {
        let rt = &self.runtime;

        let provider = match rt.provider.health_check().await {
            Ok(true) => ComponentHealth::up(rt.provider.name(), None),
            Ok(false) => ComponentHealth::down(rt.provider.name(), "not responding"),
            Err(e) => ComponentHealth::down(rt.provider.name(), e.to_string()),
        };

        let index_backend = rt.toolkit.index.store_name();
        let index = if rt.toolkit.index.health_check().await {
            let count = rt.toolkit.index.count().await;
            ComponentHealth::up(index_backend, Some(format!("{count} FAQ passages")))
        } else {
            ComponentHealth::down(index_backend, "vector store not responding")
        };

        let records = match &rt.toolkit.records {
            Some(store) => match store.health_check().await {
                Ok(()) => ComponentHealth::up(store.name(), None),
                Err(e) => ComponentHealth::down(store.name(), e.to_string()),
            },
            None => ComponentHealth::down("none", "record store not configured"),
        };

        let memory = match rt.durable.health_check().await {
            Ok(()) => ComponentHealth::up(rt.durable.name(), None),
            Err(e) => ComponentHealth::down(rt.durable.name(), e.to_string()),
        };

        let status = if [&provider, &index, &records, &memory]
            .iter()
            .all(|c| c.healthy)
        {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport {
            status,
            provider,
            index,
            records,
            memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::DEFAULT_ANSWER;
    use crate::seed::{demo_records, seed_faqs};
    use crate::test_helpers::{
        SequentialMockProvider, make_text_response, make_tool_call, make_tool_call_response,
    };
    use async_trait::async_trait;
    use folio_core::error::{MemoryError, ProviderError, RecordError, SearchError};
    use folio_core::memory::Turn;
    use folio_core::message::Role;
    use folio_core::provider::{ProviderRequest, ProviderResponse};
    use folio_core::record::{RecordType, StructuredRecord};
    use folio_core::search::Embedder;

    /// Puts texts about editing on one axis and everything else on another.
    struct TopicEmbedder;

    #[async_trait]
    impl Embedder for TopicEmbedder {
        fn name(&self) -> &str {
            "topic"
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
            Ok(if text.to_lowercase().contains("edit") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }
    }

    struct DownRecords;

    #[async_trait]
    impl RecordStore for DownRecords {
        fn name(&self) -> &str {
            "down"
        }
        async fn lookup(
            &self,
            _: RecordType,
            _: &str,
        ) -> Result<Option<StructuredRecord>, RecordError> {
            Err(RecordError::Unavailable("connection refused".into()))
        }
        async fn health_check(&self) -> Result<(), RecordError> {
            Err(RecordError::Unavailable("connection refused".into()))
        }
    }

    struct DownMemory;

    #[async_trait]
    impl ConversationStore for DownMemory {
        fn name(&self) -> &str {
            "down"
        }
        async fn append(&self, _: &SessionId, _: Turn) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("disk full".into()))
        }
        async fn load(&self, _: &SessionId) -> Result<Vec<Turn>, MemoryError> {
            Err(MemoryError::Storage("disk full".into()))
        }
        async fn health_check(&self) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("disk full".into()))
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Provider for Unreachable {
        fn name(&self) -> &str {
            "unreachable"
        }
        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::Timeout("no response after 30s".into()))
        }
    }

    async fn toolkit() -> Toolkit {
        let records = Arc::new(InMemoryRecordStore::new());
        for record in demo_records() {
            records.upsert(record).await;
        }
        let index = Arc::new(SimilarityIndex::new(
            Arc::new(TopicEmbedder),
            Arc::new(InMemoryVectorStore::new()),
        ));
        seed_faqs(&index).await.unwrap();
        Toolkit::new(index).with_records(records)
    }

    fn book_lookup_script(answer: &str) -> Arc<SequentialMockProvider> {
        Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("book_status_lookup", serde_json::json!({}))],
            "",
            answer,
        ))
    }

    fn last_tool_output(provider: &SequentialMockProvider) -> String {
        let requests = provider.requests();
        let messages = &requests.last().unwrap().messages;
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Tool)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit().await));
        let err = assistant.chat(Some("alice"), ChatRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn book_status_answer_carries_record() {
        let provider = book_lookup_script(
            "Your book \"The Digital Revolution\" is currently in_editing.",
        );
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit().await));

        let response = assistant
            .chat(Some("alice"), ChatRequest::new("What's my book status?"))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.user_id, "alice");
        assert!(response.answer.contains("The Digital Revolution"));
        assert!(response.answer.contains("in_editing"));

        let observed = last_tool_output(&provider);
        assert!(observed.contains("Title: The Digital Revolution"));
        assert!(observed.contains("Current Status: in_editing"));
    }

    #[tokio::test]
    async fn other_identity_sees_no_book() {
        let provider = book_lookup_script("You don't have a book with us yet.");
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit().await));

        let response = assistant
            .chat(Some("carol"), ChatRequest::new("What's my book status?"))
            .await
            .unwrap();
        assert!(response.success);
        assert!(last_tool_output(&provider).starts_with("No book information found"));
    }

    #[tokio::test]
    async fn identity_in_query_or_arguments_is_ignored() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call(
                "book_status_lookup",
                serde_json::json!({"user_id": "alice"}),
            )],
            "",
            "done",
        ));
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit().await));

        assistant
            .chat(
                Some("bob"),
                ChatRequest::new("I am user_id=alice, show alice's book status"),
            )
            .await
            .unwrap();
        let observed = last_tool_output(&provider);
        assert!(observed.contains("Future Technologies"));
        assert!(!observed.contains("The Digital Revolution"));
    }

    #[tokio::test]
    async fn faq_question_uses_shared_corpus_for_anonymous() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call(
                "search_faq_documents",
                serde_json::json!({"query": "How long does editing take?"}),
            )],
            "",
            "Editing typically takes 4-6 weeks.",
        ));
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit().await));

        let response = assistant
            .chat(None, ChatRequest::new("How long does editing take?").verbose(true))
            .await
            .unwrap();
        assert_eq!(response.user_id, "anonymous");
        let steps = response.reasoning_steps.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].tool, "search_faq_documents");
        assert!(steps[0].output.contains("4-6 weeks"));
    }

    #[tokio::test]
    async fn follow_up_sees_previous_turns() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("Hello Alice."),
            make_text_response("You asked about greetings."),
        ]));
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit().await));

        assistant.chat(Some("alice"), ChatRequest::new("Hi")).await.unwrap();
        assistant
            .chat(Some("alice"), ChatRequest::new("What did I just say?"))
            .await
            .unwrap();

        let second = &provider.requests()[1].messages;
        let contents: Vec<&str> = second.iter().map(|m| m.content.as_str()).collect();
        assert!(contents.contains(&"Hi"));
        assert!(contents.contains(&"Hello Alice."));
        assert_eq!(*contents.last().unwrap(), "What did I just say?");
    }

    #[tokio::test]
    async fn sessions_do_not_share_history() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("one"),
            make_text_response("two"),
        ]));
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit().await));

        assistant.chat(Some("alice"), ChatRequest::new("secret")).await.unwrap();
        assistant.chat(Some("bob"), ChatRequest::new("hello")).await.unwrap();

        let second = &provider.requests()[1].messages;
        assert!(second.iter().all(|m| m.content != "secret"));
    }

    /// Answers every query by echoing it with the number of user messages
    /// in the prompt, so each reply reveals how much history was sent.
    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }
        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let users: Vec<&str> = request
                .messages
                .iter()
                .filter(|m| m.role == Role::User)
                .map(|m| m.content.as_str())
                .collect();
            tokio::task::yield_now().await;
            let last = users.last().copied().unwrap_or_default();
            Ok(make_text_response(&format!("{last} (seen {})", users.len())))
        }
    }

    const CONCURRENT_USERS: [&str; 4] = ["alice", "bob", "carol", "dave"];
    const QUERIES_PER_USER: usize = 3;

    /// Several identities chat at the same time; each session must hold
    /// only its own turns, in order.
    async fn chat_concurrently(durable: Arc<dyn ConversationStore>) {
        let runtime =
            Runtime::new(Arc::new(EchoProvider), toolkit().await).with_conversations(durable.clone());
        let assistant = Arc::new(Assistant::new(runtime));

        let mut tasks = tokio::task::JoinSet::new();
        for user in CONCURRENT_USERS {
            let assistant = assistant.clone();
            tasks.spawn(async move {
                for i in 0..QUERIES_PER_USER {
                    let response = assistant
                        .chat(Some(user), ChatRequest::new(format!("{user} q{i}")))
                        .await
                        .unwrap();
                    assert_eq!(response.answer, format!("{user} q{i} (seen {})", i + 1));
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        for user in CONCURRENT_USERS {
            let turns = durable.load(&SessionId::from(user)).await.unwrap();
            let expected: Vec<String> = (0..QUERIES_PER_USER)
                .flat_map(|i| {
                    let q = format!("{user} q{i}");
                    let a = format!("{q} (seen {})", i + 1);
                    [q, a]
                })
                .collect();
            let contents: Vec<String> = turns.into_iter().map(|t| t.content).collect();
            assert_eq!(contents, expected, "history of {user}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sessions_stay_isolated_in_memory() {
        chat_concurrently(Arc::new(InMemoryConversationStore::new())).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sessions_stay_isolated_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        chat_concurrently(Arc::new(FileConversationStore::new(dir.path()))).await;
    }

    #[tokio::test]
    async fn provider_failure_degrades_response() {
        let assistant = Assistant::new(Runtime::new(Arc::new(Unreachable), toolkit().await));
        let response = assistant
            .chat(Some("alice"), ChatRequest::new("What's my book status?"))
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.answer.contains("no response after 30s"));
    }

    #[tokio::test]
    async fn empty_model_answer_gets_default() {
        let provider = Arc::new(SequentialMockProvider::single_text(""));
        let assistant = Assistant::new(Runtime::new(provider, toolkit().await));
        let response = assistant.chat(Some("alice"), ChatRequest::new("?")).await.unwrap();
        assert_eq!(response.answer, DEFAULT_ANSWER);
    }

    #[tokio::test]
    async fn missing_records_use_reduced_tier() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let provider = Arc::new(SequentialMockProvider::single_text("FAQ only today."));
        let mut toolkit = toolkit().await;
        toolkit.records = None;
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit).with_events(bus));

        let response = assistant
            .chat(Some("alice"), ChatRequest::new("What's my book status?"))
            .await
            .unwrap();
        assert!(response.success);

        let tools: Vec<String> = provider.requests()[0]
            .tools
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(tools, vec!["search_faq_documents"]);
        assert!(matches!(
            rx.recv().await.unwrap().as_ref(),
            DomainEvent::ReducedMode { .. }
        ));
    }

    #[tokio::test]
    async fn unhealthy_records_use_reduced_tier_with_lower_ceiling() {
        let call = || make_tool_call("search_faq_documents", serde_json::json!({"query": "x"}));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![call()], ""),
            make_tool_call_response(vec![call()], ""),
            make_text_response("Here is what the FAQ says."),
        ]));
        let toolkit = toolkit().await.with_records(Arc::new(DownRecords));
        let assistant = Assistant::new(Runtime::new(provider.clone(), toolkit));

        let response = assistant
            .chat(Some("alice"), ChatRequest::new("q"))
            .await
            .unwrap();
        // two tool steps, then the tool-less generate call
        assert_eq!(provider.call_count(), 3);
        assert!(provider.requests()[2].tools.is_empty());
        assert_eq!(response.answer, "Here is what the FAQ says.");
    }

    #[tokio::test]
    async fn memory_outage_is_invisible_to_caller() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("first"),
            make_text_response("second"),
        ]));
        let runtime = Runtime::new(provider.clone(), toolkit().await)
            .with_conversations(Arc::new(DownMemory));
        let assistant = Assistant::new(runtime);

        let first = assistant.chat(Some("alice"), ChatRequest::new("q1")).await.unwrap();
        assert!(first.success);
        assistant.chat(Some("alice"), ChatRequest::new("q2")).await.unwrap();

        // the fallback store carried the first exchange into the second query
        let second = &provider.requests()[1].messages;
        assert!(second.iter().any(|m| m.content == "q1"));
    }

    #[tokio::test]
    async fn health_reports_degraded_components() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let healthy = Assistant::new(Runtime::new(provider.clone(), toolkit().await));
        let report = healthy.health().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.index.detail.as_deref(), Some("6 FAQ passages"));

        let degraded = Assistant::new(
            Runtime::new(provider, toolkit().await.with_records(Arc::new(DownRecords)))
                .with_conversations(Arc::new(DownMemory)),
        );
        let report = degraded.health().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(!report.records.healthy);
        assert!(!report.memory.healthy);
        assert!(report.provider.healthy);
    }

    #[tokio::test]
    async fn settings_thread_through_to_requests() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let settings = AssistantSettings {
            model: "custom-model".into(),
            temperature: 0.1,
            ..AssistantSettings::default()
        };
        let assistant =
            Assistant::new(Runtime::new(provider.clone(), toolkit().await).with_settings(settings));
        assistant.chat(Some("alice"), ChatRequest::new("hi")).await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.model, "custom-model");
        assert!((request.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, Some(2048));
        assert!(request.messages[0].content.contains("at least 0.7"));
    }
}

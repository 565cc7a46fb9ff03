//! Chat session manager.
//!
//! Owns the transcript and the pending flag. A submission goes
//! `Idle -> Sending -> Idle | Errored`; while `Sending`, further submissions
//! are dropped. The history sent with a question includes the question itself.

use serde::{Deserialize, Serialize};

use crate::api::{AgentBackend, ApiResult, AskReply, AskRequest};
use crate::auth::Session;
use crate::error::Result;
use crate::state::{Role, SessionState, Turn};
use crate::status;
use crate::step::Step;
use crate::store::{keys, KeyValueStore};

pub const DEFAULT_STARTUP: &str = "Minha Startup";
pub const NO_RESPONSE_FALLBACK: &str = "The backend returned no response.";
pub const GREETING: &str = "Hi! I'm the TR4CTION Agent. Set up your startup and ask me anything about the official FCJ trail.";

/// Startup and trail step sent with every question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(rename = "startup", default)]
    pub startup_id: String,
    #[serde(default)]
    pub step: String,
}

impl ChatConfig {
    pub fn new(startup_id: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            startup_id: startup_id.into(),
            step: step.into(),
        }
    }

    pub fn effective_startup(&self) -> &str {
        match self.startup_id.trim() {
            "" => DEFAULT_STARTUP,
            s => s,
        }
    }

    pub fn effective_step(&self) -> &str {
        match self.step.trim() {
            "" => Step::All.as_str(),
            s => s,
        }
    }

    /// Last saved config, with the logged-in founder's startup filled in when blank.
    pub fn restore(store: &KeyValueStore, session: Option<&Session>) -> Self {
        let mut config = match store.get(keys::AGENT_CONFIG) {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring unreadable chat config");
                Self::default()
            }),
            None => Self::default(),
        };

        if config.startup_id.trim().is_empty() {
            if let Some(name) = session.and_then(|s| s.startup_name.as_deref()) {
                config.startup_id = name.to_string();
            }
        }
        config
    }

    pub fn persist(&self, store: &mut KeyValueStore) -> Result<()> {
        let saved = Self::new(self.startup_id.trim(), self.step.clone());
        store.set(keys::AGENT_CONFIG, serde_json::to_string(&saved)?)
    }
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Rejected up front: blank text or a request already in flight
    Ignored,
    Answered(String),
    /// Display-only error; nothing was added to the transcript
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ChatSession {
    transcript: Vec<Turn>,
    state: SessionState,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_sending()
    }

    /// First half of a submission: guard, append the user turn, enter `Sending`.
    ///
    /// Returns the request to send, or `None` when the submission is a no-op.
    pub fn begin(&mut self, text: &str, config: &ChatConfig) -> Option<AskRequest> {
        let text = text.trim();
        if text.is_empty() || self.is_pending() {
            return None;
        }

        self.transcript.push(Turn::new(Role::User, text));
        self.state = SessionState::Sending;

        Some(AskRequest {
            startup_id: config.effective_startup().to_string(),
            step: config.effective_step().to_string(),
            history: self.transcript.clone(),
            user_input: text.to_string(),
        })
    }

    /// Second half: resolve the in-flight request. Always leaves `Sending`.
    pub fn complete(&mut self, result: ApiResult<AskReply>) -> Outcome {
        if !self.is_pending() {
            tracing::warn!("chat reply arrived with no request in flight");
            return Outcome::Ignored;
        }

        match result {
            Ok(reply) => {
                let answer = reply
                    .response
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string());
                self.transcript.push(Turn::new(Role::Assistant, answer.clone()));
                self.state = SessionState::Idle;
                Outcome::Answered(answer)
            }
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                let message = status::chat_failure(&err);
                self.state = SessionState::Errored(message.clone());
                Outcome::Failed(message)
            }
        }
    }

    /// Full round-trip against `backend`.
    pub async fn submit<B>(&mut self, backend: &B, text: &str, config: &ChatConfig) -> Outcome
    where
        B: AgentBackend + ?Sized,
    {
        let Some(request) = self.begin(text, config) else {
            return Outcome::Ignored;
        };
        let result = backend.ask(&request).await;
        self.complete(result)
    }

    /// Hides the error banner of the last failed request.
    pub fn dismiss_error(&mut self) {
        if self.state.error().is_some() {
            self.state = SessionState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned results and records every request it sees.
    struct FakeBackend {
        replies: Mutex<Vec<ApiResult<AskReply>>>,
        seen: Mutex<Vec<AskRequest>>,
    }

    impl FakeBackend {
        fn new(replies: Vec<ApiResult<AskReply>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn answering(text: &str) -> Self {
            Self::new(vec![Ok(AskReply {
                response: Some(text.to_string()),
            })])
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AgentBackend for FakeBackend {
        async fn ask(&self, request: &AskRequest) -> ApiResult<AskReply> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn config() -> ChatConfig {
        ChatConfig::new("Acme", "icp")
    }

    #[tokio::test]
    async fn first_question_round_trip() {
        let backend = FakeBackend::answering("Step 2 is ...");
        let mut session = ChatSession::new();

        let outcome = session.submit(&backend, "What is step 2?", &config()).await;
        assert_eq!(outcome, Outcome::Answered("Step 2 is ...".into()));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].history, vec![Turn::new(Role::User, "What is step 2?")]);
        assert_eq!(seen[0].user_input, "What is step 2?");
        assert_eq!(seen[0].startup_id, "Acme");
        assert_eq!(seen[0].step, "icp");

        assert_eq!(
            session.transcript(),
            &[
                Turn::new(Role::User, "What is step 2?"),
                Turn::new(Role::Assistant, "Step 2 is ..."),
            ]
        );
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn failure_keeps_only_the_user_turn() {
        let backend = FakeBackend::new(vec![Err(ApiError::Auth(403))]);
        let mut session = ChatSession::new();

        let outcome = session.submit(&backend, "hello", &config()).await;
        assert!(matches!(outcome, Outcome::Failed(ref m) if m.contains("Could not reach the backend")));
        assert_eq!(session.len(), 1);
        assert_eq!(session.transcript()[0].role, Role::User);
        assert!(!session.is_pending());
        assert!(session.state().error().is_some());

        // the flag is clear, so a retry goes out
        let backend = FakeBackend::answering("hi");
        let outcome = session.submit(&backend, "hello again", &config()).await;
        assert_eq!(outcome, Outcome::Answered("hi".into()));
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn blank_input_never_reaches_the_backend() {
        let backend = FakeBackend::answering("unused");
        let mut session = ChatSession::new();

        for text in ["", "   ", "\n\t "] {
            assert_eq!(session.submit(&backend, text, &config()).await, Outcome::Ignored);
        }
        assert_eq!(session.len(), 0);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn second_submission_while_pending_is_dropped() {
        let mut session = ChatSession::new();
        assert!(session.begin("one", &config()).is_some());
        assert!(session.is_pending());

        assert!(session.begin("two", &config()).is_none());
        assert_eq!(session.len(), 1);

        session.complete(Ok(AskReply {
            response: Some("answer".into()),
        }));
        assert!(session.begin("two", &config()).is_some());
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn history_grows_with_the_conversation() {
        let mut session = ChatSession::new();
        session.begin("one", &config());
        session.complete(Ok(AskReply {
            response: Some("first".into()),
        }));

        let request = session.begin("  two  ", &config()).unwrap();
        assert_eq!(request.user_input, "two");
        assert_eq!(request.history.len(), 3);
        assert_eq!(request.history[1], Turn::new(Role::Assistant, "first"));
        assert_eq!(request.history[2], Turn::new(Role::User, "two"));
    }

    #[test]
    fn missing_response_uses_fallback() {
        let mut session = ChatSession::new();
        session.begin("q", &config());
        let outcome = session.complete(Ok(AskReply { response: None }));
        assert_eq!(outcome, Outcome::Answered(NO_RESPONSE_FALLBACK.into()));
        assert_eq!(session.transcript()[1].content, NO_RESPONSE_FALLBACK);
    }

    #[test]
    fn stray_completion_is_ignored() {
        let mut session = ChatSession::new();
        let outcome = session.complete(Ok(AskReply {
            response: Some("late".into()),
        }));
        assert_eq!(outcome, Outcome::Ignored);
        assert!(session.is_empty());
    }

    #[test]
    fn blank_config_falls_back_to_defaults() {
        let mut session = ChatSession::new();
        let request = session.begin("q", &ChatConfig::default()).unwrap();
        assert_eq!(request.startup_id, DEFAULT_STARTUP);
        assert_eq!(request.step, "todas");
    }

    #[test]
    fn config_round_trips_through_the_store() {
        let mut store = KeyValueStore::in_memory();
        ChatConfig::new(" Acme ", "persona").persist(&mut store).unwrap();
        assert_eq!(
            store.get(keys::AGENT_CONFIG),
            Some(r#"{"startup":"Acme","step":"persona"}"#)
        );
        assert_eq!(ChatConfig::restore(&store, None), ChatConfig::new("Acme", "persona"));
    }

    #[test]
    fn restore_prefers_saved_startup_over_session() {
        let session = Session {
            token: "t".into(),
            role: crate::auth::UserRole::Founder,
            founder_name: Some("Ana".into()),
            startup_name: Some("FromLogin".into()),
        };

        let store = KeyValueStore::in_memory();
        assert_eq!(ChatConfig::restore(&store, Some(&session)).startup_id, "FromLogin");

        let mut store = KeyValueStore::in_memory();
        store.set(keys::AGENT_CONFIG, "not json").unwrap();
        assert_eq!(ChatConfig::restore(&store, Some(&session)).startup_id, "FromLogin");

        ChatConfig::new("Saved", "icp").persist(&mut store).unwrap();
        assert_eq!(ChatConfig::restore(&store, Some(&session)).startup_id, "Saved");
    }
}

pub mod admin;
pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod state;
pub mod status;
pub mod step;
pub mod store;

// Re-export main types for convenience
pub use admin::{AdminPanel, KnowledgeView, UploadFile};
pub use api::{AgentBackend, ApiClient, ApiError, ApiResult};
pub use auth::{Session, SessionContext, UserRole};
pub use chat::{ChatConfig, ChatSession, Outcome};
pub use config::Config;
pub use error::CoreError;
pub use state::{Role, SessionState, Turn};
pub use step::Step;
pub use store::KeyValueStore;

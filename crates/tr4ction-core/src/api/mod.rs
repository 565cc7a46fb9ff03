pub mod client;
pub mod error;
pub mod types;

pub use client::{AdminBackend, AgentBackend, ApiClient};
pub use error::{ApiError, ApiResult};
pub use types::{
    AskReply, AskRequest, HealthReply, KnowledgeStats, LoginReply, ReloadReply, UploadFile,
    UploadReply,
};

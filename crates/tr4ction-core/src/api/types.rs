//! Wire types for the agent backend.

use serde::{Deserialize, Serialize};

use crate::state::Turn;

/// Body of `POST /agent/ask`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskRequest {
    pub startup_id: String,
    pub step: String,
    pub history: Vec<Turn>,
    pub user_input: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AskReply {
    #[serde(default)]
    pub response: Option<String>,
}

/// Reply of `GET /admin/knowledge`, also nested in the reload reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    #[serde(default)]
    pub docs: u64,
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReply {
    pub added: u64,
    pub docs_total: u64,
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReloadReply {
    #[serde(default)]
    pub stats: Option<KnowledgeStats>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FounderLoginRequest<'a> {
    pub startup_name: &'a str,
    pub founder_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminLoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginReply {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub role: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReply {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// A file staged for `POST /admin/upload-pptx`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Role;

    #[test]
    fn ask_request_matches_backend_field_names() {
        let request = AskRequest {
            startup_id: "Acme".into(),
            step: "icp".into(),
            history: vec![Turn::new(Role::User, "hi")],
            user_input: "hi".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "startup_id": "Acme",
                "step": "icp",
                "history": [{"role": "user", "content": "hi"}],
                "user_input": "hi",
            })
        );
    }

    #[test]
    fn ask_reply_tolerates_missing_or_null_response() {
        let reply: AskReply = serde_json::from_str("{}").unwrap();
        assert_eq!(reply.response, None);
        let reply: AskReply = serde_json::from_str(r#"{"response": null}"#).unwrap();
        assert_eq!(reply.response, None);
    }

    #[test]
    fn reload_reply_reads_nested_stats() {
        let reply: ReloadReply = serde_json::from_str(
            r#"{"status":"ok","message":"Base recarregada.","stats":{"docs":12,"steps":["icp"]}}"#,
        )
        .unwrap();
        assert_eq!(reply.stats.map(|s| s.docs), Some(12));
    }
}

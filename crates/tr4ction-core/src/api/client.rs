use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::error::{ApiError, ApiResult};
use super::types::{
    AdminLoginRequest, AskReply, AskRequest, FounderLoginRequest, HealthReply, KnowledgeStats,
    LoginReply, ReloadReply, UploadFile, UploadReply,
};

const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Anything that can answer a chat turn.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> ApiResult<AskReply>;
}

/// Knowledge-base administration endpoints.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn knowledge_stats(&self) -> ApiResult<KnowledgeStats>;
    async fn upload_pptx(&self, step: &str, files: Vec<UploadFile>) -> ApiResult<UploadReply>;
    async fn reload(&self) -> ApiResult<ReloadReply>;
}

/// One `step` field plus one `files` part per deck.
fn upload_form(step: &str, files: Vec<UploadFile>) -> reqwest::Result<Form> {
    let mut form = Form::new().text("step", step.to_string());
    for file in files {
        let part = Part::bytes(file.bytes).file_name(file.name).mime_str(PPTX_MIME)?;
        form = form.part("files", part);
    }
    Ok(form)
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    production: bool,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            production: true,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Outside production, error bodies are logged for diagnostics.
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> ApiResult<T> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(endpoint, error = %e, "request to backend failed");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if !self.production {
                tracing::debug!(endpoint, status = status.as_u16(), body = %body, "backend returned an error");
            }
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn ask(&self, request: &AskRequest) -> ApiResult<AskReply> {
        let builder = self.authorized(self.client.post(self.url("/agent/ask")).json(request));
        self.send_json(builder, "/agent/ask").await
    }

    pub async fn knowledge_stats(&self) -> ApiResult<KnowledgeStats> {
        let builder = self.authorized(self.client.get(self.url("/admin/knowledge")));
        self.send_json(builder, "/admin/knowledge").await
    }

    pub async fn upload_pptx(&self, step: &str, files: Vec<UploadFile>) -> ApiResult<UploadReply> {
        let form = upload_form(step, files).map_err(|e| ApiError::Decode(e.to_string()))?;
        let builder = self.authorized(self.client.post(self.url("/admin/upload-pptx")).multipart(form));
        self.send_json(builder, "/admin/upload-pptx").await
    }

    pub async fn reload(&self) -> ApiResult<ReloadReply> {
        let builder = self.authorized(self.client.post(self.url("/admin/reload")));
        self.send_json(builder, "/admin/reload").await
    }

    pub async fn founder_login(&self, startup_name: &str, founder_name: &str) -> ApiResult<LoginReply> {
        let body = FounderLoginRequest {
            startup_name,
            founder_name,
        };
        let builder = self.client.post(self.url("/auth/founder/login")).json(&body);
        self.send_json(builder, "/auth/founder/login").await
    }

    pub async fn admin_login(&self, username: &str, password: &str) -> ApiResult<LoginReply> {
        let body = AdminLoginRequest { username, password };
        let builder = self.client.post(self.url("/auth/admin/login")).json(&body);
        self.send_json(builder, "/auth/admin/login").await
    }

    pub async fn health(&self) -> ApiResult<HealthReply> {
        self.send_json(self.client.get(self.url("/")), "/").await
    }
}

#[async_trait]
impl AgentBackend for ApiClient {
    async fn ask(&self, request: &AskRequest) -> ApiResult<AskReply> {
        ApiClient::ask(self, request).await
    }
}

#[async_trait]
impl AdminBackend for ApiClient {
    async fn knowledge_stats(&self) -> ApiResult<KnowledgeStats> {
        ApiClient::knowledge_stats(self).await
    }

    async fn upload_pptx(&self, step: &str, files: Vec<UploadFile>) -> ApiResult<UploadReply> {
        ApiClient::upload_pptx(self, step, files).await
    }

    async fn reload(&self) -> ApiResult<ReloadReply> {
        ApiClient::reload(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Answers exactly one request with `status` and `body`. The task yields the raw request.
    async fn serve_once(status: u16, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (base, task)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let received = buf.len() - end - 4;
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let complete = match length {
                Some(length) => received >= length,
                None if head.contains("transfer-encoding: chunked") => buf.ends_with(b"0\r\n\r\n"),
                None => true,
            };
            if complete {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn question() -> AskRequest {
        AskRequest {
            startup_id: "Acme".into(),
            step: "todas".into(),
            history: Vec::new(),
            user_input: "hello".into(),
        }
    }

    /// Base URL of a port nothing is listening on.
    fn dead_backend() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let client = ApiClient::new("http://127.0.0.1:8000/api/");
        assert_eq!(client.base_url(), "http://127.0.0.1:8000/api");
        assert_eq!(client.url("/agent/ask"), "http://127.0.0.1:8000/api/agent/ask");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let client = ApiClient::new(&dead_backend()).with_token("t");
        let err = client.ask(&question()).await.unwrap_err();
        assert!(err.is_network(), "got {err:?}");

        let err = client.knowledge_stats().await.unwrap_err();
        assert!(err.is_network(), "got {err:?}");
    }

    #[tokio::test]
    async fn ask_sends_bearer_token_and_json_body() {
        let (base, server) = serve_once(200, r#"{"response":"hi there"}"#).await;
        let client = ApiClient::new(&base).with_token("jwt-123");

        let reply = client.ask(&question()).await.unwrap();
        assert_eq!(reply.response.as_deref(), Some("hi there"));

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(lower.starts_with("post /agent/ask http/1.1"), "{request}");
        assert!(lower.contains("authorization: bearer jwt-123"), "{request}");
        assert!(request.contains(r#""user_input":"hello""#), "{request}");
        assert!(request.contains(r#""startup_id":"Acme""#), "{request}");
    }

    #[tokio::test]
    async fn login_does_not_send_a_stale_token() {
        let (base, server) =
            serve_once(200, r#"{"access_token":"new","token_type":"bearer","role":"admin"}"#).await;
        let client = ApiClient::new(&base).with_token("old");

        let reply = client.admin_login("root", "secret").await.unwrap();
        assert_eq!(reply.access_token, "new");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("post /auth/admin/login"));
        assert!(!request.contains("authorization:"));
    }

    #[tokio::test]
    async fn statuses_map_to_error_categories() {
        for (status, body, expected) in [
            (401, "", ApiError::Auth(401)),
            (403, r#"{"detail":"forbidden"}"#, ApiError::Auth(403)),
            (
                500,
                "boom",
                ApiError::Server {
                    status: 500,
                    body: "boom".into(),
                },
            ),
        ] {
            let (base, server) = serve_once(status, body).await;
            let err = ApiClient::new(&base).with_token("t").knowledge_stats().await.unwrap_err();
            assert_eq!(err, expected);
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn unparsable_success_is_a_decode_error() {
        let (base, server) = serve_once(200, "<html>not json</html>").await;
        let err = ApiClient::new(&base).reload().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)), "got {err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn upload_is_multipart_with_one_part_per_file() {
        let (base, server) = serve_once(200, r#"{"added":2,"docs_total":9}"#).await;
        let client = ApiClient::new(&base).with_token("jwt");
        let files = vec![
            UploadFile {
                name: "a.pptx".into(),
                bytes: b"first deck".to_vec(),
            },
            UploadFile {
                name: "b.pptx".into(),
                bytes: b"second deck".to_vec(),
            },
        ];

        let reply = client.upload_pptx("icp", files).await.unwrap();
        assert_eq!((reply.added, reply.docs_total), (2, 9));

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(lower.starts_with("post /admin/upload-pptx"), "{request}");
        assert!(lower.contains("authorization: bearer jwt"));
        assert!(lower.contains("content-type: multipart/form-data; boundary="));
        assert!(request.contains(r#"name="step""#));
        assert!(request.contains("\r\n\r\nicp\r\n"));
        assert_eq!(request.matches(r#"name="files""#).count(), 2);
        assert!(request.contains(r#"filename="a.pptx""#));
        assert!(request.contains(r#"filename="b.pptx""#));
        assert_eq!(request.matches(PPTX_MIME).count(), 2);
        assert!(request.contains("second deck"));
    }

    #[test]
    fn deck_content_type_is_accepted() {
        let files = vec![UploadFile {
            name: "deck.pptx".into(),
            bytes: Vec::new(),
        }];
        assert!(upload_form("diagnostico", files).is_ok());
    }
}

//! Knowledge-base administration: PPTX upload, reload, and stats display.

use std::path::{Path, PathBuf};

use crate::api::{AdminBackend, ApiError, ApiResult, KnowledgeStats};
pub use crate::api::UploadFile;
use crate::auth::SessionContext;
use crate::error::CoreError;
use crate::status;
use crate::step::Step;

pub const AWAITING_UPLOAD: &str = "Waiting for upload...";
pub const NO_FILES: &str = "Select at least one PPTX file.";
pub const NOT_ALL_PPTX: &str = "All files must be PPTX.";
pub const UPLOAD_FAILED: &str = "Error while uploading the files.";
pub const UPLOAD_NETWORK_FAILED: &str = "Network error while uploading files. Check that the backend is running.";
pub const RELOADING: &str = "Reloading...";
pub const RELOAD_FAILED: &str = "Error while reloading.";
pub const RELOAD_NETWORK_FAILED: &str = "Network error while reloading. Check that the backend is running.";

pub fn default_upload_step() -> &'static str {
    Step::Diagnostic.as_str()
}

/// Local checks run before any upload request.
pub fn validate_upload<S: AsRef<str>>(names: &[S]) -> Result<(), CoreError> {
    if names.is_empty() {
        return Err(CoreError::validation(NO_FILES));
    }
    let invalid = names
        .iter()
        .any(|n| !n.as_ref().to_lowercase().ends_with(".pptx"));
    if invalid {
        return Err(CoreError::validation(NOT_ALL_PPTX));
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Validates, then reads every file into memory.
pub async fn read_upload_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>, CoreError> {
    let names: Vec<String> = paths.iter().map(|p| file_name(p)).collect();
    validate_upload(&names)?;

    let mut files = Vec::with_capacity(paths.len());
    for (path, name) in paths.iter().zip(names) {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        files.push(UploadFile { name, bytes });
    }
    Ok(files)
}

pub fn stats_summary(stats: &KnowledgeStats) -> String {
    let steps = if stats.steps.is_empty() {
        "none".to_string()
    } else {
        stats.steps.join(", ")
    };
    format!("Base: {} document(s) | Steps: {}", stats.docs, steps)
}

/// How an admin action ended. The human-readable message is on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFlow {
    Done,
    Failed,
    /// The backend rejected the session
    LoggedOut,
}

impl PanelFlow {
    pub fn is_logged_out(self) -> bool {
        self == PanelFlow::LoggedOut
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPanel {
    pub upload_status: String,
    pub reload_status: String,
    pub stats: Option<KnowledgeStats>,
    /// Why the last stats fetch failed, if it did
    pub stats_error: Option<String>,
}

impl Default for AdminPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminPanel {
    pub fn new() -> Self {
        Self {
            upload_status: AWAITING_UPLOAD.to_string(),
            reload_status: String::new(),
            stats: None,
            stats_error: None,
        }
    }

    /// Applies the session side of a finished action: a rejected session is torn down.
    ///
    /// The `fetch_stats`/`send_upload`/`send_reload` variants only touch the panel
    /// so they can run on a spawned task; whoever owns the context settles afterwards.
    pub fn settle(flow: PanelFlow, ctx: &mut SessionContext) -> PanelFlow {
        if flow.is_logged_out() {
            if let Err(e) = ctx.teardown() {
                tracing::error!(error = %e, "failed to clear stored credentials");
            }
        }
        flow
    }

    fn rejected(err: &ApiError) -> PanelFlow {
        tracing::warn!(error = %err, "admin session rejected by backend");
        PanelFlow::LoggedOut
    }

    pub async fn fetch_stats<B>(&mut self, backend: &B) -> PanelFlow
    where
        B: AdminBackend + ?Sized,
    {
        match backend.knowledge_stats().await {
            Ok(stats) => {
                let summary = stats_summary(&stats);
                self.reload_status = summary.clone();
                if self.upload_status == AWAITING_UPLOAD {
                    self.upload_status = summary;
                }
                self.stats = Some(stats);
                self.stats_error = None;
                PanelFlow::Done
            }
            Err(err) if err.is_auth() => Self::rejected(&err),
            Err(err) => {
                tracing::error!(error = %err, "could not fetch knowledge stats");
                self.stats_error = Some(status::describe(&err));
                PanelFlow::Failed
            }
        }
    }

    /// Validates and uploads `paths` under `step`, then refreshes the stats.
    pub async fn send_upload<B>(&mut self, backend: &B, step: &str, paths: &[PathBuf]) -> PanelFlow
    where
        B: AdminBackend + ?Sized,
    {
        let files = match read_upload_files(paths).await {
            Ok(files) => files,
            Err(err) => {
                self.upload_status = match err {
                    CoreError::Validation(message) => message,
                    other => format!("Could not read the files: {other}"),
                };
                return PanelFlow::Failed;
            }
        };

        self.upload_status = format!("Sending {} file(s)...", files.len());
        let step = if step.trim().is_empty() { default_upload_step() } else { step.trim() };

        match backend.upload_pptx(step, files).await {
            Ok(reply) => {
                self.upload_status = format!(
                    "Upload complete. {} file(s) processed. Total in knowledge base: {}.",
                    reply.added, reply.docs_total
                );
                self.after_success(backend).await
            }
            Err(err) if err.is_auth() => Self::rejected(&err),
            Err(err) if err.is_network() => {
                tracing::error!(error = %err, "upload did not reach the backend");
                self.upload_status = UPLOAD_NETWORK_FAILED.to_string();
                PanelFlow::Failed
            }
            Err(err) => {
                tracing::error!(error = %err, "upload rejected by backend");
                self.upload_status = UPLOAD_FAILED.to_string();
                PanelFlow::Failed
            }
        }
    }

    pub async fn send_reload<B>(&mut self, backend: &B) -> PanelFlow
    where
        B: AdminBackend + ?Sized,
    {
        self.reload_status = RELOADING.to_string();

        match backend.reload().await {
            Ok(reply) => {
                let docs = reply
                    .stats
                    .map(|s| s.docs.to_string())
                    .unwrap_or_else(|| "?".to_string());
                let message = format!("Knowledge base reloaded! {docs} document(s).");

                let flow = self.after_success(backend).await;
                // the reload result stays on screen; the refreshed stats live in `stats`
                self.reload_status = message;
                flow
            }
            Err(err) if err.is_auth() => Self::rejected(&err),
            Err(err) if err.is_network() => {
                tracing::error!(error = %err, "reload did not reach the backend");
                self.reload_status = RELOAD_NETWORK_FAILED.to_string();
                PanelFlow::Failed
            }
            Err(err) => {
                tracing::error!(error = %err, "reload rejected by backend");
                self.reload_status = RELOAD_FAILED.to_string();
                PanelFlow::Failed
            }
        }
    }

    /// Stats refresh after a successful write. A failed refresh does not undo the write.
    async fn after_success<B>(&mut self, backend: &B) -> PanelFlow
    where
        B: AdminBackend + ?Sized,
    {
        match self.fetch_stats(backend).await {
            PanelFlow::LoggedOut => PanelFlow::LoggedOut,
            PanelFlow::Done | PanelFlow::Failed => PanelFlow::Done,
        }
    }

    pub async fn refresh_stats<B>(&mut self, backend: &B, ctx: &mut SessionContext) -> PanelFlow
    where
        B: AdminBackend + ?Sized,
    {
        let flow = self.fetch_stats(backend).await;
        Self::settle(flow, ctx)
    }

    pub async fn upload<B>(
        &mut self,
        backend: &B,
        ctx: &mut SessionContext,
        step: &str,
        paths: &[PathBuf],
    ) -> PanelFlow
    where
        B: AdminBackend + ?Sized,
    {
        let flow = self.send_upload(backend, step, paths).await;
        Self::settle(flow, ctx)
    }

    pub async fn reload<B>(&mut self, backend: &B, ctx: &mut SessionContext) -> PanelFlow
    where
        B: AdminBackend + ?Sized,
    {
        let flow = self.send_reload(backend).await;
        Self::settle(flow, ctx)
    }
}

/// Knowledge stats as shown next to the founder chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeView {
    pub docs: String,
    pub steps: String,
}

impl KnowledgeView {
    pub fn loading() -> Self {
        Self::filled("...")
    }

    fn filled(value: &str) -> Self {
        Self {
            docs: format!("Documents: {value}"),
            steps: format!("Steps: {value}"),
        }
    }

    /// Founders are usually not allowed to read stats; 401/403 shows a dash, not an error.
    pub fn from_result(result: &ApiResult<KnowledgeStats>) -> Self {
        match result {
            Ok(stats) => {
                let steps = if stats.steps.is_empty() {
                    "no steps registered".to_string()
                } else {
                    stats.steps.join(", ")
                };
                Self {
                    docs: format!("Documents: {}", stats.docs),
                    steps: format!("Steps: {steps}"),
                }
            }
            Err(err) if err.is_auth() => Self::filled("–"),
            Err(err) if err.is_network() => {
                tracing::error!(error = %err, "knowledge stats did not reach the backend");
                Self::filled("backend unreachable")
            }
            Err(err) => {
                tracing::error!(error = %err, "could not fetch knowledge stats");
                Self::filled("error")
            }
        }
    }

    pub async fn fetch<B: AdminBackend + ?Sized>(backend: &B) -> Self {
        Self::from_result(&backend.knowledge_stats().await)
    }
}

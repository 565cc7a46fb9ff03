use std::path::PathBuf;

use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tr4ction_core::admin::{self, AdminPanel, KnowledgeView, PanelFlow};
use tr4ction_core::api::{ApiClient, ApiError, ApiResult, AskReply};
use tr4ction_core::chat::{ChatConfig, ChatSession, Outcome};
use tr4ction_core::{SessionContext, Step, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Which text field receives keystrokes in editing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Question,
    Startup,
    UploadPaths,
}

/// Admin request started by a key press. Runs on its own task; one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    RefreshStats,
    Upload,
    Reload,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    /// Set when the backend rejected the session and credentials were cleared
    pub logged_out: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub field: Field,

    // Session
    pub ctx: SessionContext,
    pub client: ApiClient,

    // Chat state
    pub chat: ChatSession,
    pub chat_config: ChatConfig,
    pub query_input: String,
    pub query_cursor: usize, // cursor position in query_input, in chars
    pub query_scroll: u16,
    pub query_chat_height: u16, // Height of chat area for scroll calculations
    pub query_chat_width: u16,  // Width of chat area for wrap calculations
    pub query_task: Option<JoinHandle<ApiResult<AskReply>>>,
    pub startup_input: String,
    pub startup_cursor: usize,
    pub knowledge: KnowledgeView,
    pub knowledge_task: Option<JoinHandle<KnowledgeView>>,

    // Panel area for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    // Admin state
    pub admin: AdminPanel,
    pub upload_input: String,
    pub upload_cursor: usize,
    pub upload_step: String,
    pub admin_task: Option<(AdminAction, JoinHandle<(AdminPanel, PanelFlow)>)>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(screen: Screen, ctx: SessionContext, base_client: &ApiClient) -> Self {
        let client = ctx.client(base_client);
        let chat_config = ChatConfig::restore(ctx.store(), ctx.session());
        let startup_input = chat_config.startup_id.clone();
        let startup_cursor = startup_input.chars().count();

        let (input_mode, field) = match screen {
            Screen::Chat => (InputMode::Editing, Field::Question),
            Screen::Admin => (InputMode::Normal, Field::UploadPaths),
        };

        Self {
            should_quit: false,
            logged_out: false,
            screen,
            input_mode,
            field,

            ctx,
            client,

            chat: ChatSession::new(),
            chat_config,
            query_input: String::new(),
            query_cursor: 0,
            query_scroll: 0,
            query_chat_height: 0,
            query_chat_width: 0,
            query_task: None,
            startup_input,
            startup_cursor,
            knowledge: KnowledgeView::loading(),
            knowledge_task: None,

            chat_area: None,

            admin: AdminPanel::new(),
            upload_input: String::new(),
            upload_cursor: 0,
            upload_step: admin::default_upload_step().to_string(),
            admin_task: None,

            animation_frame: 0,
        }
    }

    /// Role this screen is gated on
    pub fn required_role(&self) -> UserRole {
        match self.screen {
            Screen::Chat => UserRole::Founder,
            Screen::Admin => UserRole::Admin,
        }
    }

    /// Initial data load once the terminal is up.
    pub fn load_initial(&mut self) {
        match self.screen {
            Screen::Chat => self.refresh_knowledge(),
            Screen::Admin => self.queue(AdminAction::RefreshStats),
        }
    }

    /// Fetches the founder knowledge view in the background.
    pub fn refresh_knowledge(&mut self) {
        if self.knowledge_task.is_some() {
            return;
        }
        let client = self.client.clone();
        self.knowledge_task = Some(tokio::spawn(async move { KnowledgeView::fetch(&client).await }));
    }

    /// True while an admin request is in flight.
    pub fn admin_busy(&self) -> bool {
        self.admin_task.is_some()
    }

    /// Resolves whichever background tasks have finished. Called on every event.
    pub async fn poll_tasks(&mut self) {
        self.poll_query_task().await;
        self.poll_knowledge_task().await;
        self.poll_admin_task().await;
    }

    // Chat actions

    /// Starts a chat submission from the question field.
    pub fn submit_question(&mut self) {
        if self.query_task.is_some() {
            return;
        }

        let Some(request) = self.chat.begin(&self.query_input, &self.chat_config) else {
            return;
        };

        self.query_input.clear();
        self.query_cursor = 0;

        // Scroll to bottom so "Typing..." is visible
        self.scroll_query_to_bottom();

        let client = self.client.clone();
        self.query_task = Some(tokio::spawn(async move { client.ask(&request).await }));
    }

    /// Resolves the chat request once its task has finished.
    pub async fn poll_query_task(&mut self) {
        let finished = self
            .query_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        let Some(task) = self.query_task.take() else {
            return;
        };
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(ApiError::Network(format!("chat task aborted: {e}"))),
        };

        if let Outcome::Failed(message) = self.chat.complete(result) {
            tracing::info!(%message, "chat round-trip failed");
        }
        self.scroll_query_to_bottom();
    }

    pub fn commit_startup(&mut self) {
        self.chat_config.startup_id = self.startup_input.trim().to_string();
        self.save_chat_config();
    }

    pub fn cycle_chat_step(&mut self) {
        if let Some(next) = Step::cycle(self.chat_config.effective_step(), &Step::all()) {
            self.chat_config.step = next.as_str().to_string();
            self.save_chat_config();
        }
    }

    fn save_chat_config(&mut self) {
        if let Err(e) = self.chat_config.persist(self.ctx.store_mut()) {
            tracing::warn!(error = %e, "could not save chat config");
        }
    }

    // Admin actions

    pub fn cycle_upload_step(&mut self) {
        if let Some(next) = Step::cycle(&self.upload_step, &Step::uploadable()) {
            self.upload_step = next.as_str().to_string();
        }
    }

    /// Paths typed into the upload field, separated by whitespace.
    pub fn upload_paths(&self) -> Vec<PathBuf> {
        self.upload_input.split_whitespace().map(PathBuf::from).collect()
    }

    /// Starts `action` on a background task unless one is already running.
    pub fn queue(&mut self, action: AdminAction) {
        if self.admin_busy() {
            return;
        }

        let paths = self.upload_paths();
        match action {
            AdminAction::Upload => {
                let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                if let Err(e) = admin::validate_upload(&names) {
                    self.admin.upload_status = e.to_string();
                    return;
                }
                self.admin.upload_status = format!("Sending {} file(s)...", names.len());
            }
            AdminAction::Reload => self.admin.reload_status = admin::RELOADING.to_string(),
            AdminAction::RefreshStats => {}
        }

        let client = self.client.clone();
        let mut panel = self.admin.clone();
        let step = self.upload_step.clone();
        let task = tokio::spawn(async move {
            let flow = match action {
                AdminAction::RefreshStats => panel.fetch_stats(&client).await,
                AdminAction::Upload => panel.send_upload(&client, &step, &paths).await,
                AdminAction::Reload => panel.send_reload(&client).await,
            };
            (panel, flow)
        });
        self.admin_task = Some((action, task));
    }

    async fn poll_admin_task(&mut self) {
        let finished = self
            .admin_task
            .as_ref()
            .map(|(_, task)| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }
        let Some((action, task)) = self.admin_task.take() else {
            return;
        };

        let flow = match task.await {
            Ok((panel, flow)) => {
                self.admin = panel;
                flow
            }
            Err(e) => {
                tracing::error!(error = %e, ?action, "admin task aborted");
                PanelFlow::Failed
            }
        };

        match AdminPanel::settle(flow, &mut self.ctx) {
            PanelFlow::LoggedOut => {
                self.logged_out = true;
                self.should_quit = true;
            }
            PanelFlow::Done if action == AdminAction::Upload => {
                self.upload_input.clear();
                self.upload_cursor = 0;
            }
            PanelFlow::Done | PanelFlow::Failed => {}
        }
    }

    async fn poll_knowledge_task(&mut self) {
        let finished = self
            .knowledge_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }
        let Some(task) = self.knowledge_task.take() else {
            return;
        };

        match task.await {
            Ok(view) => self.knowledge = view,
            Err(e) => tracing::error!(error = %e, "knowledge task aborted"),
        }
    }

    /// Logs out from inside the app.
    pub fn logout(&mut self) {
        if let Err(e) = self.ctx.teardown() {
            tracing::error!(error = %e, "failed to clear stored credentials");
        }
        self.logged_out = true;
        self.should_quit = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat to bottom so the newest turn is visible
    pub fn scroll_query_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.query_chat_width > 0 {
            self.query_chat_width as usize
        } else {
            50
        };

        let count_lines = |text: &str| -> u16 {
            text.lines().fold(0u16, |acc, line| {
                let rows = line.chars().count() / wrap_width + 1;
                acc.saturating_add(u16::try_from(rows).unwrap_or(u16::MAX))
            })
        };

        // greeting
        let mut total_lines = count_lines(tr4ction_core::chat::GREETING).saturating_add(2);

        for turn in self.chat.transcript() {
            // role line, content, blank line
            total_lines = total_lines
                .saturating_add(count_lines(&turn.content))
                .saturating_add(2);
        }

        // "Typing..." indicator or error banner
        total_lines = total_lines.saturating_add(2);

        let visible_height = if self.query_chat_height > 0 {
            self.query_chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.query_scroll = total_lines.saturating_sub(visible_height);
        }
    }
}

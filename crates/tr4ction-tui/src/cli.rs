//! One-shot subcommands: login/logout and the non-interactive chat and admin actions.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Password};
use tr4ction_core::admin::{self, AdminPanel, KnowledgeView, PanelFlow};
use tr4ction_core::api::ApiClient;
use tr4ction_core::auth::{self, SessionContext, UserRole};
use tr4ction_core::chat::{ChatConfig, ChatSession, Outcome};
use tr4ction_core::{status, Config};

/// Prints the "go log in" message for a screen that needs `role`.
pub fn redirect_to_login(role: UserRole) {
    println!(
        "{} {}",
        format!("{} session required.", role.display_name()).red(),
        "Log in with:".dimmed()
    );
    println!("  {}", role.login_hint().bold());
}

fn require<'a>(ctx: &'a SessionContext, role: UserRole) -> Result<&'a auth::Session> {
    ctx.require(role).ok_or_else(|| {
        redirect_to_login(role);
        anyhow!("no {} session", role.as_str())
    })
}

pub async fn login_founder(
    client: &ApiClient,
    ctx: &mut SessionContext,
    startup: &str,
    founder: &str,
) -> Result<()> {
    match auth::login_founder(client, ctx, startup, founder).await {
        Ok(session) => {
            println!(
                "{} {}",
                "✓".green(),
                format!(
                    "Welcome to the TR4CTION trail, {}!",
                    session.founder_name.as_deref().unwrap_or(founder)
                )
                .bold()
            );
            println!("Start chatting with: {}", "tr4ction chat".bold());
            Ok(())
        }
        Err(e) => Err(anyhow!(e.user_message())),
    }
}

pub async fn login_admin(client: &ApiClient, ctx: &mut SessionContext, username: &str) -> Result<()> {
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .interact()?;

    match auth::login_admin(client, ctx, username, &password).await {
        Ok(_) => {
            println!("{} {}", "✓".green(), "Admin login successful.".bold());
            println!("Open the panel with: {}", "tr4ction admin".bold());
            Ok(())
        }
        Err(e) => Err(anyhow!(e.user_message())),
    }
}

pub fn logout(ctx: &mut SessionContext) -> Result<()> {
    ctx.teardown()?;
    println!("{}", "Logged out.".green());
    Ok(())
}

pub async fn ask(
    client: &ApiClient,
    ctx: &SessionContext,
    question: &str,
    startup: Option<String>,
    step: Option<String>,
) -> Result<()> {
    require(ctx, UserRole::Founder)?;

    let mut config = ChatConfig::restore(ctx.store(), ctx.session());
    if let Some(startup) = startup {
        config.startup_id = startup;
    }
    if let Some(step) = step {
        config.step = step;
    }

    let client = ctx.client(client);
    let mut session = ChatSession::new();

    println!(
        "🤖 Asking the agent ({} · {})...\n",
        config.effective_startup().bold(),
        config.effective_step().magenta()
    );

    match session.submit(&client, question, &config).await {
        Outcome::Answered(answer) => {
            println!("{}", "Agent:".bold().yellow());
            println!("{answer}");
            Ok(())
        }
        Outcome::Failed(message) => Err(anyhow!(message)),
        Outcome::Ignored => Err(anyhow!("Type a question first.")),
    }
}

/// Shared handling of a rejected admin session. `Done` and `Failed` are left
/// to the caller.
fn finish(flow: PanelFlow) -> Result<PanelFlow> {
    if flow.is_logged_out() {
        println!("{}", status::SESSION_EXPIRED.red());
        redirect_to_login(UserRole::Admin);
        return Err(anyhow!("admin session rejected"));
    }
    Ok(flow)
}

pub async fn stats(client: &ApiClient, ctx: &mut SessionContext) -> Result<()> {
    require(ctx, UserRole::Admin)?;
    let client = ctx.client(client);

    let mut panel = AdminPanel::new();
    let flow = panel.refresh_stats(&client, ctx).await;

    match (finish(flow)?, &panel.stats) {
        (PanelFlow::Done, Some(stats)) => {
            println!("\n{}", "📚 Knowledge base".bold().blue());
            println!("{}", "=".repeat(30).dimmed());
            println!("{} {}", "Documents:".dimmed(), stats.docs.to_string().bold().green());
            if stats.steps.is_empty() {
                println!("{}", "No steps loaded".yellow());
            } else {
                for step in &stats.steps {
                    println!("  • {}", step);
                }
            }
            Ok(())
        }
        _ => Err(anyhow!(panel
            .stats_error
            .unwrap_or_else(|| status::BACKEND_UNREACHABLE.to_string()))),
    }
}

/// Founder-side view of the same endpoint, where 401/403 is just "not allowed".
pub async fn founder_stats(client: &ApiClient, ctx: &SessionContext) -> Result<()> {
    require(ctx, UserRole::Founder)?;
    let view = KnowledgeView::fetch(&ctx.client(client)).await;
    println!("{}\n{}", view.docs, view.steps);
    Ok(())
}

pub async fn upload(
    client: &ApiClient,
    ctx: &mut SessionContext,
    step: &str,
    files: &[PathBuf],
) -> Result<()> {
    require(ctx, UserRole::Admin)?;
    let client = ctx.client(client);

    // Validation messages never need a request
    let names: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
    if let Err(e) = admin::validate_upload(&names) {
        return Err(anyhow!(e.to_string()));
    }

    println!("📤 Sending {} file(s) to step {}...", files.len(), step.magenta());
    let mut panel = AdminPanel::new();
    let flow = panel.upload(&client, ctx, step, files).await;

    match finish(flow)? {
        PanelFlow::Done => {
            println!("{} {}", "✓".green(), panel.upload_status);
            Ok(())
        }
        _ => Err(anyhow!(panel.upload_status)),
    }
}

pub async fn reload(client: &ApiClient, ctx: &mut SessionContext) -> Result<()> {
    require(ctx, UserRole::Admin)?;
    let client = ctx.client(client);

    println!("🔄 {}", admin::RELOADING);
    let mut panel = AdminPanel::new();
    let flow = panel.reload(&client, ctx).await;

    match finish(flow)? {
        PanelFlow::Done => {
            println!("{} {}", "✓".green(), panel.reload_status);
            Ok(())
        }
        _ => Err(anyhow!(panel.reload_status)),
    }
}

pub async fn ping(client: &ApiClient) -> Result<()> {
    match client.health().await {
        Ok(reply) => {
            println!(
                "{} {} {}",
                "✓".green(),
                client.base_url().bold(),
                format!("({}: {})", reply.status, reply.message).dimmed()
            );
            Ok(())
        }
        Err(e) => Err(anyhow!(status::describe(&e))),
    }
}

pub fn show_config(config: &Config, backend_url: &str) -> Result<()> {
    println!("\n{}", "⚙️  Configuration".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("{} {}", "Backend:".dimmed(), backend_url.bold());
    println!(
        "{} {}",
        "Production:".dimmed(),
        config.is_production(backend_url).to_string().bold()
    );
    println!("{} {}", "Config dir:".dimmed(), Config::config_dir()?.display());
    Ok(())
}

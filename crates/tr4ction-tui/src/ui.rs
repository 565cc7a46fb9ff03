use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tr4ction_core::chat::GREETING;
use tr4ction_core::{Role, SessionState, Step};
use crate::app::{App, Field, InputMode, Screen};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Admin => render_admin_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let who = match app.ctx.session() {
        Some(session) => {
            let name = session
                .founder_name
                .as_deref()
                .map(|n| format!(" {n}"))
                .unwrap_or_default();
            format!(" [{}{}]", session.role.display_name(), name)
        }
        None => " [signed out]".to_string(),
    };

    let title = Line::from(vec![
        Span::styled(" TR4CTION Agent ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(who, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Chat => " CHAT ",
        Screen::Admin => " ADMIN ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match (app.screen, app.input_mode) {
        (Screen::Chat, InputMode::Normal) => &[
            (" i ", " ask "),
            (" s ", " startup "),
            (" t ", " step "),
            (" r ", " stats "),
            (" j/k ", " scroll "),
            (" L ", " logout "),
            (" q ", " quit "),
        ],
        (Screen::Admin, InputMode::Normal) => &[
            (" u ", " files "),
            (" Enter ", " upload "),
            (" t ", " step "),
            (" R ", " reload "),
            (" r ", " stats "),
            (" L ", " logout "),
            (" q ", " quit "),
        ],
        (_, InputMode::Editing) => match app.field {
            Field::Question => &[(" Enter ", " send "), (" Esc ", " done ")],
            Field::Startup => &[(" Enter ", " save "), (" Esc ", " cancel ")],
            Field::UploadPaths => &[(" Enter ", " upload "), (" Esc ", " done ")],
        },
    };

    let mut spans = vec![Span::styled(mode_text, mode_style.add_modifier(Modifier::BOLD))];
    for (key, label) in pairs {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_column, side_area] = Layout::horizontal([
        Constraint::Percentage(70),
        Constraint::Percentage(30),
    ])
    .areas(area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    // Store area and inner size for mouse hit-testing and scroll calculations
    app.chat_area = Some(chat_area);
    app.query_chat_height = chat_area.height.saturating_sub(2);
    app.query_chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(
            " {} · {} ",
            app.chat_config.effective_startup(),
            step_label(app.chat_config.effective_step())
        ));

    let agent_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled("Agent:", agent_style)),
        Line::from(GREETING),
        Line::default(),
    ];

    for turn in app.chat.transcript() {
        match turn.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            }
            Role::Assistant => {
                lines.push(Line::from(Span::styled("Agent:", agent_style)));
            }
        }
        for line in turn.content.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    match app.chat.state() {
        SessionState::Sending => {
            lines.push(Line::from(Span::styled("Agent:", agent_style)));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Typing{dots}"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        SessionState::Errored(message) => {
            lines.push(Line::from(Span::styled(
                format!("⚠ {message}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
            )));
        }
        SessionState::Idle => {}
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.query_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing_question = app.input_mode == InputMode::Editing && app.field == Field::Question;
    let input_title = if app.chat.is_pending() {
        " Ask (waiting for the agent...) "
    } else {
        " Ask "
    };
    render_input(
        frame,
        input_area,
        input_title,
        &app.query_input,
        app.query_cursor,
        editing_question,
    );

    render_chat_sidebar(app, frame, side_area);
}

fn render_chat_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let [startup_area, config_area, stats_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(4),
        Constraint::Min(0),
    ])
    .areas(area);

    let editing_startup = app.input_mode == InputMode::Editing && app.field == Field::Startup;
    render_input(
        frame,
        startup_area,
        " Startup (s) ",
        &app.startup_input,
        app.startup_cursor,
        editing_startup,
    );

    let config = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Step: ", Style::default().fg(Color::Gray)),
            Span::styled(
                step_label(app.chat_config.effective_step()),
                Style::default().fg(Color::Magenta).bold(),
            ),
        ]),
        Line::from(Span::styled(
            "press t to change",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Trail "));
    frame.render_widget(config, config_area);

    let stats = Paragraph::new(vec![
        Line::from(app.knowledge.docs.as_str()),
        Line::from(app.knowledge.steps.as_str()),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title(" Knowledge base "));
    frame.render_widget(stats, stats_area);
}

fn render_admin_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [upload_input_area, upload_area, reload_area, stats_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing && app.field == Field::UploadPaths;
    render_input(
        frame,
        upload_input_area,
        " PPTX files (space separated paths) ",
        &app.upload_input,
        app.upload_cursor,
        editing,
    );

    let upload = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Step: ", Style::default().fg(Color::Gray)),
            Span::styled(step_label(&app.upload_step), Style::default().fg(Color::Magenta).bold()),
        ]),
        Line::from(app.admin.upload_status.as_str()),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title(" Upload "));
    frame.render_widget(upload, upload_area);

    let reload = Paragraph::new(app.admin.reload_status.as_str())
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Reload "));
    frame.render_widget(reload, reload_area);

    let stats_lines = match &app.admin.stats {
        Some(stats) => {
            let mut lines = vec![Line::from(vec![
                Span::styled("Documents: ", Style::default().fg(Color::Gray)),
                Span::styled(stats.docs.to_string(), Style::default().fg(Color::Green).bold()),
            ])];
            if stats.steps.is_empty() {
                lines.push(Line::from(Span::styled(
                    "No steps loaded",
                    Style::default().fg(Color::DarkGray),
                )));
            } else {
                for step in &stats.steps {
                    lines.push(Line::from(format!("  • {}", step_label(step))));
                }
            }
            lines
        }
        None => match &app.admin.stats_error {
            Some(error) => vec![Line::from(Span::styled(
                error.as_str(),
                Style::default().fg(Color::Red),
            ))],
            None => vec![Line::from(Span::styled(
                "Loading...",
                Style::default().fg(Color::DarkGray),
            ))],
        },
    };

    let stats = Paragraph::new(stats_lines)
        .block(Block::default().borders(Borders::ALL).title(" Knowledge base "));
    frame.render_widget(stats, stats_area);
}

/// Single-line input box with horizontal scrolling that keeps the cursor visible
fn render_input(frame: &mut Frame, area: Rect, title: &str, value: &str, cursor: usize, active: bool) {
    let border_color = if active { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = value.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if active {
        let cursor_x = (cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Display name for known step keys, the raw key otherwise
fn step_label(key: &str) -> String {
    match Step::from_str(key) {
        Some(step) => step.display_name().to_string(),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_labels() {
        assert_eq!(step_label("icp"), "ICP");
        assert_eq!(step_label("todas"), "All steps");
        assert_eq!(step_label("q3-extra"), "q3-extra");
    }
}

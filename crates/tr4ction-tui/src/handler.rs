use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{AdminAction, App, Field, InputMode, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => match app.screen {
            Screen::Chat => handle_chat_normal(app, key),
            Screen::Admin => handle_admin_normal(app, key),
        },
        InputMode::Editing => handle_editing(app, key),
    }

    Ok(())
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            app.chat.dismiss_error();
            app.field = Field::Question;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('s') => {
            app.field = Field::Startup;
            app.startup_cursor = app.startup_input.chars().count();
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('t') => app.cycle_chat_step(),
        KeyCode::Char('r') => app.refresh_knowledge(),
        KeyCode::Char('x') => app.chat.dismiss_error(),
        KeyCode::Char('L') => app.logout(),

        // Chat scrolling
        KeyCode::Char('j') | KeyCode::Down => {
            app.query_scroll = app.query_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.query_scroll = app.query_scroll.saturating_sub(1);
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.query_scroll = app.query_scroll.saturating_add(app.query_chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.query_scroll = app.query_scroll.saturating_sub(app.query_chat_height / 2);
        }
        KeyCode::Char('G') => app.scroll_query_to_bottom(),
        KeyCode::Char('g') => app.query_scroll = 0,

        _ => {}
    }
}

fn handle_admin_normal(app: &mut App, key: KeyEvent) {
    // `queue` drops requests while one is in flight; quitting always works
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Char('u') if !app.admin_busy() => {
            app.field = Field::UploadPaths;
            app.upload_cursor = app.upload_input.chars().count();
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Enter => app.queue(AdminAction::Upload),
        KeyCode::Char('R') => app.queue(AdminAction::Reload),
        KeyCode::Char('r') => app.queue(AdminAction::RefreshStats),
        KeyCode::Char('t') => app.cycle_upload_step(),
        KeyCode::Char('L') => app.logout(),

        _ => {}
    }
}

fn handle_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.field == Field::Startup {
                // Discard uncommitted edits
                app.startup_input = app.chat_config.startup_id.clone();
                app.field = Field::Question;
            }
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
            // Shift+Enter is not a submit; the question stays on one line
        }
        KeyCode::Enter => match app.field {
            Field::Question => app.submit_question(),
            Field::Startup => {
                app.commit_startup();
                app.field = Field::Question;
            }
            Field::UploadPaths => {
                app.input_mode = InputMode::Normal;
                app.queue(AdminAction::Upload);
            }
        },
        _ => {
            let (text, cursor) = match app.field {
                Field::Question => (&mut app.query_input, &mut app.query_cursor),
                Field::Startup => (&mut app.startup_input, &mut app.startup_cursor),
                Field::UploadPaths => (&mut app.upload_input, &mut app.upload_cursor),
            };
            edit_text(text, cursor, key);
        }
    }
}

/// Cursor-aware single-line editing shared by every input field
fn edit_text(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = text.chars().count();
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = text.chars().count();
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = text.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            app.query_scroll = app.query_scroll.saturating_add(3);
        }
        MouseEventKind::ScrollUp => {
            app.query_scroll = app.query_scroll.saturating_sub(3);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    #[test]
    fn editing_is_utf8_safe() {
        let mut text = String::new();
        let mut cursor = 0;
        for c in "olá".chars() {
            edit_text(&mut text, &mut cursor, key(KeyCode::Char(c)));
        }
        assert_eq!(text, "olá");

        edit_text(&mut text, &mut cursor, key(KeyCode::Left));
        edit_text(&mut text, &mut cursor, key(KeyCode::Char('!')));
        assert_eq!(text, "ol!á");

        edit_text(&mut text, &mut cursor, key(KeyCode::End));
        edit_text(&mut text, &mut cursor, key(KeyCode::Backspace));
        assert_eq!(text, "ol!");
        assert_eq!(cursor, 3);

        edit_text(&mut text, &mut cursor, key(KeyCode::Home));
        edit_text(&mut text, &mut cursor, key(KeyCode::Delete));
        assert_eq!(text, "l!");
    }

    #[test]
    fn point_in_rect_edges() {
        let rect = Rect::new(2, 2, 3, 3);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(4, 4, rect));
        assert!(!point_in_rect(5, 4, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}

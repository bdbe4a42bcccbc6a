//! Keybinding dispatcher for restyle.
//!
//! Translates crossterm key and mouse events into `AppState` mutations. Keys
//! that need the session lifecycle are returned as a [`KeyAction`] for the
//! event loop to carry out.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use crate::app::{AppState, Mode, PanelFocus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Handled locally; just redraw.
    Continue,
    Quit,
    /// Format the selected file and compare.
    Run,
    /// Apply the bound session.
    Apply,
    /// Explain the bound session's diff.
    Explain,
    /// Close the comparison on screen, or cancel the pending one.
    Close,
}

pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::Normal => handle_normal(key, state),
    }
}

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }

    match key.code {
        KeyCode::Enter | KeyCode::Char('r') => KeyAction::Run,
        KeyCode::Char('a') if state.bound.is_some() => KeyAction::Apply,
        KeyCode::Char('e') if state.bound.is_some() => KeyAction::Explain,
        KeyCode::Char('x') | KeyCode::Esc if state.active_handle().is_some() => KeyAction::Close,

        KeyCode::Tab | KeyCode::BackTab => {
            state.focus = state.focus.toggle();
            KeyAction::Continue
        }

        KeyCode::Char('[') => {
            state.prev_change();
            KeyAction::Continue
        }
        KeyCode::Char(']') => {
            state.next_change();
            KeyAction::Continue
        }

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
            KeyAction::Continue
        }

        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,

        _ => KeyAction::Continue,
    }
}

/// j / k / g / G and Ctrl-d / Ctrl-u on the focused panel. `None` when the
/// key is not a scroll key.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::PageDown => state.half_page_down(),
        KeyCode::PageUp => state.half_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

/// Left click focuses the panel under the cursor; the wheel scrolls the
/// focused panel (or the help overlay) by 3 rows.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let pos = Position { x: mouse.column, y: mouse.row };
            let [files, diff] = state.panel_rects;
            if files.width > 0 && files.contains(pos) {
                state.focus = PanelFocus::FileList;
            } else if diff.width > 0 && diff.contains(pos) {
                state.focus = PanelFocus::Diff;
            }
        }
        MouseEventKind::ScrollUp if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_sub(3);
        }
        MouseEventKind::ScrollDown if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_add(3);
        }
        MouseEventKind::ScrollUp => state.scroll_up(3),
        MouseEventKind::ScrollDown => state.scroll_down(3),
        _ => {}
    }
    KeyAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use ratatui::layout::Rect;
    use restyle_core::types::{SessionHandle, SessionId};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn lifecycle_keys_need_a_bound_session() {
        let mut state = AppState::default();
        assert_eq!(handle_key(key(KeyCode::Char('a')), &mut state), KeyAction::Continue);
        assert_eq!(handle_key(key(KeyCode::Char('x')), &mut state), KeyAction::Continue);
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), KeyAction::Run);

        let handle = SessionHandle::new(SessionId::new());
        state.bound = Some(handle);
        state.set_pending(handle, std::path::Path::new("/w/a.c"));
        assert_eq!(handle_key(key(KeyCode::Char('a')), &mut state), KeyAction::Apply);
        assert_eq!(handle_key(key(KeyCode::Char('e')), &mut state), KeyAction::Explain);
        assert_eq!(handle_key(key(KeyCode::Esc), &mut state), KeyAction::Close);
    }

    #[test]
    fn help_overlay_swallows_keys() {
        let mut state = AppState::default();
        handle_key(key(KeyCode::Char('?')), &mut state);
        assert_eq!(state.mode, Mode::HelpOverlay);
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), KeyAction::Continue);
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), KeyAction::Quit);
    }

    #[test]
    fn tab_and_click_move_focus() {
        let mut state = AppState::default();
        handle_key(KeyEvent::new_with_kind(KeyCode::Tab, KeyModifiers::NONE, KeyEventKind::Press), &mut state);
        assert_eq!(state.focus, PanelFocus::Diff);

        state.panel_rects = [Rect::new(0, 0, 20, 10), Rect::new(19, 0, 60, 10)];
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 5,
            row: 3,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse(click, &mut state);
        assert_eq!(state.focus, PanelFocus::FileList);
    }
}

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Char, Down, Enter, Esc, Left, PageDown, PageUp, Right, Tab, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if key.code == Char('q') && key.modifiers.is_empty() {
        return Action::Quit;
    }

    match app.screen {
        Screen::Days => match key.code {
            Up | Char('k') => {
                app.day_index = app.day_index.saturating_sub(1);
            }
            Down | Char('j') => {
                if app.day_index + 1 < app.days().len() {
                    app.day_index += 1;
                }
            }
            Enter | Right | Char(' ') => {
                app.open_selected_day();
            }
            Tab | Char('a') => {
                app.screen = Screen::Attributes;
            }
            _ => {}
        },

        Screen::DayDetail => match key.code {
            Left | Esc | Char('b') => {
                app.screen = Screen::Days;
            }
            Up | Char('k') => {
                app.day_index = app.day_index.saturating_sub(1);
            }
            Down | Char('j') => {
                if app.day_index + 1 < app.days().len() {
                    app.day_index += 1;
                }
            }
            _ => {}
        },

        Screen::Attributes => match key.code {
            Left | Esc | Tab | Char('b') => {
                app.screen = Screen::Days;
            }
            Up | Char('k') => {
                app.attribute_offset = app.attribute_offset.saturating_sub(1);
            }
            Down | Char('j') => {
                app.attribute_offset += 1;
            }
            PageUp => {
                app.attribute_offset = app.attribute_offset.saturating_sub(10);
            }
            PageDown => {
                app.attribute_offset += 10;
            }
            _ => {}
        },
    }

    Action::None
}

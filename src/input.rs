use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    ToggleMenu,
    MenuNext,
    MenuPrev,
    FireMenu,
    CloseMenu,
    NextPage,
    PrevPage,
    ToggleSort(u8),
    Refresh,
    SwitchPane,
    Back,
    ToggleHelp,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
    ConfirmYes,
    ConfirmNo,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Menu => map_menu_mode_key(key),
        InputMode::Prompt => map_prompt_mode_key(key),
        InputMode::Confirm => map_confirm_mode_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char(c @ '1'..='9') if key.modifiers.is_empty() => {
            c.to_digit(10).map(|digit| Action::ToggleSort(digit as u8))
        }
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Enter | KeyCode::Char('m') => Some(Action::ToggleMenu),
        KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => Some(Action::NextPage),
        KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => Some(Action::PrevPage),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Tab | KeyCode::BackTab => Some(Action::SwitchPane),
        KeyCode::Esc | KeyCode::Backspace => Some(Action::Back),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn map_menu_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') | KeyCode::Char('l') | KeyCode::Down | KeyCode::Right | KeyCode::Tab => {
            Some(Action::MenuNext)
        }
        KeyCode::Char('k') | KeyCode::Char('h') | KeyCode::Up | KeyCode::Left | KeyCode::BackTab => {
            Some(Action::MenuPrev)
        }
        KeyCode::Enter => Some(Action::FireMenu),
        KeyCode::Char('m') | KeyCode::Esc | KeyCode::Backspace => Some(Action::CloseMenu),
        _ => None,
    }
}

fn map_prompt_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_confirm_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Action::ConfirmNo),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key};
    use crate::app::InputMode;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digits_toggle_sort_on_that_column() {
        assert_eq!(
            map_key(InputMode::Normal, key(KeyCode::Char('3'))),
            Some(Action::ToggleSort(3))
        );
        assert_eq!(map_key(InputMode::Normal, key(KeyCode::Char('0'))), None);
    }

    #[test]
    fn enter_opens_menu_then_fires_it() {
        assert_eq!(
            map_key(InputMode::Normal, key(KeyCode::Enter)),
            Some(Action::ToggleMenu)
        );
        assert_eq!(
            map_key(InputMode::Menu, key(KeyCode::Enter)),
            Some(Action::FireMenu)
        );
        assert_eq!(
            map_key(InputMode::Menu, key(KeyCode::Char('j'))),
            Some(Action::MenuNext)
        );
    }

    #[test]
    fn prompt_mode_captures_letters_used_as_shortcuts() {
        assert_eq!(
            map_key(InputMode::Prompt, key(KeyCode::Char('q'))),
            Some(Action::InputChar('q'))
        );
        assert_eq!(
            map_key(InputMode::Prompt, key(KeyCode::Char('n'))),
            Some(Action::InputChar('n'))
        );
        assert_eq!(
            map_key(InputMode::Prompt, key(KeyCode::Esc)),
            Some(Action::CancelInput)
        );
    }

    #[test]
    fn confirm_mode_accepts_only_yes_or_no() {
        assert_eq!(
            map_key(InputMode::Confirm, key(KeyCode::Char('y'))),
            Some(Action::ConfirmYes)
        );
        assert_eq!(
            map_key(InputMode::Confirm, key(KeyCode::Esc)),
            Some(Action::ConfirmNo)
        );
        assert_eq!(map_key(InputMode::Confirm, key(KeyCode::Char('q'))), None);
    }

    #[test]
    fn ctrl_c_quits_in_every_mode() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        for mode in [
            InputMode::Normal,
            InputMode::Menu,
            InputMode::Prompt,
            InputMode::Confirm,
        ] {
            assert_eq!(map_key(mode, ctrl_c), Some(Action::Quit));
        }
    }
}

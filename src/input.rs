use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Sky,
    TargetSelect,
    MiniMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    RotateLeft,
    RotateRight,
    TiltUp,
    TiltDown,
    ZoomIn,
    ZoomOut,
    ToggleAutoRotate,
    FocusNext,
    FocusPrev,
    OpenTargetSelect,
    ToggleMiniMap,
    ToggleTelemetry,
    MenuMove(i32),
    MenuSelect,
    Back,
    Quit,
}

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

impl InputEvent {
    #[cfg(test)]
    pub(crate) fn key(key: KeyCode) -> Self {
        Self {
            key,
            mods: KeyModifiers::NONE,
        }
    }
}

/// Waits up to `timeout` for the first key, then drains whatever else is
/// queued without waiting.
pub(crate) fn collect_input_nonblocking(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();
    let mut wait = timeout;
    while event::poll(wait)? {
        wait = Duration::ZERO;
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: Scene, ev: &InputEvent) -> Option<Action> {
    // raw mode swallows SIGINT
    if matches!(ev.key, KeyCode::Char('c') | KeyCode::Char('C'))
        && ev.mods.contains(KeyModifiers::CONTROL)
    {
        return Some(Action::Quit);
    }

    match scene {
        Scene::Sky => match ev.key {
            KeyCode::Left => Some(Action::RotateLeft),
            KeyCode::Right => Some(Action::RotateRight),
            KeyCode::Up => Some(Action::TiltUp),
            KeyCode::Down => Some(Action::TiltDown),
            KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Char('+') => Some(Action::ZoomIn),
            KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char('-') => Some(Action::ZoomOut),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::ToggleAutoRotate),
            KeyCode::Char(']') | KeyCode::Tab => Some(Action::FocusNext),
            KeyCode::Char('[') | KeyCode::BackTab => Some(Action::FocusPrev),
            KeyCode::Char('f') | KeyCode::Char('F') => Some(Action::OpenTargetSelect),
            KeyCode::Char('m') | KeyCode::Char('M') => Some(Action::ToggleMiniMap),
            KeyCode::Char('t') | KeyCode::Char('T') => Some(Action::ToggleTelemetry),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
            _ => None,
        },
        Scene::TargetSelect => match ev.key {
            KeyCode::Up => Some(Action::MenuMove(-1)),
            KeyCode::Down => Some(Action::MenuMove(1)),
            KeyCode::Enter => Some(Action::MenuSelect),
            KeyCode::Esc | KeyCode::Char('f') | KeyCode::Char('F') => Some(Action::Back),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
            _ => None,
        },
        Scene::MiniMap => match ev.key {
            KeyCode::Char('m') | KeyCode::Char('M') | KeyCode::Esc => Some(Action::Back),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
            _ => None,
        },
    }
}

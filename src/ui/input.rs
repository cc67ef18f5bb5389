/// Keyboard input tracker.
///
/// Presses are accumulated between ticks and handed to the simulation
/// as one `FrameInput`:
///   - Every direction pressed since the last tick is summed per axis,
///     so Up+Right in the same tick is one diagonal step
///   - Opposite presses cancel out
///   - Finish is a one-shot signal
///
/// Release events are ignored; key repeat gives continuous movement.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::{Direction, FrameInput};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Finish,
    Restart,
    Quit,
}

/// Keyboard binding. Ctrl-C always quits.
pub fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Action::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Action::Right),
        KeyCode::Char('k') | KeyCode::Char('K') => Some(Action::Finish),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Restart),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        _ => None,
    }
}

/// Intents gathered from every input device since the last tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intents {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    finish: bool,
    restart: bool,
    quit: bool,
}

impl Intents {
    pub fn push(&mut self, action: Action) {
        match action {
            Action::Up => self.up = true,
            Action::Down => self.down = true,
            Action::Left => self.left = true,
            Action::Right => self.right = true,
            Action::Finish => self.finish = true,
            Action::Restart => self.restart = true,
            Action::Quit => self.quit = true,
        }
    }

    /// Combined move and finish signal for this tick; clears both.
    pub fn take_frame_input(&mut self) -> FrameInput {
        let pressed = [
            (self.up, Direction::UP),
            (self.down, Direction::DOWN),
            (self.left, Direction::LEFT),
            (self.right, Direction::RIGHT),
        ];
        let (d_row, d_col) = pressed
            .iter()
            .filter(|(on, _)| *on)
            .fold((0, 0), |(r, c), (_, d)| (r + d.d_row(), c + d.d_col()));
        let input = FrameInput {
            movement: Direction::from_axes(d_row, d_col),
            finish: self.finish,
        };
        self.up = false;
        self.down = false;
        self.left = false;
        self.right = false;
        self.finish = false;
        input
    }

    pub fn take_restart(&mut self) -> bool {
        std::mem::take(&mut self.restart)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }
}

pub struct InputState {
    pub intents: Intents,
}

impl InputState {
    pub fn new() -> Self {
        InputState { intents: Intents::default() }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame; intents persist until the next tick takes them.
    pub fn drain_events(&mut self) {
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.feed(&key);
            }
        }
    }

    fn feed(&mut self, key: &KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        if let Some(action) = action_for(key) {
            self.intents.push(action);
        }
    }
}

// Event handling for the TUI application

use crate::services::{CheckResult, ReconnectResult, ServiceId};
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Application events
#[derive(Debug)]
pub enum AppEvent {
    /// User input event
    Input(CrosstermEvent),

    /// Periodic tick for refresh
    Tick,

    /// Fresh results from `status_all`
    StatusLoaded(BTreeMap<ServiceId, CheckResult>),

    /// A single-service reconnect finished
    ReconnectFinished { id: ServiceId, result: ReconnectResult },

    /// "Reconnect all" finished
    ReconnectAllFinished(BTreeMap<ServiceId, ReconnectResult>),

    /// Status message for user feedback
    StatusMessage(String),

    /// Request to quit
    Quit,
}

/// User actions derived from input events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    MoveUp,
    MoveDown,
    MoveTop,
    MoveBottom,
    Reconnect,
    ReconnectAll,
    Refresh,
    None,
}

/// Convert keyboard input to actions
pub fn key_event_to_action(key: KeyEvent) -> Action {
    match (key.code, key.modifiers) {
        // Quit
        (KeyCode::Char('q'), KeyModifiers::NONE) => Action::Quit,
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
        (KeyCode::Esc, _) => Action::Quit,

        // Navigation
        (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => Action::MoveUp,
        (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => Action::MoveDown,
        (KeyCode::Home, _) | (KeyCode::Char('g'), KeyModifiers::NONE) => Action::MoveTop,
        (KeyCode::End, _) | (KeyCode::Char('G'), KeyModifiers::SHIFT) => Action::MoveBottom,

        // Repairs
        (KeyCode::Enter, _) | (KeyCode::Char('r'), KeyModifiers::NONE) => Action::Reconnect,
        (KeyCode::Char('a'), KeyModifiers::NONE) => Action::ReconnectAll,

        (KeyCode::F(5), _) => Action::Refresh,

        _ => Action::None,
    }
}

/// Spawn input event handler task
///
/// crossterm polling blocks, so it runs on the blocking pool.
pub fn spawn_input_handler(tx: mpsc::Sender<AppEvent>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || loop {
        match crossterm::event::poll(Duration::from_millis(100)) {
            Ok(true) => {
                if let Ok(event) = crossterm::event::read() {
                    if tx.blocking_send(AppEvent::Input(event)).is_err() {
                        break;
                    }
                }
            }
            Ok(false) => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Terminal input failed: {}", e);
                break;
            }
        }
    })
}

/// Spawn periodic tick task
pub fn spawn_ticker(tx: mpsc::Sender<AppEvent>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        // The first tick fires immediately; the initial load is requested separately
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.send(AppEvent::Tick).await.is_err() {
                break;
            }
        }
    })
}

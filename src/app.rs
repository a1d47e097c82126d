// Main application state and event routing

use crate::events::{key_event_to_action, Action, AppEvent};
use crate::services::{ReconnectResult, Registry, ServiceId};
use crate::ui::{status_color, DashboardState};
use crossterm::event::{Event as CrosstermEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Main application state
pub struct App {
    pub dashboard: DashboardState,
    pub should_quit: bool,
    pub registry: Arc<Registry>,
    pub tx: mpsc::Sender<AppEvent>,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(
        registry: Arc<Registry>,
        remote_host: impl Into<String>,
        tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            dashboard: DashboardState::new(remote_host),
            should_quit: false,
            registry,
            tx,
            status_message: None,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(input) => self.handle_input(input),
            AppEvent::Tick => self.request_refresh(),
            AppEvent::StatusLoaded(statuses) => self.dashboard.set_statuses(statuses),
            AppEvent::ReconnectFinished { id, result } => {
                self.dashboard.set_busy(id, false);
                self.status_message = Some(describe_result(id, &result));
                self.request_refresh();
            }
            AppEvent::ReconnectAllFinished(results) => {
                // A service still busy with its own reconnect keeps its marker
                // until that reconnect reports back
                for (id, result) in &results {
                    if !result.is_in_progress() {
                        self.dashboard.set_busy(*id, false);
                    }
                }
                self.status_message = Some(describe_all(&results));
                self.request_refresh();
            }
            AppEvent::StatusMessage(message) => {
                tracing::info!("Status: {}", message);
                self.status_message = Some(message);
            }
            AppEvent::Quit => {
                self.should_quit = true;
            }
        }
    }

    fn handle_input(&mut self, event: CrosstermEvent) {
        let CrosstermEvent::Key(key_event) = event else {
            return;
        };
        if key_event.kind != KeyEventKind::Press {
            return;
        }

        match key_event_to_action(key_event) {
            Action::Quit => self.should_quit = true,
            Action::Refresh => {
                self.status_message = Some("ℹ Refreshing…".to_string());
                self.request_refresh();
            }
            Action::ReconnectAll => self.start_reconnect_all(),
            Action::None => {}
            action => {
                if let Some(id) = self.dashboard.handle_action(action) {
                    self.start_reconnect(id);
                }
            }
        }
    }

    /// Run `status_all` in the background; at most one refresh in flight
    pub fn request_refresh(&mut self) {
        if self.dashboard.refreshing {
            return;
        }
        self.dashboard.refreshing = true;

        let registry = Arc::clone(&self.registry);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let statuses = registry.status_all().await;
            tx.send(AppEvent::StatusLoaded(statuses)).await.ok();
        });
    }

    fn start_reconnect(&mut self, id: ServiceId) {
        if self.dashboard.row(id).map(|r| r.busy).unwrap_or(false) {
            self.status_message = Some(describe_result(id, &ReconnectResult::AlreadyInProgress));
            return;
        }

        self.dashboard.set_busy(id, true);
        self.status_message = Some(format!("ℹ Reconnecting {}…", id.label()));

        let registry = Arc::clone(&self.registry);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match registry.reconnect(id).await {
                Ok(result) => AppEvent::ReconnectFinished { id, result },
                Err(e) => AppEvent::StatusMessage(format!("✗ {}", e)),
            };
            tx.send(event).await.ok();
        });
    }

    fn start_reconnect_all(&mut self) {
        for id in ServiceId::ALL {
            self.dashboard.set_busy(id, true);
        }
        self.status_message = Some("ℹ Reconnecting all services…".to_string());

        let registry = Arc::clone(&self.registry);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let results = registry.reconnect_all().await;
            tx.send(AppEvent::ReconnectAllFinished(results)).await.ok();
        });
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        // Reserve space for status message if present
        let (content_area, status_area) = if self.status_message.is_some() {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(0),
                    Constraint::Length(3), // 1 line of text plus borders
                ])
                .split(area);
            (chunks[0], Some(chunks[1]))
        } else {
            (area, None)
        };

        self.dashboard
            .render(frame, content_area, status_area.is_none());

        if let (Some(status_area), Some(message)) = (status_area, &self.status_message) {
            let (color, prefix) = status_color(message);
            let text = message
                .trim_start_matches(prefix)
                .trim_start();

            let status_line = Line::from(vec![
                Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(text, Style::default().fg(color)),
            ]);

            let status_bar = Paragraph::new(status_line)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(" Status ")
                        .border_style(Style::default().fg(color)),
                )
                .wrap(Wrap { trim: true });

            frame.render_widget(status_bar, status_area);
        }
    }
}

/// Status-bar line for one reconnect result
pub fn describe_result(id: ServiceId, result: &ReconnectResult) -> String {
    let marker = match result {
        ReconnectResult::Completed(outcome) if outcome.success => "✓",
        ReconnectResult::Completed(_) => "✗",
        ReconnectResult::AlreadyInProgress => "ℹ",
    };
    format!("{} {}: {}", marker, id.label(), result.message())
}

/// Status-bar line for "reconnect all"
pub fn describe_all(results: &BTreeMap<ServiceId, ReconnectResult>) -> String {
    let unfinished: Vec<String> = results
        .iter()
        .filter(|(_, result)| !result.is_success())
        .map(|(id, result)| format!("{}: {}", id.label(), result.message()))
        .collect();

    if unfinished.is_empty() {
        return "✓ All services reconnected".to_string();
    }

    let any_failed = results
        .values()
        .any(|result| !result.is_success() && !result.is_in_progress());
    let marker = if any_failed { "✗" } else { "ℹ" };
    format!("{} {}", marker, unfinished.join(" | "))
}

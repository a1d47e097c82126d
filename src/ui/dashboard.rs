// Dashboard view - managed service table

use crate::events::Action;
use crate::services::{CheckResult, HealthState, ServiceId};
use crate::ui::{
    busy_style, header_row_style, health_color, health_emoji, help_style, selected_style,
    title_style,
};
use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use std::collections::BTreeMap;

/// One line of the table
#[derive(Debug, Clone)]
pub struct ServiceRow {
    pub id: ServiceId,
    /// `None` until the first check completes
    pub status: Option<CheckResult>,
    pub busy: bool,
}

impl ServiceRow {
    pub fn state(&self) -> Option<HealthState> {
        self.status.as_ref().map(|s| s.state)
    }
}

#[derive(Debug)]
pub struct DashboardState {
    pub rows: Vec<ServiceRow>,
    pub table_state: TableState,
    pub remote_host: String,
    pub last_refresh: Option<DateTime<Local>>,
    pub refreshing: bool,
}

impl DashboardState {
    pub fn new(remote_host: impl Into<String>) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));

        let rows = ServiceId::ALL
            .iter()
            .map(|id| ServiceRow {
                id: *id,
                status: None,
                busy: false,
            })
            .collect();

        Self {
            rows,
            table_state,
            remote_host: remote_host.into(),
            last_refresh: None,
            refreshing: false,
        }
    }

    pub fn set_statuses(&mut self, mut statuses: BTreeMap<ServiceId, CheckResult>) {
        for row in &mut self.rows {
            if let Some(status) = statuses.remove(&row.id) {
                row.status = Some(status);
            }
        }
        self.last_refresh = Some(Local::now());
        self.refreshing = false;
    }

    pub fn set_busy(&mut self, id: ServiceId, busy: bool) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.id == id) {
            row.busy = busy;
        }
    }

    pub fn row(&self, id: ServiceId) -> Option<&ServiceRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn selected_id(&self) -> Option<ServiceId> {
        self.table_state
            .selected()
            .and_then(|i| self.rows.get(i))
            .map(|r| r.id)
    }

    /// Apply navigation; returns the service to reconnect for `Action::Reconnect`
    pub fn handle_action(&mut self, action: Action) -> Option<ServiceId> {
        match action {
            Action::MoveUp => {
                self.move_selection(-1);
                None
            }
            Action::MoveDown => {
                self.move_selection(1);
                None
            }
            Action::MoveTop => {
                self.table_state.select(Some(0));
                None
            }
            Action::MoveBottom => {
                self.table_state.select(Some(self.rows.len().saturating_sub(1)));
                None
            }
            Action::Reconnect => self.selected_id(),
            _ => None,
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }

        let current = self.table_state.selected().unwrap_or(0);
        let new_index = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            (current + delta as usize).min(self.rows.len() - 1)
        };

        self.table_state.select(Some(new_index));
    }

    /// (healthy, unhealthy, unknown) counts over checked services
    pub fn get_stats(&self) -> (usize, usize, usize) {
        let count = |state| self.rows.iter().filter(|r| r.state() == Some(state)).count();
        (
            count(HealthState::Healthy),
            count(HealthState::Unhealthy),
            count(HealthState::Unknown),
        )
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, show_footer: bool) {
        let mut constraints = vec![
            Constraint::Length(3), // Header
            Constraint::Length(3), // Stats
            Constraint::Min(0),    // Services table
        ];
        if show_footer {
            constraints.push(Constraint::Length(1));
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_header(frame, chunks[0]);
        self.render_stats(frame, chunks[1]);
        self.render_table(frame, chunks[2]);

        if show_footer {
            self.render_help(frame, chunks[3]);
        }
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let help = Paragraph::new(
            "[r/Enter] Reconnect | [a] Reconnect All | [↑↓/jk] Navigate | [F5] Refresh | [q] Quit",
        )
        .style(help_style())
        .alignment(Alignment::Center);

        frame.render_widget(help, area);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let title = format!("⚡ {}  →  {}", crate::version::format_header(), self.remote_host);

        let header = Paragraph::new(title)
            .style(title_style())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));

        frame.render_widget(header, area);
    }

    fn render_stats(&self, frame: &mut Frame, area: Rect) {
        let (healthy, unhealthy, unknown) = self.get_stats();

        let refreshed = if self.refreshing {
            "checking…".to_string()
        } else {
            match self.last_refresh {
                Some(at) => format!("updated {}", at.format("%H:%M:%S")),
                None => "not checked yet".to_string(),
            }
        };

        let stats_text = format!(
            "Healthy: {} | Unhealthy: {} | Unknown: {} | {}",
            healthy, unhealthy, unknown, refreshed
        );

        let stats = Paragraph::new(stats_text)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));

        frame.render_widget(stats, area);
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect) {
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| {
                let state = row.state();
                let color = health_color(state);

                let state_cell = if row.busy {
                    Cell::from("reconnecting…").style(busy_style())
                } else {
                    let label = state.map(|s| s.as_str()).unwrap_or("checking");
                    Cell::from(label).style(Style::default().fg(color))
                };

                let (detail, checked) = match &row.status {
                    Some(status) => (
                        status.detail.clone(),
                        status
                            .checked_at
                            .with_timezone(&Local)
                            .format("%H:%M:%S")
                            .to_string(),
                    ),
                    None => ("Checking…".to_string(), "-".to_string()),
                };

                Row::new(vec![
                    Cell::from(format!("{} {}", health_emoji(state), row.id.label())),
                    state_cell,
                    Cell::from(detail).style(Style::default().fg(color)),
                    Cell::from(checked),
                ])
            })
            .collect();

        let widths = [
            Constraint::Percentage(22),
            Constraint::Percentage(16),
            Constraint::Percentage(50),
            Constraint::Percentage(12),
        ];

        let table = Table::new(rows, widths)
            .header(
                Row::new(vec!["Service", "State", "Detail", "Checked"])
                    .style(header_row_style())
                    .bottom_margin(1),
            )
            .block(Block::default().title(" Services ").borders(Borders::ALL))
            .highlight_style(selected_style())
            .highlight_symbol(">> ");

        frame.render_stateful_widget(table, area, &mut self.table_state);
    }
}

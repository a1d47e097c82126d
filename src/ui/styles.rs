// Ratatui styling and color palette

use crate::services::HealthState;
use ratatui::style::{Color, Modifier, Style};

// Color palette
pub const PRIMARY: Color = Color::Cyan;
pub const ACCENT: Color = Color::Magenta;
pub const SUCCESS: Color = Color::Green;
pub const WARNING: Color = Color::Yellow;
pub const ERROR: Color = Color::Red;
pub const MUTED: Color = Color::Gray;

// Common styles
pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn help_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn busy_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

pub fn header_row_style() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

/// Color for a health verdict; `None` means not checked yet
pub fn health_color(state: Option<HealthState>) -> Color {
    match state {
        Some(HealthState::Healthy) => SUCCESS,
        Some(HealthState::Unhealthy) => ERROR,
        Some(HealthState::Unknown) => WARNING,
        None => MUTED,
    }
}

/// Colored emoji for a health verdict
pub fn health_emoji(state: Option<HealthState>) -> &'static str {
    match state {
        Some(HealthState::Healthy) => "🟢",
        Some(HealthState::Unhealthy) => "🔴",
        Some(HealthState::Unknown) => "🟠",
        None => "⚪",
    }
}

/// Color and prefix for the status bar, keyed on the message marker
pub fn status_color(message: &str) -> (Color, &'static str) {
    if message.starts_with('✓') {
        (SUCCESS, "✓")
    } else if message.starts_with('✗') {
        (ERROR, "✗")
    } else {
        (WARNING, "ℹ")
    }
}

// UI module - TUI components

pub mod dashboard;
pub mod styles;


pub use dashboard::{DashboardState, ServiceRow};
pub use styles::*;

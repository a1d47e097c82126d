// Relink - Remote Link Monitor
// Library root

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod server;
pub mod services;
pub mod ui;
pub mod version;

//! UI layer: dashboard shell and panels.

pub mod app;

pub use app::TokenDashboardApp;

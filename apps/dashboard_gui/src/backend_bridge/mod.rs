//! Bridge between the egui thread and the async dashboard worker.

pub mod commands;
pub mod runtime;

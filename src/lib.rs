// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod difficulty;
pub mod presenter;
pub mod runtime;
pub mod scheduler;
pub mod scoring;
pub mod session;
pub mod stats;
pub mod ui;

mod app;
mod cli;
mod effects;
mod logging;
mod render;

pub use app::run_app;
pub use cli::Cli;

mod commands;
mod display;

pub use commands::{BufferAction, Cli, Commands, MetricsAction, OutcomeArg};
pub use display::Display;

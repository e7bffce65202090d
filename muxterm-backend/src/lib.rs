pub mod ansi;
pub mod colors;
pub mod emulation;
pub mod event;
pub mod input;
pub mod performer;
pub mod tmux;

pub use emulation::Emulation;
pub use performer::handler::{Screen, StdTimeout, Timeout};

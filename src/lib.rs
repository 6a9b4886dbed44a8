//! Spawn scripts through a shell interpreter and consume their output as streams or as
//! one awaited result.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;

pub use models::{FinishedProcess, Platform, PlatformSupport, SpawnOptions, StdioMode};
pub use system::{
    channel::{ChannelState, OutputChannel, OutputStream},
    exit::ExitPolicy,
    input::InputChannel,
    interpreter::{Interpreter, InterpreterRegistry, SearchPath},
    process::{ProcessError, RunningProcess},
    session::{Session, SessionError},
};

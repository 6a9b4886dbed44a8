//! # System Interaction Layer
//!
//! This module owns everything that touches child processes. It serves as the boundary
//! between callers and the specifics of interpreter discovery, spawning, and pipe I/O.
//!
//! ## Modules
//!
//! - **`interpreter`**: Interpreter descriptors (`sh`, `bash`, `powershell`, `batch`, plus
//!   custom ones) and the registry that resolves them once against `PATH`.
//! - **`session`**: The caller-facing `Session`: selected interpreter, spawn options and
//!   exit-code tolerance. `exec` turns a script into a `RunningProcess`.
//! - **`process`**: The live child. Drains stdout/stderr into channels and accumulators
//!   and settles into a `FinishedProcess` on exit.
//! - **`channel`**: The multiplexed output channel, consumable as a stream or awaited as
//!   a whole.
//! - **`input`**: The single-writer channel wired to the child's stdin.
//! - **`exit`**: Exit notification shared by the process and its channels, and the
//!   exit-code policy.

pub mod channel;
mod decoder;
pub mod exit;
pub mod input;
pub mod interpreter;
pub mod process;
pub mod session;

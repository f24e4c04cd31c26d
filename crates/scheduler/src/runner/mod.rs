//! Scheduler runner -- owns the job records and drives them to completion.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, and accessor methods
//! - `scheduling`: initial launch and the completion rule
//! - `execution`: poll sweeps and the main run loop

mod core;
mod execution;
mod scheduling;

pub use self::core::Scheduler;

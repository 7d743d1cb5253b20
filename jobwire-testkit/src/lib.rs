//! Test doubles for jobwire.
//!
//! - [`TestJob`] and [`StaticJobProvider`] - configurable job objects
//! - [`RecordingCoordinationClient`] - records enable/disable calls, can fail per job
//! - [`RecordingScheduler`] - records scheduler starts, can fail per job

mod job;
mod mock;

pub use job::{StaticJobProvider, TestJob};
pub use mock::{CoordinationCall, RecordingCoordinationClient, RecordingScheduler, StartRecord};

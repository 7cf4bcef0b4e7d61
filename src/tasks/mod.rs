//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Sweeper: time-based and memory-pressure eviction at the configured interval

mod sweeper;

pub(crate) use sweeper::spawn_sweeper;

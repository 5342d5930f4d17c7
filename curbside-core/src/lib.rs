//! Core types and services for the curbside pickup schedule.

/// Service calendar holding the designated recycling and yard-waste dates.
pub mod calendar;
/// Day classification and weekly status aggregation.
pub mod classify;
/// Time-zone aware civil date helpers.
pub mod dates;
/// In-memory implementations of the preference and notification ports.
pub mod memory;
/// Domain data structures shared by the query surface and the scheduler.
pub mod model;
/// Traits describing external collaborators.
pub mod ports;
/// Reminder preferences read from the external settings store.
pub mod prefs;
/// Capacity-bounded reminder scheduler.
pub mod scheduler;
/// High-level service facade used by clients.
pub mod service;

pub use calendar::*;
pub use classify::*;
pub use dates::*;
pub use model::*;
pub use ports::*;
pub use prefs::*;
pub use scheduler::*;
pub use service::*;

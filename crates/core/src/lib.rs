//! # Planner Core
//!
//! Schedule and timeslot model for the planner: storage of timeslots,
//! date/id indices, repeat expansion over arbitrary date ranges, and the
//! [`state::PlanningState`] orchestrator the UI and notification poller drive.
//!
//! Persistence and notification delivery are collaborators, reached through
//! [`repository::ScheduleRepository`] and [`notification::Notifier`].

/// Month-grid date helpers
pub mod calendar;
/// Time source abstraction
pub mod clock;
/// Runtime configuration from the environment
pub mod config;
pub mod errors;
/// Mock collaborators for tests
pub mod mock;
pub mod models;
pub mod notification;
/// Persistence collaborator contract
pub mod repository;
pub mod state;

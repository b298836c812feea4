//! Reconciliation engine for podwatch.
//!
//! A [`Scheduler`] periodically selects due tracked shows, re-fetches their
//! episodes from a [`ContentProvider`], diffs them against the stored
//! checkpoint, notifies subscribers through a [`MessageSink`] and commits the
//! new checkpoint to a [`SubscriptionStore`]. Everything is generic over those
//! three seams; this crate knows nothing about HTTP or SQL.
//!
//! [`ContentProvider`]: podwatch_core::provider::ContentProvider
//! [`MessageSink`]: podwatch_core::notify::MessageSink
//! [`SubscriptionStore`]: podwatch_core::store::SubscriptionStore

pub mod config;
pub mod dispatch;
pub mod error;
pub mod reconcile;
pub mod scheduler;

pub use config::EngineConfig;
pub use dispatch::{DeliveryOutcome, DeliveryRecord, NotificationDispatcher};
pub use error::{CycleError, ReconcileError};
pub use reconcile::{ReconcileOutcome, ShowReport};
pub use scheduler::{CycleSummary, Scheduler, SchedulerState};

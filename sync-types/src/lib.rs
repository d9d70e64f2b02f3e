//! # sync-types
//!
//! Domain types for the vidsync playlist synchronization engine.
//!
//! This crate provides the foundational types used across all vidsync crates:
//! - [`PlaylistId`], [`VideoId`], [`ChannelId`], [`RunId`] - Identity types
//! - [`Playlist`], [`PlaylistItem`], [`VideoMeta`] - Synchronized records
//! - [`SyncHistoryRecord`], [`ScheduleEntry`], [`QuotaUsage`] - Engine records
//! - [`SyncError`] - Error taxonomy with retry classification
//!
//! The types here are plain data: no I/O, no clocks, no remote calls. The
//! engine crates own all behavior.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ids;
pub mod model;

pub use error::{ErrorClass, SyncError};
pub use ids::{ChannelId, PlaylistId, RunId, VideoId};
pub use model::{
    Playlist, PlaylistItem, QuotaUsage, ScheduleEntry, SyncHistoryRecord, SyncStatus, Thumbnails,
    VideoMeta,
};

//! photosync: keeps local folders in step with a cloud photo library.
//!
//! Each pass lists the configured albums (or the whole library), compares
//! every requested size variant against what is already on disk and streams
//! whatever is missing or changed. Local edits to an original are never
//! overwritten: the copy is moved aside to `<name>__original.<ext>` first.
//!
//! The binary drives [`sync::sync_photos`] on an interval. The per-photo
//! operations in [`download`] can be used on their own.

#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod download;
pub mod photos;
pub mod retry;
pub mod shutdown;
pub mod sync;
pub mod types;

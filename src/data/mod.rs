//! Data persistence layer for GGBPuppy
//!
//! SQLite-backed key/value storage shared by the share backend and the local
//! fallback storage provider, plus the persisted share models.

mod database;
mod kv;
mod migrations;
mod models;

pub use database::{Database, DatabaseError};
pub use kv::{KvEntry, KvStore};
pub use models::{SceneFormat, SceneSnapshot, ShareOptions, ShareRecord, SCENE_FORMAT_VERSION};

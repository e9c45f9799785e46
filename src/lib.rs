//! # Revision Control
//!
//! A single user version control engine: content addressed objects, named
//! branches with their own staging sets, and three-way merges between them.

mod hex;

/// Named branch pointers and their staging sets.
pub mod branch;
/// Sealed commits and the tracked file maps they carry.
pub mod commit;
/// Parent links between commits and ancestry queries over them.
pub mod commit_graph;
pub mod dot_rev;
pub mod error;
/// Three-way merging of one branch into another.
pub mod merge;
/// Hash-based binary object identifier.
pub mod object_id;
/// Content addressible store API using the [`ObjectId`](object_id::ObjectId).
pub mod object_store;
pub mod repository;
/// The working directory collaborator.
pub mod workspace;

pub use error::{Error, Result};

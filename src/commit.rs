use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object_id::{CommitId, ObjectId};

/// Message carried by the root commit of every repository.
pub const INITIAL_MESSAGE: &str = "initial commit";

/// Tracked paths mapped to the [`ObjectId`] of their content.
pub type Tracked = BTreeMap<String, ObjectId>;

/// A path and the content it had at one point in time.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Blob {
    pub path: String,
    pub content: ObjectId,
}

/// The part of a commit which is hashed and stored.
///
/// `tracked` is a [`BTreeMap`] so the JSON encoding lists paths in sorted
/// order, which makes the hash a pure function of the fields.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    /// The commit this one was built on top of, `None` only for the root.
    pub parent: Option<CommitId>,
    /// The message added with the commit.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub tracked: Tracked,
}

/// A sealed commit: a [`CommitRecord`] together with the id it is stored under.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Commit {
    id: CommitId,
    record: CommitRecord,
}

impl Commit {
    pub(crate) fn new(id: CommitId, record: CommitRecord) -> Self {
        Self { id, record }
    }

    pub fn id(&self) -> CommitId {
        self.id
    }

    pub fn parent(&self) -> Option<CommitId> {
        self.record.parent
    }

    pub fn message(&self) -> &str {
        &self.record.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record.timestamp
    }

    pub fn tracked(&self) -> &Tracked {
        &self.record.tracked
    }

    pub fn into_tracked(self) -> Tracked {
        self.record.tracked
    }

    pub fn is_root(&self) -> bool {
        self.record.parent.is_none()
    }

    pub fn blob(&self, path: &str) -> Option<Blob> {
        self.record.tracked.get(path).map(|&content| Blob {
            path: path.to_owned(),
            content,
        })
    }
}

/// Log entry format.
impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===")?;
        writeln!(f, "commit {}", self.id)?;
        writeln!(
            f,
            "Date: {}",
            self.record.timestamp.format("%Y-%m-%d %H:%M:%S %z")
        )?;
        writeln!(f, "{}", self.record.message)
    }
}

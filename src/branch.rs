use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    commit::{Commit, Tracked},
    commit_graph::CommitGraph,
    error::{Error, Result},
    object_id::{CommitId, ObjectId},
    object_store::ObjectStore,
    workspace::validate_path,
};

/// A named pointer to a head commit, plus the staging set the next commit
/// on this branch is assembled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    name: String,
    head: CommitId,
    staging: Tracked,
    created_at: DateTime<Utc>,
}

/// Branch names become file names in the refs table.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(|c: char| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(Error::InvalidBranchName(name.to_owned()));
    }
    Ok(())
}

impl Branch {
    /// A branch sitting on `head`, staging a copy of its tracked files.
    pub fn new(name: &str, head: &Commit) -> Self {
        Self {
            name: name.to_owned(),
            head: head.id(),
            staging: head.tracked().clone(),
            created_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn head(&self) -> CommitId {
        self.head
    }

    pub fn staging(&self) -> &Tracked {
        &self.staging
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Stores `bytes` right away and records them as the next content of `path`.
    pub fn stage<S>(&mut self, store: &mut S, path: &str, bytes: &[u8]) -> Result<ObjectId>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        validate_path(path)?;
        let id = store.insert(bytes)?;
        log::debug!("staging {} as {} on {}", path, id, self.name);
        self.staging.insert(path.to_owned(), id);
        Ok(id)
    }

    pub fn unstage(&mut self, path: &str) -> Result<ObjectId> {
        let id = self
            .staging
            .remove(path)
            .ok_or_else(|| Error::NothingToRemove(path.to_owned()))?;
        log::debug!("unstaged {} from {}", path, self.name);
        Ok(id)
    }

    /// Whether staging differs from `head`, which must be this branch's head commit.
    pub fn has_changes(&self, head: &Commit) -> bool {
        debug_assert_eq!(head.id(), self.head);
        &self.staging != head.tracked()
    }

    /// Turns the staging set into a commit on top of the current head.
    pub fn seal<S>(&mut self, graph: &mut CommitGraph<S>, message: &str) -> Result<Commit>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        if message.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let commit = graph.seal(Some(self.head), message, self.staging.clone())?;
        self.advance(&commit);
        Ok(commit)
    }

    /// Points the branch at `commit` and restarts staging from its files.
    pub fn advance(&mut self, commit: &Commit) {
        log::info!("{} now at {}", self.name, commit.id().short());
        self.head = commit.id();
        self.staging = commit.tracked().clone();
    }

    pub fn current_files<S>(&self, graph: &CommitGraph<S>) -> Result<Tracked>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        Ok(graph.get(self.head)?.into_tracked())
    }
}

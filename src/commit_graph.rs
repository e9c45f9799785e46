use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::{
    commit::{Commit, CommitRecord, Tracked, INITIAL_MESSAGE},
    error::{Error, Result},
    object_id::CommitId,
    object_store::{InsertJson, ObjectStore},
};

/// Immutable commits linked by their parent ids.
///
/// Commits live in the [`ObjectStore`] under the hash of their JSON record.
/// Everything else refers to them by [`CommitId`], so the graph owns no
/// references between commits. An index of every sealed id is kept beside
/// the store since the store itself does not distinguish commits from file
/// contents.
#[derive(Debug, Clone)]
pub struct CommitGraph<S> {
    store: S,
    index: BTreeSet<CommitId>,
}

impl<S> CommitGraph<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    pub fn new(store: S) -> Self {
        Self::with_index(store, BTreeSet::new())
    }

    pub fn with_index(store: S, index: BTreeSet<CommitId>) -> Self {
        Self { store, index }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Every commit ever sealed in this graph.
    pub fn index(&self) -> &BTreeSet<CommitId> {
        &self.index
    }

    pub fn contains(&self, id: CommitId) -> bool {
        self.index.contains(&id)
    }

    /// Seals the root commit. Its timestamp is the Unix epoch, so every
    /// repository starts from the same root id.
    pub fn seal_root(&mut self) -> Result<Commit> {
        self.seal_at(None, INITIAL_MESSAGE, Tracked::new(), DateTime::<Utc>::default())
    }

    /// Id the root commit has in every graph.
    pub fn root_id() -> Result<CommitId> {
        let record = root_record();
        Ok((&serde_json::to_vec_pretty(&record)?).into())
    }

    pub fn seal(
        &mut self,
        parent: Option<CommitId>,
        message: &str,
        tracked: Tracked,
    ) -> Result<Commit> {
        self.seal_at(parent, message, tracked, Utc::now())
    }

    pub fn seal_at(
        &mut self,
        parent: Option<CommitId>,
        message: &str,
        tracked: Tracked,
        timestamp: DateTime<Utc>,
    ) -> Result<Commit> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(Error::MissingObject(parent));
            }
        }
        let record = CommitRecord {
            parent,
            message: message.to_owned(),
            timestamp,
            tracked,
        };
        let id = self.store.insert_json(&record)?;
        log::debug!("sealed commit {} ({:?})", id, record.message);
        self.index.insert(id);
        Ok(Commit::new(id, record))
    }

    pub fn get(&self, id: CommitId) -> Result<Commit> {
        if !self.contains(id) {
            return Err(Error::CommitNotFound(id.to_string()));
        }
        let record: CommitRecord = self.store.read_json(id)?;
        Ok(Commit::new(id, record))
    }

    /// Walks parent links from `id` back to the root, `id` included.
    pub fn ancestors(&self, id: CommitId) -> Ancestors<'_, S> {
        Ancestors {
            graph: self,
            next: Some(id),
        }
    }

    /// Whether `a` is `b` or one of its ancestors.
    pub fn is_ancestor(&self, a: CommitId, b: CommitId) -> Result<bool> {
        for commit in self.ancestors(b) {
            if commit?.id() == a {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The nearest commit reachable from both `a` and `b`.
    ///
    /// Collects the ancestors of `a`, then walks `b` from its tip and takes
    /// the first id seen on both chains.
    pub fn common_ancestor(&self, a: CommitId, b: CommitId) -> Result<CommitId> {
        let from_a = self
            .ancestors(a)
            .map(|commit| commit.map(|c| c.id()))
            .collect::<Result<BTreeSet<_>>>()?;
        for commit in self.ancestors(b) {
            let id = commit?.id();
            if from_a.contains(&id) {
                log::debug!("common ancestor of {} and {} is {}", a, b, id);
                return Ok(id);
            }
        }
        Err(Error::NoCommonAncestor(a, b))
    }

    /// Resolves a full id or a unique prefix of one.
    pub fn resolve(&self, prefix: &str) -> Result<CommitId> {
        let prefix = prefix.to_ascii_lowercase();
        let found: Vec<CommitId> = self
            .index
            .iter()
            .filter(|id| id.to_string().starts_with(prefix.as_str()))
            .take(2)
            .copied()
            .collect();
        match found.as_slice() {
            [id] if !prefix.is_empty() => Ok(*id),
            [] => Err(Error::CommitNotFound(prefix)),
            _ => Err(Error::AmbiguousCommit(prefix)),
        }
    }

    /// Every sealed commit, newest first.
    pub fn all(&self) -> Result<Vec<Commit>> {
        let mut commits = self
            .index
            .iter()
            .map(|&id| self.get(id))
            .collect::<Result<Vec<_>>>()?;
        commits.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()).then(a.id().cmp(&b.id())));
        Ok(commits)
    }
}

fn root_record() -> CommitRecord {
    CommitRecord {
        parent: None,
        message: INITIAL_MESSAGE.to_owned(),
        timestamp: DateTime::<Utc>::default(),
        tracked: Tracked::new(),
    }
}

/// Lazy walk over a parent chain, see [`CommitGraph::ancestors`].
pub struct Ancestors<'a, S> {
    graph: &'a CommitGraph<S>,
    next: Option<CommitId>,
}

impl<'a, S> Iterator for Ancestors<'a, S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        let commit = self.graph.get(id);
        if let Ok(commit) = &commit {
            self.next = commit.parent();
        }
        Some(commit)
    }
}

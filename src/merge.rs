//! Three-way merge of one branch into another.
//!
//! Both heads are compared against their nearest common ancestor. Every path
//! present in any of the three commits gets exactly one [`Resolution`]; if
//! any of them is a conflict the merge aborts as a whole and only the
//! conflict blocks are written out.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    branch::Branch,
    commit::{Commit, Tracked},
    commit_graph::CommitGraph,
    error::{Error, Result},
    object_id::{CommitId, ObjectId},
    object_store::ObjectStore,
    workspace::{Transition, Workspace},
};

pub const CONFLICT_HEAD: &str = "<<<<<<< HEAD";
pub const CONFLICT_SEPARATOR: &str = "=======";
pub const CONFLICT_END: &str = ">>>>>>>";

/// How one side changed a path relative to the merge base. Paths a side left
/// alone have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added(ObjectId),
    Modified(ObjectId),
    Deleted,
}

/// What a path becomes in the merged commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Take(ObjectId),
    Drop,
    /// A missing side stands for empty content.
    Conflict {
        current: Option<ObjectId>,
        other: Option<ObjectId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The other head is already part of the current history.
    FastForwardNoop,
    /// The current head was behind and now points at the other head.
    FastForwardOther { head: CommitId },
    Merged { commit: Commit },
    /// Nothing was committed; these paths hold conflict blocks in the work tree.
    ConflictAborted { conflicts: Vec<String> },
}

/// Paths added, modified or deleted going from `base` to `side`.
pub fn changes(base: &Tracked, side: &Tracked) -> BTreeMap<String, Change> {
    let mut changes = BTreeMap::new();
    for (path, &id) in side {
        match base.get(path) {
            None => {
                changes.insert(path.clone(), Change::Added(id));
            }
            Some(&old) if old != id => {
                changes.insert(path.clone(), Change::Modified(id));
            }
            Some(_) => {}
        }
    }
    for path in base.keys() {
        if !side.contains_key(path) {
            changes.insert(path.clone(), Change::Deleted);
        }
    }
    changes
}

/// Decides a single path from its base content and the change on each side.
pub fn resolve(
    base: Option<ObjectId>,
    current: Option<Change>,
    other: Option<Change>,
) -> Resolution {
    use Change::*;
    use Resolution::*;
    match (current, other) {
        (None, None) => base.map_or(Drop, Take),
        (None, Some(Modified(o) | Added(o))) => Take(o),
        (Some(Modified(c) | Added(c)), None) => Take(c),
        (Some(Modified(c)), Some(Modified(o))) | (Some(Added(c)), Some(Added(o))) => {
            if c == o {
                Take(c)
            } else {
                Conflict {
                    current: Some(c),
                    other: Some(o),
                }
            }
        }
        (None, Some(Deleted)) | (Some(Deleted), None) | (Some(Deleted), Some(Deleted)) => Drop,
        (Some(Modified(c)), Some(Deleted)) => Conflict {
            current: Some(c),
            other: None,
        },
        (Some(Deleted), Some(Modified(o))) => Conflict {
            current: None,
            other: Some(o),
        },
        // Added means absent from the base; Modified and Deleted mean present.
        (Some(Added(_)), Some(Modified(_) | Deleted))
        | (Some(Modified(_) | Deleted), Some(Added(_))) => {
            unreachable!("sides disagree on whether the path exists in the base")
        }
    }
}

/// Resolutions for every path tracked by `base`, `current` or `other`.
pub fn plan(base: &Tracked, current: &Tracked, other: &Tracked) -> BTreeMap<String, Resolution> {
    let ours = changes(base, current);
    let theirs = changes(base, other);
    let paths: BTreeSet<&String> = base.keys().chain(current.keys()).chain(other.keys()).collect();
    paths
        .into_iter()
        .map(|path| {
            let resolution = resolve(
                base.get(path).copied(),
                ours.get(path).copied(),
                theirs.get(path).copied(),
            );
            (path.clone(), resolution)
        })
        .collect()
}

/// The text written in place of a conflicted file.
pub fn conflict_block(current: &[u8], other: &[u8]) -> Vec<u8> {
    fn section(out: &mut Vec<u8>, content: &[u8]) {
        out.extend_from_slice(content);
        if !content.is_empty() && !content.ends_with(b"\n") {
            out.push(b'\n');
        }
    }

    let mut out = Vec::with_capacity(current.len() + other.len() + 32);
    out.extend_from_slice(CONFLICT_HEAD.as_bytes());
    out.push(b'\n');
    section(&mut out, current);
    out.extend_from_slice(CONFLICT_SEPARATOR.as_bytes());
    out.push(b'\n');
    section(&mut out, other);
    out.extend_from_slice(CONFLICT_END.as_bytes());
    out.push(b'\n');
    out
}

/// Merges `other` into `current`.
///
/// The caller has already ruled out self merges and uncommitted changes.
pub fn merge_branches<S, W>(
    graph: &mut CommitGraph<S>,
    current: &mut Branch,
    other: &Branch,
    workspace: &mut W,
) -> Result<MergeOutcome>
where
    S: ObjectStore,
    Error: From<S::Error>,
    W: Workspace,
{
    let base = graph.common_ancestor(current.head(), other.head())?;
    if base == other.head() {
        log::info!("{} is already merged into {}", other.name(), current.name());
        return Ok(MergeOutcome::FastForwardNoop);
    }

    let head = graph.get(current.head())?;
    let theirs = graph.get(other.head())?;
    if base == current.head() {
        log::info!("fast-forwarding {} to {}", current.name(), other.name());
        current.advance(&theirs);
        Transition {
            previous: head.into_tracked(),
            current: theirs.tracked().clone(),
        }
        .materialize(graph.store(), workspace)?;
        return Ok(MergeOutcome::FastForwardOther { head: theirs.id() });
    }

    let base = graph.get(base)?;
    let resolutions = plan(base.tracked(), head.tracked(), theirs.tracked());

    let read = |id: Option<ObjectId>| id.map_or(Ok(Vec::new()), |id| graph.store().get(id));
    let mut blocks = Vec::new();
    for (path, resolution) in &resolutions {
        if let Resolution::Conflict { current, other } = *resolution {
            let block = conflict_block(&read(current)?, &read(other)?);
            blocks.push((path.clone(), block));
        }
    }
    if !blocks.is_empty() {
        for (path, block) in &blocks {
            workspace.write(path, block)?;
        }
        let conflicts: Vec<String> = blocks.into_iter().map(|(path, _)| path).collect();
        log::info!(
            "merging {} into {} hit {} conflict(s)",
            other.name(),
            current.name(),
            conflicts.len()
        );
        return Ok(MergeOutcome::ConflictAborted { conflicts });
    }

    let tracked: Tracked = resolutions
        .into_iter()
        .filter_map(|(path, resolution)| match resolution {
            Resolution::Take(id) => Some((path, id)),
            _ => None,
        })
        .collect();
    let message = format!("Merged {} into {}", other.name(), current.name());
    let commit = graph.seal(Some(current.head()), &message, tracked)?;
    current.advance(&commit);
    Transition {
        previous: head.into_tracked(),
        current: commit.tracked().clone(),
    }
    .materialize(graph.store(), workspace)?;
    Ok(MergeOutcome::Merged { commit })
}

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::{
    branch::{self, Branch},
    commit::{Commit, Tracked},
    commit_graph::CommitGraph,
    error::{Error, Result},
    merge::{self, MergeOutcome},
    object_id::{CommitId, ObjectId},
    object_store::ObjectStore,
    workspace::{Transition, Workspace},
};

/// The branch a fresh repository starts on.
pub const DEFAULT_BRANCH: &str = "main";

/// The branches of one repository, which of them is checked out, and the
/// commit graph they point into.
///
/// `current` always names an entry of `branches`.
#[derive(Debug, Clone)]
pub struct Repository<S> {
    graph: CommitGraph<S>,
    branches: BTreeMap<String, Branch>,
    current: String,
}

/// Snapshot of the staging state, see [`Repository::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub current: String,
    pub branches: Vec<String>,
    /// Added or changed relative to the head commit.
    pub staged: Vec<String>,
    /// Tracked by the head commit but no longer staged.
    pub removed: Vec<String>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Branches ===")?;
        for branch in &self.branches {
            let marker = if *branch == self.current { "*" } else { "" };
            writeln!(f, "{}{}", marker, branch)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Staged Files ===")?;
        for path in &self.staged {
            writeln!(f, "{}", path)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Removed Files ===")?;
        for path in &self.removed {
            writeln!(f, "{}", path)?;
        }
        Ok(())
    }
}

impl<S> Repository<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    /// Creates the root commit and a [`DEFAULT_BRANCH`] pointing at it.
    pub fn init(store: S) -> Result<Self> {
        let root_id = CommitGraph::<S>::root_id()?;
        if store.has(root_id)? {
            return Err(Error::AlreadyInitialized(format!("store holding {}", root_id)));
        }
        let mut graph = CommitGraph::new(store);
        let root = graph.seal_root()?;
        let main = Branch::new(DEFAULT_BRANCH, &root);
        log::info!("initialized repository at root {}", root.id());
        Ok(Self {
            graph,
            branches: [(DEFAULT_BRANCH.to_owned(), main)].into_iter().collect(),
            current: DEFAULT_BRANCH.to_owned(),
        })
    }

    /// Reassembles a repository from persisted parts.
    pub fn from_parts(
        graph: CommitGraph<S>,
        branches: impl IntoIterator<Item = Branch>,
        current: String,
    ) -> Result<Self> {
        let branches: BTreeMap<String, Branch> = branches
            .into_iter()
            .map(|b| (b.name().to_owned(), b))
            .collect();
        if !branches.contains_key(&current) {
            return Err(Error::BranchNotFound(current));
        }
        for branch in branches.values() {
            if !graph.contains(branch.head()) {
                return Err(Error::MissingObject(branch.head()));
            }
        }
        Ok(Self {
            graph,
            branches,
            current,
        })
    }

    pub fn graph(&self) -> &CommitGraph<S> {
        &self.graph
    }

    pub fn store(&self) -> &S {
        self.graph.store()
    }

    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values()
    }

    pub fn branch(&self, name: &str) -> Result<&Branch> {
        self.branches
            .get(name)
            .ok_or_else(|| Error::BranchNotFound(name.to_owned()))
    }

    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn current_branch(&self) -> &Branch {
        &self.branches[&self.current]
    }

    /// The graph and the checked out branch, borrowed together.
    fn current_parts(&mut self) -> Result<(&mut CommitGraph<S>, &mut Branch)> {
        let branch = self
            .branches
            .get_mut(&self.current)
            .ok_or_else(|| Error::BranchNotFound(self.current.clone()))?;
        Ok((&mut self.graph, branch))
    }

    pub fn head(&self) -> Result<Commit> {
        self.graph.get(self.current_branch().head())
    }

    pub fn stage(&mut self, path: &str, bytes: &[u8]) -> Result<ObjectId> {
        let (graph, branch) = self.current_parts()?;
        branch.stage(graph.store_mut(), path, bytes)
    }

    pub fn unstage(&mut self, path: &str) -> Result<ObjectId> {
        let (_, branch) = self.current_parts()?;
        branch.unstage(path)
    }

    /// Seals the current branch's staging set.
    pub fn commit(&mut self, message: &str) -> Result<Commit> {
        if message.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let head = self.head()?;
        if !self.current_branch().has_changes(&head) {
            return Err(Error::NothingToCommit);
        }
        let (graph, branch) = self.current_parts()?;
        branch.seal(graph, message)
    }

    /// Starts a branch at the current head.
    pub fn add_branch(&mut self, name: &str) -> Result<&Branch> {
        branch::validate_name(name)?;
        if self.branches.contains_key(name) {
            return Err(Error::DuplicateBranch(name.to_owned()));
        }
        let head = self.head()?;
        log::info!("creating branch {} at {}", name, head.id().short());
        Ok(self
            .branches
            .entry(name.to_owned())
            .or_insert(Branch::new(name, &head)))
    }

    pub fn remove_branch(&mut self, name: &str) -> Result<Branch> {
        if !self.branches.contains_key(name) {
            return Err(Error::BranchNotFound(name.to_owned()));
        }
        if name == self.current {
            return Err(Error::CannotRemoveCurrent(name.to_owned()));
        }
        log::info!("removing branch {}", name);
        self.branches
            .remove(name)
            .ok_or_else(|| Error::BranchNotFound(name.to_owned()))
    }

    /// Switches to `name`. The returned [`Transition`] carries the files the
    /// work tree should now hold.
    pub fn checkout_branch(&mut self, name: &str) -> Result<Transition> {
        let target = self.branch(name)?.current_files(&self.graph)?;
        let previous = self.current_branch().current_files(&self.graph)?;
        log::info!("checking out {}", name);
        self.current = name.to_owned();
        Ok(Transition {
            previous,
            current: target,
        })
    }

    /// Contents of `path` in the given commit, or in the current head when
    /// no commit is given.
    pub fn checkout_file(&self, path: &str, commit: Option<&str>) -> Result<Vec<u8>> {
        let commit = match commit {
            Some(prefix) => self.graph.get(self.graph.resolve(prefix)?)?,
            None => self.head()?,
        };
        let blob = commit.blob(path).ok_or_else(|| Error::FileNotFoundInCommit {
            path: path.to_owned(),
            commit: commit.id(),
        })?;
        self.graph.store().get(blob.content)
    }

    /// Ids of commits reachable from any branch whose message is `message`.
    pub fn find_by_message(&self, message: &str) -> Result<Vec<CommitId>> {
        let mut seen = BTreeSet::new();
        let mut found = Vec::new();
        for branch in self.branches.values() {
            for commit in self.graph.ancestors(branch.head()) {
                let commit = commit?;
                if !seen.insert(commit.id()) {
                    // The rest of this chain was walked from another branch.
                    break;
                }
                if commit.message() == message {
                    found.push(commit.id());
                }
            }
        }
        if found.is_empty() {
            return Err(Error::NoCommitFound(message.to_owned()));
        }
        Ok(found)
    }

    /// History of the current branch, newest first.
    pub fn log(&self) -> Result<Vec<Commit>> {
        self.graph
            .ancestors(self.current_branch().head())
            .collect()
    }

    /// Every commit ever made, newest first.
    pub fn global_log(&self) -> Result<Vec<Commit>> {
        self.graph.all()
    }

    /// Moves the current branch to `commit` and discards its staged changes.
    pub fn reset(&mut self, commit: &str) -> Result<Transition> {
        let target = self.graph.get(self.graph.resolve(commit)?)?;
        let previous = self.head()?.into_tracked();
        let (_, branch) = self.current_parts()?;
        branch.advance(&target);
        Ok(Transition {
            previous,
            current: target.into_tracked(),
        })
    }

    pub fn status(&self) -> Result<Status> {
        let head = self.head()?;
        let staging = self.current_branch().staging();
        let staged = staging
            .iter()
            .filter(|(path, id)| head.tracked().get(*path) != Some(*id))
            .map(|(path, _)| path.clone())
            .collect();
        let removed = head
            .tracked()
            .keys()
            .filter(|path| !staging.contains_key(*path))
            .cloned()
            .collect();
        Ok(Status {
            current: self.current.clone(),
            branches: self.branches.keys().cloned().collect(),
            staged,
            removed,
        })
    }

    /// Merges branch `other` into the current branch, writing conflict
    /// blocks or the merged files through `workspace`.
    pub fn merge<W: Workspace>(&mut self, other: &str, workspace: &mut W) -> Result<MergeOutcome> {
        let theirs = self.branch(other)?.clone();
        if other == self.current {
            return Err(Error::SelfMerge(other.to_owned()));
        }
        let head = self.head()?;
        if self.current_branch().has_changes(&head) {
            return Err(Error::UncommittedChanges);
        }
        let (graph, ours) = self.current_parts()?;
        merge::merge_branches(graph, ours, &theirs, workspace)
    }

    pub fn tracked_by_head(&self, path: &str) -> Result<bool> {
        Ok(self.head()?.tracked().contains_key(path))
    }

    pub fn current_files(&self) -> Result<Tracked> {
        self.current_branch().current_files(&self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commit::INITIAL_MESSAGE,
        merge::CONFLICT_SEPARATOR,
        object_store::in_memory::InMemoryObjectStore,
        workspace::InMemoryWorkspace,
    };
    use pretty_assertions::assert_eq;

    fn repo() -> Repository<InMemoryObjectStore> {
        Repository::init(InMemoryObjectStore::new()).unwrap()
    }

    fn commit_file(
        repo: &mut Repository<InMemoryObjectStore>,
        path: &str,
        content: &str,
    ) -> Commit {
        repo.stage(path, content.as_bytes()).unwrap();
        repo.commit(&format!("write {}", path)).unwrap()
    }

    fn hash(content: &str) -> ObjectId {
        content.as_bytes().into()
    }

    #[test]
    fn init_creates_root_on_main() {
        let repo = repo();
        let head = repo.head().unwrap();
        assert_eq!(head.message(), INITIAL_MESSAGE);
        assert!(head.is_root());
        assert!(head.tracked().is_empty());
        assert_eq!(repo.current_name(), DEFAULT_BRANCH);
        assert_eq!(repo.branches().count(), 1);
    }

    #[test]
    fn init_twice_on_one_store() {
        let repo = repo();
        let store = repo.store().clone();
        assert!(matches!(
            Repository::init(store),
            Err(Error::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn stage_and_commit() {
        let mut repo = repo();
        let root = repo.head().unwrap().id();
        repo.stage("a.txt", b"hello").unwrap();
        let commit = repo.commit("add a").unwrap();
        assert_eq!(commit.parent(), Some(root));
        let expected: Tracked = [("a.txt".to_owned(), hash("hello"))].into_iter().collect();
        assert_eq!(commit.tracked(), &expected);
        assert_eq!(repo.current_files().unwrap(), expected);
    }

    #[test]
    fn escaping_paths_never_reach_a_commit() {
        let mut repo = repo();
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        repo.stage("a.txt", b"a").unwrap();
        assert!(matches!(
            repo.stage("z/../../escape", b"out"),
            Err(Error::InvalidPath(_))
        ));
        let commit = repo.commit("only a").unwrap();
        assert_eq!(commit.tracked().keys().collect::<Vec<_>>(), vec!["a.txt"]);

        let mut workspace = InMemoryWorkspace::new();
        repo.checkout_branch(DEFAULT_BRANCH).unwrap();
        let transition = repo.checkout_branch("feat").unwrap();
        transition.materialize(repo.store(), &mut workspace).unwrap();
        assert_eq!(workspace.files.len(), 1);
    }

    #[test]
    fn commit_preconditions() {
        let mut repo = repo();
        assert!(matches!(repo.commit("nothing"), Err(Error::NothingToCommit)));
        repo.stage("a.txt", b"a").unwrap();
        assert!(matches!(repo.commit(""), Err(Error::EmptyMessage)));
        // Restaging identical content is not a change.
        repo.commit("a").unwrap();
        repo.stage("a.txt", b"a").unwrap();
        assert!(matches!(repo.commit("again"), Err(Error::NothingToCommit)));
    }

    #[test]
    fn unstage_and_status() {
        let mut repo = repo();
        commit_file(&mut repo, "a.txt", "a");
        repo.stage("b.txt", b"b").unwrap();
        repo.unstage("a.txt").unwrap();
        assert!(matches!(
            repo.unstage("missing.txt"),
            Err(Error::NothingToRemove(_))
        ));
        repo.add_branch("feat").unwrap();

        let status = repo.status().unwrap();
        assert_eq!(status.branches, vec!["feat".to_owned(), "main".to_owned()]);
        assert_eq!(status.staged, vec!["b.txt".to_owned()]);
        assert_eq!(status.removed, vec!["a.txt".to_owned()]);
        let text = status.to_string();
        assert!(text.contains("*main\n"));
        assert!(text.contains("\nfeat\n"));

        let commit = repo.commit("swap").unwrap();
        assert!(!commit.tracked().contains_key("a.txt"));
        assert!(commit.tracked().contains_key("b.txt"));
    }

    #[test]
    fn branch_management() {
        let mut repo = repo();
        commit_file(&mut repo, "a.txt", "a");
        let head = repo.head().unwrap();
        let feat = repo.add_branch("feat").unwrap();
        assert_eq!(feat.head(), head.id());
        assert_eq!(feat.staging(), head.tracked());

        assert!(matches!(
            repo.add_branch("feat"),
            Err(Error::DuplicateBranch(_))
        ));
        assert!(matches!(
            repo.add_branch("bad/name"),
            Err(Error::InvalidBranchName(_))
        ));
        assert!(matches!(
            repo.remove_branch("nope"),
            Err(Error::BranchNotFound(_))
        ));
        assert!(matches!(
            repo.checkout_branch("nope"),
            Err(Error::BranchNotFound(_))
        ));
        repo.remove_branch("feat").unwrap();
        assert!(repo.branch("feat").is_err());
    }

    #[test]
    fn removing_current_branch_is_refused() {
        let mut repo = repo();
        repo.add_branch("feat").unwrap();
        assert!(matches!(
            repo.remove_branch("main"),
            Err(Error::CannotRemoveCurrent(name)) if name == "main"
        ));
        assert_eq!(repo.current_name(), "main");
        assert_eq!(repo.branches().count(), 2);
    }

    #[test]
    fn checkout_branch_and_files() {
        let mut repo = repo();
        let first = commit_file(&mut repo, "a.txt", "one");
        repo.add_branch("feat").unwrap();
        commit_file(&mut repo, "a.txt", "two");
        commit_file(&mut repo, "b.txt", "b");

        let transition = repo.checkout_branch("feat").unwrap();
        assert_eq!(repo.current_name(), "feat");
        assert_eq!(transition.current, first.tracked().clone());
        assert!(transition.previous.contains_key("b.txt"));

        assert_eq!(repo.checkout_file("a.txt", None).unwrap(), b"one");
        let main_head = repo.branch("main").unwrap().head().to_string();
        assert_eq!(
            repo.checkout_file("a.txt", Some(&main_head[..8])).unwrap(),
            b"two"
        );
        assert!(matches!(
            repo.checkout_file("b.txt", None),
            Err(Error::FileNotFoundInCommit { .. })
        ));
        assert!(matches!(
            repo.checkout_file("a.txt", Some("ffffffffffff")),
            Err(Error::CommitNotFound(_)) | Err(Error::AmbiguousCommit(_))
        ));
    }

    #[test]
    fn staging_is_kept_per_branch() {
        let mut repo = repo();
        repo.add_branch("feat").unwrap();
        repo.stage("wip.txt", b"wip").unwrap();
        repo.checkout_branch("feat").unwrap();
        assert!(repo.current_branch().staging().is_empty());
        repo.checkout_branch("main").unwrap();
        assert!(repo.current_branch().staging().contains_key("wip.txt"));
    }

    #[test]
    fn find_dedups_shared_history() {
        let mut repo = repo();
        let shared = commit_file(&mut repo, "a.txt", "a");
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        repo.stage("a.txt", b"a2").unwrap();
        let on_feat = repo.commit("write a.txt").unwrap();

        let found = repo.find_by_message("write a.txt").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&shared.id()));
        assert!(found.contains(&on_feat.id()));

        let roots = repo.find_by_message(INITIAL_MESSAGE).unwrap();
        assert_eq!(roots.len(), 1);

        assert!(matches!(
            repo.find_by_message("no such message"),
            Err(Error::NoCommitFound(_))
        ));

        repo.checkout_branch("main").unwrap();
        repo.remove_branch("feat").unwrap();
        assert_eq!(repo.find_by_message("write a.txt").unwrap(), vec![shared.id()]);
        // Still listed by the global log.
        assert!(repo
            .global_log()
            .unwrap()
            .iter()
            .any(|c| c.id() == on_feat.id()));
    }

    #[test]
    fn log_and_reset() {
        let mut repo = repo();
        let a = commit_file(&mut repo, "a.txt", "a");
        let b = commit_file(&mut repo, "b.txt", "b");
        let log: Vec<CommitId> = repo.log().unwrap().iter().map(|c| c.id()).collect();
        assert_eq!(log.len(), 3);
        assert_eq!(&log[..2], &[b.id(), a.id()]);
        for id in &log {
            assert!(repo.graph().is_ancestor(log[2], *id).unwrap());
        }

        repo.stage("c.txt", b"c").unwrap();
        let transition = repo.reset(&a.id().to_string()).unwrap();
        assert_eq!(repo.head().unwrap().id(), a.id());
        assert_eq!(repo.current_branch().staging(), a.tracked());
        assert!(transition.previous.contains_key("b.txt"));
        assert!(!transition.current.contains_key("b.txt"));
    }

    #[test]
    fn merge_combines_divergent_work() {
        let mut repo = repo();
        let mut workspace = InMemoryWorkspace::new();
        commit_file(&mut repo, "a.txt", "hello");
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        commit_file(&mut repo, "a.txt", "world");
        repo.checkout_branch("main").unwrap();
        commit_file(&mut repo, "b.txt", "b");
        let main_head = repo.head().unwrap().id();

        let outcome = repo.merge("feat", &mut workspace).unwrap();
        let commit = match outcome {
            MergeOutcome::Merged { commit } => commit,
            other => panic!("expected a merge commit, got {:?}", other),
        };
        assert_eq!(commit.message(), "Merged feat into main");
        assert_eq!(commit.parent(), Some(main_head));
        let expected: Tracked = [
            ("a.txt".to_owned(), hash("world")),
            ("b.txt".to_owned(), hash("b")),
        ]
        .into_iter()
        .collect();
        assert_eq!(commit.tracked(), &expected);
        assert_eq!(repo.head().unwrap(), commit);
        assert_eq!(workspace.read("a.txt").unwrap(), Some(b"world".to_vec()));
    }

    #[test]
    fn merge_conflict_aborts() {
        let mut repo = repo();
        let mut workspace = InMemoryWorkspace::new();
        commit_file(&mut repo, "a.txt", "base\n");
        commit_file(&mut repo, "keep.txt", "keep\n");
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        commit_file(&mut repo, "a.txt", "feat\n");
        commit_file(&mut repo, "clean.txt", "clean\n");
        repo.checkout_branch("main").unwrap();
        let head = commit_file(&mut repo, "a.txt", "main\n");

        let outcome = repo.merge("feat", &mut workspace).unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::ConflictAborted {
                conflicts: vec!["a.txt".to_owned()]
            }
        );
        assert_eq!(repo.head().unwrap().id(), head.id());
        let written = String::from_utf8(workspace.read("a.txt").unwrap().unwrap()).unwrap();
        assert_eq!(written, "<<<<<<< HEAD\nmain\n=======\nfeat\n>>>>>>>\n");
        assert_eq!(written.matches(CONFLICT_SEPARATOR).count(), 1);
        // Non-conflicting paths are not applied by an aborted merge.
        assert_eq!(workspace.read("clean.txt").unwrap(), None);
    }

    #[test]
    fn merge_delete_against_modify_conflicts() {
        let mut repo = repo();
        let mut workspace = InMemoryWorkspace::new();
        commit_file(&mut repo, "a.txt", "base\n");
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        repo.unstage("a.txt").unwrap();
        repo.stage("other.txt", b"x").unwrap();
        repo.commit("drop a").unwrap();
        repo.checkout_branch("main").unwrap();
        commit_file(&mut repo, "a.txt", "changed\n");

        let outcome = repo.merge("feat", &mut workspace).unwrap();
        assert!(matches!(outcome, MergeOutcome::ConflictAborted { .. }));
        assert_eq!(
            workspace.read("a.txt").unwrap().unwrap(),
            b"<<<<<<< HEAD\nchanged\n=======\n>>>>>>>\n"
        );
    }

    #[test]
    fn merge_deletion_applies_cleanly() {
        let mut repo = repo();
        let mut workspace = InMemoryWorkspace::new();
        commit_file(&mut repo, "a.txt", "a");
        commit_file(&mut repo, "b.txt", "b");
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        repo.unstage("a.txt").unwrap();
        repo.commit("drop a").unwrap();
        repo.checkout_branch("main").unwrap();
        repo.unstage("b.txt").unwrap();
        repo.commit("drop b").unwrap();

        match repo.merge("feat", &mut workspace).unwrap() {
            MergeOutcome::Merged { commit } => assert!(commit.tracked().is_empty()),
            other => panic!("expected a merge commit, got {:?}", other),
        }
    }

    #[test]
    fn merge_fast_forwards() {
        let mut repo = repo();
        let mut workspace = InMemoryWorkspace::new();
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        let ahead = commit_file(&mut repo, "a.txt", "a");
        repo.checkout_branch("main").unwrap();
        let commits_before = repo.graph().index().len();

        let outcome = repo.merge("feat", &mut workspace).unwrap();
        assert_eq!(outcome, MergeOutcome::FastForwardOther { head: ahead.id() });
        assert_eq!(repo.current_branch().head(), ahead.id());
        assert_eq!(repo.current_branch().staging(), ahead.tracked());
        assert_eq!(repo.graph().index().len(), commits_before);
        assert_eq!(workspace.read("a.txt").unwrap(), Some(b"a".to_vec()));

        // Now main already contains feat.
        commit_file(&mut repo, "b.txt", "b");
        let head = repo.head().unwrap().id();
        assert_eq!(
            repo.merge("feat", &mut workspace).unwrap(),
            MergeOutcome::FastForwardNoop
        );
        assert_eq!(repo.head().unwrap().id(), head);
    }

    #[test]
    fn merge_guards() {
        let mut repo = repo();
        let mut workspace = InMemoryWorkspace::new();
        assert!(matches!(
            repo.merge("main", &mut workspace),
            Err(Error::SelfMerge(_))
        ));
        assert!(matches!(
            repo.merge("nope", &mut workspace),
            Err(Error::BranchNotFound(_))
        ));
        repo.add_branch("feat").unwrap();
        repo.stage("dirty.txt", b"d").unwrap();
        assert!(matches!(
            repo.merge("feat", &mut workspace),
            Err(Error::UncommittedChanges)
        ));
    }

    #[test]
    fn remerging_compares_against_the_first_split() {
        let mut repo = repo();
        let mut workspace = InMemoryWorkspace::new();
        commit_file(&mut repo, "a.txt", "a");
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        commit_file(&mut repo, "f.txt", "f1");
        repo.checkout_branch("main").unwrap();
        commit_file(&mut repo, "m.txt", "m");
        assert!(matches!(
            repo.merge("feat", &mut workspace).unwrap(),
            MergeOutcome::Merged { .. }
        ));

        // Merge commits keep a single parent, so the next merge still sees
        // f.txt as added differently on both sides.
        repo.checkout_branch("feat").unwrap();
        commit_file(&mut repo, "f.txt", "f2");
        repo.checkout_branch("main").unwrap();
        assert_eq!(
            repo.merge("feat", &mut workspace).unwrap(),
            MergeOutcome::ConflictAborted {
                conflicts: vec!["f.txt".to_owned()]
            }
        );
    }
}

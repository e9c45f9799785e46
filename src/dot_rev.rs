use std::{
    collections::BTreeSet,
    fs::{create_dir, create_dir_all, read_dir, read_to_string, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{
    branch::Branch,
    commit_graph::CommitGraph,
    error::{Error, Result},
    object_id::CommitId,
    object_store::directory::DirectoryObjectStore,
    repository::Repository,
    workspace::{DirectoryWorkspace, Ignores},
};

/// A wrapper for the path of the .rev directory which has a number of utilities defined on it.
///
/// ```text
/// .rev/
///   branch        name of the checked out branch
///   branches/     one JSON branch record per branch
///   commits       JSON list of every sealed commit id
///   ignores       top level names the work tree leaves alone
///   store/        the object store
/// ```
pub struct DotRev {
    root: PathBuf,
}

impl DotRev {
    pub const DIR: &'static str = ".rev";

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// The directory holding `.rev`.
    pub fn work_tree(&self) -> &Path {
        self.root.parent().unwrap_or(&self.root)
    }

    /// Creates `.rev` inside `work_tree` with a fresh repository on the default branch.
    pub fn init(work_tree: &Path) -> Result<(Self, Repository<DirectoryObjectStore>)> {
        let root = work_tree.join(Self::DIR);
        if root.try_exists()? {
            return Err(Error::AlreadyInitialized(work_tree.display().to_string()));
        }
        create_dir_all(&root)?;
        create_dir(root.join("branches"))?;
        let dot_rev = DotRev { root };

        let store = DirectoryObjectStore::new(dot_rev.root.join("store"))?;
        let repository = Repository::init(store)?;
        write_json(&Ignores::default(), &dot_rev.root.join("ignores"))?;
        dot_rev.flush(&repository)?;
        log::info!("initialized {:?}", dot_rev.root);
        Ok((dot_rev, repository))
    }

    pub fn existing(work_tree: &Path) -> Result<Self> {
        let root = work_tree.join(Self::DIR);
        if read_dir(&root).is_err() {
            return Err(Error::NotInitialized(work_tree.display().to_string()));
        }
        Ok(DotRev { root })
    }

    pub fn branch(&self) -> Result<String> {
        Ok(read_to_string(self.root.join("branch"))?.trim().to_owned())
    }

    pub fn store(&self) -> Result<DirectoryObjectStore> {
        Ok(DirectoryObjectStore::new(self.root.join("store"))?)
    }

    pub fn ignores(&self) -> Result<Ignores> {
        read_json(&self.root.join("ignores"))
    }

    pub fn workspace(&self) -> Result<DirectoryWorkspace> {
        Ok(DirectoryWorkspace::new(
            self.work_tree().to_path_buf(),
            self.ignores()?,
        ))
    }

    /// Reads the whole repository state.
    pub fn load(&self) -> Result<Repository<DirectoryObjectStore>> {
        let index: BTreeSet<CommitId> = read_json(&self.root.join("commits"))?;
        let graph = CommitGraph::with_index(self.store()?, index);
        let mut branches = Vec::new();
        for entry in read_dir(self.root.join("branches"))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let branch: Branch = read_json(&entry.path())?;
                branches.push(branch);
            }
        }
        log::debug!("loaded {} branches from {:?}", branches.len(), self.root);
        Repository::from_parts(graph, branches, self.branch()?)
    }

    /// Writes the refs, the current branch and the commit index back out.
    /// Objects were already written when they were created.
    pub fn flush(&self, repository: &Repository<DirectoryObjectStore>) -> Result<()> {
        write_json(repository.graph().index(), &self.root.join("commits"))?;

        let branches_dir = self.root.join("branches");
        for branch in repository.branches() {
            write_json(branch, &branches_dir.join(branch.name()))?;
        }
        for entry in read_dir(&branches_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let known = name
                .to_str()
                .map_or(false, |name| repository.branch(name).is_ok());
            if !known {
                log::info!("dropping ref {:?}", name);
                std::fs::remove_file(entry.path())?;
            }
        }

        write_atomically(
            &self.root.join("branch"),
            repository.current_name().as_bytes(),
        )?;
        log::debug!("flushed {:?}", self.root);
        Ok(())
    }
}

fn read_json<A: for<'de> Deserialize<'de>>(path: &Path) -> Result<A> {
    Ok(serde_json::from_reader(BufReader::new(
        File::options().read(true).open(path)?,
    ))?)
}

fn write_json<A: Serialize + ?Sized>(thing: &A, path: &Path) -> Result<()> {
    write_atomically(path, &serde_json::to_vec_pretty(thing)?)
}

/// Replaces `path` in one rename so readers never see a half written file.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{merge::MergeOutcome, workspace::Workspace};

    #[test]
    fn init_load_and_flush() {
        let tempdir = tempfile::tempdir().unwrap();
        let (dot_rev, mut repo) = DotRev::init(tempdir.path()).unwrap();
        assert!(matches!(
            DotRev::init(tempdir.path()),
            Err(Error::AlreadyInitialized(_))
        ));
        assert_eq!(dot_rev.branch().unwrap(), "main");

        let mut workspace = dot_rev.workspace().unwrap();
        workspace.write("a.txt", b"hello").unwrap();
        let bytes = workspace.read("a.txt").unwrap().unwrap();
        repo.stage("a.txt", &bytes).unwrap();
        let commit = repo.commit("add a").unwrap();
        repo.add_branch("feat").unwrap();
        repo.checkout_branch("feat").unwrap();
        dot_rev.flush(&repo).unwrap();

        let dot_rev = DotRev::existing(tempdir.path()).unwrap();
        let loaded = dot_rev.load().unwrap();
        assert_eq!(loaded.current_name(), "feat");
        assert_eq!(loaded.head().unwrap(), commit);
        assert_eq!(loaded.branches().count(), 2);
        assert_eq!(loaded.graph().index(), repo.graph().index());
        assert_eq!(loaded.checkout_file("a.txt", None).unwrap(), b"hello");
    }

    #[test]
    fn removed_branches_are_dropped_from_refs() {
        let tempdir = tempfile::tempdir().unwrap();
        let (dot_rev, mut repo) = DotRev::init(tempdir.path()).unwrap();
        repo.add_branch("feat").unwrap();
        dot_rev.flush(&repo).unwrap();
        assert!(dot_rev.root().join("branches").join("feat").exists());

        repo.remove_branch("feat").unwrap();
        dot_rev.flush(&repo).unwrap();
        assert!(!dot_rev.root().join("branches").join("feat").exists());
        assert_eq!(dot_rev.load().unwrap().branches().count(), 1);
    }

    #[test]
    fn conflicts_land_in_the_work_tree() {
        let tempdir = tempfile::tempdir().unwrap();
        let (dot_rev, mut repo) = DotRev::init(tempdir.path()).unwrap();
        let mut workspace = dot_rev.workspace().unwrap();
        repo.stage("a.txt", b"base\n").unwrap();
        repo.commit("base").unwrap();
        repo.add_branch("feat").unwrap();
        repo.stage("a.txt", b"main\n").unwrap();
        repo.commit("main edit").unwrap();
        repo.checkout_branch("feat").unwrap();
        repo.stage("a.txt", b"feat\n").unwrap();
        repo.commit("feat edit").unwrap();
        repo.checkout_branch("main").unwrap();

        let outcome = repo.merge("feat", &mut workspace).unwrap();
        assert!(matches!(outcome, MergeOutcome::ConflictAborted { .. }));
        let written = std::fs::read_to_string(tempdir.path().join("a.txt")).unwrap();
        assert_eq!(written, "<<<<<<< HEAD\nmain\n=======\nfeat\n>>>>>>>\n");
    }

    #[test]
    fn missing_repository() {
        let tempdir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DotRev::existing(tempdir.path()),
            Err(Error::NotInitialized(_))
        ));
    }
}

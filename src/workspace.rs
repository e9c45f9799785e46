use std::{
    collections::{BTreeMap, BTreeSet},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    commit::Tracked,
    error::{Error, Result},
    object_store::ObjectStore,
};

/// The working directory the repository reads snapshots from and writes
/// checked out files to. Paths are relative to the work tree root.
pub trait Workspace {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>>;

    fn write(&mut self, path: &str, contents: &[u8]) -> Result<()>;

    /// Removing a file which is already gone is not an error.
    fn remove(&mut self, path: &str) -> Result<()>;
}

/// Checks that `path` is a relative, `/` separated path of plain names, so
/// it names one file inside the work tree whatever the workspace.
pub fn validate_path(path: &str) -> Result<()> {
    let plain = path
        .split('/')
        .all(|name| !name.is_empty() && name != "." && name != ".." && !name.contains('\0'));
    if !plain {
        return Err(Error::InvalidPath(path.to_owned()));
    }
    Ok(())
}

/// Top level names the workspace never reads or writes.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Ignores {
    set: BTreeSet<String>,
}

impl Default for Ignores {
    fn default() -> Self {
        Self {
            set: [".rev".to_owned()].into_iter().collect(),
        }
    }
}

impl Ignores {
    pub fn contains(&self, name: &str) -> bool {
        self.set.contains(name)
    }
}

/// Files on disk under a work tree root.
#[derive(Debug, Clone)]
pub struct DirectoryWorkspace {
    root: PathBuf,
    ignores: Ignores,
}

impl DirectoryWorkspace {
    pub fn new(root: PathBuf, ignores: Ignores) -> Self {
        Self { root, ignores }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        validate_path(path)?;
        let relative = Path::new(path);
        let ignored = relative
            .components()
            .next()
            .and_then(|first| first.as_os_str().to_str())
            .map_or(false, |first| self.ignores.contains(first));
        if ignored {
            return Err(Error::InvalidPath(path.to_owned()));
        }
        Ok(self.root.join(relative))
    }
}

impl Workspace for DirectoryWorkspace {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.resolve(path)?;
        match std::fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        log::debug!("writing {:?}", full);
        std::fs::write(full, contents)?;
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        log::debug!("removing {:?}", full);
        match std::fs::remove_file(full) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// A work tree held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryWorkspace {
    pub files: BTreeMap<String, Vec<u8>>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Workspace for InMemoryWorkspace {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }

    fn write(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        self.files.insert(path.to_owned(), contents.to_vec());
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        self.files.remove(path);
        Ok(())
    }
}

/// A move from one set of tracked files to another, for the work tree to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub previous: Tracked,
    pub current: Tracked,
}

impl Transition {
    /// Writes every file of `current` and deletes the ones only `previous` tracked.
    ///
    /// Paths and contents are all checked before the work tree is touched.
    pub fn materialize<S, W>(&self, store: &S, workspace: &mut W) -> Result<()>
    where
        S: ObjectStore,
        Error: From<S::Error>,
        W: Workspace,
    {
        let removed: Vec<&String> = self
            .previous
            .keys()
            .filter(|path| !self.current.contains_key(*path))
            .collect();
        for path in self.current.keys().chain(removed.iter().copied()) {
            validate_path(path)?;
        }
        let writes = self
            .current
            .iter()
            .map(|(path, &id)| Ok((path, store.get(id)?)))
            .collect::<Result<Vec<_>>>()?;

        for (path, contents) in writes {
            workspace.write(path, &contents)?;
        }
        for path in removed {
            workspace.remove(path)?;
        }
        Ok(())
    }
}

#[test]
fn test_directory_workspace() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut workspace = DirectoryWorkspace::new(tempdir.path().into(), Ignores::default());
    workspace.write("nested/a.txt", b"a").unwrap();
    assert_eq!(workspace.read("nested/a.txt").unwrap(), Some(b"a".to_vec()));
    workspace.remove("nested/a.txt").unwrap();
    workspace.remove("nested/a.txt").unwrap();
    assert_eq!(workspace.read("nested/a.txt").unwrap(), None);

    for bad in ["../escape", "/etc/passwd", ".rev/branch", "a/../../b", ""] {
        assert!(
            matches!(workspace.read(bad), Err(Error::InvalidPath(_))),
            "{}",
            bad
        );
    }
}

#[test]
fn test_validate_path() {
    for good in ["a.txt", "nested/dir/b.txt", ".hidden"] {
        assert!(validate_path(good).is_ok(), "{}", good);
    }
    for bad in ["", "/abs", "../up", "z/../../escape", "./a", "dir/", "a/./b", "a//b"] {
        assert!(
            matches!(validate_path(bad), Err(Error::InvalidPath(_))),
            "{}",
            bad
        );
    }
}

#[test]
fn test_materialize_checks_every_path_first() {
    use crate::object_store::in_memory::InMemoryObjectStore;

    let mut store = InMemoryObjectStore::new();
    let a = store.insert(b"a").unwrap();
    let mut workspace = InMemoryWorkspace::new();
    let transition = Transition {
        previous: Tracked::new(),
        current: [("a.txt".to_owned(), a), ("z/../../escape".to_owned(), a)]
            .into_iter()
            .collect(),
    };
    assert!(matches!(
        transition.materialize(&store, &mut workspace),
        Err(Error::InvalidPath(path)) if path == "z/../../escape"
    ));
    assert!(workspace.files.is_empty());
}

#[test]
fn test_materialize() {
    use crate::object_store::in_memory::InMemoryObjectStore;

    let mut store = InMemoryObjectStore::new();
    let a = store.insert(b"a").unwrap();
    let b = store.insert(b"b").unwrap();
    let mut workspace = InMemoryWorkspace::new();
    workspace.write("old.txt", b"old").unwrap();
    workspace.write("untracked.txt", b"mine").unwrap();

    let transition = Transition {
        previous: [("old.txt".to_owned(), a)].into_iter().collect(),
        current: [("a.txt".to_owned(), a), ("b.txt".to_owned(), b)]
            .into_iter()
            .collect(),
    };
    transition.materialize(&store, &mut workspace).unwrap();
    assert_eq!(workspace.read("a.txt").unwrap(), Some(b"a".to_vec()));
    assert_eq!(workspace.read("b.txt").unwrap(), Some(b"b".to_vec()));
    assert_eq!(workspace.read("old.txt").unwrap(), None);
    assert_eq!(workspace.read("untracked.txt").unwrap(), Some(b"mine".to_vec()));
}

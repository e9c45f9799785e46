use std::{
    fs::{create_dir, create_dir_all},
    io::{self, ErrorKind, Write},
    path::PathBuf,
};

use tempfile::NamedTempFile;

use crate::object_id::ObjectId;

use super::ObjectStore;

/// A persistent [`ObjectStore`] stored in a directory,
/// using the first two hexadecimal characters of the [`ObjectId`]
/// to determine which directory to place the binary object in
/// and creating a file with the rest of the hexadecimal characters
/// as the file name.
///
/// Objects are written to a temporary file and renamed into place, and every
/// read is checked against its id.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        if !root.try_exists()? {
            log::info!("creating directory store root: {:?}", root);
            create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    fn object_path(&self, id: ObjectId) -> (PathBuf, PathBuf) {
        let s: String = id.to_string();
        let subdir_path = self.root.join(&s[0..2]);
        let path = subdir_path.join(&s[2..]);
        (subdir_path, path)
    }
}

impl ObjectStore for DirectoryObjectStore {
    type Error = std::io::Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error> {
        log::debug!("checking whether {} is contained in {:?}", id, self.root);
        let (_, path) = self.object_path(id);
        path.try_exists()
    }

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        log::debug!("reading {} from {:?}", id, self.root);
        let (_, path) = self.object_path(id);
        let bytes = match std::fs::read(&path) {
            Ok(v) => v,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        if ObjectId::from(&bytes) != id {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("{:?} does not hash to {}", path, id),
            ));
        }
        Ok(Some(bytes))
    }

    fn insert(&mut self, object: &[u8]) -> Result<ObjectId, Self::Error> {
        let id: ObjectId = object.into();
        log::debug!("inserting {} into {:?}", id, self.root);
        let (subdir_path, path) = self.object_path(id);
        match self.read(id) {
            Ok(Some(_)) => {
                log::debug!("{:?} already exists", path);
                return Ok(id);
            }
            Ok(None) => {}
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                log::warn!("replacing corrupt object {:?}", path);
            }
            Err(err) => return Err(err),
        }
        if !subdir_path.try_exists()? {
            log::debug!("creating subdir path {:?} in {:?}", subdir_path, self.root);
            create_dir(&subdir_path)?;
        }
        let mut file = NamedTempFile::new_in(&subdir_path)?;
        file.write_all(object)?;
        file.persist(&path).map_err(|err| err.error)?;
        Ok(id)
    }
}

#[test]
fn test_directory_object_store() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().join("store")).unwrap();
    let id = store.insert(b"hello, world").unwrap();
    let b: &[u8] = b"hello, world";
    assert!(store.has(b.into()).unwrap());
    assert_eq!(store.read(b.into()).unwrap(), Some(Vec::from(b)));
    assert_eq!(store.insert(b).unwrap(), id);

    let missing: ObjectId = (&b"missing"[..]).into();
    assert!(!store.has(missing).unwrap());
    assert_eq!(store.read(missing).unwrap(), None);

    let reopened = DirectoryObjectStore::new(tempdir.path().join("store")).unwrap();
    assert_eq!(reopened.read(id).unwrap(), Some(Vec::from(b)));
}

#[test]
fn test_truncated_object_is_detected_and_repaired() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().join("store")).unwrap();
    let object: &[u8] = b"hello, world";
    let id = ObjectId::from(object);
    let (subdir_path, path) = store.object_path(id);
    create_dir(&subdir_path).unwrap();
    std::fs::write(&path, b"hel").unwrap();

    let err = store.read(id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);

    assert_eq!(store.insert(object).unwrap(), id);
    assert_eq!(store.read(id).unwrap(), Some(object.to_vec()));
    let leftovers: Vec<_> = std::fs::read_dir(&subdir_path).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

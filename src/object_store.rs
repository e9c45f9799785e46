use serde::{Deserialize, Serialize};

use crate::{error::Error, object_id::ObjectId};

pub mod directory;
pub mod in_memory;

/// An append-only, content addressed store of immutable byte payloads.
///
/// Inserting the same bytes twice yields the same [`ObjectId`] and keeps a
/// single copy. Nothing is ever deleted.
pub trait ObjectStore {
    type Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error>;

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error>;

    fn insert(&mut self, object: &[u8]) -> Result<ObjectId, Self::Error>;

    /// Reads an object which is required to exist.
    fn get(&self, id: ObjectId) -> Result<Vec<u8>, Error>
    where
        Error: From<Self::Error>,
    {
        self.read(id)?.ok_or(Error::MissingObject(id))
    }
}

/// A convenience trait for writing and reading JSON from any [`ObjectStore`].
pub trait InsertJson {
    /// Inserts a JSON encoded version of the thing into the store.
    fn insert_json<A: Serialize>(&mut self, thing: &A) -> Result<ObjectId, Error>;

    /// Reads a JSON encoded thing of the given type from the store at that given [`ObjectId`].
    fn read_json<A: for<'de> Deserialize<'de>>(&self, object_id: ObjectId) -> Result<A, Error>;
}

impl<S> InsertJson for S
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    fn insert_json<A: Serialize>(&mut self, thing: &A) -> Result<ObjectId, Error> {
        Ok(self.insert(&serde_json::to_vec_pretty(thing)?)?)
    }

    fn read_json<A: for<'de> Deserialize<'de>>(&self, object_id: ObjectId) -> Result<A, Error> {
        Ok(serde_json::from_slice(&self.get(object_id)?)?)
    }
}

#[test]
fn test_json_objects() {
    use std::collections::BTreeMap;

    let mut store = in_memory::InMemoryObjectStore::new();
    let mut map = BTreeMap::new();
    map.insert(String::from("b"), 2);
    map.insert(String::from("a"), 1);
    let id = store.insert_json(&map).unwrap();
    assert_eq!(store.insert_json(&map).unwrap(), id);
    let back: BTreeMap<String, i32> = store.read_json(id).unwrap();
    assert_eq!(back, map);

    let missing = ObjectId::from(&b"nope"[..]);
    assert!(matches!(
        store.read_json::<BTreeMap<String, i32>>(missing),
        Err(Error::MissingObject(id)) if id == missing
    ));
}

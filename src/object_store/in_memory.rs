use std::{collections::BTreeMap, convert::Infallible};

use crate::object_id::ObjectId;

use super::ObjectStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<ObjectId, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }

    /// Number of distinct objects held.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for InMemoryObjectStore {
    type Error = Infallible;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error> {
        Ok(self.objects.contains_key(&id))
    }

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.objects.get(&id).cloned())
    }

    fn insert(&mut self, object: &[u8]) -> Result<ObjectId, Self::Error> {
        let id: ObjectId = object.into();
        self.objects.entry(id).or_insert_with(|| Vec::from(object));
        Ok(id)
    }
}

#[test]
fn test_in_memory_object_store() {
    let mut store = InMemoryObjectStore::new();
    let id = store.insert(b"hello, world").unwrap();
    let b: &[u8] = b"hello, world";
    assert!(store.has(b.into()).unwrap());
    assert_eq!(store.read(b.into()).unwrap(), Some(Vec::from(b)));

    assert_eq!(store.insert(b"hello, world").unwrap(), id);
    assert_eq!(store.len(), 1);
    store.insert(b"goodbye").unwrap();
    assert_eq!(store.len(), 2);
}

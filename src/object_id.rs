use crate::hex::{self, HexError};
use blake3::Hash;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use std::{fmt, str::FromStr};

/// An identifier for a particular piece of binary content.
/// Under the hood, this is a [`blake3`] hash.
///
/// It is displayed in hexadecimal format.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Hash);

/// Commits are stored objects like any other, so they share the identifier type.
pub type CommitId = ObjectId;

/// Number of bytes in an [`ObjectId`].
pub const LEN: usize = blake3::OUT_LEN;

#[derive(Debug, Display, From)]
pub enum ParseObjectIdError {
    #[from]
    #[display(fmt = "invalid object id: {}", _0)]
    Hex(HexError),
    #[display(fmt = "invalid object id: expected {} bytes, got {}", LEN, _0)]
    Length(usize),
}

impl std::error::Error for ParseObjectIdError {}

impl ObjectId {
    pub fn as_bytes(&self) -> &[u8; LEN] {
        self.0.as_bytes()
    }

    /// Abbreviated form used in human facing output.
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(10);
        s
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b: &[u8] = self.0.as_bytes();
        write!(f, "{}", hex::Hex::from(b))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short())
    }
}

impl From<&Vec<u8>> for ObjectId {
    fn from(vec: &Vec<u8>) -> Self {
        ObjectId(blake3::hash(vec))
    }
}

impl From<&[u8]> for ObjectId {
    fn from(bytes: &[u8]) -> Self {
        ObjectId(blake3::hash(bytes))
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::Hex::decode(s)?;
        let bytes: [u8; LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseObjectIdError::Length(bytes.len()))?;
        Ok(ObjectId(Hash::from(bytes)))
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_equal_content_equal_id() {
    let a = ObjectId::from(&b"hello".to_vec());
    let b = ObjectId::from(&b"hello"[..]);
    let c = ObjectId::from(&b"world"[..]);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_parse_and_serialize() {
    let id = ObjectId::from(&b"hello"[..]);
    let text = id.to_string();
    assert_eq!(text.len(), LEN * 2);
    assert_eq!(text.parse::<ObjectId>().unwrap(), id);
    assert!(id.short().starts_with(&text[..10]));

    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", text));
    let back: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);

    assert!(matches!(
        "abcd".parse::<ObjectId>(),
        Err(ParseObjectIdError::Length(2))
    ));
}

use std::fmt;

use derive_more::Display;

/// A valid hexadecimal encoding of binary data.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Hex(String);

#[derive(PartialEq, Eq, Debug, Clone, Display)]
pub enum HexError {
    #[display(fmt = "hex string has odd length {}", _0)]
    OddLength(usize),
    #[display(fmt = "bad hex digit {:?}", _0)]
    BadDigit(char),
}

impl std::error::Error for HexError {}

impl Hex {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes a lowercase or uppercase hex string back into bytes.
    pub fn decode(s: &str) -> Result<Vec<u8>, HexError> {
        fn unhex_digit(h: u8) -> Result<u8, HexError> {
            match h {
                b'0'..=b'9' => Ok(h - b'0'),
                b'a'..=b'f' => Ok(h - b'a' + 10),
                b'A'..=b'F' => Ok(h - b'A' + 10),
                _ => Err(HexError::BadDigit(h as char)),
            }
        }

        let bytes = s.as_bytes();
        if bytes.len() % 2 != 0 {
            return Err(HexError::OddLength(bytes.len()));
        }
        bytes
            .chunks(2)
            .map(|pair| Ok(unhex_digit(pair[0])? << 4 | unhex_digit(pair[1])?))
            .collect()
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a> From<&'a [u8]> for Hex {
    fn from(bytes: &[u8]) -> Self {
        fn hex_digit(b: u8) -> char {
            if b <= 9 {
                (b + b'0') as char
            } else {
                (b + b'a' - 10) as char
            }
        }

        let mut out = String::with_capacity(bytes.len() * 2);
        for &b in bytes {
            out.push(hex_digit((b & 0b11110000) >> 4));
            out.push(hex_digit(b & 0b00001111));
        }
        Hex(out)
    }
}

#[test]
fn test_hex_round_trip() {
    let example: &[u8] = b"hello, world";
    let hex: Hex = Hex::from(example);
    assert_eq!(hex.as_str(), "68656c6c6f2c20776f726c64");
    let bytes = Hex::decode(hex.as_str()).unwrap();
    assert_eq!(example, &bytes[..]);
}

#[test]
fn test_hex_rejects_garbage() {
    assert_eq!(Hex::decode("abc"), Err(HexError::OddLength(3)));
    assert_eq!(Hex::decode("zz"), Err(HexError::BadDigit('z')));
}

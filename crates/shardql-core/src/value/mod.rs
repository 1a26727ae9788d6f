mod float;


use serde::{Deserialize, Serialize};

// re-exports
pub use float::{Float64, NonFiniteFloat};

// 2^63 and 2^64, exactly representable as f64
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

///
/// Value
/// Literal bound to a placeholder, returned in a row, or extracted as a
/// sharding key.
///
/// Null   → SQL NULL
/// List   → ordered list, only meaningful as an IN operand
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Float64(Float64),
    Int(i64),
    List(Vec<Self>),
    Null,
    Text(String),
    Uint(u64),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Return true for values a sharding column can never be keyed by.
    #[must_use]
    pub fn is_empty_key(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::Blob(b) => b.is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Widen integer-like values to i64.
    ///
    /// Floats convert only when integral and inside the i64 range.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Uint(v) => i64::try_from(*v).ok(),
            Self::Bool(v) => Some(i64::from(*v)),
            Self::Float64(v) => {
                let f = v.get();
                if f.fract() != 0.0 || !(-I64_BOUND..I64_BOUND).contains(&f) {
                    return None;
                }
                #[expect(clippy::cast_possible_truncation)]
                let n = f as i64;
                Some(n)
            }
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    // Integral values above i64::MAX that still fit in u64.
    fn as_wide_u64(&self) -> Option<u64> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Float64(v) => {
                let f = v.get();
                if f.fract() != 0.0 || !(0.0..U64_BOUND).contains(&f) {
                    return None;
                }
                #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = f as u64;
                Some(n)
            }
            _ => None,
        }
    }

    /// Plain textual form used for LIKE patterns.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Blob(b) => String::from_utf8_lossy(b).into_owned(),
            Self::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            Self::Float64(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::List(items) => items
                .iter()
                .map(Self::to_plain_text)
                .collect::<Vec<_>>()
                .join(","),
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Uint(v) => v.to_string(),
        }
    }

    /// Render the value as a SQL literal using ANSI single-quote escaping.
    ///
    /// Backends with their own quoting rules override this through
    /// `Connection::quote_literal`.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Text(s) => quote_ansi(s),
            Self::Blob(b) => quote_ansi(&String::from_utf8_lossy(b)),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Null => "NULL".to_string(),
            Self::List(items) => items
                .iter()
                .map(Self::to_sql_literal)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Float64(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Uint(v) => v.to_string(),
        }
    }

    /// Stable byte encoding used by hashing coordinators.
    ///
    /// Numerics are encoded by magnitude, not by variant: every integral value
    /// that fits in i64 (including `"5"` as text) shares one encoding, larger
    /// integral values share another, and only fractional floats keep the
    /// float tag. A key therefore hashes the same whether it arrives typed or
    /// is recovered from rendered SQL.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        if !matches!(self, Self::Bool(_)) {
            if let Some(n) = self.as_i64() {
                return [b"i".as_slice(), &n.to_be_bytes()].concat();
            }
            if let Some(n) = self.as_wide_u64() {
                return [b"u".as_slice(), &n.to_be_bytes()].concat();
            }
        }

        match self {
            Self::Text(s) => [b"t".as_slice(), s.as_bytes()].concat(),
            Self::Blob(b) => [b"b".as_slice(), b.as_slice()].concat(),
            Self::Bool(v) => vec![b'o', u8::from(*v)],
            Self::Float64(v) => [b"f".as_slice(), &v.to_be_bytes()].concat(),
            Self::List(items) => {
                let mut out = vec![b'l'];
                for item in items {
                    out.extend(item.canonical_bytes());
                    out.push(0);
                }
                out
            }
            Self::Int(_) | Self::Uint(_) | Self::Null => vec![b'n'],
        }
    }
}

fn quote_ansi(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<Float64> for Value {
    fn from(v: Float64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

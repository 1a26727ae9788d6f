use crate::value::Value;
use std::collections::HashMap;

///
/// CONSTANTS
///

/// Prefix for placeholders allocated by the condition builder.
pub const PARAM_PREFIX: &str = ":qp";

///
/// ParamSet
///
/// Ordered placeholder-name → literal bindings for one build pass.
///
/// Placeholder names are allocated from a monotonic counter. Names already
/// bound (for example by a merged expression) are skipped, so allocation never
/// overwrites an existing binding.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParamSet {
    entries: Vec<(String, Value)>,
    // name → position in `entries`
    index: HashMap<String, usize>,
    next: usize,
}

impl ParamSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        let pos = if name.starts_with(':') {
            self.index.get(name)
        } else {
            self.index.get(&normalize_name(name))
        };

        pos.and_then(|&pos| self.entries.get(pos)).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Bind a named value, replacing any existing binding of the same name.
    ///
    /// Names without a leading `:` are normalized to carry one.
    pub fn bind(&mut self, name: impl AsRef<str>, value: impl Into<Value>) {
        let name = normalize_name(name.as_ref());
        let value = value.into();

        match self.index.get(&name) {
            Some(&pos) => self.entries[pos].1 = value,
            None => self.insert(name, value),
        }
    }

    /// Register a literal under a freshly allocated placeholder and return
    /// the placeholder name.
    pub fn push(&mut self, value: impl Into<Value>) -> String {
        loop {
            let name = format!("{PARAM_PREFIX}{}", self.next);
            self.next += 1;
            if !self.index.contains_key(&name) {
                self.insert(name.clone(), value.into());
                return name;
            }
        }
    }

    /// Merge every binding of `other` into this set.
    pub fn merge(&mut self, other: &Self) {
        for (name, value) in other.iter() {
            self.bind(name, value.clone());
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<(String, Value)> {
        self.entries
    }

    fn insert(&mut self, name: String, value: Value) {
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
    }
}

impl<N: AsRef<str>, V: Into<Value>> FromIterator<(N, V)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.bind(name, value);
        }
        // pre-bound params push the counter forward, mirroring a fresh pass
        // that had already allocated that many names
        set.next = set.entries.len();

        set
    }
}

fn normalize_name(name: &str) -> String {
    if name.starts_with(':') {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

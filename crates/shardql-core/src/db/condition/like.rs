//! LIKE pattern escaping.

/// Default escape map applied to LIKE values.
pub const DEFAULT_LIKE_ESCAPES: [(&str, &str); 3] = [("%", "\\%"), ("_", "\\_"), ("\\", "\\\\")];

///
/// EscapeMap
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum EscapeMap {
    Default,
    Custom(Vec<(String, String)>),
    Disabled,
}

impl EscapeMap {
    /// Turn a user value into the bound LIKE pattern.
    ///
    /// Escaped values are wrapped in `%…%`; with escaping disabled the value
    /// is bound as-is so callers can supply their own wildcards.
    pub(crate) fn pattern(&self, value: &str) -> String {
        match self {
            Self::Default => {
                let pairs: Vec<(&str, &str)> = DEFAULT_LIKE_ESCAPES.to_vec();
                format!("%{}%", translate(value, &pairs))
            }
            Self::Custom(map) if map.is_empty() => value.to_string(),
            Self::Custom(map) => {
                let pairs: Vec<(&str, &str)> =
                    map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                format!("%{}%", translate(value, &pairs))
            }
            Self::Disabled => value.to_string(),
        }
    }
}

/// Simultaneous longest-match replacement.
///
/// Each input position is rewritten at most once, so a replacement's output
/// is never itself re-escaped.
pub(crate) fn translate(input: &str, pairs: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(&str, &str)> = pairs.iter().copied().filter(|(k, _)| !k.is_empty()).collect();
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    'outer: while !rest.is_empty() {
        for (from, to) in &pairs {
            if let Some(tail) = rest.strip_prefix(from) {
                out.push_str(to);
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
        }
        rest = chars.as_str();
    }

    out
}

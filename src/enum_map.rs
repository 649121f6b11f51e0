//! Name to integer mapping for enumerated fields.

/// Ordered set of `(name, value)` pairs.
///
/// Duplicates are accepted here and rejected when the owning field is
/// resolved, so the error can name the field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumMap {
    entries: Vec<(String, u64)>,
}

impl EnumMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name = value`.
    pub fn with(mut self, name: impl Into<String>, value: u64) -> Self {
        self.entries.push((name.into(), value));
        self
    }

    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_of(&self, value: u64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }

    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    /// Largest mapped integer, `None` for an empty map.
    pub fn max_value(&self) -> Option<u64> {
        self.entries.iter().map(|(_, value)| *value).max()
    }

    /// First entry whose name or value was already used by an earlier entry.
    pub fn first_duplicate(&self) -> Option<String> {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            for (prev_name, prev_value) in &self.entries[..i] {
                if prev_name == name {
                    return Some(name.clone());
                }
                if prev_value == value {
                    return Some(value.to_string());
                }
            }
        }
        None
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for EnumMap {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        EnumMap {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

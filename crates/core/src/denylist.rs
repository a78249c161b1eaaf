use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Literal values the extractor is known to fabricate when information is
/// absent. Exact-match after normalization; inherently incomplete, so the
/// set is extensible from external configuration rather than closed.
const DEFAULT_BAD_VALUES: &[&str] = &[
    "",
    "john doe",
    "your name",
    "name",
    "example",
    "abc@example.com",
    "johndoe@example.com",
    "john@example.com",
    "someone@example.com",
    "user",
    "user@gmail.com",
    "user@example.com",
    "unknown",
    "unknown@gmail.com",
    "you didn't mention your name",
    "you didn't mention your email",
];

#[derive(Debug, Clone)]
pub struct Denylist {
    values: HashSet<String>,
}

#[derive(Debug, Deserialize)]
struct DenylistFile {
    bad_values: Vec<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self {
            values: DEFAULT_BAD_VALUES.iter().map(|v| normalize(v)).collect(),
        }
    }
}

impl Denylist {
    /// Built-in set extended with entries from a JSON file of the shape
    /// `{"bad_values": ["...", ...]}`. Entries are normalized at load so
    /// case or whitespace variants in the file still match.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let parsed: DenylistFile = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut list = Self::default();
        list.values.extend(parsed.bad_values.iter().map(|v| normalize(v)));
        Ok(list)
    }

    pub fn is_placeholder(&self, value: &str) -> bool {
        self.values.contains(&normalize(value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

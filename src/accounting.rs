//! Parameter accounting: how many genes a configuration consumes, and where.
//!
//! A [`ParameterUsage`] is an ordered tree whose leaves are listed in exactly
//! the order the owning brain decodes them. The sum of the leaves is the
//! individual size the optimizer must produce.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::BrainError;

/// Named, ordered breakdown of parameter counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterUsage {
    Count(usize),
    Group(Vec<(String, ParameterUsage)>),
}

impl ParameterUsage {
    pub fn group() -> Self {
        ParameterUsage::Group(Vec::new())
    }

    /// Append a named entry (builder style). A no-op on a `Count`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, usage: impl Into<ParameterUsage>) -> Self {
        if let ParameterUsage::Group(entries) = &mut self {
            entries.push((name.into(), usage.into()));
        }
        self
    }

    /// Sum over all leaves, saturating at `usize::MAX`.
    pub fn total(&self) -> usize {
        self.checked_total().unwrap_or(usize::MAX)
    }

    /// Sum over all leaves, or `None` if it does not fit in `usize`.
    pub fn checked_total(&self) -> Option<usize> {
        match self {
            ParameterUsage::Count(n) => Some(*n),
            ParameterUsage::Group(entries) => entries
                .iter()
                .try_fold(0usize, |acc, (_, u)| acc.checked_add(u.checked_total()?)),
        }
    }

    /// Genome length this breakdown describes.
    pub fn individual_size(&self) -> Result<usize, BrainError> {
        self.checked_total()
            .ok_or_else(|| BrainError::config("total parameter count overflows usize"))
    }

    /// Look up a direct child by name.
    pub fn get(&self, name: &str) -> Option<&ParameterUsage> {
        match self {
            ParameterUsage::Count(_) => None,
            ParameterUsage::Group(entries) => entries.iter().find(|(n, _)| n == name).map(|(_, u)| u),
        }
    }

    /// Look up a nested entry by dotted path, e.g. `"layer_0.hidden_to_hidden"`.
    pub fn lookup(&self, path: &str) -> Option<&ParameterUsage> {
        path.split('.').try_fold(self, |node, part| node.get(part))
    }

    /// Leaves in decode order, keyed by dotted path.
    pub fn leaves(&self) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves(&self, prefix: &str, out: &mut Vec<(String, usize)>) {
        match self {
            ParameterUsage::Count(n) => out.push((prefix.to_string(), *n)),
            ParameterUsage::Group(entries) => {
                for (name, usage) in entries {
                    let path = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{prefix}.{name}")
                    };
                    usage.collect_leaves(&path, out);
                }
            }
        }
    }
}

impl From<usize> for ParameterUsage {
    fn from(n: usize) -> Self {
        ParameterUsage::Count(n)
    }
}

/// Serializes as a JSON object whose keys keep decode order.
impl Serialize for ParameterUsage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParameterUsage::Count(n) => serializer.serialize_u64(*n as u64),
            ParameterUsage::Group(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, usage) in entries {
                    map.serialize_entry(name, usage)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Display for ParameterUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (path, n) in self.leaves() {
            writeln!(f, "{path:<40} {n:>8}")?;
        }
        write!(f, "{:<40} {:>8}", "total", self.total())
    }
}

//! Persisted interface-name to address assignments.
//!
//! One row per line, `<ifname>> <mac>`. The file is loaded whole, edited in
//! memory and written back through a temp file and rename.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use nextmac_shared::constants::REGISTRY_DELIMITER;
use nextmac_shared::errors::{MacError, MacResult};
use serde::Serialize;

use crate::addr::MacAddress;
use crate::util;

/// One registry row. The value is kept verbatim so a malformed address can be
/// detected and healed by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub if_name: String,
    pub value: String,
}

impl RegistryEntry {
    pub fn new(if_name: impl Into<String>, mac: MacAddress) -> Self {
        Self {
            if_name: if_name.into(),
            value: mac.to_string(),
        }
    }

    /// The parsed address, or `None` if the stored value is malformed.
    pub fn address(&self) -> Option<MacAddress> {
        self.value.parse().ok()
    }

    fn parse_line(line: &str) -> Option<Self> {
        let (name, value) = line.split_once('>')?;
        Some(Self {
            if_name: name.to_string(),
            value: value.trim_start().trim_end().to_string(),
        })
    }
}

/// Reject names that would corrupt the line format.
pub fn validate_if_name(if_name: &str) -> MacResult<()> {
    if if_name.is_empty() {
        return Err(MacError::InvalidInput("interface name is empty".to_string()));
    }
    if if_name.chars().any(|c| c.is_whitespace() || c == '>') {
        return Err(MacError::InvalidInput(format!(
            "interface name '{}' contains whitespace or '>'",
            if_name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AllocationRegistry {
    path: PathBuf,
    entries: Vec<RegistryEntry>,
    existed: bool,
}

impl AllocationRegistry {
    /// Load the registry at `path`. A missing file is an empty registry.
    pub fn load(path: &Path) -> MacResult<Self> {
        let (content, existed) = match std::fs::read_to_string(path) {
            Ok(content) => (content, true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (String::new(), false),
            Err(e) => {
                return Err(MacError::Storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut entries = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match RegistryEntry::parse_line(line) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(
                    registry = %path.display(),
                    line = lineno + 1,
                    "Dropping registry line without delimiter"
                ),
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            existed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file was present when loaded.
    pub fn exists(&self) -> bool {
        self.existed
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Latest row for `if_name`. Names match exactly.
    pub fn lookup(&self, if_name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().rev().find(|e| e.if_name == if_name)
    }

    /// Whether an interface other than `if_name` is assigned `mac`.
    pub fn address_in_use_by_other(&self, if_name: &str, mac: &MacAddress) -> bool {
        self.entries
            .iter()
            .any(|e| e.if_name != if_name && e.address().as_ref() == Some(mac))
    }

    /// Assign `mac` to `if_name`, replacing any previous row.
    pub fn append(&mut self, if_name: &str, mac: MacAddress) {
        self.remove(if_name);
        self.entries.push(RegistryEntry::new(if_name, mac));
    }

    /// Drop every row for `if_name`; returns how many were removed.
    pub fn remove(&mut self, if_name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.if_name != if_name);
        before - self.entries.len()
    }

    /// Exchange the assignments of `a` and `b`.
    ///
    /// # Errors
    /// `NotFound` if either interface has no assignment.
    pub fn swap(&mut self, a: &str, b: &str) -> MacResult<()> {
        let value_a = self.lookup(a).map(|e| e.value.clone());
        let value_b = self.lookup(b).map(|e| e.value.clone());
        let (value_a, value_b) = match (value_a, value_b) {
            (Some(va), Some(vb)) => (va, vb),
            (None, _) => return Err(MacError::NotFound(format!("no assignment for '{}'", a))),
            (_, None) => return Err(MacError::NotFound(format!("no assignment for '{}'", b))),
        };

        self.remove(a);
        self.remove(b);
        self.entries.push(RegistryEntry {
            if_name: a.to_string(),
            value: value_b,
        });
        self.entries.push(RegistryEntry {
            if_name: b.to_string(),
            value: value_a,
        });
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}{}{}", entry.if_name, REGISTRY_DELIMITER, entry.value);
        }
        out
    }

    /// Atomically replace the file with the in-memory rows.
    pub fn save(&mut self) -> MacResult<()> {
        util::write_atomic(&self.path, &self.render())?;
        self.existed = true;
        Ok(())
    }
}

//! Settings snapshot persistence with safe atomic writes.
//!
//! The snapshot is a flat TOML table of dotted leaf paths to values
//! (`"alarm.alarm1.h" = 6`), written only when the settings screen is left
//! with dirty leaves. Loading applies the snapshot over the compiled
//! defaults: unknown paths and out-of-domain values are logged and skipped so
//! a stale or hand-edited snapshot can never brick the panel.
//!
//! Atomic write: serialize → temp file → fsync → rename over target, so a
//! power cut mid-write leaves the previous snapshot intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{PanelError, Result};
use crate::settings::tree::{SettingValue, SettingsTree};

/// One persisted leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum SnapshotValue {
    Int(i64),
    Choice(String),
}

impl From<&SettingValue> for SnapshotValue {
    fn from(value: &SettingValue) -> Self {
        match value {
            SettingValue::Int(v) => Self::Int(*v),
            SettingValue::Choice(s) => Self::Choice(s.clone()),
        }
    }
}

impl From<SnapshotValue> for SettingValue {
    fn from(value: SnapshotValue) -> Self {
        match value {
            SnapshotValue::Int(v) => Self::Int(v),
            SnapshotValue::Choice(s) => Self::Choice(s),
        }
    }
}

/// Loads and persists the settings tree snapshot.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store backed by the given snapshot path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the startup tree: compiled defaults overlaid with whatever the
    /// snapshot holds. Never fails; unreadable snapshots are logged and the
    /// defaults win.
    #[must_use]
    pub fn load_or_defaults(&self) -> SettingsTree {
        let mut tree = SettingsTree::defaults();
        if !self.path.exists() {
            return tree;
        }
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                eprintln!(
                    "[RMP-SETTINGS] snapshot unreadable, using defaults: {}: {err}",
                    self.path.display()
                );
                return tree;
            }
        };
        let table: BTreeMap<String, SnapshotValue> = match toml::from_str(&raw) {
            Ok(table) => table,
            Err(err) => {
                eprintln!(
                    "[RMP-SETTINGS] snapshot parse failure, using defaults: {}: {err}",
                    self.path.display()
                );
                return tree;
            }
        };
        for (path, value) in table {
            if let Err(err) = tree.set_leaf_value(&path, value.into()) {
                // Per-leaf corruption keeps that leaf's default instead of
                // discarding the whole snapshot.
                eprintln!("[RMP-SETTINGS] snapshot entry skipped: {err}");
            }
        }
        tree
    }

    /// Write the full tree snapshot atomically.
    pub fn persist(&self, tree: &SettingsTree) -> Result<()> {
        let mut table: BTreeMap<String, SnapshotValue> = BTreeMap::new();
        tree.for_each_leaf(|path, leaf| {
            table.insert(path.to_string(), (&leaf.value).into());
        });
        let raw = toml::to_string(&table)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| PanelError::io(parent, source))?;
        }

        let tmp = self.path.with_extension("toml.tmp");
        {
            let mut file =
                fs::File::create(&tmp).map_err(|source| PanelError::io(&tmp, source))?;
            file.write_all(raw.as_bytes())
                .map_err(|source| PanelError::io(&tmp, source))?;
            file.sync_all().map_err(|source| PanelError::io(&tmp, source))?;
        }
        fs::rename(&tmp, &self.path).map_err(|source| PanelError::io(&self.path, source))?;
        Ok(())
    }

    /// Factory reset: discard the snapshot and return a fresh defaults tree.
    pub fn factory_reset(&self) -> Result<SettingsTree> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(PanelError::io(&self.path, source)),
        }
        Ok(SettingsTree::defaults())
    }
}

// src/snapshot.rs
//! On-disk copy of the last known Gotify apps (`apps_db.json`).
//!
//! Format: pretty JSON object keyed by the app id as a string. Writes go to
//! `<path>.tmp` first and are renamed into place, so readers only ever see a
//! complete file.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::gotify::App;

pub type KnownApps = BTreeMap<i64, App>;

pub const DEFAULT_SNAPSHOT_PATH: &str = "apps_db.json";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Missing file is an empty snapshot, not an error.
    pub fn load(&self) -> Result<KnownApps> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(KnownApps::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        serde_json::from_str(&raw).with_context(|| format!("parse {}", self.path.display()))
    }

    pub fn save(&self, apps: &KnownApps) -> Result<()> {
        let tmp = self.tmp_path();
        let json = serde_json::to_vec_pretty(apps).context("serialize known apps")?;

        let written = (|| -> io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&json)?;
            f.write_all(b"\n")?;
            f.sync_all()
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("write {}", tmp.display()));
        }

        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))
    }
}

use crate::config::StoreConfig;
use crate::q_table::QTable;
use anyhow::Context;
use chrono::offset::Local;
use log::{info, warn};
use std::fs::{self, File};
use std::io::{prelude::*, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Durable home of the value table: one pickle file plus rotating backups.
/// Clones share one writer lock, so saves through them never interleave.
#[derive(Debug, Clone)]
pub struct TableStore {
    path: PathBuf,
    backups_kept: usize,
    writer: Arc<Mutex<()>>,
}

impl TableStore {
    pub fn new(config: &StoreConfig) -> Self {
        TableStore {
            path: config.table_path.clone(),
            backups_kept: config.backups_kept,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the table, or an empty one when the file is missing or unreadable.
    pub fn load(&self) -> QTable {
        if !self.path.exists() {
            info!("no existing value table at {}", self.path.display());
            return QTable::new();
        }
        match q_table_from_disk_pickle(&self.path) {
            Ok(q) => {
                info!("loaded {} states from {}", q.len(), self.path.display());
                q
            }
            Err(err) => {
                warn!("starting with an empty value table: {err:#}");
                QTable::new()
            }
        }
    }

    /// Backs up the current file, then replaces it with `q`.
    pub fn save(&self, q: &QTable) -> anyhow::Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.backups_kept > 0 && self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup)
                .with_context(|| format!("backing up to {}", backup.display()))?;
            self.prune_backups()?;
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.sibling(".tmp");
        q_table_to_disk_pickle(&tmp, q)?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        info!("saved {} states to {}", q.len(), self.path.display());
        Ok(())
    }

    pub fn backups(&self) -> anyhow::Result<Vec<PathBuf>> {
        let prefix = format!("{}.", self.file_name());
        let mut backups: Vec<PathBuf> = fs::read_dir(self.dir())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".bak"))
            })
            .collect();
        // Timestamps are fixed width, so name order is age order.
        backups.sort();
        Ok(backups)
    }

    fn prune_backups(&self) -> anyhow::Result<()> {
        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(self.backups_kept);
        for old in &backups[..excess] {
            if let Err(err) = fs::remove_file(old) {
                warn!("could not remove old backup {}: {err}", old.display());
            }
        }
        Ok(())
    }

    fn backup_path(&self) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d%H%M%S%3f");
        self.sibling(&format!(".{timestamp}.bak"))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        self.dir().join(format!("{}{suffix}", self.file_name()))
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "q_values".to_owned())
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

pub fn q_table_to_disk_pickle(path: &Path, q: &QTable) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_pickle::to_writer(&mut writer, q, serde_pickle::SerOptions::new())?;
    writer.flush()?;
    Ok(())
}

pub fn q_table_from_disk_pickle(path: &Path) -> anyhow::Result<QTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut buf: Vec<u8> = vec![];
    reader.read_to_end(&mut buf)?;
    let decoded: QTable = serde_pickle::from_slice(&buf, serde_pickle::DeOptions::new())
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok(decoded)
}

/// Human-readable dump of the table, keyed by the raw state key.
pub fn q_table_to_disk_json(path: &Path, q: &QTable) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), q)?;
    Ok(())
}

pub fn q_table_from_disk_json(path: &Path) -> anyhow::Result<QTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let decoded: QTable = serde_json::from_reader(BufReader::new(file))?;
    Ok(decoded)
}

//! Pair-keyed artifact store.
//!
//! Every (SOURCE, LIBRARY) pair gets its own directory named by a digest of
//! the two roots. Each artifact is kept as an append-only series of
//! timestamped snapshots plus a `_latest` copy that is only replaced after
//! the artifact was produced successfully, via write-then-rename.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Error;
use crate::model::{now_rfc3339, MoveLog, MoveOp};

const KEY_LEN: usize = 16;
const LATEST_SUFFIX: &str = "latest";
const MANIFEST_FILE: &str = "workspace.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    SourceInventory,
    LibraryIndex,
    Plan,
    Moves,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::SourceInventory,
        ArtifactKind::LibraryIndex,
        ArtifactKind::Plan,
        ArtifactKind::Moves,
    ];

    pub fn stem(self) -> &'static str {
        match self {
            Self::SourceInventory => "source_inventory",
            Self::LibraryIndex => "library_index",
            Self::Plan => "plan",
            Self::Moves => "moves",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WorkspaceManifest {
    source_root: String,
    library_root: String,
    created_at: String,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
    key: String,
    source_root: PathBuf,
    library_root: PathBuf,
}

fn canonical_or_given(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Replace `path` so a concurrent reader sees either the old or the new
/// content, never a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

impl Workspace {
    /// Derive the key for the pair, ensure its directory exists and record
    /// which roots it belongs to.
    pub fn open(base_dir: &Path, source_root: &Path, library_root: &Path) -> Result<Self, Error> {
        let source_root = canonical_or_given(source_root);
        let library_root = canonical_or_given(library_root);
        let key = Self::derive_key(
            &source_root.to_string_lossy(),
            &library_root.to_string_lossy(),
        );
        let dir = base_dir.join(&key);
        fs::create_dir_all(&dir)?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            let manifest = WorkspaceManifest {
                source_root: source_root.to_string_lossy().into_owned(),
                library_root: library_root.to_string_lossy().into_owned(),
                created_at: now_rfc3339(),
            };
            write_atomic(&manifest_path, &serde_json::to_vec_pretty(&manifest)?)?;
            info!("Created workspace {} at {}", key, dir.display());
        }

        Ok(Self {
            dir,
            key,
            source_root,
            library_root,
        })
    }

    pub fn derive_key(source_root: &str, library_root: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source_root.as_bytes());
        hasher.update(b"\n");
        hasher.update(library_root.as_bytes());
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..KEY_LEN].to_string()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    pub fn latest_path(&self, kind: ArtifactKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", kind.stem(), LATEST_SUFFIX))
    }

    /// A fresh, unused timestamped snapshot path.
    pub fn snapshot_path(&self, kind: ArtifactKind) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3fZ").to_string();
        let mut path = self.dir.join(format!("{}_{}.json", kind.stem(), stamp));
        let mut n = 1;
        while path.exists() {
            path = self
                .dir
                .join(format!("{}_{}_{}.json", kind.stem(), stamp, n));
            n += 1;
        }
        path
    }

    pub fn write_snapshot<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), Error> {
        write_atomic(path, &serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }

    /// Point `_latest` at an already written snapshot.
    pub fn promote(&self, kind: ArtifactKind, snapshot: &Path) -> Result<(), Error> {
        let bytes = fs::read(snapshot)?;
        write_atomic(&self.latest_path(kind), &bytes)?;
        debug!("{} latest -> {}", kind.stem(), snapshot.display());
        Ok(())
    }

    /// Write a new snapshot and make it the latest. Only call this with an
    /// artifact that was produced successfully.
    pub fn save<T: Serialize>(&self, kind: ArtifactKind, value: &T) -> Result<PathBuf, Error> {
        let path = self.snapshot_path(kind);
        self.write_snapshot(&path, value)?;
        self.promote(kind, &path)?;
        Ok(path)
    }

    pub fn load_latest<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<Option<T>, Error> {
        let path = self.latest_path(kind);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_file(&path).map(Some)
    }

    pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Timestamped snapshots of `kind`, oldest first.
    pub fn history(&self, kind: ArtifactKind) -> Result<Vec<PathBuf>, Error> {
        let prefix = format!("{}_", kind.stem());
        let mut snapshots: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                let Some(name) = p.file_name().and_then(|n| n.to_str()) else {
                    return false;
                };
                name.ends_with(".json")
                    && !name.ends_with(".created.json")
                    && name
                        .strip_prefix(&prefix)
                        .and_then(|rest| rest.chars().next())
                        .is_some_and(|c| c.is_ascii_digit())
            })
            .collect();
        snapshots.sort();
        Ok(snapshots)
    }

    /// Start a new move log for one plan application.
    pub fn begin_move_log(&self) -> Result<MoveLogWriter<'_>, Error> {
        let log = MoveLog {
            executed_at: now_rfc3339(),
            source_root: self.source_root.to_string_lossy().into_owned(),
            library_root: self.library_root.to_string_lossy().into_owned(),
            operations: Vec::new(),
        };
        let path = self.snapshot_path(ArtifactKind::Moves);
        self.write_snapshot(&path, &log)?;
        Ok(MoveLogWriter {
            workspace: self,
            path,
            log,
            created_folders: Vec::new(),
        })
    }
}

/// Companion of a move log listing the LIBRARY folders its apply created,
/// `moves_<ts>.json` -> `moves_<ts>.created.json`.
pub fn created_folders_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("created.json")
}

/// Folders recorded next to `log_path`; empty when none were recorded.
pub fn load_created_folders(log_path: &Path) -> Result<Vec<String>, Error> {
    let path = created_folders_path(log_path);
    if !path.exists() {
        return Ok(Vec::new());
    }
    Workspace::load_file(&path)
}

/// Incrementally persisted move log.
///
/// Each append rewrites the snapshot and makes it the latest move log, so
/// after a crash `moves_latest` already describes the interrupted run. A
/// run that never appends leaves the previous latest log in place.
pub struct MoveLogWriter<'w> {
    workspace: &'w Workspace,
    path: PathBuf,
    log: MoveLog,
    created_folders: Vec<String>,
}

impl MoveLogWriter<'_> {
    pub fn append(&mut self, op: MoveOp) -> Result<(), Error> {
        self.log.operations.push(op);
        self.workspace.write_snapshot(&self.path, &self.log)?;
        self.promote()
    }

    /// Remember a LIBRARY folder this run created, so undo can take it away
    /// again.
    pub fn record_created_folder(&mut self, rel: &str) -> Result<(), Error> {
        self.created_folders.push(rel.to_string());
        self.workspace
            .write_snapshot(&created_folders_path(&self.path), &self.created_folders)?;
        if !self.log.operations.is_empty() {
            let latest = self.workspace.latest_path(ArtifactKind::Moves);
            self.workspace
                .write_snapshot(&created_folders_path(&latest), &self.created_folders)?;
        }
        Ok(())
    }

    fn promote(&self) -> Result<(), Error> {
        let latest = self.workspace.latest_path(ArtifactKind::Moves);
        // Companion first: a stale one from an earlier run must never pair
        // with this log.
        self.workspace
            .write_snapshot(&created_folders_path(&latest), &self.created_folders)?;
        self.workspace.promote(ArtifactKind::Moves, &self.path)
    }

    pub fn log(&self) -> &MoveLog {
        &self.log
    }

    pub fn created_folders(&self) -> &[String] {
        &self.created_folders
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(self) -> MoveLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn key_is_stable_and_pair_specific() {
        let a = Workspace::derive_key("/src", "/lib");
        assert_eq!(a, Workspace::derive_key("/src", "/lib"));
        assert_eq!(a.len(), KEY_LEN);
        assert_ne!(a, Workspace::derive_key("/lib", "/src"));
        assert_ne!(a, Workspace::derive_key("/src", "/lib2"));
    }

    #[test]
    fn save_keeps_history_and_latest() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::open(tmp.path(), Path::new("/nowhere/src"), Path::new("/nowhere/lib"))
            .unwrap();

        ws.save(ArtifactKind::Plan, &serde_json::json!({"n": 1})).unwrap();
        ws.save(ArtifactKind::Plan, &serde_json::json!({"n": 2})).unwrap();

        let history = ws.history(ArtifactKind::Plan).unwrap();
        assert_eq!(history.len(), 2);
        let latest: serde_json::Value = ws.load_latest(ArtifactKind::Plan).unwrap().unwrap();
        assert_eq!(latest["n"], 2);
        let oldest: serde_json::Value = Workspace::load_file(&history[0]).unwrap();
        assert_eq!(oldest["n"], 1);

        assert!(ws.history(ArtifactKind::Moves).unwrap().is_empty());
        assert!(ws
            .load_latest::<serde_json::Value>(ArtifactKind::Moves)
            .unwrap()
            .is_none());
    }

    fn op(name: &str) -> MoveOp {
        MoveOp {
            source_rel: name.to_string(),
            destination_rel: format!("Docs/{name}"),
            reason: String::new(),
        }
    }

    #[test]
    fn empty_move_log_does_not_replace_latest() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::open(tmp.path(), Path::new("/s"), Path::new("/l")).unwrap();

        let mut first = ws.begin_move_log().unwrap();
        first.append(op("a")).unwrap();
        first.finish();

        let second = ws.begin_move_log().unwrap();
        let second_path = second.path().to_path_buf();
        second.finish();

        let latest: MoveLog = ws.load_latest(ArtifactKind::Moves).unwrap().unwrap();
        assert_eq!(latest.operations.len(), 1);
        let abandoned: MoveLog = Workspace::load_file(&second_path).unwrap();
        assert!(abandoned.operations.is_empty());
    }

    #[test]
    fn interrupted_run_is_already_latest() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::open(tmp.path(), Path::new("/s"), Path::new("/l")).unwrap();

        let mut earlier = ws.begin_move_log().unwrap();
        earlier.append(op("first.txt")).unwrap();
        earlier.finish();

        let mut crashed = ws.begin_move_log().unwrap();
        crashed.record_created_folder("Docs").unwrap();
        crashed.append(op("second.txt")).unwrap();
        // Dropped without finishing, as when the process dies mid-apply.
        drop(crashed);

        let latest: MoveLog = ws.load_latest(ArtifactKind::Moves).unwrap().unwrap();
        assert_eq!(latest.operations, vec![op("second.txt")]);
        let folders = load_created_folders(&ws.latest_path(ArtifactKind::Moves)).unwrap();
        assert_eq!(folders, vec!["Docs"]);
    }

    #[test]
    fn companions_stay_out_of_history() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::open(tmp.path(), Path::new("/s"), Path::new("/l")).unwrap();

        let mut writer = ws.begin_move_log().unwrap();
        writer.record_created_folder("Docs").unwrap();
        writer.append(op("a")).unwrap();
        let path = writer.path().to_path_buf();
        writer.finish();

        assert_eq!(ws.history(ArtifactKind::Moves).unwrap(), vec![path.clone()]);
        assert!(created_folders_path(&path).exists());
    }

    #[test]
    fn reopening_reuses_directory() {
        let tmp = tempdir().unwrap();
        let first = Workspace::open(tmp.path(), Path::new("/s"), Path::new("/l")).unwrap();
        let second = Workspace::open(tmp.path(), Path::new("/s"), Path::new("/l")).unwrap();
        assert_eq!(first.dir(), second.dir());
        assert!(first.dir().join(MANIFEST_FILE).exists());
    }
}

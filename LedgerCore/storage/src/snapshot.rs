//! Branchable snapshots of the backend's on-disk state.
//!
//! The manager keeps full file copies of the backend directory as numbered
//! revisions under `.snapshots/`, with a JSON manifest recording branches,
//! named tags, and the current head. Jumping to a tag restores that
//! revision's files and moves the head onto a fresh branch anchored there,
//! so later checkpoints never rewrite a tagged state.
//!
//! While the emulator is live a `LOCK` file marks the directory against
//! external tools; it is dropped and re-created around every checkpoint
//! and jump.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;

const SNAPSHOT_DIR: &str = ".snapshots";
const MANIFEST_FILE: &str = "manifest.json";
const LOCK_FILE: &str = "LOCK";
const LOCK_CONTENT: &[u8] = b"basalt emulator lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    /// Branch the head currently sits on.
    head_branch: String,
    /// Next revision number to allocate.
    next_revision: u64,
    /// Branch name → revision at its tip.
    branches: HashMap<String, u64>,
    /// Tag name → revision it marks.
    tags: HashMap<String, u64>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            head_branch: "main".into(),
            next_revision: 0,
            branches: HashMap::new(),
            tags: HashMap::new(),
        }
    }
}

/// Named branches and tags over the physical state of a backend directory.
#[derive(Debug)]
pub struct SnapshotManager {
    db_path: PathBuf,
    root: PathBuf,
    manifest: Mutex<Manifest>,
}

impl SnapshotManager {
    /// Open (or initialize) snapshot bookkeeping for a backend directory
    /// and take the live lock.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        let root = db_path.join(SNAPSHOT_DIR);
        fs::create_dir_all(&root)?;

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let raw = fs::read(&manifest_path)?;
            serde_json::from_slice(&raw)
                .map_err(|e| StoreError::Snapshot(format!("corrupt manifest: {e}")))?
        } else {
            Manifest::default()
        };

        let manager = Self {
            db_path,
            root,
            manifest: Mutex::new(manifest),
        };
        manager.lock();
        Ok(manager)
    }

    /// Capture the backend's current files as a new revision on the head
    /// branch. The backend must be flushed (or closed) first.
    pub fn checkpoint(&self, message: &str) -> Result<u64, StoreError> {
        self.unlock();
        let result = self.capture(message);
        self.lock();
        result
    }

    /// Switch to the named snapshot.
    ///
    /// The current state is captured first so nothing is lost. If `name`
    /// tags an existing revision, that revision's files are restored and
    /// the head moves to a fresh branch anchored there. Otherwise the
    /// just-captured revision becomes both a tag and a branch named
    /// `name`. The backend must be closed around this call.
    pub fn jump(&self, name: &str) -> Result<(), StoreError> {
        self.unlock();
        let result = self.jump_inner(name);
        self.lock();
        result
    }

    fn jump_inner(&self, name: &str) -> Result<(), StoreError> {
        let head = self.capture(&format!("context switching to: {name}"))?;

        let existing = self.manifest.lock().tags.get(name).copied();
        match existing {
            Some(revision) => {
                self.restore(revision)?;
                let mut manifest = self.manifest.lock();
                // A deterministic fresh branch name anchored at the tag.
                let branch = format!("{name}-{head}");
                manifest.branches.insert(branch.clone(), revision);
                manifest.head_branch = branch;
                self.save_manifest(&manifest)?;
                info!(snapshot = name, revision, "switched to state snapshot");
            }
            None => {
                let mut manifest = self.manifest.lock();
                manifest.tags.insert(name.to_string(), head);
                manifest.branches.insert(name.to_string(), head);
                manifest.head_branch = name.to_string();
                self.save_manifest(&manifest)?;
                info!(snapshot = name, revision = head, "created new state snapshot");
            }
        }
        Ok(())
    }

    /// Returns true if a tag with this name exists.
    pub fn has_tag(&self, name: &str) -> bool {
        self.manifest.lock().tags.contains_key(name)
    }

    /// Drop the live lock; called when the store closes.
    pub fn release(&self) {
        self.unlock();
    }

    fn capture(&self, message: &str) -> Result<u64, StoreError> {
        let (revision, head_branch) = {
            let manifest = self.manifest.lock();
            (manifest.next_revision, manifest.head_branch.clone())
        };

        let revision_dir = self.root.join(format!("rev-{revision}"));
        fs::create_dir_all(&revision_dir)?;
        for entry in fs::read_dir(&self.db_path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::copy(entry.path(), revision_dir.join(entry.file_name()))?;
            }
        }
        fs::write(revision_dir.join("MESSAGE"), message)?;

        let mut manifest = self.manifest.lock();
        manifest.next_revision = revision + 1;
        manifest.branches.insert(head_branch, revision);
        self.save_manifest(&manifest)?;
        Ok(revision)
    }

    fn restore(&self, revision: u64) -> Result<(), StoreError> {
        let revision_dir = self.root.join(format!("rev-{revision}"));
        if !revision_dir.is_dir() {
            return Err(StoreError::Snapshot(format!(
                "revision {revision} has no file capture"
            )));
        }

        // Clear the backend's current files, leaving the snapshot
        // directory itself untouched.
        for entry in fs::read_dir(&self.db_path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        for entry in fs::read_dir(&revision_dir)? {
            let entry = entry?;
            if entry.file_name() == "MESSAGE" {
                continue;
            }
            if entry.file_type()?.is_file() {
                fs::copy(entry.path(), self.db_path.join(entry.file_name()))?;
            }
        }
        Ok(())
    }

    fn save_manifest(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let raw = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StoreError::Snapshot(format!("manifest encoding: {e}")))?;
        fs::write(self.root.join(MANIFEST_FILE), raw)?;
        Ok(())
    }

    // Lock-file handling mirrors a best-effort advisory lock: failures
    // are not critical to operation.
    fn lock(&self) {
        let _ = fs::write(self.root.join(LOCK_FILE), LOCK_CONTENT);
    }

    fn unlock(&self) {
        let _ = fs::remove_file(self.root.join(LOCK_FILE));
    }
}

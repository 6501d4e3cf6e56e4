use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::progress::LearnedData;

/// Durable home of the learned data
pub trait ProgressStorage {
    /// Load the record, creating an empty one if none exists yet
    fn load(&self) -> Result<LearnedData>;
    fn save(&self, data: &LearnedData) -> Result<()>;
}

/// Pretty-printed JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStorage for JsonFileStorage {
    fn load(&self) -> Result<LearnedData> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "data file not found, creating an empty one");
            let data = LearnedData::default();
            self.save(&data)?;
            return Ok(data);
        }

        let bytes = fs::read(&self.path)?;
        let mut data: LearnedData = serde_json::from_slice(&bytes)?;
        data.refresh_stats();
        Ok(data)
    }

    fn save(&self, data: &LearnedData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(data)?;

        // Replace the file in one step so a crash never leaves half a document
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), "learned data saved");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    saved: Option<LearnedData>,
    saves: usize,
    fail_writes: bool,
}

/// In-memory storage for tests; clones share the same state
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryStorage {
    pub fn with_data(data: LearnedData) -> Self {
        let storage = Self::default();
        storage.state.borrow_mut().saved = Some(data);
        storage
    }

    pub fn saved(&self) -> Option<LearnedData> {
        self.state.borrow().saved.clone()
    }

    pub fn saves(&self) -> usize {
        self.state.borrow().saves
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl ProgressStorage for MemoryStorage {
    fn load(&self) -> Result<LearnedData> {
        Ok(self.saved().unwrap_or_default())
    }

    fn save(&self, data: &LearnedData) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(io::Error::other("write refused").into());
        }
        state.saved = Some(data.clone());
        state.saves += 1;
        Ok(())
    }
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rocksdb::{IteratorMode, Options, WriteBatch, DB};

// Big memtables make bulk loading a lot cheaper
const WRITE_BUFFER_SIZE: usize = 256 * 1024 * 1024;

/// A persistent key-value store living in its own directory. Writes are buffered until `flush`;
/// readers only see flushed records.
///
/// `get` and `iter` only need `&self`, so many threads can read at once.
pub struct RecordStore {
    db: DB,
    path: PathBuf,
    // Kept as plain data until the flush, so the store stays Sync
    pending: Vec<(String, Vec<u8>)>,
}

impl RecordStore {
    /// Creates a fresh, empty store. Anything left at `path` from an earlier run is deleted
    /// first, and it's an error if that doesn't work.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<RecordStore> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            fs_err::remove_dir_all(&path)
                .with_context(|| format!("removing stale store {}", path.display()))?;
        }
        if path.exists() {
            bail!("{} still exists after removing it", path.display());
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_error_if_exists(true);
        opts.set_write_buffer_size(WRITE_BUFFER_SIZE);
        let db = DB::open(&opts, &path)
            .with_context(|| format!("creating store {}", path.display()))?;
        Ok(RecordStore {
            db,
            path,
            pending: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn put(&mut self, key: &str, value: &[u8]) {
        self.pending.push((key.to_string(), value.to_vec()));
    }

    /// How many writes are waiting for `flush`.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::default();
        for (key, value) in self.pending.drain(..) {
            batch.put(key.as_bytes(), value);
        }
        self.db
            .write(batch)
            .with_context(|| format!("writing to {}", self.path.display()))
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key.as_bytes())
            .with_context(|| format!("reading {} from {}", key, self.path.display()))
    }

    /// Every flushed record, in key order. Records written after this starts may or may not show
    /// up.
    pub fn iter(&self) -> impl Iterator<Item = Result<(Box<[u8]>, Box<[u8]>)>> + '_ {
        self.db
            .iterator(IteratorMode::Start)
            .map(|entry| entry.context("iterating over a store"))
    }

    /// Closes and deletes the store.
    pub fn destroy(self) -> Result<()> {
        let path = self.path;
        drop(self.db);
        DB::destroy(&Options::default(), &path)
            .with_context(|| format!("destroying store {}", path.display()))?;
        if path.exists() {
            fs_err::remove_dir_all(&path)?;
        }
        Ok(())
    }
}

use anyhow::Result;

use crate::{NeededRefs, RecordStore, TagFilter, Way, WayRecord, OSM_ID};

/// Stores every closed way with interesting tags, and remembers which nodes they need.
pub struct WayCollector<'a> {
    filter: &'a TagFilter,
    store: &'a mut RecordStore,
    needed: &'a mut dyn NeededRefs,
    flush_threshold: usize,

    pub num_stored: usize,
    pub num_unclosed: usize,
    pub num_untagged: usize,
}

impl<'a> WayCollector<'a> {
    pub fn new(
        filter: &'a TagFilter,
        store: &'a mut RecordStore,
        needed: &'a mut dyn NeededRefs,
        flush_threshold: usize,
    ) -> WayCollector<'a> {
        WayCollector {
            filter,
            store,
            needed,
            flush_threshold,
            num_stored: 0,
            num_unclosed: 0,
            num_untagged: 0,
        }
    }

    pub fn accept(&mut self, way: Way) -> Result<()> {
        if !is_closed(&way.refs) {
            self.num_unclosed += 1;
            return Ok(());
        }
        let mut tags = self.filter.filter(&way.tags);
        if tags.is_empty() {
            self.num_untagged += 1;
            return Ok(());
        }
        tags.insert(OSM_ID.to_string(), format!("way/{}", way.id));

        for id in &way.refs {
            self.needed.insert(*id);
        }
        let record = WayRecord {
            refs: way.refs,
            tags,
        };
        self.store
            .put(&way.id.to_string(), &serde_json::to_vec(&record)?);
        self.num_stored += 1;

        if self.store.pending() >= self.flush_threshold {
            self.store.flush()?;
        }
        Ok(())
    }

    /// Makes every stored way visible to readers.
    pub fn finish(&mut self) -> Result<()> {
        self.store.flush()
    }
}

/// A ring has at least 2 references and ends where it starts.
pub fn is_closed(refs: &[i64]) -> bool {
    refs.len() > 1 && refs.first() == refs.last()
}

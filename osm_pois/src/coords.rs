use anyhow::Result;

use crate::{encode_coord, Coord, NeededRefs, RecordStore};

/// Stores the position of every node some way needs. The rest are thrown away.
pub struct CoordinateCache<'a> {
    needed: &'a dyn NeededRefs,
    store: &'a mut RecordStore,
    flush_threshold: usize,

    pub num_seen: usize,
    pub num_cached: usize,
}

impl<'a> CoordinateCache<'a> {
    pub fn new(
        needed: &'a dyn NeededRefs,
        store: &'a mut RecordStore,
        flush_threshold: usize,
    ) -> CoordinateCache<'a> {
        CoordinateCache {
            needed,
            store,
            flush_threshold,
            num_seen: 0,
            num_cached: 0,
        }
    }

    pub fn accept(&mut self, coord: Coord) -> Result<()> {
        self.num_seen += 1;
        if !self.needed.contains(coord.id) {
            return Ok(());
        }
        self.store.put(
            &coord.id.to_string(),
            encode_coord(coord.lon, coord.lat).as_bytes(),
        );
        self.num_cached += 1;

        if self.store.pending() >= self.flush_threshold {
            self.store.flush()?;
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        self.store.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_coord, BucketedRefs, ExactRefs};

    fn cache_all(needed: &dyn NeededRefs, name: &str) -> RecordStore {
        let dir = crate::scratch_dir(name);
        let mut store = RecordStore::create(dir.join("coords")).unwrap();
        {
            let mut cache = CoordinateCache::new(needed, &mut store, 3);
            for id in 0..100 {
                cache
                    .accept(Coord {
                        id,
                        lon: id as f64 / 10.0,
                        lat: -(id as f64) / 10.0,
                    })
                    .unwrap();
            }
            cache.finish().unwrap();
            assert_eq!(cache.num_seen, 100);
        }
        store
    }

    #[test]
    fn only_needed_coords() {
        let mut needed = ExactRefs::default();
        for id in [3, 42, 77, 500] {
            needed.insert(id);
        }
        let store = cache_all(&needed, "coords_exact");
        assert_eq!(store.iter().count(), 3);
        let (lon, lat) = decode_coord(&store.get("42").unwrap().unwrap()).unwrap();
        assert_eq!((lon, lat), (4.2, -4.2));
        assert!(store.get("41").unwrap().is_none());
    }

    #[test]
    fn bucketed_caches_a_superset() {
        let ids = [3, 42, 77];
        let mut exact = ExactRefs::default();
        let mut bucketed = BucketedRefs::new(20);
        for id in ids {
            exact.insert(id);
            bucketed.insert(id);
        }
        let exact_store = cache_all(&exact, "coords_superset_exact");
        let bucketed_store = cache_all(&bucketed, "coords_superset_bucketed");

        for entry in exact_store.iter() {
            let (key, _) = entry.unwrap();
            let key = String::from_utf8(key.to_vec()).unwrap();
            assert!(bucketed_store.get(&key).unwrap().is_some(), "{} missing", key);
        }
        // Buckets 0, 40, and 60 each hold 20 IDs
        assert_eq!(bucketed_store.iter().count(), 60);
    }
}

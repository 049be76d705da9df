use std::collections::HashSet;

use crate::Config;

/// Remembers which node IDs some stored way refers to, so the coordinate pass knows what to cache.
/// Implementations may answer `true` for IDs that were never inserted, but never `false` for one
/// that was.
pub trait NeededRefs: Send + Sync {
    fn insert(&mut self, id: i64);
    fn contains(&self, id: i64) -> bool;
    /// How many entries are being tracked; IDs for the exact strategy, buckets for the bucketed
    /// one.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Picks the strategy matching the config.
pub fn needed_refs(config: &Config) -> Box<dyn NeededRefs> {
    if config.precache {
        Box::new(AllRefs)
    } else if config.group_size > 1 {
        Box::new(BucketedRefs::new(config.group_size))
    } else {
        Box::new(ExactRefs::default())
    }
}

#[derive(Default)]
pub struct ExactRefs {
    ids: HashSet<i64>,
}

impl NeededRefs for ExactRefs {
    fn insert(&mut self, id: i64) {
        self.ids.insert(id);
    }

    fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Only remembers `round_down(id, group_size)`. Node IDs referenced by one way tend to be close
/// together, so this uses far less memory than the exact set on big inputs.
pub struct BucketedRefs {
    group_size: i64,
    buckets: HashSet<i64>,
}

impl BucketedRefs {
    pub fn new(group_size: i64) -> BucketedRefs {
        BucketedRefs {
            group_size,
            buckets: HashSet::new(),
        }
    }
}

impl NeededRefs for BucketedRefs {
    fn insert(&mut self, id: i64) {
        self.buckets.insert(round_down(id, self.group_size));
    }

    fn contains(&self, id: i64) -> bool {
        self.buckets.contains(&round_down(id, self.group_size))
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}

/// Every coordinate is needed; nothing is tracked.
pub struct AllRefs;

impl NeededRefs for AllRefs {
    fn insert(&mut self, _: i64) {}

    fn contains(&self, _: i64) -> bool {
        true
    }

    fn len(&self) -> usize {
        0
    }
}

/// Rounds down to the nearest multiple of `group_size`, towards negative infinity. A group size
/// of 0 or 1 leaves the ID alone.
pub fn round_down(id: i64, group_size: i64) -> i64 {
    if group_size <= 1 {
        return id;
    }
    id - id.rem_euclid(group_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round_down(1234, 20), 1220);
        assert_eq!(round_down(1240, 20), 1240);
        assert_eq!(round_down(-3, 20), -20);
        assert_eq!(round_down(1234, 0), 1234);
        assert_eq!(round_down(1234, 1), 1234);
    }

    #[test]
    fn exact() {
        let mut refs = ExactRefs::default();
        for id in [5, 6, 7, 5] {
            refs.insert(id);
        }
        assert_eq!(refs.len(), 3);
        assert!(refs.contains(6));
        assert!(!refs.contains(8));
    }

    #[test]
    fn bucketed_covers_exact() {
        let ways = vec![vec![1, 2, 3, 1], vec![100, 157, 399, 100], vec![-41, -7, 12, -41]];
        let mut exact = ExactRefs::default();
        let mut bucketed = BucketedRefs::new(20);
        for refs in &ways {
            for id in refs {
                exact.insert(*id);
                bucketed.insert(*id);
            }
        }

        let mut extra = 0;
        for id in -100..500 {
            if exact.contains(id) && !bucketed.contains(id) {
                panic!("bucketed strategy forgot {}", id);
            }
            if bucketed.contains(id) && !exact.contains(id) {
                extra += 1;
            }
        }
        assert!(extra > 0);
        assert!(bucketed.len() < exact.len());
    }

    #[test]
    fn strategy_from_config() {
        let mut config = Config::default();
        config.group_size = 1;
        let mut refs = needed_refs(&config);
        refs.insert(21);
        assert!(!refs.contains(22));

        config.group_size = 20;
        let mut refs = needed_refs(&config);
        refs.insert(21);
        assert!(refs.contains(22));

        config.precache = true;
        let refs = needed_refs(&config);
        assert!(refs.contains(123_456));
        assert!(refs.is_empty());
    }
}

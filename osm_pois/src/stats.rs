use std::fmt;

use crate::Outcome;

/// What happened to everything read during one run. Dropped records aren't errors; extracts
/// routinely cut ways off from their nodes, and most OSM objects just aren't interesting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub nodes_emitted: usize,
    pub nodes_dropped: usize,

    pub ways_stored: usize,
    pub ways_unclosed: usize,
    pub ways_untagged: usize,
    /// Exact IDs or buckets, depending on the strategy
    pub needed_refs: usize,

    pub coords_seen: usize,
    pub coords_cached: usize,

    pub way_features: usize,
    pub ways_missing_coords: usize,
    pub ways_too_few_coords: usize,
    pub ways_invalid: usize,
    pub ways_degenerate: usize,

    /// How long each pass took, one line per span
    pub timings: Vec<String>,
}

impl Stats {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Feature(_) => self.way_features += 1,
            Outcome::MissingCoords => self.ways_missing_coords += 1,
            Outcome::TooFewCoords => self.ways_too_few_coords += 1,
            Outcome::Invalid => self.ways_invalid += 1,
            Outcome::Degenerate => self.ways_degenerate += 1,
        }
    }

    /// Adds up the polygon-building counters from one worker.
    pub fn absorb(&mut self, other: &Stats) {
        self.way_features += other.way_features;
        self.ways_missing_coords += other.ways_missing_coords;
        self.ways_too_few_coords += other.ways_too_few_coords;
        self.ways_invalid += other.ways_invalid;
        self.ways_degenerate += other.ways_degenerate;
    }

    pub fn total_features(&self) -> usize {
        self.nodes_emitted + self.way_features
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let p = prettyprint_usize;
        writeln!(
            f,
            "nodes: {} emitted, {} without interesting tags",
            p(self.nodes_emitted),
            p(self.nodes_dropped)
        )?;
        writeln!(
            f,
            "ways: {} stored, {} not closed, {} without interesting tags",
            p(self.ways_stored),
            p(self.ways_unclosed),
            p(self.ways_untagged)
        )?;
        writeln!(
            f,
            "coordinates: {} cached of {} ({} needed refs tracked)",
            p(self.coords_cached),
            p(self.coords_seen),
            p(self.needed_refs)
        )?;
        write!(
            f,
            "polygons: {} emitted, {} missing coordinates, {} too small, {} invalid, {} without \
             area",
            p(self.way_features),
            p(self.ways_missing_coords),
            p(self.ways_too_few_coords),
            p(self.ways_invalid),
            p(self.ways_degenerate)
        )?;
        for line in &self.timings {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

pub fn prettyprint_usize(x: usize) -> String {
    let num = format!("{}", x);
    let mut result = String::new();
    let mut i = num.len();
    for c in num.chars() {
        result.push(c);
        i -= 1;
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
    }
    result
}

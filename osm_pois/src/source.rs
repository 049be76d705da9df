use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use osmpbfreader::{OsmObj, OsmPbfReader};

use crate::Tags;

/// A node with at least one tag.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: i64,
    pub tags: Tags,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Way {
    pub id: i64,
    pub tags: Tags,
    /// Node IDs, in order
    pub refs: Vec<i64>,
}

/// The position of any node, tagged or not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
}

pub enum Element {
    Node(Node),
    Way(Way),
}

/// Somewhere OSM data can be read from, as many times as needed. Each call does one full pass
/// over the data.
pub trait Source {
    /// Visits every tagged node and every way with tags. Tags are passed along unfiltered.
    fn scan_elements(&mut self, visit: &mut dyn FnMut(Element) -> Result<()>) -> Result<()>;
    /// Visits the position of every node.
    fn scan_coords(&mut self, visit: &mut dyn FnMut(Coord) -> Result<()>) -> Result<()>;
}

/// Reads an .osm.pbf file, re-opening it for every pass.
pub struct PbfSource {
    path: PathBuf,
}

impl PbfSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<PbfSource> {
        let path = path.into();
        // Fail early, before any work starts
        fs_err::metadata(&path)?;
        Ok(PbfSource { path })
    }

    fn open(&self) -> Result<OsmPbfReader<BufReader<fs_err::File>>> {
        let file = fs_err::File::open(&self.path)?;
        Ok(OsmPbfReader::new(BufReader::new(file)))
    }
}

impl Source for PbfSource {
    fn scan_elements(&mut self, visit: &mut dyn FnMut(Element) -> Result<()>) -> Result<()> {
        let mut reader = self.open()?;
        for obj in reader.iter() {
            let obj = obj.with_context(|| format!("reading {}", self.path.display()))?;
            match obj {
                OsmObj::Node(node) => {
                    if node.tags.is_empty() {
                        continue;
                    }
                    visit(Element::Node(Node {
                        id: node.id.0,
                        tags: convert_tags(&node.tags),
                        lon: node.lon(),
                        lat: node.lat(),
                    }))?;
                }
                OsmObj::Way(way) => {
                    if way.tags.is_empty() {
                        continue;
                    }
                    visit(Element::Way(Way {
                        id: way.id.0,
                        tags: convert_tags(&way.tags),
                        refs: way.nodes.iter().map(|n| n.0).collect(),
                    }))?;
                }
                OsmObj::Relation(_) => {}
            }
        }
        Ok(())
    }

    fn scan_coords(&mut self, visit: &mut dyn FnMut(Coord) -> Result<()>) -> Result<()> {
        let mut reader = self.open()?;
        for obj in reader.iter() {
            let obj = obj.with_context(|| format!("reading {}", self.path.display()))?;
            if let OsmObj::Node(node) = obj {
                visit(Coord {
                    id: node.id.0,
                    lon: node.lon(),
                    lat: node.lat(),
                })?;
            }
        }
        Ok(())
    }
}

fn convert_tags(tags: &osmpbfreader::Tags) -> Tags {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// OSM data built up in memory. Mostly useful for tests.
#[derive(Default)]
pub struct MemorySource {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    coords: Vec<Coord>,
    num_scans: usize,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    /// Adds a node. If it has tags, it's also visited by `scan_elements`.
    pub fn node(&mut self, id: i64, lon: f64, lat: f64, tags: &[(&str, &str)]) -> &mut Self {
        self.coords.push(Coord { id, lon, lat });
        if !tags.is_empty() {
            self.nodes.push(Node {
                id,
                tags: to_tags(tags),
                lon,
                lat,
            });
        }
        self
    }

    pub fn way(&mut self, id: i64, refs: Vec<i64>, tags: &[(&str, &str)]) -> &mut Self {
        self.ways.push(Way {
            id,
            tags: to_tags(tags),
            refs,
        });
        self
    }

    /// How many passes have been made over this source.
    pub fn num_scans(&self) -> usize {
        self.num_scans
    }
}

fn to_tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Source for MemorySource {
    fn scan_elements(&mut self, visit: &mut dyn FnMut(Element) -> Result<()>) -> Result<()> {
        self.num_scans += 1;
        for node in &self.nodes {
            visit(Element::Node(node.clone()))?;
        }
        for way in &self.ways {
            if way.tags.is_empty() {
                continue;
            }
            visit(Element::Way(way.clone()))?;
        }
        Ok(())
    }

    fn scan_coords(&mut self, visit: &mut dyn FnMut(Coord) -> Result<()>) -> Result<()> {
        self.num_scans += 1;
        for coord in &self.coords {
            visit(*coord)?;
        }
        Ok(())
    }
}

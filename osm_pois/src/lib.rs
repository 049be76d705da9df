//! Turns an OpenStreetMap extract into a GeoJSON FeatureCollection of points of interest. Tagged
//! nodes become points directly; closed ways are rebuilt into polygons and represented by their
//! centroid.
//!
//! The input can be far bigger than memory, so the work is split into passes over the source.
//! Ways and the coordinates they need get spilled into two on-disk [`RecordStore`]s, and the
//! polygons are finally rebuilt in parallel from those stores. See [`Pipeline`] for the order of
//! operations.

#[macro_use]
extern crate log;

mod config;
mod coords;
mod feature;
mod geometry;
mod needed;
mod nodes;
mod output;
mod pipeline;
mod polygons;
mod source;
mod stats;
mod store;
mod tags;
mod timer;
mod ways;
mod writer;

pub use crate::config::{Config, Rule, Whitelist};
pub use crate::coords::CoordinateCache;
pub use crate::feature::{decode_coord, encode_coord, point_feature, round5};
pub use crate::geometry::{footprint, Footprint};
pub use crate::needed::{needed_refs, round_down, AllRefs, BucketedRefs, ExactRefs, NeededRefs};
pub use crate::nodes::NodeEmitter;
pub use crate::output::FeatureWriter;
pub use crate::pipeline::Pipeline;
pub use crate::polygons::{build_poi, process_ways, Outcome, WayRecord};
pub use crate::source::{Coord, Element, MemorySource, Node, PbfSource, Source, Way};
pub use crate::stats::Stats;
pub use crate::store::RecordStore;
pub use crate::tags::{filter_tags, TagFilter, Tags};
pub use crate::timer::Timer;
pub use crate::ways::WayCollector;
pub use crate::writer::ResultWriter;

/// Added to every feature, pointing back to the OSM object it came from, like `way/1234`.
pub const OSM_ID: &str = "OSM_ID";
/// Added to features built from closed ways. The polygon's area in degrees squared, times 10^6.
pub const POI_AREA: &str = "POI_AREA";

#[cfg(test)]
pub(crate) fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("osm_pois_{}_{}", name, std::process::id()));
    if dir.exists() {
        fs_err::remove_dir_all(&dir).unwrap();
    }
    fs_err::create_dir_all(&dir).unwrap();
    dir
}

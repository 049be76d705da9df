use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::stats::prettyprint_usize;
use crate::{
    needed_refs, process_ways, CoordinateCache, Config, Element, FeatureWriter, NeededRefs,
    NodeEmitter, RecordStore, Source, Stats, TagFilter, Timer, WayCollector,
};

type Output = FeatureWriter<BufWriter<fs_err::File>>;

/// Runs the whole conversion. Each pass finishes and flushes before the next one starts:
///
/// 1. Scan nodes and ways. Tagged nodes go straight to the output. Closed ways go to the way
///    store, and the node IDs they refer to are remembered.
/// 2. Scan coordinates, caching only the ones some way needs.
/// 3. Rebuild every stored way's polygon in parallel and write its centroid.
///
/// With `precache`, every coordinate is cached in a pass before the first one instead.
pub struct Pipeline {
    config: Config,
    output: PathBuf,
    work_dir: PathBuf,
    overwrite: bool,
}

impl Pipeline {
    /// The stores live in `work_dir` while this runs.
    pub fn new<P1: Into<PathBuf>, P2: Into<PathBuf>>(
        config: Config,
        output: P1,
        work_dir: P2,
    ) -> Pipeline {
        Pipeline {
            config,
            output: output.into(),
            work_dir: work_dir.into(),
            overwrite: false,
        }
    }

    /// Replace the output file if it already exists, instead of failing.
    pub fn overwrite(mut self, overwrite: bool) -> Pipeline {
        self.overwrite = overwrite;
        self
    }

    pub fn ways_path(&self) -> PathBuf {
        self.work_dir.join("ways.db")
    }

    pub fn coords_path(&self) -> PathBuf {
        self.work_dir.join("coords.db")
    }

    pub fn run(&self, source: &mut dyn Source) -> Result<Stats> {
        self.check_output()?;
        fs_err::create_dir_all(&self.work_dir)?;
        let mut ways = RecordStore::create(self.ways_path())?;
        let mut coords = RecordStore::create(self.coords_path())?;
        // Truncates anything already there
        let mut out = FeatureWriter::new(BufWriter::new(fs_err::File::create(&self.output)?))?;

        let filter = TagFilter::new(&self.config);
        let mut needed = needed_refs(&self.config);
        let mut stats = Stats::default();
        let mut timer = Timer::new("Extracting points of interest");

        if self.config.precache {
            timer.start("Caching all coordinates");
            self.cache_coords(source, needed.as_ref(), &mut coords, &mut stats)?;
            timer.stop("Caching all coordinates");
        }
        timer.start("Parsing ways and nodes");
        self.collect(
            source,
            &filter,
            &mut ways,
            needed.as_mut(),
            &mut out,
            &mut stats,
        )?;
        timer.stop("Parsing ways and nodes");
        if !self.config.precache {
            timer.start("Parsing coordinates");
            self.cache_coords(source, needed.as_ref(), &mut coords, &mut stats)?;
            timer.stop("Parsing coordinates");
        }
        // Not needed anymore, and it can be huge
        drop(needed);

        timer.start("Building polygons");
        let polygons = process_ways(&ways, &coords, &mut out, &self.config)?;
        timer.stop("Building polygons");
        stats.absorb(&polygons);
        out.finish()?;

        for store in [ways, coords] {
            let path = store.path().to_path_buf();
            if let Err(err) = store.destroy() {
                warn!("Couldn't clean up {}: {:#}", path.display(), err);
            }
        }
        info!(
            "Wrote {} features to {}",
            prettyprint_usize(stats.total_features()),
            self.output.display()
        );
        stats.timings = timer.done();
        Ok(stats)
    }

    fn check_output(&self) -> Result<()> {
        if self.output.exists() && !self.overwrite {
            bail!(
                "{} already exists. Remove or rename it, pick a different output, or overwrite it",
                self.output.display()
            );
        }
        Ok(())
    }

    fn collect(
        &self,
        source: &mut dyn Source,
        filter: &TagFilter,
        ways: &mut RecordStore,
        needed: &mut dyn NeededRefs,
        out: &mut Output,
        stats: &mut Stats,
    ) -> Result<()> {
        let mut nodes = NodeEmitter::new(filter, out, self.config.node_batch_size);
        let mut collector =
            WayCollector::new(filter, ways, needed, self.config.way_flush_threshold);
        source.scan_elements(&mut |element| match element {
            Element::Node(node) => nodes.accept(node),
            Element::Way(way) => collector.accept(way),
        })?;
        nodes.flush()?;
        collector.finish()?;

        stats.nodes_emitted = nodes.num_emitted;
        stats.nodes_dropped = nodes.num_dropped;
        stats.ways_stored = collector.num_stored;
        stats.ways_unclosed = collector.num_unclosed;
        stats.ways_untagged = collector.num_untagged;
        drop(collector);
        stats.needed_refs = needed.len();
        info!(
            "{} node features written, {} ways stored, {} needed refs tracked",
            prettyprint_usize(stats.nodes_emitted),
            prettyprint_usize(stats.ways_stored),
            prettyprint_usize(stats.needed_refs)
        );
        Ok(())
    }

    fn cache_coords(
        &self,
        source: &mut dyn Source,
        needed: &dyn NeededRefs,
        coords: &mut RecordStore,
        stats: &mut Stats,
    ) -> Result<()> {
        let mut cache = CoordinateCache::new(needed, coords, self.config.coord_flush_threshold);
        source.scan_coords(&mut |coord| cache.accept(coord))?;
        cache.finish()?;

        stats.coords_seen = cache.num_seen;
        stats.coords_cached = cache.num_cached;
        info!(
            "Cached {} of {} coordinates",
            prettyprint_usize(stats.coords_cached),
            prettyprint_usize(stats.coords_seen)
        );
        Ok(())
    }
}

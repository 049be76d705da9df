use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, RecvError, SyncSender};

use anyhow::{anyhow, bail, Context, Error, Result};
use geojson::JsonObject;
use scoped_threadpool::Pool;
use serde::{Deserialize, Serialize};

use crate::stats::prettyprint_usize;
use crate::{
    decode_coord, footprint, point_feature, Config, FeatureWriter, RecordStore, ResultWriter,
    Stats, Tags, POI_AREA,
};

/// Areas are reported in millionths of a squared degree.
const AREA_SCALE: f64 = 1_000_000.0;
/// How many jobs can be outstanding per worker.
const QUEUE_PER_WORKER: usize = 64;
const PROGRESS_EVERY: usize = 1_000_000;

/// A closed way, as kept in the way store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WayRecord {
    pub refs: Vec<i64>,
    pub tags: Tags,
}

/// What became of one stored way.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// A serialized point feature at the polygon's centroid
    Feature(String),
    /// Some node isn't in the coordinate store, usually because the extract cut it off.
    MissingCoords,
    TooFewCoords,
    /// Still invalid after trying to repair it
    Invalid,
    /// No positive area
    Degenerate,
}

/// Rebuilds one way's polygon from cached coordinates and turns it into a point feature.
pub fn build_poi(record: WayRecord, coords: &RecordStore) -> Result<Outcome> {
    let mut ring = Vec::with_capacity(record.refs.len());
    for id in &record.refs {
        match coords.get(&id.to_string())? {
            Some(raw) => ring.push(
                decode_coord(&raw).with_context(|| format!("bad coordinate for node {}", id))?,
            ),
            None => return Ok(Outcome::MissingCoords),
        }
    }
    if ring.len() < 3 {
        return Ok(Outcome::TooFewCoords);
    }

    let shape = match footprint(ring) {
        Some(shape) => shape,
        None => return Ok(Outcome::Invalid),
    };
    let area = shape.area() * AREA_SCALE;
    // Also catches NaN
    if !(area > 0.0) {
        return Ok(Outcome::Degenerate);
    }
    let (lon, lat) = match shape.centroid() {
        Some(pt) => pt,
        None => return Ok(Outcome::Degenerate),
    };

    let mut properties: JsonObject = record
        .tags
        .into_iter()
        .map(|(k, v)| (k, v.into()))
        .collect();
    properties.insert(POI_AREA.to_string(), area.into());
    Ok(Outcome::Feature(point_feature(lon, lat, properties)?))
}

/// Builds features for every stored way on a pool of workers, appending them to `out`. Only the
/// polygon counters of the result are filled out.
///
/// The way store is iterated once on the calling thread, which hands each record to the pool as
/// its own job. At most `num_workers * QUEUE_PER_WORKER` jobs are outstanding at once; each one
/// reports its counters back before another is queued. Workers only share the coordinate store,
/// which they just read, and the bounded results channel, which blocks them if the writer falls
/// behind. The writer occupies one extra thread of the pool.
pub fn process_ways<W: Write + Send>(
    ways: &RecordStore,
    coords: &RecordStore,
    out: &mut FeatureWriter<W>,
    config: &Config,
) -> Result<Stats> {
    let num_workers = config.num_workers();
    let max_in_flight = num_workers * QUEUE_PER_WORKER;
    info!("Building polygons with {} workers", num_workers);

    let (result_tx, result_rx) = sync_channel::<String>(config.result_batch_size);
    // Never more reports than jobs in flight, so sending one never blocks
    let (report_tx, report_rx) = sync_channel::<Result<Stats>>(max_in_flight);
    let (writer_tx, writer_rx) = sync_channel::<Result<usize>>(1);
    let done = AtomicBool::new(false);

    let mut pool = Pool::new((num_workers + 1) as u32);
    let (stats, failure) = pool.scoped(|scope| {
        let done = &done;
        scope.execute(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                ResultWriter::new(out, config.result_batch_size).run(result_rx, done)
            }))
            .unwrap_or_else(|_| Err(anyhow!("the result writer panicked")));
            // writer_rx outlives the pool and has room for this
            let _ = writer_tx.send(result);
        });

        let mut stats = Stats::default();
        let mut failure = None;
        let mut in_flight = 0;
        let mut dispatched = 0;
        for entry in ways.iter() {
            while in_flight >= max_in_flight {
                tally(report_rx.recv(), &mut stats, &mut failure);
                in_flight -= 1;
            }
            if failure.is_some() {
                break;
            }
            let (key, value) = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };

            let results = result_tx.clone();
            let report = report_tx.clone();
            scope.execute(move || {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    build_and_send(&key, &value, coords, &results)
                }))
                .unwrap_or_else(|_| {
                    Err(anyhow!(
                        "panicked building way {}",
                        String::from_utf8_lossy(&key)
                    ))
                });
                let _ = report.send(result);
            });
            in_flight += 1;
            dispatched += 1;
            if dispatched % PROGRESS_EVERY == 0 {
                info!("Dispatched {} ways", prettyprint_usize(dispatched));
            }
        }
        drop(result_tx);
        drop(report_tx);
        while in_flight > 0 {
            tally(report_rx.recv(), &mut stats, &mut failure);
            in_flight -= 1;
        }

        // Every job has reported, so everything they'll ever send is already in the channel
        done.store(true, Ordering::Release);
        (stats, failure)
    });

    let num_written = writer_rx
        .recv()
        .map_err(|_| anyhow!("the result writer never finished"))??;
    if let Some(err) = failure {
        return Err(err);
    }
    if num_written != stats.way_features {
        bail!(
            "workers built {} features, but only {} were written",
            stats.way_features,
            num_written
        );
    }
    Ok(stats)
}

fn tally(
    report: Result<Result<Stats>, RecvError>,
    stats: &mut Stats,
    failure: &mut Option<Error>,
) {
    match report {
        Ok(Ok(job)) => stats.absorb(&job),
        Ok(Err(err)) => {
            failure.get_or_insert(err);
        }
        Err(_) => {
            failure.get_or_insert_with(|| anyhow!("a worker quit without reporting back"));
        }
    }
}

/// One job: rebuild a stored way and pass its feature, if any, to the writer.
fn build_and_send(
    key: &[u8],
    value: &[u8],
    coords: &RecordStore,
    results: &SyncSender<String>,
) -> Result<Stats> {
    let record: WayRecord = serde_json::from_slice(value)
        .with_context(|| format!("parsing stored way {}", String::from_utf8_lossy(key)))?;
    let outcome = build_poi(record, coords)?;
    let mut stats = Stats::default();
    stats.record(&outcome);
    if let Outcome::Feature(feature) = outcome {
        if results.send(feature).is_err() {
            bail!("the result writer stopped early");
        }
    }
    Ok(stats)
}

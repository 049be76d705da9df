use std::path::PathBuf;

use osm_pois::{Config, MemorySource, Pipeline, Source};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("osm_pois_it_{}_{}", name, std::process::id()));
    if dir.exists() {
        fs_err::remove_dir_all(&dir).unwrap();
    }
    fs_err::create_dir_all(&dir).unwrap();
    dir
}

/// Runs the pipeline and returns the parsed features.
fn run(name: &str, config: Config, source: &mut dyn Source) -> (Vec<serde_json::Value>, osm_pois::Stats) {
    let dir = scratch_dir(name);
    let output = dir.join("output.geojson");
    let pipeline = Pipeline::new(config, &output, dir.join("work"));
    let stats = pipeline.run(source).unwrap();

    assert!(!pipeline.ways_path().exists());
    assert!(!pipeline.coords_path().exists());

    let raw = fs_err::read_to_string(&output).unwrap();
    let parsed: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(x) => x,
        Err(err) => panic!("{} isn't valid JSON: {}\n{}", output.display(), err, raw),
    };
    assert_eq!(parsed["type"], "FeatureCollection");
    let features = parsed["features"].as_array().unwrap().clone();
    assert_eq!(features.len(), stats.total_features());
    (features, stats)
}

fn osm_ids(features: &[serde_json::Value]) -> Vec<String> {
    let mut ids: Vec<String> = features
        .iter()
        .map(|f| f["properties"]["OSM_ID"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

/// A little town: a few POI nodes, a school building, a park cut off by the extract boundary, an
/// unclosed path, and a self-intersecting plaza.
fn town() -> MemorySource {
    let mut source = MemorySource::new();
    source
        .node(1, 0.0, 0.0, &[])
        .node(2, 0.0, 1.0, &[])
        .node(3, 1.0, 1.0, &[])
        .node(10, 5.0, 5.0, &[("shop", "bakery"), ("name", "Bread Co")])
        .node(11, 5.1, 5.1, &[("shop", "bakery")])
        .node(12, 5.2, 5.2, &[("highway", "crossing")])
        .node(20, 2.0, 2.0, &[])
        .node(21, 2.0, 3.0, &[])
        // 22 is outside the extract
        .node(30, 3.0, 3.0, &[])
        .node(31, 3.0, 4.0, &[])
        .node(40, 4.0, 4.0, &[])
        .node(41, 4.0, 4.1, &[])
        .node(42, 4.1, 4.1, &[])
        .node(43, 4.1, 4.0, &[]);
    source
        .way(100, vec![1, 2, 3, 1], &[("amenity", "school"), ("name", "Town School")])
        .way(101, vec![20, 21, 22, 20], &[("leisure", "park"), ("name", "Edge Park")])
        .way(102, vec![30, 31], &[("amenity", "school")])
        .way(103, vec![1, 2, 3, 1], &[("highway", "service")])
        // A square with its last two corners swapped
        .way(104, vec![40, 42, 41, 43, 40], &[("amenity", "marketplace"), ("name", "Plaza")]);
    source
}

#[test]
fn whole_town() {
    let mut source = town();
    let (features, stats) = run("whole_town", Config::default(), &mut source);
    assert_eq!(source.num_scans(), 2);

    assert_eq!(stats.nodes_emitted, 2);
    assert_eq!(stats.nodes_dropped, 1);
    assert_eq!(stats.ways_stored, 3);
    assert_eq!(stats.ways_unclosed, 1);
    assert_eq!(stats.ways_untagged, 1);
    assert_eq!(stats.ways_missing_coords, 1);

    let ids = osm_ids(&features);
    assert!(ids.contains(&"node/10".to_string()));
    assert!(ids.contains(&"node/11".to_string()));
    assert!(ids.contains(&"way/100".to_string()));
    assert!(!ids.contains(&"node/12".to_string()));
    assert!(!ids.contains(&"way/101".to_string()));
    assert!(!ids.contains(&"way/102".to_string()));
    assert!(!ids.contains(&"way/103".to_string()));

    let school = features
        .iter()
        .find(|f| f["properties"]["OSM_ID"] == "way/100")
        .unwrap();
    assert_eq!(
        school["geometry"]["coordinates"],
        serde_json::json!([0.33333, 0.66667])
    );
    assert!(school["properties"]["POI_AREA"].as_f64().unwrap() > 0.0);
    assert_eq!(school["properties"]["name"], "Town School");

    // The self-intersecting plaza gets repaired instead of dropped
    let plaza = match features
        .iter()
        .find(|f| f["properties"]["OSM_ID"] == "way/104")
    {
        Some(plaza) => plaza,
        None => panic!("the plaza wasn't repaired: {}", stats),
    };
    assert!(plaza["properties"]["POI_AREA"].as_f64().unwrap() > 0.0);
    let lon = plaza["geometry"]["coordinates"][0].as_f64().unwrap();
    assert!(lon > 4.0 && lon < 4.1, "plaza centroid is at {}", lon);
    assert_eq!(stats.ways_invalid, 0);
    assert_eq!(stats.way_features, 2);

    assert!(!stats.timings.is_empty());
}

#[test]
fn require_name() {
    let mut config = Config::default();
    config.require_name = true;
    let (features, _) = run("require_name", config, &mut town());
    let ids = osm_ids(&features);
    assert!(ids.contains(&"node/10".to_string()));
    assert!(!ids.contains(&"node/11".to_string()));
    assert!(ids.contains(&"way/100".to_string()));
}

#[test]
fn exact_and_bucketed_agree() {
    let mut exact = Config::default();
    exact.group_size = 0;
    let (exact_features, exact_stats) = run("exact", exact, &mut town());

    let mut bucketed = Config::default();
    bucketed.group_size = 20;
    let (bucketed_features, bucketed_stats) = run("bucketed", bucketed, &mut town());

    let mut precache = Config::default();
    precache.precache = true;
    let mut source = town();
    let (precache_features, precache_stats) = run("precache", precache, &mut source);
    assert_eq!(source.num_scans(), 2);

    // Exact mode caches exactly the refs of stored ways that exist in the extract
    assert_eq!(exact_stats.needed_refs, 10);
    assert_eq!(exact_stats.coords_cached, 9);
    assert!(bucketed_stats.coords_cached >= exact_stats.coords_cached);
    assert_eq!(precache_stats.coords_cached, precache_stats.coords_seen);

    assert_eq!(osm_ids(&exact_features), osm_ids(&bucketed_features));
    assert_eq!(osm_ids(&exact_features), osm_ids(&precache_features));
}

#[test]
fn many_features_across_batches() {
    let mut source = MemorySource::new();
    for i in 0..500 {
        source.node(i, i as f64 * 0.001, 0.0, &[("amenity", "bench")]);
    }
    for i in 0..300_i64 {
        let base = 10_000 + i * 4;
        let x = i as f64 * 0.01;
        source
            .node(base, x, 1.0, &[])
            .node(base + 1, x + 0.005, 1.0, &[])
            .node(base + 2, x + 0.005, 1.005, &[])
            .node(base + 3, x, 1.005, &[]);
        source.way(
            i,
            vec![base, base + 1, base + 2, base + 3, base],
            &[("building", "church")],
        );
    }

    let mut config = Config::default();
    config.node_batch_size = 7;
    config.way_flush_threshold = 13;
    config.coord_flush_threshold = 17;
    config.result_batch_size = 11;
    config.num_workers = Some(4);
    let (features, stats) = run("many", config, &mut source);
    assert_eq!(stats.nodes_emitted, 500);
    assert_eq!(stats.way_features, 300);
    assert_eq!(features.len(), 800);
}

#[test]
fn refuses_to_overwrite() {
    let dir = scratch_dir("overwrite");
    let output = dir.join("output.geojson");
    fs_err::write(&output, "precious").unwrap();

    let pipeline = Pipeline::new(Config::default(), &output, dir.join("work"));
    let err = pipeline.run(&mut town()).unwrap_err();
    assert!(err.to_string().contains("already exists"), "{}", err);
    assert_eq!(fs_err::read_to_string(&output).unwrap(), "precious");

    let pipeline = pipeline.overwrite(true);
    pipeline.run(&mut town()).unwrap();
    let raw = fs_err::read_to_string(&output).unwrap();
    serde_json::from_str::<serde_json::Value>(&raw).unwrap();
}

#[test]
fn stale_stores_are_replaced() {
    let dir = scratch_dir("stale");
    let output = dir.join("output.geojson");
    let pipeline = Pipeline::new(Config::default(), &output, dir.join("work"));
    // Leftovers from a crashed run
    fs_err::create_dir_all(pipeline.ways_path()).unwrap();
    fs_err::write(pipeline.ways_path().join("junk"), "junk").unwrap();

    let stats = pipeline.run(&mut town()).unwrap();
    assert_eq!(stats.ways_stored, 3);
}

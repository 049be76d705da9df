//! Extracts points of interest from an .osm.pbf file into a GeoJSON FeatureCollection. Tagged
//! nodes are kept as points; closed ways like buildings and parks become a point at their
//! centroid.

#[macro_use]
extern crate log;

use std::time::Instant;

use anyhow::Result;
use structopt::StructOpt;

use osm_pois::{Config, PbfSource, Pipeline, Whitelist};

#[derive(StructOpt)]
#[structopt(name = "osmpois", about = "Extract points of interest from OpenStreetMap data")]
struct Args {
    /// The .osm.pbf file to read
    #[structopt()]
    source: String,
    /// Where to write the results. `.geojson` gets added on.
    #[structopt(long, default_value = "output")]
    output: String,
    /// Overwrite the output file if it already exists
    #[structopt(long)]
    overwrite: bool,
    /// Only output things that have a `name` tag
    #[structopt(long)]
    require_name: bool,
    /// How large of a group of node IDs to track at once when remembering which coordinates ways
    /// need. Lower uses more RAM, higher caches more coordinates to disk. 0 or 1 tracks exact IDs.
    /// Defaults to 20.
    #[structopt(long = "groupsize")]
    group_size: Option<i64>,
    /// Cache every coordinate, skipping the bookkeeping of which ones are needed. Saves RAM, costs
    /// disk.
    #[structopt(long)]
    precache: bool,
    /// Comma-separated keys that aren't worth a feature when they're the only tag left, like
    /// `building`
    #[structopt(long, use_delimiter = true)]
    remove_lonely_keys: Vec<String>,
    /// A JSON file mapping OSM keys to "*" or a list of values to keep. Defaults to a built-in
    /// list.
    #[structopt(long)]
    tags: Option<String>,
    /// A JSON file with any other settings
    #[structopt(long)]
    config: Option<String>,
    /// Where to keep the temporary stores
    #[structopt(long, default_value = ".")]
    work_dir: String,
    /// How many threads build polygons. Defaults to the number of CPUs.
    #[structopt(long)]
    workers: Option<usize>,
    /// Print detailed counts of everything kept and dropped
    #[structopt(long)]
    profile: bool,
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::load(path)?,
            None => Config::default(),
        };
        config.require_name |= self.require_name;
        config.precache |= self.precache;
        if let Some(group_size) = self.group_size {
            config.group_size = group_size;
        }
        if !self.remove_lonely_keys.is_empty() {
            config.remove_lonely_keys = Some(self.remove_lonely_keys.iter().cloned().collect());
        }
        if let Some(ref path) = self.tags {
            config.whitelist = Whitelist::load(path)?;
        }
        if self.workers.is_some() {
            config.num_workers = self.workers;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    setup_logging();
    let args = Args::from_args();
    let started = Instant::now();

    let config = args.config()?;
    let output = format!("{}.geojson", args.output);
    let mut source = PbfSource::new(&args.source)?;
    let stats = Pipeline::new(config, &output, &args.work_dir)
        .overwrite(args.overwrite)
        .run(&mut source)?;

    if args.profile {
        for line in stats.to_string().lines() {
            info!("{}", line);
        }
        info!("Took {:.1}s", started.elapsed().as_secs_f64());
    }
    println!("saved as: {}", output);
    Ok(())
}

/// Logs at info by default; override with RUST_LOG.
fn setup_logging() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_iter_safe(std::iter::once("osmpois").chain(args.iter().cloned())).unwrap()
    }

    #[test]
    fn config_file_settings_survive() {
        let path = std::env::temp_dir().join(format!("osmpois_cli_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"group_size": 0, "precache": true}"#).unwrap();
        let path = path.display().to_string();

        let config = parse(&["x.pbf", "--config", path.as_str()]).config().unwrap();
        assert_eq!(config.group_size, 0);
        assert!(config.precache);

        let config = parse(&["x.pbf", "--config", path.as_str(), "--groupsize", "50"])
            .config()
            .unwrap();
        assert_eq!(config.group_size, 50);
    }

    #[test]
    fn flags() {
        let config = parse(&["x.pbf"]).config().unwrap();
        assert_eq!(config.group_size, 20);
        assert!(config.remove_lonely_keys.is_none());

        let args = parse(&[
            "x.pbf",
            "--require-name",
            "--remove-lonely-keys",
            "building,name",
            "--workers",
            "3",
        ]);
        let config = args.config().unwrap();
        assert!(config.require_name);
        let lonely = config.remove_lonely_keys.as_ref().unwrap();
        assert!(lonely.contains("building") && lonely.contains("name"));
        assert_eq!(lonely.len(), 2);
        assert_eq!(config.num_workers(), 3);
    }
}

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Keys kept with any value
const ANY_VALUE: &[&str] = &[
    "name",
    "addr:housenumber",
    "addr:street",
    "addr:city",
    "addr:postcode",
    "opening_hours",
    "website",
    "phone",
    "wheelchair",
    "cuisine",
    "religion",
    "operator",
    "brand",
    "amenity",
    "shop",
    "tourism",
    "leisure",
    "historic",
    "office",
    "craft",
    "healthcare",
    "sport",
];

/// Keys kept only with one of these values
const SOME_VALUES: &[(&str, &[&str])] = &[
    ("aeroway", &["aerodrome", "terminal", "helipad"]),
    ("railway", &["station", "halt", "tram_stop", "subway_entrance"]),
    ("public_transport", &["station"]),
    (
        "man_made",
        &["lighthouse", "windmill", "tower", "water_tower", "observatory"],
    ),
    (
        "natural",
        &["peak", "volcano", "cave_entrance", "spring", "beach"],
    ),
    (
        "place",
        &[
            "city",
            "town",
            "village",
            "hamlet",
            "suburb",
            "neighbourhood",
            "island",
        ],
    ),
    ("landuse", &["cemetery", "recreation_ground", "religious"]),
    (
        "building",
        &[
            "church",
            "cathedral",
            "chapel",
            "mosque",
            "synagogue",
            "temple",
            "school",
            "university",
            "hospital",
            "stadium",
            "train_station",
            "civic",
            "public",
            "museum",
            "hotel",
            "retail",
            "commercial",
            "office",
        ],
    ),
];

/// Everything that changes what a run produces or how hard it works. The CLI fills this in from
/// flags, but it can also be loaded from JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Drop every node and way without a `name` tag.
    pub require_name: bool,
    /// If only one tag survives filtering and it's one of these, drop that tag too. A lone
    /// `building=yes` isn't much of a point of interest.
    pub remove_lonely_keys: Option<BTreeSet<String>>,
    /// How coarsely to remember which node IDs ways need. 0 or 1 tracks exact IDs; bigger groups
    /// use less memory, but cache more coordinates to disk.
    pub group_size: i64,
    /// Cache every coordinate without tracking which ones ways need.
    pub precache: bool,
    pub whitelist: Whitelist,

    /// Node features are buffered until there are more than this many.
    pub node_batch_size: usize,
    /// Buffered writes to the way store are flushed after this many records.
    pub way_flush_threshold: usize,
    /// Buffered writes to the coordinate store are flushed after this many records.
    pub coord_flush_threshold: usize,
    /// The most features the result writer appends in one go.
    pub result_batch_size: usize,
    /// Defaults to the number of CPUs.
    pub num_workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            require_name: false,
            remove_lonely_keys: None,
            group_size: 20,
            precache: false,
            whitelist: Whitelist::default(),
            node_batch_size: 10_000,
            way_flush_threshold: 100_000,
            coord_flush_threshold: 1_000_000,
            result_batch_size: 10_000,
            num_workers: None,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Config> {
        let raw = fs_err::read_to_string(path)?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path))
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Which values of a whitelisted key are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum Rule {
    /// Written as `"*"`
    Any,
    OneOf(BTreeSet<String>),
}

impl Rule {
    pub fn allows(&self, value: &str) -> bool {
        match self {
            Rule::Any => true,
            Rule::OneOf(values) => values.contains(value),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Wildcard(String),
    Values(BTreeSet<String>),
}

impl TryFrom<RawRule> for Rule {
    type Error = anyhow::Error;

    fn try_from(raw: RawRule) -> Result<Rule> {
        match raw {
            RawRule::Wildcard(x) if x == "*" => Ok(Rule::Any),
            RawRule::Wildcard(x) => bail!("a tag rule must be \"*\" or a list of values, not {:?}", x),
            RawRule::Values(values) => Ok(Rule::OneOf(values)),
        }
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> RawRule {
        match rule {
            Rule::Any => RawRule::Wildcard("*".to_string()),
            Rule::OneOf(values) => RawRule::Values(values),
        }
    }
}

/// The OSM keys worth keeping, and for some, the only values worth keeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist(pub BTreeMap<String, Rule>);

impl Whitelist {
    pub fn load(path: &str) -> Result<Whitelist> {
        let raw = fs_err::read_to_string(path)?;
        serde_json::from_str(&raw).with_context(|| format!("parsing tag whitelist {}", path))
    }

    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.0.get(key)
    }
}

impl Default for Whitelist {
    fn default() -> Whitelist {
        let mut rules = BTreeMap::new();
        for key in ANY_VALUE {
            rules.insert(key.to_string(), Rule::Any);
        }
        for (key, values) in SOME_VALUES {
            rules.insert(
                key.to_string(),
                Rule::OneOf(values.iter().map(|v| v.to_string()).collect()),
            );
        }
        Whitelist(rules)
    }
}

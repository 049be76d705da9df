use std::collections::{BTreeMap, BTreeSet};

use crate::{Config, Whitelist};

pub type Tags = BTreeMap<String, String>;

/// Decides which tags of a node or way are worth keeping.
#[derive(Clone, Debug)]
pub struct TagFilter {
    pub require_name: bool,
    pub whitelist: Whitelist,
    pub remove_lonely_keys: Option<BTreeSet<String>>,
}

impl TagFilter {
    pub fn new(config: &Config) -> TagFilter {
        TagFilter {
            require_name: config.require_name,
            whitelist: config.whitelist.clone(),
            remove_lonely_keys: config.remove_lonely_keys.clone(),
        }
    }

    pub fn filter(&self, tags: &Tags) -> Tags {
        filter_tags(
            tags,
            self.require_name,
            &self.whitelist,
            self.remove_lonely_keys.as_ref(),
        )
    }
}

/// Returns the subset of `tags` to keep. An empty result means the object isn't interesting.
///
/// When `require_name` is set, `name` is kept even if the whitelist doesn't mention it;
/// otherwise filtering the result again would drop everything.
pub fn filter_tags(
    tags: &Tags,
    require_name: bool,
    whitelist: &Whitelist,
    remove_lonely_keys: Option<&BTreeSet<String>>,
) -> Tags {
    if require_name && !tags.contains_key("name") {
        return Tags::new();
    }

    let mut result: Tags = tags
        .iter()
        .filter(|(k, v)| match whitelist.get(k) {
            Some(rule) => rule.allows(v),
            None => require_name && k.as_str() == "name",
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if let Some(lonely) = remove_lonely_keys {
        if result.len() == 1 && result.keys().all(|k| lonely.contains(k)) {
            result.clear();
        }
    }
    result
}

use std::io::Write;

use anyhow::Result;
use geojson::JsonObject;

use crate::{point_feature, FeatureWriter, Node, TagFilter, OSM_ID};

/// Turns tagged nodes straight into point features, writing them out in batches.
pub struct NodeEmitter<'a, W: Write> {
    filter: &'a TagFilter,
    out: &'a mut FeatureWriter<W>,
    batch: Vec<String>,
    batch_size: usize,

    pub num_emitted: usize,
    pub num_dropped: usize,
}

impl<'a, W: Write> NodeEmitter<'a, W> {
    pub fn new(
        filter: &'a TagFilter,
        out: &'a mut FeatureWriter<W>,
        batch_size: usize,
    ) -> NodeEmitter<'a, W> {
        NodeEmitter {
            filter,
            out,
            batch: Vec::new(),
            batch_size,
            num_emitted: 0,
            num_dropped: 0,
        }
    }

    pub fn accept(&mut self, node: Node) -> Result<()> {
        let tags = self.filter.filter(&node.tags);
        if tags.is_empty() {
            self.num_dropped += 1;
            return Ok(());
        }

        let mut properties: JsonObject = tags.into_iter().map(|(k, v)| (k, v.into())).collect();
        properties.insert(OSM_ID.to_string(), format!("node/{}", node.id).into());
        self.batch
            .push(point_feature(node.lon, node.lat, properties)?);
        self.num_emitted += 1;

        if self.batch.len() > self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes any buffered features. Must be called once all nodes are done.
    pub fn flush(&mut self) -> Result<()> {
        self.out.write_batch(&self.batch)?;
        self.batch.clear();
        Ok(())
    }

    #[cfg(test)]
    fn num_buffered(&self) -> usize {
        self.batch.len()
    }
}

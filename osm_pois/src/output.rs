use std::io::Write;

use anyhow::Result;

const HEADER: &str = "{\"type\": \"FeatureCollection\", \"features\": [\n";
const SEPARATOR: &str = ",\n";
const FOOTER: &str = "\n]}";

/// Appends serialized features to one GeoJSON FeatureCollection. Features are written in
/// batches, and every batch leaves the array well-formed up to that point: there's exactly one
/// separator between neighboring features, no matter which batch they came from.
pub struct FeatureWriter<W: Write> {
    out: W,
    num_written: usize,
}

impl<W: Write> FeatureWriter<W> {
    /// Writes the opening of the FeatureCollection.
    pub fn new(mut out: W) -> Result<FeatureWriter<W>> {
        out.write_all(HEADER.as_bytes())?;
        Ok(FeatureWriter {
            out,
            num_written: 0,
        })
    }

    pub fn write_batch(&mut self, features: &[String]) -> Result<()> {
        if features.is_empty() {
            return Ok(());
        }
        if self.num_written > 0 {
            self.out.write_all(SEPARATOR.as_bytes())?;
        }
        self.out.write_all(features.join(SEPARATOR).as_bytes())?;
        self.out.flush()?;
        self.num_written += features.len();
        Ok(())
    }

    pub fn num_written(&self) -> usize {
        self.num_written
    }

    /// Closes the array and the object, returning the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.write_all(FOOTER.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }
}

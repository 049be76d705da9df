use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use anyhow::Result;

use crate::FeatureWriter;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The only consumer of features produced by the polygon workers, so it's the only thing deciding
/// where separators go while they run.
pub struct ResultWriter<'a, W: Write> {
    out: &'a mut FeatureWriter<W>,
    max_batch: usize,
    num_written: usize,
}

impl<'a, W: Write> ResultWriter<'a, W> {
    pub fn new(out: &'a mut FeatureWriter<W>, max_batch: usize) -> ResultWriter<'a, W> {
        ResultWriter {
            out,
            max_batch: max_batch.max(1),
            num_written: 0,
        }
    }

    /// Keeps appending whatever is available until `done` has been raised and nothing is left,
    /// or until every sender is gone. Returns how many features were written.
    pub fn run(mut self, results: Receiver<String>, done: &AtomicBool) -> Result<usize> {
        let mut batch = Vec::new();
        loop {
            // Read the signal before draining. Anything sent before it was raised is already in
            // the channel, so an empty drain after this means there's nothing more coming.
            let finished = done.load(Ordering::Acquire);

            let mut disconnected = false;
            while batch.len() < self.max_batch {
                match results.try_recv() {
                    Ok(feature) => batch.push(feature),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }

            let drained = batch.len();
            if drained > 0 {
                self.out.write_batch(&batch)?;
                self.num_written += drained;
                batch.clear();
            }
            if disconnected || (finished && drained == 0) {
                return Ok(self.num_written);
            }

            if drained == 0 {
                match results.recv_timeout(POLL_INTERVAL) {
                    Ok(feature) => batch.push(feature),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return Ok(self.num_written),
                }
            }
        }
    }
}

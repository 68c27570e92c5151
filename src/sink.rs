use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, error};

use crate::channel::TransferChannel;

/// Destination for records leaving the channel.
pub trait RecordSink<T> {
    /// Write one record. The sink owns the record from here on and drops it
    /// once written.
    fn write_record(&mut self, record: T) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: u64,
    pub failed: u64,
}

/// Receive from `channel` until it is closed and empty, writing every record
/// in FIFO order.
///
/// A failed write is logged and counted; draining continues so that every
/// record is dequeued exactly once.
pub fn drain<T, S: RecordSink<T>>(channel: &TransferChannel<T>, sink: &mut S) -> WriteSummary {
    let mut summary = WriteSummary::default();
    while let Some(record) = channel.try_pop_or_wait() {
        match sink.write_record(record) {
            Ok(()) => summary.written += 1,
            Err(e) => {
                error!("Failed to write record: {:#}", e);
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Handle to the running writer thread.
pub struct WriterThread {
    handle: JoinHandle<Result<WriteSummary>>,
}

impl WriterThread {
    /// Start the writer thread.
    ///
    /// `open` runs on the writer thread, so the sink itself need not be
    /// `Send`. This call returns only after `open` has finished: if it failed,
    /// its error is returned here and no thread is left running.
    pub fn spawn<T, S, F>(channel: Arc<TransferChannel<T>>, open: F) -> Result<Self>
    where
        T: Send + 'static,
        S: RecordSink<T>,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (opened_tx, opened_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("writer".to_string())
            .spawn(move || -> Result<WriteSummary> {
                let mut sink = open()?;
                // The receiver only disappears if the spawning thread is gone.
                let _ = opened_tx.send(());
                debug!("Writer thread ready");
                Ok(drain(&channel, &mut sink))
            })
            .context("Failed to spawn writer thread")?;

        match opened_rx.recv() {
            Ok(()) => Ok(WriterThread { handle }),
            Err(_) => match join_writer(handle) {
                Err(e) => Err(e),
                Ok(_) => Err(anyhow!("Writer thread exited before opening its output")),
            },
        }
    }

    /// Wait for the writer to drain the (closed) channel.
    ///
    /// Fails if any record could not be written.
    pub fn join(self) -> Result<WriteSummary> {
        let summary = join_writer(self.handle)?;
        if summary.failed > 0 {
            bail!(
                "{} of {} records could not be written",
                summary.failed,
                summary.failed + summary.written
            );
        }
        Ok(summary)
    }
}

fn join_writer(handle: JoinHandle<Result<WriteSummary>>) -> Result<WriteSummary> {
    handle
        .join()
        .map_err(|_| anyhow!("Writer thread panicked"))?
}

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use crate::channel::TransferChannel;
use crate::context::SessionContext;
use crate::filter::{apply, evaluate, Decision, DropReason, FilterConfig};
use crate::params::Params;
use crate::reader::VariantReader;
use crate::record::{Record, VariantRecord};
use crate::rewrite::{drop_allele, drop_allele_depths};
use crate::sink::WriterThread;
use crate::writer::{build_index, OutputFormat, VariantWriter};

/// Records between two progress lines.
pub const PROGRESS_INTERVAL: u64 = 20_000;

/// Chooses the allele, if any, to remove from a record before filtering.
pub trait AllelePolicy {
    fn allele_to_drop(&self, record: &VariantRecord, ctx: &SessionContext) -> Option<usize>;
}

/// Never removes an allele.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAllAlleles;

impl AllelePolicy for KeepAllAlleles {
    fn allele_to_drop(&self, _record: &VariantRecord, _ctx: &SessionContext) -> Option<usize> {
        None
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub decoded: u64,
    pub kept: u64,
    pub rewritten: u64,
    pub dropped: BTreeMap<DropReason, u64>,
    pub written: u64,
}

impl RunSummary {
    pub fn total_dropped(&self) -> u64 {
        self.dropped.values().sum()
    }
}

/// Run every record through the allele policy and the filter, pushing kept
/// records into `channel` in input order.
///
/// Does not close the channel.
pub fn filter_records<I, P>(
    records: I,
    ctx: &mut SessionContext,
    config: &FilterConfig,
    policy: &P,
    channel: &TransferChannel<VariantRecord>,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Result<VariantRecord>>,
    P: AllelePolicy + ?Sized,
{
    let mut summary = RunSummary::default();
    for record in records {
        let mut record = record?;
        ctx.begin_record(&record);
        summary.decoded += 1;
        debug!(
            "Evaluating {}:{} with {} alleles",
            record.chrom(),
            record.pos(),
            ctx.allele_count
        );
        if summary.decoded % PROGRESS_INTERVAL == 0 {
            info!("Current location: {}:{}", record.chrom(), record.pos());
        }

        if let Some(drop_idx) = policy.allele_to_drop(&record, ctx) {
            drop_allele(&mut record, ctx, drop_idx)
                .with_context(|| format!("At {}:{}", record.chrom(), record.pos()))?;
            drop_allele_depths(&mut record, drop_idx);
            summary.rewritten += 1;
        }

        match evaluate(&record, ctx, config) {
            Decision::Drop(reason) => {
                match reason {
                    DropReason::MissingAlleleFrequency => warn!(
                        "AF field not found or empty at {}:{}",
                        record.chrom(),
                        record.pos()
                    ),
                    DropReason::MissingAlleleNumber => warn!(
                        "AN field not found at {}:{}, record skipped",
                        record.chrom(),
                        record.pos()
                    ),
                    _ => {}
                }
                *summary.dropped.entry(reason).or_default() += 1;
            }
            Decision::Keep(retained) => {
                let stripped = apply(&mut record, &retained);
                debug!(
                    "Keeping {}:{}, removed {} INFO and {} FORMAT fields",
                    record.chrom(),
                    record.pos(),
                    stripped.info,
                    stripped.format
                );
                channel
                    .push(record)
                    .map_err(|_| anyhow!("Writer stopped before all records were queued"))?;
                summary.kept += 1;
            }
        }
    }
    Ok(summary)
}

/// Filter `params.input` into `params.output` and index the result.
pub fn run(params: &Params) -> Result<RunSummary> {
    let start = Instant::now();
    info!("Start!");

    let reader = VariantReader::from_path(&params.input)?;
    let mut ctx = SessionContext::new(reader.sample_count());
    info!("N sample: {}", ctx.sample_count);
    let config = params.filter_config();

    let channel = Arc::new(TransferChannel::new());
    let writer = {
        let input = params.input.clone();
        let output = params.output.clone();
        let keep_fields = config.keep_fields.clone();
        WriterThread::spawn(Arc::clone(&channel), move || {
            VariantWriter::create(&input, &output, &keep_fields)
        })?
    };

    let produced = filter_records(reader, &mut ctx, &config, &KeepAllAlleles, &channel);
    channel.close();
    let written = writer.join();
    let mut summary = produced?;
    summary.written = written?.written;

    for (reason, count) in &summary.dropped {
        info!("Dropped by {}: {}", reason, count);
    }
    info!(
        "Records read: {}, kept: {}, written: {}",
        summary.decoded, summary.kept, summary.written
    );

    build_index(&params.output, OutputFormat::from_path(&params.output))?;
    info!(
        "Total running time: {:.3}s",
        start.elapsed().as_secs_f64()
    );
    Ok(summary)
}

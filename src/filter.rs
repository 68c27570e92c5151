use std::collections::HashSet;

use strum::{Display, EnumIter};

use crate::context::SessionContext;
use crate::record::{Record, VariantRecord};
use crate::types::FileType;

/// Per-sample fields removed from every kept record.
pub const DROPPED_FORMAT_FIELDS: [&str; 8] =
    ["GQ", "PGT", "PID", "PL", "MIN_DP", "RGQ", "SB", "PS"];

/// INFO fields retained when no other set is configured.
pub const DEFAULT_KEEP_FIELDS: [&str; 4] = ["AC", "AF", "AN", "DP"];

/// Numeric limits of the hard filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Drop when QUAL < this.
    pub min_qual: f64,
    /// Drop when QD < this.
    pub min_qual_by_depth: f64,
    /// Drop when FS > this.
    pub max_fisher_strand: f64,
    /// Drop when ReadPosRankSum < this.
    pub min_read_pos_rank_sum: f64,
    /// Drop when MQ < this. SNP only.
    pub min_mapping_quality: Option<f64>,
    /// Drop when MQRankSum < this. SNP only.
    pub min_mapping_quality_rank_sum: Option<f64>,
    /// Drop when every AF value is <= this.
    pub min_allele_frequency: f64,
    /// Drop when 1 - AN / (2 * samples) > this.
    pub max_missing_rate: f64,
}

impl Thresholds {
    pub fn for_file_type(file_type: FileType) -> Self {
        match file_type {
            FileType::Snp => Thresholds {
                min_qual: 30.0,
                min_qual_by_depth: 2.0,
                max_fisher_strand: 60.0,
                min_read_pos_rank_sum: -8.0,
                min_mapping_quality: Some(40.0),
                min_mapping_quality_rank_sum: Some(-12.5),
                min_allele_frequency: 0.01,
                max_missing_rate: 0.01,
            },
            FileType::Indel => Thresholds {
                min_qual: 30.0,
                min_qual_by_depth: 2.0,
                max_fisher_strand: 200.0,
                min_read_pos_rank_sum: -20.0,
                min_mapping_quality: None,
                min_mapping_quality_rank_sum: None,
                min_allele_frequency: 0.01,
                max_missing_rate: 0.01,
            },
        }
    }
}

/// Immutable filter settings for one run.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub file_type: FileType,
    pub keep_fields: HashSet<String>,
    pub thresholds: Thresholds,
}

impl FilterConfig {
    pub fn new<I, S>(file_type: FileType, keep_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file_type,
            keep_fields: keep_fields.into_iter().map(Into::into).collect(),
            thresholds: Thresholds::for_file_type(file_type),
        }
    }

    /// Config retaining [`DEFAULT_KEEP_FIELDS`].
    pub fn with_default_fields(file_type: FileType) -> Self {
        Self::new(file_type, DEFAULT_KEEP_FIELDS)
    }
}

/// The rule that caused a record to be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum DropReason {
    #[strum(serialize = "QUAL")]
    LowQual,
    #[strum(serialize = "QD")]
    LowQualByDepth,
    #[strum(serialize = "FS")]
    StrandBias,
    #[strum(serialize = "ReadPosRankSum")]
    ReadPosRankSum,
    #[strum(serialize = "MQ")]
    LowMappingQuality,
    #[strum(serialize = "MQRankSum")]
    MappingQualityRankSum,
    #[strum(serialize = "AF missing")]
    MissingAlleleFrequency,
    #[strum(serialize = "AF")]
    LowAlleleFrequency,
    #[strum(serialize = "AN missing")]
    MissingAlleleNumber,
    #[strum(serialize = "missing rate")]
    HighMissingRate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Keep the record; the listed INFO keys survive stripping.
    Keep(Vec<String>),
    Drop(DropReason),
}

impl Decision {
    pub fn is_keep(&self) -> bool {
        matches!(self, Decision::Keep(_))
    }
}

fn first_value<R: Record + ?Sized>(record: &R, tag: &str) -> Option<f64> {
    record
        .info(tag)
        .and_then(|values| values.floats().first().copied())
}

fn below(value: Option<f64>, limit: f64) -> bool {
    value.map_or(false, |v| v < limit)
}

fn above(value: Option<f64>, limit: f64) -> bool {
    value.map_or(false, |v| v > limit)
}

/// `1 - AN / (2 * samples) > max_rate`, compared on whole allele counts.
fn too_many_missing(allele_number: f64, sample_count: usize, max_rate: f64) -> bool {
    let total = 2 * sample_count as i64;
    let missing = total - allele_number.round() as i64;
    let allowed = (max_rate * total as f64).floor() as i64;
    missing > allowed
}

/// Decide whether `record` survives the hard filter.
///
/// Pure: the record is not touched; see [`apply`] for the stripping step.
///
/// # Examples
///
/// ```
/// use filtersnp::context::SessionContext;
/// use filtersnp::filter::{evaluate, Decision, DropReason, FilterConfig};
/// use filtersnp::record::VariantRecord;
/// use filtersnp::types::{FileType, TypedVec};
///
/// let config = FilterConfig::with_default_fields(FileType::Snp);
/// let mut ctx = SessionContext::new(10);
/// let record = VariantRecord::new("chr1", 100, vec![b"A".to_vec(), b"T".to_vec()])
///     .with_qual(Some(29.9))
///     .with_info("AF", TypedVec::Float32(vec![0.5]))
///     .with_info("AN", TypedVec::Int32(vec![20]));
/// ctx.begin_record(&record);
/// assert_eq!(evaluate(&record, &ctx, &config), Decision::Drop(DropReason::LowQual));
/// ```
pub fn evaluate<R: Record + ?Sized>(
    record: &R,
    ctx: &SessionContext,
    config: &FilterConfig,
) -> Decision {
    let t = &config.thresholds;

    if below(record.qual().map(f64::from), t.min_qual) {
        return Decision::Drop(DropReason::LowQual);
    }
    if below(first_value(record, "QD"), t.min_qual_by_depth) {
        return Decision::Drop(DropReason::LowQualByDepth);
    }
    if above(first_value(record, "FS"), t.max_fisher_strand) {
        return Decision::Drop(DropReason::StrandBias);
    }
    if below(first_value(record, "ReadPosRankSum"), t.min_read_pos_rank_sum) {
        return Decision::Drop(DropReason::ReadPosRankSum);
    }
    if let Some(min_mq) = t.min_mapping_quality {
        if below(first_value(record, "MQ"), min_mq) {
            return Decision::Drop(DropReason::LowMappingQuality);
        }
    }
    if let Some(min_mq_rank_sum) = t.min_mapping_quality_rank_sum {
        if below(first_value(record, "MQRankSum"), min_mq_rank_sum) {
            return Decision::Drop(DropReason::MappingQualityRankSum);
        }
    }

    let allele_frequencies = record.info("AF").map(|v| v.floats()).unwrap_or_default();
    if allele_frequencies.is_empty() {
        return Decision::Drop(DropReason::MissingAlleleFrequency);
    }
    if allele_frequencies
        .iter()
        .all(|&af| af <= t.min_allele_frequency)
    {
        return Decision::Drop(DropReason::LowAlleleFrequency);
    }

    let allele_number = match first_value(record, "AN") {
        Some(an) => an,
        None => return Decision::Drop(DropReason::MissingAlleleNumber),
    };
    if ctx.sample_count > 0 && too_many_missing(allele_number, ctx.sample_count, t.max_missing_rate)
    {
        return Decision::Drop(DropReason::HighMissingRate);
    }

    let retained = record
        .info_keys()
        .into_iter()
        .filter(|&key| config.keep_fields.contains(key))
        .map(str::to_owned)
        .collect();
    Decision::Keep(retained)
}

/// What [`apply`] removed from a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stripped {
    pub info: usize,
    pub format: usize,
}

/// Strip a kept record down to `retained` INFO keys and remove
/// [`DROPPED_FORMAT_FIELDS`]. Alleles are never touched.
pub fn apply(record: &mut VariantRecord, retained: &[String]) -> Stripped {
    let doomed: Vec<String> = record
        .info_fields()
        .keys()
        .filter(|&key| !retained.iter().any(|r| r == key))
        .cloned()
        .collect();
    let info = doomed
        .iter()
        .filter(|key| record.remove_info(key))
        .count();
    let format = DROPPED_FORMAT_FIELDS
        .iter()
        .filter(|tag| record.remove_format(tag))
        .count();
    Stripped { info, format }
}

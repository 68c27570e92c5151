use crate::record::VariantRecord;

/// Per-source constants and per-record scratch values.
///
/// Owned by the decoding thread only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Number of samples in the source header, fixed for the whole run.
    pub sample_count: usize,
    /// Allele count (REF included) of the record being processed.
    pub allele_count: usize,
}

impl SessionContext {
    pub fn new(sample_count: usize) -> Self {
        Self {
            sample_count,
            allele_count: 0,
        }
    }

    /// Refresh the per-record values before any filter or rewrite step runs.
    pub fn begin_record(&mut self, record: &VariantRecord) {
        self.allele_count = record.allele_count();
    }
}

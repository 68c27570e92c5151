use thiserror::Error;

use crate::context::SessionContext;
use crate::record::{GenotypeAllele, VariantRecord};
use crate::types::TypedVec;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteError {
    #[error("drop index {drop_idx} out of range for {allele_count} alleles")]
    OutOfRange { drop_idx: usize, allele_count: usize },
}

/// Remove the allele at `drop_idx` and remap every sample's genotype.
///
/// A sample that called the dropped allele becomes `0/0`, unphased. In every
/// other sample, calls above `drop_idx` shift down by one and keep their
/// phase. `ctx.allele_count` is decremented on success. `AD` is left alone;
/// see [`drop_allele_depths`].
///
/// # Examples
///
/// ```
/// use filtersnp::context::SessionContext;
/// use filtersnp::record::{Genotype, Record, VariantRecord};
/// use filtersnp::rewrite::drop_allele;
///
/// let mut record = VariantRecord::new(
///     "chr1",
///     100,
///     vec![b"A".to_vec(), b"T".to_vec(), b"G".to_vec()],
/// )
/// .with_genotypes(vec![Genotype::diploid(1, 2, false), Genotype::diploid(0, 2, false)]);
/// let mut ctx = SessionContext::new(2);
/// ctx.begin_record(&record);
///
/// drop_allele(&mut record, &mut ctx, 1).unwrap();
/// assert_eq!(record.alleles(), &vec![b"A".to_vec(), b"G".to_vec()]);
/// assert_eq!(record.genotypes()[0].to_string(), "0/0");
/// assert_eq!(record.genotypes()[1].to_string(), "0/1");
/// ```
pub fn drop_allele(
    record: &mut VariantRecord,
    ctx: &mut SessionContext,
    drop_idx: usize,
) -> Result<(), RewriteError> {
    let allele_count = ctx.allele_count;
    if drop_idx >= allele_count || drop_idx >= record.allele_count() {
        return Err(RewriteError::OutOfRange {
            drop_idx,
            allele_count,
        });
    }

    record.alleles_mut().remove(drop_idx);
    ctx.allele_count -= 1;

    let dropped = drop_idx as u32;
    let sample_count = ctx.sample_count;
    for genotype in record.genotypes_mut().iter_mut().take(sample_count) {
        let alleles = genotype.alleles_mut();
        if alleles.iter().any(|a| a.index() == Some(dropped)) {
            alleles
                .iter_mut()
                .for_each(|a| *a = GenotypeAllele::Unphased(0));
            continue;
        }
        for allele in alleles.iter_mut() {
            if let Some(i) = allele.index() {
                if i > dropped {
                    *allele = allele.with_index(i as i32 - 1);
                }
            }
        }
    }
    Ok(())
}

/// Remove the dropped allele's entry from every sample's `AD` vector.
///
/// Run after [`drop_allele`] when allele depths must stay consistent with the
/// allele list. Samples whose `AD` is shorter than `drop_idx + 1` are left as
/// they are. Returns the number of samples changed.
pub fn drop_allele_depths(record: &mut VariantRecord, drop_idx: usize) -> usize {
    let depths = match record.format_mut("AD") {
        Some(depths) => depths,
        None => return 0,
    };
    let mut changed = 0;
    for sample in depths.iter_mut() {
        if let TypedVec::Int32(values) = sample {
            if drop_idx < values.len() {
                values.remove(drop_idx);
                changed += 1;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Genotype, Record};

    fn triallelic(genotypes: Vec<Genotype>) -> (VariantRecord, SessionContext) {
        let record = VariantRecord::new(
            "chr2",
            5000,
            vec![b"A".to_vec(), b"T".to_vec(), b"G".to_vec()],
        )
        .with_genotypes(genotypes);
        let mut ctx = SessionContext::new(record.genotypes().len());
        ctx.begin_record(&record);
        (record, ctx)
    }

    #[test]
    fn test_drop_middle_allele() {
        let (mut record, mut ctx) = triallelic(vec![
            Genotype::diploid(1, 2, false),
            Genotype::diploid(0, 2, false),
            Genotype::diploid(0, 0, false),
            Genotype::diploid(2, 2, false),
        ]);
        drop_allele(&mut record, &mut ctx, 1).unwrap();

        assert_eq!(record.alleles(), &vec![b"A".to_vec(), b"G".to_vec()]);
        assert_eq!(ctx.allele_count, 2);
        let calls: Vec<String> = record.genotypes().iter().map(|g| g.to_string()).collect();
        assert_eq!(calls, vec!["0/0", "0/1", "0/0", "1/1"]);
    }

    #[test]
    fn test_hit_sample_loses_phase() {
        let (mut record, mut ctx) = triallelic(vec![Genotype::diploid(0, 1, true)]);
        drop_allele(&mut record, &mut ctx, 1).unwrap();
        assert_eq!(record.genotypes()[0], Genotype::diploid(0, 0, false));
    }

    #[test]
    fn test_shifted_call_keeps_phase() {
        let (mut record, mut ctx) = triallelic(vec![Genotype::diploid(0, 2, true)]);
        drop_allele(&mut record, &mut ctx, 1).unwrap();
        assert_eq!(record.genotypes()[0], Genotype::diploid(0, 1, true));
    }

    #[test]
    fn test_missing_calls_untouched() {
        let (mut record, mut ctx) = triallelic(vec![Genotype::from_encoded(&[0, 0])]);
        drop_allele(&mut record, &mut ctx, 2).unwrap();
        assert_eq!(record.genotypes()[0].to_string(), "./.");
        assert_eq!(record.alleles().len(), 2);
    }

    #[test]
    fn test_drop_last_allele() {
        let (mut record, mut ctx) = triallelic(vec![
            Genotype::diploid(0, 1, false),
            Genotype::diploid(1, 2, false),
        ]);
        drop_allele(&mut record, &mut ctx, 2).unwrap();
        assert_eq!(record.alleles(), &vec![b"A".to_vec(), b"T".to_vec()]);
        assert_eq!(record.genotypes()[0].to_string(), "0/1");
        assert_eq!(record.genotypes()[1].to_string(), "0/0");
    }

    #[test]
    fn test_out_of_range() {
        let (mut record, mut ctx) = triallelic(vec![Genotype::diploid(0, 1, false)]);
        let before = record.clone();
        assert_eq!(
            drop_allele(&mut record, &mut ctx, 5),
            Err(RewriteError::OutOfRange {
                drop_idx: 5,
                allele_count: 3
            })
        );
        assert_eq!(record, before);
        assert_eq!(ctx.allele_count, 3);
    }

    #[test]
    fn test_drop_allele_depths() {
        let (record, mut ctx) = triallelic(vec![
            Genotype::diploid(0, 1, false),
            Genotype::diploid(0, 2, false),
        ]);
        let mut record = record.with_format(
            "AD",
            vec![TypedVec::Int32(vec![10, 4, 0]), TypedVec::Int32(vec![7])],
        );
        drop_allele(&mut record, &mut ctx, 1).unwrap();
        assert_eq!(drop_allele_depths(&mut record, 1), 1);
        assert_eq!(
            record.format("AD").unwrap(),
            &[TypedVec::Int32(vec![10, 0]), TypedVec::Int32(vec![7])]
        );
    }
}

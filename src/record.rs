use std::fmt;

use getset::Getters;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::types::{Text, TypedVec, END_OF_VECTOR_INT_32};

/// Read access to a decoded variant record.
pub trait Record {
    fn id(&self) -> &[u8];

    fn chrom(&self) -> &str;

    fn pos(&self) -> u64;

    fn ref_allele(&self) -> &[u8];

    fn alt_alleles(&self) -> &[Text];

    fn qual(&self) -> Option<f32>;

    fn filters(&self) -> Vec<&str>;

    fn info(&self, tag: &str) -> Option<&TypedVec>;

    /// INFO keys present on this record, in record order.
    fn info_keys(&self) -> Vec<&str>;

    fn format(&self, tag: &str) -> Option<&[TypedVec]>;

    fn genotypes(&self) -> &[Genotype];

    fn has_flag(&self, tag: &str) -> bool;
}

/// A fully decoded, owned variant record.
///
/// Owned data only, so a record can be moved between the decoding thread and
/// the writer thread.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct VariantRecord {
    chrom: String,
    /// 1-based.
    pos: u64,
    id: Text,
    #[getset(get = "pub")]
    alleles: Vec<Text>,
    qual: Option<f32>,
    filters: Vec<String>,
    #[getset(get = "pub")]
    info_fields: IndexMap<String, TypedVec>,
    /// Per-sample FORMAT values, GT excluded.
    #[getset(get = "pub")]
    format_fields: IndexMap<String, Vec<TypedVec>>,
    genotypes: Vec<Genotype>,
}

impl VariantRecord {
    pub fn new<C: Into<String>>(chrom: C, pos: u64, alleles: Vec<Text>) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            id: Vec::new(),
            alleles,
            qual: None,
            filters: Vec::new(),
            info_fields: IndexMap::new(),
            format_fields: IndexMap::new(),
            genotypes: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: Text) -> Self {
        self.id = id;
        self
    }

    pub fn with_qual(mut self, qual: Option<f32>) -> Self {
        self.qual = qual;
        self
    }

    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_info<K: Into<String>>(mut self, key: K, value: TypedVec) -> Self {
        self.info_fields.insert(key.into(), value);
        self
    }

    pub fn with_format<K: Into<String>>(mut self, key: K, values: Vec<TypedVec>) -> Self {
        self.format_fields.insert(key.into(), values);
        self
    }

    pub fn with_genotypes(mut self, genotypes: Vec<Genotype>) -> Self {
        self.genotypes = genotypes;
        self
    }

    pub fn allele_count(&self) -> usize {
        self.alleles.len()
    }

    /// Removes an INFO field, keeping the order of the remaining ones.
    /// Returns whether the field was present.
    pub fn remove_info(&mut self, tag: &str) -> bool {
        self.info_fields.shift_remove(tag).is_some()
    }

    /// Removes a FORMAT field from every sample. Returns whether it was present.
    pub fn remove_format(&mut self, tag: &str) -> bool {
        self.format_fields.shift_remove(tag).is_some()
    }

    pub(crate) fn alleles_mut(&mut self) -> &mut Vec<Text> {
        &mut self.alleles
    }

    pub(crate) fn genotypes_mut(&mut self) -> &mut Vec<Genotype> {
        &mut self.genotypes
    }

    pub(crate) fn format_mut(&mut self, tag: &str) -> Option<&mut Vec<TypedVec>> {
        self.format_fields.get_mut(tag)
    }
}

impl Record for VariantRecord {
    fn id(&self) -> &[u8] {
        &self.id
    }

    fn chrom(&self) -> &str {
        &self.chrom
    }

    /// Returns the position of this record, i.e. POS, 1-based as in VCF.
    fn pos(&self) -> u64 {
        self.pos
    }

    /// Returns the reference allele, or an empty slice for a record without
    /// alleles.
    fn ref_allele(&self) -> &[u8] {
        self.alleles.first().map(Vec::as_slice).unwrap_or(&[])
    }

    fn alt_alleles(&self) -> &[Text] {
        if self.alleles.is_empty() {
            &[]
        } else {
            &self.alleles[1..]
        }
    }

    /// Returns the quality value of this record, i.e. QUAL.
    /// If not set (equivalent to `.` in VCF), return `None`.
    fn qual(&self) -> Option<f32> {
        self.qual
    }

    fn filters(&self) -> Vec<&str> {
        self.filters.iter().map(String::as_str).collect()
    }

    /// For a given INFO tag, return its contents.
    ///
    /// # Examples
    ///
    /// ```
    /// use filtersnp::record::{Record, VariantRecord};
    /// use filtersnp::types::TypedVec;
    ///
    /// let record = VariantRecord::new("chr1", 100, vec![b"A".to_vec(), b"T".to_vec()])
    ///     .with_info("AN", TypedVec::Int32(vec![20]));
    /// assert_eq!(record.info("AN").map(|v| v.integer()[0]), Some(20));
    /// assert!(record.info("AF").is_none());
    /// ```
    fn info(&self, tag: &str) -> Option<&TypedVec> {
        self.info_fields.get(tag)
    }

    fn info_keys(&self) -> Vec<&str> {
        self.info_fields.keys().map(String::as_str).collect()
    }

    /// For a given FORMAT tag, return one value vector per sample.
    fn format(&self, tag: &str) -> Option<&[TypedVec]> {
        self.format_fields.get(tag).map(Vec::as_slice)
    }

    fn genotypes(&self) -> &[Genotype] {
        &self.genotypes
    }

    fn has_flag(&self, tag: &str) -> bool {
        matches!(self.info_fields.get(tag), Some(TypedVec::Flag))
    }
}

/// Phased or unphased alleles, represented as indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenotypeAllele {
    Unphased(i32),
    Phased(i32),
    UnphasedMissing,
    PhasedMissing,
}

impl From<i32> for GenotypeAllele {
    /// Decode given integer according to BCF standard.
    fn from(encoded: i32) -> Self {
        match (encoded >> 1, encoded & 1) {
            (0, 0) => GenotypeAllele::UnphasedMissing,
            (0, _) => GenotypeAllele::PhasedMissing,
            (e, 0) => GenotypeAllele::Unphased(e - 1),
            (e, _) => GenotypeAllele::Phased(e - 1),
        }
    }
}

impl GenotypeAllele {
    /// Get the index into the list of alleles.
    pub fn index(self) -> Option<u32> {
        match self {
            GenotypeAllele::Unphased(i) | GenotypeAllele::Phased(i) => Some(i as u32),
            GenotypeAllele::UnphasedMissing | GenotypeAllele::PhasedMissing => None,
        }
    }

    pub fn is_phased(self) -> bool {
        matches!(self, GenotypeAllele::Phased(_) | GenotypeAllele::PhasedMissing)
    }

    /// Same phase, different allele index.
    pub fn with_index(self, index: i32) -> Self {
        if self.is_phased() {
            GenotypeAllele::Phased(index)
        } else {
            GenotypeAllele::Unphased(index)
        }
    }

    /// Encode according to BCF standard.
    pub fn encode(self) -> i32 {
        match self {
            GenotypeAllele::Unphased(i) => (i + 1) << 1,
            GenotypeAllele::Phased(i) => ((i + 1) << 1) | 1,
            GenotypeAllele::UnphasedMissing => 0,
            GenotypeAllele::PhasedMissing => 1,
        }
    }
}

impl fmt::Display for GenotypeAllele {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{}", i),
            None => write!(f, "."),
        }
    }
}

/// The allele calls of one sample.
///
/// As in BCF, the phase of a call is stored on every allele after the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genotype(Vec<GenotypeAllele>);

impl Genotype {
    /// A two-allele call, e.g. `diploid(0, 1, true)` is `0|1`.
    pub fn diploid(first: i32, second: i32, phased: bool) -> Self {
        let second = if phased {
            GenotypeAllele::Phased(second)
        } else {
            GenotypeAllele::Unphased(second)
        };
        Genotype(vec![GenotypeAllele::Unphased(first), second])
    }

    /// Decodes one sample's raw GT integers, dropping end-of-vector padding.
    pub fn from_encoded(encoded: &[i32]) -> Self {
        Genotype(
            encoded
                .iter()
                .take_while(|&&e| e != END_OF_VECTOR_INT_32)
                .map(|&e| GenotypeAllele::from(e))
                .collect(),
        )
    }

    /// Appends this genotype's BCF encoding padded to `ploidy` values.
    pub fn encode_into(&self, ploidy: usize, out: &mut Vec<i32>) {
        out.extend(self.0.iter().map(|a| a.encode()));
        let padding = ploidy.saturating_sub(self.0.len());
        out.extend(std::iter::repeat(END_OF_VECTOR_INT_32).take(padding));
    }

    pub fn alleles(&self) -> &[GenotypeAllele] {
        &self.0
    }

    pub(crate) fn alleles_mut(&mut self) -> &mut [GenotypeAllele] {
        &mut self.0
    }

    pub fn ploidy(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> Vec<Option<u32>> {
        self.0.iter().map(|a| a.index()).collect()
    }

    pub fn is_phased(&self) -> bool {
        self.0.iter().skip(1).any(|a| a.is_phased())
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut alleles = self.0.iter();
        if let Some(first) = alleles.next() {
            write!(f, "{}", first)?;
        }
        let rest = alleles
            .map(|a| format!("{}{}", if a.is_phased() { '|' } else { '/' }, a))
            .join("");
        write!(f, "{}", rest)
    }
}

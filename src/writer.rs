use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::info;
use rust_htslib::bcf::{self, header::HeaderView, index, Read};

use crate::filter::DROPPED_FORMAT_FIELDS;
use crate::reader::HeaderSchema;
use crate::record::{Record, VariantRecord};
use crate::sink::RecordSink;
use crate::types::{
    TypedVec, END_OF_VECTOR_FLOAT_32, END_OF_VECTOR_INT_32, MISSING_FLOAT,
};

/// Container format of the output file, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// BGZF-compressed BCF.
    Bcf,
    /// Plain-text VCF.
    Vcf,
    /// BGZF-compressed VCF.
    CompressedVcf,
}

impl OutputFormat {
    /// ```
    /// use filtersnp::writer::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::from_path("out.bcf"), OutputFormat::Bcf);
    /// assert_eq!(OutputFormat::from_path("out.vcf"), OutputFormat::Vcf);
    /// assert_eq!(OutputFormat::from_path("out.vcf.gz"), OutputFormat::CompressedVcf);
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".bcf") || name.ends_with(".bcf.gz") {
            OutputFormat::Bcf
        } else if name.ends_with(".vcf") {
            OutputFormat::Vcf
        } else {
            OutputFormat::CompressedVcf
        }
    }

    fn htslib(self) -> (bool, bcf::Format) {
        match self {
            OutputFormat::Bcf => (false, bcf::Format::Bcf),
            OutputFormat::Vcf => (true, bcf::Format::Vcf),
            OutputFormat::CompressedVcf => (false, bcf::Format::Vcf),
        }
    }

    fn index_type(self) -> Option<index::Type> {
        match self {
            OutputFormat::Bcf => Some(index::Type::Csi(14)),
            OutputFormat::CompressedVcf => Some(index::Type::Tbx),
            OutputFormat::Vcf => None,
        }
    }
}

/// INFO IDs the output header no longer defines.
pub fn stripped_info_ids<'a>(
    schema: &'a HeaderSchema,
    keep_fields: &HashSet<String>,
) -> Vec<&'a str> {
    schema
        .info
        .iter()
        .map(|def| def.id.as_str())
        .filter(|id| !keep_fields.contains(*id))
        .collect()
}

/// Derive the output header from the input header.
pub fn output_header(template: &HeaderView, keep_fields: &HashSet<String>) -> bcf::Header {
    let schema = HeaderSchema::from_header(template);
    let mut header = bcf::Header::from_template(template);
    for id in stripped_info_ids(&schema, keep_fields) {
        header.remove_info(id.as_bytes());
    }
    for tag in DROPPED_FORMAT_FIELDS {
        header.remove_format(tag.as_bytes());
    }
    header
}

/// Encoder writing [`VariantRecord`]s through htslib.
pub struct VariantWriter {
    inner: bcf::Writer,
}

impl VariantWriter {
    /// Create `output` with a header derived from the one in `input`.
    ///
    /// The header is written as part of opening the file.
    pub fn create<P, Q>(input: P, output: Q, keep_fields: &HashSet<String>) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let (input, output) = (input.as_ref(), output.as_ref());
        let template = bcf::Reader::from_path(input)
            .with_context(|| format!("Failed to open input file:{}", input.display()))?;
        let header = output_header(template.header(), keep_fields);
        let (uncompressed, format) = OutputFormat::from_path(output).htslib();
        let inner = bcf::Writer::from_path(output, &header, uncompressed, format).with_context(
            || {
                format!(
                    "Unable to create file: {}, please check permissions",
                    output.display()
                )
            },
        )?;
        Ok(Self { inner })
    }

    pub fn header(&self) -> &HeaderView {
        self.inner.header()
    }

    fn encode(&self, record: &VariantRecord) -> Result<bcf::Record> {
        let header = self.inner.header();
        let mut out = self.inner.empty_record();

        let rid = header
            .name2rid(record.chrom().as_bytes())
            .with_context(|| format!("Contig {} not in output header", record.chrom()))?;
        out.set_rid(Some(rid));
        out.set_pos(record.pos() as i64 - 1);
        if !record.id().is_empty() {
            out.set_id(record.id())?;
        }
        let alleles: Vec<&[u8]> = record.alleles().iter().map(Vec::as_slice).collect();
        out.set_alleles(&alleles)?;
        out.set_qual(
            record
                .qual()
                .unwrap_or_else(|| f32::from_bits(MISSING_FLOAT)),
        );
        for name in record.filters() {
            out.push_filter(name.as_bytes())?;
        }

        for (key, value) in record.info_fields() {
            let tag = key.as_bytes();
            match value {
                TypedVec::Int32(v) => out.push_info_integer(tag, v)?,
                TypedVec::Float32(v) => out.push_info_float(tag, v)?,
                TypedVec::Flag => out.push_info_flag(tag)?,
                TypedVec::String(v) => {
                    let parts: Vec<&[u8]> = v.iter().map(Vec::as_slice).collect();
                    out.push_info_string(tag, &parts)?
                }
            }
        }

        // GT has to come first among the FORMAT fields.
        let genotypes = record.genotypes();
        if !genotypes.is_empty() {
            let ploidy = genotypes.iter().map(|g| g.ploidy()).max().unwrap_or(0);
            let mut encoded = Vec::with_capacity(ploidy * genotypes.len());
            for genotype in genotypes {
                genotype.encode_into(ploidy, &mut encoded);
            }
            out.push_format_integer(b"GT", &encoded)?;
        }
        for (key, samples) in record.format_fields() {
            push_format(&mut out, key.as_bytes(), samples)
                .with_context(|| format!("Failed to write FORMAT/{}", key))?;
        }
        Ok(out)
    }
}

/// Per-sample vectors are padded to a common width, as BCF requires.
fn push_format(out: &mut bcf::Record, tag: &[u8], samples: &[TypedVec]) -> Result<()> {
    let width = samples.iter().map(TypedVec::len).max().unwrap_or(0);
    match samples.first() {
        Some(TypedVec::Int32(_)) => {
            let mut flat = Vec::with_capacity(width * samples.len());
            for sample in samples {
                let values = sample.integer();
                flat.extend_from_slice(values);
                flat.resize(flat.len() + width - values.len(), END_OF_VECTOR_INT_32);
            }
            out.push_format_integer(tag, &flat)?;
        }
        Some(TypedVec::Float32(_)) => {
            let pad = f32::from_bits(END_OF_VECTOR_FLOAT_32);
            let mut flat = Vec::with_capacity(width * samples.len());
            for sample in samples {
                let values = sample.float();
                flat.extend_from_slice(values);
                flat.resize(flat.len() + width - values.len(), pad);
            }
            out.push_format_float(tag, &flat)?;
        }
        Some(TypedVec::String(_)) => {
            let values: Vec<Vec<u8>> = samples.iter().map(|s| s.string().join(&b","[..])).collect();
            out.push_format_string(tag, &values)?;
        }
        Some(TypedVec::Flag) | None => {}
    }
    Ok(())
}

impl RecordSink<VariantRecord> for VariantWriter {
    fn write_record(&mut self, record: VariantRecord) -> Result<()> {
        let encoded = self.encode(&record).with_context(|| {
            format!("Record {}:{} could not be encoded", record.chrom(), record.pos())
        })?;
        self.inner.write(&encoded)?;
        Ok(())
    }
}

/// Index a finished output file.
///
/// Returns `false` when the format cannot be indexed.
pub fn build_index<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<bool> {
    let path = path.as_ref();
    let idx_type = match format.index_type() {
        Some(idx_type) => idx_type,
        None => {
            info!("Plain VCF output is not indexed: {}", path.display());
            return Ok(false);
        }
    };
    index::build(path, None, 1, idx_type).map_err(|e| anyhow!("Failed to create index! {}", e))?;
    Ok(true)
}

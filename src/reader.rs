use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use rust_htslib::bcf::{self, header::HeaderRecord, header::HeaderView, Read};

use crate::record::{Genotype, VariantRecord};
use crate::types::{is_missing_float, FieldDef, InfoType, TypedVec};

/// INFO and FORMAT definitions declared by a header, in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSchema {
    pub info: Vec<FieldDef>,
    pub format: Vec<FieldDef>,
}

impl HeaderSchema {
    pub fn from_header(header: &HeaderView) -> Self {
        let mut schema = HeaderSchema::default();
        for record in header.header_records() {
            match record {
                HeaderRecord::Info { values, .. } => schema.info.extend(field_def(&values)),
                HeaderRecord::Format { values, .. } => schema.format.extend(field_def(&values)),
                _ => {}
            }
        }
        schema
    }
}

fn field_def<'a, I>(values: I) -> Option<FieldDef>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut id = None;
    let mut kind = None;
    for (key, value) in values {
        match key.as_str() {
            "ID" => id = Some(value.clone()),
            "Type" => kind = InfoType::from_str(value).ok(),
            _ => {}
        }
    }
    Some(FieldDef {
        id: id?,
        kind: kind?,
    })
}

/// Sequential decoder yielding owned [`VariantRecord`]s from a VCF, VCF.gz or
/// BCF file.
pub struct VariantReader {
    inner: bcf::Reader,
    schema: HeaderSchema,
    buffer: bcf::Record,
}

impl VariantReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let inner = bcf::Reader::from_path(path)
            .with_context(|| format!("Failed to open input file:{}", path.display()))?;
        let schema = HeaderSchema::from_header(inner.header());
        let buffer = inner.empty_record();
        Ok(Self {
            inner,
            schema,
            buffer,
        })
    }

    pub fn header(&self) -> &HeaderView {
        self.inner.header()
    }

    pub fn schema(&self) -> &HeaderSchema {
        &self.schema
    }

    pub fn sample_count(&self) -> usize {
        self.inner.header().sample_count() as usize
    }

    pub fn samples(&self) -> Vec<String> {
        self.inner
            .header()
            .samples()
            .into_iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect()
    }
}

impl Iterator for VariantReader {
    type Item = Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.read(&mut self.buffer) {
            None => None,
            Some(Err(e)) => Some(Err(e).context("Failed to read record")),
            Some(Ok(())) => Some(decode(&self.buffer, &self.schema)),
        }
    }
}

/// Copy an htslib record into an owned [`VariantRecord`].
pub fn decode(record: &bcf::Record, schema: &HeaderSchema) -> Result<VariantRecord> {
    let header = record.header();
    let rid = record
        .rid()
        .ok_or_else(|| anyhow!("Record at position {} has no contig", record.pos() + 1))?;
    let chrom = String::from_utf8_lossy(header.rid2name(rid)?).into_owned();
    let pos = record.pos() as u64 + 1;

    let alleles = record.alleles().into_iter().map(<[u8]>::to_vec).collect();
    let qual = Some(record.qual()).filter(|q| !is_missing_float(*q));
    let filters = record
        .filters()
        .map(|id| String::from_utf8_lossy(&header.id_to_name(id)).into_owned())
        .collect();

    let mut decoded = VariantRecord::new(chrom, pos, alleles)
        .with_id(record.id())
        .with_qual(qual)
        .with_filters(filters);

    for def in &schema.info {
        if let Some(value) = decode_info(record, def)? {
            decoded = decoded.with_info(def.id.clone(), value);
        }
    }

    for def in &schema.format {
        if def.id == "GT" {
            if let Ok(gts) = record.format(b"GT").integer() {
                let genotypes = gts.iter().map(|s| Genotype::from_encoded(s)).collect();
                decoded = decoded.with_genotypes(genotypes);
            }
        } else if let Some(values) = decode_format(record, def) {
            decoded = decoded.with_format(def.id.clone(), values);
        }
    }
    Ok(decoded)
}

fn decode_info(record: &bcf::Record, def: &FieldDef) -> Result<Option<TypedVec>> {
    let tag = def.id.as_bytes();
    let context = || format!("Failed to read INFO/{}", def.id);
    let value = match def.kind {
        InfoType::Integer => record
            .info(tag)
            .integer()
            .with_context(context)?
            .map(|v| TypedVec::Int32(v.to_vec())),
        InfoType::Float => record
            .info(tag)
            .float()
            .with_context(context)?
            .map(|v| TypedVec::Float32(v.to_vec())),
        InfoType::Flag => record
            .info(tag)
            .flag()
            .with_context(context)?
            .then(|| TypedVec::Flag),
        InfoType::String | InfoType::Character => record
            .info(tag)
            .string()
            .with_context(context)?
            .map(|v| TypedVec::String(v.iter().map(|s| s.to_vec()).collect())),
    };
    Ok(value)
}

/// FORMAT fields absent from the record come back as `None`.
fn decode_format(record: &bcf::Record, def: &FieldDef) -> Option<Vec<TypedVec>> {
    let tag = def.id.as_bytes();
    match def.kind {
        InfoType::Integer => record
            .format(tag)
            .integer()
            .ok()
            .map(|v| v.iter().map(|s| TypedVec::Int32(s.to_vec())).collect()),
        InfoType::Float => record
            .format(tag)
            .float()
            .ok()
            .map(|v| v.iter().map(|s| TypedVec::Float32(s.to_vec())).collect()),
        InfoType::String | InfoType::Character => record
            .format(tag)
            .string()
            .ok()
            .map(|v| v.iter().map(|s| TypedVec::String(vec![s.to_vec()])).collect()),
        InfoType::Flag => None,
    }
}

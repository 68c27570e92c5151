use strum::{Display, EnumString};

pub(crate) const MISSING_FLOAT: u32 = 0x7F800001;
pub(crate) const END_OF_VECTOR_FLOAT_32: u32 = 0x7F800002;
pub(crate) const MISSING_INT_32: i32 = i32::MIN;
pub(crate) const END_OF_VECTOR_INT_32: i32 = i32::MIN + 1;

pub type Text = Vec<u8>;

/// Which rule branch of the filter applies to the input.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
pub enum FileType {
    #[strum(serialize = "SNP")]
    Snp,
    #[strum(serialize = "INDEL")]
    Indel,
}

/// Value type of an INFO or FORMAT definition, as declared in the header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumString)]
pub enum InfoType {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

/// An INFO or FORMAT definition taken from the header.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FieldDef {
    pub id: String,
    pub kind: InfoType,
}

/// Values of a single INFO field, or of one sample's FORMAT field.
///
/// Numbers are stored exactly as the codec delivered them, so BCF missing and
/// end-of-vector sentinels survive a decode/encode cycle untouched. Use
/// [`TypedVec::floats`] or [`TypedVec::integers`] to read the actual values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedVec {
    Flag,
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    String(Vec<Text>),
}

impl TypedVec {
    /// Raw integer storage, sentinels included.
    pub fn integer(&self) -> &[i32] {
        match self {
            TypedVec::Int32(v) => v.as_slice(),
            _ => &[],
        }
    }

    /// Raw float storage, sentinels included.
    pub fn float(&self) -> &[f32] {
        match self {
            TypedVec::Float32(v) => v.as_slice(),
            _ => &[],
        }
    }

    pub fn string(&self) -> Vec<&[u8]> {
        match self {
            TypedVec::String(v) => v.iter().map(Vec::as_slice).collect(),
            _ => Vec::new(),
        }
    }

    /// Present numeric values as `f64`, skipping missing and end-of-vector
    /// entries. Integer fields are widened.
    pub fn floats(&self) -> Vec<f64> {
        match self {
            TypedVec::Float32(v) => v
                .iter()
                .filter(|f| !is_missing_float(**f))
                .map(|&f| f64::from(f))
                .collect(),
            TypedVec::Int32(v) => v
                .iter()
                .filter(|i| !is_missing_int(**i))
                .map(|&i| f64::from(i))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Present integer values, skipping missing and end-of-vector entries.
    pub fn integers(&self) -> Vec<i32> {
        match self {
            TypedVec::Int32(v) => v.iter().copied().filter(|i| !is_missing_int(*i)).collect(),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedVec::Flag => 1,
            TypedVec::Int32(v) => v.len(),
            TypedVec::Float32(v) => v.len(),
            TypedVec::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn is_missing_float(value: f32) -> bool {
    let bits = value.to_bits();
    bits == MISSING_FLOAT || bits == END_OF_VECTOR_FLOAT_32
}

pub(crate) fn is_missing_int(value: i32) -> bool {
    value == MISSING_INT_32 || value == END_OF_VECTOR_INT_32
}

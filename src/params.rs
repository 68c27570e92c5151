use std::path::PathBuf;
use std::str::FromStr;

use clap::error::{ContextKind, ErrorKind};
use clap::{ArgAction, Parser};

use crate::errors::FilterSnpError;
use crate::filter::{FilterConfig, DEFAULT_KEEP_FIELDS};
use crate::types::FileType;

const LAST_UPDATE: &str = "2024.1.13";

#[derive(Parser, Debug)]
#[command(
    name = "filtersnp",
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct RawArgs {
    #[arg(short = 'i', value_name = "filepath")]
    input: Option<PathBuf>,
    #[arg(short = 'o', value_name = "filepath")]
    output: Option<PathBuf>,
    #[arg(long = "type", value_name = "SNP|INDEL")]
    file_type: Option<String>,
    #[arg(short = 'h', action = ArgAction::SetTrue)]
    help: bool,
    #[arg(long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

/// Validated run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    pub input: PathBuf,
    pub output: PathBuf,
    pub file_type: FileType,
    pub keep_fields: Vec<String>,
}

impl Params {
    pub fn new<I: Into<PathBuf>, O: Into<PathBuf>>(input: I, output: O, file_type: FileType) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            file_type,
            keep_fields: DEFAULT_KEEP_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig::new(self.file_type, self.keep_fields.iter().cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(Params),
    Help,
    Version,
}

/// Parse the arguments following the program name.
pub fn parse_args<I, T>(args: I) -> Result<Invocation, FilterSnpError>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let args: Vec<String> = args
        .into_iter()
        .map(Into::into)
        .map(|arg| if arg == "-type" { "--type".to_string() } else { arg })
        .collect();
    if args.is_empty() {
        return Err(FilterSnpError::NoParameters);
    }

    let raw = RawArgs::try_parse_from(std::iter::once("filtersnp".to_string()).chain(args))
        .map_err(from_clap)?;
    if raw.help {
        return Ok(Invocation::Help);
    }
    if raw.version {
        return Ok(Invocation::Version);
    }

    let input = raw
        .input
        .ok_or(FilterSnpError::MissingParameter("-i (input filename)"))?;
    let output = raw
        .output
        .ok_or(FilterSnpError::MissingParameter("-o (output filename)"))?;
    let file_type = raw
        .file_type
        .ok_or(FilterSnpError::MissingParameter("-type (SNP, INDEL)"))?;
    let file_type =
        FileType::from_str(&file_type).map_err(|_| FilterSnpError::InvalidFileType(file_type))?;
    Ok(Invocation::Run(Params::new(input, output, file_type)))
}

fn from_clap(err: clap::Error) -> FilterSnpError {
    let arg = err
        .get(ContextKind::InvalidArg)
        .map(ToString::to_string)
        .unwrap_or_default();
    match err.kind() {
        ErrorKind::InvalidValue if arg.starts_with("-i") => FilterSnpError::MissingValue {
            flag: "-i",
            what: "input filename",
        },
        ErrorKind::InvalidValue if arg.starts_with("-o") => FilterSnpError::MissingValue {
            flag: "-o",
            what: "output filename",
        },
        ErrorKind::InvalidValue if arg.starts_with("--type") => FilterSnpError::MissingFileType,
        ErrorKind::UnknownArgument => FilterSnpError::UnknownParameter(arg),
        _ => FilterSnpError::InvalidArguments(
            err.to_string().lines().next().unwrap_or_default().to_string(),
        ),
    }
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} -i example.vcf.gz -o example.vcf.gz -type SNP\n\
         This program is used to filter vcf files\n\
         \n\
         Options:\n\
         \x20 -i <filepath>        Required: input VCF/BCF file\n\
         \x20 -o <filepath>        Required: output file (.vcf.gz, .bcf or .vcf)\n\
         \x20 -type <SNP|INDEL>    Required: variant type of the input file\n\
         \x20 -h                   Print this help message\n\
         \x20 --version            Print version information\n"
    )
}

pub fn version() -> String {
    format!(
        "Filtersnp\nVersion: V-{}\tLast update:{}\n",
        env!("CARGO_PKG_VERSION"),
        LAST_UPDATE
    )
}

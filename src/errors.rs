use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterSnpError {
    #[error("No parameters provided. Use -h for help.")]
    NoParameters,
    #[error("No {what} specified after {flag}")]
    MissingValue {
        flag: &'static str,
        what: &'static str,
    },
    #[error("Nothing specified after -type")]
    MissingFileType,
    #[error("Please input SNP or INDEL")]
    InvalidFileType(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl FilterSnpError {
    /// Whether the usage text should follow the error message.
    pub fn shows_usage(&self) -> bool {
        matches!(
            self,
            FilterSnpError::NoParameters
                | FilterSnpError::MissingParameter(_)
                | FilterSnpError::UnknownParameter(_)
        )
    }
}

use thiserror::Error;

/// Problems with the command line, detected before anything touches the network.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error(
        "Size (with the amount of oldest media) or date (with the date before which media is \
         selected) is missing. One of them has to be provided."
    )]
    MissingSelection,

    #[error("Size and date cannot be used together. Provide only one of them.")]
    ConflictingSelection,

    #[error("Invalid size '{0}': expected a non-negative integer")]
    InvalidSize(String),

    #[error("Invalid date '{0}': expected format YYYY-MM-DD, e.g. 2022-09-23")]
    InvalidDate(String),

    #[error("Output path is mandatory.")]
    MissingOutput,

    #[error("Username is mandatory.")]
    MissingUsername,

    #[error("Password is mandatory.")]
    MissingPassword,
}

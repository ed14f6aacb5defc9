use thiserror::Error;

/// A file whose header row does not expose the required columns. The file is
/// rejected whole: zero records, logged, never fatal to the poller.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unrecognized header layout, missing: {missing}")]
    Unrecognized { missing: String },
}

/// Failures raised by the storage collaborators (object storage and the
/// record store). Item-level write failures are reported per item instead,
/// see `store::PutOutcome`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("no such object: {0}")]
    NoSuchKey(String),

    #[error("{0}")]
    Backend(String),
}

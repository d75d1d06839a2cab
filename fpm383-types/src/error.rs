pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {what} needs {expected} bytes, got {actual}")]
    Parse {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

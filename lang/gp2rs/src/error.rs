use std::fmt;

/// Failure to read or build a host graph from its input file.
#[derive(Debug)]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: String) -> Self {
        HostError { message }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host graph: {}", self.message)
    }
}

impl std::error::Error for HostError {}

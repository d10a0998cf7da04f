use thiserror::Error;

/// Errors produced while analyzing a repository.
#[derive(Error, Debug)]
pub enum Error {
    #[error("git {} failed (exit code {code:?}): {stderr}", args.join(" "))]
    Vcs {
        args: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    #[error("git {} timed out after {secs}s", args.join(" "))]
    Timeout { args: Vec<String>, secs: u64 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid {name} regex: {source}")]
    FilterConfig {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("task failed: {0}")]
    TaskFailure(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("branch '{0}' not found")]
    BranchNotFound(String),

    #[error("{0}")]
    Prerequisite(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Process exit code when the analysis produced no data.
pub const EXIT_EMPTY: i32 = 3;
/// Process exit code when the graph page could not be produced.
pub const EXIT_GRAPH: i32 = 4;

impl Error {
    /// Exit code reported by the binary for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::BranchNotFound(_)
            | Error::Prerequisite(_)
            | Error::InvalidArgument(_)
            | Error::FilterConfig { .. } => 1,
            _ => 2,
        }
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Prerequisite(format!("not a git repository (or any parent): {}", err.message()))
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

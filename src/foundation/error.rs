/// Convenience result type used across the crate.
pub type GraspResult<T> = Result<T, GraspError>;

/// Top-level error taxonomy for the interpreter and its collaborators.
///
/// Only fatal conditions become values of this type: bad or repeated video
/// modes, decode failures, and IO errors around the external tools.
/// Recoverable script mistakes (buffer misuse, unknown commands, unresolved
/// jump targets) are logged at the handler boundary and never propagate.
#[derive(thiserror::Error, Debug)]
pub enum GraspError {
    /// One-time configuration gone wrong: unknown video mode, re-setting the
    /// video mode, invalid frame rate or render speed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A legacy raster asset could not be extracted or decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Fatal interpreter error annotated with script name and 1-based line.
    #[error("{script}@{line}: {source}")]
    Script {
        /// Name of the script being interpreted.
        script: String,
        /// 1-based line number of the failing instruction.
        line: usize,
        /// The underlying failure.
        #[source]
        source: Box<GraspError>,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GraspError {
    /// Build a [`GraspError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`GraspError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Annotate an error with the script name and 1-based line it surfaced
    /// on. Errors that already carry a location keep the innermost one.
    pub fn at_line(self, script: &str, line: usize) -> Self {
        match self {
            Self::Script { .. } => self,
            other => Self::Script {
                script: script.to_string(),
                line,
                source: Box::new(other),
            },
        }
    }
}

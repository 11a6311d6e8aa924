use std::fmt;

/// Errors surfaced while turning a source into a [`crate::Document`].
///
/// Every variant that originates in the pipeline carries a [`Detail`] with
/// the source line it was raised for.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unexpected {1} in {2}, position: {0}")]
    Structural(Detail, String, String),

    #[error("unsupported kind of substitution: '{1}', position: {0}")]
    UnsupportedSubstitution(Detail, String),

    #[error("cannot mix incremental and non-incremental substitutions: '{1}', position: {0}")]
    MixedSubstitutions(Detail, String),

    #[error("unsupported kind of element: {1}, position: {0}")]
    UnsupportedElement(Detail, String),

    #[error("unexpected type of counter value: '{1}', position: {0}")]
    CounterValue(Detail, String),

    #[error("invalid block attributes: '{1}', position: {0}")]
    BlockAttributes(Detail, String),

    #[error("inline parsing error, position: {0}")]
    InlineParse(
        Detail,
        #[source] peg::error::ParseError<peg::str::LineCol>,
    ),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub(crate) fn structural(line: usize, kind: &str, context: &str) -> Self {
        Self::Structural(Detail::at(line), kind.to_string(), context.to_string())
    }

    /// The source line the error was raised for.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        self.detail().map(|detail| detail.line)
    }

    #[must_use]
    pub fn detail(&self) -> Option<&Detail> {
        match self {
            Self::Structural(detail, ..)
            | Self::UnsupportedSubstitution(detail, ..)
            | Self::MixedSubstitutions(detail, ..)
            | Self::UnsupportedElement(detail, ..)
            | Self::CounterValue(detail, ..)
            | Self::BlockAttributes(detail, ..)
            | Self::InlineParse(detail, ..) => Some(detail),
            Self::Io(_) => None,
        }
    }

    /// Records the source file name on errors that carry a position.
    #[must_use]
    pub(crate) fn with_filename(mut self, filename: Option<&str>) -> Self {
        if let Some(filename) = filename {
            match &mut self {
                Self::Structural(detail, ..)
                | Self::UnsupportedSubstitution(detail, ..)
                | Self::MixedSubstitutions(detail, ..)
                | Self::UnsupportedElement(detail, ..)
                | Self::CounterValue(detail, ..)
                | Self::BlockAttributes(detail, ..)
                | Self::InlineParse(detail, ..) => detail.filename = Some(filename.to_string()),
                Self::Io(_) => {}
            }
        }
        self
    }

    /// Get advice for this error if available.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::MixedSubstitutions(..) => Some(
                "Use either a plain list (subs=\"quotes,macros\") or only +x, x+ and -x entries (subs=\"+quotes,-callouts\")",
            ),
            Self::UnsupportedSubstitution(..) => Some(
                "Valid substitutions are: none, normal, verbatim, specialchars, quotes, attributes, replacements, macros, post_replacements, callouts",
            ),
            Self::CounterValue(..) => {
                Some("Counter start values must be an integer or a single character")
            }
            Self::Structural(..)
            | Self::UnsupportedElement(..)
            | Self::BlockAttributes(..)
            | Self::InlineParse(..)
            | Self::Io(_) => None,
        }
    }
}

/// Where an error happened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Detail {
    pub line: usize,
    pub filename: Option<String>,
}

impl Detail {
    #[must_use]
    pub fn at(line: usize) -> Self {
        Self {
            line,
            filename: None,
        }
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filename {
            Some(filename) => write!(f, "{filename}:{}", self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

use std::{borrow::Cow, fmt};

use strum::Display;

/// Result type alias for operations that can fail with an interpreter error.
pub type RunResult<T> = Result<T, Error>;

/// The closed set of error kinds the interpreter can raise.
///
/// Reader failures, special-form shape violations, and runtime type errors
/// all share one taxonomy; every error unwinds to the REPL loop, which prints
/// it and resumes. The `Display` form is the kebab-case kind name (e.g.
/// `invalid-conditional`), produced by strum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    // --- reader errors ---
    /// Input ended inside a list, string, or escape sequence.
    UnexpectedEof,
    /// A raw newline appeared inside a string literal.
    UnexpectedNewline,
    /// A string escape other than `\t`, `\n`, or `\\`.
    InvalidEscape,
    /// A token containing a non-graphic character.
    InvalidAtom,
    /// A digit-leading token that is not a valid number.
    InvalidNumber,
    /// Trailing input after a complete top-level form.
    UnexpectedCharacter,

    // --- special-form shape errors ---
    /// Wrong shape or arity of a special form.
    InvalidKeywordList,
    /// A reserved atom used where an identifier or value is required.
    InvalidKeywordAtom,

    // --- evaluation errors ---
    /// A value in boolean context that is neither boolean, object, nor undefined.
    InvalidConditional,
    /// A call form with fewer than two elements.
    InvalidFuncCall,
    /// Neither the member nor the generic call path produced a function.
    ListEvaluate,
    /// A native built-in invoked with the wrong arity or argument types.
    InvalidArg,
    /// An array index outside `[0, size)`.
    OutOfRange,
    NotObject,
    NotString,
    NotFunction,
    NotArray,
    NotNumber,
    /// A number with a fractional part, or out of `i64` range, where an
    /// integer is required.
    NotInteger,
    /// Object-null dereferenced where a receiver is required.
    NullReference,
    /// A member resolved to undefined where a function was required.
    Undefined,
}

/// An interpreter error: a kind plus an optional human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    detail: Option<Cow<'static, str>>,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, detail: None }
    }

    #[must_use]
    pub fn with_detail(kind: ErrorKind, detail: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

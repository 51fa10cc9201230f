use thiserror::Error;

/// Main error type for DER decoding and encoding operations
///
/// Every failure mode of the codec maps to exactly one of these kinds, so
/// callers (and the structural decoder itself) can pattern-match on what
/// went wrong instead of parsing message strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerError {
    /// A header or value extends past the end of the buffer.
    #[error("truncated buffer: {0}")]
    Truncated(String),

    /// A BER-only construct was encountered, e.g. an indefinite length.
    #[error("DER violation: {0}")]
    DerViolation(String),

    /// The observed tag does not match the schema's expectation.
    #[error("tag mismatch: {0}")]
    TagMismatch(String),

    /// An EXPLICIT-tagged TLV used primitive instead of constructed encoding.
    #[error("explicit tag not constructed: {0}")]
    ExplicitTagNotConstructed(String),

    /// A value slice is not well-formed for its declared kind.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A named type is not defined in the schema.
    #[error("unknown type reference: {0}")]
    UnknownTypeRef(String),

    /// Every alternative of a CHOICE failed to decode.
    #[error("no CHOICE alternative matched: {0}")]
    NoAlternativeMatched(String),

    /// Schema or input nesting exceeded the codec's depth ceiling.
    #[error("nesting depth limit exceeded: {0}")]
    DepthLimit(String),
}

impl DerError {
    /// Whether an optional/defaulted field fallback or a CHOICE trial may
    /// absorb this error.
    ///
    /// Recoverable kinds all mean "these bytes do not fit this type at this
    /// position", which is exactly what trial decoding probes for. Anything
    /// else must abort the whole decode and is never masked as "field
    /// absent".
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DerError::Truncated(_)
                | DerError::TagMismatch(_)
                | DerError::ExplicitTagNotConstructed(_)
                | DerError::Encoding(_)
                | DerError::NoAlternativeMatched(_)
        )
    }
}

/// Result type alias for DER codec operations
pub type DerResult<T> = Result<T, DerError>;

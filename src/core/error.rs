// error taxonomy for variant configuration and record access
use thiserror::Error;

/// Everything that can go wrong constructing or querying a record.
///
/// All of these are raised synchronously at the triggering call; nothing is
/// retried or recovered internally. A failed construction never leaves a
/// partially built record behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The abstract base variant cannot be instantiated directly.
    #[error("the base variant is abstract and cannot be instantiated")]
    AbstractVariant,

    /// A required attribute was absent from the input map. Carries the
    /// attribute exactly as it was declared on the variant, before key
    /// normalization.
    #[error("missing required attribute `{attribute}`")]
    MissingRequiredAttribute { attribute: String },

    /// A mutating map operation was invoked through a record.
    #[error("operation `{operation}` would mutate the record and is not supported")]
    MethodNotSupported { operation: String },

    /// The name resolves to neither a key nor a supported operation.
    #[error("`{name}` is neither a key nor a supported operation")]
    UnknownAttribute { name: String },

    /// A supported operation was invoked with the wrong argument shape.
    #[error("operation `{operation}` called with unsupported arguments")]
    InvalidArguments { operation: String },
}

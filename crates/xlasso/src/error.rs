//! Lasso error types

use thiserror::Error;

/// Result type for lasso operations
pub type LassoResult<T> = std::result::Result<T, LassoError>;

/// Errors that can occur while parsing, resolving or filtering a reference
///
/// Variants raised while handling a reference carry its text; grammar
/// errors also carry the 0-based character offset of the offending input.
#[derive(Debug, Error)]
pub enum LassoError {
    /// The reference violates the grammar
    #[error("Syntax error in {reference:?} at offset {offset}: {message}")]
    Syntax {
        reference: String,
        offset: usize,
        message: String,
    },

    /// Sheet quoting cannot be segmented
    #[error("Ambiguous reference {reference:?} at offset {offset}: {message}")]
    AmbiguousReference {
        reference: String,
        offset: usize,
        message: String,
    },

    /// The book or sheet selector matches nothing
    #[error("Sheet not found for {reference:?}: {sheet}")]
    SheetNotFound { reference: String, sheet: String },

    /// A coordinate falls outside the sheet
    #[error("Out of bounds in {reference:?}: {message}")]
    OutOfBounds { reference: String, message: String },

    /// No filter is registered under this name
    ///
    /// `via` lists the enclosing references of a nested resolution,
    /// outermost first.
    #[error("Unknown filter '{name}' in {reference:?}{}", via_suffix(.via))]
    UnknownFilter {
        reference: String,
        name: String,
        via: Vec<String>,
    },

    /// Nested resolutions went deeper than allowed
    #[error(
        "Recursion depth {depth} exceeds limit {limit} while resolving {reference:?}{}",
        via_suffix(.via)
    )]
    RecursionLimit {
        reference: String,
        depth: usize,
        limit: usize,
        via: Vec<String>,
    },

    /// Bad arguments passed to a filter
    #[error("Invalid arguments for filter '{filter}': {message}")]
    FilterArgument { filter: String, message: String },

    /// Expression parse or evaluation failure in the `eval` filter
    #[error("Expression error: {0}")]
    Eval(String),

    /// A filter failed; wraps the underlying error
    #[error("Filter {call} failed in {reference:?}: {source}{help}")]
    Filter {
        reference: String,
        call: String,
        source: Box<LassoError>,
        help: String,
    },

    /// The sheet backend failed to open or read a sheet
    #[error("Backend failure for {reference:?}: {source}")]
    Backend {
        reference: String,
        source: xlasso_core::Error,
    },
}

impl LassoError {
    /// Errors that always propagate through filter wrapping and lax mode
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LassoError::RecursionLimit { .. } | LassoError::UnknownFilter { .. }
        )
    }

    /// The top-level reference whose resolution failed
    pub fn root_reference(&self) -> Option<&str> {
        match self {
            LassoError::UnknownFilter { reference, via, .. }
            | LassoError::RecursionLimit { reference, via, .. } => {
                Some(via.first().unwrap_or(reference).as_str())
            }
            LassoError::Syntax { reference, .. }
            | LassoError::AmbiguousReference { reference, .. }
            | LassoError::SheetNotFound { reference, .. }
            | LassoError::OutOfBounds { reference, .. }
            | LassoError::Filter { reference, .. }
            | LassoError::Backend { reference, .. } => Some(reference.as_str()),
            LassoError::FilterArgument { .. } | LassoError::Eval(_) => None,
        }
    }

    /// Record that this error surfaced through the resolution of `outer`
    pub(crate) fn within(mut self, outer: &str) -> Self {
        if let LassoError::UnknownFilter { via, .. } | LassoError::RecursionLimit { via, .. } =
            &mut self
        {
            via.insert(0, outer.to_string());
        }
        self
    }

    /// Whether this error means the text is not a parsable reference
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            LassoError::Syntax { .. } | LassoError::AmbiguousReference { .. }
        )
    }

    pub(crate) fn argument<F: Into<String>, M: Into<String>>(filter: F, message: M) -> Self {
        LassoError::FilterArgument {
            filter: filter.into(),
            message: message.into(),
        }
    }

    /// Map a backend error raised while fetching the sheet for `reference`
    pub(crate) fn from_backend(reference: &str, err: xlasso_core::Error) -> Self {
        use xlasso_core::Error;

        match err {
            Error::SheetNotFound(sheet) | Error::WorkbookNotFound(sheet) => {
                LassoError::SheetNotFound {
                    reference: reference.to_string(),
                    sheet,
                }
            }
            Error::SheetOutOfBounds(index, count) => LassoError::SheetNotFound {
                reference: reference.to_string(),
                sheet: format!("index {} (workbook has {} sheets)", index, count),
            },
            source => LassoError::Backend {
                reference: reference.to_string(),
                source,
            },
        }
    }
}

fn via_suffix(via: &[String]) -> String {
    if via.is_empty() {
        return String::new();
    }
    let chain: Vec<String> = via.iter().map(|r| format!("{:?}", r)).collect();
    format!(" (via {})", chain.join(" -> "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_reference_and_offset() {
        let err = LassoError::Syntax {
            reference: "Sheet1!A1:".into(),
            offset: 9,
            message: "missing end edge".into(),
        };
        let text = err.to_string();
        assert!(text.contains("\"Sheet1!A1:\""));
        assert!(text.contains("offset 9"));
    }

    #[test]
    fn test_filter_wraps_source() {
        let err = LassoError::Filter {
            reference: "A1(df)".into(),
            call: "df(header=3)".into(),
            source: Box::new(LassoError::argument("df", "header row 3 beyond data")),
            help: String::new(),
        };
        assert!(err.to_string().contains("df(header=3)"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_backend_mapping() {
        let err = LassoError::from_backend("Nope!A1", xlasso_core::Error::SheetNotFound("Nope".into()));
        assert!(matches!(err, LassoError::SheetNotFound { ref sheet, .. } if sheet == "Nope"));

        let err = LassoError::from_backend("A1", xlasso_core::Error::other("disk on fire"));
        assert!(matches!(err, LassoError::Backend { .. }));
    }

    #[test]
    fn test_nested_errors_name_the_root() {
        let err = LassoError::RecursionLimit {
            reference: "A1(recurse)".into(),
            depth: 3,
            limit: 2,
            via: Vec::new(),
        };
        assert_eq!(err.root_reference(), Some("A1(recurse)"));

        let err = err.within("Loop!A2(recurse)").within("Loop!A1(recurse)");
        assert_eq!(err.root_reference(), Some("Loop!A1(recurse)"));
        assert_eq!(
            err.to_string(),
            "Recursion depth 3 exceeds limit 2 while resolving \"A1(recurse)\" \
             (via \"Loop!A1(recurse)\" -> \"Loop!A2(recurse)\")"
        );

        // Other variants are left alone
        let err = LassoError::Eval("bad".into()).within("A1");
        assert!(matches!(err, LassoError::Eval(_)));
    }
}

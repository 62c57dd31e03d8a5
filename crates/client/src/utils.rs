//! Utility macros used across the client crate.

/// Returns early with an error if a condition is not met.
///
/// Works like `assert!`, but instead of panicking it returns `Err($error)`
/// from the enclosing function. Used for wire-format validation where a bad
/// byte must become a typed error.
///
/// ```ignore
/// ensure!(head_len <= max_bytes, ParseError::too_large_header(head_len, max_bytes));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

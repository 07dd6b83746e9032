// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use thiserror::Error;

/// Any failure that can surface from a group read.
///
/// The type is `Clone` because a single failure may be delivered to every caller that
/// joined the same coalesced load.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An empty key was passed to [`Group::get`](crate::Group::get).
    #[error("key must not be empty")]
    EmptyKey,

    /// The backing loader declined to produce a value for the key.
    ///
    /// Loader failures are never cached; the next read for the same key runs the
    /// loader again.
    #[error("loader produced no value for key {key:?}")]
    Load {
        /// The key the loader was asked for.
        key: String,
        /// The loader's own error.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

/// A specialized `Result` for group reads.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Error: Send, Sync, Clone);
    }

    #[test]
    fn load_preserves_the_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "row missing");
        let error = Error::Load {
            key: "Tom".to_string(),
            source: Arc::new(source),
        };

        assert_eq!(error.to_string(), "loader produced no value for key \"Tom\"");
        let source = std::error::Error::source(&error).expect("source is preserved");
        assert_eq!(source.to_string(), "row missing");
    }
}

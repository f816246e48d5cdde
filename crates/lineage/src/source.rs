//! External provenance seam

use dstrk_core::Result;
use std::path::Path;

/// Produces display strings to append to a dataset's tags
///
/// Implementations describe some external checkout (a revision id, a branch,
/// a remote). A path the source cannot describe must fail with
/// `Error::ExternalSourceUnavailable` rather than return partial tags.
pub trait TagSource {
    fn tags(&self, checkout: &Path) -> Result<Vec<String>>;
}

impl<F> TagSource for F
where
    F: Fn(&Path) -> Result<Vec<String>>,
{
    fn tags(&self, checkout: &Path) -> Result<Vec<String>> {
        self(checkout)
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for document parsing and flattening
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or flattening a map document
#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("singular transform on element '{0}'")]
    SingularTransform(String),

    #[error("unresolved reference '{0}'")]
    UnresolvedReference(String),
}

impl Error {
    /// Create a parse error with context
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }
}

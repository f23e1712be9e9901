use thiserror::Error;

/// Errors raised while turning a `CodeGeneratorRequest` into Go sources.
///
/// Every variant is reported back to `protoc` through
/// `CodeGeneratorResponse.error`, so the messages are written for the person
/// running `protoc`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid parameter {key:?}: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error(
        "unable to determine Go import path for {file:?}; \
         add `option go_package = \"<import path>\";` to the file or pass M{file}=<import path>"
    )]
    MissingImportPath { file: String },

    #[error(
        "invalid Go import path {import_path:?} for {file:?}: \
         the import path must contain at least one '.' or '/' character"
    )]
    InvalidImportPath { file: String, import_path: String },

    #[error("inconsistent package names for import path {import_path:?}: {names}")]
    InconsistentPackageNames { import_path: String, names: String },

    #[error("{file}: generated file {name:?} does not match prefix {module:?}")]
    ModuleMismatch {
        file: String,
        name: String,
        module: String,
    },

    #[error("file to generate {0:?} is missing from the request")]
    MissingFile(String),

    #[error("unable to resolve type {type_name:?} referenced by {referenced_by}")]
    UnresolvedType {
        type_name: String,
        referenced_by: String,
    },
}

impl Error {
    pub(crate) fn invalid_parameter(key: &str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

//! Facade error type wrapping the layer-specific errors.

use rkv_namespace::NamespaceError;
use rkv_storage::StorageError;

/// Any error the store surface can produce.
#[derive(thiserror::Error, Debug)]
pub enum RkvError {
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, RkvError>;

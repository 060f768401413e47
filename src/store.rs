use std::fmt::Debug;
use tokio::io::AsyncRead;
use url::Url;

use crate::{asset_key::AssetKey, error_code::ErrorCode};

pub(crate) mod object_store;

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("Error in object store")]
    ObjectStore(#[from] crate::store::object_store::ObjectError),

    #[error("Error reading upload source")]
    Read(#[source] std::io::Error),
}

impl StoreError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ObjectStore(e) => e.error_code(),
            Self::Read(_) => ErrorCode::IO_ERROR,
        }
    }
}

#[async_trait::async_trait]
pub(crate) trait Store: Clone + Debug + Send + Sync + 'static {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Write everything `reader` yields to `key`, declaring `content_type` where the backend
    /// records one
    ///
    /// Nothing is left behind under `key` when this returns an error.
    async fn save_async_read<Reader>(
        &self,
        key: &AssetKey,
        reader: Reader,
        content_type: &mime::Mime,
    ) -> Result<(), StoreError>
    where
        Reader: AsyncRead + Unpin + Send;

    /// The URL a stored asset can be fetched from
    fn public_url(&self, key: &AssetKey) -> Result<Url, StoreError>;
}

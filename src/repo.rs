use std::{fmt::Debug, sync::Arc};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::{config, error_code::ErrorCode};

pub(crate) mod sled;

pub(crate) type ArcRepo = Arc<dyn VideoRepo>;

#[derive(Clone, Debug)]
pub(crate) enum Repo {
    Sled(self::sled::SledRepo),
}

/// A video's metadata, as shown to its owner
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub(crate) struct Video {
    pub(crate) id: Uuid,

    pub(crate) user_id: Uuid,

    pub(crate) title: String,

    pub(crate) description: String,

    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub(crate) updated_at: OffsetDateTime,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video_url: Option<Url>,
}

#[derive(Debug)]
pub(crate) struct NewVideo {
    pub(crate) user_id: Uuid,
    pub(crate) title: String,
    pub(crate) description: String,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RepoError {
    #[error("Error in sled")]
    SledError(#[from] crate::repo::sled::SledError),

    #[error("Panic in blocking operation")]
    Canceled,
}

impl RepoError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::SledError(e) => e.error_code(),
            Self::Canceled => ErrorCode::PANIC,
        }
    }
}

#[async_trait::async_trait]
pub(crate) trait VideoRepo: Debug + Send + Sync {
    /// Store a fresh record owned by `new.user_id`, with no media attached yet
    async fn create_video(&self, new: NewVideo) -> Result<Video, RepoError>;

    async fn video(&self, id: Uuid) -> Result<Option<Video>, RepoError>;

    /// Replace an existing record, failing if it was never created
    async fn update_video(&self, video: &Video) -> Result<(), RepoError>;
}

#[async_trait::async_trait]
impl<T> VideoRepo for Arc<T>
where
    T: VideoRepo,
{
    async fn create_video(&self, new: NewVideo) -> Result<Video, RepoError> {
        T::create_video(self, new).await
    }

    async fn video(&self, id: Uuid) -> Result<Option<Video>, RepoError> {
        T::video(self, id).await
    }

    async fn update_video(&self, video: &Video) -> Result<(), RepoError> {
        T::update_video(self, video).await
    }
}

impl Repo {
    pub(crate) fn open(config: config::Repo) -> color_eyre::Result<Self> {
        match config {
            config::Repo::Sled(config::Sled {
                mut path,
                cache_capacity,
            }) => {
                path.push("v0.1");

                let db = ::sled::Config::new()
                    .cache_capacity(cache_capacity)
                    .path(path)
                    .open()?;

                Ok(Self::Sled(self::sled::SledRepo::new(db)?))
            }
        }
    }

    pub(crate) fn to_arc(&self) -> ArcRepo {
        match self {
            Self::Sled(sled_repo) => Arc::new(sled_repo.clone()),
        }
    }
}

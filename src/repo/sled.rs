use crate::{
    error_code::ErrorCode,
    repo::{NewVideo, RepoError, Video, VideoRepo},
};
use sled::{
    transaction::{abort, TransactionError},
    Db, Tree,
};
use time::OffsetDateTime;
use uuid::Uuid;

macro_rules! b {
    ($self:ident.$ident:ident, $expr:expr) => {{
        let $ident = $self.$ident.clone();

        tokio::task::spawn_blocking(move || $expr)
            .await
            .map_err(|_| RepoError::Canceled)??
    }};
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum SledError {
    #[error("Error in database")]
    Sled(#[from] sled::Error),

    #[error("Invalid video json")]
    Video(#[from] serde_json::Error),

    #[error("Required video was not present")]
    Missing,
}

impl SledError {
    pub(super) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Sled(_) | Self::Video(_) => ErrorCode::SLED_ERROR,
            Self::Missing => ErrorCode::VIDEO_NOT_FOUND,
        }
    }
}

#[derive(Clone)]
pub(crate) struct SledRepo {
    videos: Tree,
    db: Db,
}

impl std::fmt::Debug for SledRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledRepo")
            .field("videos", &self.videos.len())
            .finish()
    }
}

impl SledRepo {
    pub(crate) fn new(db: Db) -> Result<Self, SledError> {
        Ok(SledRepo {
            videos: db.open_tree("tubely-videos-tree")?,
            db,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub(crate) async fn flush(&self) -> Result<(), RepoError> {
        self.db.flush_async().await.map_err(SledError::from)?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl VideoRepo for SledRepo {
    #[tracing::instrument(level = "debug", skip_all)]
    async fn create_video(
        &self,
        NewVideo {
            user_id,
            title,
            description,
        }: NewVideo,
    ) -> Result<Video, RepoError> {
        let now = OffsetDateTime::now_utc();

        let video = Video {
            id: Uuid::new_v4(),
            user_id,
            title,
            description,
            created_at: now,
            updated_at: now,
            video_url: None,
        };

        let id = video.id;
        let bytes = serde_json::to_vec(&video).map_err(SledError::from)?;

        b!(self.videos, {
            videos.insert(id.as_bytes(), bytes)?;

            Ok(()) as Result<(), SledError>
        });

        Ok(video)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn video(&self, id: Uuid) -> Result<Option<Video>, RepoError> {
        let opt = b!(self.videos, videos.get(id.as_bytes()).map_err(SledError::from));

        opt.map(|ivec| serde_json::from_slice(&ivec).map_err(SledError::from))
            .transpose()
            .map_err(RepoError::from)
    }

    #[tracing::instrument(level = "debug", skip(self, video), fields(id = %video.id))]
    async fn update_video(&self, video: &Video) -> Result<(), RepoError> {
        let id = video.id;
        let bytes = serde_json::to_vec(video).map_err(SledError::from)?;

        b!(self.videos, {
            let res = videos.transaction(|tx| {
                if tx.get(id.as_bytes())?.is_none() {
                    return abort(());
                }

                tx.insert(id.as_bytes().as_slice(), bytes.as_slice())?;

                Ok(())
            });

            match res {
                Ok(()) => Ok(()),
                Err(TransactionError::Abort(())) => Err(SledError::Missing),
                Err(TransactionError::Storage(e)) => Err(SledError::Sled(e)),
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SledRepo;
    use crate::repo::{NewVideo, RepoError, VideoRepo};

    fn repo() -> SledRepo {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("Opened temporary db");

        SledRepo::new(db).expect("Opened trees")
    }

    #[tokio::test]
    async fn create_then_read() {
        let repo = repo();
        let user_id = uuid::Uuid::new_v4();

        let created = repo
            .create_video(NewVideo {
                user_id,
                title: String::from("Boots"),
                description: String::from("An ad for boots"),
            })
            .await
            .expect("Created");

        assert_eq!(created.user_id, user_id);
        assert_eq!(created.video_url, None);

        let read = repo.video(created.id).await.expect("Read");
        assert_eq!(read, Some(created));
    }

    #[tokio::test]
    async fn unknown_video_is_none() {
        let repo = repo();

        assert_eq!(repo.video(uuid::Uuid::new_v4()).await.expect("Read"), None);
    }

    #[tokio::test]
    async fn update_replaces_record() {
        let repo = repo();

        let mut video = repo
            .create_video(NewVideo {
                user_id: uuid::Uuid::new_v4(),
                title: String::from("Boots"),
                description: String::new(),
            })
            .await
            .expect("Created");

        video.video_url = Some(
            "https://tubely.s3.us-east-2.amazonaws.com/landscape/abc.mp4"
                .parse()
                .expect("Valid url"),
        );
        repo.update_video(&video).await.expect("Updated");

        assert_eq!(repo.video(video.id).await.expect("Read"), Some(video));
        repo.flush().await.expect("Flushed");
    }

    #[tokio::test]
    async fn record_carries_only_pipeline_fields() {
        let repo = repo();

        let video = repo
            .create_video(NewVideo {
                user_id: uuid::Uuid::new_v4(),
                title: String::from("Boots"),
                description: String::new(),
            })
            .await
            .expect("Created");

        let value = serde_json::to_value(&video).expect("Serialized");
        let mut fields = value
            .as_object()
            .expect("Record is an object")
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        fields.sort();

        assert_eq!(
            fields,
            ["created_at", "description", "id", "title", "updated_at", "user_id"]
        );
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let repo = repo();

        let video = repo
            .create_video(NewVideo {
                user_id: uuid::Uuid::new_v4(),
                title: String::from("Boots"),
                description: String::new(),
            })
            .await
            .expect("Created");

        let mut stranger = video.clone();
        stranger.id = uuid::Uuid::new_v4();

        let err = repo
            .update_video(&stranger)
            .await
            .expect_err("Update should fail");

        assert!(matches!(
            err,
            RepoError::SledError(super::SledError::Missing)
        ));
        assert_eq!(err.error_code().as_str(), "video-not-found");
    }
}

use std::sync::Arc;

use crate::{
    asset_key::NameSource, auth::Authenticate, config::Media, discover::Probe,
    faststart::Normalize, repo::ArcRepo, tmp_file::ArcTmpDir,
};

#[derive(Clone)]
pub(crate) struct State<S> {
    pub(super) media: Media,
    pub(super) tmp_dir: ArcTmpDir,
    pub(super) repo: ArcRepo,
    pub(super) store: S,
    pub(super) auth: Arc<dyn Authenticate>,
    pub(super) prober: Arc<dyn Probe>,
    pub(super) normalizer: Arc<dyn Normalize>,
    pub(super) names: Arc<dyn NameSource>,
}

/// Media types the upload pipeline accepts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum VideoFormat {
    Mp4,
}

impl VideoFormat {
    pub(crate) fn from_media_type(media_type: &mime::Mime) -> Option<Self> {
        match (media_type.type_(), media_type.subtype().as_str()) {
            (mime::VIDEO, "mp4") => Some(Self::Mp4),
            _ => None,
        }
    }

    pub(crate) const fn file_extension(self) -> &'static str {
        match self {
            Self::Mp4 => ".mp4",
        }
    }

    pub(crate) fn media_type(self) -> mime::Mime {
        match self {
            Self::Mp4 => video_mp4(),
        }
    }
}

fn video_mp4() -> mime::Mime {
    "video/mp4".parse().unwrap()
}

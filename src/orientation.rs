use crate::discover::VideoGeometry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Orientation {
    Landscape,
    Portrait,
    Other,
}

impl Orientation {
    /// The directory segment objects of this orientation are stored under
    pub(crate) const fn directory(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Other => "other",
        }
    }
}

impl From<VideoGeometry> for Orientation {
    fn from(geometry: VideoGeometry) -> Self {
        classify(geometry.width(), geometry.height())
    }
}

/// Exact 16:9 and 9:16 matches only, using truncating integer division
///
/// Frames that are merely close to 16:9, like 1918x1080, land in Other.
pub(crate) const fn classify(width: u32, height: u32) -> Orientation {
    let (width, height) = (width as u64, height as u64);

    if width == 16 * height / 9 {
        Orientation::Landscape
    } else if height == 16 * width / 9 {
        Orientation::Portrait
    } else {
        Orientation::Other
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, Orientation};

    #[test]
    fn canonical_ratios() {
        assert_eq!(classify(1920, 1080), Orientation::Landscape);
        assert_eq!(classify(1280, 720), Orientation::Landscape);
        assert_eq!(classify(1080, 1920), Orientation::Portrait);
        assert_eq!(classify(720, 1280), Orientation::Portrait);
        assert_eq!(classify(1000, 1000), Orientation::Other);
        assert_eq!(classify(640, 480), Orientation::Other);
    }

    #[test]
    fn near_widescreen_is_other() {
        // integer division makes the match exact, so slightly cropped frames don't qualify
        assert_eq!(classify(1918, 1080), Orientation::Other);
        assert_eq!(classify(1080, 1918), Orientation::Other);
    }

    #[test]
    fn truncation_still_matches() {
        // 16 * 1081 / 9 == 1921 after truncation
        assert_eq!(classify(1921, 1081), Orientation::Landscape);
        assert_eq!(classify(1081, 1921), Orientation::Portrait);
    }

    #[test]
    fn large_dimensions_do_not_overflow() {
        assert_eq!(classify(u32::MAX, u32::MAX), Orientation::Other);
    }

    #[test]
    fn directories() {
        assert_eq!(Orientation::Landscape.directory(), "landscape");
        assert_eq!(Orientation::Portrait.directory(), "portrait");
        assert_eq!(Orientation::Other.directory(), "other");
    }
}

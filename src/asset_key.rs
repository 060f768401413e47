use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use uuid::Uuid;

use crate::{formats::VideoFormat, orientation::Orientation};

/// Source of the random part of an asset's storage key
pub(crate) trait NameSource: Send + Sync {
    fn next_name(&self) -> String;
}

/// 256 bits from the OS CSPRNG, as url-safe base64
#[derive(Debug, Default)]
pub(crate) struct RandomNames;

impl NameSource for RandomNames {
    fn next_name(&self) -> String {
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());

        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub(crate) struct AssetKey {
    key: String,
}

impl AssetKey {
    pub(crate) fn generate(
        format: VideoFormat,
        orientation: Orientation,
        names: &dyn NameSource,
    ) -> Self {
        AssetKey {
            key: format!(
                "{}/{}{}",
                orientation.directory(),
                names.next_name(),
                format.file_extension()
            ),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{AssetKey, NameSource, RandomNames};
    use crate::{formats::VideoFormat, orientation::Orientation};

    struct Fixed;

    impl NameSource for Fixed {
        fn next_name(&self) -> String {
            String::from("fixed")
        }
    }

    #[test]
    fn layout() {
        let cases = [
            (Orientation::Landscape, "landscape/fixed.mp4"),
            (Orientation::Portrait, "portrait/fixed.mp4"),
            (Orientation::Other, "other/fixed.mp4"),
        ];

        for (orientation, expected) in cases {
            let key = AssetKey::generate(VideoFormat::Mp4, orientation, &Fixed);
            assert_eq!(key.as_str(), expected);
        }
    }

    #[test]
    fn random_names_are_url_safe() {
        let name = RandomNames.next_name();

        assert_eq!(name.len(), 43);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn random_names_differ() {
        let names = (0..1000)
            .map(|_| RandomNames.next_name())
            .collect::<HashSet<_>>();

        assert_eq!(names.len(), 1000);
    }
}

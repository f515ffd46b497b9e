/// Coarse orientation bucket for a video, used to namespace storage keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AspectRatio {
    Landscape,
    Portrait,
    Other,
}

impl AspectRatio {
    /// Bucket a pair of pixel dimensions
    ///
    /// A 16:9 frame is landscape and a 9:16 frame is portrait. The comparison is exact against
    /// the truncated result of the float computation, so 1366x768 is landscape but 1280x721 is
    /// not.
    pub(crate) fn classify(width: u32, height: u32) -> Self {
        let width = f64::from(width);
        let height = i64::from(height);

        if (width / 16.0 * 9.0) as i64 == height {
            Self::Landscape
        } else if (width / 9.0 * 16.0) as i64 == height {
            Self::Portrait
        } else {
            Self::Other
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::AspectRatio;

    #[test]
    fn common_sizes() {
        let cases = [
            ((1920, 1080), AspectRatio::Landscape),
            ((1280, 720), AspectRatio::Landscape),
            ((3840, 2160), AspectRatio::Landscape),
            ((1080, 1920), AspectRatio::Portrait),
            ((720, 1280), AspectRatio::Portrait),
            ((1000, 1000), AspectRatio::Other),
            ((640, 480), AspectRatio::Other),
        ];

        for ((width, height), expected) in cases {
            assert_eq!(
                AspectRatio::classify(width, height),
                expected,
                "{width}x{height}"
            );
        }
    }

    #[test]
    fn truncates_toward_zero() {
        // 1366 / 16 * 9 = 768.375
        assert_eq!(AspectRatio::classify(1366, 768), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(1366, 769), AspectRatio::Other);

        // 100 / 16 * 9 = 56.25
        assert_eq!(AspectRatio::classify(100, 56), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(100, 57), AspectRatio::Other);

        // 100 / 9 * 16 = 177.77..
        assert_eq!(AspectRatio::classify(100, 177), AspectRatio::Portrait);
        assert_eq!(AspectRatio::classify(100, 178), AspectRatio::Other);
    }

    #[test]
    fn missing_dimensions() {
        // the landscape check is first and 0 == 0
        assert_eq!(AspectRatio::classify(0, 0), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(0, 10), AspectRatio::Other);
    }

    #[test]
    fn display_is_key_prefix() {
        assert_eq!(AspectRatio::Landscape.to_string(), "landscape");
        assert_eq!(AspectRatio::Portrait.to_string(), "portrait");
        assert_eq!(AspectRatio::Other.to_string(), "other");
    }
}

//! Display-density classification.
//!
//! The engine doubles requested widths on high-density ("retina") displays
//! so the served asset has enough physical pixels. Classification reads two
//! host signals through the [`Viewport`] seam: the device pixel ratio and a
//! media-feature match against the prefixed high-density query list.
//!
//! [`is_high_density`] is a pure function of the viewport — it caches
//! nothing. The engine stores the result and refreshes it on init and on
//! every resize notification.

use serde::{Deserialize, Serialize};

/// Media-feature disjunction matched by common high-density displays.
///
/// Covers the WebKit/Gecko/Presto prefixed forms plus the standard
/// `min-resolution` thresholds (114dpi / 1.5dppx).
pub const HIGH_DENSITY_MEDIA_QUERY: &str = "(-webkit-min-device-pixel-ratio: 1.5),\
(min--moz-device-pixel-ratio: 1.5),\
(-o-min-device-pixel-ratio: 3/2),\
(min-device-pixel-ratio: 1.5),\
(min-resolution: 114dpi),\
(min-resolution: 1.5dppx)";

/// Viewport/device signals the classifier reads.
pub trait Viewport {
    /// Physical-to-CSS pixel ratio of the current display.
    fn device_pixel_ratio(&self) -> f64;

    /// Whether the given media query matches the current environment.
    fn matches_media(&self, query: &str) -> bool;
}

/// Classify the current display as high-density.
///
/// True when the device pixel ratio exceeds 1.5 **or**
/// [`HIGH_DENSITY_MEDIA_QUERY`] matches.
pub fn is_high_density(viewport: &impl Viewport) -> bool {
    viewport.device_pixel_ratio() > 1.5 || viewport.matches_media(HIGH_DENSITY_MEDIA_QUERY)
}

/// Fixed-value viewport for hosts that sample their environment once.
///
/// The CLI builds one from its input manifest; tests build them inline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticViewport {
    /// Reported device pixel ratio.
    pub device_pixel_ratio: f64,
    /// Whether high-density media queries should match.
    pub high_density_media: bool,
}

impl Default for StaticViewport {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            high_density_media: false,
        }
    }
}

impl Viewport for StaticViewport {
    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    fn matches_media(&self, _query: &str) -> bool {
        self.high_density_media
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_density_display() {
        let viewport = StaticViewport::default();
        assert!(!is_high_density(&viewport));
    }

    #[test]
    fn high_pixel_ratio_classifies_as_dense() {
        let viewport = StaticViewport {
            device_pixel_ratio: 2.0,
            high_density_media: false,
        };
        assert!(is_high_density(&viewport));
    }

    #[test]
    fn ratio_at_threshold_is_not_dense() {
        // Strictly greater than 1.5 — the media query covers the boundary.
        let viewport = StaticViewport {
            device_pixel_ratio: 1.5,
            high_density_media: false,
        };
        assert!(!is_high_density(&viewport));
    }

    #[test]
    fn media_match_alone_classifies_as_dense() {
        let viewport = StaticViewport {
            device_pixel_ratio: 1.0,
            high_density_media: true,
        };
        assert!(is_high_density(&viewport));
    }

    #[test]
    fn query_lists_all_prefixed_forms() {
        for feature in [
            "-webkit-min-device-pixel-ratio: 1.5",
            "min--moz-device-pixel-ratio: 1.5",
            "-o-min-device-pixel-ratio: 3/2",
            "min-device-pixel-ratio: 1.5",
            "min-resolution: 114dpi",
            "min-resolution: 1.5dppx",
        ] {
            assert!(
                HIGH_DENSITY_MEDIA_QUERY.contains(feature),
                "missing feature: {feature}"
            );
        }
    }
}

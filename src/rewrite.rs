//! URL template rewriting.
//!
//! Source URLs carry a mode-encoded template path:
//!
//! ```text
//! /image/<mode:0-4>/<width>/<height>[/<crop>[/<background>]]/<path>
//! ```
//!
//! The leading mode token selects the rewrite semantics:
//!
//! | Token | Mode | Output |
//! |-------|------|--------|
//! | `0` | passthrough | `/image/0/<path>` — width ignored (vector/logo assets) |
//! | `1`, `4` | fixed aspect | `/image/<mode>/<w>/0/<path>` — height `0` = server computes |
//! | `2`, `3` | crop to box | `/image/<mode>/<w>/<h>/<crop>[/<background>]/<path>` — height rescaled |
//!
//! Anything that does not fit — a URL the pattern does not match, an
//! unsupported mode token, a crop template missing its crop token — leaves
//! the source string untouched. Degradation is silent by design: the caller
//! swaps in whatever string comes back and the network layer decides what
//! that resolves to.
//!
//! Rewriting is pure string transformation plus integer arithmetic. No
//! document or network access happens here.

use regex::Regex;
use tracing::debug;

/// Default template pattern.
///
/// Capture groups, in order: mode, width, height, crop (optional single
/// digit), background (optional 3-6 hex chars), path. The pattern is not
/// anchored at the start, so a scheme/host prefix before `/image/` is
/// preserved verbatim by [`SourcePattern::rewrite`].
pub const DEFAULT_PATTERN: &str =
    r"(?i)/image/(\d)/(\d+)/(\d+)/?(\d)?/?([0-9a-fA-F]{3,6})?/?(.+)$";

/// Rewrite semantics selected by the template's mode token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Never resized; width and height are ignored.
    Passthrough,
    /// Resize to the selected width, height computed server-side.
    FixedAspect,
    /// Resize and crop to a box; height rescaled from the template's
    /// embedded dimensions.
    CropBox,
}

impl ResizeMode {
    /// Classify a mode token. Unsupported tokens yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "0" => Some(Self::Passthrough),
            "1" | "4" => Some(Self::FixedAspect),
            "2" | "3" => Some(Self::CropBox),
            _ => None,
        }
    }
}

/// Fields extracted from a template-encoded source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFields<'a> {
    pub mode: ResizeMode,
    /// The literal mode token, echoed into the rewritten URL (`1` and `4`
    /// share semantics but stay distinct on the wire, as do `2` and `3`).
    pub token: &'a str,
    /// Template width, used as the aspect base for crop modes.
    pub width: u32,
    /// Template height, rescaled for crop modes.
    pub height: u32,
    pub crop: Option<&'a str>,
    pub background: Option<&'a str>,
    pub path: &'a str,
}

/// A compiled URL-template pattern.
///
/// Any capture-group pattern with the six groups of [`DEFAULT_PATTERN`]
/// works; servers with different path conventions configure their own.
#[derive(Debug, Clone)]
pub struct SourcePattern {
    regex: Regex,
}

impl SourcePattern {
    /// Compile a template pattern.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Extract template fields from a source URL.
    ///
    /// Returns `None` when the pattern does not match, the mode token is
    /// unsupported, or a numeric field does not fit `u32`.
    pub fn parse<'a>(&self, src: &'a str) -> Option<TemplateFields<'a>> {
        let caps = self.regex.captures(src)?;
        let token = caps.get(1)?.as_str();
        let Some(mode) = ResizeMode::from_token(token) else {
            debug!(token, src, "unsupported mode token, leaving source unchanged");
            return None;
        };
        let width = caps.get(2)?.as_str().parse().ok()?;
        let height = caps.get(3)?.as_str().parse().ok()?;
        Some(TemplateFields {
            mode,
            token,
            width,
            height,
            crop: caps.get(4).map(|m| m.as_str()),
            background: caps.get(5).map(|m| m.as_str()),
            path: caps.get(6)?.as_str(),
        })
    }

    /// Rewrite a source URL for the selected width.
    ///
    /// Everything before the matched template region (scheme, host) is
    /// preserved. A source that cannot be rewritten is returned unchanged.
    pub fn rewrite(&self, src: &str, selected_width: u32) -> String {
        let Some(start) = self.regex.find(src).map(|m| m.start()) else {
            debug!(src, "source does not match template pattern");
            return src.to_string();
        };
        let Some(fields) = self.parse(src) else {
            return src.to_string();
        };
        let prefix = &src[..start];

        match fields.mode {
            ResizeMode::Passthrough => format!("{prefix}/image/0/{}", fields.path),
            ResizeMode::FixedAspect => format!(
                "{prefix}/image/{}/{selected_width}/0/{}",
                fields.token, fields.path
            ),
            ResizeMode::CropBox => {
                let Some(crop) = fields.crop else {
                    debug!(src, "crop template missing crop token");
                    return src.to_string();
                };
                if fields.width == 0 {
                    debug!(src, "crop template has zero width");
                    return src.to_string();
                }
                let new_height = scaled_height(selected_width, fields.width, fields.height);
                let mut out = format!(
                    "{prefix}/image/{}/{selected_width}/{new_height}/{crop}/",
                    fields.token
                );
                if let Some(background) = fields.background {
                    out.push_str(background);
                    out.push('/');
                }
                out.push_str(fields.path);
                out
            }
        }
    }
}

impl Default for SourcePattern {
    fn default() -> Self {
        Self::compile(DEFAULT_PATTERN).expect("default pattern must compile")
    }
}

/// Rescale a template height for the selected width.
///
/// Exact rational ceiling of `selected * height / width`; ceiling avoids
/// under-cropping when the division is inexact.
fn scaled_height(selected_width: u32, template_width: u32, template_height: u32) -> u32 {
    let numerator = selected_width as u64 * template_height as u64;
    numerator.div_ceil(template_width as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> SourcePattern {
        SourcePattern::default()
    }

    // =========================================================================
    // parse tests
    // =========================================================================

    #[test]
    fn parse_full_crop_template() {
        let p = pattern();
        let fields = p.parse("/image/2/800/600/1/fff000/photos/dawn.jpg").unwrap();
        assert_eq!(
            fields,
            TemplateFields {
                mode: ResizeMode::CropBox,
                token: "2",
                width: 800,
                height: 600,
                crop: Some("1"),
                background: Some("fff000"),
                path: "photos/dawn.jpg",
            }
        );
    }

    #[test]
    fn parse_fixed_aspect_template() {
        let p = pattern();
        let fields = p.parse("/image/1/320/0/dawn.jpg").unwrap();
        assert_eq!(fields.mode, ResizeMode::FixedAspect);
        assert_eq!(fields.token, "1");
        assert_eq!(fields.crop, None);
        assert_eq!(fields.background, None);
        assert_eq!(fields.path, "dawn.jpg");
    }

    #[test]
    fn parse_rejects_unsupported_mode() {
        assert_eq!(pattern().parse("/image/7/320/0/dawn.jpg"), None);
    }

    #[test]
    fn parse_rejects_non_matching_source() {
        assert_eq!(pattern().parse("/assets/dawn.jpg"), None);
    }

    #[test]
    fn mode_token_classification() {
        assert_eq!(ResizeMode::from_token("0"), Some(ResizeMode::Passthrough));
        assert_eq!(ResizeMode::from_token("1"), Some(ResizeMode::FixedAspect));
        assert_eq!(ResizeMode::from_token("4"), Some(ResizeMode::FixedAspect));
        assert_eq!(ResizeMode::from_token("2"), Some(ResizeMode::CropBox));
        assert_eq!(ResizeMode::from_token("3"), Some(ResizeMode::CropBox));
        assert_eq!(ResizeMode::from_token("5"), None);
        assert_eq!(ResizeMode::from_token("9"), None);
    }

    // =========================================================================
    // rewrite tests — passthrough
    // =========================================================================

    #[test]
    fn passthrough_ignores_width() {
        let p = pattern();
        assert_eq!(
            p.rewrite("/image/0/0/0/logos/mark.svg", 640),
            "/image/0/logos/mark.svg"
        );
        assert_eq!(
            p.rewrite("/image/0/0/0/logos/mark.svg", 160),
            "/image/0/logos/mark.svg"
        );
    }

    // =========================================================================
    // rewrite tests — fixed aspect
    // =========================================================================

    #[test]
    fn fixed_aspect_substitutes_width_and_auto_height() {
        let p = pattern();
        assert_eq!(
            p.rewrite("/image/1/800/600/dawn.jpg", 320),
            "/image/1/320/0/dawn.jpg"
        );
        assert_eq!(
            p.rewrite("/image/4/800/600/dawn.jpg", 320),
            "/image/4/320/0/dawn.jpg"
        );
    }

    // =========================================================================
    // rewrite tests — crop to box
    // =========================================================================

    #[test]
    fn crop_rescales_height_with_ceiling() {
        // ceil(200 / 400 * 100) = 50
        let p = pattern();
        assert_eq!(
            p.rewrite("/image/2/400/100/0/dawn.jpg", 200),
            "/image/2/200/50/0/dawn.jpg"
        );
        // ceil(320 / 800 * 601) = ceil(240.4) = 241
        assert_eq!(
            p.rewrite("/image/3/800/601/1/dawn.jpg", 320),
            "/image/3/320/241/1/dawn.jpg"
        );
    }

    #[test]
    fn crop_appends_background_when_present() {
        let p = pattern();
        assert_eq!(
            p.rewrite("/image/2/800/600/1/fff000/dawn.jpg", 320),
            "/image/2/320/240/1/fff000/dawn.jpg"
        );
    }

    #[test]
    fn crop_without_background_omits_the_field() {
        let p = pattern();
        assert_eq!(
            p.rewrite("/image/2/800/600/1/dawn.jpg", 320),
            "/image/2/320/240/1/dawn.jpg"
        );
    }

    #[test]
    fn crop_without_crop_token_is_left_unchanged() {
        let p = pattern();
        let src = "/image/2/800/600/abc123/dawn.jpg";
        assert_eq!(p.rewrite(src, 320), src);
    }

    #[test]
    fn crop_with_zero_template_width_is_left_unchanged() {
        let p = pattern();
        let src = "/image/2/0/600/1/dawn.jpg";
        assert_eq!(p.rewrite(src, 320), src);
    }

    // =========================================================================
    // rewrite tests — degradation and prefix handling
    // =========================================================================

    #[test]
    fn non_matching_source_is_left_unchanged() {
        let p = pattern();
        assert_eq!(p.rewrite("/assets/dawn.jpg", 320), "/assets/dawn.jpg");
        assert_eq!(p.rewrite("", 320), "");
    }

    #[test]
    fn unsupported_mode_is_left_unchanged() {
        let p = pattern();
        let src = "/image/7/800/600/1/dawn.jpg";
        assert_eq!(p.rewrite(src, 320), src);
    }

    #[test]
    fn host_prefix_is_preserved() {
        let p = pattern();
        assert_eq!(
            p.rewrite("https://img.example.com/image/1/800/600/dawn.jpg", 640),
            "https://img.example.com/image/1/640/0/dawn.jpg"
        );
    }

    #[test]
    fn pattern_matches_case_insensitively() {
        let p = pattern();
        assert_eq!(
            p.rewrite("/IMAGE/1/800/600/dawn.jpg", 320),
            "/image/1/320/0/dawn.jpg"
        );
    }

    #[test]
    fn custom_pattern_is_honored() {
        let p =
            SourcePattern::compile(r"/img/(\d)/(\d+)/(\d+)/?(\d)?/?([0-9a-fA-F]{3,6})?/?(.+)$")
                .unwrap();
        assert_eq!(p.rewrite("/img/0/0/0/mark.svg", 320), "/image/0/mark.svg");
    }

    #[test]
    fn invalid_pattern_fails_to_compile() {
        assert!(SourcePattern::compile("(unclosed").is_err());
    }

    // =========================================================================
    // scaled_height tests
    // =========================================================================

    #[test]
    fn scaled_height_exact_division() {
        assert_eq!(scaled_height(200, 400, 100), 50);
        assert_eq!(scaled_height(400, 400, 100), 100);
    }

    #[test]
    fn scaled_height_rounds_up() {
        assert_eq!(scaled_height(320, 800, 601), 241);
        assert_eq!(scaled_height(1, 3, 1), 1);
    }

    #[test]
    fn scaled_height_large_values_do_not_overflow() {
        assert_eq!(scaled_height(u32::MAX, 1, 1), u32::MAX);
    }
}

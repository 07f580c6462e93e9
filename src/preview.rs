//! HTML preview of a resolve report.
//!
//! Renders what the engine decided — one card per placeholder showing the
//! template, the width decision, and the resolved asset wired up as a
//! real `img` (or background div) so the preview exercises the same URLs
//! a page would. Written as a single self-contained file with inline CSS.
//!
//! Markup is generated with Maud: compile-time checked, auto-escaped, no
//! template files to ship.

use crate::manifest::{ResolveReport, ResolvedEntry};
use maud::{DOCTYPE, Markup, html};

const PREVIEW_CSS: &str = "\
body { font-family: system-ui, sans-serif; margin: 2rem; background: #fafafa; }
h1 { font-size: 1.3rem; }
p.summary { color: #666; }
figure.variant { background: #fff; border: 1px solid #e0e0e0; padding: 1rem; margin: 0 0 1rem 0; }
figure.variant div.background { background-size: cover; background-position: center; }
figcaption { font-size: 0.85rem; color: #333; margin-top: 0.5rem; }
figcaption code { background: #f0f0f0; padding: 0.1rem 0.3rem; }
";

/// Render the full preview document.
pub fn render_preview(report: &ResolveReport) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "respimg preview" }
                style { (PREVIEW_CSS) }
            }
            body {
                h1 { "Resolved variants" }
                p.summary { (summary(report)) }
                @for entry in &report.entries {
                    (render_entry(entry))
                }
            }
        }
    };
    markup.into_string()
}

fn summary(report: &ResolveReport) -> String {
    format!(
        "{} placeholders, {} cached, {} fetched{}",
        report.entries.len(),
        report.cache_hits,
        report.fetches,
        if report.high_density {
            ", high density"
        } else {
            ""
        }
    )
}

fn render_entry(entry: &ResolvedEntry) -> Markup {
    html! {
        figure.variant {
            @if entry.background {
                div.background style=(background_style(entry)) {}
            } @else {
                img src=(entry.resolved_url) width=(entry.selected_width) alt=(entry.template);
            }
            figcaption {
                code { (entry.template) }
                " at " (entry.rendered_width) "px → "
                code { (entry.resolved_url) }
                " (" (entry.selected_width) "px)"
            }
        }
    }
}

fn background_style(entry: &ResolvedEntry) -> String {
    format!(
        "background-image: url({}); width: {}px; height: {}px",
        entry.resolved_url,
        entry.selected_width,
        entry.selected_width / 2
    )
}

//! Share link formats.
//!
//! Canonical links open the editor (`/share/{id}`); embed links render the
//! viewer alone (`?embed=true`), optionally fullscreen without the sidebar.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use thiserror::Error;

use crate::util::is_valid_share_id;

pub const DEFAULT_EMBED_WIDTH: u32 = 800;
pub const DEFAULT_EMBED_HEIGHT: u32 = 600;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Invalid origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },
}

fn share_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/share/([A-Za-z0-9_-]+)$").unwrap_or_else(|e| panic!("share path regex: {e}"))
    })
}

/// Builds links to shares hosted at one origin
#[derive(Debug, Clone)]
pub struct ShareLinks {
    origin: Url,
}

impl ShareLinks {
    pub fn new(origin: &str) -> Result<Self, LinkError> {
        let invalid = |reason: String| LinkError::InvalidOrigin {
            origin: origin.to_string(),
            reason,
        };
        let url = Url::parse(origin).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid("not an http(s) origin".into()));
        }
        Ok(Self { origin: url })
    }

    /// Origin without a trailing slash
    pub fn origin(&self) -> String {
        self.origin.origin().ascii_serialization()
    }

    fn share_url(&self, id: &str) -> Url {
        let mut url = self.origin.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.set_path("/share/");
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        url
    }

    /// `{origin}/share/{id}`
    pub fn canonical(&self, id: &str) -> String {
        self.share_url(id).to_string()
    }

    /// `{origin}/share/{id}?embed=true`
    pub fn embed(&self, id: &str) -> String {
        let mut url = self.share_url(id);
        url.query_pairs_mut().append_pair("embed", "true");
        url.to_string()
    }

    /// Embed link with the fullscreen layout and no sidebar
    pub fn fullscreen_embed(&self, id: &str) -> String {
        let mut url = self.share_url(id);
        url.query_pairs_mut()
            .append_pair("embed", "true")
            .append_pair("fullscreen", "true")
            .append_pair("sidebar", "false");
        url.to_string()
    }

    /// `<iframe>` snippet for the embed link
    pub fn iframe(&self, id: &str, width: Option<u32>, height: Option<u32>) -> String {
        format!(
            r#"<iframe src="{}" width="{}" height="{}" frameborder="0" allowfullscreen></iframe>"#,
            self.embed(id),
            width.unwrap_or(DEFAULT_EMBED_WIDTH),
            height.unwrap_or(DEFAULT_EMBED_HEIGHT)
        )
    }
}

/// What a page URL asks the front end to show
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLinkParams {
    pub share_id: Option<String>,
    pub embed: bool,
    pub fullscreen: bool,
    pub hide_sidebar: bool,
}

impl ShareLinkParams {
    /// Parse an absolute URL or a path with query (`/share/abc?embed=true`)
    pub fn parse(input: &str) -> Option<Self> {
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(_) => Url::parse("http://localhost/").ok()?.join(input).ok()?,
        };

        let mut params = ShareLinkParams {
            share_id: share_path_pattern()
                .captures(url.path())
                .map(|caps| caps[1].to_string()),
            ..Default::default()
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "share" if params.share_id.is_none() && is_valid_share_id(&value) => {
                    params.share_id = Some(value.into_owned());
                }
                "embed" => params.embed = value == "true",
                "fullscreen" => params.fullscreen = value == "true",
                "sidebar" => params.hide_sidebar = value == "false",
                _ => {}
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> ShareLinks {
        ShareLinks::new("https://ggb.example.com").unwrap()
    }

    #[test]
    fn test_link_formats() {
        let links = links();
        assert_eq!(links.origin(), "https://ggb.example.com");
        assert_eq!(links.canonical("abc1234"), "https://ggb.example.com/share/abc1234");
        assert_eq!(
            links.embed("abc1234"),
            "https://ggb.example.com/share/abc1234?embed=true"
        );
        assert_eq!(
            links.fullscreen_embed("abc1234"),
            "https://ggb.example.com/share/abc1234?embed=true&fullscreen=true&sidebar=false"
        );
    }

    #[test]
    fn test_origin_path_is_ignored() {
        let links = ShareLinks::new("http://localhost:3000/editor/?x=1").unwrap();
        assert_eq!(links.canonical("q"), "http://localhost:3000/share/q");
    }

    #[test]
    fn test_iframe_defaults() {
        let html = links().iframe("abc1234", None, None);
        assert_eq!(
            html,
            r#"<iframe src="https://ggb.example.com/share/abc1234?embed=true" width="800" height="600" frameborder="0" allowfullscreen></iframe>"#
        );
        assert!(links().iframe("abc1234", Some(640), Some(360)).contains(r#"width="640" height="360""#));
    }

    #[test]
    fn test_invalid_origin() {
        assert!(ShareLinks::new("not a url").is_err());
        assert!(ShareLinks::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_parse_path_and_flags() {
        let params =
            ShareLinkParams::parse("https://ggb.example.com/share/ab_c-9?embed=true&fullscreen=true&sidebar=false")
                .unwrap();
        assert_eq!(params.share_id.as_deref(), Some("ab_c-9"));
        assert!(params.embed);
        assert!(params.fullscreen);
        assert!(params.hide_sidebar);
    }

    #[test]
    fn test_parse_query_and_relative() {
        let params = ShareLinkParams::parse("/?share=xyz").unwrap();
        assert_eq!(params.share_id.as_deref(), Some("xyz"));
        assert!(!params.embed);

        let params = ShareLinkParams::parse("/share/abc?embed=false").unwrap();
        assert_eq!(params.share_id.as_deref(), Some("abc"));
        assert!(!params.embed);
    }

    #[test]
    fn test_parse_ignores_malformed_query_id() {
        for input in ["/?share=", "/?share=..%2Fadmin", "/?share=a%20b"] {
            assert_eq!(ShareLinkParams::parse(input).unwrap().share_id, None, "{input}");
        }
        let params = ShareLinkParams::parse("/?share=ab_C-9&embed=true").unwrap();
        assert_eq!(params.share_id.as_deref(), Some("ab_C-9"));
    }

    #[test]
    fn test_parse_rejects_nested_share_path() {
        let params = ShareLinkParams::parse("/share/abc/extra").unwrap();
        assert_eq!(params.share_id, None);

        let params = ShareLinkParams::parse("/share/a.b").unwrap();
        assert_eq!(params.share_id, None);
    }
}

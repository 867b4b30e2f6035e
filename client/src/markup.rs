//! Extraction rules for the portal's HTML fragments.

use regex::Regex;

use crate::error::{ClientError, ClientResult};

/// An item discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemRef {
    /// Id used to fetch the detail view
    pub view_id: String,
    /// Id used for the like request and the history record
    pub like_id: String,
}

impl ItemRef {
    /// An item whose view and like ids coincide, which is the portal's case
    pub fn same(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            view_id: id.clone(),
            like_id: id,
        }
    }
}

/// Scraping rules. Swappable so the client never depends on page layout.
pub trait MarkupParser: Send + Sync {
    /// QR code target from the `qr_login_more_v1` response
    fn qr_target(&self, body: &str) -> ClientResult<String>;

    /// Items linked from a listing fragment, in page order
    fn listing_items(&self, body: &str) -> ClientResult<Vec<ItemRef>>;

    /// Text of the confirm control on a detail page, if present
    fn confirm_label(&self, body: &str) -> Option<String>;

    /// Display name of the active community on the landing page
    fn active_community(&self, body: &str) -> Option<String>;
}

/// Regex-based `MarkupParser` for the current portal markup.
#[derive(Debug, Clone)]
pub struct RegexMarkupParser {
    quoted: Regex,
    anchor_href: Regex,
    confirm_span: Regex,
    change_member: Regex,
    tag: Regex,
}

impl RegexMarkupParser {
    /// Compile the extraction rules
    pub fn new() -> ClientResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ClientError::Markup(format!("Invalid pattern {}: {}", pattern, e)))
        };
        Ok(Self {
            quoted: compile(r#""([^"]+)"#)?,
            anchor_href: compile(r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            confirm_span: compile(
                r#"(?is)<span\b[^>]*?\bid\s*=\s*["']cmdLike["'][^>]*>(.*?)</span>"#,
            )?,
            change_member: compile(
                r#"(?is)\bid\s*=\s*["']changeMember["'][^>]*>.*?<span\b[^>]*>(.*?)</span>"#,
            )?,
            tag: compile(r"<[^>]*>")?,
        })
    }

    fn inner_text(&self, html: &str) -> String {
        self.tag.replace_all(html, "").trim().to_string()
    }
}

/// Pull the item id out of a listing link such as
/// `javascript:go('/community/title_view?title=ABC')`: everything after the
/// first `=` up to the last `'`.
fn item_id_from_href(href: &str) -> Option<&str> {
    let start = href.find('=')? + 1;
    let end = href.rfind('\'').filter(|end| *end >= start).unwrap_or(href.len());
    let id = href[start..end].trim();
    (!id.is_empty()).then_some(id)
}

impl MarkupParser for RegexMarkupParser {
    fn qr_target(&self, body: &str) -> ClientResult<String> {
        self.quoted
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ClientError::Markup("QR code target not found".to_string()))
    }

    fn listing_items(&self, body: &str) -> ClientResult<Vec<ItemRef>> {
        let items = self
            .anchor_href
            .captures_iter(body)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .filter_map(|href| item_id_from_href(href.as_str()))
            .map(ItemRef::same)
            .collect();
        Ok(items)
    }

    fn confirm_label(&self, body: &str) -> Option<String> {
        self.confirm_span
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| self.inner_text(m.as_str()))
    }

    fn active_community(&self, body: &str) -> Option<String> {
        self.change_member
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| self.inner_text(m.as_str()))
            .filter(|name| !name.is_empty())
    }
}

//! Placeholder items left behind by a move

use crate::db::{BodyFormat, ItemKind, ItemRecord, NewItem};

pub const DEFAULT_TITLE_TEMPLATE: &str = "Moved: {title}";

/// Builds redirect stubs for moved items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectGenerator {
    url_base: String,
    title_template: String,
}

impl Default for RedirectGenerator {
    fn default() -> Self {
        Self::new("", DEFAULT_TITLE_TEMPLATE)
    }
}

impl RedirectGenerator {
    /// `title_template` may contain `{title}`, replaced by the moved item's title
    #[must_use]
    pub fn new(url_base: impl Into<String>, title_template: impl Into<String>) -> Self {
        Self {
            url_base: url_base.into().trim_end_matches('/').to_string(),
            title_template: title_template.into(),
        }
    }

    /// Canonical location of an item, stable across moves
    #[must_use]
    pub fn url_for(&self, item: &ItemRecord) -> String {
        let slug = slugify(&item.title);
        if slug.is_empty() {
            format!("{}/discussion/{}", self.url_base, item.id)
        } else {
            format!("{}/discussion/{}/{slug}", self.url_base, item.id)
        }
    }

    /// Stub to create in `item`'s current container before it moves
    #[must_use]
    pub fn stub_for(&self, item: &ItemRecord, max_title_length: usize) -> NewItem {
        let title = self.title_template.replace("{title}", &item.title);
        let url = escape_html(&self.url_for(item));
        NewItem {
            container: item.container,
            kind: ItemKind::Redirect,
            title: truncate_chars(&title, max_title_length),
            body: format!("This discussion has been <a href=\"{url}\">moved</a>."),
            format: BodyFormat::Html,
            closed: true,
            inserted_at: Some(item.last_activity_at),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}

/// Lowercase ASCII words joined by `-`
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

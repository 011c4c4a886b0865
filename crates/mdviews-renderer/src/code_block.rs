//! Code block extraction for deferred highlighting.
//!
//! [`extract`] replaces every fenced code block that declares a language
//! with a placeholder token and records the highlighted HTML for that token
//! in a [`PlaceholderMap`]. The Markdown renderer then only ever sees the
//! token, so highlighted markup is neither re-interpreted as Markdown nor
//! touched by comment stripping. The caller swaps tokens for HTML afterwards.
//!
//! Tokens are UUID v4 strings: hex digits and hyphens only, so they render
//! as literal text and never look like a comment.

use uuid::Uuid;

use crate::engine::DocumentTree;
use crate::highlight::{HighlightError, Highlighter};

/// A placeholder token and the HTML it stands for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// Token inserted into the document.
    pub token: String,
    /// Language tag of the replaced code block.
    pub language: String,
    /// Highlighted HTML to substitute for the token.
    pub html: String,
}

/// Placeholder tokens in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    entries: Vec<Placeholder>,
}

impl PlaceholderMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the HTML for a token.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|p| p.token == token)
            .map(|p| p.html.as_str())
    }

    /// Whether `token` is already in use.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.entries.iter().any(|p| p.token == token)
    }

    /// Number of placeholders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no code block was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over placeholders in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, Placeholder> {
        self.entries.iter()
    }

    pub(crate) fn push(&mut self, placeholder: Placeholder) {
        self.entries.push(placeholder);
    }
}

impl<'a> IntoIterator for &'a PlaceholderMap {
    type Item = &'a Placeholder;
    type IntoIter = std::slice::Iter<'a, Placeholder>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Replace fenced code blocks that declare a language with placeholder tokens.
///
/// Blocks with an empty info string (and indented blocks) are left in the
/// tree and rendered as ordinary code blocks.
///
/// The walk is two-phase: code blocks are collected first, then replaced
/// from the back of the event list so that earlier spans stay valid.
pub fn extract(
    tree: &mut DocumentTree<'_>,
    highlighter: &Highlighter,
) -> Result<PlaceholderMap, HighlightError> {
    let blocks: Vec<_> = tree
        .code_blocks()
        .into_iter()
        .filter(|block| !block.fence_info.is_empty())
        .collect();

    let mut map = PlaceholderMap::new();
    for block in &blocks {
        let language = block.language();
        let html = highlighter.highlight(&block.string_content, language)?;
        let token = fresh_token(tree.source(), &map);
        map.push(Placeholder {
            token,
            language: language.to_owned(),
            html,
        });
    }

    for (block, placeholder) in blocks.iter().zip(map.iter()).rev() {
        tree.replace_with_text(block.span.clone(), format!("{}\n", placeholder.token));
    }

    tracing::debug!(count = map.len(), "Extracted code blocks");
    Ok(map)
}

/// Generate a token that occurs neither in the source nor in the map.
fn fresh_token(source: &str, map: &PlaceholderMap) -> String {
    loop {
        let token = Uuid::new_v4().to_string();
        if !source.contains(&token) && !map.contains(&token) {
            return token;
        }
    }
}

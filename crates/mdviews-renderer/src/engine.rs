//! CommonMark parsing and HTML generation.
//!
//! Wraps pulldown-cmark behind two operations:
//!
//! - [`parse`]: Markdown text to a [`DocumentTree`]
//! - [`render`]: a [`DocumentTree`] to an HTML string
//!
//! pulldown-cmark produces a flat stream of events rather than a node tree.
//! [`DocumentTree`] stores that stream as an arena addressed by index, so a
//! block such as a fenced code block is the index range between its start and
//! end events and can be replaced in place.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

/// Marker emitted in place of raw HTML when raw HTML is neither allowed nor escaped.
pub const RAW_HTML_OMITTED: &str = "<!-- raw HTML omitted -->";

/// Markdown syntax extensions beyond CommonMark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "snake_case")
)]
pub enum Extension {
    /// GitHub-style pipe tables.
    Table,
    /// `~~struck~~` text.
    Strikethrough,
    /// `- [ ] item` task lists.
    Tasklist,
    /// `[^1]` footnotes.
    Footnotes,
    /// `> [!NOTE]` style blockquote alerts.
    Alerts,
    /// `$inline$` and `$$display$$` math.
    Math,
    /// Definition lists.
    DefinitionList,
}

impl Extension {
    fn flag(self) -> Options {
        match self {
            Self::Table => Options::ENABLE_TABLES,
            Self::Strikethrough => Options::ENABLE_STRIKETHROUGH,
            Self::Tasklist => Options::ENABLE_TASKLISTS,
            Self::Footnotes => Options::ENABLE_FOOTNOTES,
            Self::Alerts => Options::ENABLE_GFM,
            Self::Math => Options::ENABLE_MATH,
            Self::DefinitionList => Options::ENABLE_DEFINITION_LIST,
        }
    }
}

/// Parser behavior switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "snake_case")
)]
pub enum ParseOption {
    /// Curly quotes, dashes and ellipses.
    SmartPunctuation,
    /// `# Heading {#id .class}` attributes.
    HeadingAttributes,
    /// Skip `---` delimited YAML front matter.
    YamlMetadataBlocks,
    /// Skip `+++` delimited front matter.
    PlusesMetadataBlocks,
    /// Pre-GFM footnote syntax (implies footnotes).
    OldFootnotes,
}

impl ParseOption {
    fn flag(self) -> Options {
        match self {
            Self::SmartPunctuation => Options::ENABLE_SMART_PUNCTUATION,
            Self::HeadingAttributes => Options::ENABLE_HEADING_ATTRIBUTES,
            Self::YamlMetadataBlocks => Options::ENABLE_YAML_STYLE_METADATA_BLOCKS,
            Self::PlusesMetadataBlocks => Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS,
            Self::OldFootnotes => Options::ENABLE_OLD_FOOTNOTES,
        }
    }
}

/// HTML generation switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "snake_case")
)]
pub enum RenderOption {
    /// Render soft line breaks as `<br />`.
    HardBreaks,
    /// Pass raw HTML through verbatim.
    Unsafe,
    /// Render raw HTML as escaped text.
    Escape,
}

/// Post-parse hook handed to the renderer untouched.
///
/// Plugins run in registration order, after the raw HTML policy and line
/// break handling, immediately before HTML generation.
pub trait RenderPlugin: Send + Sync + fmt::Debug {
    /// Rewrite the event stream in place.
    fn apply(&self, events: &mut Vec<Event<'_>>);
}

static NO_EXTENSIONS: BTreeSet<Extension> = BTreeSet::new();
static NO_PARSE_OPTIONS: BTreeSet<ParseOption> = BTreeSet::new();
static NO_RENDER_OPTIONS: BTreeSet<RenderOption> = BTreeSet::new();

/// Options used by [`parse`].
#[derive(Clone, Copy, Debug)]
pub struct ParseOptions<'a> {
    /// Enabled syntax extensions.
    pub extensions: &'a BTreeSet<Extension>,
    /// Enabled parser switches.
    pub parsing: &'a BTreeSet<ParseOption>,
}

impl ParseOptions<'_> {
    /// Combined pulldown-cmark option flags.
    #[must_use]
    pub fn to_options(&self) -> Options {
        let extensions = self.extensions.iter().copied().map(Extension::flag);
        let parsing = self.parsing.iter().copied().map(ParseOption::flag);
        extensions.chain(parsing).fold(Options::empty(), |acc, f| acc | f)
    }
}

impl Default for ParseOptions<'_> {
    fn default() -> Self {
        Self {
            extensions: &NO_EXTENSIONS,
            parsing: &NO_PARSE_OPTIONS,
        }
    }
}

/// Options used by [`render`].
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions<'a> {
    /// Enabled HTML generation switches.
    pub rendering: &'a BTreeSet<RenderOption>,
    /// Plugins applied before HTML generation.
    pub plugins: &'a [Arc<dyn RenderPlugin>],
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        Self {
            rendering: &NO_RENDER_OPTIONS,
            plugins: &[],
        }
    }
}

/// A fenced or indented code block inside a [`DocumentTree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBlockNode {
    /// Info string after the opening fence; empty for indented blocks.
    pub fence_info: String,
    /// Raw code text.
    pub string_content: String,
    /// Event index range covering the block, start and end events included.
    pub span: Range<usize>,
}

impl CodeBlockNode {
    /// Language tag: the first word of the info string.
    #[must_use]
    pub fn language(&self) -> &str {
        self.fence_info.split_whitespace().next().unwrap_or("")
    }
}

/// Parsed Markdown document.
#[derive(Clone, Debug)]
pub struct DocumentTree<'a> {
    source: &'a str,
    events: Vec<Event<'a>>,
}

impl<'a> DocumentTree<'a> {
    /// Source text the tree was parsed from.
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Events in document order.
    #[must_use]
    pub fn events(&self) -> &[Event<'a>] {
        &self.events
    }

    /// Collect all code blocks in document order without modifying the tree.
    #[must_use]
    pub fn code_blocks(&self) -> Vec<CodeBlockNode> {
        let mut blocks = Vec::new();
        let mut current: Option<(usize, String, String)> = None;

        for (index, event) in self.events.iter().enumerate() {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let info = match kind {
                        CodeBlockKind::Fenced(info) => info.trim().to_owned(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    current = Some((index, info, String::new()));
                }
                Event::Text(text) => {
                    if let Some((_, _, content)) = current.as_mut() {
                        content.push_str(text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((start, fence_info, string_content)) = current.take() {
                        blocks.push(CodeBlockNode {
                            fence_info,
                            string_content,
                            span: start..index + 1,
                        });
                    }
                }
                _ => {}
            }
        }

        blocks
    }

    /// Replace the events in `span` with a single text event.
    ///
    /// Indices after `span` shift; replace from the back when applying
    /// several replacements collected from one walk.
    pub fn replace_with_text(&mut self, span: Range<usize>, text: String) {
        self.events
            .splice(span, std::iter::once(Event::Text(CowStr::from(text))));
    }
}

/// Parse Markdown text.
#[must_use]
pub fn parse<'a>(text: &'a str, options: &ParseOptions<'_>) -> DocumentTree<'a> {
    DocumentTree {
        source: text,
        events: Parser::new_ext(text, options.to_options()).collect(),
    }
}

/// Render a document to HTML.
#[must_use]
pub fn render(tree: DocumentTree<'_>, options: &RenderOptions<'_>) -> String {
    let mut events = apply_raw_html_policy(tree.events, options.rendering);

    if options.rendering.contains(&RenderOption::HardBreaks) {
        for event in &mut events {
            if matches!(event, Event::SoftBreak) {
                *event = Event::HardBreak;
            }
        }
    }

    for plugin in options.plugins {
        plugin.apply(&mut events);
    }

    let mut html = String::with_capacity(tree.source.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    html
}

/// Apply the raw HTML policy selected by `rendering`.
///
/// - `unsafe`: raw HTML is kept verbatim
/// - `escape`: raw HTML becomes text and is escaped on output
/// - neither: each HTML block and inline HTML fragment is replaced with
///   [`RAW_HTML_OMITTED`]
fn apply_raw_html_policy<'a>(
    events: Vec<Event<'a>>,
    rendering: &BTreeSet<RenderOption>,
) -> Vec<Event<'a>> {
    if rendering.contains(&RenderOption::Escape) {
        return events
            .into_iter()
            .map(|event| match event {
                Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
                other => other,
            })
            .collect();
    }
    if rendering.contains(&RenderOption::Unsafe) {
        return events;
    }

    let mut in_block = false;
    let mut block_marked = false;
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        match event {
            Event::Start(Tag::HtmlBlock) => {
                in_block = true;
                block_marked = false;
                out.push(event);
            }
            Event::End(TagEnd::HtmlBlock) => {
                in_block = false;
                out.push(event);
            }
            Event::Html(_) if in_block => {
                if !block_marked {
                    block_marked = true;
                    out.push(Event::Html(CowStr::from(format!("{RAW_HTML_OMITTED}\n"))));
                }
            }
            Event::Html(_) | Event::InlineHtml(_) => {
                out.push(Event::InlineHtml(CowStr::Borrowed(RAW_HTML_OMITTED)));
            }
            other => out.push(other),
        }
    }
    out
}

//! Markdown to sanitized HTML rendering.
//!
//! This crate turns CommonMark (with optional extensions) into HTML that is
//! safe to embed in a page without further escaping, returned as
//! [`SafeHtml`].
//!
//! # Architecture
//!
//! A [`Renderer`] drives a fixed pipeline over a shared, immutable
//! [`Configuration`]:
//! - [`strip_comments`]: removes `<!-- … -->` from the Markdown and the HTML
//! - [`engine`]: parses Markdown into a [`DocumentTree`] and renders it
//! - [`code_block`]: swaps fenced code blocks for placeholder tokens whose
//!   highlighted HTML is substituted after rendering
//! - [`Highlighter`]: tokenizes code with a [`Lexer`] and formats it with a
//!   [`Formatter`]
//!
//! Comment stripping runs on Markdown before parsing, so a commented-out
//! code fence never reaches the highlighter, and again on the rendered HTML,
//! before placeholder substitution, so highlighted markup is left intact.
//!
//! # Example
//!
//! ```
//! use mdviews_renderer::{Configuration, Extension, Renderer, Transformer};
//!
//! let config = Configuration::default()
//!     .with_strip_comments(true)
//!     .with_extension(Extension::Table)
//!     .with_transformer(Transformer::CodeBlocks);
//! let renderer = Renderer::new(config).unwrap();
//!
//! let html = renderer.render("# Hello\n\n**Bold** text").unwrap();
//! assert_eq!(html.as_str(), "<h1>Hello</h1>\n<p><strong>Bold</strong> text</p>\n");
//! ```

pub mod code_block;
mod comments;
mod config;
pub mod engine;
mod error;
mod highlight;
mod html;
mod renderer;

pub use code_block::{Placeholder, PlaceholderMap};
pub use comments::strip_comments;
pub use config::{Configuration, Transformer};
pub use engine::{
    DocumentTree, Extension, ParseOption, RAW_HTML_OMITTED, RenderOption, RenderPlugin,
};
pub use error::RenderError;
pub use highlight::{
    Formatter, HighlightError, HighlightOptions, Highlighter, HtmlFormatter, Lexer,
    LexerRegistry, PlainTextLexer, SyntectLexer, Token, TokenStream, sanitize_lang,
};
pub use html::{SafeHtml, escape_html};
pub use renderer::Renderer;

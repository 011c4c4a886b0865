//! Rendering configuration.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::engine::{
    Extension, ParseOption, ParseOptions, RenderOption, RenderOptions, RenderPlugin,
};
use crate::highlight::HighlightOptions;

/// Document transformations applied between parsing and rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "snake_case")
)]
pub enum Transformer {
    /// Highlight fenced code blocks that declare a language.
    CodeBlocks,
}

/// Configuration for a [`Renderer`](crate::Renderer).
///
/// Built once by the host and handed to [`Renderer::new`](crate::Renderer::new);
/// a renderer never observes later changes to the value it was built from.
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    /// Remove HTML comments from the Markdown input and the HTML output.
    pub strip_comments: bool,
    /// Markdown syntax extensions.
    pub extensions: BTreeSet<Extension>,
    /// Parser switches.
    pub parsing_opts: BTreeSet<ParseOption>,
    /// HTML generation switches.
    pub rendering_opts: BTreeSet<RenderOption>,
    /// Enabled document transformations.
    pub transformers: BTreeSet<Transformer>,
    /// Code highlighting options.
    pub highlight_opts: HighlightOptions,
    /// Plugins passed to the HTML generator untouched.
    pub plugins: Vec<Arc<dyn RenderPlugin>>,
    /// Fail the render when a placeholder token does not appear exactly once
    /// in the generated HTML, instead of logging a warning.
    pub strict_placeholders: bool,
}

impl Configuration {
    /// Whether the code block transformer is enabled.
    #[must_use]
    pub fn transforms_code_blocks(&self) -> bool {
        self.transformers.contains(&Transformer::CodeBlocks)
    }

    /// Enable or disable comment stripping.
    #[must_use]
    pub fn with_strip_comments(mut self, enabled: bool) -> Self {
        self.strip_comments = enabled;
        self
    }

    /// Enable a Markdown extension.
    #[must_use]
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.insert(extension);
        self
    }

    /// Enable a document transformer.
    #[must_use]
    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.insert(transformer);
        self
    }

    /// Enable an HTML generation switch.
    #[must_use]
    pub fn with_render_option(mut self, option: RenderOption) -> Self {
        self.rendering_opts.insert(option);
        self
    }

    /// Add a render plugin.
    #[must_use]
    pub fn with_plugin<P: RenderPlugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub(crate) fn parse_options(&self) -> ParseOptions<'_> {
        ParseOptions {
            extensions: &self.extensions,
            parsing: &self.parsing_opts,
        }
    }

    pub(crate) fn render_options(&self) -> RenderOptions<'_> {
        RenderOptions {
            rendering: &self.rendering_opts,
            plugins: &self.plugins,
        }
    }
}

//! Markdown to safe HTML rendering pipeline.

use crate::code_block::{self, PlaceholderMap};
use crate::comments::strip_comments;
use crate::config::Configuration;
use crate::engine::{self, RenderOption};
use crate::error::RenderError;
use crate::highlight::Highlighter;
use crate::html::SafeHtml;

/// Renders Markdown to [`SafeHtml`].
///
/// A renderer owns an immutable [`Configuration`] and can be shared across
/// threads; each [`render`](Self::render) call works on its own document tree
/// and placeholder map.
///
/// # Pipeline
///
/// 1. Strip comments from the Markdown (if enabled)
/// 2. Parse
/// 3. Replace highlighted code blocks with placeholder tokens (if enabled)
/// 4. Render to HTML
/// 5. Strip comments from the HTML (if enabled)
/// 6. Substitute highlighted HTML for each placeholder token
///
/// Substitution runs after the second comment pass so highlighted markup is
/// never seen by the comment stripper.
///
/// # Example
///
/// ```
/// use mdviews_renderer::{Configuration, Renderer, Transformer};
///
/// let config = Configuration::default()
///     .with_strip_comments(true)
///     .with_transformer(Transformer::CodeBlocks);
/// let renderer = Renderer::new(config).unwrap();
///
/// let html = renderer.render("# Title\n\n<!-- note -->\n").unwrap();
/// assert_eq!(html.as_str(), "<h1>Title</h1>\n");
/// ```
#[derive(Debug)]
pub struct Renderer {
    config: Configuration,
    highlighter: Highlighter,
}

impl Renderer {
    /// Create a renderer, validating the configuration.
    pub fn new(config: Configuration) -> Result<Self, RenderError> {
        if config.rendering_opts.contains(&RenderOption::Unsafe)
            && config.rendering_opts.contains(&RenderOption::Escape)
        {
            return Err(RenderError::Configuration(
                "render options `unsafe` and `escape` are mutually exclusive".to_owned(),
            ));
        }

        let highlighter = Highlighter::new(&config.highlight_opts);
        Ok(Self {
            config,
            highlighter,
        })
    }

    /// Configuration this renderer was built with.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Render Markdown to HTML that is safe to embed without escaping.
    pub fn render(&self, template: impl AsRef<str>) -> Result<SafeHtml, RenderError> {
        let input = template.as_ref();
        let stripped;
        let markdown = if self.config.strip_comments {
            stripped = strip_comments(input);
            stripped.as_str()
        } else {
            input
        };

        let mut tree = engine::parse(markdown, &self.config.parse_options());

        let placeholders = if self.config.transforms_code_blocks() {
            code_block::extract(&mut tree, &self.highlighter)?
        } else {
            PlaceholderMap::new()
        };

        let mut html = engine::render(tree, &self.config.render_options());

        // Strip before substituting: highlighted markup must never reach the stripper.
        if self.config.strip_comments {
            html = strip_comments(&html);
        }

        let html = self.substitute(html, &placeholders)?;
        tracing::debug!(
            input_len = input.len(),
            output_len = html.len(),
            code_blocks = placeholders.len(),
            "Rendered markdown"
        );
        Ok(SafeHtml::new(html))
    }

    /// Render Markdown and return the HTML as a plain string.
    pub fn render_html(&self, template: impl AsRef<str>) -> Result<String, RenderError> {
        self.render(template).map(SafeHtml::into_string)
    }

    /// Replace the first occurrence of each token with its highlighted HTML.
    ///
    /// Every token must occur exactly once. On mismatch a strict renderer
    /// fails before touching the output; otherwise the mismatch is logged, a
    /// present token is still substituted once and a missing one is skipped.
    fn substitute(
        &self,
        mut html: String,
        placeholders: &PlaceholderMap,
    ) -> Result<String, RenderError> {
        for placeholder in placeholders {
            let occurrences = html.matches(placeholder.token.as_str()).count();
            if occurrences != 1 {
                if self.config.strict_placeholders {
                    return Err(RenderError::PlaceholderMismatch {
                        token: placeholder.token.clone(),
                        occurrences,
                    });
                }
                tracing::warn!(
                    token = %placeholder.token,
                    language = %placeholder.language,
                    occurrences,
                    "Placeholder not found exactly once in rendered HTML"
                );
            }
            if occurrences > 0 {
                html = html.replacen(placeholder.token.as_str(), &placeholder.html, 1);
            }
        }
        Ok(html)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            highlighter: Highlighter::default(),
            config: Configuration::default(),
        }
    }
}

//! Configuration management for mdviews.
//!
//! Parses `mdviews.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`]. A loaded
//! [`Config`] is turned into a renderer [`Configuration`] with
//! [`Config::to_configuration`] or straight into a [`Renderer`] with
//! [`Config::build_renderer`].
//!
//! ```toml
//! strip_comments = true
//!
//! [markdown]
//! extensions = ["table", "strikethrough"]
//! parse = ["smart_punctuation"]
//! render = ["hard_breaks"]
//!
//! [transformers]
//! code_blocks = true
//!
//! [highlight]
//! wrap = true
//! class_prefix = "hl-"
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mdviews_renderer::{
    Configuration, Extension, HighlightOptions, HtmlFormatter, ParseOption, RenderError,
    RenderOption, Renderer, Transformer,
};
use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override comment stripping.
    pub strip_comments: Option<bool>,
    /// Override the code block transformer.
    pub code_blocks: Option<bool>,
    /// Override wrapping of highlighted code.
    pub wrap: Option<bool>,
    /// Override strict placeholder checking.
    pub strict_placeholders: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdviews.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remove HTML comments from input and output.
    pub strip_comments: bool,
    /// Fail on placeholder mismatches instead of logging a warning.
    pub strict_placeholders: bool,
    /// Markdown parsing and rendering options.
    pub markdown: MarkdownConfig,
    /// Document transformers.
    pub transformers: TransformersConfig,
    /// Code highlighting options.
    pub highlight: HighlightConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Markdown configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Syntax extensions.
    pub extensions: BTreeSet<Extension>,
    /// Parser switches.
    pub parse: BTreeSet<ParseOption>,
    /// HTML generation switches.
    pub render: BTreeSet<RenderOption>,
}

/// Transformer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TransformersConfig {
    /// Highlight fenced code blocks (default: enabled).
    pub code_blocks: bool,
}

impl Default for TransformersConfig {
    fn default() -> Self {
        Self { code_blocks: true }
    }
}

/// Highlighting configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Wrap highlighted code in `<pre lang="…"><code class="highlight">`.
    pub wrap: bool,
    /// Prefix for generated CSS class names.
    pub class_prefix: String,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// The renderer rejected the configuration.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdviews.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(strip_comments) = settings.strip_comments {
            self.strip_comments = strip_comments;
        }
        if let Some(code_blocks) = settings.code_blocks {
            self.transformers.code_blocks = code_blocks;
        }
        if let Some(wrap) = settings.wrap {
            self.highlight.wrap = wrap;
        }
        if let Some(strict) = settings.strict_placeholders {
            self.strict_placeholders = strict;
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_markdown()?;
        self.validate_highlight()?;
        Ok(())
    }

    fn validate_markdown(&self) -> Result<(), ConfigError> {
        let render = &self.markdown.render;
        if render.contains(&RenderOption::Unsafe) && render.contains(&RenderOption::Escape) {
            return Err(ConfigError::Validation(
                "markdown.render cannot contain both \"unsafe\" and \"escape\"".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_highlight(&self) -> Result<(), ConfigError> {
        let prefix = &self.highlight.class_prefix;
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Validation(format!(
                "highlight.class_prefix contains invalid characters: {prefix:?}"
            )));
        }
        if prefix.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ConfigError::Validation(
                "highlight.class_prefix cannot start with a digit".to_owned(),
            ));
        }
        Ok(())
    }

    /// Convert into a renderer configuration.
    #[must_use]
    pub fn to_configuration(&self) -> Configuration {
        let mut transformers = BTreeSet::new();
        if self.transformers.code_blocks {
            transformers.insert(Transformer::CodeBlocks);
        }

        let formatter = HtmlFormatter::new().with_class_prefix(self.highlight.class_prefix.clone());

        Configuration {
            strip_comments: self.strip_comments,
            extensions: self.markdown.extensions.clone(),
            parsing_opts: self.markdown.parse.clone(),
            rendering_opts: self.markdown.render.clone(),
            transformers,
            highlight_opts: HighlightOptions {
                formatter: Some(Arc::new(formatter)),
                wrap: self.highlight.wrap,
                ..HighlightOptions::default()
            },
            plugins: Vec::new(),
            strict_placeholders: self.strict_placeholders,
        }
    }

    /// Build a renderer from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Render` if the renderer rejects the configuration.
    pub fn build_renderer(&self) -> Result<Renderer, ConfigError> {
        Ok(Renderer::new(self.to_configuration())?)
    }
}

/// Search for a config file in `start` and its parents.
#[must_use]
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.strip_comments);
        assert!(!config.strict_placeholders);
        assert!(config.markdown.extensions.is_empty());
        assert!(config.transformers.code_blocks);
        assert!(!config.highlight.wrap);
        assert_eq!(config.highlight.class_prefix, "");
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.strip_comments);
        assert!(config.markdown.render.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
strip_comments = true
strict_placeholders = true

[markdown]
extensions = ["table", "strikethrough", "definition_list"]
parse = ["smart_punctuation"]
render = ["hard_breaks", "unsafe"]

[transformers]
code_blocks = true

[highlight]
wrap = true
class_prefix = "hl-"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.strip_comments);
        assert!(config.strict_placeholders);
        assert_eq!(
            config.markdown.extensions,
            BTreeSet::from([
                Extension::Table,
                Extension::Strikethrough,
                Extension::DefinitionList
            ])
        );
        assert_eq!(
            config.markdown.parse,
            BTreeSet::from([ParseOption::SmartPunctuation])
        );
        assert_eq!(
            config.markdown.render,
            BTreeSet::from([RenderOption::HardBreaks, RenderOption::Unsafe])
        );
        assert!(config.transformers.code_blocks);
        assert!(config.highlight.wrap);
        assert_eq!(config.highlight.class_prefix, "hl-");
    }

    #[test]
    fn test_parse_unknown_extension_fails() {
        let toml = r#"
[markdown]
extensions = ["tables"]
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_conflicting_render_options() {
        let toml = r#"
[markdown]
render = ["unsafe", "escape"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        assert!(err.to_string().contains("unsafe"));
    }

    #[test]
    fn test_validate_class_prefix() {
        let mut config = Config::default();
        config.highlight.class_prefix = "hl-".to_owned();
        config.validate().unwrap();

        config.highlight.class_prefix = "a\" onclick=\"x".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));

        config.highlight.class_prefix = "1hl".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        config.transformers.code_blocks = false;
        config.highlight.wrap = true;
        let overrides = CliSettings {
            strip_comments: Some(true),
            code_blocks: Some(true),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert!(config.strip_comments);
        assert!(config.transformers.code_blocks);
        assert!(config.highlight.wrap); // Unchanged
        assert!(!config.strict_placeholders); // Unchanged
    }

    #[test]
    fn test_apply_cli_settings_disable() {
        let mut config = Config::default();
        config.transformers.code_blocks = true;
        let overrides = CliSettings {
            code_blocks: Some(false),
            wrap: Some(true),
            strict_placeholders: Some(true),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert!(!config.transformers.code_blocks);
        assert!(config.highlight.wrap);
        assert!(config.strict_placeholders);
    }

    #[test]
    fn test_load_explicit_path_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = Config::load(Some(&missing), None).unwrap_err();
        assert!(
            matches!(err, ConfigError::NotFound(ref p) if *p == missing),
            "Expected ConfigError::NotFound, got {err:?}"
        );
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "strip_comments = true\n\n[transformers]\ncode_blocks = true\n").unwrap();

        let overrides = CliSettings {
            strip_comments: Some(false),
            ..Default::default()
        };
        let config = Config::load(Some(&path), Some(&overrides)).unwrap();

        assert!(!config.strip_comments);
        assert!(config.transformers.code_blocks);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "[highlight]\nclass_prefix = \"<x>\"\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "{err:?}");
    }

    #[test]
    fn test_load_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "strip_comments = \n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        assert_eq!(
            discover_config(&nested),
            Some(dir.path().join(CONFIG_FILENAME))
        );
    }

    #[test]
    fn test_discover_config_prefers_nearest() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sub");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();
        fs::write(nested.join(CONFIG_FILENAME), "").unwrap();

        assert_eq!(discover_config(&nested), Some(nested.join(CONFIG_FILENAME)));
    }

    #[test]
    fn test_discover_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_FILENAME)).unwrap();

        let found = discover_config(dir.path());
        assert_ne!(found, Some(dir.path().join(CONFIG_FILENAME)));
    }

    #[test]
    fn test_to_configuration() {
        let toml = r#"
strip_comments = true

[markdown]
extensions = ["footnotes"]
render = ["escape"]

[transformers]
code_blocks = true

[highlight]
wrap = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let configuration = config.to_configuration();

        assert!(configuration.strip_comments);
        assert_eq!(
            configuration.extensions,
            BTreeSet::from([Extension::Footnotes])
        );
        assert_eq!(
            configuration.rendering_opts,
            BTreeSet::from([RenderOption::Escape])
        );
        assert!(configuration.transforms_code_blocks());
        assert!(configuration.highlight_opts.wrap);
        assert!(configuration.highlight_opts.formatter.is_some());
        assert!(configuration.plugins.is_empty());
    }

    #[test]
    fn test_build_renderer_uses_class_prefix() {
        let toml = r#"
[transformers]
code_blocks = true

[highlight]
class_prefix = "hl-"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let renderer = config.build_renderer().unwrap();

        let html = renderer.render("```python\nprint(1)\n```\n").unwrap();
        assert!(html.as_str().contains("class=\"hl-"), "{html}");
    }

    #[test]
    fn test_build_renderer_rejects_conflicts() {
        let mut config = Config::default();
        config.markdown.render = BTreeSet::from([RenderOption::Unsafe, RenderOption::Escape]);

        let err = config.build_renderer().unwrap_err();
        assert!(matches!(err, ConfigError::Render(_)), "{err:?}");
    }
}

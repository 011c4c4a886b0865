//! `mdviews render` command implementation.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use mdviews_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render (default: stdin, `-` also reads stdin).
    file: Option<PathBuf>,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover mdviews.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strip HTML comments (overrides config).
    #[arg(long)]
    strip_comments: bool,

    /// Disable code block highlighting (overrides config).
    #[arg(long)]
    no_code_blocks: bool,

    /// Wrap highlighted code in `<pre lang="…">` (overrides config).
    #[arg(long)]
    wrap: bool,

    /// Fail when a code block placeholder is lost during rendering.
    #[arg(long)]
    strict_placeholders: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, reading input, rendering or writing
    /// output fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::info!(path = %path.display(), "Loaded configuration");
        }
        let renderer = config.build_renderer()?;

        let markdown = read_input(self.file.as_deref())?;
        let html = renderer.render(&markdown)?;

        if let Some(path) = &self.output {
            std::fs::write(path, html.as_str())?;
            output.success(&format!("Wrote {} bytes to {}", html.len(), path.display()));
        } else {
            let mut stdout = io::stdout().lock();
            stdout.write_all(html.as_str().as_bytes())?;
            stdout.flush()?;
        }

        Ok(())
    }

    /// Build config overrides from flags. Unset flags leave the config value alone.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            strip_comments: self.strip_comments.then_some(true),
            code_blocks: self.no_code_blocks.then_some(false),
            wrap: self.wrap.then_some(true),
            strict_placeholders: self.strict_placeholders.then_some(true),
        }
    }
}

/// Read Markdown from `path`, or from stdin when `path` is absent or `-`.
fn read_input(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

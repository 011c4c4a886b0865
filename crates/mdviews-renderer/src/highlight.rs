//! Syntax highlighting for fenced code blocks.
//!
//! Highlighting is split into two capabilities:
//!
//! - [`Lexer`]: turns source code into a [`TokenStream`]
//! - [`Formatter`]: turns a [`TokenStream`] into HTML
//!
//! [`LexerRegistry`] maps language tags to lexers. Lexers registered by the
//! host win; otherwise the bundled syntect syntax definitions are searched.
//! Unknown languages silently fall back to [`PlainTextLexer`].
//!
//! [`Highlighter`] ties a registry and a formatter together and applies the
//! optional `<pre lang="…">` wrapper.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};

use crate::html::escape_html;

/// Bundled syntax definitions, loaded on first use.
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Error raised by a lexer while tokenizing code.
#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    /// The lexer failed on the given input.
    #[error("Lexer {lexer} failed: {message}")]
    Lex {
        /// Name of the failing lexer.
        lexer: String,
        /// Underlying error message.
        message: String,
    },
}

/// A run of source text sharing one scope stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Dotted scope names, outermost first (e.g. `string.quoted.double.python`
    /// then `punctuation.definition.string.begin.python`). Empty for plain text.
    pub scopes: Vec<String>,
    /// Raw source text.
    pub text: String,
}

/// Ordered tokens produced by a [`Lexer`].
///
/// Adjacent pushes with the same scopes are merged into a single token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text nested in the given scopes, outermost first.
    pub fn push(&mut self, scopes: &[&str], text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.tokens.last_mut()
            && last.scopes.iter().map(String::as_str).eq(scopes.iter().copied())
        {
            last.text.push_str(text);
            return;
        }
        self.tokens.push(Token {
            scopes: scopes.iter().map(|&scope| scope.to_owned()).collect(),
            text: text.to_owned(),
        });
    }

    /// Iterate over tokens in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the stream holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// Tokenizes source code for one language.
pub trait Lexer: Send + Sync + fmt::Debug {
    /// Human-readable lexer name.
    fn name(&self) -> &str;

    /// Break `code` into a token stream.
    fn lex(&self, code: &str) -> Result<TokenStream, HighlightError>;
}

/// Renders a token stream into markup.
pub trait Formatter: Send + Sync + fmt::Debug {
    /// Format tokens as HTML. Text must be escaped by the formatter.
    fn format(&self, tokens: &TokenStream) -> String;
}

/// Lexer that performs no tokenization.
///
/// Used when no lexer is registered for a language tag.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextLexer;

impl Lexer for PlainTextLexer {
    fn name(&self) -> &str {
        "plaintext"
    }

    fn lex(&self, code: &str) -> Result<TokenStream, HighlightError> {
        let mut tokens = TokenStream::new();
        tokens.push(&[], code);
        Ok(tokens)
    }
}

/// Lexer backed by a bundled syntect syntax definition.
#[derive(Debug)]
pub struct SyntectLexer {
    syntax: &'static SyntaxReference,
}

impl SyntectLexer {
    /// Look up a bundled syntax by name or file extension (case-insensitive).
    #[must_use]
    pub fn find(token: &str) -> Option<Self> {
        let syntaxes: &'static SyntaxSet = &SYNTAX_SET;
        syntaxes
            .find_syntax_by_token(token)
            .map(|syntax| Self { syntax })
    }

    fn error(&self, err: &impl fmt::Display) -> HighlightError {
        HighlightError::Lex {
            lexer: self.syntax.name.clone(),
            message: err.to_string(),
        }
    }
}

impl Lexer for SyntectLexer {
    fn name(&self) -> &str {
        &self.syntax.name
    }

    fn lex(&self, code: &str) -> Result<TokenStream, HighlightError> {
        let mut state = ParseState::new(self.syntax);
        let mut stack = ScopeStack::new();
        let mut tokens = TokenStream::new();

        for line in code.split_inclusive('\n') {
            let ops = state
                .parse_line(line, &SYNTAX_SET)
                .map_err(|e| self.error(&e))?;

            let mut last = 0;
            for (index, op) in ops {
                if index > last {
                    push_scoped(&mut tokens, &stack, &line[last..index]);
                    last = index;
                }
                stack.apply(&op).map_err(|e| self.error(&e))?;
            }
            push_scoped(&mut tokens, &stack, &line[last..]);
        }

        Ok(tokens)
    }
}

/// Push `text` under every scope on `stack` except the syntax's root scope
/// (`source.*` / `text.*`).
fn push_scoped(tokens: &mut TokenStream, stack: &ScopeStack, text: &str) {
    if text.is_empty() {
        return;
    }
    let names: Vec<String> = stack
        .as_slice()
        .iter()
        .skip(1)
        .map(|scope| scope.build_string())
        .collect();
    let scopes: Vec<&str> = names.iter().map(String::as_str).collect();
    tokens.push(&scopes, text);
}

/// Registry of lexers keyed by language tag.
#[derive(Clone)]
pub struct LexerRegistry {
    custom: HashMap<String, Arc<dyn Lexer>>,
    bundled: bool,
}

impl LexerRegistry {
    /// Registry with the bundled syntect syntaxes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            bundled: true,
        }
    }

    /// Registry without bundled syntaxes; only registered lexers resolve.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            custom: HashMap::new(),
            bundled: false,
        }
    }

    /// Register a lexer under one or more language tags (case-insensitive).
    ///
    /// Registered lexers take precedence over bundled syntaxes.
    pub fn register(&mut self, tags: &[&str], lexer: Arc<dyn Lexer>) {
        for tag in tags {
            self.custom
                .insert(tag.to_ascii_lowercase(), Arc::clone(&lexer));
        }
    }

    /// Find a lexer for a language tag.
    pub fn find(&self, tag: &str) -> Option<Arc<dyn Lexer>> {
        if tag.is_empty() {
            return None;
        }
        if let Some(lexer) = self.custom.get(&tag.to_ascii_lowercase()) {
            return Some(Arc::clone(lexer));
        }
        if !self.bundled {
            return None;
        }
        SyntectLexer::find(tag).map(|lexer| Arc::new(lexer) as Arc<dyn Lexer>)
    }
}

impl Default for LexerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LexerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("LexerRegistry")
            .field("custom", &tags)
            .field("bundled", &self.bundled)
            .finish()
    }
}

/// Formatter emitting nested `<span>` elements, one per scope, with CSS
/// classes derived from the scope names.
///
/// A token scoped `keyword.control.python` becomes
/// `<span class="keyword control python">…</span>`; with a class prefix of
/// `hl-` it becomes `<span class="hl-keyword hl-control hl-python">…</span>`.
/// Spans shared by consecutive tokens stay open, so the quotes of a string
/// sit inside the string's span. Unscoped text is escaped and emitted as is.
#[derive(Clone, Debug, Default)]
pub struct HtmlFormatter {
    class_prefix: String,
}

impl HtmlFormatter {
    /// Create a formatter without a class prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every generated class name.
    #[must_use]
    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    fn classes(&self, scope: &str) -> String {
        scope
            .split('.')
            .filter(|atom| !atom.is_empty())
            .map(|atom| format!("{}{atom}", self.class_prefix))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Formatter for HtmlFormatter {
    fn format(&self, tokens: &TokenStream) -> String {
        let mut out = String::new();
        let mut open: &[String] = &[];
        for token in tokens {
            let shared = open
                .iter()
                .zip(&token.scopes)
                .take_while(|(a, b)| a == b)
                .count();
            for _ in shared..open.len() {
                out.push_str("</span>");
            }
            for scope in &token.scopes[shared..] {
                out.push_str("<span class=\"");
                out.push_str(&escape_html(&self.classes(scope)));
                out.push_str("\">");
            }
            out.push_str(&escape_html(&token.text));
            open = token.scopes.as_slice();
        }
        for _ in open {
            out.push_str("</span>");
        }
        out
    }
}

/// Options for [`Highlighter`].
#[derive(Clone, Debug, Default)]
pub struct HighlightOptions {
    /// Formatter to use; [`HtmlFormatter`] when `None`.
    pub formatter: Option<Arc<dyn Formatter>>,
    /// Wrap output in `<pre lang="…"><code class="highlight">…</code></pre>`.
    pub wrap: bool,
    /// Lexers available for lookup.
    pub lexers: LexerRegistry,
}

/// Highlights code blocks using a lexer registry and a formatter.
#[derive(Clone, Debug)]
pub struct Highlighter {
    lexers: LexerRegistry,
    formatter: Arc<dyn Formatter>,
    wrap: bool,
}

impl Highlighter {
    /// Create a highlighter from options.
    #[must_use]
    pub fn new(options: &HighlightOptions) -> Self {
        let formatter = options
            .formatter
            .clone()
            .unwrap_or_else(|| Arc::new(HtmlFormatter::new()));
        Self {
            lexers: options.lexers.clone(),
            formatter,
            wrap: options.wrap,
        }
    }

    /// Highlight `code` written in `lang`.
    ///
    /// Unknown languages are rendered as escaped plain text. Trailing
    /// whitespace of the formatted output is trimmed.
    pub fn highlight(&self, code: &str, lang: &str) -> Result<String, HighlightError> {
        let lexer: Arc<dyn Lexer> = match self.lexers.find(lang) {
            Some(lexer) => lexer,
            None => {
                tracing::debug!(lang, "No lexer registered, using plain text");
                Arc::new(PlainTextLexer)
            }
        };
        let tokens = lexer.lex(code)?;
        let mut html = self.formatter.format(&tokens);
        html.truncate(html.trim_end().len());

        if self.wrap {
            html = format!(
                r#"<pre lang="{}"><code class="highlight">{html}</code></pre>"#,
                sanitize_lang(lang)
            );
        }
        Ok(html)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(&HighlightOptions::default())
    }
}

/// Keep only `[a-z0-9_-]` so the value is safe inside an attribute.
#[must_use]
pub fn sanitize_lang(lang: &str) -> String {
    lang.chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-'))
        .collect()
}

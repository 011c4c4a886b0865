//! End-to-end tests for the rendering pipeline.

use std::sync::Arc;
use std::thread;

use mdviews_renderer::code_block;
use mdviews_renderer::engine::{self, ParseOptions};
use mdviews_renderer::{
    Configuration, HighlightError, Highlighter, Lexer, LexerRegistry, RenderOption, Renderer,
    TokenStream, Transformer, strip_comments,
};
use pretty_assertions::assert_eq;

fn code_block_renderer(strip: bool) -> Renderer {
    let config = Configuration::default()
        .with_strip_comments(strip)
        .with_transformer(Transformer::CodeBlocks);
    Renderer::new(config).unwrap()
}

fn highlighted(code: &str, lang: &str) -> String {
    Highlighter::default().highlight(code, lang).unwrap()
}

#[test]
fn test_end_to_end_title_comment_and_code() {
    let html = code_block_renderer(true)
        .render("# Title\n\n<!-- note -->\n\n```python\nprint(1)\n```\n")
        .unwrap();
    let html = html.as_str();

    assert!(html.contains("<h1>Title</h1>"), "{html}");
    assert!(!html.contains("<!--"), "{html}");
    assert!(!html.contains("-->"), "{html}");
    assert!(html.contains("<span class=\""), "{html}");

    let fragment = highlighted("print(1)\n", "python");
    assert_eq!(html, format!("<h1>Title</h1>\n{fragment}\n"));
}

#[test]
fn test_placeholder_round_trip() {
    let markdown = "Before *text*.\n\n```python\nx = 1\n```\n\nAfter **text**.\n";
    let html = code_block_renderer(false).render(markdown).unwrap();

    let fragment = highlighted("x = 1\n", "python");
    assert_eq!(html.as_str().matches(fragment.as_str()).count(), 1);
    assert_eq!(
        html.as_str(),
        format!("<p>Before <em>text</em>.</p>\n{fragment}\n<p>After <strong>text</strong>.</p>\n")
    );
}

#[test]
fn test_no_placeholder_token_left_behind() {
    let markdown = "```rust\nfn a() {}\n```\n\n- item\n\n  ```sh\n  echo hi\n  ```\n";
    let mut tree = engine::parse(markdown, &ParseOptions::default());
    let placeholders = code_block::extract(&mut tree, &Highlighter::default()).unwrap();
    assert_eq!(placeholders.len(), 2);

    let html = code_block_renderer(false).render(markdown).unwrap();
    // Tokens differ between calls; check no UUID-shaped run survived instead.
    let uuid_like = html
        .as_str()
        .split(|c: char| !(c.is_ascii_hexdigit() || c == '-'))
        .any(|word| word.len() == 36 && word.matches('-').count() == 4);
    assert!(!uuid_like, "{html}");
}

#[test]
fn test_unknown_language_falls_back_to_plain_text() {
    let html = code_block_renderer(false)
        .render("```not-a-language\nif a < b && c > d {}\n```\n")
        .unwrap();
    assert_eq!(html.as_str(), "if a &lt; b &amp;&amp; c &gt; d {}\n");
}

#[test]
fn test_empty_language_bypasses_extraction() {
    let markdown = "```\nplain <code>\n```\n";
    let mut tree = engine::parse(markdown, &ParseOptions::default());
    let placeholders = code_block::extract(&mut tree, &Highlighter::default()).unwrap();
    assert!(placeholders.is_empty());

    let html = code_block_renderer(false).render(markdown).unwrap();
    assert_eq!(html.as_str(), "<pre><code>plain &lt;code&gt;\n</code></pre>\n");
}

#[test]
fn test_lang_attribute_is_sanitized() {
    let mut config = Configuration::default().with_transformer(Transformer::CodeBlocks);
    config.highlight_opts.wrap = true;
    let html = Renderer::new(config)
        .unwrap()
        .render("```a\"b<c>\nx\n```\n")
        .unwrap();
    assert_eq!(
        html.as_str(),
        "<pre lang=\"abc\"><code class=\"highlight\">x</code></pre>\n"
    );
}

#[test]
fn test_comment_stripping_is_idempotent() {
    let inputs = [
        "",
        "plain text\n",
        "a\n<!-- c -->\nb\n",
        "keep <!-- c --> text\n",
        "<!<!-- x -->-- y -->z",
        "<!-- a --> keep <!-- b -->",
        "x\n<!--\nmulti\nline\n-->\ny\n",
        "<!-- unterminated",
    ];
    for input in inputs {
        let once = strip_comments(input);
        assert_eq!(strip_comments(&once), once, "input: {input:?}");
    }
}

#[test]
fn test_multiline_comment_removed_from_markdown() {
    let html = code_block_renderer(true)
        .render("x\n<!--\nmulti\nline\n-->\ny\n")
        .unwrap();
    assert_eq!(html.as_str(), "<p>x\ny</p>\n");
}

#[test]
fn test_escaped_raw_html() {
    let config = Configuration::default().with_render_option(RenderOption::Escape);
    let html = Renderer::new(config)
        .unwrap()
        .render("<script>alert(1)</script>\n")
        .unwrap();
    assert_eq!(html.as_str(), "&lt;script&gt;alert(1)&lt;/script&gt;\n");
}

#[derive(Debug)]
struct Failing;

impl Lexer for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn lex(&self, _code: &str) -> Result<TokenStream, HighlightError> {
        Err(HighlightError::Lex {
            lexer: "failing".to_owned(),
            message: "boom".to_owned(),
        })
    }
}

#[test]
fn test_lexer_failure_is_reported() {
    let mut lexers = LexerRegistry::new();
    lexers.register(&["broken"], Arc::new(Failing));
    let mut config = Configuration::default().with_transformer(Transformer::CodeBlocks);
    config.highlight_opts.lexers = lexers;

    let err = Renderer::new(config)
        .unwrap()
        .render("```broken\nx\n```\n")
        .unwrap_err();
    assert_eq!(err.to_string(), "Highlight error: Lexer failing failed: boom");
}

#[test]
fn test_shared_renderer_across_threads() {
    let renderer = Arc::new(code_block_renderer(true));
    let expected = renderer
        .render("# Doc\n\n<!-- c -->\n```python\npass\n```\n")
        .unwrap()
        .into_string();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let renderer = Arc::clone(&renderer);
            thread::spawn(move || {
                renderer
                    .render("# Doc\n\n<!-- c -->\n```python\npass\n```\n")
                    .unwrap()
                    .into_string()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

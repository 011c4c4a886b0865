//! HTML comment removal.
//!
//! [`strip_comments`] removes `<!-- ... -->` comments from Markdown input and
//! rendered HTML alike. Comments may span several lines. Each comment ends at
//! the nearest following `-->`, so `<!-- a --> keep <!-- b -->` keeps ` keep `.
//!
//! Two removal modes are chosen per line:
//!
//! - **Whole line**: when a line holds nothing but comments and spaces/tabs,
//!   the line is deleted together with its `\n` or `\r\n` terminator.
//! - **Inline**: otherwise only the comment text is deleted and the rest of
//!   the line, terminator included, is kept verbatim.
//!
//! An unterminated `<!--` is left in place.

use std::sync::LazyLock;

use regex::Regex;

const OPEN: &str = "<!--";
const CLOSE: &str = "-->";

/// One comment, lazily terminated at the first `-->`.
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Remove HTML comments from `input`.
///
/// Idempotent: removing a comment can expose a new one (`<!<!-- x -->-- y -->`),
/// which is removed in the same left-to-right pass.
///
/// # Examples
///
/// ```
/// use mdviews_renderer::strip_comments;
///
/// assert_eq!(strip_comments("a\n<!-- c -->\nb\n"), "a\nb\n");
/// assert_eq!(strip_comments("keep <!-- c --> text\n"), "keep  text\n");
/// ```
#[must_use]
pub fn strip_comments(input: &str) -> String {
    let mut stripper = Stripper::new(input);
    while let Some(end) = stripper.next_comment() {
        stripper.remove(end);
    }
    stripper.finish()
}

/// Single-pass comment removal state.
///
/// Kept text accumulates in `out`. The line `out` currently ends in is
/// tracked so the whole-line check never rescans it.
struct Stripper<'a> {
    input: &'a str,
    /// Next unread byte of `input`.
    pos: usize,
    out: String,
    /// Start of the last line in `out`.
    line_start: usize,
    /// First non-blank byte of the last line in `out`.
    first_nonblank: Option<usize>,
    /// Comments ending before this offset share a line with other content.
    inline_until: usize,
}

impl<'a> Stripper<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            out: String::with_capacity(input.len()),
            line_start: 0,
            first_nonblank: None,
            inline_until: 0,
        }
    }

    /// Find the next comment in the kept text followed by the unread input.
    ///
    /// Text before the comment is moved to `out`, which then ends where the
    /// comment starts. Returns the offset in `input` just past the comment.
    fn next_comment(&mut self) -> Option<usize> {
        if let Some(end) = self.comment_across_splice() {
            return Some(end);
        }
        let input = self.input;
        let comment = COMMENT_RE.find_at(input, self.pos)?;
        self.push(&input[self.pos..comment.start()]);
        Some(comment.end())
    }

    /// A comment whose `<!--` starts in the last bytes of `out`, formed when
    /// a removal joins e.g. `<!` with `-- y -->`.
    fn comment_across_splice(&mut self) -> Option<usize> {
        let rest = &self.input[self.pos..];
        let kept = (1..OPEN.len())
            .find(|&k| self.out.ends_with(&OPEN[..k]) && rest.starts_with(&OPEN[k..]))?;
        let end = close_after(self.input, self.pos + OPEN.len() - kept)?;
        self.truncate(self.out.len() - kept);
        Some(end)
    }

    /// Drop the comment ending at `end`. `out` already ends where it starts.
    fn remove(&mut self, end: usize) {
        if self.first_nonblank.is_none() && end >= self.inline_until {
            match comment_only_line_end(self.input, end) {
                Ok(line_end) => {
                    self.truncate(self.line_start);
                    self.pos = line_end;
                    return;
                }
                Err(stop) => self.inline_until = stop,
            }
        }
        self.pos = end;
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
        let line = match text.rfind('\n') {
            Some(i) => {
                self.line_start = self.out.len() - text.len() + i + 1;
                self.first_nonblank = None;
                &text[i + 1..]
            }
            None => text,
        };
        if self.first_nonblank.is_none() {
            let blanks = blank_len(line);
            if blanks < line.len() {
                self.first_nonblank = Some(self.out.len() - line.len() + blanks);
            }
        }
    }

    /// Cut `out` back to `len`. Never crosses a line terminator.
    fn truncate(&mut self, len: usize) {
        self.out.truncate(len);
        if self.first_nonblank.is_some_and(|first| first >= len) {
            self.first_nonblank = None;
        }
    }

    fn finish(mut self) -> String {
        let input = self.input;
        self.push(&input[self.pos..]);
        self.out
    }
}

/// Offset just past the first `-->` at or after `from`.
fn close_after(input: &str, from: usize) -> Option<usize> {
    input[from..].find(CLOSE).map(|i| from + i + CLOSE.len())
}

/// Scan forward from the end of a comment over further comments and blanks.
///
/// Returns the offset just past the line terminator when the rest of the line
/// holds nothing else, or the offset of the first byte that is neither.
fn comment_only_line_end(input: &str, mut pos: usize) -> Result<usize, usize> {
    loop {
        pos += blank_len(&input[pos..]);
        let rest = &input[pos..];
        if rest.starts_with("\r\n") {
            return Ok(pos + 2);
        }
        if rest.starts_with('\n') {
            return Ok(pos + 1);
        }
        if !rest.starts_with(OPEN) {
            return Err(pos);
        }
        pos = close_after(input, pos + OPEN.len()).ok_or(pos)?;
    }
}

fn blank_len(s: &str) -> usize {
    s.len() - s.trim_start_matches([' ', '\t']).len()
}

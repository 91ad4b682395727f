//! Blockquote extraction.
//!
//! A single forward scan over a document that yields candidate requirement
//! blocks: maximal runs of consecutive quote-marked lines with at least two
//! lines of content. The extractor knows nothing about the requirement
//! grammar beyond that.

use std::{borrow::Cow, iter::FusedIterator, str::Lines};

use tracing::trace;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Blocks with fewer content lines cannot hold an identifier and a
/// description.
const MIN_BLOCK_LINES: usize = 2;

/// One content line of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLine<'a> {
    /// 1-based line number in the document.
    pub number: usize,
    /// The line with the quote marker, one following space and trailing
    /// whitespace removed.
    pub text: Cow<'a, str>,
}

/// A run of consecutive quote-marked lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    lines: Vec<BlockLine<'a>>,
}

impl<'a> Block<'a> {
    /// The content lines, in document order.
    #[must_use]
    pub fn lines(&self) -> &[BlockLine<'a>] {
        &self.lines
    }

    /// Line number of the first line of the block.
    #[must_use]
    pub fn start_line(&self) -> usize {
        self.lines.first().map_or(0, |line| line.number)
    }

    /// Line number of the last line of the block.
    #[must_use]
    pub fn end_line(&self) -> usize {
        self.lines.last().map_or(0, |line| line.number)
    }
}

/// Iterator over the candidate blocks of a document.
///
/// Created by [`blocks`].
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    lines: std::iter::Enumerate<Lines<'a>>,
    in_comment: bool,
}

/// Scans a document for blockquote blocks.
///
/// - A quote line starts with `>` after optional leading whitespace.
/// - A quote marker with no content, or any line without a marker, ends the
///   current block.
/// - Text inside `<!-- ... -->` is invisible, so a commented-out block is
///   never yielded. A `<!--` that is never closed is ordinary text.
/// - `\r\n` and `\n` line endings may be mixed; trailing whitespace is
///   ignored.
/// - Blocks with fewer than two content lines are skipped.
///
/// ```
/// let text = "# Title\n\n> REQ-1\n> Do the thing\n\n> just a quote\n";
/// let blocks: Vec<_> = reqlock::storage::extract::blocks(text).collect();
///
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].start_line(), 3);
/// assert_eq!(blocks[0].lines()[1].text, "Do the thing");
/// ```
#[must_use]
pub fn blocks(text: &str) -> Blocks<'_> {
    Blocks {
        lines: text.lines().enumerate(),
        in_comment: false,
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut current: Vec<BlockLine<'a>> = Vec::new();

        while let Some((index, line)) = self.lines.next() {
            let later = &self.lines;
            let visible = strip_comments(line, &mut self.in_comment, || {
                later
                    .clone()
                    .any(|(_, text)| text.contains(COMMENT_CLOSE))
            });
            match quote_content(visible) {
                Some(text) => current.push(BlockLine {
                    number: index + 1,
                    text,
                }),
                None if current.len() >= MIN_BLOCK_LINES => {
                    return Some(Block { lines: current });
                }
                None => {
                    if !current.is_empty() {
                        trace!(line = index + 1, "skipping single-line blockquote");
                        current.clear();
                    }
                }
            }
        }

        (current.len() >= MIN_BLOCK_LINES).then_some(Block { lines: current })
    }
}

impl FusedIterator for Blocks<'_> {}

/// Removes `<!-- ... -->` spans from a line, tracking comments that span
/// several lines.
///
/// An opening `<!--` only starts a comment if a `-->` follows it, on this
/// line or a later one (`closes_later`). Otherwise it is literal text.
fn strip_comments<'a>(
    line: &'a str,
    in_comment: &mut bool,
    closes_later: impl FnOnce() -> bool,
) -> Cow<'a, str> {
    if !*in_comment && !line.contains(COMMENT_OPEN) {
        return Cow::Borrowed(line);
    }

    let mut closes_later = Some(closes_later);
    let mut visible = String::new();
    let mut rest = line;
    loop {
        if *in_comment {
            let Some(end) = rest.find(COMMENT_CLOSE) else {
                break;
            };
            rest = &rest[end + COMMENT_CLOSE.len()..];
            *in_comment = false;
            continue;
        }

        let Some(start) = rest.find(COMMENT_OPEN) else {
            visible.push_str(rest);
            break;
        };
        let after = &rest[start + COMMENT_OPEN.len()..];
        let closed = after.contains(COMMENT_CLOSE) || closes_later.take().is_some_and(|f| f());
        if !closed {
            visible.push_str(rest);
            break;
        }
        visible.push_str(&rest[..start]);
        rest = after;
        *in_comment = true;
    }

    if visible.len() == line.len() {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(visible)
    }
}

/// Returns the content of a quote line, or `None` for lines that end a block.
fn quote_content(line: Cow<'_, str>) -> Option<Cow<'_, str>> {
    match line {
        Cow::Borrowed(line) => quote_content_str(line).map(Cow::Borrowed),
        Cow::Owned(line) => quote_content_str(&line).map(|text| Cow::Owned(text.to_string())),
    }
}

fn quote_content_str(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('>')?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest).trim_end();
    (!rest.trim_start().is_empty()).then_some(rest)
}

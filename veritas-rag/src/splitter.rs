//! Recursive separator-cascade text splitter.
//!
//! [`split`] breaks text on the highest-priority separator that occurs in it,
//! packs the resulting pieces greedily into buffers of at most `chunk_size`
//! characters, and seeds each new buffer with a tail of the previous one so
//! consecutive chunks share up to `chunk_overlap` characters. Pieces that are
//! still too large are split again with the next separator. A piece that no
//! remaining separator can break is emitted whole and flagged as a hard cut.
//!
//! A buffer is its pieces joined by the separator, and its length is the
//! length of the chunk it emits: trimmed, and closed by the last piece's
//! separator when that still fits. A piece on its own is measured without
//! its separator.
//!
//! The cascade runs on an explicit work stack rather than through recursion,
//! so stack depth stays constant regardless of input.
//!
//! All lengths are counted in `char`s. Offsets in [`Segment`] are byte
//! offsets into the source and always fall on char boundaries.

use std::collections::VecDeque;
use std::ops::Range;

use tracing::{debug, warn};

use crate::error::{RagError, Result};

/// Paragraph breaks, then line breaks, then spaces, then characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// One chunk produced by [`split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Chunk text, trimmed of surrounding whitespace.
    pub text: String,
    /// Byte range of `text` in the source.
    pub span: Range<usize>,
    /// Byte range of the source this segment is the first to cover.
    ///
    /// The advances of all segments, in order, tile the source exactly.
    pub advance: Range<usize>,
    /// The segment exceeds `chunk_size` because no separator could split it.
    pub hard_cut: bool,
}

/// One separator-delimited piece of the source.
///
/// `range` runs through the trailing separator so consecutive pieces tile
/// their parent; `content_end` is where the separator starts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    range: Range<usize>,
    content_end: usize,
}

impl Piece {
    fn content(&self) -> Range<usize> {
        self.range.start..self.content_end
    }
}

/// A pending buffer, before trimming.
#[derive(Debug, Clone)]
struct RawChunk {
    range: Range<usize>,
    hard_cut: bool,
}

/// Work items on the splitter's stack.
enum Work {
    /// Split `range` using separators starting at `level`.
    Split { range: Range<usize>, level: usize },
    /// Output a finished buffer.
    Emit(RawChunk),
}

/// Split `text` into bounded, overlapping chunks.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`] if `chunk_size` is zero.
pub fn split<S: AsRef<str>>(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[S],
) -> Result<Vec<Segment>> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfiguration(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let separators: Vec<&str> = separators.iter().map(AsRef::as_ref).collect();
    let splitter = Splitter { text, chunk_size, chunk_overlap, separators: &separators };

    let mut raw = Vec::new();
    let mut stack = vec![Work::Split { range: 0..text.len(), level: 0 }];
    while let Some(work) = stack.pop() {
        match work {
            Work::Emit(chunk) => raw.push(chunk),
            Work::Split { range, level } => {
                let items = splitter.expand(range, level);
                stack.extend(items.into_iter().rev());
            }
        }
    }

    let segments = finish(text, raw, chunk_size);
    debug!(text_len = text.len(), chunk_count = segments.len(), "split text");
    Ok(segments)
}

/// Like [`split`], returning only the chunk texts.
pub fn split_text<S: AsRef<str>>(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[S],
) -> Result<Vec<String>> {
    Ok(split(text, chunk_size, chunk_overlap, separators)?.into_iter().map(|s| s.text).collect())
}

struct Splitter<'a> {
    text: &'a str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &'a [&'a str],
}

impl Splitter<'_> {
    /// Turn one range into the ordered work it decomposes into.
    fn expand(&self, range: Range<usize>, level: usize) -> Vec<Work> {
        let slice = &self.text[range.clone()];
        if char_len(slice) <= self.chunk_size {
            return vec![Work::Emit(RawChunk { range, hard_cut: false })];
        }

        let chosen = self
            .separators
            .iter()
            .enumerate()
            .skip(level)
            .find(|(_, sep)| sep.is_empty() || slice.contains(**sep));
        let Some((index, separator)) = chosen else {
            return vec![Work::Emit(RawChunk { range, hard_cut: true })];
        };

        let pieces = split_on(slice, separator, range.start);
        let mut work = Vec::new();
        let mut run: Vec<Piece> = Vec::new();

        for piece in pieces {
            if char_len(&self.text[piece.content()]) > self.chunk_size {
                if !run.is_empty() {
                    work.extend(self.merge(&run).into_iter().map(Work::Emit));
                    run.clear();
                }
                work.push(Work::Split { range: piece.content(), level: index + 1 });
            } else {
                run.push(piece);
            }
        }
        if !run.is_empty() {
            work.extend(self.merge(&run).into_iter().map(Work::Emit));
        }

        work
    }

    /// Greedily pack contiguous pieces (each no longer than `chunk_size`)
    /// into buffers, carrying whole trailing pieces forward as overlap.
    fn merge(&self, pieces: &[Piece]) -> Vec<RawChunk> {
        let mut out = Vec::new();
        let mut window: VecDeque<&Piece> = VecDeque::new();

        for piece in pieces {
            let Some(first) = window.front() else {
                window.push_back(piece);
                continue;
            };
            if self.measure(first.range.start..piece.range.end) > self.chunk_size {
                out.push(self.close(&window));

                while let (Some(first), Some(last)) = (window.front(), window.back()) {
                    let seed = self.measure(first.range.start..last.range.end);
                    let joined = self.measure(first.range.start..piece.range.end);
                    if seed <= self.chunk_overlap && joined <= self.chunk_size {
                        break;
                    }
                    window.pop_front();
                }
            }
            window.push_back(piece);
        }

        if !window.is_empty() {
            out.push(self.close(&window));
        }
        out
    }

    /// The buffer for `window`, keeping the closing separator only if the
    /// chunk still fits with it.
    fn close(&self, window: &VecDeque<&Piece>) -> RawChunk {
        let range = match (window.front(), window.back()) {
            (Some(first), Some(last)) => {
                let closed = first.range.start..last.range.end;
                if self.measure(closed.clone()) <= self.chunk_size {
                    closed
                } else {
                    first.range.start..last.content_end
                }
            }
            _ => 0..0,
        };
        RawChunk { range, hard_cut: false }
    }

    /// Length of the chunk `range` would emit.
    fn measure(&self, range: Range<usize>) -> usize {
        char_len(self.text[range].trim())
    }
}

/// Split `text` at a separator. Each piece's range keeps the separator that
/// follows it, so the pieces tile the input. An empty separator yields one
/// piece per character. Ranges are shifted by `offset`.
fn split_on(text: &str, separator: &str, offset: usize) -> Vec<Piece> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| {
                let end = offset + i + c.len_utf8();
                Piece { range: offset + i..end, content_end: end }
            })
            .collect();
    }

    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let content_end = start + pos;
        let end = content_end + separator.len();
        result.push(Piece {
            range: offset + start..offset + end,
            content_end: offset + content_end,
        });
        start = end;
    }

    if start < text.len() {
        let end = offset + text.len();
        result.push(Piece { range: offset + start..end, content_end: end });
    }

    result
}

/// Trim buffers, drop blank ones, and assign advance ranges.
fn finish(text: &str, raw: Vec<RawChunk>, chunk_size: usize) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::with_capacity(raw.len());
    let mut covered = 0usize;

    for chunk in raw {
        let slice = &text[chunk.range.clone()];
        let start = chunk.range.start + (slice.len() - slice.trim_start().len());
        let end = chunk.range.start + slice.trim_end().len();
        if start >= end {
            continue;
        }

        let chunk_text = &text[start..end];
        if chunk.hard_cut {
            warn!(
                chunk_len = char_len(chunk_text),
                chunk_size, "emitting oversized chunk; no separator could split it further"
            );
        }

        segments.push(Segment {
            text: chunk_text.to_string(),
            span: start..end,
            advance: covered..chunk.range.end,
            hard_cut: chunk.hard_cut,
        });
        covered = chunk.range.end;
    }

    if let Some(last) = segments.last_mut() {
        last.advance.end = text.len();
    }
    segments
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter<'a>(
        text: &'a str,
        chunk_size: usize,
        chunk_overlap: usize,
        separators: &'a [&'a str],
    ) -> Splitter<'a> {
        Splitter { text, chunk_size, chunk_overlap, separators }
    }

    #[test]
    fn pieces_tile_and_exclude_separator_from_content() {
        let pieces = split_on("a, b, c", ", ", 10);
        let ranges: Vec<_> = pieces.iter().map(|p| p.range.clone()).collect();
        let contents: Vec<_> = pieces.iter().map(Piece::content).collect();
        assert_eq!(ranges, vec![10..13, 13..16, 16..17]);
        assert_eq!(contents, vec![10..11, 13..14, 16..17]);
    }

    #[test]
    fn empty_separator_yields_char_ranges() {
        let pieces = split_on("hé!", "", 0);
        let ranges: Vec<_> = pieces.iter().map(|p| p.range.clone()).collect();
        assert_eq!(ranges, vec![0..1, 1..3, 3..4]);
        assert!(pieces.iter().all(|p| p.content_end == p.range.end));
    }

    #[test]
    fn merge_seeds_overlap_with_whole_pieces() {
        let text = "aa bb cc dd";
        let separators = [" "];
        let raw = splitter(text, 6, 3, &separators).merge(&split_on(text, " ", 0));
        let texts: Vec<&str> = raw.iter().map(|r| &text[r.range.clone()]).collect();
        assert_eq!(texts, vec!["aa bb ", "bb cc ", "cc dd"]);
    }

    #[test]
    fn lone_piece_drops_separator_that_does_not_fit() {
        let text = "ab,cd";
        let separators = [","];
        let raw = splitter(text, 2, 0, &separators).merge(&split_on(text, ",", 0));
        let texts: Vec<&str> = raw.iter().map(|r| &text[r.range.clone()]).collect();
        assert_eq!(texts, vec!["ab", "cd"]);
    }
}

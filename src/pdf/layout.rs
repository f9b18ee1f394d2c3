use unicode_segmentation::UnicodeSegmentation;

use crate::error::Error;
use crate::fonts::FontMetrics;
use crate::model::PageFragment;

/// Area of a page available for body text, in PDF coordinates (origin at the
/// bottom-left corner). `top` is the y of the upper edge; text flows downward
/// from it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ContentRect {
    pub(crate) x: f32,
    pub(crate) top: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

/// A single wrapped line within a page fragment. `start..end` includes the
/// whitespace or newline that terminated the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Line {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

/// Greedy word-wrap measurement over grapheme clusters.
///
/// All offsets taken and returned are byte offsets into the body that fall on
/// grapheme-cluster boundaries, so multi-codepoint characters are never split.
pub(crate) struct TextMeasurer<'a> {
    metrics: &'a FontMetrics,
    font_size: f32,
    line_height: f32,
}

impl<'a> TextMeasurer<'a> {
    pub(crate) fn new(metrics: &'a FontMetrics, font_size: f32, line_spacing: f32) -> Self {
        let ratio = metrics.line_h_ratio.unwrap_or(1.2);
        Self {
            metrics,
            font_size,
            line_height: font_size * ratio * line_spacing,
        }
    }

    pub(crate) fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Distance from the top of a line to its baseline.
    pub(crate) fn ascent(&self) -> f32 {
        self.font_size * self.metrics.ascender_ratio.unwrap_or(0.75)
    }

    pub(crate) fn line_width(&self, text: &str) -> f32 {
        self.metrics.text_width(text, self.font_size)
    }

    /// Fill one line greedily from `start`: returns the largest grapheme
    /// boundary such that `[start, end)` fits within `max_width` when broken
    /// at word boundaries. A width exactly equal to `max_width` fits
    /// (inclusive tie-break). A `\n` ends the line and is consumed by it, as
    /// is the single whitespace grapheme at a wrap point.
    ///
    /// Forward progress: for `start < body.len()` the result is always
    /// greater than `start`. A word wider than the whole line is force-broken
    /// at a grapheme boundary, and a single grapheme wider than the line is
    /// placed regardless, so the page loop can never stall.
    pub(crate) fn fill_line(
        &self,
        body: &str,
        start: usize,
        max_width: f32,
    ) -> Result<usize, Error> {
        if !(max_width > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "line width must be positive, got {max_width}"
            )));
        }

        let mut line_w = 0.0f32;
        let mut end = start; // committed break point
        let mut in_word = false;
        let mut word_start = start;
        let mut word_end = start;
        let mut word_w = 0.0f32;

        for (i, g) in body[start..].grapheme_indices(true) {
            let at = start + i;
            let g_end = at + g.len();

            if g == "\n" || g == "\r\n" || g == "\r" {
                // Hard break; the pending word fits by construction
                return Ok(g_end);
            }

            let gw = self.line_width(g);

            if g.chars().all(char::is_whitespace) {
                if in_word {
                    // Flush the pending word; the committed break point is
                    // set below once the space itself is placed
                    line_w += word_w;
                    in_word = false;
                }
                if line_w + gw <= max_width {
                    line_w += gw;
                    end = g_end;
                    continue;
                }
                // Wrap: the break space is consumed by the line it ends
                return Ok(g_end);
            }

            if !in_word {
                in_word = true;
                word_start = at;
                word_end = at;
                word_w = 0.0;
            }
            if line_w + word_w + gw <= max_width {
                word_w += gw;
                word_end = g_end;
                continue;
            }
            // Adding this grapheme overflows the line
            if end > start {
                // The whole word moves to the next line
                return Ok(word_start);
            }
            if word_end > word_start {
                // Word started at the line start and exceeds it: force-break
                return Ok(word_end);
            }
            // Single grapheme wider than the line: place it regardless
            return Ok(g_end);
        }

        // End of body; the pending word fits by construction
        Ok(if in_word { word_end } else { end })
    }

    /// Largest grapheme boundary such that `[start, end)` fits inside `rect`
    /// when wrapped at word boundaries at this measurer's line height.
    pub(crate) fn fit_range(
        &self,
        body: &str,
        start: usize,
        rect: ContentRect,
    ) -> Result<usize, Error> {
        if !(rect.width > 0.0) || !(rect.height > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "content rectangle must have positive area, got {}x{}",
                rect.width, rect.height
            )));
        }
        // At least one line per page even when the rect is shorter than one
        // line, or a page could consume no text and the page loop would stall
        let max_lines = ((rect.height / self.line_height).floor() as usize).max(1);
        let mut offset = start;
        for _ in 0..max_lines {
            if offset >= body.len() {
                break;
            }
            offset = self.fill_line(body, offset, rect.width)?;
        }
        Ok(offset)
    }

    /// Re-derive the wrapped lines of a fragment for drawing. Fragments end
    /// exactly on line boundaries, so this reproduces the same breaks the
    /// pagination pass made.
    pub(crate) fn break_lines(
        &self,
        body: &str,
        fragment: &PageFragment,
        max_width: f32,
    ) -> Result<Vec<Line>, Error> {
        let mut lines = Vec::new();
        let mut offset = fragment.start;
        while offset < fragment.end {
            let next = self.fill_line(body, offset, max_width)?;
            debug_assert!(next <= fragment.end, "line crosses its fragment");
            let end = next.min(fragment.end);
            lines.push(Line { start: offset, end });
            offset = end;
        }
        Ok(lines)
    }
}

pub(crate) enum LayoutState {
    Pending(usize),
    Done,
}

/// Splits the document body into per-page fragments.
///
/// Page 1 gets a content rectangle reduced for the title and metadata block;
/// every later page uses the full margin-inset rectangle. The transition
/// `Pending(offset) → Pending(end) | Done` consumes at least one grapheme per
/// page (see `fill_line`), bounding the loop by the body length.
pub(crate) struct PageLayoutEngine<'a> {
    body: &'a str,
    measurer: &'a TextMeasurer<'a>,
    first_page_rect: ContentRect,
    page_rect: ContentRect,
    state: LayoutState,
    next_page: usize,
}

impl<'a> PageLayoutEngine<'a> {
    pub(crate) fn new(
        body: &'a str,
        measurer: &'a TextMeasurer<'a>,
        first_page_rect: ContentRect,
        page_rect: ContentRect,
    ) -> Self {
        Self {
            body,
            measurer,
            first_page_rect,
            page_rect,
            state: LayoutState::Pending(0),
            next_page: 1,
        }
    }

    fn step(&mut self) -> Result<Option<PageFragment>, Error> {
        let offset = match self.state {
            LayoutState::Done => return Ok(None),
            LayoutState::Pending(offset) => offset,
        };
        let rect = if self.next_page == 1 {
            self.first_page_rect
        } else {
            self.page_rect
        };
        let end = self.measurer.fit_range(self.body, offset, rect)?;
        let fragment = PageFragment {
            start: offset,
            end,
            page_index: self.next_page,
        };
        self.next_page += 1;
        self.state = if end >= self.body.len() {
            LayoutState::Done
        } else {
            LayoutState::Pending(end)
        };
        Ok(Some(fragment))
    }

    /// Drive the state machine to completion. An empty body still yields one
    /// (chrome-only) page, so every document renders to a visible artifact.
    pub(crate) fn run(mut self) -> Result<Vec<PageFragment>, Error> {
        let mut fragments = Vec::new();
        while let Some(fragment) = self.step()? {
            fragments.push(fragment);
        }
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every WinAnsi char 500/1000 em wide: at 10pt each grapheme is 5pt and
    /// a line is 10pt tall.
    fn fixed_metrics() -> FontMetrics {
        FontMetrics {
            widths_1000: vec![500.0; 224],
            char_widths_1000: None,
            line_h_ratio: Some(1.0),
            ascender_ratio: Some(0.75),
        }
    }

    fn rect(width: f32, height: f32) -> ContentRect {
        ContentRect {
            x: 0.0,
            top: height,
            width,
            height,
        }
    }

    #[test]
    fn wraps_at_word_boundary() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        // "aaa " plus the trailing space is exactly 20pt; "bb" moves over
        let body = "aaa bb";
        assert_eq!(m.fill_line(body, 0, 20.0).unwrap(), 4);
        assert_eq!(m.fill_line(body, 4, 20.0).unwrap(), 6);
    }

    #[test]
    fn width_exactly_equal_is_included() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        assert_eq!(m.fill_line("aaaa", 0, 20.0).unwrap(), 4);
    }

    #[test]
    fn oversized_word_is_force_broken() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        // 6 chars at 5pt against a 20pt line: 4 fit, then 2
        assert_eq!(m.fill_line("aaaaaa", 0, 20.0).unwrap(), 4);
        assert_eq!(m.fill_line("aaaaaa", 4, 20.0).unwrap(), 6);
    }

    #[test]
    fn grapheme_wider_than_line_still_advances() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        assert_eq!(m.fill_line("ab", 0, 2.0).unwrap(), 1);
        assert_eq!(m.fill_line("ab", 1, 2.0).unwrap(), 2);
    }

    #[test]
    fn newline_ends_and_is_consumed_by_the_line() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        let body = "ab\ncd";
        assert_eq!(m.fill_line(body, 0, 100.0).unwrap(), 3);
        assert_eq!(m.fill_line(body, 3, 100.0).unwrap(), 5);
        // blank lines survive
        assert_eq!(m.fill_line("\n\n", 0, 100.0).unwrap(), 1);
        assert_eq!(m.fill_line("\n\n", 1, 100.0).unwrap(), 2);
    }

    #[test]
    fn crlf_is_one_break() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        assert_eq!(m.fill_line("a\r\nb", 0, 100.0).unwrap(), 3);
    }

    #[test]
    fn multi_codepoint_clusters_are_never_split() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        // family emoji (ZWJ sequence) followed by a combining-mark cluster
        let body = "\u{1F469}\u{200D}\u{1F469}\u{200D}\u{1F467}e\u{0301}x";
        let mut offset = 0;
        while offset < body.len() {
            let next = m.fill_line(body, offset, 5.0).unwrap();
            assert!(next > offset);
            assert!(body.is_char_boundary(next));
            offset = next;
        }
        // the first break must not land inside the ZWJ sequence
        let first = m.fill_line(body, 0, 5.0).unwrap();
        assert!(first >= "\u{1F469}\u{200D}\u{1F469}\u{200D}\u{1F467}".len());
    }

    #[test]
    fn fit_range_counts_whole_lines() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        // 25pt of height at 10pt lines → 2 lines of 4 chars each
        let end = m.fit_range("aaaaaaaaaaaa", 0, rect(20.0, 25.0)).unwrap();
        assert_eq!(end, 8);
    }

    #[test]
    fn fit_range_rejects_empty_rect() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        let err = m.fit_range("a", 0, rect(0.0, 25.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
        let err = m.fit_range("a", 0, rect(20.0, -1.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
    }

    #[test]
    fn empty_body_yields_exactly_one_page() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        let engine = PageLayoutEngine::new("", &m, rect(20.0, 25.0), rect(20.0, 50.0));
        let fragments = engine.run().unwrap();
        assert_eq!(
            fragments,
            vec![PageFragment {
                start: 0,
                end: 0,
                page_index: 1
            }]
        );
    }

    #[test]
    fn fragments_reconstruct_the_body() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        let body = "lorem ipsum dolor sit amet ".repeat(40);
        let engine = PageLayoutEngine::new(&body, &m, rect(50.0, 25.0), rect(50.0, 40.0));
        let fragments = engine.run().unwrap();
        assert!(fragments.len() > 1);
        let mut expected_start = 0;
        for (i, frag) in fragments.iter().enumerate() {
            assert_eq!(frag.page_index, i + 1);
            assert_eq!(frag.start, expected_start);
            expected_start = frag.end;
        }
        assert_eq!(expected_start, body.len());
    }

    #[test]
    fn break_lines_reproduces_pagination_breaks() {
        let metrics = fixed_metrics();
        let m = TextMeasurer::new(&metrics, 10.0, 1.0);
        let body = "one two three four five six seven eight";
        let r = rect(50.0, 25.0);
        let end = m.fit_range(body, 0, r).unwrap();
        let frag = PageFragment {
            start: 0,
            end,
            page_index: 1,
        };
        let lines = m.break_lines(body, &frag, r.width).unwrap();
        assert_eq!(lines.first().map(|l| l.start), Some(0));
        assert_eq!(lines.last().map(|l| l.end), Some(end));
        for pair in lines.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }
}

use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Immutable snapshot of a document at render time. Owned by the caller; the
/// engine only reads it. Timestamps are document data, never the wall clock,
/// so rendering the same snapshot twice yields byte-identical output.
#[derive(Clone, Debug)]
pub struct Document {
    pub title: String,
    pub body: String,
    /// Language code shown in the metadata block (e.g. "en-US").
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Body text formatting. Invariants: `font_size > 0`, `line_spacing > 0`,
/// both finite. Violations are rejected with `Error::InvalidOptions`.
#[derive(Clone, Debug)]
pub struct FormattingOptions {
    pub font_family: String,
    /// Body font size in points.
    pub font_size: f32,
    /// Line height multiplier (1.0 = single spacing).
    pub line_spacing: f32,
    pub alignment: Alignment,
    pub text_color: [u8; 3],
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_size: 16.0,
            line_spacing: 1.2,
            alignment: Alignment::Left,
            text_color: [0, 0, 0],
        }
    }
}

/// Page size and uniform margin, in points. The content rectangle is the page
/// rect inset by `margin` on all sides and must remain positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl Default for PageGeometry {
    /// ISO A4 in points with a 50pt margin.
    fn default() -> Self {
        Self {
            page_width: 595.2,
            page_height: 841.8,
            margin: 50.0,
        }
    }
}

/// A contiguous slice of the document body assigned to one page.
///
/// `start..end` is a half-open byte range into the body. Both offsets always
/// fall on grapheme-cluster boundaries, so multi-codepoint characters are
/// never split across pages. `page_index` is 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageFragment {
    pub start: usize,
    pub end: usize,
    pub page_index: usize,
}

/// The finished export: PDF bytes plus the number of pages they contain.
#[derive(Clone, Debug)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

mod layout;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::Error;
use crate::fonts::{self, ResolvedFont};
use crate::model::{Alignment, Document, FormattingOptions, PageFragment, PageGeometry, RenderedArtifact};

use layout::{ContentRect, PageLayoutEngine, TextMeasurer};

const TITLE_FONT_SIZE: f32 = 24.0;
const METADATA_FONT_SIZE: f32 = 12.0;
const METADATA_LINE_H: f32 = 16.0;
/// Gap between the metadata block and the start of body text on page 1.
const METADATA_GAP: f32 = 12.0;
const FOOTER_FONT_SIZE: f32 = 10.0;
/// Top of the footer text, measured from the page bottom edge.
const FOOTER_RISE: f32 = 30.0;
const CHROME_GRAY: f32 = 0.5;

// Page font names: F1 body, F2 title, F3 metadata/footer.

fn validate_document(doc: &Document) -> Result<(), Error> {
    let fields = [
        ("title", &doc.title),
        ("body", &doc.body),
        ("language", &doc.language),
    ];
    for (field, text) in fields {
        if let Some(ch) = text
            .chars()
            .find(|&c| c < ' ' && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(Error::InvalidDocument(format!(
                "{field} contains control character U+{:04X}",
                ch as u32
            )));
        }
    }
    Ok(())
}

fn validate_options(opts: &FormattingOptions) -> Result<(), Error> {
    if !(opts.font_size > 0.0) || !opts.font_size.is_finite() {
        return Err(Error::InvalidOptions(format!(
            "font size must be positive, got {}",
            opts.font_size
        )));
    }
    if !(opts.line_spacing > 0.0) || !opts.line_spacing.is_finite() {
        return Err(Error::InvalidOptions(format!(
            "line spacing must be positive, got {}",
            opts.line_spacing
        )));
    }
    Ok(())
}

/// Content rectangles for page 1 and for every later page.
///
/// The footer sits inside the bottom margin band; when the margin is too
/// small to hold it, the content bottom is raised so chrome never overlaps
/// body text. Page 1 additionally loses the title line and metadata block at
/// the top.
fn content_rects(geom: &PageGeometry) -> Result<(ContentRect, ContentRect), Error> {
    if geom.margin < 0.0 {
        return Err(Error::InvalidGeometry(format!(
            "margin must be non-negative, got {}",
            geom.margin
        )));
    }
    let width = geom.page_width - 2.0 * geom.margin;
    let top = geom.page_height - geom.margin;
    let bottom = geom.margin.max(FOOTER_RISE);
    let page_rect = ContentRect {
        x: geom.margin,
        top,
        width,
        height: top - bottom,
    };
    if !(page_rect.width > 0.0) || !(page_rect.height > 0.0) {
        return Err(Error::InvalidGeometry(format!(
            "page {}x{} with margin {} leaves no content area",
            geom.page_width, geom.page_height, geom.margin
        )));
    }

    let metadata_top = geom.page_height - 2.0 * geom.margin;
    let first_top = metadata_top - 3.0 * METADATA_LINE_H - METADATA_GAP;
    let first_rect = ContentRect {
        x: geom.margin,
        top: first_top,
        width,
        height: first_top - bottom,
    };
    if !(first_rect.height > 0.0) {
        return Err(Error::InvalidGeometry(format!(
            "page {}x{} with margin {} leaves no room below the title block",
            geom.page_width, geom.page_height, geom.margin
        )));
    }
    Ok((first_rect, page_rect))
}

/// Split the body into per-page fragments without producing any PDF output.
pub(crate) fn paginate(
    doc: &Document,
    opts: &FormattingOptions,
    geom: &PageGeometry,
) -> Result<Vec<PageFragment>, Error> {
    validate_document(doc)?;
    validate_options(opts)?;
    let (first_rect, page_rect) = content_rects(geom)?;
    let used: HashSet<char> = doc.body.chars().chain([' ']).collect();
    let body_font = fonts::resolve_font(&opts.font_family, false, &used)?;
    let measurer = TextMeasurer::new(&body_font.metrics, opts.font_size, opts.line_spacing);
    PageLayoutEngine::new(&doc.body, &measurer, first_rect, page_rect).run()
}

pub(crate) fn render(
    doc: &Document,
    opts: &FormattingOptions,
    geom: &PageGeometry,
) -> Result<RenderedArtifact, Error> {
    let t0 = std::time::Instant::now();
    validate_document(doc)?;
    validate_options(opts)?;
    let (first_rect, page_rect) = content_rects(geom)?;

    // Body uses the requested family; chrome always renders in the builtin
    // Helvetica pair, matching the original export's system-font decoration
    let body_used: HashSet<char> = doc.body.chars().chain([' ']).collect();
    let body_font = fonts::resolve_font(&opts.font_family, false, &body_used)?;
    let title_font = fonts::resolve_font("Helvetica", true, &HashSet::new())?;
    let chrome_font = fonts::resolve_font("Helvetica", false, &HashSet::new())?;
    let t_fonts = t0.elapsed();

    let measurer = TextMeasurer::new(&body_font.metrics, opts.font_size, opts.line_spacing);
    let fragments = PageLayoutEngine::new(&doc.body, &measurer, first_rect, page_rect).run()?;
    let t_layout = t0.elapsed();

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    let body_font_ref = fonts::register_font(&mut pdf, &body_font, &mut alloc);
    let title_font_ref = fonts::register_font(&mut pdf, &title_font, &mut alloc);
    let chrome_font_ref = fonts::register_font(&mut pdf, &chrome_font, &mut alloc);

    let metadata_lines = [
        format!("Created: {}", format_timestamp(&doc.created_at)),
        format!("Last Modified: {}", format_timestamp(&doc.modified_at)),
        format!("Language: {}", doc.language),
    ];

    let n = fragments.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, fragment) in fragments.iter().enumerate() {
        let mut content = Content::new();
        if fragment.page_index == 1 {
            draw_title(&mut content, &doc.title, &title_font, geom);
            draw_metadata(&mut content, &metadata_lines, &chrome_font, geom);
        }
        draw_footer(&mut content, fragment.page_index, &chrome_font, geom);
        let rect = if fragment.page_index == 1 {
            first_rect
        } else {
            page_rect
        };
        draw_body(&mut content, doc, opts, &body_font, &measurer, fragment, rect)?;

        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);
        pdf.stream(content_ids[i], &compressed)
            .filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, geom.page_width, geom.page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        let mut fonts_dict = resources.fonts();
        fonts_dict.pair(Name(b"F1"), body_font_ref);
        fonts_dict.pair(Name(b"F2"), title_font_ref);
        fonts_dict.pair(Name(b"F3"), chrome_font_ref);
    }

    pdf.document_info(info_id)
        .title(TextStr(&doc.title))
        .subject(TextStr("Document Export"))
        .creator(TextStr("textpage-pdf"));

    let bytes = pdf.finish();
    let t_assembly = t0.elapsed();

    log::debug!(
        "render phases: fonts={:.1}ms, layout={:.1}ms, assembly={:.1}ms",
        t_fonts.as_secs_f64() * 1000.0,
        (t_layout - t_fonts).as_secs_f64() * 1000.0,
        (t_assembly - t_layout).as_secs_f64() * 1000.0,
    );

    Ok(RenderedArtifact {
        bytes,
        page_count: n,
    })
}

/// Medium date / short time, matching the original export formatter
/// (e.g. "Dec 20, 2024 at 2:30 PM").
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y at %-I:%M %p").to_string()
}

fn draw_title(content: &mut Content, title: &str, font: &ResolvedFont, geom: &PageGeometry) {
    if title.is_empty() {
        return;
    }
    let ascent = TITLE_FONT_SIZE * font.metrics.ascender_ratio.unwrap_or(0.75);
    let width = font.metrics.text_width(title, TITLE_FONT_SIZE);
    let x = (geom.page_width - width) / 2.0;
    let baseline = geom.page_height - geom.margin - ascent;
    content
        .begin_text()
        .set_font(Name(b"F2"), TITLE_FONT_SIZE)
        .next_line(x, baseline)
        .show(Str(&font.encode_text(title)))
        .end_text();
}

fn draw_metadata(
    content: &mut Content,
    lines: &[String; 3],
    font: &ResolvedFont,
    geom: &PageGeometry,
) {
    let ascent = METADATA_FONT_SIZE * font.metrics.ascender_ratio.unwrap_or(0.75);
    let top = geom.page_height - 2.0 * geom.margin;
    content.set_fill_gray(CHROME_GRAY);
    content.begin_text();
    content.set_font(Name(b"F3"), METADATA_FONT_SIZE);
    let mut td = (0.0f32, 0.0f32);
    for (i, line) in lines.iter().enumerate() {
        let y = top - ascent - i as f32 * METADATA_LINE_H;
        content.next_line(geom.margin - td.0, y - td.1);
        td = (geom.margin, y);
        content.show(Str(&font.encode_text(line)));
    }
    content.end_text();
    content.set_fill_gray(0.0);
}

fn draw_footer(content: &mut Content, page_index: usize, font: &ResolvedFont, geom: &PageGeometry) {
    let text = format!("Page {page_index}");
    let ascent = FOOTER_FONT_SIZE * font.metrics.ascender_ratio.unwrap_or(0.75);
    let width = font.metrics.text_width(&text, FOOTER_FONT_SIZE);
    let x = (geom.page_width - width) / 2.0;
    let baseline = FOOTER_RISE - ascent;
    content.set_fill_gray(CHROME_GRAY);
    content
        .begin_text()
        .set_font(Name(b"F3"), FOOTER_FONT_SIZE)
        .next_line(x, baseline)
        .show(Str(&font.encode_text(&text)))
        .end_text();
    content.set_fill_gray(0.0);
}

fn draw_body(
    content: &mut Content,
    doc: &Document,
    opts: &FormattingOptions,
    font: &ResolvedFont,
    measurer: &TextMeasurer,
    fragment: &PageFragment,
    rect: ContentRect,
) -> Result<(), Error> {
    if fragment.start >= fragment.end {
        return Ok(());
    }
    let lines = measurer.break_lines(&doc.body, fragment, rect.width)?;

    let colored = opts.text_color != [0, 0, 0];
    if colored {
        let [r, g, b] = opts.text_color;
        content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    }

    let ascent = measurer.ascent();
    let line_h = measurer.line_height();
    content.begin_text();
    content.set_font(Name(b"F1"), opts.font_size);
    let mut td = (0.0f32, 0.0f32);
    for (i, line) in lines.iter().enumerate() {
        let text = doc.body[line.start..line.end].trim_end();
        if text.is_empty() {
            continue; // blank line: keep the vertical advance, draw nothing
        }
        let width = measurer.line_width(text);
        let x = match opts.alignment {
            Alignment::Left => rect.x,
            Alignment::Center => rect.x + (rect.width - width) / 2.0,
            Alignment::Right => rect.x + rect.width - width,
        };
        let y = rect.top - ascent - i as f32 * line_h;
        content.next_line(x - td.0, y - td.1);
        td = (x, y);
        content.show(Str(&font.encode_text(text)));
    }
    content.end_text();

    if colored {
        content.set_fill_gray(0.0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4() -> PageGeometry {
        PageGeometry::default()
    }

    #[test]
    fn default_geometry_has_room_on_both_page_kinds() {
        let (first, later) = content_rects(&a4()).unwrap();
        assert!(first.height > 0.0 && later.height > 0.0);
        assert!(first.height < later.height);
        assert_eq!(first.width, later.width);
        // metadata block ends above the page-1 body area
        let metadata_bottom = a4().page_height - 2.0 * a4().margin - 3.0 * METADATA_LINE_H;
        assert!(first.top <= metadata_bottom);
    }

    #[test]
    fn degenerate_margins_are_rejected() {
        for geom in [
            PageGeometry {
                page_width: 100.0,
                page_height: 100.0,
                margin: 50.0,
            },
            PageGeometry {
                page_width: 595.2,
                page_height: 841.8,
                margin: -1.0,
            },
            PageGeometry {
                page_width: 595.2,
                page_height: 200.0,
                margin: 50.0,
            },
        ] {
            assert!(matches!(
                content_rects(&geom),
                Err(Error::InvalidGeometry(_))
            ));
        }
    }

    #[test]
    fn control_characters_are_rejected() {
        let doc = Document {
            title: "T".to_string(),
            body: "a\0b".to_string(),
            language: "en".to_string(),
            created_at: Default::default(),
            modified_at: Default::default(),
        };
        assert!(matches!(
            validate_document(&doc),
            Err(Error::InvalidDocument(_))
        ));
    }

    #[test]
    fn tabs_and_newlines_are_allowed() {
        let doc = Document {
            title: "T".to_string(),
            body: "a\tb\r\nc".to_string(),
            language: "en".to_string(),
            created_at: Default::default(),
            modified_at: Default::default(),
        };
        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn non_positive_options_are_rejected_not_clamped() {
        let mut opts = FormattingOptions::default();
        opts.font_size = 0.0;
        assert!(matches!(
            validate_options(&opts),
            Err(Error::InvalidOptions(_))
        ));
        let mut opts = FormattingOptions::default();
        opts.line_spacing = -1.0;
        assert!(matches!(
            validate_options(&opts),
            Err(Error::InvalidOptions(_))
        ));
        let mut opts = FormattingOptions::default();
        opts.font_size = f32::NAN;
        assert!(matches!(
            validate_options(&opts),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn timestamp_formatting_matches_medium_date_short_time() {
        let ts: DateTime<Utc> = "2024-12-20T14:30:00Z".parse().unwrap();
        assert_eq!(format_timestamp(&ts), "Dec 20, 2024 at 2:30 PM");
    }
}

//! Pagination behavior: fragment tiling, boundary safety, capacity edges and
//! input validation.

use chrono::{DateTime, Utc};
use unicode_segmentation::UnicodeSegmentation;

use textpage_pdf::{Document, Error, FormattingOptions, PageGeometry};

fn doc(body: &str) -> Document {
    let ts: DateTime<Utc> = "2024-12-20T14:30:00Z".parse().unwrap();
    Document {
        title: "Meeting Notes".to_string(),
        body: body.to_string(),
        language: "en".to_string(),
        created_at: ts,
        modified_at: ts,
    }
}

fn long_body() -> String {
    "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod ".repeat(250)
}

#[test]
fn fragments_tile_the_body_in_page_order() {
    let doc = doc(&long_body());
    let fragments = textpage_pdf::paginate(
        &doc,
        &FormattingOptions::default(),
        &PageGeometry::default(),
    )
    .unwrap();

    assert!(fragments.len() > 1, "body should span several pages");
    assert_eq!(fragments[0].start, 0);
    assert_eq!(fragments.last().unwrap().end, doc.body.len());
    for (i, frag) in fragments.iter().enumerate() {
        assert_eq!(frag.page_index, i + 1);
        assert!(frag.start < frag.end, "non-final pages hold text");
        if i > 0 {
            assert_eq!(frag.start, fragments[i - 1].end, "no gaps, no overlaps");
        }
    }
}

#[test]
fn first_page_holds_less_text_than_later_pages() {
    let doc = doc(&long_body());
    let fragments = textpage_pdf::paginate(
        &doc,
        &FormattingOptions::default(),
        &PageGeometry::default(),
    )
    .unwrap();
    assert!(fragments.len() > 2);
    let first = fragments[0].end - fragments[0].start;
    let second = fragments[1].end - fragments[1].start;
    // Page 1 loses the title and metadata reservation
    assert!(first < second);
}

#[test]
fn empty_body_yields_exactly_one_page() {
    let fragments = textpage_pdf::paginate(
        &doc(""),
        &FormattingOptions::default(),
        &PageGeometry::default(),
    )
    .unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].start, 0);
    assert_eq!(fragments[0].end, 0);
    assert_eq!(fragments[0].page_index, 1);
}

#[test]
fn single_character_body_fits_on_one_page() {
    let fragments = textpage_pdf::paginate(
        &doc("a"),
        &FormattingOptions::default(),
        &PageGeometry::default(),
    )
    .unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].end, 1);
}

#[test]
fn unbroken_token_wider_than_the_page_is_force_split() {
    // 80pt of content width and a 500-char run with no whitespace
    let geom = PageGeometry {
        page_width: 180.0,
        page_height: 300.0,
        margin: 50.0,
    };
    let body = "a".repeat(500);
    let doc = doc(&body);
    let fragments =
        textpage_pdf::paginate(&doc, &FormattingOptions::default(), &geom).unwrap();

    assert!(fragments.len() > 1);
    assert_eq!(fragments.last().unwrap().end, body.len());
    for (i, frag) in fragments.iter().enumerate() {
        assert!(frag.end > frag.start, "every page advances");
        if i > 0 {
            assert_eq!(frag.start, fragments[i - 1].end);
        }
    }
}

#[test]
fn a_body_trimmed_to_page_one_capacity_stays_on_one_page() {
    let opts = FormattingOptions::default();
    let geom = PageGeometry::default();
    let full = doc(&long_body());
    let fragments = textpage_pdf::paginate(&full, &opts, &geom).unwrap();
    assert!(fragments.len() > 1);

    let mut trimmed = full.clone();
    trimmed.body.truncate(fragments[0].end);
    let refit = textpage_pdf::paginate(&trimmed, &opts, &geom).unwrap();
    assert_eq!(refit.len(), 1, "exactly-full page must not spill");
    assert_eq!(refit[0].end, trimmed.body.len());
}

#[test]
fn fragment_offsets_fall_on_grapheme_boundaries() {
    // Combining marks and ZWJ emoji sequences, repeated enough to wrap
    let body = "e\u{0301}l\u{00E8}ve 👩\u{200D}👩\u{200D}👧 naïve ".repeat(400);
    let doc = doc(&body);
    let geom = PageGeometry {
        page_width: 200.0,
        page_height: 250.0,
        margin: 50.0,
    };
    let fragments =
        textpage_pdf::paginate(&doc, &FormattingOptions::default(), &geom).unwrap();
    assert!(fragments.len() > 1);

    let boundaries: std::collections::HashSet<usize> = body
        .grapheme_indices(true)
        .map(|(i, _)| i)
        .chain([body.len()])
        .collect();
    for frag in &fragments {
        assert!(boundaries.contains(&frag.start));
        assert!(boundaries.contains(&frag.end));
    }
}

#[test]
fn newlines_force_page_relevant_breaks() {
    // 60 hard lines at default sizing cannot fit one page
    let body = (0..60).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let doc = doc(&body);
    let fragments = textpage_pdf::paginate(
        &doc,
        &FormattingOptions::default(),
        &PageGeometry::default(),
    )
    .unwrap();
    assert!(fragments.len() > 1);
    // Page boundaries land right after a newline, never inside a word
    for frag in &fragments[..fragments.len() - 1] {
        assert_eq!(&doc.body[frag.end - 1..frag.end], "\n");
    }
}

#[test]
fn degenerate_geometry_is_rejected() {
    let geom = PageGeometry {
        page_width: 100.0,
        page_height: 100.0,
        margin: 50.0,
    };
    let err = textpage_pdf::paginate(&doc("x"), &FormattingOptions::default(), &geom)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidGeometry(_)), "{err}");
}

#[test]
fn non_positive_font_size_is_rejected() {
    let opts = FormattingOptions {
        font_size: 0.0,
        ..FormattingOptions::default()
    };
    let err = textpage_pdf::paginate(&doc("x"), &opts, &PageGeometry::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidOptions(_)), "{err}");
}

#[test]
fn control_characters_in_body_are_rejected() {
    let err = textpage_pdf::paginate(
        &doc("before\u{0000}after"),
        &FormattingOptions::default(),
        &PageGeometry::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)), "{err}");
}

#[test]
fn unknown_font_family_is_an_error_not_a_fallback() {
    let opts = FormattingOptions {
        font_family: "No Such Family 0xDEAD".to_string(),
        ..FormattingOptions::default()
    };
    let err = textpage_pdf::paginate(&doc("x"), &opts, &PageGeometry::default()).unwrap_err();
    assert!(matches!(err, Error::MeasurementFailure(_)), "{err}");
}

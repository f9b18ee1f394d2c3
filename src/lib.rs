//! Export plain-text documents to paginated PDF.
//!
//! The library takes a [`Document`] (title, body, language, timestamps) and
//! [`FormattingOptions`], wraps the body into pages and produces a finished
//! PDF with a title line and metadata block on page 1 and a centered page
//! number on every page. Layout is pure measurement over grapheme clusters,
//! so [`paginate`] can be used on its own to preview page breaks without
//! producing any PDF output.
//!
//! Rendering is deterministic: the same document, options and geometry always
//! produce byte-identical output.
//!
//! The builtin families (Helvetica/Arial, Times, Courier) cover WinAnsi text
//! only; characters outside that set are dropped from the output. For bodies
//! in other scripts, request an installed system font family so the text is
//! embedded with full Unicode glyph mapping.
//!
//! ```no_run
//! use textpage_pdf::{Document, FormattingOptions};
//!
//! let doc = Document {
//!     title: "Meeting Notes".to_string(),
//!     body: "Discussed the quarterly roadmap.".to_string(),
//!     language: "en".to_string(),
//!     created_at: Default::default(),
//!     modified_at: Default::default(),
//! };
//! let artifact = textpage_pdf::render(&doc, &FormattingOptions::default())?;
//! assert_eq!(artifact.page_count, 1);
//! textpage_pdf::export_to_file(&doc, &FormattingOptions::default(), "notes.pdf")?;
//! # Ok::<(), textpage_pdf::Error>(())
//! ```

mod error;
mod fonts;
mod model;
mod pdf;
mod stats;

use std::path::Path;
use std::time::Instant;

pub use error::Error;
pub use model::{
    Alignment, Document, FormattingOptions, PageFragment, PageGeometry, RenderedArtifact,
};
pub use stats::TextStatistics;

/// Render a document to PDF bytes on the default A4 geometry.
pub fn render(doc: &Document, opts: &FormattingOptions) -> Result<RenderedArtifact, Error> {
    render_with_geometry(doc, opts, &PageGeometry::default())
}

/// Render a document to PDF bytes on an explicit page geometry.
pub fn render_with_geometry(
    doc: &Document,
    opts: &FormattingOptions,
    geom: &PageGeometry,
) -> Result<RenderedArtifact, Error> {
    let start = Instant::now();
    let artifact = pdf::render(doc, opts, geom)?;
    log::info!(
        "rendered {} page(s), {} bytes in {:?}",
        artifact.page_count,
        artifact.bytes.len(),
        start.elapsed()
    );
    Ok(artifact)
}

/// Compute the page breaks a render would make, without building a PDF.
///
/// Returns one fragment per page in order. Fragment byte ranges tile the body
/// exactly and always fall on grapheme-cluster boundaries. An empty body
/// still yields a single fragment, since every document renders to at least
/// one page.
pub fn paginate(
    doc: &Document,
    opts: &FormattingOptions,
    geom: &PageGeometry,
) -> Result<Vec<PageFragment>, Error> {
    pdf::paginate(doc, opts, geom)
}

/// Render a document and write the PDF to `path`.
pub fn export_to_file(
    doc: &Document,
    opts: &FormattingOptions,
    path: impl AsRef<Path>,
) -> Result<(), Error> {
    let artifact = render(doc, opts)?;
    std::fs::write(path, artifact.bytes)?;
    Ok(())
}

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::error::Error;

/// Glyph advance data for one resolved font, in 1000-units-per-em space.
pub(crate) struct FontMetrics {
    /// WinAnsi widths for bytes 32..=255.
    pub(crate) widths_1000: Vec<f32>,
    /// Per-char widths for every Unicode char requested at resolution time
    /// (embedded fonts only; builtin fonts measure through the WinAnsi table).
    pub(crate) char_widths_1000: Option<HashMap<char, f32>>,
    pub(crate) line_h_ratio: Option<f32>,
    pub(crate) ascender_ratio: Option<f32>,
}

impl FontMetrics {
    /// Width of a single character in 1000-units. Uses the per-char cache,
    /// falls back to the WinAnsi table; unmappable chars measure as 0.
    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        if let Some(map) = &self.char_widths_1000 {
            if let Some(&w) = map.get(&ch) {
                return w;
            }
        }
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            self.widths_1000[(byte - 32) as usize]
        } else {
            0.0
        }
    }

    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }
}

/// How the font reaches the PDF file.
pub(crate) enum FontProgram {
    /// One of the PDF base fonts, referenced by name; nothing is embedded.
    Builtin(&'static str),
    /// A subsetted TrueType/OpenType program embedded as a Type0 CIDFont.
    Embedded(EmbeddedProgram),
}

pub(crate) struct EmbeddedProgram {
    ps_name: String,
    subset: Vec<u8>,
    char_to_gid: HashMap<char, u16>,
    /// (subset gid, advance) sorted by gid.
    gid_widths: Vec<(u16, f32)>,
    ascent: f32,
    descent: f32,
    cap_height: f32,
    bbox: Rect,
}

pub(crate) struct ResolvedFont {
    pub(crate) metrics: FontMetrics,
    pub(crate) program: FontProgram,
}

impl ResolvedFont {
    /// Encode text for a content-stream `Tj` operand: WinAnsi bytes for
    /// builtin fonts, big-endian subset glyph ids for embedded CIDFonts.
    pub(crate) fn encode_text(&self, text: &str) -> Vec<u8> {
        match &self.program {
            FontProgram::Builtin(_) => to_winansi_bytes(text),
            FontProgram::Embedded(p) => {
                let mut out = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    let gid = p.char_to_gid.get(&ch).copied().unwrap_or(0);
                    out.push((gid >> 8) as u8);
                    out.push((gid & 0xFF) as u8);
                }
                out
            }
        }
    }
}

/// Resolve a font family to measurable, embeddable form.
///
/// The PDF base families (Helvetica/Arial, Times, Courier) resolve to builtin
/// Type1 fonts with fixed width tables, with no file access involved.
/// Anything else is looked up in the system font index and prepared as a
/// subset covering `used_chars`. An unresolvable family is an error; the
/// caller decides whether to retry with a different family.
///
/// Builtin fonts are limited to WinAnsi coverage: characters outside it
/// measure as zero width and are dropped at encoding time. Bodies in other
/// scripts (CJK, Cyrillic beyond Latin-1, etc.) need an installed system
/// family, which is embedded with full Unicode glyph mapping.
pub(crate) fn resolve_font(
    family: &str,
    bold: bool,
    used_chars: &HashSet<char>,
) -> Result<ResolvedFont, Error> {
    let family = family.trim();
    if family.is_empty() {
        return Err(Error::MeasurementFailure("empty font family".to_string()));
    }

    if let Some((base_font, widths)) = builtin_base_font(family, bold) {
        return Ok(ResolvedFont {
            metrics: FontMetrics {
                widths_1000: widths,
                char_widths_1000: None,
                line_h_ratio: None,
                ascender_ratio: None,
            },
            program: FontProgram::Builtin(base_font),
        });
    }

    let (path, face_index) = find_font_file(family, bold).ok_or_else(|| {
        Error::MeasurementFailure(format!(
            "font not found: {family}{}",
            if bold { " (bold)" } else { "" }
        ))
    })?;
    log::debug!("resolved {family} bold={bold} to {}#{face_index}", path.display());

    let data = std::fs::read(&path)?;
    prepare_embedded(family, &data, face_index, used_chars).ok_or_else(|| {
        Error::MeasurementFailure(format!(
            "cannot parse font face for {family} ({})",
            path.display()
        ))
    })
}

/// Write the font objects into the PDF and return the font dict reference.
pub(crate) fn register_font(
    pdf: &mut Pdf,
    font: &ResolvedFont,
    alloc: &mut impl FnMut() -> Ref,
) -> Ref {
    let font_ref = alloc();
    match &font.program {
        FontProgram::Builtin(base) => {
            pdf.type1_font(font_ref)
                .base_font(Name(base.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        FontProgram::Embedded(p) => {
            let descriptor_ref = alloc();
            let data_ref = alloc();
            let cid_font_ref = alloc();
            let tounicode_ref = alloc();

            let data_len = i32::try_from(p.subset.len()).unwrap_or(i32::MAX);
            pdf.stream(data_ref, &p.subset)
                .pair(Name(b"Length1"), data_len);

            pdf.font_descriptor(descriptor_ref)
                .name(Name(p.ps_name.as_bytes()))
                .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
                .bbox(p.bbox)
                .italic_angle(0.0)
                .ascent(p.ascent)
                .descent(p.descent)
                .cap_height(p.cap_height)
                .stem_v(80.0)
                .font_file2(data_ref);

            {
                let mut cid = pdf.cid_font(cid_font_ref);
                cid.subtype(pdf_writer::types::CidFontType::Type2);
                cid.base_font(Name(p.ps_name.as_bytes()));
                cid.system_info(identity_system_info());
                cid.font_descriptor(descriptor_ref);
                cid.default_width(0.0);
                cid.cid_to_gid_map_predefined(Name(b"Identity"));
                if !p.gid_widths.is_empty() {
                    let mut w = cid.widths();
                    for &(gid, width) in &p.gid_widths {
                        w.consecutive(gid, [width]);
                    }
                }
            }

            let cmap_name = format!("{}-UTF16", p.ps_name);
            let mut cmap = pdf_writer::types::UnicodeCmap::new(
                Name(cmap_name.as_bytes()),
                identity_system_info(),
            );
            // Pairs in gid order keep the cmap byte-stable across renders
            let mut pairs: Vec<(u16, char)> = p.char_to_gid.iter().map(|(&c, &g)| (g, c)).collect();
            pairs.sort_unstable();
            for (gid, ch) in pairs {
                cmap.pair(gid, ch);
            }
            pdf.stream(tounicode_ref, cmap.finish().as_slice());

            pdf.type0_font(font_ref)
                .base_font(Name(p.ps_name.as_bytes()))
                .encoding_predefined(Name(b"Identity-H"))
                .descendant_font(cid_font_ref)
                .to_unicode(tounicode_ref);
        }
    }
    font_ref
}

fn identity_system_info() -> pdf_writer::types::SystemInfo<'static> {
    pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    }
}

fn prepare_embedded(
    family: &str,
    data: &[u8],
    face_index: u32,
    used_chars: &HashSet<char>,
) -> Option<ResolvedFont> {
    let face = Face::parse(data, face_index).ok()?;
    let units = face.units_per_em() as f32;
    let scale = 1000.0 / units;

    let ascent = face.ascender() as f32 * scale;
    let descent = face.descender() as f32 * scale;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 * scale)
        .unwrap_or(700.0);
    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 * scale,
        bb.y_min as f32 * scale,
        bb.x_max as f32 * scale,
        bb.y_max as f32 * scale,
    );

    // WinAnsi table as fallback for chars outside the used set
    let widths_1000: Vec<f32> = (32u8..=255u8)
        .map(|byte| {
            face.glyph_index(winansi_to_char(byte))
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map(|adv| adv as f32 * scale)
                .unwrap_or(0.0)
        })
        .collect();

    // Remap glyphs in codepoint order so identical inputs always yield
    // identical subset glyph ids and therefore identical font programs.
    let mut ordered: Vec<char> = used_chars.iter().copied().collect();
    ordered.sort_unstable();

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = HashMap::new();
    let mut char_widths_1000 = HashMap::new();
    let mut gid_widths: Vec<(u16, f32)> = Vec::new();
    for ch in ordered {
        let Some(gid) = face.glyph_index(ch) else {
            continue;
        };
        let new_gid = remapper.remap(gid.0);
        let w = face
            .glyph_hor_advance(gid)
            .map(|adv| adv as f32 * scale)
            .unwrap_or(0.0);
        char_to_gid.insert(ch, new_gid);
        char_widths_1000.insert(ch, w);
        gid_widths.push((new_gid, w));
    }
    gid_widths.sort_by_key(|&(gid, _)| gid);

    let subset = subsetter::subset(data, face_index, &remapper).unwrap_or_else(|e| {
        log::warn!("font subsetting failed for {family}: {e}; embedding full font");
        data.to_vec()
    });

    let line_h_ratio =
        (face.ascender() as f32 - face.descender() as f32 + face.line_gap() as f32) / units;
    let ascender_ratio = face.ascender() as f32 / units;

    Some(ResolvedFont {
        metrics: FontMetrics {
            widths_1000,
            char_widths_1000: Some(char_widths_1000),
            line_h_ratio: Some(line_h_ratio),
            ascender_ratio: Some(ascender_ratio),
        },
        program: FontProgram::Embedded(EmbeddedProgram {
            ps_name: family.replace(' ', ""),
            subset,
            char_to_gid,
            gid_widths,
            ascent,
            descent,
            cap_height,
            bbox,
        }),
    })
}

fn builtin_base_font(family: &str, bold: bool) -> Option<(&'static str, Vec<f32>)> {
    let key = family.to_ascii_lowercase();
    match key.as_str() {
        "helvetica" | "arial" => Some((
            if bold { "Helvetica-Bold" } else { "Helvetica" },
            helvetica_widths(bold),
        )),
        "times" | "times new roman" | "times-roman" => Some((
            if bold { "Times-Bold" } else { "Times-Roman" },
            times_widths(bold),
        )),
        "courier" | "courier new" => Some((
            if bold { "Courier-Bold" } else { "Courier" },
            courier_widths(),
        )),
        _ => None,
    }
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths(bold: bool) -> Vec<f32> {
    let (upper, lower, wide) = if bold {
        (722.0, 611.0, 889.0)
    } else {
        (667.0, 556.0, 833.0)
    };
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 | 87 => wide,                      // M W
            65..=90 => upper,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => wide,                    // m w
            97..=122 => lower,                    // lowercase a-z (average)
            _ => lower,
        })
        .collect()
}

/// Approximate Times widths at 1000 units/em for WinAnsi chars 32..=255.
fn times_widths(bold: bool) -> Vec<f32> {
    let (upper, lower) = if bold { (722.0, 500.0) } else { (667.0, 444.0) };
    (32u8..=255u8)
        .map(|b| match b {
            32 => 250.0,
            33..=47 => 333.0,
            48..=57 => 500.0,
            58..=64 => 333.0,
            73 | 74 => 333.0,
            77 | 87 => 889.0,
            65..=90 => upper,
            91..=96 => 333.0,
            102 | 105 | 106 | 108 | 116 => 278.0,
            109 | 119 => 722.0,
            97..=122 => lower,
            _ => lower,
        })
        .collect()
}

/// Courier is monospaced: every glyph advances 600.
fn courier_widths() -> Vec<f32> {
    vec![600.0; 224]
}

/// (lowercase family name, bold) -> (file path, face index within TTC)
type FontLookup = HashMap<(String, bool), (PathBuf, u32)>;

static FONT_INDEX: OnceLock<FontLookup> = OnceLock::new();

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode() {
            if let Some(s) = name.to_string() {
                return Some(s);
            }
        }
    }
    None
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    // User-configured directories first, so they win over system fonts
    if let Ok(val) = std::env::var("TEXTPAGE_FONTS") {
        let sep = if cfg!(windows) { ';' } else { ':' };
        for part in val.split(sep) {
            let trimmed = part.trim();
            if !trimmed.is_empty() {
                dirs.push(PathBuf::from(trimmed));
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
    }

    dirs
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

fn is_font_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ttc"))
}

fn scan_font_dirs() -> FontLookup {
    let t0 = std::time::Instant::now();
    let mut index = FontLookup::new();
    let mut files_scanned = 0u32;
    let mut visited: HashSet<PathBuf> = HashSet::new();

    let mut stack: Vec<PathBuf> = font_directories();
    while let Some(dir) = stack.pop() {
        if !visited.insert(dir.clone()) {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if !is_font_file(&path) {
                continue;
            }
            files_scanned += 1;
            let Ok(file) = std::fs::File::open(&path) else {
                continue;
            };
            let Ok(data) = (unsafe { Mmap::map(&file) }) else {
                continue;
            };
            let face_count = if is_font_collection(&path) {
                ttf_parser::fonts_in_collection(&data).unwrap_or(1)
            } else {
                1
            };
            for face_idx in 0..face_count {
                let Ok(face) = Face::parse(&data, face_idx) else {
                    continue;
                };
                // The engine has no italic axis; skip italic faces so they
                // cannot shadow the upright variant.
                if face.is_italic() {
                    continue;
                }
                if let Some(family) = font_family_name(&face) {
                    index
                        .entry((family.to_lowercase(), face.is_bold()))
                        .or_insert((path.clone(), face_idx));
                }
            }
        }
    }

    log::info!(
        "font scan: {:.1}ms, {} files parsed, {} entries",
        t0.elapsed().as_secs_f64() * 1000.0,
        files_scanned,
        index.len(),
    );

    index
}

/// Look up a font file by family name and weight. Falls back to the regular
/// variant when the bold face is not installed.
fn find_font_file(family: &str, bold: bool) -> Option<(PathBuf, u32)> {
    let index = FONT_INDEX.get_or_init(scan_font_dirs);
    let key = family.to_lowercase();
    index
        .get(&(key.clone(), bold))
        .or_else(|| if bold { index.get(&(key, false)) } else { None })
        .cloned()
}

/// Windows-1252 (WinAnsi) byte to Unicode char. Bytes 0x80-0x9F are remapped;
/// all others map directly to their codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert UTF-8 text to WinAnsi bytes for literal PDF strings. Chars with no
/// WinAnsi mapping are dropped, matching the encoding's coverage.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(char_to_winansi)
        .filter(|&b| b != 0)
        .collect()
}

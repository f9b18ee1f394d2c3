use unicode_segmentation::UnicodeSegmentation;

/// Summary counts over a document body, computed in a single pass set.
///
/// Words follow Unicode word segmentation, characters are grapheme clusters,
/// and reading time assumes 200 words per minute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStatistics {
    pub word_count: usize,
    pub character_count: usize,
    pub characters_no_spaces: usize,
    pub line_count: usize,
    pub sentence_count: usize,
    pub reading_time_minutes: f64,
}

impl TextStatistics {
    pub fn of(text: &str) -> Self {
        let word_count = text.unicode_words().count();
        let character_count = text.graphemes(true).count();
        let characters_no_spaces = text
            .graphemes(true)
            .filter(|g| !g.chars().all(char::is_whitespace))
            .count();
        let line_count = text.split('\n').count();
        let sentence_count = text
            .split(['.', '!', '?'])
            .filter(|s| s.chars().any(|c| c.is_alphanumeric()))
            .count();
        let reading_time_minutes = word_count as f64 / 200.0;
        Self {
            word_count,
            character_count,
            characters_no_spaces,
            line_count,
            sentence_count,
            reading_time_minutes,
        }
    }
}

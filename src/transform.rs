/*!
 * Pure text rules used by the clean and chapter-check jobs.
 *
 * The localized chapter word is configuration: every pattern here is built
 * from it at runtime.
 */

use anyhow::{Context, Result};
use regex::Regex;

/// Number of leading lines inspected by the chapter check
pub const HEADING_SCAN_LINES: usize = 3;

/// Chapter marker matcher for one chapter word.
///
/// Matches, case-insensitively, either a bold marker such as `**Chapter 12**`,
/// `**3. Chapter: 4**` or an unterminated `**Chapter`, or a markdown heading
/// line such as `## Chapter 5`.
#[derive(Debug, Clone)]
pub struct ChapterMarker {
    pattern: Regex,
}

impl ChapterMarker {
    pub fn new(chapter_word: &str) -> Result<Self> {
        let word = regex::escape(chapter_word.trim());
        let source = format!(
            r"(?im)\*\*(\d+\.\s*)?{word}[\s:]*\d*[\s:]*\*\*|\*\*{word}[\s:]*\**|^#{{1,6}}[ \t]*(\d+\.\s*)?{word}[^\n]*",
            word = word
        );
        let pattern = Regex::new(&source).with_context(|| format!("Invalid chapter marker for word {:?}", chapter_word))?;
        Ok(Self { pattern })
    }

    /// Byte offset and text of the first marker
    pub fn find<'t>(&self, text: &'t str) -> Option<(usize, &'t str)> {
        self.pattern.find(text).map(|m| (m.start(), m.as_str()))
    }

    /// Drop everything before the first marker.
    ///
    /// # Returns
    /// * `Option<(String, String)>` - Cleaned text and the matched marker, or
    ///   `None` when the text has no marker
    pub fn strip_front_matter(&self, text: &str) -> Option<(String, String)> {
        let (start, marker) = self.find(text)?;
        Some((text[start..].to_string(), marker.trim().to_string()))
    }
}

/// Trimmed text of the first of the leading lines that contains `chapter_word`
pub fn find_heading_line(text: &str, chapter_word: &str) -> Option<String> {
    text.lines()
        .take(HEADING_SCAN_LINES)
        .find(|line| line.contains(chapter_word))
        .map(|line| line.trim().to_string())
}

/// `heading` on its own line followed by the unchanged text
pub fn prepend_heading(text: &str, heading: &str) -> String {
    format!("{}\n{}", heading, text)
}

use crate::types::RecognitionResult;

/// Render one result as a display line.
///
/// Only the first alternative is considered. With `word_time_offsets` set and
/// at least one word present, the line anchors on the first word:
/// `[<start> ~ <end>] <word>`. Otherwise the alternative's transcript is
/// returned unchanged. Returns `None` for a result without alternatives.
pub fn format_result(result: &RecognitionResult, word_time_offsets: bool) -> Option<String> {
    let best = result.best()?;
    if word_time_offsets {
        if let Some(first) = best.words.first() {
            return Some(format!("[{} ~ {}] {}", first.start, first.end, first.word));
        }
    }
    Some(best.transcript.clone())
}

/// Format every result in arrival order and join them with newlines.
pub fn format_results(results: &[RecognitionResult], word_time_offsets: bool) -> String {
    results
        .iter()
        .filter_map(|r| format_result(r, word_time_offsets))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Append-only list of formatted transcript lines.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Vec<String>,
    word_time_offsets: bool,
}

impl Transcript {
    pub fn new(word_time_offsets: bool) -> Self {
        Self {
            lines: Vec::new(),
            word_time_offsets,
        }
    }

    /// Format and append `results`, returning the newly added block, or
    /// `None` when nothing was added.
    pub fn append(&mut self, results: &[RecognitionResult]) -> Option<String> {
        let added: Vec<String> = results
            .iter()
            .filter_map(|r| format_result(r, self.word_time_offsets))
            .collect();
        if added.is_empty() {
            return None;
        }
        let block = added.join("\n");
        self.lines.extend(added);
        Some(block)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

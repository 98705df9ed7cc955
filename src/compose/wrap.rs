use crate::foundation::error::MemecapResult;

/// Width oracle used by the line breaker.
///
/// The CPU compositor measures with shaped text; tests plug in fixed-advance
/// measures.
pub trait TextMeasure {
    /// Advance width of `text` set at `font_px`, in output pixels.
    fn measure(&mut self, text: &str, font_px: f32) -> MemecapResult<f32>;
}

/// Greedy word wrap.
///
/// Words are joined with a single space. A word that would push the current
/// line past `max_width` starts a new line, unless the line is still empty:
/// an over-long word is kept whole on its own line rather than split.
/// Newlines in `text` are hard breaks; an empty paragraph yields an empty
/// line so vertical spacing is kept.
pub fn wrap_text<M: TextMeasure + ?Sized>(
    text: &str,
    font_px: f32,
    max_width: f32,
    measure: &mut M,
) -> MemecapResult<Vec<String>> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if measure.measure(&candidate, font_px)? > max_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    Ok(lines)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/wrap.rs"]
mod tests;

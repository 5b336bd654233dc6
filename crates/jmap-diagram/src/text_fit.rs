//! Word-wrap plus largest-integer-font-size search. Not a real text
//! shaper: `char_width_factor` is a bounded approximation of average glyph
//! width, sufficient for picking a box size that looks right without
//! depending on any physical font metrics.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextFitConfig {
    pub min_font_size: u32,
    pub max_font_size: u32,
    pub line_height: f64,
    pub char_width_factor: f64,
}

impl Default for TextFitConfig {
    fn default() -> Self {
        Self {
            min_font_size: 8,
            max_font_size: 32,
            line_height: 1.2,
            char_width_factor: 0.55,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedText {
    pub font_size: u32,
    pub lines: Vec<String>,
}

fn wrap(text: &str, max_width: f64, font_size: u32, config: &TextFitConfig) -> Vec<String> {
    let char_width = font_size as f64 * config.char_width_factor;
    let max_chars = (max_width / char_width).floor().max(1.0) as usize;

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate_len = if current.is_empty() { word.len() } else { current.len() + 1 + word.len() };
        if candidate_len > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        while current.len() > max_chars {
            let split_at = max_chars.min(current.len());
            lines.push(current[..split_at].to_string());
            current = current[split_at..].to_string();
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Pick the largest integer font size in `[min, max]` such that the
/// wrapped text fits within `(max_width, max_height)`; falls back to
/// `min_font_size` (wrapped at its implied character limit) if nothing
/// fits.
pub fn fit_text(text: &str, max_width: f64, max_height: f64, config: &TextFitConfig) -> FittedText {
    for size in (config.min_font_size..=config.max_font_size).rev() {
        let lines = wrap(text, max_width, size, config);
        let block_height = lines.len() as f64 * size as f64 * config.line_height;
        if block_height <= max_height {
            return FittedText { font_size: size, lines };
        }
    }
    FittedText {
        font_size: config.min_font_size,
        lines: wrap(text, max_width, config.min_font_size, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_fits_at_max_font_size() {
        let config = TextFitConfig::default();
        let fitted = fit_text("OK", 200.0, 100.0, &config);
        assert_eq!(fitted.font_size, config.max_font_size);
        assert_eq!(fitted.lines, vec!["OK".to_string()]);
    }

    #[test]
    fn long_text_shrinks_font_size_to_fit_height() {
        let config = TextFitConfig::default();
        let long = "a very long label that keeps going and going and going and going";
        let fitted = fit_text(long, 80.0, 30.0, &config);
        assert!(fitted.font_size < config.max_font_size);
    }

    #[test]
    fn falls_back_to_min_font_size_when_nothing_fits() {
        let config = TextFitConfig::default();
        let long = "word ".repeat(200);
        let fitted = fit_text(&long, 10.0, 1.0, &config);
        assert_eq!(fitted.font_size, config.min_font_size);
    }
}

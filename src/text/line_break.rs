use super::tokenize::Token;
use crate::style::TextStyle;

const EPSILON: f32 = 0.001;

#[derive(Clone, Debug, PartialEq)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub style: &'a TextStyle,
    /// Offset from the line start.
    pub x: f32,
    pub width: f32,
    pub is_space: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Line<'a> {
    pub fragments: Vec<Fragment<'a>>,
    pub width: f32,
    /// Empty lines (consecutive forced breaks) that precede this one.
    pub blank_lines_before: usize,
}

impl Line<'_> {
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text).collect()
    }
}

struct LineBuilder<'a> {
    fragments: Vec<Fragment<'a>>,
    width: f32,
}

impl<'a> LineBuilder<'a> {
    fn new() -> Self {
        Self {
            fragments: Vec::new(),
            width: 0.0,
        }
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn push(&mut self, text: &'a str, style: &'a TextStyle, width: f32, is_space: bool) {
        self.fragments.push(Fragment {
            text,
            style,
            x: self.width,
            width,
            is_space,
        });
        self.width += width;
    }

    /// Trim trailing spaces and hand back the finished line, if anything is left.
    fn finish(&mut self, blank_lines_before: usize) -> Option<Line<'a>> {
        while self.fragments.last().is_some_and(|f| f.is_space) {
            self.fragments.pop();
        }
        let fragments = std::mem::take(&mut self.fragments);
        self.width = 0.0;
        let last = fragments.last()?;
        Some(Line {
            width: last.x + last.width,
            fragments,
            blank_lines_before,
        })
    }
}

struct Breaker<'a, F> {
    max_width: f32,
    measure: F,
    lines: Vec<Line<'a>>,
    current: LineBuilder<'a>,
    blank: usize,
}

impl<'a, F> Breaker<'a, F>
where
    F: Fn(&str, &TextStyle) -> f32,
{
    fn flush(&mut self) {
        if let Some(line) = self.current.finish(self.blank) {
            self.lines.push(line);
            self.blank = 0;
        }
    }

    fn hard_break(&mut self) {
        if self.current.is_empty() {
            self.blank += 1;
        } else {
            self.flush();
        }
    }

    fn space(&mut self, text: &'a str, style: &'a TextStyle) {
        // Leading spaces vanish and consecutive space tokens collapse into the first.
        if self.current.fragments.last().is_none_or(|f| f.is_space) {
            return;
        }
        let w = (self.measure)(text, style);
        self.current.push(text, style, w, true);
    }

    fn word(&mut self, text: &'a str, style: &'a TextStyle) {
        let w = (self.measure)(text, style);
        if !self.current.is_empty() && self.current.width + w > self.max_width + EPSILON {
            self.flush();
        }
        if w <= self.max_width + EPSILON {
            self.current.push(text, style, w, false);
            return;
        }
        self.split_word(text, style);
    }

    /// Grow a prefix one code point at a time and cut just before it overflows.
    /// A single code point wider than the line still gets a line of its own.
    fn split_word(&mut self, text: &'a str, style: &'a TextStyle) {
        let mut start = 0;
        let mut fits_to = 0;
        for (i, ch) in text.char_indices() {
            let end = i + ch.len_utf8();
            let w = (self.measure)(&text[start..end], style);
            if w > self.max_width + EPSILON && fits_to > start {
                let piece = &text[start..fits_to];
                let pw = (self.measure)(piece, style);
                self.current.push(piece, style, pw, false);
                self.flush();
                start = fits_to;
            }
            fits_to = end;
        }
        if start < text.len() {
            let piece = &text[start..];
            let pw = (self.measure)(piece, style);
            self.current.push(piece, style, pw, false);
        }
    }
}

/// Greedy line filling.
///
/// Tokens keep their order; a break token always ends the current line; each
/// line is trimmed of leading and trailing spaces with inner space runs
/// collapsed. Words wider than `max_width` are split per code point using the
/// same `measure`, so the loop terminates for any script and any scaling.
pub fn break_lines<'a, F>(tokens: &[Token<'a>], max_width: f32, measure: F) -> Vec<Line<'a>>
where
    F: Fn(&str, &TextStyle) -> f32,
{
    let mut breaker = Breaker {
        max_width: if max_width > 0.0 { max_width } else { 0.0 },
        measure,
        lines: Vec::new(),
        current: LineBuilder::new(),
        blank: 0,
    };
    for token in tokens {
        match *token {
            Token::Break => breaker.hard_break(),
            Token::Space { text, style } => breaker.space(text, style),
            Token::Word { text, style } => breaker.word(text, style),
        }
    }
    breaker.flush();
    breaker.lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize::tokenize_str;

    /// Every code point is `unit` wide.
    fn mono(unit: f32) -> impl Fn(&str, &TextStyle) -> f32 {
        move |t: &str, _: &TextStyle| t.chars().count() as f32 * unit
    }

    fn line_texts(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(Line::text).collect()
    }

    fn non_space(tokens: &[Token<'_>]) -> String {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Word { text, .. } => Some(*text),
                _ => None,
            })
            .collect()
    }

    fn check_line_shape(tokens: &[Token<'_>], lines: &[Line<'_>]) {
        let joined: String = lines
            .iter()
            .flat_map(|l| l.fragments.iter())
            .filter(|f| !f.is_space)
            .map(|f| f.text)
            .collect();
        assert_eq!(joined, non_space(tokens));
        for line in lines {
            assert!(!line.fragments.is_empty());
            assert!(!line.fragments.first().unwrap().is_space);
            assert!(!line.fragments.last().unwrap().is_space);
            assert!(!line.fragments.windows(2).any(|w| w[0].is_space && w[1].is_space));
        }
    }

    #[test]
    fn greedy_fill() {
        let style = TextStyle::default();
        let tokens = tokenize_str("aaa bbb ccc dd", &style, false);
        let lines = break_lines(&tokens, 7.0, mono(1.0));
        assert_eq!(line_texts(&lines), vec!["aaa bbb", "ccc dd"]);
        assert_eq!(lines[0].width, 7.0);
        check_line_shape(&tokens, &lines);
    }

    #[test]
    fn trims_and_collapses_spaces() {
        let style = TextStyle::default();
        let spaced = TextStyle {
            bold: true,
            ..TextStyle::default()
        };
        let mut tokens = tokenize_str("  a ", &style, false);
        tokens.extend(tokenize_str(" b  ", &spaced, false));
        let lines = break_lines(&tokens, 100.0, mono(1.0));
        assert_eq!(line_texts(&lines), vec!["a b"]);
        check_line_shape(&tokens, &lines);
    }

    #[test]
    fn forced_breaks_start_new_lines() {
        let style = TextStyle::default();
        let tokens = tokenize_str("a\n\nb\nc", &style, true);
        let lines = break_lines(&tokens, 100.0, mono(1.0));
        assert_eq!(line_texts(&lines), vec!["a", "b", "c"]);
        assert_eq!(lines[1].blank_lines_before, 1);
        assert_eq!(lines[2].blank_lines_before, 0);
    }

    #[test]
    fn oversized_word_splits_per_code_point() {
        let style = TextStyle::default();
        let tokens = tokenize_str("xx abcdefghij y", &style, false);
        let lines = break_lines(&tokens, 4.0, mono(1.0));
        assert_eq!(line_texts(&lines), vec!["xx", "abcd", "efgh", "ij y"]);
        check_line_shape(&tokens, &lines);
    }

    #[test]
    fn unbreakable_script_terminates() {
        let style = TextStyle::default();
        let tokens = tokenize_str("日本語のテキストです", &style, false);
        let lines = break_lines(&tokens, 25.0, mono(10.0));
        assert!(lines.iter().all(|l| l.width <= 25.0));
        assert_eq!(lines.len(), 5);
        check_line_shape(&tokens, &lines);
    }

    #[test]
    fn glyph_wider_than_line_gets_own_line() {
        let style = TextStyle::default();
        let tokens = tokenize_str("abc", &style, false);
        let lines = break_lines(&tokens, 5.0, mono(50.0));
        assert_eq!(line_texts(&lines), vec!["a", "b", "c"]);
        check_line_shape(&tokens, &lines);
    }

    #[test]
    fn robust_under_scaled_measurement() {
        let style = TextStyle::default();
        let text = "the quick brown fox jumps over the lazy dog supercalifragilistic";
        let tokens = tokenize_str(text, &style, false);
        for scale in [0.01_f32, 0.37, 1.0, 3.3, 250.0] {
            for max in [0.5_f32, 3.0, 10.0, 40.0] {
                let lines = break_lines(&tokens, max, mono(scale));
                check_line_shape(&tokens, &lines);
            }
        }
    }

    #[test]
    fn infinite_width_only_breaks_on_hard_breaks() {
        let style = TextStyle::default();
        let tokens = tokenize_str("one two three\nfour", &style, true);
        let lines = break_lines(&tokens, f32::INFINITY, mono(1.0));
        assert_eq!(line_texts(&lines), vec!["one two three", "four"]);
    }
}

use super::runs::InlineRun;
use crate::style::TextStyle;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token<'a> {
    Word { text: &'a str, style: &'a TextStyle },
    Space { text: &'a str, style: &'a TextStyle },
    Break,
}

fn is_space(ch: char) -> bool {
    ch.is_whitespace() && ch != '\u{a0}'
}

fn split_run<'a>(text: &'a str, style: &'a TextStyle, out: &mut Vec<Token<'a>>) {
    let mut start = 0;
    let mut in_space = None;
    for (i, ch) in text.char_indices() {
        let space = is_space(ch);
        match in_space {
            Some(prev) if prev != space => {
                out.push(make(&text[start..i], style, prev));
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if let Some(space) = in_space {
        out.push(make(&text[start..], style, space));
    }
}

fn make<'a>(text: &'a str, style: &'a TextStyle, space: bool) -> Token<'a> {
    if space {
        Token::Space { text, style }
    } else {
        Token::Word { text, style }
    }
}

/// Split runs into alternating word and space tokens; breaks pass through.
pub fn tokenize(runs: &[InlineRun]) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    for run in runs {
        match run {
            InlineRun::Text(run) => split_run(&run.text, &run.style, &mut out),
            InlineRun::Break => out.push(Token::Break),
        }
    }
    out
}

/// Tokenize a single-style string. With `preserve_newlines`, `\n` becomes a
/// break; otherwise it is ordinary whitespace.
pub fn tokenize_str<'a>(text: &'a str, style: &'a TextStyle, preserve_newlines: bool) -> Vec<Token<'a>> {
    let mut out = Vec::new();
    if !preserve_newlines {
        split_run(text, style, &mut out);
        return out;
    }
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(Token::Break);
        }
        split_run(line.trim_end_matches('\r'), style, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::runs::Run;

    fn words(tokens: &[Token<'_>]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Word { text, .. } => format!("W({text})"),
                Token::Space { text, .. } => format!("S({})", text.len()),
                Token::Break => "BR".to_string(),
            })
            .collect()
    }

    #[test]
    fn alternates_words_and_spaces() {
        let style = TextStyle::default();
        let tokens = tokenize_str("  hello  big world ", &style, false);
        assert_eq!(
            words(&tokens),
            vec!["S(2)", "W(hello)", "S(2)", "W(big)", "S(1)", "W(world)", "S(1)"]
        );
    }

    #[test]
    fn breaks_pass_through_with_styles_kept() {
        let a = TextStyle::default();
        let b = TextStyle {
            bold: true,
            ..TextStyle::default()
        };
        let runs = vec![
            InlineRun::Text(Run {
                text: "one ".into(),
                style: a.clone(),
            }),
            InlineRun::Break,
            InlineRun::Text(Run {
                text: "two".into(),
                style: b.clone(),
            }),
        ];
        let tokens = tokenize(&runs);
        assert_eq!(words(&tokens), vec!["W(one)", "S(1)", "BR", "W(two)"]);
        match tokens[3] {
            Token::Word { style, .. } => assert!(style.bold),
            _ => unreachable!(),
        }
    }

    #[test]
    fn nbsp_binds_words() {
        let style = TextStyle::default();
        let tokens = tokenize_str("10\u{a0}kg", &style, false);
        assert_eq!(words(&tokens), vec!["W(10\u{a0}kg)"]);
    }

    #[test]
    fn newline_handling() {
        let style = TextStyle::default();
        assert_eq!(words(&tokenize_str("a\nb", &style, true)), vec!["W(a)", "BR", "W(b)"]);
        assert_eq!(words(&tokenize_str("a\nb", &style, false)), vec!["W(a)", "S(1)", "W(b)"]);
    }
}

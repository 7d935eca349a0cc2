use crate::model::{BoxContent, Display, TextTransform, WhiteSpace};
use crate::style::TextStyle;
use crate::tree::LayoutProvider;
use crate::units::UnitConverter;

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: TextStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InlineRun {
    Text(Run),
    Break,
}

/// Raw inline content in document order, before whitespace processing.
#[derive(Clone, Debug, PartialEq)]
pub enum InlinePiece {
    Text {
        text: String,
        style: TextStyle,
        white_space: WhiteSpace,
        transform: TextTransform,
    },
    Break,
}

/// Walk the inline descendants of `container` in document order. Nested
/// alignment containers are skipped: they lay out their own text.
pub fn collect_inline_pieces<P: LayoutProvider>(
    provider: &P,
    container: &P::Node,
    units: &UnitConverter,
    text_scale: f32,
) -> Vec<InlinePiece> {
    let mut out = Vec::new();
    let mut stack: Vec<P::Node> = provider.children(container).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        let Some(b) = provider.get_box(&node) else {
            continue;
        };
        if b.style.display == Display::None {
            continue;
        }
        match &b.content {
            BoxContent::Text { text } => out.push(InlinePiece::Text {
                text: text.clone(),
                style: TextStyle::from_computed(&b.style, units.pt_per_px(), text_scale),
                white_space: b.style.white_space,
                transform: b.style.text_transform,
            }),
            BoxContent::LineBreak => out.push(InlinePiece::Break),
            BoxContent::Image { .. } | BoxContent::None => {
                if !b.style.display.is_alignment_container() {
                    stack.extend(provider.children(&node).into_iter().rev());
                }
            }
        }
    }
    out
}

pub(crate) fn apply_transform(text: &str, transform: TextTransform) -> String {
    match transform {
        TextTransform::None => text.to_string(),
        TextTransform::Uppercase => text.to_uppercase(),
        TextTransform::Lowercase => text.to_lowercase(),
        TextTransform::Capitalize => {
            let mut out = String::with_capacity(text.len());
            let mut at_word_start = true;
            for ch in text.chars() {
                if at_word_start && ch.is_alphabetic() {
                    out.extend(ch.to_uppercase());
                } else {
                    out.push(ch);
                }
                at_word_start = ch.is_whitespace();
            }
            out
        }
    }
}

fn is_collapsible(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

struct RunSink {
    runs: Vec<InlineRun>,
    /// Nothing visible emitted since the container start or the last break.
    at_line_start: bool,
    /// The last emitted char is a collapsed ASCII space (trimmable).
    trailing_collapsible: bool,
}

impl RunSink {
    fn push_char(&mut self, ch: char, style: &TextStyle) {
        match self.runs.last_mut() {
            Some(InlineRun::Text(run)) if run.style.key() == style.key() => run.text.push(ch),
            _ => self.runs.push(InlineRun::Text(Run {
                text: ch.to_string(),
                style: style.clone(),
            })),
        }
        self.at_line_start = false;
    }

    fn trim_trailing(&mut self) {
        if !self.trailing_collapsible {
            return;
        }
        if let Some(InlineRun::Text(run)) = self.runs.last_mut() {
            run.text.pop();
            if run.text.is_empty() {
                self.runs.pop();
            }
        }
        self.trailing_collapsible = false;
    }

    fn push_break(&mut self) {
        self.trim_trailing();
        self.runs.push(InlineRun::Break);
        self.at_line_start = true;
    }
}

/// Flatten inline pieces into ordered style runs.
///
/// Collapsible whitespace shrinks to one space, and is dropped at the start
/// and end of the container and around forced breaks, so it survives only
/// between non-empty content. Non-breaking spaces are kept as content so they
/// bind the words around them. Adjacent runs with identical styles merge.
pub fn build_runs(pieces: &[InlinePiece]) -> Vec<InlineRun> {
    let mut sink = RunSink {
        runs: Vec::new(),
        at_line_start: true,
        trailing_collapsible: false,
    };

    for piece in pieces {
        let InlinePiece::Text {
            text,
            style,
            white_space,
            transform,
        } = piece
        else {
            sink.push_break();
            continue;
        };
        let text = apply_transform(text, *transform);

        for ch in text.chars() {
            if ch == '\n' && white_space.preserves_newlines() {
                sink.push_break();
                continue;
            }
            if white_space.collapses_spaces() && is_collapsible(ch) {
                if sink.at_line_start || sink.trailing_collapsible {
                    continue;
                }
                sink.push_char(' ', style);
                sink.trailing_collapsible = true;
                continue;
            }
            sink.trailing_collapsible = false;
            match ch {
                '\t' => {
                    for _ in 0..4 {
                        sink.push_char(' ', style);
                    }
                }
                '\r' => {}
                _ => sink.push_char(ch, style),
            }
        }
    }
    sink.trim_trailing();
    sink.runs
}

//! Text engine: flatten inline content into style runs, split runs into
//! tokens, and greedily fill lines.

mod line_break;
mod runs;
mod tokenize;

pub use line_break::{Fragment, Line, break_lines};
pub(crate) use runs::apply_transform;
pub use runs::{InlinePiece, InlineRun, Run, build_runs, collect_inline_pieces};
pub use tokenize::{Token, tokenize, tokenize_str};

use std::borrow::Cow;

use crate::style::TextStyle;

/// Width of `text` drawn in `style`, in points. Supplied by the sink.
pub trait TextMeasure {
    fn measure(&self, text: &str, style: &TextStyle) -> f32;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, &TextStyle) -> f32,
{
    fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        self(text, style)
    }
}

/// Text as measured and drawn: non-breaking spaces print as plain spaces.
pub fn printable(text: &str) -> Cow<'_, str> {
    if text.contains('\u{a0}') {
        Cow::Owned(text.replace('\u{a0}', " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// Lay out runs into lines no wider than `max_width` (use `f32::INFINITY`
/// for non-wrapping text; hard breaks still apply).
pub fn layout_runs<'a>(
    runs: &'a [InlineRun],
    max_width: f32,
    measure: &dyn TextMeasure,
) -> Vec<Line<'a>> {
    let tokens = tokenize(runs);
    break_lines(&tokens, max_width, |t, s| measure.measure(t, s))
}

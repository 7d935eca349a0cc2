use crate::item::{BorderItem, Edge};
use crate::sink::{Stroke, VectorSink};
use crate::style::StrokePattern;

/// Below this width a double border is drawn as a single solid stroke.
const DOUBLE_MIN_WIDTH: f32 = 2.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

/// Parallel strokes making up one edge, each with its inset from the outer
/// border edge to the stroke's center line.
fn strokes(edge: &Edge) -> Vec<(f32, Stroke)> {
    let w = edge.width;
    if edge.pattern == StrokePattern::Double && w >= DOUBLE_MIN_WIDTH {
        let t = w / 3.0;
        return vec![
            (t / 2.0, Stroke::solid(t, edge.color)),
            (w - t / 2.0, Stroke::solid(t, edge.color)),
        ];
    }
    vec![(
        w / 2.0,
        Stroke {
            width: w,
            color: edge.color,
            dash: edge.pattern.dash_array(),
        },
    )]
}

fn side_line(side: Side, x: f32, y: f32, w: f32, h: f32, inset: f32) -> (f32, f32, f32, f32) {
    match side {
        Side::Top => (x, y + inset, x + w, y + inset),
        Side::Right => (x + w - inset, y, x + w - inset, y + h),
        Side::Bottom => (x, y + h - inset, x + w, y + h - inset),
        Side::Left => (x + inset, y, x + inset, y + h),
    }
}

/// Draw a border box at page coordinates. On a box split across pages,
/// `top`/`bottom` say whether this slice carries those edges. A box whose
/// four sides are identical is drawn as stroked rectangles.
#[allow(clippy::too_many_arguments)]
pub fn draw_border<S: VectorSink + ?Sized>(
    sink: &mut S,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    border: &BorderItem,
    top: bool,
    bottom: bool,
) {
    if top
        && bottom
        && let Some(edge) = border.uniform()
    {
        for (inset, stroke) in strokes(edge) {
            sink.stroke_rect(
                x + inset,
                y + inset,
                (w - 2.0 * inset).max(0.0),
                (h - 2.0 * inset).max(0.0),
                &stroke,
            );
        }
        return;
    }

    let s = &border.sides;
    let sides = [
        (Side::Top, s.top.as_ref().filter(|_| top)),
        (Side::Right, s.right.as_ref()),
        (Side::Bottom, s.bottom.as_ref().filter(|_| bottom)),
        (Side::Left, s.left.as_ref()),
    ];
    for (side, edge) in sides {
        let Some(edge) = edge else {
            continue;
        };
        for (inset, stroke) in strokes(edge) {
            let (x1, y1, x2, y2) = side_line(side, x, y, w, h, inset);
            sink.stroke_line(x1, y1, x2, y2, &stroke);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sides;
    use crate::sink::{Op, RecordingSink};
    use crate::style::Rgba;

    fn edge(width: f32, pattern: StrokePattern) -> Option<Edge> {
        Some(Edge {
            width,
            color: Rgba::BLACK,
            pattern,
        })
    }

    fn draw(border: &BorderItem, top: bool, bottom: bool) -> Vec<Op> {
        let mut sink = RecordingSink::new();
        sink.add_page();
        draw_border(&mut sink, 10.0, 10.0, 100.0, 50.0, border, top, bottom);
        sink.pages()[0].clone()
    }

    #[test]
    fn uniform_border_is_one_rectangle() {
        let border = BorderItem {
            sides: Sides::all(edge(1.0, StrokePattern::Solid)),
        };
        let ops = draw(&border, true, true);
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            ops[0],
            Op::StrokeRect { x, y, width, height, .. } if x == 10.5 && y == 10.5 && width == 99.0 && height == 49.0
        ));
    }

    #[test]
    fn mixed_sides_draw_segments() {
        let border = BorderItem {
            sides: Sides {
                top: edge(1.0, StrokePattern::Solid),
                right: None,
                bottom: edge(2.0, StrokePattern::Solid),
                left: edge(1.0, StrokePattern::Dashed { dash: 3.0, gap: 3.0 }),
            },
        };
        let ops = draw(&border, true, true);
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| matches!(op, Op::StrokeLine { .. })));
        match &ops[2] {
            Op::StrokeLine { from, stroke, .. } => {
                assert_eq!(*from, (10.5, 10.0));
                assert_eq!(stroke.dash, vec![3.0, 3.0]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn double_border_draws_two_strokes_when_wide_enough() {
        let wide = BorderItem {
            sides: Sides::all(edge(3.0, StrokePattern::Double)),
        };
        let ops = draw(&wide, true, true);
        assert_eq!(ops.len(), 2);
        match (&ops[0], &ops[1]) {
            (Op::StrokeRect { x: outer, stroke: s1, .. }, Op::StrokeRect { x: inner, stroke: s2, .. }) => {
                assert_eq!(s1.width, 1.0);
                assert_eq!(s2.width, 1.0);
                assert_eq!(*outer, 10.5);
                assert_eq!(*inner, 12.5);
            }
            other => panic!("unexpected {other:?}"),
        }

        let thin = BorderItem {
            sides: Sides::all(edge(1.0, StrokePattern::Double)),
        };
        assert_eq!(draw(&thin, true, true).len(), 1);
    }

    #[test]
    fn split_box_omits_cut_edges() {
        let border = BorderItem {
            sides: Sides::all(edge(1.0, StrokePattern::Solid)),
        };
        // continuation slice: only left and right
        let ops = draw(&border, false, false);
        assert_eq!(ops.len(), 2);
        // first slice: top, left, right
        assert_eq!(draw(&border, true, false).len(), 3);
    }
}

use std::collections::HashMap;

use crate::item::{Align, GroupKey, RenderItem, TextItem};

/// Start x of each member when members of the given widths are laid end to
/// end inside `[left, right]`.
pub fn chain(align: Align, left: f32, right: f32, widths: &[f32]) -> Vec<f32> {
    let total: f32 = widths.iter().sum();
    let mut x = match align {
        Align::Left => left,
        Align::Center => left + ((right - left) - total) / 2.0,
        Align::Right => right - total,
    };
    widths
        .iter()
        .map(|w| {
            let at = x;
            x += w;
            at
        })
        .collect()
}

/// Resolve the x position of every grouped text item, keyed by item index.
/// A group takes its alignment and content bounds from its first member.
pub fn resolve_groups(items: &[RenderItem], measure: impl Fn(&TextItem) -> f32) -> HashMap<usize, f32> {
    let mut groups: HashMap<GroupKey, Vec<(u32, usize)>> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        if let Some(t) = item.as_text()
            && let Some(g) = t.group
        {
            groups.entry(g.key).or_default().push((g.order, i));
        }
    }

    let mut out = HashMap::new();
    for members in groups.values_mut() {
        members.sort_unstable();
        let Some(first) = items[members[0].1].as_text() else {
            continue;
        };
        let widths: Vec<f32> = members
            .iter()
            .filter_map(|&(_, i)| items[i].as_text())
            .map(&measure)
            .collect();
        let xs = chain(first.align, first.content_left, first.content_right, &widths);
        for (&(_, i), x) in members.iter().zip(xs) {
            out.insert(i, x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{BucketKey, InlineGroup, ItemKind};
    use crate::style::TextStyle;
    use crate::text::{InlineRun, Run};
    use crate::tree::BoxId;

    #[test]
    fn centered_pair() {
        let (left, right, w1, w2) = (40.0, 540.0, 120.0, 80.0);
        let xs = chain(Align::Center, left, right, &[w1, w2]);
        let first = left + ((right - left) - (w1 + w2)) / 2.0;
        assert_eq!(xs, vec![first, first + w1]);
    }

    #[test]
    fn right_and_left() {
        assert_eq!(chain(Align::Right, 0.0, 100.0, &[10.0, 20.0]), vec![70.0, 80.0]);
        assert_eq!(chain(Align::Left, 5.0, 100.0, &[10.0, 20.0]), vec![5.0, 15.0]);
    }

    fn grouped(text: &str, order: u32) -> RenderItem {
        RenderItem {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 10.0,
            kind: ItemKind::Text(TextItem {
                runs: vec![InlineRun::Text(Run {
                    text: text.into(),
                    style: TextStyle::default(),
                })],
                align: Align::Center,
                wrap: false,
                max_width: 100.0,
                line_height: 12.0,
                bucket: BucketKey {
                    container: BoxId(0),
                    y_px: 0,
                },
                group: Some(InlineGroup {
                    key: crate::item::GroupKey {
                        container: BoxId(0),
                        line: 0,
                    },
                    order,
                }),
                content_left: 0.0,
                content_right: 100.0,
                float_left: false,
            }),
        }
    }

    #[test]
    fn members_follow_order_not_list_position() {
        let items = vec![grouped("bb", 1), grouped("aaaa", 0)];
        // 10 units per char: widths 40 (order 0) and 20 (order 1), centered in 100
        let xs = resolve_groups(&items, |t| t.text().chars().count() as f32 * 10.0);
        assert_eq!(xs[&1], 20.0);
        assert_eq!(xs[&0], 60.0);
    }
}

//! Post-passes that repair vertical jitter between text fragments.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::item::{BucketKey, GroupKey, ItemKind, RenderItem};
use crate::tree::BoxId;

/// Cluster the buckets of each container: walking bucket values upwards,
/// every value within `tolerance_px` of the current master joins it,
/// anything further starts a new master. Applying it twice changes nothing.
pub fn merge_buckets(items: &mut [RenderItem], tolerance_px: f32) -> usize {
    let mut per_container: BTreeMap<BoxId, BTreeSet<i32>> = BTreeMap::new();
    for item in items.iter() {
        if let ItemKind::Text(t) = &item.kind {
            per_container
                .entry(t.bucket.container)
                .or_default()
                .insert(t.bucket.y_px);
        }
    }

    let mut remap: HashMap<BucketKey, i32> = HashMap::new();
    for (container, values) in per_container {
        let mut master: Option<i32> = None;
        for y in values {
            match master {
                Some(m) if (y - m) as f32 <= tolerance_px => {
                    remap.insert(BucketKey { container, y_px: y }, m);
                }
                _ => master = Some(y),
            }
        }
    }

    let mut changed = 0;
    for item in items.iter_mut() {
        if let ItemKind::Text(t) = &mut item.kind
            && let Some(&m) = remap.get(&t.bucket)
        {
            log::debug!("bucket {:?} merged into y={m}", t.bucket);
            t.bucket.y_px = m;
            changed += 1;
        }
    }
    changed
}

/// Re-key inline groups on their merged bucket and number the members of
/// each group in document order.
pub fn assign_groups(items: &mut [RenderItem]) {
    let mut next: HashMap<GroupKey, u32> = HashMap::new();
    for item in items.iter_mut() {
        if let ItemKind::Text(t) = &mut item.kind
            && let Some(g) = &mut t.group
        {
            g.key.line = t.bucket.y_px;
            let order = next.entry(g.key).or_insert(0);
            g.order = *order;
            *order += 1;
        }
    }
}

/// Align items of one bucket: when their tops spread no more than
/// `tolerance_pt`, all take the position of an anchor, preferring an item
/// that belongs to an inline group. Float-left items also move to their
/// container's left content edge.
pub fn snap_buckets(items: &mut [RenderItem], tolerance_pt: f32) {
    let mut buckets: BTreeMap<BucketKey, Vec<usize>> = BTreeMap::new();
    for (i, item) in items.iter().enumerate() {
        if let ItemKind::Text(t) = &item.kind {
            buckets.entry(t.bucket).or_default().push(i);
        }
    }

    for members in buckets.values() {
        if members.len() < 2 {
            continue;
        }
        let (lo, hi) = members
            .iter()
            .map(|&i| items[i].y)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
        if hi - lo > tolerance_pt {
            continue;
        }
        let anchor = members
            .iter()
            .copied()
            .find(|&i| items[i].as_text().is_some_and(|t| t.group.is_some()))
            .unwrap_or(members[0]);
        let y = items[anchor].y;
        for &i in members {
            items[i].y = y;
        }
    }

    for item in items.iter_mut() {
        if let ItemKind::Text(t) = &item.kind
            && t.float_left
        {
            item.x = t.content_left;
        }
    }
}

//! Overlap resolution for emotion spans.

use std::cmp::Ordering;
use story_model::EmotionSpan;
use tracing::debug;

/// Document order; at equal ranges the stronger span comes first.
fn span_order(a: &EmotionSpan, b: &EmotionSpan) -> Ordering {
    a.start
        .cmp(&b.start)
        .then(a.end.cmp(&b.end))
        .then(b.intensity.total_cmp(&a.intensity))
        .then_with(|| a.label.cmp(&b.label))
}

/// Sort spans by start offset and drop overlaps, keeping the more intense
/// span of each overlapping pair. On equal intensity the earlier span stays.
/// Zero-length spans are dropped.
///
/// Returns the arc and the number of spans dropped.
pub fn resolve_overlaps(mut spans: Vec<EmotionSpan>) -> (Vec<EmotionSpan>, usize) {
    let total = spans.len();
    spans.retain(|span| !span.is_empty());
    spans.sort_by(span_order);

    let mut arc: Vec<EmotionSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        let Some(last) = arc.last_mut() else {
            arc.push(span);
            continue;
        };

        if !last.overlaps(&span) {
            arc.push(span);
        } else if span.intensity > last.intensity {
            debug!(
                kept = %span.label,
                dropped = %last.label,
                start = last.start,
                end = last.end,
                "dropping overlapped emotion span"
            );
            *last = span;
        } else {
            debug!(
                kept = %last.label,
                dropped = %span.label,
                start = span.start,
                end = span.end,
                "dropping overlapped emotion span"
            );
        }
    }

    let dropped = total - arc.len();
    (arc, dropped)
}

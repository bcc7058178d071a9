use crate::model::*;

// ── Availability Algorithm ────────────────────────────────────────

/// Free sub-windows of `query` on one resource: the query minus every
/// indexed reservation, optionally keeping only gaps of `min_duration`.
pub fn free_spans(resource: &ResourceState, query: &Span, min_duration: Option<Ms>) -> Vec<Span> {
    // Ended entries awaiting the sweep may overlap newer ones, and clamping can make
    // neighbours touch; merge keeps subtract's input well-formed.
    let taken: Vec<Span> = resource
        .overlapping(query)
        .map(|i| Span::new(i.span.start.max(query.start), i.span.end.min(query.end)))
        .collect();
    let taken = merge_overlapping(&taken);

    let mut free = subtract_intervals(&[*query], &taken);
    if let Some(min) = min_duration {
        free.retain(|s| s.duration_ms() >= min);
    }
    free
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}

pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Span::new(current_start, current_end));
        }
    }

    result
}

/// Sweep-line over several resources' free spans: the windows where at
/// least `min_available` of them are free at once.
pub fn at_least_k_free(per_resource: &[Vec<Span>], min_available: usize) -> Vec<Span> {
    if min_available == 0 || per_resource.len() < min_available {
        return Vec::new();
    }

    let mut events: Vec<(Ms, i32)> = Vec::new();
    for spans in per_resource {
        for s in spans {
            events.push((s.start, 1));
            events.push((s.end, -1));
        }
    }
    // Ends before starts at equal times: touching spans don't stack.
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let threshold = min_available as i32;
    let mut result: Vec<Span> = Vec::new();
    let mut count: i32 = 0;
    let mut seg_start: Option<Ms> = None;

    for (time, delta) in &events {
        let prev = count;
        count += delta;

        if prev < threshold && count >= threshold {
            seg_start = Some(*time);
        } else if prev >= threshold && count < threshold
            && let Some(start) = seg_start.take()
            && *time > start {
                result.push(Span::new(start, *time));
            }
    }

    // A drop and immediate rise at the same instant splits one window in two.
    merge_overlapping(&result)
}

/// Count, per bucket of `window`, how many resources were occupied at any
/// point inside it. `occupied` holds each resource's sorted, merged spans.
pub fn occupancy_buckets(occupied: &[Vec<Span>], window: &Span, bucket: Ms) -> Vec<OccupancyBucket> {
    let mut buckets = Vec::new();
    let mut start = window.start;
    while start < window.end {
        let span = Span::new(start, (start + bucket).min(window.end));
        let busy = occupied
            .iter()
            .filter(|spans| {
                let right = spans.partition_point(|s| s.start < span.end);
                spans[..right].iter().any(|s| s.end > span.start)
            })
            .count() as u32;
        buckets.push(OccupancyBucket { span, busy });
        start = span.end;
    }
    buckets
}

use std::ops::Range;

/// Splits `len` jobs into at most `workers` contiguous, near-equal ranges.
///
/// Earlier ranges take the remainder, so sizes differ by at most one.
pub fn chunk_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let count = workers.clamp(1, len);
    let base = len / count;
    let extra = len % count;

    let mut ranges = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

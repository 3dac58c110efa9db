use std::ops::Range;

/// A contiguous half-open range `[start, end)` of the input assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Split `len` elements into at most `parallelism` contiguous chunks.
///
/// Never produces more chunks than elements. The first `len % n` chunks
/// carry one extra element so sizes differ by at most one.
pub fn partition(len: usize, parallelism: usize) -> Vec<Chunk> {
    if len == 0 || parallelism == 0 {
        return Vec::new();
    }

    let n = parallelism.min(len);
    let base = len / n;
    let remainder = len % n;

    let mut chunks = Vec::with_capacity(n);
    let mut start = 0;

    for index in 0..n {
        let extra = usize::from(index < remainder);
        let end = start + base + extra;
        chunks.push(Chunk { index, start, end });
        start = end;
    }

    debug_assert_eq!(start, len);
    chunks
}

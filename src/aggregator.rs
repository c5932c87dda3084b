use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A label paired with its (possibly averaged) score. Derived per cycle,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedLabel {
    pub label: String,
    pub score: f32,
}

/// Element-wise arithmetic mean of one score vector per window.
///
/// Returns `None` for an empty cycle (no window was ready) - that is the
/// normal quiet-start condition, not an error. All vectors share the
/// vocabulary length by construction.
pub fn mean_scores(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut mean = vec![0.0f32; first.len()];
    for vector in vectors {
        for (acc, &score) in mean.iter_mut().zip(vector) {
            *acc += score;
        }
    }
    let count = vectors.len() as f32;
    for acc in &mut mean {
        *acc /= count;
    }
    Some(mean)
}

// Heap entry ordered by score, with lower index winning exact ties so the
// ranking is deterministic.
#[derive(PartialEq)]
struct Candidate {
    score: f32,
    index: usize,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Indices of the `k` largest scores, strictly descending by score.
///
/// Keeps a bounded min-heap of size `k` rather than sorting the whole
/// vocabulary - the vocabulary runs to hundreds of labels and this runs
/// every cycle.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<std::cmp::Reverse<Candidate>> = BinaryHeap::with_capacity(k + 1);
    for (index, &score) in scores.iter().enumerate() {
        heap.push(std::cmp::Reverse(Candidate { score, index }));
        if heap.len() > k {
            heap.pop();
        }
    }

    let mut top: Vec<Candidate> = heap.into_iter().map(|r| r.0).collect();
    top.sort_by(|a, b| b.cmp(a));
    top.into_iter().map(|c| c.index).collect()
}

//! Vector primitives and top-K selection.
//!
//! Returns raw cosine similarity in `[-1, 1]` rather than rescaling to
//! `[0, 1]` — callers that want a display-friendly percentage do that
//! rescale themselves.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Rescales `v` to unit L2 norm. Zero vectors are returned unchanged.
#[must_use]
pub fn normalize_vector(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Cosine similarity in `[-1, 1]`. Returns `0.0` if lengths differ,
/// either vector is empty, or either magnitude is zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// `1 - cosine_similarity(a, b)`, bounded in `[0, 2]`.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Euclidean distance. Returns `+inf` on length mismatch or empty input.
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Component-wise mean of `vectors`.
///
/// The divisor is always `vectors.len()`, even when a mismatched-dimension
/// vector is skipped from the running sum. This under-weights valid
/// vectors but is preserved intentionally for behavioral equivalence
///; callers who need the corrected divisor may
/// recompute by filtering `vectors` to a single dimension first.
#[must_use]
pub fn calculate_centroid(vectors: &[Vec<f32>]) -> Vec<f32> {
    if vectors.is_empty() {
        return Vec::new();
    }
    let dim = vectors[0].len();
    let mut sum = vec![0.0f32; dim];
    for v in vectors {
        if v.len() != dim {
            continue;
        }
        for (s, x) in sum.iter_mut().zip(v) {
            *s += x;
        }
    }
    let n = vectors.len() as f32;
    sum.iter().map(|s| s / n).collect()
}

/// Serializes a float32 slice to little-endian bytes with no length
/// prefix. `None`/empty input round-trips to `None`.
#[must_use]
pub fn float32_slice_to_bytes(v: Option<&[f32]>) -> Option<Vec<u8>> {
    let v = v?;
    if v.is_empty() {
        return None;
    }
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for f in v {
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    Some(bytes)
}

/// Deserializes little-endian bytes produced by
/// [`float32_slice_to_bytes`]. `None`/empty input round-trips to `None`;
/// a length that is not a multiple of 4 also yields `None`.
#[must_use]
pub fn bytes_to_float32_slice(bytes: Option<&[u8]>) -> Option<Vec<f32>> {
    let bytes = bytes?;
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// A scored item held in [`top_k_heap`]'s internal min-heap.
#[derive(Debug, Clone)]
pub struct ScoredItem<T> {
    pub item: T,
    pub score: f32,
}

/// Wraps a `ScoredItem` for use in a min-heap ordered by ascending score
/// (so the heap root is the smallest-scored, i.e. first-to-evict, item).
struct HeapEntry<T>(ScoredItem<T>);

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.score == other.0.score
    }
}
impl<T> Eq for HeapEntry<T> {}
impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so BinaryHeap (a max-heap) behaves as a min-heap on score.
        other
            .0
            .score
            .partial_cmp(&self.0.score)
            .unwrap_or(Ordering::Equal)
    }
}

/// Selects the top `k` items by descending score using a min-heap of
/// size `<= k`. Does not mutate `items`. Returns an empty vector for
/// `k == 0` or empty input. `O(n log k)`.
#[must_use]
pub fn top_k_heap<T: Clone>(items: &[ScoredItem<T>], k: usize) -> Vec<ScoredItem<T>> {
    if k == 0 || items.is_empty() {
        return Vec::new();
    }
    let mut heap: BinaryHeap<HeapEntry<T>> = BinaryHeap::with_capacity(k);
    for item in items {
        if heap.len() < k {
            heap.push(HeapEntry(item.clone()));
        } else if let Some(min) = heap.peek() {
            if item.score > min.0.score {
                heap.pop();
                heap.push(HeapEntry(item.clone()));
            }
        }
    }
    let mut out: Vec<ScoredItem<T>> = heap.into_iter().map(|e| e.0).collect();
    out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_opposite_vectors_is_negative_one() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_handles_mismatched_length_and_zero_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_distance_of_self_is_zero() {
        let v = normalize_vector(&[3.0, 4.0]);
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn normalize_vector_leaves_zero_vector_unchanged() {
        assert_eq!(normalize_vector(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn normalize_vector_produces_unit_norm() {
        let n = normalize_vector(&[3.0, 4.0]);
        let norm = (n[0] * n[0] + n[1] * n[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn euclidean_distance_mismatched_or_empty_is_infinite() {
        assert_eq!(euclidean_distance(&[1.0], &[1.0, 2.0]), f32::INFINITY);
        assert_eq!(euclidean_distance(&[], &[]), f32::INFINITY);
    }

    #[test]
    fn centroid_divides_by_full_input_length_even_with_skipped_vectors() {
        let vectors = vec![vec![2.0, 2.0], vec![4.0, 4.0], vec![1.0]];
        let centroid = calculate_centroid(&vectors);
        // (2+4)/3 = 2.0, not (2+4)/2 = 3.0 -- the documented quirk.
        assert!((centroid[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn float_bytes_round_trip() {
        let v = vec![1.5_f32, -2.25, 0.0];
        let bytes = float32_slice_to_bytes(Some(&v)).unwrap();
        let back = bytes_to_float32_slice(Some(&bytes)).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn float_bytes_nil_and_empty_round_trip_to_none() {
        assert!(float32_slice_to_bytes(None).is_none());
        assert!(float32_slice_to_bytes(Some(&[])).is_none());
        assert!(bytes_to_float32_slice(None).is_none());
        assert!(bytes_to_float32_slice(Some(&[])).is_none());
    }

    #[test]
    fn float_bytes_non_multiple_of_four_is_none() {
        assert!(bytes_to_float32_slice(Some(&[1, 2, 3])).is_none());
    }

    #[test]
    fn top_k_heap_returns_sorted_descending_top_k() {
        let items: Vec<ScoredItem<&str>> = vec![
            ScoredItem { item: "a", score: 0.1 },
            ScoredItem { item: "b", score: 0.9 },
            ScoredItem { item: "c", score: 0.5 },
            ScoredItem { item: "d", score: 0.7 },
        ];
        let top2 = top_k_heap(&items, 2);
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].item, "b");
        assert_eq!(top2[1].item, "d");
    }

    #[test]
    fn top_k_heap_k_zero_or_empty_is_empty() {
        let items: Vec<ScoredItem<&str>> = vec![ScoredItem { item: "a", score: 1.0 }];
        assert!(top_k_heap(&items, 0).is_empty());
        let empty: Vec<ScoredItem<&str>> = Vec::new();
        assert!(top_k_heap(&empty, 3).is_empty());
    }
}

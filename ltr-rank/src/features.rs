//! Query-document feature vectors.
//!
//! Layout: `[query topics, document topics, jaccard, cosine distance]`, so a
//! model with `n` topics yields `2n + 2` features.

use std::collections::HashSet;

use crate::topic::TopicProjection;

/// Computes feature vectors against a borrowed, read-only topic projection.
#[derive(Clone, Copy)]
pub struct FeatureExtractor<'a> {
    topics: &'a dyn TopicProjection,
}

impl<'a> FeatureExtractor<'a> {
    /// Wrap a topic projection.
    pub fn new(topics: &'a dyn TopicProjection) -> Self {
        Self { topics }
    }

    /// Length of every feature vector this extractor produces.
    pub fn dimensions(&self) -> usize {
        feature_dimensions(self.topics.topic_count())
    }

    /// Feature vector for one (query, document) pair.
    pub fn features(&self, query: &[String], doc: &[String]) -> Vec<f32> {
        let v_q = self.topics.project(query);
        let v_d = self.topics.project(doc);
        let distance = cosine_distance(&v_q, &v_d);

        let mut out = Vec::with_capacity(v_q.len() + v_d.len() + 2);
        out.extend_from_slice(&v_q);
        out.extend_from_slice(&v_d);
        out.push(jaccard(query, doc) as f32);
        out.push(distance as f32);
        out
    }
}

/// Feature vector length for a topic count.
pub fn feature_dimensions(num_topics: usize) -> usize {
    2 * num_topics + 2
}

/// Token-set Jaccard ratio. Two empty sequences give `0.0`.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// `1 - cosine similarity`. Returns `1.0` if either vector has zero magnitude.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let norm = |v: &[f32]| v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
    let dot: f64 = a.iter().zip(b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum();
    let (norm_a, norm_b) = (norm(a), norm(b));
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{CanonicalDetection, DetectionPool, RawDetection};

/// How two detections are judged to be the same object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Duplicate when intersection / smaller area exceeds `threshold`
    OverlapRatio { threshold: f32 },

    /// Duplicate when box centers are closer than `min_distance` px
    CenterDistance { min_distance: f32 },
}

impl DedupPolicy {
    pub fn is_duplicate(&self, candidate: &RawDetection, accepted: &RawDetection) -> bool {
        match *self {
            DedupPolicy::OverlapRatio { threshold } => candidate.overlap_ratio(accepted) > threshold,
            DedupPolicy::CenterDistance { min_distance } => {
                candidate.center_distance(accepted) < min_distance
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            DedupPolicy::OverlapRatio { threshold } if !(threshold > 0.0 && threshold <= 1.0) => {
                Err(ConfigError::Invalid(format!(
                    "overlap ratio threshold {threshold} must be within (0, 1]"
                )))
            }
            DedupPolicy::CenterDistance { min_distance } if !(min_distance >= 0.0) => {
                Err(ConfigError::Invalid(format!(
                    "center distance {min_distance} must not be negative"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Collapses a multi-pass detection pool into a capped canonical set
#[derive(Debug, Clone)]
pub struct Deduplicator {
    pub policy: DedupPolicy,
    pub max_detections: usize,
}

impl Deduplicator {
    pub fn new(policy: DedupPolicy, max_detections: usize) -> Self {
        Self {
            policy,
            max_detections,
        }
    }

    /// Greedy suppression in confidence order.
    ///
    /// The sort is stable, so equal confidences keep pool order (full image
    /// pass first, then tiles row-major). Output never exceeds
    /// `min(pool.len(), max_detections)`.
    pub fn deduplicate(&self, pool: DetectionPool) -> Vec<CanonicalDetection> {
        let mut candidates = pool.into_vec();
        candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));

        let mut accepted: Vec<RawDetection> = Vec::new();
        for candidate in candidates {
            if accepted.len() >= self.max_detections {
                break;
            }
            let duplicate = accepted
                .iter()
                .any(|kept| self.policy.is_duplicate(&candidate, kept));
            if !duplicate {
                accepted.push(candidate);
            }
        }

        accepted.into_iter().map(CanonicalDetection::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(threshold: f32) -> Deduplicator {
        Deduplicator::new(DedupPolicy::OverlapRatio { threshold }, 20)
    }

    #[test]
    fn keeps_higher_confidence_duplicate() {
        let pool = DetectionPool::from(vec![
            RawDetection::new(0.0, 0.0, 10.0, 10.0).with_confidence(0.4),
            RawDetection::new(1.0, 1.0, 10.0, 10.0).with_confidence(0.9),
        ]);
        let out = ratio(0.5).deduplicate(pool);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, Some(0.9));
    }

    #[test]
    fn missing_confidence_ranks_as_neutral() {
        let pool = DetectionPool::from(vec![
            RawDetection::new(0.0, 0.0, 10.0, 10.0).with_confidence(0.3),
            RawDetection::new(100.0, 0.0, 10.0, 10.0),
            RawDetection::new(200.0, 0.0, 10.0, 10.0).with_confidence(0.7),
        ]);
        let out = ratio(0.5).deduplicate(pool);
        let xs: Vec<f32> = out.iter().map(|d| d.x).collect();
        assert_eq!(xs, vec![200.0, 100.0, 0.0]);
    }

    #[test]
    fn ratio_above_threshold_is_suppressed() {
        // 10x10 boxes shifted by 4px: intersection 60 / 100 = 0.6
        let a = RawDetection::new(0.0, 0.0, 10.0, 10.0);
        let b = RawDetection::new(4.0, 0.0, 10.0, 10.0);
        assert!((a.overlap_ratio(&b) - 0.6).abs() < 1e-6);

        let out = ratio(0.5).deduplicate(DetectionPool::from(vec![a.clone(), b.clone()]));
        assert_eq!(out.len(), 1);

        let out = ratio(0.6).deduplicate(DetectionPool::from(vec![a, b]));
        assert_eq!(out.len(), 2, "ratio equal to the threshold is not a duplicate");
    }

    #[test]
    fn center_distance_policy() {
        let dedup = Deduplicator::new(DedupPolicy::CenterDistance { min_distance: 20.0 }, 20);
        let pool = DetectionPool::from(vec![
            RawDetection::new(0.0, 0.0, 10.0, 10.0),
            RawDetection::new(19.0, 0.0, 10.0, 10.0),
            RawDetection::new(20.0, 0.0, 10.0, 10.0),
        ]);
        let out = dedup.deduplicate(pool);
        let xs: Vec<f32> = out.iter().map(|d| d.x).collect();
        assert_eq!(xs, vec![0.0, 20.0]);
    }

    #[test]
    fn output_is_capped() {
        let pool: Vec<RawDetection> = (0..50)
            .map(|i| RawDetection::new(i as f32 * 20.0, 0.0, 10.0, 10.0))
            .collect();
        let out = ratio(0.5).deduplicate(DetectionPool::from(pool));
        assert_eq!(out.len(), 20);
        assert_eq!(out[19].x, 380.0);
    }

    #[test]
    fn empty_pool_yields_nothing() {
        assert!(ratio(0.5).deduplicate(DetectionPool::new()).is_empty());
    }

    #[test]
    fn policy_validation() {
        assert!(DedupPolicy::OverlapRatio { threshold: 0.0 }.validate().is_err());
        assert!(DedupPolicy::OverlapRatio { threshold: 0.3 }.validate().is_ok());
        assert!(DedupPolicy::CenterDistance { min_distance: -1.0 }.validate().is_err());
    }
}

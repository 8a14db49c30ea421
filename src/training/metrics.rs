//! Held-out evaluation: ranking metrics and the per-class report.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ArtifactKind, Error, Result};
use crate::io;

/// Precision, recall and F1 for one class or one average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class report keyed `"0"` and `"1"` with accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    #[serde(rename = "0")]
    pub negative: ClassScores,
    #[serde(rename = "1")]
    pub positive: ClassScores,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassScores,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassScores,
}

/// Contents of the metrics artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub roc_auc: f64,
    pub avg_precision: f64,
    pub report: ClassificationReport,
    /// Algorithm that actually trained
    pub model: String,
    pub threshold: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl EvaluationMetrics {
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        io::write_file(path, json)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(ArtifactKind::Metrics, path))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| Error::corrupt(path, e.to_string()))
    }
}

fn class_counts(labels: &[u8]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&y| y == 1).count();
    (labels.len() - positives, positives)
}

fn require_both_classes(labels: &[u8], scores: &[f64], metric: &str) -> Result<(usize, usize)> {
    if labels.len() != scores.len() {
        return Err(Error::Evaluation(format!(
            "{metric}: {} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }
    let (negatives, positives) = class_counts(labels);
    if negatives == 0 || positives == 0 {
        return Err(Error::Evaluation(format!(
            "{metric} is undefined when only one class is present"
        )));
    }
    Ok((negatives, positives))
}

/// Area under the ROC curve via the Mann-Whitney rank statistic, with
/// tied scores sharing their average rank.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Result<f64> {
    let (negatives, positives) = require_both_classes(labels, scores, "roc_auc")?;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the group spans start+1..=end.
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            if labels[i] == 1 {
                positive_rank_sum += rank;
            }
        }
        start = end;
    }

    let (p, n) = (positives as f64, negatives as f64);
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Average precision: `sum((R_k - R_{k-1}) * P_k)` over distinct score
/// thresholds, highest first.
pub fn average_precision(labels: &[u8], scores: &[f64]) -> Result<f64> {
    let (_, positives) = require_both_classes(labels, scores, "average_precision")?;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut previous_recall = 0.0;
    let mut ap = 0.0;
    for (k, &i) in order.iter().enumerate() {
        if labels[i] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_group = order
            .get(k + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if last_of_group {
            let recall = tp as f64 / positives as f64;
            let precision = tp as f64 / (tp + fp) as f64;
            ap += (recall - previous_recall) * precision;
            previous_recall = recall;
        }
    }
    Ok(ap)
}

/// Hard labels: failure predicted when the score exceeds `threshold`.
pub fn predict_labels(scores: &[f64], threshold: f64) -> Vec<u8> {
    scores.iter().map(|&p| u8::from(p > threshold)).collect()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn scores_for(class: u8, labels: &[u8], predicted: &[u8]) -> ClassScores {
    let tp = labels
        .iter()
        .zip(predicted)
        .filter(|&(&y, &p)| y == class && p == class)
        .count();
    let predicted_count = predicted.iter().filter(|&&p| p == class).count();
    let support = labels.iter().filter(|&&y| y == class).count();

    let precision = ratio(tp, predicted_count);
    let recall = ratio(tp, support);
    let f1_score = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassScores {
        precision,
        recall,
        f1_score,
        support,
    }
}

fn weighted_average(
    negative: &ClassScores,
    positive: &ClassScores,
    weights: [f64; 2],
    support: usize,
) -> ClassScores {
    let combine = |a: f64, b: f64| (weights[0] * a + weights[1] * b) / (weights[0] + weights[1]);
    ClassScores {
        precision: combine(negative.precision, positive.precision),
        recall: combine(negative.recall, positive.recall),
        f1_score: combine(negative.f1_score, positive.f1_score),
        support,
    }
}

/// Per-class precision, recall and F1; undefined ratios report 0.
pub fn classification_report(labels: &[u8], predicted: &[u8]) -> Result<ClassificationReport> {
    if labels.len() != predicted.len() || labels.is_empty() {
        return Err(Error::Evaluation(format!(
            "classification report needs matching non-empty inputs, got {} and {}",
            labels.len(),
            predicted.len()
        )));
    }
    let negative = scores_for(0, labels, predicted);
    let positive = scores_for(1, labels, predicted);
    let total = labels.len();
    let correct = labels.iter().zip(predicted).filter(|(y, p)| y == p).count();

    Ok(ClassificationReport {
        negative,
        positive,
        accuracy: ratio(correct, total),
        macro_avg: weighted_average(&negative, &positive, [1.0, 1.0], total),
        weighted_avg: weighted_average(
            &negative,
            &positive,
            [negative.support as f64, positive.support as f64],
            total,
        ),
    })
}

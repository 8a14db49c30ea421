//! Plain-text weekly summary of the riskiest releases.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::errors::{Error, Result};
use crate::scoring::{top_k, Prediction};

/// Modules listed in the summary.
pub const TOP_MODULES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRisk {
    pub name: String,
    pub mean_risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightSummary {
    pub k: usize,
    pub overall_mean: f64,
    pub top_k_mean: f64,
    /// Riskiest modules within the top-K, at most [`TOP_MODULES`]
    pub top_modules: Vec<GroupRisk>,
    /// Every environment present in the top-K
    pub environments: Vec<GroupRisk>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    sum / count as f64
}

/// Mean risk per group, highest first. Equal means rank by name.
fn rank_groups<'a>(rows: &'a [Prediction], key: impl Fn(&'a Prediction) -> &'a str) -> Vec<GroupRisk> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(key(row)).or_insert((0.0, 0));
        entry.0 += row.risk_score;
        entry.1 += 1;
    }
    let mut ranked: Vec<GroupRisk> = groups
        .into_iter()
        .map(|(name, (sum, count))| GroupRisk {
            name: name.to_string(),
            mean_risk: sum / count as f64,
        })
        .collect();
    ranked.sort_by(|a, b| b.mean_risk.total_cmp(&a.mean_risk));
    ranked
}

/// Summarise a ranked predictions table over its first `k` rows.
pub fn summarize(predictions: &[Prediction], k: usize) -> Result<InsightSummary> {
    if predictions.is_empty() {
        return Err(Error::DataSchema("no predictions to summarise".into()));
    }
    if k == 0 {
        return Err(Error::config_key("k", "must be at least 1"));
    }
    let head = top_k(predictions, k);
    let mut top_modules = rank_groups(head, |p| p.module.as_str());
    top_modules.truncate(TOP_MODULES);

    Ok(InsightSummary {
        k,
        overall_mean: mean(predictions.iter().map(|p| p.risk_score)),
        top_k_mean: mean(head.iter().map(|p| p.risk_score)),
        top_modules,
        environments: rank_groups(head, |p| p.environment.as_str()),
    })
}

fn join_groups(groups: &[GroupRisk]) -> String {
    groups
        .iter()
        .map(|g| format!("{} ({:.1}%)", g.name, g.mean_risk * 100.0))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for InsightSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Overall mean risk: {:.2}% | Top-{}: {:.2}%",
            self.overall_mean * 100.0,
            self.k,
            self.top_k_mean * 100.0
        )?;
        if !self.top_modules.is_empty() {
            write!(
                f,
                "\nMost critical modules (mean risk): {}",
                join_groups(&self.top_modules)
            )?;
        }
        if !self.environments.is_empty() {
            write!(f, "\nMost critical environments: {}", join_groups(&self.environments))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(id: u64, module: &str, environment: &str, risk_score: f64) -> Prediction {
        Prediction {
            release_id: id,
            release_datetime: "2024-04-01 10:00:00".into(),
            module: module.into(),
            environment: environment.into(),
            risk_score,
        }
    }

    #[test]
    fn test_ties_rank_by_name() {
        let rows = vec![
            prediction(1, "risk-engine", "prod", 0.6),
            prediction(2, "payments", "prod", 0.6),
        ];
        let summary = summarize(&rows, 2).unwrap();
        let names: Vec<&str> = summary.top_modules.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["payments", "risk-engine"]);
    }

    #[test]
    fn test_environments_rank_by_mean_not_first_row() {
        let rows = vec![
            prediction(1, "payments", "prod", 0.9),
            prediction(2, "core-banking", "dev", 0.8),
            prediction(3, "payments", "dev", 0.7),
            prediction(4, "onboarding", "prod", 0.1),
        ];
        let summary = summarize(&rows, 4).unwrap();
        let environments: Vec<&str> = summary.environments.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(environments, vec!["dev", "prod"]);
        assert!((summary.environments[0].mean_risk - 0.75).abs() < 1e-12);
        assert!((summary.environments[1].mean_risk - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_k_larger_than_table() {
        let rows = vec![prediction(1, "payments", "dev", 0.4)];
        let summary = summarize(&rows, 50).unwrap();
        assert_eq!(summary.top_k_mean, 0.4);
        assert_eq!(summary.overall_mean, 0.4);
    }

    #[test]
    fn test_at_most_three_modules() {
        let rows: Vec<Prediction> = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, m)| prediction(i as u64, m, "qa", 0.9 - i as f64 * 0.1))
            .collect();
        let summary = summarize(&rows, 4).unwrap();
        assert_eq!(summary.top_modules.len(), 3);
    }

    #[test]
    fn test_empty_and_zero_k_rejected() {
        assert!(summarize(&[], 5).is_err());
        assert!(summarize(&[prediction(1, "a", "qa", 0.1)], 0).is_err());
    }
}

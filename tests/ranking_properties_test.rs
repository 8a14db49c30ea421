use deployrisk::scoring::{is_ranked, rank, top_k, Prediction};
use deployrisk::training::stratified_split;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn predictions(scores: &[f64]) -> Vec<Prediction> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &risk_score)| Prediction {
            release_id: i as u64,
            release_datetime: "2024-01-01 00:00:00".into(),
            module: "payments".into(),
            environment: "qa".into(),
            risk_score,
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_ranked_rows_never_increase(scores in prop::collection::vec(0.0f64..=1.0, 0..200)) {
        let mut rows = predictions(&scores);
        rank(&mut rows);
        prop_assert!(is_ranked(&rows));
        prop_assert_eq!(rows.len(), scores.len());
    }

    #[test]
    fn prop_ties_keep_input_order(levels in prop::collection::vec(0u8..4, 1..100)) {
        let scores: Vec<f64> = levels.iter().map(|&l| f64::from(l) / 4.0).collect();
        let mut rows = predictions(&scores);
        rank(&mut rows);
        for pair in rows.windows(2) {
            if pair[0].risk_score == pair[1].risk_score {
                prop_assert!(pair[0].release_id < pair[1].release_id);
            }
        }
    }

    #[test]
    fn prop_top_k_is_a_prefix(scores in prop::collection::vec(0.0f64..=1.0, 0..50), k in 0usize..80) {
        let mut rows = predictions(&scores);
        rank(&mut rows);
        let head = top_k(&rows, k);
        prop_assert_eq!(head.len(), k.min(rows.len()));
        prop_assert_eq!(head, &rows[..head.len()]);
    }

    #[test]
    fn prop_split_partitions_rows(
        labels in prop::collection::vec(0u8..=1, 10..200),
        test_size in 0.1f64..0.5,
        seed in any::<u64>(),
    ) {
        let positives = labels.iter().filter(|&&y| y == 1).count();
        prop_assume!(positives >= 2 && labels.len() - positives >= 2);
        if let Ok(split) = stratified_split(&labels, test_size, &mut StdRng::seed_from_u64(seed)) {
            let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..labels.len()).collect::<Vec<_>>());
            for side in [&split.train, &split.test] {
                prop_assert!(side.iter().any(|&i| labels[i] == 1));
                prop_assert!(side.iter().any(|&i| labels[i] == 0));
            }
        }
    }
}

//! Stratified train/test partitioning.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::errors::{Error, Result};

/// Row indices of the two partitions, each in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so both partitions keep the label proportions.
///
/// The test partition holds `ceil(test_size * n)` rows. Each class
/// contributes in proportion to its frequency (largest remainder, ties to
/// the negative class) and keeps at least one row on each side.
pub fn stratified_split<R: Rng + ?Sized>(
    labels: &[u8],
    test_size: f64,
    rng: &mut R,
) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::config_key("test_size", "must be in (0, 1)"));
    }
    let n = labels.len();
    let by_class: [Vec<usize>; 2] = [
        (0..n).filter(|&i| labels[i] == 0).collect(),
        (0..n).filter(|&i| labels[i] == 1).collect(),
    ];
    for (class, rows) in by_class.iter().enumerate() {
        if rows.len() < 2 {
            return Err(Error::Training(format!(
                "class {class} has {} rows; stratified splitting needs at least 2",
                rows.len()
            )));
        }
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let counts = [by_class[0].len(), by_class[1].len()];
    let per_class = allocate(n_test, counts).ok_or_else(|| {
        Error::Training(format!(
            "a test partition of {n_test} rows out of {n} cannot hold both classes on each side"
        ))
    })?;

    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (rows, take) in by_class.into_iter().zip(per_class) {
        let mut rows = rows;
        rows.shuffle(rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

/// Per-class test counts summing to `n_test`, each in `1..count`.
fn allocate(n_test: usize, counts: [usize; 2]) -> Option<[usize; 2]> {
    let n = counts[0] + counts[1];
    if n_test < 2 || n_test + 2 > n {
        return None;
    }
    let quotas = counts.map(|c| n_test as f64 * c as f64 / n as f64);
    let mut take = quotas.map(|q| q.floor() as usize);
    if take[0] + take[1] < n_test {
        let frac = |c: usize| quotas[c] - quotas[c].floor();
        let winner = if frac(1) > frac(0) { 1 } else { 0 };
        take[winner] += n_test - take[0] - take[1];
    }

    // Keep one row of each class on both sides.
    for class in 0..2 {
        let other = 1 - class;
        let bounded = take[class].clamp(1, counts[class] - 1);
        if bounded != take[class] {
            take[other] = n_test.checked_sub(bounded)?;
            take[class] = bounded;
        }
    }
    let valid = (0..2).all(|c| take[c] >= 1 && take[c] < counts[c]);
    valid.then_some(take)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_proportions_and_size() {
        let labels: Vec<u8> = (0..100).map(|i| u8::from(i % 4 == 0)).collect();
        let split = stratified_split(&labels, 0.2, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let positives = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(positives, 5);
    }

    #[test]
    fn test_ceil_of_test_rows() {
        let labels: Vec<u8> = (0..11).map(|i| u8::from(i % 2 == 0)).collect();
        let split = stratified_split(&labels, 0.2, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(split.test.len(), 3);
    }

    #[test]
    fn test_largest_remainder_allocation() {
        assert_eq!(allocate(3, [5, 5]), Some([2, 1]));
        // Quotas 2.7 and 0.3: the rare class is lifted to one row.
        assert_eq!(allocate(3, [27, 3]), Some([2, 1]));
        assert_eq!(allocate(10, [70, 30]), Some([7, 3]));
        assert_eq!(allocate(5, [13, 7]), Some([3, 2]));
    }

    #[test]
    fn test_rare_class_kept_on_both_sides() {
        let mut labels = vec![0u8; 48];
        labels.extend([1, 1]);
        let split = stratified_split(&labels, 0.2, &mut StdRng::seed_from_u64(7)).unwrap();
        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        let train_pos = split.train.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!((test_pos, train_pos), (1, 1));
    }

    #[test]
    fn test_single_member_class_rejected() {
        let mut labels = vec![0u8; 9];
        labels.push(1);
        let err = stratified_split(&labels, 0.2, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, Error::Training(_)));
    }

    #[test]
    fn test_same_seed_same_split() {
        let labels: Vec<u8> = (0..50).map(|i| u8::from(i % 3 == 0)).collect();
        let a = stratified_split(&labels, 0.3, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = stratified_split(&labels, 0.3, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_partitions_cover_rows_once(
            labels in prop::collection::vec(0u8..2, 8..200),
            test_size in 0.1f64..0.6,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            if let Ok(split) = stratified_split(&labels, test_size, &mut rng) {
                let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
                all.sort_unstable();
                prop_assert_eq!(all, (0..labels.len()).collect::<Vec<_>>());
                prop_assert!(split.train.windows(2).all(|w| w[0] < w[1]));
                prop_assert_eq!(split.test.len(), (test_size * labels.len() as f64).ceil() as usize);
                for class in 0..2u8 {
                    prop_assert!(split.test.iter().any(|&i| labels[i] == class));
                    prop_assert!(split.train.iter().any(|&i| labels[i] == class));
                }
            }
        }
    }
}

use std::collections::HashMap;

/// Pearson correlation between two users' ratings over the books both rated.
///
/// `a` and `b` map book id to score. Returns 0 when fewer than
/// `min_common` books overlap or when either user's common scores have no
/// variance.
pub fn pearson(a: &HashMap<i64, f64>, b: &HashMap<i64, f64>, min_common: usize) -> f64 {
    let common: Vec<(f64, f64)> = a
        .iter()
        .filter_map(|(book_id, score_a)| b.get(book_id).map(|score_b| (*score_a, *score_b)))
        .collect();

    let n = common.len();
    if n == 0 || n < min_common {
        return 0.0;
    }
    let n = n as f64;

    let (mut sum1, mut sum2, mut sum1_sq, mut sum2_sq, mut p_sum) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (x, y) in &common {
        sum1 += x;
        sum2 += y;
        sum1_sq += x * x;
        sum2_sq += y * y;
        p_sum += x * y;
    }

    let num = p_sum - (sum1 * sum2 / n);
    let den = ((sum1_sq - sum1.powi(2) / n) * (sum2_sq - sum2.powi(2) / n)).sqrt();

    if den == 0.0 || den.is_nan() {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(pairs: &[(i64, f64)]) -> HashMap<i64, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_identical_taste_is_perfectly_correlated() {
        let a = ratings(&[(1, 5.0), (2, 3.0), (3, 1.0)]);
        let b = ratings(&[(1, 5.0), (2, 3.0), (3, 1.0), (4, 2.0)]);
        assert!((pearson(&a, &b, 3) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_opposite_taste_is_negatively_correlated() {
        let a = ratings(&[(1, 5.0), (2, 3.0), (3, 1.0)]);
        let b = ratings(&[(1, 1.0), (2, 3.0), (3, 5.0)]);
        assert!((pearson(&a, &b, 3) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_common_books() {
        let a = ratings(&[(1, 5.0), (2, 4.0)]);
        let b = ratings(&[(1, 5.0), (2, 4.0), (3, 1.0)]);
        assert_eq!(pearson(&a, &b, 3), 0.0);
    }

    #[test]
    fn test_constant_scores_have_no_correlation() {
        let a = ratings(&[(1, 4.0), (2, 4.0), (3, 4.0)]);
        let b = ratings(&[(1, 1.0), (2, 3.0), (3, 5.0)]);
        assert_eq!(pearson(&a, &b, 3), 0.0);
    }

    #[test]
    fn test_disjoint_users() {
        let a = ratings(&[(1, 4.0)]);
        let b = ratings(&[(2, 4.0)]);
        assert_eq!(pearson(&a, &b, 0), 0.0);
    }
}

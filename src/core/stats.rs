//! Statistics over window samples.

use std::collections::HashMap;

/// Shannon entropy (base 2) of the distribution of exact values in `samples`.
///
/// An empty slice has entropy 0.
pub fn shannon_entropy<S: AsRef<str>>(samples: &[S]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut frequencies: HashMap<&str, usize> = HashMap::new();
    for sample in samples {
        *frequencies.entry(sample.as_ref()).or_insert(0) += 1;
    }

    let n = samples.len() as f64;
    frequencies
        .values()
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// Population mean and standard deviation (divides by `N`).
pub fn mean_and_std<I>(values: I) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let values = values.into_iter();
    let (count, sum) = values
        .clone()
        .fold((0usize, 0.0), |(count, sum), v| (count + 1, sum + v));
    if count == 0 {
        return (0.0, 0.0);
    }

    let mean = sum / count as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_repeated_name_has_zero_entropy() {
        let names = vec!["www.example.com"; 25];
        assert_eq!(shannon_entropy(&names), 0.0);
    }

    #[test]
    fn test_distinct_equal_names_have_log2_n_entropy() {
        let names: Vec<String> = (0..8).map(|i| format!("h{}.example.com", i)).collect();
        assert!((shannon_entropy(&names) - 3.0).abs() < 1e-12);

        let doubled: Vec<String> = names.iter().chain(names.iter()).cloned().collect();
        assert!((shannon_entropy(&doubled) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_skewed_distribution() {
        let names = ["a", "a", "a", "b"];
        let expected = -(0.75f64 * 0.75f64.log2() + 0.25f64 * 0.25f64.log2());
        assert!((shannon_entropy(&names) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_population_statistics() {
        let (mean, std) = mean_and_std(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
    }

    #[test]
    fn test_constant_series_has_zero_std() {
        let (mean, std) = mean_and_std(std::iter::repeat(25.0).take(30));
        assert_eq!(mean, 25.0);
        assert_eq!(std, 0.0);
    }
}

use ahash::AHashSet;

/// n-gram widths scored for every file.
pub const NGRAM_WIDTHS: [usize; 3] = [1, 2, 3];

/// Result of comparing two token sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Jaccard distance for each width in `NGRAM_WIDTHS`.
    pub jaccard: [f64; 3],
    pub len_first: usize,
    pub len_second: usize,
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
}

pub fn compare<S: AsRef<str>>(first: &[S], second: &[S]) -> Comparison {
    let (only_in_first, only_in_second) = diff_words(first, second);
    Comparison {
        jaccard: NGRAM_WIDTHS.map(|n| jaccard_distance(first, second, n)),
        len_first: first.len(),
        len_second: second.len(),
        only_in_first,
        only_in_second,
    }
}

/// Tokens of `first` missing from `second` and vice versa, each sorted
/// shortest first, then alphabetically.
pub fn diff_words<S: AsRef<str>>(first: &[S], second: &[S]) -> (Vec<String>, Vec<String>) {
    let set_first: AHashSet<&str> = first.iter().map(AsRef::as_ref).collect();
    let set_second: AHashSet<&str> = second.iter().map(AsRef::as_ref).collect();
    (
        sorted_difference(&set_first, &set_second),
        sorted_difference(&set_second, &set_first),
    )
}

fn sorted_difference(a: &AHashSet<&str>, b: &AHashSet<&str>) -> Vec<String> {
    let mut diff: Vec<String> = a.difference(b).map(|w| w.to_string()).collect();
    diff.sort_by(|x, y| x.len().cmp(&y.len()).then_with(|| x.cmp(y)));
    diff
}

/// Contiguous windows of `n` tokens, joined with a space.
pub fn n_grams<S: AsRef<str>>(words: &[S], n: usize) -> AHashSet<String> {
    if n == 0 || words.len() < n {
        return AHashSet::new();
    }
    words
        .windows(n)
        .map(|window| {
            window
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(" ")
        })
        .collect()
}

/// `1 - |A ∩ B| / |A ∪ B|` over the n-gram sets. Two empty sets count as
/// identical (distance 0).
pub fn jaccard_distance<S: AsRef<str>>(first: &[S], second: &[S], n: usize) -> f64 {
    let a = n_grams(first, n);
    let b = n_grams(second, n);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    1.0 - intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_self_distance_is_zero() {
        let x = words("the quick brown fox jumps");
        for n in 1..=x.len() {
            assert_eq!(jaccard_distance(&x, &x, n), 0.0);
        }
    }

    #[test]
    fn test_symmetry() {
        let a = words("a b c d e f");
        let b = words("a b x d e y z");
        for n in 0..5 {
            assert_eq!(jaccard_distance(&a, &b, n), jaccard_distance(&b, &a, n));
        }
    }

    #[test]
    fn test_degenerate_inputs_are_identical() {
        let short_a = words("one two");
        let short_b = words("three");
        assert_eq!(jaccard_distance(&short_a, &short_b, 3), 0.0);
        let empty: Vec<&str> = Vec::new();
        assert_eq!(jaccard_distance(&empty, &empty, 1), 0.0);
    }

    #[test]
    fn test_one_side_empty_is_maximal() {
        let empty: Vec<&str> = Vec::new();
        assert_eq!(jaccard_distance(&words("a b"), &empty, 1), 1.0);
    }

    #[test]
    fn test_known_distances() {
        let a = words("a b c");
        let b = words("a b d");
        // unigrams {a,b,c} vs {a,b,d}: 2 shared of 4
        assert!((jaccard_distance(&a, &b, 1) - 0.5).abs() < 1e-12);
        // bigrams {"a b","b c"} vs {"a b","b d"}: 1 shared of 3
        assert!((jaccard_distance(&a, &b, 2) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(jaccard_distance(&a, &b, 3), 1.0);
    }

    #[test]
    fn test_n_grams_windows() {
        let grams = n_grams(&words("a b a b"), 2);
        assert_eq!(grams.len(), 2);
        assert!(grams.contains("a b"));
        assert!(grams.contains("b a"));
        assert!(n_grams(&words("a"), 0).is_empty());
    }

    #[test]
    fn test_diff_words_sorted_by_length_then_text() {
        let a = words("zeta alpha be a shared");
        let b = words("shared omega");
        let (only_a, only_b) = diff_words(&a, &b);
        assert_eq!(only_a, vec!["a", "be", "zeta", "alpha"]);
        assert_eq!(only_b, vec!["omega"]);
    }

    #[test]
    fn test_compare_bundles_metrics() {
        let a = words("x y z");
        let b = words("x y");
        let c = compare(&a, &b);
        assert_eq!(c.len_first, 3);
        assert_eq!(c.len_second, 2);
        assert_eq!(c.only_in_first, vec!["z"]);
        assert!(c.only_in_second.is_empty());
        assert!(c.jaccard[0] > 0.0 && c.jaccard[0] < 1.0);
    }
}

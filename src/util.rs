use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

pub fn random_index<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    match len {
        0 => None,
        positive => Some(rng.gen_range(0..positive)),
    }
}

pub fn coin<R: Rng + ?Sized>(rng: &mut R) -> bool {
    rng.gen_bool(0.5)
}

fn normalize(text: &str) -> Vec<char> {
    text.trim().to_lowercase().chars().collect()
}

/// Typo tolerance score in `[0, 1]`.
///
/// Counts the characters both strings share (order-insensitive, with
/// multiplicity) and divides by the length of the longer string. This is an
/// upper bound of `1 - levenshtein / longer_len`, so a swapped, dropped or
/// replaced letter in a short word still scores high.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let longer = a.len().max(b.len());
    if longer == 0 {
        return 1.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in &a {
        *counts.entry(*c).or_insert(0) += 1;
    }

    let shared = b
        .iter()
        .filter(|c| match counts.get_mut(*c) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        })
        .count();

    shared as f64 / longer as f64
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

/// Round half away from zero and clamp into `u32`.
pub fn round_percent(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value.round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_similarity_identical() {
        assert_eq!(similarity("hola", "hola"), 1.0);
        assert_eq!(similarity("  Hola ", "hola"), 1.0);
    }

    #[test]
    fn test_similarity_empty() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "abc"), 0.0);
    }

    #[test]
    fn test_similarity_typo() {
        assert!(similarity("hallo", "hola") >= 0.8);
        assert!(similarity("haus", "hasu") >= 0.8);
        assert!(similarity("katze", "katz") >= 0.8);
    }

    #[test]
    fn test_similarity_unrelated() {
        assert_eq!(similarity("xyz", "hola"), 0.0);
        assert!(similarity("dog", "hund") < 0.8);
    }

    #[test]
    fn test_similarity_bounded_by_edit_distance() {
        for (a, b) in [("hallo", "hola"), ("kitten", "sitting"), ("abc", "cab")] {
            let longer = a.chars().count().max(b.chars().count()) as f64;
            let lev_sim = 1.0 - edit_distance(a, b) as f64 / longer;
            assert!(similarity(a, b) + 1e-9 >= lev_sim);
        }
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
        assert_eq!(edit_distance("hallo", "hola"), 3);
    }

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(66.666), 67);
        assert_eq!(round_percent(50.5), 51);
        assert_eq!(round_percent(0.0), 0);
        assert_eq!(round_percent(f64::NAN), 0);
    }

    #[test]
    fn test_random_index() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(random_index(0, &mut rng), None);
        assert_eq!(random_index(1, &mut rng), Some(0));
        for _ in 0..50 {
            assert!(random_index(3, &mut rng).unwrap() < 3);
        }
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut items = vec![1, 2, 3, 4, 5];
        shuffle(&mut items, &mut rng);
        items.sort();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_coin_produces_both_sides() {
        let mut rng = StdRng::seed_from_u64(3);
        let flips: Vec<bool> = (0..64).map(|_| coin(&mut rng)).collect();
        assert!(flips.contains(&true));
        assert!(flips.contains(&false));
    }
}

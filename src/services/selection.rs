use std::collections::HashSet;

use rand::Rng;

/// Unbiased in-place shuffle. `rand` provides `SliceRandom::shuffle`, but
/// the explicit loop keeps the selection order auditable and matches the
/// fairness tests below.
pub fn fisher_yates_shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Practice-mode selection: prefer questions the student has never seen in
/// prior practice attempts for the same topic and level, backfill from seen
/// ones to reach `count`, and degrade to the whole pool when it is smaller
/// than `count`. The filtered candidate list is shuffled before truncation
/// so construction order never leaks into the result.
pub fn select_practice<T, R, F>(
    pool: Vec<T>,
    seen: &HashSet<String>,
    count: usize,
    rng: &mut R,
    id_of: F,
) -> Vec<T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> &str,
{
    let pool_len = pool.len();
    let (mut unseen, mut seen_items): (Vec<T>, Vec<T>) =
        pool.into_iter().partition(|item| !seen.contains(id_of(item)));

    let mut candidates = if pool_len >= count {
        if unseen.len() >= count {
            unseen
        } else {
            // Backfill order must not depend on storage order.
            fisher_yates_shuffle(&mut seen_items, rng);
            let need = count - unseen.len();
            unseen.extend(seen_items.into_iter().take(need));
            unseen
        }
    } else {
        unseen.extend(seen_items);
        unseen
    };

    fisher_yates_shuffle(&mut candidates, rng);
    candidates.truncate(count);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(range: std::ops::Range<u32>) -> Vec<String> {
        range.map(|n| format!("q{n}")).collect()
    }

    #[test]
    fn shuffle_is_approximately_uniform_per_position() {
        let mut rng = StdRng::seed_from_u64(7);
        let items: Vec<usize> = (0..5).collect();
        let trials = 20_000;
        let mut counts = [[0u32; 5]; 5];

        for _ in 0..trials {
            let mut current = items.clone();
            fisher_yates_shuffle(&mut current, &mut rng);
            for (position, item) in current.iter().enumerate() {
                counts[position][*item] += 1;
            }
        }

        // Each item should land in each position ~1/5 of the time.
        let expected = trials as f64 / 5.0;
        for row in counts {
            for count in row {
                let deviation = (count as f64 - expected).abs() / expected;
                assert!(deviation < 0.10, "position frequency off by {deviation}");
            }
        }
    }

    #[test]
    fn practice_prefers_unseen_questions() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = ids(0..20);
        let seen: HashSet<String> = ids(0..8).into_iter().collect();

        let picked = select_practice(pool, &seen, 10, &mut rng, |id| id.as_str());

        assert_eq!(picked.len(), 10);
        assert!(picked.iter().all(|id| !seen.contains(id)));
    }

    #[test]
    fn practice_backfills_from_seen_when_unseen_runs_short() {
        let mut rng = StdRng::seed_from_u64(2);
        let pool = ids(0..12);
        let seen: HashSet<String> = ids(0..8).into_iter().collect();

        let picked = select_practice(pool, &seen, 10, &mut rng, |id| id.as_str());

        assert_eq!(picked.len(), 10);
        let unseen_picked = picked.iter().filter(|id| !seen.contains(*id)).count();
        assert_eq!(unseen_picked, 4, "every unseen question must be included");
    }

    #[test]
    fn practice_with_fully_seen_pool_still_returns_full_set() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = ids(0..15);
        let seen: HashSet<String> = pool.iter().cloned().collect();

        let picked = select_practice(pool, &seen, 10, &mut rng, |id| id.as_str());

        assert_eq!(picked.len(), 10);
    }

    #[test]
    fn practice_degrades_to_small_pool() {
        let mut rng = StdRng::seed_from_u64(4);
        let pool = ids(0..4);
        let seen = HashSet::new();

        let picked = select_practice(pool.clone(), &seen, 10, &mut rng, |id| id.as_str());

        assert_eq!(picked.len(), 4);
        let expected: HashSet<_> = pool.into_iter().collect();
        let actual: HashSet<_> = picked.into_iter().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn practice_returns_distinct_questions() {
        let mut rng = StdRng::seed_from_u64(5);
        let pool = ids(0..12);
        let seen: HashSet<String> = ids(0..5).into_iter().collect();

        let picked = select_practice(pool, &seen, 10, &mut rng, |id| id.as_str());
        let distinct: HashSet<_> = picked.iter().cloned().collect();

        assert_eq!(distinct.len(), picked.len());
    }
}

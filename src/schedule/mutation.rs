//! The swap neighbourhood used by the annealer.

use rand::Rng;

use super::types::Schedule;

/// Swaps one uniformly chosen job on one processor with one uniformly
/// chosen job on a different processor.
///
/// The two processors are distinct and uniform over all ordered pairs.
/// Does nothing (returns `false`) with fewer than two processors or when
/// either chosen processor is empty.
pub fn swap_random_jobs<R: Rng>(schedule: &mut Schedule, rng: &mut R) -> bool {
    let m = schedule.processor_count();
    if m < 2 {
        return false;
    }

    let proc_a = rng.random_range(0..m);
    let mut proc_b = rng.random_range(0..m - 1);
    if proc_b >= proc_a {
        proc_b += 1;
    }

    let len_a = schedule.processors()[proc_a].len();
    let len_b = schedule.processors()[proc_b].len();
    if len_a == 0 || len_b == 0 {
        return false;
    }

    let index_a = rng.random_range(0..len_a);
    let index_b = rng.random_range(0..len_b);
    schedule.swap_jobs(proc_a, index_a, proc_b, index_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use u_numflow::random::create_rng;

    #[test]
    fn test_single_processor_is_noop() {
        let mut rng = create_rng(1);
        let mut s = Schedule::from_parts(vec![1, 2, 3], vec![vec![0, 1, 2]]).unwrap();
        for _ in 0..20 {
            assert!(!swap_random_jobs(&mut s, &mut rng));
        }
        assert_eq!(s.processors(), &[vec![0, 1, 2]]);
    }

    #[test]
    fn test_swap_moves_jobs_across_processors() {
        let mut rng = create_rng(2);
        let mut s = Schedule::from_parts(vec![1, 2], vec![vec![0], vec![1]]).unwrap();
        assert!(swap_random_jobs(&mut s, &mut rng));
        assert_eq!(s.processors(), &[vec![1], vec![0]]);
    }

    #[test]
    fn test_processor_sizes_are_preserved() {
        let mut rng = create_rng(3);
        let mut s = Schedule::random(vec![2; 11], 4, &mut rng).unwrap();
        let sizes: Vec<usize> = s.processors().iter().map(Vec::len).collect();
        for _ in 0..200 {
            swap_random_jobs(&mut s, &mut rng);
        }
        let after: Vec<usize> = s.processors().iter().map(Vec::len).collect();
        assert_eq!(sizes, after);
    }

    proptest! {
        #[test]
        fn prop_mutation_keeps_partition(
            durations in prop::collection::vec(1u32..100, 1..30),
            m in 1usize..6,
            steps in 1usize..100,
            seed in any::<u64>(),
        ) {
            let mut rng = create_rng(seed);
            let mut s = Schedule::random(durations, m, &mut rng).unwrap();
            for _ in 0..steps {
                swap_random_jobs(&mut s, &mut rng);
            }
            let mut ids: Vec<usize> = s.processors().iter().flatten().copied().collect();
            ids.sort_unstable();
            prop_assert_eq!(ids, (0..s.job_count()).collect::<Vec<_>>());
            prop_assert_eq!(s.processor_count(), m);
        }
    }
}

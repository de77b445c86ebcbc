use rand::Rng;
use rand::seq::SliceRandom;

/// Returns a uniformly random permutation of `items`, leaving the input untouched.
///
/// `SliceRandom::shuffle` is a Fisher-Yates shuffle. Sorting with a random comparator
/// is not a uniform permutation and must not be used in its place.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// Picks `min(n, pool.len())` distinct entries of `pool` in random order.
///
/// A pool smaller than `n` yields a shorter selection rather than an error.
pub fn select_subset<T: Clone, R: Rng + ?Sized>(pool: &[T], n: usize, rng: &mut R) -> Vec<T> {
    let mut selected = shuffle(pool, rng);
    selected.truncate(n.min(pool.len()));
    selected
}

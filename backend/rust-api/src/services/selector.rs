use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::question::{Difficulty, Question};
use crate::services::question_bank::QuestionBank;

/// Splits `count` into one share per difficulty. The remainder goes to the
/// first buckets in `Difficulty::ALL` order.
pub fn difficulty_shares(count: usize) -> [usize; 3] {
    let base = count / Difficulty::ALL.len();
    let extra = count % Difficulty::ALL.len();

    let mut shares = [base; 3];
    for share in shares.iter_mut().take(extra) {
        *share += 1;
    }
    shares
}

/// Draws up to `count` questions stratified across difficulty levels.
///
/// A bucket holding fewer questions than its share contributes all it has,
/// so the result may be shorter than `count`. An empty bank yields an empty
/// vector.
pub fn select<R: Rng + ?Sized>(bank: &QuestionBank, count: usize, rng: &mut R) -> Vec<Question> {
    if bank.is_empty() || count == 0 {
        return Vec::new();
    }

    let shares = difficulty_shares(count);
    let mut selected = Vec::with_capacity(count.min(bank.len()));

    for (difficulty, share) in Difficulty::ALL.into_iter().zip(shares) {
        let mut bucket: Vec<&Question> = bank.with_difficulty(difficulty).collect();
        bucket.shuffle(rng);

        if bucket.len() < share {
            tracing::debug!(
                "Difficulty {} has {} questions, wanted {}",
                difficulty.as_str(),
                bucket.len(),
                share
            );
        }

        selected.extend(bucket.into_iter().take(share).cloned());
    }

    selected.shuffle(rng);
    selected.truncate(count);
    selected
}

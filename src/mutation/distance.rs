use crate::mutation::{Mutation, MutationError};
use crate::sequence::alphabet::Alphabet;
use crate::sequence::Sequence;

/// Number of differing positions between two equal-length sequences.
///
/// # Returns
/// * `Result<usize, MutationError>` - `LengthMismatch` if the lengths differ
pub fn hamming_distance(a: &Sequence, b: &Sequence) -> Result<usize, MutationError> {
    if a.len() != b.len() {
        return Err(MutationError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .filter(|(x, y)| x != y)
        .count())
}

/// Levenshtein distance with unit costs, two rows of the usual DP table.
pub fn edit_distance(a: &Sequence, b: &Sequence) -> usize {
    let (s, t) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=t.len()).collect();
    let mut curr = vec![0; t.len() + 1];

    for (i, &sc) in s.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &tc) in t.iter().enumerate() {
            curr[j + 1] = if sc == tc {
                prev[j]
            } else {
                1 + prev[j].min(prev[j + 1]).min(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[t.len()]
}

/// Substitutions turning `original` into `mutated`. Only equal lengths are diffed; otherwise the
/// result is empty.
pub fn find_mutations(original: &Sequence, mutated: &Sequence) -> Vec<Mutation> {
    if original.len() != mutated.len() {
        return Vec::new();
    }
    original
        .as_bytes()
        .iter()
        .zip(mutated.as_bytes())
        .enumerate()
        .filter(|(_, (x, y))| x != y)
        .map(|(i, (&x, &y))| Mutation::substitution(i, x, y))
        .collect()
}

/// Every sequence one substitution away, over the standard symbols of the sequence type.
pub fn generate_all_neighbors(seq: &Sequence) -> Vec<Sequence> {
    let symbols = Alphabet::standard_symbols(seq.seq_type()).as_bytes();
    let mut neighbors = Vec::with_capacity(seq.len() * symbols.len().saturating_sub(1));
    for (pos, &current) in seq.as_bytes().iter().enumerate() {
        for &symbol in symbols.iter().filter(|&&s| s != current) {
            let mut data = seq.as_bytes().to_vec();
            data[pos] = symbol;
            neighbors.push(seq.with_data(String::from_utf8_lossy(&data).into_owned()));
        }
    }
    neighbors
}

/// Fraction of changed positions: Hamming over length for equal lengths, edit distance over the
/// longer length otherwise. Two empty sequences have rate `0.0`.
pub fn calculate_mutation_rate(original: &Sequence, mutated: &Sequence) -> f64 {
    let longest = original.len().max(mutated.len());
    if longest == 0 {
        return 0.0;
    }
    let changes = match hamming_distance(original, mutated) {
        Ok(distance) => distance,
        Err(_) => edit_distance(original, mutated),
    };
    changes as f64 / longest as f64
}

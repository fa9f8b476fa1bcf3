use crate::constraints::builtin::premature_stop_count;
use crate::constraints::ConstraintEngine;
use crate::mutation::{Mutation, MutationConfig, MutationError, MutationResult, MutationType};
use crate::rng::SeededRng;
use crate::sequence::alphabet::{Alphabet, CODON_LENGTH};
use crate::sequence::{Position, Sequence, SequenceType};
use log::{debug, warn};

/// Either an RNG the engine owns or one a caller lends it.
enum RngHandle<'a> {
    Owned(Box<SeededRng>),
    Borrowed(&'a mut SeededRng),
}

impl RngHandle<'_> {
    fn get(&mut self) -> &mut SeededRng {
        match self {
            RngHandle::Owned(rng) => rng,
            RngHandle::Borrowed(rng) => rng,
        }
    }
}

/// Turns a `MutationConfig` and a random stream into concrete edits.
///
/// The engine never modifies a sequence it is given: every operation returns a new `Sequence`
/// inside a `MutationResult`.
pub struct MutationEngine<'a> {
    rng: RngHandle<'a>,
    config: MutationConfig,
    /// Hook consulted after every edit; absent means "always satisfied"
    constraint_checker: Option<Box<dyn Fn(&Sequence) -> bool + 'a>>,
}

impl MutationEngine<'static> {
    /// Creates an engine that owns a fresh `SeededRng`.
    ///
    /// # Arguments
    /// * `seed` - Seed for the owned generator, `0` draws one from system entropy
    ///
    /// # Returns
    /// * `Self` - An engine with the default `MutationConfig`
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RngHandle::Owned(Box::new(SeededRng::new(seed))),
            config: MutationConfig::default(),
            constraint_checker: None,
        }
    }
}

impl<'a> MutationEngine<'a> {
    /// Creates an engine drawing from a caller-owned generator, so the caller and the engine
    /// share one draw stream.
    pub fn with_rng(rng: &'a mut SeededRng) -> Self {
        Self {
            rng: RngHandle::Borrowed(rng),
            config: MutationConfig::default(),
            constraint_checker: None,
        }
    }

    /// Replaces the config after validating it. An invalid config leaves the engine unchanged.
    pub fn set_config(&mut self, config: MutationConfig) -> Result<(), MutationError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// The generator behind this engine.
    pub fn rng(&mut self) -> &mut SeededRng {
        self.rng.get()
    }

    pub fn set_constraint_checker(&mut self, checker: impl Fn(&Sequence) -> bool + 'a) {
        self.constraint_checker = Some(Box::new(checker));
    }

    pub fn clear_constraint_checker(&mut self) {
        self.constraint_checker = None;
    }

    /// Applies one random mutation drawn from the configured rates.
    ///
    /// An empty sequence is returned unchanged with no mutations and `constraint_satisfied`.
    pub fn apply_random_mutation(&mut self, seq: &Sequence) -> MutationResult {
        if seq.is_empty() {
            debug!("Skipping mutation of empty sequence '{}'", seq.id());
            return MutationResult::new(seq.clone(), Vec::new(), true);
        }
        let mutation = self.generate_random_mutation(seq);
        let mutated = seq.with_data(splice(seq.as_bytes(), &mutation));
        self.finish(seq, mutated, vec![mutation])
    }

    /// Applies `n` compounding random mutations, each drawn against the previous result.
    /// Stops early if the sequence becomes empty; constraints are checked on the final sequence.
    pub fn apply_n_mutations(&mut self, seq: &Sequence, n: usize) -> MutationResult {
        let mut current = seq.clone();
        let mut mutations = Vec::with_capacity(n);
        for _ in 0..n {
            if current.is_empty() {
                break;
            }
            let mutation = self.generate_random_mutation(&current);
            current = current.with_data(splice(current.as_bytes(), &mutation));
            mutations.push(mutation);
        }
        self.finish(seq, current, mutations)
    }

    pub fn apply_substitution(&mut self, seq: &Sequence, pos: Position, new_base: char) -> MutationResult {
        let Some(old) = seq.at(pos) else {
            return MutationResult::failed(seq, out_of_range(pos, 1, seq.len()));
        };
        if !new_base.is_ascii() {
            return MutationResult::failed(seq, format!("Symbol '{}' is not a sequence symbol", new_base));
        }
        let mutation = Mutation::substitution(pos, old, new_base.to_ascii_uppercase() as u8);
        self.apply_checked(seq, mutation)
    }

    pub fn apply_insertion(&mut self, seq: &Sequence, pos: Position, insert: &str) -> MutationResult {
        if pos > seq.len() {
            return MutationResult::failed(seq, out_of_range(pos, insert.len(), seq.len()));
        }
        if insert.is_empty() || !insert.is_ascii() {
            return MutationResult::failed(seq, "Insertion content must be non-empty sequence symbols");
        }
        let mutation = Mutation::new(
            MutationType::Insertion,
            pos,
            "",
            insert.to_ascii_uppercase(),
            insert.len(),
        );
        self.apply_checked(seq, mutation)
    }

    pub fn apply_deletion(&mut self, seq: &Sequence, pos: Position, length: usize) -> MutationResult {
        self.apply_region(seq, MutationType::Deletion, pos, length)
    }

    pub fn apply_inversion(&mut self, seq: &Sequence, pos: Position, length: usize) -> MutationResult {
        self.apply_region(seq, MutationType::Inversion, pos, length)
    }

    pub fn apply_duplication(&mut self, seq: &Sequence, pos: Position, length: usize) -> MutationResult {
        self.apply_region(seq, MutationType::Duplication, pos, length)
    }

    /// Moves `seq[pos..pos + length]` so it starts at `destination` in the remaining sequence.
    pub fn apply_translocation(
        &mut self,
        seq: &Sequence,
        pos: Position,
        length: usize,
        destination: Position,
    ) -> MutationResult {
        if !region_fits(seq, pos, length) {
            return MutationResult::failed(seq, out_of_range(pos, length, seq.len()));
        }
        if destination > seq.len() - length || destination == pos {
            return MutationResult::failed(
                seq,
                format!("Translocation destination {} is invalid", destination),
            );
        }
        let mut mutation = region_mutation(seq, MutationType::Translocation, pos, length);
        mutation.destination = Some(destination);
        self.apply_checked(seq, mutation)
    }

    /// Rejection-samples single mutations of `seq` until one satisfies `constraints`.
    ///
    /// Every attempt starts again from `seq`; attempts do not compound.
    ///
    /// # Arguments
    /// * `seq` - The starting sequence
    /// * `constraints` - Constraints the mutant has to satisfy
    /// * `max_attempts` - Upper bound on draws
    ///
    /// # Returns
    /// * `MutationResult` - The first accepted mutant, or a failed result holding `seq`
    pub fn mutate_until_constraint(
        &mut self,
        seq: &Sequence,
        constraints: &ConstraintEngine,
        max_attempts: usize,
    ) -> MutationResult {
        for attempt in 0..max_attempts {
            let result = self.apply_random_mutation(seq);
            if result.constraint_satisfied && constraints.satisfies_all(&result.mutated_sequence) {
                debug!("Found valid mutation after {} attempt(s)", attempt + 1);
                return result;
            }
        }
        warn!(
            "No valid mutation of '{}' within {} attempts",
            seq.id(),
            max_attempts
        );
        MutationResult::failed(seq, "Could not find valid mutation within max attempts")
    }

    /// Builds `population_size` independent mutants of the same ancestor.
    pub fn generate_mutant_population(
        &mut self,
        seq: &Sequence,
        population_size: usize,
        mutations_per_individual: usize,
    ) -> Vec<MutationResult> {
        (0..population_size)
            .map(|_| self.apply_n_mutations(seq, mutations_per_individual))
            .collect()
    }

    /// Single-substitution scan over every position.
    ///
    /// With `all_possible_substitutions` every alternative symbol is tried at every position,
    /// otherwise one random alternative per position.
    pub fn mutational_scanning(&mut self, seq: &Sequence, all_possible_substitutions: bool) -> Vec<MutationResult> {
        let symbols = Alphabet::standard_symbols(seq.seq_type());
        let mut results = Vec::new();
        for (pos, &current) in seq.as_bytes().iter().enumerate() {
            if all_possible_substitutions {
                for base in symbols.chars().filter(|&b| b as u8 != current) {
                    results.push(self.apply_substitution(seq, pos, base));
                }
            } else {
                let base = self.random_base(seq.seq_type(), current);
                results.push(self.apply_substitution(seq, pos, base as char));
            }
        }
        results
    }

    fn apply_region(
        &mut self,
        seq: &Sequence,
        mutation_type: MutationType,
        pos: Position,
        length: usize,
    ) -> MutationResult {
        if !region_fits(seq, pos, length) {
            return MutationResult::failed(seq, out_of_range(pos, length, seq.len()));
        }
        let mutation = region_mutation(seq, mutation_type, pos, length);
        self.apply_checked(seq, mutation)
    }

    fn apply_checked(&mut self, seq: &Sequence, mutation: Mutation) -> MutationResult {
        let mutated = seq.with_data(splice(seq.as_bytes(), &mutation));
        self.finish(seq, mutated, vec![mutation])
    }

    /// Runs the constraint hook and the stop-codon guard on a finished edit.
    fn finish(&self, before: &Sequence, after: Sequence, mutations: Vec<Mutation>) -> MutationResult {
        if self.config.avoid_stop_codons && introduces_premature_stop(before, &after) {
            let mut result = MutationResult::new(after, mutations, false);
            result.failure_reason = Some("Mutation introduced a premature stop codon".to_string());
            return result;
        }
        let satisfied = self
            .constraint_checker
            .as_ref()
            .map_or(true, |check| check(&after));
        MutationResult::new(after, mutations, satisfied)
    }

    fn generate_random_mutation(&mut self, seq: &Sequence) -> Mutation {
        let mutation_type = self.select_mutation_type();
        let pos = self.random_position(seq);
        match mutation_type {
            MutationType::Substitution => self.generate_substitution(seq, pos),
            MutationType::Insertion => self.generate_insertion(seq, pos),
            MutationType::Deletion => {
                let length = self.pick_length(self.config.max_deletion_length, seq.len() - pos);
                region_mutation(seq, MutationType::Deletion, pos, length)
            }
            MutationType::Inversion => {
                let length = self.pick_length(self.config.max_inversion_length, seq.len() - pos);
                region_mutation(seq, MutationType::Inversion, pos, length)
            }
            MutationType::Duplication => {
                let length = self.pick_length(self.config.max_duplication_length, seq.len() - pos);
                region_mutation(seq, MutationType::Duplication, pos, length)
            }
            MutationType::Translocation => self.generate_translocation(seq, pos),
        }
    }

    /// First cumulative bucket holding a uniform draw wins; a gap left by rounding falls back
    /// to substitution.
    fn select_mutation_type(&mut self) -> MutationType {
        let r = self.rng.get().random_double();
        let mut cumulative = 0.0;
        for (mutation_type, rate) in self.config.rates() {
            cumulative += rate;
            if r < cumulative {
                return mutation_type;
            }
        }
        MutationType::Substitution
    }

    fn random_position(&mut self, seq: &Sequence) -> Position {
        let len = seq.len();
        if self.config.avoid_start_codon && len > CODON_LENGTH {
            CODON_LENGTH + self.rng.get().below(len - CODON_LENGTH)
        } else {
            self.rng.get().below(len)
        }
    }

    /// Edit size in `[1, max_len]`, clamped to `available`. Under `maintain_reading_frame` the
    /// size is a whole number of codons unless fewer than three symbols are available.
    fn pick_length(&mut self, max_len: usize, available: usize) -> usize {
        let cap = max_len.min(available).max(1);
        if self.config.maintain_reading_frame {
            let codons = cap / CODON_LENGTH;
            if codons == 0 {
                return cap;
            }
            CODON_LENGTH * (self.rng.get().below(codons) + 1)
        } else {
            1 + self.rng.get().below(cap)
        }
    }

    fn generate_substitution(&mut self, seq: &Sequence, pos: Position) -> Mutation {
        if self.config.codon_aware && self.config.synonymous_only && seq.seq_type().is_nucleotide() {
            if let Some(mutation) = self.synonymous_substitution(seq, pos) {
                return mutation;
            }
            // No synonymous change exists at this site: change the codon's first base instead
            let codon_start = pos - pos % CODON_LENGTH;
            let old = seq.as_bytes()[codon_start];
            let new = self.random_base(seq.seq_type(), old);
            return Mutation::substitution(codon_start, old, new);
        }
        let old = seq.as_bytes()[pos];
        let new = self.random_base(seq.seq_type(), old);
        Mutation::substitution(pos, old, new)
    }

    /// A base change at `pos` that keeps the enclosing codon's amino acid, if one exists.
    fn synonymous_substitution(&mut self, seq: &Sequence, pos: Position) -> Option<Mutation> {
        let codon_start = pos - pos % CODON_LENGTH;
        let offset = pos - codon_start;
        let codon = seq.data().get(codon_start..codon_start + CODON_LENGTH)?;
        let dna_codon = codon.replace('U', "T");
        let rna = seq.seq_type() == SequenceType::Rna;

        let candidates: Vec<u8> = Alphabet::synonymous_codons(&dna_codon)
            .into_iter()
            .filter(|syn| {
                syn.bytes()
                    .zip(dna_codon.bytes())
                    .enumerate()
                    .all(|(i, (a, b))| i == offset || a == b)
            })
            .map(|syn| match syn.as_bytes()[offset] {
                b'T' if rna => b'U',
                base => base,
            })
            .collect();

        let new = *self.rng.get().choose(&candidates)?;
        Some(Mutation::substitution(pos, seq.as_bytes()[pos], new))
    }

    fn generate_insertion(&mut self, seq: &Sequence, pos: Position) -> Mutation {
        let length = self.pick_length(self.config.max_insertion_length, usize::MAX);
        let inserted: String = (0..length)
            .map(|_| self.random_base(seq.seq_type(), 0) as char)
            .collect();
        Mutation::new(MutationType::Insertion, pos, "", inserted, length)
    }

    fn generate_translocation(&mut self, seq: &Sequence, pos: Position) -> Mutation {
        let len = seq.len();
        if len < 2 {
            return self.generate_substitution(seq, pos);
        }
        // Leave at least one symbol behind so there is somewhere else to go
        let available = (len - pos).min(len - 1);
        let length = self.pick_length(self.config.max_translocation_length, available);
        let remaining = len - length;
        // Destinations span [floor, remaining] minus `pos`; the floor keeps the start codon in place
        let floor = if self.config.avoid_start_codon && len > CODON_LENGTH {
            CODON_LENGTH
        } else {
            0
        };
        if remaining <= floor {
            return self.generate_substitution(seq, pos);
        }
        let mut destination = floor + self.rng.get().below(remaining - floor);
        if destination >= pos {
            destination += 1;
        }
        let mut mutation = region_mutation(seq, MutationType::Translocation, pos, length);
        mutation.destination = Some(destination);
        mutation
    }

    /// Random standard symbol for the sequence type, different from `exclude`.
    fn random_base(&mut self, seq_type: SequenceType, exclude: u8) -> u8 {
        let symbols: Vec<u8> = Alphabet::standard_symbols(seq_type)
            .bytes()
            .filter(|&b| b != exclude.to_ascii_uppercase())
            .collect();
        symbols[self.rng.get().below(symbols.len())]
    }
}

fn region_fits(seq: &Sequence, pos: Position, length: usize) -> bool {
    length > 0 && pos < seq.len() && length <= seq.len() - pos
}

fn out_of_range(pos: Position, length: usize, sequence_length: usize) -> String {
    MutationError::OutOfRange {
        position: pos,
        length,
        sequence_length,
    }
    .to_string()
}

/// A region edit over `seq[pos..pos + length]`, with the recorded content filled in.
fn region_mutation(seq: &Sequence, mutation_type: MutationType, pos: Position, length: usize) -> Mutation {
    let region = &seq.data()[pos..pos + length];
    match mutation_type {
        MutationType::Deletion => Mutation::new(mutation_type, pos, region, "", length),
        MutationType::Inversion => {
            let reversed: String = region.chars().rev().collect();
            Mutation::new(mutation_type, pos, region, reversed, length)
        }
        _ => Mutation::new(mutation_type, pos, region, region, length),
    }
}

/// Builds the edited data. Ranges are clamped, so a mutation that does not fit degrades
/// instead of panicking.
fn splice(data: &[u8], mutation: &Mutation) -> String {
    let len = data.len();
    let start = mutation.position.min(len);
    let end = mutation.position.saturating_add(mutation.length).min(len);
    let mut out = Vec::with_capacity(len + mutation.mutated.len());

    match mutation.mutation_type {
        MutationType::Substitution => {
            out.extend_from_slice(data);
            if let (Some(slot), Some(&new)) = (out.get_mut(start), mutation.mutated.as_bytes().first()) {
                *slot = new;
            }
        }
        MutationType::Insertion => {
            out.extend_from_slice(&data[..start]);
            out.extend_from_slice(mutation.mutated.as_bytes());
            out.extend_from_slice(&data[start..]);
        }
        MutationType::Deletion => {
            out.extend_from_slice(&data[..start]);
            out.extend_from_slice(&data[end..]);
        }
        MutationType::Inversion => {
            out.extend_from_slice(&data[..start]);
            out.extend(data[start..end].iter().rev());
            out.extend_from_slice(&data[end..]);
        }
        MutationType::Duplication => {
            out.extend_from_slice(&data[..end]);
            out.extend_from_slice(&data[start..end]);
            out.extend_from_slice(&data[end..]);
        }
        MutationType::Translocation => {
            let mut rest = Vec::with_capacity(len);
            rest.extend_from_slice(&data[..start]);
            rest.extend_from_slice(&data[end..]);
            let destination = mutation.destination.unwrap_or(start).min(rest.len());
            out.extend_from_slice(&rest[..destination]);
            out.extend_from_slice(&data[start..end]);
            out.extend_from_slice(&rest[destination..]);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Applies a recorded mutation to `seq`.
///
/// # Returns
/// * `Result<Sequence, MutationError>` - `OutOfRange` if the mutation does not fit `seq`
pub fn apply_mutation(seq: &Sequence, mutation: &Mutation) -> Result<Sequence, MutationError> {
    let fits = match mutation.mutation_type {
        MutationType::Insertion => mutation.position <= seq.len(),
        MutationType::Translocation => {
            region_fits(seq, mutation.position, mutation.length)
                && mutation
                    .destination
                    .is_some_and(|d| d <= seq.len() - mutation.length)
        }
        _ => region_fits(seq, mutation.position, mutation.length),
    };
    if !fits {
        return Err(MutationError::OutOfRange {
            position: mutation.position,
            length: mutation.length,
            sequence_length: seq.len(),
        });
    }
    Ok(seq.with_data(splice(seq.as_bytes(), mutation)))
}

/// Whether `after` carries more in-frame premature stops than `before`.
fn introduces_premature_stop(before: &Sequence, after: &Sequence) -> bool {
    if !after.seq_type().is_nucleotide() {
        return false;
    }
    let stops = |seq: &Sequence| {
        seq.translate(0, false)
            .map(|protein| premature_stop_count(protein.data()))
            .unwrap_or(0)
    };
    stops(after) > stops(before)
}

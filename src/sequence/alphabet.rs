use crate::sequence::SequenceType;
use std::collections::HashMap;

pub const DNA_BASES: &str = "ACGT";
pub const RNA_BASES: &str = "ACGU";
pub const AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";
/// IUPAC ambiguity codes shared by DNA and RNA
pub const AMBIGUITY_CODES: &str = "NRYSWKMBDHV";
pub const STOP_SYMBOL: char = '*';
pub const CODON_LENGTH: usize = 3;

/// Standard genetic code, DNA codons to one-letter amino acids (`*` = stop).
#[rustfmt::skip]
const GENETIC_CODE: [(&str, char); 64] = [
    ("TTT", 'F'), ("TTC", 'F'), ("TTA", 'L'), ("TTG", 'L'),
    ("CTT", 'L'), ("CTC", 'L'), ("CTA", 'L'), ("CTG", 'L'),
    ("ATT", 'I'), ("ATC", 'I'), ("ATA", 'I'), ("ATG", 'M'),
    ("GTT", 'V'), ("GTC", 'V'), ("GTA", 'V'), ("GTG", 'V'),
    ("TCT", 'S'), ("TCC", 'S'), ("TCA", 'S'), ("TCG", 'S'),
    ("CCT", 'P'), ("CCC", 'P'), ("CCA", 'P'), ("CCG", 'P'),
    ("ACT", 'T'), ("ACC", 'T'), ("ACA", 'T'), ("ACG", 'T'),
    ("GCT", 'A'), ("GCC", 'A'), ("GCA", 'A'), ("GCG", 'A'),
    ("TAT", 'Y'), ("TAC", 'Y'), ("TAA", '*'), ("TAG", '*'),
    ("CAT", 'H'), ("CAC", 'H'), ("CAA", 'Q'), ("CAG", 'Q'),
    ("AAT", 'N'), ("AAC", 'N'), ("AAA", 'K'), ("AAG", 'K'),
    ("GAT", 'D'), ("GAC", 'D'), ("GAA", 'E'), ("GAG", 'E'),
    ("TGT", 'C'), ("TGC", 'C'), ("TGA", '*'), ("TGG", 'W'),
    ("CGT", 'R'), ("CGC", 'R'), ("CGA", 'R'), ("CGG", 'R'),
    ("AGT", 'S'), ("AGC", 'S'), ("AGA", 'R'), ("AGG", 'R'),
    ("GGT", 'G'), ("GGC", 'G'), ("GGA", 'G'), ("GGG", 'G'),
];

lazy_static::lazy_static! {
    static ref CODON_TABLE: HashMap<&'static str, char> = GENETIC_CODE.iter().copied().collect();
}

/// Read-only alphabet and genetic-code service.
pub struct Alphabet;

impl Alphabet {
    /// The unambiguous symbols a mutation may write for a given sequence type.
    ///
    /// Unknown sequences are treated as DNA.
    pub fn standard_symbols(seq_type: SequenceType) -> &'static str {
        match seq_type {
            SequenceType::Dna | SequenceType::Unknown => DNA_BASES,
            SequenceType::Rna => RNA_BASES,
            SequenceType::Protein => AMINO_ACIDS,
        }
    }

    pub fn is_valid_char(c: char, seq_type: SequenceType, allow_ambiguous: bool) -> bool {
        let c = c.to_ascii_uppercase();
        match seq_type {
            SequenceType::Dna | SequenceType::Rna => {
                Self::standard_symbols(seq_type).contains(c)
                    || (allow_ambiguous && AMBIGUITY_CODES.contains(c))
            }
            SequenceType::Protein => {
                AMINO_ACIDS.contains(c) || c == STOP_SYMBOL || (allow_ambiguous && c == 'X')
            }
            SequenceType::Unknown => false,
        }
    }

    pub fn is_valid_sequence(data: &str, seq_type: SequenceType, allow_ambiguous: bool) -> bool {
        data.chars()
            .all(|c| Self::is_valid_char(c, seq_type, allow_ambiguous))
    }

    /// Guesses the type of raw sequence data: nucleotides first, then protein.
    pub fn detect_type(data: &str) -> SequenceType {
        if data.is_empty() {
            return SequenceType::Unknown;
        }
        let has_u = data.chars().any(|c| c.eq_ignore_ascii_case(&'U'));
        let has_t = data.chars().any(|c| c.eq_ignore_ascii_case(&'T'));
        if !has_u && Self::is_valid_sequence(data, SequenceType::Dna, true) {
            SequenceType::Dna
        } else if !has_t && Self::is_valid_sequence(data, SequenceType::Rna, true) {
            SequenceType::Rna
        } else if Self::is_valid_sequence(data, SequenceType::Protein, true) {
            SequenceType::Protein
        } else {
            SequenceType::Unknown
        }
    }

    pub fn genetic_code() -> &'static HashMap<&'static str, char> {
        &CODON_TABLE
    }

    /// Translates a DNA or RNA codon; unknown codons map to `X`.
    pub fn translate_codon(codon: &str) -> char {
        let dna_codon = codon.to_ascii_uppercase().replace('U', "T");
        CODON_TABLE.get(dna_codon.as_str()).copied().unwrap_or('X')
    }

    /// Codons (in DNA spelling) encoding the same amino acid as `codon`, excluding `codon`.
    pub fn synonymous_codons(codon: &str) -> Vec<&'static str> {
        let dna_codon = codon.to_ascii_uppercase().replace('U', "T");
        let amino_acid = Self::translate_codon(&dna_codon);
        if amino_acid == 'X' {
            return Vec::new();
        }
        GENETIC_CODE
            .iter()
            .filter(|(c, aa)| *aa == amino_acid && *c != dna_codon)
            .map(|(c, _)| *c)
            .collect()
    }

    pub fn is_stop_codon(codon: &str) -> bool {
        Self::translate_codon(codon) == STOP_SYMBOL
    }
}

use crate::error::{Error, Result};

/// A k-mer packed into two bits per nucleotide, most significant nucleotide first.
pub type KmerCode = u32;

/// The largest k-mer length whose codes fit into a [`KmerCode`].
pub const MAX_WORD_LENGTH: usize = 16;

const INVALID_NUCLEOTIDE: u8 = u8::MAX;

/// Maps ASCII characters to 2-bit nucleotide values (A=0, C=1, G=2, T/U=3).
static NUCLEOTIDE_VALUES: [u8; 256] = {
    let mut values = [INVALID_NUCLEOTIDE; 256];
    values[b'A' as usize] = 0;
    values[b'a' as usize] = 0;
    values[b'C' as usize] = 1;
    values[b'c' as usize] = 1;
    values[b'G' as usize] = 2;
    values[b'g' as usize] = 2;
    values[b'T' as usize] = 3;
    values[b't' as usize] = 3;
    values[b'U' as usize] = 3;
    values[b'u' as usize] = 3;
    values
};

#[inline]
fn nucleotide_value(symbol: u8) -> Option<KmerCode> {
    match NUCLEOTIDE_VALUES[symbol as usize] {
        INVALID_NUCLEOTIDE => None,
        value => Some(KmerCode::from(value)),
    }
}

/// Converts nucleotide sequences into k-mer codes with a rolling window.
///
/// Windows that contain a character outside of `ACGTU` (case-insensitive) are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerEncoder {
    word_length: usize,
    kmer_count: usize,
    top_multiplier: KmerCode,
}

impl KmerEncoder {
    pub fn new(word_length: usize) -> Result<Self> {
        if word_length == 0 || word_length > MAX_WORD_LENGTH {
            return Err(Error::UnsupportedWordLength(word_length));
        }

        Ok(Self {
            word_length,
            kmer_count: 1 << (2 * word_length),
            top_multiplier: 1 << (2 * (word_length - 1)),
        })
    }

    pub fn word_length(&self) -> usize {
        self.word_length
    }

    /// The number of distinct k-mer codes, i.e. `4^k`.
    pub fn kmer_count(&self) -> usize {
        self.kmer_count
    }

    /// The weight of the most significant nucleotide in a code, i.e. `4^(k-1)`.
    pub fn top_multiplier(&self) -> KmerCode {
        self.top_multiplier
    }

    /// Returns the code of every valid window of the observed strand, in sequence order.
    ///
    /// The number of valid windows is the length of the returned vector.
    pub fn extract_forward(&self, sequence: &[u8]) -> Vec<KmerCode> {
        let mut kmers = Vec::with_capacity(self.window_count(sequence));
        self.for_each_valid_window(sequence, |forward, _| kmers.push(forward));
        kmers
    }

    /// Returns the code of every valid window followed by the code of its reverse complement.
    ///
    /// Both strands are counted, so the returned vector has two entries per valid window.
    pub fn extract_with_reverse_complement(&self, sequence: &[u8]) -> Vec<KmerCode> {
        let mut kmers = Vec::with_capacity(2 * self.window_count(sequence));
        self.for_each_valid_window(sequence, |forward, reverse_complement| {
            kmers.push(forward);
            kmers.push(reverse_complement);
        });
        kmers
    }

    fn window_count(&self, sequence: &[u8]) -> usize {
        (sequence.len() + 1).saturating_sub(self.word_length)
    }

    fn for_each_valid_window(
        &self,
        sequence: &[u8],
        mut emit: impl FnMut(KmerCode, KmerCode),
    ) {
        if sequence.len() < self.word_length {
            return;
        }

        let mut forward: KmerCode = 0;
        let mut reverse_complement: KmerCode = 0;
        // Number of upcoming windows that still contain an invalid character.
        let mut poisoned_windows = 0;

        for (position, &symbol) in sequence.iter().enumerate() {
            if position >= self.word_length {
                let outgoing = nucleotide_value(sequence[position - self.word_length]).unwrap_or(0);
                forward -= self.top_multiplier * outgoing;
            }

            // Invalid characters enter the code as zero and are masked by the poison counter.
            let incoming = nucleotide_value(symbol);
            if incoming.is_none() {
                poisoned_windows = self.word_length;
            }
            let value = incoming.unwrap_or(0);
            let complement = incoming.map(|value| 3 - value).unwrap_or(0);

            forward = (forward << 2) + value;
            reverse_complement = (reverse_complement >> 2) + self.top_multiplier * complement;

            if poisoned_windows > 0 {
                poisoned_windows -= 1;
            } else if position + 1 >= self.word_length {
                emit(forward, reverse_complement);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{seq::SliceRandom, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::{KmerCode, KmerEncoder, MAX_WORD_LENGTH};
    use crate::error::Error;

    fn encode_window(window: &[u8]) -> Option<KmerCode> {
        window.iter().try_fold(0, |code, &symbol| {
            let value = match symbol.to_ascii_uppercase() {
                b'A' => 0,
                b'C' => 1,
                b'G' => 2,
                b'T' | b'U' => 3,
                _ => return None,
            };
            Some((code << 2) | value)
        })
    }

    fn reverse_complement(window: &[u8]) -> Vec<u8> {
        window
            .iter()
            .rev()
            .map(|symbol| match symbol.to_ascii_uppercase() {
                b'A' => b'T',
                b'C' => b'G',
                b'G' => b'C',
                b'T' | b'U' => b'A',
                other => other,
            })
            .collect()
    }

    #[test]
    fn test_rejects_unsupported_word_lengths() {
        assert!(matches!(
            KmerEncoder::new(0),
            Err(Error::UnsupportedWordLength(0))
        ));
        assert!(matches!(
            KmerEncoder::new(MAX_WORD_LENGTH + 1),
            Err(Error::UnsupportedWordLength(_))
        ));
        assert!(KmerEncoder::new(MAX_WORD_LENGTH).is_ok());
    }

    #[test]
    fn test_code_space() {
        let encoder = KmerEncoder::new(4).unwrap();
        assert_eq!(encoder.kmer_count(), 256);
        assert_eq!(encoder.top_multiplier(), 64);

        let encoder = KmerEncoder::new(1).unwrap();
        assert_eq!(encoder.kmer_count(), 4);
        assert_eq!(encoder.top_multiplier(), 1);
    }

    #[test]
    fn test_valid_window_count() {
        let sequence = b"ACGTTGCAACGGTACU";
        for k in 1..=sequence.len() {
            let encoder = KmerEncoder::new(k).unwrap();
            assert_eq!(
                encoder.extract_forward(sequence).len(),
                sequence.len() - k + 1
            );
            assert_eq!(
                encoder.extract_with_reverse_complement(sequence).len(),
                2 * (sequence.len() - k + 1)
            );
        }
    }

    #[test]
    fn test_short_sequence_has_no_kmers() {
        let encoder = KmerEncoder::new(5).unwrap();
        assert!(encoder.extract_forward(b"ACGT").is_empty());
        assert!(encoder.extract_with_reverse_complement(b"").is_empty());
    }

    #[test]
    fn test_invalid_sequence_has_no_kmers() {
        for k in 1..=8 {
            let encoder = KmerEncoder::new(k).unwrap();
            assert!(encoder.extract_forward(b"NNNNNNNNNNNNRYKM--").is_empty());
            assert!(encoder
                .extract_with_reverse_complement(b"NNNNNNNNNNNN")
                .is_empty());
        }
    }

    #[test]
    fn test_invalid_character_poisons_k_windows() {
        let encoder = KmerEncoder::new(3).unwrap();
        // Windows: ACG, CGN, GNT, NTA, TAC, ACG
        let kmers = encoder.extract_forward(b"ACGNTACG");
        assert_eq!(
            kmers,
            vec![
                encode_window(b"ACG").unwrap(),
                encode_window(b"TAC").unwrap(),
                encode_window(b"ACG").unwrap(),
            ]
        );

        let kmers = encoder.extract_forward(b"NACGT");
        assert_eq!(
            kmers,
            vec![encode_window(b"ACG").unwrap(), encode_window(b"CGT").unwrap()]
        );

        let kmers = encoder.extract_forward(b"ACGTN");
        assert_eq!(
            kmers,
            vec![encode_window(b"ACG").unwrap(), encode_window(b"CGT").unwrap()]
        );
    }

    #[test]
    fn test_case_insensitive_and_uracil() {
        let encoder = KmerEncoder::new(4).unwrap();
        assert_eq!(
            encoder.extract_forward(b"acgu"),
            encoder.extract_forward(b"ACGT")
        );
    }

    #[test]
    fn test_self_complementary_kmer() {
        let encoder = KmerEncoder::new(4).unwrap();
        let kmers = encoder.extract_with_reverse_complement(b"ACGT");
        assert_eq!(kmers, vec![0b00_01_10_11, 0b00_01_10_11]);
    }

    #[test]
    fn test_reverse_complement_pairs() {
        let encoder = KmerEncoder::new(3).unwrap();
        let kmers = encoder.extract_with_reverse_complement(b"AACGTT");
        assert_eq!(kmers.len(), 8);
        for (window, pair) in b"AACGTT".windows(3).zip(kmers.chunks(2)) {
            assert_eq!(pair[0], encode_window(window).unwrap());
            assert_eq!(pair[1], encode_window(&reverse_complement(window)).unwrap());
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = KmerEncoder::new(6).unwrap();
        let sequence = b"GATTACAGATTACANNGATTACA";
        assert_eq!(
            encoder.extract_forward(sequence),
            encoder.extract_forward(sequence)
        );
        assert_eq!(
            encoder.extract_with_reverse_complement(sequence),
            encoder.extract_with_reverse_complement(sequence)
        );
    }

    #[test]
    fn test_rolling_matches_window_encoding() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let alphabet = b"ACGTacgtuNn-";

        for k in [1, 2, 3, 5, 8, 11, MAX_WORD_LENGTH] {
            let encoder = KmerEncoder::new(k).unwrap();
            for _ in 0..20 {
                let sequence: Vec<u8> = (0..200)
                    .map(|_| *alphabet.choose(&mut rng).unwrap())
                    .collect();

                let expected_forward: Vec<_> =
                    sequence.windows(k).filter_map(encode_window).collect();
                let expected_both: Vec<_> = sequence
                    .windows(k)
                    .filter_map(|window| {
                        Some([
                            encode_window(window)?,
                            encode_window(&reverse_complement(window))?,
                        ])
                    })
                    .flatten()
                    .collect();

                assert_eq!(encoder.extract_forward(&sequence), expected_forward);
                assert_eq!(
                    encoder.extract_with_reverse_complement(&sequence),
                    expected_both
                );
            }
        }
    }
}

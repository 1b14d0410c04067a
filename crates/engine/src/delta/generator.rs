//! The scanning matcher that turns a file and a signature into tokens.

use std::io;

use checksums::{RollingChecksum, STRONG_SUM_LEN, block_digest};
use signature::{Block, FileSignature};

use crate::delta::index::SignatureIndex;

/// Consumer of the matcher's output stream.
///
/// The wire implementation forwards straight to the token codec; tests use
/// [`ScriptSink`](crate::ScriptSink) to collect an inspectable script.
pub trait TokenSink {
    /// Receives a run of literal bytes.
    fn literal(&mut self, data: &[u8]) -> io::Result<()>;

    /// Receives a reference to a matched basis block.
    fn copy(&mut self, block: &Block) -> io::Result<()>;
}

/// Byte accounting for one matched file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MatchStats {
    /// Bytes emitted as literal data.
    pub literal_bytes: u64,
    /// Bytes covered by copy tokens.
    pub matched_bytes: u64,
}

/// Matches a sender-side file against a received signature.
///
/// The matcher owns the per-file hash table; both are discarded after one
/// file. Scanning state lives on the stack of [`match_file`](Self::match_file),
/// which makes the matcher trivially reusable across invocations in tests.
#[derive(Debug)]
pub struct DeltaMatcher<'a> {
    signature: &'a FileSignature,
    index: SignatureIndex,
    seed: i32,
    prefix_len: usize,
}

impl<'a> DeltaMatcher<'a> {
    /// Builds the hash table for `signature` under the session `seed`.
    #[must_use]
    pub fn new(signature: &'a FileSignature, seed: i32) -> Self {
        Self {
            signature,
            index: SignatureIndex::build(signature),
            seed,
            prefix_len: signature.head().checksum_length as usize,
        }
    }

    /// Scans `data` and emits copy tokens and literal runs into `sink`.
    ///
    /// The caller is responsible for the end-of-file marker and the
    /// whole-file digest that follow the token stream on the wire.
    pub fn match_file<S: TokenSink>(&self, data: &[u8], sink: &mut S) -> io::Result<MatchStats> {
        let mut stats = MatchStats::default();

        let block_len = self.signature.head().block_length as usize;
        if self.signature.blocks().is_empty() || data.is_empty() || block_len == 0 {
            // No basis to copy from: the whole file travels as literal data.
            if !data.is_empty() {
                sink.literal(data)?;
                stats.literal_bytes = data.len() as u64;
            }
            return Ok(stats);
        }

        let len = data.len();
        let mut pos = 0usize;
        let mut literal_start = 0usize;
        // Block expected to match next, exploiting locality of edits.
        let mut hint: u32 = 0;

        let mut window_len = block_len.min(len);
        let mut rolling = RollingChecksum::of(&data[..window_len]);

        loop {
            let window = &data[pos..pos + window_len];
            if let Some(block) = self.find_match(rolling.value(), window, hint) {
                if literal_start < pos {
                    let run = &data[literal_start..pos];
                    sink.literal(run)?;
                    stats.literal_bytes += run.len() as u64;
                }
                sink.copy(block)?;
                stats.matched_bytes += u64::from(block.len());

                pos += block.len() as usize;
                literal_start = pos;
                hint = block.index() + 1;

                if pos >= len {
                    break;
                }
                // The jump invalidates the incremental state; rehash the new
                // window from scratch.
                window_len = block_len.min(len - pos);
                rolling = RollingChecksum::of(&data[pos..pos + window_len]);
                continue;
            }

            // Slide one byte: the window either moves or, at end of file,
            // shrinks from the front so the trailing remainder block can
            // still match.
            let outgoing = data[pos];
            if pos + window_len < len {
                rolling
                    .roll(outgoing, data[pos + window_len])
                    .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
            } else {
                rolling
                    .roll_out(outgoing)
                    .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
                window_len -= 1;
            }
            pos += 1;

            if window_len == 0 {
                break;
            }
        }

        if literal_start < len {
            let run = &data[literal_start..];
            sink.literal(run)?;
            stats.literal_bytes += run.len() as u64;
        }

        Ok(stats)
    }

    /// Finds a block whose weak and strong checksums both agree with `window`.
    ///
    /// The hint block is probed before the hash table. The strong digest is
    /// computed at most once per position, and only after a weak hit with a
    /// matching length. The first confirmed candidate wins; an exact
    /// collision at this checksum strength is treated as a genuine match.
    fn find_match(&self, weak: u32, window: &[u8], hint: u32) -> Option<&Block> {
        let mut strong: Option<[u8; STRONG_SUM_LEN]> = None;

        if let Some(block) = self.signature.block(hint)
            && block.len() as usize == window.len()
            && block.weak() == weak
        {
            let digest = *strong.get_or_insert_with(|| block_digest(window, self.seed));
            if block.strong_matches(&digest, self.prefix_len) {
                return Some(block);
            }
        }

        for &candidate in self.index.candidates(weak) {
            if candidate == hint {
                continue;
            }
            let block = self.signature.block(candidate)?;
            if block.len() as usize != window.len() {
                continue;
            }
            let digest = *strong.get_or_insert_with(|| block_digest(window, self.seed));
            if block.strong_matches(&digest, self.prefix_len) {
                return Some(block);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::delta::script::{DeltaToken, ScriptSink, apply_script};

    fn script_for(basis: &[u8], target: &[u8], seed: i32) -> crate::DeltaScript {
        let signature = FileSignature::generate(basis, seed, 16).unwrap();
        let matcher = DeltaMatcher::new(&signature, seed);
        let mut sink = ScriptSink::new();
        matcher.match_file(target, &mut sink).unwrap();
        sink.into_script()
    }

    #[test]
    fn identical_files_produce_only_copy_tokens() {
        let data: Vec<u8> = (0u32..3000).map(|v| (v * 7 % 256) as u8).collect();
        let script = script_for(&data, &data, 11);

        assert!(script.tokens().iter().all(|t| matches!(t, DeltaToken::Copy { .. })));
        assert_eq!(script.tokens().len(), 5); // ceil(3000 / 700)
        assert_eq!(apply_script(&data, &script).unwrap(), data);
    }

    #[test]
    fn empty_basis_produces_single_literal() {
        let target = b"entirely new content".to_vec();
        let script = script_for(b"", &target, 0);

        assert_eq!(script.tokens().len(), 1);
        assert!(matches!(&script.tokens()[0], DeltaToken::Literal(bytes) if *bytes == target));
    }

    #[test]
    fn appended_tail_becomes_trailing_literal() {
        // The concrete wire scenario: 1400 x 'a' basis, 50 x 'b' appended.
        let basis = vec![b'a'; 1400];
        let mut target = basis.clone();
        target.extend(std::iter::repeat_n(b'b', 50));

        let script = script_for(&basis, &target, 42);
        let tokens = script.tokens();

        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[0], DeltaToken::Copy { len: 700, .. }));
        assert!(matches!(tokens[1], DeltaToken::Copy { len: 700, .. }));
        assert!(matches!(&tokens[2], DeltaToken::Literal(bytes) if bytes.len() == 50));
        assert_eq!(apply_script(&basis, &script).unwrap(), target);
    }

    #[test]
    fn prepended_byte_still_matches_every_block() {
        // Exercises the hash-table fallback: the hint path misses at every
        // position because all block starts shift by one.
        let basis: Vec<u8> = (0u32..4200).map(|v| (v * 13 % 251) as u8).collect();
        let mut target = vec![0xEE];
        target.extend_from_slice(&basis);

        let script = script_for(&basis, &target, 3);
        let copies = script
            .tokens()
            .iter()
            .filter(|t| matches!(t, DeltaToken::Copy { .. }))
            .count();

        assert_eq!(copies, 6); // every original block reused
        assert_eq!(script.literal_bytes(), 1);
        assert_eq!(apply_script(&basis, &script).unwrap(), target);
    }

    #[test]
    fn trailing_remainder_block_matches_at_eof() {
        let basis: Vec<u8> = (0u32..1450).map(|v| (v % 241) as u8).collect();
        let script = script_for(&basis, &basis, 8);

        assert_eq!(script.tokens().len(), 3);
        assert!(matches!(script.tokens()[2], DeltaToken::Copy { len: 50, .. }));
        assert_eq!(script.literal_bytes(), 0);
    }

    #[test]
    fn edit_in_the_middle_keeps_surrounding_blocks() {
        let basis: Vec<u8> = (0u32..7000).map(|v| (v * 31 % 256) as u8).collect();
        let mut target = basis.clone();
        // Overwrite bytes inside the middle block only.
        for byte in &mut target[2900..2950] {
            *byte = 0;
        }

        let script = script_for(&basis, &target, 5);
        assert_eq!(apply_script(&basis, &script).unwrap(), target);
        // Only one block's worth of data plus change should travel literally.
        assert!(script.literal_bytes() <= 1400);
        assert!(script.matched_bytes() >= 5600);
    }

    proptest! {
        #[test]
        fn arbitrary_pairs_reconstruct_exactly(
            basis in prop::collection::vec(any::<u8>(), 0..4096),
            target in prop::collection::vec(any::<u8>(), 0..4096),
            seed in any::<i32>(),
        ) {
            let script = script_for(&basis, &target, seed);
            prop_assert_eq!(
                script.literal_bytes() + script.matched_bytes(),
                target.len() as u64
            );
            prop_assert_eq!(apply_script(&basis, &script).unwrap(), target);
        }

        #[test]
        fn spliced_edits_reconstruct_exactly(
            basis in prop::collection::vec(any::<u8>(), 1400..4200),
            insert in prop::collection::vec(any::<u8>(), 0..64),
            at in any::<prop::sample::Index>(),
        ) {
            let at = at.index(basis.len());
            let mut target = basis[..at].to_vec();
            target.extend_from_slice(&insert);
            target.extend_from_slice(&basis[at..]);

            let script = script_for(&basis, &target, 17);
            prop_assert_eq!(apply_script(&basis, &script).unwrap(), target);
        }
    }

    #[test]
    fn stats_partition_the_target_bytes() {
        let basis = vec![9u8; 2100];
        let mut target = basis.clone();
        target.extend_from_slice(b"xyz");

        let signature = FileSignature::generate(&basis, 1, 16).unwrap();
        let matcher = DeltaMatcher::new(&signature, 1);
        let mut sink = ScriptSink::new();
        let stats = matcher.match_file(&target, &mut sink).unwrap();

        assert_eq!(stats.literal_bytes + stats.matched_bytes, target.len() as u64);
    }
}

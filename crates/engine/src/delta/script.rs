//! Collected delta scripts and their replay, used for verification.

use std::io;

use signature::Block;

use crate::delta::generator::TokenSink;

/// One element of a collected delta script.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeltaToken {
    /// Literal bytes to append to the output.
    Literal(Vec<u8>),
    /// Copy of a basis block.
    Copy {
        /// Zero-based basis block index.
        index: u32,
        /// Length of the referenced block in bytes.
        len: u32,
        /// Offset of the referenced block within the basis file.
        offset: u64,
    },
}

/// An in-memory delta: the token sequence plus byte accounting.
///
/// The wire sender streams tokens directly; scripts exist so tests and
/// verification can inspect and replay a delta.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeltaScript {
    tokens: Vec<DeltaToken>,
    literal_bytes: u64,
    matched_bytes: u64,
}

impl DeltaScript {
    /// Returns the token sequence in emission order.
    #[must_use]
    pub fn tokens(&self) -> &[DeltaToken] {
        &self.tokens
    }

    /// Bytes carried by literal tokens.
    #[must_use]
    pub const fn literal_bytes(&self) -> u64 {
        self.literal_bytes
    }

    /// Bytes covered by copy tokens.
    #[must_use]
    pub const fn matched_bytes(&self) -> u64 {
        self.matched_bytes
    }
}

/// A [`TokenSink`] that collects tokens into a [`DeltaScript`].
#[derive(Debug, Default)]
pub struct ScriptSink {
    script: DeltaScript,
}

impl ScriptSink {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the collector and returns the accumulated script.
    #[must_use]
    pub fn into_script(self) -> DeltaScript {
        self.script
    }
}

impl TokenSink for ScriptSink {
    fn literal(&mut self, data: &[u8]) -> io::Result<()> {
        self.script.literal_bytes += data.len() as u64;
        self.script.tokens.push(DeltaToken::Literal(data.to_vec()));
        Ok(())
    }

    fn copy(&mut self, block: &Block) -> io::Result<()> {
        self.script.matched_bytes += u64::from(block.len());
        self.script.tokens.push(DeltaToken::Copy {
            index: block.index(),
            len: block.len(),
            offset: block.offset(),
        });
        Ok(())
    }
}

/// Failures while replaying a script against a basis buffer.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ApplyError {
    /// A copy token references bytes beyond the end of the basis.
    #[error("copy of block {index} ({offset}+{len}) exceeds basis of {basis_len} bytes")]
    CopyBeyondBasis {
        /// Referenced block index.
        index: u32,
        /// Referenced offset in the basis.
        offset: u64,
        /// Referenced length.
        len: u32,
        /// Actual basis length.
        basis_len: usize,
    },
}

/// Replays `script` against `basis`, producing the target payload.
pub fn apply_script(basis: &[u8], script: &DeltaScript) -> Result<Vec<u8>, ApplyError> {
    let mut output =
        Vec::with_capacity((script.literal_bytes() + script.matched_bytes()) as usize);

    for token in script.tokens() {
        match token {
            DeltaToken::Literal(bytes) => output.extend_from_slice(bytes),
            DeltaToken::Copy { index, len, offset } => {
                let start = usize::try_from(*offset).map_err(|_| ApplyError::CopyBeyondBasis {
                    index: *index,
                    offset: *offset,
                    len: *len,
                    basis_len: basis.len(),
                })?;
                let end = start.checked_add(*len as usize).filter(|&end| end <= basis.len());
                let Some(end) = end else {
                    return Err(ApplyError::CopyBeyondBasis {
                        index: *index,
                        offset: *offset,
                        len: *len,
                        basis_len: basis.len(),
                    });
                };
                output.extend_from_slice(&basis[start..end]);
            }
        }
    }

    Ok(output)
}

/// Errors raised while sliding the rolling checksum window.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RollingError {
    /// `roll` was called before any window bytes were accumulated.
    #[error("rolling checksum window is empty")]
    EmptyWindow,
    /// The window length no longer fits the 32-bit arithmetic of the codec.
    #[error("rolling checksum window of {len} bytes exceeds 32-bit limit")]
    WindowTooLarge {
        /// Window length at the time of the failure.
        len: usize,
    },
}

/// The weak rolling checksum used for block matching.
///
/// Two accumulators are maintained over the current window: `s1` is the byte
/// sum and `s2` the sum of running prefix sums, both truncated to 16 bits.
/// The packed value `(s2 << 16) | s1` is what travels on the wire. Sliding
/// the window by one byte is O(1): subtract the outgoing byte from `s1` and
/// `len * outgoing` from `s2`, then add the incoming byte.
///
/// Window bytes enter the sums as unsigned values. Peers built on a signed
/// `char` convention produce different packed values for bytes above 0x7F,
/// so both ends of a transfer must use this convention.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    len: usize,
}

impl RollingChecksum {
    /// Creates a checksum with an empty window.
    #[must_use]
    pub const fn new() -> Self {
        Self { s1: 0, s2: 0, len: 0 }
    }

    /// Computes the checksum of `block` in one shot.
    #[must_use]
    pub fn of(block: &[u8]) -> Self {
        let mut sum = Self::new();
        sum.update(block);
        sum
    }

    /// Clears the window, ready for a fresh block.
    ///
    /// The sender calls this after a match: the window jumps past the matched
    /// block, which invalidates the incremental state.
    pub fn reset(&mut self) {
        self.s1 = 0;
        self.s2 = 0;
        self.len = 0;
    }

    /// Returns the number of bytes in the current window.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no bytes have been accumulated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Extends the window with `chunk`.
    pub fn update(&mut self, chunk: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;
        for &byte in chunk {
            s1 = s1.wrapping_add(u32::from(byte));
            s2 = s2.wrapping_add(s1);
        }
        self.s1 = s1 & 0xffff;
        self.s2 = s2 & 0xffff;
        self.len = self.len.saturating_add(chunk.len());
    }

    /// Slides the window one byte: removes `outgoing`, appends `incoming`.
    ///
    /// # Errors
    ///
    /// [`RollingError::EmptyWindow`] when no window has been accumulated and
    /// [`RollingError::WindowTooLarge`] when the window length exceeds 32 bits.
    pub fn roll(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        let window_len =
            u32::try_from(self.len).map_err(|_| RollingError::WindowTooLarge { len: self.len })?;

        let out = u32::from(outgoing);
        let s1 = self.s1.wrapping_sub(out).wrapping_add(u32::from(incoming)) & 0xffff;
        let s2 = self
            .s2
            .wrapping_sub(window_len.wrapping_mul(out))
            .wrapping_add(s1)
            & 0xffff;

        self.s1 = s1;
        self.s2 = s2;
        Ok(())
    }

    /// Shrinks the window from the front without appending a new byte.
    ///
    /// Used at end of file where the trailing window is shorter than a block.
    ///
    /// # Errors
    ///
    /// Same conditions as [`roll`](Self::roll).
    pub fn roll_out(&mut self, outgoing: u8) -> Result<(), RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        let window_len =
            u32::try_from(self.len).map_err(|_| RollingError::WindowTooLarge { len: self.len })?;

        let out = u32::from(outgoing);
        let s1 = self.s1.wrapping_sub(out) & 0xffff;
        let s2 = self.s2.wrapping_sub(window_len.wrapping_mul(out)) & 0xffff;

        self.s1 = s1;
        self.s2 = s2;
        self.len -= 1;
        Ok(())
    }

    /// Returns the packed 32-bit checksum `(s2 << 16) | s1`.
    #[must_use]
    pub const fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }
}

//! The 4-byte multiplex frame header: `(channel << 24) | length`.

use core::fmt;

/// Number of bytes in a multiplex frame header.
pub const HEADER_LEN: usize = 4;

/// Maximum payload length representable in the 24-bit length field.
pub const MAX_PAYLOAD_LENGTH: u32 = 0x00FF_FFFF;

/// Channel number carrying file data; log channels sit above it.
const DATA_CHANNEL: u8 = 7;

const PAYLOAD_MASK: u32 = 0x00FF_FFFF;

/// Sub-channels of the multiplexed stream.
///
/// Channel 7 carries the actual transfer bytes. The channels above it carry
/// diagnostics that the demux layer prints and discards; their numbering
/// (7 + log code) matches the legacy wire format so peers interoperate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageChannel {
    /// Transfer payload bytes.
    Data,
    /// Fatal per-transfer error text.
    ErrorXfer,
    /// Informational text.
    Info,
    /// Non-fatal error text.
    Error,
    /// Warning text.
    Warning,
    /// Daemon-log text, not shown to interactive users.
    Log,
}

impl MessageChannel {
    /// Returns the raw channel number used on the wire.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Data => DATA_CHANNEL,
            Self::ErrorXfer => DATA_CHANNEL + 1,
            Self::Info => DATA_CHANNEL + 2,
            Self::Error => DATA_CHANNEL + 3,
            Self::Warning => DATA_CHANNEL + 4,
            Self::Log => DATA_CHANNEL + 6,
        }
    }

    /// Decodes a raw channel number.
    ///
    /// Channels above the data channel that this implementation does not
    /// produce itself still carry peer diagnostics and decode as [`Self::Log`]
    /// so their text is printed and discarded rather than killing the stream.
    /// Channels below the data channel have never been assigned and are
    /// rejected.
    pub const fn from_u8(value: u8) -> Result<Self, EnvelopeError> {
        match value {
            7 => Ok(Self::Data),
            8 => Ok(Self::ErrorXfer),
            9 => Ok(Self::Info),
            10 => Ok(Self::Error),
            11 => Ok(Self::Warning),
            13 => Ok(Self::Log),
            0..=6 => Err(EnvelopeError::UnknownChannel(value)),
            _ => Ok(Self::Log),
        }
    }

    /// Maps a log channel to a diagnostic severity; `None` for [`Self::Data`].
    #[must_use]
    pub const fn severity(self) -> Option<logging::Severity> {
        match self {
            Self::Data => None,
            Self::ErrorXfer | Self::Error => Some(logging::Severity::Error),
            Self::Info => Some(logging::Severity::Info),
            Self::Warning => Some(logging::Severity::Warning),
            Self::Log => Some(logging::Severity::Log),
        }
    }
}

/// Failures while parsing or constructing multiplex headers.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum EnvelopeError {
    /// Fewer than [`HEADER_LEN`] bytes were available.
    #[error("multiplex header truncated: expected {HEADER_LEN} bytes, got {actual}")]
    TruncatedHeader {
        /// Bytes available when decoding began.
        actual: usize,
    },
    /// The channel number is below the data channel.
    #[error("unknown multiplex channel {0}")]
    UnknownChannel(u8),
    /// The payload length exceeds the 24-bit field.
    #[error("multiplex payload length {0} exceeds maximum {MAX_PAYLOAD_LENGTH}")]
    OversizedPayload(u32),
}

/// A decoded multiplex frame header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    channel: MessageChannel,
    payload_len: u32,
}

impl MessageHeader {
    /// Creates a header for `channel` carrying `payload_len` bytes.
    pub const fn new(channel: MessageChannel, payload_len: u32) -> Result<Self, EnvelopeError> {
        if payload_len > MAX_PAYLOAD_LENGTH {
            return Err(EnvelopeError::OversizedPayload(payload_len));
        }
        Ok(Self {
            channel,
            payload_len,
        })
    }

    /// Parses a header from the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < HEADER_LEN {
            return Err(EnvelopeError::TruncatedHeader {
                actual: bytes.len(),
            });
        }

        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&bytes[..HEADER_LEN]);
        let tag = u32::from_le_bytes(raw);
        let channel = MessageChannel::from_u8((tag >> 24) as u8)?;
        Self::new(channel, tag & PAYLOAD_MASK)
    }

    /// Encodes the header into its little-endian wire form.
    #[must_use]
    pub const fn encode(self) -> [u8; HEADER_LEN] {
        let tag = ((self.channel.as_u8() as u32) << 24) | (self.payload_len & PAYLOAD_MASK);
        tag.to_le_bytes()
    }

    /// Returns the frame's channel.
    #[must_use]
    pub const fn channel(self) -> MessageChannel {
        self.channel
    }

    /// Returns the payload length carried by the frame.
    #[must_use]
    pub const fn payload_len(self) -> u32 {
        self.payload_len
    }
}

impl fmt::Display for MessageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame channel {} len {}",
            self.channel.as_u8(),
            self.payload_len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CHANNELS: [MessageChannel; 6] = [
        MessageChannel::Data,
        MessageChannel::ErrorXfer,
        MessageChannel::Info,
        MessageChannel::Error,
        MessageChannel::Warning,
        MessageChannel::Log,
    ];

    #[test]
    fn data_channel_is_seven() {
        assert_eq!(MessageChannel::Data.as_u8(), 7);
    }

    #[test]
    fn header_round_trips_for_all_channels() {
        for channel in ALL_CHANNELS {
            for len in [0, 1, MAX_PAYLOAD_LENGTH] {
                let header = MessageHeader::new(channel, len).expect("valid header");
                let decoded = MessageHeader::decode(&header.encode()).expect("decodes");
                assert_eq!(decoded.channel(), channel);
                assert_eq!(decoded.payload_len(), len);
            }
        }
    }

    #[test]
    fn decode_rejects_truncated_input() {
        assert_eq!(
            MessageHeader::decode(&[1, 2]),
            Err(EnvelopeError::TruncatedHeader { actual: 2 })
        );
    }

    #[test]
    fn decode_rejects_channels_below_data() {
        let raw = (6u32 << 24) | 12;
        assert_eq!(
            MessageHeader::decode(&raw.to_le_bytes()),
            Err(EnvelopeError::UnknownChannel(6))
        );
    }

    #[test]
    fn unassigned_high_channels_decode_as_log_traffic() {
        assert_eq!(MessageChannel::from_u8(12), Ok(MessageChannel::Log));
        assert_eq!(MessageChannel::from_u8(14), Ok(MessageChannel::Log));
        assert_eq!(MessageChannel::from_u8(200), Ok(MessageChannel::Log));
    }

    #[test]
    fn new_rejects_oversized_payload() {
        assert_eq!(
            MessageHeader::new(MessageChannel::Data, MAX_PAYLOAD_LENGTH + 1),
            Err(EnvelopeError::OversizedPayload(MAX_PAYLOAD_LENGTH + 1))
        );
    }

    #[test]
    fn log_channels_carry_severities() {
        assert!(MessageChannel::Data.severity().is_none());
        assert_eq!(
            MessageChannel::Warning.severity(),
            Some(logging::Severity::Warning)
        );
        assert_eq!(
            MessageChannel::ErrorXfer.severity(),
            Some(logging::Severity::Error)
        );
    }
}

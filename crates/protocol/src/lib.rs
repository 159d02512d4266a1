//! hushline-protocol – Envelope und Framing
//!
//! Dieses Crate definiert die einzige Draht-Einheit des Protokolls, den
//! [`Envelope`], und den laengenpraefixierten Codec, mit dem Envelopes
//! ueber einen Byte-Stream laufen.

pub mod envelope;
pub mod wire;

pub use envelope::{
    ChatPacket, ChatStatus, Envelope, ExchangeKeyPacket, ExchangeKeyStatus, LoginPacket,
    LoginStatus, Paket, Quelle, RegisterPacket, RegisterStatus, UserListPacket, UserListStatus,
};
pub use wire::{read_envelope, write_envelope, EnvelopeCodec, FramingError, FramingResult};

//! Wire-Format fuer Envelope-Streams
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + JSON-Envelope.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Envelope   |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Ein Laengen-Praefix ueber der konfigurierten Obergrenze (Standard: 1 MB)
//! wird abgelehnt, bevor Speicher reserviert wird.

use bytes::{Buf, BufMut, BytesMut};
use hushline_core::{Fehlerklasse, Klassifiziert};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::envelope::Envelope;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Lesen oder Schreiben eines Frames
///
/// Jeder dieser Fehler beendet die Lese-Schleife der Verbindung.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("IO-Fehler: {0}")]
    Io(#[from] io::Error),

    #[error("Frame zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)")]
    ZuGross { laenge: usize, maximum: usize },

    #[error("Frame abgeschnitten: Verbindung endete mitten im Frame")]
    Abgeschnitten,

    #[error("Verbindung geschlossen")]
    Geschlossen,

    #[error("Ungueltiger Envelope: {0}")]
    Ungueltig(String),
}

impl Klassifiziert for FramingError {
    fn klasse(&self) -> Fehlerklasse {
        match self {
            Self::Io(_) | Self::Geschlossen => Fehlerklasse::Transport,
            _ => Fehlerklasse::Framing,
        }
    }
}

pub type FramingResult<T> = Result<T, FramingError>;

fn envelope_aus_json(payload: &[u8]) -> FramingResult<Envelope> {
    serde_json::from_slice(payload).map_err(|e| FramingError::Ungueltig(e.to_string()))
}

fn envelope_als_json(envelope: &Envelope, max_frame_size: usize) -> FramingResult<Vec<u8>> {
    let json = serde_json::to_vec(envelope).map_err(|e| FramingError::Ungueltig(e.to_string()))?;
    if json.len() > max_frame_size {
        return Err(FramingError::ZuGross {
            laenge: json.len(),
            maximum: max_frame_size,
        });
    }
    Ok(json)
}

// ---------------------------------------------------------------------------
// EnvelopeCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer Envelope-Streams
///
/// Implementiert `Encoder<Envelope>` und `Decoder` fuer
/// `tokio_util::codec::Framed`, `FramedRead` und `FramedWrite`.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl EnvelopeCodec {
    /// Erstellt einen neuen `EnvelopeCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `EnvelopeCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(FramingError::ZuGross {
                laenge: length,
                maximum: self.max_frame_size,
            });
        }

        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        envelope_aus_json(&payload).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(envelope) => Ok(Some(envelope)),
            None if src.is_empty() => Ok(None),
            None => Err(FramingError::Abgeschnitten),
        }
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = FramingError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = envelope_als_json(&item, self.max_frame_size)?;

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen einzelnen Envelope aus einem `AsyncRead`
///
/// Blockiert bis Praefix und Payload vollstaendig vorliegen.
///
/// # Fehler
/// - `Geschlossen` wenn der Stream vor dem ersten Praefix-Byte endet
/// - `Abgeschnitten` wenn der Stream mitten im Frame endet
/// - `ZuGross` / `Ungueltig` bei zu grossem Frame oder kaputtem JSON
pub async fn read_envelope<R>(reader: &mut R, max_frame_size: usize) -> FramingResult<Envelope>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    let mut gelesen = 0;
    while gelesen < LENGTH_FIELD_SIZE {
        let n = reader.read(&mut len_buf[gelesen..]).await?;
        if n == 0 {
            return Err(if gelesen == 0 {
                FramingError::Geschlossen
            } else {
                FramingError::Abgeschnitten
            });
        }
        gelesen += n;
    }

    let length = u32::from_be_bytes(len_buf) as usize;
    if length > max_frame_size {
        return Err(FramingError::ZuGross {
            laenge: length,
            maximum: max_frame_size,
        });
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FramingError::Abgeschnitten
        } else {
            FramingError::Io(e)
        }
    })?;

    envelope_aus_json(&payload)
}

/// Schreibt einen einzelnen Envelope in einen `AsyncWrite`
pub async fn write_envelope<W>(
    writer: &mut W,
    envelope: &Envelope,
    max_frame_size: usize,
) -> FramingResult<()>
where
    W: AsyncWrite + Unpin,
{
    let json = envelope_als_json(envelope, max_frame_size)?;

    let len_bytes = (json.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(&json).await?;
    writer.flush().await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

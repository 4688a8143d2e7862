//! Wire-Format fuer TCP-Verbindungen
//!
//! Zeilenbasiertes Protokoll: jede Nachricht ist eine Textzeile mit
//! abschliessendem CRLF. Beim Lesen wird auch ein einzelnes LF akzeptiert.
//!
//! ```text
//! loggedin userid=5 nickname="Anna" chanid=1\r\n
//! ```
//!
//! Der Decoder liefert nie einen Fehler fuer eine einzelne kaputte Zeile,
//! sondern [`Eingang::Ungueltig`]. Nur IO-Fehler und ueberlange Zeilen
//! beenden den Stream.

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtokollFehler;
use crate::konstanten::PONG;
use crate::message::{parse, ProtocolMessage};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Zeilenlaenge (64 KB)
pub const DEFAULT_MAX_ZEILEN_LAENGE: usize = 64 * 1024;

/// Zeilenende beim Senden
pub const ZEILENENDE: &[u8] = b"\r\n";

// ---------------------------------------------------------------------------
// Eingang
// ---------------------------------------------------------------------------

/// Ergebnis einer dekodierten Zeile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eingang {
    /// Gueltige Nachricht
    Nachricht(ProtocolMessage),
    /// Antwort auf `ping` (wird nicht dispatcht)
    Pong,
    /// Zeile liess sich nicht parsen
    Ungueltig(ProtokollFehler),
}

impl Eingang {
    fn aus_bytes(zeile: &[u8]) -> Self {
        let text = match std::str::from_utf8(zeile) {
            Ok(t) => t.trim(),
            Err(_) => return Eingang::Ungueltig(ProtokollFehler::KeinUtf8),
        };
        if text.eq_ignore_ascii_case(PONG) {
            return Eingang::Pong;
        }
        match parse(text) {
            Ok(nachricht) => Eingang::Nachricht(nachricht),
            Err(e) => Eingang::Ungueltig(e),
        }
    }
}

// ---------------------------------------------------------------------------
// ZeilenCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer das TeamTalk-Zeilenprotokoll
///
/// Implementiert `Encoder<ProtocolMessage>` und `Decoder` fuer
/// `FramedRead`/`FramedWrite` auf den Haelften eines `TcpStream`.
///
/// # Beispiel
///
/// ```rust,no_run
/// use tokio_util::codec::FramedRead;
/// use teamtalk_protocol::wire::ZeilenCodec;
///
/// // let (lesen, schreiben) = stream.into_split();
/// // let leser = FramedRead::new(lesen, ZeilenCodec::new());
/// ```
#[derive(Debug, Clone)]
pub struct ZeilenCodec {
    /// Maximale erlaubte Zeilenlaenge in Bytes (ohne Zeilenende)
    max_zeilen_laenge: usize,
    /// Ab hier im Puffer nach dem naechsten LF suchen
    such_start: usize,
}

impl ZeilenCodec {
    /// Erstellt einen neuen `ZeilenCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self::with_max_laenge(DEFAULT_MAX_ZEILEN_LAENGE)
    }

    pub fn with_max_laenge(max_zeilen_laenge: usize) -> Self {
        Self {
            max_zeilen_laenge,
            such_start: 0,
        }
    }

    pub fn max_zeilen_laenge(&self) -> usize {
        self.max_zeilen_laenge
    }

    /// Prueft ob eine gebaute Zeile gesendet werden darf
    pub fn zeile_pruefen(&self, zeile: &str) -> Result<(), ProtokollFehler> {
        if zeile.len() > self.max_zeilen_laenge {
            return Err(ProtokollFehler::ZeileZuLang {
                laenge: zeile.len(),
                maximum: self.max_zeilen_laenge,
            });
        }
        Ok(())
    }
}

impl Default for ZeilenCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for ZeilenCodec {
    type Item = Eingang;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(offset) = src[self.such_start..].iter().position(|b| *b == b'\n') else {
            if src.len() > self.max_zeilen_laenge {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Zeile zu lang: mehr als {} Bytes ohne Zeilenende",
                        self.max_zeilen_laenge
                    ),
                ));
            }
            // Bereits durchsuchte Bytes nicht erneut pruefen
            self.such_start = src.len();
            return Ok(None);
        };

        let ende = self.such_start + offset;
        self.such_start = 0;

        let zeile = src.split_to(ende + 1);
        let mut inhalt = &zeile[..ende];
        if let Some(ohne_cr) = inhalt.strip_suffix(b"\r") {
            inhalt = ohne_cr;
        }
        if inhalt.len() > self.max_zeilen_laenge {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Zeile zu lang: {} Bytes (Maximum: {} Bytes)",
                    inhalt.len(),
                    self.max_zeilen_laenge
                ),
            ));
        }

        Ok(Some(Eingang::aus_bytes(inhalt)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(eingang) = self.decode(src)? {
            return Ok(Some(eingang));
        }
        // Letzte Zeile ohne Zeilenende
        if src.is_empty() {
            return Ok(None);
        }
        self.such_start = 0;
        let rest = src.split();
        Ok(Some(Eingang::aus_bytes(&rest)))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<ProtocolMessage> for ZeilenCodec {
    type Error = io::Error;

    fn encode(&mut self, item: ProtocolMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let zeile = item.build();
        self.zeile_pruefen(&zeile)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        dst.reserve(zeile.len() + ZEILENENDE.len());
        dst.put_slice(zeile.as_bytes());
        dst.put_slice(ZEILENENDE);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn dekodieren(codec: &mut ZeilenCodec, buf: &mut BytesMut) -> Eingang {
        codec
            .decode(buf)
            .unwrap()
            .expect("Muss eine Zeile enthalten")
    }

    #[test]
    fn encode_haengt_crlf_an() {
        let mut codec = ZeilenCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(ProtocolMessage::neu("login").mit("id", 1u64), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"login id=1\r\n");
    }

    #[test]
    fn decode_crlf_und_lf() {
        let mut codec = ZeilenCodec::new();
        let mut buf = BytesMut::from(&b"begin id=1\r\nend id=1\n"[..]);

        let erste = dekodieren(&mut codec, &mut buf);
        let zweite = dekodieren(&mut codec, &mut buf);
        match (erste, zweite) {
            (Eingang::Nachricht(a), Eingang::Nachricht(b)) => {
                assert_eq!(a.event, "begin");
                assert_eq!(b.event, "end");
                assert_eq!(b.param("id"), Some(&Value::Integer(1)));
            }
            andere => panic!("Erwartet zwei Nachrichten, erhalten {andere:?}"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_unvollstaendige_zeile() {
        let mut codec = ZeilenCodec::new();
        let mut buf = BytesMut::from(&b"loggedin userid=3 nick"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"name=\"Anna\"\r\n");
        match dekodieren(&mut codec, &mut buf) {
            Eingang::Nachricht(n) => {
                assert_eq!(n.param("nickname"), Some(&Value::Text("Anna".into())))
            }
            andere => panic!("Erwartet Nachricht, erhalten {andere:?}"),
        }
    }

    #[test]
    fn decode_pong_wird_erkannt() {
        let mut codec = ZeilenCodec::new();
        let mut buf = BytesMut::from(&b"pong\r\n"[..]);
        assert_eq!(dekodieren(&mut codec, &mut buf), Eingang::Pong);
    }

    #[test]
    fn decode_kaputte_zeile_ist_kein_stream_fehler() {
        let mut codec = ZeilenCodec::new();
        let mut buf = BytesMut::from(&b"ev k=\"offen\r\nping\r\n"[..]);
        assert_eq!(
            dekodieren(&mut codec, &mut buf),
            Eingang::Ungueltig(ProtokollFehler::OffenesAnfuehrungszeichen)
        );
        // Die folgende Zeile wird normal gelesen
        assert!(matches!(dekodieren(&mut codec, &mut buf), Eingang::Nachricht(_)));
    }

    #[test]
    fn decode_leere_zeile_und_ungueltiges_utf8() {
        let mut codec = ZeilenCodec::new();
        let mut buf = BytesMut::from(&b"\r\n\xff\xfe\r\n"[..]);
        assert_eq!(
            dekodieren(&mut codec, &mut buf),
            Eingang::Ungueltig(ProtokollFehler::LeereZeile)
        );
        assert_eq!(
            dekodieren(&mut codec, &mut buf),
            Eingang::Ungueltig(ProtokollFehler::KeinUtf8)
        );
    }

    #[test]
    fn decode_ablehnung_zu_langer_zeile() {
        let mut codec = ZeilenCodec::with_max_laenge(16);
        let mut buf = BytesMut::from(&[b'x'; 32][..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn decode_eof_ohne_zeilenende() {
        let mut codec = ZeilenCodec::new();
        let mut buf = BytesMut::from(&b"end id=1"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(matches!(
            codec.decode_eof(&mut buf).unwrap(),
            Some(Eingang::Nachricht(_))
        ));
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn encode_ablehnung_zu_grosse_nachricht() {
        let mut codec = ZeilenCodec::with_max_laenge(8);
        let mut buf = BytesMut::new();
        let ergebnis = codec.encode(
            ProtocolMessage::neu("message").mit("content", "viel zu lang"),
            &mut buf,
        );
        assert!(ergebnis.is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn zeile_pruefen_grenze() {
        let codec = ZeilenCodec::with_max_laenge(4);
        assert!(codec.zeile_pruefen("ping").is_ok());
        assert_eq!(
            codec.zeile_pruefen("pings"),
            Err(ProtokollFehler::ZeileZuLang { laenge: 5, maximum: 4 })
        );
    }
}

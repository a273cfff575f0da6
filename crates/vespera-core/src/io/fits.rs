//! Minimal FITS primary-header reader.
//!
//! Only the header cards are parsed (80-byte records in 2880-byte blocks,
//! terminated by `END`); pixel data is never read.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

const CARD_LEN: usize = 80;
const BLOCK_LEN: usize = 2880;
/// Headers longer than this are treated as corrupt.
const MAX_HEADER_BLOCKS: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum FitsValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
}

impl FitsValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<(String, FitsValue)>,
}

impl FitsHeader {
    /// Parse header cards from the start of a FITS file.
    ///
    /// Returns `None` when the bytes do not start with `SIMPLE` or no `END`
    /// card is found.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if !bytes.starts_with(b"SIMPLE") {
            return None;
        }
        let mut header = Self::default();
        for card in bytes.chunks_exact(CARD_LEN) {
            // Cards are ASCII; anything else is a malformed card.
            if !card.is_ascii() {
                continue;
            }
            let Ok(record) = std::str::from_utf8(card) else {
                continue;
            };
            let keyword = record[..8].trim();
            if keyword == "END" {
                return Some(header);
            }
            if keyword.is_empty() || &record[8..10] != "= " {
                continue;
            }
            header
                .cards
                .push((keyword.to_string(), parse_value(&record[10..])));
        }
        None
    }

    pub fn get(&self, key: &str) -> Option<&FitsValue> {
        self.cards.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FitsValue::as_f64)
    }

    /// Exposure time in seconds (`EXPTIME`, falling back to `EXPOSURE`).
    pub fn exposure_seconds(&self) -> Option<f64> {
        self.get_f64("EXPTIME").or_else(|| self.get_f64("EXPOSURE"))
    }

    /// Number of color planes (`NAXIS3`, 1 when absent).
    pub fn planes(&self) -> usize {
        self.get_f64("NAXIS3").map(|n| n as usize).unwrap_or(1)
    }
}

/// Read only the header blocks of a FITS file.
pub fn read_header(path: &Path) -> Result<Option<FitsHeader>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::with_capacity(BLOCK_LEN);
    let mut block = [0u8; BLOCK_LEN];
    for _ in 0..MAX_HEADER_BLOCKS {
        if file.read_exact(&mut block).is_err() {
            break;
        }
        bytes.extend_from_slice(&block);
        if !bytes.starts_with(b"SIMPLE") {
            return Ok(None);
        }
        if let Some(header) = FitsHeader::parse(&bytes) {
            return Ok(Some(header));
        }
    }
    Ok(None)
}

fn parse_value(raw: &str) -> FitsValue {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix('\'') {
        let end = rest.find('\'').unwrap_or(rest.len());
        return FitsValue::Text(rest[..end].trim_end().to_string());
    }
    let value = raw.split('/').next().unwrap_or("").trim();
    match value {
        "T" => return FitsValue::Logical(true),
        "F" => return FitsValue::Logical(false),
        _ => {}
    }
    if let Ok(i) = value.parse::<i64>() {
        return FitsValue::Integer(i);
    }
    if let Ok(f) = value.replace(['D', 'd'], "E").parse::<f64>() {
        return FitsValue::Float(f);
    }
    FitsValue::Text(value.to_string())
}

/// Total exposure found in a set of frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntegrationEstimate {
    pub total_seconds: f64,
    pub frames_with_exposure: usize,
    pub frames_without_exposure: usize,
}

/// Sum the exposure of every readable frame header. Unreadable files count
/// as frames without exposure.
pub fn integration_estimate<P: AsRef<Path>>(frames: &[P]) -> IntegrationEstimate {
    let mut estimate = IntegrationEstimate::default();
    for frame in frames {
        match read_header(frame.as_ref()) {
            Ok(Some(header)) => match header.exposure_seconds() {
                Some(seconds) => {
                    estimate.total_seconds += seconds;
                    estimate.frames_with_exposure += 1;
                }
                None => estimate.frames_without_exposure += 1,
            },
            _ => estimate.frames_without_exposure += 1,
        }
    }
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(text: &str) -> Vec<u8> {
        let mut c = format!("{text:<80}").into_bytes();
        c.truncate(CARD_LEN);
        c
    }

    fn header_bytes(cards: &[&str]) -> Vec<u8> {
        let mut bytes: Vec<u8> = cards.iter().flat_map(|c| card(c)).collect();
        bytes.extend(card("END"));
        bytes.resize(BLOCK_LEN, b' ');
        bytes
    }

    #[test]
    fn test_parse_exposure_and_planes() {
        let bytes = header_bytes(&[
            "SIMPLE  =                    T",
            "NAXIS   =                    3",
            "NAXIS3  =                    3",
            "EXPTIME =                 10.0 / exposure",
        ]);
        let header = FitsHeader::parse(&bytes).unwrap();
        assert_eq!(header.exposure_seconds(), Some(10.0));
        assert_eq!(header.planes(), 3);
        assert_eq!(header.get("SIMPLE"), Some(&FitsValue::Logical(true)));
    }

    #[test]
    fn test_parse_string_and_fallback_exposure() {
        let bytes = header_bytes(&[
            "SIMPLE  =                    T",
            "INSTRUME= 'Vespera Pro'        / camera",
            "EXPOSURE=                    4",
        ]);
        let header = FitsHeader::parse(&bytes).unwrap();
        assert_eq!(
            header.get("INSTRUME"),
            Some(&FitsValue::Text("Vespera Pro".into()))
        );
        assert_eq!(header.exposure_seconds(), Some(4.0));
        assert_eq!(header.planes(), 1);
    }

    #[test]
    fn test_non_ascii_card_is_skipped() {
        let bytes = header_bytes(&[
            "SIMPLE  =                    T",
            "OBSERVA\u{e9}=   1",
            "EXPTIME =                    8",
        ]);
        let header = FitsHeader::parse(&bytes).unwrap();
        assert_eq!(header.exposure_seconds(), Some(8.0));
        assert_eq!(header.get("OBSERVA\u{e9}"), None);
    }

    #[test]
    fn test_parse_rejects_non_fits() {
        assert!(FitsHeader::parse(b"II*\0 not a fits file").is_none());
    }

    #[test]
    fn test_parse_requires_end_card() {
        let mut bytes = card("SIMPLE  =                    T");
        bytes.resize(BLOCK_LEN, b' ');
        assert!(FitsHeader::parse(&bytes).is_none());
    }
}

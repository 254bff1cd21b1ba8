//! Reversible turn sheet codes.
//!
//! A code packs `(game_id, game_instance_id, account_id, game_turn_sheet_id)` into
//! 64 bytes, masks them with a SHA-256 counter keystream under the server key and
//! appends an 8-byte tag over the masked bytes. The result is printed on the sheet
//! as `TS1-` followed by Crockford base32, which survives OCR: decoding ignores
//! case, spaces and hyphens and reads `I`/`L` as `1` and `O` as `0`.

use regex_lite::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use playbymail_domain::{AccountId, GameId, GameInstanceId, GameTurnSheetId};

pub const CODE_PREFIX: &str = "TS1-";

const TUPLE_LEN: usize = 64;
const TAG_LEN: usize = 8;
/// Base32 characters for `TUPLE_LEN + TAG_LEN` bytes.
const ENCODED_LEN: usize = 116;

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnSheetCodeError {
    #[error("Turn sheet code must start with TS1-")]
    Prefix,
    #[error("Turn sheet code is not valid base32: {0}")]
    Encoding(String),
    #[error("Turn sheet code has {0} bytes, expected 72")]
    Length(usize),
    #[error("Turn sheet code was not issued by this server")]
    Tag,
    #[error("No turn sheet code found")]
    NotFound,
}

/// The ids a turn sheet code resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnSheetCodeParts {
    pub game_id: GameId,
    pub game_instance_id: GameInstanceId,
    pub account_id: AccountId,
    pub game_turn_sheet_id: GameTurnSheetId,
}

fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u16 = 0;
    let mut bits = 0;
    for &byte in bytes {
        buffer = (buffer << 8) | u16::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(ALPHABET[usize::from((buffer >> bits) & 0x1f)]));
        }
    }
    if bits > 0 {
        out.push(char::from(ALPHABET[usize::from((buffer << (5 - bits)) & 0x1f)]));
    }
    out
}

/// Value of one base32 character, folding case and OCR lookalikes.
fn base32_value(c: char) -> Option<u16> {
    let c = match c.to_ascii_uppercase() {
        'I' | 'L' => '1',
        'O' => '0',
        other => other,
    };
    ALPHABET
        .iter()
        .position(|&a| char::from(a) == c)
        .and_then(|v| u16::try_from(v).ok())
}

fn base32_decode(text: &str) -> Result<Vec<u8>, TurnSheetCodeError> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u16 = 0;
    let mut bits = 0;
    for c in text.chars().filter(|c| !c.is_whitespace() && *c != '-') {
        let value = base32_value(c)
            .ok_or_else(|| TurnSheetCodeError::Encoding(format!("unexpected character {:?}", c)))?;
        buffer = ((buffer << 5) | value) & 0x0fff;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    if bits > 0 && buffer & ((1 << bits) - 1) != 0 {
        return Err(TurnSheetCodeError::Encoding("trailing bits are set".into()));
    }
    Ok(out)
}

#[derive(Clone)]
pub struct TurnSheetCodec {
    key: Vec<u8>,
}

impl std::fmt::Debug for TurnSheetCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnSheetCodec").finish_non_exhaustive()
    }
}

impl TurnSheetCodec {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    pub fn encode(&self, parts: &TurnSheetCodeParts) -> String {
        let mut bytes = Vec::with_capacity(TUPLE_LEN + TAG_LEN);
        bytes.extend_from_slice(parts.game_id.as_uuid().as_bytes());
        bytes.extend_from_slice(parts.game_instance_id.as_uuid().as_bytes());
        bytes.extend_from_slice(parts.account_id.as_uuid().as_bytes());
        bytes.extend_from_slice(parts.game_turn_sheet_id.as_uuid().as_bytes());
        self.apply_mask(&mut bytes);
        let tag = self.tag(&bytes);
        bytes.extend_from_slice(&tag);
        format!("{}{}", CODE_PREFIX, base32_encode(&bytes))
    }

    pub fn decode(&self, code: &str) -> Result<TurnSheetCodeParts, TurnSheetCodeError> {
        let body = strip_prefix(code.trim()).ok_or(TurnSheetCodeError::Prefix)?;
        let mut bytes = base32_decode(body)?;
        if bytes.len() != TUPLE_LEN + TAG_LEN {
            return Err(TurnSheetCodeError::Length(bytes.len()));
        }

        let tag = bytes.split_off(TUPLE_LEN);
        if tag != self.tag(&bytes) {
            return Err(TurnSheetCodeError::Tag);
        }
        self.apply_mask(&mut bytes);

        let uuid_at = |index: usize| {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&bytes[index * 16..(index + 1) * 16]);
            Uuid::from_bytes(raw)
        };
        Ok(TurnSheetCodeParts {
            game_id: GameId::from_uuid(uuid_at(0)),
            game_instance_id: GameInstanceId::from_uuid(uuid_at(1)),
            account_id: AccountId::from_uuid(uuid_at(2)),
            game_turn_sheet_id: GameTurnSheetId::from_uuid(uuid_at(3)),
        })
    }

    /// Finds the first valid code in OCR output and decodes it. The code may be
    /// lower-cased, broken across lines or split into hyphenated groups.
    pub fn find_in_text(&self, text: &str) -> Result<TurnSheetCodeParts, TurnSheetCodeError> {
        let regex =
            Regex::new(r"(?i)\bTS[1IL]-?").map_err(|e| TurnSheetCodeError::Encoding(e.to_string()))?;
        let mut last_error = TurnSheetCodeError::NotFound;
        for found in regex.find_iter(text) {
            let body = collect_body(&text[found.end()..]);
            if body.len() < ENCODED_LEN {
                continue;
            }
            match self.decode(&format!("{}{}", CODE_PREFIX, body)) {
                Ok(parts) => return Ok(parts),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    fn apply_mask(&self, bytes: &mut [u8]) {
        for (block, chunk) in bytes.chunks_mut(32).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(&self.key);
            hasher.update(b"mask");
            hasher.update((block as u32).to_be_bytes());
            let keystream = hasher.finalize();
            for (byte, k) in chunk.iter_mut().zip(keystream.iter()) {
                *byte ^= k;
            }
        }
    }

    fn tag(&self, ciphertext: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(&self.key);
        hasher.update(b"tag");
        hasher.update(ciphertext);
        hasher.finalize()[..TAG_LEN].to_vec()
    }
}

/// Accepts `TS1-` in any case, with the `1` misread as `I`/`L` or the hyphen lost.
fn strip_prefix(code: &str) -> Option<&str> {
    let head = code.get(..3)?;
    let mut chars = head.chars();
    let ts = chars.next()?.eq_ignore_ascii_case(&'T') && chars.next()?.eq_ignore_ascii_case(&'S');
    if !ts || base32_value(chars.next()?) != Some(1) {
        return None;
    }
    let rest = &code[3..];
    Some(rest.strip_prefix('-').unwrap_or(rest))
}

/// Up to `ENCODED_LEN` code characters, skipping spaces, line breaks and hyphens.
fn collect_body(text: &str) -> String {
    let mut body = String::with_capacity(ENCODED_LEN);
    for c in text.chars() {
        if body.len() == ENCODED_LEN {
            break;
        }
        if c.is_whitespace() || c == '-' {
            continue;
        }
        if !c.is_ascii_alphanumeric() {
            break;
        }
        body.push(c);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> TurnSheetCodeParts {
        TurnSheetCodeParts {
            game_id: GameId::new(),
            game_instance_id: GameInstanceId::new(),
            account_id: AccountId::new(),
            game_turn_sheet_id: GameTurnSheetId::new(),
        }
    }

    #[test]
    fn decodes_what_it_encodes() {
        let codec = TurnSheetCodec::new("server-key");
        let parts = parts();
        let code = codec.encode(&parts);

        assert!(code.starts_with(CODE_PREFIX));
        assert_eq!(code.len(), CODE_PREFIX.len() + ENCODED_LEN);
        assert_eq!(codec.decode(&code).unwrap(), parts);
    }

    #[test]
    fn codes_are_deterministic() {
        let codec = TurnSheetCodec::new("server-key");
        let parts = parts();
        assert_eq!(codec.encode(&parts), codec.encode(&parts));
    }

    #[test]
    fn ids_are_not_readable_in_the_code() {
        let codec = TurnSheetCodec::new("server-key");
        let parts = parts();
        let code = codec.encode(&parts);
        let plain = base32_encode(parts.game_id.as_uuid().as_bytes());
        assert!(!code.contains(&plain[..16]));
    }

    #[test]
    fn other_keys_are_rejected() {
        let code = TurnSheetCodec::new("server-key").encode(&parts());
        assert_eq!(
            TurnSheetCodec::new("other-key").decode(&code),
            Err(TurnSheetCodeError::Tag)
        );
    }

    #[test]
    fn tampering_is_rejected() {
        let codec = TurnSheetCodec::new("server-key");
        let code = codec.encode(&parts());
        let mut chars: Vec<char> = code.chars().collect();
        let i = CODE_PREFIX.len() + 3;
        chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert_eq!(codec.decode(&tampered), Err(TurnSheetCodeError::Tag));
    }

    #[test]
    fn malformed_codes_are_rejected() {
        let codec = TurnSheetCodec::new("server-key");
        assert_eq!(codec.decode("XX1-abc"), Err(TurnSheetCodeError::Prefix));
        assert!(matches!(
            codec.decode("TS1-!!!"),
            Err(TurnSheetCodeError::Encoding(_))
        ));
        assert!(matches!(
            codec.decode("TS1-UUUU"),
            Err(TurnSheetCodeError::Encoding(_))
        ));
        assert_eq!(codec.decode("TS1-0000"), Err(TurnSheetCodeError::Length(2)));
    }

    #[test]
    fn finds_code_in_ocr_text() {
        let codec = TurnSheetCodec::new("server-key");
        let parts = parts();
        let text = format!(
            "The Caves - Turn 3\nSheet code: {}\nChoose your path",
            codec.encode(&parts)
        );
        assert_eq!(codec.find_in_text(&text).unwrap(), parts);
        assert_eq!(
            codec.find_in_text("no code here"),
            Err(TurnSheetCodeError::NotFound)
        );
    }

    #[test]
    fn lookalike_characters_and_case_are_forgiven() {
        let codec = TurnSheetCodec::new("server-key");
        let parts = parts();
        let code = codec.encode(&parts);
        let misread = code.to_lowercase().replace('1', "l").replace('0', "o");
        assert_eq!(codec.decode(&misread).unwrap(), parts);
    }

    #[test]
    fn finds_a_code_wrapped_across_lines() {
        let codec = TurnSheetCodec::new("server-key");
        let parts = parts();
        let code = codec.encode(&parts).to_lowercase();
        let body = &code[CODE_PREFIX.len()..];
        let grouped: Vec<&str> = body
            .as_bytes()
            .chunks(4)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect();
        let text = format!(
            "Turn 2\nCode: ts1- {}\n{}\nMark one box.",
            grouped[..15].join("-"),
            grouped[15..].join(" ")
        );
        assert_eq!(codec.find_in_text(&text).unwrap(), parts);
    }

    #[test]
    fn a_truncated_code_is_not_found() {
        let codec = TurnSheetCodec::new("server-key");
        let code = codec.encode(&parts());
        let text = format!("Code: {}.", &code[..60]);
        assert_eq!(codec.find_in_text(&text), Err(TurnSheetCodeError::NotFound));
    }
}

//! Text encoding of KYC files and derived-key dumps.
//!
//! A KYC file is line oriented UTF-8. Lines starting with `#` are comments.
//! The first data line is the key line
//! `<onboard pubkey> <kyc pubkey> <nonce>`; every following data line is
//! one entry:
//!
//! ```text
//! <address> <pubkey>                      single key
//! <address> <threshold> <pubkey>...       multisig group
//! ```
//!
//! In the sealed form the entry lines are replaced by one hex line holding
//! their ChaCha20-Poly1305 ciphertext.

use chrono::{DateTime, SecondsFormat, Utc};
use tidemark_core::constants::{
    KYC_COMMENT_PREFIX, KYC_FILE_BANNER, KYC_FILE_TRAILER, PUBKEY_LEN, SEAL_NONCE_LEN,
};
use tidemark_core::entry::{MultisigEntry, OnboardEntry};
use tidemark_core::error::TidemarkError;
use tidemark_core::types::{Destination, PubKey};
use tidemark_crypto::{normalize_pubkey, seal, KeyPair, KeyTweaker};

use crate::kyc_file::KycFile;
use crate::record_set::KycRecordSet;

const SINGLE_SECTION: &str = "# Single-key entries: <address> <pubkey>";
const MULTISIG_SECTION: &str = "# Multisig entries: <address> <threshold> <pubkey>...";
const SEALED_SECTION: &str = "# Sealed entries";
const DUMP_BANNER: &str = "# Tidemark derived keys";
const DUMP_SECTION: &str = "# <address> <pubkey>";
const DUMP_TRAILER: &str = "# End of derived keys";

fn malformed(line: usize, reason: impl Into<String>) -> TidemarkError {
    TidemarkError::MalformedKycFile { line, reason: reason.into() }
}

fn created_line(created: DateTime<Utc>) -> String {
    format!("# Created: {}", created.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Numbered data lines: blank and comment lines dropped, numbering kept.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r').trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with(KYC_COMMENT_PREFIX))
}

// ── Encoding ──────────────────────────────────────────────────────────────────

fn entry_line(entry: &OnboardEntry, destination: &Destination) -> String {
    match entry {
        OnboardEntry::SingleKey(e) => format!("{} {}", e.address, e.pubkey),
        OnboardEntry::Multisig(e) => {
            let keys: Vec<String> = e.pubkeys.iter().map(PubKey::to_hex).collect();
            format!("{} {} {}", destination, e.threshold, keys.join(" "))
        }
    }
}

/// Entry lines with a section comment before each run of one kind.
fn entry_block(records: &KycRecordSet, with_sections: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut last_multisig = None;
    for r in records.entries() {
        let is_multisig = matches!(r.entry, OnboardEntry::Multisig(_));
        if with_sections && last_multisig != Some(is_multisig) {
            lines.push(if is_multisig { MULTISIG_SECTION } else { SINGLE_SECTION }.to_string());
            last_multisig = Some(is_multisig);
        }
        lines.push(entry_line(&r.entry, &r.destination));
    }
    lines
}

fn key_line(file: &KycFile) -> String {
    format!("{} {} {}", file.onboard_pubkey, file.kyc_pubkey, hex::encode(file.nonce))
}

fn finish(mut lines: Vec<String>) -> String {
    lines.push(KYC_FILE_TRAILER.to_string());
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Plain, human-readable form.
pub fn encode_plain(file: &KycFile, created: DateTime<Utc>) -> String {
    let mut lines = vec![KYC_FILE_BANNER.to_string(), created_line(created), key_line(file)];
    lines.extend(entry_block(&file.records, true));
    finish(lines)
}

/// Sealed form; `sealer` must hold the secret of the onboard or the kyc key.
pub fn encode_sealed(
    file: &KycFile,
    created: DateTime<Utc>,
    sealer: &KeyPair,
) -> Result<String, TidemarkError> {
    let peer = seal_peer(file, sealer)?;
    let body = entry_block(&file.records, false).join("\n");
    let ciphertext = seal::seal(sealer, peer, &file.nonce, body.as_bytes())?;
    let lines = vec![
        KYC_FILE_BANNER.to_string(),
        created_line(created),
        key_line(file),
        SEALED_SECTION.to_string(),
        hex::encode(ciphertext),
    ];
    Ok(finish(lines))
}

fn seal_peer<'a>(file: &'a KycFile, ours: &KeyPair) -> Result<&'a PubKey, TidemarkError> {
    if ours.public_key == file.onboard_pubkey {
        Ok(&file.kyc_pubkey)
    } else if ours.public_key == file.kyc_pubkey {
        Ok(&file.onboard_pubkey)
    } else {
        Err(TidemarkError::MissingSecret(format!(
            "onboard key {} or onboarding key {}",
            file.onboard_pubkey, file.kyc_pubkey
        )))
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Fields of the key line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyLine {
    pub onboard_pubkey: PubKey,
    pub kyc_pubkey: PubKey,
    pub nonce: [u8; SEAL_NONCE_LEN],
}

fn looks_like_pubkey(field: &str) -> bool {
    field.len() == PUBKEY_LEN * 2 && field.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_pubkey(line: usize, field: &str) -> Result<PubKey, TidemarkError> {
    let pk = PubKey::from_hex(field).map_err(|e| malformed(line, e.to_string()))?;
    if pk.as_bytes().len() != PUBKEY_LEN {
        return Err(malformed(line, format!("{field}: expected a {PUBKEY_LEN}-byte public key")));
    }
    normalize_pubkey(&pk).map_err(|e| malformed(line, e.to_string()))
}

fn parse_key_line(line: usize, text: &str) -> Result<KeyLine, TidemarkError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(malformed(line, "expected key line <onboard pubkey> <kyc pubkey> <nonce>"));
    }
    let onboard_pubkey = parse_pubkey(line, fields[0])?;
    let kyc_pubkey = parse_pubkey(line, fields[1])?;
    let nonce: [u8; SEAL_NONCE_LEN] = hex::decode(fields[2])
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| malformed(line, format!("nonce must be {SEAL_NONCE_LEN} hex bytes")))?;
    Ok(KeyLine { onboard_pubkey, kyc_pubkey, nonce })
}

/// Read only the key line; `Ok(None)` when the text has no data lines.
pub fn read_key_line(text: &str) -> Result<Option<KeyLine>, TidemarkError> {
    match data_lines(text).next() {
        Some((line, l)) => parse_key_line(line, l).map(Some),
        None => Ok(None),
    }
}

fn parse_entry(line: usize, text: &str, tweaker: &KeyTweaker) -> Result<OnboardEntry, TidemarkError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    match fields.as_slice() {
        [address, pubkey] => {
            let address = Destination::from_address(address).map_err(|e| malformed(line, e.to_string()))?;
            let pubkey = parse_pubkey(line, pubkey)?;
            let derived = tweaker.address_for(&pubkey).map_err(|e| malformed(line, e.to_string()))?;
            if derived != address {
                return Err(malformed(line, format!("{address} is not derived from {pubkey}")));
            }
            Ok(OnboardEntry::single(address, pubkey))
        }
        [first, _, _] if looks_like_pubkey(first) => Err(malformed(line, "duplicate key line")),
        [address, threshold, keys @ ..] if !keys.is_empty() => {
            let address = Destination::from_address(address).map_err(|e| malformed(line, e.to_string()))?;
            let threshold: usize = threshold
                .parse()
                .map_err(|_| malformed(line, format!("{threshold}: threshold is not a number")))?;
            let pubkeys = keys.iter().map(|k| parse_pubkey(line, k)).collect::<Result<Vec<_>, _>>()?;
            let entry = MultisigEntry::new(threshold, pubkeys).map_err(|e| malformed(line, e.to_string()))?;
            let derived = tweaker
                .multisig_address(entry.threshold, &entry.pubkeys)
                .map_err(|e| malformed(line, e.to_string()))?;
            if derived != address {
                return Err(malformed(line, format!("{address} does not match the group's script address")));
            }
            Ok(OnboardEntry::Multisig(entry))
        }
        _ => Err(malformed(line, format!("unexpected field count {}", fields.len()))),
    }
}

/// True when the nearest non-blank line above `line` is the sealed section comment.
fn follows_sealed_section(text: &str, line: usize) -> bool {
    text.lines()
        .take(line.saturating_sub(1))
        .map(|l| l.trim_end_matches('\r').trim())
        .filter(|l| !l.is_empty())
        .last()
        == Some(SEALED_SECTION)
}

/// Decode a plain or sealed KYC file addressed to `tweaker`'s onboarding key.
///
/// A sealed body is the single data line right after the sealed section
/// comment; it needs `opener`, holding the secret of either key on the key
/// line, and fails as `MalformedKycFile` if it does not open. Text without any data line fails with `EmptyFile`; a valid key line
/// without entries decodes to an empty record set.
pub fn decode(
    text: &str,
    tweaker: &KeyTweaker,
    opener: Option<&KeyPair>,
) -> Result<KycFile, TidemarkError> {
    let mut lines = data_lines(text);
    let (first, key_text) = lines.next().ok_or(TidemarkError::EmptyFile)?;
    let key = parse_key_line(first, key_text)?;
    if &key.kyc_pubkey != tweaker.onboarding_key() {
        return Err(TidemarkError::WrongOnboardingKey {
            expected: tweaker.onboarding_key().to_hex(),
            found: key.kyc_pubkey.to_hex(),
        });
    }
    let rest: Vec<(usize, &str)> = lines.collect();
    let mut file = KycFile::new(key.onboard_pubkey, key.kyc_pubkey, key.nonce, KycRecordSet::empty());

    let sealed_body = match rest.as_slice() {
        [(line, body)] if follows_sealed_section(text, *line) => Some((*line, *body)),
        _ => None,
    };
    let entries = if let Some((line, body)) = sealed_body {
        let opener = opener.ok_or_else(|| {
            TidemarkError::MissingSecret(format!("sealed KYC file for {}", file.kyc_pubkey))
        })?;
        let peer = seal_peer(&file, opener)?;
        let ciphertext = hex::decode(body).map_err(|e| malformed(line, format!("sealed body: {e}")))?;
        let plain = seal::open(opener, peer, &file.nonce, &ciphertext)
            .map_err(|e| malformed(line, format!("sealed body: {e}")))?;
        let plain = std::str::from_utf8(&plain).map_err(|_| malformed(line, "sealed body is not UTF-8"))?;
        plain
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| parse_entry(line, l.trim(), tweaker))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        rest.iter()
            .map(|(line, l)| parse_entry(*line, l, tweaker))
            .collect::<Result<Vec<_>, _>>()?
    };
    file.records = KycRecordSet::from_entries(tweaker, entries)?;
    Ok(file)
}

// ── Comparison ────────────────────────────────────────────────────────────────

/// Lines that must agree between two encodings of one record set.
///
/// Drops comment lines and the self-referential key line whose first field
/// is `own_onboard_key`.
pub fn comparable_lines(text: &str, own_onboard_key: &PubKey) -> Vec<String> {
    let own = own_onboard_key.to_hex();
    text.lines()
        .map(|l| l.trim_end_matches('\r').trim())
        .filter(|l| !l.is_empty() && !l.starts_with(KYC_COMMENT_PREFIX))
        .filter(|l| {
            let fields: Vec<&str> = l.split(' ').collect();
            !(fields.len() == 3 && fields[0] == own)
        })
        .map(str::to_string)
        .collect()
}

// ── Derived key dump ──────────────────────────────────────────────────────────

pub fn encode_key_dump(keys: &[(Destination, PubKey)], created: DateTime<Utc>) -> String {
    let mut lines = vec![DUMP_BANNER.to_string(), created_line(created), DUMP_SECTION.to_string()];
    lines.extend(keys.iter().map(|(address, pubkey)| format!("{address} {pubkey}")));
    lines.push(DUMP_TRAILER.to_string());
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Parse a key dump into single-key entries.
pub fn decode_key_dump(text: &str, tweaker: &KeyTweaker) -> Result<KycRecordSet, TidemarkError> {
    let mut entries = Vec::new();
    for (line, l) in data_lines(text) {
        if l.split_whitespace().count() != 2 {
            return Err(malformed(line, "expected <address> <pubkey>"));
        }
        entries.push(parse_entry(line, l, tweaker)?);
    }
    KycRecordSet::from_entries(tweaker, entries)
}

use tidemark_core::error::TidemarkError;
use tidemark_core::types::{Destination, PubKey};
use tidemark_core::MAX_MULTISIG_KEYS;

use crate::hash::script_id_from_bytes;

/// Serialized N-of-M script: `[threshold, key_count, key_0 .. key_m]`.
///
/// Key order is significant; reordering members yields a different script.
pub fn multisig_script(threshold: usize, pubkeys: &[PubKey]) -> Result<Vec<u8>, TidemarkError> {
    let keys = pubkeys.len();
    if threshold == 0 || threshold > keys || keys > MAX_MULTISIG_KEYS {
        return Err(TidemarkError::InvalidThreshold { threshold, keys, max: MAX_MULTISIG_KEYS });
    }
    let mut script = Vec::with_capacity(2 + keys * 33);
    script.push(threshold as u8);
    script.push(keys as u8);
    for pk in pubkeys {
        script.extend_from_slice(pk.as_bytes());
    }
    Ok(script)
}

/// Script-hash destination of an N-of-M script over the given keys.
pub fn multisig_destination(
    threshold: usize,
    pubkeys: &[PubKey],
) -> Result<Destination, TidemarkError> {
    let script = multisig_script(threshold, pubkeys)?;
    Ok(Destination::ScriptHash(script_id_from_bytes(&script)))
}

pub mod ecdsa;
pub mod hash;
pub mod keypair;
pub mod script;
pub mod seal;
pub mod tweak;

pub use ecdsa::{normalize_pubkey, verify_signature};
pub use hash::{blake3_hash, key_id_from_pubkey, script_id_from_bytes, sha3_256, tx_id_from_body};
pub use keypair::KeyPair;
pub use script::{multisig_destination, multisig_script};
pub use tweak::KeyTweaker;

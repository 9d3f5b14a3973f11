pub mod db;
pub mod engine;
pub mod handle;
pub mod wallet;

pub use db::{Block, MemberRecord, StateDb, TxRecord, Utxo};
pub use engine::{ChainEngine, TxStatus};
pub use handle::NodeHandle;
pub use wallet::{AddressInfo, Wallet};

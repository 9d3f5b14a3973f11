//! tidemark-rpc
//!
//! JSON-RPC 2.0 server for Tidemark nodes.
//!
//! Namespace: "tidemark"
//! Methods:
//!   tidemark_createKycFile     — build a (sealed) KYC file from entries
//!   tidemark_validateKycFile   — addresses of a file and their membership
//!   tidemark_onboardUser       — register a file's entries (policy node)
//!   tidemark_queryWhitelist    — membership of one address
//!   tidemark_readKycFile       — plain form of a sealed file
//!   tidemark_dumpDerivedKeys   — derived wallet keys, for bulk import
//!   tidemark_readWhitelist     — register a derived key dump
//!   tidemark_getNewAddress, tidemark_validateAddress, tidemark_createMultisig,
//!   tidemark_importPrivKey, tidemark_getBalance — wallet
//!   tidemark_generate, tidemark_getBlock, tidemark_getRawTransaction — chain

pub mod api;
pub mod server;
pub mod types;

pub use api::{TidemarkApiClient, TidemarkApiServer};
pub use server::{RpcServer, RpcServerState};
pub use types::{
    RpcAddressInfo, RpcBlock, RpcCreatedKycFile, RpcMultisig, RpcMultisigEntry, RpcOnboardReceipt,
    RpcRawTransaction, RpcSingleKeyEntry, RpcValidation,
};

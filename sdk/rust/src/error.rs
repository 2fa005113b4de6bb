//! SDK Error types

use thiserror::Error;

/// SDK errors
#[derive(Error, Debug)]
pub enum PercolatorSdkError {
    #[error("Slab magic mismatch: expected {expected:#018x}, found {found:#018x}")]
    MagicMismatch { expected: u64, found: u64 },

    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Missing context: {0}")]
    MissingContext(&'static str),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Instruction build error: {0}")]
    InstructionBuild(String),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, PercolatorSdkError>;

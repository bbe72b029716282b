//! Error taxonomy for user-initiated actions.
//!
//! Read-path problems (missing optional methods, per-item failures) are not
//! errors at all: the loader logs them and degrades. Everything here ends one
//! action and leaves the session usable.

use std::fmt;

use thiserror::Error;

/// EIP-1193 provider error codes that get their own message
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const REQUEST_PENDING: i64 = -32002;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Set locally when the endpoint could not be reached or answered garbage
    pub const TRANSPORT: i64 = 0;
}

/// Failure to establish a wallet/contract connection
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("No wallet detected. Please check the RPC URL and make sure the node is running.")]
    NoWallet,

    #[error("No accounts found. Please unlock your wallet and try again.")]
    NoAccounts,

    #[error("Connection rejected. Please approve the connection request in your wallet.")]
    Rejected,

    #[error("Connection request already pending. Please check your wallet.")]
    Pending,

    #[error("Failed to connect to contract. Please verify the contract is deployed on this network.")]
    ContractUnavailable(#[source] anyhow::Error),

    #[error("{0}")]
    Other(String),
}

impl ConnectError {
    /// Map a provider error raised while requesting accounts
    pub fn from_provider(err: RpcError) -> Self {
        match err.code {
            codes::USER_REJECTED => ConnectError::Rejected,
            codes::REQUEST_PENDING => ConnectError::Pending,
            codes::TRANSPORT => ConnectError::NoWallet,
            _ => ConnectError::Other(err.message),
        }
    }
}

/// Error object returned by a JSON-RPC endpoint or wallet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Upload failures, classified by HTTP status where one is available
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Pinning service authentication failed. Please check the upload credentials.")]
    Auth,

    #[error("File too large. Please select a smaller image.")]
    TooLarge,

    #[error("Pinning service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Network error. Please check your internet connection.")]
    Network(#[source] reqwest::Error),

    #[error("Invalid response from pinning service")]
    InvalidResponse,

    #[error("Could not obtain upload credentials: {0}")]
    Credentials(String),
}

impl UploadError {
    /// Classify a non-success HTTP status with the service's error text
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 => UploadError::Auth,
            413 => UploadError::TooLarge,
            _ => UploadError::Service {
                status,
                message: message.into(),
            },
        }
    }
}

/// Failure while estimating, submitting or confirming a transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("Transaction rejected by user")]
    Rejected,

    #[error("Please reconnect your wallet and try again")]
    Unauthorized,

    #[error("Transaction failed. Please check your inputs and try again")]
    Reverted,

    #[error("{verb} failed: {message}")]
    Other { verb: TxVerb, code: Option<i64>, message: String },
}

/// Leading word of the generic failure message for each action family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxVerb {
    Transaction,
    Purchase,
    Withdraw,
}

impl fmt::Display for TxVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxVerb::Transaction => write!(f, "Transaction"),
            TxVerb::Purchase => write!(f, "Purchase"),
            TxVerb::Withdraw => write!(f, "Withdraw"),
        }
    }
}

impl TxError {
    /// Classify a wallet error by its provider code
    pub fn classify(err: &RpcError, verb: TxVerb) -> Self {
        match err.code {
            codes::USER_REJECTED => TxError::Rejected,
            codes::UNAUTHORIZED => TxError::Unauthorized,
            codes::INTERNAL_ERROR if verb == TxVerb::Transaction => TxError::Reverted,
            code => TxError::Other {
                verb,
                code: Some(code),
                message: err.message.clone(),
            },
        }
    }

    /// Failure with no provider code, such as a mined transaction that reverted
    pub fn failed(verb: TxVerb, message: impl Into<String>) -> Self {
        TxError::Other {
            verb,
            code: None,
            message: message.into(),
        }
    }
}

/// Why a mutation stopped before reaching confirmation
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} is not supported by this contract version")]
    Unsupported(&'static str),

    #[error("Please connect your wallet first")]
    NotConnected,

    #[error("Account access lost. Please reconnect your wallet.")]
    AccountAccessLost,

    #[error("Only the contract owner can withdraw fees")]
    NotOwner,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Transaction(#[from] TxError),
}

impl MutationError {
    pub fn validation(message: impl Into<String>) -> Self {
        MutationError::Validation(message.into())
    }
}

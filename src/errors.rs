//! Typed error taxonomy for the codec and crypto API boundaries.
//!
//! VM faults are deliberately absent here: they live on execution state as a
//! status (see `interpreter::Status`), never as a propagated `Result` error —
//! running untrusted service code to PANIC/FAULT/OOG is a normal outcome, not
//! a failure of this crate's own logic.

use thiserror::Error;

/// Errors from the primitive and domain codec layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("input truncated before expected length")]
    Truncated,
    #[error("value exceeds the representable range")]
    Overflow,
    #[error("discriminant byte is neither 0x00 nor 0x01")]
    InvalidDiscriminant,
    #[error("length does not match the fixed size required here")]
    InvalidLength,
    /// Also covers a natural encoded with a longer-than-necessary prefix: the
    /// non-canonical-natural case is folded into this tag rather than given its own.
    #[error("keys are not in strict ascending order, or a natural used a non-minimal prefix")]
    OrderingViolation,
    #[error("unrecognized variant discriminant")]
    UnknownVariant,
}

/// Errors from JIP-5 key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("trivial seed index is not representable in 32 bits")]
    InvalidIndex,
    #[error("seed must be exactly 32 bytes")]
    InvalidSeedLength,
    #[error("key must be exactly 32 bytes")]
    InvalidKeyLength,
}

/// The closed set of host-call error codes a handler returns to the guest in a register.
/// `Ok` means success, not a Rust `Result::Ok` — it is itself a wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostCallError {
    #[error("no error")]
    None,
    #[error("malformed arguments")]
    What,
    #[error("memory access out of bounds")]
    Oob,
    #[error("unknown service")]
    Who,
    #[error("resource exhausted")]
    Full,
    #[error("core-assignment conflict")]
    Core,
    #[error("insufficient balance")]
    Cash,
    #[error("balance below minimum after operation")]
    Low,
    #[error("unexpected state")]
    Huh,
    #[error("ok")]
    Ok,
}

impl HostCallError {
    /// Register encoding used by every handler: `u64::MAX` down to `u64::MAX - 8`, `Ok` = 0.
    /// Matches the `REG_*` constants in `config.rs`.
    #[must_use]
    pub const fn to_register(self) -> u64 {
        match self {
            Self::None => u64::MAX,
            Self::What => u64::MAX - 1,
            Self::Oob => u64::MAX - 2,
            Self::Who => u64::MAX - 3,
            Self::Full => u64::MAX - 4,
            Self::Core => u64::MAX - 5,
            Self::Cash => u64::MAX - 6,
            Self::Low => u64::MAX - 7,
            Self::Huh => u64::MAX - 8,
            Self::Ok => 0,
        }
    }
}

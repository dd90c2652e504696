//! Deterministic PVM interpreter and canonical codec for the JAM protocol
//! execution substrate: decode a program blob, run it against paged memory
//! under a gas meter, and dispatch any ECALLI trap to the general or
//! accumulate-only host-function registry.
//!
//! The public surface is the pair of invocation drivers in [`invocation`]
//! (`accumulate`, `refine`) plus the codec, crypto, and error types needed to
//! build their inputs and interpret their outputs. Everything below that —
//! the interpreter, the instruction table, paged RAM, the host-function
//! registries — is an implementation detail reached only through those two
//! entry points.

#![allow(dead_code)]

/// Compile-time removable logging for host calls other than LOG(100). No-op unless built with `--features host_calls_logging`.
#[macro_export]
macro_rules! host_log {
    ($($t:tt)*) => {
        #[cfg(feature = "host_calls_logging")]
        eprintln!($($t)*);
    };
}

/// Log only on error paths (PANIC, HUH, FULL). Prints when `host_calls_errors_only` or `host_calls_logging` is enabled.
#[macro_export]
macro_rules! host_log_error {
    ($($t:tt)*) => {
        #[cfg(any(feature = "host_calls_logging", feature = "host_calls_errors_only"))]
        eprintln!($($t)*);
    };
}

mod config;
mod codec;
mod crypto;
mod errors;
mod host_functions;
mod instructions;
mod interpreter;
mod invocation;
mod program;
mod ram;
mod types;

pub use codec::{
    create_preimage_key, create_request_key, create_storage_key, decode_complete_service_account,
    decode_deferred_transfer, decode_implications, decode_implications_pair, decode_partial_state,
    decode_provision_entry, decode_request_timeslots, delete_preimage_value, delete_request_value,
    delete_storage_value, encode_complete_service_account, encode_deferred_transfer, encode_implications,
    encode_implications_pair, encode_partial_state, encode_provision_entry, encode_request_timeslots,
    get_preimage_value, get_request_value, get_storage_value, set_request_value, set_storage_value,
    AccountEntry, AlwaysAccerEntry, CompleteServiceAccount, DeferredTransfer, Implications, ImplicationsPair,
    PartialState, ProvisionEntry,
};
pub use config::ProtocolConfig;
pub use crypto::blake2b256;
pub use crypto::jip5::{
    alternative_name, derive_secret_seeds, display_form, ed25519_signing_key, trivial_seed,
    SecretSeeds,
};
pub use errors::{CodecError, CryptoError, HostCallError};
pub use invocation::{accumulate, refine, AccumulateInputs, RefineInputs};
pub use types::ExecutionResult;

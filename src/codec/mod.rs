//! Codec: primitive wire encoding plus the domain types built on top of it.

pub mod domain;
pub mod primitive;

pub use domain::{
    create_preimage_key, create_request_key, create_storage_key, decode_complete_service_account,
    decode_deferred_transfer, decode_implications, decode_implications_pair, decode_partial_state,
    decode_provision_entry, decode_request_timeslots, delete_preimage_value, delete_request_value,
    delete_storage_value, encode_complete_service_account, encode_deferred_transfer, encode_implications,
    encode_implications_pair, encode_partial_state, encode_provision_entry, encode_request_timeslots,
    get_preimage_value, get_request_value, get_storage_value, set_request_value, set_storage_value,
    AccountEntry, AlwaysAccerEntry, CompleteServiceAccount, DeferredTransfer, Implications, ImplicationsPair,
    PartialState, ProvisionEntry,
};
pub use primitive::{
    decode_fixed_length, decode_natural, decode_optional, decode_variable_length, decode_variable_sequence,
    encode_fixed_length, encode_natural, encode_optional, encode_variable_length, encode_variable_sequence,
    DecodingResult,
};

//! Domain codec: service accounts, partial state, implications, deferred
//! transfers, provisions, and the storage/preimage/request key helpers.
//! Built on the primitives in [`crate::codec::primitive`].

use crate::codec::primitive::{
    check_ascending, decode_fixed_length_checked, decode_natural_checked, decode_optional,
    decode_variable_length_checked, decode_variable_sequence_checked, encode_fixed_length,
    encode_natural, encode_optional, encode_variable_length, encode_variable_sequence,
    DecodingResult,
};
use crate::crypto::blake2b256;
use crate::errors::CodecError;

const MEMO_SIZE: usize = 128;
const CSH_KEY_SIZE: usize = 31;
const VALIDATOR_KEY_SIZE: usize = 336;
const HASH_SIZE: usize = 32;

/// A service account with its raw `C(s,h)` key-value store. `octets`/`items` are
/// never serialized; they are recomputed on decode by summing over `raw_csh_keyvals`.
#[derive(Clone, Debug, Default)]
pub struct CompleteServiceAccount {
    pub codehash: [u8; 32],
    pub balance: u64,
    pub minaccgas: u64,
    pub minmemogas: u64,
    pub gratis: u64,
    pub created: u64,
    pub lastacc: u64,
    pub parent: u64,
    pub raw_csh_keyvals: Vec<(Vec<u8>, Vec<u8>)>,
}

impl CompleteServiceAccount {
    /// Sum of value lengths across the key-value store (recomputed, never stored).
    #[must_use]
    pub fn octets(&self) -> u64 {
        self.raw_csh_keyvals.iter().map(|(_, v)| v.len() as u64).sum()
    }

    /// Number of key-value entries (recomputed, never stored).
    #[must_use]
    pub fn items(&self) -> u64 {
        self.raw_csh_keyvals.len() as u64
    }
}

/// Account entry: (service id, account), as found in a partial state's account list.
#[derive(Clone, Debug, Default)]
pub struct AccountEntry {
    pub service_id: u64,
    pub account: CompleteServiceAccount,
}

/// Always-accumulate entry: (service id, gas).
#[derive(Clone, Debug, Default)]
pub struct AlwaysAccerEntry {
    pub service_id: u64,
    pub gas: u64,
}

/// Deferred transfer: source, destination, amount, 128-byte memo, per-transfer gas limit.
#[derive(Clone, Debug, Default)]
pub struct DeferredTransfer {
    pub source: u64,
    pub dest: u64,
    pub amount: u64,
    pub memo: Vec<u8>,
    pub gas_limit: u64,
}

/// Provision: a (service id, blob) tuple. Provisions form an ordered *set* of
/// tuples, not a map — two provisions may share a service id with distinct blobs.
#[derive(Clone, Debug, Default)]
pub struct ProvisionEntry {
    pub service_id: u64,
    pub blob: Vec<u8>,
}

/// Partial state: accounts, staging validator set, per-core auth queues, the
/// manager/assigner/delegator/registrar service ids, and always-accumulate gas grants.
#[derive(Clone, Debug, Default)]
pub struct PartialState {
    pub accounts: Vec<AccountEntry>,
    pub stagingset: Vec<Vec<u8>>,
    pub authqueue: Vec<Vec<Vec<u8>>>,
    pub manager: u64,
    pub assigners: Vec<u64>,
    pub delegator: u64,
    pub registrar: u64,
    pub alwaysaccers: Vec<AlwaysAccerEntry>,
}

/// Implications: the output of one accumulation invocation for one service.
#[derive(Clone, Debug, Default)]
pub struct Implications {
    pub id: u64,
    pub state: PartialState,
    pub nextfreeid: u64,
    pub xfers: Vec<DeferredTransfer>,
    pub yield_hash: Option<Vec<u8>>,
    pub provisions: Vec<ProvisionEntry>,
}

/// Implications pair: always exactly (regular, exceptional).
#[derive(Clone, Debug, Default)]
pub struct ImplicationsPair {
    pub regular: Implications,
    pub exceptional: Implications,
}

// ============================================================================
// CompleteServiceAccount
// ============================================================================

/// Decode: codehash[32] ‖ natural(balance) ‖ natural(minaccgas) ‖ natural(minmemogas)
/// ‖ natural(gratis) ‖ natural(created) ‖ natural(lastacc) ‖ natural(parent) ‖
/// variable sequence of (31-byte key, variable blob).
pub fn decode_complete_service_account(
    data: &[u8],
) -> Result<DecodingResult<CompleteServiceAccount>, CodecError> {
    if data.len() < 32 {
        return Err(CodecError::Truncated);
    }
    let mut codehash = [0u8; 32];
    codehash.copy_from_slice(&data[..32]);
    let mut offset = 32usize;

    macro_rules! next_natural {
        () => {{
            let r = decode_natural_checked(&data[offset..])?;
            offset += r.consumed as usize;
            r.value
        }};
    }
    let balance = next_natural!();
    let minaccgas = next_natural!();
    let minmemogas = next_natural!();
    let gratis = next_natural!();
    let created = next_natural!();
    let lastacc = next_natural!();
    let parent = next_natural!();

    let keyvals_result = decode_variable_sequence_checked(&data[offset..], |d| {
        if d.len() < CSH_KEY_SIZE {
            return Err(CodecError::Truncated);
        }
        let key = d[..CSH_KEY_SIZE].to_vec();
        let blob_result = decode_variable_length_checked(&d[CSH_KEY_SIZE..])?;
        Ok(DecodingResult::new(
            (key, blob_result.value),
            CSH_KEY_SIZE as i32 + blob_result.consumed,
        ))
    })?;
    offset += keyvals_result.consumed as usize;

    Ok(DecodingResult::new(
        CompleteServiceAccount {
            codehash,
            balance,
            minaccgas,
            minmemogas,
            gratis,
            created,
            lastacc,
            parent,
            raw_csh_keyvals: keyvals_result.value,
        },
        offset as i32,
    ))
}

/// Encode `CompleteServiceAccount` (same field order as decode; `octets`/`items` omitted).
#[must_use]
pub fn encode_complete_service_account(account: &CompleteServiceAccount) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + account.raw_csh_keyvals.len() * 40);
    out.extend_from_slice(&account.codehash);
    out.extend_from_slice(&encode_natural(account.balance));
    out.extend_from_slice(&encode_natural(account.minaccgas));
    out.extend_from_slice(&encode_natural(account.minmemogas));
    out.extend_from_slice(&encode_natural(account.gratis));
    out.extend_from_slice(&encode_natural(account.created));
    out.extend_from_slice(&encode_natural(account.lastacc));
    out.extend_from_slice(&encode_natural(account.parent));

    let mut len_bytes = encode_natural(account.raw_csh_keyvals.len() as u64);
    out.append(&mut len_bytes);
    for (k, v) in &account.raw_csh_keyvals {
        out.extend_from_slice(k);
        out.extend_from_slice(&encode_variable_length(v));
    }
    out
}

// ============================================================================
// DeferredTransfer
// ============================================================================

/// Decode a deferred transfer: source:natural, dest:natural, amount:natural,
/// memo (exactly 128 raw bytes), gasLimit:natural.
pub fn decode_deferred_transfer(data: &[u8]) -> Result<DecodingResult<DeferredTransfer>, CodecError> {
    let mut offset = 0usize;
    let source_result = decode_natural_checked(data)?;
    offset += source_result.consumed as usize;
    let dest_result = decode_natural_checked(&data[offset..])?;
    offset += dest_result.consumed as usize;
    let amount_result = decode_natural_checked(&data[offset..])?;
    offset += amount_result.consumed as usize;

    if data.len() < offset + MEMO_SIZE {
        return Err(CodecError::Truncated);
    }
    let memo = data[offset..offset + MEMO_SIZE].to_vec();
    offset += MEMO_SIZE;

    let gas_result = decode_natural_checked(&data[offset..])?;
    offset += gas_result.consumed as usize;

    Ok(DecodingResult::new(
        DeferredTransfer {
            source: source_result.value,
            dest: dest_result.value,
            amount: amount_result.value,
            memo,
            gas_limit: gas_result.value,
        },
        offset as i32,
    ))
}

/// Encode a deferred transfer. Fails with `InvalidLength` unless `memo` is exactly 128 bytes.
pub fn encode_deferred_transfer(transfer: &DeferredTransfer) -> Result<Vec<u8>, CodecError> {
    if transfer.memo.len() != MEMO_SIZE {
        return Err(CodecError::InvalidLength);
    }
    let mut out = encode_natural(transfer.source);
    out.extend_from_slice(&encode_natural(transfer.dest));
    out.extend_from_slice(&encode_natural(transfer.amount));
    out.extend_from_slice(&transfer.memo);
    out.extend_from_slice(&encode_natural(transfer.gas_limit));
    Ok(out)
}

// ============================================================================
// ProvisionEntry
// ============================================================================

/// Decode a provision: serviceid:natural ‖ variable blob.
pub fn decode_provision_entry(data: &[u8]) -> Result<DecodingResult<ProvisionEntry>, CodecError> {
    let sid_result = decode_natural_checked(data)?;
    let offset = sid_result.consumed as usize;
    let blob_result = decode_variable_length_checked(&data[offset..])?;
    Ok(DecodingResult::new(
        ProvisionEntry {
            service_id: sid_result.value,
            blob: blob_result.value,
        },
        offset as i32 + blob_result.consumed,
    ))
}

/// Encode a provision.
#[must_use]
pub fn encode_provision_entry(entry: &ProvisionEntry) -> Vec<u8> {
    let mut out = encode_natural(entry.service_id);
    out.extend_from_slice(&encode_variable_length(&entry.blob));
    out
}

// ============================================================================
// PartialState
// ============================================================================

/// Decode a partial state. `num_cores`/`num_validators`/`auth_queue_size` come from
/// the `ProtocolConfig` in effect for this invocation, threaded explicitly rather
/// than assumed from a hardcoded default.
pub fn decode_partial_state(
    data: &[u8],
    num_cores: u32,
    num_validators: u32,
    auth_queue_size: u32,
) -> Result<DecodingResult<PartialState>, CodecError> {
    let num_cores = num_cores as usize;
    let num_validators = num_validators as usize;
    let auth_queue_size = auth_queue_size as usize;

    let accounts_result = decode_variable_sequence_checked(data, |d| {
        let sid_result = decode_natural_checked(d)?;
        let account_result = decode_complete_service_account(&d[sid_result.consumed as usize..])?;
        Ok(DecodingResult::new(
            AccountEntry {
                service_id: sid_result.value,
                account: account_result.value,
            },
            sid_result.consumed + account_result.consumed,
        ))
    })?;
    check_ascending(&accounts_result.value.iter().map(|e| e.service_id).collect::<Vec<_>>())?;
    let mut offset = accounts_result.consumed as usize;

    let stagingset_size = num_validators * VALIDATOR_KEY_SIZE;
    if data.len() < offset + stagingset_size {
        return Err(CodecError::Truncated);
    }
    let mut stagingset = Vec::with_capacity(num_validators);
    for i in 0..num_validators {
        let start = offset + i * VALIDATOR_KEY_SIZE;
        stagingset.push(data[start..start + VALIDATOR_KEY_SIZE].to_vec());
    }
    offset += stagingset_size;

    let core_queue_size = auth_queue_size * HASH_SIZE;
    let authqueue_size = num_cores * core_queue_size;
    if data.len() < offset + authqueue_size {
        return Err(CodecError::Truncated);
    }
    let mut authqueue = Vec::with_capacity(num_cores);
    for c in 0..num_cores {
        let mut queue = Vec::with_capacity(auth_queue_size);
        for a in 0..auth_queue_size {
            let start = offset + c * core_queue_size + a * HASH_SIZE;
            queue.push(data[start..start + HASH_SIZE].to_vec());
        }
        authqueue.push(queue);
    }
    offset += authqueue_size;

    let manager_result = decode_natural_checked(&data[offset..])?;
    offset += manager_result.consumed as usize;

    let mut assigners = Vec::with_capacity(num_cores);
    for _ in 0..num_cores {
        let r = decode_natural_checked(&data[offset..])?;
        offset += r.consumed as usize;
        assigners.push(r.value);
    }

    let delegator_result = decode_natural_checked(&data[offset..])?;
    offset += delegator_result.consumed as usize;
    let registrar_result = decode_natural_checked(&data[offset..])?;
    offset += registrar_result.consumed as usize;

    let alwaysaccers_result = decode_variable_sequence_checked(&data[offset..], |d| {
        let sid_result = decode_natural_checked(d)?;
        let gas_result = decode_natural_checked(&d[sid_result.consumed as usize..])?;
        Ok(DecodingResult::new(
            AlwaysAccerEntry {
                service_id: sid_result.value,
                gas: gas_result.value,
            },
            sid_result.consumed + gas_result.consumed,
        ))
    })?;
    check_ascending(
        &alwaysaccers_result
            .value
            .iter()
            .map(|e| e.service_id)
            .collect::<Vec<_>>(),
    )?;
    offset += alwaysaccers_result.consumed as usize;

    Ok(DecodingResult::new(
        PartialState {
            accounts: accounts_result.value,
            stagingset,
            authqueue,
            manager: manager_result.value,
            assigners,
            delegator: delegator_result.value,
            registrar: registrar_result.value,
            alwaysaccers: alwaysaccers_result.value,
        },
        offset as i32,
    ))
}

/// Encode a partial state (caller must supply the matching protocol constants).
#[must_use]
pub fn encode_partial_state(
    state: &PartialState,
    num_cores: u32,
    num_validators: u32,
    auth_queue_size: u32,
) -> Vec<u8> {
    let num_cores = num_cores as usize;
    let num_validators = num_validators as usize;
    let auth_queue_size = auth_queue_size as usize;

    let account_elements: Vec<Vec<u8>> = state
        .accounts
        .iter()
        .map(|e| {
            let mut v = encode_natural(e.service_id);
            v.extend_from_slice(&encode_complete_service_account(&e.account));
            v
        })
        .collect();
    let mut out = encode_natural(account_elements.len() as u64);
    for e in &account_elements {
        out.extend_from_slice(e);
    }

    for i in 0..num_validators {
        if i < state.stagingset.len() && state.stagingset[i].len() == VALIDATOR_KEY_SIZE {
            out.extend_from_slice(&state.stagingset[i]);
        } else {
            out.extend_from_slice(&[0u8; VALIDATOR_KEY_SIZE]);
        }
    }

    for c in 0..num_cores {
        for a in 0..auth_queue_size {
            if c < state.authqueue.len() && a < state.authqueue[c].len() && state.authqueue[c][a].len() == HASH_SIZE {
                out.extend_from_slice(&state.authqueue[c][a]);
            } else {
                out.extend_from_slice(&[0u8; HASH_SIZE]);
            }
        }
    }

    out.extend_from_slice(&encode_natural(state.manager));
    for i in 0..num_cores {
        out.extend_from_slice(&encode_natural(state.assigners.get(i).copied().unwrap_or(0)));
    }
    out.extend_from_slice(&encode_natural(state.delegator));
    out.extend_from_slice(&encode_natural(state.registrar));

    let always_elements: Vec<Vec<u8>> = state
        .alwaysaccers
        .iter()
        .map(|e| {
            let mut v = encode_natural(e.service_id);
            v.extend_from_slice(&encode_natural(e.gas));
            v
        })
        .collect();
    out.extend_from_slice(&encode_natural(always_elements.len() as u64));
    for e in &always_elements {
        out.extend_from_slice(e);
    }

    out
}

// ============================================================================
// Implications / ImplicationsPair
// ============================================================================

/// Decode implications: id:natural, state, nextfreeid:natural, xfers, yield:
/// optional 32 bytes, provisions (sorted by service id, ties broken by blob).
pub fn decode_implications(
    data: &[u8],
    num_cores: u32,
    num_validators: u32,
    auth_queue_size: u32,
) -> Result<DecodingResult<Implications>, CodecError> {
    let id_result = decode_natural_checked(data)?;
    let mut offset = id_result.consumed as usize;

    let state_result = decode_partial_state(&data[offset..], num_cores, num_validators, auth_queue_size)?;
    offset += state_result.consumed as usize;

    let nextfreeid_result = decode_natural_checked(&data[offset..])?;
    offset += nextfreeid_result.consumed as usize;

    let xfers_result = decode_variable_sequence_checked(&data[offset..], decode_deferred_transfer)?;
    offset += xfers_result.consumed as usize;

    let yield_result = decode_optional(&data[offset..], |d| {
        if d.len() < HASH_SIZE {
            return Err(CodecError::Truncated);
        }
        Ok(DecodingResult::new(d[..HASH_SIZE].to_vec(), HASH_SIZE as i32))
    })?;
    offset += yield_result.consumed as usize;

    let provisions_result = decode_variable_sequence_checked(&data[offset..], decode_provision_entry)?;
    check_ascending(
        &provisions_result
            .value
            .iter()
            .map(|e| (e.service_id, e.blob.clone()))
            .collect::<Vec<_>>(),
    )?;
    offset += provisions_result.consumed as usize;

    Ok(DecodingResult::new(
        Implications {
            id: id_result.value,
            state: state_result.value,
            nextfreeid: nextfreeid_result.value,
            xfers: xfers_result.value,
            yield_hash: yield_result.value,
            provisions: provisions_result.value,
        },
        offset as i32,
    ))
}

/// Encode implications.
pub fn encode_implications(
    implications: &Implications,
    num_cores: u32,
    num_validators: u32,
    auth_queue_size: u32,
) -> Result<Vec<u8>, CodecError> {
    let mut out = encode_natural(implications.id);
    out.extend_from_slice(&encode_partial_state(
        &implications.state,
        num_cores,
        num_validators,
        auth_queue_size,
    ));
    out.extend_from_slice(&encode_natural(implications.nextfreeid));

    let mut xfer_bytes = Vec::new();
    for t in &implications.xfers {
        xfer_bytes.push(encode_deferred_transfer(t)?);
    }
    out.extend_from_slice(&encode_variable_sequence(&xfer_bytes));

    out.extend_from_slice(&encode_optional(implications.yield_hash.as_ref(), |h| h.clone()));

    let prov_bytes: Vec<Vec<u8>> = implications.provisions.iter().map(encode_provision_entry).collect();
    out.extend_from_slice(&encode_variable_sequence(&prov_bytes));
    Ok(out)
}

/// Decode an implications pair: always exactly (regular, exceptional).
pub fn decode_implications_pair(
    data: &[u8],
    num_cores: u32,
    num_validators: u32,
    auth_queue_size: u32,
) -> Result<DecodingResult<ImplicationsPair>, CodecError> {
    let regular_result = decode_implications(data, num_cores, num_validators, auth_queue_size)?;
    let regular_consumed = regular_result.consumed as usize;
    let exceptional_result = decode_implications(
        &data[regular_consumed..],
        num_cores,
        num_validators,
        auth_queue_size,
    )?;
    let total_consumed = regular_consumed + exceptional_result.consumed as usize;
    Ok(DecodingResult::new(
        ImplicationsPair {
            regular: regular_result.value,
            exceptional: exceptional_result.value,
        },
        total_consumed as i32,
    ))
}

/// Encode an implications pair.
pub fn encode_implications_pair(
    pair: &ImplicationsPair,
    num_cores: u32,
    num_validators: u32,
    auth_queue_size: u32,
) -> Result<Vec<u8>, CodecError> {
    let mut out = encode_implications(&pair.regular, num_cores, num_validators, auth_queue_size)?;
    out.extend_from_slice(&encode_implications(
        &pair.exceptional,
        num_cores,
        num_validators,
        auth_queue_size,
    )?);
    Ok(out)
}

// ============================================================================
// CSH key helpers: C(s,h) = interleave(encode[4](s), blake2b256(combined)[..27])
// ============================================================================

const STORAGE_PREFIX: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
const PREIMAGE_PREFIX: [u8; 4] = [0xfe, 0xff, 0xff, 0xff];

/// Build the 31-byte `C(s,h)` key. The service id is truncated to its low 32 bits
/// for the interleaving step; this matches the Gray Paper key-derivation function,
/// which predates the wider 64-bit service-id range and still only interleaves 4 bytes.
fn create_csh_key(service_id: u64, combined: &[u8]) -> [u8; CSH_KEY_SIZE] {
    let hash = blake2b256(combined);
    let blake27 = &hash[..27];
    let sid = (service_id as u32).to_le_bytes();
    let mut key = [0u8; CSH_KEY_SIZE];
    key[0] = sid[0];
    key[1] = blake27[0];
    key[2] = sid[1];
    key[3] = blake27[1];
    key[4] = sid[2];
    key[5] = blake27[2];
    key[6] = sid[3];
    key[7] = blake27[3];
    key[8..31].copy_from_slice(&blake27[4..27]);
    key
}

/// Create the storage state key: `C(s, blake2b256(encode[4]{2^32-1} || k))`.
#[must_use]
pub fn create_storage_key(service_id: u64, storage_key: &[u8]) -> [u8; CSH_KEY_SIZE] {
    let mut combined = Vec::with_capacity(4 + storage_key.len());
    combined.extend_from_slice(&STORAGE_PREFIX);
    combined.extend_from_slice(storage_key);
    create_csh_key(service_id, &combined)
}

/// Create the preimage state key: `C(s, blake2b256(encode[4]{2^32-2} || h))`.
#[must_use]
pub fn create_preimage_key(service_id: u64, preimage_hash: &[u8]) -> [u8; CSH_KEY_SIZE] {
    let mut combined = Vec::with_capacity(4 + preimage_hash.len());
    combined.extend_from_slice(&PREIMAGE_PREFIX);
    combined.extend_from_slice(preimage_hash);
    create_csh_key(service_id, &combined)
}

/// Create the request state key: `C(s, blake2b256(encode[4]{length} || h))`.
#[must_use]
pub fn create_request_key(service_id: u64, request_hash: &[u8], length: u64) -> [u8; CSH_KEY_SIZE] {
    let mut combined = Vec::with_capacity(4 + request_hash.len());
    combined.extend_from_slice(&(length as u32).to_le_bytes());
    combined.extend_from_slice(request_hash);
    create_csh_key(service_id, &combined)
}

fn raw_get(keyvals: &[(Vec<u8>, Vec<u8>)], key: &[u8]) -> Option<Vec<u8>> {
    keyvals.iter().find(|(k, _)| k.as_slice() == key).map(|(_, v)| v.clone())
}

fn raw_set(keyvals: &mut Vec<(Vec<u8>, Vec<u8>)>, key: &[u8], value: Vec<u8>) {
    for (k, v) in keyvals.iter_mut() {
        if k.as_slice() == key {
            *v = value;
            return;
        }
    }
    keyvals.push((key.to_vec(), value));
}

fn raw_delete(keyvals: &mut Vec<(Vec<u8>, Vec<u8>)>, key: &[u8]) -> bool {
    if let Some(pos) = keyvals.iter().position(|(k, _)| k.as_slice() == key) {
        keyvals.remove(pos);
        true
    } else {
        false
    }
}

/// Get a storage value from an account by key.
#[must_use]
pub fn get_storage_value(account: &CompleteServiceAccount, service_id: u64, storage_key: &[u8]) -> Option<Vec<u8>> {
    raw_get(&account.raw_csh_keyvals, &create_storage_key(service_id, storage_key))
}

/// Set a storage value in an account.
pub fn set_storage_value(account: &mut CompleteServiceAccount, service_id: u64, storage_key: &[u8], value: Vec<u8>) {
    let key = create_storage_key(service_id, storage_key);
    raw_set(&mut account.raw_csh_keyvals, &key, value);
}

/// Delete a storage value; returns whether the key existed.
pub fn delete_storage_value(account: &mut CompleteServiceAccount, service_id: u64, storage_key: &[u8]) -> bool {
    let key = create_storage_key(service_id, storage_key);
    raw_delete(&mut account.raw_csh_keyvals, &key)
}

/// Get a request value (encoded timeslots) from an account.
#[must_use]
pub fn get_request_value(
    account: &CompleteServiceAccount,
    service_id: u64,
    request_hash: &[u8],
    length: u64,
) -> Option<Vec<u8>> {
    raw_get(&account.raw_csh_keyvals, &create_request_key(service_id, request_hash, length))
}

/// Set a request value (encoded timeslots) in an account.
pub fn set_request_value(
    account: &mut CompleteServiceAccount,
    service_id: u64,
    request_hash: &[u8],
    length: u64,
    value: Vec<u8>,
) {
    let key = create_request_key(service_id, request_hash, length);
    raw_set(&mut account.raw_csh_keyvals, &key, value);
}

/// Delete a request value; returns whether the key existed.
pub fn delete_request_value(
    account: &mut CompleteServiceAccount,
    service_id: u64,
    request_hash: &[u8],
    length: u64,
) -> bool {
    let key = create_request_key(service_id, request_hash, length);
    raw_delete(&mut account.raw_csh_keyvals, &key)
}

/// Delete a preimage value; returns whether the key existed.
pub fn delete_preimage_value(account: &mut CompleteServiceAccount, service_id: u64, preimage_hash: &[u8]) -> bool {
    let key = create_preimage_key(service_id, preimage_hash);
    raw_delete(&mut account.raw_csh_keyvals, &key)
}

/// Get a preimage value by hash.
#[must_use]
pub fn get_preimage_value(account: &CompleteServiceAccount, service_id: u64, preimage_hash: &[u8]) -> Option<Vec<u8>> {
    raw_get(&account.raw_csh_keyvals, &create_preimage_key(service_id, preimage_hash))
}

/// Encode request timeslots: variable sequence of fixed-4-byte little-endian values.
#[must_use]
pub fn encode_request_timeslots(timeslots: &[u32]) -> Vec<u8> {
    let elements: Vec<Vec<u8>> = timeslots.iter().map(|&t| encode_fixed_length(u64::from(t), 4)).collect();
    encode_variable_sequence(&elements)
}

/// Decode request timeslots: variable sequence of fixed-4-byte little-endian values.
pub fn decode_request_timeslots(value: &[u8]) -> Result<Vec<u32>, CodecError> {
    let result = decode_variable_sequence_checked(value, |d| {
        let r = decode_fixed_length_checked(d, 4)?;
        Ok(DecodingResult::new(r.value as u32, r.consumed))
    })?;
    Ok(result.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> CompleteServiceAccount {
        CompleteServiceAccount {
            codehash: [7u8; 32],
            balance: 1_000_000,
            minaccgas: 100,
            minmemogas: 200,
            gratis: 0,
            created: 5,
            lastacc: 9,
            parent: 1,
            raw_csh_keyvals: vec![(vec![1u8; CSH_KEY_SIZE], vec![9, 9, 9])],
        }
    }

    #[test]
    fn service_account_round_trips() {
        let account = sample_account();
        let encoded = encode_complete_service_account(&account);
        let decoded = decode_complete_service_account(&encoded).unwrap();
        assert_eq!(decoded.value.balance, account.balance);
        assert_eq!(decoded.value.raw_csh_keyvals, account.raw_csh_keyvals);
        assert_eq!(decoded.consumed as usize, encoded.len());
    }

    #[test]
    fn service_account_octets_and_items_are_recomputed() {
        let account = sample_account();
        assert_eq!(account.items(), 1);
        assert_eq!(account.octets(), 3);
    }

    #[test]
    fn deferred_transfer_requires_exact_memo_length() {
        let transfer = DeferredTransfer {
            source: 1,
            dest: 2,
            amount: 10,
            memo: vec![0u8; 64],
            gas_limit: 500,
        };
        assert_eq!(encode_deferred_transfer(&transfer), Err(CodecError::InvalidLength));
    }

    #[test]
    fn deferred_transfer_round_trips() {
        let transfer = DeferredTransfer {
            source: 1,
            dest: 2,
            amount: 10,
            memo: vec![0xab; MEMO_SIZE],
            gas_limit: 500,
        };
        let encoded = encode_deferred_transfer(&transfer).unwrap();
        let decoded = decode_deferred_transfer(&encoded).unwrap();
        assert_eq!(decoded.value.source, 1);
        assert_eq!(decoded.value.dest, 2);
        assert_eq!(decoded.value.memo, vec![0xab; MEMO_SIZE]);
    }

    #[test]
    fn partial_state_round_trips_with_zero_dimensions() {
        let state = PartialState::default();
        let encoded = encode_partial_state(&state, 0, 0, 0);
        let decoded = decode_partial_state(&encoded, 0, 0, 0).unwrap();
        assert_eq!(decoded.value.manager, 0);
        assert!(decoded.value.accounts.is_empty());
    }

    #[test]
    fn implications_pair_round_trips() {
        let implications = Implications {
            id: 1,
            state: PartialState::default(),
            nextfreeid: 2,
            xfers: vec![],
            yield_hash: Some(vec![0x42; HASH_SIZE]),
            provisions: vec![ProvisionEntry {
                service_id: 3,
                blob: vec![1, 2, 3],
            }],
        };
        let pair = ImplicationsPair {
            regular: implications.clone(),
            exceptional: implications,
        };
        let encoded = encode_implications_pair(&pair, 0, 0, 0).unwrap();
        let decoded = decode_implications_pair(&encoded, 0, 0, 0).unwrap();
        assert_eq!(decoded.value.regular.id, 1);
        assert_eq!(decoded.value.regular.yield_hash, Some(vec![0x42; HASH_SIZE]));
        assert_eq!(decoded.value.exceptional.provisions.len(), 1);
    }

    #[test]
    fn storage_key_round_trips_through_raw_keyvals() {
        let mut account = CompleteServiceAccount::default();
        set_storage_value(&mut account, 7, b"key", vec![1, 2, 3]);
        assert_eq!(get_storage_value(&account, 7, b"key"), Some(vec![1, 2, 3]));
        assert!(delete_storage_value(&mut account, 7, b"key"));
        assert_eq!(get_storage_value(&account, 7, b"key"), None);
    }

    #[test]
    fn request_timeslots_round_trip() {
        let timeslots = vec![10u32, 20, 30];
        let encoded = encode_request_timeslots(&timeslots);
        let decoded = decode_request_timeslots(&encoded).unwrap();
        assert_eq!(decoded, timeslots);
    }

    #[test]
    fn accounts_must_be_strictly_ascending_by_service_id() {
        let state = PartialState {
            accounts: vec![
                AccountEntry {
                    service_id: 2,
                    account: CompleteServiceAccount::default(),
                },
                AccountEntry {
                    service_id: 1,
                    account: CompleteServiceAccount::default(),
                },
            ],
            ..Default::default()
        };
        let encoded = encode_partial_state(&state, 0, 0, 0);
        assert_eq!(decode_partial_state(&encoded, 0, 0, 0).unwrap_err(), CodecError::OrderingViolation);
    }
}

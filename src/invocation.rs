//! Invocation drivers: the top-level entry points that decode a program, run it
//! to completion against a PVM instance, service any ECALLI traps by dispatching
//! to the host-function registries, and marshal the result back out.
//!
//! Both [`accumulate`] and [`refine`] share the same fetch-decode-run shape
//! (Gray Paper: one deterministic `Ψ`-style invocation per call) but differ in
//! initial program counter, in which host-call subset is reachable, and in
//! whether there is any service-state context to thread through and roll back.

use std::collections::HashMap;

use crate::codec::{AccountEntry, CompleteServiceAccount, ImplicationsPair};
use crate::config::{ProtocolConfig, ARGS_SEGMENT_START, GAS_HOST_CALL_BASE, HALT_ADDRESS, STACK_SEGMENT_END};
use crate::host_functions::base::{AssignState, BlessState, HostFunctionContext, HostFunctionResult};
use crate::host_functions::refine::RefineContext;
use crate::host_functions::refine_machine::PvmRefineContext;
use crate::host_functions::{get_general_host_function, get_host_function};
use crate::interpreter::{ExecState, Status};
use crate::program::{decode_blob, decode_program_from_preimage};
use crate::ram::PvmRam;
use crate::types::{ExecutionResult, Ram, RegisterState};

/// Registers are all zero at invocation start except the three fixed pointers the
/// Gray Paper wires up before jumping to the program's entry point.
fn initial_registers(args_len: u32) -> RegisterState {
    let mut registers: RegisterState = [0; 13];
    registers[0] = u64::from(HALT_ADDRESS);
    registers[1] = u64::from(STACK_SEGMENT_END);
    registers[7] = u64::from(ARGS_SEGMENT_START);
    registers[8] = u64::from(args_len);
    registers
}

/// Decode a preimage-wrapped program blob into a ready-to-run `ExecState`, or
/// `None` if the blob is malformed in a way that must PANIC the invocation
/// before a single instruction runs.
fn load_program(program: &[u8], args: &[u8], initial_pc: u32, gas_limit: u32) -> Option<ExecState> {
    let decoded = decode_program_from_preimage(program)?;
    let blob = decode_blob(&decoded.code)?;

    let mut ram = PvmRam::new();
    ram.initialize_memory_layout(
        args,
        &decoded.ro_data,
        &decoded.rw_data,
        decoded.stack_size,
        decoded.heap_zero_padding_size,
    );

    Some(ExecState::new(
        blob.code,
        blob.bitmask,
        blob.jump_table,
        initial_registers(args.len() as u32),
        initial_pc,
        gas_limit,
        Box::new(ram),
    ))
}

/// Map a terminal [`HostFunctionResult`] code back to the matching [`Status`].
fn status_from_host_result(result: &HostFunctionResult) -> Status {
    use crate::config::{RESULT_CODE_FAULT, RESULT_CODE_HALT, RESULT_CODE_OOG, RESULT_CODE_PANIC};
    match result.result_code {
        RESULT_CODE_HALT => Status::Halt,
        RESULT_CODE_FAULT => Status::Fault,
        RESULT_CODE_OOG => Status::Oog,
        RESULT_CODE_PANIC => Status::Panic,
        _ => Status::Panic,
    }
}

/// Extract the halt-time return blob per the `[r7, r7+r8)` memory-range convention
/// shared with the inner invoke machines' register layout. A fault or zero length
/// yields an empty blob rather than propagating a fault from an otherwise-clean halt.
fn extract_return_blob(exec: &mut ExecState) -> Vec<u8> {
    let offset = exec.registers()[7] as u32;
    let length = exec.registers()[8] as u32;
    if length == 0 {
        return Vec::new();
    }
    let read = exec.ram_mut().read_octets(offset, length);
    if read.fault_address != 0 {
        return Vec::new();
    }
    read.data.unwrap_or_default()
}

fn accounts_to_map(accounts: &[AccountEntry]) -> HashMap<u64, CompleteServiceAccount> {
    accounts
        .iter()
        .map(|entry| (entry.service_id, entry.account.clone()))
        .collect()
}

fn map_to_accounts(map: HashMap<u64, CompleteServiceAccount>) -> Vec<AccountEntry> {
    let mut entries: Vec<AccountEntry> = map
        .into_iter()
        .map(|(service_id, account)| AccountEntry { service_id, account })
        .collect();
    entries.sort_by_key(|entry| entry.service_id);
    entries
}

/// Inputs to [`accumulate`]. Bundled in a struct (rather than a long positional
/// parameter list) since several are optional depending on what the caller has on
/// hand for this invocation's FETCH selectors.
pub struct AccumulateInputs<'a> {
    pub gas_limit: u32,
    pub program: &'a [u8],
    pub args: &'a [u8],
    pub context: ImplicationsPair,
    pub entropy_accumulator: &'a [u8],
    pub work_item_summaries: &'a [Vec<u8>],
    pub accumulate_inputs: &'a [Vec<u8>],
    pub timeslot: u64,
    pub config: &'a ProtocolConfig,
}

/// Run one service's accumulation. Deterministic: identical inputs (including
/// `config`) always produce byte-identical outputs. Never fails — a malformed
/// program, a guest PANIC/FAULT, or running out of gas are all regular outcomes
/// folded into the returned `ExecutionResult`, never a Rust `Err`.
#[must_use]
#[tracing::instrument(name = "accumulate", skip(inputs), fields(service = inputs.context.regular.id))]
pub fn accumulate(inputs: AccumulateInputs<'_>) -> (u32, ExecutionResult, ImplicationsPair) {
    let AccumulateInputs {
        gas_limit,
        program,
        args,
        context,
        entropy_accumulator,
        work_item_summaries,
        accumulate_inputs,
        timeslot,
        config,
    } = inputs;

    let Some(mut exec) = load_program(program, args, 5, gas_limit) else {
        return (0, ExecutionResult::from_panic(), context);
    };

    let original_context = context.clone();
    let mut working = context;
    // Invocation start counts as an implicit checkpoint: absent any CHECKPOINT
    // call, a panic/fault rolls all the way back to the initial state.
    working.exceptional = working.regular.clone();

    loop {
        match exec.run_until_halt() {
            Status::Halt => {
                let output = extract_return_blob(&mut exec);
                let gas_consumed = gas_limit.saturating_sub(exec.gas_remaining());
                tracing::trace!(gas_consumed, output_len = output.len(), "accumulate halted");
                return (gas_consumed, ExecutionResult::from_data(output), working);
            }
            Status::Panic | Status::Fault => {
                working.regular = working.exceptional.clone();
                let gas_consumed = gas_limit.saturating_sub(exec.gas_remaining());
                tracing::debug!(gas_consumed, "accumulate trapped, rolled back to last checkpoint");
                return (gas_consumed, ExecutionResult::from_panic(), working);
            }
            Status::Oog => {
                tracing::debug!("accumulate ran out of gas, discarding invocation");
                return (gas_limit, ExecutionResult::from_oog(), original_context);
            }
            Status::Running => unreachable!("run_until_halt only returns on a non-Running status"),
            Status::Host => {
                let call_id = exec.host_call_id();

                if exec.gas_remaining() < GAS_HOST_CALL_BASE {
                    exec.set_gas_remaining(0);
                    exec.set_status(Status::Oog);
                    continue;
                }
                exec.set_gas_remaining(exec.gas_remaining() - GAS_HOST_CALL_BASE);

                let Some(handler) = get_host_function(call_id) else {
                    exec.set_status(Status::Panic);
                    continue;
                };

                let mut registers = *exec.registers();
                let mut gas_remaining = exec.gas_remaining();
                let mut checkpoint_requested = false;
                let mut accounts_map = accounts_to_map(&working.regular.state.accounts);
                // The accumulating service's own account is exposed to host functions
                // both as an entry in `accounts_map` (for e.g. TRANSFER's dest lookup)
                // and as this separate clone, which several host functions (NEW,
                // UPGRADE, TRANSFER, EJECT, FORGET, SOLICIT, QUERY) read/mutate in
                // preference to looking it up by id, since a HashMap entry can't be
                // borrowed alongside the map itself.
                let mut current_account = accounts_map.get(&working.regular.id).cloned();
                let mut bless_state = BlessState {
                    manager: working.regular.state.manager,
                    delegator: working.regular.state.delegator,
                    registrar: working.regular.state.registrar,
                    assigners: working.regular.state.assigners.clone(),
                    alwaysaccers: working.regular.state.alwaysaccers.clone(),
                };
                let mut assign_state = AssignState {
                    assigners: working.regular.state.assigners.clone(),
                    authqueue: working.regular.state.authqueue.clone(),
                };
                let mut nextfreeid = working.regular.nextfreeid;
                let mut stagingset = working.regular.state.stagingset.clone();
                let mut yield_hash = working.regular.yield_hash.clone();
                let mut provisions = working.regular.provisions.clone();
                let mut xfers = working.regular.xfers.clone();

                let result = {
                    let mut host_ctx = HostFunctionContext {
                        registers: &mut registers,
                        ram: exec.ram_mut(),
                        gas_remaining: &mut gas_remaining,
                        service_id: Some(working.regular.id),
                        service_account: current_account.as_mut(),
                        accounts: Some(&mut accounts_map),
                        manager_id: Some(working.regular.state.manager),
                        registrar_id: Some(working.regular.state.registrar),
                        nextfreeid: Some(&mut nextfreeid),
                        lookup_timeslot: None,
                        timeslot: Some(timeslot),
                        expunge_period: Some(u64::from(config.preimage_expunge_period)),
                        refine_context: None,
                        yield_hash: Some(&mut yield_hash),
                        provisions: Some(&mut provisions),
                        xfers: Some(&mut xfers),
                        delegator_id: Some(working.regular.state.delegator),
                        num_validators: Some(config.num_validators),
                        stagingset: Some(&mut stagingset),
                        checkpoint_requested: Some(&mut checkpoint_requested),
                        num_cores: Some(config.num_cores),
                        bless_state: Some(&mut bless_state),
                        assign_state: Some(&mut assign_state),
                        fetch_entropy_accumulator: Some(entropy_accumulator),
                        fetch_authorizer_trace: None,
                        fetch_export_segments: None,
                        fetch_import_segments: None,
                        fetch_work_item_index: None,
                        fetch_accumulate_inputs: Some(accumulate_inputs),
                        fetch_work_package_encoded: None,
                        fetch_auth_config: None,
                        fetch_auth_token: None,
                        fetch_refine_context_encoded: None,
                        fetch_work_item_summaries: Some(work_item_summaries),
                        fetch_work_item_payloads: None,
                        log_messages: None,
                        fetch_system_constants_config: Some(config),
                    };
                    handler.execute(&mut host_ctx)
                };

                *exec.registers_mut() = registers;
                exec.set_gas_remaining(gas_remaining);
                if let Some(acc) = current_account.take() {
                    accounts_map.insert(working.regular.id, acc);
                }
                working.regular.state.accounts = map_to_accounts(accounts_map);
                working.regular.state.manager = bless_state.manager;
                working.regular.state.delegator = bless_state.delegator;
                working.regular.state.registrar = bless_state.registrar;
                working.regular.state.assigners = assign_state.assigners;
                working.regular.state.alwaysaccers = bless_state.alwaysaccers;
                working.regular.state.authqueue = assign_state.authqueue;
                working.regular.nextfreeid = nextfreeid;
                working.regular.state.stagingset = stagingset;
                working.regular.yield_hash = yield_hash;
                working.regular.provisions = provisions;
                working.regular.xfers = xfers;

                if checkpoint_requested {
                    working.exceptional = working.regular.clone();
                }

                if result.should_continue() {
                    exec.set_status(Status::Running);
                } else {
                    exec.set_status(status_from_host_result(&result));
                }
            }
        }
    }
}

/// Inputs to [`refine`]. Unlike accumulate there is no service-state context to
/// thread or roll back: refine only ever returns gas consumed and a result blob.
pub struct RefineInputs<'a> {
    pub gas_limit: u32,
    pub program: &'a [u8],
    pub args: &'a [u8],
    pub entropy_accumulator: &'a [u8],
    pub authorizer_trace: &'a [u8],
    pub work_package_encoded: &'a [u8],
    pub auth_config: &'a [u8],
    pub auth_token: &'a [u8],
    pub refine_context_encoded: &'a [u8],
    pub import_segments: &'a [Vec<Vec<u8>>],
    pub export_segment_offset: i64,
    pub max_export_segments: usize,
    pub config: &'a ProtocolConfig,
}

/// Run one work item's refinement. Deterministic in the same sense as
/// [`accumulate`]. The host-call subset reachable here is the general registry
/// only (GAS/FETCH/LOOKUP/READ/WRITE/INFO/HISTORICAL_LOOKUP/LOG plus the
/// inner-machine operations MACHINE/PEEK/POKE/PAGES/INVOKE/EXPUNGE/EXPORT) — the
/// accumulate-only host calls (BLESS, ASSIGN, NEW, ...) are simply unreachable
/// since this driver never looks them up.
///
/// Returns the segments pushed by EXPORT alongside the usual gas/result pair;
/// a non-halt outcome still returns whatever was exported before the trap.
#[must_use]
#[tracing::instrument(name = "refine", skip(inputs))]
pub fn refine(inputs: RefineInputs<'_>) -> (u32, ExecutionResult, Vec<Vec<u8>>) {
    let RefineInputs {
        gas_limit,
        program,
        args,
        entropy_accumulator,
        authorizer_trace,
        work_package_encoded,
        auth_config,
        auth_token,
        refine_context_encoded,
        import_segments,
        export_segment_offset,
        max_export_segments,
        config: _config,
    } = inputs;

    let Some(mut exec) = load_program(program, args, 0, gas_limit) else {
        return (0, ExecutionResult::from_panic(), Vec::new());
    };

    let mut refine_ctx = PvmRefineContext::new(export_segment_offset, max_export_segments);

    loop {
        match exec.run_until_halt() {
            Status::Halt => {
                let output = extract_return_blob(&mut exec);
                let gas_consumed = gas_limit.saturating_sub(exec.gas_remaining());
                return (
                    gas_consumed,
                    ExecutionResult::from_data(output),
                    refine_ctx.into_export_segments(),
                );
            }
            Status::Panic | Status::Fault => {
                let gas_consumed = gas_limit.saturating_sub(exec.gas_remaining());
                return (
                    gas_consumed,
                    ExecutionResult::from_panic(),
                    refine_ctx.into_export_segments(),
                );
            }
            Status::Oog => {
                return (gas_limit, ExecutionResult::from_oog(), refine_ctx.into_export_segments());
            }
            Status::Running => unreachable!("run_until_halt only returns on a non-Running status"),
            Status::Host => {
                let call_id = exec.host_call_id();

                if exec.gas_remaining() < GAS_HOST_CALL_BASE {
                    exec.set_gas_remaining(0);
                    exec.set_status(Status::Oog);
                    continue;
                }
                exec.set_gas_remaining(exec.gas_remaining() - GAS_HOST_CALL_BASE);

                let Some(handler) = get_general_host_function(call_id) else {
                    exec.set_status(Status::Panic);
                    continue;
                };

                let mut registers = *exec.registers();
                let mut gas_remaining = exec.gas_remaining();

                let result = {
                    let mut host_ctx = HostFunctionContext {
                        registers: &mut registers,
                        ram: exec.ram_mut(),
                        gas_remaining: &mut gas_remaining,
                        service_id: None,
                        service_account: None,
                        accounts: None,
                        manager_id: None,
                        registrar_id: None,
                        nextfreeid: None,
                        lookup_timeslot: None,
                        timeslot: None,
                        expunge_period: None,
                        refine_context: Some(&mut refine_ctx),
                        yield_hash: None,
                        provisions: None,
                        xfers: None,
                        delegator_id: None,
                        num_validators: None,
                        stagingset: None,
                        checkpoint_requested: None,
                        num_cores: None,
                        bless_state: None,
                        assign_state: None,
                        fetch_entropy_accumulator: Some(entropy_accumulator),
                        fetch_authorizer_trace: Some(authorizer_trace),
                        fetch_export_segments: None,
                        fetch_import_segments: Some(import_segments),
                        fetch_work_item_index: None,
                        fetch_accumulate_inputs: None,
                        fetch_work_package_encoded: Some(work_package_encoded),
                        fetch_auth_config: Some(auth_config),
                        fetch_auth_token: Some(auth_token),
                        fetch_refine_context_encoded: Some(refine_context_encoded),
                        fetch_work_item_summaries: None,
                        fetch_work_item_payloads: None,
                        log_messages: None,
                        fetch_system_constants_config: None,
                    };
                    handler.execute(&mut host_ctx)
                };

                *exec.registers_mut() = registers;
                exec.set_gas_remaining(gas_remaining);

                if result.should_continue() {
                    exec.set_status(Status::Running);
                } else {
                    exec.set_status(status_from_host_result(&result));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Implications;
    use crate::config::{OPCODE_ADD_IMM_32, OPCODE_TRAP};
    use crate::program::{encode_blob, DecodedBlob};

    /// Wrap a deblob-format program in the Y-function + preimage layers invocation
    /// drivers expect, with empty ro/rw data and no stack/heap.
    fn wrap_program(code: Vec<u8>, bitmask: Vec<u8>) -> Vec<u8> {
        let blob = encode_blob(&DecodedBlob {
            code,
            bitmask,
            jump_table: vec![],
            element_size: 0,
            header_size: 0,
        });
        let mut y_function = Vec::new();
        y_function.extend_from_slice(&0u32.to_le_bytes()[..3]); // ro length
        y_function.extend_from_slice(&0u32.to_le_bytes()[..3]); // rw length
        y_function.extend_from_slice(&0u16.to_le_bytes()); // heap zero padding
        y_function.extend_from_slice(&0u32.to_le_bytes()[..3]); // stack size
        y_function.extend_from_slice(&(blob.len() as u32).to_le_bytes());
        y_function.extend_from_slice(&blob);

        let mut preimage = Vec::new();
        preimage.push(0); // natural(0) metadata length
        preimage.extend_from_slice(&y_function);
        preimage
    }

    fn empty_implications(id: u64) -> ImplicationsPair {
        ImplicationsPair {
            regular: Implications {
                id,
                ..Implications::default()
            },
            exceptional: Implications {
                id,
                ..Implications::default()
            },
        }
    }

    #[test]
    fn accumulate_trap_rolls_back_to_original_context() {
        let program = wrap_program(vec![OPCODE_TRAP], vec![1]);
        let context = empty_implications(7);
        let (gas_consumed, result, out_context) = accumulate(AccumulateInputs {
            gas_limit: 1_000,
            program: &program,
            args: &[],
            context: context.clone(),
            entropy_accumulator: &[],
            work_item_summaries: &[],
            accumulate_inputs: &[],
            timeslot: 0,
            config: &ProtocolConfig::default(),
        });
        assert!(result.is_panic());
        assert!(gas_consumed > 0);
        assert_eq!(out_context.regular.id, context.regular.id);
    }

    #[test]
    fn accumulate_out_of_gas_reports_oog_and_full_gas_consumed() {
        let program = wrap_program(vec![OPCODE_ADD_IMM_32, 0x00, 0x00], vec![1, 0, 0]);
        let context = empty_implications(3);
        let (gas_consumed, result, _) = accumulate(AccumulateInputs {
            gas_limit: 0,
            program: &program,
            args: &[],
            context,
            entropy_accumulator: &[],
            work_item_summaries: &[],
            accumulate_inputs: &[],
            timeslot: 0,
            config: &ProtocolConfig::default(),
        });
        assert!(result.is_oog());
        assert_eq!(gas_consumed, 0);
    }

    #[test]
    fn refine_trap_reports_panic() {
        let program = wrap_program(vec![OPCODE_TRAP], vec![1]);
        let (gas_consumed, result, exports) = refine(RefineInputs {
            gas_limit: 1_000,
            program: &program,
            args: &[],
            entropy_accumulator: &[],
            authorizer_trace: &[],
            work_package_encoded: &[],
            auth_config: &[],
            auth_token: &[],
            refine_context_encoded: &[],
            import_segments: &[],
            export_segment_offset: 0,
            max_export_segments: 16,
            config: &ProtocolConfig::default(),
        });
        assert!(result.is_panic());
        assert!(gas_consumed > 0);
        assert!(exports.is_empty());
    }

    #[test]
    fn malformed_program_panics_without_consuming_gas() {
        let (gas_consumed, result, _) = accumulate(AccumulateInputs {
            gas_limit: 1_000,
            program: &[0xff; 4],
            args: &[],
            context: empty_implications(1),
            entropy_accumulator: &[],
            work_item_summaries: &[],
            accumulate_inputs: &[],
            timeslot: 0,
            config: &ProtocolConfig::default(),
        });
        assert!(result.is_panic());
        assert_eq!(gas_consumed, 0);
    }
}

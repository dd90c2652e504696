//! Cross-module scenarios exercised only through the public API: build a
//! program blob by hand (preimage wrapper over the Y-function layout over
//! the deblob format), then drive it through `accumulate`/`refine` and check
//! determinism, halt-vs-trap-vs-OOG outcomes, and codec round-trips.

use jam_pvm_core::{
    accumulate, decode_implications_pair, encode_implications_pair, refine, AccumulateInputs,
    CompleteServiceAccount, Implications, ImplicationsPair, ProtocolConfig, RefineInputs,
};

const OPCODE_TRAP: u8 = 0;

/// Wrap a single-instruction deblob program (one opcode, matching 1-bit
/// bitmask, no jump table) in the Y-function and preimage layers every
/// invocation driver expects.
fn wrap_single_instruction(opcode: u8) -> Vec<u8> {
    let deblob = vec![
        0x00, // jump_table_length = natural(0)
        0x00, // element_size
        0x01, // code_length = natural(1)
        opcode, // code
        0x01, // packed bitmask: bit 0 set (instruction boundary)
    ];

    let mut y_function = Vec::new();
    y_function.extend_from_slice(&[0, 0, 0]); // ro length
    y_function.extend_from_slice(&[0, 0, 0]); // rw length
    y_function.extend_from_slice(&[0, 0]); // heap zero padding
    y_function.extend_from_slice(&[0, 0, 0]); // stack size
    y_function.extend_from_slice(&(deblob.len() as u32).to_le_bytes());
    y_function.extend_from_slice(&deblob);

    let mut preimage = vec![0x00]; // natural(0) metadata length
    preimage.extend_from_slice(&y_function);
    preimage
}

fn empty_context(id: u64) -> ImplicationsPair {
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
fn accumulate_is_deterministic_across_repeated_calls() {
    let program = wrap_single_instruction(OPCODE_TRAP);
    let config = ProtocolConfig::default();

    let run = || {
        accumulate(AccumulateInputs {
            gas_limit: 500,
            program: &program,
            args: &[],
            context: empty_context(42),
            entropy_accumulator: &[],
            work_item_summaries: &[],
            accumulate_inputs: &[],
            timeslot: 10,
            config: &config,
        })
    };

    let (gas_a, result_a, context_a) = run();
    let (gas_b, result_b, context_b) = run();

    assert_eq!(gas_a, gas_b);
    assert_eq!(result_a.result_type, result_b.result_type);
    assert_eq!(result_a.data, result_b.data);
    assert_eq!(context_a.regular.id, context_b.regular.id);
}

#[test]
fn accumulate_out_of_gas_returns_oog_and_original_context() {
    let program = wrap_single_instruction(OPCODE_TRAP);
    let context = empty_context(7);
    let config = ProtocolConfig::default();

    let (gas_consumed, result, out_context) = accumulate(AccumulateInputs {
        gas_limit: 0,
        program: &program,
        args: &[],
        context: context.clone(),
        entropy_accumulator: &[],
        work_item_summaries: &[],
        accumulate_inputs: &[],
        timeslot: 0,
        config: &config,
    });

    assert!(result.is_oog());
    assert_eq!(gas_consumed, 0);
    assert_eq!(out_context.regular.id, context.regular.id);
}

#[test]
fn refine_traps_without_a_service_context_to_roll_back() {
    let program = wrap_single_instruction(OPCODE_TRAP);
    let config = ProtocolConfig::default();

    let (gas_consumed, result, exports) = refine(RefineInputs {
        gas_limit: 500,
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
        max_export_segments: 4,
        config: &config,
    });

    assert!(result.is_panic());
    assert!(gas_consumed > 0);
    assert!(exports.is_empty());
}

#[test]
fn implications_pair_round_trips_through_the_domain_codec() {
    let mut context = empty_context(123);
    context.regular.state.accounts = vec![jam_pvm_core::AccountEntry {
        service_id: 123,
        account: CompleteServiceAccount::default(),
    }];
    context.regular.nextfreeid = 65536;

    let encoded = encode_implications_pair(&context, 2, 6, 10).expect("encode");
    let decoded = decode_implications_pair(&encoded, 2, 6, 10)
        .expect("round-trip decode")
        .value;

    assert_eq!(decoded.regular.id, context.regular.id);
    assert_eq!(decoded.regular.nextfreeid, context.regular.nextfreeid);
    assert_eq!(decoded.regular.state.accounts.len(), 1);
    assert_eq!(decoded.regular.state.accounts[0].service_id, 123);
}

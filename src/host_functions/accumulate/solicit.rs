//! SOLICIT accumulation host function (Ω_S). Gray Paper: function ID 23.
//! r7 = hash offset (o), r8 = preimage size (z). 1:1 with AS solicit.ts.
//! Read 32-byte hash; get/set request value; new request [] or append timeslot to [x,y]; FULL on overflow/insufficient balance.

use crate::config::{C_BASE_DEPOSIT, C_BYTE_DEPOSIT, C_ITEM_DEPOSIT, FUNC_SOLICIT};
use crate::host_functions::accumulate::base::{self, codes};
use crate::host_functions::base::{HostFunction, HostFunctionContext, HostFunctionResult};
use crate::codec::{
    decode_request_timeslots, encode_request_timeslots, get_request_value, set_request_value,
};

const HASH_LEN: u32 = 32;

pub struct SolicitHostFunction;

impl SolicitHostFunction {
    fn minbalance(items: u64, octets: u64, gratis: u64) -> u64 {
        let total = C_BASE_DEPOSIT
            .saturating_add(C_ITEM_DEPOSIT * items)
            .saturating_add(C_BYTE_DEPOSIT * octets);
        total.saturating_sub(gratis)
    }
}

impl HostFunction for SolicitHostFunction {
    fn function_id(&self) -> u8 {
        FUNC_SOLICIT
    }
    fn name(&self) -> &'static str {
        "solicit"
    }
    fn execute(&self, context: &mut HostFunctionContext<'_>) -> HostFunctionResult {
        let hash_offset = context.registers[7] as u32;
        let preimage_length = context.registers[8];

        // Read hash from memory (32 bytes). Gray Paper: panic when h = error; r7 unchanged.
        let read_result = context.ram.read_octets(hash_offset, HASH_LEN);
        if read_result.fault_address != 0 || read_result.data.is_none() {
            return HostFunctionResult::panic();
        }
        let hash_data = read_result.data.unwrap();
        if hash_data.len() != HASH_LEN as usize {
            return HostFunctionResult::panic();
        }

        // Current service account (imX). None → HUH.
        let service_account = match &mut context.service_account {
            Some(acc) => acc,
            None => {
                base::set_accumulate_error(context.registers, codes::HUH);
                return HostFunctionResult::continue_execution();
            }
        };
        let service_id = match context.service_id {
            Some(id) => id,
            None => {
                base::set_accumulate_error(context.registers, codes::HUH);
                return HostFunctionResult::continue_execution();
            }
        };

        let existing_request_value = get_request_value(service_account, service_id, &hash_data, preimage_length);

        let new_timeslots = match existing_request_value {
            None => {
                // Request doesn't exist - create empty request []
                vec![]
            }
            Some(ref value) => {
                let existing_timeslots = match decode_request_timeslots(value) {
                    Ok(t) => t,
                    Err(_) => {
                        base::set_accumulate_error(context.registers, codes::HUH);
                        return HostFunctionResult::continue_execution();
                    }
                };
                if existing_timeslots.len() == 2 {
                    // [x, y] - append current timeslot to make [x, y, t]
                    let timeslot = match context.timeslot {
                        Some(t) => t as u32,
                        None => {
                            base::set_accumulate_error(context.registers, codes::HUH);
                            return HostFunctionResult::continue_execution();
                        }
                    };
                    let mut nt = existing_timeslots;
                    nt.push(timeslot);
                    nt
                } else {
                    base::set_accumulate_error(context.registers, codes::HUH);
                    return HostFunctionResult::continue_execution();
                }
            }
        };

        // Tentatively write the new request value, then recompute the
        // account's footprint from its own storage (items()/octets()) the
        // same way every other balance check in this crate does.
        let previous_balance = service_account.balance;
        let previous_gratis = service_account.gratis;
        let prior_value = existing_request_value.clone();
        set_request_value(
            service_account,
            service_id,
            &hash_data,
            preimage_length,
            encode_request_timeslots(&new_timeslots),
        );
        let new_min_balance =
            Self::minbalance(service_account.items(), service_account.octets(), previous_gratis);

        if new_min_balance > previous_balance {
            // Revert the tentative write.
            match prior_value {
                Some(v) => set_request_value(service_account, service_id, &hash_data, preimage_length, v),
                None => {
                    crate::codec::delete_request_value(service_account, service_id, &hash_data, preimage_length);
                }
            }
            base::set_accumulate_error(context.registers, codes::FULL);
            return HostFunctionResult::continue_execution();
        }

        base::set_accumulate_success(context.registers, codes::OK);
        HostFunctionResult::continue_execution()
    }
}

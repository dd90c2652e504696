//! WRITE host function (Ω_W). Gray Paper: function ID 4.
//! r7..r10 = key offset, key length, value offset, value length.
//! 1:1 with AS: if !params return PANIC; else read key/value, resolve account, update storage, r7=previous length or FULL.

use crate::config::{C_BASE_DEPOSIT, C_BYTE_DEPOSIT, C_ITEM_DEPOSIT, FUNC_WRITE, REG_FULL, REG_NONE};
use crate::host_functions::base::{HostFunction, HostFunctionContext, HostFunctionResult};
use crate::codec::{get_storage_value, set_storage_value, delete_storage_value};

/// WRITE (4): no params → PANIC. With params read key/value, update storage, check balance, r7=previous len or FULL.
pub struct WriteHostFunction;

impl WriteHostFunction {
    fn calculate_min_balance(items: u64, octets: u64, gratis: u64) -> u64 {
        let total = C_BASE_DEPOSIT + C_ITEM_DEPOSIT * items + C_BYTE_DEPOSIT * octets;
        total.saturating_sub(gratis)
    }
}

impl HostFunction for WriteHostFunction {
    fn function_id(&self) -> u8 {
        FUNC_WRITE
    }
    fn name(&self) -> &'static str {
        "write"
    }
    fn execute(&self, context: &mut HostFunctionContext<'_>) -> HostFunctionResult {
        // Resolve current service account from accounts + service_id (same as AS WriteParams.serviceAccount).
        let service_id = match context.service_id {
            Some(id) => id,
            None => {
                crate::host_log!("[hostfn] write PANIC: no service_id in context");
                return HostFunctionResult::panic();
            }
        };
        let service_account = match &mut context.accounts {
            Some(accounts) => match accounts.get_mut(&service_id) {
                Some(acc) => acc,
                None => {
                    crate::host_log!("[hostfn] write PANIC: service {} not in accounts", service_id);
                    return HostFunctionResult::panic();
                }
            },
            None => {
                crate::host_log!("[hostfn] write PANIC: no accounts in context");
                return HostFunctionResult::panic();
            }
        };

        let key_offset = context.registers[7];
        let key_length = context.registers[8];
        let value_offset = context.registers[9];
        let value_length = context.registers[10];

        let read_key = context.ram.read_octets(key_offset as u32, key_length as u32);
        if read_key.data.is_none() || read_key.fault_address != 0 {
            crate::host_log!(
                "[hostfn] write PANIC: key read fault (offset={}, len={}, fault_address={})",
                key_offset, key_length, read_key.fault_address
            );
            return HostFunctionResult::panic();
        }
        let key = read_key.data.unwrap();

        if value_length == 0 {
            let prev = get_storage_value(service_account, service_id, &key);
            let previous_length = prev.as_ref().map(|v| v.len() as i64).unwrap_or(-1);
            if prev.is_none() {
                context.registers[7] = REG_NONE;
                return HostFunctionResult::continue_execution();
            }
            // Tentatively delete, then check the new footprint still affords min balance.
            let removed = delete_storage_value(service_account, service_id, &key);
            let new_min = Self::calculate_min_balance(
                service_account.items(),
                service_account.octets(),
                service_account.gratis,
            );
            if new_min > service_account.balance {
                // Revert: re-insert the value we just removed.
                if removed {
                    set_storage_value(service_account, service_id, &key, prev.unwrap());
                }
                context.registers[7] = REG_FULL;
                return HostFunctionResult::continue_execution();
            }
            context.registers[7] = if previous_length >= 0 {
                previous_length as u64
            } else {
                REG_NONE
            };
            return HostFunctionResult::continue_execution();
        }

        let read_value = context.ram.read_octets(value_offset as u32, value_length as u32);
        if read_value.data.is_none() || read_value.fault_address != 0 {
            crate::host_log!(
                "[hostfn] write PANIC: value read fault (offset={}, len={}, fault_address={})",
                value_offset, value_length, read_value.fault_address
            );
            return HostFunctionResult::panic();
        }
        let value = read_value.data.unwrap();

        let prev = get_storage_value(service_account, service_id, &key);
        let previous_length = prev.as_ref().map(|v| v.len() as i64).unwrap_or(-1);
        let prev_for_revert = prev.clone();
        set_storage_value(service_account, service_id, &key, value);
        let new_min = Self::calculate_min_balance(
            service_account.items(),
            service_account.octets(),
            service_account.gratis,
        );
        if new_min > service_account.balance {
            // Revert: restore the previous value, or remove the key if it was new.
            match prev_for_revert {
                Some(p) => set_storage_value(service_account, service_id, &key, p),
                None => {
                    delete_storage_value(service_account, service_id, &key);
                }
            }
            context.registers[7] = REG_FULL;
            return HostFunctionResult::continue_execution();
        }

        context.registers[7] = if previous_length >= 0 {
            previous_length as u64
        } else {
            REG_NONE
        };
        HostFunctionResult::continue_execution()
    }
}

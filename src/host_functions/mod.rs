//! Host functions (mirrors assembly/host-functions/). General + accumulate registries and stubs.

pub mod accumulate;
pub mod base;
pub mod general;
pub mod refine;
pub mod refine_machine;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::host_functions::base::HostFunction;

/// Combined host function registry (general + accumulate). Used when ECALLI runs.
fn get_combined_registry() -> &'static HashMap<u8, Box<dyn HostFunction>> {
    static REGISTRY: OnceLock<HashMap<u8, Box<dyn HostFunction>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m = general::create_general_registry();
        for (id, h) in accumulate::create_accumulate_registry() {
            m.insert(id, h);
        }
        m
    })
}

/// Look up a host function by ID in the combined (general + accumulate) table, used
/// by the accumulate driver. Inner-machine and EXPORT calls made without a
/// `refine_context` PANIC inside their own `execute`, so sharing this table is safe.
pub fn get_host_function(host_call_id: u32) -> Option<&'static dyn HostFunction> {
    let id = host_call_id as u8;
    get_combined_registry()
        .get(&id)
        .map(|b| b.as_ref() as &dyn HostFunction)
}

/// General-only registry (no BLESS/ASSIGN/NEW/...), used by the refine driver.
fn get_general_registry() -> &'static HashMap<u8, Box<dyn HostFunction>> {
    static REGISTRY: OnceLock<HashMap<u8, Box<dyn HostFunction>>> = OnceLock::new();
    REGISTRY.get_or_init(general::create_general_registry)
}

/// Look up a host function by ID in the general-only table, used by the refine driver.
pub fn get_general_host_function(host_call_id: u32) -> Option<&'static dyn HostFunction> {
    let id = host_call_id as u8;
    get_general_registry()
        .get(&id)
        .map(|b| b.as_ref() as &dyn HostFunction)
}

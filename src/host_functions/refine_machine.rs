//! Concrete [`RefineContext`]/[`RefineMachine`] backing for refine invocations:
//! a table of nested PVM instances plus the accumulated export-segment list,
//! as driven by the MACHINE/PEEK/POKE/PAGES/INVOKE/EXPUNGE and EXPORT host calls.

use std::collections::HashMap;

use crate::host_functions::refine::{InvokeResult, RefineContext, RefineMachine};
use crate::interpreter::{ExecState, Status};
use crate::program::{decode_blob, DecodedBlob};
use crate::ram::PvmRam;
use crate::types::Ram;

/// One nested machine created by MACHINE: its own code/bitmask/jump-table and RAM,
/// run in bursts by repeated INVOKE calls.
struct NestedMachine {
    exec: ExecState,
}

impl NestedMachine {
    fn new(program: &[u8], initial_pc: u64) -> Self {
        let DecodedBlob {
            code,
            bitmask,
            jump_table,
            ..
        } = decode_blob(program).unwrap_or(DecodedBlob {
            code: vec![],
            bitmask: vec![],
            jump_table: vec![],
            element_size: 0,
            header_size: 0,
        });
        let ram: Box<dyn Ram> = Box::new(PvmRam::new());
        let exec = ExecState::new(code, bitmask, jump_table, [0; 13], initial_pc as u32, 0, ram);
        Self { exec }
    }
}

impl RefineMachine for NestedMachine {
    fn ram_read(&mut self, offset: u32, length: u32) -> Option<Vec<u8>> {
        let result = self.exec.ram_mut().read_octets(offset, length);
        if result.fault_address != 0 {
            return None;
        }
        result.data
    }

    fn ram_write(&mut self, offset: u32, data: &[u8]) -> bool {
        !self.exec.ram_mut().write_octets(offset, data).has_fault
    }

    fn ram_is_readable(&self, offset: u32, length: u32) -> bool {
        self.exec.ram().is_readable_with_fault(offset, length).success
    }

    fn ram_is_writable(&self, offset: u32, length: u32) -> bool {
        self.exec.ram().is_writable_with_fault(offset, length).success
    }

    fn set_page_access(&mut self, page_start: u32, page_count: u32, access: u8) {
        let access_type = crate::host_functions::refine::pages_access_to_memory_type(access);
        let page_size = crate::config::PAGE_SIZE;
        self.exec.ram_mut().set_page_access_rights(
            page_start * page_size,
            page_count * page_size,
            access_type,
        );
    }

    fn invoke(&mut self, gas_limit: u32, registers: &[u64; 13]) -> InvokeResult {
        self.exec.set_status(Status::Running);
        *self.exec.registers_mut() = *registers;
        self.exec.set_gas_remaining(gas_limit);

        let status = self.exec.run_until_halt();
        let gas_remaining = self.exec.gas_remaining();
        let final_registers = *self.exec.registers();

        match status {
            Status::Halt => InvokeResult::halt(gas_remaining, final_registers),
            Status::Panic => InvokeResult::panic(gas_remaining, final_registers),
            Status::Fault => {
                InvokeResult::fault(self.exec.fault_address(), gas_remaining, final_registers)
            }
            Status::Oog => InvokeResult::oog(gas_remaining, final_registers),
            Status::Host => {
                InvokeResult::host(self.exec.host_call_id(), gas_remaining, final_registers)
            }
            Status::Running => InvokeResult::panic(gas_remaining, final_registers),
        }
    }

    fn get_pc(&self) -> u64 {
        u64::from(self.exec.program_counter())
    }
}

/// Per-invocation refine context: nested machines keyed by a monotonic ID, plus the
/// export segments accumulated by EXPORT so far (Gray Paper (m, e)).
pub struct PvmRefineContext {
    machines: HashMap<u64, NestedMachine>,
    next_machine_id: u64,
    segment_offset: i64,
    export_segments: Vec<Vec<u8>>,
    max_export_segments: usize,
}

impl PvmRefineContext {
    #[must_use]
    pub fn new(segment_offset: i64, max_export_segments: usize) -> Self {
        Self {
            machines: HashMap::new(),
            next_machine_id: 0,
            segment_offset,
            export_segments: Vec::new(),
            max_export_segments,
        }
    }

    /// Export segments pushed by EXPORT during this invocation, in order.
    #[must_use]
    pub fn into_export_segments(self) -> Vec<Vec<u8>> {
        self.export_segments
    }
}

impl RefineContext for PvmRefineContext {
    fn segment_offset(&self) -> i64 {
        self.segment_offset
    }

    fn push_export_segment(&mut self, segment: Vec<u8>) -> Result<i64, ()> {
        if self.export_segments.len() >= self.max_export_segments {
            return Err(());
        }
        let index = self.segment_offset + self.export_segments.len() as i64;
        self.export_segments.push(segment);
        Ok(index)
    }

    fn add_machine(&mut self, program: &[u8], initial_pc: u64) -> u64 {
        let id = self.next_machine_id;
        self.next_machine_id += 1;
        self.machines.insert(id, NestedMachine::new(program, initial_pc));
        id
    }

    fn with_machine(&mut self, machine_id: u64, f: &mut dyn FnMut(&mut dyn RefineMachine)) -> bool {
        match self.machines.get_mut(&machine_id) {
            Some(machine) => {
                f(machine);
                true
            }
            None => false,
        }
    }

    fn remove_machine(&mut self, machine_id: u64) -> Option<u64> {
        self.machines.remove(&machine_id).map(|m| m.get_pc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove_roundtrips_pc() {
        let mut ctx = PvmRefineContext::new(0, 16);
        let id = ctx.add_machine(&[], 7);
        assert_eq!(ctx.remove_machine(id), Some(7));
        assert_eq!(ctx.remove_machine(id), None);
    }

    #[test]
    fn export_segments_respect_the_cap() {
        let mut ctx = PvmRefineContext::new(3, 1);
        assert_eq!(ctx.push_export_segment(vec![1, 2, 3]), Ok(3));
        assert_eq!(ctx.push_export_segment(vec![4, 5, 6]), Err(()));
    }
}

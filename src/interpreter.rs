//! Instruction interpreter: the fetch-decode-execute loop over a decoded
//! program. Depends only on the program decoder ([`crate::program`]) and the
//! memory model ([`crate::types::Ram`]) — it knows nothing about host calls
//! beyond recognizing the ECALLI trap and pausing.

use crate::config::{
    instruction_class_gas, RESULT_CODE_FAULT, RESULT_CODE_HALT, RESULT_CODE_HOST,
    RESULT_CODE_OOG, RESULT_CODE_PANIC,
};
use crate::instructions::base::calculate_skip_distance;
use crate::instructions::global_registry;
use crate::types::{InstructionContext, Ram, RegisterState};

/// Outcome of a completed or paused step. Mirrors the five non-running states a
/// PVM invocation can be in, plus `Running` for "call step() again".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Halt,
    Panic,
    Fault,
    Host,
    Oog,
}

/// A single PVM machine instance: code, jump-target bitmask, jump table, registers,
/// program counter, gas meter, and memory. Built from a [`crate::program::LoadedProgram`]
/// plus whatever [`Ram`] backing the caller wants (a fresh [`crate::ram::PvmRam`] for a
/// top-level invocation, or a nested instance for refine's inner machines).
pub struct ExecState {
    registers: RegisterState,
    program_counter: u32,
    gas_remaining: u32,
    status: Status,
    fault_address: u32,
    host_call_id: u32,
    code: Vec<u8>,
    bitmask: Vec<u8>,
    jump_table: Vec<u32>,
    ram: Box<dyn Ram>,
}

impl ExecState {
    #[must_use]
    pub fn new(
        code: Vec<u8>,
        bitmask: Vec<u8>,
        jump_table: Vec<u32>,
        registers: RegisterState,
        program_counter: u32,
        gas_limit: u32,
        ram: Box<dyn Ram>,
    ) -> Self {
        Self {
            registers,
            program_counter,
            gas_remaining: gas_limit,
            status: Status::Running,
            fault_address: 0,
            host_call_id: 0,
            code,
            bitmask,
            jump_table,
            ram,
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    #[must_use]
    pub const fn program_counter(&self) -> u32 {
        self.program_counter
    }

    #[must_use]
    pub const fn gas_remaining(&self) -> u32 {
        self.gas_remaining
    }

    pub fn set_gas_remaining(&mut self, gas: u32) {
        self.gas_remaining = gas;
    }

    #[must_use]
    pub const fn fault_address(&self) -> u32 {
        self.fault_address
    }

    #[must_use]
    pub const fn host_call_id(&self) -> u32 {
        self.host_call_id
    }

    pub fn registers(&self) -> &RegisterState {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterState {
        &mut self.registers
    }

    pub fn ram(&self) -> &dyn Ram {
        &*self.ram
    }

    pub fn ram_mut(&mut self) -> &mut dyn Ram {
        &mut *self.ram
    }

    /// Run one instruction. Returns immediately with the current status if already
    /// terminal — callers may call `step()` in a loop without checking first.
    pub fn step(&mut self) -> Status {
        if self.status != Status::Running {
            return self.status;
        }

        let pc = self.program_counter as usize;
        if pc >= self.code.len() || self.bitmask.get(pc).copied().unwrap_or(0) == 0 {
            self.status = Status::Panic;
            return self.status;
        }

        let opcode = self.code[pc];
        let fskip = calculate_skip_distance(pc, &self.bitmask);
        let instruction_length = 1 + fskip as u32;
        let op_end = (pc + 1 + fskip as usize).min(self.code.len());
        let operands = &self.code[pc + 1..op_end];

        let cost = instruction_class_gas(opcode);
        if self.gas_remaining < cost {
            self.gas_remaining = 0;
            self.status = Status::Oog;
            return self.status;
        }
        self.gas_remaining -= cost;

        let Some(handler) = global_registry().get_handler(i32::from(opcode)) else {
            self.status = Status::Panic;
            return self.status;
        };

        let mut host_call_id = 0u32;
        let mut context = InstructionContext {
            code: &self.code,
            bitmask: &self.bitmask,
            registers: &mut self.registers,
            program_counter: self.program_counter,
            gas_remaining: self.gas_remaining,
            operands,
            fskip,
            jump_table: &self.jump_table,
            ram: &mut *self.ram,
            host_call_id_out: Some(&mut host_call_id),
        };

        let result = handler.execute(&mut context);
        let new_pc = context.program_counter;
        drop(context);

        if result.should_continue() {
            self.program_counter = if new_pc == pc as u32 {
                pc as u32 + instruction_length
            } else {
                new_pc
            };
            return self.status;
        }

        match result.get_code() as u8 {
            RESULT_CODE_HALT => {
                self.status = Status::Halt;
            }
            RESULT_CODE_PANIC => {
                self.status = Status::Panic;
            }
            RESULT_CODE_FAULT => {
                self.fault_address = result.fault_address;
                self.status = Status::Fault;
            }
            RESULT_CODE_HOST => {
                self.program_counter = if new_pc == pc as u32 {
                    pc as u32 + instruction_length
                } else {
                    new_pc
                };
                self.host_call_id = host_call_id;
                self.status = Status::Host;
            }
            RESULT_CODE_OOG => {
                self.gas_remaining = 0;
                self.status = Status::Oog;
            }
            _ => {
                self.status = Status::Panic;
            }
        }
        self.status
    }

    /// Run up to `n` instructions, stopping early on any non-`Running` status.
    pub fn run_n_steps(&mut self, n: u32) -> Status {
        for _ in 0..n {
            if self.step() != Status::Running {
                return self.status;
            }
        }
        self.status
    }

    /// Run until the machine leaves the `Running` state, including on a host-call
    /// trap. The caller (an invocation driver) dispatches the host call and either
    /// resumes (`set_status(Status::Running)`) or finalizes on a terminal status.
    pub fn run_until_halt(&mut self) -> Status {
        loop {
            if self.step() != Status::Running {
                return self.status;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OPCODE_ADD_IMM_32, OPCODE_TRAP};
    use crate::ram::PvmRam;

    fn ram() -> Box<dyn Ram> {
        Box::new(PvmRam::new())
    }

    #[test]
    fn trap_panics_immediately() {
        let code = vec![OPCODE_TRAP];
        let bitmask = vec![1];
        let mut state = ExecState::new(code, bitmask, vec![], [0; 13], 0, 1000, ram());
        assert_eq!(state.step(), Status::Panic);
    }

    #[test]
    fn running_off_the_end_of_code_panics() {
        let state_code = vec![0u8; 0];
        let bitmask = vec![];
        let mut state = ExecState::new(state_code, bitmask, vec![], [0; 13], 0, 1000, ram());
        assert_eq!(state.step(), Status::Panic);
    }

    #[test]
    fn out_of_gas_consumes_all_remaining_gas() {
        // ADD_IMM_32 costs GAS_BASE(1); with 0 gas remaining it must OOG, not underflow.
        let code = vec![OPCODE_ADD_IMM_32, 0x00, 0x00];
        let bitmask = vec![1, 0, 0];
        let mut state = ExecState::new(code, bitmask, vec![], [0; 13], 0, 0, ram());
        assert_eq!(state.step(), Status::Oog);
        assert_eq!(state.gas_remaining(), 0);
    }

    #[test]
    fn deterministic_replay_from_identical_inputs() {
        let code = vec![OPCODE_TRAP];
        let bitmask = vec![1];
        let mut a = ExecState::new(code.clone(), bitmask.clone(), vec![], [3; 13], 0, 1000, ram());
        let mut b = ExecState::new(code, bitmask, vec![], [3; 13], 0, 1000, ram());
        assert_eq!(a.step(), b.step());
        assert_eq!(a.gas_remaining(), b.gas_remaining());
    }
}

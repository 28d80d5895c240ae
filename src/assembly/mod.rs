//! Method body instructions and the fluent [`InstructionAssembler`].

mod assembler;
mod instruction;

pub use assembler::InstructionAssembler;
pub use instruction::Instruction;

use serde::{Deserialize, Serialize};

use crate::{
    assembly::Instruction,
    metadata::{field::FieldRef, method::MethodRef},
};

/// The IL body of a method.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodBody {
    /// Maximum evaluation stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    #[serde(default)]
    pub local_count: u16,
    /// The instruction stream
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    /// Create a body from an instruction stream, computing `max_stack`
    pub fn new(instructions: Vec<Instruction>, local_count: u16) -> Self {
        let max_stack = Instruction::max_stack(&instructions);
        MethodBody {
            max_stack,
            local_count,
            instructions,
        }
    }

    /// Instructions with `nop` padding removed
    pub fn significant(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions
            .iter()
            .filter(|instruction| !matches!(instruction, Instruction::Nop))
    }

    /// True if any instruction reads the field `field`
    pub fn loads_field(&self, field: &FieldRef) -> bool {
        self.instructions
            .iter()
            .any(|instruction| matches!(instruction, Instruction::LdFld(f) if f == field))
    }

    /// True if any instruction writes the field `field`
    pub fn stores_field(&self, field: &FieldRef) -> bool {
        self.instructions
            .iter()
            .any(|instruction| matches!(instruction, Instruction::StFld(f) if f == field))
    }

    /// Position of the first `call` to a constructor, i.e. the base or chained constructor call
    pub fn constructor_call(&self) -> Option<(usize, &MethodRef)> {
        self.instructions
            .iter()
            .enumerate()
            .find_map(|(index, instruction)| match instruction {
                Instruction::Call(method) if method.is_constructor() => Some((index, method)),
                _ => None,
            })
    }

    /// Insert `instructions` at `index`, shifting the remainder, and refresh `max_stack`
    pub fn insert(&mut self, index: usize, instructions: Vec<Instruction>) {
        let index = index.min(self.instructions.len());
        self.instructions.splice(index..index, instructions);
        self.max_stack = self.max_stack.max(Instruction::max_stack(&self.instructions));
    }
}

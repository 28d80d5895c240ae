//! The instruction set of method bodies.
//!
//! A deliberately small, CIL-shaped stack machine instruction set: enough to express
//! constructors, property accessors and the code the weaver injects. Member operands carry
//! full [`FieldRef`]/[`MethodRef`] values rather than tokens, so a body stays meaningful
//! after being imported into another module.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::{field::FieldRef, method::MethodRef};

/// One instruction of a method body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Do nothing
    Nop,
    /// Push argument `n` (argument 0 is `this` for instance methods)
    LdArg(u16),
    /// Push local `n`
    LdLoc(u16),
    /// Pop into local `n`
    StLoc(u16),
    /// Push a null reference
    LdNull,
    /// Push a string literal
    LdStr(String),
    /// Push a 32-bit integer
    LdcI4(i32),
    /// Push a 64-bit integer
    LdcI8(i64),
    /// Push a double
    LdcR8(f64),
    /// Duplicate the top of the stack
    Dup,
    /// Discard the top of the stack
    Pop,
    /// Replace an object reference by the value of one of its fields
    LdFld(FieldRef),
    /// Pop a value and an object reference, store the value into the field
    StFld(FieldRef),
    /// Call a method non-virtually
    Call(MethodRef),
    /// Call an instance method
    CallVirt(MethodRef),
    /// Allocate an object and run its constructor
    NewObj(MethodRef),
    /// Return from the current method
    Ret,
}

impl Instruction {
    /// Number of stack slots this instruction pops
    pub fn pops(&self) -> usize {
        match self {
            Instruction::StLoc(_) | Instruction::Pop | Instruction::LdFld(_) | Instruction::Dup => 1,
            Instruction::StFld(_) => 2,
            Instruction::Call(method) | Instruction::CallVirt(method) => {
                method.params.len() + usize::from(method.has_this)
            }
            Instruction::NewObj(method) => method.params.len(),
            _ => 0,
        }
    }

    /// Number of stack slots this instruction pushes
    pub fn pushes(&self) -> usize {
        match self {
            Instruction::LdArg(_)
            | Instruction::LdLoc(_)
            | Instruction::LdNull
            | Instruction::LdStr(_)
            | Instruction::LdcI4(_)
            | Instruction::LdcI8(_)
            | Instruction::LdcR8(_)
            | Instruction::LdFld(_)
            | Instruction::NewObj(_) => 1,
            Instruction::Dup => 2,
            Instruction::Call(method) | Instruction::CallVirt(method) => {
                usize::from(method.return_type.is_some())
            }
            _ => 0,
        }
    }

    /// Maximum evaluation stack depth reached by a straight-line instruction stream
    pub fn max_stack(instructions: &[Instruction]) -> u16 {
        let mut depth: usize = 0;
        let mut max: usize = 0;
        for instruction in instructions {
            depth = depth.saturating_sub(instruction.pops()) + instruction.pushes();
            max = max.max(depth);
            if matches!(instruction, Instruction::Ret) {
                depth = 0;
            }
        }
        u16::try_from(max).unwrap_or(u16::MAX)
    }

    /// The mnemonic of the instruction
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Nop => "nop",
            Instruction::LdArg(_) => "ldarg",
            Instruction::LdLoc(_) => "ldloc",
            Instruction::StLoc(_) => "stloc",
            Instruction::LdNull => "ldnull",
            Instruction::LdStr(_) => "ldstr",
            Instruction::LdcI4(_) => "ldc.i4",
            Instruction::LdcI8(_) => "ldc.i8",
            Instruction::LdcR8(_) => "ldc.r8",
            Instruction::Dup => "dup",
            Instruction::Pop => "pop",
            Instruction::LdFld(_) => "ldfld",
            Instruction::StFld(_) => "stfld",
            Instruction::Call(_) => "call",
            Instruction::CallVirt(_) => "callvirt",
            Instruction::NewObj(_) => "newobj",
            Instruction::Ret => "ret",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self {
            Instruction::LdArg(n) | Instruction::LdLoc(n) | Instruction::StLoc(n) => {
                write!(f, "{mnemonic}.{n}")
            }
            Instruction::LdStr(value) => write!(f, "{mnemonic} {value:?}"),
            Instruction::LdcI4(value) => write!(f, "{mnemonic} {value}"),
            Instruction::LdcI8(value) => write!(f, "{mnemonic} {value}"),
            Instruction::LdcR8(value) => write!(f, "{mnemonic} {value}"),
            Instruction::LdFld(field) | Instruction::StFld(field) => write!(f, "{mnemonic} {field}"),
            Instruction::Call(method) | Instruction::CallVirt(method) | Instruction::NewObj(method) => {
                write!(f, "{mnemonic} {method}")
            }
            _ => write!(f, "{mnemonic}"),
        }
    }
}

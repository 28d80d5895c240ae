use crate::{
    assembly::Instruction,
    metadata::{field::FieldRef, method::MethodBody, method::MethodRef},
};

/// Fluent builder for instruction streams.
///
/// # Examples
///
/// ```rust
/// use dotweave::assembly::InstructionAssembler;
///
/// let mut asm = InstructionAssembler::new();
/// asm.ldarg_0().ldstr("default").pop().ret();
/// let body = asm.finish();
/// assert_eq!(body.instructions.len(), 4);
/// assert_eq!(body.max_stack, 2);
/// ```
#[derive(Debug, Default)]
pub struct InstructionAssembler {
    instructions: Vec<Instruction>,
    local_count: u16,
}

impl InstructionAssembler {
    /// Create an empty assembler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary instruction
    pub fn emit(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// `nop`
    pub fn nop(&mut self) -> &mut Self {
        self.emit(Instruction::Nop)
    }

    /// `ldarg.0`, the `this` reference in instance methods
    pub fn ldarg_0(&mut self) -> &mut Self {
        self.emit(Instruction::LdArg(0))
    }

    /// `ldarg.1`
    pub fn ldarg_1(&mut self) -> &mut Self {
        self.emit(Instruction::LdArg(1))
    }

    /// `ldarg n`
    pub fn ldarg(&mut self, n: u16) -> &mut Self {
        self.emit(Instruction::LdArg(n))
    }

    /// `ldloc n`
    pub fn ldloc(&mut self, n: u16) -> &mut Self {
        self.local_count = self.local_count.max(n + 1);
        self.emit(Instruction::LdLoc(n))
    }

    /// `stloc n`
    pub fn stloc(&mut self, n: u16) -> &mut Self {
        self.local_count = self.local_count.max(n + 1);
        self.emit(Instruction::StLoc(n))
    }

    /// `ldnull`
    pub fn ldnull(&mut self) -> &mut Self {
        self.emit(Instruction::LdNull)
    }

    /// `ldstr`
    pub fn ldstr(&mut self, value: impl Into<String>) -> &mut Self {
        self.emit(Instruction::LdStr(value.into()))
    }

    /// `ldc.i4`
    pub fn ldc_i4(&mut self, value: i32) -> &mut Self {
        self.emit(Instruction::LdcI4(value))
    }

    /// `ldc.i8`
    pub fn ldc_i8(&mut self, value: i64) -> &mut Self {
        self.emit(Instruction::LdcI8(value))
    }

    /// `ldc.r8`
    pub fn ldc_r8(&mut self, value: f64) -> &mut Self {
        self.emit(Instruction::LdcR8(value))
    }

    /// `dup`
    pub fn dup(&mut self) -> &mut Self {
        self.emit(Instruction::Dup)
    }

    /// `pop`
    pub fn pop(&mut self) -> &mut Self {
        self.emit(Instruction::Pop)
    }

    /// `ldfld`
    pub fn ldfld(&mut self, field: FieldRef) -> &mut Self {
        self.emit(Instruction::LdFld(field))
    }

    /// `stfld`
    pub fn stfld(&mut self, field: FieldRef) -> &mut Self {
        self.emit(Instruction::StFld(field))
    }

    /// `call`
    pub fn call(&mut self, method: MethodRef) -> &mut Self {
        self.emit(Instruction::Call(method))
    }

    /// `callvirt`
    pub fn callvirt(&mut self, method: MethodRef) -> &mut Self {
        self.emit(Instruction::CallVirt(method))
    }

    /// `newobj`
    pub fn newobj(&mut self, constructor: MethodRef) -> &mut Self {
        self.emit(Instruction::NewObj(constructor))
    }

    /// `ret`
    pub fn ret(&mut self) -> &mut Self {
        self.emit(Instruction::Ret)
    }

    /// Consume the assembled instructions into a method body
    pub fn finish(&mut self) -> MethodBody {
        MethodBody::new(std::mem::take(&mut self.instructions), self.local_count)
    }
}

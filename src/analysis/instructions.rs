use crate::dex::container::{FieldId, MethodId, StringId};
use crate::dex::error::DexError;

/// What an instruction means to the metrics passes. Anything that is not a
/// branch, switch payload, exit, or call is [`InstructionKind::Other`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionKind {
    /// A conditional branch (`if-*`).
    Branch,
    /// A packed/sparse switch payload; one decision point per case.
    SwitchPayload { case_count: u32 },
    Return,
    Throw,
    /// Any `invoke-*` variant.
    Invoke,
    Other,
}

/// An id-table reference carried by an instruction operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionRef {
    Method(MethodId),
    Field(FieldId),
    String(StringId),
}

/// One instruction as the metrics passes see it. `opcode` keys the opcode
/// histogram; semantic classification lives in `kind`.
#[derive(Clone, Copy, Debug)]
pub struct Instruction {
    pub opcode: u16,
    pub kind: InstructionKind,
    pub reference: Option<InstructionRef>,
}

impl Instruction {
    pub fn plain(opcode: u16) -> Self {
        Instruction { opcode, kind: InstructionKind::Other, reference: None }
    }
}

/// Source of typed instruction streams. Bytecode decoding proper lives
/// behind this seam; the analyzers only consume what it yields.
///
/// A decode failure is scoped to one method: the caller counts it and moves
/// on to the next method.
pub trait InstructionDecoder {
    fn decode(&self, units: &[u16]) -> Result<Vec<Instruction>, DexError>;
}

use std::collections::HashMap;

use crate::analysis::entropy::EntropyCalculator;
use crate::analysis::instructions::{Instruction, InstructionDecoder, InstructionRef};
use crate::analysis::{component_base, is_api_reference, AccessFlags};
use crate::dex::container::{DexContainer, EncodedMethod};
use crate::dex::error::DexError;

/// Everything the analyzers know about one declared method.
///
/// `cyclomatic_complexity` starts unset and is filled in by the
/// [`crate::analysis::ComplexityEngine`]; methods without code never get one.
#[derive(Debug, Default)]
pub struct MethodMetrics {
    pub descriptor: String,
    pub access_flags: u32,
    pub annotation_count: u32,
    pub register_count: u32,
    pub try_catch_count: u32,
    pub debug_item_count: u32,
    pub instruction_count: u64,
    /// opcode -> occurrences.
    pub op_counts: HashMap<u16, u64>,
    /// Framework method descriptor -> call-site count.
    pub api_counts: HashMap<String, u64>,
    /// Framework field descriptor -> reference count.
    pub field_reference_counts: HashMap<String, u64>,
    /// String value -> reference count.
    pub string_reference_counts: HashMap<String, u64>,
    pub cyclomatic_complexity: Option<i64>,
    pub code_entropy: f64,
    pub code_perplexity: f64,
    /// Decoded stream, retained for the complexity pass.
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) has_code: bool,
}

impl MethodMetrics {
    pub(crate) fn analyze(
        container: &DexContainer,
        method: &EncodedMethod,
        annotation_count: u32,
        decoder: &dyn InstructionDecoder,
    ) -> Result<MethodMetrics, DexError> {
        let mut metrics = MethodMetrics {
            descriptor: container.method_descriptor(method.method_idx),
            access_flags: method.access_flags,
            annotation_count,
            ..MethodMetrics::default()
        };

        let Some(code) = &method.code else {
            return Ok(metrics);
        };
        metrics.has_code = true;
        metrics.register_count = code.registers_size as u32;
        metrics.try_catch_count = code.tries.len() as u32;
        metrics.debug_item_count = u32::from(code.has_debug_info);

        let instructions = decoder.decode(&code.instructions)?;
        for instruction in &instructions {
            metrics.instruction_count += 1;
            *metrics.op_counts.entry(instruction.opcode).or_insert(0) += 1;

            match instruction.reference {
                Some(InstructionRef::Method(id)) => {
                    let descriptor = container.method_descriptor(id);
                    // References on array classes match through their base type.
                    if is_api_reference(component_base(&descriptor)) {
                        *metrics.api_counts.entry(descriptor).or_insert(0) += 1;
                    }
                }
                Some(InstructionRef::Field(id)) => {
                    let descriptor = container.field_descriptor(id);
                    if is_api_reference(component_base(&descriptor)) {
                        *metrics.field_reference_counts.entry(descriptor).or_insert(0) += 1;
                    }
                }
                Some(InstructionRef::String(id)) => {
                    let value = container.string(id).to_string();
                    *metrics.string_reference_counts.entry(value).or_insert(0) += 1;
                }
                None => {}
            }
        }
        metrics.instructions = instructions;

        let mut calculator = EntropyCalculator::new();
        for unit in &code.instructions {
            calculator.observe(&unit.to_le_bytes());
        }
        metrics.code_entropy = calculator.entropy();
        metrics.code_perplexity = calculator.perplexity();

        Ok(metrics)
    }

    pub fn access(&self) -> AccessFlags {
        AccessFlags::from_bits_truncate(self.access_flags)
    }

    /// The part after `->`, unique within the declaring class.
    pub fn signature(&self) -> &str {
        self.descriptor.split_once("->").map(|(_, sig)| sig).unwrap_or(&self.descriptor)
    }
}

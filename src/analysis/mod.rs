//! Bytecode metrics: per-method instruction statistics, interprocedural
//! cyclomatic complexity, and byte entropy.
//!
//! Analysis is two-phase. Phase 1 ([`BytecodeUnit::index`]) parses each code
//! unit and records its declared classes; phase 2 ([`crate::analyze_units`])
//! walks instruction streams and computes complexity. Phase 1 must finish
//! for every unit before phase 2 starts anywhere, because "local vs
//! framework" classification spans all units analyzed together.

pub mod complexity;
pub mod entropy;
pub mod instructions;
pub mod method;
pub mod unit;

pub use complexity::ComplexityEngine;
pub use entropy::{entropy_of, EntropyCalculator, EntropyReader};
pub use instructions::{Instruction, InstructionDecoder, InstructionKind, InstructionRef};
pub use method::MethodMetrics;
pub use unit::{BytecodeUnit, ClassMetrics};

use std::collections::HashSet;

use bitflags::bitflags;

/// Phase 2 over a batch of indexed units: per-method metrics for every
/// class, one complexity pass across the whole batch, then reference
/// pruning and aggregate roll-ups. Locality spans the batch, so a class
/// declared in any unit counts as local in all of them.
pub fn analyze_units(units: &mut [BytecodeUnit], decoder: &dyn InstructionDecoder) {
    for unit in units.iter_mut() {
        unit.analyze_classes(decoder);
    }

    let mut engine = ComplexityEngine::new();
    engine.run(units);

    let all_local: HashSet<String> = units
        .iter()
        .flat_map(|unit| unit.local_classes().iter().cloned())
        .collect();
    for unit in units.iter_mut() {
        unit.prune_and_aggregate(&all_local);
    }
}

/// Class-path prefixes considered platform/runtime/standard-library API.
/// References outside this list are either local code or third-party code,
/// neither of which the framework-API counters track.
pub const API_PACKAGES: [&str; 20] = [
    "Landroid/",
    "Lcom/android/",
    "Lcom/google/",
    "Lcom/sec/android/",
    "Lcom/sun/",
    "Ldalvik/",
    "Lgov/",
    "Ljava/",
    "Ljavax/",
    "Ljunit/",
    "Llibcore/",
    "Lorg/apache/",
    "Lorg/ccil/",
    "Lorg/json/",
    "Lorg/kxml2/",
    "Lorg/spongycastle/",
    "Lorg/w3c/",
    "Lorg/xml/",
    "Lorg/xmlpull/",
    "Lsun/",
];

pub(crate) fn is_api_reference(reference: &str) -> bool {
    API_PACKAGES.iter().any(|prefix| reference.starts_with(prefix))
}

/// Strips leading array brackets: `[[Lfoo/Bar;` -> `Lfoo/Bar;`. Array
/// descriptors never appear in the declared-class set, so locality and
/// allow-list checks match on the element base type.
pub(crate) fn component_base(descriptor: &str) -> &str {
    descriptor.trim_start_matches('[')
}

bitflags! {
    /// Dex access flags, shared between classes, fields, and methods.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const TRANSIENT = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl AccessFlags {
    /// Lower-case names of the set flags, for accessor histograms.
    pub fn names(self) -> Vec<String> {
        self.iter_names().map(|(name, _)| name.to_ascii_lowercase()).collect()
    }
}

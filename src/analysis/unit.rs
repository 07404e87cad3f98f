use std::collections::{HashMap, HashSet};

use crate::analysis::instructions::InstructionDecoder;
use crate::analysis::method::MethodMetrics;
use crate::analysis::{component_base, AccessFlags};
use crate::dex::container::DexContainer;
use crate::dex::error::DexError;
use log::warn;

/// Per-class metrics, rolled up from the class's methods.
#[derive(Debug, Default)]
pub struct ClassMetrics {
    pub descriptor: String,
    pub access_flags: u32,
    pub field_count: usize,
    pub annotation_count: u32,
    /// method signature (the part after `->`) -> metrics.
    pub methods: HashMap<String, MethodMetrics>,
    pub op_counts: HashMap<u16, u64>,
    pub api_counts: HashMap<String, u64>,
    pub field_reference_counts: HashMap<String, u64>,
    pub string_reference_counts: HashMap<String, u64>,
    pub method_accessor_counts: HashMap<String, u64>,
    pub register_count: u64,
    pub instruction_count: u64,
    pub try_catch_count: u64,
    pub debug_item_count: u64,
    /// Mean of the class's method complexities.
    pub cyclomatic_complexity: f64,
    pub failed_methods: u32,
}

impl ClassMetrics {
    pub fn accessors(&self) -> Vec<String> {
        AccessFlags::from_bits_truncate(self.access_flags).names()
    }
}

/// One code unit (one dex file): its parsed container, the classes it
/// declares, and file-level aggregates.
///
/// Construction ([`BytecodeUnit::index`]) is phase 1 and only records the
/// declared-class set. Everything else is filled in by
/// [`crate::analyze_units`].
#[derive(Debug)]
pub struct BytecodeUnit {
    pub name: String,
    container: DexContainer,
    local_classes: HashSet<String>,
    pub classes: HashMap<String, ClassMetrics>,
    pub op_counts: HashMap<u16, u64>,
    pub api_counts: HashMap<String, u64>,
    pub field_reference_counts: HashMap<String, u64>,
    pub string_reference_counts: HashMap<String, u64>,
    pub method_accessor_counts: HashMap<String, u64>,
    pub class_accessor_counts: HashMap<String, u64>,
    pub field_count: u64,
    pub annotation_count: u64,
    pub register_count: u64,
    pub instruction_count: u64,
    pub try_catch_count: u64,
    pub debug_item_count: u64,
    /// Mean of the unit's class complexities.
    pub cyclomatic_complexity: f64,
    pub failed_classes: u32,
    pub failed_methods: u32,
}

impl BytecodeUnit {
    /// Phase 1: parse the container and index the classes it declares.
    pub fn index(name: &str, bytes: &[u8]) -> Result<BytecodeUnit, DexError> {
        let container = DexContainer::read(bytes)?;
        let local_classes = container
            .class_defs
            .iter()
            .map(|def| container.type_descriptor(def.class_idx).to_string())
            .collect();
        Ok(BytecodeUnit {
            name: name.to_string(),
            container,
            local_classes,
            classes: HashMap::new(),
            op_counts: HashMap::new(),
            api_counts: HashMap::new(),
            field_reference_counts: HashMap::new(),
            string_reference_counts: HashMap::new(),
            method_accessor_counts: HashMap::new(),
            class_accessor_counts: HashMap::new(),
            field_count: 0,
            annotation_count: 0,
            register_count: 0,
            instruction_count: 0,
            try_catch_count: 0,
            debug_item_count: 0,
            cyclomatic_complexity: 0.0,
            failed_classes: 0,
            failed_methods: 0,
        })
    }

    /// Class descriptors this unit declares.
    pub fn local_classes(&self) -> &HashSet<String> {
        &self.local_classes
    }

    pub fn container(&self) -> &DexContainer {
        &self.container
    }

    /// Phase 2, per-method pass: build metrics for every declared method.
    /// One bad method (or class) is counted and skipped, never fatal.
    pub(crate) fn analyze_classes(&mut self, decoder: &dyn InstructionDecoder) {
        let container = &self.container;
        for class_def in &container.class_defs {
            let descriptor = container.type_descriptor(class_def.class_idx).to_string();
            let mut class = ClassMetrics {
                descriptor: descriptor.clone(),
                access_flags: class_def.access_flags,
                annotation_count: class_def.class_annotation_count,
                ..ClassMetrics::default()
            };

            let Some(class_data) = &class_def.class_data else {
                self.classes.insert(descriptor, class);
                continue;
            };
            class.field_count =
                class_data.static_fields.len() + class_data.instance_fields.len();

            for method in class_data.methods() {
                let annotations = class_def
                    .method_annotation_counts
                    .get(&method.method_idx)
                    .copied()
                    .unwrap_or(0);
                match MethodMetrics::analyze(container, method, annotations, decoder) {
                    Ok(metrics) => {
                        class.methods.insert(metrics.signature().to_string(), metrics);
                    }
                    Err(e) => {
                        warn!(
                            "Failed to analyze method {}: {}; skipping",
                            container.method_descriptor(method.method_idx),
                            e
                        );
                        class.failed_methods += 1;
                    }
                }
            }
            self.failed_methods += class.failed_methods;
            self.classes.insert(descriptor, class);
        }
    }

    /// Phase 2, final pass: drop framework-counter entries that actually
    /// resolve to classes declared locally (in any unit analyzed together),
    /// then roll method metrics up into class and unit aggregates.
    ///
    /// Dalvik lets a child class stand in for a parent in references, so a
    /// reference matching an API prefix can still be local code. Support
    /// libraries are exempt from the pruning; they ship inside the package
    /// but are counted as framework.
    pub(crate) fn prune_and_aggregate(&mut self, all_local_classes: &HashSet<String>) {
        let is_local_non_support = |reference: &str| {
            let defining = reference.split_once("->").map(|(c, _)| c).unwrap_or(reference);
            let base = component_base(defining);
            !base.starts_with("Landroid/support/") && all_local_classes.contains(base)
        };

        for class in self.classes.values_mut() {
            for method in class.methods.values_mut() {
                method.api_counts.retain(|key, _| !is_local_non_support(key));
                method.field_reference_counts.retain(|key, _| !is_local_non_support(key));
            }
        }

        for class in self.classes.values_mut() {
            let mut complexity_sum = 0.0;
            for method in class.methods.values() {
                roll_up(&mut class.op_counts, &method.op_counts);
                roll_up(&mut class.api_counts, &method.api_counts);
                roll_up(&mut class.field_reference_counts, &method.field_reference_counts);
                roll_up(&mut class.string_reference_counts, &method.string_reference_counts);
                for name in method.access().names() {
                    *class.method_accessor_counts.entry(name).or_insert(0) += 1;
                }
                class.annotation_count += method.annotation_count;
                class.register_count += method.register_count as u64;
                class.instruction_count += method.instruction_count;
                class.try_catch_count += method.try_catch_count as u64;
                class.debug_item_count += method.debug_item_count as u64;
                complexity_sum += method.cyclomatic_complexity.unwrap_or(0) as f64;
            }
            if !class.methods.is_empty() {
                class.cyclomatic_complexity = complexity_sum / class.methods.len() as f64;
            }
        }

        let mut complexity_sum = 0.0;
        for class in self.classes.values() {
            roll_up(&mut self.op_counts, &class.op_counts);
            roll_up(&mut self.api_counts, &class.api_counts);
            roll_up(&mut self.field_reference_counts, &class.field_reference_counts);
            roll_up(&mut self.string_reference_counts, &class.string_reference_counts);
            roll_up(&mut self.method_accessor_counts, &class.method_accessor_counts);
            for name in class.accessors() {
                *self.class_accessor_counts.entry(name).or_insert(0) += 1;
            }
            self.field_count += class.field_count as u64;
            self.annotation_count += class.annotation_count as u64;
            self.register_count += class.register_count;
            self.instruction_count += class.instruction_count;
            self.try_catch_count += class.try_catch_count;
            self.debug_item_count += class.debug_item_count;
            complexity_sum += class.cyclomatic_complexity;
        }
        if !self.classes.is_empty() {
            self.cyclomatic_complexity = complexity_sum / self.classes.len() as f64;
        }
    }
}

fn roll_up<K: Clone + std::hash::Hash + Eq>(
    into: &mut HashMap<K, u64>,
    from: &HashMap<K, u64>,
) {
    for (key, count) in from {
        *into.entry(key.clone()).or_insert(0) += count;
    }
}

use std::collections::{HashMap, HashSet};

use crate::analysis::component_base;
use crate::analysis::instructions::{Instruction, InstructionKind, InstructionRef};
use crate::analysis::unit::BytecodeUnit;
use crate::dex::container::DexContainer;
use log::warn;

/// Call chains deeper than this stop recursing; the call site degrades to a
/// flat decision point. Guards against stack-shaped call graphs a cycle
/// check alone cannot bound.
pub const MAX_CALL_DEPTH: usize = 512;

/// Interprocedural cyclomatic complexity over every method in a set of
/// units: `decisionPoints − exits + 2`, where a call into a locally-declared
/// method contributes the callee's whole complexity instead of 1.
///
/// Complexities are memoized by full method descriptor, so a method called
/// from many sites (in any unit) is walked once.
#[derive(Debug, Default)]
pub struct ComplexityEngine {
    memo: HashMap<String, i64>,
}

struct Frame<'a> {
    descriptor: String,
    instructions: &'a [Instruction],
    container: &'a DexContainer,
    pc: usize,
    decision_points: i64,
    exits: i64,
}

impl ComplexityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes and stores a complexity for every method with code, writing
    /// it into each method's metrics.
    pub fn run(&mut self, units: &mut [BytecodeUnit]) {
        {
            let locals: HashSet<&str> = units
                .iter()
                .flat_map(|unit| unit.local_classes().iter().map(String::as_str))
                .collect();
            let mut streams: HashMap<&str, (&[Instruction], &DexContainer)> = HashMap::new();
            for unit in units.iter() {
                for class in unit.classes.values() {
                    for method in class.methods.values() {
                        if method.has_code {
                            streams.insert(
                                method.descriptor.as_str(),
                                (method.instructions.as_slice(), unit.container()),
                            );
                        }
                    }
                }
            }

            // Roots are walked in descriptor order so cycle and truncation
            // scores are reproducible from run to run.
            let mut roots: Vec<&str> = streams.keys().copied().collect();
            roots.sort_unstable();
            for descriptor in roots {
                if !self.memo.contains_key(descriptor) {
                    self.compute(descriptor, &streams, &locals);
                }
            }
        }

        for unit in units.iter_mut() {
            for class in unit.classes.values_mut() {
                for method in class.methods.values_mut() {
                    if method.has_code {
                        method.cyclomatic_complexity = self.memo.get(&method.descriptor).copied();
                    }
                }
            }
        }
    }

    pub fn complexity_of(&self, descriptor: &str) -> Option<i64> {
        self.memo.get(descriptor).copied()
    }

    /// Walks one method (and, transitively, its local callees) with an
    /// explicit frame stack. `visited` spans the whole walk: a call back
    /// into any method already on or above the stack counts as a single
    /// decision point instead of recursing again.
    fn compute<'a>(
        &mut self,
        descriptor: &str,
        streams: &HashMap<&str, (&'a [Instruction], &'a DexContainer)>,
        locals: &HashSet<&str>,
    ) {
        let Some(&(instructions, container)) = streams.get(descriptor) else {
            return;
        };

        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![Frame {
            descriptor: descriptor.to_string(),
            instructions,
            container,
            pc: 0,
            decision_points: 0,
            exits: 0,
        }];

        while let Some(mut frame) = stack.pop() {
            let mut child: Option<Frame<'a>> = None;
            while frame.pc < frame.instructions.len() {
                let instruction = frame.instructions[frame.pc];
                frame.pc += 1;
                match instruction.kind {
                    InstructionKind::Branch => frame.decision_points += 1,
                    InstructionKind::SwitchPayload { case_count } => {
                        frame.decision_points += case_count as i64
                    }
                    InstructionKind::Return => frame.exits += 1,
                    // Every throw implies a try somewhere, which is a kind
                    // of branch; without the decision point a method could
                    // go arbitrarily negative on throws alone.
                    InstructionKind::Throw => {
                        frame.decision_points += 1;
                        frame.exits += 1;
                    }
                    InstructionKind::Invoke => {
                        let target = match instruction.reference {
                            Some(InstructionRef::Method(id)) => {
                                frame.container.method_descriptor(id)
                            }
                            _ => {
                                frame.decision_points += 1;
                                continue;
                            }
                        };
                        if visited.contains(&target) {
                            frame.decision_points += 1;
                            continue;
                        }
                        let defining =
                            target.split_once("->").map(|(c, _)| c).unwrap_or(&target);
                        if !locals.contains(component_base(defining)) {
                            // Unknowable complexity; treat as an opaque call.
                            frame.decision_points += 1;
                            continue;
                        }
                        if let Some(&memoized) = self.memo.get(&target) {
                            frame.decision_points += memoized;
                            continue;
                        }
                        match streams.get(target.as_str()) {
                            Some(&(callee_instructions, callee_container)) => {
                                if stack.len() + 1 >= MAX_CALL_DEPTH {
                                    warn!(
                                        "call chain exceeded {MAX_CALL_DEPTH} frames at {target}; treating as opaque"
                                    );
                                    frame.decision_points += 1;
                                    continue;
                                }
                                visited.insert(target.clone());
                                child = Some(Frame {
                                    descriptor: target,
                                    instructions: callee_instructions,
                                    container: callee_container,
                                    pc: 0,
                                    decision_points: 0,
                                    exits: 0,
                                });
                                break;
                            }
                            // Local but abstract/native: nothing to add.
                            None => {}
                        }
                    }
                    InstructionKind::Other => {}
                }
            }

            if let Some(child) = child {
                stack.push(frame);
                stack.push(child);
                continue;
            }

            let complexity = frame.decision_points - frame.exits + 2;
            self.memo.insert(frame.descriptor, complexity);
            if let Some(parent) = stack.last_mut() {
                parent.decision_points += complexity;
            }
        }
    }
}

use crate::dex::code::{Code, Instruction, InvokeKind, MethodRef, Register, ValueKind};
use crate::dex::Error;
use std::collections::BTreeSet;

/// Call to an instance initializer on the uninitialized receiver
#[derive(Clone, PartialEq, Debug)]
pub struct DelegatedInit {
    /// Position of the invoke in the instruction stream
    pub position: usize,

    /// Constructor being called
    pub method: MethodRef,
}

/// Registers holding the uninitialized receiver, at every reachable instruction
pub struct UninitializedThis {
    /// Set before each instruction (`None` for unreachable instructions)
    states: Vec<Option<BTreeSet<Register>>>,

    delegated_inits: Vec<DelegatedInit>,
}

impl UninitializedThis {
    /// Run the analysis on a constructor body (`p0` is the receiver)
    pub fn analyze(code: &Code) -> Result<UninitializedThis, Error> {
        let labels = code.label_positions()?;
        let instructions = &code.instructions;

        let mut states: Vec<Option<BTreeSet<Register>>> = vec![None; instructions.len()];
        let mut worklist: Vec<usize> = vec![];
        if !instructions.is_empty() {
            states[0] = Some(BTreeSet::from([Register::param(0)]));
            worklist.push(0);
        }

        while let Some(position) = worklist.pop() {
            let state_in = match &states[position] {
                Some(state) => state.clone(),
                None => continue,
            };
            let instruction = &instructions[position];
            let state_out = transfer(instruction, state_in);

            let mut successors = vec![];
            if instruction.can_fall_through() && position + 1 < instructions.len() {
                successors.push(position + 1);
            }
            for target in instruction.branch_targets() {
                let target = *labels.get(&target).ok_or(Error::UnplacedLabel(target))?;
                successors.push(target);
            }

            for successor in successors {
                let slot = &mut states[successor];
                let changed = if let Some(existing) = slot.as_mut() {
                    let before = existing.len();
                    existing.extend(state_out.iter().copied());
                    existing.len() != before
                } else {
                    *slot = Some(state_out.clone());
                    true
                };
                if changed {
                    worklist.push(successor);
                }
            }
        }

        let delegated_inits = instructions
            .iter()
            .enumerate()
            .filter_map(|(position, instruction)| {
                let state = states[position].as_ref()?;
                match instruction {
                    Instruction::Invoke {
                        kind: InvokeKind::Direct,
                        args,
                        method,
                        ..
                    } if method.name.is_init() => {
                        let receiver = args.iter().next()?;
                        if state.contains(&receiver.narrow()) {
                            Some(DelegatedInit {
                                position,
                                method: method.clone(),
                            })
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            })
            .collect();

        Ok(UninitializedThis {
            states,
            delegated_inits,
        })
    }

    /// Registers holding the uninitialized receiver right before an instruction
    pub fn before(&self, position: usize) -> Option<&BTreeSet<Register>> {
        self.states.get(position)?.as_ref()
    }

    /// Every reachable `invoke-direct <init>` whose receiver is still uninitialized
    pub fn delegated_inits(&self) -> &[DelegatedInit] {
        &self.delegated_inits
    }
}

fn transfer(instruction: &Instruction, mut state: BTreeSet<Register>) -> BTreeSet<Register> {
    match instruction {
        Instruction::Move(ValueKind::Object, dst, src) => {
            if state.contains(src) {
                state.insert(*dst);
            } else {
                state.remove(dst);
            }
        }
        Instruction::Invoke {
            kind: InvokeKind::Direct,
            args,
            method,
            ..
        } if method.name.is_init() => {
            let initializes_this = args
                .iter()
                .next()
                .map_or(false, |receiver| state.contains(&receiver.narrow()));
            if initializes_this {
                state.clear();
            }
        }
        other => {
            if let Some(written) = other.written_register() {
                for slot in written.slots() {
                    state.remove(&slot);
                }
            }
        }
    }
    state
}

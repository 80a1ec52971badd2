//! Abstract synthesis steps
//!
//! Steps describe a conversion body without committing to any concrete
//! syntax. The emitter walks them in order; nested bodies belong to guards
//! and loops.

use serde::{Deserialize, Serialize};

use crate::directive::TransformRef;
use crate::generation::plan::MapperSignature;

/// Temporary value introduced by the synthesizer, unique within one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot(pub u32);

/// A value that can be read
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Operand {
    /// The unit's input value
    Parameter,
    /// Stored field of the input value
    Field(String),
    /// Temporary or loop element
    Slot(Slot),
}

/// A location that can be written
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Place {
    /// Temporary declared by the synthesizer
    Slot(Slot),
    /// Field of the value under construction
    Field(String),
    /// Next item of the enclosing loop's output collection
    Item,
    /// The unit's return value
    Result,
}

/// How an argument is adapted to the callee's parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adapt {
    AsIs,
    AddressOf,
    Dereference,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    pub operand: Operand,
    pub adapt: Adapt,
}

/// What is being called
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Callee {
    /// Zero-argument method on `receiver`
    Accessor { receiver: Operand, name: String },
    /// Conversion function or type method; type methods run on an injected `binding`
    Transform {
        reference: TransformRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        binding: Option<String>,
    },
    /// Shared private unit
    SubMapper {
        unit: String,
        signature: MapperSignature,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invocation {
    pub callee: Callee,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Expr {
    Value(Operand),
    Call(Invocation),
}

/// One operation of a conversion body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SynthesisStep {
    /// `target = value`
    Assign { target: Place, value: Expr },

    /// `target, err = call`; on failure the unit returns the zero value and the error
    CheckedAssign { target: Place, call: Invocation },

    /// Runs `body` only when `subject` is present; `declare` is zero-initialized first
    GuardedAssign {
        subject: Operand,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        declare: Option<Place>,
        body: Vec<SynthesisStep>,
    },

    /// `target = *from`, always nested in a guard on `from`
    Dereference { target: Place, from: Operand },

    /// `target = &from`
    AddressOf { target: Place, from: Operand },

    /// Builds `target` from each `element` of `over`; pre-sized when nothing is filtered out
    CollectLoop {
        target: Place,
        over: Operand,
        element: Slot,
        presized: bool,
        body: Vec<SynthesisStep>,
    },
}

impl SynthesisStep {
    /// Short tag for logging
    pub fn name(&self) -> &'static str {
        match self {
            SynthesisStep::Assign { .. } => "Assign",
            SynthesisStep::CheckedAssign { .. } => "CheckedAssign",
            SynthesisStep::GuardedAssign { .. } => "GuardedAssign",
            SynthesisStep::Dereference { .. } => "Dereference",
            SynthesisStep::AddressOf { .. } => "AddressOf",
            SynthesisStep::CollectLoop { .. } => "CollectLoop",
        }
    }

    /// Nested body of a guard or loop
    pub fn body(&self) -> &[SynthesisStep] {
        match self {
            SynthesisStep::GuardedAssign { body, .. } | SynthesisStep::CollectLoop { body, .. } => {
                body
            }
            _ => &[],
        }
    }

    /// The invocation performed directly by this step, if any
    pub fn invocation(&self) -> Option<&Invocation> {
        match self {
            SynthesisStep::CheckedAssign { call, .. } => Some(call),
            SynthesisStep::Assign {
                value: Expr::Call(call),
                ..
            } => Some(call),
            _ => None,
        }
    }
}

/// Depth-first, pre-order walk over a step tree
pub fn walk<'a>(steps: &'a [SynthesisStep], visit: &mut impl FnMut(&'a SynthesisStep)) {
    for step in steps {
        visit(step);
        walk(step.body(), visit);
    }
}

/// Step names in walk order, e.g. `["GuardedAssign", "CheckedAssign"]`
pub fn step_names(steps: &[SynthesisStep]) -> Vec<&'static str> {
    let mut names = Vec::new();
    walk(steps, &mut |s| names.push(s.name()));
    names
}

/// Whether any step can fail
pub fn is_fallible(steps: &[SynthesisStep]) -> bool {
    let mut fallible = false;
    walk(steps, &mut |s| {
        fallible |= matches!(s, SynthesisStep::CheckedAssign { .. })
    });
    fallible
}

pub fn contains_guard(steps: &[SynthesisStep]) -> bool {
    let mut found = false;
    walk(steps, &mut |s| {
        found |= matches!(s, SynthesisStep::GuardedAssign { .. })
    });
    found
}

/// Whether every dereference, explicit or as an argument adaptation, sits
/// inside a guard on the value being dereferenced.
pub fn dereferences_are_guarded(steps: &[SynthesisStep]) -> bool {
    fn check(steps: &[SynthesisStep], guarded: &mut Vec<Operand>) -> bool {
        steps.iter().all(|step| {
            let argument_ok = step
                .invocation()
                .and_then(|call| call.argument.as_ref())
                .filter(|arg| arg.adapt == Adapt::Dereference)
                .map_or(true, |arg| guarded.contains(&arg.operand));

            let own_ok = match step {
                SynthesisStep::Dereference { from, .. } => guarded.contains(from),
                SynthesisStep::GuardedAssign { subject, body, .. } => {
                    guarded.push(subject.clone());
                    let ok = check(body, guarded);
                    guarded.pop();
                    ok
                }
                SynthesisStep::CollectLoop { body, .. } => check(body, guarded),
                _ => true,
            };
            argument_ok && own_ok
        })
    }
    check(steps, &mut Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deref(slot: u32) -> SynthesisStep {
        SynthesisStep::Dereference {
            target: Place::Field("Age".to_string()),
            from: Operand::Slot(Slot(slot)),
        }
    }

    #[test]
    fn test_walk_order() {
        let steps = vec![SynthesisStep::GuardedAssign {
            subject: Operand::Slot(Slot(0)),
            declare: None,
            body: vec![deref(0)],
        }];
        assert_eq!(step_names(&steps), vec!["GuardedAssign", "Dereference"]);
        assert!(contains_guard(&steps));
        assert!(!is_fallible(&steps));
    }

    #[test]
    fn test_dereference_guard_detection() {
        let guarded = vec![SynthesisStep::GuardedAssign {
            subject: Operand::Slot(Slot(0)),
            declare: None,
            body: vec![deref(0)],
        }];
        assert!(dereferences_are_guarded(&guarded));

        let wrong_subject = vec![SynthesisStep::GuardedAssign {
            subject: Operand::Slot(Slot(1)),
            declare: None,
            body: vec![deref(0)],
        }];
        assert!(!dereferences_are_guarded(&wrong_subject));
        assert!(!dereferences_are_guarded(&[deref(0)]));
    }

    #[test]
    fn test_step_serialization_is_tagged() {
        let step = SynthesisStep::Assign {
            target: Place::Field("Name".to_string()),
            value: Expr::Value(Operand::Field("Name".to_string())),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["step"], "assign");
        assert_eq!(json["target"]["kind"], "field");
        assert_eq!(json["target"]["name"], "Name");
    }
}

//! Conversion synthesizer
//!
//! Turns one link of a conversion chain into abstract steps. The wrapping
//! is a decision table over five axes:
//!
//! | axis                   | values                |
//! |------------------------|-----------------------|
//! | operation fallible     | yes / no              |
//! | multiplicity           | scalar / collection   |
//! | source optional        | yes / no              |
//! | operation returns opt. | yes / no              |
//! | destination optional   | yes / no              |
//!
//! Argument adaptation and result delivery are each an exhaustive match
//! over two booleans, so every combination has exactly one answer. Only
//! links without an operation (plain copies) and shapes outside the table
//! (mismatched multiplicities) can be rejected.

use tracing::trace;

use crate::error::{Error, Result};
use crate::generation::plan::{ConversionPlan, ResolvedSource};
use crate::generation::steps::{
    Adapt, Argument, Callee, Expr, Invocation, Operand, Place, Slot, SynthesisStep,
};
use crate::naming;
use crate::types::{Multiplicity, TypeShape};

/// A callable link: accessor, transform or sub-mapper
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub callee: Callee,
    /// Argument shape as seen by the caller; unset for accessors
    pub param: Option<TypeShape>,
    pub result: TypeShape,
    pub fallible: bool,
}

impl Operation {
    /// Operation performed by a resolved link; plain field reads have none
    pub fn from_source(link: &ResolvedSource) -> Option<Operation> {
        match link {
            ResolvedSource::DirectField(_) => None,
            ResolvedSource::MethodCall(sig) => Some(Operation {
                callee: Callee::Accessor {
                    receiver: Operand::Parameter,
                    name: sig.name.clone(),
                },
                param: None,
                result: sig.result.clone(),
                fallible: sig.fallible,
            }),
            ResolvedSource::Transform {
                reference,
                signature,
            } => Some(Operation {
                callee: Callee::Transform {
                    reference: reference.clone(),
                    binding: reference.receiver().map(|r| naming::dependency_name(&r)),
                },
                param: signature.argument_shape(),
                result: signature.result.clone(),
                fallible: signature.fallible,
            }),
            ResolvedSource::SubMapper {
                unit,
                signature,
                fallible,
            } => Some(Operation {
                callee: Callee::SubMapper {
                    unit: unit.clone(),
                    signature: signature.clone(),
                },
                param: Some(TypeShape::structure(signature.source.clone())),
                result: TypeShape::structure(signature.destination.clone()),
                fallible: *fallible,
            }),
        }
    }
}

/// Whether the surrounding unit can return a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSurface {
    /// Pass 1: fallibility is still being discovered
    Speculative,
    /// Pass 2: the unit's final signature is known
    Declared { can_fail: bool },
}

impl ErrorSurface {
    fn permits_failure(&self) -> bool {
        match self {
            ErrorSurface::Speculative => true,
            ErrorSurface::Declared { can_fail } => *can_fail,
        }
    }
}

/// One point of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Axes {
    pub fallible: bool,
    pub multiplicity: Multiplicity,
    pub source_optional: bool,
    pub returns_optional: bool,
    pub destination_optional: bool,
}

impl Axes {
    /// All 32 combinations in a fixed order
    pub fn all() -> impl Iterator<Item = Axes> {
        (0u8..32).map(|bits| Axes {
            fallible: bits & 1 != 0,
            multiplicity: if bits & 2 != 0 {
                Multiplicity::Collection
            } else {
                Multiplicity::Scalar
            },
            source_optional: bits & 4 != 0,
            returns_optional: bits & 8 != 0,
            destination_optional: bits & 16 != 0,
        })
    }
}

/// How the input reaches the operation's parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgumentStrategy {
    /// value into value
    Plain,
    /// value into optional parameter
    Borrow,
    /// optional into optional parameter; the operation handles absence
    Forward,
    /// optional into value parameter; skip the call when absent
    GuardThenDereference,
}

impl ArgumentStrategy {
    fn select(source_optional: bool, accepts_optional: bool) -> Self {
        match (source_optional, accepts_optional) {
            (false, false) => ArgumentStrategy::Plain,
            (false, true) => ArgumentStrategy::Borrow,
            (true, true) => ArgumentStrategy::Forward,
            (true, false) => ArgumentStrategy::GuardThenDereference,
        }
    }
}

/// How the operation's result reaches the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Direct,
    /// value result, optional destination
    Widen,
    /// optional result, value destination; absent results are skipped
    Narrow,
}

impl Delivery {
    fn select(returns_optional: bool, destination_optional: bool) -> Self {
        match (returns_optional, destination_optional) {
            (false, false) | (true, true) => Delivery::Direct,
            (false, true) => Delivery::Widen,
            (true, false) => Delivery::Narrow,
        }
    }
}

/// Step builder for one unit body
///
/// Slots are numbered from zero per synthesizer, so one synthesizer must be
/// used per unit.
#[derive(Debug)]
pub struct Synthesizer {
    surface: ErrorSurface,
    next_slot: u32,
}

impl Synthesizer {
    pub fn new(surface: ErrorSurface) -> Self {
        Self {
            surface,
            next_slot: 0,
        }
    }

    /// Number of slots allocated so far
    pub fn slots_used(&self) -> u32 {
        self.next_slot
    }

    fn slot(&mut self) -> Slot {
        let slot = Slot(self.next_slot);
        self.next_slot += 1;
        slot
    }

    /// Copy `input` into `target` with no operation in between
    pub fn pass_through(
        &mut self,
        input: Operand,
        from: &TypeShape,
        target: Place,
        to: &TypeShape,
    ) -> Result<Vec<SynthesisStep>> {
        if from.multiplicity != to.multiplicity {
            return Err(multiplicity_mismatch(from, to));
        }
        let steps = match (from.optional, to.optional) {
            (false, false) | (true, true) => vec![SynthesisStep::Assign {
                target,
                value: Expr::Value(input),
            }],
            (true, false) => return Err(unsafe_narrowing(from, to)),
            (false, true) => match from.multiplicity {
                Multiplicity::Scalar => vec![SynthesisStep::AddressOf {
                    target,
                    from: input,
                }],
                Multiplicity::Collection => {
                    let element = self.slot();
                    vec![SynthesisStep::CollectLoop {
                        target,
                        over: input,
                        element,
                        presized: true,
                        body: vec![SynthesisStep::AddressOf {
                            target: Place::Item,
                            from: Operand::Slot(element),
                        }],
                    }]
                }
            },
        };
        Ok(steps)
    }

    /// Apply `op` to `input` and write the result into `target`.
    ///
    /// For accessors `input` is the receiver and `from` its shape.
    pub fn invoke(
        &mut self,
        input: Operand,
        from: &TypeShape,
        op: &Operation,
        target: Place,
        to: &TypeShape,
    ) -> Result<Vec<SynthesisStep>> {
        let steps = match (&op.param, from.multiplicity) {
            (None, _) => {
                let call = Invocation {
                    callee: op.callee.clone(),
                    argument: None,
                };
                self.deliver(call, op, target, to)?
            }
            (Some(param), Multiplicity::Scalar) => match param.multiplicity {
                Multiplicity::Scalar => self.scalar(input, from, param, op, target, to)?,
                Multiplicity::Collection => return Err(multiplicity_mismatch(from, param)),
            },
            (Some(param), Multiplicity::Collection) => match param.multiplicity {
                Multiplicity::Scalar => self.element_wise(input, from, param, op, target, to)?,
                Multiplicity::Collection => self.whole(input, from, param, op, target, to)?,
            },
        };
        trace!(steps = ?crate::generation::steps::step_names(&steps), "synthesized link");
        Ok(steps)
    }

    /// Apply `op` to `input` into a fresh slot, returning the slot and its shape
    pub fn invoke_into_slot(
        &mut self,
        input: Operand,
        from: &TypeShape,
        op: &Operation,
    ) -> Result<(Vec<SynthesisStep>, Operand, TypeShape)> {
        let lifted = op.param.as_ref().is_some_and(|p| {
            from.multiplicity == Multiplicity::Collection && p.multiplicity == Multiplicity::Scalar
        });
        let shape = if lifted {
            op.result.clone().collection()
        } else {
            op.result.clone()
        };
        let slot = self.slot();
        let steps = self.invoke(input, from, op, Place::Slot(slot), &shape)?;
        Ok((steps, Operand::Slot(slot), shape))
    }

    /// Steps producing `plan.destination` from a `source` value.
    ///
    /// The read and every intermediate link write to fresh slots; the last
    /// link writes the destination field.
    pub fn synthesize_plan(
        &mut self,
        plan: &ConversionPlan,
        source: &TypeShape,
    ) -> Result<Vec<SynthesisStep>> {
        let target = Place::Field(plan.destination.name.clone());
        let to = &plan.destination.shape;

        let mut steps = Vec::new();
        let (mut value, mut shape) = match &plan.read {
            ResolvedSource::DirectField(field) => {
                (Operand::Field(field.name.clone()), field.shape.clone())
            }
            _ => (Operand::Parameter, source.clone()),
        };

        let mut operations = Vec::with_capacity(plan.links.len() + 1);
        operations.extend(Operation::from_source(&plan.read));
        for link in &plan.links {
            let op = Operation::from_source(link).ok_or_else(|| {
                Error::from(anyhow::anyhow!(
                    "field '{}' reads a plain field after its first link",
                    plan.destination.name
                ))
            })?;
            operations.push(op);
        }

        let Some((last, intermediate)) = operations.split_last() else {
            return self.pass_through(value, &shape, target, to);
        };
        for op in intermediate {
            let (link_steps, slot, slot_shape) = self.invoke_into_slot(value, &shape, op)?;
            steps.extend(link_steps);
            value = slot;
            shape = slot_shape;
        }
        steps.extend(self.invoke(value, &shape, last, target, to)?);
        Ok(steps)
    }

    /// Canonical steps for one point of the decision table.
    ///
    /// The input is a field named `In`, the target a field named `Out`, and
    /// `accepts_optional` sets the operation's parameter optionality.
    pub fn synthesize_axes(
        &mut self,
        axes: Axes,
        accepts_optional: bool,
    ) -> Result<Vec<SynthesisStep>> {
        let mut from = TypeShape::primitive("int").with_optional(axes.source_optional);
        let mut to = TypeShape::primitive("string").with_optional(axes.destination_optional);
        if axes.multiplicity == Multiplicity::Collection {
            from = from.collection();
            to = to.collection();
        }
        let op = Operation {
            callee: Callee::Transform {
                reference: crate::directive::TransformRef::Function {
                    module: None,
                    name: "Convert".to_string(),
                },
                binding: None,
            },
            param: Some(TypeShape::primitive("int").with_optional(accepts_optional)),
            result: TypeShape::primitive("string").with_optional(axes.returns_optional),
            fallible: axes.fallible,
        };
        self.invoke(
            Operand::Field("In".to_string()),
            &from,
            &op,
            Place::Field("Out".to_string()),
            &to,
        )
    }

    fn scalar(
        &mut self,
        input: Operand,
        from: &TypeShape,
        param: &TypeShape,
        op: &Operation,
        target: Place,
        to: &TypeShape,
    ) -> Result<Vec<SynthesisStep>> {
        let call = |adapt| Invocation {
            callee: op.callee.clone(),
            argument: Some(Argument {
                operand: input.clone(),
                adapt,
            }),
        };
        match ArgumentStrategy::select(from.optional, param.optional) {
            ArgumentStrategy::Plain | ArgumentStrategy::Forward => {
                self.deliver(call(Adapt::AsIs), op, target, to)
            }
            ArgumentStrategy::Borrow => self.deliver(call(Adapt::AddressOf), op, target, to),
            ArgumentStrategy::GuardThenDereference => {
                let declare = declaration_for(&target);
                let body = self.deliver(call(Adapt::Dereference), op, target, to)?;
                Ok(vec![SynthesisStep::GuardedAssign {
                    subject: input,
                    declare,
                    body,
                }])
            }
        }
    }

    fn element_wise(
        &mut self,
        input: Operand,
        from: &TypeShape,
        param: &TypeShape,
        op: &Operation,
        target: Place,
        to: &TypeShape,
    ) -> Result<Vec<SynthesisStep>> {
        if to.multiplicity != Multiplicity::Collection || op.result.is_collection() {
            return Err(multiplicity_mismatch(&op.result.clone().collection(), to));
        }
        let element = self.slot();
        let body = self.scalar(
            Operand::Slot(element),
            &from.element(),
            param,
            op,
            Place::Item,
            &to.element(),
        )?;

        let filters_absent_input = from.optional && !param.optional;
        let filters_absent_result = op.result.optional && !to.optional;
        let presized = !op.fallible && !filters_absent_input && !filters_absent_result;

        Ok(vec![SynthesisStep::CollectLoop {
            target,
            over: input,
            element,
            presized,
            body,
        }])
    }

    fn whole(
        &mut self,
        input: Operand,
        from: &TypeShape,
        param: &TypeShape,
        op: &Operation,
        target: Place,
        to: &TypeShape,
    ) -> Result<Vec<SynthesisStep>> {
        match (from.optional, param.optional) {
            (true, false) => return Err(unsafe_narrowing(from, param)),
            (false, true) => {
                return Err(no_conversion_path(
                    from,
                    param,
                    "element optionality of a collection argument cannot be widened",
                ))
            }
            (false, false) | (true, true) => {}
        }
        let call = Invocation {
            callee: op.callee.clone(),
            argument: Some(Argument {
                operand: input,
                adapt: Adapt::AsIs,
            }),
        };
        self.deliver(call, op, target, to)
    }

    /// Write the result of `call` into `target`, reconciling optionality
    fn deliver(
        &mut self,
        call: Invocation,
        op: &Operation,
        target: Place,
        to: &TypeShape,
    ) -> Result<Vec<SynthesisStep>> {
        let result = &op.result;
        if result.multiplicity != to.multiplicity {
            return Err(multiplicity_mismatch(result, to));
        }
        if result.multiplicity == Multiplicity::Collection && result.optional != to.optional {
            return Err(if result.optional {
                unsafe_narrowing(result, to)
            } else {
                no_conversion_path(
                    result,
                    to,
                    "element optionality of a collection result cannot be widened",
                )
            });
        }

        match Delivery::select(result.optional, to.optional) {
            Delivery::Direct => Ok(vec![self.assign_call(target, call, op.fallible)?]),
            Delivery::Widen => {
                let tmp = self.slot();
                Ok(vec![
                    self.assign_call(Place::Slot(tmp), call, op.fallible)?,
                    SynthesisStep::AddressOf {
                        target,
                        from: Operand::Slot(tmp),
                    },
                ])
            }
            Delivery::Narrow => {
                let tmp = self.slot();
                Ok(vec![
                    self.assign_call(Place::Slot(tmp), call, op.fallible)?,
                    SynthesisStep::GuardedAssign {
                        subject: Operand::Slot(tmp),
                        declare: None,
                        body: vec![SynthesisStep::Dereference {
                            target,
                            from: Operand::Slot(tmp),
                        }],
                    },
                ])
            }
        }
    }

    fn assign_call(
        &self,
        target: Place,
        call: Invocation,
        fallible: bool,
    ) -> Result<SynthesisStep> {
        if !fallible {
            return Ok(SynthesisStep::Assign {
                target,
                value: Expr::Call(call),
            });
        }
        if !self.surface.permits_failure() {
            return Err(Error::FallibleWithoutErrorSignature {
                method: String::new(),
                field: String::new(),
            });
        }
        Ok(SynthesisStep::CheckedAssign { target, call })
    }
}

/// Variables declared ahead of a guard; loop items are simply not produced
fn declaration_for(target: &Place) -> Option<Place> {
    match target {
        Place::Item => None,
        other => Some(other.clone()),
    }
}

fn multiplicity_mismatch(from: &TypeShape, to: &TypeShape) -> Error {
    Error::MultiplicityMismatch {
        method: String::new(),
        field: String::new(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn unsafe_narrowing(from: &TypeShape, to: &TypeShape) -> Error {
    Error::UnsafeNarrowing {
        method: String::new(),
        field: String::new(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn no_conversion_path(from: &TypeShape, to: &TypeShape, reason: &str) -> Error {
    Error::NoConversionPath {
        method: String::new(),
        field: String::new(),
        from: from.to_string(),
        to: to.to_string(),
        reason: Some(reason.to_string()),
    }
}

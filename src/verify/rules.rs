use itertools::Itertools;
use tracing::debug;

use super::errors::{BlockDefect, Invariant, Location, ShapeDefect, VerificationFailure};
use crate::{
    ir::{BlockIndex, Function, InstKind, Instruction, Operand},
    types::{Shape, ShapeView, SignatureProvider},
};

type CheckResult = Result<(), VerificationFailure>;

/// Checks a single instruction in the context of its block and function.
pub(super) struct InstChecker<'a, P: SignatureProvider> {
    pub provider: &'a P,
    pub function: &'a Function<P::Ty>,
    pub block: BlockIndex,
    pub index: usize,
    pub inst: &'a Instruction,
    pub is_last: bool,
}

impl<P: SignatureProvider> InstChecker<'_, P> {
    /// Terminators end their block, and only they do.
    pub fn check_position(&self) -> CheckResult {
        let defect = match (self.inst.kind.is_terminator(), self.is_last) {
            (false, true) => BlockDefect::MissingTerminator,
            (true, false) => BlockDefect::TerminatorNotLast,
            _ => return Ok(()),
        };
        Err(self.malformed(defect))
    }

    pub fn check(&self) -> CheckResult {
        use Invariant::*;

        match &self.inst.kind {
            InstKind::AllocVar => self.check_alloc_var(),
            InstKind::AllocRef => self.check_alloc_ref(),
            InstKind::Apply { callee, args } => self.check_apply(*callee, args),
            InstKind::ConstantRef { .. } => self.check_constant_ref(),
            InstKind::IntegerLiteral { .. } => self.check_integer(IntegerLiteralType),
            InstKind::IntegerValue { .. } => self.check_integer(IntegerValueType),
            InstKind::Load { address } => self.check_load(*address),
            InstKind::Store { src, dest } => self.check_store(*src, *dest),
            InstKind::CopyAddr { src, dest, .. } => self.check_copy_addr(*src, *dest),
            InstKind::ZeroAddr { dest } => {
                let dest_ty = self.operand_ty(*dest)?;
                self.ensure(
                    self.provider.is_address(dest_ty),
                    ZeroAddrDestAddress,
                    || self.describe("dest", dest_ty),
                )
            }
            InstKind::ZeroValue => {
                let result = self.result_ty()?;
                self.ensure(
                    !self.provider.is_address(result),
                    ZeroValueNotAddress,
                    || self.describe("result", result),
                )
            }
            InstKind::Specialize { operand } => self.check_specialize(*operand),
            InstKind::Tuple { elements } => self.check_tuple(elements),
            InstKind::Metatype => {
                let result = self.result_ty()?;
                self.ensure(
                    self.is_shape(result, Shape::Metatype),
                    MetatypeResult,
                    || self.describe("result", result),
                )
            }
            InstKind::AssociatedMetatype { source, .. } => self.check_associated_metatype(*source),
            InstKind::Retain { operand } => {
                self.check_ref_counted(*operand, RetainOperandNotAddress, RetainOperandReference)
            }
            InstKind::Release { operand } => {
                self.check_ref_counted(*operand, ReleaseOperandNotAddress, ReleaseOperandReference)
            }
            InstKind::DeallocVar { operand } => {
                let ty = self.operand_ty(*operand)?;
                self.ensure(
                    self.provider.is_address(ty),
                    DeallocVarOperandAddress,
                    || self.describe("operand", ty),
                )
            }
            InstKind::DeallocRef { operand } => self.check_ref_counted(
                *operand,
                DeallocRefOperandNotAddress,
                DeallocRefOperandReference,
            ),
            InstKind::DestroyAddr { operand } => {
                let ty = self.operand_ty(*operand)?;
                self.ensure(
                    self.provider.is_address_only(ty),
                    DestroyAddrAddressOnly,
                    || self.describe("operand", ty),
                )
            }
            InstKind::IndexAddr { operand, .. } => self.check_index_addr(*operand),
            InstKind::Extract { operand, .. } => self.check_extract(*operand),
            InstKind::ElementAddr { operand, .. } => self.check_element_addr(*operand),
            InstKind::RefElementAddr { operand, .. } => self.check_ref_element_addr(*operand),
            InstKind::ArchetypeMethod { operand, .. } => self.check_archetype_method(*operand),
            InstKind::ProtocolMethod { operand, .. } => self.check_protocol_method(*operand),
            InstKind::ProjectExistential { operand } => self.check_existential_address(
                *operand,
                ProjectExistentialOperandAddress,
                ProjectExistentialOperandExistential,
            ),
            InstKind::InitExistential { existential } => self.check_existential_address(
                *existential,
                InitExistentialAddress,
                InitExistentialExistential,
            ),
            InstKind::DeinitExistential { existential } => self.check_existential_address(
                *existential,
                DeinitExistentialAddress,
                DeinitExistentialExistential,
            ),
            InstKind::ArchetypeToSuper { operand } => self.check_archetype_to_super(*operand),
            InstKind::SuperToArchetype { src, dest } => self.check_super_to_archetype(*src, *dest),
            InstKind::Downcast { operand } => self.check_downcast(*operand),
            InstKind::Return { value } => {
                self.ensure(value.is_some(), ReturnValuePresent, || {
                    "no return value".to_string()
                })?;
                // FIXME: compare against the function's result type once curried
                // entry points are lowered with their real types.
                if let Some(value) = value {
                    self.operand_ty(*value)?;
                }
                Ok(())
            }
            InstKind::Branch { .. } => self.check_successors(),
            InstKind::CondBranch { condition, .. } => {
                self.ensure(condition.is_some(), CondBranchConditionPresent, || {
                    "no condition".to_string()
                })?;
                if let Some(condition) = condition {
                    self.operand_ty(*condition)?;
                }
                self.check_successors()
            }
            InstKind::Unreachable => Ok(()),
        }
    }

    fn check_alloc_var(&self) -> CheckResult {
        let result = self.result_ty()?;
        self.ensure(
            self.provider.is_address(result),
            Invariant::AllocVarResultAddress,
            || self.describe("result", result),
        )
    }

    fn check_alloc_ref(&self) -> CheckResult {
        let p = self.provider;
        let result = self.result_ty()?;
        self.ensure(
            p.has_reference_semantics(result) && !p.is_address(result),
            Invariant::AllocRefResultReference,
            || self.describe("result", result),
        )
    }

    fn check_apply(&self, callee: Operand, args: &[Operand]) -> CheckResult {
        let p = self.provider;
        let callee_ty = self.operand_ty(callee)?;
        debug!(
            "verifying `{}`, callee type: {}",
            self.inst,
            p.display(callee_ty)
        );

        self.ensure(
            !p.is_address(callee_ty),
            Invariant::ApplyCalleeNotAddress,
            || self.describe("callee", callee_ty),
        )?;
        self.ensure(
            self.is_shape(callee_ty, Shape::Function),
            Invariant::ApplyCalleeFunction,
            || self.describe("callee", callee_ty),
        )?;

        let Some(signature) = p.signature_of(callee_ty) else {
            return Err(self.unrecoverable(ShapeDefect::UnresolvedSignature {
                callee: p.display(callee_ty),
            }));
        };
        debug!(
            "function input types: [{}], result type: {}",
            signature.inputs.iter().map(|ty| p.display(*ty)).join(", "),
            p.display(signature.result)
        );

        self.ensure(
            args.len() == signature.inputs.len(),
            Invariant::ApplyArgumentCount {
                expected: signature.inputs.len(),
                found: args.len(),
            },
            || self.describe("callee", callee_ty),
        )?;

        for (index, (arg, input)) in args.iter().zip(&signature.inputs).enumerate() {
            let arg_ty = self.operand_ty(*arg)?;
            debug!(
                "argument type {} for input type {}",
                p.display(arg_ty),
                p.display(*input)
            );
            self.ensure(
                p.equals(arg_ty, *input),
                Invariant::ApplyArgumentType { index },
                || {
                    format!(
                        "argument: {}, input: {}",
                        p.display(arg_ty),
                        p.display(*input)
                    )
                },
            )?;
        }

        let result = self.result_ty()?;
        self.ensure(
            p.equals(result, signature.result),
            Invariant::ApplyResultType,
            || {
                format!(
                    "result: {}, function result: {}",
                    p.display(result),
                    p.display(signature.result)
                )
            },
        )
    }

    fn check_constant_ref(&self) -> CheckResult {
        let result = self.result_ty()?;
        self.ensure(
            self.is_shape(result, Shape::AnyFunction),
            Invariant::ConstantRefFunction,
            || self.describe("result", result),
        )
    }

    fn check_integer(&self, invariant: Invariant) -> CheckResult {
        let result = self.result_ty()?;
        self.ensure(
            self.is_shape(result, Shape::BuiltinInteger),
            invariant,
            || self.describe("result", result),
        )
    }

    fn check_load(&self, address: Operand) -> CheckResult {
        let p = self.provider;
        let result = self.result_ty()?;
        let address_ty = self.operand_ty(address)?;

        self.ensure(
            !p.is_address(result),
            Invariant::LoadResultNotAddress,
            || self.describe("result", result),
        )?;
        self.ensure(
            p.is_address(address_ty),
            Invariant::LoadOperandAddress,
            || self.describe("operand", address_ty),
        )?;
        self.ensure(
            p.pointee_type(address_ty)
                .is_some_and(|pointee| p.equals(pointee, result)),
            Invariant::LoadTypeMismatch,
            || self.describe_pair("operand", address_ty, "result", result),
        )
    }

    fn check_store(&self, src: Operand, dest: Operand) -> CheckResult {
        let p = self.provider;
        let src_ty = self.operand_ty(src)?;
        let dest_ty = self.operand_ty(dest)?;

        self.ensure(
            !p.is_address(src_ty),
            Invariant::StoreSourceNotAddress,
            || self.describe("source", src_ty),
        )?;
        self.ensure(p.is_address(dest_ty), Invariant::StoreDestAddress, || {
            self.describe("dest", dest_ty)
        })?;
        self.ensure(
            p.pointee_type(dest_ty)
                .is_some_and(|pointee| p.equals(pointee, src_ty)),
            Invariant::StoreTypeMismatch,
            || self.describe_pair("source", src_ty, "dest", dest_ty),
        )
    }

    fn check_copy_addr(&self, src: Operand, dest: Operand) -> CheckResult {
        let p = self.provider;
        let src_ty = self.operand_ty(src)?;
        let dest_ty = self.operand_ty(dest)?;

        self.ensure(
            p.is_address(src_ty),
            Invariant::CopyAddrSourceAddress,
            || self.describe("source", src_ty),
        )?;
        self.ensure(p.is_address(dest_ty), Invariant::CopyAddrDestAddress, || {
            self.describe("dest", dest_ty)
        })?;
        self.ensure(
            p.equals(dest_ty, src_ty),
            Invariant::CopyAddrTypeMismatch,
            || self.describe_pair("source", src_ty, "dest", dest_ty),
        )
    }

    fn check_specialize(&self, operand: Operand) -> CheckResult {
        let result = self.result_ty()?;
        let operand_ty = self.operand_ty(operand)?;

        self.ensure(
            self.is_shape(result, Shape::Function),
            Invariant::SpecializeResultFunction,
            || self.describe("result", result),
        )?;
        self.ensure(
            self.is_shape(operand_ty, Shape::PolymorphicFunction),
            Invariant::SpecializeOperandPolymorphic,
            || self.describe("operand", operand_ty),
        )
    }

    fn check_tuple(&self, elements: &[Operand]) -> CheckResult {
        let result = self.result_ty()?;
        for element in elements {
            self.operand_ty(*element)?;
        }

        let Some(ShapeView::Tuple { fields }) = self.provider.matches_shape(result, Shape::Tuple)
        else {
            return Err(self.violation(
                Invariant::TupleResultTuple,
                self.describe("result", result),
            ));
        };

        self.ensure(
            elements.len() == fields.len(),
            Invariant::TupleFieldCount {
                expected: fields.len(),
                found: elements.len(),
            },
            || self.describe("result", result),
        )
    }

    fn check_associated_metatype(&self, source: Operand) -> CheckResult {
        let result = self.result_ty()?;
        let source_ty = self.operand_ty(source)?;

        self.ensure(
            self.is_shape(result, Shape::Metatype),
            Invariant::AssociatedMetatypeResult,
            || self.describe("result", result),
        )?;
        self.ensure(
            self.is_shape(source_ty, Shape::Metatype),
            Invariant::AssociatedMetatypeOperand,
            || self.describe("operand", source_ty),
        )
    }

    /// Shared by retain, release and dealloc_ref: a reference value, never an address.
    fn check_ref_counted(
        &self,
        operand: Operand,
        not_address: Invariant,
        reference: Invariant,
    ) -> CheckResult {
        let p = self.provider;
        let ty = self.operand_ty(operand)?;

        self.ensure(!p.is_address(ty), not_address, || {
            self.describe("operand", ty)
        })?;
        self.ensure(p.has_reference_semantics(ty), reference, || {
            self.describe("operand", ty)
        })
    }

    fn check_index_addr(&self, operand: Operand) -> CheckResult {
        let p = self.provider;
        let result = self.result_ty()?;
        let operand_ty = self.operand_ty(operand)?;

        self.ensure(
            p.is_address(result) && p.equals(result, operand_ty),
            Invariant::IndexAddrResult,
            || self.describe_pair("operand", operand_ty, "result", result),
        )
    }

    fn check_extract(&self, operand: Operand) -> CheckResult {
        let p = self.provider;
        let operand_ty = self.operand_ty(operand)?;
        let result = self.result_ty()?;

        self.ensure(
            !p.is_address(operand_ty),
            Invariant::ExtractOperandNotAddress,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            !p.has_reference_semantics(operand_ty),
            Invariant::ExtractOperandNotReference,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            !p.is_address(result),
            Invariant::ExtractResultNotAddress,
            || self.describe("result", result),
        )
    }

    fn check_element_addr(&self, operand: Operand) -> CheckResult {
        let p = self.provider;
        let operand_ty = self.operand_ty(operand)?;
        let result = self.result_ty()?;

        self.ensure(
            p.is_address(operand_ty),
            Invariant::ElementAddrOperandAddress,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            !p.has_reference_semantics(operand_ty),
            Invariant::ElementAddrOperandNotReference,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            p.is_address(result),
            Invariant::ElementAddrResultAddress,
            || self.describe("result", result),
        )
    }

    fn check_ref_element_addr(&self, operand: Operand) -> CheckResult {
        let p = self.provider;
        let operand_ty = self.operand_ty(operand)?;
        let result = self.result_ty()?;

        self.ensure(
            !p.is_address(operand_ty),
            Invariant::RefElementAddrOperandNotAddress,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            p.has_reference_semantics(operand_ty),
            Invariant::RefElementAddrOperandReference,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            p.is_address(result),
            Invariant::RefElementAddrResultAddress,
            || self.describe("result", result),
        )
    }

    /// Methods are curried: the lookup yields `Self -> (Args -> Result)`.
    fn check_archetype_method(&self, operand: Operand) -> CheckResult {
        let p = self.provider;
        let method = self.result_ty()?;
        let operand_ty = self.operand_ty(operand)?;
        debug!(
            "verifying `{}`, method type: {}, operand type: {}",
            self.inst,
            p.display(method),
            p.display(operand_ty)
        );

        let Some(ShapeView::Function { input, result }) = p.matches_shape(method, Shape::Function)
        else {
            return Err(self.violation(
                Invariant::ArchetypeMethodResultFunction,
                self.describe("result", method),
            ));
        };

        self.ensure(
            p.equals(input, p.object_type(operand_ty)),
            Invariant::ArchetypeMethodSelfType,
            || self.describe_pair("method", method, "operand", operand_ty),
        )?;
        self.ensure(
            self.is_shape(result, Shape::Function),
            Invariant::ArchetypeMethodCurried,
            || self.describe("method", method),
        )?;

        if p.is_address(operand_ty) {
            self.ensure(
                self.is_shape(operand_ty, Shape::Archetype),
                Invariant::ArchetypeMethodOperandArchetype,
                || self.describe("operand", operand_ty),
            )
        } else if let Some(ShapeView::Metatype { instance }) =
            p.matches_shape(operand_ty, Shape::Metatype)
        {
            self.ensure(
                self.is_shape(instance, Shape::Archetype),
                Invariant::ArchetypeMethodMetatypeArchetype,
                || self.describe("operand", operand_ty),
            )
        } else {
            Err(self.unrecoverable(ShapeDefect::MethodOperand {
                operand: p.display(operand_ty),
            }))
        }
    }

    fn check_protocol_method(&self, operand: Operand) -> CheckResult {
        let p = self.provider;
        let method = self.result_ty()?;
        let operand_ty = self.operand_ty(operand)?;

        let Some(ShapeView::Function { input, result }) = p.matches_shape(method, Shape::Function)
        else {
            return Err(self.violation(
                Invariant::ProtocolMethodResultFunction,
                self.describe("result", method),
            ));
        };

        self.ensure(
            p.equals(input, p.raw_pointer_type()),
            Invariant::ProtocolMethodSelfRawPointer,
            || self.describe("method", method),
        )?;
        self.ensure(
            self.is_shape(result, Shape::Function),
            Invariant::ProtocolMethodCurried,
            || self.describe("method", method),
        )?;
        self.ensure(
            p.is_address(operand_ty),
            Invariant::ProtocolMethodOperandAddress,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            p.is_existential_type(operand_ty),
            Invariant::ProtocolMethodOperandExistential,
            || self.describe("operand", operand_ty),
        )
    }

    /// Shared by project_existential, init_existential and deinit_existential.
    fn check_existential_address(
        &self,
        existential: Operand,
        address: Invariant,
        existential_inv: Invariant,
    ) -> CheckResult {
        let p = self.provider;
        let ty = self.operand_ty(existential)?;

        self.ensure(p.is_address(ty), address, || self.describe("operand", ty))?;
        self.ensure(p.is_existential_type(ty), existential_inv, || {
            self.describe("operand", ty)
        })
    }

    fn check_archetype_to_super(&self, operand: Operand) -> CheckResult {
        let p = self.provider;
        let operand_ty = self.operand_ty(operand)?;
        let result = self.result_ty()?;

        self.ensure(
            p.is_address(operand_ty),
            Invariant::ArchetypeToSuperOperandAddress,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            p.is_address_only(operand_ty),
            Invariant::ArchetypeToSuperOperandAddressOnly,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            self.is_shape(operand_ty, Shape::Archetype),
            Invariant::ArchetypeToSuperOperandArchetype,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            p.has_reference_semantics(result),
            Invariant::ArchetypeToSuperResultReference,
            || self.describe("result", result),
        )
    }

    fn check_super_to_archetype(&self, src: Operand, dest: Operand) -> CheckResult {
        let p = self.provider;
        let src_ty = self.operand_ty(src)?;
        let dest_ty = self.operand_ty(dest)?;

        self.ensure(
            p.has_reference_semantics(src_ty),
            Invariant::SuperToArchetypeSourceReference,
            || self.describe("source", src_ty),
        )?;
        self.ensure(
            p.is_address(dest_ty),
            Invariant::SuperToArchetypeDestAddress,
            || self.describe("dest", dest_ty),
        )?;
        self.ensure(
            self.is_shape(dest_ty, Shape::Archetype),
            Invariant::SuperToArchetypeDestArchetype,
            || self.describe("dest", dest_ty),
        )
    }

    fn check_downcast(&self, operand: Operand) -> CheckResult {
        let p = self.provider;
        let operand_ty = self.operand_ty(operand)?;
        let result = self.result_ty()?;

        self.ensure(
            p.has_reference_semantics(operand_ty),
            Invariant::DowncastOperandReference,
            || self.describe("operand", operand_ty),
        )?;
        self.ensure(
            p.has_reference_semantics(result),
            Invariant::DowncastResultReference,
            || self.describe("result", result),
        )
    }

    fn check_successors(&self) -> CheckResult {
        let block_count = self.function.basic_blocks.len();
        match self
            .inst
            .kind
            .successors()
            .into_iter()
            .find(|target| *target >= block_count)
        {
            Some(target) => Err(self.malformed(BlockDefect::UnknownSuccessor { target })),
            None => Ok(()),
        }
    }

    fn location(&self) -> Location {
        Location {
            function: self.function.name.clone(),
            block: self.block,
            instruction: Some(self.index),
        }
    }

    fn operand_ty(&self, value: Operand) -> Result<P::Ty, VerificationFailure> {
        self.function
            .value_ty(value)
            .ok_or_else(|| VerificationFailure::UndefinedValue {
                location: self.location(),
                instruction: self.inst.to_string(),
                value,
            })
    }

    fn result_ty(&self) -> Result<P::Ty, VerificationFailure> {
        let Some(result) = self.inst.result else {
            return Err(VerificationFailure::MissingResult {
                location: self.location(),
                instruction: self.inst.to_string(),
            });
        };
        self.operand_ty(result)
    }

    fn is_shape(&self, ty: P::Ty, shape: Shape) -> bool {
        self.provider.matches_shape(ty, shape).is_some()
    }

    fn ensure(
        &self,
        holds: bool,
        invariant: Invariant,
        context: impl FnOnce() -> String,
    ) -> CheckResult {
        if holds {
            Ok(())
        } else {
            Err(self.violation(invariant, context()))
        }
    }

    fn violation(&self, invariant: Invariant, context: String) -> VerificationFailure {
        VerificationFailure::TypeInvariantViolation {
            location: self.location(),
            instruction: self.inst.to_string(),
            invariant,
            context,
        }
    }

    fn malformed(&self, defect: BlockDefect) -> VerificationFailure {
        VerificationFailure::MalformedBlock {
            location: self.location(),
            defect,
        }
    }

    fn unrecoverable(&self, defect: ShapeDefect) -> VerificationFailure {
        VerificationFailure::UnrecoverableShape {
            location: self.location(),
            instruction: self.inst.to_string(),
            defect,
        }
    }

    fn describe(&self, role: &str, ty: P::Ty) -> String {
        format!("{role}: {}", self.provider.display(ty))
    }

    fn describe_pair(&self, role: &str, ty: P::Ty, other_role: &str, other: P::Ty) -> String {
        format!(
            "{role}: {}, {other_role}: {}",
            self.provider.display(ty),
            self.provider.display(other)
        )
    }
}

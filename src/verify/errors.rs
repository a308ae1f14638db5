use std::fmt;

use thiserror::Error;

use crate::ir::{BlockIndex, Operand};

/// Where in a function a failure was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub function: String,
    pub block: BlockIndex,
    /// Position of the instruction inside its block.
    pub instruction: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} bb{}", self.function, self.block)?;
        if let Some(idx) = self.instruction {
            write!(f, " #{idx}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    #[error("function @{function} has no entry block")]
    EmptyFunction { function: String },
    #[error("{location}: malformed block: {defect}")]
    MalformedBlock {
        location: Location,
        defect: BlockDefect,
    },
    #[error("{location}: `{instruction}`: {invariant} ({context})")]
    TypeInvariantViolation {
        location: Location,
        instruction: String,
        invariant: Invariant,
        context: String,
    },
    #[error("{location}: `{instruction}`: instruction has no result value")]
    MissingResult {
        location: Location,
        instruction: String,
    },
    #[error("{location}: `{instruction}`: {value} is not defined in this function")]
    UndefinedValue {
        location: Location,
        instruction: String,
        value: Operand,
    },
    #[error("{location}: `{instruction}`: {defect}")]
    UnrecoverableShape {
        location: Location,
        instruction: String,
        defect: ShapeDefect,
    },
}

impl VerificationFailure {
    /// Fatal failures mean the IR was built wrong upstream; nothing more can be
    /// checked in the function.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VerificationFailure::UnrecoverableShape { .. }
                | VerificationFailure::UndefinedValue { .. }
        )
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            VerificationFailure::EmptyFunction { .. } => None,
            VerificationFailure::MalformedBlock { location, .. }
            | VerificationFailure::TypeInvariantViolation { location, .. }
            | VerificationFailure::MissingResult { location, .. }
            | VerificationFailure::UndefinedValue { location, .. }
            | VerificationFailure::UnrecoverableShape { location, .. } => Some(location),
        }
    }

    pub fn invariant(&self) -> Option<Invariant> {
        match self {
            VerificationFailure::TypeInvariantViolation { invariant, .. } => Some(*invariant),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BlockDefect {
    #[error("block has no instructions")]
    EmptyBlock,
    #[error("non-terminators cannot be the last in a block")]
    MissingTerminator,
    #[error("terminator must be the last in block")]
    TerminatorNotLast,
    #[error("successor bb{target} does not exist")]
    UnknownSuccessor { target: BlockIndex },
}

/// Shapes the rules have no way to reason about.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeDefect {
    #[error("cannot resolve the signature of callee type {callee}")]
    UnresolvedSignature { callee: String },
    #[error("method must apply to an address or metatype, found {operand}")]
    MethodOperand { operand: String },
}

/// The per-instruction rules that can be violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invariant {
    AllocVarResultAddress,
    AllocRefResultReference,
    ApplyCalleeNotAddress,
    ApplyCalleeFunction,
    ApplyArgumentCount { expected: usize, found: usize },
    ApplyArgumentType { index: usize },
    ApplyResultType,
    ConstantRefFunction,
    IntegerLiteralType,
    IntegerValueType,
    LoadResultNotAddress,
    LoadOperandAddress,
    LoadTypeMismatch,
    StoreSourceNotAddress,
    StoreDestAddress,
    StoreTypeMismatch,
    CopyAddrSourceAddress,
    CopyAddrDestAddress,
    CopyAddrTypeMismatch,
    ZeroAddrDestAddress,
    ZeroValueNotAddress,
    SpecializeResultFunction,
    SpecializeOperandPolymorphic,
    TupleResultTuple,
    TupleFieldCount { expected: usize, found: usize },
    MetatypeResult,
    AssociatedMetatypeResult,
    AssociatedMetatypeOperand,
    RetainOperandNotAddress,
    RetainOperandReference,
    ReleaseOperandNotAddress,
    ReleaseOperandReference,
    DeallocVarOperandAddress,
    DeallocRefOperandNotAddress,
    DeallocRefOperandReference,
    DestroyAddrAddressOnly,
    IndexAddrResult,
    ExtractOperandNotAddress,
    ExtractOperandNotReference,
    ExtractResultNotAddress,
    ElementAddrOperandAddress,
    ElementAddrOperandNotReference,
    ElementAddrResultAddress,
    RefElementAddrOperandNotAddress,
    RefElementAddrOperandReference,
    RefElementAddrResultAddress,
    ArchetypeMethodResultFunction,
    ArchetypeMethodSelfType,
    ArchetypeMethodCurried,
    ArchetypeMethodOperandArchetype,
    ArchetypeMethodMetatypeArchetype,
    ProtocolMethodResultFunction,
    ProtocolMethodSelfRawPointer,
    ProtocolMethodCurried,
    ProtocolMethodOperandAddress,
    ProtocolMethodOperandExistential,
    ProjectExistentialOperandAddress,
    ProjectExistentialOperandExistential,
    InitExistentialAddress,
    InitExistentialExistential,
    DeinitExistentialAddress,
    DeinitExistentialExistential,
    ArchetypeToSuperOperandAddress,
    ArchetypeToSuperOperandAddressOnly,
    ArchetypeToSuperOperandArchetype,
    ArchetypeToSuperResultReference,
    SuperToArchetypeSourceReference,
    SuperToArchetypeDestAddress,
    SuperToArchetypeDestArchetype,
    DowncastOperandReference,
    DowncastResultReference,
    ReturnValuePresent,
    CondBranchConditionPresent,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Invariant::*;

        let msg = match self {
            AllocVarResultAddress => "alloc_var must return address",
            AllocRefResultReference => "alloc_ref must return reference type value",
            ApplyCalleeNotAddress => "callee of apply cannot be an address",
            ApplyCalleeFunction => "callee of apply must have concrete function type",
            ApplyArgumentCount { expected, found } => {
                return write!(
                    f,
                    "apply doesn't have right number of arguments for function: found {found}, needs {expected}"
                );
            }
            ApplyArgumentType { index } => {
                return write!(
                    f,
                    "input type of argument {index} to apply doesn't match function input type"
                );
            }
            ApplyResultType => "type of apply instruction doesn't match function result type",
            ConstantRefFunction => "constant_ref should have a function result",
            IntegerLiteralType => "invalid integer literal type",
            IntegerValueType => "invalid integer value type",
            LoadResultNotAddress => "can't load an address",
            LoadOperandAddress => "load operand must be an address",
            LoadTypeMismatch => "load operand type and result type mismatch",
            StoreSourceNotAddress => "can't store from an address source",
            StoreDestAddress => "must store to an address dest",
            StoreTypeMismatch => "store operand type and dest type mismatch",
            CopyAddrSourceAddress => "copy_addr source should be an address",
            CopyAddrDestAddress => "copy_addr dest should be an address",
            CopyAddrTypeMismatch => "copy_addr source and dest type mismatch",
            ZeroAddrDestAddress => "zero_addr dest should be an address",
            ZeroValueNotAddress => "zero_value cannot create an address",
            SpecializeResultFunction => "specialize dest should be a function type",
            SpecializeOperandPolymorphic => {
                "specialize source should be a polymorphic function type"
            }
            TupleResultTuple => "tuple should return a tuple",
            TupleFieldCount { expected, found } => {
                return write!(
                    f,
                    "tuple field count mismatch: found {found}, needs {expected}"
                );
            }
            MetatypeResult => "metatype instruction must be of metatype type",
            AssociatedMetatypeResult => "associated_metatype instruction must be of metatype type",
            AssociatedMetatypeOperand => "associated_metatype operand must be of metatype type",
            RetainOperandNotAddress => "operand of retain must not be address",
            RetainOperandReference => "operand of retain must be reference type",
            ReleaseOperandNotAddress => "operand of release must not be address",
            ReleaseOperandReference => "operand of release must be reference type",
            DeallocVarOperandAddress => "operand of dealloc_var must be address",
            DeallocRefOperandNotAddress => "operand of dealloc_ref must not be address",
            DeallocRefOperandReference => "operand of dealloc_ref must be reference type",
            DestroyAddrAddressOnly => "operand of destroy_addr must be address-only",
            IndexAddrResult => "index_addr must return an address of its operand's type",
            ExtractOperandNotAddress => "cannot extract from address",
            ExtractOperandNotReference => "cannot extract from reference type",
            ExtractResultNotAddress => "result of extract cannot be address",
            ElementAddrOperandAddress => "must derive element_addr from address",
            ElementAddrOperandNotReference => "cannot derive element_addr from reference type",
            ElementAddrResultAddress => "result of element_addr must be an address",
            RefElementAddrOperandNotAddress => "must derive ref_element_addr from non-address",
            RefElementAddrOperandReference => "must derive ref_element_addr from reference type",
            RefElementAddrResultAddress => "result of ref_element_addr must be an address",
            ArchetypeMethodResultFunction => "result method must be of a concrete function type",
            ArchetypeMethodSelfType => "result must be a method of the operand",
            ArchetypeMethodCurried => "result must be a method",
            ArchetypeMethodOperandArchetype => {
                "archetype_method must apply to an archetype address"
            }
            ArchetypeMethodMetatypeArchetype => {
                "archetype_method must apply to an archetype metatype"
            }
            ProtocolMethodResultFunction => "result method must be of a concrete function type",
            ProtocolMethodSelfRawPointer => "result must be a method of raw pointer",
            ProtocolMethodCurried => "result must be a method",
            ProtocolMethodOperandAddress => "protocol_method must apply to an address",
            ProtocolMethodOperandExistential => {
                "protocol_method must apply to an existential address"
            }
            ProjectExistentialOperandAddress => "project_existential must be applied to address",
            ProjectExistentialOperandExistential => {
                "project_existential must be applied to address of existential"
            }
            InitExistentialAddress => "init_existential must be applied to an address",
            InitExistentialExistential => {
                "init_existential must be applied to address of existential"
            }
            DeinitExistentialAddress => "deinit_existential must be applied to an address",
            DeinitExistentialExistential => {
                "deinit_existential must be applied to address of existential"
            }
            ArchetypeToSuperOperandAddress => "archetype_to_super operand must be an address",
            ArchetypeToSuperOperandAddressOnly => "archetype_to_super operand must be address-only",
            ArchetypeToSuperOperandArchetype => "archetype_to_super operand must be archetype",
            ArchetypeToSuperResultReference => {
                "archetype_to_super must convert to a reference type"
            }
            SuperToArchetypeSourceReference => "super_to_archetype source must be a reference type",
            SuperToArchetypeDestAddress => "super_to_archetype dest must be an address",
            SuperToArchetypeDestArchetype => "super_to_archetype dest must be an archetype address",
            DowncastOperandReference => "downcast operand must be a reference type",
            DowncastResultReference => "downcast must convert to a reference type",
            ReturnValuePresent => "return of null value is invalid",
            CondBranchConditionPresent => "condition of conditional branch can't be missing",
        };

        f.write_str(msg)
    }
}

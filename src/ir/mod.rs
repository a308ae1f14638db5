use std::fmt;

use educe::Educe;

pub mod builder;
pub mod display;

pub type BlockIndex = usize;
pub type FieldIndex = usize;

/// Byte range in the source the instruction was lowered from.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

/// A reference to a value slot of the enclosing function.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Operand(pub usize);

impl Operand {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A group of functions verified together.
#[derive(Debug, Clone)]
pub struct Module<T> {
    pub functions: Vec<Function<T>>,
}

impl<T> Default for Module<T> {
    fn default() -> Self {
        Self {
            functions: Vec::new(),
        }
    }
}

/// A fully built function body.
///
/// Every value an instruction can name lives in `values`: function arguments
/// first, then instruction results in the order they were created.
#[derive(Debug, Clone)]
pub struct Function<T> {
    /// The name of this function
    pub name: String,
    pub values: Vec<ValueDecl<T>>,
    pub basic_blocks: Vec<BasicBlock>,
}

impl<T: Copy> Function<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            basic_blocks: Vec::new(),
        }
    }

    /// The type of the given value slot, if the function declares it.
    pub fn value_ty(&self, value: Operand) -> Option<T> {
        self.values.get(value.index()).map(|decl| decl.ty)
    }

    pub fn get_params(&self) -> Vec<Operand> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, decl)| matches!(decl.kind, ValueKind::Arg))
            .map(|(idx, _)| Operand(idx))
            .collect()
    }
}

/// A typed value slot, akin to a local.
#[derive(Debug, Clone)]
pub struct ValueDecl<T> {
    /// A name exists for user-defined values.
    pub debug_name: Option<String>,
    /// The type of the value.
    pub ty: T,
    pub kind: ValueKind,
}

impl<T> ValueDecl<T> {
    pub const fn temp(ty: T) -> Self {
        Self {
            debug_name: None,
            ty,
            kind: ValueKind::Result,
        }
    }
}

/// Where a value slot gets its definition from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Function argument.
    Arg,
    /// Result of an instruction.
    Result,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions
            .last()
            .filter(|inst| inst.kind.is_terminator())
    }
}

#[derive(Debug, Clone, Educe)]
#[educe(PartialEq)]
pub struct Instruction {
    pub kind: InstKind,
    /// The value slot this instruction defines, if any.
    pub result: Option<Operand>,
    #[educe(PartialEq(ignore))]
    pub span: Option<Span>,
}

impl Instruction {
    pub fn new(kind: InstKind, result: Option<Operand>) -> Self {
        Self {
            kind,
            result,
            span: None,
        }
    }
}

/// Every instruction kind the IR knows about.
#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    /// Allocates an uninitialized value slot, yielding its address.
    AllocVar,
    /// Allocates a reference-counted object.
    AllocRef,
    Apply {
        callee: Operand,
        args: Vec<Operand>,
    },
    /// References a global function by name.
    ConstantRef {
        name: String,
    },
    IntegerLiteral {
        value: i128,
    },
    IntegerValue {
        value: u64,
    },
    Load {
        address: Operand,
    },
    Store {
        src: Operand,
        dest: Operand,
    },
    CopyAddr {
        src: Operand,
        dest: Operand,
        /// Whether the source is consumed by the copy.
        take: bool,
        /// Whether the destination is uninitialized memory.
        initialize: bool,
    },
    ZeroAddr {
        dest: Operand,
    },
    ZeroValue,
    Specialize {
        operand: Operand,
    },
    Tuple {
        elements: Vec<Operand>,
    },
    Metatype,
    AssociatedMetatype {
        source: Operand,
        member: String,
    },
    Retain {
        operand: Operand,
    },
    Release {
        operand: Operand,
    },
    DeallocVar {
        operand: Operand,
    },
    DeallocRef {
        operand: Operand,
    },
    DestroyAddr {
        operand: Operand,
    },
    IndexAddr {
        operand: Operand,
        index: u64,
    },
    Extract {
        operand: Operand,
        field: FieldIndex,
    },
    ElementAddr {
        operand: Operand,
        field: FieldIndex,
    },
    RefElementAddr {
        operand: Operand,
        field: FieldIndex,
    },
    ArchetypeMethod {
        operand: Operand,
        member: String,
    },
    ProtocolMethod {
        operand: Operand,
        member: String,
    },
    ProjectExistential {
        operand: Operand,
    },
    InitExistential {
        existential: Operand,
    },
    DeinitExistential {
        existential: Operand,
    },
    ArchetypeToSuper {
        operand: Operand,
    },
    SuperToArchetype {
        src: Operand,
        dest: Operand,
    },
    Downcast {
        operand: Operand,
    },
    /// Function return
    Return {
        value: Option<Operand>,
    },
    /// Unconditional branch to the given target block.
    Branch {
        target: BlockIndex,
    },
    CondBranch {
        condition: Option<Operand>,
        true_target: BlockIndex,
        false_target: BlockIndex,
    },
    Unreachable,
}

impl InstKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Return { .. }
                | InstKind::Branch { .. }
                | InstKind::CondBranch { .. }
                | InstKind::Unreachable
        )
    }

    /// Blocks control may transfer to after this instruction.
    pub fn successors(&self) -> Vec<BlockIndex> {
        match self {
            InstKind::Branch { target } => vec![*target],
            InstKind::CondBranch {
                true_target,
                false_target,
                ..
            } => vec![*true_target, *false_target],
            _ => Vec::new(),
        }
    }

    /// All value operands, in source order.
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            InstKind::AllocVar
            | InstKind::AllocRef
            | InstKind::ConstantRef { .. }
            | InstKind::IntegerLiteral { .. }
            | InstKind::IntegerValue { .. }
            | InstKind::ZeroValue
            | InstKind::Metatype
            | InstKind::Branch { .. }
            | InstKind::Unreachable => Vec::new(),
            InstKind::Apply { callee, args } => {
                let mut operands = Vec::with_capacity(args.len() + 1);
                operands.push(*callee);
                operands.extend(args.iter().copied());
                operands
            }
            InstKind::Store { src, dest }
            | InstKind::CopyAddr { src, dest, .. }
            | InstKind::SuperToArchetype { src, dest } => vec![*src, *dest],
            InstKind::Tuple { elements } => elements.clone(),
            InstKind::Load { address: operand }
            | InstKind::ZeroAddr { dest: operand }
            | InstKind::Specialize { operand }
            | InstKind::AssociatedMetatype {
                source: operand, ..
            }
            | InstKind::Retain { operand }
            | InstKind::Release { operand }
            | InstKind::DeallocVar { operand }
            | InstKind::DeallocRef { operand }
            | InstKind::DestroyAddr { operand }
            | InstKind::IndexAddr { operand, .. }
            | InstKind::Extract { operand, .. }
            | InstKind::ElementAddr { operand, .. }
            | InstKind::RefElementAddr { operand, .. }
            | InstKind::ArchetypeMethod { operand, .. }
            | InstKind::ProtocolMethod { operand, .. }
            | InstKind::ProjectExistential { operand }
            | InstKind::InitExistential {
                existential: operand,
            }
            | InstKind::DeinitExistential {
                existential: operand,
            }
            | InstKind::ArchetypeToSuper { operand }
            | InstKind::Downcast { operand } => vec![*operand],
            InstKind::Return { value } => value.iter().copied().collect(),
            InstKind::CondBranch { condition, .. } => condition.iter().copied().collect(),
        }
    }
}

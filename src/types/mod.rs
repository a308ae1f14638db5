//! Queries the verifier asks of the type system.
//!
//! The verifier never builds or inspects types itself; it only goes through
//! [`TypeFacts`] and [`SignatureProvider`]. [`context::TypeContext`] is the
//! in-tree implementation.

use std::{fmt, hash::Hash};

pub mod context;

/// The closed set of structural shapes a type can be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A concrete (monomorphic) function type.
    Function,
    /// A function type generic over one or more archetypes.
    PolymorphicFunction,
    /// Either of the two function shapes above.
    AnyFunction,
    Tuple,
    BuiltinInteger,
    Metatype,
    Archetype,
}

/// What a successful shape match exposes about the matched type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeView<T> {
    Function { input: T, result: T },
    PolymorphicFunction { input: T, result: T },
    Tuple { fields: Vec<T> },
    BuiltinInteger { bits: u32 },
    Metatype { instance: T },
    Archetype,
}

/// Ordered inputs plus result of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature<T> {
    pub inputs: Vec<T>,
    pub result: T,
}

/// Facts about an opaque type handle.
///
/// Apart from [`TypeFacts::is_address`], every query answers for the value
/// type and ignores the address qualifier.
pub trait TypeFacts {
    type Ty: Copy + Eq + Hash + fmt::Debug;

    fn is_address(&self, ty: Self::Ty) -> bool;

    fn has_reference_semantics(&self, ty: Self::Ty) -> bool;

    fn is_address_only(&self, ty: Self::Ty) -> bool;

    fn is_existential_type(&self, ty: Self::Ty) -> bool;

    fn matches_shape(&self, ty: Self::Ty, shape: Shape) -> Option<ShapeView<Self::Ty>>;

    /// The type with its address qualifier removed.
    fn object_type(&self, ty: Self::Ty) -> Self::Ty;

    /// The raw pointer type used as `self` by protocol witnesses.
    fn raw_pointer_type(&self) -> Self::Ty;

    fn display(&self, ty: Self::Ty) -> String;

    /// Handles compare equal iff they denote the same type, address qualifier
    /// included.
    fn equals(&self, lhs: Self::Ty, rhs: Self::Ty) -> bool {
        lhs == rhs
    }

    /// The type an address points to. `None` for non-address types.
    fn pointee_type(&self, ty: Self::Ty) -> Option<Self::Ty> {
        self.is_address(ty).then(|| self.object_type(ty))
    }
}

pub trait SignatureProvider: TypeFacts {
    /// Resolves the lowered signature of a function-shaped type.
    fn signature_of(&self, ty: Self::Ty) -> Option<Signature<Self::Ty>>;
}

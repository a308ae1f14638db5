use std::collections::HashMap;

use itertools::Itertools;
use typed_generational_arena::{SmallSlab, SmallSlabIndex};

use super::{Shape, ShapeView, Signature, SignatureProvider, TypeFacts};

pub type TypeIndex = SmallSlabIndex<Type>;

/// A type as stored in a [`TypeContext`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `Builtin.IntN`
    BuiltinInteger(u32),
    RawPointer,
    /// A retainable pointer to an untyped heap object.
    ObjectPointer,
    /// A nominal value type.
    Struct(String),
    /// A nominal reference type.
    Class(String),
    /// The existential type of a protocol.
    Protocol(String),
    Archetype(String),
    Tuple(Vec<TypeIndex>),
    Function {
        input: TypeIndex,
        result: TypeIndex,
    },
    PolymorphicFunction {
        params: Vec<String>,
        input: TypeIndex,
        result: TypeIndex,
    },
    Metatype(TypeIndex),
    /// The address qualifier. Never nested.
    Address(TypeIndex),
}

/// Interning store for types.
///
/// Structurally equal types always get the same index, so handle equality is
/// type equality.
#[derive(Debug, Clone)]
pub struct TypeContext {
    types: SmallSlab<Type>,
    interned: HashMap<Type, TypeIndex>,
    raw_pointer: TypeIndex,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    pub fn new() -> Self {
        let mut types = SmallSlab::new();
        let raw_pointer = types.insert(Type::RawPointer);
        let mut interned = HashMap::new();
        interned.insert(Type::RawPointer, raw_pointer);

        Self {
            types,
            interned,
            raw_pointer,
        }
    }

    pub fn get(&self, ty: TypeIndex) -> &Type {
        &self.types[ty]
    }

    pub fn intern(&mut self, ty: Type) -> TypeIndex {
        let ty = match ty {
            Type::Address(inner) => Type::Address(self.object_type(inner)),
            other => other,
        };
        if let Some(idx) = self.interned.get(&ty) {
            return *idx;
        }

        let idx = self.types.insert(ty.clone());
        self.interned.insert(ty, idx);

        // Signature lowering looks up the address of every address-only type.
        if !self.is_address(idx) && self.is_address_only(idx) {
            self.intern(Type::Address(idx));
        }

        idx
    }

    pub fn int(&mut self, bits: u32) -> TypeIndex {
        self.intern(Type::BuiltinInteger(bits))
    }

    pub fn object_pointer(&mut self) -> TypeIndex {
        self.intern(Type::ObjectPointer)
    }

    pub fn struct_ty(&mut self, name: &str) -> TypeIndex {
        self.intern(Type::Struct(name.to_string()))
    }

    pub fn class(&mut self, name: &str) -> TypeIndex {
        self.intern(Type::Class(name.to_string()))
    }

    pub fn protocol(&mut self, name: &str) -> TypeIndex {
        self.intern(Type::Protocol(name.to_string()))
    }

    pub fn archetype(&mut self, name: &str) -> TypeIndex {
        self.intern(Type::Archetype(name.to_string()))
    }

    pub fn tuple(&mut self, fields: Vec<TypeIndex>) -> TypeIndex {
        self.intern(Type::Tuple(fields))
    }

    pub fn unit(&mut self) -> TypeIndex {
        self.tuple(Vec::new())
    }

    pub fn function(&mut self, input: TypeIndex, result: TypeIndex) -> TypeIndex {
        self.intern(Type::Function { input, result })
    }

    pub fn polymorphic_function(
        &mut self,
        params: &[&str],
        input: TypeIndex,
        result: TypeIndex,
    ) -> TypeIndex {
        let params = params.iter().map(|p| p.to_string()).collect();
        self.intern(Type::PolymorphicFunction {
            params,
            input,
            result,
        })
    }

    pub fn metatype(&mut self, instance: TypeIndex) -> TypeIndex {
        self.intern(Type::Metatype(instance))
    }

    /// The address of `ty`'s value type.
    pub fn address(&mut self, ty: TypeIndex) -> TypeIndex {
        self.intern(Type::Address(ty))
    }

    /// Lowers a formal parameter type: address-only values are passed by address.
    fn lower_input(&self, ty: TypeIndex) -> Option<TypeIndex> {
        if self.is_address(ty) || !self.is_address_only(ty) {
            return Some(ty);
        }
        self.interned.get(&Type::Address(ty)).copied()
    }

    fn object_kind(&self, ty: TypeIndex) -> &Type {
        self.get(self.object_type(ty))
    }
}

impl TypeFacts for TypeContext {
    type Ty = TypeIndex;

    fn is_address(&self, ty: TypeIndex) -> bool {
        matches!(self.get(ty), Type::Address(_))
    }

    fn has_reference_semantics(&self, ty: TypeIndex) -> bool {
        matches!(
            self.object_kind(ty),
            Type::Class(_)
                | Type::ObjectPointer
                | Type::Function { .. }
                | Type::PolymorphicFunction { .. }
        )
    }

    fn is_address_only(&self, ty: TypeIndex) -> bool {
        match self.object_kind(ty) {
            Type::Archetype(_) | Type::Protocol(_) => true,
            Type::Tuple(fields) => fields.iter().any(|field| self.is_address_only(*field)),
            _ => false,
        }
    }

    fn is_existential_type(&self, ty: TypeIndex) -> bool {
        matches!(self.object_kind(ty), Type::Protocol(_))
    }

    fn matches_shape(&self, ty: TypeIndex, shape: Shape) -> Option<ShapeView<TypeIndex>> {
        let view = match (shape, self.object_kind(ty)) {
            (Shape::Function | Shape::AnyFunction, Type::Function { input, result }) => {
                ShapeView::Function {
                    input: *input,
                    result: *result,
                }
            }
            (
                Shape::PolymorphicFunction | Shape::AnyFunction,
                Type::PolymorphicFunction { input, result, .. },
            ) => ShapeView::PolymorphicFunction {
                input: *input,
                result: *result,
            },
            (Shape::Tuple, Type::Tuple(fields)) => ShapeView::Tuple {
                fields: fields.clone(),
            },
            (Shape::BuiltinInteger, Type::BuiltinInteger(bits)) => {
                ShapeView::BuiltinInteger { bits: *bits }
            }
            (Shape::Metatype, Type::Metatype(instance)) => ShapeView::Metatype {
                instance: *instance,
            },
            (Shape::Archetype, Type::Archetype(_)) => ShapeView::Archetype,
            _ => return None,
        };
        Some(view)
    }

    fn object_type(&self, ty: TypeIndex) -> TypeIndex {
        match self.get(ty) {
            Type::Address(inner) => *inner,
            _ => ty,
        }
    }

    fn raw_pointer_type(&self) -> TypeIndex {
        self.raw_pointer
    }

    fn display(&self, ty: TypeIndex) -> String {
        match self.get(ty) {
            Type::BuiltinInteger(bits) => format!("Builtin.Int{bits}"),
            Type::RawPointer => "Builtin.RawPointer".to_string(),
            Type::ObjectPointer => "Builtin.ObjectPointer".to_string(),
            Type::Struct(name)
            | Type::Class(name)
            | Type::Protocol(name)
            | Type::Archetype(name) => name.clone(),
            Type::Tuple(fields) => {
                format!("({})", fields.iter().map(|f| self.display(*f)).join(", "))
            }
            Type::Function { input, result } => {
                format!("{} -> {}", self.display(*input), self.display(*result))
            }
            Type::PolymorphicFunction {
                params,
                input,
                result,
            } => format!(
                "<{}> {} -> {}",
                params.join(", "),
                self.display(*input),
                self.display(*result)
            ),
            Type::Metatype(instance) => format!("{}.metatype", self.display(*instance)),
            Type::Address(inner) => format!("*{}", self.display(*inner)),
        }
    }
}

impl SignatureProvider for TypeContext {
    fn signature_of(&self, ty: TypeIndex) -> Option<Signature<TypeIndex>> {
        let Some(ShapeView::Function { input, result }) = self.matches_shape(ty, Shape::Function)
        else {
            return None;
        };

        let inputs = match self.get(input) {
            Type::Tuple(fields) => fields
                .iter()
                .map(|field| self.lower_input(*field))
                .collect::<Option<Vec<_>>>()?,
            _ => vec![self.lower_input(input)?],
        };

        Some(Signature { inputs, result })
    }
}

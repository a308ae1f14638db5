#![allow(dead_code)]

use std::collections::HashMap;

use silverify::{
    VerificationFailure,
    ir::{Function, InstKind, Operand, builder::FunctionBuilder},
    types::context::{TypeContext, TypeIndex},
    verify::Invariant,
};
use tracing_subscriber::EnvFilter;

/// Shorthand for the types tests build functions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum T {
    Int,
    IntAddr,
    Bool,
    BoolAddr,
    BuiltinInt,
    RawPointer,
    ObjectPointer,
    Class,
    ClassAddr,
    Proto,
    ProtoAddr,
    Archetype,
    ArchetypeAddr,
    ArchetypeMetatype,
    IntMetatype,
    Unit,
    IntPair,
    /// `Int -> Int`
    IntToInt,
    /// `(Int, Bool) -> Int`
    IntBoolToInt,
    /// `<T> T -> T`
    Poly,
    /// `T -> Int -> Int`
    ArchMethod,
    /// `T.metatype -> Int -> Int`
    ArchMetaMethod,
    /// `T -> Int`
    ArchUncurried,
    /// `Int -> Int -> Int`
    IntMethod,
    /// `Int.metatype -> Int -> Int`
    IntMetaMethod,
    /// `C -> Int -> Int`
    ClassMethod,
    /// `Builtin.RawPointer -> Int -> Int`
    ProtoMethod,
    /// `Builtin.RawPointer -> Int`
    ProtoUncurried,
}

pub struct Types {
    pub ctx: TypeContext,
    map: HashMap<T, TypeIndex>,
}

impl Types {
    pub fn new() -> Self {
        let mut ctx = TypeContext::new();
        let mut map = HashMap::new();

        let int = ctx.struct_ty("Int");
        let bool_ty = ctx.struct_ty("Bool");
        let class = ctx.class("C");
        let proto = ctx.protocol("P");
        let archetype = ctx.archetype("T");
        let raw_pointer = {
            use silverify::types::TypeFacts;
            ctx.raw_pointer_type()
        };
        let int_to_int = ctx.function(int, int);
        let archetype_metatype = ctx.metatype(archetype);
        let int_metatype = ctx.metatype(int);
        let int_bool = ctx.tuple(vec![int, bool_ty]);

        map.insert(T::Int, int);
        map.insert(T::IntAddr, ctx.address(int));
        map.insert(T::Bool, bool_ty);
        map.insert(T::BoolAddr, ctx.address(bool_ty));
        map.insert(T::BuiltinInt, ctx.int(64));
        map.insert(T::RawPointer, raw_pointer);
        map.insert(T::ObjectPointer, ctx.object_pointer());
        map.insert(T::Class, class);
        map.insert(T::ClassAddr, ctx.address(class));
        map.insert(T::Proto, proto);
        map.insert(T::ProtoAddr, ctx.address(proto));
        map.insert(T::Archetype, archetype);
        map.insert(T::ArchetypeAddr, ctx.address(archetype));
        map.insert(T::ArchetypeMetatype, archetype_metatype);
        map.insert(T::IntMetatype, int_metatype);
        map.insert(T::Unit, ctx.unit());
        map.insert(T::IntPair, ctx.tuple(vec![int, int]));
        map.insert(T::IntToInt, int_to_int);
        map.insert(T::IntBoolToInt, ctx.function(int_bool, int));
        map.insert(
            T::Poly,
            ctx.polymorphic_function(&["T"], archetype, archetype),
        );
        map.insert(T::ArchMethod, ctx.function(archetype, int_to_int));
        map.insert(
            T::ArchMetaMethod,
            ctx.function(archetype_metatype, int_to_int),
        );
        map.insert(T::ArchUncurried, ctx.function(archetype, int));
        map.insert(T::IntMethod, ctx.function(int, int_to_int));
        map.insert(T::IntMetaMethod, ctx.function(int_metatype, int_to_int));
        map.insert(T::ClassMethod, ctx.function(class, int_to_int));
        map.insert(T::ProtoMethod, ctx.function(raw_pointer, int_to_int));
        map.insert(T::ProtoUncurried, ctx.function(raw_pointer, int));

        Self { ctx, map }
    }

    pub fn ty(&self, t: T) -> TypeIndex {
        self.map[&t]
    }

    /// Builds `func @test(<args>)` holding the instruction produced by `kind`,
    /// followed by `return ()`.
    pub fn single(
        &self,
        args: &[T],
        result: Option<T>,
        kind: impl FnOnce(&[Operand]) -> InstKind,
    ) -> Function<TypeIndex> {
        let mut builder = FunctionBuilder::new("test");
        let operands: Vec<_> = args
            .iter()
            .map(|arg| builder.add_argument(self.ty(*arg), None))
            .collect();

        let kind = kind(&operands);
        match result {
            Some(result) => {
                builder.inst(kind, self.ty(result));
            }
            None => builder.inst_void(kind),
        }

        self.finish_with_return(builder)
    }

    /// Appends `%n = tuple () ; return %n` and finishes the function.
    pub fn finish_with_return(
        &self,
        mut builder: FunctionBuilder<TypeIndex>,
    ) -> Function<TypeIndex> {
        let unit = builder.inst(InstKind::Tuple { elements: vec![] }, self.ty(T::Unit));
        builder.inst_void(InstKind::Return { value: Some(unit) });
        builder.finish()
    }

    pub fn verify(&self, function: &Function<TypeIndex>) -> Result<(), VerificationFailure> {
        init_logging();
        silverify::verify(&self.ctx, function)
    }

    /// The violated invariant of a single-instruction function, if any.
    #[track_caller]
    pub fn violated(
        &self,
        args: &[T],
        result: Option<T>,
        kind: impl FnOnce(&[Operand]) -> InstKind,
    ) -> Option<Invariant> {
        let function = self.single(args, result, kind);
        match self.verify(&function) {
            Ok(()) => None,
            Err(VerificationFailure::TypeInvariantViolation { invariant, .. }) => Some(invariant),
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

use common::{T, Types};
use silverify::{
    VerificationFailure,
    ir::InstKind,
    verify::{Invariant, ShapeDefect},
};
use test_case::test_case;

mod common;

use Invariant::*;

#[test_case(T::IntAddr => None ; "address result")]
#[test_case(T::Int => Some(AllocVarResultAddress) ; "value result")]
fn alloc_var(result: T) -> Option<Invariant> {
    Types::new().violated(&[], Some(result), |_| InstKind::AllocVar)
}

#[test_case(T::Class => None ; "class reference")]
#[test_case(T::ObjectPointer => None ; "object pointer")]
#[test_case(T::ClassAddr => Some(AllocRefResultReference) ; "address of class")]
#[test_case(T::Int => Some(AllocRefResultReference) ; "value type")]
fn alloc_ref(result: T) -> Option<Invariant> {
    Types::new().violated(&[], Some(result), |_| InstKind::AllocRef)
}

#[test_case(T::IntAddr, T::Int => None ; "load value from address")]
#[test_case(T::Int, T::Int => Some(LoadOperandAddress) ; "load from value")]
#[test_case(T::IntAddr, T::IntAddr => Some(LoadResultNotAddress) ; "load an address")]
#[test_case(T::IntAddr, T::Bool => Some(LoadTypeMismatch) ; "pointee mismatch")]
fn load(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::Load {
        address: ops[0],
    })
}

#[test_case(T::Int, T::IntAddr => None ; "store value to address")]
#[test_case(T::IntAddr, T::IntAddr => Some(StoreSourceNotAddress) ; "store from address")]
#[test_case(T::Int, T::Int => Some(StoreDestAddress) ; "store to value")]
#[test_case(T::Bool, T::IntAddr => Some(StoreTypeMismatch) ; "pointee mismatch")]
fn store(src: T, dest: T) -> Option<Invariant> {
    Types::new().violated(&[src, dest], None, |ops| InstKind::Store {
        src: ops[0],
        dest: ops[1],
    })
}

#[test_case(T::IntAddr, T::IntAddr => None ; "same address types")]
#[test_case(T::Int, T::IntAddr => Some(CopyAddrSourceAddress) ; "value source")]
#[test_case(T::IntAddr, T::Int => Some(CopyAddrDestAddress) ; "value dest")]
#[test_case(T::IntAddr, T::BoolAddr => Some(CopyAddrTypeMismatch) ; "different pointees")]
fn copy_addr(src: T, dest: T) -> Option<Invariant> {
    Types::new().violated(&[src, dest], None, |ops| InstKind::CopyAddr {
        src: ops[0],
        dest: ops[1],
        take: false,
        initialize: true,
    })
}

#[test_case(T::IntAddr => None ; "address")]
#[test_case(T::Int => Some(ZeroAddrDestAddress) ; "value")]
fn zero_addr(dest: T) -> Option<Invariant> {
    Types::new().violated(&[dest], None, |ops| InstKind::ZeroAddr { dest: ops[0] })
}

#[test_case(T::Int => None ; "value")]
#[test_case(T::IntAddr => Some(ZeroValueNotAddress) ; "address")]
fn zero_value(result: T) -> Option<Invariant> {
    Types::new().violated(&[], Some(result), |_| InstKind::ZeroValue)
}

#[test_case(T::IntAddr, T::IntAddr => None ; "same address")]
#[test_case(T::IntAddr, T::BoolAddr => Some(IndexAddrResult) ; "different address")]
#[test_case(T::Int, T::Int => Some(IndexAddrResult) ; "values")]
fn index_addr(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::IndexAddr {
        operand: ops[0],
        index: 1,
    })
}

#[test_case(T::IntPair, T::Int => None ; "field of tuple value")]
#[test_case(T::IntAddr, T::Int => Some(ExtractOperandNotAddress) ; "from address")]
#[test_case(T::Class, T::Int => Some(ExtractOperandNotReference) ; "from reference")]
#[test_case(T::IntPair, T::IntAddr => Some(ExtractResultNotAddress) ; "address result")]
fn extract(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::Extract {
        operand: ops[0],
        field: 0,
    })
}

#[test_case(T::IntAddr, T::IntAddr => None ; "field of address")]
#[test_case(T::Int, T::IntAddr => Some(ElementAddrOperandAddress) ; "from value")]
#[test_case(T::ClassAddr, T::IntAddr => Some(ElementAddrOperandNotReference) ; "from class address")]
#[test_case(T::IntAddr, T::Int => Some(ElementAddrResultAddress) ; "value result")]
fn element_addr(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::ElementAddr {
        operand: ops[0],
        field: 0,
    })
}

#[test_case(T::Class, T::IntAddr => None ; "field of object")]
#[test_case(T::ClassAddr, T::IntAddr => Some(RefElementAddrOperandNotAddress) ; "from address")]
#[test_case(T::Int, T::IntAddr => Some(RefElementAddrOperandReference) ; "from value type")]
#[test_case(T::Class, T::Int => Some(RefElementAddrResultAddress) ; "value result")]
fn ref_element_addr(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::RefElementAddr {
        operand: ops[0],
        field: 0,
    })
}

#[test_case(T::IntAddr => None ; "address")]
#[test_case(T::Int => Some(DeallocVarOperandAddress) ; "value")]
fn dealloc_var(operand: T) -> Option<Invariant> {
    Types::new().violated(&[operand], None, |ops| InstKind::DeallocVar {
        operand: ops[0],
    })
}

#[test_case(T::ArchetypeAddr => None ; "archetype")]
#[test_case(T::ProtoAddr => None ; "existential")]
#[test_case(T::IntAddr => Some(DestroyAddrAddressOnly) ; "loadable")]
fn destroy_addr(operand: T) -> Option<Invariant> {
    Types::new().violated(&[operand], None, |ops| InstKind::DestroyAddr {
        operand: ops[0],
    })
}

#[derive(Debug, Clone, Copy)]
enum RefCounting {
    Retain,
    Release,
    DeallocRef,
}

impl RefCounting {
    fn kind(self, operand: silverify::ir::Operand) -> InstKind {
        match self {
            RefCounting::Retain => InstKind::Retain { operand },
            RefCounting::Release => InstKind::Release { operand },
            RefCounting::DeallocRef => InstKind::DeallocRef { operand },
        }
    }

    fn expected(self, operand: T) -> Option<Invariant> {
        match (self, operand) {
            (_, T::Class | T::ObjectPointer) => None,
            (RefCounting::Retain, T::ClassAddr | T::IntAddr) => Some(RetainOperandNotAddress),
            (RefCounting::Release, T::ClassAddr | T::IntAddr) => Some(ReleaseOperandNotAddress),
            (RefCounting::DeallocRef, T::ClassAddr | T::IntAddr) => {
                Some(DeallocRefOperandNotAddress)
            }
            (RefCounting::Retain, _) => Some(RetainOperandReference),
            (RefCounting::Release, _) => Some(ReleaseOperandReference),
            (RefCounting::DeallocRef, _) => Some(DeallocRefOperandReference),
        }
    }
}

#[test_case(RefCounting::Retain)]
#[test_case(RefCounting::Release)]
#[test_case(RefCounting::DeallocRef)]
fn reference_counting_needs_reference_values(op: RefCounting) {
    let types = Types::new();
    for operand in [T::Class, T::ObjectPointer, T::ClassAddr, T::Int, T::IntAddr] {
        let violated = types.violated(&[operand], None, |ops| op.kind(ops[0]));
        assert_eq!(violated, op.expected(operand), "{op:?} on {operand:?}");
    }
}

#[test_case(T::IntToInt => None ; "function")]
#[test_case(T::Poly => None ; "polymorphic function")]
#[test_case(T::Int => Some(ConstantRefFunction) ; "value")]
fn constant_ref(result: T) -> Option<Invariant> {
    Types::new().violated(&[], Some(result), |_| InstKind::ConstantRef {
        name: "foo".to_string(),
    })
}

#[test_case(T::BuiltinInt => None ; "builtin integer")]
#[test_case(T::Int => Some(IntegerLiteralType) ; "library integer")]
fn integer_literal(result: T) -> Option<Invariant> {
    Types::new().violated(&[], Some(result), |_| InstKind::IntegerLiteral {
        value: -7,
    })
}

#[test_case(T::BuiltinInt => None ; "builtin integer")]
#[test_case(T::IntAddr => Some(IntegerValueType) ; "address")]
fn integer_value(result: T) -> Option<Invariant> {
    Types::new().violated(&[], Some(result), |_| InstKind::IntegerValue { value: 7 })
}

#[test_case(T::IntMetatype => None ; "metatype")]
#[test_case(T::Int => Some(MetatypeResult) ; "value")]
fn metatype(result: T) -> Option<Invariant> {
    Types::new().violated(&[], Some(result), |_| InstKind::Metatype)
}

#[test_case(T::ArchetypeMetatype, T::IntMetatype => None ; "metatype to metatype")]
#[test_case(T::ArchetypeMetatype, T::Int => Some(AssociatedMetatypeResult) ; "value result")]
#[test_case(T::Archetype, T::IntMetatype => Some(AssociatedMetatypeOperand) ; "value source")]
fn associated_metatype(source: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[source], Some(result), |ops| {
        InstKind::AssociatedMetatype {
            source: ops[0],
            member: "Element".to_string(),
        }
    })
}

#[test_case(T::Poly, T::IntToInt => None ; "polymorphic to concrete")]
#[test_case(T::IntToInt, T::IntToInt => Some(SpecializeOperandPolymorphic) ; "concrete source")]
#[test_case(T::Poly, T::Poly => Some(SpecializeResultFunction) ; "polymorphic result")]
fn specialize(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::Specialize {
        operand: ops[0],
    })
}

#[test_case(T::ArchetypeAddr, T::Class => None ; "archetype address to class")]
#[test_case(T::Archetype, T::Class => Some(ArchetypeToSuperOperandAddress) ; "archetype value")]
#[test_case(T::IntAddr, T::Class => Some(ArchetypeToSuperOperandAddressOnly) ; "loadable address")]
#[test_case(T::ProtoAddr, T::Class => Some(ArchetypeToSuperOperandArchetype) ; "existential address")]
#[test_case(T::ArchetypeAddr, T::Int => Some(ArchetypeToSuperResultReference) ; "value result")]
fn archetype_to_super(from: T, to: T) -> Option<Invariant> {
    Types::new().violated(&[from], Some(to), |ops| InstKind::ArchetypeToSuper {
        operand: ops[0],
    })
}

#[test_case(T::Class, T::ArchetypeAddr => None ; "class into archetype slot")]
#[test_case(T::Int, T::ArchetypeAddr => Some(SuperToArchetypeSourceReference) ; "value source")]
#[test_case(T::Class, T::Archetype => Some(SuperToArchetypeDestAddress) ; "archetype value dest")]
#[test_case(T::Class, T::IntAddr => Some(SuperToArchetypeDestArchetype) ; "loadable dest")]
fn super_to_archetype(src: T, dest: T) -> Option<Invariant> {
    Types::new().violated(&[src, dest], None, |ops| InstKind::SuperToArchetype {
        src: ops[0],
        dest: ops[1],
    })
}

#[test_case(T::Class, T::Class => None ; "class to class")]
#[test_case(T::Int, T::Class => Some(DowncastOperandReference) ; "from value")]
#[test_case(T::Class, T::Int => Some(DowncastResultReference) ; "to value")]
fn downcast(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::Downcast {
        operand: ops[0],
    })
}

#[test_case(T::ArchetypeAddr, T::ArchMethod => None ; "archetype address")]
#[test_case(T::ArchetypeMetatype, T::ArchMetaMethod => None ; "archetype metatype")]
#[test_case(T::ArchetypeAddr, T::Int => Some(ArchetypeMethodResultFunction) ; "value result")]
#[test_case(T::ArchetypeAddr, T::IntMethod => Some(ArchetypeMethodSelfType) ; "self type mismatch")]
#[test_case(T::ArchetypeAddr, T::ArchUncurried => Some(ArchetypeMethodCurried) ; "not curried")]
#[test_case(T::IntAddr, T::IntMethod => Some(ArchetypeMethodOperandArchetype) ; "loadable address")]
#[test_case(T::IntMetatype, T::IntMetaMethod => Some(ArchetypeMethodMetatypeArchetype) ; "concrete metatype")]
fn archetype_method(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::ArchetypeMethod {
        operand: ops[0],
        member: "foo".to_string(),
    })
}

#[test_case(T::ProtoAddr, T::ProtoMethod => None ; "existential address")]
#[test_case(T::ProtoAddr, T::Int => Some(ProtocolMethodResultFunction) ; "value result")]
#[test_case(T::ProtoAddr, T::IntMethod => Some(ProtocolMethodSelfRawPointer) ; "self not raw pointer")]
#[test_case(T::ProtoAddr, T::ProtoUncurried => Some(ProtocolMethodCurried) ; "not curried")]
#[test_case(T::Proto, T::ProtoMethod => Some(ProtocolMethodOperandAddress) ; "existential value")]
#[test_case(T::IntAddr, T::ProtoMethod => Some(ProtocolMethodOperandExistential) ; "loadable address")]
fn protocol_method(operand: T, result: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(result), |ops| InstKind::ProtocolMethod {
        operand: ops[0],
        member: "foo".to_string(),
    })
}

#[test_case(T::ProtoAddr => None ; "existential address")]
#[test_case(T::Proto => Some(ProjectExistentialOperandAddress) ; "existential value")]
#[test_case(T::IntAddr => Some(ProjectExistentialOperandExistential) ; "loadable address")]
fn project_existential(operand: T) -> Option<Invariant> {
    Types::new().violated(&[operand], Some(T::ArchetypeAddr), |ops| {
        InstKind::ProjectExistential { operand: ops[0] }
    })
}

#[test_case(T::ProtoAddr => None ; "existential address")]
#[test_case(T::Proto => Some(InitExistentialAddress) ; "existential value")]
#[test_case(T::ArchetypeAddr => Some(InitExistentialExistential) ; "archetype address")]
fn init_existential(existential: T) -> Option<Invariant> {
    Types::new().violated(&[existential], Some(T::IntAddr), |ops| {
        InstKind::InitExistential {
            existential: ops[0],
        }
    })
}

#[test_case(T::ProtoAddr => None ; "existential address")]
#[test_case(T::Proto => Some(DeinitExistentialAddress) ; "existential value")]
#[test_case(T::ClassAddr => Some(DeinitExistentialExistential) ; "class address")]
fn deinit_existential(existential: T) -> Option<Invariant> {
    Types::new().violated(&[existential], None, |ops| InstKind::DeinitExistential {
        existential: ops[0],
    })
}

#[test]
fn tuple_must_produce_a_tuple() {
    let types = Types::new();
    let violated = types.violated(&[T::Int, T::Int], Some(T::Int), |ops| InstKind::Tuple {
        elements: ops.to_vec(),
    });
    assert_eq!(violated, Some(TupleResultTuple));
}

#[test]
fn archetype_method_on_plain_value_is_unrecoverable() {
    let types = Types::new();
    let function = types.single(&[T::Class], Some(T::ClassMethod), |ops| {
        InstKind::ArchetypeMethod {
            operand: ops[0],
            member: "foo".to_string(),
        }
    });

    let failure = types.verify(&function).expect_err("expected failure");
    assert!(failure.is_fatal(), "{failure}");
    let VerificationFailure::UnrecoverableShape { defect, .. } = &failure else {
        panic!("unexpected failure: {failure}");
    };
    assert_eq!(
        *defect,
        ShapeDefect::MethodOperand {
            operand: "C".to_string(),
        }
    );
}

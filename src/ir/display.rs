use std::fmt;

use itertools::Itertools;

use super::{BasicBlock, Function, InstKind, Instruction};
use crate::types::TypeFacts;

impl InstKind {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            InstKind::AllocVar => "alloc_var",
            InstKind::AllocRef => "alloc_ref",
            InstKind::Apply { .. } => "apply",
            InstKind::ConstantRef { .. } => "constant_ref",
            InstKind::IntegerLiteral { .. } => "integer_literal",
            InstKind::IntegerValue { .. } => "integer_value",
            InstKind::Load { .. } => "load",
            InstKind::Store { .. } => "store",
            InstKind::CopyAddr { .. } => "copy_addr",
            InstKind::ZeroAddr { .. } => "zero_addr",
            InstKind::ZeroValue => "zero_value",
            InstKind::Specialize { .. } => "specialize",
            InstKind::Tuple { .. } => "tuple",
            InstKind::Metatype => "metatype",
            InstKind::AssociatedMetatype { .. } => "associated_metatype",
            InstKind::Retain { .. } => "retain",
            InstKind::Release { .. } => "release",
            InstKind::DeallocVar { .. } => "dealloc_var",
            InstKind::DeallocRef { .. } => "dealloc_ref",
            InstKind::DestroyAddr { .. } => "destroy_addr",
            InstKind::IndexAddr { .. } => "index_addr",
            InstKind::Extract { .. } => "extract",
            InstKind::ElementAddr { .. } => "element_addr",
            InstKind::RefElementAddr { .. } => "ref_element_addr",
            InstKind::ArchetypeMethod { .. } => "archetype_method",
            InstKind::ProtocolMethod { .. } => "protocol_method",
            InstKind::ProjectExistential { .. } => "project_existential",
            InstKind::InitExistential { .. } => "init_existential",
            InstKind::DeinitExistential { .. } => "deinit_existential",
            InstKind::ArchetypeToSuper { .. } => "archetype_to_super",
            InstKind::SuperToArchetype { .. } => "super_to_archetype",
            InstKind::Downcast { .. } => "downcast",
            InstKind::Return { .. } => "return",
            InstKind::Branch { .. } => "br",
            InstKind::CondBranch { .. } => "cond_br",
            InstKind::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for InstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())?;
        match self {
            InstKind::ConstantRef { name } => write!(f, " @{name}"),
            InstKind::IntegerLiteral { value } => write!(f, " {value}"),
            InstKind::IntegerValue { value } => write!(f, " {value}"),
            InstKind::Apply { callee, args } => write!(f, " {callee}({})", args.iter().join(", ")),
            InstKind::Store { src, dest } => write!(f, " {src} to {dest}"),
            InstKind::CopyAddr {
                src,
                dest,
                take,
                initialize,
            } => {
                let take = if *take { "[take] " } else { "" };
                let init = if *initialize { "[initialization] " } else { "" };
                write!(f, " {take}{src} to {init}{dest}")
            }
            InstKind::SuperToArchetype { src, dest } => write!(f, " {src} to {dest}"),
            InstKind::Extract { operand, field }
            | InstKind::ElementAddr { operand, field }
            | InstKind::RefElementAddr { operand, field } => write!(f, " {operand}, {field}"),
            InstKind::IndexAddr { operand, index } => write!(f, " {operand}, {index}"),
            InstKind::AssociatedMetatype { source, member } => write!(f, " {source}, #{member}"),
            InstKind::ArchetypeMethod { operand, member }
            | InstKind::ProtocolMethod { operand, member } => write!(f, " {operand}, #{member}"),
            InstKind::Branch { target } => write!(f, " bb{target}"),
            InstKind::CondBranch {
                condition,
                true_target,
                false_target,
            } => {
                match condition {
                    Some(condition) => write!(f, " {condition}")?,
                    None => write!(f, " <null>")?,
                }
                write!(f, ", bb{true_target}, bb{false_target}")
            }
            InstKind::Return { value: None } => write!(f, " <null>"),
            other => {
                let operands = other.operands();
                if operands.is_empty() {
                    Ok(())
                } else {
                    write!(f, " {}", operands.iter().join(", "))
                }
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = self.result {
            write!(f, "{result} = ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl<T: Copy> Function<T> {
    /// Renders the whole body, annotating every value slot with its type.
    pub fn display<P>(&self, types: &P) -> Result<String, fmt::Error>
    where
        P: TypeFacts<Ty = T>,
    {
        use std::fmt::Write;

        let mut f = String::new();
        let params = self
            .get_params()
            .into_iter()
            .map(|param| match self.value_ty(param) {
                Some(ty) => format!("{param}: {}", types.display(ty)),
                None => param.to_string(),
            })
            .join(", ");
        writeln!(f, "func @{}({params}) {{", self.name)?;
        for (idx, block) in self.basic_blocks.iter().enumerate() {
            writeln!(f, "bb{idx}:")?;
            write_block(&mut f, self, block, types)?;
        }
        write!(f, "}}")?;
        Ok(f)
    }
}

fn write_block<T, P>(
    f: &mut String,
    function: &Function<T>,
    block: &BasicBlock,
    types: &P,
) -> fmt::Result
where
    T: Copy,
    P: TypeFacts<Ty = T>,
{
    use std::fmt::Write;

    for inst in &block.instructions {
        let annotation = inst
            .result
            .and_then(|result| function.value_ty(result))
            .map(|ty| format!(" : {}", types.display(ty)))
            .unwrap_or_default();
        writeln!(f, "  {inst}{annotation}")?;
    }
    Ok(())
}

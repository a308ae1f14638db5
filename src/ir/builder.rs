use super::{
    BasicBlock, BlockIndex, Function, InstKind, Instruction, Operand, Span, ValueDecl, ValueKind,
};

/// Appends blocks, arguments and instructions to a function under construction.
///
/// The builder starts with an entry block selected. It does not check
/// anything; that is what [`crate::verify`] is for.
#[derive(Debug, Clone)]
pub struct FunctionBuilder<T> {
    function: Function<T>,
    current: BlockIndex,
}

impl<T: Copy> FunctionBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        let mut function = Function::new(name);
        function.basic_blocks.push(BasicBlock::default());
        Self {
            function,
            current: 0,
        }
    }

    pub fn add_argument(&mut self, ty: T, debug_name: Option<&str>) -> Operand {
        self.push_value(ValueDecl {
            debug_name: debug_name.map(str::to_string),
            ty,
            kind: ValueKind::Arg,
        })
    }

    /// Creates a new empty block without selecting it.
    pub fn create_block(&mut self) -> BlockIndex {
        self.function.basic_blocks.push(BasicBlock::default());
        self.function.basic_blocks.len() - 1
    }

    /// Selects the block later instructions are appended to.
    ///
    /// # Panics
    ///
    /// Panics if `block` was not created by this builder.
    pub fn switch_to(&mut self, block: BlockIndex) {
        assert!(
            block < self.function.basic_blocks.len(),
            "unknown block bb{block}"
        );
        self.current = block;
    }

    /// Appends an instruction defining a new value of type `ty`.
    pub fn inst(&mut self, kind: InstKind, ty: T) -> Operand {
        let result = self.push_value(ValueDecl::temp(ty));
        self.push(Instruction::new(kind, Some(result)));
        result
    }

    /// Appends an instruction that defines no value.
    pub fn inst_void(&mut self, kind: InstKind) {
        self.push(Instruction::new(kind, None));
    }

    pub fn inst_with_span(&mut self, kind: InstKind, ty: Option<T>, span: Span) -> Option<Operand> {
        let result = ty.map(|ty| self.push_value(ValueDecl::temp(ty)));
        self.push(Instruction {
            kind,
            result,
            span: Some(span),
        });
        result
    }

    pub fn push(&mut self, inst: Instruction) {
        self.function.basic_blocks[self.current]
            .instructions
            .push(inst);
    }

    pub fn finish(self) -> Function<T> {
        self.function
    }

    fn push_value(&mut self, decl: ValueDecl<T>) -> Operand {
        self.function.values.push(decl);
        Operand(self.function.values.len() - 1)
    }
}

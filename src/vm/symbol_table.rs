//! Compile-time name resolution.
//!
//! Scopes form a stack rooted at the single global table. Function scopes own
//! a frame (their locals array); block scopes borrow slots from the nearest
//! enclosing frame owner, so a block-local is still a plain frame local.

use std::collections::HashMap;

/// Where a resolved name lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Global,
    Local,
    Parameter,
    Builtin,
    /// Captured from an enclosing function at closure creation.
    Free,
    /// A nested function's reference to itself.
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub index: usize,
}

impl Symbol {
    fn new(name: &str, kind: SymbolKind, index: usize) -> Self {
        Self {
            name: name.to_string(),
            kind,
            index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// One lexical scope.
#[derive(Debug)]
pub struct SymbolTable {
    pub kind: ScopeKind,
    store: HashMap<String, Symbol>,
    /// Definitions made in this scope.
    pub num_definitions: usize,
    /// Frame slots in use right now. Only used on frame owners.
    frame_slots: usize,
    /// Most frame slots ever in use at once.
    peak_slots: usize,
    /// Owner's `frame_slots` when this block was entered.
    slot_base: usize,
    /// Outer symbols captured by this function scope, in capture order.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            store: HashMap::new(),
            num_definitions: 0,
            frame_slots: 0,
            peak_slots: 0,
            slot_base: 0,
            free_symbols: Vec::new(),
        }
    }

    fn owns_frame(&self) -> bool {
        self.kind != ScopeKind::Block
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.store.get(name)
    }

    /// Frame locals required by this scope (frame owners only).
    pub fn frame_size(&self) -> usize {
        self.peak_slots
    }

    fn insert(&mut self, symbol: Symbol) -> Symbol {
        self.num_definitions += 1;
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }
}

/// The active scope chain of one compilation.
#[derive(Debug)]
pub struct Scopes {
    tables: Vec<SymbolTable>,
    global_names: Vec<String>,
}

impl Scopes {
    /// A chain holding only the global scope, with `builtins` pre-defined.
    pub fn new(builtins: &[&str]) -> Self {
        let mut global = SymbolTable::new(ScopeKind::Global);
        for (index, name) in builtins.iter().enumerate() {
            global
                .store
                .insert(name.to_string(), Symbol::new(name, SymbolKind::Builtin, index));
        }
        Self {
            tables: vec![global],
            global_names: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.tables.len()
    }

    pub fn current(&self) -> &SymbolTable {
        &self.tables[self.tables.len() - 1]
    }

    pub fn push(&mut self, kind: ScopeKind) {
        let mut table = SymbolTable::new(kind);
        if kind == ScopeKind::Block {
            let owner = self.frame_owner();
            table.slot_base = self.tables[owner].frame_slots;
        }
        self.tables.push(table);
    }

    /// Leave the innermost scope. The global scope is never popped.
    ///
    /// Slots taken by a block go back to its frame owner for reuse.
    pub fn pop(&mut self) -> Option<SymbolTable> {
        if self.tables.len() <= 1 {
            return None;
        }
        let table = self.tables.pop()?;
        if table.kind == ScopeKind::Block {
            let owner = self.frame_owner();
            self.tables[owner].frame_slots = table.slot_base;
        }
        Some(table)
    }

    /// True when the innermost frame owner is the global scope.
    pub fn at_top_level(&self) -> bool {
        self.frame_owner() == 0
    }

    pub fn num_globals(&self) -> usize {
        self.global_names.len()
    }

    pub fn global_names(&self) -> &[String] {
        &self.global_names
    }

    /// Frame locals needed by the top-level program.
    pub fn top_level_frame_size(&self) -> usize {
        self.tables[0].frame_size()
    }

    fn frame_owner(&self) -> usize {
        self.tables
            .iter()
            .rposition(SymbolTable::owns_frame)
            .unwrap_or(0)
    }

    fn next_frame_slot(&mut self) -> usize {
        let owner = self.frame_owner();
        let table = &mut self.tables[owner];
        let slot = table.frame_slots;
        table.frame_slots += 1;
        table.peak_slots = table.peak_slots.max(table.frame_slots);
        slot
    }

    /// Define `name` in the global scope, or return the existing global.
    pub fn define_global(&mut self, name: &str) -> Symbol {
        if let Some(existing) = self.tables[0].get(name) {
            if existing.kind == SymbolKind::Global {
                return existing.clone();
            }
        }
        let index = self.global_names.len();
        self.global_names.push(name.to_string());
        self.tables[0].insert(Symbol::new(name, SymbolKind::Global, index))
    }

    /// Define a frame local in the innermost scope.
    pub fn define_local(&mut self, name: &str) -> Symbol {
        let index = self.next_frame_slot();
        let last = self.tables.len() - 1;
        self.tables[last].insert(Symbol::new(name, SymbolKind::Local, index))
    }

    /// Define the next parameter of the innermost function scope.
    pub fn define_parameter(&mut self, name: &str) -> Symbol {
        let index = self.next_frame_slot();
        let last = self.tables.len() - 1;
        self.tables[last].insert(Symbol::new(name, SymbolKind::Parameter, index))
    }

    /// Let the innermost function see itself under `name`.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let last = self.tables.len() - 1;
        self.tables[last].insert(Symbol::new(name, SymbolKind::Function, 0))
    }

    /// Resolve `name` from the innermost scope outward.
    ///
    /// A frame-bound symbol found beyond a function boundary is recorded as a
    /// free variable of every function scope crossed on the way back in.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        self.resolve_at(self.tables.len() - 1, name)
    }

    fn resolve_at(&mut self, level: usize, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.tables[level].get(name) {
            return Some(symbol.clone());
        }
        if level == 0 {
            return None;
        }
        let outer = self.resolve_at(level - 1, name)?;
        if self.tables[level].kind != ScopeKind::Function {
            return Some(outer);
        }
        match outer.kind {
            SymbolKind::Global | SymbolKind::Builtin => Some(outer),
            _ => Some(self.define_free(level, outer)),
        }
    }

    fn define_free(&mut self, level: usize, original: Symbol) -> Symbol {
        let table = &mut self.tables[level];
        table.free_symbols.push(original.clone());
        let index = table.free_symbols.len() - 1;
        table.insert(Symbol::new(&original.name, SymbolKind::Free, index))
    }
}

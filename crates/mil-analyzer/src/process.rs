//! Discovery of long-running process types and their state enums.

use tracing::{debug, info};

use crate::mil::{factory, MilToken};
use crate::semantic::{Compilation, PropertySymbol, TypeSymbol};
use crate::syntax::TypeKind;

/// Default process marker interface name.
pub const DEFAULT_PROCESS_MARKER: &str = "IProcess";

/// State discovery strategy that picks the first enum declared directly
/// inside the process type.
pub fn first_nested_enum<'c>(compilation: &'c Compilation, process: &'c TypeSymbol) -> Option<&'c TypeSymbol> {
    process
        .nested_types
        .iter()
        .map(|&id| compilation.type_symbol(id))
        .find(|nested| nested.is_enum())
}

/// The marker interface a process type was found through.
#[derive(Debug, Clone)]
pub enum ProcessInterface<'c> {
    Declared(&'c TypeSymbol),
    /// Not declared in the compilation; matched by base name.
    External(String),
}

impl ProcessInterface<'_> {
    pub fn name(&self) -> &str {
        match self {
            ProcessInterface::Declared(symbol) => &symbol.name,
            ProcessInterface::External(name) => name,
        }
    }
}

/// A process type together with its marker interface, its state enum and
/// the property holding the current state.
#[derive(Debug, Clone)]
pub struct ProcessDefinition<'c> {
    compilation: &'c Compilation,
    process: &'c TypeSymbol,
    process_interface: Option<ProcessInterface<'c>>,
    state_enum: Option<&'c TypeSymbol>,
    state_property: Option<&'c PropertySymbol>,
}

impl<'c> ProcessDefinition<'c> {
    fn new(compilation: &'c Compilation, process: &'c TypeSymbol, process_interface: ProcessInterface<'c>) -> Self {
        Self {
            compilation,
            process,
            process_interface: Some(process_interface),
            state_enum: None,
            state_property: None,
        }
    }

    pub fn process_name(&self) -> &'c str {
        &self.process.name
    }

    pub fn process_type(&self) -> &'c TypeSymbol {
        self.process
    }

    pub fn process_interface(&self) -> Option<&ProcessInterface<'c>> {
        self.process_interface.as_ref()
    }

    pub fn process_interface_name(&self) -> &str {
        self.process_interface.as_ref().map_or("", ProcessInterface::name)
    }

    pub fn state_enum(&self) -> Option<&'c TypeSymbol> {
        self.state_enum
    }

    pub fn state_property(&self) -> Option<&'c PropertySymbol> {
        self.state_property
    }

    /// Process type, marker interface, state enum and state property are
    /// all known.
    pub fn is_complete(&self) -> bool {
        self.process_interface.is_some() && self.state_enum.is_some() && self.state_property.is_some()
    }

    /// Locates the state enum with `strategy`, then the first property of
    /// the process typed with that enum.
    pub fn set_state_enum_using_strategy<F>(&mut self, strategy: F)
    where
        F: FnOnce(&'c Compilation, &'c TypeSymbol) -> Option<&'c TypeSymbol>,
    {
        let process = self.process;
        self.state_enum = strategy(self.compilation, process);
        self.state_property = self.state_enum.and_then(|state| {
            process
                .properties
                .iter()
                .find(|p| p.ty.plain_name() == state.name)
        });
    }

    /// `%Process, Property:[A, B]` for a complete definition, otherwise a
    /// bare statement terminator.
    pub fn token(definition: Option<&ProcessDefinition<'_>>) -> MilToken {
        match definition.filter(|d| d.is_complete()) {
            Some(ProcessDefinition {
                process,
                state_enum: Some(state),
                state_property: Some(property),
                ..
            }) => factory::state_definition(&process.name, &property.name, &state.enum_members),
            _ => factory::statement_terminator(),
        }
    }
}

/// Finds process types by their marker interface.
#[derive(Debug, Clone)]
pub struct ProcessAnalyzer {
    process_marker: String,
}

impl Default for ProcessAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_MARKER)
    }
}

impl ProcessAnalyzer {
    pub fn new(process_marker: impl Into<String>) -> Self {
        Self {
            process_marker: process_marker.into(),
        }
    }

    pub fn process_marker(&self) -> &str {
        &self.process_marker
    }

    /// The first namespaced type implementing the process marker whose name
    /// contains `name_filter`. A blank filter matches any name.
    pub fn get_process_definition<'c>(
        &self,
        compilation: &'c Compilation,
        name_filter: &str,
    ) -> Option<ProcessDefinition<'c>> {
        let any_name = name_filter.trim().is_empty();
        let found = compilation
            .global_namespace()
            .walk_types()
            .into_iter()
            .map(|id| compilation.type_symbol(id))
            .filter(|symbol| any_name || symbol.name.contains(name_filter))
            .find_map(|symbol| Some((symbol, self.implemented_marker(compilation, symbol)?)));

        let Some((process, marker)) = found else {
            debug!(assembly = compilation.assembly_name(), filter = name_filter, "no process type found");
            return None;
        };

        let mut definition = ProcessDefinition::new(compilation, process, marker);
        definition.set_state_enum_using_strategy(first_nested_enum);
        info!(
            process = %process.name,
            complete = definition.is_complete(),
            "discovered process"
        );
        Some(definition)
    }

    pub fn get_process_state_names(&self, compilation: &Compilation, name_filter: &str) -> Option<Vec<String>> {
        self.get_process_definition(compilation, name_filter)?
            .state_enum()
            .map(|state| state.enum_members.clone())
    }

    /// State definition token of the matching process, or the empty token
    /// when there is none.
    pub fn get_process_token(&self, compilation: &Compilation, name_filter: &str) -> MilToken {
        match self.get_process_definition(compilation, name_filter) {
            Some(definition) => ProcessDefinition::token(Some(&definition)),
            None => factory::empty(),
        }
    }

    /// The marker interface among the interfaces of `symbol`. When the
    /// marker is not declared in the compilation, a base of that name counts.
    fn implemented_marker<'c>(
        &self,
        compilation: &'c Compilation,
        symbol: &TypeSymbol,
    ) -> Option<ProcessInterface<'c>> {
        let declared = compilation.symbols().types_named(&self.process_marker);
        if declared.is_empty() {
            return symbol
                .bases
                .iter()
                .any(|b| b.plain_name() == self.process_marker)
                .then(|| ProcessInterface::External(self.process_marker.clone()));
        }
        symbol
            .interfaces
            .iter()
            .map(|&id| compilation.type_symbol(id))
            .find(|iface| iface.kind == TypeKind::Interface && iface.name == self.process_marker)
            .map(ProcessInterface::Declared)
    }
}

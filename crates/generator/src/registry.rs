//! Per-service dispatch registry

use carno_codegen_common::ServiceDescriptor;
use serde::Serialize;

use crate::resolver::Identifier;

/// Static descriptor the runtime uses to validate and route a named call
///
/// Calls are routed by method name. The position of a name in `methods` is
/// not stable across schema changes and nothing generated depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchTable {
    /// Raw service name as declared in the schema
    pub service_name: String,
    /// Go variable holding the descriptor, e.g. `_Echo_serviceDesc`
    pub desc_var: String,
    /// Unary method names in declaration order
    pub methods: Vec<String>,
}

pub struct RegistryBuilder;

impl RegistryBuilder {
    /// Unary method names of a service in declaration order
    ///
    /// Streaming methods (client, server or both) are left out.
    pub fn build_table(service: &ServiceDescriptor) -> Vec<String> {
        service
            .methods
            .iter()
            .filter(|m| m.is_unary())
            .map(|m| m.name.clone())
            .collect()
    }

    /// Full dispatch descriptor for a service
    pub fn build(service: &ServiceDescriptor, ident: &Identifier) -> DispatchTable {
        DispatchTable {
            service_name: service.name.clone(),
            desc_var: format!("_{}_serviceDesc", ident),
            methods: Self::build_table(service),
        }
    }
}

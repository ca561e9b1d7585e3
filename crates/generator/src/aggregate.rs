//! Per-package umbrella client sharing one connection
//!
//! The aggregate bundles one client per service of a package. Its
//! constructor opens a single connection scoped to the package and fans it
//! out to every service client; when opening or starting the connection
//! fails, the error is returned and no aggregate is built.

use carno_codegen_common::{GeneratorError, GoPackage, PackageGroup, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use crate::resolver::{Identifier, NameResolver};
use crate::stub::stream_handle_name;

/// Package-level names emitted next to the aggregate
const PACKAGE_LEVEL_NAMES: &[&str] = &["ServerName", "InitCarno"];

/// Umbrella type of one package
#[derive(Debug, Clone, Serialize)]
pub struct AggregateBinding {
    /// Raw proto package; also the connection scope
    pub package: String,
    pub ident: Identifier,
    /// `New<Package>`
    pub constructor: String,
    pub go_package: GoPackage,
    /// One field per service, in group order
    pub fields: Vec<AggregateField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateField {
    /// `<Service>Client`
    pub name: String,
    /// Client interface type, same spelling as the field name
    pub interface: String,
    /// Unexported client struct built on the shared connection
    pub implementation: String,
    /// Spaces aligning the column after the field name
    pub pad: String,
}

pub struct PackageAggregator;

impl PackageAggregator {
    /// Build the aggregate of a package group
    ///
    /// `declared_types` holds the message and enum type names already
    /// declared in the target Go package. Fails when the package is empty,
    /// when its services span several Go packages, or when identifiers
    /// collide.
    pub fn build(
        group: &PackageGroup,
        resolver: &NameResolver,
        declared_types: &HashSet<String>,
    ) -> Result<AggregateBinding> {
        if group.package.is_empty() {
            return Err(GeneratorError::Configuration(
                "cannot aggregate services without a package".to_string(),
            ));
        }
        let first = group.services.first().ok_or_else(|| {
            GeneratorError::Configuration(format!("package {} has no services", group.package))
        })?;

        if let Some(other) = group
            .services
            .iter()
            .find(|s| s.go_package.import_path != first.go_package.import_path)
        {
            return Err(GeneratorError::Configuration(format!(
                "package {} spans Go packages {:?} ({}) and {:?} ({})",
                group.package,
                first.go_package.import_path,
                first.file,
                other.go_package.import_path,
                other.file
            )));
        }

        let ident = resolver.resolve_package(&group.package);
        let mut generated: HashSet<String> =
            PACKAGE_LEVEL_NAMES.iter().map(|s| s.to_string()).collect();
        let mut service_idents = HashSet::new();
        let mut fields = Vec::with_capacity(group.services.len());

        for grouped in &group.services {
            let service = &grouped.service;
            let service_ident = resolver.resolve(&service.name, true);
            if !service_idents.insert(service_ident.clone()) {
                return Err(GeneratorError::NameCollision(format!(
                    "service {} ({}) resolves to {}, already used in package {}",
                    service.name, grouped.file, service_ident, group.package
                )));
            }

            generated.insert(format!("{}Client", service_ident));
            generated.insert(format!("{}Server", service_ident));
            for method in service.methods.iter().filter(|m| !m.is_unary()) {
                let method_ident = resolver.resolve(&method.name, true);
                generated.insert(stream_handle_name(&service_ident, &method_ident, "Client"));
                generated.insert(stream_handle_name(&service_ident, &method_ident, "Server"));
            }

            fields.push(AggregateField {
                name: format!("{}Client", service_ident),
                interface: format!("{}Client", service_ident),
                implementation: format!("{}Client", resolver.resolve(&service.name, false)),
                pad: String::new(),
            });
        }

        if declared_types.contains(ident.as_str()) {
            return Err(GeneratorError::NameCollision(format!(
                "aggregate {} of package {} collides with a message or enum of the same name",
                ident, group.package
            )));
        }
        if generated.contains(ident.as_str()) {
            return Err(GeneratorError::NameCollision(format!(
                "aggregate {} of package {} collides with a generated identifier",
                ident, group.package
            )));
        }

        let width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
        for field in &mut fields {
            field.pad = " ".repeat(width - field.name.len());
        }

        Ok(AggregateBinding {
            package: group.package.clone(),
            constructor: format!("New{}", ident),
            ident,
            go_package: first.go_package.clone(),
            fields,
        })
    }
}

/// One-shot execution gate keyed by package name
///
/// The first call for a package runs its closure and stores the artifact;
/// every later call, from any thread, gets the stored artifact back without
/// running its own closure. Callers racing on the same package block until
/// the first run has finished.
#[derive(Debug)]
pub struct AggregateGate<T> {
    cells: Mutex<HashMap<String, Arc<OnceLock<Arc<T>>>>>,
}

impl<T> Default for AggregateGate<T> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> AggregateGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifact of `package`, produced by `emit` on the first call only
    ///
    /// The flag is `true` when this call executed `emit`.
    pub fn get_or_emit<F>(&self, package: &str, emit: F) -> (Arc<T>, bool)
    where
        F: FnOnce() -> T,
    {
        // The map lock is released before `emit` runs so other packages
        // proceed in parallel.
        let cell = self
            .cells
            .lock()
            .entry(package.to_string())
            .or_default()
            .clone();

        let mut ran = false;
        let artifact = cell.get_or_init(|| {
            ran = true;
            Arc::new(emit())
        });
        (Arc::clone(artifact), ran)
    }
}

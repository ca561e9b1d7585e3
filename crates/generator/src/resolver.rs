//! Identifier resolution for packages, services and methods

use carno_codegen_common::naming::{camel_case, unexport};
use carno_codegen_common::ReservedNameSet;
use serde::Serialize;
use std::fmt;

/// Suffix appended to identifiers found in the reserved set
pub const RESERVED_SUFFIX: &str = "_";

/// A code-safe Go identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turns raw schema names into Go identifiers
///
/// Resolution is a pure function of the raw name, the exported flag and the
/// reserved set handed in at construction.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    reserved: ReservedNameSet,
}

impl NameResolver {
    pub fn new(reserved: ReservedNameSet) -> Self {
        Self { reserved }
    }

    /// Resolve a raw name
    ///
    /// The exported form is CamelCase with `_` appended when it is reserved;
    /// the unexported form lower-cases the first character of that.
    pub fn resolve(&self, raw: &str, exported: bool) -> Identifier {
        let mut ident = camel_case(raw);
        if self.reserved.contains(&ident) {
            ident.push_str(RESERVED_SUFFIX);
        }
        if !exported {
            ident = unexport(&ident);
        }
        Identifier(ident)
    }

    /// Resolve a dotted proto package, e.g. `acme.billing` -> `AcmeBilling`
    pub fn resolve_package(&self, package: &str) -> Identifier {
        self.resolve(&package.replace('.', "_"), true)
    }
}

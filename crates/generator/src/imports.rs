//! Import tracking for generated Go files

use carno_codegen_common::naming::GO_KEYWORDS;
use carno_codegen_common::{GeneratorConfig, GoPackage, TypeRef};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Alias of the `context` standard package
pub const CONTEXT_ALIAS: &str = "context";
/// Alias of the carno root package
pub const CARNO_ALIAS: &str = "carno";
/// Alias of the carno client package
pub const CLIENT_ALIAS: &str = "client";
/// Alias of the carno server dispatch package
pub const MUX_ALIAS: &str = "mux";

/// Names used as locals or parameters in generated bodies
const LOCAL_NAMES: &[&str] = &["c", "cc", "ctx", "err", "in", "opts", "out", "srv"];

/// One entry of a Go import block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoImport {
    pub alias: String,
    pub path: String,
}

/// Imports of one generated file
///
/// Runtime imports are fixed. Message packages are added on first use and
/// receive an alias derived from their Go package name, numbered when it is
/// already taken.
#[derive(Debug, Clone)]
pub struct ImportSet {
    local_import_path: String,
    runtime: Vec<GoImport>,
    /// import path -> alias
    messages: BTreeMap<String, String>,
    taken: HashSet<String>,
}

impl ImportSet {
    /// Imports for a service file generated into `local`
    pub fn new(local: &GoPackage, config: &GeneratorConfig) -> Self {
        let runtime = vec![
            GoImport {
                alias: CARNO_ALIAS.to_string(),
                path: config.runtime_import_path.clone(),
            },
            GoImport {
                alias: CLIENT_ALIAS.to_string(),
                path: config.client_import_path(),
            },
            GoImport {
                alias: MUX_ALIAS.to_string(),
                path: config.mux_import_path(),
            },
        ];

        let taken = [CONTEXT_ALIAS, CARNO_ALIAS, CLIENT_ALIAS, MUX_ALIAS]
            .iter()
            .chain(LOCAL_NAMES)
            .chain(GO_KEYWORDS)
            .map(|s| s.to_string())
            .collect();

        Self {
            local_import_path: local.import_path.clone(),
            runtime,
            messages: BTreeMap::new(),
            taken,
        }
    }

    /// Go expression naming a message type, qualified when it lives elsewhere
    pub fn qualify(&mut self, ty: &TypeRef) -> String {
        if ty.go_package.import_path == self.local_import_path {
            return ty.go_name.clone();
        }

        if let Some(alias) = self.messages.get(&ty.go_package.import_path) {
            return format!("{}.{}", alias, ty.go_name);
        }

        let alias = self.fresh_alias(&ty.go_package.name);
        tracing::debug!(path = %ty.go_package.import_path, alias = %alias, "recorded message import");
        self.messages
            .insert(ty.go_package.import_path.clone(), alias.clone());
        format!("{}.{}", alias, ty.go_name)
    }

    fn fresh_alias(&mut self, base: &str) -> String {
        let mut alias = base.to_string();
        let mut n = 1;
        while self.taken.contains(&alias) {
            alias = format!("{}{}", base, n);
            n += 1;
        }
        self.taken.insert(alias.clone());
        alias
    }

    /// Standard library imports
    pub fn std_imports(&self) -> Vec<GoImport> {
        vec![GoImport {
            alias: CONTEXT_ALIAS.to_string(),
            path: "context".to_string(),
        }]
    }

    /// Runtime imports followed by message imports sorted by path
    pub fn imports(&self) -> Vec<GoImport> {
        self.runtime
            .iter()
            .cloned()
            .chain(self.messages.iter().map(|(path, alias)| GoImport {
                alias: alias.clone(),
                path: path.clone(),
            }))
            .collect()
    }
}

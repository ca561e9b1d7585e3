//! Common types and utilities for protoc-gen-carno
//!
//! This crate contains the descriptor model shared by the parser and the
//! generator, the error taxonomy, generator configuration and the naming
//! helpers used to turn protobuf names into Go identifiers.

pub mod config;
pub mod naming;

pub use config::{GeneratorConfig, PathsMode, ReservedNameSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version of the generated code.
///
/// Incremented whenever an incompatibility between the generated code and
/// the carno runtime is introduced. Every generated file references the
/// constant `carno.SupportPackageIsVersionN` where N is this value.
pub const GENERATED_CODE_VERSION: u32 = 4;

/// Errors that can occur during binding generation
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Structurally invalid input, e.g. a file with services but no package
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Two generated identifiers resolve to the same name
    #[error("Name collision: {0}")]
    NameCollision(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Go package a proto file is generated into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoPackage {
    /// Import path, e.g. `github.com/acme/api/demo`
    pub import_path: String,
    /// Package clause name, e.g. `demo`
    pub name: String,
}

/// Resolved reference to a message type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Fully qualified proto name with leading dot, e.g. `.demo.Input`
    pub proto_name: String,
    /// Go type name, nested messages joined with `_`
    pub go_name: String,
    /// Go package the type is generated into
    pub go_package: GoPackage,
}

/// A single RPC method of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub input_type: TypeRef,
    pub output_type: TypeRef,
    pub client_streaming: bool,
    pub server_streaming: bool,
    /// Leading comment lines, without the `//` marker
    #[serde(default)]
    pub comments: Vec<String>,
}

impl MethodDescriptor {
    /// Neither side streams: one request, one response
    pub fn is_unary(&self) -> bool {
        !self.client_streaming && !self.server_streaming
    }
}

/// A named collection of methods forming one RPC interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Declaration order is significant
    pub methods: Vec<MethodDescriptor>,
    #[serde(default)]
    pub comments: Vec<String>,
}

/// One parsed `.proto` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoFile {
    /// Path relative to the include root, e.g. `demo/echo.proto`
    pub name: String,
    /// Proto package, possibly empty
    pub package: String,
    pub go_package: GoPackage,
    pub services: Vec<ServiceDescriptor>,
    /// Go type names declared by the file's messages and enums, nested ones
    /// included
    #[serde(default)]
    pub go_types: Vec<String>,
}

/// Parsed generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedRequest {
    /// Every file in the request, dependencies included, in request order
    pub files: Vec<ProtoFile>,
    /// Names of the files the host asked to generate, in request order
    pub files_to_generate: Vec<String>,
    /// Raw plugin parameter string, if any
    pub parameter: Option<String>,
}

impl ParsedRequest {
    /// Files to generate, in the order the host listed them
    pub fn generate_targets(&self) -> impl Iterator<Item = &ProtoFile> {
        self.files_to_generate
            .iter()
            .filter_map(|name| self.files.iter().find(|f| &f.name == name))
    }
}

/// All services of one proto package, gathered across files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageGroup {
    pub package: String,
    /// Services in first-seen order
    pub services: Vec<GroupedService>,
}

/// A service together with the file that declared it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedService {
    pub file: String,
    pub go_package: GoPackage,
    pub service: ServiceDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_ref(name: &str) -> TypeRef {
        TypeRef {
            proto_name: format!(".demo.{}", name),
            go_name: name.to_string(),
            go_package: GoPackage {
                import_path: "example.com/demo".to_string(),
                name: "demo".to_string(),
            },
        }
    }

    #[test]
    fn test_unary_detection() {
        let mut method = MethodDescriptor {
            name: "Say".to_string(),
            input_type: type_ref("Input"),
            output_type: type_ref("Output"),
            client_streaming: false,
            server_streaming: false,
            comments: vec![],
        };
        assert!(method.is_unary());

        method.server_streaming = true;
        assert!(!method.is_unary());

        method.server_streaming = false;
        method.client_streaming = true;
        assert!(!method.is_unary());
    }

    #[test]
    fn test_generate_targets_follow_request_order() {
        let file = |name: &str| ProtoFile {
            name: name.to_string(),
            package: "demo".to_string(),
            go_package: type_ref("X").go_package,
            services: vec![],
            go_types: vec![],
        };
        let request = ParsedRequest {
            files: vec![file("a.proto"), file("b.proto"), file("dep.proto")],
            files_to_generate: vec!["b.proto".to_string(), "a.proto".to_string()],
            parameter: None,
        };

        let names: Vec<&str> = request
            .generate_targets()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["b.proto", "a.proto"]);
    }
}

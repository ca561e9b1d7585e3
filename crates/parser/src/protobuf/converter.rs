//! Converts protobuf descriptors to the generator's descriptor model

use carno_codegen_common::naming::{camel_case_path, go_package_name};
use carno_codegen_common::{
    GoPackage, MethodDescriptor, ParsedRequest, ProtoFile, Result, ServiceDescriptor, TypeRef,
};
use prost_reflect::{DescriptorPool, EnumDescriptor, FileDescriptor, MessageDescriptor};
use prost_types::FileDescriptorProto;
use std::collections::HashMap;
use std::path::Path;

/// Field number of `FileDescriptorProto.service`
const FILE_SERVICE_FIELD: i32 = 6;
/// Field number of `ServiceDescriptorProto.method`
const SERVICE_METHOD_FIELD: i32 = 2;

/// Convert every file of a descriptor pool
pub fn convert_pool(
    pool: &DescriptorPool,
    files_to_generate: &[String],
    parameter: Option<String>,
) -> Result<ParsedRequest> {
    let mut go_packages = GoPackageCache::default();
    let files = pool
        .files()
        .map(|file| convert_file(&file, &mut go_packages))
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedRequest {
        files,
        files_to_generate: files_to_generate.to_vec(),
        parameter,
    })
}

/// Resolve the Go package of a proto file
///
/// Honours `option go_package = "path;name"` and `option go_package = "path"`.
/// Without the option the package is derived from the proto package, and the
/// import path from the file's directory.
pub fn resolve_go_package(proto: &FileDescriptorProto) -> GoPackage {
    let file_name = proto.name();
    let option = proto
        .options
        .as_ref()
        .and_then(|o| o.go_package.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let Some(option) = option {
        let (import_path, name) = match option.split_once(';') {
            Some((path, name)) => (path.to_string(), go_package_name(name)),
            None => {
                let last = option.rsplit('/').next().unwrap_or(option);
                (option.to_string(), go_package_name(last))
            }
        };
        return GoPackage { import_path, name };
    }

    let import_path = Path::new(file_name)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = if !proto.package().is_empty() {
        go_package_name(proto.package())
    } else {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        go_package_name(&stem)
    };

    GoPackage { import_path, name }
}

#[derive(Default)]
struct GoPackageCache(HashMap<String, GoPackage>);

impl GoPackageCache {
    fn get(&mut self, file: &FileDescriptor) -> GoPackage {
        self.0
            .entry(file.name().to_string())
            .or_insert_with(|| resolve_go_package(file.file_descriptor_proto()))
            .clone()
    }
}

fn convert_file(file: &FileDescriptor, go_packages: &mut GoPackageCache) -> Result<ProtoFile> {
    let proto = file.file_descriptor_proto();

    let services = file
        .services()
        .enumerate()
        .map(|(service_index, service)| {
            let service_path = [FILE_SERVICE_FIELD, service_index as i32];

            let methods = service
                .methods()
                .enumerate()
                .map(|(method_index, method)| MethodDescriptor {
                    name: method.name().to_string(),
                    input_type: type_ref(&method.input(), go_packages),
                    output_type: type_ref(&method.output(), go_packages),
                    client_streaming: method.is_client_streaming(),
                    server_streaming: method.is_server_streaming(),
                    comments: leading_comments(
                        proto,
                        &[
                            service_path[0],
                            service_path[1],
                            SERVICE_METHOD_FIELD,
                            method_index as i32,
                        ],
                    ),
                })
                .collect();

            ServiceDescriptor {
                name: service.name().to_string(),
                methods,
                comments: leading_comments(proto, &service_path),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        file = file.name(),
        package = file.package_name(),
        services = services.len(),
        "converted proto file"
    );

    Ok(ProtoFile {
        name: file.name().to_string(),
        package: file.package_name().to_string(),
        go_package: go_packages.get(file),
        services,
        go_types: declared_go_types(file),
    })
}

/// Go type names of every message and enum declared in a file
///
/// Map entry messages have no Go type and are skipped.
fn declared_go_types(file: &FileDescriptor) -> Vec<String> {
    fn push_message(message: &MessageDescriptor, names: &mut Vec<String>) {
        if message.is_map_entry() {
            return;
        }
        names.push(go_type_name(message.full_name(), message.package_name()));
        names.extend(message.child_enums().map(|e| enum_type_name(&e)));
        for child in message.child_messages() {
            push_message(&child, names);
        }
    }

    let mut names: Vec<String> = file.enums().map(|e| enum_type_name(&e)).collect();
    for message in file.messages() {
        push_message(&message, &mut names);
    }
    names
}

fn enum_type_name(e: &EnumDescriptor) -> String {
    go_type_name(e.full_name(), e.package_name())
}

/// `demo.Outer.Inner` in package `demo` becomes `Outer_Inner`
fn go_type_name(full_name: &str, package: &str) -> String {
    let relative = if package.is_empty() {
        full_name
    } else {
        full_name
            .strip_prefix(package)
            .map(|rest| rest.trim_start_matches('.'))
            .unwrap_or(full_name)
    };
    camel_case_path(relative)
}

/// Resolve a message to its Go location
fn type_ref(message: &MessageDescriptor, go_packages: &mut GoPackageCache) -> TypeRef {
    TypeRef {
        proto_name: format!(".{}", message.full_name()),
        go_name: go_type_name(message.full_name(), message.package_name()),
        go_package: go_packages.get(&message.parent_file()),
    }
}

/// Leading comment lines attached to a descriptor path
fn leading_comments(proto: &FileDescriptorProto, path: &[i32]) -> Vec<String> {
    proto
        .source_code_info
        .as_ref()
        .and_then(|info| info.location.iter().find(|loc| loc.path == path))
        .and_then(|loc| loc.leading_comments.as_deref())
        .map(|comments| {
            comments
                .trim_end_matches('\n')
                .split('\n')
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::source_code_info::Location;
    use prost_types::{FileOptions, SourceCodeInfo};

    fn file(name: &str, package: &str, go_package: Option<&str>) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            options: go_package.map(|g| FileOptions {
                go_package: Some(g.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_go_package_with_explicit_name() {
        let go = resolve_go_package(&file(
            "demo/echo.proto",
            "demo",
            Some("example.com/api/demo;demopb"),
        ));
        assert_eq!(go.import_path, "example.com/api/demo");
        assert_eq!(go.name, "demopb");
    }

    #[test]
    fn test_go_package_from_import_path() {
        let go = resolve_go_package(&file(
            "demo/echo.proto",
            "demo",
            Some("example.com/api/echo-v1"),
        ));
        assert_eq!(go.import_path, "example.com/api/echo-v1");
        assert_eq!(go.name, "echo_v1");
    }

    #[test]
    fn test_go_package_fallback() {
        let go = resolve_go_package(&file("acme/rpc/echo.proto", "acme.rpc", None));
        assert_eq!(go.import_path, "acme/rpc");
        assert_eq!(go.name, "acme_rpc");

        let go = resolve_go_package(&file("echo.proto", "", None));
        assert_eq!(go.import_path, "");
        assert_eq!(go.name, "echo");
    }

    #[test]
    fn test_go_package_keyword_name() {
        let go = resolve_go_package(&file(
            "api/type/kind.proto",
            "api.type",
            Some("example.com/api/type"),
        ));
        assert_eq!(go.import_path, "example.com/api/type");
        assert_eq!(go.name, "type_");

        let go = resolve_go_package(&file("type/kind.proto", "type", None));
        assert_eq!(go.name, "type_");
    }

    #[test]
    fn test_leading_comments() {
        let mut proto = file("echo.proto", "demo", None);
        proto.source_code_info = Some(SourceCodeInfo {
            location: vec![Location {
                path: vec![6, 0, 2, 1],
                leading_comments: Some(" Say something.\n Twice.\n".to_string()),
                ..Default::default()
            }],
        });

        assert_eq!(
            leading_comments(&proto, &[6, 0, 2, 1]),
            vec![" Say something.".to_string(), " Twice.".to_string()]
        );
        assert!(leading_comments(&proto, &[6, 0]).is_empty());
    }
}

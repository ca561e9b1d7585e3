//! Integration test for the Protobuf parser

use carno_codegen_parser::{parse_code_generator_request, ProtobufParser};
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FileDescriptorProto,
    FileDescriptorSet, FileOptions, MethodDescriptorProto, ServiceDescriptorProto,
    SourceCodeInfo,
};

/// Shared message types living in their own Go package
fn create_common_types() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("common/types.proto".to_string()),
        package: Some("common".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Empty".to_string()),
            ..Default::default()
        }],
        options: Some(FileOptions {
            go_package: Some("example.com/api/common;commonpb".to_string()),
            ..Default::default()
        }),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// Echo service with a unary, a server-streaming and a cross-file method
fn create_echo_service() -> FileDescriptorProto {
    let input = DescriptorProto {
        name: Some("Input".to_string()),
        nested_type: vec![DescriptorProto {
            name: Some("meta_data".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let output = DescriptorProto {
        name: Some("Output".to_string()),
        ..Default::default()
    };

    let echo_service = ServiceDescriptorProto {
        name: Some("Echo".to_string()),
        method: vec![
            MethodDescriptorProto {
                name: Some("Say".to_string()),
                input_type: Some(".demo.Input".to_string()),
                output_type: Some(".demo.Output".to_string()),
                ..Default::default()
            },
            MethodDescriptorProto {
                name: Some("Watch".to_string()),
                input_type: Some(".demo.Input.meta_data".to_string()),
                output_type: Some(".demo.Output".to_string()),
                server_streaming: Some(true),
                ..Default::default()
            },
            MethodDescriptorProto {
                name: Some("Ping".to_string()),
                input_type: Some(".common.Empty".to_string()),
                output_type: Some(".common.Empty".to_string()),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("demo/echo.proto".to_string()),
        package: Some("demo".to_string()),
        dependency: vec!["common/types.proto".to_string()],
        message_type: vec![input, output],
        service: vec![echo_service],
        options: Some(FileOptions {
            go_package: Some("example.com/api/demo".to_string()),
            ..Default::default()
        }),
        source_code_info: Some(SourceCodeInfo {
            location: vec![
                Location {
                    path: vec![6, 0],
                    leading_comments: Some(" Echo repeats what it hears.\n".to_string()),
                    ..Default::default()
                },
                Location {
                    path: vec![6, 0, 2, 1],
                    leading_comments: Some(" Watch streams echoes.\n".to_string()),
                    ..Default::default()
                },
            ],
        }),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_parse_code_generator_request() {
    let request = CodeGeneratorRequest {
        file_to_generate: vec!["demo/echo.proto".to_string()],
        parameter: Some("paths=source_relative".to_string()),
        proto_file: vec![create_common_types(), create_echo_service()],
        ..Default::default()
    };

    let parsed = parse_code_generator_request(&request.encode_to_vec()).unwrap();

    assert_eq!(parsed.files.len(), 2);
    assert_eq!(parsed.files_to_generate, vec!["demo/echo.proto"]);
    assert_eq!(parsed.parameter.as_deref(), Some("paths=source_relative"));

    let targets: Vec<_> = parsed.generate_targets().collect();
    assert_eq!(targets.len(), 1);
    let echo_file = targets[0];
    assert_eq!(echo_file.package, "demo");
    assert_eq!(echo_file.go_package.import_path, "example.com/api/demo");
    assert_eq!(echo_file.go_package.name, "demo");

    let service = &echo_file.services[0];
    assert_eq!(service.name, "Echo");
    assert_eq!(service.comments, vec![" Echo repeats what it hears."]);

    let names: Vec<&str> = service.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Say", "Watch", "Ping"], "declaration order kept");

    let say = &service.methods[0];
    assert!(say.is_unary());
    assert_eq!(say.input_type.proto_name, ".demo.Input");
    assert_eq!(say.input_type.go_name, "Input");
    assert!(say.comments.is_empty());

    let watch = &service.methods[1];
    assert!(watch.server_streaming);
    assert!(!watch.client_streaming);
    assert_eq!(watch.input_type.go_name, "Input_MetaData");
    assert_eq!(watch.comments, vec![" Watch streams echoes."]);

    let ping = &service.methods[2];
    assert_eq!(ping.input_type.go_name, "Empty");
    assert_eq!(
        ping.input_type.go_package.import_path,
        "example.com/api/common"
    );
    assert_eq!(ping.input_type.go_package.name, "commonpb");
}

#[test]
fn test_parse_descriptor_set_marks_all_files() {
    let set = FileDescriptorSet {
        file: vec![create_common_types(), create_echo_service()],
    };

    let parser = ProtobufParser::from_file_descriptor_set(&set.encode_to_vec()).unwrap();
    let parsed = parser.parse().unwrap();
    assert_eq!(
        parsed.files_to_generate,
        vec!["common/types.proto", "demo/echo.proto"]
    );

    let narrowed = ProtobufParser::from_file_descriptor_set(&set.encode_to_vec())
        .unwrap()
        .with_files_to_generate(vec!["demo/echo.proto".to_string()])
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(narrowed.files_to_generate, vec!["demo/echo.proto"]);
}

fn enumeration(name: &str, zero: &str) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: vec![EnumValueDescriptorProto {
            name: Some(zero.to_string()),
            number: Some(0),
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[test]
fn test_declared_go_types_are_collected() {
    let mut echo = create_echo_service();
    echo.enum_type.push(enumeration("Mode", "MODE_UNSPECIFIED"));
    echo.message_type[1]
        .enum_type
        .push(enumeration("status_code", "STATUS_CODE_UNSPECIFIED"));

    let set = FileDescriptorSet {
        file: vec![create_common_types(), echo],
    };
    let parsed = ProtobufParser::from_file_descriptor_set(&set.encode_to_vec())
        .unwrap()
        .parse()
        .unwrap();

    let common = &parsed.files[0];
    assert_eq!(common.go_types, vec!["Empty"]);

    let echo = &parsed.files[1];
    assert_eq!(
        echo.go_types,
        vec!["Mode", "Input", "Input_MetaData", "Output", "Output_StatusCode"]
    );
}

#[test]
fn test_unresolved_type_is_rejected() {
    let mut broken = create_echo_service();
    broken.dependency.clear();

    let set = FileDescriptorSet { file: vec![broken] };
    let result = ProtobufParser::from_file_descriptor_set(&set.encode_to_vec());
    assert!(result.is_err(), "missing .common.Empty must fail the pool");
}

#[test]
fn test_read_descriptor_set_from_file() {
    let set = FileDescriptorSet {
        file: vec![create_common_types(), create_echo_service()],
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("api.pb");
    std::fs::write(&path, set.encode_to_vec()).unwrap();

    let parsed = ProtobufParser::from_file(&path).unwrap().parse().unwrap();
    assert_eq!(parsed.files.len(), 2);

    assert!(ProtobufParser::from_file(dir.path().join("missing.pb")).is_err());
}

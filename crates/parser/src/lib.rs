//! Descriptor parsing for protoc-gen-carno
//!
//! This crate decodes protoc's output into the intermediate representation
//! (`ParsedRequest`) consumed by the generator.
//!
//! ## Parsing Strategy
//!
//! - every file is loaded into a descriptor pool so cross-file message
//!   references are validated up front
//! - each message reference is resolved to the Go package and Go type name it
//!   will be generated as, honouring the file's `go_package` option
//! - leading comments for services and methods are lifted from
//!   `source_code_info` when protoc provided it

mod protobuf;

pub use protobuf::{resolve_go_package, ProtobufParser};

use carno_codegen_common::{ParsedRequest, Result};

/// Parse a serialized `CodeGeneratorRequest`
///
/// # Arguments
/// * `bytes` - the request exactly as protoc wrote it to stdin
///
/// # Returns
/// * `ParsedRequest` - descriptor model of every file in the request
pub fn parse_code_generator_request(bytes: &[u8]) -> Result<ParsedRequest> {
    ProtobufParser::from_code_generator_request(bytes)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_garbage_request() {
        let result = parse_code_generator_request(&[0xff, 0xff, 0xff]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_empty_request() {
        let request = parse_code_generator_request(&[]).unwrap();
        assert!(request.files.is_empty());
        assert!(request.files_to_generate.is_empty());
    }
}

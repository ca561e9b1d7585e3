//! Protobuf request and descriptor set loading

use carno_codegen_common::{GeneratorError, ParsedRequest, Result};
use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::FileDescriptorSet;
use std::fs;
use std::path::Path;

/// Protobuf descriptor parser
///
/// Holds a validated descriptor pool plus the list of files the host wants
/// generated.
pub struct ProtobufParser {
    /// Descriptor pool for reflection
    pool: DescriptorPool,

    /// Files to generate, in host order
    files_to_generate: Vec<String>,

    /// Plugin parameter string
    parameter: Option<String>,
}

impl ProtobufParser {
    /// Load a FileDescriptorSet from a binary file
    ///
    /// # Example
    /// ```rust,ignore
    /// let parser = ProtobufParser::from_file("api.pb")?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref()).map_err(|e| {
            GeneratorError::Parse(format!(
                "Failed to read FileDescriptorSet file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_file_descriptor_set(&bytes)
    }

    /// Parse a FileDescriptorSet from bytes
    ///
    /// Every file in the set is marked for generation; narrow the list with
    /// [`ProtobufParser::with_files_to_generate`].
    pub fn from_file_descriptor_set(bytes: &[u8]) -> Result<Self> {
        let file_descriptor_set = FileDescriptorSet::decode(bytes).map_err(|e| {
            GeneratorError::Parse(format!("Failed to decode FileDescriptorSet: {}", e))
        })?;

        let files_to_generate = file_descriptor_set
            .file
            .iter()
            .filter_map(|f| f.name.clone())
            .collect();

        Ok(Self {
            pool: build_pool(file_descriptor_set)?,
            files_to_generate,
            parameter: None,
        })
    }

    /// Parse a CodeGeneratorRequest from bytes
    pub fn from_code_generator_request(bytes: &[u8]) -> Result<Self> {
        let request = CodeGeneratorRequest::decode(bytes).map_err(|e| {
            GeneratorError::Parse(format!("Failed to decode CodeGeneratorRequest: {}", e))
        })?;

        Self::from_request(request)
    }

    /// Build a parser from an already decoded CodeGeneratorRequest
    pub fn from_request(request: CodeGeneratorRequest) -> Result<Self> {
        tracing::debug!(
            files = request.proto_file.len(),
            targets = request.file_to_generate.len(),
            "decoded code generator request"
        );

        let pool = build_pool(FileDescriptorSet {
            file: request.proto_file,
        })?;

        Ok(Self {
            pool,
            files_to_generate: request.file_to_generate,
            parameter: request.parameter,
        })
    }

    /// Restrict generation to the given files
    ///
    /// Fails if a name is not part of the loaded descriptors.
    pub fn with_files_to_generate(mut self, files: Vec<String>) -> Result<Self> {
        if let Some(missing) = files
            .iter()
            .find(|name| self.pool.get_file_by_name(name).is_none())
        {
            return Err(GeneratorError::Parse(format!(
                "File {} is not part of the descriptor set",
                missing
            )));
        }
        self.files_to_generate = files;
        Ok(self)
    }

    /// Convert the loaded descriptors into the generator's model
    pub fn parse(&self) -> Result<ParsedRequest> {
        super::converter::convert_pool(
            &self.pool,
            &self.files_to_generate,
            self.parameter.clone(),
        )
    }
}

fn build_pool(file_descriptor_set: FileDescriptorSet) -> Result<DescriptorPool> {
    DescriptorPool::from_file_descriptor_set(file_descriptor_set)
        .map_err(|e| GeneratorError::Parse(format!("Failed to create DescriptorPool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_descriptor_set() {
        let file_descriptor_set = FileDescriptorSet { file: vec![] };
        let bytes = file_descriptor_set.encode_to_vec();

        let parser = ProtobufParser::from_file_descriptor_set(&bytes).unwrap();
        assert!(parser.parse().unwrap().files.is_empty());
    }

    #[test]
    fn test_request_parameter_is_kept() {
        let request = CodeGeneratorRequest {
            parameter: Some("paths=source_relative".to_string()),
            ..Default::default()
        };

        let parser = ProtobufParser::from_request(request).unwrap();
        assert_eq!(
            parser.parse().unwrap().parameter.as_deref(),
            Some("paths=source_relative")
        );
    }

    #[test]
    fn test_unknown_file_to_generate() {
        let parser = ProtobufParser::from_request(CodeGeneratorRequest::default()).unwrap();
        let result = parser.with_files_to_generate(vec!["missing.proto".to_string()]);
        assert!(result.is_err());
    }
}

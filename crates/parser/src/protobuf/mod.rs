//! Protobuf descriptor parser
//!
//! Turns protoc output into the generator's descriptor model.
//!
//! ## Sources
//! - **CodeGeneratorRequest**: what protoc writes to a plugin's stdin
//! - **FileDescriptorSet**: `protoc --descriptor_set_out --include_imports`
//!
//! Both are loaded into a [`prost_reflect::DescriptorPool`], which validates
//! that every referenced message resolves, before conversion.
//!
//! ## Example
//! ```rust,ignore
//! use carno_codegen_parser::ProtobufParser;
//!
//! let parser = ProtobufParser::from_code_generator_request(&stdin_bytes)?;
//! let request = parser.parse()?;
//! ```

mod converter;
mod parser;

pub use converter::resolve_go_package;
pub use parser::ProtobufParser;

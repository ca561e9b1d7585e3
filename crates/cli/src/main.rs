//! protoc-gen-carno
//!
//! Protoc plugin generating Go bindings for the carno RPC runtime. Invoked
//! without a subcommand it speaks the plugin protocol: a
//! `CodeGeneratorRequest` on stdin, a `CodeGeneratorResponse` on stdout.

use anyhow::{Context, Result};
use carno_codegen_common::{GeneratorConfig, ParsedRequest};
use carno_codegen_generator::{
    CarnoGenerator, DescriptorCollector, GenerationOutput, NameResolver, RegistryBuilder,
};
use carno_codegen_parser::ProtobufParser;
use clap::{Parser, Subcommand};
use colored::*;
use prost::Message;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::CodeGeneratorResponse;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "protoc-gen-carno")]
#[command(version, about = "Generate carno Go bindings from protobuf service definitions", long_about = None)]
struct Cli {
    /// Without a subcommand, run as a protoc plugin
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate bindings from a FileDescriptorSet into a directory
    #[command(after_help = "EXAMPLES:\n  \
        # Build a descriptor set and generate from it\n  \
        protoc --include_imports -o demo.pb demo/echo.proto\n  \
        protoc-gen-carno generate --descriptor-set demo.pb --output ./gen\n\n  \
        # Only some files, next to their sources\n  \
        protoc-gen-carno generate \\\n    \
        --descriptor-set demo.pb \\\n    \
        --file demo/echo.proto \\\n    \
        --param paths=source_relative \\\n    \
        --output ./gen")]
    Generate {
        /// Serialized FileDescriptorSet
        #[arg(short, long)]
        descriptor_set: PathBuf,

        /// Files to generate (all files in the set if omitted)
        #[arg(short, long)]
        file: Vec<String>,

        /// Plugin parameter string, e.g. `paths=source_relative,reserved=Start`
        #[arg(short, long)]
        param: Option<String>,

        /// YAML configuration file; `--param` overrides its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "./gen")]
        output: PathBuf,
    },

    /// Show packages, services and dispatch tables of a FileDescriptorSet
    Inspect {
        /// Serialized FileDescriptorSet
        #[arg(short, long)]
        descriptor_set: PathBuf,

        /// Print the package groups as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        None => run_plugin()?,
        Some(Commands::Generate {
            descriptor_set,
            file,
            param,
            config,
            output,
        }) => {
            generate_command(GenerateOptions {
                descriptor_set: descriptor_set.as_path(),
                files: file,
                param: param.as_deref(),
                config: config.as_deref(),
                output: output.as_path(),
                verbose: cli.verbose,
            })?;
        }
        Some(Commands::Inspect {
            descriptor_set,
            json,
        }) => {
            inspect_command(descriptor_set.as_path(), json, cli.verbose)?;
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries the plugin response
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_plugin() -> Result<()> {
    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .context("Failed to read CodeGeneratorRequest from stdin")?;

    let response = plugin_response(&input);

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&response.encode_to_vec())
        .context("Failed to write CodeGeneratorResponse")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Build the plugin response for a raw request
///
/// Every problem is reported through the response's error field so the host
/// compiler can show it; files that were generated are listed regardless.
fn plugin_response(input: &[u8]) -> CodeGeneratorResponse {
    let mut response = CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    };

    let output = match plugin_generate(input) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(error = %e, "generation aborted");
            response.error = Some(format!("{:#}", e));
            return response;
        }
    };

    response.error = output.error_message();
    response.file = output
        .files
        .into_iter()
        .map(|f| File {
            name: Some(f.name),
            content: Some(f.content),
            ..Default::default()
        })
        .collect();
    response
}

fn plugin_generate(input: &[u8]) -> Result<GenerationOutput> {
    let parser = ProtobufParser::from_code_generator_request(input)
        .context("Failed to decode CodeGeneratorRequest")?;
    let request = parser.parse().context("Failed to convert descriptors")?;

    let config = GeneratorConfig::from_parameter(request.parameter.as_deref().unwrap_or(""))
        .context("Invalid plugin parameter")?;
    let generator = CarnoGenerator::new(config).context("Failed to create generator")?;
    Ok(generator.generate(&request))
}

struct GenerateOptions<'a> {
    descriptor_set: &'a Path,
    files: Vec<String>,
    param: Option<&'a str>,
    config: Option<&'a Path>,
    output: &'a Path,
    verbose: bool,
}

fn generate_command(options: GenerateOptions<'_>) -> Result<()> {
    println!(
        "{} Generating bindings from: {}",
        "→".cyan(),
        options.descriptor_set.display()
    );

    let mut config = match options.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(param) = options.param {
        config
            .apply_parameter(param)
            .context("Invalid --param value")?;
    }

    if options.verbose {
        println!("  Paths: {:?}", config.paths);
        println!("  Runtime: {}", config.runtime_import_path);
        println!("  Output: {}", options.output.display());
    }

    let request = load_descriptor_set(options.descriptor_set, options.files)?;
    println!(
        "{} Parsed {} files ({} to generate)",
        "✓".green(),
        request.files.len(),
        request.files_to_generate.len()
    );

    let generator = CarnoGenerator::new(config).context("Failed to create generator")?;
    let output = generator.generate(&request);
    output
        .write_to_directory(options.output)
        .context("Failed to write generated files")?;

    println!("\n{}", "Generated files:".bold());
    for file in &output.files {
        println!("  {}/{}", options.output.display(), file.name);
    }

    if let Some(message) = output.error_message() {
        println!("\n{}", "Failures:".red().bold());
        for line in message.lines() {
            println!("  {} {}", "✗".red(), line);
        }
        anyhow::bail!("{} target(s) failed", output.failures.len());
    }

    println!("\n{}", "✓ Generation complete!".green().bold());
    Ok(())
}

fn inspect_command(descriptor_set: &Path, json: bool, verbose: bool) -> Result<()> {
    let request = load_descriptor_set(descriptor_set, Vec::new())?;
    let targets: Vec<_> = request.generate_targets().collect();
    let collection = DescriptorCollector::collect(targets.iter().copied());

    if json {
        let rendered = serde_json::to_string_pretty(&collection.groups)
            .context("Failed to serialize package groups")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("{} Inspecting: {}", "→".cyan(), descriptor_set.display());
    let resolver = NameResolver::default();

    for group in &collection.groups {
        println!(
            "\n{} {} ({})",
            "Package".bold(),
            group.package.yellow(),
            resolver.resolve_package(&group.package)
        );
        for grouped in &group.services {
            let service = &grouped.service;
            println!(
                "  • {} [{}] -> {}",
                service.name.cyan(),
                grouped.file,
                grouped.go_package.import_path
            );
            for method in &service.methods {
                let kind = match (method.client_streaming, method.server_streaming) {
                    (false, false) => "unary",
                    (false, true) => "server streaming",
                    (true, false) => "client streaming",
                    (true, true) => "bidi streaming",
                };
                println!(
                    "    {}({}) -> {} {}",
                    method.name,
                    method.input_type.proto_name,
                    method.output_type.proto_name,
                    format!("[{}]", kind).dimmed()
                );
            }
            if verbose {
                println!(
                    "    dispatch: {:?}",
                    RegistryBuilder::build_table(service)
                );
            }
        }
    }

    for rejected in &collection.rejected {
        println!("\n{} {}: {}", "✗".red(), rejected.file, rejected.error);
    }

    Ok(())
}

fn load_descriptor_set(path: &Path, files: Vec<String>) -> Result<ParsedRequest> {
    let mut parser = ProtobufParser::from_file(path)
        .with_context(|| format!("Failed to load FileDescriptorSet {}", path.display()))?;
    if !files.is_empty() {
        parser = parser
            .with_files_to_generate(files)
            .context("Unknown --file")?;
    }
    parser
        .parse()
        .context("Failed to parse FileDescriptorSet")
}

//! Go binding generation for carno services
//!
//! This crate turns the parsed descriptor model into Go source: typed client
//! stubs, server contracts, per-service dispatch registries and one umbrella
//! client per proto package.
//!
//! Generation runs in two phases. Phase 1 emits one service file per input
//! file that declares services. Phase 2 emits one aggregate file per package,
//! strictly after every service of that package went through phase 1, each
//! package passing through a one-shot gate.

pub mod aggregate;
pub mod collector;
pub mod imports;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod stub;
mod templates;

pub use aggregate::{AggregateBinding, AggregateGate, PackageAggregator};
pub use collector::{Collection, DescriptorCollector};
pub use registry::{DispatchTable, RegistryBuilder};
pub use resolver::{Identifier, NameResolver};
pub use stub::{ServiceBinding, StubEmitter};

use carno_codegen_common::{
    GeneratorConfig, GeneratorError, GoPackage, PackageGroup, ParsedRequest, PathsMode,
    ProtoFile, Result,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use imports::ImportSet;
use render::{Renderer, ServiceFileView};

/// Suffix of generated service files
pub const SERVICE_FILE_SUFFIX: &str = ".carno.go";
/// Suffix of generated package aggregate files
pub const AGGREGATE_FILE_SUFFIX: &str = ".carno.pkg.go";

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Slash-separated path relative to the output root
    pub name: String,
    pub content: String,
}

/// A file or package that produced no output
#[derive(Debug)]
pub struct GenerationFailure {
    /// Proto file name, or `package <name>` for aggregate failures
    pub target: String,
    pub error: GeneratorError,
}

/// Result of one generation run
///
/// Failures are local: every file that could be generated is listed in
/// `files` even when other targets failed.
#[derive(Debug, Default)]
pub struct GenerationOutput {
    pub files: Vec<GeneratedFile>,
    pub failures: Vec<GenerationFailure>,
}

impl GenerationOutput {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// All failures joined into one message, one line per target
    pub fn error_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(
            self.failures
                .iter()
                .map(|f| format!("{}: {}", f.target, f.error))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Write every generated file below `output_dir`
    pub fn write_to_directory(&self, output_dir: &Path) -> Result<()> {
        fs::create_dir_all(output_dir).map_err(|e| {
            GeneratorError::Generation(format!("Failed to create output directory: {}", e))
        })?;

        for file in &self.files {
            let output_path = output_dir.join(&file.name);
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    GeneratorError::Generation(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            fs::write(&output_path, &file.content).map_err(|e| {
                GeneratorError::Generation(format!("Failed to write {}: {}", file.name, e))
            })?;
        }

        Ok(())
    }
}

/// Go binding generator
///
/// Built once per run from an explicit configuration. Generation is a pure
/// function of the request: the same request always yields byte-identical
/// output.
pub struct CarnoGenerator {
    config: GeneratorConfig,
    resolver: NameResolver,
    renderer: Renderer,
}

impl CarnoGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let resolver = NameResolver::new(config.reserved.clone());
        let renderer = Renderer::new()?;
        Ok(Self {
            config,
            resolver,
            renderer,
        })
    }

    /// Generate every file for the targets of `request`
    pub fn generate(&self, request: &ParsedRequest) -> GenerationOutput {
        let targets: Vec<&ProtoFile> = request.generate_targets().collect();
        let collection = DescriptorCollector::collect(targets.iter().copied());

        let mut output = GenerationOutput::default();
        let mut failed: HashSet<String> = HashSet::new();

        for rejected in collection.rejected {
            failed.insert(rejected.file.clone());
            output.failures.push(GenerationFailure {
                target: rejected.file,
                error: rejected.error,
            });
        }

        // Phase 1: service files
        for file in &targets {
            if file.services.is_empty() || failed.contains(&file.name) {
                continue;
            }

            match self.emit_service_file(file) {
                Ok(generated) => {
                    tracing::debug!(file = %file.name, output = %generated.name, "generated service file");
                    output.files.push(generated);
                }
                Err(error) => {
                    tracing::warn!(file = %file.name, error = %error, "skipping file");
                    failed.insert(file.name.clone());
                    output.failures.push(GenerationFailure {
                        target: file.name.clone(),
                        error,
                    });
                }
            }
        }

        // Phase 2: package aggregates
        let gate = AggregateGate::new();
        let mut claimed: HashMap<String, String> = HashMap::new();
        let declared_types = declared_types_by_go_package(&request.files);
        let no_types = HashSet::new();

        for group in &collection.groups {
            let group = PackageGroup {
                package: group.package.clone(),
                services: group
                    .services
                    .iter()
                    .filter(|s| !failed.contains(&s.file))
                    .cloned()
                    .collect(),
            };
            if group.services.is_empty() {
                continue;
            }

            let types = group
                .services
                .first()
                .and_then(|s| declared_types.get(&s.go_package.import_path))
                .unwrap_or(&no_types);

            gate.get_or_emit(&group.package, || {
                match self.emit_aggregate(&group, types, &mut claimed) {
                    Ok(generated) => {
                        tracing::debug!(package = %group.package, output = %generated.name, "generated package aggregate");
                        output.files.push(generated);
                    }
                    Err(error) => {
                        tracing::warn!(package = %group.package, error = %error, "skipping package aggregate");
                        output.failures.push(GenerationFailure {
                            target: format!("package {}", group.package),
                            error,
                        });
                    }
                }
            });
        }

        tracing::info!(
            files = output.files.len(),
            failures = output.failures.len(),
            "generation finished"
        );
        output
    }

    fn emit_service_file(&self, file: &ProtoFile) -> Result<GeneratedFile> {
        let mut imports = ImportSet::new(&file.go_package, &self.config);
        let mut emitter = StubEmitter::new(&self.resolver, &file.package, &mut imports);

        let mut seen = HashSet::new();
        let mut services = Vec::with_capacity(file.services.len());
        for service in &file.services {
            let binding = emitter.emit(service)?;
            if !seen.insert(binding.ident.clone()) {
                return Err(GeneratorError::NameCollision(format!(
                    "service {} in {} resolves to {}, already used in this file",
                    service.name, file.name, binding.ident
                )));
            }
            services.push(binding);
        }

        let content = self.renderer.render_service_file(&ServiceFileView {
            source: &file.name,
            go_package_name: &file.go_package.name,
            std_imports: imports.std_imports(),
            imports: imports.imports(),
            services: &services,
        })?;

        Ok(GeneratedFile {
            name: join_path(
                &self.output_dir(&file.name, &file.go_package),
                &format!("{}{}", file_stem(&file.name), SERVICE_FILE_SUFFIX),
            ),
            content,
        })
    }

    /// `claimed` maps Go import paths to the package whose aggregate owns them
    fn emit_aggregate(
        &self,
        group: &PackageGroup,
        declared_types: &HashSet<String>,
        claimed: &mut HashMap<String, String>,
    ) -> Result<GeneratedFile> {
        let aggregate = PackageAggregator::build(group, &self.resolver, declared_types)?;

        let import_path = &aggregate.go_package.import_path;
        if let Some(owner) = claimed.get(import_path) {
            return Err(GeneratorError::Configuration(format!(
                "packages {} and {} both generate into Go package {:?}",
                owner, group.package, import_path
            )));
        }
        claimed.insert(import_path.clone(), group.package.clone());

        let content = self.renderer.render_aggregate(&aggregate, &self.config)?;
        // Services of a group share one Go package, so the first file decides
        // the directory.
        let first_file = group
            .services
            .first()
            .map(|s| s.file.as_str())
            .unwrap_or_default();

        Ok(GeneratedFile {
            name: join_path(
                &self.output_dir(first_file, &aggregate.go_package),
                &format!(
                    "{}{}",
                    group.package.replace('.', "_"),
                    AGGREGATE_FILE_SUFFIX
                ),
            ),
            content,
        })
    }

    fn output_dir(&self, proto_name: &str, go_package: &GoPackage) -> String {
        match self.config.paths {
            PathsMode::Import => go_package.import_path.clone(),
            PathsMode::SourceRelative => proto_name
                .rsplit_once('/')
                .map(|(dir, _)| dir.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Message and enum type names of every file, keyed by Go import path
///
/// Dependencies count too: a file without services may still declare types
/// in the Go package an aggregate lands in.
fn declared_types_by_go_package(files: &[ProtoFile]) -> HashMap<String, HashSet<String>> {
    let mut declared: HashMap<String, HashSet<String>> = HashMap::new();
    for file in files {
        declared
            .entry(file.go_package.import_path.clone())
            .or_default()
            .extend(file.go_types.iter().cloned());
    }
    declared
}

/// File name without directory and `.proto` extension
fn file_stem(proto_name: &str) -> &str {
    let base = proto_name.rsplit('/').next().unwrap_or(proto_name);
    base.strip_suffix(".proto").unwrap_or(base)
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

//! Go source rendering of structured bindings

use carno_codegen_common::{GeneratorConfig, GeneratorError, Result, GENERATED_CODE_VERSION};
use tera::Tera;

use crate::aggregate::AggregateBinding;
use crate::imports::GoImport;
use crate::stub::ServiceBinding;
use crate::templates;

/// Everything rendered into one service file
#[derive(Debug)]
pub struct ServiceFileView<'a> {
    /// Proto file the services come from
    pub source: &'a str,
    pub go_package_name: &'a str,
    pub std_imports: Vec<GoImport>,
    pub imports: Vec<GoImport>,
    pub services: &'a [ServiceBinding],
}

/// Renders bindings with the bundled templates
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tera: templates::load_templates()?,
        })
    }

    /// Render the client and server code of one proto file
    pub fn render_service_file(&self, view: &ServiceFileView<'_>) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("source", view.source);
        context.insert("go_package_name", view.go_package_name);
        context.insert("version", &GENERATED_CODE_VERSION);
        context.insert("std_imports", &view.std_imports);
        context.insert("imports", &view.imports);
        context.insert("services", view.services);

        self.tera
            .render("service_file.go", &context)
            .map_err(|e| GeneratorError::Generation(format!("Template error: {:?}", e)))
    }

    /// Render the umbrella client and bootstrap helpers of one package
    pub fn render_aggregate(
        &self,
        aggregate: &AggregateBinding,
        config: &GeneratorConfig,
    ) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("aggregate", aggregate);
        context.insert("version", &GENERATED_CODE_VERSION);
        context.insert("runtime_import_path", &config.runtime_import_path);
        context.insert("client_import_path", &config.client_import_path());

        self.tera
            .render("aggregate_file.go", &context)
            .map_err(|e| GeneratorError::Generation(format!("Template error: {:?}", e)))
    }
}

//! Client stubs and server contracts for one service
//!
//! The emitter is a pure transform from a [`ServiceDescriptor`] to a
//! [`ServiceBinding`]: identifiers, Go signatures and stream-handle shapes.
//! Turning bindings into source text is the renderer's job.

use carno_codegen_common::{GeneratorError, MethodDescriptor, Result, ServiceDescriptor};
use serde::Serialize;
use std::collections::HashSet;

use crate::imports::{ImportSet, CLIENT_ALIAS, MUX_ALIAS};
use crate::registry::{DispatchTable, RegistryBuilder};
use crate::resolver::{Identifier, NameResolver};

/// Everything generated for one service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceBinding {
    pub raw_name: String,
    pub ident: Identifier,
    pub comments: Vec<String>,
    pub client_interface: ClientInterface,
    pub client_implementation: ClientImplementation,
    pub client_stream_handles: Vec<StreamHandle>,
    pub server_interface: ServerInterface,
    pub server_stream_handles: Vec<StreamHandle>,
    pub registry: DispatchTable,
    /// `Register<Service>Server`
    pub register_fn: String,
}

/// Client-facing interface, one method per declared method
#[derive(Debug, Clone, Serialize)]
pub struct ClientInterface {
    /// `<Service>Client`
    pub name: String,
    pub methods: Vec<ClientMethod>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientMethod {
    pub ident: Identifier,
    pub comments: Vec<String>,
    pub signature: String,
}

/// Unexported struct implementing the client interface
#[derive(Debug, Clone, Serialize)]
pub struct ClientImplementation {
    /// `<service>Client`
    pub struct_name: String,
    /// `New<Service>Client`
    pub constructor: String,
    /// Package name the connection is scoped to
    pub connection_scope: String,
    pub methods: Vec<ClientMethodBody>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientMethodBody {
    pub signature: String,
    pub raw_name: String,
    pub unary: bool,
    /// Response type allocated before the call, unary methods only
    pub output_type: Option<String>,
}

/// Capability contract a handler type must satisfy
#[derive(Debug, Clone, Serialize)]
pub struct ServerInterface {
    /// `<Service>Server`
    pub name: String,
    pub methods: Vec<ServerMethod>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerMethod {
    pub ident: Identifier,
    pub comments: Vec<String>,
    pub signature: String,
}

/// Per-method stream handle interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamHandle {
    /// `<Service>_<Method>Client` or `<Service>_<Method>Server`
    pub name: String,
    /// Interface members, one per line
    pub members: Vec<String>,
}

/// Emits stubs for the services of one file
pub struct StubEmitter<'a> {
    resolver: &'a NameResolver,
    package: &'a str,
    imports: &'a mut ImportSet,
}

impl<'a> StubEmitter<'a> {
    /// `package` is the proto package the client connections are scoped to
    pub fn new(resolver: &'a NameResolver, package: &'a str, imports: &'a mut ImportSet) -> Self {
        Self {
            resolver,
            package,
            imports,
        }
    }

    /// Build the complete binding of a service
    ///
    /// Fails with a name collision when two methods resolve to the same
    /// identifier.
    pub fn emit(&mut self, service: &ServiceDescriptor) -> Result<ServiceBinding> {
        let ident = self.resolver.resolve(&service.name, true);
        self.check_method_collisions(service)?;

        tracing::debug!(
            service = %service.name,
            methods = service.methods.len(),
            "emitting service stubs"
        );

        Ok(ServiceBinding {
            raw_name: service.name.clone(),
            comments: service.comments.clone(),
            client_interface: self.client_interface(service),
            client_implementation: self.client_implementation(service),
            client_stream_handles: self.client_stream_handles(service),
            server_interface: self.server_interface(service),
            server_stream_handles: self.server_stream_handles(service),
            registry: RegistryBuilder::build(service, &ident),
            register_fn: format!("Register{}Server", ident),
            ident,
        })
    }

    /// Client interface with one signature per method in declared order
    pub fn client_interface(&mut self, service: &ServiceDescriptor) -> ClientInterface {
        let service_ident = self.resolver.resolve(&service.name, true);
        let methods = service
            .methods
            .iter()
            .map(|method| {
                let ident = self.resolver.resolve(&method.name, true);
                // Client-streaming methods take no request argument
                let request = if method.client_streaming {
                    None
                } else {
                    Some(format!("*{}", self.imports.qualify(&method.input_type)))
                };
                let response = if method.is_unary() {
                    format!("*{}", self.imports.qualify(&method.output_type))
                } else {
                    stream_handle_name(&service_ident, &ident, "Client")
                };

                let request_arg = request
                    .as_ref()
                    .map(|ty| format!(", in {}", ty))
                    .unwrap_or_default();
                let signature = format!(
                    "{}(ctx context.Context{}, opts ...{}.CallOption) ({}, error)",
                    ident, request_arg, CLIENT_ALIAS, response
                );

                ClientMethod {
                    ident,
                    comments: method.comments.clone(),
                    signature,
                }
            })
            .collect();

        ClientInterface {
            name: format!("{}Client", service_ident),
            methods,
        }
    }

    /// Client struct, its constructor and one method body per method
    ///
    /// Unary bodies read the shared connection off the client, issue the
    /// call with the raw service and method names and hand back the response
    /// and error untouched. Streaming bodies report that the runtime has no
    /// streaming dispatch.
    pub fn client_implementation(&mut self, service: &ServiceDescriptor) -> ClientImplementation {
        let service_ident = self.resolver.resolve(&service.name, true);
        let interface = self.client_interface(service);

        let methods = interface
            .methods
            .into_iter()
            .zip(&service.methods)
            .map(|(client_method, method)| ClientMethodBody {
                signature: client_method.signature,
                raw_name: method.name.clone(),
                unary: method.is_unary(),
                output_type: method
                    .is_unary()
                    .then(|| self.imports.qualify(&method.output_type)),
            })
            .collect();

        ClientImplementation {
            struct_name: format!("{}Client", self.resolver.resolve(&service.name, false)),
            constructor: format!("New{}Client", service_ident),
            connection_scope: self.package.to_string(),
            methods,
        }
    }

    /// Server contract mirroring the client shape
    pub fn server_interface(&mut self, service: &ServiceDescriptor) -> ServerInterface {
        let service_ident = self.resolver.resolve(&service.name, true);
        let methods = service
            .methods
            .iter()
            .map(|method| {
                let ident = self.resolver.resolve(&method.name, true);
                let handle = stream_handle_name(&service_ident, &ident, "Server");
                let signature = match (method.client_streaming, method.server_streaming) {
                    (false, false) => format!(
                        "{}(context.Context, *{}) (*{}, error)",
                        ident,
                        self.imports.qualify(&method.input_type),
                        self.imports.qualify(&method.output_type)
                    ),
                    (false, true) => format!(
                        "{}(*{}, {}) error",
                        ident,
                        self.imports.qualify(&method.input_type),
                        handle
                    ),
                    (true, _) => format!("{}({}) error", ident, handle),
                };

                ServerMethod {
                    ident,
                    comments: method.comments.clone(),
                    signature,
                }
            })
            .collect();

        ServerInterface {
            name: format!("{}Server", service_ident),
            methods,
        }
    }

    /// Client-side stream handles for every streaming method
    pub fn client_stream_handles(&mut self, service: &ServiceDescriptor) -> Vec<StreamHandle> {
        let service_ident = self.resolver.resolve(&service.name, true);
        service
            .methods
            .iter()
            .filter(|m| !m.is_unary())
            .map(|method| {
                let (input, output) = self.message_types(method);
                let mut members = Vec::new();
                if method.client_streaming {
                    members.push(format!("Send(*{}) error", input));
                }
                if method.server_streaming {
                    members.push(format!("Recv() (*{}, error)", output));
                } else {
                    members.push(format!("CloseAndRecv() (*{}, error)", output));
                }
                members.push(format!("{}.Stream", CLIENT_ALIAS));

                StreamHandle {
                    name: stream_handle_name(
                        &service_ident,
                        &self.resolver.resolve(&method.name, true),
                        "Client",
                    ),
                    members,
                }
            })
            .collect()
    }

    /// Server-side stream handles for every streaming method
    pub fn server_stream_handles(&mut self, service: &ServiceDescriptor) -> Vec<StreamHandle> {
        let service_ident = self.resolver.resolve(&service.name, true);
        service
            .methods
            .iter()
            .filter(|m| !m.is_unary())
            .map(|method| {
                let (input, output) = self.message_types(method);
                let mut members = Vec::new();
                if method.server_streaming {
                    members.push(format!("Send(*{}) error", output));
                } else {
                    members.push(format!("SendAndClose(*{}) error", output));
                }
                if method.client_streaming {
                    members.push(format!("Recv() (*{}, error)", input));
                }
                members.push(format!("{}.Stream", MUX_ALIAS));

                StreamHandle {
                    name: stream_handle_name(
                        &service_ident,
                        &self.resolver.resolve(&method.name, true),
                        "Server",
                    ),
                    members,
                }
            })
            .collect()
    }

    fn message_types(&mut self, method: &MethodDescriptor) -> (String, String) {
        (
            self.imports.qualify(&method.input_type),
            self.imports.qualify(&method.output_type),
        )
    }

    fn check_method_collisions(&self, service: &ServiceDescriptor) -> Result<()> {
        let mut seen = HashSet::new();
        for method in &service.methods {
            let ident = self.resolver.resolve(&method.name, true);
            if !seen.insert(ident.clone()) {
                return Err(GeneratorError::NameCollision(format!(
                    "method {}.{} resolves to {}, already used by another method",
                    service.name, method.name, ident
                )));
            }
        }
        Ok(())
    }
}

/// `<Service>_<Method><Side>`
pub fn stream_handle_name(service: &Identifier, method: &Identifier, side: &str) -> String {
    format!("{}_{}{}", service, method, side)
}

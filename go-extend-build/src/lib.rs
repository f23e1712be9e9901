#![doc(html_root_url = "https://docs.rs/go-extend-build/0.1.0")]

//! `go-extend-build` generates Go sources from compiled `.proto` descriptors. It is the engine
//! behind the `protoc-gen-go-extend` protoc plugin.
//!
//! For every `.proto` file protoc asks for, two files may be generated next to the output of
//! `protoc-gen-go`:
//!
//!  - `<name>_grpc.pb.go`: gRPC client and server bindings for the services of the file,
//!    compatible with gRPC-Go v1.64 or later.
//!  - `<name>_extend.pb.go`: extensions of the enum and message types `protoc-gen-go` declares,
//!    such as `ParseStatus`, `Status.ShortName`, `HelloRequest.Clone` and `User.HasNickname`.
//!
//! ## Example
//!
//! ```bash
//! $ protoc --plugin=protoc-gen-go-extend --go-extend_out=. service.proto
//! ```
//!
//! Options travel in the plugin parameter, e.g.
//! `--go-extend_out=paths=source_relative,json=true:.`, and are documented on
//! [`Config::from_parameter`].
//!
//! ## Library use
//!
//! ```rust,ignore
//! use go_extend_build::Config;
//!
//! let response = Config::new()
//!     .require_unimplemented_servers(false)
//!     .json(true)
//!     .run_plugin(request);
//! ```

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

mod ast;
pub use crate::ast::{Comments, Method, Service};

mod code_generator;
use crate::code_generator::CodeGenerator;

mod context;
use crate::context::Context;

mod error;
pub use crate::error::Error;

mod fully_qualified_name;
use crate::fully_qualified_name::FullyQualifiedName;

mod generated_file;
pub use crate::generated_file::{go_quote, GeneratedFile};

mod go_package;
pub use crate::go_package::{GoFile, GoImportPath, GoPackageName};

mod grpc;
pub use crate::grpc::GrpcServiceGenerator;

mod ident;

mod type_registry;
pub use crate::type_registry::GoIdent;
use crate::type_registry::TypeRegistry;

/// The version recorded in the header of generated files.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the plugin, as recorded in the header of generated files.
pub const PLUGIN_NAME: &str = "protoc-gen-go-extend";

/// A service generator takes a service descriptor and generates Go code.
///
/// `ServiceGenerator` can be used to generate application-specific interfaces
/// or implementations for Protobuf service definitions.
///
/// Service generators are registered with a code generator using the
/// `Config::service_generator` method. The default is [`GrpcServiceGenerator`].
///
/// A viable scenario is that an RPC framework other than gRPC-Go provides a service generator. It
/// generates a Go interface describing the methods of the service and the glue code registering
/// an implementation of it with the framework.
pub trait ServiceGenerator {
    /// Called once per generated `_grpc.pb.go` file, before its first service.
    fn file_prelude(&mut self, _buf: &mut GeneratedFile) {}

    /// Generates a Go interface or implementation for a service, writing the result to `buf`.
    fn generate(&mut self, service: Service, buf: &mut GeneratedFile);
}

/// How the names of generated files are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathsMode {
    /// Output files are placed in a directory named after the Go import path.
    #[default]
    Import,
    /// Output files are placed in the same relative directory as the input file.
    SourceRelative,
}

/// Configuration options for Go code generation.
///
/// This configuration builder can be used to set non-default code generation options.
pub struct Config {
    service_generator: Option<Box<dyn ServiceGenerator>>,
    paths: PathsMode,
    module: Option<String>,
    import_paths: HashMap<String, String>,
    require_unimplemented_servers: bool,
    services: bool,
    enums: bool,
    messages: bool,
    json: bool,
}

impl Config {
    /// Creates a new code generator configuration with default options.
    pub fn new() -> Config {
        Config::default()
    }

    /// Parses a protoc plugin parameter.
    ///
    /// The parameter is the comma separated list protoc passes through
    /// `--go-extend_out=<parameter>:<dir>` and `--go-extend_opt=<parameter>`. Each element is
    /// `key=value`, or a bare `key` which sets a boolean option to `true`.
    ///
    /// | key | value | default |
    /// |---|---|---|
    /// | `paths` | `import` or `source_relative` | `import` |
    /// | `module` | Go module path stripped from output names | none |
    /// | `M<file.proto>` | Go import path, optionally `path;name` | none |
    /// | `require_unimplemented_servers` | bool | `true` |
    /// | `services` | bool, generate `_grpc.pb.go` | `true` |
    /// | `enums` | bool, generate enum extensions | `true` |
    /// | `messages` | bool, generate message extensions | `true` |
    /// | `json` | bool, generate JSON and text marshaling | `false` |
    pub fn from_parameter(parameter: &str) -> Result<Config, Error> {
        let mut config = Config::new();

        for param in parameter.split(',').filter(|param| !param.is_empty()) {
            let (key, value) = match param.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (param, None),
            };
            debug!("parameter: {} = {:?}", key, value);

            match key {
                "paths" => match value {
                    Some("import") => config.paths(PathsMode::Import),
                    Some("source_relative") => config.paths(PathsMode::SourceRelative),
                    _ => {
                        return Err(Error::invalid_parameter(
                            key,
                            "expected `import` or `source_relative`",
                        ))
                    }
                },
                "module" => match value {
                    Some(module) if !module.is_empty() => config.module(module),
                    _ => return Err(Error::invalid_parameter(key, "expected a module path")),
                },
                "require_unimplemented_servers" => {
                    config.require_unimplemented_servers(parse_bool(key, value)?)
                }
                "services" => config.services(parse_bool(key, value)?),
                "enums" => config.enums(parse_bool(key, value)?),
                "messages" => config.messages(parse_bool(key, value)?),
                "json" => config.json(parse_bool(key, value)?),
                _ if key.len() > 1 && key.starts_with('M') => match value {
                    Some(import_path) if !import_path.is_empty() => {
                        config.import_path(&key[1..], import_path)
                    }
                    _ => return Err(Error::invalid_parameter(key, "expected a Go import path")),
                },
                _ => return Err(Error::invalid_parameter(key, "unknown parameter")),
            };
        }

        if config.module.is_some() && config.paths == PathsMode::SourceRelative {
            return Err(Error::invalid_parameter(
                "module",
                "cannot be combined with paths=source_relative",
            ));
        }

        Ok(config)
    }

    /// Configures the code generator to use the provided service generator instead of
    /// [`GrpcServiceGenerator`].
    pub fn service_generator(&mut self, service_generator: Box<dyn ServiceGenerator>) -> &mut Self {
        self.service_generator = Some(service_generator);
        self
    }

    /// Selects how the names of generated files are derived.
    pub fn paths(&mut self, paths: PathsMode) -> &mut Self {
        self.paths = paths;
        self
    }

    /// Strips the `<module>/` prefix from the names of generated files. Only valid with
    /// [`PathsMode::Import`].
    pub fn module(&mut self, module: impl Into<String>) -> &mut Self {
        self.module = Some(module.into());
        self
    }

    /// Maps a `.proto` file to a Go import path, overriding its `go_package` option.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// # let mut config = go_extend_build::Config::new();
    /// config.import_path("google/type/date.proto", "google.golang.org/genproto/googleapis/type/date");
    /// ```
    pub fn import_path(&mut self, proto_file: &str, import_path: &str) -> &mut Self {
        self.import_paths
            .insert(proto_file.to_owned(), import_path.to_owned());
        self
    }

    /// Whether server implementations must embed `Unimplemented<Service>Server`.
    pub fn require_unimplemented_servers(&mut self, enable: bool) -> &mut Self {
        self.require_unimplemented_servers = enable;
        self
    }

    /// Whether `_grpc.pb.go` files are generated.
    pub fn services(&mut self, enable: bool) -> &mut Self {
        self.services = enable;
        self
    }

    /// Whether enum extensions are generated.
    pub fn enums(&mut self, enable: bool) -> &mut Self {
        self.enums = enable;
        self
    }

    /// Whether message extensions are generated.
    pub fn messages(&mut self, enable: bool) -> &mut Self {
        self.messages = enable;
        self
    }

    /// Whether JSON (messages) and text (enums) marshaling methods are generated.
    pub fn json(&mut self, enable: bool) -> &mut Self {
        self.json = enable;
        self
    }

    /// Generates the files requested by a `CodeGeneratorRequest`.
    ///
    /// Files are returned in the order of `file_to_generate`, the `_grpc.pb.go` file of a
    /// `.proto` file before its `_extend.pb.go` file.
    pub fn compile_request(&mut self, request: &CodeGeneratorRequest) -> Result<Vec<File>, Error> {
        let mut custom_generator = self.service_generator.take();
        let mut grpc_generator = GrpcServiceGenerator::new(self.require_unimplemented_servers);
        let service_generator: &mut dyn ServiceGenerator = match custom_generator.as_deref_mut() {
            Some(service_generator) => service_generator,
            None => &mut grpc_generator,
        };

        let result = self.generate(request, service_generator);
        self.service_generator = custom_generator;
        result
    }

    fn generate(
        &self,
        request: &CodeGeneratorRequest,
        service_generator: &mut dyn ServiceGenerator,
    ) -> Result<Vec<File>, Error> {
        let files = go_package::GoFiles::resolve(self, request)?;
        let registry = TypeRegistry::new(&request.proto_file);
        let mut context = Context::new(
            self,
            service_generator,
            files,
            registry,
            request.compiler_version.clone(),
        );

        let mut generated = Vec::new();
        for name in &request.file_to_generate {
            let file = request
                .proto_file
                .iter()
                .find(|file| file.name() == name)
                .ok_or_else(|| Error::MissingFile(name.clone()))?;
            generated.extend(CodeGenerator::generate(&mut context, file)?);
        }

        for file in &generated {
            debug!("generated: {}", file.name());
        }
        Ok(generated)
    }

    /// Runs the whole plugin contract: generates the requested files and packs them, or the
    /// error which prevented it, into a `CodeGeneratorResponse`.
    pub fn run_plugin(&mut self, request: CodeGeneratorRequest) -> CodeGeneratorResponse {
        match self.compile_request(&request) {
            Ok(file) => CodeGeneratorResponse {
                file,
                ..plugin_response()
            },
            Err(error) => error_response(error),
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            service_generator: None,
            paths: PathsMode::default(),
            module: None,
            import_paths: HashMap::new(),
            require_unimplemented_servers: true,
            services: true,
            enums: true,
            messages: true,
            json: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Config")
            .field("service_generator", &self.service_generator.is_some())
            .field("paths", &self.paths)
            .field("module", &self.module)
            .field("import_paths", &self.import_paths)
            .field(
                "require_unimplemented_servers",
                &self.require_unimplemented_servers,
            )
            .field("services", &self.services)
            .field("enums", &self.enums)
            .field("messages", &self.messages)
            .field("json", &self.json)
            .finish()
    }
}

/// Handles a `CodeGeneratorRequest` end to end, configured by the request's own parameter.
pub fn run_plugin(request: CodeGeneratorRequest) -> CodeGeneratorResponse {
    match Config::from_parameter(request.parameter()) {
        Ok(mut config) => config.run_plugin(request),
        Err(error) => error_response(error),
    }
}

fn plugin_response() -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    }
}

fn error_response(error: Error) -> CodeGeneratorResponse {
    warn!("{}", error);
    CodeGeneratorResponse {
        error: Some(error.to_string()),
        ..plugin_response()
    }
}

fn parse_bool(key: &str, value: Option<&str>) -> Result<bool, Error> {
    match value {
        None | Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(_) => Err(Error::invalid_parameter(key, "expected `true` or `false`")),
    }
}

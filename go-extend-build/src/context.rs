use prost_types::compiler::Version;

use crate::go_package::GoFiles;
use crate::type_registry::{GoIdent, TypeRegistry};
use crate::{Config, Error, FullyQualifiedName, ServiceGenerator};

/// Request-wide state: the configuration, the service generator in use, and the Go view of
/// every file and type of the request.
///
/// Built once per `CodeGeneratorRequest` and shared by the `CodeGenerator` of each file.
pub struct Context<'a> {
    config: &'a Config,
    service_generator: &'a mut dyn ServiceGenerator,
    files: GoFiles,
    registry: TypeRegistry,
    compiler_version: Option<Version>,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a Config,
        service_generator: &'a mut dyn ServiceGenerator,
        files: GoFiles,
        registry: TypeRegistry,
        compiler_version: Option<Version>,
    ) -> Self {
        Self {
            config,
            service_generator,
            files,
            registry,
            compiler_version,
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn service_generator_mut(&mut self) -> &mut dyn ServiceGenerator {
        &mut *self.service_generator
    }

    pub fn files(&self) -> &GoFiles {
        &self.files
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Resolves a fully qualified Protobuf type name to the Go type declared for it.
    pub fn resolve_ident(
        &self,
        fq_name: &FullyQualifiedName,
        referenced_by: &str,
    ) -> Result<GoIdent, Error> {
        self.registry.resolve(fq_name, &self.files, referenced_by)
    }

    /// The protoc version in the form recorded by generated file headers, e.g. `v5.27.1`.
    pub fn protoc_version(&self) -> String {
        match &self.compiler_version {
            None => "(unknown)".to_owned(),
            Some(version) => {
                let mut out = format!("v{}.{}.{}", version.major(), version.minor(), version.patch());
                if !version.suffix().is_empty() {
                    out.push('-');
                    out.push_str(version.suffix());
                }
                out
            }
        }
    }
}

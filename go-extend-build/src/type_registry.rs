use std::collections::HashMap;

use log::trace;
use prost_types::{DescriptorProto, FileDescriptorProto};

use crate::go_package::{GoFiles, GoImportPath, GoPackageName};
use crate::ident::to_go_camel;
use crate::{Error, FullyQualifiedName};

/// A Go identifier together with the package declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoIdent {
    pub name: String,
    pub import_path: GoImportPath,
    pub package_name: GoPackageName,
}

impl GoIdent {
    pub fn new(name: &str, import_path: &str, package_name: &str) -> Self {
        GoIdent {
            name: name.to_owned(),
            import_path: GoImportPath::new(import_path),
            package_name: GoPackageName::new(package_name),
        }
    }
}

#[derive(Debug)]
struct Declaration {
    go_name: String,
    file: String,
}

/// Maps every message and enum of a request, imports included, to the Go type `protoc-gen-go`
/// declares for it.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<FullyQualifiedName, Declaration>,
}

impl TypeRegistry {
    pub fn new<'a>(files: impl IntoIterator<Item = &'a FileDescriptorProto>) -> Self {
        let mut registry = TypeRegistry::default();
        for file in files {
            let mut type_path = Vec::new();
            for message in &file.message_type {
                registry.add_message(file, &mut type_path, message);
            }
            for desc in &file.enum_type {
                registry.add_type(file, &type_path, desc.name());
            }
        }
        registry
    }

    fn add_message(
        &mut self,
        file: &FileDescriptorProto,
        type_path: &mut Vec<String>,
        message: &DescriptorProto,
    ) {
        self.add_type(file, type_path, message.name());

        type_path.push(message.name().to_owned());
        for nested in &message.nested_type {
            self.add_message(file, type_path, nested);
        }
        for desc in &message.enum_type {
            self.add_type(file, type_path, desc.name());
        }
        type_path.pop();
    }

    fn add_type(&mut self, file: &FileDescriptorProto, type_path: &[String], name: &str) {
        let fq_name = FullyQualifiedName::new(file.package(), type_path, name);
        let relative_name = type_path
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join(".");
        let go_name = to_go_camel(&relative_name);
        trace!("type: {} -> {}", fq_name, go_name);

        self.types.insert(
            fq_name,
            Declaration {
                go_name,
                file: file.name().to_owned(),
            },
        );
    }

    /// The unqualified Go name of a message or enum.
    pub fn go_name(&self, fq_name: &FullyQualifiedName) -> Option<&str> {
        self.types.get(fq_name).map(|decl| decl.go_name.as_str())
    }

    pub fn resolve(
        &self,
        fq_name: &FullyQualifiedName,
        files: &GoFiles,
        referenced_by: &str,
    ) -> Result<GoIdent, Error> {
        let unresolved = || Error::UnresolvedType {
            type_name: fq_name.to_string(),
            referenced_by: referenced_by.to_owned(),
        };

        let decl = self.types.get(fq_name).ok_or_else(unresolved)?;
        let go_file = files.get(&decl.file).ok_or_else(unresolved)?;

        Ok(GoIdent {
            name: decl.go_name.clone(),
            import_path: go_file.import_path()?.clone(),
            package_name: go_file.package_name().clone(),
        })
    }
}

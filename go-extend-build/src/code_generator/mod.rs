use std::fmt::Write;

use log::debug;
use prost_types::compiler::code_generator_response::File;
use prost_types::{FileDescriptorProto, SourceCodeInfo};

use crate::ast::Comments;
use crate::context::Context;
use crate::generated_file::GeneratedFile;
use crate::go_package::GoFile;
use crate::{Error, FullyQualifiedName, PLUGIN_NAME, VERSION};

mod enums;
mod messages;
mod services;

mod syntax;
use syntax::Syntax;

mod locations;
use locations::*;

/// Suffix of the file holding gRPC bindings.
pub const GRPC_SUFFIX: &str = "_grpc.pb.go";

/// Suffix of the file holding enum and message extensions.
pub const EXTEND_SUFFIX: &str = "_extend.pb.go";

pub struct CodeGenerator<'a, 'b> {
    context: &'a mut Context<'b>,
    file: &'a FileDescriptorProto,
    go_file: GoFile,
    package: String,
    type_path: Vec<String>,
    source_info: Option<SourceCodeInfo>,
    syntax: Syntax,
    path: Vec<i32>,
}

impl<'a, 'b> CodeGenerator<'a, 'b> {
    fn new(context: &'a mut Context<'b>, file: &'a FileDescriptorProto, go_file: GoFile) -> Self {
        let source_info = file.source_code_info.clone().map(|mut s| {
            s.location.retain(|loc| {
                let len = loc.path.len();
                len > 0 && len % 2 == 0
            });
            s.location.sort_by(|a, b| a.path.cmp(&b.path));
            s
        });

        Self {
            context,
            file,
            go_file,
            package: file.package().to_owned(),
            type_path: Vec::new(),
            source_info,
            syntax: file.syntax.as_deref().into(),
            path: Vec::new(),
        }
    }

    /// Generates the Go files for one `.proto` file: `_grpc.pb.go` when it declares services,
    /// `_extend.pb.go` when it declares enums or messages.
    pub fn generate(context: &mut Context<'_>, file: &FileDescriptorProto) -> Result<Vec<File>, Error> {
        let go_file = context
            .files()
            .get(file.name())
            .cloned()
            .ok_or_else(|| Error::MissingFile(file.name().to_owned()))?;
        let prefix = go_file.output_prefix(context.config())?;

        let mut code_gen = CodeGenerator::new(context, file, go_file);
        let header = code_gen.header();

        debug!(
            "file: {:?}, package: {:?}, output prefix: {:?}",
            file.name(),
            code_gen.package,
            prefix
        );

        let mut generated = Vec::new();

        if code_gen.context.config().services && !file.service.is_empty() {
            let mut buf = code_gen.new_file(format!("{}{}", prefix, GRPC_SUFFIX))?;
            code_gen.push_services(&mut buf)?;
            generated.push(buf.finish(&header));
        }

        let mut buf = code_gen.new_file(format!("{}{}", prefix, EXTEND_SUFFIX))?;
        code_gen.push_enums(&mut buf)?;
        code_gen.push_messages(&mut buf)?;
        if !buf.is_empty() {
            generated.push(buf.finish(&header));
        }

        Ok(generated)
    }

    fn new_file(&self, name: String) -> Result<GeneratedFile, Error> {
        Ok(GeneratedFile::new(
            name,
            self.go_file.import_path()?.clone(),
            self.go_file.package_name().clone(),
        ))
    }

    /// The leading block of every generated file: comments detached from the `syntax`
    /// statement (usually a license), the generator banner and versions, and the source file.
    fn header(&self) -> String {
        let mut header = String::new();

        if let Some(comments) = self.syntax_comments() {
            comments.append_detached(&mut header);
        }

        let _ = writeln!(header, "// Code generated by {}. DO NOT EDIT.", PLUGIN_NAME);
        header.push_str("// versions:\n");
        let _ = writeln!(header, "// - {} v{}", PLUGIN_NAME, VERSION);
        let _ = writeln!(
            header,
            "// - {:<width$} {}",
            "protoc",
            self.context.protoc_version(),
            width = PLUGIN_NAME.len()
        );
        let _ = writeln!(header, "// source: {}", self.file.name());

        let deprecated = self
            .file
            .options
            .as_ref()
            .map_or(false, |options| options.deprecated());
        if deprecated {
            let _ = writeln!(header, "// {} is a deprecated file.", self.file.name());
        }

        header
    }

    /// Comments attached to the `syntax` statement. Its path has a single element, so it is
    /// looked up in the unfiltered source info.
    fn syntax_comments(&self) -> Option<Comments> {
        self.file
            .source_code_info
            .as_ref()?
            .location
            .iter()
            .find(|location| location.path[..] == [FileDescriptorProtoLocations::SYNTAX])
            .map(Comments::from_location)
    }

    fn comments_from_location(&self) -> Option<Comments> {
        let source_info = self.source_info.as_ref()?;
        let idx = source_info
            .location
            .binary_search_by_key(&&self.path[..], |location| &location.path[..])
            .ok()?;
        Some(Comments::from_location(&source_info.location[idx]))
    }

    fn fq_name(&self, name: &str) -> FullyQualifiedName {
        FullyQualifiedName::new(&self.package, &self.type_path, name)
    }

    /// The Go name `protoc-gen-go` gives a message or enum declared in this file.
    fn go_name(&self, fq_name: &FullyQualifiedName) -> Result<String, Error> {
        self.context
            .registry()
            .go_name(fq_name)
            .map(str::to_owned)
            .ok_or_else(|| Error::UnresolvedType {
                type_name: fq_name.to_string(),
                referenced_by: self.file.name().to_owned(),
            })
    }
}

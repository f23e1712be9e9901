use std::collections::BTreeMap;
use std::fmt::Write;

use prost_types::compiler::code_generator_response::File;

use crate::go_package::{GoImportPath, GoPackageName};
use crate::type_registry::GoIdent;

/// A Go source file under construction.
///
/// Code is appended to the body while identifiers from other packages are qualified through
/// [`GeneratedFile::qualified`], which records the import. The `import` block is only rendered
/// by [`GeneratedFile::finish`], once every referenced package is known.
#[derive(Debug)]
pub struct GeneratedFile {
    name: String,
    import_path: GoImportPath,
    package_name: GoPackageName,
    imports: BTreeMap<GoImportPath, String>,
    buf: String,
}

impl GeneratedFile {
    pub fn new(name: String, import_path: GoImportPath, package_name: GoPackageName) -> Self {
        GeneratedFile {
            name,
            import_path,
            package_name,
            imports: BTreeMap::new(),
            buf: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package_name(&self) -> &GoPackageName {
        &self.package_name
    }

    /// Records an import and returns the alias code must use to refer to it.
    ///
    /// The alias is the package name, numbered when another import already claimed it.
    pub fn import(&mut self, import_path: &GoImportPath, package_name: &GoPackageName) -> String {
        if let Some(alias) = self.imports.get(import_path) {
            return alias.clone();
        }

        let base = package_name.as_str();
        let mut alias = base.to_owned();
        let mut n = 1;
        while self.imports.values().any(|used| *used == alias) {
            alias = format!("{}{}", base, n);
            n += 1;
        }

        self.imports.insert(import_path.clone(), alias.clone());
        alias
    }

    /// Shorthand for [`GeneratedFile::import`] with literal names, e.g. `("context", "context")`.
    pub fn package(&mut self, import_path: &str, package_name: &str) -> String {
        self.import(
            &GoImportPath::new(import_path),
            &GoPackageName::new(package_name),
        )
    }

    /// The expression referring to `ident` from this file: bare when declared in the same
    /// package, `alias.Name` otherwise.
    pub fn qualified(&mut self, ident: &GoIdent) -> String {
        if ident.import_path == self.import_path {
            ident.name.clone()
        } else {
            let alias = self.import(&ident.import_path, &ident.package_name);
            format!("{}.{}", alias, ident.name)
        }
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Appends a line, terminating it with `\n`.
    pub fn line(&mut self, s: impl AsRef<str>) {
        self.buf.push_str(s.as_ref());
        self.buf.push('\n');
    }

    /// Starts a top-level declaration, separated from the previous one by an empty line.
    pub fn begin_decl(&mut self) {
        if !self.buf.is_empty() {
            self.buf.push('\n');
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Assembles the header, package clause, imports and body into the response file.
    pub fn finish(self, header: &str) -> File {
        let mut content = String::with_capacity(header.len() + self.buf.len() + 256);
        content.push_str(header);
        content.push('\n');
        let _ = writeln!(content, "package {}", self.package_name);
        content.push('\n');

        if !self.imports.is_empty() {
            content.push_str("import (\n");
            for (import_path, alias) in &self.imports {
                let _ = writeln!(content, "\t{} {}", alias, go_quote(import_path.as_str()));
            }
            content.push_str(")\n\n");
        }

        content.push_str(&self.buf);

        File {
            name: Some(self.name),
            content: Some(content),
            ..Default::default()
        }
    }
}

/// Quotes a string as a Go interpreted string literal.
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> GeneratedFile {
        GeneratedFile::new(
            "service_grpc.pb.go".to_owned(),
            GoImportPath::new("example.com/app"),
            GoPackageName::new("app"),
        )
    }

    #[test]
    fn test_qualified() {
        let mut file = file();
        assert_eq!(
            "Local",
            file.qualified(&GoIdent::new("Local", "example.com/app", "app"))
        );
        assert_eq!(
            "emptypb.Empty",
            file.qualified(&GoIdent::new(
                "Empty",
                "google.golang.org/protobuf/types/known/emptypb",
                "emptypb"
            ))
        );
        assert_eq!(
            "v1.Thing",
            file.qualified(&GoIdent::new("Thing", "example.com/a/v1", "v1"))
        );
        assert_eq!(
            "v11.Other",
            file.qualified(&GoIdent::new("Other", "example.com/b/v1", "v1"))
        );
        assert_eq!(
            "v1.Again",
            file.qualified(&GoIdent::new("Again", "example.com/a/v1", "v1"))
        );
    }

    #[test]
    fn test_finish() {
        let mut file = file();
        let grpc = file.package("google.golang.org/grpc", "grpc");
        let context = file.package("context", "context");
        file.line(format!("var _ {}.ClientConnInterface", grpc));
        file.line(format!("var _ {}.Context", context));

        let out = file.finish("// header\n");
        assert_eq!(Some("service_grpc.pb.go"), out.name.as_deref());
        assert_eq!(
            "// header\n\
             \n\
             package app\n\
             \n\
             import (\n\
             \tcontext \"context\"\n\
             \tgrpc \"google.golang.org/grpc\"\n\
             )\n\
             \n\
             var _ grpc.ClientConnInterface\n\
             var _ context.Context\n",
            out.content.unwrap()
        );
    }

    #[test]
    fn test_go_quote() {
        assert_eq!(r#""service.proto""#, go_quote("service.proto"));
        assert_eq!(r#""a\"b\\c\n""#, go_quote("a\"b\\c\n"));
        assert_eq!(r#""\x01""#, go_quote("\u{1}"));
    }
}

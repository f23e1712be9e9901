//! Resolution of Go import paths, package names and output file names for `.proto` files.

use std::collections::{HashMap, HashSet};
use std::fmt;

use itertools::Itertools;
use log::debug;
use multimap::MultiMap;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::FileDescriptorProto;

use crate::ident::sanitize_go_identifier;
use crate::{Config, Error, PathsMode};

/// A Go import path, e.g. `google.golang.org/grpc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoImportPath(String);

impl GoImportPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last element of the path, following the rules of Go's `path.Base`.
    pub fn base(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        if self.0.is_empty() {
            "."
        } else if trimmed.is_empty() {
            "/"
        } else {
            trimmed.rsplit('/').next().unwrap_or(trimmed)
        }
    }
}

impl fmt::Display for GoImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The name a Go package declares in its `package` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoPackageName(String);

impl GoPackageName {
    /// Creates a package name, sanitizing it into a valid Go identifier.
    pub fn new(name: &str) -> Self {
        Self(sanitize_go_identifier(name))
    }

    /// The package name Go tooling assumes for an import path without an explicit name.
    pub fn from_import_path(import_path: &GoImportPath) -> Self {
        Self::new(import_path.base())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GoPackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits a `go_package` option (or an `M` mapping) of the form `path;name`.
fn split_go_package(go_package: &str) -> (Option<&str>, Option<&str>) {
    let (path, name) = match go_package.split_once(';') {
        Some((path, name)) => (path, Some(name)),
        None => (go_package, None),
    };
    let path = Some(path).filter(|path| !path.is_empty());
    let name = name.filter(|name| !name.is_empty());
    (path, name)
}

/// The Go view of a single `.proto` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoFile {
    proto_name: String,
    import_path: Option<GoImportPath>,
    package_name: GoPackageName,
    generate: bool,
}

impl GoFile {
    pub fn resolve(file: &FileDescriptorProto, config: &Config, generate: bool) -> Self {
        let proto_name = file.name().to_owned();
        let (mapped_path, mapped_name) = config
            .import_paths
            .get(&proto_name)
            .map(|mapping| split_go_package(mapping))
            .unwrap_or((None, None));
        let (option_path, option_name) = file
            .options
            .as_ref()
            .map(|options| split_go_package(options.go_package()))
            .unwrap_or((None, None));

        let import_path = mapped_path.or(option_path).map(GoImportPath::new);
        let package_name = match (mapped_name.or(option_name), &import_path) {
            (Some(name), _) => GoPackageName::new(name),
            (None, Some(import_path)) => GoPackageName::from_import_path(import_path),
            // Never imported by a generated file; resolving the import path fails first.
            (None, None) => GoPackageName::new(file.package().rsplit('.').next().unwrap_or("")),
        };

        GoFile {
            proto_name,
            import_path,
            package_name,
            generate,
        }
    }

    pub fn proto_name(&self) -> &str {
        &self.proto_name
    }

    pub fn import_path(&self) -> Result<&GoImportPath, Error> {
        self.import_path
            .as_ref()
            .ok_or_else(|| Error::MissingImportPath {
                file: self.proto_name.clone(),
            })
    }

    pub fn package_name(&self) -> &GoPackageName {
        &self.package_name
    }

    pub fn generate(&self) -> bool {
        self.generate
    }

    /// The path of generated files without their suffix, e.g. `example.com/foo/bar` for
    /// `bar.proto`. A suffix such as `_grpc.pb.go` completes the name.
    pub fn output_prefix(&self, config: &Config) -> Result<String, Error> {
        let stem = self
            .proto_name
            .strip_suffix(".protodevel")
            .or_else(|| self.proto_name.strip_suffix(".proto"))
            .unwrap_or(&self.proto_name);

        match config.paths {
            PathsMode::SourceRelative => Ok(stem.to_owned()),
            PathsMode::Import => {
                let base = stem.rsplit('/').next().unwrap_or(stem);
                let prefix = join_go_path(self.import_path()?.as_str(), base);
                match &config.module {
                    None => Ok(prefix),
                    Some(module) => prefix
                        .strip_prefix(&format!("{}/", module))
                        .map(str::to_owned)
                        .ok_or_else(|| Error::ModuleMismatch {
                            file: self.proto_name.clone(),
                            name: prefix.clone(),
                            module: module.clone(),
                        }),
                }
            }
        }
    }
}

/// All files of a request, keyed by their `.proto` name.
#[derive(Debug)]
pub struct GoFiles {
    files: HashMap<String, GoFile>,
}

impl GoFiles {
    pub fn resolve(config: &Config, request: &CodeGeneratorRequest) -> Result<Self, Error> {
        let to_generate: HashSet<&str> = request
            .file_to_generate
            .iter()
            .map(String::as_str)
            .collect();

        let files: HashMap<String, GoFile> = request
            .proto_file
            .iter()
            .map(|file| {
                let go_file = GoFile::resolve(file, config, to_generate.contains(file.name()));
                (go_file.proto_name.clone(), go_file)
            })
            .collect();

        for name in &request.file_to_generate {
            let file = files
                .get(name)
                .ok_or_else(|| Error::MissingFile(name.clone()))?;
            let import_path = file.import_path()?;
            if !import_path.as_str().contains(|c: char| c == '.' || c == '/') {
                return Err(Error::InvalidImportPath {
                    file: name.clone(),
                    import_path: import_path.to_string(),
                });
            }
            debug!(
                "file: {:?}, import path: {:?}, package: {:?}",
                name,
                import_path.as_str(),
                file.package_name.as_str()
            );
        }

        let go_files = GoFiles { files };
        go_files.check_package_names()?;
        Ok(go_files)
    }

    pub fn get(&self, proto_name: &str) -> Option<&GoFile> {
        self.files.get(proto_name)
    }

    /// Generated files sharing an import path form one Go package, so they must agree on its name.
    fn check_package_names(&self) -> Result<(), Error> {
        let mut by_import_path: MultiMap<&GoImportPath, &GoPackageName> = MultiMap::new();
        for file in self.files.values().filter(|file| file.generate) {
            by_import_path.insert(file.import_path()?, &file.package_name);
        }

        let conflict = by_import_path
            .iter_all()
            .sorted_by_key(|(import_path, _)| *import_path)
            .find_map(|(import_path, names)| {
                let names = names.iter().map(|name| name.as_str()).unique().sorted().collect_vec();
                (names.len() > 1).then(|| (import_path.to_string(), names.join(", ")))
            });

        match conflict {
            Some((import_path, names)) => Err(Error::InconsistentPackageNames { import_path, names }),
            None => Ok(()),
        }
    }
}

/// Joins and cleans slash separated paths the way Go's `path.Join` does.
pub(crate) fn join_go_path(dir: &str, name: &str) -> String {
    let joined = format!("{}/{}", dir, name);
    let rooted = joined.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            part => parts.push(part),
        }
    }

    let cleaned = parts.join("/");
    match (rooted, cleaned.is_empty()) {
        (true, _) => format!("/{}", cleaned),
        (false, true) => ".".to_owned(),
        (false, false) => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::FileOptions;

    fn file(name: &str, package: &str, go_package: Option<&str>) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_owned()),
            package: Some(package.to_owned()),
            options: go_package.map(|go_package| FileOptions {
                go_package: Some(go_package.to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_base() {
        assert_eq!("grpc", GoImportPath::new("google.golang.org/grpc").base());
        assert_eq!("foo", GoImportPath::new("example.com/foo/").base());
        assert_eq!(".", GoImportPath::new(".").base());
        assert_eq!(".", GoImportPath::new("").base());
        assert_eq!("/", GoImportPath::new("/").base());
    }

    #[test]
    fn test_split_go_package() {
        assert_eq!((Some("."), Some("proto")), split_go_package(".;proto"));
        assert_eq!((Some("example.com/foo"), None), split_go_package("example.com/foo"));
        assert_eq!((None, Some("foo")), split_go_package(";foo"));
        assert_eq!((None, None), split_go_package(""));
    }

    #[test]
    fn test_join_go_path() {
        assert_eq!("service", join_go_path(".", "service"));
        assert_eq!("example.com/foo/service", join_go_path("example.com/foo", "service"));
        assert_eq!("example.com/service", join_go_path("example.com/foo/..", "service"));
        assert_eq!("../service", join_go_path("..", "service"));
        assert_eq!("/service", join_go_path("/..", "service"));
    }

    #[test]
    fn test_resolve_from_go_package() {
        let config = Config::new();

        let go_file = GoFile::resolve(&file("service.proto", "", Some(".;proto")), &config, true);
        assert_eq!(".", go_file.import_path().unwrap().as_str());
        assert_eq!("proto", go_file.package_name().as_str());
        assert_eq!("service", go_file.output_prefix(&config).unwrap());

        let go_file = GoFile::resolve(
            &file("foo/bar/baz.proto", "foo.bar", Some("example.com/foo/bar-v1")),
            &config,
            true,
        );
        assert_eq!("bar_v1", go_file.package_name().as_str());
        assert_eq!(
            "example.com/foo/bar-v1/baz",
            go_file.output_prefix(&config).unwrap()
        );
    }

    #[test]
    fn test_resolve_with_mapping() {
        let mut config = Config::new();
        config.import_path("foo/bar.proto", "example.com/mapped;mappedpb");

        let go_file = GoFile::resolve(
            &file("foo/bar.proto", "foo", Some("example.com/ignored")),
            &config,
            true,
        );
        assert_eq!("example.com/mapped", go_file.import_path().unwrap().as_str());
        assert_eq!("mappedpb", go_file.package_name().as_str());
    }

    #[test]
    fn test_missing_import_path() {
        let config = Config::new();
        let go_file = GoFile::resolve(&file("foo.proto", "foo", None), &config, true);
        assert_eq!(
            Err(Error::MissingImportPath {
                file: "foo.proto".to_owned()
            }),
            go_file.import_path()
        );
    }

    #[test]
    fn test_output_prefix_modes() {
        let mut config = Config::new();
        let go_file = GoFile::resolve(
            &file("api/v1/service.proto", "api.v1", Some("example.com/mod/gen/apiv1")),
            &config,
            true,
        );

        config.paths(PathsMode::SourceRelative);
        assert_eq!("api/v1/service", go_file.output_prefix(&config).unwrap());

        config.paths(PathsMode::Import).module("example.com/mod");
        assert_eq!("gen/apiv1/service", go_file.output_prefix(&config).unwrap());

        config.module("example.com/other");
        assert_eq!(
            Err(Error::ModuleMismatch {
                file: "api/v1/service.proto".to_owned(),
                name: "example.com/mod/gen/apiv1/service".to_owned(),
                module: "example.com/other".to_owned(),
            }),
            go_file.output_prefix(&config)
        );
    }

    #[test]
    fn test_inconsistent_package_names() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_owned(), "b.proto".to_owned()],
            proto_file: vec![
                file("a.proto", "x", Some("example.com/x;apb")),
                file("b.proto", "x", Some("example.com/x;bpb")),
            ],
            ..Default::default()
        };

        let error = GoFiles::resolve(&Config::new(), &request).unwrap_err();
        assert_eq!(
            Error::InconsistentPackageNames {
                import_path: "example.com/x".to_owned(),
                names: "apb, bpb".to_owned(),
            },
            error
        );
    }

    #[test]
    fn test_invalid_import_path() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_owned()],
            proto_file: vec![file("a.proto", "x", Some("apb"))],
            ..Default::default()
        };

        assert_eq!(
            Error::InvalidImportPath {
                file: "a.proto".to_owned(),
                import_path: "apb".to_owned(),
            },
            GoFiles::resolve(&Config::new(), &request).unwrap_err()
        );
    }

    #[test]
    fn test_dependencies_resolve_lazily() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_owned()],
            proto_file: vec![
                file("dep.proto", "dep", None),
                file("a.proto", "x", Some("example.com/x")),
            ],
            ..Default::default()
        };

        let files = GoFiles::resolve(&Config::new(), &request).unwrap();
        assert!(files.get("a.proto").unwrap().generate());
        assert!(!files.get("dep.proto").unwrap().generate());
        assert!(files.get("dep.proto").unwrap().import_path().is_err());
    }
}

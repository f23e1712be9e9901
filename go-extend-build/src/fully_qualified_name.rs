use std::fmt;

use itertools::Itertools;

// Invariant: should always begin with a '.' (dot)
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct FullyQualifiedName(String);

impl FullyQualifiedName {
    pub fn new(package_string: &str, type_path: &[impl AsRef<str>], name: &str) -> Self {
        let package_string = package_string.trim_matches('.');
        Self(format!(
            "{}{}{}{}{}{}",
            if package_string.is_empty() { "" } else { "." },
            package_string,
            if type_path.is_empty() { "" } else { "." },
            type_path
                .iter()
                .map(AsRef::as_ref)
                .map(|type_path_str| type_path_str.trim_start_matches('.'))
                .join("."),
            if name.is_empty() { "" } else { "." },
            name,
        ))
    }

    /// Wraps a type name as found in `FieldDescriptorProto.type_name` or
    /// `MethodDescriptorProto.input_type`. protoc always fully qualifies these.
    pub fn from_type_name(type_name: &str) -> Self {
        Self::new("", &[type_name], "")
    }

    /// The name as written in `.proto` sources and on the wire, without the leading dot.
    pub fn proto_name(&self) -> &str {
        self.0.trim_start_matches('.')
    }
}

impl AsRef<str> for FullyQualifiedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullyQualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let empty: &[&str] = &[];
        assert_eq!(".foo.Bar", FullyQualifiedName::new("foo", empty, "Bar").as_ref());
        assert_eq!(".Bar", FullyQualifiedName::new("", empty, "Bar").as_ref());
        assert_eq!(
            ".foo.bar.Outer.Inner",
            FullyQualifiedName::new(".foo.bar", &["Outer"], "Inner").as_ref()
        );
        assert_eq!(
            ".foo.Bar",
            FullyQualifiedName::from_type_name(".foo.Bar").as_ref()
        );
    }

    #[test]
    fn test_proto_name() {
        let empty: &[&str] = &[];
        assert_eq!("Greeter", FullyQualifiedName::new("", empty, "Greeter").proto_name());
        assert_eq!(
            "helloworld.Greeter",
            FullyQualifiedName::new("helloworld", empty, "Greeter").proto_name()
        );
        assert_eq!(
            "a.B.C",
            FullyQualifiedName::new("a", &["B"], "C").proto_name()
        );
    }
}

use prost_types::source_code_info::Location;

use crate::type_registry::GoIdent;

/// Comments on a Protobuf item.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Comments {
    /// Leading detached blocks of comments.
    pub leading_detached: Vec<String>,

    /// Leading comments.
    pub leading: String,

    /// Trailing comments.
    pub trailing: String,
}

impl Comments {
    pub(crate) fn from_location(location: &Location) -> Comments {
        let leading_detached = location.leading_detached_comments.clone();
        let leading = location
            .leading_comments
            .as_ref()
            .map_or(String::new(), String::clone);
        let trailing = location
            .trailing_comments
            .as_ref()
            .map_or(String::new(), String::clone);
        Comments {
            leading_detached,
            leading,
            trailing,
        }
    }

    /// The leading comments rendered as Go line comments, one `//` per line.
    pub fn leading_go(&self) -> String {
        to_go_comment(&self.leading)
    }

    /// Appends the leading detached blocks, each followed by an empty line.
    pub fn append_detached(&self, buf: &mut String) {
        for block in &self.leading_detached {
            buf.push_str(&to_go_comment(block));
            buf.push('\n');
        }
    }
}

/// Renders protoc comment text as Go line comments. protoc keeps the space after `//` in the
/// text, so none is added.
pub(crate) fn to_go_comment(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for line in text.strip_suffix('\n').unwrap_or(text).split('\n') {
        out.push_str("//");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// A service descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// The service name in Go style.
    pub name: String,
    /// The service name as it appears in the .proto file.
    pub proto_name: String,
    /// The fully qualified service name without a leading dot, as used on the wire.
    pub full_name: String,
    /// The .proto file declaring the service.
    pub source_file: String,
    /// The service comments.
    pub comments: Comments,
    /// Whether the service is marked `deprecated`.
    pub deprecated: bool,
    /// The service methods.
    pub methods: Vec<Method>,
}

/// A service method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// The method name in Go style.
    pub name: String,
    /// The method name as it appears in the .proto file.
    pub proto_name: String,
    /// The method comments.
    pub comments: Comments,
    /// The input Go type.
    pub input_type: GoIdent,
    /// The output Go type.
    pub output_type: GoIdent,
    /// The input Protobuf type.
    pub input_proto_type: String,
    /// The output Protobuf type.
    pub output_proto_type: String,
    /// Identifies if client streams multiple client messages.
    pub client_streaming: bool,
    /// Identifies if server streams multiple server messages.
    pub server_streaming: bool,
    /// Whether the method is marked `deprecated`.
    pub deprecated: bool,
}

impl Method {
    pub fn is_streaming(&self) -> bool {
        self.client_streaming || self.server_streaming
    }
}

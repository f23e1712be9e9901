use super::*;

use std::collections::HashMap;

use log::{debug, warn};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto};

use crate::ident::to_go_camel;

const PROTO_PACKAGE: &str = "google.golang.org/protobuf/proto";
const PROTOJSON_PACKAGE: &str = "google.golang.org/protobuf/encoding/protojson";

/// Methods `protoc-gen-go` declares on every message. Field names are made unique against the
/// first group.
const RESERVED_NAMES: &[&str] = &[
    "Reset",
    "String",
    "ProtoMessage",
    "Marshal",
    "Unmarshal",
    "ExtensionRangeArray",
    "ExtensionMap",
    "Descriptor",
];
const GENERATED_METHODS: &[&str] = &["ProtoReflect"];

/// The identifiers a message struct declares in Go: fields, their getters and oneof fields.
///
/// Names are assigned the way `protoc-gen-go` assigns them: in field declaration order, with
/// `_` appended while a name, or its getter, is taken.
#[derive(Debug)]
struct MessageNames {
    used: HashMap<String, bool>,
    fields: Vec<String>,
}

impl MessageNames {
    fn new(message: &DescriptorProto) -> Self {
        let mut names = MessageNames {
            used: RESERVED_NAMES
                .iter()
                .map(|name| (name.to_string(), true))
                .collect(),
            fields: Vec::with_capacity(message.field.len()),
        };

        let mut oneofs_seen = Vec::new();
        for field in &message.field {
            let go_name = names.make_unique(to_go_camel(field.name()), true);
            names.fields.push(go_name);

            if let Some(idx) = field.oneof_index {
                if !oneofs_seen.contains(&idx) {
                    oneofs_seen.push(idx);
                    let oneof = message
                        .oneof_decl
                        .get(idx as usize)
                        .map_or("", |oneof| oneof.name());
                    let go_name = names.make_unique(to_go_camel(oneof), false);
                    // `protoc-gen-go` declares `Get<Oneof>` without reserving it.
                    names.used.insert(format!("Get{}", go_name), true);
                }
            }
        }

        for name in GENERATED_METHODS {
            names.used.insert(name.to_string(), true);
        }
        names
    }

    fn make_unique(&mut self, mut name: String, has_getter: bool) -> String {
        while self.is_used(&name) || (has_getter && self.is_used(&format!("Get{}", name))) {
            name.push('_');
        }
        self.used.insert(name.clone(), true);
        self.used.insert(format!("Get{}", name), has_getter);
        name
    }

    fn is_used(&self, name: &str) -> bool {
        self.used.get(name).copied().unwrap_or(false)
    }

    /// The Go name of the field at `idx` of the message.
    fn field(&self, idx: usize) -> &str {
        &self.fields[idx]
    }
}

impl CodeGenerator<'_, '_> {
    /// Emits extensions for every message of the file, nested messages following their parent.
    /// Map entries are skipped: `protoc-gen-go` declares no type for them.
    pub(super) fn push_messages(&mut self, buf: &mut GeneratedFile) -> Result<(), Error> {
        if !self.context.config().messages {
            return Ok(());
        }

        let file = self.file;
        for message in &file.message_type {
            self.push_message(message, buf)?;
        }
        Ok(())
    }

    fn push_message(&mut self, message: &DescriptorProto, buf: &mut GeneratedFile) -> Result<(), Error> {
        let is_map_entry = message
            .options
            .as_ref()
            .map_or(false, |options| options.map_entry());
        if is_map_entry {
            return Ok(());
        }

        let go_name = self.go_name(&self.fq_name(message.name()))?;
        debug!("  message: {:?} -> {}", message.name(), go_name);

        let names = MessageNames::new(message);
        let mut helpers = Helpers {
            message: &go_name,
            names: &names,
            buf: &mut *buf,
        };

        if helpers.claim("Clone") {
            helpers.push_clone();
        }
        if helpers.claim("Equal") {
            helpers.push_equal();
        }
        for (idx, field) in message.field.iter().enumerate() {
            if !self.has_explicit_presence(field) {
                continue;
            }
            let field_name = names.field(idx);
            if helpers.claim(&format!("Has{}", field_name)) {
                helpers.push_has(field, field_name);
            }
        }
        if self.context.config().json {
            if helpers.claim("MarshalJSON") {
                helpers.push_marshal_json();
            }
            if helpers.claim("UnmarshalJSON") {
                helpers.push_unmarshal_json();
            }
        }

        self.type_path.push(message.name().to_owned());
        for nested in &message.nested_type {
            self.push_message(nested, buf)?;
        }
        self.type_path.pop();

        Ok(())
    }

    /// Whether `protoc-gen-go` declares `field` as a pointer, or nil-able slice, tracking
    /// presence: proto3 `optional` and proto2 `optional` scalars and enums outside of oneofs.
    fn has_explicit_presence(&self, field: &FieldDescriptorProto) -> bool {
        if matches!(field.r#type(), Type::Message | Type::Group) {
            return false;
        }
        if field.proto3_optional() {
            return true;
        }
        match self.syntax {
            Syntax::Proto2 => field.label() == Label::Optional && field.oneof_index.is_none(),
            Syntax::Proto3 | Syntax::Editions => false,
        }
    }
}

/// Writes the helper methods of one message.
struct Helpers<'a> {
    message: &'a str,
    names: &'a MessageNames,
    buf: &'a mut GeneratedFile,
}

impl Helpers<'_> {
    /// Whether `method` can be declared on the message, logging the collision otherwise.
    fn claim(&self, method: &str) -> bool {
        if self.names.is_used(method) {
            warn!(
                "{}.{} is not generated: the name is taken by a field or method of the message",
                self.message, method
            );
            false
        } else {
            true
        }
    }

    fn push_clone(&mut self) {
        let proto = self.buf.package(PROTO_PACKAGE, "proto");
        let buf = &mut *self.buf;

        buf.begin_decl();
        buf.line("// Clone returns a deep copy of x, or nil when x is nil.");
        buf.line(format!(
            "func (x *{}) Clone() *{} {{",
            self.message, self.message
        ));
        buf.line("\tif x == nil {");
        buf.line("\t\treturn nil");
        buf.line("\t}");
        buf.line(format!("\treturn {}.Clone(x).(*{})", proto, self.message));
        buf.line("}");
    }

    fn push_equal(&mut self) {
        let proto = self.buf.package(PROTO_PACKAGE, "proto");
        let buf = &mut *self.buf;

        buf.begin_decl();
        buf.line(format!(
            "// Equal reports whether x and y are equal, as defined by {}.Equal.",
            proto
        ));
        buf.line(format!(
            "func (x *{}) Equal(y *{}) bool {{",
            self.message, self.message
        ));
        buf.line(format!("\treturn {}.Equal(x, y)", proto));
        buf.line("}");
    }

    fn push_has(&mut self, field: &FieldDescriptorProto, field_name: &str) {
        let buf = &mut *self.buf;

        buf.begin_decl();
        buf.line(format!(
            "// Has{} reports whether the {} field is set.",
            field_name,
            field.name()
        ));
        buf.line(format!("func (x *{}) Has{}() bool {{", self.message, field_name));
        buf.line(format!("\treturn x != nil && x.{} != nil", field_name));
        buf.line("}");
    }

    fn push_marshal_json(&mut self) {
        let protojson = self.buf.package(PROTOJSON_PACKAGE, "protojson");
        let buf = &mut *self.buf;

        buf.begin_decl();
        buf.line("// MarshalJSON implements json.Marshaler with the Protobuf JSON mapping.");
        buf.line(format!(
            "func (x *{}) MarshalJSON() ([]byte, error) {{",
            self.message
        ));
        buf.line(format!("\treturn {}.Marshal(x)", protojson));
        buf.line("}");
    }

    fn push_unmarshal_json(&mut self) {
        let protojson = self.buf.package(PROTOJSON_PACKAGE, "protojson");
        let buf = &mut *self.buf;

        buf.begin_decl();
        buf.line("// UnmarshalJSON implements json.Unmarshaler with the Protobuf JSON mapping.");
        buf.line(format!(
            "func (x *{}) UnmarshalJSON(b []byte) error {{",
            self.message
        ));
        buf.line(format!("\treturn {}.Unmarshal(b, x)", protojson));
        buf.line("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::OneofDescriptorProto;

    fn field(name: &str) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_field_names_made_unique() {
        let message = DescriptorProto {
            name: Some("Msg".to_owned()),
            field: vec![
                field("string"),
                field("descriptor"),
                field("name"),
                field("get_name"),
                field("clone"),
            ],
            ..Default::default()
        };

        let names = MessageNames::new(&message);
        assert_eq!("String_", names.field(0));
        assert_eq!("Descriptor_", names.field(1));
        assert_eq!("Name", names.field(2));
        assert_eq!("GetName_", names.field(3));
        assert_eq!("Clone", names.field(4));
        assert!(names.is_used("Clone"));
        assert!(names.is_used("GetClone"));
        assert!(names.is_used("ProtoReflect"));
        assert!(!names.is_used("Equal"));
    }

    #[test]
    fn test_oneof_names() {
        let message = DescriptorProto {
            name: Some("Msg".to_owned()),
            field: vec![
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..field("id")
                },
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..field("email")
                },
            ],
            oneof_decl: vec![OneofDescriptorProto {
                name: Some("has_key".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let names = MessageNames::new(&message);
        assert_eq!("Id", names.field(0));
        assert_eq!("Email", names.field(1));
        assert!(names.is_used("HasKey"));
        assert!(names.is_used("GetHasKey"));
    }
}

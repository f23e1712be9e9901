use super::*;

use std::collections::HashSet;

use itertools::Itertools;
use log::debug;
use prost_types::{DescriptorProto, EnumDescriptorProto};

use crate::generated_file::go_quote;
use crate::ident::enum_value_short_name;

/// An enum value as `protoc-gen-go` declares it.
struct EnumValue<'d> {
    /// The Go constant, e.g. `Status_STATUS_ACTIVE`.
    ident: String,
    /// The Protobuf value name, e.g. `STATUS_ACTIVE`.
    name: &'d str,
    /// The value name without the enum prefix, e.g. `active`.
    short_name: String,
    number: i32,
}

impl CodeGenerator<'_, '_> {
    /// Emits extensions for every enum of the file, top-level enums first and then nested enums
    /// in message declaration order, the order `protoc-gen-go` declares them in.
    pub(super) fn push_enums(&mut self, buf: &mut GeneratedFile) -> Result<(), Error> {
        if !self.context.config().enums {
            return Ok(());
        }

        let file = self.file;
        for desc in &file.enum_type {
            self.push_enum(desc, None, buf)?;
        }
        for message in &file.message_type {
            self.push_nested_enums(message, buf)?;
        }
        Ok(())
    }

    fn push_nested_enums(&mut self, message: &DescriptorProto, buf: &mut GeneratedFile) -> Result<(), Error> {
        let parent = self.go_name(&self.fq_name(message.name()))?;

        self.type_path.push(message.name().to_owned());
        for desc in &message.enum_type {
            self.push_enum(desc, Some(parent.as_str()), buf)?;
        }
        for nested in &message.nested_type {
            self.push_nested_enums(nested, buf)?;
        }
        self.type_path.pop();

        Ok(())
    }

    /// Values of a nested enum are prefixed by the containing message's Go name, values of a
    /// top-level enum by the enum's own.
    fn push_enum(
        &mut self,
        desc: &EnumDescriptorProto,
        parent: Option<&str>,
        buf: &mut GeneratedFile,
    ) -> Result<(), Error> {
        let go_name = self.go_name(&self.fq_name(desc.name()))?;
        debug!("  enum: {:?} -> {}", desc.name(), go_name);

        let prefix = parent.unwrap_or(&go_name);
        let values = desc
            .value
            .iter()
            .map(|value| EnumValue {
                ident: format!("{}_{}", prefix, value.name()),
                name: value.name(),
                short_name: enum_value_short_name(desc.name(), value.name()),
                number: value.number(),
            })
            .collect::<Vec<_>>();
        // Aliases share the number of an earlier value and would repeat its `case`.
        let distinct = values.iter().unique_by(|value| value.number).collect::<Vec<_>>();

        push_values(&go_name, &distinct, buf);
        push_is_known(&go_name, &distinct, buf);
        push_short_name(&go_name, &distinct, buf);
        push_parse(&go_name, &values, buf);
        push_ptr(&go_name, buf);
        if self.context.config().json {
            push_text_marshaling(&go_name, buf);
        }

        Ok(())
    }
}

fn push_values(go_name: &str, values: &[&EnumValue<'_>], buf: &mut GeneratedFile) {
    buf.begin_decl();
    buf.line(format!(
        "// {}Values returns the values of {} in declaration order, aliases excluded.",
        go_name, go_name
    ));
    buf.line(format!("func {}Values() []{} {{", go_name, go_name));
    if values.is_empty() {
        buf.line("\treturn nil");
    } else {
        buf.line(format!("\treturn []{}{{", go_name));
        for value in values {
            buf.line(format!("\t\t{},", value.ident));
        }
        buf.line("\t}");
    }
    buf.line("}");
}

fn push_is_known(go_name: &str, values: &[&EnumValue<'_>], buf: &mut GeneratedFile) {
    buf.begin_decl();
    buf.line(format!(
        "// IsKnown reports whether x is one of the values declared by {}.",
        go_name
    ));
    buf.line(format!("func (x {}) IsKnown() bool {{", go_name));
    if !values.is_empty() {
        buf.line("\tswitch x {");
        buf.line(format!(
            "\tcase {}:",
            values.iter().map(|value| &value.ident).join(",\n\t\t")
        ));
        buf.line("\t\treturn true");
        buf.line("\t}");
    }
    buf.line("\treturn false");
    buf.line("}");
}

fn push_short_name(go_name: &str, values: &[&EnumValue<'_>], buf: &mut GeneratedFile) {
    let strconv = buf.package("strconv", "strconv");

    buf.begin_decl();
    buf.line("// ShortName returns the name of x in snake case, without the enum name prefix.");
    buf.line("// Unknown values are rendered as their number.");
    buf.line(format!("func (x {}) ShortName() string {{", go_name));
    if !values.is_empty() {
        buf.line("\tswitch x {");
        for value in values {
            buf.line(format!("\tcase {}:", value.ident));
            buf.line(format!("\t\treturn {}", go_quote(&value.short_name)));
        }
        buf.line("\t}");
    }
    buf.line(format!("\treturn {}.Itoa(int(x))", strconv));
    buf.line("}");
}

/// Every name, full or short, maps to the first value declaring it.
fn push_parse(go_name: &str, values: &[EnumValue<'_>], buf: &mut GeneratedFile) {
    let fmt = buf.package("fmt", "fmt");

    let mut seen = HashSet::new();
    let cases = values
        .iter()
        .filter_map(|value| {
            let names = [value.name, value.short_name.as_str()]
                .into_iter()
                .filter(|name| seen.insert(name.to_string()))
                .map(go_quote)
                .collect::<Vec<_>>();
            if names.is_empty() {
                None
            } else {
                Some((names.join(", "), &value.ident))
            }
        })
        .collect::<Vec<_>>();

    buf.begin_decl();
    buf.line(format!(
        "// Parse{} returns the value of {} named s, either by its full name or by its",
        go_name, go_name
    ));
    buf.line("// ShortName.");
    buf.line(format!("func Parse{}(s string) ({}, error) {{", go_name, go_name));
    if !cases.is_empty() {
        buf.line("\tswitch s {");
        for (names, ident) in cases {
            buf.line(format!("\tcase {}:", names));
            buf.line(format!("\t\treturn {}, nil", ident));
        }
        buf.line("\t}");
    }
    buf.line(format!(
        "\treturn 0, {}.Errorf(\"invalid {} %q\", s)",
        fmt, go_name
    ));
    buf.line("}");
}

fn push_ptr(go_name: &str, buf: &mut GeneratedFile) {
    buf.begin_decl();
    buf.line("// Ptr returns a pointer to a copy of x.");
    buf.line(format!("func (x {}) Ptr() *{} {{", go_name, go_name));
    buf.line("\treturn &x");
    buf.line("}");
}

fn push_text_marshaling(go_name: &str, buf: &mut GeneratedFile) {
    buf.begin_decl();
    buf.line("// MarshalText implements encoding.TextMarshaler with the full value name.");
    buf.line(format!("func (x {}) MarshalText() ([]byte, error) {{", go_name));
    buf.line("\treturn []byte(x.String()), nil");
    buf.line("}");

    buf.begin_decl();
    buf.line(format!(
        "// UnmarshalText implements encoding.TextUnmarshaler with Parse{}.",
        go_name
    ));
    buf.line(format!("func (x *{}) UnmarshalText(b []byte) error {{", go_name));
    buf.line(format!("\tv, err := Parse{}(string(b))", go_name));
    buf.line("\tif err != nil {");
    buf.line("\t\treturn err");
    buf.line("\t}");
    buf.line("\t*x = v");
    buf.line("\treturn nil");
    buf.line("}");
}

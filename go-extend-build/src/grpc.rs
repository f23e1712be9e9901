//! gRPC-Go bindings for Protobuf services.
//!
//! The generated code follows the layout of the bindings `protoc-gen-go-grpc` emits for gRPC-Go
//! v1.64 and later: generic stream types, `grpc.StaticMethod` call options and the
//! `SupportPackageIsVersion9` assertion.

use std::fmt::Write;

use log::debug;

use crate::ast::{Method, Service};
use crate::generated_file::{go_quote, GeneratedFile};
use crate::ident::unexport;
use crate::ServiceGenerator;

const GRPC_PACKAGE: &str = "google.golang.org/grpc";
const CODES_PACKAGE: &str = "google.golang.org/grpc/codes";
const STATUS_PACKAGE: &str = "google.golang.org/grpc/status";
const CONTEXT_PACKAGE: &str = "context";

const DEPRECATION_COMMENT: &str = "// Deprecated: Do not use.";

/// The default [`ServiceGenerator`]: client and server bindings for gRPC-Go.
#[derive(Debug, Clone, Default)]
pub struct GrpcServiceGenerator {
    require_unimplemented_servers: bool,
}

/// Identifiers shared by the pieces generated for one service.
struct Names {
    client: String,
    server: String,
    unimplemented: String,
    service_desc: String,
}

impl Names {
    fn new(service: &Service) -> Self {
        Names {
            client: format!("{}Client", service.name),
            server: format!("{}Server", service.name),
            unimplemented: format!("Unimplemented{}Server", service.name),
            service_desc: format!("{}_ServiceDesc", service.name),
        }
    }

    fn full_method_name(service: &Service, method: &Method) -> String {
        format!("{}_{}_FullMethodName", service.name, method.name)
    }

    fn handler(service: &Service, method: &Method) -> String {
        format!("_{}_{}_Handler", service.name, method.name)
    }
}

/// Package aliases, resolved once per service.
///
/// Every other package is imported where an identifier is qualified with it, so a service
/// without methods imports none of them.
struct Packages {
    grpc: String,
}

impl GrpcServiceGenerator {
    pub fn new(require_unimplemented_servers: bool) -> Self {
        GrpcServiceGenerator {
            require_unimplemented_servers,
        }
    }

    fn push_method_names(&self, service: &Service, buf: &mut GeneratedFile) {
        if service.methods.is_empty() {
            return;
        }

        let constants = service
            .methods
            .iter()
            .map(|method| {
                let value = format!("/{}/{}", service.full_name, method.proto_name);
                (Names::full_method_name(service, method), go_quote(&value))
            })
            .collect::<Vec<_>>();
        let width = constants.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

        buf.line("");
        buf.line("const (");
        for (name, value) in constants {
            buf.line(format!("\t{:<width$} = {}", name, value, width = width));
        }
        buf.line(")");
    }

    fn push_client(&self, service: &Service, names: &Names, pkgs: &Packages, buf: &mut GeneratedFile) {
        let client_struct = unexport(&names.client);

        buf.line("");
        buf.line(format!(
            "// {} is the client API for {} service.",
            names.client, service.name
        ));
        buf.line("//");
        buf.line("// For semantics around ctx use and closing/ending streaming RPCs, please refer to https://pkg.go.dev/google.golang.org/grpc/?tab=doc#ClientConn.NewStream.");
        push_service_comments(service, buf);
        buf.line(format!("type {} interface {{", names.client));
        for method in &service.methods {
            push_method_comments(method, buf);
            let signature = client_signature(method, pkgs, buf);
            buf.line(format!("\t{}", signature));
        }
        buf.line("}");

        buf.line("");
        buf.line(format!("type {} struct {{", client_struct));
        buf.line(format!("\tcc {}.ClientConnInterface", pkgs.grpc));
        buf.line("}");

        buf.line("");
        if service.deprecated {
            buf.line(DEPRECATION_COMMENT);
        }
        buf.line(format!(
            "func New{}(cc {}.ClientConnInterface) {} {{",
            names.client, pkgs.grpc, names.client
        ));
        buf.line(format!("\treturn &{}{{cc}}", client_struct));
        buf.line("}");

        let mut stream_index = 0;
        for method in &service.methods {
            buf.line("");
            if method.deprecated {
                buf.line(DEPRECATION_COMMENT);
            }
            let signature = client_signature(method, pkgs, buf);
            buf.line(format!("func (c *{}) {} {{", client_struct, signature));
            buf.line(format!(
                "\tcOpts := append([]{grpc}.CallOption{{{grpc}.StaticMethod()}}, opts...)",
                grpc = pkgs.grpc
            ));

            if !method.is_streaming() {
                let output = buf.qualified(&method.output_type);
                buf.line(format!("\tout := new({})", output));
                buf.line(format!(
                    "\terr := c.cc.Invoke(ctx, {}, in, out, cOpts...)",
                    Names::full_method_name(service, method)
                ));
                buf.line("\tif err != nil {");
                buf.line("\t\treturn nil, err");
                buf.line("\t}");
                buf.line("\treturn out, nil");
                buf.line("}");
                continue;
            }

            let input = buf.qualified(&method.input_type);
            let output = buf.qualified(&method.output_type);
            buf.line(format!(
                "\tstream, err := c.cc.NewStream(ctx, &{}.Streams[{}], {}, cOpts...)",
                names.service_desc,
                stream_index,
                Names::full_method_name(service, method)
            ));
            buf.line("\tif err != nil {");
            buf.line("\t\treturn nil, err");
            buf.line("\t}");
            buf.line(format!(
                "\tx := &{}.GenericClientStream[{}, {}]{{ClientStream: stream}}",
                pkgs.grpc, input, output
            ));
            if !method.client_streaming {
                buf.line("\tif err := x.ClientStream.SendMsg(in); err != nil {");
                buf.line("\t\treturn nil, err");
                buf.line("\t}");
                buf.line("\tif err := x.ClientStream.CloseSend(); err != nil {");
                buf.line("\t\treturn nil, err");
                buf.line("\t}");
            }
            buf.line("\treturn x, nil");
            buf.line("}");

            buf.line("");
            buf.line("// This type alias is provided for backwards compatibility with existing code that references the prior non-generic stream type by name.");
            let stream = client_stream_type(method, pkgs, buf);
            buf.line(format!(
                "type {}_{}Client = {}",
                service.name, method.name, stream
            ));
            stream_index += 1;
        }
    }

    fn push_server(&self, service: &Service, names: &Names, pkgs: &Packages, buf: &mut GeneratedFile) {
        let must_or_should = if self.require_unimplemented_servers {
            "must"
        } else {
            "should"
        };
        let must_embed = format!("mustEmbed{}", names.unimplemented);

        buf.line("");
        buf.line(format!(
            "// {} is the server API for {} service.",
            names.server, service.name
        ));
        buf.line(format!(
            "// All implementations {} embed {}",
            must_or_should, names.unimplemented
        ));
        buf.line("// for forward compatibility.");
        push_service_comments(service, buf);
        buf.line(format!("type {} interface {{", names.server));
        for method in &service.methods {
            push_method_comments(method, buf);
            let signature = server_signature(method, pkgs, buf);
            buf.line(format!("\t{}", signature));
        }
        if self.require_unimplemented_servers {
            buf.line(format!("\t{}()", must_embed));
        }
        buf.line("}");

        buf.line("");
        buf.line(format!(
            "// {} {} be embedded to have",
            names.unimplemented, must_or_should
        ));
        buf.line("// forward compatible implementations.");
        buf.line("//");
        buf.line("// NOTE: this should be embedded by value instead of pointer to avoid a nil");
        buf.line("// pointer dereference when methods are called.");
        buf.line(format!("type {} struct{{}}", names.unimplemented));
        buf.line("");
        for method in &service.methods {
            let codes = buf.package(CODES_PACKAGE, "codes");
            let status = buf.package(STATUS_PACKAGE, "status");
            let signature = server_signature(method, pkgs, buf);
            let nil = if method.is_streaming() { "" } else { "nil, " };
            buf.line(format!("func ({}) {} {{", names.unimplemented, signature));
            buf.line(format!(
                "\treturn {}{}.Errorf({}.Unimplemented, \"method {} not implemented\")",
                nil, status, codes, method.name
            ));
            buf.line("}");
        }

        let mut markers = Vec::new();
        if self.require_unimplemented_servers {
            markers.push(format!("func ({}) {}()", names.unimplemented, must_embed));
        }
        markers.push(format!("func ({}) testEmbeddedByValue()", names.unimplemented));
        let width = markers.iter().map(String::len).max().unwrap_or(0);
        for marker in markers {
            buf.line(format!("{:<width$} {{}}", marker, width = width));
        }

        buf.line("");
        buf.line(format!(
            "// Unsafe{} may be embedded to opt out of forward compatibility for this service.",
            names.server
        ));
        buf.line(format!(
            "// Use of this interface is not recommended, as added methods to {} will",
            names.server
        ));
        buf.line("// result in compilation errors.");
        buf.line(format!("type Unsafe{} interface {{", names.server));
        buf.line(format!("\t{}()", must_embed));
        buf.line("}");

        buf.line("");
        if service.deprecated {
            buf.line(DEPRECATION_COMMENT);
        }
        buf.line(format!(
            "func Register{}(s {}.ServiceRegistrar, srv {}) {{",
            names.server, pkgs.grpc, names.server
        ));
        buf.line(format!(
            "\t// A nil *{} embedded by pointer panics here, at registration,",
            names.unimplemented
        ));
        buf.line("\t// instead of on the first call of an unimplemented method.");
        buf.line("\tif t, ok := srv.(interface{ testEmbeddedByValue() }); ok {");
        buf.line("\t\tt.testEmbeddedByValue()");
        buf.line("\t}");
        buf.line(format!("\ts.RegisterService(&{}, srv)", names.service_desc));
        buf.line("}");
    }

    fn push_handlers(&self, service: &Service, names: &Names, pkgs: &Packages, buf: &mut GeneratedFile) {
        for method in &service.methods {
            let handler = Names::handler(service, method);
            let input = buf.qualified(&method.input_type);
            let output = buf.qualified(&method.output_type);

            buf.line("");
            if !method.is_streaming() {
                let context = buf.package(CONTEXT_PACKAGE, "context");
                buf.line(format!(
                    "func {}(srv interface{{}}, ctx {}.Context, dec func(interface{{}}) error, interceptor {}.UnaryServerInterceptor) (interface{{}}, error) {{",
                    handler, context, pkgs.grpc
                ));
                buf.line(format!("\tin := new({})", input));
                buf.line("\tif err := dec(in); err != nil {");
                buf.line("\t\treturn nil, err");
                buf.line("\t}");
                buf.line("\tif interceptor == nil {");
                buf.line(format!(
                    "\t\treturn srv.({}).{}(ctx, in)",
                    names.server, method.name
                ));
                buf.line("\t}");
                buf.line(format!("\tinfo := &{}.UnaryServerInfo{{", pkgs.grpc));
                buf.line("\t\tServer:     srv,");
                buf.line(format!(
                    "\t\tFullMethod: {},",
                    Names::full_method_name(service, method)
                ));
                buf.line("\t}");
                buf.line(format!(
                    "\thandler := func(ctx {}.Context, req interface{{}}) (interface{{}}, error) {{",
                    context
                ));
                buf.line(format!(
                    "\t\treturn srv.({}).{}(ctx, req.(*{}))",
                    names.server, method.name, input
                ));
                buf.line("\t}");
                buf.line("\treturn interceptor(ctx, in, info, handler)");
                buf.line("}");
                continue;
            }

            buf.line(format!(
                "func {}(srv interface{{}}, stream {}.ServerStream) error {{",
                handler, pkgs.grpc
            ));
            let server_stream = format!(
                "&{}.GenericServerStream[{}, {}]{{ServerStream: stream}}",
                pkgs.grpc, input, output
            );
            if method.client_streaming {
                buf.line(format!(
                    "\treturn srv.({}).{}({})",
                    names.server, method.name, server_stream
                ));
            } else {
                buf.line(format!("\tm := new({})", input));
                buf.line("\tif err := stream.RecvMsg(m); err != nil {");
                buf.line("\t\treturn err");
                buf.line("\t}");
                buf.line(format!(
                    "\treturn srv.({}).{}(m, {})",
                    names.server, method.name, server_stream
                ));
            }
            buf.line("}");

            buf.line("");
            buf.line("// This type alias is provided for backwards compatibility with existing code that references the prior non-generic stream type by name.");
            let stream = server_stream_type(method, pkgs, buf);
            buf.line(format!(
                "type {}_{}Server = {}",
                service.name, method.name, stream
            ));
        }
    }

    fn push_service_desc(&self, service: &Service, names: &Names, pkgs: &Packages, buf: &mut GeneratedFile) {
        let (streams, unary): (Vec<&Method>, Vec<&Method>) =
            service.methods.iter().partition(|method| method.is_streaming());

        let methods = keyed_list(
            &format!("[]{}.MethodDesc", pkgs.grpc),
            unary.iter().map(|method| {
                vec![
                    ("MethodName", go_quote(&method.proto_name)),
                    ("Handler", Names::handler(service, method)),
                ]
            }),
        );
        let streams = keyed_list(
            &format!("[]{}.StreamDesc", pkgs.grpc),
            streams.iter().map(|method| {
                let mut entries = vec![
                    ("StreamName", go_quote(&method.proto_name)),
                    ("Handler", Names::handler(service, method)),
                ];
                if method.server_streaming {
                    entries.push(("ServerStreams", "true".to_owned()));
                }
                if method.client_streaming {
                    entries.push(("ClientStreams", "true".to_owned()));
                }
                entries
            }),
        );

        buf.line("");
        buf.line(format!(
            "// {} is the {}.ServiceDesc for {} service.",
            names.service_desc, pkgs.grpc, service.name
        ));
        buf.line(format!(
            "// It's only intended for direct use with {}.RegisterService,",
            pkgs.grpc
        ));
        buf.line("// and not to be introspected or modified (even as a copy)");
        buf.line(format!(
            "var {} = {}.ServiceDesc{{",
            names.service_desc, pkgs.grpc
        ));
        let mut fields = String::new();
        push_fields(
            1,
            &[
                ("ServiceName", go_quote(&service.full_name)),
                ("HandlerType", format!("(*{})(nil)", names.server)),
                ("Methods", methods),
                ("Streams", streams),
                ("Metadata", go_quote(&service.source_file)),
            ],
            &mut fields,
        );
        buf.push_str(&fields);
        buf.line("}");
    }
}

impl ServiceGenerator for GrpcServiceGenerator {
    fn file_prelude(&mut self, buf: &mut GeneratedFile) {
        let grpc = buf.package(GRPC_PACKAGE, "grpc");
        buf.line("// This is a compile-time assertion to ensure that this generated file");
        buf.line("// is compatible with the grpc package it is being compiled against.");
        buf.line("// Requires gRPC-Go v1.64.0 or later.");
        buf.line(format!("const _ = {}.SupportPackageIsVersion9", grpc));
    }

    fn generate(&mut self, service: Service, buf: &mut GeneratedFile) {
        debug!("  grpc service: {:?}", service.full_name);

        let names = Names::new(&service);
        let pkgs = Packages {
            grpc: buf.package(GRPC_PACKAGE, "grpc"),
        };

        self.push_method_names(&service, buf);
        self.push_client(&service, &names, &pkgs, buf);
        self.push_server(&service, &names, &pkgs, buf);
        self.push_handlers(&service, &names, &pkgs, buf);
        self.push_service_desc(&service, &names, &pkgs, buf);
    }
}

fn push_service_comments(service: &Service, buf: &mut GeneratedFile) {
    let leading = service.comments.leading_go();
    if !leading.trim().is_empty() {
        buf.line("//");
        buf.line(leading.trim());
    }
    if service.deprecated {
        buf.line("//");
        buf.line(DEPRECATION_COMMENT);
    }
}

fn push_method_comments(method: &Method, buf: &mut GeneratedFile) {
    for line in method.comments.leading_go().lines() {
        buf.line(format!("\t{}", line));
    }
    if method.deprecated {
        buf.line(format!("\t{}", DEPRECATION_COMMENT));
    }
}

fn client_signature(method: &Method, pkgs: &Packages, buf: &mut GeneratedFile) -> String {
    let context = buf.package(CONTEXT_PACKAGE, "context");
    let mut signature = format!("{}(ctx {}.Context", method.name, context);
    if !method.client_streaming {
        let _ = write!(signature, ", in *{}", buf.qualified(&method.input_type));
    }
    let _ = write!(signature, ", opts ...{}.CallOption) (", pkgs.grpc);
    if method.is_streaming() {
        signature.push_str(&client_stream_type(method, pkgs, buf));
    } else {
        let _ = write!(signature, "*{}", buf.qualified(&method.output_type));
    }
    signature.push_str(", error)");
    signature
}

fn server_signature(method: &Method, pkgs: &Packages, buf: &mut GeneratedFile) -> String {
    let input = buf.qualified(&method.input_type);
    if !method.is_streaming() {
        let context = buf.package(CONTEXT_PACKAGE, "context");
        let output = buf.qualified(&method.output_type);
        return format!(
            "{}({}.Context, *{}) (*{}, error)",
            method.name, context, input, output
        );
    }

    let stream = server_stream_type(method, pkgs, buf);
    if method.client_streaming {
        format!("{}({}) error", method.name, stream)
    } else {
        format!("{}(*{}, {}) error", method.name, input, stream)
    }
}

fn client_stream_type(method: &Method, pkgs: &Packages, buf: &mut GeneratedFile) -> String {
    let input = buf.qualified(&method.input_type);
    let output = buf.qualified(&method.output_type);
    match (method.client_streaming, method.server_streaming) {
        (true, true) => format!("{}.BidiStreamingClient[{}, {}]", pkgs.grpc, input, output),
        (true, false) => format!("{}.ClientStreamingClient[{}, {}]", pkgs.grpc, input, output),
        _ => format!("{}.ServerStreamingClient[{}]", pkgs.grpc, output),
    }
}

fn server_stream_type(method: &Method, pkgs: &Packages, buf: &mut GeneratedFile) -> String {
    let input = buf.qualified(&method.input_type);
    let output = buf.qualified(&method.output_type);
    match (method.client_streaming, method.server_streaming) {
        (true, true) => format!("{}.BidiStreamingServer[{}, {}]", pkgs.grpc, input, output),
        (true, false) => format!("{}.ClientStreamingServer[{}, {}]", pkgs.grpc, input, output),
        _ => format!("{}.ServerStreamingServer[{}]", pkgs.grpc, output),
    }
}

/// Renders a slice literal of keyed struct literals, e.g. `[]grpc.MethodDesc{...}`, as the
/// value of an enclosing field at indentation level 1.
fn keyed_list<'a>(
    type_name: &str,
    elements: impl Iterator<Item = Vec<(&'a str, String)>>,
) -> String {
    let mut out = String::new();
    for entries in elements {
        if out.is_empty() {
            let _ = writeln!(out, "{}{{", type_name);
        }
        out.push_str("\t\t{\n");
        push_fields(3, &entries, &mut out);
        out.push_str("\t\t},\n");
    }
    if out.is_empty() {
        return format!("{}{{}}", type_name);
    }
    out.push_str("\t}");
    out
}

/// Writes `Key: value,` lines the way gofmt aligns them: values of consecutive single line
/// entries start in the same column, multi-line values end such a run.
fn push_fields(indent: usize, entries: &[(&str, String)], out: &mut String) {
    let tabs = "\t".repeat(indent);
    let mut start = 0;
    while start < entries.len() {
        let end = entries[start..]
            .iter()
            .position(|(_, value)| value.contains('\n'))
            .map_or(entries.len(), |offset| start + offset);

        let width = entries[start..end]
            .iter()
            .map(|(key, _)| key.len() + 1)
            .max()
            .unwrap_or(0);
        for (key, value) in &entries[start..end] {
            let key = format!("{}:", key);
            let _ = writeln!(out, "{}{:<width$} {},", tabs, key, value, width = width);
        }

        if let Some((key, value)) = entries.get(end) {
            let _ = writeln!(out, "{}{}: {},", tabs, key, value);
        }
        start = end + 1;
    }
}

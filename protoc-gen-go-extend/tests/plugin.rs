use std::io::Write;
use std::process::{Command, Output, Stdio};

use prost::Message;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::{
    DescriptorProto, FileDescriptorProto, FileOptions, MethodDescriptorProto,
    ServiceDescriptorProto,
};

const PLUGIN: &str = env!("CARGO_BIN_EXE_protoc-gen-go-extend");

const SERVICE_PROTO: &str = r#"syntax = "proto3";
option go_package = ".;proto";
service Greeter { rpc Hello(HelloRequest) returns (HelloResponse); }
message HelloRequest {}
message HelloResponse {}
"#;

fn run(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(PLUGIN)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(stdin).unwrap();
    child.wait_with_output().unwrap()
}

fn service_request() -> CodeGeneratorRequest {
    let message = |name: &str| DescriptorProto {
        name: Some(name.to_owned()),
        ..Default::default()
    };

    CodeGeneratorRequest {
        file_to_generate: vec!["service.proto".to_owned()],
        proto_file: vec![FileDescriptorProto {
            name: Some("service.proto".to_owned()),
            syntax: Some("proto3".to_owned()),
            options: Some(FileOptions {
                go_package: Some(".;proto".to_owned()),
                ..Default::default()
            }),
            service: vec![ServiceDescriptorProto {
                name: Some("Greeter".to_owned()),
                method: vec![MethodDescriptorProto {
                    name: Some("Hello".to_owned()),
                    input_type: Some(".HelloRequest".to_owned()),
                    output_type: Some(".HelloResponse".to_owned()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            message_type: vec![message("HelloRequest"), message("HelloResponse")],
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[test]
fn test_plugin_generates_service() {
    let output = run(&[], &service_request().encode_to_vec());
    assert!(output.status.success());

    let response = CodeGeneratorResponse::decode(output.stdout.as_slice()).unwrap();
    assert_eq!(None, response.error);
    assert_eq!("service_grpc.pb.go", response.file[0].name());
    assert!(response.file[0]
        .content()
        .starts_with("// Code generated by protoc-gen-go-extend. DO NOT EDIT.\n"));
}

#[test]
fn test_plugin_reports_generation_errors_in_response() {
    let request = CodeGeneratorRequest {
        parameter: Some("paths=absolute".to_owned()),
        ..service_request()
    };

    let output = run(&[], &request.encode_to_vec());
    assert!(output.status.success());

    let response = CodeGeneratorResponse::decode(output.stdout.as_slice()).unwrap();
    assert!(response.file.is_empty());
    assert_eq!(
        Some("invalid parameter \"paths\": expected `import` or `source_relative`"),
        response.error.as_deref()
    );
}

#[test]
fn test_plugin_rejects_garbage() {
    let output = run(&[], b"\xff\xff\xff");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("protoc-gen-go-extend: failed to decode the code generator request"));
}

#[test]
fn test_version() {
    for flag in ["--version", "-v"] {
        let output = run(&[flag], b"");
        assert!(output.status.success());
        assert_eq!(
            format!("protoc-gen-go-extend {}\n", env!("CARGO_PKG_VERSION")),
            String::from_utf8(output.stdout).unwrap()
        );
    }
}

#[test]
fn test_unexpected_arguments() {
    let output = run(&["--go-extend_out=."], b"");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("this program is a protoc plugin"));
}

fn protoc_available() -> bool {
    Command::new("protoc")
        .arg("--version")
        .output()
        .map_or(false, |output| output.status.success())
}

#[test]
fn test_protoc_end_to_end() {
    if !protoc_available() {
        eprintln!("protoc not found; skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("service.proto"), SERVICE_PROTO).unwrap();

    let status = Command::new("protoc")
        .current_dir(dir.path())
        .arg(format!("--plugin=protoc-gen-go-extend={}", PLUGIN))
        .arg("--go-extend_out=.")
        .arg("service.proto")
        .status()
        .unwrap();
    assert!(status.success());

    assert!(dir.path().join("service_grpc.pb.go").is_file());
    assert!(dir.path().join("service_extend.pb.go").is_file());
}

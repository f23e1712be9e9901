use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use log::debug;
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;

use go_extend_build::{PLUGIN_NAME, VERSION};

fn main() {
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = faillible_main() {
        eprintln!("{}: {:#}", PLUGIN_NAME, e);
        std::process::exit(1);
    }
}

fn faillible_main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    if let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-v" if args.next().is_none() => {
                println!("{} {}", PLUGIN_NAME, VERSION);
                return Ok(());
            }
            _ => bail!(
                "this program is a protoc plugin, run it through protoc: \
                 protoc --plugin={} --go-extend_out=<dir> <file.proto>",
                PLUGIN_NAME
            ),
        }
    }

    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("failed to read the code generator request from stdin")?;

    let req = CodeGeneratorRequest::decode(buf.as_slice())
        .context("failed to decode the code generator request")?;
    debug!(
        "request: {} file(s) to generate, parameter {:?}",
        req.file_to_generate.len(),
        req.parameter()
    );

    let res = go_extend_build::run_plugin(req);

    buf.clear();
    res.encode(&mut buf)
        .context("failed to encode the code generator response")?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&buf)
        .and_then(|()| stdout.flush())
        .context("failed to write the code generator response to stdout")?;

    Ok(())
}

use std::time::Duration;

use clap::Args;
use prototool_core::Failure;
use prototool_grpc::{invoke, CallConfig, CallInput};

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops;

#[derive(Args)]
pub struct GrpcArgs {
    #[command(flatten)]
    pub dir: DirArgs,
    /// host:port to dial
    #[arg(long)]
    pub address: String,
    /// Fully-qualified method, package.Service/Method
    #[arg(long)]
    pub method: String,
    /// A single JSON request message
    #[arg(long, conflicts_with = "stdin")]
    pub data: Option<String>,
    /// Read line-delimited JSON request messages from stdin
    #[arg(long)]
    pub stdin: bool,
    /// Header to send, as key:value; repeatable
    #[arg(long = "headers", value_name = "KEY:VALUE")]
    pub headers: Vec<String>,
    /// Call timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub call_timeout: u64,
    /// Connect timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,
    /// HTTP/2 keepalive ping interval in seconds
    #[arg(long)]
    pub keepalive_time: Option<u64>,
}

pub async fn run(args: GrpcArgs, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let input = match (&args.data, args.stdin) {
        (Some(data), false) => CallInput::Data(data.clone()),
        (None, true) => CallInput::Stdin,
        _ => anyhow::bail!("grpc requires exactly one of --data or --stdin"),
    };

    let mut headers = Vec::with_capacity(args.headers.len());
    for header in &args.headers {
        let Some((key, value)) = header.split_once(':') else {
            anyhow::bail!("invalid header {header:?}: expected key:value");
        };
        headers.push((key.trim().to_string(), value.trim().to_string()));
    }

    let workspace = ops::discover_input(args.dir.dir_or_file.as_deref(), flags)?;
    let results = ops::compile_workspace(flags, &workspace).await?;
    let failures: Vec<Failure> = results.iter().flat_map(|r| r.failures.clone()).collect();
    if !failures.is_empty() {
        return Ok(failures);
    }
    let descriptors = ops::merged_descriptor_set(&results);

    let config = CallConfig {
        address: args.address.clone(),
        method: args.method.clone(),
        headers,
        call_timeout: Duration::from_secs(args.call_timeout),
        connect_timeout: Duration::from_secs(args.connect_timeout),
        keepalive: args.keepalive_time.map(Duration::from_secs),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    invoke(descriptors, &config, input, &mut out).await?;
    Ok(Vec::new())
}

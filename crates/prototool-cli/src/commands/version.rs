use prototool_config::DEFAULT_PROTOC_VERSION;
use prototool_core::{ErrorFormat, Failure};

use crate::commands::GlobalFlags;

pub fn run(flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    if flags.failure_format() == ErrorFormat::Json {
        println!(
            "{}",
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "default_protoc_version": DEFAULT_PROTOC_VERSION,
            })
        );
    } else {
        println!("Version:                 {}", env!("CARGO_PKG_VERSION"));
        println!("Default protoc version:  {DEFAULT_PROTOC_VERSION}");
    }
    Ok(Vec::new())
}

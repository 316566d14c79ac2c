use crate::config::AptosConfig;
use movepack_runtime::{PUBLISH_ARGS, TOOLCHAIN_BINARY};
use movepack_store::ProcessDescriptor;

/// Launch processes contributed to the image: a default `aptos` process
/// publishing the package when enabled, otherwise none.
pub fn build_process_types(config: &AptosConfig) -> Vec<ProcessDescriptor> {
    if !config.enable_process {
        return Vec::new();
    }
    vec![ProcessDescriptor {
        process_type: TOOLCHAIN_BINARY.to_owned(),
        command: TOOLCHAIN_BINARY.to_owned(),
        args: PUBLISH_ARGS.iter().map(|a| (*a).to_owned()).collect(),
        default: true,
    }]
}

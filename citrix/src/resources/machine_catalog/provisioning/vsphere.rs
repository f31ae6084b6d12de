//! vSphere machine config

use tf_provider::Diagnostic;
use tfplug::schema::AttributeType;

use super::{build_vm_image, config_error, parse_vm_image, vm_image_schema, TranslationContext, VmImageConfig};
use crate::api::machine_catalogs::{ProvisioningSchemeRequest, ProvisioningSchemeResponse};

pub const BLOCK: &str = "vsphere_machine_config";

pub type VsphereMachineConfig = VmImageConfig;

pub fn schema() -> AttributeType {
    vm_image_schema("vSphere")
}

pub fn build(
    config: &VsphereMachineConfig,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    // ESXi rejects VM memory that is not a multiple of 4 MB
    if let Some(memory) = super::known(&config.memory_mb) {
        if memory % 4 != 0 {
            return Err(config_error(
                BLOCK,
                "memory_mb",
                format!("memory_mb must be a multiple of 4, got {}", memory),
            ));
        }
    }
    build_vm_image(BLOCK, config, ctx, request)
}

pub fn parse(
    prior: Option<&VsphereMachineConfig>,
    response: &ProvisioningSchemeResponse,
) -> VsphereMachineConfig {
    parse_vm_image(prior, response)
}

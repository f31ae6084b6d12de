//! SCVMM (Hyper-V) machine config

use tf_provider::Diagnostic;
use tfplug::schema::AttributeType;

use super::{build_vm_image, config_error, known_str, parse_vm_image, vm_image_schema, TranslationContext, VmImageConfig};
use crate::api::machine_catalogs::{ProvisioningSchemeRequest, ProvisioningSchemeResponse};

pub const BLOCK: &str = "scvmm_machine_config";

pub type ScvmmMachineConfig = VmImageConfig;

pub fn schema() -> AttributeType {
    vm_image_schema("SCVMM")
}

pub fn build(
    config: &ScvmmMachineConfig,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    if let Some(wbc) = config.writeback_cache.as_ref_option() {
        if known_str(&wbc.writeback_cache_drive_letter).is_some() {
            return Err(config_error(
                BLOCK,
                "writeback_cache",
                "writeback_cache_drive_letter is not supported on SCVMM",
            ));
        }
    }
    build_vm_image(BLOCK, config, ctx, request)
}

pub fn parse(
    prior: Option<&ScvmmMachineConfig>,
    response: &ProvisioningSchemeResponse,
) -> ScvmmMachineConfig {
    parse_vm_image(prior, response)
}

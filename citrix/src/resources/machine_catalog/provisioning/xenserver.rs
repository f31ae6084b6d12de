//! XenServer machine config

use tf_provider::Diagnostic;
use tfplug::schema::AttributeType;

use super::{build_vm_image, config_error, known_str, parse_vm_image, vm_image_schema, TranslationContext, VmImageConfig};
use crate::api::machine_catalogs::{ProvisioningSchemeRequest, ProvisioningSchemeResponse};

pub const BLOCK: &str = "xenserver_machine_config";

pub type XenserverMachineConfig = VmImageConfig;

pub fn schema() -> AttributeType {
    vm_image_schema("XenServer")
}

pub fn build(
    config: &XenserverMachineConfig,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    if let Some(wbc) = config.writeback_cache.as_ref_option() {
        if known_str(&wbc.writeback_cache_drive_letter).is_some() {
            return Err(config_error(
                BLOCK,
                "writeback_cache",
                "writeback_cache_drive_letter is not supported on XenServer",
            ));
        }
    }
    build_vm_image(BLOCK, config, ctx, request)
}

pub fn parse(
    prior: Option<&XenserverMachineConfig>,
    response: &ProvisioningSchemeResponse,
) -> XenserverMachineConfig {
    parse_vm_image(prior, response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::machine_catalog::provisioning::VmWritebackCache;
    use tf_provider::value::Value;

    fn config() -> XenserverMachineConfig {
        XenserverMachineConfig {
            master_image_vm: Value::Value("win11".to_string()),
            image_snapshot: Value::Value("sealed".to_string()),
            cpu_count: Value::Value(2),
            memory_mb: Value::Value(4096),
            ..Default::default()
        }
    }

    #[test]
    fn test_drive_letter_rejected() {
        let mut config = config();
        config.writeback_cache = Value::Value(VmWritebackCache {
            writeback_cache_disk_size_gb: Value::Value(20),
            writeback_cache_memory_size_mb: Value::Null,
            writeback_cache_drive_letter: Value::Value("W".to_string()),
        });

        assert!(build(
            &config,
            &TranslationContext::default(),
            &mut ProvisioningSchemeRequest::default()
        )
        .is_err());
    }

    #[test]
    fn test_build_snapshot_path() {
        let ctx = TranslationContext {
            hosting_unit: "xen".to_string(),
            ..Default::default()
        };
        let mut request = ProvisioningSchemeRequest::default();
        build(&config(), &ctx, &mut request).unwrap();
        assert_eq!(
            request.master_image_path,
            r"XDHyp:\HostingUnits\xen\win11.vm\sealed.snapshot"
        );
    }
}

//! Google Cloud machine config

use serde::{Deserialize, Serialize};
use tf_provider::value::Value;
use tf_provider::Diagnostic;
use tfplug::schema::{AttributeBuilder, AttributeType, NestedAttributeBuilder};

use super::{config_error, known_str, refresh, required_str, required_value, TranslationContext};
use crate::api::common::{find_property, set_property};
use crate::api::machine_catalogs::{ProvisioningSchemeRequest, ProvisioningSchemeResponse};
use crate::xdpath::{self, XdPath};

pub const BLOCK: &str = "gcp_machine_config";
pub const STORAGE_TYPES: &[&str] = &["pd-standard", "pd-balanced", "pd-ssd"];

const STORAGE_TYPE: &str = "StorageType";
const CATALOG_ZONES: &str = "CatalogZones";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcpMachineConfig {
    pub master_image: Value<String>,
    pub machine_profile: Value<String>,
    pub machine_snapshot: Value<String>,
    pub master_image_note: Value<String>,
    pub storage_type: Value<String>,
}

pub fn schema() -> AttributeType {
    NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("master_image", AttributeType::String)
                .description("Name of the VM used as master image")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("machine_profile", AttributeType::String)
                .description("Name of the VM whose properties the provisioned machines inherit")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("machine_snapshot", AttributeType::String)
                .description("Snapshot of the master image VM to provision from")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("master_image_note", AttributeType::String)
                .description("Note attached to the master image version")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("storage_type", AttributeType::String)
                .description("Persistent disk type: pd-standard, pd-balanced or pd-ssd")
                .optional()
                .build(),
        )
        .build()
}

pub fn build(
    config: &GcpMachineConfig,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    let vm = required_str(&config.master_image, BLOCK, "master_image")?;
    let image = xdpath::snapshot_chain(vm, known_str(&config.machine_snapshot));
    request.master_image_path = ctx.absolute(&image);
    request.master_image_note = known_str(&config.master_image_note).map(str::to_string);

    if let Some(profile) = known_str(&config.machine_profile) {
        request.machine_profile_path = Some(ctx.absolute(&xdpath::machine_profile_vm(None, profile)));
    }

    if let Some(storage) = known_str(&config.storage_type) {
        if !STORAGE_TYPES.contains(&storage) {
            return Err(config_error(
                BLOCK,
                "storage_type",
                format!("storage_type must be one of: {}", STORAGE_TYPES.join(", ")),
            ));
        }
        set_property(&mut request.custom_properties, STORAGE_TYPE, storage);
    }
    if let Some(zones) = &ctx.availability_zones {
        set_property(&mut request.custom_properties, CATALOG_ZONES, zones.as_str());
    }

    Ok(())
}

pub fn parse(prior: Option<&GcpMachineConfig>, response: &ProvisioningSchemeResponse) -> GcpMachineConfig {
    let chain = response
        .master_image
        .as_ref()
        .and_then(|image| image.xd_path.as_deref())
        .and_then(|path| XdPath::parse(path).as_snapshot_chain());
    let profile = response
        .machine_profile
        .as_ref()
        .and_then(|profile| profile.xd_path.as_deref())
        .and_then(|path| XdPath::parse(path).find(xdpath::kind::VM).map(|s| s.name.clone()));

    GcpMachineConfig {
        master_image: required_value(
            prior.map(|p| &p.master_image),
            chain.as_ref().map(|c| c.vm.clone()),
        ),
        machine_profile: refresh(prior.map(|p| &p.machine_profile), profile),
        machine_snapshot: refresh(
            prior.map(|p| &p.machine_snapshot),
            chain.and_then(|c| c.snapshots),
        ),
        master_image_note: refresh(
            prior.map(|p| &p.master_image_note),
            response.master_image_note.clone(),
        ),
        storage_type: refresh(
            prior.map(|p| &p.storage_type),
            find_property(&response.custom_properties, STORAGE_TYPE).map(str::to_string),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::common::NameValueStringPair;
    use crate::api::hypervisors::HypervisorResourceRef;

    fn ctx() -> TranslationContext {
        TranslationContext {
            hosting_unit: "gcp".to_string(),
            availability_zones: Some("us-east1-b,us-east1-c".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_with_snapshot_and_profile() {
        let config = GcpMachineConfig {
            master_image: Value::Value("gold-vm".to_string()),
            machine_profile: Value::Value("profile-vm".to_string()),
            machine_snapshot: Value::Value("snap-1".to_string()),
            master_image_note: Value::Null,
            storage_type: Value::Value("pd-ssd".to_string()),
        };

        let mut request = ProvisioningSchemeRequest::default();
        build(&config, &ctx(), &mut request).unwrap();

        assert_eq!(
            request.master_image_path,
            r"XDHyp:\HostingUnits\gcp\gold-vm.vm\snap-1.snapshot"
        );
        assert_eq!(
            request.machine_profile_path.as_deref(),
            Some(r"XDHyp:\HostingUnits\gcp\profile-vm.vm")
        );
        assert_eq!(
            find_property(&request.custom_properties, "StorageType"),
            Some("pd-ssd")
        );
        assert_eq!(
            find_property(&request.custom_properties, "CatalogZones"),
            Some("us-east1-b,us-east1-c")
        );
    }

    #[test]
    fn test_build_rejects_unknown_storage() {
        let config = GcpMachineConfig {
            master_image: Value::Value("gold-vm".to_string()),
            storage_type: Value::Value("hdd".to_string()),
            ..Default::default()
        };
        assert!(build(&config, &ctx(), &mut ProvisioningSchemeRequest::default()).is_err());
    }

    #[test]
    fn test_parse_on_import() {
        let response = ProvisioningSchemeResponse {
            master_image: Some(HypervisorResourceRef {
                xd_path: Some(r"XDHyp:\HostingUnits\gcp\gold-vm.vm".to_string()),
                ..Default::default()
            }),
            machine_profile: Some(HypervisorResourceRef {
                xd_path: Some(r"XDHyp:\HostingUnits\gcp\profile-vm.vm".to_string()),
                ..Default::default()
            }),
            custom_properties: vec![NameValueStringPair::new("StorageType", "pd-balanced")],
            ..Default::default()
        };

        let parsed = parse(None, &response);
        assert_eq!(parsed.master_image, Value::Value("gold-vm".to_string()));
        assert_eq!(parsed.machine_profile, Value::Value("profile-vm".to_string()));
        assert!(parsed.machine_snapshot.is_null());
        assert_eq!(parsed.storage_type, Value::Value("pd-balanced".to_string()));
    }
}

//! Per-hypervisor translation between the `*_machine_config` blocks and the provisioning scheme
//!
//! Every module exposes the same pair: `build` fills a [`ProvisioningSchemeRequest`] from the
//! Terraform model and `parse` maps a [`ProvisioningSchemeResponse`] back onto it. Values the
//! API does not echo are carried over from the prior state.

pub mod aws;
pub mod azure;
pub mod gcp;
pub mod nutanix;
pub mod scvmm;
pub mod vsphere;
pub mod xenserver;

use serde::{Deserialize, Serialize};
use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostic};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedAttributeBuilder};

use crate::api::common::NameValueStringPair;
use crate::api::hypervisors::{Hypervisor, HypervisorConnectionType, ResourcePool};
use crate::api::machine_catalogs::{ProvisioningSchemeRequest, ProvisioningSchemeResponse};
use crate::xdpath::{self, XdPath};

use super::model::ProvisioningSchemeModel;

/// Hypervisor facts the translators need besides the Terraform model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationContext {
    pub hosting_unit: String,
    pub resource_pool_path: String,
    pub network_parent: String,
    pub subscription_id: Option<String>,
    pub availability_zones: Option<String>,
}

impl TranslationContext {
    pub fn new(hypervisor: &Hypervisor, pool: &ResourcePool) -> Self {
        Self {
            hosting_unit: pool.name.clone(),
            resource_pool_path: pool
                .xd_path
                .clone()
                .unwrap_or_else(|| xdpath::hosting_unit_path(&pool.name)),
            network_parent: pool.network_parent_path(),
            subscription_id: hypervisor.subscription_id.clone(),
            availability_zones: None,
        }
    }

    pub fn with_availability_zones(mut self, zones: Option<String>) -> Self {
        self.availability_zones = zones;
        self
    }

    /// Absolute path of `path` under this hosting unit
    pub fn absolute(&self, path: &XdPath) -> String {
        xdpath::absolute(&self.hosting_unit, path)
    }
}

pub(crate) fn config_path(block: &'static str) -> AttributePath {
    AttributePath::new("provisioning_scheme").attribute(block)
}

pub(crate) fn config_error(block: &'static str, attribute: &'static str, detail: impl Into<String>) -> Diagnostic {
    Diagnostic::new(
        format!("Invalid {}", block),
        detail.into(),
        config_path(block).attribute(attribute),
    )
}

/// Value of a required string inside a machine config block
pub(crate) fn required_str<'a>(
    value: &'a Value<String>,
    block: &'static str,
    attribute: &'static str,
) -> Result<&'a str, Diagnostic> {
    value
        .as_deref_option()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| config_error(block, attribute, format!("{} is required", attribute)))
}

pub(crate) fn known_str(value: &Value<String>) -> Option<&str> {
    value.as_deref_option().filter(|s| !s.is_empty())
}

pub(crate) fn known<T: Copy>(value: &Value<T>) -> Option<T> {
    value.as_ref_option().copied()
}

/// Refreshed value of an optional attribute. Attributes left unset in the prior state stay
/// unset; without prior state (import) everything the API reports is taken.
pub(crate) fn refresh<T>(prior: Option<&Value<T>>, fresh: Option<T>) -> Value<T> {
    match prior {
        Some(Value::Null) => Value::Null,
        _ => fresh.into(),
    }
}

/// Same as [`refresh`] for nested objects, building the fresh object from the prior one
pub(crate) fn refresh_object<B>(
    prior: Option<&Value<B>>,
    build: impl FnOnce(Option<&B>) -> Option<B>,
) -> Value<B> {
    match prior {
        Some(Value::Null) => Value::Null,
        Some(p) => build(p.as_ref_option()).into(),
        None => build(None).into(),
    }
}

/// Fresh value for a required attribute, falling back to the prior one
pub(crate) fn required_value<T: Clone>(prior: Option<&Value<T>>, fresh: Option<T>) -> Value<T> {
    match fresh {
        Some(v) => Value::Value(v),
        None => prior.cloned().unwrap_or_default(),
    }
}

/// Parses `"true"`/`"false"` custom property values
pub(crate) fn parse_bool(value: Option<&str>) -> Option<bool> {
    value.and_then(|v| v.trim().to_ascii_lowercase().parse().ok())
}

pub(crate) fn parse_i64(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// `XDHyp:\HostingUnits\<unit>\<offering>.serviceoffering`
pub(crate) fn service_offering_path(ctx: &TranslationContext, offering: &str) -> String {
    ctx.absolute(&XdPath::new().join(offering, xdpath::kind::SERVICE_OFFERING))
}

/// Service offering name from either a bare name or an XDPath
pub(crate) fn service_offering_name(raw: &str) -> String {
    let path = XdPath::parse(raw);
    match path.find(xdpath::kind::SERVICE_OFFERING) {
        Some(segment) => segment.name.clone(),
        None => raw.to_string(),
    }
}

fn is_configured(kind: HypervisorConnectionType, scheme: &ProvisioningSchemeModel) -> bool {
    match kind {
        HypervisorConnectionType::Azure => scheme.azure_machine_config.is_value(),
        HypervisorConnectionType::Aws => scheme.aws_machine_config.is_value(),
        HypervisorConnectionType::Gcp => scheme.gcp_machine_config.is_value(),
        HypervisorConnectionType::VSphere => scheme.vsphere_machine_config.is_value(),
        HypervisorConnectionType::XenServer => scheme.xenserver_machine_config.is_value(),
        HypervisorConnectionType::Scvmm => scheme.scvmm_machine_config.is_value(),
        HypervisorConnectionType::Nutanix => scheme.nutanix_machine_config.is_value(),
    }
}

/// Connection types whose machine config block is set in `scheme`
pub fn configured_kinds(scheme: &ProvisioningSchemeModel) -> Vec<HypervisorConnectionType> {
    HypervisorConnectionType::ALL
        .into_iter()
        .filter(|kind| is_configured(*kind, scheme))
        .collect()
}

/// Names of the machine config blocks present in `scheme`
pub fn configured_blocks(scheme: &ProvisioningSchemeModel) -> Vec<&'static str> {
    configured_kinds(scheme)
        .into_iter()
        .map(|kind| kind.config_block())
        .collect()
}

fn missing_block(kind: HypervisorConnectionType) -> Diagnostic {
    Diagnostic::new(
        "Machine config does not match hypervisor",
        format!(
            "The hypervisor connection is of type {}; `{}` must be set in provisioning_scheme",
            kind,
            kind.config_block()
        ),
        AttributePath::new("provisioning_scheme"),
    )
}

/// Runs the translator for `kind` against the matching config block
pub fn build(
    kind: HypervisorConnectionType,
    scheme: &ProvisioningSchemeModel,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    match kind {
        HypervisorConnectionType::Azure => match scheme.azure_machine_config.as_ref_option() {
            Some(config) => azure::build(config, ctx, request),
            None => Err(missing_block(kind)),
        },
        HypervisorConnectionType::Aws => match scheme.aws_machine_config.as_ref_option() {
            Some(config) => aws::build(config, ctx, request),
            None => Err(missing_block(kind)),
        },
        HypervisorConnectionType::Gcp => match scheme.gcp_machine_config.as_ref_option() {
            Some(config) => gcp::build(config, ctx, request),
            None => Err(missing_block(kind)),
        },
        HypervisorConnectionType::VSphere => match scheme.vsphere_machine_config.as_ref_option() {
            Some(config) => vsphere::build(config, ctx, request),
            None => Err(missing_block(kind)),
        },
        HypervisorConnectionType::XenServer => {
            match scheme.xenserver_machine_config.as_ref_option() {
                Some(config) => xenserver::build(config, ctx, request),
                None => Err(missing_block(kind)),
            }
        }
        HypervisorConnectionType::Scvmm => match scheme.scvmm_machine_config.as_ref_option() {
            Some(config) => scvmm::build(config, ctx, request),
            None => Err(missing_block(kind)),
        },
        HypervisorConnectionType::Nutanix => match scheme.nutanix_machine_config.as_ref_option() {
            Some(config) => nutanix::build(config, ctx, request),
            None => Err(missing_block(kind)),
        },
    }
}

/// Fills the config block for `kind` on `scheme` from the API response
pub fn parse(
    kind: HypervisorConnectionType,
    prior: Option<&ProvisioningSchemeModel>,
    response: &ProvisioningSchemeResponse,
    scheme: &mut ProvisioningSchemeModel,
) {
    match kind {
        HypervisorConnectionType::Azure => {
            let prior = prior.and_then(|p| p.azure_machine_config.as_ref_option());
            scheme.azure_machine_config = Value::Value(azure::parse(prior, response));
        }
        HypervisorConnectionType::Aws => {
            let prior = prior.and_then(|p| p.aws_machine_config.as_ref_option());
            scheme.aws_machine_config = Value::Value(aws::parse(prior, response));
        }
        HypervisorConnectionType::Gcp => {
            let prior = prior.and_then(|p| p.gcp_machine_config.as_ref_option());
            scheme.gcp_machine_config = Value::Value(gcp::parse(prior, response));
        }
        HypervisorConnectionType::VSphere => {
            let prior = prior.and_then(|p| p.vsphere_machine_config.as_ref_option());
            scheme.vsphere_machine_config = Value::Value(vsphere::parse(prior, response));
        }
        HypervisorConnectionType::XenServer => {
            let prior = prior.and_then(|p| p.xenserver_machine_config.as_ref_option());
            scheme.xenserver_machine_config = Value::Value(xenserver::parse(prior, response));
        }
        HypervisorConnectionType::Scvmm => {
            let prior = prior.and_then(|p| p.scvmm_machine_config.as_ref_option());
            scheme.scvmm_machine_config = Value::Value(scvmm::parse(prior, response));
        }
        HypervisorConnectionType::Nutanix => {
            let prior = prior.and_then(|p| p.nutanix_machine_config.as_ref_option());
            scheme.nutanix_machine_config = Value::Value(nutanix::parse(prior, response));
        }
    }
}

/// Master image, machine profile and service offering, the parts `$UpdateProvisioningScheme` changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSelection {
    pub master_image_path: String,
    pub master_image_note: Option<String>,
    pub machine_profile_path: Option<String>,
    pub service_offering_path: Option<String>,
}

impl From<&ProvisioningSchemeRequest> for ImageSelection {
    fn from(request: &ProvisioningSchemeRequest) -> Self {
        Self {
            master_image_path: request.master_image_path.clone(),
            master_image_note: request.master_image_note.clone(),
            machine_profile_path: request.machine_profile_path.clone(),
            service_offering_path: request.service_offering_path.clone(),
        }
    }
}

/// Sizing, writeback cache and custom properties, the parts a catalog PATCH changes in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeSettings {
    pub cpu_count: Option<i64>,
    pub cores_per_cpu_count: Option<i64>,
    pub memory_mb: Option<i64>,
    pub use_write_back_cache: Option<bool>,
    pub write_back_cache_disk_size_gb: Option<i64>,
    pub write_back_cache_memory_size_mb: Option<i64>,
    pub write_back_cache_drive_letter: Option<String>,
    pub custom_properties: Vec<NameValueStringPair>,
}

impl From<&ProvisioningSchemeRequest> for SchemeSettings {
    fn from(request: &ProvisioningSchemeRequest) -> Self {
        Self {
            cpu_count: request.cpu_count,
            cores_per_cpu_count: request.cores_per_cpu_count,
            memory_mb: request.memory_mb,
            use_write_back_cache: request.use_write_back_cache,
            write_back_cache_disk_size_gb: request.write_back_cache_disk_size_gb,
            write_back_cache_memory_size_mb: request.write_back_cache_memory_size_mb,
            write_back_cache_drive_letter: request.write_back_cache_drive_letter.clone(),
            custom_properties: request.custom_properties.clone(),
        }
    }
}

/// Writeback cache shared by the on-premises hypervisors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmWritebackCache {
    pub writeback_cache_disk_size_gb: Value<i64>,
    pub writeback_cache_memory_size_mb: Value<i64>,
    pub writeback_cache_drive_letter: Value<String>,
}

/// Machine config for hypervisors that image from a VM snapshot chain
/// (vSphere, XenServer and SCVMM)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmImageConfig {
    pub master_image_vm: Value<String>,
    pub image_snapshot: Value<String>,
    pub master_image_note: Value<String>,
    pub cpu_count: Value<i64>,
    pub memory_mb: Value<i64>,
    pub writeback_cache: Value<VmWritebackCache>,
}

pub(crate) fn vm_image_schema(hypervisor: &str) -> AttributeType {
    let writeback_cache = NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("writeback_cache_disk_size_gb", AttributeType::Number)
                .description("Size of the writeback cache disk in GB")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("writeback_cache_memory_size_mb", AttributeType::Number)
                .description("Size of the in-memory writeback cache in MB")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("writeback_cache_drive_letter", AttributeType::String)
                .description("Drive letter of the writeback cache disk")
                .optional()
                .build(),
        )
        .build();

    NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("master_image_vm", AttributeType::String)
                .description(&format!("Name of the {} VM used as master image", hypervisor))
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("image_snapshot", AttributeType::String)
                .description("Snapshot of the master image VM, nested snapshots separated by `/`")
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
            AttributeBuilder::new("cpu_count", AttributeType::Number)
                .description("Number of vCPUs for each machine")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("memory_mb", AttributeType::Number)
                .description("Memory of each machine in MB")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("writeback_cache", writeback_cache)
                .description("Writeback cache settings")
                .optional()
                .build(),
        )
        .build()
}

/// Shared `build` for snapshot-chain hypervisors
pub(crate) fn build_vm_image(
    block: &'static str,
    config: &VmImageConfig,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    let vm = required_str(&config.master_image_vm, block, "master_image_vm")?;
    let image = xdpath::snapshot_chain(vm, known_str(&config.image_snapshot));
    request.master_image_path = ctx.absolute(&image);
    request.master_image_note = known_str(&config.master_image_note).map(str::to_string);

    let cpu_count = known(&config.cpu_count)
        .ok_or_else(|| config_error(block, "cpu_count", "cpu_count is required"))?;
    if cpu_count < 1 {
        return Err(config_error(block, "cpu_count", "cpu_count must be at least 1"));
    }
    let memory_mb = known(&config.memory_mb)
        .ok_or_else(|| config_error(block, "memory_mb", "memory_mb is required"))?;
    request.cpu_count = Some(cpu_count);
    request.memory_mb = Some(memory_mb);

    if let Some(wbc) = config.writeback_cache.as_ref_option() {
        request.use_write_back_cache = Some(true);
        request.write_back_cache_disk_size_gb = known(&wbc.writeback_cache_disk_size_gb);
        request.write_back_cache_memory_size_mb = known(&wbc.writeback_cache_memory_size_mb);
        request.write_back_cache_drive_letter =
            known_str(&wbc.writeback_cache_drive_letter).map(str::to_string);
    }

    Ok(())
}

/// Shared `parse` for snapshot-chain hypervisors
pub(crate) fn parse_vm_image(
    prior: Option<&VmImageConfig>,
    response: &ProvisioningSchemeResponse,
) -> VmImageConfig {
    let chain = response
        .master_image
        .as_ref()
        .and_then(|image| image.xd_path.as_deref())
        .map(XdPath::parse)
        .and_then(|path| path.as_snapshot_chain());

    let writeback_cache = refresh_object(prior.map(|p| &p.writeback_cache), |prior_wbc| {
        let disk = response.write_back_cache_disk_size_gb.filter(|size| *size > 0)?;
        Some(VmWritebackCache {
            writeback_cache_disk_size_gb: Value::Value(disk),
            writeback_cache_memory_size_mb: refresh(
                prior_wbc.map(|w| &w.writeback_cache_memory_size_mb),
                response.write_back_cache_memory_size_mb,
            ),
            writeback_cache_drive_letter: refresh(
                prior_wbc.map(|w| &w.writeback_cache_drive_letter),
                response.write_back_cache_drive_letter.clone(),
            ),
        })
    });

    VmImageConfig {
        master_image_vm: required_value(
            prior.map(|p| &p.master_image_vm),
            chain.as_ref().map(|c| c.vm.clone()),
        ),
        image_snapshot: refresh(
            prior.map(|p| &p.image_snapshot),
            chain.and_then(|c| c.snapshots),
        ),
        master_image_note: refresh(
            prior.map(|p| &p.master_image_note),
            response.master_image_note.clone(),
        ),
        cpu_count: required_value(prior.map(|p| &p.cpu_count), response.cpu_count),
        memory_mb: required_value(prior.map(|p| &p.memory_mb), response.memory_mb),
        writeback_cache,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::hypervisors::{ConnectionType, HypervisorResourceRef};

    fn vm_config() -> VmImageConfig {
        VmImageConfig {
            master_image_vm: Value::Value("gold".to_string()),
            image_snapshot: Value::Value("base/patched".to_string()),
            cpu_count: Value::Value(2),
            memory_mb: Value::Value(4096),
            ..Default::default()
        }
    }

    fn ctx() -> TranslationContext {
        TranslationContext {
            hosting_unit: "pool".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_context_from_pool() {
        let hypervisor = Hypervisor {
            id: "h1".to_string(),
            name: "azure".to_string(),
            connection_type: ConnectionType::AzureRM,
            plugin_id: None,
            zone: None,
            subscription_id: Some("sub".to_string()),
        };
        let pool = ResourcePool {
            id: "p1".to_string(),
            name: "pool".to_string(),
            xd_path: None,
            virtual_network: Some(HypervisorResourceRef {
                xd_path: Some(r"XDHyp:\HostingUnits\pool\east.region\vnet.virtualprivatecloud".to_string()),
                ..Default::default()
            }),
            networks: vec![],
            region: None,
            project: None,
        };

        let ctx = TranslationContext::new(&hypervisor, &pool);
        assert_eq!(ctx.resource_pool_path, r"XDHyp:\HostingUnits\pool");
        assert_eq!(
            ctx.network_parent,
            r"XDHyp:\HostingUnits\pool\east.region\vnet.virtualprivatecloud"
        );
        assert_eq!(ctx.subscription_id.as_deref(), Some("sub"));
    }

    #[test]
    fn test_refresh_respects_prior_null() {
        assert_eq!(refresh(Some(&Value::Null), Some(1)), Value::Null);
        assert_eq!(refresh(Some(&Value::Value(2)), Some(1)), Value::Value(1));
        assert_eq!(refresh(Some(&Value::Value(2)), None::<i64>), Value::Null);
        assert_eq!(refresh(None, Some(1)), Value::Value(1));
    }

    #[test]
    fn test_required_value_falls_back_to_prior() {
        assert_eq!(required_value(Some(&Value::Value(2)), None), Value::Value(2));
        assert_eq!(required_value(Some(&Value::Value(2)), Some(3)), Value::Value(3));
        assert_eq!(required_value::<i64>(None, None), Value::Null);
    }

    #[test]
    fn test_build_vm_image() {
        let mut request = ProvisioningSchemeRequest::default();
        let mut config = vm_config();
        config.writeback_cache = Value::Value(VmWritebackCache {
            writeback_cache_disk_size_gb: Value::Value(40),
            writeback_cache_memory_size_mb: Value::Value(256),
            writeback_cache_drive_letter: Value::Value("D".to_string()),
        });

        build_vm_image("vsphere_machine_config", &config, &ctx(), &mut request).unwrap();

        assert_eq!(
            request.master_image_path,
            r"XDHyp:\HostingUnits\pool\gold.vm\base.snapshot\patched.snapshot"
        );
        assert_eq!(request.cpu_count, Some(2));
        assert_eq!(request.memory_mb, Some(4096));
        assert_eq!(request.use_write_back_cache, Some(true));
        assert_eq!(request.write_back_cache_disk_size_gb, Some(40));
        assert_eq!(request.write_back_cache_drive_letter.as_deref(), Some("D"));
    }

    #[test]
    fn test_build_vm_image_rejects_zero_cpus() {
        let mut config = vm_config();
        config.cpu_count = Value::Value(0);

        let err = build_vm_image(
            "vsphere_machine_config",
            &config,
            &ctx(),
            &mut ProvisioningSchemeRequest::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.attribute,
            AttributePath::new("provisioning_scheme")
                .attribute("vsphere_machine_config")
                .attribute("cpu_count")
        );
    }

    #[test]
    fn test_parse_vm_image_on_import() {
        let response = ProvisioningSchemeResponse {
            master_image: Some(HypervisorResourceRef {
                xd_path: Some(r"XDHyp:\HostingUnits\pool\gold.vm\base.snapshot".to_string()),
                ..Default::default()
            }),
            cpu_count: Some(4),
            memory_mb: Some(8192),
            write_back_cache_disk_size_gb: Some(0),
            ..Default::default()
        };

        let parsed = parse_vm_image(None, &response);
        assert_eq!(parsed.master_image_vm, Value::Value("gold".to_string()));
        assert_eq!(parsed.image_snapshot, Value::Value("base".to_string()));
        assert_eq!(parsed.cpu_count, Value::Value(4));
        assert!(parsed.writeback_cache.is_null());
    }

    #[test]
    fn test_configured_blocks() {
        let scheme = ProvisioningSchemeModel {
            vsphere_machine_config: Value::Value(vm_config()),
            nutanix_machine_config: Value::Value(Default::default()),
            ..Default::default()
        };
        assert_eq!(
            configured_blocks(&scheme),
            vec!["vsphere_machine_config", "nutanix_machine_config"]
        );
    }
}

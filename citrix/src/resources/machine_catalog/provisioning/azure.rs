//! Azure Resource Manager machine config

use serde::{Deserialize, Serialize};
use tf_provider::value::Value;
use tf_provider::Diagnostic;
use tfplug::schema::{AttributeBuilder, AttributeType, NestedAttributeBuilder};

use super::{
    config_error, known, known_str, parse_bool, parse_i64, refresh, refresh_object, required_str,
    required_value, service_offering_name, service_offering_path, TranslationContext,
};
use crate::api::common::{find_property, set_property};
use crate::api::machine_catalogs::{ProvisioningSchemeRequest, ProvisioningSchemeResponse};
use crate::xdpath::{self, kind, XdPath};

pub const BLOCK: &str = "azure_machine_config";
pub const STORAGE_TYPES: &[&str] = &[
    "Standard_LRS",
    "StandardSSD_LRS",
    "Premium_LRS",
    "Azure_Ephemeral_OS_Disk",
];
pub const LICENSE_TYPES: &[&str] = &["Windows_Client", "Windows_Server"];

mod property {
    pub const STORAGE_TYPE: &str = "StorageType";
    pub const USE_MANAGED_DISKS: &str = "UseManagedDisks";
    pub const RESOURCE_GROUPS: &str = "ResourceGroups";
    pub const LICENSE_TYPE: &str = "LicenseType";
    pub const USE_SHARED_IMAGE_GALLERY: &str = "UseSharedImageGallery";
    pub const GALLERY_REPLICA_RATIO: &str = "SharedImageGalleryReplicaRatio";
    pub const GALLERY_REPLICA_MAXIMUM: &str = "SharedImageGalleryReplicaMaximum";
    pub const PERSIST_WBC: &str = "PersistWBC";
    pub const WBC_DISK_STORAGE_TYPE: &str = "WBCDiskStorageType";
    pub const PERSIST_OS_DISK: &str = "PersistOsDisk";
    pub const PERSIST_VM: &str = "PersistVm";
    pub const STORAGE_TYPE_AT_SHUTDOWN: &str = "StorageTypeAtShutdown";
    pub const DISK_ENCRYPTION_SET_ID: &str = "DiskEncryptionSetId";
    pub const ZONES: &str = "Zones";
}

const INTUNE: &str = "Intune";
const COST_SAVING_STORAGE: &str = "Standard_LRS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryImageModel {
    pub gallery: Value<String>,
    pub definition: Value<String>,
    pub version: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureMasterImage {
    pub resource_group: Value<String>,
    pub shared_subscription: Value<String>,
    pub master_image: Value<String>,
    pub storage_account: Value<String>,
    pub container: Value<String>,
    pub gallery_image: Value<GalleryImageModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzurePvsConfiguration {
    pub pvs_site_id: Value<String>,
    pub pvs_vdisk_id: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureComputeGallery {
    pub replica_ratio: Value<i64>,
    pub replica_maximum: Value<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureMachineProfile {
    pub machine_profile_vm_name: Value<String>,
    pub machine_profile_template_spec_name: Value<String>,
    pub machine_profile_template_spec_version: Value<String>,
    pub machine_profile_resource_group: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureWritebackCache {
    pub wbc_disk_storage_type: Value<String>,
    pub persist_wbc: Value<bool>,
    pub persist_os_disk: Value<bool>,
    pub persist_vm: Value<bool>,
    pub storage_cost_saving: Value<bool>,
    pub writeback_cache_disk_size_gb: Value<i64>,
    pub writeback_cache_memory_size_mb: Value<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskEncryptionSet {
    pub disk_encryption_set_name: Value<String>,
    pub disk_encryption_set_resource_group: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureMachineConfig {
    pub service_offering: Value<String>,
    pub master_image_note: Value<String>,
    pub azure_master_image: Value<AzureMasterImage>,
    pub azure_pvs_configuration: Value<AzurePvsConfiguration>,
    pub vda_resource_group: Value<String>,
    pub storage_type: Value<String>,
    pub use_azure_compute_gallery: Value<AzureComputeGallery>,
    pub license_type: Value<String>,
    pub use_managed_disks: Value<bool>,
    pub machine_profile: Value<AzureMachineProfile>,
    pub writeback_cache: Value<AzureWritebackCache>,
    pub disk_encryption_set: Value<DiskEncryptionSet>,
    pub enroll_in_intune: Value<bool>,
}

fn string(name: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::new(name, AttributeType::String).description(description)
}

fn flag(name: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::new(name, AttributeType::Bool).description(description)
}

pub fn schema() -> AttributeType {
    let gallery_image = NestedAttributeBuilder::single()
        .attribute(string("gallery", "Azure Compute Gallery name").required().build())
        .attribute(string("definition", "Image definition in the gallery").required().build())
        .attribute(string("version", "Image version").required().build())
        .build();

    let master_image = NestedAttributeBuilder::single()
        .attribute(
            string("resource_group", "Resource group holding the master image")
                .required()
                .build(),
        )
        .attribute(
            string("shared_subscription", "Subscription the image is shared from, if not the connection's")
                .optional()
                .build(),
        )
        .attribute(
            string("master_image", "Managed disk or snapshot name, or the VHD blob name")
                .optional()
                .build(),
        )
        .attribute(string("storage_account", "Storage account of a VHD image").optional().build())
        .attribute(string("container", "Blob container of a VHD image").optional().build())
        .attribute(
            AttributeBuilder::new("gallery_image", gallery_image)
                .description("Azure Compute Gallery image version to use as master image")
                .optional()
                .build(),
        )
        .build();

    let pvs = NestedAttributeBuilder::single()
        .attribute(string("pvs_site_id", "PVS site ID").required().build())
        .attribute(string("pvs_vdisk_id", "PVS vDisk ID").required().build())
        .build();

    let compute_gallery = NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("replica_ratio", AttributeType::Number)
                .description("Machines per image replica")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("replica_maximum", AttributeType::Number)
                .description("Maximum number of image replicas")
                .required()
                .build(),
        )
        .build();

    let machine_profile = NestedAttributeBuilder::single()
        .attribute(string("machine_profile_vm_name", "VM used as machine profile").optional().build())
        .attribute(
            string("machine_profile_template_spec_name", "Template spec used as machine profile")
                .optional()
                .build(),
        )
        .attribute(
            string("machine_profile_template_spec_version", "Version of the template spec")
                .optional()
                .build(),
        )
        .attribute(
            string("machine_profile_resource_group", "Resource group of the machine profile")
                .required()
                .build(),
        )
        .build();

    let writeback_cache = NestedAttributeBuilder::single()
        .attribute(
            string("wbc_disk_storage_type", "Storage type of the writeback cache disk")
                .required()
                .build(),
        )
        .attribute(flag("persist_wbc", "Keep the writeback cache disk across power cycles").optional().build())
        .attribute(flag("persist_os_disk", "Keep the OS disk across power cycles").optional().build())
        .attribute(flag("persist_vm", "Keep the VM across power cycles").optional().build())
        .attribute(
            flag("storage_cost_saving", "Switch disks to Standard HDD while machines are shut down")
                .optional()
                .build(),
        )
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
        .build();

    let disk_encryption_set = NestedAttributeBuilder::single()
        .attribute(string("disk_encryption_set_name", "Disk encryption set name").required().build())
        .attribute(
            string("disk_encryption_set_resource_group", "Resource group of the disk encryption set")
                .required()
                .build(),
        )
        .build();

    NestedAttributeBuilder::single()
        .attribute(
            string("service_offering", "Azure VM size, e.g. `Standard_D2_v2`")
                .required()
                .build(),
        )
        .attribute(string("master_image_note", "Note attached to the master image version").optional().build())
        .attribute(
            AttributeBuilder::new("azure_master_image", master_image)
                .description("Master image to provision from; required for MCS")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("azure_pvs_configuration", pvs)
                .description("PVS site and vDisk; required for PVS streaming")
                .optional()
                .build(),
        )
        .attribute(string("vda_resource_group", "Existing resource group for the machines").optional().build())
        .attribute(
            string("storage_type", "OS disk storage type")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("use_azure_compute_gallery", compute_gallery)
                .description("Replicate the prepared image through an Azure Compute Gallery")
                .optional()
                .build(),
        )
        .attribute(string("license_type", "Windows_Client or Windows_Server").optional().build())
        .attribute(flag("use_managed_disks", "Use managed disks, default true").optional().build())
        .attribute(
            AttributeBuilder::new("machine_profile", machine_profile)
                .description("VM or template spec the machines inherit properties from")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("writeback_cache", writeback_cache)
                .description("Writeback cache settings")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("disk_encryption_set", disk_encryption_set)
                .description("Customer-managed key used to encrypt machine disks")
                .optional()
                .build(),
        )
        .attribute(flag("enroll_in_intune", "Enroll machines in Microsoft Intune").optional().build())
        .build()
}

fn master_image_path(image: &AzureMasterImage) -> Result<XdPath, Diagnostic> {
    let rg = required_str(&image.resource_group, BLOCK, "azure_master_image")?;

    let image_path = if let Some(gallery) = image.gallery_image.as_ref_option() {
        xdpath::azure_gallery_image(
            rg,
            required_str(&gallery.gallery, BLOCK, "azure_master_image")?,
            required_str(&gallery.definition, BLOCK, "azure_master_image")?,
            required_str(&gallery.version, BLOCK, "azure_master_image")?,
        )
    } else {
        let name = known_str(&image.master_image).ok_or_else(|| {
            config_error(
                BLOCK,
                "azure_master_image",
                "Either master_image or gallery_image must be set",
            )
        })?;
        match (known_str(&image.storage_account), known_str(&image.container)) {
            (Some(account), Some(container)) => xdpath::azure_vhd(rg, account, container, name),
            (None, None) => xdpath::azure_managed_disk(rg, name),
            _ => {
                return Err(config_error(
                    BLOCK,
                    "azure_master_image",
                    "storage_account and container must be set together",
                ))
            }
        }
    };

    Ok(match known_str(&image.shared_subscription) {
        Some(subscription) => {
            let mut path = XdPath::new().join(subscription, kind::SHARED_SUBSCRIPTION);
            path.segments.extend(image_path.segments);
            path
        }
        None => image_path,
    })
}

fn machine_profile_path(profile: &AzureMachineProfile) -> Result<XdPath, Diagnostic> {
    let rg = required_str(&profile.machine_profile_resource_group, BLOCK, "machine_profile")?;
    match (
        known_str(&profile.machine_profile_vm_name),
        known_str(&profile.machine_profile_template_spec_name),
    ) {
        (Some(vm), None) => Ok(xdpath::machine_profile_vm(Some(rg), vm)),
        (None, Some(spec)) => {
            let version = required_str(
                &profile.machine_profile_template_spec_version,
                BLOCK,
                "machine_profile",
            )?;
            Ok(xdpath::azure_template_spec(rg, spec, version))
        }
        _ => Err(config_error(
            BLOCK,
            "machine_profile",
            "Exactly one of machine_profile_vm_name or machine_profile_template_spec_name must be set",
        )),
    }
}

fn disk_encryption_set_id(subscription: &str, set: &DiskEncryptionSet) -> Result<String, Diagnostic> {
    Ok(format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/diskEncryptionSets/{}",
        subscription,
        required_str(&set.disk_encryption_set_resource_group, BLOCK, "disk_encryption_set")?,
        required_str(&set.disk_encryption_set_name, BLOCK, "disk_encryption_set")?,
    ))
}

fn parse_disk_encryption_set_id(id: &str) -> Option<DiskEncryptionSet> {
    let parts: Vec<&str> = id.trim_matches('/').split('/').collect();
    let position = |key: &str| {
        parts
            .iter()
            .position(|p| p.eq_ignore_ascii_case(key))
            .and_then(|i| parts.get(i + 1))
            .map(|s| s.to_string())
    };
    Some(DiskEncryptionSet {
        disk_encryption_set_name: Value::Value(position("diskEncryptionSets")?),
        disk_encryption_set_resource_group: Value::Value(position("resourceGroups")?),
    })
}

fn check_one_of(
    value: &Value<String>,
    allowed: &[&str],
    attribute: &'static str,
) -> Result<(), Diagnostic> {
    match known_str(value) {
        Some(v) if !allowed.contains(&v) => Err(config_error(
            BLOCK,
            attribute,
            format!("{} must be one of: {}", attribute, allowed.join(", ")),
        )),
        _ => Ok(()),
    }
}

pub fn build(
    config: &AzureMachineConfig,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    check_one_of(&config.storage_type, STORAGE_TYPES, "storage_type")?;
    check_one_of(&config.license_type, LICENSE_TYPES, "license_type")?;

    let offering = required_str(&config.service_offering, BLOCK, "service_offering")?;
    request.service_offering_path = Some(service_offering_path(ctx, offering));
    request.master_image_note = known_str(&config.master_image_note).map(str::to_string);

    match (
        config.azure_master_image.as_ref_option(),
        config.azure_pvs_configuration.as_ref_option(),
    ) {
        (_, Some(pvs)) => {
            request.pvs_site = Some(required_str(&pvs.pvs_site_id, BLOCK, "azure_pvs_configuration")?.to_string());
            request.pvs_vdisk =
                Some(required_str(&pvs.pvs_vdisk_id, BLOCK, "azure_pvs_configuration")?.to_string());
        }
        (Some(image), None) => {
            request.master_image_path = ctx.absolute(&master_image_path(image)?);
        }
        (None, None) => {
            return Err(config_error(
                BLOCK,
                "azure_master_image",
                "azure_master_image is required unless azure_pvs_configuration is set",
            ))
        }
    }

    if let Some(profile) = config.machine_profile.as_ref_option() {
        request.machine_profile_path = Some(ctx.absolute(&machine_profile_path(profile)?));
    }

    let props = &mut request.custom_properties;
    if let Some(storage) = known_str(&config.storage_type) {
        set_property(props, property::STORAGE_TYPE, storage);
    }
    set_property(
        props,
        property::USE_MANAGED_DISKS,
        known(&config.use_managed_disks).unwrap_or(true).to_string(),
    );
    if let Some(rg) = known_str(&config.vda_resource_group) {
        set_property(props, property::RESOURCE_GROUPS, rg);
    }
    if let Some(license) = known_str(&config.license_type) {
        set_property(props, property::LICENSE_TYPE, license);
    }

    match config.use_azure_compute_gallery.as_ref_option() {
        Some(gallery) => {
            set_property(props, property::USE_SHARED_IMAGE_GALLERY, "true");
            if let Some(ratio) = known(&gallery.replica_ratio) {
                set_property(props, property::GALLERY_REPLICA_RATIO, ratio.to_string());
            }
            if let Some(maximum) = known(&gallery.replica_maximum) {
                set_property(props, property::GALLERY_REPLICA_MAXIMUM, maximum.to_string());
            }
        }
        None => set_property(props, property::USE_SHARED_IMAGE_GALLERY, "false"),
    }

    if let Some(wbc) = config.writeback_cache.as_ref_option() {
        check_one_of(&wbc.wbc_disk_storage_type, STORAGE_TYPES, "writeback_cache")?;
        let props = &mut request.custom_properties;
        if let Some(storage) = known_str(&wbc.wbc_disk_storage_type) {
            set_property(props, property::WBC_DISK_STORAGE_TYPE, storage);
        }
        set_property(
            props,
            property::PERSIST_WBC,
            known(&wbc.persist_wbc).unwrap_or(false).to_string(),
        );
        set_property(
            props,
            property::PERSIST_OS_DISK,
            known(&wbc.persist_os_disk).unwrap_or(false).to_string(),
        );
        set_property(
            props,
            property::PERSIST_VM,
            known(&wbc.persist_vm).unwrap_or(false).to_string(),
        );
        if known(&wbc.storage_cost_saving).unwrap_or(false) {
            set_property(props, property::STORAGE_TYPE_AT_SHUTDOWN, COST_SAVING_STORAGE);
        }
        request.use_write_back_cache = Some(true);
        request.write_back_cache_disk_size_gb = known(&wbc.writeback_cache_disk_size_gb);
        request.write_back_cache_memory_size_mb = known(&wbc.writeback_cache_memory_size_mb);
    }

    if let Some(set) = config.disk_encryption_set.as_ref_option() {
        let subscription = ctx.subscription_id.as_deref().ok_or_else(|| {
            config_error(
                BLOCK,
                "disk_encryption_set",
                "The hypervisor connection does not report a subscription ID",
            )
        })?;
        let id = disk_encryption_set_id(subscription, set)?;
        set_property(&mut request.custom_properties, property::DISK_ENCRYPTION_SET_ID, id);
    }

    if let Some(zones) = &ctx.availability_zones {
        set_property(&mut request.custom_properties, property::ZONES, zones.as_str());
    }

    if known(&config.enroll_in_intune).unwrap_or(false) {
        request.device_management_type = Some(INTUNE.to_string());
    }

    Ok(())
}

fn parse_master_image(prior: Option<&AzureMasterImage>, path: &XdPath) -> Option<AzureMasterImage> {
    let shared_subscription = refresh(
        prior.map(|p| &p.shared_subscription),
        path.find(kind::SHARED_SUBSCRIPTION).map(|s| s.name.clone()),
    );

    if let Some(gallery) = path.as_gallery_image() {
        return Some(AzureMasterImage {
            resource_group: Value::Value(gallery.resource_group),
            shared_subscription,
            master_image: Value::Null,
            storage_account: Value::Null,
            container: Value::Null,
            gallery_image: Value::Value(GalleryImageModel {
                gallery: Value::Value(gallery.gallery),
                definition: Value::Value(gallery.definition),
                version: Value::Value(gallery.version),
            }),
        });
    }
    if let Some(vhd) = path.as_vhd() {
        return Some(AzureMasterImage {
            resource_group: Value::Value(vhd.resource_group),
            shared_subscription,
            master_image: Value::Value(vhd.blob),
            storage_account: Value::Value(vhd.storage_account),
            container: Value::Value(vhd.container),
            gallery_image: Value::Null,
        });
    }

    let resource_group = path.find(kind::RESOURCE_GROUP)?.name.clone();
    let image = path
        .find(kind::MANAGED_DISK)
        .or_else(|| path.find(kind::SNAPSHOT))?
        .name
        .clone();
    Some(AzureMasterImage {
        resource_group: Value::Value(resource_group),
        shared_subscription,
        master_image: Value::Value(image),
        storage_account: Value::Null,
        container: Value::Null,
        gallery_image: Value::Null,
    })
}

fn parse_machine_profile(path: &XdPath) -> Option<AzureMachineProfile> {
    let resource_group = path.find(kind::RESOURCE_GROUP).map(|s| s.name.clone());
    let mut profile = AzureMachineProfile {
        machine_profile_resource_group: resource_group.into(),
        ..Default::default()
    };
    if let Some(vm) = path.find(kind::VM) {
        profile.machine_profile_vm_name = Value::Value(vm.name.clone());
    } else {
        profile.machine_profile_template_spec_name =
            Value::Value(path.find(kind::TEMPLATE_SPEC)?.name.clone());
        profile.machine_profile_template_spec_version = path
            .find(kind::TEMPLATE_SPEC_VERSION)
            .map(|s| s.name.clone())
            .into();
    }
    Some(profile)
}

pub fn parse(prior: Option<&AzureMachineConfig>, response: &ProvisioningSchemeResponse) -> AzureMachineConfig {
    let props = &response.custom_properties;

    let azure_master_image = refresh_object(prior.map(|p| &p.azure_master_image), |prior_image| {
        let path = XdPath::parse(response.master_image.as_ref()?.xd_path.as_deref()?);
        parse_master_image(prior_image, &path).or_else(|| prior_image.cloned())
    });

    let azure_pvs_configuration = refresh_object(prior.map(|p| &p.azure_pvs_configuration), |_| {
        Some(AzurePvsConfiguration {
            pvs_site_id: Value::Value(response.pvs_site.clone()?),
            pvs_vdisk_id: Value::Value(response.pvs_vdisk.clone()?),
        })
    });

    let machine_profile = refresh_object(prior.map(|p| &p.machine_profile), |_| {
        let path = XdPath::parse(response.machine_profile.as_ref()?.xd_path.as_deref()?);
        parse_machine_profile(&path)
    });

    let use_azure_compute_gallery = refresh_object(prior.map(|p| &p.use_azure_compute_gallery), |_| {
        if !parse_bool(find_property(props, property::USE_SHARED_IMAGE_GALLERY))? {
            return None;
        }
        Some(AzureComputeGallery {
            replica_ratio: parse_i64(find_property(props, property::GALLERY_REPLICA_RATIO)).into(),
            replica_maximum: parse_i64(find_property(props, property::GALLERY_REPLICA_MAXIMUM)).into(),
        })
    });

    let writeback_cache = refresh_object(prior.map(|p| &p.writeback_cache), |prior_wbc| {
        if response.write_back_cache_disk_size_gb.is_some_and(|size| size > 0) {
            Some(AzureWritebackCache {
                wbc_disk_storage_type: required_value(
                    prior_wbc.map(|w| &w.wbc_disk_storage_type),
                    find_property(props, property::WBC_DISK_STORAGE_TYPE).map(str::to_string),
                ),
                persist_wbc: refresh(
                    prior_wbc.map(|w| &w.persist_wbc),
                    parse_bool(find_property(props, property::PERSIST_WBC)),
                ),
                persist_os_disk: refresh(
                    prior_wbc.map(|w| &w.persist_os_disk),
                    parse_bool(find_property(props, property::PERSIST_OS_DISK)),
                ),
                persist_vm: refresh(
                    prior_wbc.map(|w| &w.persist_vm),
                    parse_bool(find_property(props, property::PERSIST_VM)),
                ),
                storage_cost_saving: refresh(
                    prior_wbc.map(|w| &w.storage_cost_saving),
                    Some(find_property(props, property::STORAGE_TYPE_AT_SHUTDOWN).is_some()),
                ),
                writeback_cache_disk_size_gb: required_value(
                    prior_wbc.map(|w| &w.writeback_cache_disk_size_gb),
                    response.write_back_cache_disk_size_gb,
                ),
                writeback_cache_memory_size_mb: refresh(
                    prior_wbc.map(|w| &w.writeback_cache_memory_size_mb),
                    response.write_back_cache_memory_size_mb,
                ),
            })
        } else {
            None
        }
    });

    let disk_encryption_set = refresh_object(prior.map(|p| &p.disk_encryption_set), |_| {
        parse_disk_encryption_set_id(find_property(props, property::DISK_ENCRYPTION_SET_ID)?)
    });

    AzureMachineConfig {
        service_offering: required_value(
            prior.map(|p| &p.service_offering),
            response.service_offering.as_deref().map(service_offering_name),
        ),
        master_image_note: refresh(
            prior.map(|p| &p.master_image_note),
            response.master_image_note.clone(),
        ),
        azure_master_image,
        azure_pvs_configuration,
        vda_resource_group: refresh(
            prior.map(|p| &p.vda_resource_group),
            find_property(props, property::RESOURCE_GROUPS).map(str::to_string),
        ),
        storage_type: required_value(
            prior.map(|p| &p.storage_type),
            find_property(props, property::STORAGE_TYPE).map(str::to_string),
        ),
        use_azure_compute_gallery,
        license_type: refresh(
            prior.map(|p| &p.license_type),
            find_property(props, property::LICENSE_TYPE).map(str::to_string),
        ),
        use_managed_disks: refresh(
            prior.map(|p| &p.use_managed_disks),
            parse_bool(find_property(props, property::USE_MANAGED_DISKS)),
        ),
        machine_profile,
        writeback_cache,
        disk_encryption_set,
        enroll_in_intune: refresh(
            prior.map(|p| &p.enroll_in_intune),
            Some(response.device_management_type.as_deref() == Some(INTUNE)),
        ),
    }
}

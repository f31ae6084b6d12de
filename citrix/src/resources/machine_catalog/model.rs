//! Terraform model of `citrix_machine_catalog` and its mapping to API payloads

use serde::{Deserialize, Serialize};
use tf_provider::value::Value;

use super::provisioning::aws::AwsMachineConfig;
use super::provisioning::azure::AzureMachineConfig;
use super::provisioning::gcp::GcpMachineConfig;
use super::provisioning::nutanix::NutanixMachineConfig;
use super::provisioning::scvmm::ScvmmMachineConfig;
use super::provisioning::vsphere::VsphereMachineConfig;
use super::provisioning::xenserver::XenserverMachineConfig;
use super::provisioning::{
    self, known, known_str, refresh, refresh_object, required_value, SchemeSettings,
    TranslationContext,
};
use crate::api::common::NameValueStringPair;
use crate::api::hypervisors::HypervisorConnectionType;
use crate::api::machine_catalogs::{
    AddMachineRequest, CreateMachineCatalogRequest, DomainCredentials, MachineAccountCreationRules,
    MachineCatalog, NetworkMappingRequest, ProvisioningSchemeRequest, ProvisioningSchemeResponse,
    RemotePcEnrollmentScope, UpdateMachineCatalogRequest,
};
use crate::api::machines::{Machine, MachineRemoval};
use crate::xdpath::{self, XdPath};

pub const ALLOCATION_TYPES: &[&str] = &["Random", "Static"];
pub const SESSION_SUPPORT: &[&str] = &["SingleSession", "MultiSession"];
pub const PERSIST_USER_CHANGES: &[&str] = &["Discard", "OnLocal", "OnPvd"];
pub const PROVISIONING_TYPES: &[&str] = &[MCS, MANUAL, PVS_STREAMING];
pub const IDENTITY_TYPES: &[&str] = &[ACTIVE_DIRECTORY, AZURE_AD, HYBRID_AZURE_AD, WORKGROUP];
pub const NAMING_SCHEME_TYPES: &[&str] = &["Numeric", "Alphabetic"];
pub const FUNCTIONAL_LEVELS: &[&str] = &[
    "L5", "L7", "L7_6", "L7_7", "L7_8", "L7_9", "L7_20", "L7_25", "L7_34", "L7_41",
];
pub const DEFAULT_FUNCTIONAL_LEVEL: &str = "L7_20";

pub const MCS: &str = "MCS";
pub const MANUAL: &str = "Manual";
pub const PVS_STREAMING: &str = "PVSStreaming";

pub const ACTIVE_DIRECTORY: &str = "ActiveDirectory";
pub const AZURE_AD: &str = "AzureAD";
pub const HYBRID_AZURE_AD: &str = "HybridAzureAD";
pub const WORKGROUP: &str = "Workgroup";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineAccountModel {
    pub machine_account: Value<String>,
    pub machine_name: Value<String>,
    pub region: Value<String>,
    pub resource_group_name: Value<String>,
    pub project_name: Value<String>,
    pub availability_zone: Value<String>,
    pub datacenter: Value<String>,
    pub cluster: Value<String>,
    pub host: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineAccountsModel {
    pub hypervisor: Value<String>,
    pub machines: Value<Vec<MachineAccountModel>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePcOuModel {
    pub include_subfolders: Value<bool>,
    pub ou_name: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineDomainIdentityModel {
    pub domain: Value<String>,
    pub domain_ou: Value<String>,
    pub service_account: Value<String>,
    pub service_account_password: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineAccountCreationRulesModel {
    pub naming_scheme: Value<String>,
    pub naming_scheme_type: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMappingModel {
    pub network_device: Value<String>,
    pub network: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomPropertyModel {
    pub name: Value<String>,
    pub value: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningSchemeModel {
    pub hypervisor: Value<String>,
    pub hypervisor_resource_pool: Value<String>,
    pub identity_type: Value<String>,
    pub machine_domain_identity: Value<MachineDomainIdentityModel>,
    pub number_of_total_machines: Value<i64>,
    pub machine_account_creation_rules: Value<MachineAccountCreationRulesModel>,
    pub network_mapping: Value<Vec<NetworkMappingModel>>,
    pub availability_zones: Value<String>,
    pub custom_properties: Value<Vec<CustomPropertyModel>>,
    pub azure_machine_config: Value<AzureMachineConfig>,
    pub aws_machine_config: Value<AwsMachineConfig>,
    pub gcp_machine_config: Value<GcpMachineConfig>,
    pub vsphere_machine_config: Value<VsphereMachineConfig>,
    pub xenserver_machine_config: Value<XenserverMachineConfig>,
    pub scvmm_machine_config: Value<ScvmmMachineConfig>,
    pub nutanix_machine_config: Value<NutanixMachineConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineCatalogState {
    pub id: Value<String>,
    pub name: Value<String>,
    pub description: Value<String>,
    pub is_power_managed: Value<bool>,
    pub is_remote_pc: Value<bool>,
    pub allocation_type: Value<String>,
    pub session_support: Value<String>,
    pub persist_user_changes: Value<String>,
    pub provisioning_type: Value<String>,
    pub zone: Value<String>,
    pub minimum_functional_level: Value<String>,
    pub scopes: Value<Vec<Value<String>>>,
    pub machine_accounts: Value<Vec<MachineAccountsModel>>,
    pub remote_pc_ous: Value<Vec<RemotePcOuModel>>,
    pub provisioning_scheme: Value<ProvisioningSchemeModel>,
}

impl MachineCatalogState {
    pub fn provisioning_type(&self) -> &str {
        self.provisioning_type.as_deref_option().unwrap_or(MCS)
    }

    pub fn is_manual(&self) -> bool {
        self.provisioning_type() == MANUAL
    }

    pub fn scope_ids(&self) -> Vec<String> {
        self.scopes
            .iter()
            .flatten()
            .filter_map(|s| known_str(s).map(str::to_string))
            .collect()
    }

    pub fn remote_pc_scopes(&self) -> Vec<RemotePcEnrollmentScope> {
        self.remote_pc_ous
            .iter()
            .flatten()
            .filter_map(|ou| {
                Some(RemotePcEnrollmentScope {
                    ou: known_str(&ou.ou_name)?.to_string(),
                    include_subfolders: known(&ou.include_subfolders).unwrap_or(false),
                    is_organizational_unit: true,
                })
            })
            .collect()
    }

    /// What deleting the catalog, or shrinking it, does to VMs and AD accounts
    pub fn machine_removal(&self) -> MachineRemoval {
        if self.is_manual() {
            return MachineRemoval::keep_everything();
        }
        let identity = self
            .provisioning_scheme
            .as_ref_option()
            .and_then(|s| known_str(&s.identity_type));
        MachineRemoval {
            delete_vm: true,
            delete_account: matches!(identity, Some(ACTIVE_DIRECTORY) | Some(HYBRID_AZURE_AD)),
        }
    }

    pub fn create_request(
        &self,
        provisioning_scheme: Option<ProvisioningSchemeRequest>,
        machine_accounts: Vec<AddMachineRequest>,
    ) -> CreateMachineCatalogRequest {
        CreateMachineCatalogRequest {
            name: self.name.as_deref_option().unwrap_or_default().to_string(),
            description: known_str(&self.description).map(str::to_string),
            allocation_type: self
                .allocation_type
                .as_deref_option()
                .unwrap_or("Random")
                .to_string(),
            session_support: self
                .session_support
                .as_deref_option()
                .unwrap_or("MultiSession")
                .to_string(),
            persist_user_changes: self
                .persist_user_changes
                .as_deref_option()
                .unwrap_or("Discard")
                .to_string(),
            provisioning_type: self.provisioning_type().to_string(),
            is_power_managed: known(&self.is_power_managed).unwrap_or(!self.is_manual()),
            is_remote_pc: known(&self.is_remote_pc).unwrap_or(false),
            minimum_functional_level: self
                .minimum_functional_level
                .as_deref_option()
                .unwrap_or(DEFAULT_FUNCTIONAL_LEVEL)
                .to_string(),
            zone: known_str(&self.zone).map(str::to_string),
            scopes: self.scope_ids(),
            machine_accounts,
            remote_pc_enrollment_scopes: self.remote_pc_scopes(),
            provisioning_scheme,
        }
    }

    /// PATCH body carrying only the fields that differ from `prior`
    ///
    /// `settings` pairs the translated in-place settings of the prior and planned schemes. A
    /// missing prior sends every planned setting.
    pub fn update_request(
        &self,
        prior: &MachineCatalogState,
        network_mapping: Option<Vec<NetworkMappingRequest>>,
        settings: Option<(Option<&SchemeSettings>, &SchemeSettings)>,
    ) -> UpdateMachineCatalogRequest {
        fn changed<T: PartialEq + Clone>(planned: &Value<T>, prior: &Value<T>) -> Option<T> {
            match planned {
                Value::Value(v) if planned != prior => Some(v.clone()),
                _ => None,
            }
        }

        let mut request = UpdateMachineCatalogRequest {
            name: changed(&self.name, &prior.name),
            description: match (&self.description, &prior.description) {
                (Value::Null, Value::Value(_)) => Some(String::new()),
                (planned, prior) => changed(planned, prior),
            },
            is_power_managed: changed(&self.is_power_managed, &prior.is_power_managed),
            minimum_functional_level: changed(
                &self.minimum_functional_level,
                &prior.minimum_functional_level,
            ),
            zone: changed(&self.zone, &prior.zone),
            scopes: (self.scope_ids() != prior.scope_ids()).then(|| self.scope_ids()),
            remote_pc_enrollment_scopes: (self.remote_pc_scopes() != prior.remote_pc_scopes())
                .then(|| self.remote_pc_scopes()),
            network_mapping,
            ..Default::default()
        };

        if let Some((before, after)) = settings {
            let reported = prior
                .provisioning_scheme
                .as_ref_option()
                .map(|s| s.reported_custom_properties())
                .unwrap_or_default();
            apply_settings(&mut request, &reported, before, after);
        }
        request
    }
}

fn setting<T: PartialEq + Clone>(before: Option<&Option<T>>, after: &Option<T>) -> Option<T> {
    match before {
        Some(before) if before == after => None,
        _ => after.clone(),
    }
}

fn apply_settings(
    request: &mut UpdateMachineCatalogRequest,
    reported: &[NameValueStringPair],
    before: Option<&SchemeSettings>,
    after: &SchemeSettings,
) {
    request.cpu_count = setting(before.map(|b| &b.cpu_count), &after.cpu_count);
    request.cores_per_cpu_count = setting(
        before.map(|b| &b.cores_per_cpu_count),
        &after.cores_per_cpu_count,
    );
    request.memory_mb = setting(before.map(|b| &b.memory_mb), &after.memory_mb);

    if before.map(|b| b.use_write_back_cache) != Some(after.use_write_back_cache) {
        request.use_write_back_cache = Some(after.use_write_back_cache.unwrap_or(false));
    }
    request.write_back_cache_disk_size_gb = setting(
        before.map(|b| &b.write_back_cache_disk_size_gb),
        &after.write_back_cache_disk_size_gb,
    );
    request.write_back_cache_memory_size_mb = setting(
        before.map(|b| &b.write_back_cache_memory_size_mb),
        &after.write_back_cache_memory_size_mb,
    );
    request.write_back_cache_drive_letter = setting(
        before.map(|b| &b.write_back_cache_drive_letter),
        &after.write_back_cache_drive_letter,
    );

    let managed = before.map(|b| b.custom_properties.as_slice());
    if managed != Some(after.custom_properties.as_slice()) {
        request.custom_properties = Some(merge_custom_properties(
            reported,
            managed.unwrap_or_default(),
            &after.custom_properties,
        ));
    }
}

fn find_pair<'p>(props: &'p [NameValueStringPair], name: &str) -> Option<&'p NameValueStringPair> {
    props.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Custom properties to send when the managed ones change
///
/// Properties in `planned` replace the reported ones. Properties that only `managed` (the prior
/// translation) set are dropped. Everything else the catalog reports passes through unchanged.
pub fn merge_custom_properties(
    reported: &[NameValueStringPair],
    managed: &[NameValueStringPair],
    planned: &[NameValueStringPair],
) -> Vec<NameValueStringPair> {
    let mut merged: Vec<NameValueStringPair> = reported
        .iter()
        .filter_map(|p| match find_pair(planned, &p.name) {
            Some(replacement) => Some(replacement.clone()),
            None if find_pair(managed, &p.name).is_some() => None,
            None => Some(p.clone()),
        })
        .collect();
    for p in planned {
        if find_pair(&merged, &p.name).is_none() {
            merged.push(p.clone());
        }
    }
    merged
}

impl ProvisioningSchemeModel {
    pub fn identity_type(&self) -> &str {
        self.identity_type
            .as_deref_option()
            .unwrap_or(ACTIVE_DIRECTORY)
    }

    /// Identity types that create machine accounts in a domain
    pub fn needs_domain(&self) -> bool {
        !matches!(self.identity_type(), WORKGROUP | AZURE_AD)
    }

    pub fn account_creation_rules(&self) -> MachineAccountCreationRules {
        let rules = self.machine_account_creation_rules.as_ref_option();
        let identity = self.machine_domain_identity.as_ref_option();
        MachineAccountCreationRules {
            naming_scheme: rules.and_then(|r| known_str(&r.naming_scheme)).map(str::to_string),
            naming_scheme_type: rules
                .and_then(|r| known_str(&r.naming_scheme_type))
                .map(str::to_string),
            domain: identity.and_then(|i| known_str(&i.domain)).map(str::to_string),
            ou: identity.and_then(|i| known_str(&i.domain_ou)).map(str::to_string),
        }
    }

    pub fn domain_credentials(&self) -> Option<DomainCredentials> {
        let identity = self.machine_domain_identity.as_ref_option()?;
        Some(DomainCredentials {
            username: known_str(&identity.service_account)?.to_string(),
            password: known_str(&identity.service_account_password)?.to_string(),
        })
    }

    pub fn network_mapping_requests(&self, ctx: &TranslationContext) -> Vec<NetworkMappingRequest> {
        self.network_mapping
            .iter()
            .flatten()
            .filter_map(|m| {
                Some(NetworkMappingRequest {
                    network_device_name_or_id: known_str(&m.network_device)?.to_string(),
                    network_path: xdpath::network(&ctx.network_parent, known_str(&m.network)?),
                })
            })
            .collect()
    }

    /// Provisioning scheme request with everything but the hypervisor-specific parts
    pub fn base_request(&self, ctx: &TranslationContext) -> ProvisioningSchemeRequest {
        ProvisioningSchemeRequest {
            num_total_machines: known(&self.number_of_total_machines).unwrap_or(0),
            identity_type: self.identity_type().to_string(),
            machine_account_creation_rules: self.account_creation_rules(),
            resource_pool: ctx.resource_pool_path.clone(),
            network_mapping: self.network_mapping_requests(ctx),
            domain_credentials: self.domain_credentials(),
            ..Default::default()
        }
    }

    /// Custom properties as last read from the catalog
    pub fn reported_custom_properties(&self) -> Vec<NameValueStringPair> {
        self.custom_properties
            .iter()
            .flatten()
            .filter_map(|p| {
                Some(NameValueStringPair {
                    name: known_str(&p.name)?.to_string(),
                    value: p.value.as_ref_option().cloned(),
                })
            })
            .collect()
    }

    /// The model with the attributes that only move through scaling masked out
    pub fn without_scaling(&self) -> ProvisioningSchemeModel {
        ProvisioningSchemeModel {
            number_of_total_machines: Value::Null,
            custom_properties: Value::Null,
            ..self.clone()
        }
    }
}

/// Hosted machine ID the API expects for a manually added machine
pub fn hosted_machine_id(
    kind: HypervisorConnectionType,
    machine: &MachineAccountModel,
) -> Result<String, String> {
    let field = |value: &Value<String>, name: &str| {
        known_str(value)
            .map(str::to_string)
            .ok_or_else(|| format!("{} is required for {} machines", name, kind))
    };

    let name = field(&machine.machine_name, "machine_name")?;
    match kind {
        HypervisorConnectionType::Azure => Ok(format!(
            "{}/{}",
            field(&machine.resource_group_name, "resource_group_name")?,
            name
        )),
        HypervisorConnectionType::Gcp => Ok(format!(
            "{}:{}:{}",
            field(&machine.project_name, "project_name")?,
            field(&machine.availability_zone, "availability_zone")?,
            name
        )),
        _ => Ok(name),
    }
}

/// Reverse of [`hosted_machine_id`], used when importing
fn machine_account_from(machine: &Machine) -> MachineAccountModel {
    let mut model = MachineAccountModel {
        machine_account: Value::Value(machine.name.clone()),
        ..Default::default()
    };
    let Some(hosted) = machine.hosted_machine_id.as_deref() else {
        return model;
    };

    let gcp: Vec<&str> = hosted.split(':').collect();
    if let [project, zone, name] = gcp.as_slice() {
        model.project_name = Value::Value(project.to_string());
        model.availability_zone = Value::Value(zone.to_string());
        model.machine_name = Value::Value(name.to_string());
    } else if let Some((resource_group, name)) = hosted.split_once('/') {
        model.resource_group_name = Value::Value(resource_group.to_string());
        model.machine_name = Value::Value(name.to_string());
    } else {
        model.machine_name = Value::Value(hosted.to_string());
    }
    model
}

/// Groups live machines by hypervisor, keeping the prior entries of machines that still exist
pub fn machine_accounts_from(
    prior: Option<&Value<Vec<MachineAccountsModel>>>,
    machines: &[Machine],
) -> Value<Vec<MachineAccountsModel>> {
    if matches!(prior, Some(Value::Null)) && machines.is_empty() {
        return Value::Null;
    }

    let hypervisor_of = |m: &Machine| m.hypervisor.as_ref().map(|h| h.id.clone());
    let prior_groups: Vec<&MachineAccountsModel> =
        prior.into_iter().flat_map(|p| p.iter().flatten()).collect();

    let mut hypervisors: Vec<Option<String>> = prior_groups
        .iter()
        .map(|g| g.hypervisor.as_ref_option().cloned())
        .collect();
    for machine in machines {
        let hypervisor = hypervisor_of(machine);
        if !hypervisors.contains(&hypervisor) {
            hypervisors.push(hypervisor);
        }
    }

    let groups = hypervisors
        .into_iter()
        .filter_map(|hypervisor| {
            let live: Vec<&Machine> = machines
                .iter()
                .filter(|m| hypervisor_of(m) == hypervisor)
                .collect();
            if live.is_empty() {
                return None;
            }

            let prior_entries: Vec<&MachineAccountModel> = prior_groups
                .iter()
                .filter(|g| g.hypervisor.as_ref_option() == hypervisor.as_ref())
                .flat_map(|g| g.machines.iter().flatten())
                .collect();
            let matches = |entry: &MachineAccountModel, machine: &Machine| {
                known_str(&entry.machine_account)
                    .is_some_and(|account| account.eq_ignore_ascii_case(&machine.name))
            };

            let mut entries: Vec<MachineAccountModel> = prior_entries
                .iter()
                .filter(|entry| live.iter().any(|m| matches(entry, m)))
                .map(|entry| (*entry).clone())
                .collect();
            for machine in &live {
                if !prior_entries.iter().any(|entry| matches(entry, machine)) {
                    entries.push(machine_account_from(machine));
                }
            }

            Some(MachineAccountsModel {
                hypervisor: hypervisor.into(),
                machines: Value::Value(entries),
            })
        })
        .collect();

    Value::Value(groups)
}

fn network_name(path: &str) -> Option<String> {
    XdPath::parse(path)
        .find(xdpath::kind::NETWORK)
        .map(|s| s.name.clone())
}

fn scheme_from(
    prior: Option<&ProvisioningSchemeModel>,
    response: &ProvisioningSchemeResponse,
    total_count: Option<i64>,
    kind: Option<HypervisorConnectionType>,
) -> ProvisioningSchemeModel {
    let rules = response.machine_account_creation_rules.as_ref();

    let pool = response.resource_pool.as_ref();
    let hypervisor_resource_pool = match prior.and_then(|p| known_str(&p.hypervisor_resource_pool)) {
        Some(configured)
            if pool.is_some_and(|pool| {
                pool.id.eq_ignore_ascii_case(configured)
                    || pool
                        .name
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(configured))
            }) =>
        {
            Value::Value(configured.to_string())
        }
        _ => pool.map(|p| p.id.clone()).into(),
    };

    let machine_domain_identity =
        refresh_object(prior.map(|p| &p.machine_domain_identity), |prior_identity| {
            let domain = rules.and_then(|r| r.domain.clone())?;
            Some(MachineDomainIdentityModel {
                domain: Value::Value(domain),
                domain_ou: refresh(
                    prior_identity.map(|i| &i.domain_ou),
                    rules.and_then(|r| r.ou.clone()),
                ),
                service_account: prior_identity
                    .map(|i| i.service_account.clone())
                    .unwrap_or_default(),
                service_account_password: prior_identity
                    .map(|i| i.service_account_password.clone())
                    .unwrap_or_default(),
            })
        });

    let machine_account_creation_rules =
        refresh_object(prior.map(|p| &p.machine_account_creation_rules), |prior_rules| {
            let rules = rules?;
            Some(MachineAccountCreationRulesModel {
                naming_scheme: required_value(
                    prior_rules.map(|r| &r.naming_scheme),
                    rules.naming_scheme.clone(),
                ),
                naming_scheme_type: required_value(
                    prior_rules.map(|r| &r.naming_scheme_type),
                    rules.naming_scheme_type.clone(),
                ),
            })
        });

    let mappings: Vec<NetworkMappingModel> = response
        .network_mapping
        .iter()
        .filter_map(|m| {
            Some(NetworkMappingModel {
                network_device: Value::Value(m.network_device_name_or_id.clone()?),
                network: Value::Value(network_name(m.network.as_ref()?.xd_path.as_deref()?)?),
            })
        })
        .collect();
    let network_mapping = refresh(
        prior.map(|p| &p.network_mapping),
        (!mappings.is_empty()).then_some(mappings),
    );

    let custom_properties = Value::Value(
        response
            .custom_properties
            .iter()
            .map(|p| CustomPropertyModel {
                name: Value::Value(p.name.clone()),
                value: p.value.clone().into(),
            })
            .collect(),
    );

    let mut scheme = ProvisioningSchemeModel {
        hypervisor: required_value(
            prior.map(|p| &p.hypervisor),
            response.hypervisor_connection.as_ref().map(|h| h.id.clone()),
        ),
        hypervisor_resource_pool,
        identity_type: required_value(
            prior.map(|p| &p.identity_type),
            response.identity_type.clone(),
        ),
        machine_domain_identity,
        number_of_total_machines: required_value(
            prior.map(|p| &p.number_of_total_machines),
            total_count,
        ),
        machine_account_creation_rules,
        network_mapping,
        availability_zones: prior
            .map(|p| p.availability_zones.clone())
            .unwrap_or_default(),
        custom_properties,
        ..Default::default()
    };

    if let Some(kind) = kind {
        provisioning::parse(kind, prior, response, &mut scheme);
    }
    scheme
}

/// Maps a catalog read from the API onto Terraform state
///
/// `prior` is the state or plan the values are reconciled against, `None` on import.
/// `machines` is only consulted for Manual catalogs.
pub fn state_from_catalog(
    prior: Option<&MachineCatalogState>,
    catalog: &MachineCatalog,
    kind: Option<HypervisorConnectionType>,
    machines: &[Machine],
) -> MachineCatalogState {
    let provisioning_type = catalog
        .provisioning_type
        .clone()
        .or_else(|| prior.and_then(|p| p.provisioning_type.as_ref_option().cloned()));
    let is_manual = provisioning_type.as_deref() == Some(MANUAL);

    let scopes: Vec<Value<String>> = catalog
        .scopes
        .iter()
        .map(|s| Value::Value(s.id.clone()))
        .collect();
    let remote_pc_ous: Vec<RemotePcOuModel> = catalog
        .remote_pc_enrollment_scopes
        .iter()
        .map(|s| RemotePcOuModel {
            include_subfolders: Value::Value(s.include_subfolders),
            ou_name: Value::Value(s.ou.clone()),
        })
        .collect();

    let provisioning_scheme = match (&catalog.provisioning_scheme, is_manual) {
        (Some(response), false) => {
            let prior_scheme = prior.and_then(|p| p.provisioning_scheme.as_ref_option());
            Value::Value(scheme_from(prior_scheme, response, catalog.total_count, kind))
        }
        _ => Value::Null,
    };

    let machine_accounts = if is_manual {
        machine_accounts_from(prior.map(|p| &p.machine_accounts), machines)
    } else {
        prior.map(|p| p.machine_accounts.clone()).unwrap_or_default()
    };

    MachineCatalogState {
        id: Value::Value(catalog.id.clone()),
        name: Value::Value(catalog.name.clone()),
        description: refresh(
            prior.map(|p| &p.description),
            catalog.description.clone().filter(|d| !d.is_empty()),
        ),
        is_power_managed: Value::Value(catalog.is_power_managed.unwrap_or(false)),
        is_remote_pc: Value::Value(catalog.is_remote_pc.unwrap_or(false)),
        allocation_type: required_value(
            prior.map(|p| &p.allocation_type),
            catalog.allocation_type.clone(),
        ),
        session_support: required_value(
            prior.map(|p| &p.session_support),
            catalog.session_support.clone(),
        ),
        persist_user_changes: required_value(
            prior.map(|p| &p.persist_user_changes),
            catalog.persist_user_changes.clone(),
        ),
        provisioning_type: provisioning_type.into(),
        zone: required_value(
            prior.map(|p| &p.zone),
            catalog.zone.as_ref().map(|z| z.id.clone()),
        ),
        minimum_functional_level: required_value(
            prior.map(|p| &p.minimum_functional_level),
            catalog.minimum_functional_level.clone(),
        ),
        scopes: refresh(prior.map(|p| &p.scopes), (!scopes.is_empty()).then_some(scopes)),
        machine_accounts,
        remote_pc_ous: refresh(
            prior.map(|p| &p.remote_pc_ous),
            (!remote_pc_ous.is_empty()).then_some(remote_pc_ous),
        ),
        provisioning_scheme,
    }
}

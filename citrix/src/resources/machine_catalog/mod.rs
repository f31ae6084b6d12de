//! `citrix_machine_catalog` resource

pub mod machines;
pub mod model;
pub mod provisioning;
mod schema;

use async_trait::async_trait;
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};
use tfplug::plan_modifier::{modify_attribute, requires_replace, UseStateForUnknown};
use tfplug::validator::{
    validate_number, validate_string, validate_string_list, GuidValidator, NumberRangeValidator,
    OneOfValidator,
};

use crate::api::hypervisors::HypervisorConnectionType;
use crate::api::jobs::CATALOG_JOB_TIMEOUT;
use crate::api::machine_catalogs::{MachineCatalog, ProvisioningSchemeRequest, UpdateProvisioningSchemeRequest};
use crate::api::machines::{Machine, MachineRemoval};
use crate::api::{ApiError, Client};
use crate::provider_data::SharedProviderData;

use machines::{
    add_manual_machines, add_provisioned_machines, added_machines, hypervisor_kinds, manual_add_requests,
    manual_machines, pick_machines_to_remove, remove_machines,
};
use model::{
    state_from_catalog, MachineCatalogState, ProvisioningSchemeModel, ALLOCATION_TYPES,
    DEFAULT_FUNCTIONAL_LEVEL, FUNCTIONAL_LEVELS, IDENTITY_TYPES, MANUAL, NAMING_SCHEME_TYPES,
    PERSIST_USER_CHANGES, PROVISIONING_TYPES, PVS_STREAMING, SESSION_SUPPORT,
};
use provisioning::{configured_kinds, known, known_str, ImageSelection, SchemeSettings, TranslationContext};

const ALLOCATION_TYPE: OneOfValidator = OneOfValidator::new(ALLOCATION_TYPES);
const SESSION_SUPPORT_VALUES: OneOfValidator = OneOfValidator::new(SESSION_SUPPORT);
const PERSIST_USER_CHANGES_VALUES: OneOfValidator = OneOfValidator::new(PERSIST_USER_CHANGES);
const PROVISIONING_TYPE: OneOfValidator = OneOfValidator::new(PROVISIONING_TYPES);
const FUNCTIONAL_LEVEL: OneOfValidator = OneOfValidator::new(FUNCTIONAL_LEVELS);
const IDENTITY_TYPE: OneOfValidator = OneOfValidator::new(IDENTITY_TYPES);
const NAMING_SCHEME_TYPE: OneOfValidator = OneOfValidator::new(NAMING_SCHEME_TYPES);

fn scheme_path() -> AttributePath {
    AttributePath::new("provisioning_scheme")
}

fn api_error(diags: &mut Diagnostics, summary: &'static str, err: ApiError) {
    diags.root_error(summary, format!("API error: {}", err));
}

/// Hypervisor facts resolved once per create or update
struct HypervisorTarget {
    hypervisor_id: String,
    pool_id: String,
    kind: HypervisorConnectionType,
    ctx: TranslationContext,
}

pub struct MachineCatalogResource {
    data: SharedProviderData,
}

impl MachineCatalogResource {
    pub fn new(data: SharedProviderData) -> Self {
        Self { data }
    }

    fn validate_scheme(diags: &mut Diagnostics, state: &MachineCatalogState, scheme: &ProvisioningSchemeModel) {
        let path = scheme_path();
        validate_string(
            &scheme.hypervisor,
            path.clone().attribute("hypervisor"),
            diags,
            &[&GuidValidator],
        );
        validate_string(
            &scheme.identity_type,
            path.clone().attribute("identity_type"),
            diags,
            &[&IDENTITY_TYPE],
        );
        validate_number(
            &scheme.number_of_total_machines,
            path.clone().attribute("number_of_total_machines"),
            diags,
            &[&NumberRangeValidator {
                min: Some(0),
                max: None,
            }],
        );

        if let Some(rules) = scheme.machine_account_creation_rules.as_ref_option() {
            let rules_path = path.clone().attribute("machine_account_creation_rules");
            validate_string(
                &rules.naming_scheme_type,
                rules_path.clone().attribute("naming_scheme_type"),
                diags,
                &[&NAMING_SCHEME_TYPE],
            );
            if let Value::Value(naming_scheme) = &rules.naming_scheme {
                if !naming_scheme.contains('#') {
                    diags.error(
                        "Invalid naming scheme",
                        format!(
                            "Naming scheme `{}` must contain at least one `#` for the machine counter",
                            naming_scheme
                        ),
                        rules_path.attribute("naming_scheme"),
                    );
                }
            }
        }

        if scheme.identity_type.is_value() && scheme.needs_domain() && scheme.machine_domain_identity.is_null() {
            diags.error(
                "Missing machine domain identity",
                format!(
                    "machine_domain_identity is required for identity type {}",
                    scheme.identity_type()
                ),
                path.clone().attribute("machine_domain_identity"),
            );
        }

        let blocks = [
            scheme.azure_machine_config.is_value(),
            scheme.aws_machine_config.is_value(),
            scheme.gcp_machine_config.is_value(),
            scheme.vsphere_machine_config.is_value(),
            scheme.xenserver_machine_config.is_value(),
            scheme.scvmm_machine_config.is_value(),
            scheme.nutanix_machine_config.is_value(),
        ];
        let unknown = [
            scheme.azure_machine_config.is_unknown(),
            scheme.aws_machine_config.is_unknown(),
            scheme.gcp_machine_config.is_unknown(),
            scheme.vsphere_machine_config.is_unknown(),
            scheme.xenserver_machine_config.is_unknown(),
            scheme.scvmm_machine_config.is_unknown(),
            scheme.nutanix_machine_config.is_unknown(),
        ];
        let set = blocks.iter().filter(|b| **b).count();
        if set > 1 || (set == 0 && !unknown.iter().any(|u| *u)) {
            diags.error(
                "Invalid provisioning scheme",
                "Exactly one machine config block must be set in provisioning_scheme",
                path.clone(),
            );
        }

        if state.provisioning_type.as_deref_option() == Some(PVS_STREAMING) {
            let has_pvs = scheme
                .azure_machine_config
                .as_ref_option()
                .is_some_and(|azure| !azure.azure_pvs_configuration.is_null());
            if !has_pvs && !scheme.azure_machine_config.is_unknown() {
                diags.error(
                    "Missing PVS configuration",
                    "PVSStreaming catalogs require azure_machine_config.azure_pvs_configuration",
                    path.attribute(provisioning::azure::BLOCK),
                );
            }
        }
    }

    /// Checks that do not need the API
    pub fn validate_state(diags: &mut Diagnostics, state: &MachineCatalogState) {
        validate_string(
            &state.allocation_type,
            AttributePath::new("allocation_type"),
            diags,
            &[&ALLOCATION_TYPE],
        );
        validate_string(
            &state.session_support,
            AttributePath::new("session_support"),
            diags,
            &[&SESSION_SUPPORT_VALUES],
        );
        validate_string(
            &state.persist_user_changes,
            AttributePath::new("persist_user_changes"),
            diags,
            &[&PERSIST_USER_CHANGES_VALUES],
        );
        validate_string(
            &state.provisioning_type,
            AttributePath::new("provisioning_type"),
            diags,
            &[&PROVISIONING_TYPE],
        );
        validate_string(
            &state.minimum_functional_level,
            AttributePath::new("minimum_functional_level"),
            diags,
            &[&FUNCTIONAL_LEVEL],
        );
        validate_string(&state.zone, AttributePath::new("zone"), diags, &[&GuidValidator]);
        validate_string_list(&state.scopes, AttributePath::new("scopes"), diags, &[&GuidValidator]);

        match state.provisioning_type.as_deref_option() {
            Some(MANUAL) => {
                if state.provisioning_scheme.is_value() {
                    diags.error(
                        "Invalid provisioning scheme",
                        "provisioning_scheme cannot be set for Manual catalogs",
                        scheme_path(),
                    );
                }
            }
            Some(_) => {
                if state.provisioning_scheme.is_null() {
                    diags.error(
                        "Missing provisioning scheme",
                        "provisioning_scheme is required for MCS and PVSStreaming catalogs",
                        scheme_path(),
                    );
                }
                if state.machine_accounts.is_value() {
                    diags.error(
                        "Invalid machine accounts",
                        "machine_accounts can only be set for Manual catalogs",
                        AttributePath::new("machine_accounts"),
                    );
                }
            }
            None => {}
        }

        if state.is_remote_pc == Value::Value(true) {
            if matches!(state.provisioning_type.as_deref_option(), Some(p) if p != MANUAL) {
                diags.error(
                    "Invalid Remote PC catalog",
                    "Remote PC catalogs must use Manual provisioning",
                    AttributePath::new("is_remote_pc"),
                );
            }
            if state.is_power_managed == Value::Value(true) {
                diags.error(
                    "Invalid Remote PC catalog",
                    "Remote PC catalogs cannot be power managed",
                    AttributePath::new("is_power_managed"),
                );
            }
        }
        if state.remote_pc_ous.is_value()
            && !state.is_remote_pc.is_unknown()
            && state.is_remote_pc != Value::Value(true)
        {
            diags.error(
                "Invalid Remote PC OUs",
                "remote_pc_ous requires is_remote_pc to be true",
                AttributePath::new("remote_pc_ous"),
            );
        }

        if let Some(scheme) = state.provisioning_scheme.as_ref_option() {
            Self::validate_scheme(diags, state, scheme);
        }
    }

    async fn resolve_target(
        client: &Client,
        diags: &mut Diagnostics,
        scheme: &ProvisioningSchemeModel,
    ) -> Option<HypervisorTarget> {
        let hypervisor_id = known_str(&scheme.hypervisor)?;
        let pool_name = known_str(&scheme.hypervisor_resource_pool)?;

        let hypervisor = match client.hypervisors().get(hypervisor_id).await {
            Ok(hypervisor) => hypervisor,
            Err(e) => {
                api_error(diags, "Failed to read hypervisor", e);
                return None;
            }
        };
        let Some(kind) = hypervisor.connection_kind() else {
            diags.error(
                "Unsupported hypervisor",
                format!(
                    "Hypervisor {} has connection type {:?}, which cannot be used to provision machines",
                    hypervisor.name, hypervisor.connection_type
                ),
                scheme_path().attribute("hypervisor"),
            );
            return None;
        };
        if configured_kinds(scheme) != vec![kind] {
            diags.error(
                "Machine config does not match hypervisor",
                format!(
                    "Hypervisor {} is a {} connection; set `{}` in provisioning_scheme",
                    hypervisor.name,
                    kind,
                    kind.config_block()
                ),
                scheme_path(),
            );
            return None;
        }

        let pool = match client
            .hypervisors()
            .get_resource_pool(hypervisor_id, pool_name)
            .await
        {
            Ok(pool) => pool,
            Err(e) => {
                api_error(diags, "Failed to read hypervisor resource pool", e);
                return None;
            }
        };

        let ctx = TranslationContext::new(&hypervisor, &pool)
            .with_availability_zones(known_str(&scheme.availability_zones).map(str::to_string));
        Some(HypervisorTarget {
            hypervisor_id: hypervisor.id,
            pool_id: pool.id,
            kind,
            ctx,
        })
    }

    fn build_request(
        diags: &mut Diagnostics,
        target: &HypervisorTarget,
        scheme: &ProvisioningSchemeModel,
    ) -> Option<ProvisioningSchemeRequest> {
        let mut request = scheme.base_request(&target.ctx);
        match provisioning::build(target.kind, scheme, &target.ctx, &mut request) {
            Ok(()) => Some(request),
            Err(diag) => {
                diags.add_error(diag);
                None
            }
        }
    }

    /// Fails when the master image the request points at does not exist on the hypervisor
    async fn verify_master_image(
        client: &Client,
        diags: &mut Diagnostics,
        target: &HypervisorTarget,
        request: &ProvisioningSchemeRequest,
    ) -> Option<()> {
        if request.master_image_path.is_empty() {
            return Some(());
        }
        match client
            .hypervisors()
            .get_resource(&target.hypervisor_id, &target.pool_id, &request.master_image_path)
            .await
        {
            Ok(_) => Some(()),
            Err(e) if e.is_not_found() => {
                diags.error(
                    "Master image not found",
                    format!(
                        "{} does not exist on the hypervisor",
                        request.master_image_path
                    ),
                    scheme_path().attribute(target.kind.config_block()),
                );
                None
            }
            Err(e) => {
                api_error(diags, "Failed to look up master image", e);
                None
            }
        }
    }

    async fn wait_for_job(client: &Client, diags: &mut Diagnostics, summary: &'static str, job: &str) -> Option<()> {
        match client.jobs().wait_for_job(job, CATALOG_JOB_TIMEOUT).await {
            Ok(_) => Some(()),
            Err(e) => {
                api_error(diags, summary, e);
                None
            }
        }
    }

    /// Connection type of the catalog: from the configured block when there is one, otherwise
    /// from the hypervisor the catalog reports
    async fn catalog_kind(
        client: &Client,
        prior: Option<&MachineCatalogState>,
        catalog: &MachineCatalog,
    ) -> Option<HypervisorConnectionType> {
        let configured = prior
            .and_then(|p| p.provisioning_scheme.as_ref_option())
            .map(configured_kinds)
            .unwrap_or_default();
        if let [kind] = configured.as_slice() {
            return Some(*kind);
        }

        let hypervisor = catalog
            .provisioning_scheme
            .as_ref()?
            .hypervisor_connection
            .as_ref()?;
        match client.hypervisors().get(&hypervisor.id).await {
            Ok(found) => found.connection_kind(),
            Err(e) => {
                tracing::warn!("Could not read hypervisor {}: {}", hypervisor.id, e);
                None
            }
        }
    }

    async fn list_machines(client: &Client, diags: &mut Diagnostics, catalog_id: &str) -> Option<Vec<Machine>> {
        match client.machine_catalogs().list_machines(catalog_id).await {
            Ok(machines) => Some(machines),
            Err(e) => {
                api_error(diags, "Failed to list catalog machines", e);
                None
            }
        }
    }

    /// Reads the catalog and maps it onto state. `Some(None)` means the catalog is gone.
    async fn fetch_state(
        client: &Client,
        diags: &mut Diagnostics,
        prior: Option<&MachineCatalogState>,
        name_or_id: &str,
    ) -> Option<Option<MachineCatalogState>> {
        let catalog = match client.machine_catalogs().get(name_or_id).await {
            Ok(catalog) => catalog,
            Err(e) if e.is_not_found() => return Some(None),
            Err(e) => {
                api_error(diags, "Failed to read machine catalog", e);
                return None;
            }
        };

        let machines = if catalog.provisioning_type.as_deref() == Some(MANUAL) {
            Self::list_machines(client, diags, &catalog.id).await?
        } else {
            Vec::new()
        };
        let kind = Self::catalog_kind(client, prior, &catalog).await;

        Some(Some(state_from_catalog(prior, &catalog, kind, &machines)))
    }

    async fn update_image(
        client: &Client,
        diags: &mut Diagnostics,
        catalog_id: &str,
        planned: &MachineCatalogState,
        image: ImageSelection,
    ) -> Option<()> {
        tracing::info!("Updating master image of catalog {}", catalog_id);
        let request = UpdateProvisioningSchemeRequest {
            master_image_path: image.master_image_path,
            master_image_note: image.master_image_note,
            machine_profile_path: image.machine_profile_path,
            service_offering_path: image.service_offering_path,
            store_old_image: true,
            minimum_functional_level: planned
                .minimum_functional_level
                .as_deref_option()
                .unwrap_or(DEFAULT_FUNCTIONAL_LEVEL)
                .to_string(),
        };
        let job = match client
            .machine_catalogs()
            .update_provisioning_scheme(catalog_id, &request)
            .await
        {
            Ok(job) => job,
            Err(e) => {
                api_error(diags, "Failed to update master image", e);
                return None;
            }
        };
        Self::wait_for_job(client, diags, "Failed to update master image", &job).await
    }

    async fn scale(
        client: &Client,
        diags: &mut Diagnostics,
        catalog_id: &str,
        prior: &MachineCatalogState,
        planned: &MachineCatalogState,
    ) -> Option<()> {
        let Some(scheme) = planned.provisioning_scheme.as_ref_option() else {
            return Some(());
        };
        let before = prior
            .provisioning_scheme
            .as_ref_option()
            .and_then(|s| known(&s.number_of_total_machines))
            .unwrap_or(0);
        let after = known(&scheme.number_of_total_machines).unwrap_or(before);

        if after > before {
            add_provisioned_machines(client, diags, catalog_id, scheme, (after - before) as usize).await
        } else if after < before {
            let machines = Self::list_machines(client, diags, catalog_id).await?;
            let excess = machines.len().saturating_sub(after.max(0) as usize);
            let picked = pick_machines_to_remove(&machines, excess);
            remove_machines(client, diags, &picked, planned.machine_removal()).await
        } else {
            Some(())
        }
    }

    async fn sync_manual_machines(
        client: &Client,
        diags: &mut Diagnostics,
        catalog_id: &str,
        prior: &MachineCatalogState,
        planned: &MachineCatalogState,
    ) -> Option<()> {
        let before = manual_machines(prior.machine_accounts.as_deref_option().unwrap_or_default());
        let after = manual_machines(planned.machine_accounts.as_deref_option().unwrap_or_default());

        let added = added_machines(&before, &after);
        if !added.is_empty() {
            let kinds = hypervisor_kinds(client, diags, &added).await?;
            let requests = manual_add_requests(diags, &added, &kinds)?;
            add_manual_machines(client, diags, catalog_id, &requests).await?;
        }

        let removed = added_machines(&after, &before);
        if !removed.is_empty() {
            let machines = Self::list_machines(client, diags, catalog_id).await?;
            let picked: Vec<&Machine> = machines
                .iter()
                .filter(|m| {
                    removed
                        .iter()
                        .any(|r| r.account().eq_ignore_ascii_case(&m.name))
                })
                .collect();
            remove_machines(client, diags, &picked, MachineRemoval::keep_everything()).await?;
        }
        Some(())
    }
}

#[async_trait]
impl Resource for MachineCatalogResource {
    type State<'a> = MachineCatalogState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(schema::machine_catalog_schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        Self::validate_state(diags, &config);
        Some(())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let data = self.data.get(diags).await?;
        let Some(id) = known_str(&state.id) else {
            diags.root_error_short("Machine catalog ID is missing from state");
            return None;
        };

        // A freshly imported state only carries the ID
        let prior = (!state.name.is_null()).then_some(&state);
        match Self::fetch_state(&data.client, diags, prior, id).await? {
            Some(fresh) => Some((fresh, private_state)),
            None => {
                tracing::warn!("Machine catalog {} not found, removing from state", id);
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        if state.minimum_functional_level.is_null() {
            state.minimum_functional_level = Value::Value(DEFAULT_FUNCTIONAL_LEVEL.to_string());
        }
        if state.persist_user_changes.is_null() {
            state.persist_user_changes = Value::Value("Discard".to_string());
        }
        if state.is_remote_pc.is_null() {
            state.is_remote_pc = Value::Value(false);
        }
        if state.is_power_managed.is_null() {
            state.is_power_managed = if state.is_manual() {
                if state.machine_accounts.is_unknown() {
                    Value::Unknown
                } else {
                    Value::Value(
                        manual_machines(state.machine_accounts.as_deref_option().unwrap_or_default())
                            .iter()
                            .any(|m| m.hypervisor.is_some()),
                    )
                }
            } else {
                Value::Value(true)
            };
        }
        if state.zone.is_null() {
            state.zone = Value::Unknown;
        }
        if let Value::Value(scheme) = &mut state.provisioning_scheme {
            scheme.custom_properties = Value::Unknown;
        }

        Some((state, ValueEmpty::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        let mut replace = Vec::new();

        modify_attribute(
            &prior_state.id,
            &mut state.id,
            AttributePath::new("id"),
            &[&UseStateForUnknown],
            &mut replace,
        );

        requires_replace(
            &prior_state.allocation_type,
            &state.allocation_type,
            AttributePath::new("allocation_type"),
            &mut replace,
        );
        requires_replace(
            &prior_state.session_support,
            &state.session_support,
            AttributePath::new("session_support"),
            &mut replace,
        );
        requires_replace(
            &prior_state.persist_user_changes,
            &state.persist_user_changes,
            AttributePath::new("persist_user_changes"),
            &mut replace,
        );
        requires_replace(
            &prior_state.provisioning_type,
            &state.provisioning_type,
            AttributePath::new("provisioning_type"),
            &mut replace,
        );

        let prior_scheme = prior_state
            .provisioning_scheme
            .as_ref_option()
            .cloned()
            .unwrap_or_default();
        let planned_scheme = state
            .provisioning_scheme
            .as_ref_option()
            .cloned()
            .unwrap_or_default();
        requires_replace(
            &prior_scheme.hypervisor,
            &planned_scheme.hypervisor,
            scheme_path().attribute("hypervisor"),
            &mut replace,
        );
        requires_replace(
            &prior_scheme.hypervisor_resource_pool,
            &planned_scheme.hypervisor_resource_pool,
            scheme_path().attribute("hypervisor_resource_pool"),
            &mut replace,
        );
        requires_replace(
            &prior_scheme.identity_type,
            &planned_scheme.identity_type,
            scheme_path().attribute("identity_type"),
            &mut replace,
        );

        requires_replace(
            &prior_scheme.availability_zones,
            &planned_scheme.availability_zones,
            scheme_path().attribute("availability_zones"),
            &mut replace,
        );

        // Fixed when the machines are first provisioned
        let aws = |s: &ProvisioningSchemeModel| {
            s.aws_machine_config
                .as_ref_option()
                .map(|c| c.tenancy_type.clone())
                .unwrap_or_default()
        };
        requires_replace(
            &aws(&prior_scheme),
            &aws(&planned_scheme),
            scheme_path()
                .attribute(provisioning::aws::BLOCK)
                .attribute("tenancy_type"),
            &mut replace,
        );
        let intune = |s: &ProvisioningSchemeModel| {
            s.azure_machine_config
                .as_ref_option()
                .map(|c| c.enroll_in_intune.clone())
                .unwrap_or_default()
        };
        requires_replace(
            &intune(&prior_scheme),
            &intune(&planned_scheme),
            scheme_path()
                .attribute(provisioning::azure::BLOCK)
                .attribute("enroll_in_intune"),
            &mut replace,
        );
        let pvs = |s: &ProvisioningSchemeModel| {
            s.azure_machine_config
                .as_ref_option()
                .map(|c| c.azure_pvs_configuration.clone())
                .unwrap_or_default()
        };
        requires_replace(
            &pvs(&prior_scheme),
            &pvs(&planned_scheme),
            scheme_path()
                .attribute(provisioning::azure::BLOCK)
                .attribute("azure_pvs_configuration"),
            &mut replace,
        );

        if let (Some(prior_scheme), Value::Value(planned_scheme)) =
            (prior_state.provisioning_scheme.as_ref_option(), &mut state.provisioning_scheme)
        {
            planned_scheme.custom_properties =
                if prior_scheme.without_scaling() == planned_scheme.without_scaling() {
                    prior_scheme.custom_properties.clone()
                } else {
                    Value::Unknown
                };
        }

        Some((state, prior_private_state, replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let data = self.data.get(diags).await?;
        let client = data.client.as_ref();
        let name = planned_state.name.as_deref_option().unwrap_or_default().to_string();
        tracing::info!("Creating machine catalog {}", name);

        let request = if planned_state.is_manual() {
            let planned_machines =
                manual_machines(planned_state.machine_accounts.as_deref_option().unwrap_or_default());
            let kinds = hypervisor_kinds(client, diags, &planned_machines).await?;
            let accounts = manual_add_requests(diags, &planned_machines, &kinds)?;
            planned_state.create_request(None, accounts)
        } else {
            let Some(scheme) = planned_state.provisioning_scheme.as_ref_option() else {
                diags.error(
                    "Missing provisioning scheme",
                    format!("provisioning_scheme is required for {} catalogs", planned_state.provisioning_type()),
                    scheme_path(),
                );
                return None;
            };
            let target = Self::resolve_target(client, diags, scheme).await?;
            let scheme_request = Self::build_request(diags, &target, scheme)?;
            Self::verify_master_image(client, diags, &target, &scheme_request).await?;
            planned_state.create_request(Some(scheme_request), Vec::new())
        };

        let job = match client.machine_catalogs().create(&request).await {
            Ok(job) => job,
            Err(e) => {
                api_error(diags, "Failed to create machine catalog", e);
                return None;
            }
        };
        Self::wait_for_job(client, diags, "Failed to create machine catalog", &job).await?;

        match Self::fetch_state(client, diags, Some(&planned_state), &name).await? {
            Some(state) => Some((state, planned_private_state)),
            None => {
                diags.root_error(
                    "Failed to create machine catalog",
                    format!("Machine catalog {} was not found after creation", name),
                );
                None
            }
        }
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let data = self.data.get(diags).await?;
        let client = data.client.as_ref();
        let Some(id) = known_str(&prior_state.id).map(str::to_string) else {
            diags.root_error_short("Machine catalog ID is missing from state");
            return None;
        };
        tracing::info!("Updating machine catalog {}", id);

        let mut network_mapping = None;
        let mut settings = None;
        if let (Some(prior_scheme), Some(planned_scheme)) = (
            prior_state.provisioning_scheme.as_ref_option(),
            planned_state.provisioning_scheme.as_ref_option(),
        ) {
            if prior_scheme.without_scaling() != planned_scheme.without_scaling() {
                let target = Self::resolve_target(client, diags, planned_scheme).await?;
                let planned_request = Self::build_request(diags, &target, planned_scheme)?;

                let mut scratch = Diagnostics::default();
                let prior_request = Self::build_request(&mut scratch, &target, prior_scheme);
                let prior_image = prior_request.as_ref().map(ImageSelection::from);
                let planned_image = ImageSelection::from(&planned_request);
                if prior_image.as_ref() != Some(&planned_image) {
                    Self::verify_master_image(client, diags, &target, &planned_request).await?;
                    Self::update_image(client, diags, &id, &planned_state, planned_image).await?;
                }

                let prior_settings = prior_request.as_ref().map(SchemeSettings::from);
                let planned_settings = SchemeSettings::from(&planned_request);
                if prior_settings.as_ref() != Some(&planned_settings) {
                    settings = Some((prior_settings, planned_settings));
                }

                if prior_scheme.network_mapping != planned_scheme.network_mapping {
                    network_mapping = Some(planned_request.network_mapping);
                }
            }
        }

        let patch = planned_state.update_request(
            &prior_state,
            network_mapping,
            settings.as_ref().map(|(before, after)| (before.as_ref(), after)),
        );
        if !patch.is_empty() {
            let job = match client.machine_catalogs().update(&id, &patch).await {
                Ok(job) => job,
                Err(e) => {
                    api_error(diags, "Failed to update machine catalog", e);
                    return None;
                }
            };
            Self::wait_for_job(client, diags, "Failed to update machine catalog", &job).await?;
        }

        if planned_state.is_manual() {
            Self::sync_manual_machines(client, diags, &id, &prior_state, &planned_state).await?;
        } else {
            Self::scale(client, diags, &id, &prior_state, &planned_state).await?;
        }

        match Self::fetch_state(client, diags, Some(&planned_state), &id).await? {
            Some(state) => Some((state, planned_private_state)),
            None => {
                diags.root_error(
                    "Failed to update machine catalog",
                    format!("Machine catalog {} disappeared during update", id),
                );
                None
            }
        }
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let data = self.data.get(diags).await?;
        let client = data.client.as_ref();
        let Some(id) = known_str(&prior_state.id) else {
            diags.root_error_short("Machine catalog ID is missing from state");
            return None;
        };
        tracing::info!("Deleting machine catalog {}", id);

        let job = match client
            .machine_catalogs()
            .delete(id, prior_state.machine_removal())
            .await
        {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Machine catalog {} already deleted", id);
                return Some(());
            }
            Err(e) => {
                api_error(diags, "Failed to delete machine catalog", e);
                return None;
            }
        };
        Self::wait_for_job(client, diags, "Failed to delete machine catalog", &job).await
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        tracing::info!("Importing machine catalog {}", id);
        let state = MachineCatalogState {
            id: Value::Value(id),
            ..Default::default()
        };
        Some((state, ValueEmpty::default()))
    }
}

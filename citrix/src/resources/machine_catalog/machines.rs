//! Growing and shrinking catalogs through `$batch`

use std::collections::HashMap;

use tf_provider::Diagnostics;

use super::model::{hosted_machine_id, MachineAccountModel, MachineAccountsModel, ProvisioningSchemeModel};
use super::provisioning::known_str;
use crate::api::batch::{BatchOutcome, BatchRequestItem};
use crate::api::hypervisors::HypervisorConnectionType;
use crate::api::machine_catalogs::{add_machine_item, AddMachineRequest};
use crate::api::machines::{delete_machine_item, maintenance_mode_item, Machine, MachineRemoval};
use crate::api::Client;

fn check_outcome(diags: &mut Diagnostics, summary: &'static str, action: &str, outcome: BatchOutcome) -> Option<()> {
    if outcome.is_complete() {
        return Some(());
    }
    diags.root_error(summary, outcome.shortfall_message(action));
    None
}

/// Machines to remove when a catalog shrinks by `count`: idle machines first
pub fn pick_machines_to_remove(machines: &[Machine], count: usize) -> Vec<&Machine> {
    let (idle, busy): (Vec<&Machine>, Vec<&Machine>) = machines.iter().partition(|m| m.is_idle());
    idle.into_iter().chain(busy).take(count).collect()
}

/// Adds `count` machines to an MCS or PVS catalog using the scheme's account creation rules
pub async fn add_provisioned_machines(
    client: &Client,
    diags: &mut Diagnostics,
    catalog_id: &str,
    scheme: &ProvisioningSchemeModel,
    count: usize,
) -> Option<()> {
    tracing::info!("Adding {} machines to catalog {}", count, catalog_id);

    let request = AddMachineRequest {
        machine_account_creation_rules: Some(scheme.account_creation_rules()),
        domain_credentials: scheme.domain_credentials(),
        ..Default::default()
    };
    let items = (0..count)
        .map(|i| add_machine_item(catalog_id, format!("add-{}", i), &request))
        .collect::<Result<Vec<_>, _>>();
    let items = match items {
        Ok(items) => items,
        Err(e) => {
            diags.root_error("Failed to add machines to catalog", format!("API error: {}", e));
            return None;
        }
    };

    run_batch(client, diags, "Failed to add machines to catalog", "Adding machines", items).await
}

/// Puts `machines` into maintenance mode, then deletes them
pub async fn remove_machines(
    client: &Client,
    diags: &mut Diagnostics,
    machines: &[&Machine],
    removal: MachineRemoval,
) -> Option<()> {
    if machines.is_empty() {
        return Some(());
    }
    tracing::info!("Removing {} machines", machines.len());

    let maintenance = machines
        .iter()
        .map(|m| maintenance_mode_item(m, true))
        .collect::<Result<Vec<_>, _>>();
    let maintenance = match maintenance {
        Ok(items) => items,
        Err(e) => {
            diags.root_error("Failed to remove machines from catalog", format!("API error: {}", e));
            return None;
        }
    };
    run_batch(
        client,
        diags,
        "Failed to remove machines from catalog",
        "Turning on maintenance mode",
        maintenance,
    )
    .await?;

    let deletes = machines
        .iter()
        .map(|m| delete_machine_item(m, removal))
        .collect();
    run_batch(
        client,
        diags,
        "Failed to remove machines from catalog",
        "Deleting machines",
        deletes,
    )
    .await
}

async fn run_batch(
    client: &Client,
    diags: &mut Diagnostics,
    summary: &'static str,
    action: &str,
    items: Vec<BatchRequestItem>,
) -> Option<()> {
    match client.batch().perform(items).await {
        Ok(outcome) => check_outcome(diags, summary, action, outcome),
        Err(e) => {
            diags.root_error(summary, format!("API error: {}", e));
            None
        }
    }
}

/// One machine of a Manual catalog, with the hypervisor it runs on
#[derive(Debug, Clone, PartialEq)]
pub struct ManualMachine {
    pub hypervisor: Option<String>,
    pub machine: MachineAccountModel,
}

impl ManualMachine {
    pub fn account(&self) -> &str {
        known_str(&self.machine.machine_account).unwrap_or_default()
    }
}

/// Flattens `machine_accounts` groups
pub fn manual_machines(groups: &[MachineAccountsModel]) -> Vec<ManualMachine> {
    groups
        .iter()
        .flat_map(|group| {
            let hypervisor = known_str(&group.hypervisor).map(str::to_string);
            group.machines.iter().flatten().map(move |machine| ManualMachine {
                hypervisor: hypervisor.clone(),
                machine: machine.clone(),
            })
        })
        .collect()
}

/// Machines in `planned` that are not in `prior`, matched by account name
pub fn added_machines(prior: &[ManualMachine], planned: &[ManualMachine]) -> Vec<ManualMachine> {
    planned
        .iter()
        .filter(|p| !prior.iter().any(|q| q.account().eq_ignore_ascii_case(p.account())))
        .cloned()
        .collect()
}

/// Looks up the connection type of each hypervisor referenced by `machines`, once per hypervisor
pub async fn hypervisor_kinds(
    client: &Client,
    diags: &mut Diagnostics,
    machines: &[ManualMachine],
) -> Option<HashMap<String, HypervisorConnectionType>> {
    let mut kinds = HashMap::new();
    for hypervisor in machines.iter().filter_map(|m| m.hypervisor.as_deref()) {
        if kinds.contains_key(hypervisor) {
            continue;
        }
        let found = match client.hypervisors().get(hypervisor).await {
            Ok(found) => found,
            Err(e) => {
                diags.root_error(
                    "Failed to read hypervisor",
                    format!("API error: {}", e),
                );
                return None;
            }
        };
        let Some(kind) = found.connection_kind() else {
            diags.root_error(
                "Unsupported hypervisor",
                format!("Hypervisor {} has an unsupported connection type", found.name),
            );
            return None;
        };
        kinds.insert(hypervisor.to_string(), kind);
    }
    Some(kinds)
}

/// Add-machine request for one Manual catalog machine
pub fn manual_add_request(
    machine: &ManualMachine,
    kinds: &HashMap<String, HypervisorConnectionType>,
) -> Result<AddMachineRequest, String> {
    let hosted_id = match machine.hypervisor.as_deref().and_then(|h| kinds.get(h)) {
        Some(kind) => Some(hosted_machine_id(*kind, &machine.machine)?),
        None => None,
    };
    Ok(AddMachineRequest {
        machine_name: Some(machine.account().to_string()),
        hosted_machine_id: hosted_id,
        hypervisor_connection: machine.hypervisor.clone(),
        ..Default::default()
    })
}

/// Builds the add requests for `machines`, recording an error per machine that cannot be described
pub fn manual_add_requests(
    diags: &mut Diagnostics,
    machines: &[ManualMachine],
    kinds: &HashMap<String, HypervisorConnectionType>,
) -> Option<Vec<AddMachineRequest>> {
    let mut requests = Vec::with_capacity(machines.len());
    for machine in machines {
        match manual_add_request(machine, kinds) {
            Ok(request) => requests.push(request),
            Err(detail) => diags.root_error(
                "Invalid machine account",
                format!("{}: {}", machine.account(), detail),
            ),
        }
    }
    (requests.len() == machines.len()).then_some(requests)
}

/// Adds Manual catalog machines through `$batch`
pub async fn add_manual_machines(
    client: &Client,
    diags: &mut Diagnostics,
    catalog_id: &str,
    requests: &[AddMachineRequest],
) -> Option<()> {
    if requests.is_empty() {
        return Some(());
    }
    tracing::info!("Adding {} machines to catalog {}", requests.len(), catalog_id);

    let items = requests
        .iter()
        .enumerate()
        .map(|(i, request)| add_machine_item(catalog_id, format!("add-{}", i), request))
        .collect::<Result<Vec<_>, _>>();
    match items {
        Ok(items) => {
            run_batch(client, diags, "Failed to add machines to catalog", "Adding machines", items)
                .await
        }
        Err(e) => {
            diags.root_error("Failed to add machines to catalog", format!("API error: {}", e));
            None
        }
    }
}

//! `citrix_machine_properties` data source

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, DataSource, Diagnostics};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::validator::{validate_string, StringPatternValidator};

use crate::api::machines::Machine;
use crate::provider_data::SharedProviderData;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePropertiesState {
    pub name: Value<String>,
    pub id: Value<String>,
    pub machine_catalog_id: Value<String>,
    pub delivery_group_id: Value<String>,
    pub hosted_machine_id: Value<String>,
    pub hypervisor_connection_id: Value<String>,
    pub power_state: Value<String>,
    pub registration_state: Value<String>,
    pub in_maintenance_mode: Value<bool>,
    pub dns_name: Value<String>,
    pub session_count: Value<i64>,
}

fn optional<T>(value: Option<T>) -> Value<T> {
    value.map_or(Value::Null, Value::Value)
}

impl MachinePropertiesState {
    fn from_machine(name: Value<String>, machine: Machine) -> Self {
        Self {
            name,
            id: Value::Value(machine.id),
            machine_catalog_id: optional(machine.machine_catalog.map(|r| r.id)),
            delivery_group_id: optional(machine.delivery_group.map(|r| r.id)),
            hosted_machine_id: optional(machine.hosted_machine_id),
            hypervisor_connection_id: optional(machine.hypervisor.map(|r| r.id)),
            power_state: optional(machine.power_state),
            registration_state: optional(machine.registration_state),
            in_maintenance_mode: optional(machine.in_maintenance_mode),
            dns_name: optional(machine.dns_name),
            session_count: optional(machine.session_count),
        }
    }
}

pub struct MachinePropertiesDataSource {
    data: SharedProviderData,
}

impl MachinePropertiesDataSource {
    pub fn new(data: SharedProviderData) -> Self {
        Self { data }
    }
}

fn computed(name: &str, attr_type: AttributeType, description: &str) -> (String, tfplug::schema::Attribute) {
    AttributeBuilder::new(name, attr_type)
        .description(description)
        .computed()
        .build()
}

#[async_trait]
impl DataSource for MachinePropertiesDataSource {
    type State<'a> = MachinePropertiesState;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(
            SchemaBuilder::new()
                .description("Reads the properties of a single VDA machine")
                .attribute(
                    AttributeBuilder::new("name", AttributeType::String)
                        .description("Machine name in `DOMAIN\\machine` form")
                        .required()
                        .build(),
                )
                .attribute(computed("id", AttributeType::String, "Machine ID"))
                .attribute(computed(
                    "machine_catalog_id",
                    AttributeType::String,
                    "Catalog the machine belongs to",
                ))
                .attribute(computed(
                    "delivery_group_id",
                    AttributeType::String,
                    "Delivery group the machine is assigned to",
                ))
                .attribute(computed(
                    "hosted_machine_id",
                    AttributeType::String,
                    "Machine ID on the hypervisor",
                ))
                .attribute(computed(
                    "hypervisor_connection_id",
                    AttributeType::String,
                    "Hypervisor connection hosting the machine",
                ))
                .attribute(computed("power_state", AttributeType::String, "Power state"))
                .attribute(computed(
                    "registration_state",
                    AttributeType::String,
                    "VDA registration state",
                ))
                .attribute(computed(
                    "in_maintenance_mode",
                    AttributeType::Bool,
                    "Whether the machine is in maintenance mode",
                ))
                .attribute(computed("dns_name", AttributeType::String, "DNS name"))
                .attribute(computed(
                    "session_count",
                    AttributeType::Number,
                    "Number of sessions on the machine",
                ))
                .build(),
        )
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Ok(pattern) = regex::Regex::new(r"^[^\\\s]+\\[^\\\s]+$") {
            validate_string(
                &config.name,
                AttributePath::new("name"),
                diags,
                &[&StringPatternValidator {
                    pattern,
                    description: "a machine name in DOMAIN\\machine form".to_string(),
                }],
            );
        }
        Some(())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let data = self.data.get(diags).await?;
        let name = match config.name.as_deref_option() {
            Some(name) => name.to_string(),
            None => {
                diags.error_short("name is required", AttributePath::new("name"));
                return None;
            }
        };

        tracing::debug!("Reading machine {}", name);
        match data.client.machines().get(&name).await {
            Ok(machine) => Some(MachinePropertiesState::from_machine(config.name, machine)),
            Err(e) if e.is_not_found() => {
                diags.error(
                    "Machine not found",
                    format!("No machine named {} exists", name),
                    AttributePath::new("name"),
                );
                None
            }
            Err(e) => {
                diags.root_error("Failed to read machine", format!("API error: {}", e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::provider_data::{CitrixProviderData, SharedProviderData};
    use crate::storefront::{ProcessExecutor, StoreFrontClient};
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    async fn data_source(url: &str) -> MachinePropertiesDataSource {
        let data = SharedProviderData::new();
        data.set(CitrixProviderData::new(
            create_test_client(url),
            StoreFrontClient::new(Arc::new(ProcessExecutor::new(None))),
            false,
        ))
        .await;
        MachinePropertiesDataSource::new(data)
    }

    fn config(name: &str) -> MachinePropertiesState {
        MachinePropertiesState {
            name: Value::Value(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_validate_name_format() {
        let ds = MachinePropertiesDataSource::new(SharedProviderData::new());
        let mut diags = Diagnostics::default();

        ds.validate(&mut diags, config(r"CORP\vda01")).await;
        assert!(diags.errors.is_empty());

        ds.validate(&mut diags, config("vda01")).await;
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_read_maps_machine() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/Machines/CORP.+vda01$".to_string()))
            .with_status(200)
            .with_body(
                r#"{
                    "Id": "m-1",
                    "Name": "CORP\\vda01",
                    "DnsName": "vda01.corp.local",
                    "MachineCatalog": {"Id": "cat-1", "Name": "Catalog"},
                    "HostedMachineId": "vm-42",
                    "Hypervisor": {"Id": "hyp-1"},
                    "PowerState": "On",
                    "RegistrationState": "Registered",
                    "InMaintenanceMode": false,
                    "SessionCount": 2
                }"#,
            )
            .create_async()
            .await;

        let ds = data_source(&server.url()).await;
        let mut diags = Diagnostics::default();
        let state = ds
            .read(&mut diags, config(r"CORP\vda01"), ValueEmpty::default())
            .await
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(state.id, Value::Value("m-1".to_string()));
        assert_eq!(state.machine_catalog_id, Value::Value("cat-1".to_string()));
        assert!(state.delivery_group_id.is_null());
        assert_eq!(state.hypervisor_connection_id, Value::Value("hyp-1".to_string()));
        assert_eq!(state.session_count, Value::Value(2));
        assert_eq!(state.name, Value::Value(r"CORP\vda01".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_unknown_machine() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Regex(r"^/Machines/".to_string()))
            .with_status(404)
            .with_body(r#"{"ErrorMessage":"Machine not found"}"#)
            .create_async()
            .await;

        let ds = data_source(&server.url()).await;
        let mut diags = Diagnostics::default();
        let state = ds
            .read(&mut diags, config(r"CORP\missing"), ValueEmpty::default())
            .await;

        assert!(state.is_none());
        assert_eq!(diags.errors[0].summary, "Machine not found");
    }
}

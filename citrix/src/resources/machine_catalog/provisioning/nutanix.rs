//! Nutanix AHV machine config (Custom connection with the Acropolis plugin)

use serde::{Deserialize, Serialize};
use tf_provider::value::Value;
use tf_provider::Diagnostic;
use tfplug::schema::{AttributeBuilder, AttributeType, NestedAttributeBuilder};

use super::{config_error, known, known_str, refresh, required_str, required_value, TranslationContext};
use crate::api::common::{find_property, set_property};
use crate::api::machine_catalogs::{ProvisioningSchemeRequest, ProvisioningSchemeResponse};
use crate::xdpath::{self, XdPath};

pub const BLOCK: &str = "nutanix_machine_config";

const CONTAINER_ID: &str = "NutanixContainerId";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutanixMachineConfig {
    pub container: Value<String>,
    pub master_image: Value<String>,
    pub master_image_note: Value<String>,
    pub cpu_count: Value<i64>,
    pub cores_per_cpu_count: Value<i64>,
    pub memory_mb: Value<i64>,
}

pub fn schema() -> AttributeType {
    NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("container", AttributeType::String)
                .description("Storage container that holds the machine disks")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("master_image", AttributeType::String)
                .description("Name of the template used as master image")
                .required()
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
                .description("Number of vCPU sockets for each machine")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("cores_per_cpu_count", AttributeType::Number)
                .description("Cores per vCPU socket")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("memory_mb", AttributeType::Number)
                .description("Memory of each machine in MB")
                .required()
                .build(),
        )
        .build()
}

pub fn build(
    config: &NutanixMachineConfig,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    let template = required_str(&config.master_image, BLOCK, "master_image")?;
    let container = required_str(&config.container, BLOCK, "container")?;

    request.master_image_path = ctx.absolute(&xdpath::nutanix_template(template));
    request.master_image_note = known_str(&config.master_image_note).map(str::to_string);

    for (attribute, value) in [
        ("cpu_count", &config.cpu_count),
        ("cores_per_cpu_count", &config.cores_per_cpu_count),
        ("memory_mb", &config.memory_mb),
    ] {
        match known(value) {
            Some(v) if v > 0 => {}
            _ => {
                return Err(config_error(
                    BLOCK,
                    attribute,
                    format!("{} must be a positive number", attribute),
                ))
            }
        }
    }
    request.cpu_count = known(&config.cpu_count);
    request.cores_per_cpu_count = known(&config.cores_per_cpu_count);
    request.memory_mb = known(&config.memory_mb);

    set_property(&mut request.custom_properties, CONTAINER_ID, container);
    Ok(())
}

pub fn parse(
    prior: Option<&NutanixMachineConfig>,
    response: &ProvisioningSchemeResponse,
) -> NutanixMachineConfig {
    let template = response
        .master_image
        .as_ref()
        .and_then(|image| image.xd_path.as_deref())
        .and_then(|path| {
            XdPath::parse(path)
                .find(xdpath::kind::TEMPLATE)
                .map(|s| s.name.clone())
        });

    NutanixMachineConfig {
        container: required_value(
            prior.map(|p| &p.container),
            find_property(&response.custom_properties, CONTAINER_ID).map(str::to_string),
        ),
        master_image: required_value(prior.map(|p| &p.master_image), template),
        master_image_note: refresh(
            prior.map(|p| &p.master_image_note),
            response.master_image_note.clone(),
        ),
        cpu_count: required_value(prior.map(|p| &p.cpu_count), response.cpu_count),
        cores_per_cpu_count: required_value(
            prior.map(|p| &p.cores_per_cpu_count),
            response.cores_per_cpu_count,
        ),
        memory_mb: required_value(prior.map(|p| &p.memory_mb), response.memory_mb),
    }
}

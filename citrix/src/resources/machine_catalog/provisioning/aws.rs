//! AWS EC2 machine config

use serde::{Deserialize, Serialize};
use tf_provider::value::Value;
use tf_provider::Diagnostic;
use tfplug::schema::{AttributeBuilder, AttributeType, NestedAttributeBuilder};

use super::{
    config_error, known_str, refresh, required_str, required_value, service_offering_name,
    service_offering_path, TranslationContext,
};
use crate::api::machine_catalogs::{ProvisioningSchemeRequest, ProvisioningSchemeResponse};
use crate::xdpath::{self, XdPath};

pub const BLOCK: &str = "aws_machine_config";
pub const TENANCY_TYPES: &[&str] = &["Shared", "Instance", "Host"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsMachineConfig {
    pub service_offering: Value<String>,
    pub master_image: Value<String>,
    pub image_ami: Value<String>,
    pub master_image_note: Value<String>,
    pub tenancy_type: Value<String>,
}

pub fn schema() -> AttributeType {
    NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("service_offering", AttributeType::String)
                .description("EC2 instance type offering, e.g. `T2 Medium Instance`")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("master_image", AttributeType::String)
                .description("Name of the AMI used as master image")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("image_ami", AttributeType::String)
                .description("ID of the AMI, `ami-...`")
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
            AttributeBuilder::new("tenancy_type", AttributeType::String)
                .description("Tenancy of the instances: Shared, Instance or Host")
                .optional()
                .build(),
        )
        .build()
}

pub fn build(
    config: &AwsMachineConfig,
    ctx: &TranslationContext,
    request: &mut ProvisioningSchemeRequest,
) -> Result<(), Diagnostic> {
    let name = required_str(&config.master_image, BLOCK, "master_image")?;
    let ami = required_str(&config.image_ami, BLOCK, "image_ami")?;
    if !ami.starts_with("ami-") {
        return Err(config_error(
            BLOCK,
            "image_ami",
            format!("image_ami must start with `ami-`, got `{}`", ami),
        ));
    }
    let offering = required_str(&config.service_offering, BLOCK, "service_offering")?;

    request.master_image_path = ctx.absolute(&xdpath::aws_ami(name, ami));
    request.master_image_note = known_str(&config.master_image_note).map(str::to_string);
    request.service_offering_path = Some(service_offering_path(ctx, offering));

    if let Some(tenancy) = known_str(&config.tenancy_type) {
        if !TENANCY_TYPES.contains(&tenancy) {
            return Err(config_error(
                BLOCK,
                "tenancy_type",
                format!("tenancy_type must be one of: {}", TENANCY_TYPES.join(", ")),
            ));
        }
        request.tenancy_type = Some(tenancy.to_string());
    }
    request.availability_zones = ctx.availability_zones.clone();

    Ok(())
}

pub fn parse(prior: Option<&AwsMachineConfig>, response: &ProvisioningSchemeResponse) -> AwsMachineConfig {
    let ami = response
        .master_image
        .as_ref()
        .and_then(|image| image.xd_path.as_deref())
        .and_then(|path| XdPath::parse(path).as_ami());

    AwsMachineConfig {
        service_offering: required_value(
            prior.map(|p| &p.service_offering),
            response.service_offering.as_deref().map(service_offering_name),
        ),
        master_image: required_value(
            prior.map(|p| &p.master_image),
            ami.as_ref().map(|a| a.name.clone()),
        ),
        image_ami: required_value(prior.map(|p| &p.image_ami), ami.map(|a| a.id)),
        master_image_note: refresh(
            prior.map(|p| &p.master_image_note),
            response.master_image_note.clone(),
        ),
        tenancy_type: refresh(prior.map(|p| &p.tenancy_type), response.tenancy_type.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::hypervisors::HypervisorResourceRef;

    fn config() -> AwsMachineConfig {
        AwsMachineConfig {
            service_offering: Value::Value("T2 Medium Instance".to_string()),
            master_image: Value::Value("golden-win2022".to_string()),
            image_ami: Value::Value("ami-0123456789".to_string()),
            master_image_note: Value::Null,
            tenancy_type: Value::Value("Shared".to_string()),
        }
    }

    fn ctx() -> TranslationContext {
        TranslationContext {
            hosting_unit: "aws-east".to_string(),
            availability_zones: Some("us-east-1a".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_ami_and_offering() {
        let mut request = ProvisioningSchemeRequest::default();
        build(&config(), &ctx(), &mut request).unwrap();

        assert_eq!(
            request.master_image_path,
            r"XDHyp:\HostingUnits\aws-east\golden-win2022 (ami-0123456789).ami"
        );
        assert_eq!(
            request.service_offering_path.as_deref(),
            Some(r"XDHyp:\HostingUnits\aws-east\T2 Medium Instance.serviceoffering")
        );
        assert_eq!(request.tenancy_type.as_deref(), Some("Shared"));
        assert_eq!(request.availability_zones.as_deref(), Some("us-east-1a"));
    }

    #[test]
    fn test_build_rejects_bad_ami() {
        let mut config = config();
        config.image_ami = Value::Value("0123".to_string());
        assert!(build(&config, &ctx(), &mut ProvisioningSchemeRequest::default()).is_err());
    }

    #[test]
    fn test_build_rejects_unknown_tenancy() {
        let mut config = config();
        config.tenancy_type = Value::Value("Dedicated".to_string());
        let err = build(&config, &ctx(), &mut ProvisioningSchemeRequest::default()).unwrap_err();
        assert!(err.detail.contains("Shared, Instance, Host"));
    }

    #[test]
    fn test_parse_round_trips_build_output() {
        let mut request = ProvisioningSchemeRequest::default();
        build(&config(), &ctx(), &mut request).unwrap();

        let response = ProvisioningSchemeResponse {
            master_image: Some(HypervisorResourceRef {
                xd_path: Some(request.master_image_path.clone()),
                ..Default::default()
            }),
            service_offering: request.service_offering_path.clone(),
            tenancy_type: Some("Shared".to_string()),
            ..Default::default()
        };

        assert_eq!(parse(Some(&config()), &response), config());
    }
}

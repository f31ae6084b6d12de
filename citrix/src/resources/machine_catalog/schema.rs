use tfplug::schema::{AttributeBuilder, AttributeType, NestedAttributeBuilder, Schema, SchemaBuilder};

use super::provisioning::{aws, azure, gcp, nutanix, scvmm, vsphere, xenserver};

fn machine_accounts_schema() -> AttributeType {
    let machine = NestedAttributeBuilder::list()
        .attribute(
            AttributeBuilder::new("machine_account", AttributeType::String)
                .description("Computer account of the machine, `DOMAIN\\machine`")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("machine_name", AttributeType::String)
                .description("Name of the VM on the hypervisor. Required for power managed catalogs.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("region", AttributeType::String)
                .description("Cloud region of the machine")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("resource_group_name", AttributeType::String)
                .description("Azure resource group of the machine")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("project_name", AttributeType::String)
                .description("GCP project of the machine")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("availability_zone", AttributeType::String)
                .description("Availability zone of the machine")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("datacenter", AttributeType::String)
                .description("vSphere datacenter of the machine")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("cluster", AttributeType::String)
                .description("vSphere cluster of the machine")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("host", AttributeType::String)
                .description("Host the machine runs on")
                .optional()
                .build(),
        )
        .build();

    NestedAttributeBuilder::list()
        .attribute(
            AttributeBuilder::new("hypervisor", AttributeType::String)
                .description("ID of the hypervisor connection the machines run on; unset for physical machines")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("machines", machine)
                .description("Machines added to the catalog")
                .required()
                .build(),
        )
        .build()
}

fn remote_pc_ous_schema() -> AttributeType {
    NestedAttributeBuilder::list()
        .attribute(
            AttributeBuilder::new("include_subfolders", AttributeType::Bool)
                .description("Whether machines in sub-OUs are enrolled too")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("ou_name", AttributeType::String)
                .description("Distinguished name of the organizational unit")
                .required()
                .build(),
        )
        .build()
}

fn provisioning_scheme_schema() -> AttributeType {
    let domain_identity = NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("domain", AttributeType::String)
                .description("AD domain the machine accounts are created in")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("domain_ou", AttributeType::String)
                .description("OU the machine accounts are created in")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("service_account", AttributeType::String)
                .description("Service account used to create machine accounts")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("service_account_password", AttributeType::String)
                .description("Password of the service account")
                .required()
                .sensitive()
                .build(),
        )
        .build();

    let creation_rules = NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("naming_scheme", AttributeType::String)
                .description("Name template for new machines; `#` characters are replaced by the counter")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("naming_scheme_type", AttributeType::String)
                .description("Counter type: Numeric or Alphabetic")
                .required()
                .build(),
        )
        .build();

    let network_mapping = NestedAttributeBuilder::list()
        .attribute(
            AttributeBuilder::new("network_device", AttributeType::String)
                .description("Index of the network device on the master image, e.g. `0`")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("network", AttributeType::String)
                .description("Name of the network the device is attached to")
                .required()
                .build(),
        )
        .build();

    let custom_properties = NestedAttributeBuilder::list()
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("value", AttributeType::String)
                .computed()
                .build(),
        )
        .build();

    NestedAttributeBuilder::single()
        .attribute(
            AttributeBuilder::new("hypervisor", AttributeType::String)
                .description("ID of the hypervisor connection")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("hypervisor_resource_pool", AttributeType::String)
                .description("Name or ID of the hypervisor resource pool")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("identity_type", AttributeType::String)
                .description("Identity of the machines: ActiveDirectory, AzureAD, HybridAzureAD or Workgroup")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("machine_domain_identity", domain_identity)
                .description("Domain the machine accounts are joined to")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("number_of_total_machines", AttributeType::Number)
                .description("Number of machines in the catalog")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("machine_account_creation_rules", creation_rules)
                .description("How new machine accounts are named")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("network_mapping", network_mapping)
                .description("Networks the machine network devices are attached to")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("availability_zones", AttributeType::String)
                .description("Comma separated availability zones the machines are spread over")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("custom_properties", custom_properties)
                .description("Custom properties the service reports for the provisioning scheme")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(azure::BLOCK, azure::schema())
                .description("Machine config for Azure Resource Manager connections")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(aws::BLOCK, aws::schema())
                .description("Machine config for AWS connections")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(gcp::BLOCK, gcp::schema())
                .description("Machine config for Google Cloud connections")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(vsphere::BLOCK, vsphere::schema())
                .description("Machine config for vSphere connections")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(xenserver::BLOCK, xenserver::schema())
                .description("Machine config for XenServer connections")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(scvmm::BLOCK, scvmm::schema())
                .description("Machine config for SCVMM connections")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(nutanix::BLOCK, nutanix::schema())
                .description("Machine config for Nutanix AHV connections")
                .optional()
                .build(),
        )
        .build()
}

pub fn machine_catalog_schema() -> Schema {
    SchemaBuilder::new()
        .version(1)
        .description("Manages a machine catalog")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("GUID of the machine catalog")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("Name of the machine catalog")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .description("Description of the machine catalog")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("is_power_managed", AttributeType::Bool)
                .description("Whether the machines are power managed through a hypervisor connection")
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("is_remote_pc", AttributeType::Bool)
                .description("Whether this is a Remote PC Access catalog")
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("allocation_type", AttributeType::String)
                .description("Random or Static. Changing this forces a new catalog.")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("session_support", AttributeType::String)
                .description("SingleSession or MultiSession. Changing this forces a new catalog.")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("persist_user_changes", AttributeType::String)
                .description("Discard, OnLocal or OnPvd. Changing this forces a new catalog.")
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("provisioning_type", AttributeType::String)
                .description("MCS, Manual or PVSStreaming. Changing this forces a new catalog.")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("zone", AttributeType::String)
                .description("ID of the zone the catalog belongs to")
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("minimum_functional_level", AttributeType::String)
                .description("Minimum VDA functional level, defaults to L7_20")
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("scopes", AttributeType::List(Box::new(AttributeType::String)))
                .description("IDs of the admin scopes the catalog is part of")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("machine_accounts", machine_accounts_schema())
                .description("Machines of a Manual catalog, grouped by hypervisor connection")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("remote_pc_ous", remote_pc_ous_schema())
                .description("OUs whose machines are enrolled into a Remote PC catalog")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("provisioning_scheme", provisioning_scheme_schema())
                .description("Provisioning scheme of MCS and PVS catalogs")
                .optional()
                .build(),
        )
        .build()
}

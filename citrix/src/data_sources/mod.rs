//! Data source implementations

pub mod machine_properties;
pub mod pvs;

pub use machine_properties::MachinePropertiesDataSource;
pub use pvs::PvsDataSource;

// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Colors, environments, resource names, and release descriptors.

mod color;
mod id;
mod release;
mod resource_name;

pub use color::{DeploymentTarget, ParseColorError};
pub use id::{DeploymentName, Id, ServiceRef};
pub use release::{
    Environment, ParseEnvironmentError, ReleaseDescriptor, ReleaseVersion, ReleaseVersionError,
    RollbackRequest,
};
pub use resource_name::{ResourceName, ResourceNameError};

// ABOUTME: Compile-fail test verifying DeploymentName and ServiceRef are not interchangeable.
// ABOUTME: This test should fail to compile, validating type safety.

use cutover::types::{DeploymentName, ServiceRef};

fn takes_deployment(_name: DeploymentName) {}

fn main() {
    let service = ServiceRef::new("gameforge");
    takes_deployment(service); // ERROR: expected DeploymentName, found ServiceRef
}

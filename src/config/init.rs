// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented cutover.yml template.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ResourceName;

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, app: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let app = match app {
        Some(a) => ResourceName::new(a).map_err(|e| Error::InvalidArguments(e.to_string()))?,
        None => ResourceName::new("my-app").map_err(|e| Error::InvalidConfig(e.to_string()))?,
    };

    std::fs::write(&config_path, generate_template_yaml(&app))?;

    Ok(())
}

fn generate_template_yaml(app: &ResourceName) -> String {
    format!(
        r#"app: {app}
image: registry.example.com/{app}
# service: {app}          # production service whose selector is switched
replicas: 2
timeout: 5m

healthcheck:
  path: /health
  port: 8080
  interval: 10s
  attempts: 30

smoke_tests:
  - name: status
    path: /api/status
    expected_status: 200

monitoring:
  window: 2m
  interval: 10s

cleanup:
  grace_period: 30s
  delete_previous: true

# notifications:
#   webhook:
#     env: CUTOVER_WEBHOOK_URL
#   timeout: 10s

environments:
  staging:
    namespace: {app}-staging
  production:
    namespace: {app}
    replicas: 3
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn template_parses_as_config() {
        let app = ResourceName::new("gameforge").unwrap();
        let config = Config::from_yaml(&generate_template_yaml(&app)).unwrap();
        assert_eq!(config.app, Some(app));
        assert_eq!(config.smoke_tests.len(), 1);
        assert_eq!(config.environments.len(), 2);
    }
}

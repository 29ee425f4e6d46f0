use std::env;

#[derive(Clone, Debug)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone, Debug)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    /// Captured during parsing and logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_values(
            component,
            env_string("SERVICE_NAME"),
            env_string("STAGE"),
        )
    }

    fn from_values(component: &str, service_name: Option<String>, stage: Option<String>) -> Self {
        let component = component.trim().to_string();
        let mut warnings = Vec::new();

        let service_name = service_name
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = match stage.filter(|v| !v.trim().is_empty()) {
            Some(stage) => stage,
            None => {
                warnings.push("STAGE is not set; reporting environment as `unknown`".to_string());
                "unknown".to_string()
            }
        };

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            warnings,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_component_and_unknown_stage() {
        let config = ObservabilityConfig::from_values(" backend ", None, Some("  ".to_string()));

        assert_eq!(config.service_context.service_name, "backend");
        assert_eq!(config.service_context.component, "backend");
        assert_eq!(config.service_context.environment, "unknown");
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn uses_explicit_values() {
        let config = ObservabilityConfig::from_values(
            "backend",
            Some("course-checkout".to_string()),
            Some("production".to_string()),
        );

        assert_eq!(config.service_context.service_name, "course-checkout");
        assert_eq!(config.service_context.environment, "production");
        assert!(config.warnings.is_empty());
    }
}

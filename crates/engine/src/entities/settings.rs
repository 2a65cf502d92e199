//! Settings entity module.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::infrastructure::app_settings::{
    FilterConfiguration, SpellbookSettings, SETTINGS_NAMESPACE, SETTING_KEYS,
};
use crate::infrastructure::ports::{RepoError, SettingsRepo};

/// Settings entity - reads world settings into `SpellbookSettings`.
pub struct Settings {
    repo: Arc<dyn SettingsRepo>,
}

impl Settings {
    pub fn new(repo: Arc<dyn SettingsRepo>) -> Self {
        Self { repo }
    }

    /// Load every spellbook setting. Unset keys take their defaults.
    pub async fn load(&self) -> Result<SpellbookSettings, RepoError> {
        let mut values = Map::new();
        for key in SETTING_KEYS {
            match self.repo.get_setting(SETTINGS_NAMESPACE, key).await? {
                None | Some(Value::Null) => {}
                Some(value) => {
                    values.insert((*key).to_string(), value);
                }
            }
        }

        let mut settings: SpellbookSettings = serde_json::from_value(Value::Object(values))?;
        if !settings.filter_configuration.is_current() {
            tracing::warn!(
                stored = settings.filter_configuration.version,
                "Filter configuration version mismatch, resetting to defaults"
            );
            settings.filter_configuration = FilterConfiguration::default();
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockSettingsRepo;
    use serde_json::json;
    use spellbook_domain::RuleSet;

    #[tokio::test]
    async fn unset_keys_fall_back_to_defaults() {
        let mut repo = MockSettingsRepo::new();
        repo.expect_get_setting()
            .withf(|_, key| key == "spellcastingRuleSet")
            .returning(|_, _| Ok(Some(json!("modern"))));
        repo.expect_get_setting()
            .withf(|_, key| key != "spellcastingRuleSet")
            .returning(|_, _| Ok(None));

        let settings = Settings::new(Arc::new(repo)).load().await.unwrap();
        assert_eq!(settings.spellcasting_rule_set, RuleSet::Modern);
        assert!(settings.consume_scrolls_when_learning);
        assert_eq!(settings.fetch_concurrency, 5);
    }

    #[tokio::test]
    async fn stale_filter_configuration_is_reset() {
        let mut repo = MockSettingsRepo::new();
        repo.expect_get_setting()
            .withf(|_, key| key == "filterConfiguration")
            .returning(|_, _| Ok(Some(json!({"version": 0, "filters": []}))));
        repo.expect_get_setting()
            .withf(|_, key| key != "filterConfiguration")
            .returning(|_, _| Ok(None));

        let settings = Settings::new(Arc::new(repo)).load().await.unwrap();
        assert_eq!(settings.filter_configuration, FilterConfiguration::default());
    }

    #[tokio::test]
    async fn host_failure_propagates() {
        let mut repo = MockSettingsRepo::new();
        repo.expect_get_setting()
            .returning(|_, _| Err(RepoError::host("get_setting", "offline")));

        let result = Settings::new(Arc::new(repo)).load().await;
        assert!(matches!(result, Err(RepoError::Host { .. })));
    }
}

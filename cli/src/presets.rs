use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow, ensure};
use sampleviz_core::Preset;

/// Named presets loaded from `config/presets.yaml`.
#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    presets: BTreeMap<String, Preset>,
}

impl PresetCatalog {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let presets: BTreeMap<String, Preset> =
            serde_yaml::from_str(text).context("プリセット定義の形式が不正です")?;
        ensure!(!presets.is_empty(), "プリセットが1件も定義されていません。");
        for (name, preset) in &presets {
            preset
                .config()
                .validate()
                .with_context(|| format!("プリセット {name} の設定が不正です"))?;
        }
        Ok(Self { presets })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Preset)> {
        self.presets.iter().map(|(name, preset)| (name.as_str(), preset))
    }

    pub fn get(&self, name: &str) -> Result<&Preset> {
        self.presets.get(name).ok_or_else(|| {
            anyhow!("未知のプリセットです: {name}. presets で一覧を確認してください。")
        })
    }

    /// `uniform` when present, otherwise the first preset by name.
    pub fn default_name(&self) -> Option<&str> {
        if self.presets.contains_key("uniform") {
            return Some("uniform");
        }
        self.names().next()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sampleviz_core::VisualKind;

    #[test]
    fn bundled_presets_parse() {
        let catalog = PresetCatalog::from_yaml_str(include_str!("../../config/presets.yaml")).unwrap();
        assert!(catalog.len() >= 4);
        assert_eq!(catalog.default_name(), Some("uniform"));
        let dice = catalog.get("dice-sum").unwrap();
        assert_eq!(dice.kind, VisualKind::Normal);
        assert_eq!(dice.sides, Some(6));
        assert!(catalog.get("lognormal").unwrap().config().log_x);
        assert_eq!(catalog.get("sigmoid").unwrap().kind, VisualKind::Sigmoid);
    }

    #[test]
    fn unknown_kinds_and_bad_configs_are_rejected() {
        assert!(PresetCatalog::from_yaml_str("a:\n  kind: boids\n").is_err());
        assert!(PresetCatalog::from_yaml_str("a:\n  kind: uniform\n  config:\n    bins: 0\n").is_err());
        assert!(PresetCatalog::from_yaml_str("{}").is_err());
        let catalog = PresetCatalog::from_yaml_str("b:\n  kind: uniform\n").unwrap();
        assert!(catalog.get("missing").is_err());
        assert_eq!(catalog.default_name(), Some("b"));
    }
}

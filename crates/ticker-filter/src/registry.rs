use crate::strategies::{
    AllStrategy, AnomalyConfig, AnomalyStrategy, BreakoutConfig, BreakoutStrategy, FilterStrategy,
    GapConfig, GapStrategy, MomentumConfig, MomentumStrategy, VolatilityConfig,
    VolatilityStrategy, VolumeConfig, VolumeStrategy,
};
use pipeline_core::AnalysisError;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

type StrategyFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn FilterStrategy>, AnalysisError> + Send + Sync>;

fn parse_config<C: DeserializeOwned + Default>(value: &serde_json::Value) -> Result<C, AnalysisError> {
    if value.is_null() {
        return Ok(C::default());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| AnalysisError::InvalidData(format!("strategy config: {}", e)))
}

/// Explicit name-to-factory mapping, built at construction time and injected
/// where needed. Nothing here is process-global.
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, factory: StrategyFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Registry preloaded with every built-in strategy
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "anomaly",
            Box::new(|config| {
                Ok(Box::new(AnomalyStrategy::new(parse_config::<AnomalyConfig>(config)?)))
            }),
        );
        registry.register(
            "volume",
            Box::new(|config| {
                Ok(Box::new(VolumeStrategy::new(parse_config::<VolumeConfig>(config)?)))
            }),
        );
        registry.register(
            "momentum",
            Box::new(|config| {
                Ok(Box::new(MomentumStrategy::new(parse_config::<MomentumConfig>(config)?)))
            }),
        );
        registry.register(
            "volatility",
            Box::new(|config| {
                Ok(Box::new(VolatilityStrategy::new(parse_config::<VolatilityConfig>(
                    config,
                )?)))
            }),
        );
        registry.register(
            "breakout",
            Box::new(|config| {
                Ok(Box::new(BreakoutStrategy::new(parse_config::<BreakoutConfig>(config)?)))
            }),
        );
        registry.register(
            "gap",
            Box::new(|config| {
                Ok(Box::new(GapStrategy::new(parse_config::<GapConfig>(config)?)))
            }),
        );
        registry.register("all", Box::new(|_| Ok(Box::new(AllStrategy))));
        registry
    }

    pub fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Box<dyn FilterStrategy>, AnalysisError> {
        let factory = self.factories.get(name).ok_or_else(|| {
            AnalysisError::InvalidData(format!(
                "unknown strategy '{}' (available: {})",
                name,
                self.names().join(", ")
            ))
        })?;
        factory(config)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(|k| k.as_str()).collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

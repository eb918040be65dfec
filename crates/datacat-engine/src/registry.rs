//! Role-segmented registry mapping configuration type tags to stage
//! constructors.
//!
//! Sources, transforms and sinks each have their own table: a tag only has
//! meaning within its role. Looking up an unregistered tag is a
//! [`ConfigError::UnknownStageType`], never a silent fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use datacat_types::StageRole;
use serde::de::DeserializeOwned;

use crate::config::resolve::StageSpec;
use crate::config::types::StageArguments;
use crate::errors::ConfigError;
use crate::stage::{
    BuiltSink, BuiltSource, BuiltTransform, Sink, Source, StageContext, Transform,
};

type Factory<T> =
    Arc<dyn Fn(&StageContext, &StageArguments) -> Result<Box<T>, ConfigError> + Send + Sync>;

/// Constructors for every stage type known to this process.
#[derive(Clone, Default)]
pub struct StageRegistry {
    sources: BTreeMap<String, Factory<dyn Source>>,
    transforms: BTreeMap<String, Factory<dyn Transform>>,
    sinks: BTreeMap<String, Factory<dyn Sink>>,
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("sources", &self.tags(StageRole::Source))
            .field("transforms", &self.tags(StageRole::Transform))
            .field("sinks", &self.tags(StageRole::Sink))
            .finish()
    }
}

impl StageRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source constructor. A later registration under the same
    /// tag replaces the earlier one.
    pub fn register_source<F>(&mut self, type_tag: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&StageContext, &StageArguments) -> Result<Box<dyn Source>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.sources.insert(type_tag.into(), Arc::new(factory));
        self
    }

    pub fn register_transform<F>(&mut self, type_tag: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&StageContext, &StageArguments) -> Result<Box<dyn Transform>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.transforms.insert(type_tag.into(), Arc::new(factory));
        self
    }

    pub fn register_sink<F>(&mut self, type_tag: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&StageContext, &StageArguments) -> Result<Box<dyn Sink>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.sinks.insert(type_tag.into(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn contains(&self, role: StageRole, type_tag: &str) -> bool {
        match role {
            StageRole::Source => self.sources.contains_key(type_tag),
            StageRole::Transform => self.transforms.contains_key(type_tag),
            StageRole::Sink => self.sinks.contains_key(type_tag),
        }
    }

    /// Registered tags for `role`, sorted.
    #[must_use]
    pub fn tags(&self, role: StageRole) -> Vec<&str> {
        match role {
            StageRole::Source => self.sources.keys().map(String::as_str).collect(),
            StageRole::Transform => self.transforms.keys().map(String::as_str).collect(),
            StageRole::Sink => self.sinks.keys().map(String::as_str).collect(),
        }
    }

    /// Construct the source described by `spec`.
    ///
    /// # Errors
    ///
    /// Fails if the tag is not registered or the constructor rejects the
    /// arguments.
    pub fn build_source(
        &self,
        ctx: &StageContext,
        spec: &StageSpec,
    ) -> Result<BuiltSource, ConfigError> {
        let factory = lookup(&self.sources, StageRole::Source, spec)?;
        Ok(BuiltSource::new(spec.label.clone(), factory(ctx, &spec.arguments)?))
    }

    /// Construct the transform described by `spec`.
    ///
    /// # Errors
    ///
    /// Fails if the tag is not registered or the constructor rejects the
    /// arguments.
    pub fn build_transform(
        &self,
        ctx: &StageContext,
        spec: &StageSpec,
    ) -> Result<BuiltTransform, ConfigError> {
        let factory = lookup(&self.transforms, StageRole::Transform, spec)?;
        Ok(BuiltTransform::new(
            spec.label.clone(),
            factory(ctx, &spec.arguments)?,
        ))
    }

    /// Construct the sink described by `spec`.
    ///
    /// # Errors
    ///
    /// Fails if the tag is not registered or the constructor rejects the
    /// arguments.
    pub fn build_sink(
        &self,
        ctx: &StageContext,
        spec: &StageSpec,
    ) -> Result<BuiltSink, ConfigError> {
        let factory = lookup(&self.sinks, StageRole::Sink, spec)?;
        Ok(BuiltSink::new(spec.label.clone(), factory(ctx, &spec.arguments)?))
    }
}

fn lookup<'a, T: ?Sized>(
    table: &'a BTreeMap<String, Factory<T>>,
    role: StageRole,
    spec: &StageSpec,
) -> Result<&'a Factory<T>, ConfigError> {
    table
        .get(&spec.type_tag)
        .ok_or_else(|| ConfigError::UnknownStageType {
            role,
            type_tag: spec.type_tag.clone(),
            stage: spec.label.to_string(),
        })
}

/// Deserialize a stage's open argument mapping into its typed configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidArguments`] naming the stage when a required
/// argument is missing or has the wrong shape.
pub fn parse_arguments<T: DeserializeOwned>(
    ctx: &StageContext,
    arguments: &StageArguments,
) -> Result<T, ConfigError> {
    serde_json::from_value(serde_json::Value::Object(arguments.clone()))
        .map_err(|e| ConfigError::invalid_arguments(&ctx.label, e.to_string()))
}

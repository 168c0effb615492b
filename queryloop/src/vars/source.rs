// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parameter sources: the declarative pipeline and the script escape hatch

use super::prepare::{account_vars, content_vars, custom_vars, term_vars, PrepareContext};
use crate::error::{QueryError, Result};
use crate::hooks::CapabilityCheck;
use crate::types::{LoopObject, ObjectType, QueryIdentity, QuerySpec, QueryVars};
use log::warn;
use serde_json::Value;

/// Produces the parameter tree for a specification
pub trait ParameterSource {
    fn parameters(&self, spec: &QuerySpec, ctx: &PrepareContext<'_>) -> Result<QueryVars>;
}

/// Built-in per-domain preparation
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclarativeSource;

impl ParameterSource for DeclarativeSource {
    fn parameters(&self, spec: &QuerySpec, ctx: &PrepareContext<'_>) -> Result<QueryVars> {
        Ok(match &ctx.identity.object_type {
            ObjectType::ContentItem => content_vars(spec, ctx),
            ObjectType::Term => term_vars(spec, ctx),
            ObjectType::Account => account_vars(spec, ctx),
            ObjectType::Custom(key) if key.trim().is_empty() => {
                return Err(QueryError::spec("custom object type has an empty provider key"));
            }
            ObjectType::Custom(_) => custom_vars(spec, ctx),
        })
    }
}

/// Evaluates externally supplied parameter scripts
pub trait ScriptEvaluator: Send + Sync {
    fn evaluate(&self, script: &str, item: Option<&LoopObject>) -> std::result::Result<Value, String>;
}

/// Treats the script as a JSON document
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonScriptEvaluator;

impl ScriptEvaluator for JsonScriptEvaluator {
    fn evaluate(&self, script: &str, _item: Option<&LoopObject>) -> std::result::Result<Value, String> {
        serde_json::from_str(script).map_err(|e| e.to_string())
    }
}

/// Script escape hatch. Construction fails unless the capability gate allows it.
#[derive(Debug, Clone, Copy)]
pub struct ScriptSource<'s> {
    script: &'s str,
}

impl<'s> ScriptSource<'s> {
    pub fn new(
        script: &'s str,
        capability: &dyn CapabilityCheck,
        identity: &QueryIdentity,
    ) -> Result<Self> {
        if !capability.allows_scripts(identity) {
            return Err(QueryError::CapabilityDenied(format!(
                "query scripts are not allowed for element '{}'",
                identity.element_id
            )));
        }
        Ok(Self { script })
    }
}

impl ParameterSource for ScriptSource<'_> {
    fn parameters(&self, _spec: &QuerySpec, ctx: &PrepareContext<'_>) -> Result<QueryVars> {
        let item = ctx.acting_item();
        let expanded = ctx.dynamic.expand(self.script, item);
        let value = ctx
            .evaluator
            .evaluate(&expanded, item)
            .map_err(QueryError::script)?;

        match value {
            Value::Object(vars) => Ok(vars),
            other => {
                warn!(
                    "Query script for '{}' returned {} instead of an object; using empty parameters",
                    ctx.identity.element_id,
                    value_kind(&other)
                );
                Ok(QueryVars::new())
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Template renderer — variable substitution and parsing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use instalarm_core::{AlarmDefinition, AlarmError, AlarmName, AlarmResult, Group, coerce_fields};

use crate::store::TemplateCache;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern is valid"));

/// Variables available to a template for one (group, instance) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariables {
    vars: BTreeMap<String, String>,
}

impl TemplateVariables {
    /// `asg.AutoScalingGroupName`, `instance.InstanceId`, and one
    /// `asg.Tags.<key>` per group tag.
    pub fn for_instance(group: &Group, instance_id: &str) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("asg.AutoScalingGroupName".to_string(), group.name.clone());
        vars.insert("instance.InstanceId".to_string(), instance_id.to_string());
        for tag in &group.tags {
            vars.insert(format!("asg.Tags.{}", tag.key), tag.value.clone());
        }
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Replace every `{{name}}` with its bound value in a single pass.
///
/// Substituted values are never re-scanned. Returns the first unbound
/// placeholder name as the error.
pub fn substitute(template: &str, vars: &TemplateVariables) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = vars
            .get(name.as_str())
            .ok_or_else(|| name.as_str().to_string())?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Renders alarm definitions from cached templates.
pub struct TemplateRenderer {
    cache: TemplateCache,
}

impl TemplateRenderer {
    pub fn new(cache: TemplateCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Render the template named by `name`'s alarm key.
    ///
    /// The rendered text must be a JSON object. String members are taken
    /// as raw field text; any other JSON value is coerced from its JSON
    /// text, so `"Period": 60` and `"Period": "60"` mean the same.
    pub async fn render(
        &self,
        name: &AlarmName,
        vars: &TemplateVariables,
    ) -> AlarmResult<AlarmDefinition> {
        let key = name.alarm_key();
        let template = self.cache.get(key).await?;

        let rendered = substitute(&template, vars).map_err(|unbound| {
            AlarmError::template(key, format!("unbound variable {{{{{unbound}}}}}"))
        })?;

        let parsed: Value = serde_json::from_str(&rendered)
            .map_err(|e| AlarmError::template(key, format!("rendered text is not JSON: {e}")))?;
        let Value::Object(members) = parsed else {
            return Err(AlarmError::template(key, "rendered JSON is not an object"));
        };

        // Numbers print with their source digits (`arbitrary_precision`).
        let raw = members.into_iter().map(|(field, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (field, text)
        });
        let fields = coerce_fields(raw)?;

        debug!(alarm = %name, fields = fields.len(), "template rendered");
        AlarmDefinition::from_fields(name.clone(), &fields)
    }
}

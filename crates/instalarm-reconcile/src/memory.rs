//! In-memory backends for testing and local runs.
//!
//! They honor the same contracts as the cloud backends: listings are
//! paginated (with a small default page size so callers must drain),
//! puts replace by name, and deletes of unknown names are no-ops.

use std::collections::BTreeMap;
use std::sync::Mutex;

use instalarm_core::{AlarmDefinition, AlarmError, AlarmRecord, AlarmResult, BoxFuture, Group};
use instalarm_template::TemplateSource;

use crate::backend::{AlarmBackend, GroupFilter, Page, ScalingBackend};

const DEFAULT_PAGE_SIZE: usize = 2;

/// Slice `items` at the offset encoded in `token`.
fn paginate<T: Clone>(
    items: &[T],
    token: Option<String>,
    page_size: usize,
    operation: &'static str,
) -> AlarmResult<Page<T>> {
    let start = match token {
        Some(t) => t
            .parse::<usize>()
            .map_err(|_| AlarmError::backend(operation, format!("bad token {t:?}")))?,
        None => 0,
    };
    let end = (start + page_size).min(items.len());
    let next_token = (end < items.len()).then(|| end.to_string());
    Ok(Page {
        items: items.get(start..end).unwrap_or_default().to_vec(),
        next_token,
    })
}

// ── Scaling ───────────────────────────────────────────────────────

/// Scaling service holding a fixed set of groups.
pub struct MemoryScaling {
    groups: Mutex<Vec<Group>>,
    page_size: usize,
}

impl MemoryScaling {
    pub fn new(groups: Vec<Group>) -> Self {
        Self {
            groups: Mutex::new(groups),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Replace the group set, e.g. after an instance left its group.
    pub fn set_groups(&self, groups: Vec<Group>) {
        *self.groups.lock().unwrap_or_else(|e| e.into_inner()) = groups;
    }
}

impl ScalingBackend for MemoryScaling {
    fn describe_groups<'a>(
        &'a self,
        filter: &'a GroupFilter,
        next_token: Option<String>,
    ) -> BoxFuture<'a, AlarmResult<Page<Group>>> {
        Box::pin(async move {
            let matching: Vec<Group> = self
                .groups
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .filter(|g| filter.matches(g))
                .cloned()
                .collect();
            paginate(
                &matching,
                next_token,
                self.page_size,
                "DescribeAutoScalingGroups",
            )
        })
    }
}

// ── Alarms ────────────────────────────────────────────────────────

#[derive(Default)]
struct AlarmState {
    /// Existing alarms. `None` for alarms seeded without a definition.
    alarms: BTreeMap<String, Option<AlarmDefinition>>,
    put_calls: Vec<String>,
    delete_calls: Vec<Vec<String>>,
    fail_delete_call: Option<usize>,
}

/// Alarm service keeping alarms in a sorted map.
pub struct MemoryAlarms {
    state: Mutex<AlarmState>,
    page_size: usize,
}

impl Default for MemoryAlarms {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAlarms {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AlarmState::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, AlarmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an existing alarm without a definition.
    pub fn seed(&self, name: &str) {
        self.state().alarms.insert(name.to_string(), None);
    }

    /// Make the delete call with this zero-based index fail.
    pub fn fail_delete_call(&self, index: usize) {
        self.state().fail_delete_call = Some(index);
    }

    /// Names of all existing alarms, sorted.
    pub fn alarm_names(&self) -> Vec<String> {
        self.state().alarms.keys().cloned().collect()
    }

    pub fn definition(&self, name: &str) -> Option<AlarmDefinition> {
        self.state().alarms.get(name).cloned().flatten()
    }

    /// Alarm names passed to every put call, in call order.
    pub fn put_calls(&self) -> Vec<String> {
        self.state().put_calls.clone()
    }

    /// Name batches passed to every delete call, in call order.
    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.state().delete_calls.clone()
    }
}

impl AlarmBackend for MemoryAlarms {
    fn describe_alarms<'a>(
        &'a self,
        name_prefix: &'a str,
        next_token: Option<String>,
    ) -> BoxFuture<'a, AlarmResult<Page<AlarmRecord>>> {
        Box::pin(async move {
            let matching: Vec<AlarmRecord> = self
                .state()
                .alarms
                .keys()
                .filter(|name| name.starts_with(name_prefix))
                .map(|name| AlarmRecord { name: name.clone() })
                .collect();
            paginate(&matching, next_token, self.page_size, "DescribeAlarms")
        })
    }

    fn put_alarm<'a>(&'a self, alarm: &'a AlarmDefinition) -> BoxFuture<'a, AlarmResult<()>> {
        Box::pin(async move {
            let mut state = self.state();
            let name = alarm.name.to_string();
            state.put_calls.push(name.clone());
            state.alarms.insert(name, Some(alarm.clone()));
            Ok(())
        })
    }

    fn delete_alarms<'a>(&'a self, names: &'a [String]) -> BoxFuture<'a, AlarmResult<()>> {
        Box::pin(async move {
            let mut state = self.state();
            let index = state.delete_calls.len();
            state.delete_calls.push(names.to_vec());
            if state.fail_delete_call == Some(index) {
                return Err(AlarmError::backend("DeleteAlarms", "HTTP 500"));
            }
            for name in names {
                state.alarms.remove(name);
            }
            Ok(())
        })
    }
}

// ── Templates ─────────────────────────────────────────────────────

/// Template source backed by a map; counts fetches per key.
#[derive(Default)]
pub struct MemoryTemplates {
    templates: BTreeMap<String, String>,
    fetches: Mutex<BTreeMap<String, usize>>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, alarm_key: &str, text: &str) -> Self {
        self.templates.insert(alarm_key.to_string(), text.to_string());
        self
    }

    /// How many times `alarm_key` was fetched.
    pub fn fetch_count(&self, alarm_key: &str) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(alarm_key)
            .copied()
            .unwrap_or(0)
    }
}

impl TemplateSource for MemoryTemplates {
    fn fetch<'a>(&'a self, alarm_key: &'a str) -> BoxFuture<'a, AlarmResult<String>> {
        Box::pin(async move {
            *self
                .fetches
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .entry(alarm_key.to_string())
                .or_insert(0) += 1;
            self.templates
                .get(alarm_key)
                .cloned()
                .ok_or_else(|| AlarmError::backend("GetObject", format!("no template {alarm_key:?}")))
        })
    }
}

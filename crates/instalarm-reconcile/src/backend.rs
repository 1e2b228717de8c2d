//! Backend collaborators and pagination draining.
//!
//! Listing calls are paginated. Each page is a separate call that either
//! succeeds or fails as a whole; [`list_groups`] and [`list_alarms`] keep
//! calling until the backend stops returning a continuation token, so the
//! engine never treats a partial listing as the whole truth.

use std::collections::HashSet;

use tracing::debug;

use instalarm_core::{AlarmDefinition, AlarmError, AlarmRecord, AlarmResult, BoxFuture, Group};

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Which groups to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupFilter {
    All,
    Named(Vec<String>),
}

impl GroupFilter {
    pub fn matches(&self, group: &Group) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Named(names) => names.iter().any(|n| *n == group.name),
        }
    }
}

/// The compute scaling service. Read-only from the engine's side.
pub trait ScalingBackend: Send + Sync {
    fn describe_groups<'a>(
        &'a self,
        filter: &'a GroupFilter,
        next_token: Option<String>,
    ) -> BoxFuture<'a, AlarmResult<Page<Group>>>;
}

/// The metric-alarm service.
pub trait AlarmBackend: Send + Sync {
    /// List alarms whose name starts with `name_prefix`.
    fn describe_alarms<'a>(
        &'a self,
        name_prefix: &'a str,
        next_token: Option<String>,
    ) -> BoxFuture<'a, AlarmResult<Page<AlarmRecord>>>;

    /// Create the alarm, or replace an existing alarm of the same name.
    fn put_alarm<'a>(&'a self, alarm: &'a AlarmDefinition) -> BoxFuture<'a, AlarmResult<()>>;

    /// Delete one bounded batch of alarms by name.
    fn delete_alarms<'a>(&'a self, names: &'a [String]) -> BoxFuture<'a, AlarmResult<()>>;
}

/// Drain every page of a group listing.
pub async fn list_groups(
    backend: &dyn ScalingBackend,
    filter: &GroupFilter,
) -> AlarmResult<Vec<Group>> {
    let mut groups = Vec::new();
    let mut token = None;
    let mut seen = HashSet::new();
    let mut pages = 0u32;

    loop {
        let page = backend.describe_groups(filter, token.clone()).await?;
        pages += 1;
        groups.extend(page.items);
        token = next_token(&mut seen, page.next_token, "DescribeAutoScalingGroups")?;
        if token.is_none() {
            break;
        }
    }

    debug!(pages, groups = groups.len(), "group listing drained");
    Ok(groups)
}

/// Drain every page of an alarm listing.
pub async fn list_alarms(
    backend: &dyn AlarmBackend,
    name_prefix: &str,
) -> AlarmResult<Vec<AlarmRecord>> {
    let mut alarms = Vec::new();
    let mut token = None;
    let mut seen = HashSet::new();
    let mut pages = 0u32;

    loop {
        let page = backend.describe_alarms(name_prefix, token.clone()).await?;
        pages += 1;
        alarms.extend(page.items);
        token = next_token(&mut seen, page.next_token, "DescribeAlarms")?;
        if token.is_none() {
            break;
        }
    }

    debug!(%name_prefix, pages, alarms = alarms.len(), "alarm listing drained");
    Ok(alarms)
}

/// Accept the next continuation token, refusing any token already used
/// in this listing.
fn next_token(
    seen: &mut HashSet<String>,
    next: Option<String>,
    operation: &'static str,
) -> AlarmResult<Option<String>> {
    match next {
        Some(t) if t.is_empty() => Ok(None),
        Some(t) if !seen.insert(t.clone()) => Err(AlarmError::backend(
            operation,
            format!("pagination token {t:?} repeated"),
        )),
        other => Ok(other),
    }
}

//! Rule failure extraction from a staging repository's activity log.
//!
//! The server evaluates staging rules when a repository is closed or
//! released. Failed rules do not show up in the response itself; they are
//! recorded as `ruleFailed` events of the `close` or `release` activity.

use nexstage_util::errors::{RepositoryRuleFailures, RuleFailure};

use crate::wire::ActivityDto;

pub const CLOSE_ACTIVITY: &str = "close";
pub const RELEASE_ACTIVITY: &str = "release";
const RULE_FAILED_EVENT: &str = "ruleFailed";
const RULE_ID_PROPERTY: &str = "typeId";
const RULE_MESSAGE_PROPERTY: &str = "failureMessage";

/// Collect the failed rules of the most recent activity named `activity`.
///
/// Messages of the same rule are grouped under one [`RuleFailure`] in the
/// order the server reported them. Returns `None` if no rule failed.
pub fn rule_failures(
    activity: &str,
    repository_id: &str,
    activities: &[ActivityDto],
) -> Option<RepositoryRuleFailures> {
    let latest = activities.iter().rev().find(|a| a.name == activity)?;

    let mut failures: Vec<RuleFailure> = Vec::new();
    for event in latest.events.iter().filter(|e| e.name == RULE_FAILED_EVENT) {
        let property = |name: &str| {
            event
                .properties
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.value.clone())
        };
        let rule = property(RULE_ID_PROPERTY).unwrap_or_else(|| "unknown".to_string());
        let message = property(RULE_MESSAGE_PROPERTY);

        match failures.iter_mut().find(|f| f.rule == rule) {
            Some(existing) => existing.messages.extend(message),
            None => failures.push(RuleFailure {
                rule,
                messages: message.into_iter().collect(),
            }),
        }
    }

    if failures.is_empty() {
        None
    } else {
        Some(RepositoryRuleFailures {
            repository_id: repository_id.to_string(),
            failures,
        })
    }
}

//! Waiting for asynchronous staging transitions to settle.
//!
//! Close and release requests return before the server has finished; the
//! repository reports `transitioning` until then. This polls with a fixed
//! pause and an overall timeout.

use std::time::{Duration, Instant};

use nexstage_core::staging::StagingRepositoryInfo;
use nexstage_util::errors::{NexstageError, NexstageResult};

/// Pause between polls and the overall deadline.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub pause: Duration,
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            pause: Duration::from_secs(3),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Poll every repository in `ids` through `fetch` until none is
/// transitioning, returning the settled states in `ids` order.
pub fn wait_until_settled<F>(
    ids: &[String],
    policy: WaitPolicy,
    mut fetch: F,
) -> NexstageResult<Vec<StagingRepositoryInfo>>
where
    F: FnMut(&str) -> NexstageResult<StagingRepositoryInfo>,
{
    let deadline = Instant::now() + policy.timeout;
    let sp = nexstage_util::progress::spinner(&format!(
        "Waiting for {} to settle...",
        ids.join(", ")
    ));

    let result = loop {
        let mut infos = Vec::with_capacity(ids.len());
        for id in ids {
            match fetch(id) {
                Ok(info) => infos.push(info),
                Err(e) => {
                    sp.finish_and_clear();
                    return Err(e);
                }
            }
        }
        let busy: Vec<&str> = infos
            .iter()
            .filter(|i| i.transitioning)
            .map(|i| i.repository_id.as_str())
            .collect();
        if busy.is_empty() {
            break Ok(infos);
        }
        if Instant::now() + policy.pause > deadline {
            break Err(NexstageError::remote(
                None,
                format!(
                    "Timed out after {}s waiting for staging repositories to finish: {}",
                    policy.timeout.as_secs(),
                    busy.join(", ")
                ),
            ));
        }
        tracing::debug!("Still transitioning: {}", busy.join(", "));
        std::thread::sleep(policy.pause);
    };

    sp.finish_and_clear();
    result
}

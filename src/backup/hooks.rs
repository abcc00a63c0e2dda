//! Pre/post-backup and pre/post-restore hook execution.
//!
//! Hooks run as subprocesses of the operator itself (typically a thin
//! wrapper script invoking a component's snapshot/flush API, e.g.
//! `curl -XPOST http://prometheus:9090/api/v1/admin/tsdb/snapshot`), not
//! inside the target pods — the operator has no pod-exec channel wired up,
//! and a pure HTTP/CLI hook keeps the failure mode ("hook binary missing or
//! timed out") uniform regardless of which component it targets.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::crd::backup::{HookErrorPolicy, HookPhase, HookSpec};
use crate::error::{Error, Result};

pub async fn run_hooks(hooks: &[HookSpec], phase: HookPhase) -> Result<()> {
    for hook in hooks.iter().filter(|h| h.phase == phase) {
        info!("running hook {} ({:?})", hook.name, phase);
        match run_one(hook).await {
            Ok(()) => info!("hook {} succeeded", hook.name),
            Err(e) => {
                warn!("hook {} failed: {e:?}", hook.name);
                if hook.on_error == HookErrorPolicy::Fail {
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}

async fn run_one(hook: &HookSpec) -> Result<()> {
    let Some((program, args)) = hook.command.split_first() else {
        return Err(Error::Hook(format!("hook {} has an empty command", hook.name)));
    };

    let child = Command::new(program)
        .args(args)
        .output();

    let output = timeout(Duration::from_secs(hook.timeout_seconds as u64), child)
        .await
        .map_err(|_| Error::Timeout(format!("hook {} timed out after {}s", hook.name, hook.timeout_seconds)))?
        .map_err(|e| Error::Hook(format!("hook {} failed to launch: {e}", hook.name)))?;

    if !output.status.success() {
        return Err(Error::Hook(format!(
            "hook {} exited with {}: {}",
            hook.name,
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(name: &str, command: Vec<&str>, on_error: HookErrorPolicy) -> HookSpec {
        HookSpec {
            name: name.to_string(),
            phase: HookPhase::PreBackup,
            command: command.into_iter().map(String::from).collect(),
            timeout_seconds: 5,
            on_error,
        }
    }

    #[tokio::test]
    async fn successful_hook_runs_without_error() {
        let hooks = vec![hook("noop", vec!["true"], HookErrorPolicy::Fail)];
        assert!(run_hooks(&hooks, HookPhase::PreBackup).await.is_ok());
    }

    #[tokio::test]
    async fn failing_hook_with_fail_policy_propagates_error() {
        let hooks = vec![hook("boom", vec!["false"], HookErrorPolicy::Fail)];
        assert!(run_hooks(&hooks, HookPhase::PreBackup).await.is_err());
    }

    #[tokio::test]
    async fn failing_hook_with_continue_policy_does_not_propagate() {
        let hooks = vec![hook("boom", vec!["false"], HookErrorPolicy::Continue)];
        assert!(run_hooks(&hooks, HookPhase::PreBackup).await.is_ok());
    }

    #[tokio::test]
    async fn hooks_for_other_phase_are_skipped() {
        let mut h = hook("post-only", vec!["false"], HookErrorPolicy::Fail);
        h.phase = HookPhase::PostBackup;
        assert!(run_hooks(&[h], HookPhase::PreBackup).await.is_ok());
    }
}

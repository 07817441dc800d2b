//! Drives a session along a privilege path.
//!
//! The navigator owns no state of its own: it borrows the immutable graph
//! and failure triggers, and mutates the caller's [`SessionState`] only
//! after the device has confirmed each step with the expected prompt.

use std::time::Duration;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use super::privilege::{PrivilegeGraph, Transition};
use super::SessionState;
use crate::channel::{Classification, MatchKind, SessionChannel, StreamMatcher};
use crate::error::{PrivilegeError, Result};

/// Computes and executes privilege paths over a [`SessionChannel`].
pub struct Navigator<'a> {
    graph: &'a PrivilegeGraph,
    failures: &'a [String],
    secret: Option<&'a SecretString>,
    timeout: Duration,
    search_depth: usize,
}

impl<'a> Navigator<'a> {
    /// Create a navigator with a 30 second read timeout and no secret.
    pub fn new(graph: &'a PrivilegeGraph, failures: &'a [String]) -> Self {
        Self {
            graph,
            failures,
            secret: None,
            timeout: Duration::from_secs(30),
            search_depth: 1000,
        }
    }

    /// Secret sent when an escalation asks for authentication.
    pub fn with_secret(mut self, secret: Option<&'a SecretString>) -> Self {
        self.secret = secret;
        self
    }

    /// Deadline for each read.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tail search depth for prompt matching.
    pub fn with_search_depth(mut self, search_depth: usize) -> Self {
        self.search_depth = search_depth;
        self
    }

    /// Move the session to `target`.
    ///
    /// Probes the current level first if it is unknown. On error, `state`
    /// holds the last level the device confirmed.
    pub async fn acquire(
        &self,
        channel: &mut dyn SessionChannel,
        state: &mut SessionState,
        target: &str,
    ) -> Result<()> {
        if self.graph.get(target).is_none() {
            return Err(PrivilegeError::UnknownLevel {
                name: target.to_string(),
            }
            .into());
        }

        let current = match state.current.clone() {
            Some(current) => current,
            None => {
                let found = self.probe(channel).await?;
                state.current = Some(found.clone());
                found
            }
        };

        let path = self.graph.resolve_path(&current, target)?;
        if path.is_empty() {
            debug!("already at privilege level '{}'", target);
            return Ok(());
        }

        debug!(
            "acquiring '{}' from '{}' in {} step(s)",
            target,
            current,
            path.len()
        );

        for transition in &path {
            self.traverse(channel, transition).await?;
            state.current = Some(transition.to.clone());
        }

        Ok(())
    }

    /// Discover the current level by sending a bare return.
    pub async fn probe(&self, channel: &mut dyn SessionChannel) -> Result<String> {
        debug!("probing for current privilege level");
        channel.send_return().await?;

        let mut matcher = self.graph.prompt_matcher(self.search_depth);
        let found = match channel.read_until(&mut matcher, self.timeout).await {
            Ok(found) => found,
            Err(e) if e.is_timeout() => {
                let output = String::from_utf8_lossy(matcher.captured()).into_owned();
                let prompt = output
                    .lines()
                    .rev()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .unwrap_or_default()
                    .to_string();
                return Err(PrivilegeError::UnresolvablePrompt { prompt }.into());
            }
            Err(e) => return Err(e),
        };

        let level = self.graph.determine_from_prompt(&found.matched)?;
        debug!("prompt '{}' is level '{}'", found.matched, level.name);
        Ok(level.name.clone())
    }

    /// Execute one edge and wait for the device to confirm it.
    async fn traverse(
        &self,
        channel: &mut dyn SessionChannel,
        transition: &Transition,
    ) -> Result<()> {
        debug!(
            "{:?} '{}' -> '{}': sending {:?}",
            transition.direction, transition.from, transition.to, transition.command
        );
        channel.write(transition.command.as_bytes()).await?;
        channel.send_return().await?;

        let mut matcher = self.edge_matcher(transition);
        if let Some(auth) = &transition.auth_prompt {
            matcher = matcher.with_candidate(
                MatchKind::EscalationAuth {
                    level: transition.to.clone(),
                },
                auth.clone(),
            );
        }

        let found = channel.read_until(&mut matcher, self.timeout).await?;
        match &found.kind {
            MatchKind::Prompt { .. } => Ok(()),
            MatchKind::Failure { trigger } => Err(failed(&transition.command, trigger, &found)),
            MatchKind::EscalationAuth { .. } => self.authenticate(channel, transition).await,
        }
    }

    /// Answer an escalation auth prompt. One attempt per edge.
    async fn authenticate(
        &self,
        channel: &mut dyn SessionChannel,
        transition: &Transition,
    ) -> Result<()> {
        let auth_failure = |reason: &str| PrivilegeError::AuthFailure {
            level: transition.to.clone(),
            reason: reason.to_string(),
        };

        let secret = self
            .secret
            .ok_or_else(|| auth_failure("authentication requested but no secret configured"))?;

        debug!("answering escalation prompt for '{}' with <hidden>", transition.to);
        channel.write(secret.expose_secret().as_bytes()).await?;
        channel.send_return().await?;

        let mut matcher = self.edge_matcher(transition);
        if let Some(auth) = &transition.auth_prompt {
            matcher = matcher.with_candidate(
                MatchKind::EscalationAuth {
                    level: transition.to.clone(),
                },
                auth.clone(),
            );
        }
        if let Some(origin) = self.graph.get(&transition.from) {
            matcher = matcher.with_candidate(
                MatchKind::Prompt {
                    level: origin.name.clone(),
                },
                origin.prompt(),
            );
        }

        let found = channel.read_until(&mut matcher, self.timeout).await?;
        match &found.kind {
            MatchKind::Prompt { level } if *level == transition.to => Ok(()),
            MatchKind::Prompt { level } => {
                warn!("escalation to '{}' fell back to '{}'", transition.to, level);
                Err(auth_failure("secret rejected, device returned to the previous level").into())
            }
            MatchKind::EscalationAuth { .. } => {
                warn!("escalation to '{}' asked for authentication again", transition.to);
                Err(auth_failure("secret rejected, authentication prompt repeated").into())
            }
            MatchKind::Failure { trigger } => Err(failed(&transition.command, trigger, &found)),
        }
    }

    /// Failure triggers plus the destination prompt.
    fn edge_matcher(&self, transition: &Transition) -> StreamMatcher {
        let matcher =
            StreamMatcher::new(self.search_depth).with_failures(self.failures.iter().cloned());
        match self.graph.get(&transition.to) {
            Some(level) => matcher.with_candidate(
                MatchKind::Prompt {
                    level: level.name.clone(),
                },
                level.prompt(),
            ),
            None => matcher,
        }
    }
}

fn failed(command: &str, trigger: &str, found: &Classification) -> crate::error::Error {
    warn!("command {:?} failed: output contains {:?}", command, trigger);
    PrivilegeError::FailedCommand {
        command: command.to_string(),
        trigger: trigger.to_string(),
        output: found.captured_str().into_owned(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StreamChannel;
    use crate::error::Error;
    use crate::platform::PrivilegeLevel;
    use indexmap::IndexMap;
    use tokio_test::io::Builder;

    fn sonic_graph() -> PrivilegeGraph {
        let mut levels = IndexMap::new();
        for level in [
            PrivilegeLevel::new("exec", r"^[\w.-]+@[\w.-]+:[\w~./-]*\$\s?$").unwrap(),
            PrivilegeLevel::new("cli", r"^[\w.-]+#\s?$")
                .unwrap()
                .with_parent("exec")
                .with_escalate("sonic-cli")
                .with_deescalate("exit"),
            PrivilegeLevel::new("configuration", r"^[\w.-]+\(config[\w.-]*\)#\s?$")
                .unwrap()
                .with_parent("cli")
                .with_escalate("configure terminal")
                .with_deescalate("end"),
        ] {
            levels.insert(level.name.clone(), level);
        }
        PrivilegeGraph::new(levels).unwrap()
    }

    fn linux_graph() -> PrivilegeGraph {
        let mut levels = IndexMap::new();
        for level in [
            PrivilegeLevel::new("user", r"^[\w.@:~/-]*\$\s?$").unwrap(),
            PrivilegeLevel::new("root", r"^[\w.@:~/-]*#\s?$")
                .unwrap()
                .with_parent("user")
                .with_escalate("sudo -i")
                .with_deescalate("exit")
                .with_auth(r"password[^\n]*:\s?$")
                .unwrap(),
        ] {
            levels.insert(level.name.clone(), level);
        }
        PrivilegeGraph::new(levels).unwrap()
    }

    fn failures() -> Vec<String> {
        vec![
            "% Invalid input detected".to_string(),
            "% Unknown command".to_string(),
        ]
    }

    fn state(current: Option<&str>) -> SessionState {
        let mut state = SessionState::new("exec");
        state.current = current.map(str::to_string);
        state
    }

    #[tokio::test]
    async fn test_detect_level_then_escalate() {
        let graph = sonic_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"\n")
            .read(b"\r\nadmin@sonic:~$ ")
            .write(b"sonic-cli\n")
            .read(b"sonic-cli\r\n")
            .read(b"sonic# ")
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(None);

        Navigator::new(&graph, &failures)
            .acquire(&mut channel, &mut state, "cli")
            .await
            .unwrap();

        assert_eq!(state.current(), Some("cli"));
    }

    #[tokio::test]
    async fn test_deescalates_one_edge_at_a_time() {
        let graph = sonic_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"end\n")
            .read(b"end\r\nsonic# ")
            .write(b"exit\n")
            .read(b"exit\r\nadmin@sonic:~$ ")
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(Some("configuration"));

        Navigator::new(&graph, &failures)
            .acquire(&mut channel, &mut state, "exec")
            .await
            .unwrap();

        assert_eq!(state.current(), Some("exec"));
    }

    #[tokio::test]
    async fn test_already_at_target_sends_nothing() {
        let graph = sonic_graph();
        let failures = failures();
        let mut channel = StreamChannel::new(Builder::new().build());
        let mut state = state(Some("cli"));

        Navigator::new(&graph, &failures)
            .acquire(&mut channel, &mut state, "cli")
            .await
            .unwrap();
        assert_eq!(state.current(), Some("cli"));
    }

    #[tokio::test]
    async fn test_unknown_target_fails_before_io() {
        let graph = sonic_graph();
        let failures = failures();
        let mut channel = StreamChannel::new(Builder::new().build());
        let mut state = state(None);

        let err = Navigator::new(&graph, &failures)
            .acquire(&mut channel, &mut state, "enable")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Privilege(PrivilegeError::UnknownLevel { .. })
        ));
        assert_eq!(state.current(), None);
    }

    #[tokio::test]
    async fn test_failure_trigger_beats_prompt() {
        let graph = sonic_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"configure terminal\n")
            .read(b"configure terminal\r\n% Invalid input detected at '^' marker.\r\nsonic(config)# ")
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(Some("cli"));

        let err = Navigator::new(&graph, &failures)
            .acquire(&mut channel, &mut state, "configuration")
            .await
            .unwrap_err();

        match err {
            Error::Privilege(PrivilegeError::FailedCommand {
                command, trigger, ..
            }) => {
                assert_eq!(command, "configure terminal");
                assert_eq!(trigger, "% Invalid input detected");
            }
            other => panic!("expected FailedCommand, got {:?}", other),
        }
        assert_eq!(state.current(), Some("cli"));
    }

    #[tokio::test]
    async fn test_failure_midway_keeps_last_confirmed_level() {
        let graph = sonic_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"sonic-cli\n")
            .read(b"sonic-cli\r\nsonic# ")
            .write(b"configure terminal\n")
            .read(b"configure terminal\r\n% Unknown command\r\nsonic# ")
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(Some("exec"));

        let err = Navigator::new(&graph, &failures)
            .acquire(&mut channel, &mut state, "configuration")
            .await
            .unwrap_err();
        assert!(err.poisons_session());
        assert_eq!(state.current(), Some("cli"));
    }

    #[tokio::test]
    async fn test_no_auth_wait_when_level_does_not_require_it() {
        // "exec -> cli" needs auth here, "cli -> configuration" does not
        let mut levels = IndexMap::new();
        for level in [
            PrivilegeLevel::new("exec", r"^[\w.-]+>\s?$").unwrap(),
            PrivilegeLevel::new("cli", r"^[\w.-]+#\s?$")
                .unwrap()
                .with_parent("exec")
                .with_escalate("enable")
                .with_deescalate("disable")
                .with_auth(r"^password:\s?$")
                .unwrap(),
            PrivilegeLevel::new("configuration", r"^[\w.-]+\(config[\w.-]*\)#\s?$")
                .unwrap()
                .with_parent("cli")
                .with_escalate("configure terminal")
                .with_deescalate("end"),
        ] {
            levels.insert(level.name.clone(), level);
        }
        let graph = PrivilegeGraph::new(levels).unwrap();
        let failures = failures();

        let mock = Builder::new()
            .write(b"configure terminal\n")
            .read(b"configure terminal\r\nPassword: ")
            .read(b"\r\nrouter(config)# ")
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(Some("cli"));
        let secret = SecretString::from("enable-secret".to_string());

        Navigator::new(&graph, &failures)
            .with_secret(Some(&secret))
            .acquire(&mut channel, &mut state, "configuration")
            .await
            .unwrap();
        assert_eq!(state.current(), Some("configuration"));
    }

    #[tokio::test]
    async fn test_escalation_with_auth() {
        let graph = linux_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"sudo -i\n")
            .read(b"sudo -i\r\n[sudo] password for admin: ")
            .write(b"hunter2\n")
            .read(b"\r\nroot@host:~# ")
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(Some("user"));
        let secret = SecretString::from("hunter2".to_string());

        Navigator::new(&graph, &failures)
            .with_secret(Some(&secret))
            .acquire(&mut channel, &mut state, "root")
            .await
            .unwrap();
        assert_eq!(state.current(), Some("root"));
    }

    #[tokio::test]
    async fn test_wrong_secret_is_auth_failure_not_timeout() {
        let graph = linux_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"sudo -i\n")
            .read(b"sudo -i\r\n[sudo] password for admin: ")
            .write(b"wrong\n")
            .read(b"\r\nSorry, try again.\r\n[sudo] password for admin: ")
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(Some("user"));
        let secret = SecretString::from("wrong".to_string());

        let err = Navigator::new(&graph, &failures)
            .with_secret(Some(&secret))
            .with_timeout(Duration::from_secs(5))
            .acquire(&mut channel, &mut state, "root")
            .await
            .unwrap_err();

        assert!(!err.is_timeout());
        assert!(matches!(
            err,
            Error::Privilege(PrivilegeError::AuthFailure { ref level, .. }) if level == "root"
        ));
        assert_eq!(state.current(), Some("user"));
    }

    #[tokio::test]
    async fn test_auth_prompt_without_secret() {
        let graph = linux_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"sudo -i\n")
            .read(b"sudo -i\r\n[sudo] password for admin: ")
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(Some("user"));

        let err = Navigator::new(&graph, &failures)
            .acquire(&mut channel, &mut state, "root")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no secret configured"));
    }

    #[tokio::test]
    async fn test_unresolvable_initial_prompt() {
        let graph = sonic_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"\n")
            .read(b"\r\nlogin: ")
            .wait(Duration::from_secs(30))
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(None);

        let err = Navigator::new(&graph, &failures)
            .with_timeout(Duration::from_millis(50))
            .acquire(&mut channel, &mut state, "cli")
            .await
            .unwrap_err();

        match err {
            Error::Privilege(PrivilegeError::UnresolvablePrompt { prompt }) => {
                assert_eq!(prompt, "login:");
            }
            other => panic!("expected UnresolvablePrompt, got {:?}", other),
        }
        assert_eq!(state.current(), None);
    }

    #[tokio::test]
    async fn test_edge_timeout_is_not_retried() {
        let graph = sonic_graph();
        let failures = failures();
        let mock = Builder::new()
            .write(b"sonic-cli\n")
            .read(b"sonic-cli\r\nLoading...")
            .wait(Duration::from_secs(30))
            .build();
        let mut channel = StreamChannel::new(mock);
        let mut state = state(Some("exec"));

        let err = Navigator::new(&graph, &failures)
            .with_timeout(Duration::from_millis(50))
            .acquire(&mut channel, &mut state, "cli")
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(state.current(), Some("exec"));
    }
}

//! Privilege level tree and path resolution.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::channel::{CompiledPrompt, MatchKind, StreamMatcher};
use crate::error::{PlatformError, PrivilegeError, Result};
use crate::platform::PrivilegeLevel;

/// Which way a transition moves through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Parent to child, deeper into privilege.
    Escalate,

    /// Child to parent, toward the root.
    Deescalate,
}

/// One edge of a privilege path.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Level the edge starts at.
    pub from: String,

    /// Level the edge ends at.
    pub to: String,

    /// Direction of travel.
    pub direction: Direction,

    /// Command to execute for the transition.
    pub command: String,

    /// Authentication sub-prompt. Only set when escalating into a level
    /// with `escalate_auth`.
    pub auth_prompt: Option<CompiledPrompt>,
}

/// Immutable, validated privilege tree.
///
/// Levels are indexed by name and linked through `previous_priv`; exactly
/// one level is the root. Paths are resolved by name lookup, so the graph
/// can be shared across any number of sessions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PrivilegeGraph {
    levels: IndexMap<String, PrivilegeLevel>,
    root: String,
}

impl PrivilegeGraph {
    /// Validate privilege level definitions and build the graph.
    ///
    /// Rejects anything that isn't a single rooted tree with complete edge
    /// commands, and prompt sets that are detectably ambiguous: identical
    /// pattern sources, or a sample prompt claimed by the wrong level.
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Result<Self> {
        let root = Self::validate_tree(&levels)?;
        Self::validate_prompts(&levels)?;
        Ok(Self { levels, root })
    }

    fn validate_tree(levels: &IndexMap<String, PrivilegeLevel>) -> Result<String> {
        if levels.is_empty() {
            return Err(invalid("no privilege levels defined"));
        }

        let mut roots = Vec::new();
        for (key, level) in levels {
            if *key != level.name {
                return Err(invalid(format!(
                    "level registered as '{}' is named '{}'",
                    key, level.name
                )));
            }

            let Some(parent) = &level.previous_priv else {
                roots.push(key.clone());
                continue;
            };

            if !levels.contains_key(parent) {
                return Err(invalid(format!(
                    "level '{}' has unknown parent '{}'",
                    key, parent
                )));
            }
            if level.escalate_command.as_deref().unwrap_or_default().is_empty() {
                return Err(invalid(format!("level '{}' has no escalate command", key)));
            }
            if level
                .deescalate_command
                .as_deref()
                .unwrap_or_default()
                .is_empty()
            {
                return Err(invalid(format!("level '{}' has no deescalate command", key)));
            }
            if level.escalate_auth && level.escalate_prompt.is_none() {
                return Err(invalid(format!(
                    "level '{}' requires escalation auth but has no auth prompt",
                    key
                )));
            }
        }

        let root = match roots.as_slice() {
            [root] => root.clone(),
            [] => return Err(invalid("no root level (every level has a parent)")),
            _ => return Err(invalid(format!("multiple root levels: {:?}", roots))),
        };

        // With one root and known parents, any level that can't reach the
        // root within len() steps sits on a cycle.
        for name in levels.keys() {
            let mut node = name.as_str();
            let mut steps = 0;
            while let Some(parent) = levels[node].previous_priv.as_deref() {
                node = parent;
                steps += 1;
                if steps > levels.len() {
                    return Err(invalid(format!("cycle through level '{}'", name)));
                }
            }
        }

        Ok(root)
    }

    fn validate_prompts(levels: &IndexMap<String, PrivilegeLevel>) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for level in levels.values() {
            if !seen.insert(level.pattern.as_str()) {
                return Err(invalid(format!(
                    "level '{}' reuses another level's prompt pattern",
                    level.name
                )));
            }
        }

        for owner in levels.values() {
            for sample in &owner.sample_prompts {
                if !owner.matches(sample) {
                    return Err(invalid(format!(
                        "sample prompt '{}' does not match its own level '{}'",
                        sample, owner.name
                    )));
                }
                if let Some(other) = levels
                    .values()
                    .find(|l| l.name != owner.name && l.matches(sample))
                {
                    return Err(invalid(format!(
                        "sample prompt '{}' of level '{}' also matches level '{}'",
                        sample, owner.name, other.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Name of the root level.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Get a privilege level by name.
    pub fn get(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.levels.get(name)
    }

    fn require(&self, name: &str) -> Result<&PrivilegeLevel> {
        self.levels.get(name).ok_or_else(|| {
            PrivilegeError::UnknownLevel {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// The chain from `name` up to and including the root.
    pub fn ancestors(&self, name: &str) -> Result<Vec<&str>> {
        let mut chain = vec![self.require(name)?.name.as_str()];
        let mut node = &self.levels[name];
        while let Some(parent) = node.previous_priv.as_deref() {
            node = &self.levels[parent];
            chain.push(node.name.as_str());
        }
        Ok(chain)
    }

    /// Resolve the unique path between two levels.
    ///
    /// Deescalates from `from` up to the lowest common ancestor, then
    /// escalates down to `to`. Both names are checked before anything is
    /// computed.
    pub fn resolve_path(&self, from: &str, to: &str) -> Result<Vec<Transition>> {
        self.require(from)?;
        self.require(to)?;

        if from == to {
            return Ok(vec![]);
        }

        let up = self.ancestors(from)?;
        let down = self.ancestors(to)?;
        let lca = up
            .iter()
            .copied()
            .find(|name| down.contains(name))
            .unwrap_or(self.root.as_str());

        let mut path = Vec::with_capacity(up.len() + down.len());

        for pair in up.windows(2) {
            if pair[0] == lca {
                break;
            }
            path.push(self.deescalation(pair[0], pair[1]));
        }

        let descent: Vec<&str> = down.iter().copied().take_while(|name| *name != lca).collect();
        for name in descent.into_iter().rev() {
            path.push(self.escalation(name));
        }

        Ok(path)
    }

    fn deescalation(&self, from: &str, to: &str) -> Transition {
        let level = &self.levels[from];
        Transition {
            from: from.to_string(),
            to: to.to_string(),
            direction: Direction::Deescalate,
            command: level.deescalate_command.clone().unwrap_or_default(),
            auth_prompt: None,
        }
    }

    fn escalation(&self, to: &str) -> Transition {
        let level = &self.levels[to];
        Transition {
            from: level.previous_priv.clone().unwrap_or_default(),
            to: to.to_string(),
            direction: Direction::Escalate,
            command: level.escalate_command.clone().unwrap_or_default(),
            auth_prompt: level.auth_prompt(),
        }
    }

    /// Determine the privilege level a prompt belongs to.
    ///
    /// Every level is checked; a prompt claimed by more than one level is
    /// reported rather than resolved by definition order.
    pub fn determine_from_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        let matching: Vec<&PrivilegeLevel> =
            self.levels.values().filter(|l| l.matches(prompt)).collect();

        match matching.as_slice() {
            [level] => Ok(*level),
            [] => Err(PrivilegeError::UnresolvablePrompt {
                prompt: prompt.to_string(),
            }
            .into()),
            _ => Err(PrivilegeError::AmbiguousPrompt {
                prompt: prompt.to_string(),
                levels: matching.iter().map(|l| l.name.clone()).collect(),
            }
            .into()),
        }
    }

    /// A matcher that recognises the prompt of any level.
    pub fn prompt_matcher(&self, search_depth: usize) -> StreamMatcher {
        self.levels
            .values()
            .fold(StreamMatcher::new(search_depth), |matcher, level| {
                matcher.with_candidate(
                    MatchKind::Prompt {
                        level: level.name.clone(),
                    },
                    level.prompt(),
                )
            })
    }
}

fn invalid(message: impl Into<String>) -> crate::error::Error {
    PlatformError::InvalidDefinition {
        message: message.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn make_test_levels() -> IndexMap<String, PrivilegeLevel> {
        let exec = PrivilegeLevel::new("exec", r"^[\w.-]+@[\w.-]+:[\w~./-]*\$\s?$").unwrap();

        let cli = PrivilegeLevel::new("cli", r"^[\w.-]+#\s?$")
            .unwrap()
            .with_parent("exec")
            .with_escalate("sonic-cli")
            .with_deescalate("exit");

        let configuration = PrivilegeLevel::new("configuration", r"^[\w.-]+\(config[\w.-]*\)#\s?$")
            .unwrap()
            .with_parent("cli")
            .with_escalate("configure terminal")
            .with_deescalate("end");

        let mut levels = IndexMap::new();
        levels.insert("exec".to_string(), exec);
        levels.insert("cli".to_string(), cli);
        levels.insert("configuration".to_string(), configuration);
        levels
    }

    fn edges(path: &[Transition]) -> Vec<(&str, &str, Direction)> {
        path.iter()
            .map(|t| (t.from.as_str(), t.to.as_str(), t.direction))
            .collect()
    }

    #[test]
    fn test_resolve_path_down_to_root() {
        let graph = PrivilegeGraph::new(make_test_levels()).unwrap();
        let path = graph.resolve_path("configuration", "exec").unwrap();
        assert_eq!(
            edges(&path),
            vec![
                ("configuration", "cli", Direction::Deescalate),
                ("cli", "exec", Direction::Deescalate),
            ]
        );
        assert_eq!(path[0].command, "end");
        assert_eq!(path[1].command, "exit");
    }

    #[test]
    fn test_resolve_path_up_from_root() {
        let graph = PrivilegeGraph::new(make_test_levels()).unwrap();
        let path = graph.resolve_path("exec", "configuration").unwrap();
        assert_eq!(
            edges(&path),
            vec![
                ("exec", "cli", Direction::Escalate),
                ("cli", "configuration", Direction::Escalate),
            ]
        );
        assert_eq!(path[0].command, "sonic-cli");
        assert_eq!(path[1].command, "configure terminal");
    }

    #[test]
    fn test_resolve_path_same_level() {
        let graph = PrivilegeGraph::new(make_test_levels()).unwrap();
        assert!(graph.resolve_path("cli", "cli").unwrap().is_empty());
    }

    #[test]
    fn test_resolve_path_across_branches() {
        let mut levels = make_test_levels();
        let shell = PrivilegeLevel::new("root_shell", r"^root@[\w.-]+:[\w~./-]*#\s?$")
            .unwrap()
            .with_parent("exec")
            .with_escalate("sudo -i")
            .with_deescalate("exit")
            .with_auth(r"password[^\n]*:\s?$")
            .unwrap();
        levels.insert("root_shell".to_string(), shell);
        let graph = PrivilegeGraph::new(levels).unwrap();

        let path = graph.resolve_path("configuration", "root_shell").unwrap();
        assert_eq!(
            edges(&path),
            vec![
                ("configuration", "cli", Direction::Deescalate),
                ("cli", "exec", Direction::Deescalate),
                ("exec", "root_shell", Direction::Escalate),
            ]
        );
        assert!(path[2].auth_prompt.is_some());
        assert!(path[0].auth_prompt.is_none());
    }

    #[test]
    fn test_resolve_path_unknown_level() {
        let graph = PrivilegeGraph::new(make_test_levels()).unwrap();
        for (from, to) in [("exec", "enable"), ("enable", "exec"), ("nope", "nada")] {
            let err = graph.resolve_path(from, to).unwrap_err();
            assert!(matches!(
                err,
                Error::Privilege(PrivilegeError::UnknownLevel { .. })
            ));
        }
    }

    #[test]
    fn test_determine_privilege() {
        let graph = PrivilegeGraph::new(make_test_levels()).unwrap();
        assert_eq!(graph.determine_from_prompt("admin@sonic:~$").unwrap().name, "exec");
        assert_eq!(graph.determine_from_prompt("sonic#").unwrap().name, "cli");
        assert_eq!(
            graph.determine_from_prompt("sonic(config)#").unwrap().name,
            "configuration"
        );
        assert!(matches!(
            graph.determine_from_prompt("login:"),
            Err(Error::Privilege(PrivilegeError::UnresolvablePrompt { .. }))
        ));
    }

    #[test]
    fn test_determine_reports_ambiguity() {
        let mut levels = make_test_levels();
        levels.insert(
            "broad".to_string(),
            PrivilegeLevel::new("broad", r"#\s?$")
                .unwrap()
                .with_parent("exec")
                .with_escalate("shell")
                .with_deescalate("exit"),
        );
        let graph = PrivilegeGraph::new(levels).unwrap();

        match graph.determine_from_prompt("sonic#") {
            Err(Error::Privilege(PrivilegeError::AmbiguousPrompt { levels, .. })) => {
                assert_eq!(levels, vec!["cli".to_string(), "broad".to_string()]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_multiple_roots() {
        let mut levels = make_test_levels();
        levels.insert(
            "other".to_string(),
            PrivilegeLevel::new("other", r"^other>\s?$").unwrap(),
        );
        assert!(PrivilegeGraph::new(levels).is_err());
    }

    #[test]
    fn test_rejects_cycle() {
        let mut levels = make_test_levels();
        levels.insert(
            "a".to_string(),
            PrivilegeLevel::new("a", r"^a>\s?$")
                .unwrap()
                .with_parent("b")
                .with_escalate("a")
                .with_deescalate("x"),
        );
        levels.insert(
            "b".to_string(),
            PrivilegeLevel::new("b", r"^b>\s?$")
                .unwrap()
                .with_parent("a")
                .with_escalate("b")
                .with_deescalate("x"),
        );
        let err = PrivilegeGraph::new(levels).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_rejects_unknown_parent_and_missing_commands() {
        let mut levels = make_test_levels();
        levels["configuration"].previous_priv = Some("enable".to_string());
        assert!(PrivilegeGraph::new(levels).is_err());

        let mut levels = make_test_levels();
        levels["cli"].deescalate_command = None;
        let err = PrivilegeGraph::new(levels).unwrap_err();
        assert!(err.to_string().contains("deescalate"));
    }

    #[test]
    fn test_rejects_duplicate_patterns() {
        let mut levels = make_test_levels();
        levels["configuration"].pattern = levels["cli"].pattern.clone();
        assert!(PrivilegeGraph::new(levels).is_err());
    }

    #[test]
    fn test_rejects_overlapping_sample_prompt() {
        let mut levels = make_test_levels();
        levels["cli"].pattern = crate::channel::compile_prompt_pattern(r"#\s?$").unwrap();
        levels["configuration"]
            .sample_prompts
            .push("sonic(config)#".to_string());
        let err = PrivilegeGraph::new(levels).unwrap_err();
        assert!(err.to_string().contains("also matches level 'cli'"));
    }

    #[test]
    fn test_prompt_matcher_covers_all_levels() {
        let graph = PrivilegeGraph::new(make_test_levels()).unwrap();
        let mut matcher = graph.prompt_matcher(1000);
        assert_eq!(matcher.candidate_count(), 3);

        let found = matcher.feed(b"\r\nsonic(config)# ").unwrap();
        assert_eq!(
            found.kind,
            MatchKind::Prompt {
                level: "configuration".to_string()
            }
        );
    }
}

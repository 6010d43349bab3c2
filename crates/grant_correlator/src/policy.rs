//! Static mapping from a triggering server group to the channel group to grant.

use crate::error::{PolicyError, PolicyResult};
use crate::types::{ChannelGroupId, ChannelId, ServerGroupId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server group of the reference rule (the thief group).
pub const REFERENCE_SERVER_GROUP: ServerGroupId = ServerGroupId(27);
/// Channel group granted by the reference rule.
pub const REFERENCE_CHANNEL_GROUP: ChannelGroupId = ChannelGroupId(13);
/// Channel the reference rule grants in (the officers' room).
pub const REFERENCE_CHANNEL: ChannelId = ChannelId(19);

/// One policy entry: membership of `server_group` earns `channel_group` in `channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRule {
    pub server_group: ServerGroupId,
    pub channel_group: ChannelGroupId,
    pub channel: ChannelId,
}

/// The outcome half of a [`GrantRule`], fixed on a pending resolution at event time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantTarget {
    pub channel_group: ChannelGroupId,
    pub channel: ChannelId,
}

impl GrantRule {
    pub fn target(&self) -> GrantTarget {
        GrantTarget {
            channel_group: self.channel_group,
            channel: self.channel,
        }
    }
}

/// Read-only policy table.
///
/// Built once at startup. Lookups are plain hash reads so the table can be
/// shared behind an `Arc` without locking.
#[derive(Debug, Clone, Default)]
pub struct GroupGrantPolicy {
    rules: HashMap<ServerGroupId, GrantTarget>,
}

impl GroupGrantPolicy {
    /// Builds a policy from a list of rules, rejecting a server group listed twice.
    pub fn from_rules(rules: impl IntoIterator<Item = GrantRule>) -> PolicyResult<Self> {
        let mut table = HashMap::new();
        for rule in rules {
            if table.insert(rule.server_group, rule.target()).is_some() {
                return Err(PolicyError::DuplicateRule(rule.server_group));
            }
        }
        Ok(Self { rules: table })
    }

    /// The thief group grants the officers-room team group.
    pub fn reference() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            REFERENCE_SERVER_GROUP,
            GrantTarget {
                channel_group: REFERENCE_CHANNEL_GROUP,
                channel: REFERENCE_CHANNEL,
            },
        );
        Self { rules }
    }

    pub fn lookup(&self, server_group: ServerGroupId) -> Option<GrantTarget> {
        self.rules.get(&server_group).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in ascending server-group order.
    pub fn rules(&self) -> Vec<GrantRule> {
        let mut rules: Vec<GrantRule> = self
            .rules
            .iter()
            .map(|(server_group, target)| GrantRule {
                server_group: *server_group,
                channel_group: target.channel_group,
                channel: target.channel,
            })
            .collect();
        rules.sort_by_key(|rule| rule.server_group);
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(server_group: u64, channel_group: u64, channel: u64) -> GrantRule {
        GrantRule {
            server_group: ServerGroupId(server_group),
            channel_group: ChannelGroupId(channel_group),
            channel: ChannelId(channel),
        }
    }

    #[test]
    fn test_reference_policy() {
        let policy = GroupGrantPolicy::reference();
        assert_eq!(policy.len(), 1);
        assert_eq!(
            policy.lookup(ServerGroupId(27)),
            Some(GrantTarget {
                channel_group: ChannelGroupId(13),
                channel: ChannelId(19),
            })
        );
        assert_eq!(policy.lookup(ServerGroupId(99)), None);
    }

    #[test]
    fn test_from_rules_supports_many_entries() {
        let policy = GroupGrantPolicy::from_rules([rule(27, 13, 19), rule(30, 14, 20)]).unwrap();
        assert_eq!(policy.len(), 2);
        assert_eq!(policy.lookup(ServerGroupId(30)).unwrap().channel, ChannelId(20));
        assert_eq!(policy.rules(), vec![rule(27, 13, 19), rule(30, 14, 20)]);
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let err = GroupGrantPolicy::from_rules([rule(27, 13, 19), rule(27, 1, 1)]).unwrap_err();
        assert_eq!(err, PolicyError::DuplicateRule(ServerGroupId(27)));
    }

    #[test]
    fn test_empty_policy_matches_nothing() {
        let policy = GroupGrantPolicy::from_rules(Vec::new()).unwrap();
        assert!(policy.is_empty());
        assert_eq!(policy.lookup(ServerGroupId(27)), None);
    }
}

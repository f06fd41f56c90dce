//! Topic policy for custom Kafka forwarding
//!
//! Synthesized conventional topics are derived, not user-supplied, and
//! bypass the policy. An explicitly configured topic is custom forwarding
//! and must be allowed here before any send.

use std::collections::HashSet;

/// Decides whether a custom topic may be published to
pub trait TopicPolicy: Send + Sync {
    /// Whether publishing to `topic` is allowed
    fn is_topic_allowed(&self, topic: &str) -> bool;
}

/// Policy that allows every topic
///
/// For development and tests; production deployments should configure an
/// [`AllowListTopicPolicy`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllTopics;

impl TopicPolicy for AllowAllTopics {
    fn is_topic_allowed(&self, _topic: &str) -> bool {
        true
    }
}

/// Allow-list policy over exact topic names
#[derive(Debug, Default, Clone)]
pub struct AllowListTopicPolicy {
    allowed: HashSet<String>,
}

impl AllowListTopicPolicy {
    /// Create a policy from an initial allow-list
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a topic to the allow-list
    pub fn allow(&mut self, topic: impl Into<String>) {
        self.allowed.insert(topic.into());
    }

    /// Number of allowed topics
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Whether the allow-list is empty (everything is rejected)
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl TopicPolicy for AllowListTopicPolicy {
    fn is_topic_allowed(&self, topic: &str) -> bool {
        self.allowed.contains(topic)
    }
}

use std::fmt;

/// Identity of a registered metric.
///
/// Ordering follows the field order, which keeps enumeration deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricName {
    pub group: String,
    pub kind: String,
    pub name: String,
    pub scope: Option<String>,
}

impl MetricName {
    pub fn new(group: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        MetricName {
            group: group.into(),
            kind: kind.into(),
            name: name.into(),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:type={},name={}", self.group, self.kind, self.name)?;
        if let Some(scope) = &self.scope {
            write!(f, ",scope={}", scope)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MetricName;

    #[test]
    fn orders_by_group_then_kind_then_name() {
        let mut names = vec![
            MetricName::new("kafka.server", "ReplicaManager", "LeaderCount"),
            MetricName::new("kafka.network", "RequestMetrics", "RequestsPerSec"),
            MetricName::new("kafka.server", "BrokerTopicMetrics", "MessagesInPerSec"),
        ];
        names.sort();
        let order: Vec<&str> = names.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, ["RequestsPerSec", "MessagesInPerSec", "LeaderCount"]);
    }

    #[test]
    fn display_includes_scope_when_present() {
        let name = MetricName::new("kafka.log", "Log", "Size").with_scope("topic.orders.partition.0");
        assert_eq!(
            name.to_string(),
            "kafka.log:type=Log,name=Size,scope=topic.orders.partition.0"
        );
    }
}

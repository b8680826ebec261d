// SPDX-License-Identifier: MIT

use anyhow::anyhow;

/// Infrastructure health-check endpoint. Requests against it must never
/// be mistaken for the receiving event of an invocation.
pub const INFRA_ENDPOINT: &str = "functions.infraendpoint";

/// Mechanism by which an invocation is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TriggerType {
    Http,
    Storage,
    Queue,
    Database,
    EventHub,
    EventGrid,
    ServiceBusTopic,
}

impl TriggerType {
    pub fn new(trigger: &str) -> anyhow::Result<Self> {
        match trigger.to_lowercase().as_str() {
            "http" => Ok(TriggerType::Http),
            "storage" => Ok(TriggerType::Storage),
            "queue" => Ok(TriggerType::Queue),
            "database" => Ok(TriggerType::Database),
            "eventhub" => Ok(TriggerType::EventHub),
            "eventgrid" => Ok(TriggerType::EventGrid),
            "servicebustopic" => Ok(TriggerType::ServiceBusTopic),
            _ => Err(anyhow!("unknown trigger type: {}", trigger)),
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            TriggerType::Http,
            TriggerType::Storage,
            TriggerType::Queue,
            TriggerType::Database,
            TriggerType::EventHub,
            TriggerType::EventGrid,
            TriggerType::ServiceBusTopic,
        ]
    }

    /// Name of the dependency event reporting the end-to-end completion
    /// time for this trigger, as emitted by the system under test.
    pub fn completion_track_name(&self) -> String {
        format!("completiontrack{}", self)
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TriggerType::Http => write!(f, "http"),
            TriggerType::Storage => write!(f, "storage"),
            TriggerType::Queue => write!(f, "queue"),
            TriggerType::Database => write!(f, "database"),
            TriggerType::EventHub => write!(f, "eventhub"),
            TriggerType::EventGrid => write!(f, "eventgrid"),
            TriggerType::ServiceBusTopic => write!(f, "servicebustopic"),
        }
    }
}

/// Language runtime of the function under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Runtime {
    Node,
    Dotnet,
}

impl Runtime {
    pub fn new(runtime: &str) -> anyhow::Result<Self> {
        match runtime.to_lowercase().as_str() {
            "node" => Ok(Runtime::Node),
            "dotnet" => Ok(Runtime::Dotnet),
            _ => Err(anyhow!("unknown runtime: {}", runtime)),
        }
    }
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Runtime::Node => write!(f, "node"),
            Runtime::Dotnet => write!(f, "dotnet"),
        }
    }
}

/// Admissible dependency-event count within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyRule {
    Exactly(usize),
    AtLeast(usize),
    Any,
}

impl DependencyRule {
    fn matches(&self, dependencies: usize) -> bool {
        match self {
            DependencyRule::Exactly(expected) => dependencies == *expected,
            DependencyRule::AtLeast(minimum) => dependencies >= *minimum,
            DependencyRule::Any => true,
        }
    }
}

/// Expected per-kind event counts of a structurally complete invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct GroupShape {
    pub traces: usize,
    pub requests: usize,
    pub dependencies: DependencyRule,
}

impl GroupShape {
    pub fn matches(&self, traces: usize, requests: usize, dependencies: usize) -> bool {
        traces == self.traces && requests == self.requests && self.dependencies.matches(dependencies)
    }
}

#[derive(serde::Deserialize)]
struct ShapeOverrides {
    shapes: std::collections::HashMap<String, GroupShape>,
}

/// Expected-shape table keyed by trigger type. Shapes are looked up per
/// trigger, never hard-coded at the use sites, and can be overridden
/// from a TOML file.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    shapes: std::collections::HashMap<TriggerType, GroupShape>,
}

impl ProfileTable {
    /// Shapes observed on the system under test.
    pub fn builtin() -> Self {
        let mut shapes = std::collections::HashMap::new();
        for trigger in TriggerType::all() {
            let shape = match trigger {
                TriggerType::Http => GroupShape {
                    traces: 4,
                    requests: 2,
                    dependencies: DependencyRule::Exactly(2),
                },
                TriggerType::Storage => GroupShape {
                    traces: 4,
                    requests: 2,
                    dependencies: DependencyRule::Exactly(9),
                },
                _ => GroupShape {
                    traces: 4,
                    requests: 2,
                    dependencies: DependencyRule::AtLeast(1),
                },
            };
            shapes.insert(trigger, shape);
        }
        Self { shapes }
    }

    /// Builtin table with per-trigger overrides applied from TOML:
    ///
    /// ```toml
    /// [shapes.http]
    /// traces = 4
    /// requests = 2
    /// dependencies = { exactly = 2 }
    /// ```
    pub fn with_overrides(content: &str) -> anyhow::Result<Self> {
        let overrides: ShapeOverrides = toml::from_str(content)?;
        let mut table = Self::builtin();
        for (trigger, shape) in overrides.shapes {
            table.shapes.insert(TriggerType::new(&trigger)?, shape);
        }
        Ok(table)
    }

    pub fn shape(&self, trigger: TriggerType) -> GroupShape {
        self.shapes.get(&trigger).copied().unwrap_or(GroupShape {
            traces: 4,
            requests: 2,
            dependencies: DependencyRule::AtLeast(1),
        })
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_type_round_trip() {
        for trigger in TriggerType::all() {
            assert_eq!(trigger, TriggerType::new(&trigger.to_string()).unwrap());
        }
        assert!(TriggerType::new("HTTP").is_ok());
        assert!(TriggerType::new("timer").is_err());
        assert!(TriggerType::new("").is_err());
    }

    #[test]
    fn test_runtime_round_trip() {
        assert_eq!(Runtime::Node, Runtime::new("node").unwrap());
        assert_eq!(Runtime::Dotnet, Runtime::new("DotNet").unwrap());
        assert!(Runtime::new("python").is_err());
    }

    #[test]
    fn test_completion_track_name() {
        assert_eq!(TriggerType::Http.completion_track_name(), "completiontrackhttp");
        assert_eq!(TriggerType::ServiceBusTopic.completion_track_name(), "completiontrackservicebustopic");
    }

    #[test]
    fn test_shape_matches() {
        let shape = GroupShape {
            traces: 4,
            requests: 2,
            dependencies: DependencyRule::Exactly(2),
        };
        assert!(shape.matches(4, 2, 2));
        assert!(!shape.matches(4, 2, 3));
        assert!(!shape.matches(3, 2, 2));
        assert!(!shape.matches(4, 1, 2));

        let shape = GroupShape {
            traces: 4,
            requests: 2,
            dependencies: DependencyRule::AtLeast(1),
        };
        assert!(shape.matches(4, 2, 1));
        assert!(shape.matches(4, 2, 9));
        assert!(!shape.matches(4, 2, 0));

        let shape = GroupShape {
            traces: 4,
            requests: 2,
            dependencies: DependencyRule::Any,
        };
        assert!(shape.matches(4, 2, 0));
    }

    #[test]
    fn test_builtin_table() {
        let table = ProfileTable::builtin();
        assert_eq!(table.shape(TriggerType::Http).dependencies, DependencyRule::Exactly(2));
        assert_eq!(table.shape(TriggerType::Storage).dependencies, DependencyRule::Exactly(9));
        assert_eq!(table.shape(TriggerType::Database).dependencies, DependencyRule::AtLeast(1));
        for trigger in TriggerType::all() {
            assert_eq!(table.shape(trigger).requests, 2);
        }
    }

    #[test]
    fn test_toml_overrides() {
        let table = ProfileTable::with_overrides(
            r#"
            [shapes.queue]
            traces = 6
            requests = 2
            dependencies = { exactly = 3 }

            [shapes.http]
            traces = 4
            requests = 2
            dependencies = "any"
            "#,
        )
        .unwrap();
        assert_eq!(
            table.shape(TriggerType::Queue),
            GroupShape {
                traces: 6,
                requests: 2,
                dependencies: DependencyRule::Exactly(3),
            }
        );
        assert_eq!(table.shape(TriggerType::Http).dependencies, DependencyRule::Any);
        // untouched triggers keep the builtin shape
        assert_eq!(table.shape(TriggerType::Storage).dependencies, DependencyRule::Exactly(9));
    }

    #[test]
    fn test_toml_overrides_unknown_trigger() {
        assert!(ProfileTable::with_overrides(
            r#"
            [shapes.timer]
            traces = 4
            requests = 2
            dependencies = "any"
            "#,
        )
        .is_err());
        assert!(ProfileTable::with_overrides("not toml at all [").is_err());
    }
}

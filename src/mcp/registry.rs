//! Concurrent tool registry.
//!
//! Tools and their derived metadata live in one map behind one lock, so a
//! reader never observes a tool without its metadata. Lookups hand out an
//! `Arc` and release the lock before the caller executes anything.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::mcp::tool::Tool;

/// Version tag attached to every registered tool.
pub const TOOL_VERSION: &str = "1.0.0";

/// Coarse tool grouping inferred from the tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Clocks and timezones.
    Time,
    /// Calendar conversion.
    Calendar,
    /// Sun and moon.
    Astronomy,
    /// Holidays and festivals.
    Holiday,
    /// Everything else.
    General,
}

impl ToolCategory {
    /// Infers the category from substrings of the tool name, first match wins.
    #[must_use]
    pub fn infer(name: &str) -> Self {
        let name = name.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

        if has(&["time", "timezone", "clock"]) {
            Self::Time
        } else if has(&["calendar", "date"]) {
            Self::Calendar
        } else if has(&["astro", "sun", "moon"]) {
            Self::Astronomy
        } else if has(&["holiday", "festival"]) {
            Self::Holiday
        } else {
            Self::General
        }
    }

    /// The wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Calendar => "calendar",
            Self::Astronomy => "astronomy",
            Self::Holiday => "holiday",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata derived at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolMetadata {
    /// Inferred category.
    pub category: ToolCategory,
    /// Version tag.
    pub version: &'static str,
    /// Cacheability hint copied from the tool.
    pub cacheable: bool,
    /// Cache lifetime hint copied from the tool.
    pub cache_ttl_seconds: u64,
}

/// A tool as listed by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema of the tool parameters.
    pub parameters: Value,
    /// Cacheability hint.
    pub cacheable: bool,
    /// Cache lifetime hint in seconds.
    #[serde(rename = "cacheTTL")]
    pub cache_ttl: u64,
    /// Inferred category.
    pub category: ToolCategory,
    /// Version tag.
    pub version: &'static str,
}

struct RegistryEntry {
    tool: Arc<dyn Tool>,
    metadata: ToolMetadata,
}

/// The set of tools a server exposes.
///
/// Shared across all transports; every method takes `&self`.
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<IndexMap<String, RegistryEntry>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool already registered under the same name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::BlankName`] if the tool name is empty or whitespace.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::BlankName);
        }

        let metadata = ToolMetadata {
            category: ToolCategory::infer(&name),
            version: TOOL_VERSION,
            cacheable: tool.is_cacheable(),
            cache_ttl_seconds: tool.cache_ttl_seconds(),
        };
        let category = metadata.category;

        let replaced = self
            .entries
            .write()
            .insert(name.clone(), RegistryEntry { tool, metadata })
            .is_some();

        if replaced {
            info!(tool = %name, "Replaced previously registered tool");
        } else {
            info!(tool = %name, category = %category, "Registered tool");
        }
        Ok(())
    }

    /// Registers several tools, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first registration error; tools before it stay registered.
    pub fn register_all<I>(&self, tools: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        tools.into_iter().try_for_each(|tool| self.register(tool))
    }

    /// Removes a tool. Returns `true` if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.entries.write().shift_remove(name).is_some();
        if removed {
            info!(tool = %name, "Unregistered tool");
        } else {
            debug!(tool = %name, "Unregister requested for unknown tool");
        }
        removed
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries.read().get(name).map(|e| Arc::clone(&e.tool))
    }

    /// Returns `true` if a tool with this name is registered.
    #[must_use]
    pub fn has_tool(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Derived metadata for one tool.
    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<ToolMetadata> {
        self.entries.read().get(name).map(|e| e.metadata.clone())
    }

    /// Describes every registered tool, in registration order.
    ///
    /// Descriptors carry the registered (trimmed) name, which is the dispatch key.
    #[must_use]
    pub fn list_descriptors(&self) -> Vec<ToolDescriptor> {
        let entries: Vec<(String, Arc<dyn Tool>, ToolMetadata)> = self
            .entries
            .read()
            .iter()
            .map(|(name, e)| (name.clone(), Arc::clone(&e.tool), e.metadata.clone()))
            .collect();

        entries
            .into_iter()
            .map(|(name, tool, metadata)| ToolDescriptor {
                name,
                description: tool.description().to_string(),
                parameters: tool.parameter_schema().to_value(),
                cacheable: metadata.cacheable,
                cache_ttl: metadata.cache_ttl_seconds,
                category: metadata.category,
                version: metadata.version,
            })
            .collect()
    }

    /// Names of all registered tools, in registration order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Tools in the given category.
    #[must_use]
    pub fn tools_by_category(&self, category: ToolCategory) -> Vec<Arc<dyn Tool>> {
        self.snapshot()
            .into_iter()
            .filter(|(_, metadata)| metadata.category == category)
            .map(|(tool, _)| tool)
            .collect()
    }

    /// Tools that declare themselves cacheable.
    #[must_use]
    pub fn cacheable_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.snapshot()
            .into_iter()
            .filter(|(_, metadata)| metadata.cacheable)
            .map(|(tool, _)| tool)
            .collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every tool.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        info!(count, "Cleared tool registry");
    }

    // Clones the entries out so tool methods run without the lock held
    fn snapshot(&self) -> Vec<(Arc<dyn Tool>, ToolMetadata)> {
        self.entries
            .read()
            .values()
            .map(|e| (Arc::clone(&e.tool), e.metadata.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::Params;
    use crate::mcp::schema::ParameterSchema;
    use crate::mcp::tool::{ToolError, ToolResponse};

    struct Named {
        name: &'static str,
        label: &'static str,
        cacheable: bool,
    }

    impl Named {
        fn arc(name: &'static str) -> Arc<dyn Tool> {
            Arc::new(Self {
                name,
                label: "first",
                cacheable: false,
            })
        }
    }

    impl Tool for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.label
        }

        fn parameter_schema(&self) -> ParameterSchema {
            ParameterSchema::new()
        }

        fn execute(&self, _params: &Params) -> Result<ToolResponse, ToolError> {
            Ok(ToolResponse::single("label", self.label))
        }

        fn is_cacheable(&self) -> bool {
            self.cacheable
        }

        fn cache_ttl_seconds(&self) -> u64 {
            if self.cacheable {
                60
            } else {
                0
            }
        }
    }

    #[test]
    fn category_inference_order() {
        assert_eq!(ToolCategory::infer("get_current_time"), ToolCategory::Time);
        assert_eq!(ToolCategory::infer("convert_timezone"), ToolCategory::Time);
        assert_eq!(ToolCategory::infer("world_clock"), ToolCategory::Time);
        assert_eq!(
            ToolCategory::infer("get_religious_calendar"),
            ToolCategory::Calendar
        );
        assert_eq!(ToolCategory::infer("date_diff"), ToolCategory::Calendar);
        assert_eq!(
            ToolCategory::infer("get_astronomical_info"),
            ToolCategory::Astronomy
        );
        assert_eq!(ToolCategory::infer("moon_watch"), ToolCategory::Astronomy);
        assert_eq!(ToolCategory::infer("list_holidays"), ToolCategory::Holiday);
        assert_eq!(ToolCategory::infer("echo"), ToolCategory::General);
        // "sunrise_time" contains "time" first
        assert_eq!(ToolCategory::infer("sunrise_time"), ToolCategory::Time);
    }

    #[test]
    fn blank_names_are_rejected() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.register(Named::arc("   ")),
            Err(RegistryError::BlankName)
        );
        assert_eq!(registry.register(Named::arc("")), Err(RegistryError::BlankName));
        assert!(registry.is_empty());
    }

    #[test]
    fn re_registration_overwrites() {
        let registry = ToolRegistry::new();
        registry.register(Named::arc("echo")).unwrap();
        registry
            .register(Arc::new(Named {
                name: "echo",
                label: "second",
                cacheable: false,
            }))
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().description(), "second");
    }

    #[test]
    fn padded_names_are_listed_by_their_key() {
        let registry = ToolRegistry::new();
        registry.register(Named::arc("  echo ")).unwrap();

        assert_eq!(registry.tool_names(), ["echo"]);
        let descriptors = registry.list_descriptors();
        assert_eq!(descriptors[0].name, "echo");
        assert!(registry.get(&descriptors[0].name).is_some());
    }

    #[test]
    fn unregister_unknown_is_a_no_op() {
        let registry = ToolRegistry::new();
        registry.register(Named::arc("echo")).unwrap();
        assert!(!registry.unregister("missing"));
        assert!(registry.unregister("echo"));
        assert!(!registry.has_tool("echo"));
    }

    #[test]
    fn descriptors_follow_registration_order() {
        let registry = ToolRegistry::new();
        registry
            .register_all([Named::arc("b_tool"), Named::arc("a_time")])
            .unwrap();

        let descriptors = registry.list_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "b_tool");
        assert_eq!(descriptors[1].category, ToolCategory::Time);
        assert_eq!(descriptors[1].version, TOOL_VERSION);

        let json = serde_json::to_value(&descriptors[0]).unwrap();
        assert_eq!(json["category"], "general");
        assert_eq!(json["cacheTTL"], 0);
        assert_eq!(json["parameters"]["type"], "object");
    }

    #[test]
    fn category_and_cache_queries() {
        let registry = ToolRegistry::new();
        registry.register(Named::arc("get_current_time")).unwrap();
        registry
            .register(Arc::new(Named {
                name: "convert_timezone",
                label: "cached",
                cacheable: true,
            }))
            .unwrap();
        registry.register(Named::arc("echo")).unwrap();

        assert_eq!(registry.tools_by_category(ToolCategory::Time).len(), 2);
        assert_eq!(registry.cacheable_tools().len(), 1);
        assert_eq!(
            registry.metadata("convert_timezone").unwrap().cache_ttl_seconds,
            60
        );

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.tool_names().is_empty());
    }
}

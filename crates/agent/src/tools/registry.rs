//! Tool discovery and lookup

use smartagent_provider::ToolDescriptor;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use super::{builtin_tools, Tool};
use crate::{AgentError, Result};

/// Builds one tool instance
pub type ToolFactory = Box<dyn Fn() -> Arc<dyn Tool> + Send + Sync>;

/// Immutable, name-indexed set of loaded tools
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolSet {
    /// Names must be non-empty and unique; the first tool registered under
    /// a name wins.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut set = Self {
            tools: Vec::new(),
            index: HashMap::new(),
        };

        for tool in tools {
            let name = tool.name().to_string();
            if name.is_empty() {
                warn!("Skipping tool with an empty name");
                continue;
            }
            if set.index.contains_key(&name) {
                warn!("Duplicate tool name '{}', keeping the first", name);
                continue;
            }
            set.index.insert(name, set.tools.len());
            set.tools.push(tool);
        }

        set
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn Tool>> {
        self.get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.describe()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .finish()
    }
}

/// Knows which tools exist and loads them once.
///
/// `load` instantiates every factory on first use and hands out the same
/// `ToolSet` afterwards.
pub struct ToolRegistry {
    factories: Vec<ToolFactory>,
    loaded: OnceLock<Arc<ToolSet>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
            loaded: OnceLock::new(),
        }
    }

    /// Registry holding the CSV and Markdown tools
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for factory in builtin_tools() {
            registry.register(factory);
        }
        registry
    }

    /// Add a factory. Ignored once the registry has been loaded.
    pub fn register(&mut self, factory: ToolFactory) -> &mut Self {
        if self.is_loaded() {
            warn!("Tool registry already loaded, ignoring late registration");
        } else {
            self.factories.push(factory);
        }
        self
    }

    pub fn load(&self) -> Arc<ToolSet> {
        self.loaded
            .get_or_init(|| {
                debug!("Loading {} tool factories", self.factories.len());
                let set = ToolSet::new(self.factories.iter().map(|factory| factory()));
                debug!("Loaded tools: {}", set.names().join(", "));
                Arc::new(set)
            })
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

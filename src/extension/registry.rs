use super::{Extension, Host};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub type ExtensionBuilder = fn(Arc<dyn Host>) -> anyhow::Result<Box<dyn Extension>>;

#[derive(Clone)]
pub struct ExtensionFactory {
    pub id: String,
    pub title: String,
    pub description: String,
    pub builder: ExtensionBuilder,
}

pub struct ExtensionRegistry {
    factories: RwLock<HashMap<String, ExtensionFactory>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        ExtensionRegistry {
            factories: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, factory: ExtensionFactory) -> anyhow::Result<()> {
        let mut factories = self
            .factories
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        if factories.contains_key(&factory.id) {
            return Err(anyhow::anyhow!("Extension '{}' is already registered", factory.id));
        }
        tracing::debug!(id = %factory.id, "registered extension");
        factories.insert(factory.id.clone(), factory);
        Ok(())
    }

    pub fn build(&self, id: &str, host: Arc<dyn Host>) -> anyhow::Result<Box<dyn Extension>> {
        let builder = self
            .factories
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock"))?
            .get(id)
            .map(|factory| factory.builder)
            .ok_or_else(|| anyhow::anyhow!("Unknown extension '{}'", id))?;
        builder(host)
    }

    /// `(id, title, description)` of every registered extension, sorted by id.
    pub fn list(&self) -> Vec<(String, String, String)> {
        let mut entries: Vec<_> = self
            .factories
            .read()
            .map(|factories| {
                factories
                    .values()
                    .map(|f| (f.id.clone(), f.title.clone(), f.description.clone()))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();
        entries
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref REGISTRY: ExtensionRegistry = ExtensionRegistry::new();
}

pub fn register_extension(factory: ExtensionFactory) -> anyhow::Result<()> {
    REGISTRY.register(factory)
}

pub fn build_extension(id: &str, host: Arc<dyn Host>) -> anyhow::Result<Box<dyn Extension>> {
    REGISTRY.build(id, host)
}

pub fn list_extensions() -> Vec<(String, String, String)> {
    REGISTRY.list()
}

//! Entry points and the registry that maps context names onto them

use super::environment::ExecutionEnvironment;
use crate::domain::shared::error::DialPlanError;
use crate::domain::shared::result::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Executable body of an entry point
pub type EntryPointBody =
    Arc<dyn Fn(&mut ExecutionEnvironment) -> anyhow::Result<()> + Send + Sync>;

/// Canonical context name
///
/// Surrounding whitespace is dropped and ASCII letters are lower-cased, so
/// `"Sales "` and `"sales"` name the same entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryPointName(String);

impl EntryPointName {
    pub fn parse(raw: &str) -> Result<Self> {
        let canonical = raw.trim().to_ascii_lowercase();
        if canonical.is_empty() || canonical.contains('/') {
            return Err(DialPlanError::InvalidEntryPointName(raw.to_string()));
        }
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryPointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named unit of dial-plan logic
#[derive(Clone)]
pub struct EntryPoint {
    name: EntryPointName,
    body: EntryPointBody,
}

impl EntryPoint {
    pub fn new<F>(name: EntryPointName, body: F) -> Self
    where
        F: Fn(&mut ExecutionEnvironment) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &EntryPointName {
        &self.name
    }

    pub fn body(&self) -> EntryPointBody {
        Arc::clone(&self.body)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The dial plan: context name -> entry point
///
/// Filled in while loading configuration, then frozen behind an `Arc` and
/// only read while calls are handled.
#[derive(Debug, Clone, Default)]
pub struct DialPlan {
    entry_points: HashMap<EntryPointName, EntryPoint>,
}

impl DialPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a routine under a context name. Names are unique.
    pub fn register<F>(&mut self, name: &str, body: F) -> Result<&mut Self>
    where
        F: Fn(&mut ExecutionEnvironment) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = EntryPointName::parse(name)?;
        if self.entry_points.contains_key(&name) {
            return Err(DialPlanError::DuplicateEntryPoint(name.to_string()));
        }

        debug!("Registered dialplan entry point {}", name);
        self.entry_points
            .insert(name.clone(), EntryPoint::new(name, body));
        Ok(self)
    }

    /// Look up an entry point by (un-normalised) context name
    pub fn lookup(&self, name: &str) -> Option<&EntryPoint> {
        let name = EntryPointName::parse(name).ok()?;
        self.entry_points.get(&name)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = (&EntryPointName, &EntryPoint)> {
        self.entry_points.iter()
    }

    pub fn len(&self) -> usize {
        self.entry_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_normalization() {
        let name = EntryPointName::parse("  Sales ").unwrap();
        assert_eq!(name.as_str(), "sales");
        assert!(EntryPointName::parse("   ").is_err());
        assert!(EntryPointName::parse("a/b").is_err());
    }

    #[test]
    fn test_register_and_lookup() {
        let mut plan = DialPlan::new();
        plan.register("sales", |_| Ok(()))
            .unwrap()
            .register("support", |_| Ok(()))
            .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.lookup("SALES").unwrap().name().as_str(), "sales");
        assert!(plan.lookup("billing").is_none());
        assert!(plan.lookup("").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut plan = DialPlan::new();
        plan.register("sales", |_| Ok(())).unwrap();

        let err = plan.register("Sales", |_| Ok(())).unwrap_err();
        assert_eq!(err, DialPlanError::DuplicateEntryPoint("sales".to_string()));
        assert_eq!(plan.len(), 1);
    }
}

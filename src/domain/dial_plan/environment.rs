//! Per-call execution environment

use super::entry_point::{DialPlan, EntryPoint, EntryPointBody, EntryPointName};
use crate::domain::call::CallHandle;
use crate::domain::shared::error::CallTerminated;
use std::collections::HashMap;
use tracing::debug;

/// Runtime context of exactly one call running exactly one starting entry point
///
/// Every registered entry point is reachable by name through the binding
/// table so a routine can hand control over to another context.
pub struct ExecutionEnvironment {
    call: CallHandle,
    starting_entry_point: EntryPoint,
    bindings: HashMap<EntryPointName, EntryPoint>,
    variables: HashMap<String, String>,
}

impl ExecutionEnvironment {
    pub fn new(call: CallHandle, starting_entry_point: EntryPoint) -> Self {
        Self {
            call,
            starting_entry_point,
            bindings: HashMap::new(),
            variables: HashMap::new(),
        }
    }

    /// Materialise the name -> entry point binding table from the dial plan
    pub fn bind_entry_points(&mut self, dial_plan: &DialPlan) {
        self.bindings = dial_plan
            .entry_points()
            .map(|(name, entry_point)| (name.clone(), entry_point.clone()))
            .collect();
    }

    pub fn call(&self) -> &CallHandle {
        &self.call
    }

    pub fn entry_point_name(&self) -> &EntryPointName {
        self.starting_entry_point.name()
    }

    /// Body of the entry point bound under `name`
    pub fn entry_point(&self, name: &str) -> Option<EntryPointBody> {
        let name = EntryPointName::parse(name).ok()?;
        self.bindings.get(&name).map(EntryPoint::body)
    }

    pub fn entry_point_names(&self) -> Vec<&EntryPointName> {
        let mut names: Vec<_> = self.bindings.keys().collect();
        names.sort();
        names
    }

    /// Transfer control to another context, returning its outcome
    pub fn jump_to(&mut self, name: &str) -> anyhow::Result<()> {
        let body = self
            .entry_point(name)
            .ok_or_else(|| anyhow::anyhow!("no entry point named '{}' in dial plan", name))?;

        debug!(call_id = %self.call.id(), "Jumping to entry point {}", name);
        body(self)
    }

    /// The termination signal; return it from the routine to end the call
    pub fn hangup(&self) -> anyhow::Error {
        CallTerminated::new(self.call.id().to_string()).into()
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Run the starting entry point to completion or abnormal termination
    pub fn run(&mut self) -> anyhow::Result<()> {
        let body = self.starting_entry_point.body();
        body(self)
    }
}

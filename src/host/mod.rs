//! Host Call Bridge
//!
//! Negative call ids are answered by capabilities registered in a
//! [`CapabilityTable`]. A capability pops exactly [`Capability::arity`]
//! values from the stack and returns one word, which the bridge pushes.
//!
//! - [`console`]: program output, log lines and the input source
//! - [`stdlib`]: the standard capabilities and their legacy ids
//! - [`timers`]: one-shot timers fired after the entry function returns

pub mod console;
pub mod stdlib;
pub mod timers;

use crate::interpreter::errors::{VmError, VmResult};
use crate::memory::machine::Machine;
use crate::memory::Word;
use rustc_hash::FxHashMap;
use tracing::debug;

pub trait Capability {
    fn name(&self) -> &'static str;

    /// Number of values popped from the stack
    fn arity(&self) -> usize;

    fn invoke(&mut self, machine: &mut Machine) -> VmResult<Word>;
}

/// Adapter turning a closure into a [`Capability`]
struct FnCapability<F> {
    name: &'static str,
    arity: usize,
    handler: F,
}

impl<F> Capability for FnCapability<F>
where
    F: FnMut(&mut Machine) -> VmResult<Word>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn invoke(&mut self, machine: &mut Machine) -> VmResult<Word> {
        (self.handler)(machine)
    }
}

#[derive(Default)]
pub struct CapabilityTable {
    handlers: FxHashMap<i32, Box<dyn Capability>>,
    aliases: FxHashMap<i32, i32>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability, replacing any previous one with the same id
    pub fn register(&mut self, id: i32, capability: Box<dyn Capability>) {
        self.handlers.insert(id, capability);
    }

    pub fn register_fn<F>(&mut self, id: i32, name: &'static str, arity: usize, handler: F)
    where
        F: FnMut(&mut Machine) -> VmResult<Word> + 'static,
    {
        self.register(
            id,
            Box::new(FnCapability {
                name,
                arity,
                handler,
            }),
        );
    }

    /// Answer `legacy` with the capability registered under `id`
    pub fn alias(&mut self, legacy: i32, id: i32) {
        self.aliases.insert(legacy, id);
    }

    /// Canonical id after applying the alias table
    pub fn resolve(&self, id: i32) -> i32 {
        self.aliases.get(&id).copied().unwrap_or(id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.handlers.contains_key(&self.resolve(id))
    }

    pub fn name(&self, id: i32) -> Option<&'static str> {
        self.handlers.get(&self.resolve(id)).map(|c| c.name())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the capability for `id` and push its result
    ///
    /// Fails with [`VmError::HostContractViolation`] when the capability moved
    /// the stack pointer by anything other than its declared arity.
    pub fn dispatch(&mut self, id: i32, machine: &mut Machine) -> VmResult<Word> {
        let canonical = self.resolve(id);
        let capability = self
            .handlers
            .get_mut(&canonical)
            .ok_or(VmError::UnknownHostCall { id })?;

        let before = machine.sp();
        let result = capability.invoke(machine)?;
        let popped = machine.sp() as i64 - before as i64;
        if popped != capability.arity() as i64 {
            return Err(VmError::HostContractViolation {
                id: canonical,
                name: capability.name(),
                expected: capability.arity(),
                popped,
            });
        }
        debug!(id, canonical, name = capability.name(), result, "host call");
        machine.push(result)?;
        Ok(result)
    }
}

impl std::fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("CapabilityTable")
            .field("ids", &ids)
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_pushes_result() {
        let mut table = CapabilityTable::new();
        table.register_fn(-7, "double", 1, |m| Ok(m.pop()? * 2));
        let mut machine = Machine::new(16).unwrap();
        machine.push(21).unwrap();
        assert_eq!(table.dispatch(-7, &mut machine), Ok(42));
        assert_eq!(machine.pop(), Ok(42));
        assert_eq!(machine.stack_depth(), 0);
    }

    #[test]
    fn test_alias_resolves_to_canonical() {
        let mut table = CapabilityTable::new();
        table.register_fn(-101, "zero", 0, |_| Ok(0));
        table.alias(-1, -101);
        assert!(table.contains(-1));
        assert_eq!(table.name(-1), Some("zero"));
        assert_eq!(table.resolve(-2), -2);
    }

    #[test]
    fn test_arity_contract_checked() {
        let mut table = CapabilityTable::new();
        table.register_fn(-9, "greedy", 1, |m| {
            m.pop()?;
            m.pop()
        });
        let mut machine = Machine::new(16).unwrap();
        machine.push(1).unwrap();
        machine.push(2).unwrap();
        assert_eq!(
            table.dispatch(-9, &mut machine),
            Err(VmError::HostContractViolation {
                id: -9,
                name: "greedy",
                expected: 1,
                popped: 2,
            })
        );
    }

    #[test]
    fn test_unknown_id() {
        let mut table = CapabilityTable::new();
        let mut machine = Machine::new(16).unwrap();
        assert_eq!(
            table.dispatch(-500, &mut machine),
            Err(VmError::UnknownHostCall { id: -500 })
        );
    }
}

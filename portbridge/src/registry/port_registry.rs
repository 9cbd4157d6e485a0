use std::any::{self, Any};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use crate::instance::PortError;
use crate::ports::{PortHandle, PortInfo, PortLink};

/// A registry that holds the ports of a module instance, by name and in
/// declaration order.
#[derive(Default)]
pub(crate) struct PortRegistry {
    ports: Vec<Box<dyn PortAny>>,
    index: HashMap<String, usize>,
}

impl PortRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a port to the registry.
    ///
    /// If the specified name is already in use for another port, the port
    /// provided as argument is returned in the error.
    pub(crate) fn add<T>(&mut self, name: String, port: PortLink<T>) -> Result<(), PortLink<T>>
    where
        T: Clone + Send + 'static,
    {
        match self.index.entry(name) {
            Entry::Vacant(s) => {
                s.insert(self.ports.len());
                self.ports.push(Box::new(port));

                Ok(())
            }
            Entry::Occupied(_) => Err(port),
        }
    }

    /// Checks whether a port with the specified name exists.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns a typed handle to the specified port.
    pub(crate) fn get<T>(&self, name: &str) -> Result<PortHandle<T>, PortError>
    where
        T: Clone + Send + 'static,
    {
        let port = self
            .index
            .get(name)
            .map(|&idx| &self.ports[idx])
            .ok_or_else(|| PortError::UnknownPort {
                name: name.to_string(),
            })?;

        match port.as_any().downcast_ref::<PortLink<T>>() {
            Some(link) => Ok(PortHandle::new(link.clone())),
            None => Err(PortError::TypeMismatch {
                name: name.to_string(),
                expected: any::type_name::<T>(),
                found: port.event_type_name(),
            }),
        }
    }

    /// Returns a description of all ports in declaration order.
    pub(crate) fn infos(&self) -> Vec<PortInfo> {
        self.ports
            .iter()
            .map(|port| PortInfo::new(port.name(), port.event_type_name()))
            .collect()
    }

    /// Ends all subscriptions of all ports and refuses new ones.
    ///
    /// Returns the total number of subscriptions that were ended.
    pub(crate) fn close_all(&self) -> usize {
        self.ports.iter().map(|port| port.close()).sum()
    }

    pub(crate) fn len(&self) -> usize {
        self.ports.len()
    }
}

impl fmt::Debug for PortRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PortRegistry ({} ports)", self.ports.len())
    }
}

/// A type-erased `PortLink`.
trait PortAny: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Human-readable name of the event type, as returned by
    /// `any::type_name()`.
    fn event_type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn close(&self) -> usize;
}

impl<T> PortAny for PortLink<T>
where
    T: Clone + Send + 'static,
{
    fn name(&self) -> &str {
        PortLink::name(self)
    }

    fn event_type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn close(&self) -> usize {
        PortLink::close(self)
    }
}

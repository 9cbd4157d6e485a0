//! Registry of the ports declared by a module instance.

mod port_registry;

pub(crate) use port_registry::PortRegistry;

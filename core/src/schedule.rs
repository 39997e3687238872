use crate::network::{ComponentId, Network};

/// One offer of a firing to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Firing {
    pub component: ComponentId,
}

/// Ordered hint for the order in which components are offered firings.
///
/// The order only affects how many passes an instant needs, never the
/// values it converges to. A schedule is tied to the network version it
/// was built from and must be rebuilt once the topology changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    firings: Vec<Firing>,
    version: u64,
}

impl Schedule {
    pub fn new(components: impl IntoIterator<Item = ComponentId>, version: u64) -> Self {
        Self {
            firings: components
                .into_iter()
                .map(|component| Firing { component })
                .collect(),
            version,
        }
    }

    pub fn firings(&self) -> &[Firing] {
        &self.firings
    }

    pub fn components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.firings.iter().map(|f| f.component)
    }

    pub fn len(&self) -> usize {
        self.firings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.firings.is_empty()
    }

    /// Network version this schedule was built for
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_current(&self, network: &Network) -> bool {
        self.version == network.version()
    }

    /// Component names in schedule order, for diagnostics.
    pub fn names<'a>(&'a self, network: &'a Network) -> Vec<&'a str> {
        self.components()
            .filter_map(|id| network.name(id))
            .collect()
    }
}

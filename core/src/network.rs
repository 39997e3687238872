use crate::{ChannelId, Component, DataType, Dependencies, PortDesc, PortDirection, PortWiring, Strictness};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Stable identity of a component for the life of its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionId(pub u64);

/// A link from one output port to one input port.
///
/// All connections leaving the same output port share that port's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: ComponentId,
    pub source_port: String,
    pub sink: ComponentId,
    pub sink_port: String,
}

/// A component together with the interface captured when it joined.
pub(crate) struct ComponentEntry {
    pub(crate) name: String,
    pub(crate) ports: Vec<PortDesc>,
    pub(crate) strictness: Strictness,
    pub(crate) dependencies: Dependencies,
    pub(crate) component: Box<dyn Component>,
}

/// Channel allocation for a network: one channel per output port.
pub(crate) struct NetworkWiring {
    pub(crate) ports: Vec<PortWiring>,
    pub(crate) channels: usize,
}

/// The component/connection topology evaluated by a director.
///
/// Every structural change bumps [`version`](Network::version) so that
/// schedules built for an older topology can be recognised as stale.
pub struct Network {
    components: Vec<ComponentEntry>,
    names: HashMap<String, ComponentId>,
    connections: Vec<Connection>,
    /// Input port -> the output port feeding it
    producers: HashMap<(ComponentId, String), (ComponentId, String)>,
    next_connection_id: u64,
    version: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            names: HashMap::new(),
            connections: Vec::new(),
            producers: HashMap::new(),
            next_connection_id: 1,
            version: 0,
        }
    }

    /// Add a component, capturing its ports, strictness and dependencies.
    pub fn add_component(
        &mut self,
        component: Box<dyn Component>,
    ) -> Result<ComponentId, NetworkError> {
        let name = component.name().to_string();
        if self.names.contains_key(&name) {
            return Err(NetworkError::DuplicateComponent(name));
        }

        let ports = component.ports();
        for (i, port) in ports.iter().enumerate() {
            if ports[..i].iter().any(|p| p.id == port.id) {
                return Err(NetworkError::DuplicatePort {
                    component: name,
                    port: port.id.clone(),
                });
            }
        }

        let dependencies = component.dependencies();
        if let Dependencies::Pairs(pairs) = &dependencies {
            for (input, output) in pairs {
                let input_ok = ports.iter().any(|p| p.is_input() && &p.id == input);
                let output_ok = ports.iter().any(|p| p.is_output() && &p.id == output);
                if !input_ok || !output_ok {
                    return Err(NetworkError::InvalidDependency {
                        component: name,
                        input: input.clone(),
                        output: output.clone(),
                    });
                }
            }
        }

        let id = ComponentId(self.components.len());
        log::debug!("Network: Added component '{}' as {}", name, id);
        self.names.insert(name.clone(), id);
        self.components.push(ComponentEntry {
            name,
            ports,
            strictness: component.strictness(),
            dependencies,
            component,
        });
        self.version += 1;
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Incremented on every topology change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Component ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..self.components.len()).map(ComponentId)
    }

    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }

    pub fn name(&self, id: ComponentId) -> Option<&str> {
        self.components.get(id.0).map(|e| e.name.as_str())
    }

    pub fn ports(&self, id: ComponentId) -> Option<&[PortDesc]> {
        self.components.get(id.0).map(|e| e.ports.as_slice())
    }

    pub fn strictness(&self, id: ComponentId) -> Option<Strictness> {
        self.components.get(id.0).map(|e| e.strictness)
    }

    pub fn dependencies(&self, id: ComponentId) -> Option<&Dependencies> {
        self.components.get(id.0).map(|e| &e.dependencies)
    }

    pub(crate) fn entry(&self, id: ComponentId) -> &ComponentEntry {
        &self.components[id.0]
    }

    pub(crate) fn entry_mut(&mut self, id: ComponentId) -> &mut ComponentEntry {
        &mut self.components[id.0]
    }

    /// Position of a port within its component's port list
    pub fn port_index(&self, id: ComponentId, port: &str) -> Option<usize> {
        self.ports(id)?.iter().position(|p| p.id == port)
    }

    /// Check if two ports can be connected based on direction and type
    pub fn can_connect(source_port: &PortDesc, sink_port: &PortDesc) -> bool {
        source_port.direction == PortDirection::Output
            && sink_port.direction == PortDirection::Input
            && source_port.data_type.compatible_with(sink_port.data_type)
    }

    /// Connect an output port to an input port, both named by component and port id.
    pub fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        sink: &str,
        sink_port: &str,
    ) -> Result<ConnectionId, NetworkError> {
        let source_id = self
            .component_id(source)
            .ok_or_else(|| NetworkError::ComponentNotFound(source.to_string()))?;
        let sink_id = self
            .component_id(sink)
            .ok_or_else(|| NetworkError::ComponentNotFound(sink.to_string()))?;

        let src = self.find_port(source_id, source_port)?;
        let snk = self.find_port(sink_id, sink_port)?;

        if src.direction != PortDirection::Output {
            return Err(NetworkError::WrongDirection {
                component: source.to_string(),
                port: source_port.to_string(),
                expected: PortDirection::Output,
            });
        }
        if snk.direction != PortDirection::Input {
            return Err(NetworkError::WrongDirection {
                component: sink.to_string(),
                port: sink_port.to_string(),
                expected: PortDirection::Input,
            });
        }
        if !Self::can_connect(src, snk) {
            return Err(NetworkError::IncompatibleTypes {
                source_type: src.data_type,
                sink_type: snk.data_type,
            });
        }

        let input = (sink_id, sink_port.to_string());
        if let Some((existing, existing_port)) = self.producers.get(&input) {
            if *existing == source_id && existing_port == source_port {
                return Err(NetworkError::DuplicateConnection);
            }
            return Err(NetworkError::InputAlreadyConnected {
                component: sink.to_string(),
                port: sink_port.to_string(),
            });
        }

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;

        log::info!(
            "Network: Connected {}:{} -> {}:{}",
            source,
            source_port,
            sink,
            sink_port
        );

        self.producers
            .insert(input, (source_id, source_port.to_string()));
        self.connections.push(Connection {
            id,
            source: source_id,
            source_port: source_port.to_string(),
            sink: sink_id,
            sink_port: sink_port.to_string(),
        });
        self.version += 1;
        Ok(id)
    }

    /// Remove a connection. Returns `false` if it did not exist.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let Some(position) = self.connections.iter().position(|c| c.id == id) else {
            return false;
        };
        let removed = self.connections.remove(position);
        self.producers.remove(&(removed.sink, removed.sink_port));
        log::info!("Network: Disconnected {:?}", id);
        self.version += 1;
        true
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Connections where this component is the producer
    pub fn outgoing(&self, id: ComponentId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.source == id)
    }

    /// Connections where this component is the consumer
    pub fn incoming(&self, id: ComponentId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.sink == id)
    }

    /// All (source_port, sink_port) pairs that could connect two components
    pub fn compatible_ports(&self, source: ComponentId, sink: ComponentId) -> Vec<(String, String)> {
        let (Some(src_ports), Some(snk_ports)) = (self.ports(source), self.ports(sink)) else {
            return Vec::new();
        };
        let mut compatible = Vec::new();
        for src in src_ports {
            for snk in snk_ports {
                if Self::can_connect(src, snk) {
                    compatible.push((src.id.clone(), snk.id.clone()));
                }
            }
        }
        compatible
    }

    /// Allocate one channel per output port and resolve every port to its channel.
    pub(crate) fn build_wiring(&self) -> NetworkWiring {
        let mut channels = 0;
        let mut port_channels: Vec<Vec<Option<ChannelId>>> = Vec::with_capacity(self.len());
        for entry in &self.components {
            let mut slots = Vec::with_capacity(entry.ports.len());
            for port in &entry.ports {
                if port.is_output() {
                    slots.push(Some(ChannelId(channels)));
                    channels += 1;
                } else {
                    slots.push(None);
                }
            }
            port_channels.push(slots);
        }

        for c in &self.connections {
            let (Some(src_idx), Some(snk_idx)) = (
                self.port_index(c.source, &c.source_port),
                self.port_index(c.sink, &c.sink_port),
            ) else {
                continue;
            };
            port_channels[c.sink.0][snk_idx] = port_channels[c.source.0][src_idx];
        }

        NetworkWiring {
            ports: port_channels.into_iter().map(PortWiring::new).collect(),
            channels,
        }
    }

    fn find_port(&self, id: ComponentId, port: &str) -> Result<&PortDesc, NetworkError> {
        let entry = &self.components[id.0];
        entry
            .ports
            .iter()
            .find(|p| p.id == port)
            .ok_or_else(|| NetworkError::PortNotFound {
                component: entry.name.clone(),
                port: port.to_string(),
            })
    }
}

/// Errors that can occur while building a network
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("component not found: {0}")]
    ComponentNotFound(String),

    #[error("a component named '{0}' already exists")]
    DuplicateComponent(String),

    #[error("port not found: {component}:{port}")]
    PortNotFound { component: String, port: String },

    #[error("component '{component}' declares port '{port}' twice")]
    DuplicatePort { component: String, port: String },

    #[error("component '{component}' declares a dependency {input} -> {output} on ports it does not have")]
    InvalidDependency {
        component: String,
        input: String,
        output: String,
    },

    #[error("{component}:{port} is not an {expected:?} port")]
    WrongDirection {
        component: String,
        port: String,
        expected: PortDirection,
    },

    #[error("incompatible types: {source_type:?} cannot connect to {sink_type:?}")]
    IncompatibleTypes {
        source_type: DataType,
        sink_type: DataType,
    },

    #[error("connection already exists")]
    DuplicateConnection,

    #[error("input {component}:{port} already has a producer")]
    InputAlreadyConnected { component: String, port: String },
}

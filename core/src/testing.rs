//! Small components shared by the unit tests.

use crate::{Component, DataType, Dependencies, FireCx, PortDesc, SignalState, Strictness, Token};

enum Behavior {
    Idle,
    Source(Token),
    Relay,
    Delay { next: Token },
}

pub(crate) struct Fixture {
    name: String,
    ports: Vec<PortDesc>,
    strictness: Strictness,
    behavior: Behavior,
}

impl Fixture {
    /// Strict, all-to-all, and never writes its outputs itself.
    pub(crate) fn new(name: &str, ports: Vec<PortDesc>) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            ports,
            strictness: Strictness::Strict,
            behavior: Behavior::Idle,
        })
    }

    pub(crate) fn source(name: &str, data_type: DataType) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            ports: vec![PortDesc::output("out", data_type)],
            strictness: Strictness::Strict,
            behavior: Behavior::Source(sample(data_type)),
        })
    }

    pub(crate) fn relay(name: &str, data_type: DataType) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            ports: vec![
                PortDesc::input("in", data_type),
                PortDesc::output("out", data_type),
            ],
            strictness: Strictness::Strict,
            behavior: Behavior::Relay,
        })
    }

    pub(crate) fn sink(name: &str, data_type: DataType) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            ports: vec![PortDesc::input("in", data_type)],
            strictness: Strictness::Strict,
            behavior: Behavior::Idle,
        })
    }

    /// Non-strict unit delay: emits the previous instant's input.
    pub(crate) fn delay(name: &str, data_type: DataType) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            ports: vec![
                PortDesc::input("in", data_type),
                PortDesc::output("out", data_type),
            ],
            strictness: Strictness::NonStrict,
            behavior: Behavior::Delay {
                next: sample(data_type),
            },
        })
    }
}

fn sample(data_type: DataType) -> Token {
    match data_type {
        DataType::Float => Token::Float(1.0),
        DataType::Bool => Token::Bool(true),
        DataType::Text => Token::Text("x".to_string()),
        DataType::Pulse => Token::Pulse,
        DataType::Int | DataType::Any => Token::Int(1),
    }
}

impl Component for Fixture {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDesc> {
        self.ports.clone()
    }

    fn strictness(&self) -> Strictness {
        self.strictness
    }

    fn dependencies(&self) -> Dependencies {
        match self.behavior {
            Behavior::Delay { .. } => Dependencies::Decoupled,
            _ => Dependencies::AllToAll,
        }
    }

    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        match &self.behavior {
            Behavior::Idle => {}
            Behavior::Source(token) => cx.put("out", token.clone())?,
            Behavior::Relay => match cx.input("in")?.clone() {
                SignalState::Present(token) => cx.put("out", token)?,
                SignalState::Absent => cx.put_absent("out")?,
                SignalState::Unknown => {}
            },
            Behavior::Delay { next } => cx.put("out", next.clone())?,
        }
        Ok(())
    }

    fn postfire(&mut self, cx: &mut FireCx) -> anyhow::Result<bool> {
        if let Behavior::Delay { next } = &mut self.behavior {
            if let Some(token) = cx.token("in")? {
                *next = token.clone();
            }
        }
        Ok(true)
    }
}

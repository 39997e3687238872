//! Components used by the demonstration networks.

use fixpoint_core::{Component, DataType, FireCx, PortDesc, Strictness, Token};

/// Emits the index of the current instant.
pub struct Counter {
    name: String,
}

impl Counter {
    pub fn boxed(name: &str) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
        })
    }
}

impl Component for Counter {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::output("out", DataType::Int)]
    }

    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        cx.put("out", cx.instant as i64)?;
        Ok(())
    }
}

/// Strict `out = in * factor`.
pub struct Scale {
    name: String,
    factor: i64,
}

impl Scale {
    pub fn boxed(name: &str, factor: i64) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            factor,
        })
    }
}

impl Component for Scale {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDesc> {
        vec![
            PortDesc::input("in", DataType::Int),
            PortDesc::output("out", DataType::Int),
        ]
    }

    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        match cx.token("in")?.and_then(Token::as_int) {
            Some(v) => cx.put("out", v * self.factor)?,
            None => cx.put_absent("out")?,
        }
        Ok(())
    }
}

/// Strict sum of whichever inputs are present.
pub struct Add {
    name: String,
}

impl Add {
    pub fn boxed(name: &str) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
        })
    }
}

impl Component for Add {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDesc> {
        vec![
            PortDesc::input("a", DataType::Int),
            PortDesc::input("b", DataType::Int),
            PortDesc::output("out", DataType::Int),
        ]
    }

    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        let a = cx.token("a")?.and_then(Token::as_int);
        let b = cx.token("b")?.and_then(Token::as_int);
        if a.is_none() && b.is_none() {
            cx.put_absent("out")?;
        } else {
            cx.put("out", a.unwrap_or(0) + b.unwrap_or(0))?;
        }
        Ok(())
    }
}

/// Unit delay. Non-strict, so it can break feedback loops: its output in
/// one instant is its input from the previous one.
pub struct Delay {
    name: String,
    held: Option<Token>,
}

impl Delay {
    pub fn boxed(name: &str, initial: impl Into<Token>) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            held: Some(initial.into()),
        })
    }
}

impl Component for Delay {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDesc> {
        vec![
            PortDesc::input("in", DataType::Int),
            PortDesc::output("out", DataType::Int),
        ]
    }

    fn strictness(&self) -> Strictness {
        Strictness::NonStrict
    }

    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        match &self.held {
            Some(token) => cx.put("out", token.clone())?,
            None => cx.put_absent("out")?,
        }
        Ok(())
    }

    fn postfire(&mut self, cx: &mut FireCx) -> anyhow::Result<bool> {
        self.held = cx.token("in")?.cloned();
        Ok(true)
    }
}

/// Logs its input once per instant; deactivates after `limit` instants.
pub struct Monitor {
    name: String,
    remaining: Option<u64>,
}

impl Monitor {
    pub fn boxed(name: &str, limit: Option<u64>) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            remaining: limit,
        })
    }
}

impl Component for Monitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::input("in", DataType::Any)]
    }

    fn fire(&mut self, _cx: &mut FireCx) -> anyhow::Result<()> {
        Ok(())
    }

    fn postfire(&mut self, cx: &mut FireCx) -> anyhow::Result<bool> {
        log::info!("{} @ t={}: {}", self.name, cx.time, cx.input("in")?);
        match self.remaining.as_mut() {
            Some(n) => {
                *n = n.saturating_sub(1);
                Ok(*n > 0)
            }
            None => Ok(true),
        }
    }
}

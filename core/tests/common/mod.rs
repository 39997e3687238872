#![allow(dead_code)]

use fixpoint_core::{
    Component, DataType, FireCx, PortDesc, SignalState, StopHandle, Strictness, Token,
};
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared record of what a component observed.
#[derive(Clone, Default)]
pub struct Log<T>(Arc<Mutex<Vec<T>>>);

impl<T: Clone> Log<T> {
    pub fn push(&self, value: T) {
        self.0.lock().unwrap().push(value);
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Emits a constant on every instant.
pub struct Emit {
    pub name: String,
    pub value: i64,
}

impl Emit {
    pub fn boxed(name: &str, value: i64) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            value,
        })
    }
}

impl Component for Emit {
    fn name(&self) -> &str {
        &self.name
    }
    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::output("out", DataType::Int)]
    }
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        cx.put("out", self.value)?;
        Ok(())
    }
}

/// Never writes its output; relies on the director assuming it absent.
pub struct Silent(pub String);

impl Component for Silent {
    fn name(&self) -> &str {
        &self.0
    }
    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::output("out", DataType::Int)]
    }
    fn fire(&mut self, _cx: &mut FireCx) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Strict `out = in * 2`; absent in, absent out.
pub struct Double(pub String);

impl Double {
    pub fn boxed(name: &str) -> Box<dyn Component> {
        Box::new(Self(name.to_string()))
    }
}

impl Component for Double {
    fn name(&self) -> &str {
        &self.0
    }
    fn ports(&self) -> Vec<PortDesc> {
        vec![
            PortDesc::input("in", DataType::Int),
            PortDesc::output("out", DataType::Int),
        ]
    }
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        match cx.token("in")?.and_then(Token::as_int) {
            Some(v) => cx.put("out", v * 2)?,
            None => cx.put_absent("out")?,
        }
        Ok(())
    }
}

/// Strict sum of two inputs, ignoring absent ones.
pub struct Sum(pub String);

impl Sum {
    pub fn boxed(name: &str) -> Box<dyn Component> {
        Box::new(Self(name.to_string()))
    }
}

impl Component for Sum {
    fn name(&self) -> &str {
        &self.0
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
        match (a, b) {
            (None, None) => cx.put_absent("out")?,
            (a, b) => cx.put("out", a.unwrap_or(0) + b.unwrap_or(0))?,
        }
        Ok(())
    }
}

/// Non-strict: forwards the first present input as soon as one exists.
pub struct Either {
    pub name: String,
    pub fires: Log<u64>,
}

impl Component for Either {
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
    fn strictness(&self) -> Strictness {
        Strictness::NonStrict
    }
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        self.fires.push(cx.instant);
        let first = match cx.token("a")? {
            Some(token) => Some(token.clone()),
            None => cx.token("b")?.cloned(),
        };
        match first {
            Some(token) => cx.put("out", token)?,
            None if cx.all_inputs_known() => cx.put_absent("out")?,
            None => {}
        }
        Ok(())
    }
}

/// Records the state of its input at postfire.
pub struct Watch {
    pub name: String,
    pub seen: Log<SignalState>,
}

impl Watch {
    pub fn boxed(name: &str, seen: &Log<SignalState>) -> Box<dyn Component> {
        Box::new(Self {
            name: name.to_string(),
            seen: seen.clone(),
        })
    }
}

impl Component for Watch {
    fn name(&self) -> &str {
        &self.name
    }
    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::input("in", DataType::Int)]
    }
    fn fire(&mut self, _cx: &mut FireCx) -> anyhow::Result<()> {
        Ok(())
    }
    fn postfire(&mut self, cx: &mut FireCx) -> anyhow::Result<bool> {
        self.seen.push(cx.input("in")?.clone());
        Ok(true)
    }
}

/// Emits once, then deactivates itself.
pub struct OneShot {
    pub name: String,
    pub fires: Log<u64>,
}

impl Component for OneShot {
    fn name(&self) -> &str {
        &self.name
    }
    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::output("out", DataType::Int)]
    }
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        self.fires.push(cx.instant);
        cx.put("out", 3)?;
        Ok(())
    }
    fn postfire(&mut self, _cx: &mut FireCx) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// Records the logical time of every instant it fires in.
pub struct Clock {
    pub times: Log<f64>,
}

impl Component for Clock {
    fn name(&self) -> &str {
        "clock"
    }
    fn ports(&self) -> Vec<PortDesc> {
        Vec::new()
    }
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        self.times.push(cx.time);
        Ok(())
    }
}

/// Requests a stop while firing in the given instant.
pub struct Stopper {
    pub at: u64,
    pub stop: StopHandle,
    pub postfires: Log<u64>,
}

impl Component for Stopper {
    fn name(&self) -> &str {
        "stopper"
    }
    fn ports(&self) -> Vec<PortDesc> {
        Vec::new()
    }
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        if cx.instant == self.at {
            self.stop.request_stop();
        }
        Ok(())
    }
    fn postfire(&mut self, cx: &mut FireCx) -> anyhow::Result<bool> {
        self.postfires.push(cx.instant);
        Ok(true)
    }
}

/// Declines to prefire before `from`.
pub struct Gate {
    pub from: u64,
}

impl Component for Gate {
    fn name(&self) -> &str {
        "gate"
    }
    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::output("out", DataType::Int)]
    }
    fn prefire(&mut self, cx: &mut FireCx) -> anyhow::Result<bool> {
        Ok(cx.instant >= self.from)
    }
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        cx.put("out", 1)?;
        Ok(())
    }
}

/// Fails in the configured phase.
pub struct Faulty {
    pub fail_in_fire: bool,
}

impl Component for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }
    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::output("out", DataType::Int)]
    }
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()> {
        if self.fail_in_fire {
            anyhow::bail!("sensor offline");
        }
        cx.put("out", 1)?;
        Ok(())
    }
    fn postfire(&mut self, _cx: &mut FireCx) -> anyhow::Result<bool> {
        anyhow::bail!("could not commit")
    }
}

/// Tries to write its output during postfire.
pub struct LateWriter;

impl Component for LateWriter {
    fn name(&self) -> &str {
        "late"
    }
    fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::output("out", DataType::Int)]
    }
    fn fire(&mut self, _cx: &mut FireCx) -> anyhow::Result<()> {
        Ok(())
    }
    fn postfire(&mut self, cx: &mut FireCx) -> anyhow::Result<bool> {
        cx.put("out", 1)?;
        Ok(true)
    }
}

/// Non-strict unit delay that records what it commits at postfire.
pub struct Latch {
    pub name: String,
    pub held: i64,
    pub committed: Log<SignalState>,
}

impl Component for Latch {
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
        cx.put("out", self.held)?;
        Ok(())
    }
    fn postfire(&mut self, cx: &mut FireCx) -> anyhow::Result<bool> {
        let input = cx.input("in")?.clone();
        if let Some(v) = input.token().and_then(Token::as_int) {
            self.held = v;
        }
        self.committed.push(input);
        Ok(true)
    }
}

use wasm_bindgen::prelude::*;

use arm_machine::{MachineError, Register, Session, SessionConfig, State, Trace};
use serde::Serialize;

#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VizDeckError {
    InvalidConfig,
    TooManySeeds,
    UnknownRegister,
    InvalidValue,
    StateOutOfRange,
    CouldNotEncode,
}

impl From<MachineError> for VizDeckError {
    fn from(err: MachineError) -> Self {
        match err {
            MachineError::TooManySeeds => VizDeckError::TooManySeeds,
            _ => VizDeckError::InvalidConfig,
        }
    }
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    pub fn console_log(s: &str);
}

/// Browser handle on a [`Session`]. Every call that changes the listing or
/// the starting registers hands back the whole trace as JSON.
#[wasm_bindgen]
pub struct VizDeck {
    session: Session,
}

#[wasm_bindgen]
impl VizDeck {
    #[wasm_bindgen(constructor)]
    pub fn new(stack_slots: usize) -> Result<VizDeck, VizDeckError> {
        console_error_panic_hook::set_once();
        let config = SessionConfig::default().with_stack_slots(stack_slots);
        Ok(VizDeck {
            session: Session::new(config)?,
        })
    }

    /// Re-runs `source` and returns the trace.
    pub fn update(&mut self, source: &str) -> Result<String, VizDeckError> {
        let trace = self.session.update(source);
        for diagnostic in &trace.diagnostics {
            console_log(&diagnostic.to_string());
        }
        if let Some(failure) = &trace.failure {
            console_log(&format!("stopped at `{}`: {}", failure.text, failure.error));
        }
        trace_json(trace).map_err(|_| VizDeckError::CouldNotEncode)
    }

    pub fn state_count(&self) -> usize {
        self.session.trace().states.len()
    }

    pub fn state_json(&self, index: usize) -> Result<String, VizDeckError> {
        let state = self
            .session
            .trace()
            .states
            .get(index)
            .ok_or(VizDeckError::StateOutOfRange)?;
        serde_json::to_string(state).map_err(|_| VizDeckError::CouldNotEncode)
    }

    pub fn failure_line(&self) -> Option<u32> {
        self.session.trace().failure.as_ref().map(|failure| failure.line)
    }

    pub fn failure_message(&self) -> Option<String> {
        self.session
            .trace()
            .failure
            .as_ref()
            .map(|failure| failure.error.to_string())
    }

    /// Sets the starting value of a register and returns the re-run trace.
    /// `value` is decimal or `0x` hex text so all 64 bits survive the trip
    /// through JS.
    pub fn set_seed(&mut self, name: &str, value: &str) -> Result<String, VizDeckError> {
        let (register, value) = parse_seed(name, value)?;
        let trace = self.session.set_register(register, value)?;
        trace_json(trace).map_err(|_| VizDeckError::CouldNotEncode)
    }

    pub fn set_label_renders(&mut self, renders: u32) -> Result<String, VizDeckError> {
        let config = self.session.config().clone().with_label_renders(renders);
        let trace = self.session.reconfigure(config)?;
        trace_json(trace).map_err(|_| VizDeckError::CouldNotEncode)
    }
}

#[derive(Serialize)]
struct TraceView<'a> {
    states: &'a [State],
    diagnostics: Vec<String>,
    failure: Option<FailureView<'a>>,
}

#[derive(Serialize)]
struct FailureView<'a> {
    line: u32,
    text: &'a str,
    message: String,
}

/// The JSON document a shell renders: every state, the diagnostics as text
/// and the failing line if the run stopped early.
pub fn trace_json(trace: &Trace) -> Result<String, serde_json::Error> {
    let view = TraceView {
        states: &trace.states,
        diagnostics: trace.diagnostics.iter().map(ToString::to_string).collect(),
        failure: trace.failure.as_ref().map(|failure| FailureView {
            line: failure.line,
            text: &failure.text,
            message: failure.error.to_string(),
        }),
    };
    serde_json::to_string(&view)
}

pub fn parse_seed(name: &str, value: &str) -> Result<(Register, u64), VizDeckError> {
    let register = name
        .parse::<Register>()
        .map_err(|_| VizDeckError::UnknownRegister)?;
    let value = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) if hex.bytes().all(|b| b.is_ascii_hexdigit()) => u64::from_str_radix(hex, 16),
        Some(_) => return Err(VizDeckError::InvalidValue),
        None if value.bytes().all(|b| b.is_ascii_digit()) => value.parse::<u64>(),
        None => return Err(VizDeckError::InvalidValue),
    }
    .map_err(|_| VizDeckError::InvalidValue)?;
    Ok((register, value))
}

#[cfg(test)]
mod test;

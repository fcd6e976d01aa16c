use super::*;

use serde_json::{Value, json};

fn traced(source: &str) -> Value {
    let mut session = Session::new(SessionConfig::default()).unwrap();
    let json = trace_json(session.update(source)).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn complete_trace_has_no_failure() {
    let json = traced("stp x29, x30, [sp, #-16]!\nmov x29, sp");
    assert_eq!(json["states"].as_array().unwrap().len(), 3);
    assert_eq!(json["states"][0]["instruction"], "init");
    assert_eq!(json["states"][2]["registers"]["x29"], "104");
    assert_eq!(json["diagnostics"], json!([]));
    assert_eq!(json["failure"], Value::Null);
}

#[test]
fn diagnostics_and_failure_are_rendered_as_text() {
    let json = traced("stp x29, x30, [sp, #-16]!\nbl foo\nldrb w0, [sp, #200]\nmov x0, #1");
    assert_eq!(json["states"].as_array().unwrap().len(), 3);
    assert_eq!(
        json["diagnostics"],
        json!(["line 2: unsupported opcode `bl`"])
    );
    assert_eq!(
        json["failure"],
        json!({
            "line": 3,
            "text": "ldrb w0, [sp, #200]",
            "message": "memory address 304 is out of stack bounds",
        })
    );
}

#[test]
fn seeds_parse_decimal_and_hex() {
    assert_eq!(parse_seed("x29", "7"), Ok((Register::X29, 7)));
    assert_eq!(parse_seed("sp", "0x10"), Ok((Register::Sp, 16)));
    assert_eq!(
        parse_seed("x0", "18446744073709551615"),
        Ok((Register::X0, u64::MAX))
    );
}

#[test]
fn bad_seeds_are_rejected() {
    assert_eq!(parse_seed("w3", "1"), Err(VizDeckError::UnknownRegister));
    assert_eq!(parse_seed("x0", "-1"), Err(VizDeckError::InvalidValue));
    assert_eq!(parse_seed("x0", "+1"), Err(VizDeckError::InvalidValue));
    assert_eq!(parse_seed("x0", "0x"), Err(VizDeckError::InvalidValue));
    assert_eq!(
        parse_seed("x0", "18446744073709551616"),
        Err(VizDeckError::InvalidValue)
    );
}

#[test]
fn machine_errors_map_to_deck_errors() {
    assert_eq!(
        VizDeckError::from(MachineError::InvalidStackSize(0)),
        VizDeckError::InvalidConfig
    );
    assert_eq!(
        VizDeckError::from(MachineError::TooManySeeds),
        VizDeckError::TooManySeeds
    );
}

#[test]
fn seeding_refreshes_the_served_states() {
    let mut deck = VizDeck::new(16).unwrap();
    deck.update("add x1, x0, #1").unwrap();
    let trace: Value = serde_json::from_str(&deck.set_seed("x0", "41").unwrap()).unwrap();
    assert_eq!(trace["states"][1]["registers"]["x1"], "42");

    assert_eq!(deck.state_count(), 2);
    let state: Value = serde_json::from_str(&deck.state_json(1).unwrap()).unwrap();
    assert_eq!(state["registers"]["x1"], "42");
    assert_eq!(deck.state_json(2), Err(VizDeckError::StateOutOfRange));
}

#[test]
fn label_lifetime_change_refreshes_the_served_states() {
    let mut deck = VizDeck::new(16).unwrap();
    deck.update("mov x0, #1\nmov x1, #2").unwrap();
    deck.set_label_renders(1).unwrap();
    let state: Value = serde_json::from_str(&deck.state_json(2).unwrap()).unwrap();
    assert_eq!(state["register_labels"], json!({ "x1": [["mov #2", 1]] }));
}

use super::*;
use alloc::string::ToString;

#[test]
fn readding_a_label_updates_its_count() {
    let mut store = LabelStore::new(2);
    store.add_slot(0, "stp x29".to_string(), 1);
    store.add_slot(0, "stp x29".to_string(), 5);
    store.add_slot(0, "x0[0:8]".to_string(), 1);
    assert_eq!(
        store.slot(0),
        &[Label::new("stp x29", 5), Label::new("x0[0:8]", 1)]
    );
}

#[test]
fn single_render_label_is_gone_after_decay() {
    let mut store = LabelStore::new(1);
    store.add_slot(0, "stp x30".to_string(), SINGLE_RENDER);
    store.decay();
    assert!(store.slot(0).is_empty());
    store.decay();
    assert!(store.slot(0).is_empty());
}

#[test]
fn default_label_survives_one_decay() {
    let mut store = LabelStore::new(1);
    store.add_register(Register::X0, "add x0".to_string(), DEFAULT_LABEL_RENDERS);
    store.decay();
    assert_eq!(store.register(Register::X0), &[Label::new("add x0", 1)]);
    store.decay();
    assert!(store.register(Register::X0).is_empty());
}

#[test]
fn replace_clears_previous_labels() {
    let mut store = LabelStore::new(1);
    store.add_slot(0, "a".to_string(), 3);
    store.add_slot(0, "b".to_string(), 3);
    store.replace_slot(0, Label::new("fp", 1));
    assert_eq!(store.slot(0), &[Label::new("fp", 1)]);
}

#[test]
fn out_of_range_slots_are_ignored() {
    let mut store = LabelStore::new(1);
    store.add_slot(4, "nowhere".to_string(), 1);
    assert_eq!(store.slot_entries().count(), 0);
}

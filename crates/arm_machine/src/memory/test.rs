use super::*;

#[test]
fn write_truncates_to_size() {
    let mut stack = MemoryStack::new(4).unwrap();
    stack.write(1, 0x1122_3344_5566_7788, 2).unwrap();
    assert_eq!(stack.read(1, 8).unwrap(), 0x7788);
}

#[test]
fn read_masks_to_size() {
    let mut stack = MemoryStack::new(4).unwrap();
    stack.write(0, u64::MAX, 8).unwrap();
    assert_eq!(stack.read(0, 1).unwrap(), 0xFF);
    assert_eq!(stack.read(0, 4).unwrap(), 0xFFFF_FFFF);
    assert_eq!(stack.read(0, 8).unwrap(), u64::MAX);
}

#[test]
fn oversized_access_is_rejected() {
    let mut stack = MemoryStack::new(4).unwrap();
    assert_eq!(stack.write(0, 1, 9), Err(MachineError::SizeExceeded(9)));
    assert_eq!(stack.read(0, 16), Err(MachineError::SizeExceeded(16)));
    assert_eq!(stack.write(0, 1, 0), Err(MachineError::SizeExceeded(0)));
}

#[test]
fn slot_index_past_end_is_out_of_bounds() {
    let mut stack = MemoryStack::new(4).unwrap();
    assert_eq!(stack.write(4, 1, 8), Err(MachineError::OutOfBounds(32)));
    assert!(stack.read(100, 8).is_err());
}

#[test]
fn locate_splits_slot_and_byte() {
    let stack = MemoryStack::new(4).unwrap();
    assert_eq!(stack.locate(0).unwrap(), ByteLocation { slot: 0, byte: 0 });
    assert_eq!(stack.locate(13).unwrap(), ByteLocation { slot: 1, byte: 5 });
    assert_eq!(stack.locate(31).unwrap(), ByteLocation { slot: 3, byte: 7 });
    assert_eq!(stack.locate(32), Err(MachineError::OutOfBounds(32)));
    assert_eq!(stack.locate(-1), Err(MachineError::OutOfBounds(-1)));
}

#[test]
fn byte_write_merges_into_slot() {
    let mut stack = MemoryStack::new(2).unwrap();
    stack.write(1, 0x1111_1111_1111_1111, 8).unwrap();
    let location = stack.locate(10).unwrap();
    stack.write_byte(location, 0xAB).unwrap();
    assert_eq!(stack.read(1, 8).unwrap(), 0x1111_1111_11AB_1111);
    assert_eq!(stack.read_byte(location).unwrap(), 0xAB);
}

#[test]
fn top_address_is_highest_slot() {
    let stack = MemoryStack::new(16).unwrap();
    assert_eq!(stack.top_address(), 120);
}

#[test]
fn rejects_empty_and_huge_stacks() {
    assert_eq!(MemoryStack::new(0), Err(MachineError::InvalidStackSize(0)));
    assert!(MemoryStack::new(MAX_STACK_SLOTS + 1).is_err());
}

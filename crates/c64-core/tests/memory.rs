//! Banking and memory-map tests

use c64_core::memory::{Memory, CPU_PORT, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};

#[test]
fn test_rom_overlays_visible_after_power_on() {
    let memory = Memory::new();
    // Placeholder BASIC/KERNAL ROMs are NOP sleds, character ROM is blank
    for address in [0xA000u16, 0xB000, 0xBFFF, 0xE000, 0xF000, 0xFFF0] {
        assert_eq!(memory.read(address), 0xEA, "address ${address:04X}");
    }
}

#[test]
fn test_basic_rom_write_discarded_across_range() {
    let mut memory = Memory::new();
    for address in [0xA000u16, 0xA800, 0xB555, 0xBFFF] {
        memory.write(address, 0x12);
        assert_eq!(memory.read(address), 0xEA, "address ${address:04X}");
    }
}

#[test]
fn test_kernal_rom_write_discarded_across_range() {
    let mut memory = Memory::new();
    for address in [0xE000u16, 0xF123, 0xFFF9] {
        memory.write(address, 0x12);
        assert_eq!(memory.read(address), 0xEA, "address ${address:04X}");
    }
}

#[test]
fn test_banking_toggle_exposes_ram() {
    let mut memory = Memory::new();

    // Power-on: BASIC ROM visible
    assert_eq!(memory.read(0xA000), 0xEA);

    // All overlays off: the RAM underneath (zeroed) shows through
    memory.write(CPU_PORT, 0x00);
    assert_eq!(memory.read(0xA000), 0x00);

    // Back on: ROM again
    memory.write(CPU_PORT, 0x07);
    assert_eq!(memory.read(0xA000), 0xEA);
}

#[test]
fn test_port_07_then_30_disables_everything() {
    let mut memory = Memory::new();
    memory.write(CPU_PORT, 0x07);
    memory.write(CPU_PORT, 0x30);

    assert!(!memory.basic_rom_enabled());
    assert!(!memory.kernal_rom_enabled());
    assert!(!memory.io_enabled());
    assert!(!memory.char_rom_enabled());

    // BASIC range reads the underlying RAM
    memory.write(0xA000, 0x42);
    assert_eq!(memory.read(0xA000), 0x42);
}

#[test]
fn test_ram_shadow_survives_rom_overlay() {
    let mut memory = Memory::new();

    // Bank ROMs out, write into the shadow, bank them back in
    memory.write(CPU_PORT, 0x00);
    memory.write(0xB000, 0x99);
    memory.write(CPU_PORT, 0x37);
    assert_eq!(memory.read(0xB000), 0xEA);

    // The shadow byte is still there afterwards
    memory.write(CPU_PORT, 0x00);
    assert_eq!(memory.read(0xB000), 0x99);
}

#[test]
fn test_io_aperture_reads_shadow_when_enabled() {
    let mut memory = Memory::new();
    memory.write(0xD400, 0x55);
    assert_eq!(memory.read(0xD400), 0x55);
}

#[test]
fn test_char_rom_when_io_disabled() {
    let mut memory = Memory::new();
    // bit 2 clear, bits 0-1 set: character ROM banked in
    memory.write(CPU_PORT, 0x03);
    assert!(memory.char_rom_enabled());
    assert!(!memory.io_enabled());
    assert_eq!(memory.read(0xD000), 0x00);
    assert_eq!(memory.read(0xDFFF), 0x00);
}

#[test]
fn test_vectors_through_kernal_overlay() {
    let memory = Memory::new();
    let read16 = |addr: u16| {
        memory.read(addr) as u16 | (memory.read(addr + 1) as u16) << 8
    };
    assert_eq!(read16(NMI_VECTOR), 0xFE43);
    assert_eq!(read16(RESET_VECTOR), 0xE000);
    assert_eq!(read16(IRQ_VECTOR), 0xFF48);
}

#[test]
fn test_set_kernal_vector() {
    let mut memory = Memory::new();
    memory.set_kernal_vector(RESET_VECTOR, 0x0800);
    assert_eq!(memory.read(RESET_VECTOR), 0x00);
    assert_eq!(memory.read(RESET_VECTOR + 1), 0x08);
    // The other two vectors are untouched
    assert_eq!(memory.read(IRQ_VECTOR), 0x48);
}

#[test]
fn test_page_map_tracks_port_bits() {
    let mut memory = Memory::new();

    // Flip a single banking bit and check the affected window only
    memory.write(CPU_PORT, 0x36); // bit 0 clear: BASIC still on via bit 1
    assert!(memory.basic_rom_enabled());
    assert_eq!(memory.read(0xA000), 0xEA);

    memory.write(CPU_PORT, 0x34); // bits 0-1 clear: BASIC and KERNAL off
    assert!(!memory.basic_rom_enabled());
    assert!(!memory.kernal_rom_enabled());
    assert!(memory.io_enabled());
    assert_eq!(memory.read(0xA000), 0x00);
    assert_eq!(memory.read(0xE000), 0x00);
}

#[test]
fn test_load_program_visible_through_read() {
    let mut memory = Memory::new();
    memory.load(0x0800, &[0xA9, 0x42, 0x00]);
    assert_eq!(memory.read(0x0800), 0xA9);
    assert_eq!(memory.read(0x0801), 0x42);
    assert_eq!(memory.read(0x0802), 0x00);
}

#[test]
fn test_dump_reflects_banking() {
    let mut memory = Memory::new();
    let dump = memory.dump(0xA000, 16);
    assert!(dump.starts_with("$A000: EA EA"));

    memory.write(CPU_PORT, 0x00);
    let dump = memory.dump(0xA000, 16);
    assert!(dump.starts_with("$A000: 00 00"));
}

//! C64 System Integration
//!
//! This module wires the CPU, the banked memory and the I/O chips into a
//! single owned `Machine` value. The machine composes a bus that routes
//! the $D000-$DFFF aperture to the chip register banks whenever I/O is
//! banked in, falling back to the memory contract for everything else.

use std::path::Path;

use log::info;

use crate::cpu::{Bus, Cpu, KernalTrap};
use crate::io::Io;
use crate::memory::{Memory, RESET_VECTOR};

/// Default load address for raw program files
pub const DEFAULT_LOAD_ADDRESS: u16 = 0x0800;

/// Boot stub installed at $0800: set the BASIC init flag and jump into
/// the BASIC ROM entry point.
const BOOT_PROGRAM: [u8; 7] = [
    0xA9, 0x01, // LDA #$01
    0x85, 0x02, // STA $02
    0x4C, 0x00, 0xA0, // JMP $A000
];

/// Bus view over memory plus the I/O chips: reads and writes in the
/// aperture go to a chip when one claims the address, to the memory
/// contract (RAM shadow) otherwise.
struct SystemBus<'a> {
    memory: &'a mut Memory,
    io: &'a mut Io,
}

impl Bus for SystemBus<'_> {
    fn read(&mut self, address: u16) -> u8 {
        if self.memory.io_mapped(address) {
            if let Some(value) = self.io.read(address) {
                return value;
            }
        }
        self.memory.read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        if self.memory.io_mapped(address) && self.io.write(address, value) {
            return;
        }
        self.memory.write(address, value);
    }
}

/// A complete machine: CPU, memory, I/O chips and the host-supplied
/// KERNAL trap.
pub struct Machine<K: KernalTrap> {
    cpu: Cpu,
    memory: Memory,
    io: Io,
    kernal: K,
}

impl<K: KernalTrap> Machine<K> {
    /// Power on: memory defaults, I/O chip defaults, cleared screen, CPU
    /// reset through the KERNAL reset vector.
    pub fn new(kernal: K) -> Self {
        let mut machine = Self {
            cpu: Cpu::new(),
            memory: Memory::new(),
            io: Io::new(),
            kernal,
        };
        machine.io.clear_screen(&mut machine.memory);
        machine.reset_cpu();
        machine
    }

    /// Try to load the three ROM images. Returns `true` only when all of
    /// them loaded; on any failure the built-in placeholders remain.
    pub fn load_roms(&mut self, basic: &Path, kernal: &Path, chargen: &Path) -> bool {
        let basic_loaded = self.memory.load_basic_rom(basic);
        let kernal_loaded = self.memory.load_kernal_rom(kernal);
        let char_loaded = self.memory.load_char_rom(chargen);
        basic_loaded && kernal_loaded && char_loaded
    }

    /// Load a raw machine-code program into RAM at `address`. The file
    /// format has no header; bytes land verbatim.
    pub fn load_program(&mut self, address: u16, data: &[u8]) {
        self.memory.load(address, data);
        info!("loaded {} bytes at ${:04X}", data.len(), address);
    }

    /// Install the boot stub at $0800 and point the reset vector at it,
    /// so the next reset lands in the stub instead of the KERNAL.
    pub fn install_boot_program(&mut self) {
        self.memory.load(DEFAULT_LOAD_ADDRESS, &BOOT_PROGRAM);
        self.memory
            .set_kernal_vector(RESET_VECTOR, DEFAULT_LOAD_ADDRESS);
    }

    /// Reset the machine: CPU through the reset vector, I/O chips back to
    /// power-on state, screen cleared.
    pub fn reset(&mut self) {
        self.io = Io::new();
        self.io.clear_screen(&mut self.memory);
        self.reset_cpu();
    }

    fn reset_cpu(&mut self) {
        let mut bus = SystemBus {
            memory: &mut self.memory,
            io: &mut self.io,
        };
        self.cpu.reset(&mut bus);
    }

    /// Execute a single instruction.
    pub fn step(&mut self) {
        let mut bus = SystemBus {
            memory: &mut self.memory,
            io: &mut self.io,
        };
        self.cpu.step(&mut bus, &mut self.kernal);
    }

    /// Run until at least `n` more cycles have elapsed.
    pub fn run_cycles(&mut self, n: u64) {
        let mut bus = SystemBus {
            memory: &mut self.memory,
            io: &mut self.io,
        };
        self.cpu.run_cycles(&mut bus, &mut self.kernal, n);
    }

    /// Raise an interrupt between instructions; NMIs are always taken,
    /// IRQs only while the I flag is clear.
    pub fn interrupt(&mut self, nmi: bool) {
        let mut bus = SystemBus {
            memory: &mut self.memory,
            io: &mut self.io,
        };
        self.cpu.interrupt(&mut bus, nmi);
    }

    /// Read a byte the way the CPU would see it.
    pub fn peek(&mut self, address: u16) -> u8 {
        let mut bus = SystemBus {
            memory: &mut self.memory,
            io: &mut self.io,
        };
        bus.read(address)
    }

    /// Write a byte the way a CPU store would.
    pub fn poke(&mut self, address: u16, value: u8) {
        let mut bus = SystemBus {
            memory: &mut self.memory,
            io: &mut self.io,
        };
        bus.write(address, value);
    }

    /// Hex dump through the banked read path.
    pub fn dump(&self, start: u16, length: u16) -> String {
        self.memory.dump(start, length)
    }

    /// Blank the screen and its backing RAM.
    pub fn clear_screen(&mut self) {
        self.io.clear_screen(&mut self.memory);
    }

    /// Put text on the screen at the given position.
    pub fn print_text(&mut self, x: u8, y: u8, text: &str) {
        self.io.print_text(&mut self.memory, x, y, text);
    }

    /// Render the current screen contents as terminal text.
    pub fn render_screen(&self) -> String {
        self.io.render()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn io(&self) -> &Io {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut Io {
        &mut self.io
    }

    pub fn kernal_mut(&mut self) -> &mut K {
        &mut self.kernal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Trap that swallows everything; enough for tests that never JSR
    /// into the KERNAL.
    struct NullKernal;

    impl KernalTrap for NullKernal {
        fn chrout(&mut self, _ch: u8) {}

        fn chrin(&mut self) -> u8 {
            0
        }

        fn getin(&mut self) -> u8 {
            0
        }
    }

    #[test]
    fn test_power_on_reset_vector() {
        let machine = Machine::new(NullKernal);
        // The placeholder KERNAL vectors point reset at $E000
        assert_eq!(machine.cpu().registers().pc, 0xE000);
    }

    #[test]
    fn test_boot_program_reset() {
        let mut machine = Machine::new(NullKernal);
        machine.install_boot_program();
        machine.reset();
        assert_eq!(machine.cpu().registers().pc, DEFAULT_LOAD_ADDRESS);

        // LDA #$01 / STA $02 / JMP $A000
        machine.step();
        machine.step();
        assert_eq!(machine.cpu().registers().a, 0x01);
        assert_eq!(machine.peek(0x0002), 0x01);
        machine.step();
        assert_eq!(machine.cpu().registers().pc, 0xA000);
    }

    #[test]
    fn test_aperture_routed_to_chips() {
        let mut machine = Machine::new(NullKernal);
        // VIC border colour register, not the RAM shadow
        assert_eq!(machine.peek(0xD020), 0x0F);
        machine.poke(0xD020, 0x01);
        assert_eq!(machine.peek(0xD020), 0x01);
    }

    #[test]
    fn test_aperture_falls_back_to_ram_shadow() {
        let mut machine = Machine::new(NullKernal);
        // No chip claims $D100; the write lands in the RAM shadow
        machine.poke(0xD100, 0x5A);
        assert_eq!(machine.peek(0xD100), 0x5A);
    }

    #[test]
    fn test_reset_reinitialises_io() {
        let mut machine = Machine::new(NullKernal);
        machine.poke(0xD020, 0x02);
        machine.reset();
        assert_eq!(machine.peek(0xD020), 0x0F);
    }
}

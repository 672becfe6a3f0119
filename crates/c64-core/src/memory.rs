//! Banked memory subsystem
//!
//! The C64 memory map:
//! $0000-$00FF - Zero page ($0000/$0001 are the 6510 processor port)
//! $0100-$01FF - Stack
//! $0400-$07FF - Screen memory (40x25 character display)
//! $0800-$9FFF - BASIC program space
//! $A000-$BFFF - BASIC ROM or RAM, depending on banking
//! $C000-$CFFF - Free RAM
//! $D000-$DFFF - I/O chips or Character ROM or RAM, depending on banking
//! $E000-$FFFF - KERNAL ROM or RAM, depending on banking
//!
//! Which overlay is visible is controlled by the low three bits of the
//! processor port at $0001. Reads go through a per-page dispatch table
//! that is rebuilt whenever those bits change; writes that land on an
//! enabled ROM are discarded without touching the RAM underneath.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::warn;

/// Total addressable memory size (16-bit address bus)
pub const MEMORY_SIZE: usize = 0x10000;
/// Number of 256-byte pages in the address space
pub const PAGE_COUNT: usize = 256;

/// BASIC ROM image size (8 KiB)
pub const BASIC_ROM_SIZE: usize = 0x2000;
/// KERNAL ROM image size (8 KiB)
pub const KERNAL_ROM_SIZE: usize = 0x2000;
/// Character generator ROM image size (4 KiB)
pub const CHAR_ROM_SIZE: usize = 0x1000;

/// BASIC ROM window
pub const BASIC_ROM_START: u16 = 0xA000;
pub const BASIC_ROM_END: u16 = 0xBFFF;
/// KERNAL ROM window
pub const KERNAL_ROM_START: u16 = 0xE000;
pub const KERNAL_ROM_END: u16 = 0xFFFF;
/// I/O aperture (shared with the character ROM overlay)
pub const IO_REGION_START: u16 = 0xD000;
pub const IO_REGION_END: u16 = 0xDFFF;

/// 6510 processor port: data direction register and banking control
pub const CPU_PORT_DDR: u16 = 0x0000;
pub const CPU_PORT: u16 = 0x0001;

/// NMI vector location
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector location
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector location
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Which region a 256-byte page resolves to on a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    Ram,
    BasicRom,
    KernalRom,
    CharRom,
    Io,
}

/// Banked memory: 64 KiB of RAM plus the three ROM overlays.
#[derive(Clone)]
pub struct Memory {
    /// Flat 64 KiB RAM, including the shadow under the ROM overlays
    ram: [u8; MEMORY_SIZE],
    /// 8 KiB BASIC ROM image at $A000-$BFFF
    basic_rom: [u8; BASIC_ROM_SIZE],
    /// 8 KiB KERNAL ROM image at $E000-$FFFF
    kernal_rom: [u8; KERNAL_ROM_SIZE],
    /// 4 KiB character generator ROM image at $D000-$DFFF
    char_rom: [u8; CHAR_ROM_SIZE],

    basic_enabled: bool,
    kernal_enabled: bool,
    char_enabled: bool,
    io_enabled: bool,

    /// Read dispatch per page; derived from the banking flags
    read_map: [PageSource; PAGE_COUNT],
}

impl Memory {
    /// Create the power-on memory configuration: RAM cleared, placeholder
    /// ROMs installed, vectors set, all overlays enabled.
    pub fn new() -> Self {
        let mut memory = Self {
            ram: [0; MEMORY_SIZE],
            // Placeholder ROM contents until real images are loaded:
            // NOP sleds for BASIC/KERNAL, empty characters
            basic_rom: [0xEA; BASIC_ROM_SIZE],
            kernal_rom: [0xEA; KERNAL_ROM_SIZE],
            char_rom: [0x00; CHAR_ROM_SIZE],
            basic_enabled: true,
            kernal_enabled: true,
            char_enabled: true,
            io_enabled: true,
            read_map: [PageSource::Ram; PAGE_COUNT],
        };

        // Power-on state of the 6510 port: all three ROMs plus I/O banked in
        memory.ram[CPU_PORT_DDR as usize] = 0x2F;
        memory.ram[CPU_PORT as usize] = 0x37;

        // Hard-wired KERNAL vectors so reset and interrupts land somewhere
        // sensible even without a real ROM image
        memory.set_kernal_vector(NMI_VECTOR, 0xFE43);
        memory.set_kernal_vector(RESET_VECTOR, 0xE000);
        memory.set_kernal_vector(IRQ_VECTOR, 0xFF48);

        memory.rebuild_page_map();
        memory
    }

    /// Point one of the three vectors at the top of the KERNAL image to
    /// `target`. The vectors live in ROM, so host code that wants reset to
    /// land on its own program patches the image rather than RAM.
    pub fn set_kernal_vector(&mut self, vector: u16, target: u16) {
        let offset = (vector - KERNAL_ROM_START) as usize;
        self.kernal_rom[offset] = target as u8;
        self.kernal_rom[offset + 1] = (target >> 8) as u8;
    }

    fn rebuild_page_map(&mut self) {
        let mut map = [PageSource::Ram; PAGE_COUNT];

        if self.basic_enabled {
            for page in 0xA0..=0xBF {
                map[page] = PageSource::BasicRom;
            }
        }

        if self.kernal_enabled {
            for page in 0xE0..=0xFF {
                map[page] = PageSource::KernalRom;
            }
        }

        if self.io_enabled {
            for page in 0xD0..=0xDF {
                map[page] = PageSource::Io;
            }
        } else if self.char_enabled {
            for page in 0xD0..=0xDF {
                map[page] = PageSource::CharRom;
            }
        }

        self.read_map = map;
    }

    /// Read a byte, taking the current banking configuration into account.
    ///
    /// The I/O aperture reads the RAM shadow here; a full machine routes
    /// those pages to the chip register banks first (see `system`).
    pub fn read(&self, address: u16) -> u8 {
        match self.read_map[(address >> 8) as usize] {
            PageSource::Ram | PageSource::Io => self.ram[address as usize],
            PageSource::BasicRom => self.basic_rom[(address - BASIC_ROM_START) as usize],
            PageSource::KernalRom => self.kernal_rom[(address - KERNAL_ROM_START) as usize],
            PageSource::CharRom => self.char_rom[(address - IO_REGION_START) as usize],
        }
    }

    /// Write a byte, taking the current banking configuration into account.
    /// Writes into an enabled ROM overlay are discarded.
    pub fn write(&mut self, address: u16, value: u8) {
        if self.basic_enabled && (BASIC_ROM_START..=BASIC_ROM_END).contains(&address) {
            return;
        }
        if self.kernal_enabled && (KERNAL_ROM_START..=KERNAL_ROM_END).contains(&address) {
            return;
        }
        if (IO_REGION_START..=IO_REGION_END).contains(&address) {
            if self.io_enabled {
                self.ram[address as usize] = value;
                return;
            }
            if self.char_enabled {
                // Character ROM is banked in; the write goes nowhere
                return;
            }
        }

        if address == CPU_PORT {
            self.write_cpu_port(value);
            return;
        }

        self.ram[address as usize] = value;
    }

    /// Store a new processor-port value and derive the banking flags from
    /// its low bits. The page map is only rebuilt when bits 0-2 changed.
    fn write_cpu_port(&mut self, value: u8) {
        let old = self.ram[CPU_PORT as usize];
        self.ram[CPU_PORT as usize] = value;

        self.kernal_enabled = value & 0x02 != 0;
        self.basic_enabled = value & 0x03 != 0;
        self.io_enabled = value & 0x04 != 0;
        self.char_enabled = value & 0x04 == 0 && value & 0x03 != 0;

        if (old ^ value) & 0x07 != 0 {
            self.rebuild_page_map();
        }
    }

    /// True when `address` falls in the I/O aperture and I/O is banked in.
    pub fn io_mapped(&self, address: u16) -> bool {
        self.io_enabled && (IO_REGION_START..=IO_REGION_END).contains(&address)
    }

    pub fn basic_rom_enabled(&self) -> bool {
        self.basic_enabled
    }

    pub fn kernal_rom_enabled(&self) -> bool {
        self.kernal_enabled
    }

    pub fn char_rom_enabled(&self) -> bool {
        self.char_enabled
    }

    pub fn io_enabled(&self) -> bool {
        self.io_enabled
    }

    /// Copy `data` into RAM starting at `address`, truncating at the top of
    /// memory. ROM overlays are bypassed: this is a host-side load, not a
    /// CPU write.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let start = address as usize;
        let mut length = data.len();
        if start + length > MEMORY_SIZE {
            warn!(
                "load of {} bytes at ${:04X} exceeds memory bounds, truncating",
                length, address
            );
            length = MEMORY_SIZE - start;
        }
        self.ram[start..start + length].copy_from_slice(&data[..length]);
    }

    /// Load the 8 KiB BASIC ROM image from `path`.
    pub fn load_basic_rom(&mut self, path: &Path) -> bool {
        let loaded = load_rom_image(path, &mut self.basic_rom);
        if loaded {
            self.rebuild_page_map();
        }
        loaded
    }

    /// Load the 8 KiB KERNAL ROM image from `path`.
    pub fn load_kernal_rom(&mut self, path: &Path) -> bool {
        let loaded = load_rom_image(path, &mut self.kernal_rom);
        if loaded {
            self.rebuild_page_map();
        }
        loaded
    }

    /// Load the 4 KiB character generator ROM image from `path`.
    pub fn load_char_rom(&mut self, path: &Path) -> bool {
        let loaded = load_rom_image(path, &mut self.char_rom);
        if loaded {
            self.rebuild_page_map();
        }
        loaded
    }

    /// Format a hex dump of `length` bytes starting at `start`, 16 bytes
    /// per line, through the banked read path (so ROM contents show up).
    pub fn dump(&self, start: u16, length: u16) -> String {
        let start = start as usize;
        let end = (start + length as usize).min(MEMORY_SIZE);

        let mut out = String::new();
        for (i, address) in (start..end).enumerate() {
            if i % 16 == 0 {
                if i > 0 {
                    out.push('\n');
                }
                let _ = write!(out, "${:04X}:", address);
            }
            let _ = write!(out, " {:02X}", self.read(address as u16));
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill `rom` from the file at `path`. A short file leaves the tail of the
/// buffer at its previous contents; a missing file leaves the buffer
/// untouched and returns `false`.
fn load_rom_image(path: &Path, rom: &mut [u8]) -> bool {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            warn!("could not open ROM file {}: {}", path.display(), err);
            return false;
        }
    };

    let length = data.len().min(rom.len());
    rom[..length].copy_from_slice(&data[..length]);

    if data.len() != rom.len() {
        warn!(
            "ROM file {} size mismatch ({} bytes read, expected {})",
            path.display(),
            data.len(),
            rom.len()
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_defaults() {
        let memory = Memory::new();
        assert_eq!(memory.read(0x0000), 0x2F);
        assert_eq!(memory.read(0x0001), 0x37);
        assert!(memory.basic_rom_enabled());
        assert!(memory.kernal_rom_enabled());
        assert!(memory.char_rom_enabled());
        assert!(memory.io_enabled());

        // Placeholder ROMs: NOP sleds visible through the overlays
        assert_eq!(memory.read(0xA000), 0xEA);
        assert_eq!(memory.read(0xE000), 0xEA);
    }

    #[test]
    fn test_power_on_vectors() {
        let memory = Memory::new();
        assert_eq!(memory.read(NMI_VECTOR), 0x43);
        assert_eq!(memory.read(NMI_VECTOR + 1), 0xFE);
        assert_eq!(memory.read(RESET_VECTOR), 0x00);
        assert_eq!(memory.read(RESET_VECTOR + 1), 0xE0);
        assert_eq!(memory.read(IRQ_VECTOR), 0x48);
        assert_eq!(memory.read(IRQ_VECTOR + 1), 0xFF);
    }

    #[test]
    fn test_ram_read_write() {
        let mut memory = Memory::new();
        memory.write(0x0800, 0x42);
        assert_eq!(memory.read(0x0800), 0x42);
    }

    #[test]
    fn test_rom_write_discarded() {
        let mut memory = Memory::new();
        memory.write(0xA123, 0x55);
        assert_eq!(memory.read(0xA123), 0xEA);

        // The RAM shadow must not have been touched either
        memory.write(CPU_PORT, 0x00);
        assert_eq!(memory.read(0xA123), 0x00);
    }

    #[test]
    fn test_processor_port_decode() {
        let mut memory = Memory::new();

        memory.write(CPU_PORT, 0x00);
        assert!(!memory.basic_rom_enabled());
        assert!(!memory.kernal_rom_enabled());
        assert!(!memory.char_rom_enabled());
        assert!(!memory.io_enabled());

        // KERNAL follows bit 1, BASIC follows bits 0-1 combined
        memory.write(CPU_PORT, 0x02);
        assert!(memory.kernal_rom_enabled());
        assert!(memory.basic_rom_enabled());
        assert!(!memory.io_enabled());
        assert!(memory.char_rom_enabled());

        // Bit 2 picks I/O over character ROM
        memory.write(CPU_PORT, 0x05);
        assert!(memory.basic_rom_enabled());
        assert!(!memory.kernal_rom_enabled());
        assert!(memory.io_enabled());
        assert!(!memory.char_rom_enabled());
    }

    #[test]
    fn test_port_value_readable() {
        let mut memory = Memory::new();
        memory.write(CPU_PORT, 0x35);
        assert_eq!(memory.read(CPU_PORT), 0x35);
    }

    #[test]
    fn test_char_rom_overlay() {
        let mut memory = Memory::new();
        memory.write(0xD123, 0x99); // lands in the RAM shadow while I/O is on
        assert_eq!(memory.read(0xD123), 0x99);

        // Bank in the character ROM: reads come from the (zeroed) image,
        // writes are dropped
        memory.write(CPU_PORT, 0x03);
        assert_eq!(memory.read(0xD123), 0x00);
        memory.write(0xD123, 0x77);
        assert_eq!(memory.read(0xD123), 0x00);

        // All overlays off: the region is plain RAM again
        memory.write(CPU_PORT, 0x00);
        assert_eq!(memory.read(0xD123), 0x99);
        memory.write(0xD123, 0x77);
        assert_eq!(memory.read(0xD123), 0x77);
    }

    #[test]
    fn test_load_truncates_at_top_of_memory() {
        let mut memory = Memory::new();
        memory.write(CPU_PORT, 0x00); // bank everything out so RAM is visible
        memory.load(0xFFFE, &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(memory.read(0xFFFE), 0x11);
        assert_eq!(memory.read(0xFFFF), 0x22);
        assert_eq!(memory.read(0x0000), 0x2F); // no wrap-around
    }

    #[test]
    fn test_load_bypasses_rom_overlay() {
        let mut memory = Memory::new();
        memory.load(0xA000, &[0x12]);
        // Overlay still wins on reads...
        assert_eq!(memory.read(0xA000), 0xEA);
        // ...but the RAM underneath took the byte
        memory.write(CPU_PORT, 0x00);
        assert_eq!(memory.read(0xA000), 0x12);
    }

    #[test]
    fn test_dump_format() {
        let mut memory = Memory::new();
        memory.load(0x0800, &[0xA9, 0x01, 0x85]);
        let dump = memory.dump(0x0800, 3);
        assert_eq!(dump, "$0800: A9 01 85\n");
    }

    #[test]
    fn test_dump_line_breaks() {
        let memory = Memory::new();
        let dump = memory.dump(0x0400, 32);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("$0400:"));
        assert!(lines[1].starts_with("$0410:"));
    }

    #[test]
    fn test_missing_rom_file_keeps_placeholder() {
        let mut memory = Memory::new();
        assert!(!memory.load_basic_rom(Path::new("no/such/rom.bin")));
        assert_eq!(memory.read(0xA000), 0xEA);
    }
}

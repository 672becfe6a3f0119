//! CPU module - MOS 6510 (6502 variant) interpreter
//!
//! The 6510 in the Commodore 64 is a 6502 core with an added processor
//! port used for memory banking; the port itself lives in the memory
//! subsystem, so this module is a plain 6502 interpreter. Decimal mode
//! is accepted as a flag but has no arithmetic effect.
//!
//! Decoding is table driven: a 256-entry table maps each opcode byte to
//! its operation, addressing mode, byte length and base cycle cost.
//! Unpopulated entries fall back to a 1-byte, 2-cycle no-op so the
//! interpreter always makes forward progress.

use std::fmt;

use log::{log_enabled, trace, warn, Level};

use crate::memory::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};

/// The stack lives in page 1; `sp` is the low byte of the address
pub const STACK_PAGE: u16 = 0x0100;

/// JSR targets at or above this address are intercepted as KERNAL calls
pub const KERNAL_TRAP_BASE: u16 = 0xFF00;
/// CHROUT - write the character in A to the current output device
pub const KERNAL_CHROUT: u16 = 0xFFD2;
/// CHRIN - read one character from the current input device into A
pub const KERNAL_CHRIN: u16 = 0xFFCF;
/// GETIN - non-blocking read; A receives the character or 0
pub const KERNAL_GETIN: u16 = 0xFFE4;

/// Bus trait for memory access
pub trait Bus {
    /// Read a byte from the given address
    fn read(&mut self, address: u16) -> u8;
    /// Write a byte to the given address
    fn write(&mut self, address: u16, value: u8);
}

/// Host-supplied KERNAL trap: the CPU routes the well-known ROM entry
/// points here instead of executing the (placeholder) ROM.
pub trait KernalTrap {
    /// CHROUT ($FFD2): consume the character in A
    fn chrout(&mut self, ch: u8);
    /// CHRIN ($FFCF): produce one input character for A
    fn chrin(&mut self) -> u8;
    /// GETIN ($FFE4): produce a pending input character, or 0 for none
    fn getin(&mut self) -> u8;
}

/// 6510 register file
#[derive(Debug, Clone, Copy)]
pub struct Registers {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            pc: 0,
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD, // power-on stack pointer
        }
    }
}

/// CPU status flags, stored packed with bit 5 masked off
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const CARRY: u8 = 0b0000_0001;
    pub const ZERO: u8 = 0b0000_0010;
    pub const INTERRUPT: u8 = 0b0000_0100;
    pub const DECIMAL: u8 = 0b0000_1000;
    pub const BREAK: u8 = 0b0001_0000;
    pub const UNUSED: u8 = 0b0010_0000;
    pub const OVERFLOW: u8 = 0b0100_0000;
    pub const NEGATIVE: u8 = 0b1000_0000;

    pub fn new(flags: u8) -> Self {
        Self(flags & !Self::UNUSED)
    }

    /// Pack into a status byte; bit 5 always reads as 1
    pub fn to_byte(self) -> u8 {
        self.0 | Self::UNUSED
    }

    /// Unpack from a status byte; bit 5 is discarded
    pub fn from_byte(status: u8) -> Self {
        Self::new(status)
    }

    pub fn carry(&self) -> bool {
        (self.0 & Self::CARRY) != 0
    }

    pub fn zero(&self) -> bool {
        (self.0 & Self::ZERO) != 0
    }

    pub fn interrupt(&self) -> bool {
        (self.0 & Self::INTERRUPT) != 0
    }

    pub fn decimal(&self) -> bool {
        (self.0 & Self::DECIMAL) != 0
    }

    pub fn brk(&self) -> bool {
        (self.0 & Self::BREAK) != 0
    }

    pub fn overflow(&self) -> bool {
        (self.0 & Self::OVERFLOW) != 0
    }

    pub fn negative(&self) -> bool {
        (self.0 & Self::NEGATIVE) != 0
    }

    fn set(&mut self, mask: u8, value: bool) {
        self.0 = if value { self.0 | mask } else { self.0 & !mask };
    }

    pub fn set_carry(&mut self, value: bool) {
        self.set(Self::CARRY, value);
    }

    pub fn set_zero(&mut self, value: bool) {
        self.set(Self::ZERO, value);
    }

    pub fn set_interrupt(&mut self, value: bool) {
        self.set(Self::INTERRUPT, value);
    }

    pub fn set_decimal(&mut self, value: bool) {
        self.set(Self::DECIMAL, value);
    }

    pub fn set_overflow(&mut self, value: bool) {
        self.set(Self::OVERFLOW, value);
    }

    pub fn set_negative(&mut self, value: bool) {
        self.set(Self::NEGATIVE, value);
    }
}

impl fmt::Display for StatusFlags {
    /// `NVBDIZC` flag string with `.` for cleared bits
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}{}",
            if self.negative() { 'N' } else { '.' },
            if self.overflow() { 'V' } else { '.' },
            if self.brk() { 'B' } else { '.' },
            if self.decimal() { 'D' } else { '.' },
            if self.interrupt() { 'I' } else { '.' },
            if self.zero() { 'Z' } else { '.' },
            if self.carry() { 'C' } else { '.' },
        )
    }
}

/// Addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
}

/// Operation kind; the decode table maps opcode bytes onto these
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lda,
    Ldx,
    Ldy,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Txa,
    Tya,
    Tsx,
    Txs,
    Inx,
    Iny,
    Dex,
    Dey,
    Cmp,
    Beq,
    Bne,
    Bcs,
    Bcc,
    Bmi,
    Bpl,
    Bvs,
    Bvc,
    Jmp,
    Jsr,
    Rts,
    Nop,
    /// Anything the decode table does not know about
    Illegal,
}

impl Op {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Lda => "LDA",
            Op::Ldx => "LDX",
            Op::Ldy => "LDY",
            Op::Sta => "STA",
            Op::Stx => "STX",
            Op::Sty => "STY",
            Op::Tax => "TAX",
            Op::Tay => "TAY",
            Op::Txa => "TXA",
            Op::Tya => "TYA",
            Op::Tsx => "TSX",
            Op::Txs => "TXS",
            Op::Inx => "INX",
            Op::Iny => "INY",
            Op::Dex => "DEX",
            Op::Dey => "DEY",
            Op::Cmp => "CMP",
            Op::Beq => "BEQ",
            Op::Bne => "BNE",
            Op::Bcs => "BCS",
            Op::Bcc => "BCC",
            Op::Bmi => "BMI",
            Op::Bpl => "BPL",
            Op::Bvs => "BVS",
            Op::Bvc => "BVC",
            Op::Jmp => "JMP",
            Op::Jsr => "JSR",
            Op::Rts => "RTS",
            Op::Nop => "NOP",
            Op::Illegal => "???",
        }
    }
}

/// One decode table entry: operation, addressing mode, byte length and
/// base cycle cost
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub op: Op,
    pub mode: AddressingMode,
    pub size: u8,
    pub cycles: u8,
}

const fn ins(op: Op, mode: AddressingMode, size: u8, cycles: u8) -> Instruction {
    Instruction {
        op,
        mode,
        size,
        cycles,
    }
}

const fn decode_table() -> [Instruction; 256] {
    use AddressingMode::*;
    use Op::*;

    // Default entry: unknown opcodes act as a 1-byte, 2-cycle no-op
    let mut t = [ins(Illegal, Implied, 1, 2); 256];

    // LDA - Load Accumulator
    t[0xA9] = ins(Lda, Immediate, 2, 2);
    t[0xA5] = ins(Lda, ZeroPage, 2, 3);
    t[0xB5] = ins(Lda, ZeroPageX, 2, 4);
    t[0xAD] = ins(Lda, Absolute, 3, 4);
    t[0xBD] = ins(Lda, AbsoluteX, 3, 4);
    t[0xB9] = ins(Lda, AbsoluteY, 3, 4);
    t[0xA1] = ins(Lda, IndexedIndirect, 2, 6);
    t[0xB1] = ins(Lda, IndirectIndexed, 2, 5);

    // LDX - Load X Register
    t[0xA2] = ins(Ldx, Immediate, 2, 2);
    t[0xA6] = ins(Ldx, ZeroPage, 2, 3);
    t[0xB6] = ins(Ldx, ZeroPageY, 2, 4);
    t[0xAE] = ins(Ldx, Absolute, 3, 4);
    t[0xBE] = ins(Ldx, AbsoluteY, 3, 4);

    // LDY - Load Y Register
    t[0xA0] = ins(Ldy, Immediate, 2, 2);
    t[0xA4] = ins(Ldy, ZeroPage, 2, 3);
    t[0xB4] = ins(Ldy, ZeroPageX, 2, 4);
    t[0xAC] = ins(Ldy, Absolute, 3, 4);
    t[0xBC] = ins(Ldy, AbsoluteX, 3, 4);

    // STA - Store Accumulator
    t[0x85] = ins(Sta, ZeroPage, 2, 3);
    t[0x95] = ins(Sta, ZeroPageX, 2, 4);
    t[0x8D] = ins(Sta, Absolute, 3, 4);
    t[0x9D] = ins(Sta, AbsoluteX, 3, 5);
    t[0x99] = ins(Sta, AbsoluteY, 3, 5);
    t[0x81] = ins(Sta, IndexedIndirect, 2, 6);
    t[0x91] = ins(Sta, IndirectIndexed, 2, 6);

    // STX - Store X Register
    t[0x86] = ins(Stx, ZeroPage, 2, 3);
    t[0x96] = ins(Stx, ZeroPageY, 2, 4);
    t[0x8E] = ins(Stx, Absolute, 3, 4);

    // STY - Store Y Register
    t[0x84] = ins(Sty, ZeroPage, 2, 3);
    t[0x94] = ins(Sty, ZeroPageX, 2, 4);
    t[0x8C] = ins(Sty, Absolute, 3, 4);

    // JMP - Jump
    t[0x4C] = ins(Jmp, Absolute, 3, 3);
    t[0x6C] = ins(Jmp, Indirect, 3, 5);

    // JSR/RTS - Subroutine operations
    t[0x20] = ins(Jsr, Absolute, 3, 6);
    t[0x60] = ins(Rts, Implied, 1, 6);

    // Register increment/decrement
    t[0xE8] = ins(Inx, Implied, 1, 2);
    t[0xC8] = ins(Iny, Implied, 1, 2);
    t[0xCA] = ins(Dex, Implied, 1, 2);
    t[0x88] = ins(Dey, Implied, 1, 2);

    // CMP - Compare Accumulator
    t[0xC9] = ins(Cmp, Immediate, 2, 2);
    t[0xC5] = ins(Cmp, ZeroPage, 2, 3);
    t[0xD5] = ins(Cmp, ZeroPageX, 2, 4);
    t[0xCD] = ins(Cmp, Absolute, 3, 4);
    t[0xDD] = ins(Cmp, AbsoluteX, 3, 4);
    t[0xD9] = ins(Cmp, AbsoluteY, 3, 4);
    t[0xC1] = ins(Cmp, IndexedIndirect, 2, 6);
    t[0xD1] = ins(Cmp, IndirectIndexed, 2, 5);

    // Branch instructions
    t[0xF0] = ins(Beq, Relative, 2, 2);
    t[0xD0] = ins(Bne, Relative, 2, 2);
    t[0xB0] = ins(Bcs, Relative, 2, 2);
    t[0x90] = ins(Bcc, Relative, 2, 2);
    t[0x30] = ins(Bmi, Relative, 2, 2);
    t[0x10] = ins(Bpl, Relative, 2, 2);
    t[0x70] = ins(Bvs, Relative, 2, 2);
    t[0x50] = ins(Bvc, Relative, 2, 2);

    // Register transfers
    t[0xAA] = ins(Tax, Implied, 1, 2);
    t[0xA8] = ins(Tay, Implied, 1, 2);
    t[0x8A] = ins(Txa, Implied, 1, 2);
    t[0x98] = ins(Tya, Implied, 1, 2);
    t[0xBA] = ins(Tsx, Implied, 1, 2);
    t[0x9A] = ins(Txs, Implied, 1, 2);

    // NOP - the placeholder ROMs are filled with $EA, keep it quiet
    t[0xEA] = ins(Nop, Implied, 1, 2);

    t
}

/// Opcode decode table, fixed at compile time
pub static OPCODES: [Instruction; 256] = decode_table();

/// CPU interpreter state
#[derive(Debug, Clone)]
pub struct Cpu {
    regs: Registers,
    flags: StatusFlags,
    /// Total cycles executed since the last reset
    cycles: u64,
    /// Per-instruction trace lines when the `trace` log level is enabled
    trace: bool,
}

impl Cpu {
    /// Create a new CPU: registers zeroed, SP at $FD, interrupts disabled.
    /// Call `reset` once the bus is wired up to load the reset vector.
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            flags: StatusFlags::new(StatusFlags::INTERRUPT),
            cycles: 0,
            trace: false,
        }
    }

    /// Reset: load PC from the reset vector, restore the stack pointer,
    /// disable interrupts and zero the cycle counter. Other registers and
    /// flags keep their values.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.regs.pc = self.read_word(bus, RESET_VECTOR);
        self.regs.sp = 0xFD;
        self.flags.set_interrupt(true);
        self.cycles = 0;
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn flags(&self) -> &StatusFlags {
        &self.flags
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_pc(&mut self, address: u16) {
        self.regs.pc = address;
    }

    /// Enable or disable per-instruction trace output
    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace
    }

    /// Pack the status flags into a single byte (bit 5 reads as 1)
    pub fn get_status(&self) -> u8 {
        self.flags.to_byte()
    }

    /// Unpack a status byte into the flags (bit 5 is ignored)
    pub fn set_status(&mut self, status: u8) {
        self.flags = StatusFlags::from_byte(status);
    }

    fn read_word(&self, bus: &mut impl Bus, address: u16) -> u16 {
        let low = bus.read(address) as u16;
        let high = bus.read(address.wrapping_add(1)) as u16;
        low | (high << 8)
    }

    fn push_byte(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(STACK_PAGE | self.regs.sp as u16, value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    fn pull_byte(&mut self, bus: &mut impl Bus) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        bus.read(STACK_PAGE | self.regs.sp as u16)
    }

    /// Push a 16-bit word, high byte first
    fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        self.push_byte(bus, (value >> 8) as u8);
        self.push_byte(bus, value as u8);
    }

    fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.pull_byte(bus) as u16;
        let high = self.pull_byte(bus) as u16;
        (high << 8) | low
    }

    /// Enter an interrupt handler. IRQs are ignored while the I flag is
    /// set; NMIs are always taken.
    pub fn interrupt(&mut self, bus: &mut impl Bus, nmi: bool) {
        if !nmi && self.flags.interrupt() {
            return;
        }

        self.push_word(bus, self.regs.pc);

        // Status goes on the stack with B cleared
        let status = self.get_status() & !StatusFlags::BREAK;
        self.push_byte(bus, status);

        self.flags.set_interrupt(true);

        let vector = if nmi { NMI_VECTOR } else { IRQ_VECTOR };
        self.regs.pc = self.read_word(bus, vector);

        self.cycles += 7;
    }

    /// Compute the effective address for `mode`, with the operand bytes at
    /// PC+1 and PC+2. Modes without an operand address return 0.
    fn operand_address(&self, bus: &mut impl Bus, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,

            // The operand is the next byte; callers read from PC+1
            AddressingMode::Immediate => self.regs.pc.wrapping_add(1),

            AddressingMode::ZeroPage => bus.read(self.regs.pc.wrapping_add(1)) as u16,

            // Indexed zero-page access wraps within page 0
            AddressingMode::ZeroPageX => {
                bus.read(self.regs.pc.wrapping_add(1)).wrapping_add(self.regs.x) as u16
            }
            AddressingMode::ZeroPageY => {
                bus.read(self.regs.pc.wrapping_add(1)).wrapping_add(self.regs.y) as u16
            }

            AddressingMode::Relative => {
                let offset = bus.read(self.regs.pc.wrapping_add(1)) as i8;
                self.regs.pc.wrapping_add(2).wrapping_add(offset as u16)
            }

            AddressingMode::Absolute => self.read_word(bus, self.regs.pc.wrapping_add(1)),

            AddressingMode::AbsoluteX => self
                .read_word(bus, self.regs.pc.wrapping_add(1))
                .wrapping_add(self.regs.x as u16),
            AddressingMode::AbsoluteY => self
                .read_word(bus, self.regs.pc.wrapping_add(1))
                .wrapping_add(self.regs.y as u16),

            AddressingMode::Indirect => {
                let ptr = self.read_word(bus, self.regs.pc.wrapping_add(1));
                // 6502 page-boundary bug: a pointer ending in $FF fetches
                // its high byte from the start of the same page
                let high_addr = if ptr & 0x00FF == 0x00FF {
                    ptr & 0xFF00
                } else {
                    ptr + 1
                };
                bus.read(ptr) as u16 | (bus.read(high_addr) as u16) << 8
            }

            AddressingMode::IndexedIndirect => {
                let zp = bus.read(self.regs.pc.wrapping_add(1)).wrapping_add(self.regs.x);
                let low = bus.read(zp as u16) as u16;
                let high = bus.read(zp.wrapping_add(1) as u16) as u16;
                low | (high << 8)
            }

            AddressingMode::IndirectIndexed => {
                let zp = bus.read(self.regs.pc.wrapping_add(1));
                let low = bus.read(zp as u16) as u16;
                let high = bus.read(zp.wrapping_add(1) as u16) as u16;
                (low | (high << 8)).wrapping_add(self.regs.y as u16)
            }
        }
    }

    fn set_flags_zn(&mut self, value: u8) {
        self.flags.set_zero(value == 0);
        self.flags.set_negative((value & 0x80) != 0);
    }

    fn branch(&mut self, condition: bool, address: u16) -> bool {
        if condition {
            self.regs.pc = address;
        }
        condition
    }

    /// Execute a single instruction.
    pub fn step(&mut self, bus: &mut impl Bus, kernal: &mut impl KernalTrap) {
        let opcode = bus.read(self.regs.pc);
        let instr = OPCODES[opcode as usize];
        let address = self.operand_address(bus, instr.mode);

        self.trace_op(opcode, &instr, address);

        // Control-flow operations set PC themselves and suppress the
        // normal advance by instruction size
        let mut jumped = false;

        match instr.op {
            Op::Lda => {
                self.regs.a = bus.read(address);
                self.set_flags_zn(self.regs.a);
            }
            Op::Ldx => {
                self.regs.x = bus.read(address);
                self.set_flags_zn(self.regs.x);
            }
            Op::Ldy => {
                self.regs.y = bus.read(address);
                self.set_flags_zn(self.regs.y);
            }

            Op::Sta => bus.write(address, self.regs.a),
            Op::Stx => bus.write(address, self.regs.x),
            Op::Sty => bus.write(address, self.regs.y),

            Op::Tax => {
                self.regs.x = self.regs.a;
                self.set_flags_zn(self.regs.x);
            }
            Op::Tay => {
                self.regs.y = self.regs.a;
                self.set_flags_zn(self.regs.y);
            }
            Op::Txa => {
                self.regs.a = self.regs.x;
                self.set_flags_zn(self.regs.a);
            }
            Op::Tya => {
                self.regs.a = self.regs.y;
                self.set_flags_zn(self.regs.a);
            }
            Op::Tsx => {
                self.regs.x = self.regs.sp;
                self.set_flags_zn(self.regs.x);
            }
            Op::Txs => self.regs.sp = self.regs.x,

            Op::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.set_flags_zn(self.regs.x);
            }
            Op::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.set_flags_zn(self.regs.y);
            }
            Op::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.set_flags_zn(self.regs.x);
            }
            Op::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.set_flags_zn(self.regs.y);
            }

            Op::Cmp => {
                let value = bus.read(address);
                let result = self.regs.a.wrapping_sub(value);
                self.flags.set_carry(self.regs.a >= value);
                self.set_flags_zn(result);
            }

            Op::Beq => jumped = self.branch(self.flags.zero(), address),
            Op::Bne => jumped = self.branch(!self.flags.zero(), address),
            Op::Bcs => jumped = self.branch(self.flags.carry(), address),
            Op::Bcc => jumped = self.branch(!self.flags.carry(), address),
            Op::Bmi => jumped = self.branch(self.flags.negative(), address),
            Op::Bpl => jumped = self.branch(!self.flags.negative(), address),
            Op::Bvs => jumped = self.branch(self.flags.overflow(), address),
            Op::Bvc => jumped = self.branch(!self.flags.overflow(), address),

            Op::Jmp => {
                self.regs.pc = address;
                jumped = true;
            }

            Op::Jsr => {
                if address >= KERNAL_TRAP_BASE {
                    // KERNAL call: push the return address, run the trap,
                    // then resume the caller as if the routine did RTS
                    self.push_word(bus, self.regs.pc.wrapping_add(2));
                    self.kernal_call(bus, kernal, address);
                } else {
                    // Push the address of the last byte of the JSR itself
                    self.push_word(bus, self.regs.pc.wrapping_add(2).wrapping_sub(1));
                    self.regs.pc = address;
                }
                jumped = true;
            }

            Op::Rts => {
                self.regs.pc = self.pull_word(bus).wrapping_add(1);
                jumped = true;
            }

            Op::Nop => {}

            Op::Illegal => {
                warn!(
                    "unimplemented opcode ${:02X} at ${:04X}",
                    opcode, self.regs.pc
                );
            }
        }

        if !jumped {
            self.regs.pc = self.regs.pc.wrapping_add(instr.size as u16);
        }
        self.cycles += instr.cycles as u64;
    }

    /// Dispatch an intercepted JSR into the KERNAL jump table. Unknown
    /// entry points leave A untouched. Always ends with an RTS-equivalent
    /// pull so the caller resumes after the JSR.
    fn kernal_call(&mut self, bus: &mut impl Bus, kernal: &mut impl KernalTrap, address: u16) {
        match address {
            KERNAL_CHROUT => kernal.chrout(self.regs.a),
            KERNAL_CHRIN => self.regs.a = kernal.chrin(),
            KERNAL_GETIN => self.regs.a = kernal.getin(),
            _ => warn!("unimplemented KERNAL routine at ${:04X}", address),
        }

        self.regs.pc = self.pull_word(bus).wrapping_add(1);
    }

    /// Keep stepping until at least `n` more cycles have elapsed. Overshoot
    /// is bounded by the cost of the final instruction.
    pub fn run_cycles(&mut self, bus: &mut impl Bus, kernal: &mut impl KernalTrap, n: u64) {
        let target = self.cycles + n;
        while self.cycles < target {
            self.step(bus, kernal);
        }
    }

    /// Single-line state rendering: registers plus the `NVBDIZC` string
    pub fn state_line(&self) -> String {
        format!(
            "A:${:02X} X:${:02X} Y:${:02X} SP:${:02X} PC:${:04X}  {}",
            self.regs.a, self.regs.x, self.regs.y, self.regs.sp, self.regs.pc, self.flags
        )
    }

    /// Print the current CPU state for debugging
    pub fn print_state(&self) {
        println!("{}", self.state_line());
    }

    fn trace_op(&self, opcode: u8, instr: &Instruction, address: u16) {
        if !self.trace || !log_enabled!(Level::Trace) {
            return;
        }
        trace!(
            "${:04X}  {:02X}  {} {:<15} a:{:02X} x:{:02X} y:{:02X} sp:{:02X} {}",
            self.regs.pc,
            opcode,
            instr.op.mnemonic(),
            format!("{:?} ${:04X}", instr.mode, address),
            self.regs.a,
            self.regs.x,
            self.regs.y,
            self.regs.sp,
            self.flags,
        );
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

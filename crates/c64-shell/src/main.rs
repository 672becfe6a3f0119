//! C64 Shell - command line front-end for the emulator core
//!
//! Presents the machine through a monitor-style shell: load programs,
//! poke memory, single-step the CPU, or drop into a minimal BASIC echo
//! mode. KERNAL character I/O is wired to the terminal.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use c64_core::cpu::KernalTrap;
use c64_core::system::{Machine, DEFAULT_LOAD_ADDRESS};

/// Commodore 64 emulator shell
#[derive(Parser, Debug)]
#[command(name = "c64-shell")]
#[command(about = "A Commodore 64 emulator with an interactive shell", long_about = None)]
struct Args {
    /// Path to the 8 KiB BASIC ROM image
    #[arg(long, default_value = "roms/basic.rom")]
    basic_rom: PathBuf,

    /// Path to the 8 KiB KERNAL ROM image
    #[arg(long, default_value = "roms/kernal.rom")]
    kernal_rom: PathBuf,

    /// Path to the 4 KiB character generator ROM image
    #[arg(long, default_value = "roms/chargen.rom")]
    char_rom: PathBuf,

    /// Program file to load at startup (raw machine code, no header)
    #[arg(short, long)]
    program: Option<PathBuf>,

    /// Load address for the startup program, in hex
    #[arg(long, default_value = "0800", value_parser = parse_hex_addr)]
    load_address: u16,

    /// Cycle budget for the `run` and `sys` commands
    #[arg(long, default_value_t = 1_000_000)]
    cycles: u64,
}

fn parse_hex_addr(value: &str) -> Result<u16, String> {
    u16::from_str_radix(value.trim_start_matches('$'), 16)
        .map_err(|e| format!("invalid hex address: {e}"))
}

/// KERNAL character I/O backed by the terminal.
#[derive(Default)]
struct ConsoleKernal;

impl KernalTrap for ConsoleKernal {
    fn chrout(&mut self, ch: u8) {
        print!("{}", ch as char);
        let _ = io::stdout().flush();
    }

    fn chrin(&mut self) -> u8 {
        // Blocking read of a single byte; carriage return on EOF
        let mut byte = [0u8; 1];
        match io::stdin().read(&mut byte) {
            Ok(1) => byte[0],
            _ => 0x0D,
        }
    }

    fn getin(&mut self) -> u8 {
        // No non-blocking keyboard source on a line-oriented terminal
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Help,
    Run,
    Load,
    List,
    Dump,
    Reset,
    Step,
    Trace,
    Basic,
    Poke,
    Peek,
    Sys,
    Quit,
    Unknown,
}

fn parse_command(word: &str) -> Command {
    match word {
        "help" => Command::Help,
        "run" => Command::Run,
        "load" => Command::Load,
        "list" => Command::List,
        "dump" => Command::Dump,
        "reset" => Command::Reset,
        "step" => Command::Step,
        "trace" => Command::Trace,
        "basic" => Command::Basic,
        "poke" => Command::Poke,
        "peek" => Command::Peek,
        "sys" => Command::Sys,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown,
    }
}

struct Shell {
    machine: Machine<ConsoleKernal>,
    cycles: u64,
    basic_mode: bool,
    running: bool,
}

impl Shell {
    fn new(machine: Machine<ConsoleKernal>, cycles: u64) -> Self {
        println!("Commodore 64 Emulator Shell");
        println!("Type 'help' for a list of commands");
        Self {
            machine,
            cycles,
            basic_mode: false,
            running: true,
        }
    }

    fn run(&mut self) {
        // Stdin is locked per line; the CHRIN trap also reads stdin while
        // a program is running, so no lock may be held across commands
        while self.running {
            self.prompt();
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => self.running = false, // EOF
                Ok(_) => self.handle_line(line.trim()),
            }
        }
    }

    fn prompt(&self) {
        if self.basic_mode {
            println!("READY.");
        }
        print!("> ");
        let _ = io::stdout().flush();
    }

    fn handle_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }

        if self.basic_mode {
            self.process_basic_line(line);
            return;
        }

        let (word, args) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        self.execute(parse_command(word), word, args);
    }

    fn execute(&mut self, command: Command, word: &str, args: &str) {
        match command {
            Command::Help => print_help(),

            Command::Run => {
                println!("Running program...");
                self.machine.run_cycles(self.cycles);
            }

            Command::Load => self.cmd_load(args),

            Command::List => {
                println!("Listing program...");
                println!("Not implemented yet");
            }

            Command::Dump => {
                let mut parts = args.split_whitespace();
                let start = parse_hex(parts.next()).unwrap_or(0);
                let length = parse_hex(parts.next()).unwrap_or(256);
                println!(
                    "Memory dump from ${:04X} to ${:04X}:",
                    start,
                    start.saturating_add(length.saturating_sub(1))
                );
                print!("{}", self.machine.dump(start, length));
            }

            Command::Reset => {
                println!("Resetting system...");
                self.machine.reset();
            }

            Command::Step => {
                let count: u32 = args.parse().unwrap_or(1);
                println!("Stepping {count} instruction(s)...");
                for _ in 0..count {
                    self.machine.step();
                }
                self.machine.cpu().print_state();
            }

            Command::Trace => {
                let enabled = args.parse::<u8>().unwrap_or(1) != 0;
                self.machine.cpu_mut().set_trace(enabled);
                println!(
                    "Trace mode {} (instruction traces go to the log at trace level)",
                    if enabled { "enabled" } else { "disabled" }
                );
            }

            Command::Quit => {
                println!("Exiting emulator...");
                self.running = false;
            }

            Command::Basic => {
                println!("Entering BASIC mode");
                self.enter_basic_mode();
            }

            Command::Poke => match parse_poke_args(args) {
                Some((address, value)) => {
                    self.machine.poke(address, value);
                    println!("Poked {value} into address {address}");
                }
                None => println!("Usage: poke <address>,<value>"),
            },

            Command::Peek => match args.split_whitespace().next().and_then(|s| s.parse().ok()) {
                Some(address) => {
                    let value = self.machine.peek(address);
                    println!("Peek({address}) = {value} (${value:02X})");
                }
                None => println!("Usage: peek <address>"),
            },

            Command::Sys => match parse_hex(args.split_whitespace().next()) {
                Some(address) => {
                    println!("Calling system routine at ${address:04X}...");
                    self.machine.cpu_mut().set_pc(address);
                    self.machine.run_cycles(self.cycles);
                    self.machine.cpu().print_state();
                }
                None => println!("Usage: sys <address>"),
            },

            Command::Unknown => {
                println!("Unknown command: {word}");
                println!("Type 'help' for a list of commands");
            }
        }
    }

    fn cmd_load(&mut self, args: &str) {
        let mut parts = args.split_whitespace();
        let Some(filename) = parts.next() else {
            println!("Usage: load <filename> [address]");
            println!("If address is not specified, the default is $0800");
            return;
        };
        let address = parse_hex(parts.next()).unwrap_or(DEFAULT_LOAD_ADDRESS);

        println!("Loading program from '{filename}' to address ${address:04X}...");
        match fs::read(filename) {
            Ok(data) => {
                self.machine.load_program(address, &data);
                println!(
                    "Loaded {} bytes from '{}' into memory at ${:04X}",
                    data.len(),
                    filename,
                    address
                );
            }
            Err(err) => {
                println!("Error: Could not open file {filename}: {err}");
                println!("Failed to load program");
            }
        }
    }

    fn enter_basic_mode(&mut self) {
        self.basic_mode = true;
        self.machine.clear_screen();
        self.machine
            .print_text(0, 0, "    **** COMMODORE 64 BASIC V2 ****");
        self.machine
            .print_text(0, 2, " 64K RAM SYSTEM  38911 BASIC BYTES FREE");
        self.draw_screen();
    }

    fn process_basic_line(&mut self, line: &str) {
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            self.basic_mode = false;
            return;
        }

        println!("BASIC: {line}");

        let upper = line.to_ascii_uppercase();
        if upper.starts_with("PRINT") {
            println!("{}", line[5..].trim_start());
        } else if upper.starts_with("CLS") {
            self.machine.clear_screen();
            self.draw_screen();
        } else {
            println!("?SYNTAX ERROR");
        }
    }

    fn draw_screen(&self) {
        // Clear the terminal and redraw the 40x25 text screen
        print!("\x1B[2J\x1B[H");
        print!("{}", self.machine.render_screen());
        let _ = io::stdout().flush();
    }
}

fn parse_hex(arg: Option<&str>) -> Option<u16> {
    arg.and_then(|s| u16::from_str_radix(s.trim_start_matches('$'), 16).ok())
}

fn parse_poke_args(args: &str) -> Option<(u16, u8)> {
    let (address, value) = args.split_once(',')?;
    Some((address.trim().parse().ok()?, value.trim().parse().ok()?))
}

fn print_help() {
    println!("Available commands:");
    println!("  help        - Show this help message");
    println!("  run         - Run the current program");
    println!("  load <file> - Load a program from a file");
    println!("  list        - List the current BASIC program");
    println!("  dump [addr] [len] - Dump memory contents");
    println!("  reset       - Reset the system");
    println!("  step [n]    - Execute n instructions (default: 1)");
    println!("  trace [0|1] - Enable/disable instruction tracing");
    println!("  basic       - Enter BASIC mode");
    println!("  poke a,v    - Write a value to memory address");
    println!("  peek a      - Read a value from memory address");
    println!("  sys addr    - Call a machine language routine");
    println!("  quit        - Exit the emulator");
}

fn show_system_info() {
    println!("================================================");
    println!("  Commodore 64 Emulator");
    println!("================================================");
    println!("  Memory:      64K RAM + 20K ROM");
    println!("  Processor:   MOS Technology 6510");
    println!("  Clock speed: ~1 MHz");
    println!("================================================");
    println!("Type 'help' to see available commands");
    println!();
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    println!("Commodore 64 Emulator starting...");

    let mut machine = Machine::new(ConsoleKernal::default());

    if !machine.load_roms(&args.basic_rom, &args.kernal_rom, &args.char_rom) {
        println!("Some ROM files could not be loaded, using built-in placeholders");
    }

    // Boot into a small stub that jumps to the BASIC ROM entry point
    machine.install_boot_program();

    if let Some(path) = &args.program {
        match fs::read(path) {
            Ok(data) => machine.load_program(args.load_address, &data),
            Err(err) => {
                eprintln!("Failed to read program file {}: {}", path.display(), err);
                std::process::exit(1);
            }
        }
    }

    machine.reset();
    println!("Commodore 64 Emulator initialized successfully.");

    show_system_info();

    let mut shell = Shell::new(machine, args.cycles);
    shell.run();

    println!("Emulator shutdown complete.");
}

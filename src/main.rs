//! MiniMIPS Emulator - CLI Entry Point
//!
//! Commands:
//! - `minimips run <source>` - Load and run an assembly file
//! - `minimips encode <source>` - Show the binary field layout of each instruction

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "minimips")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for a reduced MIPS teaching architecture")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts or faults
    Run {
        /// Path to the assembly source file
        source: String,
        /// Maximum number of instructions to execute (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_steps: u64,
        /// Show the full execution trace
        #[arg(short, long)]
        trace: bool,
        /// Dump the final machine state as JSON instead of a report
        #[arg(long)]
        json: bool,
    },
    /// Show the binary encoding of every instruction in a source file
    Encode {
        /// Path to the assembly source file
        source: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            source,
            max_steps,
            trace,
            json,
        }) => {
            run_program(&source, max_steps, trace, json);
        }
        Some(Commands::Encode { source }) => {
            encode_file(&source);
        }
        None => {
            println!("MiniMIPS Emulator v0.1.0");
            println!("A reduced MIPS teaching architecture emulator");
            println!();
            println!("Use --help for available commands");
            println!();
            demo_program();
        }
    }
}

fn run_program(path: &str, max_steps: u64, trace: bool, json: bool) {
    use minimips::{LogLevel, Machine, MachineState};

    println!("🔧 Running: {}", path);

    let mut machine = Machine::new();
    if let Err(e) = machine.load_path(path) {
        eprintln!("❌ Load error: {}", e);
        std::process::exit(1);
    }

    println!(
        "📝 Loaded {} instructions, {} labels",
        machine.program().len(),
        machine.symbols().len()
    );

    let result = machine.run_limited(max_steps);

    if json {
        match serde_json::to_string_pretty(&machine) {
            Ok(dump) => println!("{}", dump),
            Err(e) => {
                eprintln!("❌ Failed to serialize machine state: {}", e);
                std::process::exit(1);
            }
        }
        if matches!(result.state, MachineState::Faulted(_)) {
            std::process::exit(1);
        }
        return;
    }

    println!();
    println!("━━━ Execution ━━━");
    for entry in machine.log().iter() {
        match entry.level {
            LogLevel::Error => eprintln!("❌ {}", entry.message),
            LogLevel::Info => {
                // Without --trace, only program output is shown.
                if trace || entry.message.starts_with("output: ") {
                    println!("{}", entry.message);
                }
            }
        }
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Steps: {}", result.steps);
    println!("State: {:?}", result.state);
    for (reg, value) in machine.registers().snapshot() {
        println!("  {:>5} = {}", reg.name(), value);
    }
    for (addr, value) in machine.memory().cells().iter().enumerate() {
        if *value != 0 {
            println!("  mem[{}] = {}", addr, value);
        }
    }

    if result.steps >= max_steps && machine.is_running() {
        println!();
        println!(
            "⚠️  Reached step limit ({}). Use --max-steps to increase.",
            max_steps
        );
    }

    if matches!(result.state, MachineState::Faulted(_)) {
        std::process::exit(1);
    }
}

fn encode_file(path: &str) {
    use minimips::asm;

    println!("📖 Encoding: {}", path);

    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let assembly = match asm::parse(&source) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("❌ Load error: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    for ins in assembly.program.iter() {
        println!("{:<24} {}", ins.to_string(), asm::encode(ins));
    }
}

fn demo_program() {
    use minimips::Machine;

    println!("━━━ Demo ━━━");

    let source = r#"
.data
msg: .asciiz "hello from minimips"
.text
la   $a0, msg
addi $v0, $zero, 4
syscall
addi $t0, $zero, 40
addi $t1, $zero, 2
add  $a0, $t0, $t1
addi $v0, $zero, 1
syscall
addi $v0, $zero, 10
syscall
"#;

    let mut machine = Machine::new();
    if let Err(e) = machine.load_source(source) {
        eprintln!("❌ Demo failed to load: {}", e);
        std::process::exit(1);
    }

    let result = machine.run();
    for entry in machine.log().iter() {
        if let Some(output) = entry.message.strip_prefix("output: ") {
            println!("  {}", output);
        }
    }
    println!();
    println!("✓ Executed {} instructions", result.steps);
}

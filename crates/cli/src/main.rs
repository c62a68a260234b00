//! TPU co-simulation driver CLI.
//!
//! This binary provides a single entry point for the co-simulation workflows. It performs:
//! 1. **Inspect:** Decode a program and pack the host and weight arrays without simulating.
//! 2. **Run:** Build a Python engine from `module:function`, drive it to halt, print host memory.
//! 3. **Script run:** Execute a Python script with the `tpusim` module injected.

use std::ffi::CString;
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use pyo3::prelude::*;
use pyo3::types::PyList;
use tracing_subscriber::EnvFilter;

use tpusim_bindings::engine::PyEngine;
use tpusim_core::config::Config;
use tpusim_core::sim::driver::CoSimDriver;
use tpusim_core::sim::loader::{self, Program};
use tpusim_core::trace::vcd::{SignalWidths, export_vcd};
use tpusim_core::trace::{NullTrace, SignalHistory, TraceSink};

#[derive(Parser, Debug)]
#[command(
    name = "tpusim",
    author,
    version,
    about = "TPU external-memory co-simulation driver",
    long_about = "Drive a clock-stepped accelerator core against emulated instruction, host and weight memories.\n\nThe core itself runs in Python (e.g. PyRTL); pass a factory returning an object with load_memory, step and inspect.\n\nExamples:\n  tpusim inspect prog.bin --hostmem hostmem.npy --weights weights.npy\n  tpusim run --engine tpu_core:make_engine prog.bin hostmem.npy weights.npy\n  tpusim scripts/run_matmul.py"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a program and print it, with optional packed memory images.
    Inspect {
        /// Program binary (big-endian instruction words).
        program: PathBuf,

        /// Host memory array (2-D .npy).
        #[arg(long)]
        hostmem: Option<PathBuf>,

        /// Weight array (3-D .npy).
        #[arg(long)]
        weights: Option<PathBuf>,

        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a co-simulation to halt and print the final host memory.
    Run {
        /// Python engine factory as `module:function`.
        #[arg(short, long)]
        engine: String,

        /// Program binary (big-endian instruction words).
        program: PathBuf,

        /// Host memory array (2-D .npy).
        hostmem: PathBuf,

        /// Weight array (3-D .npy).
        weights: PathBuf,

        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Waveform output path (overrides `trace.vcd_path`).
        #[arg(long)]
        vcd: Option<PathBuf>,

        /// Print driver statistics after the run.
        #[arg(long)]
        stats: bool,
    },

    /// Run a Python script with `tpusim` injected. Script gets argv as sys.argv.
    Script {
        /// Script path.
        path: String,

        /// Arguments for the script (sys.argv[1:]).
        #[arg(allow_hyphen_values = true, trailing_var_arg = true)]
        args: Vec<String>,
    },
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Inspect {
            program,
            hostmem,
            weights,
            config,
        }) => cmd_inspect(&program, hostmem.as_deref(), weights.as_deref(), config.as_deref()),
        Some(Commands::Run {
            engine,
            program,
            hostmem,
            weights,
            config,
            vcd,
            stats,
        }) => cmd_run(&RunArgs {
            engine,
            program,
            hostmem,
            weights,
            config,
            vcd,
            stats,
        }),
        Some(Commands::Script { path, args }) => run_python_script(&path, args),
        None => {
            let args: Vec<String> = std::env::args().skip(1).collect();
            if let Some(script) = args.first().filter(|s| s.ends_with(".py")) {
                let script_args: Vec<String> = args.iter().skip(1).cloned().collect();
                run_python_script(script, script_args);
                return;
            }
            eprintln!("TPU co-simulation driver: pass a subcommand or a .py script");
            eprintln!();
            eprintln!("  tpusim inspect <prog.bin> [--hostmem h.npy] [--weights w.npy]");
            eprintln!("  tpusim run -e <module:function> <prog.bin> <h.npy> <w.npy>");
            eprintln!("  tpusim <script.py> [args...]   Run script");
            eprintln!();
            eprintln!("  tpusim --help  for full options");
            process::exit(1);
        }
    }
}

/// Prints `msg` to stderr and exits with status 1.
fn fail(msg: impl Display) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

/// Loads the JSON config at `path`, or the defaults.
fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("reading config {}: {e}", path.display())));
    Config::from_json(&json).unwrap_or_else(|e| fail(e))
}

/// Decodes the program and prints it with any packed memory images.
fn cmd_inspect(
    program: &Path,
    hostmem: Option<&Path>,
    weights: Option<&Path>,
    config: Option<&Path>,
) {
    let config = load_config(config);
    let bits = config.memory.element_bits;
    let width = config.program.instruction_width;

    let program = Program::from_file(program, width).unwrap_or_else(|e| fail(e));
    println!("Program: {} instructions of {width} bits", program.len());
    let digits = (width / 4) as usize;
    for (addr, word) in program.words().iter().enumerate() {
        println!("  {addr:4}: {word:0digits$x}");
    }

    if let Some(path) = hostmem {
        let image = loader::load_host_memory(path, bits).unwrap_or_else(|e| fail(e));
        println!();
        println!("Host memory ({} vectors):", image.len());
        print!("{}", image.render_vectors(bits));
    }
    if let Some(path) = weights {
        let image = loader::load_weight_memory(path, bits).unwrap_or_else(|e| fail(e));
        println!();
        println!("Weight memory ({} tiles):", image.len());
        print!("{}", image.render_tiles(bits, config.memory.matrix_size));
    }
}

/// Arguments of the `run` subcommand.
#[derive(Debug)]
struct RunArgs {
    engine: String,
    program: PathBuf,
    hostmem: PathBuf,
    weights: PathBuf,
    config: Option<PathBuf>,
    vcd: Option<PathBuf>,
    stats: bool,
}

/// Builds the engine from `module:function` by calling the factory with no arguments.
fn build_engine(spec: &str) -> PyEngine {
    let Some((module, function)) = spec.split_once(':') else {
        fail(format!("engine must be given as module:function, got '{spec}'"));
    };
    Python::with_gil(|py| {
        add_script_paths(py)?;
        let factory = py.import(module)?.getattr(function)?;
        Ok::<_, PyErr>(PyEngine::new(factory.call0()?.unbind()))
    })
    .unwrap_or_else(|e| fail(format!("building engine {spec}: {e}")))
}

/// Runs the co-simulation to halt, prints host memory, and writes the waveform.
fn cmd_run(args: &RunArgs) {
    let mut config = load_config(args.config.as_deref());
    if let Some(vcd) = &args.vcd {
        config.trace.vcd_path = vcd.display().to_string();
    }
    let bits = config.memory.element_bits;

    let program = Program::from_file(&args.program, config.program.instruction_width)
        .unwrap_or_else(|e| fail(e));
    let hostmem = loader::load_host_memory(&args.hostmem, bits).unwrap_or_else(|e| fail(e));
    let weights = loader::load_weight_memory(&args.weights, bits).unwrap_or_else(|e| fail(e));

    let engine = build_engine(&args.engine);
    let mut driver =
        CoSimDriver::new(engine, &program, hostmem, weights, &config).unwrap_or_else(|e| fail(e));

    let mut history = SignalHistory::new();
    let mut discard = NullTrace;
    let sink: &mut dyn TraceSink = if config.trace.enabled {
        &mut history
    } else {
        &mut discard
    };

    println!("[*] Co-simulating {} ({} instructions)", args.program.display(), program.len());
    match driver.run(sink) {
        Ok(cycles) => println!("[*] Halted after {cycles} cycles"),
        Err(e) => {
            eprintln!("\n[!] FATAL: {e}");
            driver.stats().print();
            process::exit(1);
        }
    }

    println!();
    print!("{}", driver.hostmem().render_vectors(bits));
    let _ = std::io::stdout().flush();

    if config.trace.enabled {
        let widths = SignalWidths::from_config(&config.memory);
        let path = PathBuf::from(&config.trace.vcd_path);
        export_vcd(history.records(), &widths, &config.trace.top_module, &path)
            .unwrap_or_else(|e| fail(e));
        println!("[*] Waveform written to {}", path.display());
    }
    if args.stats {
        driver.stats().print();
    }
}

/// Makes modules next to the working directory importable.
fn add_script_paths(py: Python<'_>) -> PyResult<()> {
    let path = py.import("sys")?.getattr("path")?;
    let _ = path.call_method1("append", (".",))?;
    let _ = path.call_method1("append", ("python",))?;
    Ok(())
}

/// Runs a Python script with `tpusim` injected into `sys.modules` and `sys.argv` set.
///
/// The script is executed as `__main__`. Exits the process with code 1 on script error or
/// missing file.
///
/// # Arguments
///
/// * `script_path` - Path to the `.py` file.
/// * `script_args` - Arguments passed as `sys.argv[1:]`.
fn run_python_script(script_path: &str, script_args: Vec<String>) {
    let script_content = fs::read_to_string(script_path)
        .unwrap_or_else(|e| fail(format!("reading script {script_path}: {e}")));

    let result = Python::with_gil(|py| -> PyResult<()> {
        add_script_paths(py)?;
        let sys = py.import("sys")?;

        let m = PyModule::new(py, "tpusim")?;
        tpusim_bindings::register_cosim_module(&m)?;
        sys.getattr("modules")?.set_item("tpusim", m)?;

        let mut full_args = vec![script_path.to_string()];
        full_args.extend(script_args);
        sys.setattr("argv", PyList::new(py, &full_args)?)?;

        let to_c = |s: &str| {
            CString::new(s).map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
        };
        let code = to_c(&script_content)?;
        let file = to_c(script_path)?;
        let name = to_c("__main__")?;

        if let Err(e) = PyModule::from_code(py, &code, &file, &name) {
            e.print(py);
            process::exit(1);
        }
        Ok(())
    });
    if let Err(e) = result {
        fail(e);
    }
}

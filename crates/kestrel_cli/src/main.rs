//! kestrel — the Kestrel FPGA place-and-route tool.
//!
//! Reads a synthesized netlist, packs it into device primitives, places
//! every cell on a bel, routes every net through the interconnect, and
//! writes the physical netlist and/or JSON bitstream.
//!
//! Exit codes: 0 success, 1 user/input error, 2 internal error or database
//! corruption, 3 routing congestion unresolved, 4 no legal placement.

#![warn(missing_docs)]

use clap::Parser;
use kestrel_arch::{load_architecture, ScampArch};
use kestrel_chipdb::ChipDb;
use kestrel_console::EchoRuntime;
use kestrel_context::{CancelToken, Context};
use kestrel_diagnostics::{Category, Diagnostic, DiagnosticSink};
use kestrel_frontend::{GenericFrontend, JsonReader};
use kestrel_io::{HookPhase, HookScripts};
use std::path::PathBuf;
use std::process;

/// Kestrel — FPGA place and route.
#[derive(Parser, Debug)]
#[command(name = "kestrel", version, about = "Kestrel FPGA place-and-route")]
pub struct Cli {
    /// Input netlist in the synthesis JSON format.
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Write the placed-and-routed physical netlist here.
    #[arg(long, value_name = "FILE")]
    pub write: Option<PathBuf>,

    /// Seed for the placer's random generator.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Override the top module.
    #[arg(long, value_name = "NAME")]
    pub top: Option<String>,

    /// Script run before packing.
    #[arg(long, value_name = "FILE")]
    pub pre_pack: Option<PathBuf>,

    /// Script run after packing, before placement.
    #[arg(long, value_name = "FILE")]
    pub pre_place: Option<PathBuf>,

    /// Script run after routing and the post-route pass.
    #[arg(long, value_name = "FILE")]
    pub post_route: Option<PathBuf>,

    /// Write the JSON bitstream here.
    #[arg(long, value_name = "FILE")]
    pub bit: Option<PathBuf>,

    /// Device family.
    #[arg(long, default_value = "scamp")]
    pub family: String,

    /// Device name (e.g. scamp8x8).
    #[arg(long, default_value = "scamp8x8")]
    pub device: String,

    /// Package name (informational for the scamp family).
    #[arg(long)]
    pub package: Option<String>,

    /// Speed grade (informational for the scamp family).
    #[arg(long)]
    pub speed: Option<String>,

    /// Per-device I/O constraints CSV.
    #[arg(long, value_name = "FILE")]
    pub constr: Option<PathBuf>,

    /// Load the chip database from a file instead of generating it.
    #[arg(long, value_name = "FILE")]
    pub chipdb: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let sink = DiagnosticSink::new();
    let code = match run(&cli, &sink) {
        Ok(()) => 0,
        Err(code) => code,
    };
    sink.render_to_stderr();
    process::exit(code);
}

/// Emits an input-category error and returns exit code 1.
fn input_error(sink: &DiagnosticSink, message: String) -> i32 {
    sink.emit(Diagnostic::error(Category::Input, message));
    1
}

fn run(cli: &Cli, sink: &DiagnosticSink) -> Result<(), i32> {
    // Architecture and device database.
    let arch = load_architecture(&cli.family, &cli.device)
        .map_err(|e| input_error(sink, e.message))?;
    let chip = load_chipdb(cli, sink)?;
    let mut ctx = Context::new(chip);
    let cancel = CancelToken::new();

    // Front-end.
    let Some(json_path) = &cli.json else {
        return Err(input_error(sink, "no input netlist (use --json)".to_string()));
    };
    let text = std::fs::read_to_string(json_path)
        .map_err(|e| input_error(sink, format!("cannot read {}: {e}", json_path.display())))?;
    let reader = JsonReader::from_str(&text).map_err(|e| input_error(sink, e.to_string()))?;
    GenericFrontend::import(&mut ctx, &reader, cli.top.as_deref())
        .map_err(|e| input_error(sink, e.to_string()))?;

    // Constraints.
    if let Some(constr) = &cli.constr {
        let text = std::fs::read_to_string(constr)
            .map_err(|e| input_error(sink, format!("cannot read {}: {e}", constr.display())))?;
        let constraints = kestrel_io::parse_constraints(&text).map_err(|e| {
            let diag = match &e {
                kestrel_io::CsvError::Invalid { line, message } => {
                    Diagnostic::error(Category::Input, message.clone()).with_line(*line as u32)
                }
                other => Diagnostic::error(Category::Input, other.to_string()),
            };
            sink.emit(diag);
            1
        })?;
        kestrel_io::apply_constraints(&mut ctx, &constraints, sink);
    }

    let hooks = HookScripts {
        pre_pack: cli.pre_pack.clone(),
        pre_place: cli.pre_place.clone(),
        post_route: cli.post_route.clone(),
    };

    // Pack.
    run_hook(&hooks, HookPhase::PrePack, sink)?;
    kestrel_pack::pack(&mut ctx, arch.as_ref(), sink).map_err(|e| match e {
        kestrel_pack::PackError::Unplaceable { .. } => 4,
        other => {
            sink.emit(Diagnostic::error(Category::Internal, other.to_string()));
            2
        }
    })?;

    // Place.
    run_hook(&hooks, HookPhase::PrePlace, sink)?;
    kestrel_place::place(&mut ctx, arch.as_ref(), cli.seed, &cancel, sink).map_err(
        |e| match e {
            kestrel_place::PlaceError::NoLegalBel { .. } => 4,
            other => {
                sink.emit(Diagnostic::error(Category::Internal, other.to_string()));
                2
            }
        },
    )?;

    // Route and post-route.
    kestrel_route::route(&mut ctx, arch.as_ref(), &cancel, sink).map_err(|e| match e {
        kestrel_route::RouteError::Congestion { .. }
        | kestrel_route::RouteError::Unroutable { .. } => 3,
        other => {
            sink.emit(Diagnostic::error(Category::Internal, other.to_string()));
            2
        }
    })?;
    kestrel_route::postroute::postroute(&mut ctx, arch.as_ref(), sink).map_err(|e| {
        sink.emit(Diagnostic::error(Category::Internal, e.to_string()));
        2
    })?;
    run_hook(&hooks, HookPhase::PostRoute, sink)?;

    // Outputs.
    if let Some(path) = &cli.write {
        let phys = kestrel_io::write_physical_netlist(&ctx);
        phys.save(path).map_err(|e| {
            sink.emit(Diagnostic::error(Category::Internal, e.to_string()));
            2
        })?;
    }
    if let Some(path) = &cli.bit {
        let doc = kestrel_io::write_json_bitstream(&ctx);
        let text = serde_json::to_string_pretty(&doc).map_err(|e| {
            sink.emit(Diagnostic::error(Category::Internal, e.to_string()));
            2
        })?;
        std::fs::write(path, text).map_err(|e| {
            sink.emit(Diagnostic::error(Category::Internal, e.to_string()));
            2
        })?;
    }

    Ok(())
}

fn load_chipdb(cli: &Cli, sink: &DiagnosticSink) -> Result<ChipDb, i32> {
    if let Some(path) = &cli.chipdb {
        return ChipDb::load(path).map_err(|e| {
            sink.emit(Diagnostic::error(Category::Database, e.to_string()));
            2
        });
    }
    match ScampArch::from_device_name(&cli.device) {
        Some(scamp) => Ok(scamp.build_chipdb()),
        None => Err(input_error(
            sink,
            format!("cannot generate a database for device {:?}", cli.device),
        )),
    }
}

fn run_hook(hooks: &HookScripts, phase: HookPhase, sink: &DiagnosticSink) -> Result<(), i32> {
    let Some(path) = hooks.script_for(phase) else {
        return Ok(());
    };
    let results = kestrel_io::run_hook(path, EchoRuntime::default())
        .map_err(|e| input_error(sink, format!("cannot run hook {}: {e}", path.display())))?;
    let failed = results.iter().filter(|r| r.is_error).count();
    if failed > 0 {
        return Err(input_error(
            sink,
            format!("hook {} failed ({} errors)", path.display(), failed),
        ));
    }
    sink.emit(Diagnostic::note(
        Category::Input,
        format!("ran hook {} ({} statements)", path.display(), results.len()),
    ));
    Ok(())
}

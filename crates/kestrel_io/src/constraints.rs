//! Per-device I/O constraints CSV.
//!
//! The file has three sections separated by single-field lines beginning
//! with `!`: pad records (15 comma-separated fields), bank records (3
//! fields), and global-clock records (2 fields). Every validation failure
//! is fatal with a line-numbered diagnostic.

use kestrel_common::constids;
use kestrel_context::Context;
use kestrel_diagnostics::{Category, Diagnostic, DiagnosticSink};
use kestrel_netlist::Property;

/// Errors from parsing a constraints file.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    /// The CSV structure itself is broken.
    #[error("constraints file unreadable: {0}")]
    Read(#[from] csv::Error),

    /// A record failed validation.
    #[error("line {line}: {message}")]
    Invalid {
        /// 1-based line number.
        line: u64,
        /// What was wrong.
        message: String,
    },
}

/// One pad record.
#[derive(Debug, Clone, PartialEq)]
pub struct PadConstraint {
    /// The I/O cell name this row constrains.
    pub iobname: String,
    /// Package location (e.g. `IOB0_D01`).
    pub location: String,
    /// I/O standard.
    pub standard: String,
    /// Drive strength token.
    pub drive: String,
    /// Slew rate token.
    pub slew_rate: String,
    /// Input delay-line setting.
    pub input_delay_line: Option<u32>,
    /// Output delay-line setting.
    pub output_delay_line: Option<u32>,
    /// Differential pair flag.
    pub differential: bool,
    /// Weak termination token.
    pub weak_termination: String,
    /// Termination value.
    pub termination: Option<u32>,
    /// Termination reference token.
    pub termination_reference: String,
    /// Turbo flag.
    pub turbo: bool,
    /// Input signal slope.
    pub input_signal_slope: Option<u32>,
    /// Output capacity.
    pub output_capacity: Option<u32>,
    /// Registered pad flag.
    pub registered: bool,
}

/// One bank record.
#[derive(Debug, Clone, PartialEq)]
pub struct BankConstraint {
    /// Bank name (starts with `IOB`).
    pub name: String,
    /// Bank voltage.
    pub voltage: f64,
}

/// One global-clock record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockConstraint {
    /// The net to promote onto a global clock.
    pub net: String,
    /// The global clock index.
    pub index: u32,
}

/// A parsed constraints file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Pad records.
    pub pads: Vec<PadConstraint>,
    /// Bank records.
    pub banks: Vec<BankConstraint>,
    /// Global clock records.
    pub clocks: Vec<ClockConstraint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Pads,
    Banks,
    Clocks,
}

fn invalid(line: u64, message: impl Into<String>) -> CsvError {
    CsvError::Invalid {
        line,
        message: message.into(),
    }
}

fn parse_optional_number(value: &str, line: u64, field: &str) -> Result<Option<u32>, CsvError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| invalid(line, format!("{field} must be a number, got '{value}'")))
}

fn parse_bool(value: &str, line: u64, field: &str) -> Result<bool, CsvError> {
    match value {
        "True" => Ok(true),
        "False" | "" => Ok(false),
        other => Err(invalid(
            line,
            format!("{field} must be 'True' or 'False', got '{other}'"),
        )),
    }
}

fn is_drive_ma(drive: &str) -> bool {
    drive
        .strip_suffix("mA")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn parse_pad(fields: &[&str], line: u64) -> Result<PadConstraint, CsvError> {
    if fields.len() != 15 {
        return Err(invalid(
            line,
            format!("pad record must have 15 fields, got {}", fields.len()),
        ));
    }
    let [iobname, location, standard, drive, slew_rate, input_delay_line, output_delay_line, differential, weak_termination, termination, termination_reference, turbo, input_signal_slope, output_capacity, registered] =
        fields
    else {
        return Err(invalid(line, "pad record must have 15 fields"));
    };

    const STANDARDS: &[&str] = &["LVDS", "LVCMOS", "SSTL", "HSTL"];
    if !STANDARDS.contains(standard) {
        return Err(invalid(line, format!("unknown standard value '{standard}'")));
    }
    if !(is_drive_ma(drive) || matches!(*drive, "CatI" | "CatII" | "Undefined")) {
        return Err(invalid(line, format!("unknown drive value '{drive}'")));
    }
    const WEAK: &[&str] = &["None", "PullUp", "PullDown", ""];
    if !WEAK.contains(weak_termination) {
        return Err(invalid(
            line,
            format!("unknown weak termination value '{weak_termination}'"),
        ));
    }
    if !matches!(*termination_reference, "Floating" | "VT" | "") {
        return Err(invalid(
            line,
            format!("unknown termination reference '{termination_reference}'"),
        ));
    }

    // Cross-field rules.
    if *standard == "LVDS" && *drive != "Undefined" {
        return Err(invalid(line, "LVDS requires drive = Undefined"));
    }
    if *standard == "LVCMOS" && !is_drive_ma(drive) {
        return Err(invalid(line, "LVCMOS requires drive = <N>mA"));
    }
    if matches!(*standard, "SSTL" | "HSTL") && !drive.starts_with("Cat") {
        return Err(invalid(line, "SSTL/HSTL require drive = CatI or CatII"));
    }
    let differential = parse_bool(differential, line, "differential")?;
    let weak_termination = weak_termination.to_string();
    if *termination_reference == "Floating" && !(differential && weak_termination == "None") {
        return Err(invalid(
            line,
            "terminationReference = Floating requires differential = True and weakTermination = None",
        ));
    }

    Ok(PadConstraint {
        iobname: iobname.to_string(),
        location: location.to_string(),
        standard: standard.to_string(),
        drive: drive.to_string(),
        slew_rate: slew_rate.to_string(),
        input_delay_line: parse_optional_number(input_delay_line, line, "inputDelayLine")?,
        output_delay_line: parse_optional_number(output_delay_line, line, "outputDelayLine")?,
        differential,
        weak_termination,
        termination: parse_optional_number(termination, line, "termination")?,
        termination_reference: termination_reference.to_string(),
        turbo: parse_bool(turbo, line, "turbo")?,
        input_signal_slope: parse_optional_number(input_signal_slope, line, "inputSignalSlope")?,
        output_capacity: parse_optional_number(output_capacity, line, "outputCapacity")?,
        registered: parse_bool(registered, line, "registered")?,
    })
}

fn parse_bank(fields: &[&str], line: u64) -> Result<BankConstraint, CsvError> {
    if fields.len() != 3 {
        return Err(invalid(
            line,
            format!("bank record must have 3 fields, got {}", fields.len()),
        ));
    }
    if !fields[0].starts_with("IOB") {
        return Err(invalid(
            line,
            format!("bank name must start with IOB, got '{}'", fields[0]),
        ));
    }
    let voltage: f64 = fields[1]
        .parse()
        .map_err(|_| invalid(line, format!("bank voltage must be a number, got '{}'", fields[1])))?;
    Ok(BankConstraint {
        name: fields[0].to_string(),
        voltage,
    })
}

fn parse_clock(fields: &[&str], line: u64) -> Result<ClockConstraint, CsvError> {
    if fields.len() != 2 {
        return Err(invalid(
            line,
            format!("global clock record must have 2 fields, got {}", fields.len()),
        ));
    }
    let index: u32 = fields[1]
        .parse()
        .map_err(|_| invalid(line, format!("clock index must be a number, got '{}'", fields[1])))?;
    Ok(ClockConstraint {
        net: fields[0].to_string(),
        index,
    })
}

/// Parses a constraints file.
pub fn parse_constraints(text: &str) -> Result<Constraints, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());

    let mut out = Constraints::default();
    let mut section = Section::Pads;
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<&str> = record.iter().map(str::trim).collect();
        if fields.is_empty() || (fields.len() == 1 && fields[0].is_empty()) {
            continue;
        }
        if fields.len() == 1 && fields[0].starts_with('!') {
            section = match section {
                Section::Pads => Section::Banks,
                Section::Banks | Section::Clocks => Section::Clocks,
            };
            continue;
        }
        match section {
            Section::Pads => out.pads.push(parse_pad(&fields, line)?),
            Section::Banks => out.banks.push(parse_bank(&fields, line)?),
            Section::Clocks => out.clocks.push(parse_clock(&fields, line)?),
        }
    }
    Ok(out)
}

/// Applies pad constraints to the design: each record's settings land as
/// parameters on the named I/O cell. Pads naming no cell produce a warning.
pub fn apply_constraints(ctx: &mut Context, constraints: &Constraints, sink: &DiagnosticSink) {
    for pad in &constraints.pads {
        // The front-end prefixes synthesized pads with `$iob$`.
        let cell = ctx
            .design
            .cell_id(ctx.id(&pad.iobname))
            .or_else(|| ctx.design.cell_id(ctx.id(&format!("$iob${}", pad.iobname))));
        let Some(cell) = cell else {
            sink.emit(
                Diagnostic::warning(Category::Input, "constraint pad not found in netlist")
                    .with_primary(pad.iobname.clone()),
            );
            continue;
        };
        let loc_key = ctx.id("LOC");
        let drive_key = ctx.id("DRIVE");
        let c = &mut ctx.design.cells[cell];
        c.attrs
            .insert(constids::IO_TYPE, Property::Str(pad.standard.clone()));
        c.attrs.insert(loc_key, Property::Str(pad.location.clone()));
        c.attrs.insert(drive_key, Property::Str(pad.drive.clone()));
    }
}

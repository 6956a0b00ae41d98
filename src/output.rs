use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use wfc_core::{ChangeKind, ChangeLog, PossibilityGrid, RunSummary, SolverState};
use wfc_rules::ModuleCatalog;

/// Marker written for cells whose domain ended empty.
pub const CONTRADICTION_MARK: &str = "!";
/// Marker written for cells that still hold several modules.
pub const UNDECIDED_MARK: &str = "?";

/// Renders the grid as text.
///
/// Format: space-separated module names along X, one line per row (Y), a
/// blank line between layers (Z). Contradicted cells are written as `!` and
/// undecided ones as `?`.
pub fn render_grid(grid: &PossibilityGrid, catalog: &ModuleCatalog) -> String {
    let dims = grid.dimensions();
    let mut text = String::new();
    for z in 0..dims.depth {
        if z > 0 {
            text.push('\n');
        }
        for y in 0..dims.height {
            let row: Vec<&str> = (0..dims.width)
                .map(|x| cell_label(grid, catalog, (x, y, z)))
                .collect();
            text.push_str(&row.join(" "));
            text.push('\n');
        }
    }
    text
}

fn cell_label<'a>(
    grid: &PossibilityGrid,
    catalog: &'a ModuleCatalog,
    coords: (usize, usize, usize),
) -> &'a str {
    if grid.is_contradiction(coords) {
        return CONTRADICTION_MARK;
    }
    grid.decided_module(coords)
        .and_then(|id| catalog.module(id))
        .map_or(UNDECIDED_MARK, |module| module.name())
}

/// Saves the final grid to a file in the text format of [`render_grid`].
pub fn save_grid_to_file(grid: &PossibilityGrid, catalog: &ModuleCatalog, output_path: &Path) -> Result<()> {
    log::info!("Saving grid to {:?}...", output_path);

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {:?}", output_path))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(render_grid(grid, catalog).as_bytes())
        .with_context(|| format!("Failed to write grid to {:?}", output_path))?;
    writer
        .flush()
        .context("Failed to flush writer for output file")?;

    log::info!("Successfully saved grid to {:?}", output_path);
    Ok(())
}

const CHANGE_LOG_HEADER: [&str; 10] = [
    "sequence",
    "iteration",
    "x",
    "y",
    "z",
    "event",
    "module",
    "remaining",
    "override_taken",
    "cause",
];

#[derive(Serialize)]
struct ChangeLogRow<'a> {
    sequence: u64,
    iteration: u64,
    x: usize,
    y: usize,
    z: usize,
    event: &'static str,
    module: Option<&'a str>,
    remaining: Option<usize>,
    override_taken: Option<bool>,
    cause: Option<String>,
}

/// Writes the change log as CSV, one row per event in log order.
pub fn write_change_log_csv(change_log: &ChangeLog, catalog: &ModuleCatalog, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create change log file: {:?}", path))?;
    writer.write_record(CHANGE_LOG_HEADER)?;

    for event in change_log.events() {
        let (x, y, z) = event.coords;
        let module = event
            .kind
            .module()
            .and_then(|id| catalog.module(id))
            .map(|module| module.name());
        let (remaining, override_taken) = match event.kind {
            ChangeKind::Seeded { remaining } | ChangeKind::Narrowed { remaining } => {
                (Some(remaining), None)
            }
            ChangeKind::Assigned { override_taken, .. } => (Some(1), Some(override_taken)),
            ChangeKind::Forced { .. } => (Some(1), None),
            ChangeKind::Contradiction => (Some(0), None),
        };
        writer.serialize(ChangeLogRow {
            sequence: event.sequence,
            iteration: event.iteration,
            x,
            y,
            z,
            event: event.kind.label(),
            module,
            remaining,
            override_taken,
            cause: event.cause.map(|(cx, cy, cz)| format!("{cx},{cy},{cz}")),
        })?;
    }

    writer.flush().context("Failed to flush change log writer")?;
    log::info!("Wrote {} change log events to {:?}", change_log.len(), path);
    Ok(())
}

/// Writes the run summary as pretty-printed JSON.
pub fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create summary file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary).context("Failed to serialize run summary")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Prints a human readable summary to stdout.
pub fn print_summary(summary: &RunSummary) {
    if let Err(e) = write_summary(&mut io::stdout().lock(), summary) {
        log::warn!("Failed to print run summary: {e}");
    }
}

fn write_summary(out: &mut impl Write, summary: &RunSummary) -> io::Result<()> {
    let state = match summary.state {
        SolverState::Solved => "solved".green().bold(),
        SolverState::Contradicted => "contradicted".red().bold(),
        SolverState::Running => "incomplete".yellow().bold(),
    };
    writeln!(out, "{} {}", "Result:".bold(), state)?;
    writeln!(out, "  seed:              {}", summary.seed)?;
    writeln!(out, "  modules:           {}", summary.module_count)?;
    writeln!(out, "  socket types:      {}", summary.socket_type_count)?;
    writeln!(out, "  iterations:        {}", summary.iterations)?;
    writeln!(out, "  decided cells:     {}/{}", summary.decided_cells, summary.total_cells)?;
    writeln!(out, "  overrides:         {}", summary.overrides)?;
    writeln!(out, "  propagation steps: {}", summary.propagation_steps)?;
    writeln!(out, "  elapsed:           {}", humantime::format_duration(summary.elapsed))?;
    if !summary.contradicted_cells.is_empty() {
        writeln!(
            out,
            "  {} {} cells ({:.1}%)",
            "contradicted:".red(),
            summary.contradicted_cells.len(),
            summary.contradiction_fraction() * 100.0
        )?;
    }

    let mut placed: Vec<&(String, u64)> = summary.base_tile_counts.iter().filter(|(_, n)| *n > 0).collect();
    if !placed.is_empty() {
        placed.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        writeln!(out, "  {}", "placements:".bold())?;
        for (name, count) in placed {
            writeln!(out, "    {name:<16} {count}")?;
        }
    }
    Ok(())
}

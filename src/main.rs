// SPDX-License-Identifier: Apache-2.0

//! Command line driver.
//!
//! Two mutually exclusive sub-modes:
//!
//! - `nl2ir read <dialect> <files>...` registers pre-elaborated graph files
//!   under a dialect tag in the session manifest; nothing is imported.
//! - `nl2ir import [tops...]` loads every registered graph, optionally
//!   flattens / resolves external nets / dumps the pre-import graph, then
//!   imports the requested top netlists and prints the resulting IR.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use nl2ir::extnets::resolve_external_nets;
use nl2ir::import::{ImportOptions, ImportSession};
use nl2ir::ir::Design;
use nl2ir::netlist::dump::{parse_graph, write_graph};
use nl2ir::netlist::{NetlistDb, NetlistId};

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum Dialect {
    Vlog95,
    Vlog2k,
    Sv2005,
    Sv2009,
    Sv,
    Vhdl87,
    Vhdl93,
    Vhdl2k,
    Vhdl2008,
    Vhdpsl,
}

#[derive(Serialize, Deserialize)]
struct SessionEntry {
    dialect: Dialect,
    path: PathBuf,
}

#[derive(Serialize, Deserialize, Default)]
struct SessionManifest {
    entries: Vec<SessionEntry>,
}

impl SessionManifest {
    fn load(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(SessionManifest::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading session manifest {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing session manifest {}", path.display()))
    }

    fn store(&self, path: &PathBuf) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("writing session manifest {}", path.display()))
    }
}

#[derive(Parser, Debug)]
#[command(name = "nl2ir", about = "Import elaborated netlist graphs into the IR")]
struct Cli {
    /// Session manifest tracking registered source files.
    #[arg(long, default_value = "nl2ir-session.json")]
    session: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register source files under a dialect tag; no import happens.
    Read {
        #[arg(value_enum)]
        dialect: Dialect,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Import the given top-level netlists (all registered files are
    /// loaded first).
    Import {
        /// Top-level netlist names.
        tops: Vec<String>,
        /// Import every netlist, not just the requested hierarchy.
        #[arg(long)]
        all: bool,
        /// Produce a bit-blasted gate-level netlist.
        #[arg(long)]
        gates: bool,
        /// Flatten the hierarchy before importing.
        #[arg(long)]
        flatten: bool,
        /// Resolve references to external nets by synthesizing ports.
        #[arg(long)]
        extnets: bool,
        /// Keep going on unsupported primitives (black-box placeholders).
        #[arg(long, short = 'k')]
        keep: bool,
        /// Verbose per-object tracing.
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Dump the pre-import graph to this file.
        #[arg(long)]
        dump: Option<PathBuf>,
        /// Write the produced IR here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let _ = env_logger::builder().try_init();
    let cli = Cli::parse();

    match cli.command {
        Command::Read { dialect, files } => cmd_read(&cli.session, dialect, files),
        Command::Import {
            tops,
            all,
            gates,
            flatten,
            extnets,
            keep,
            verbose,
            dump,
            output,
        } => cmd_import(
            &cli.session,
            tops,
            all,
            ImportOptions {
                mode_gates: gates,
                permissive: keep,
                verbose,
            },
            flatten,
            extnets,
            dump,
            output,
        ),
    }
}

fn cmd_read(session_path: &PathBuf, dialect: Dialect, files: Vec<PathBuf>) -> Result<()> {
    let mut manifest = SessionManifest::load(session_path)?;
    for file in files {
        if !file.exists() {
            bail!("no such file: {}", file.display());
        }
        log::info!("registering {} ({:?})", file.display(), dialect);
        manifest.entries.push(SessionEntry {
            dialect,
            path: file,
        });
    }
    manifest.store(session_path)
}

#[allow(clippy::too_many_arguments)]
fn cmd_import(
    session_path: &PathBuf,
    tops: Vec<String>,
    all: bool,
    options: ImportOptions,
    flatten: bool,
    extnets: bool,
    dump: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let manifest = SessionManifest::load(session_path)?;
    if manifest.entries.is_empty() {
        bail!("no source files registered; run the read sub-mode first");
    }

    let mut db = NetlistDb::new();
    for entry in &manifest.entries {
        let text = fs::read_to_string(&entry.path)
            .with_context(|| format!("reading {}", entry.path.display()))?;
        parse_graph(&mut db, &text)
            .with_context(|| format!("loading graph {}", entry.path.display()))?;
    }

    let top_ids: Vec<NetlistId> = if all {
        (0..db.netlists.len()).map(NetlistId).collect()
    } else if tops.is_empty() {
        bail!("no top module specified");
    } else {
        tops.iter()
            .map(|name| {
                db.find_netlist(name)
                    .with_context(|| format!("module not found: {}", name))
            })
            .collect::<Result<_>>()?
    };

    if flatten {
        for &top in &top_ids {
            db.flatten(top);
        }
    }

    if extnets {
        let unresolved = resolve_external_nets(&mut db, &top_ids, options.verbose);
        if unresolved > 0 {
            log::warn!(
                "{} external net reference(s) could not be resolved",
                unresolved
            );
        }
    }

    if let Some(path) = dump {
        let mut file =
            fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        write_graph(&db, &mut file)?;
    }

    let mut design = Design::new();
    let mut session = ImportSession::new(&db, &mut design, options);
    for &top in &top_ids {
        session.enqueue(top);
    }
    session.run()?;

    let rendered = design.to_string();
    match output {
        Some(path) => fs::write(&path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", rendered),
    }
    Ok(())
}

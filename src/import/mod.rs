// SPDX-License-Identifier: Apache-2.0

//! Hierarchical importer: drains a work queue of netlists, lowering each
//! into one IR module through a strictly sequential per-module state
//! machine (ports and buses, nets and buses, free-value drivers,
//! instances).

pub mod cells;
pub mod gates;
pub mod memory;
pub mod sigmap;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::ImportError;
use crate::ir::{CellKind, CellPort, Const, Design, Module, SigBit, SigSpec, State, WireId};
use crate::netlist::{InstId, InstanceKind, NetBusId, NetId, NetlistDb, NetlistId};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Produce bit-blasted gate cells instead of word-level cells.
    pub mode_gates: bool,
    /// Degrade unsupported primitives to black-box placeholders.
    pub permissive: bool,
    /// Per-object progress tracing.
    pub verbose: bool,
}

/// Derived IR module name: operator bodies share a reserved prefix so that
/// recurring word-level operators collapse to one definition.
pub fn derived_module_name(db: &NetlistDb, nl: NetlistId) -> String {
    let netlist = db.netlist(nl);
    if netlist.is_operator {
        format!("$oper${}", netlist.name)
    } else {
        netlist.name.clone()
    }
}

/// One import invocation. Owns the work queue, the done-set, and thereby
/// the module memoization; discarded when the invocation ends.
pub struct ImportSession<'a> {
    db: &'a NetlistDb,
    design: &'a mut Design,
    options: ImportOptions,
    todo: VecDeque<NetlistId>,
    done: HashSet<NetlistId>,
}

impl<'a> ImportSession<'a> {
    pub fn new(db: &'a NetlistDb, design: &'a mut Design, options: ImportOptions) -> Self {
        ImportSession {
            db,
            design,
            options,
            todo: VecDeque::new(),
            done: HashSet::new(),
        }
    }

    pub fn enqueue(&mut self, nl: NetlistId) {
        self.todo.push_back(nl);
    }

    /// Imports every queued netlist plus all sub-netlists discovered along
    /// the way, each at most once.
    pub fn run(&mut self) -> Result<(), ImportError> {
        while let Some(nl) = self.todo.pop_front() {
            if !self.done.insert(nl) {
                continue;
            }
            self.import_netlist(nl)?;
        }
        Ok(())
    }

    fn import_netlist(&mut self, nl: NetlistId) -> Result<(), ImportError> {
        let name = derived_module_name(self.db, nl);
        if self.design.has(&name) {
            if !self.db.netlist(nl).is_operator {
                return Err(ImportError::Redefinition {
                    module: self.db.netlist(nl).name.clone(),
                });
            }
            // Deduplicated operator body: silently reuse the existing one.
            return Ok(());
        }

        let mut module = Module::new(&name);
        if self.db.netlist(nl).is_black_box {
            log::info!("importing black-box module {}", name);
            module
                .attributes
                .insert("blackbox".to_string(), Const::Bits(vec![State::S1]));
        } else {
            log::info!("importing module {}", name);
        }

        let mut pending_blackboxes = Vec::new();
        let result = ModuleImporter {
            db: self.db,
            nl,
            module: &mut module,
            options: self.options,
            net_map: HashMap::new(),
            posedge_map: HashMap::new(),
            wire_inits: BTreeMap::new(),
            todo: &mut self.todo,
            pending_blackboxes: &mut pending_blackboxes,
        }
        .run();

        // The module stays in the design even when import aborted; the
        // whole invocation is unwinding anyway.
        self.design.add(module);
        for bb in pending_blackboxes {
            if !self.design.has(&bb) {
                let mut placeholder = Module::new(&bb);
                placeholder
                    .attributes
                    .insert("blackbox".to_string(), Const::Bits(vec![State::S1]));
                self.design.add(placeholder);
            }
        }
        result
    }
}

fn import_attributes(
    attrs: &mut BTreeMap<String, Const>,
    src: &Option<String>,
    source: &BTreeMap<String, String>,
) {
    if let Some(s) = src {
        attrs.insert("src".to_string(), Const::Str(s.clone()));
    }
    for (key, value) in source {
        attrs.insert(key.clone(), Const::Str(value.clone()));
    }
}

pub(crate) fn req(net: Option<NetId>, inst_name: &str, what: &str) -> NetId {
    net.unwrap_or_else(|| panic!("instance '{}' is missing its {} connection", inst_name, what))
}

/// Markings collected in the nets pass and applied once all wires exist.
#[derive(Default)]
struct NetMarks {
    init: Vec<(NetId, bool)>,
    free_const: HashSet<NetId>,
    free_const_order: Vec<NetId>,
    free_seq: HashSet<NetId>,
    free_seq_order: Vec<NetId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FreeKind {
    Constant,
    Sequence,
}

/// Per-module import state; lives for exactly one netlist's import.
pub(crate) struct ModuleImporter<'a> {
    pub(crate) db: &'a NetlistDb,
    pub(crate) nl: NetlistId,
    pub(crate) module: &'a mut Module,
    pub(crate) options: ImportOptions,
    /// One IR signal reference per net; later sightings connect.
    pub(crate) net_map: HashMap<NetId, SigBit>,
    /// Edge-detector outputs to the net whose rising edge they observe.
    pub(crate) posedge_map: HashMap<NetId, NetId>,
    /// Pending per-wire initial values, applied after the instance pass.
    pub(crate) wire_inits: BTreeMap<WireId, Vec<State>>,
    pub(crate) todo: &'a mut VecDeque<NetlistId>,
    pub(crate) pending_blackboxes: &'a mut Vec<String>,
}

impl ModuleImporter<'_> {
    fn run(mut self) -> Result<(), ImportError> {
        self.import_ports()?;
        self.module.fixup_ports();
        let marks = self.import_nets()?;
        self.import_free_drivers(&marks)?;
        self.import_instances()?;
        self.apply_wire_inits();
        Ok(())
    }

    // State 1: PortsAndBuses. One wire per scalar port and per port bus,
    // preserving declared order and offsets. A net already mapped via an
    // earlier port connects instead of aliasing; the connection direction
    // follows the port role.
    fn import_ports(&mut self) -> Result<(), ImportError> {
        let db = self.db;
        let nl = db.netlist(self.nl);

        for (index, &port_id) in nl.ports.iter().enumerate() {
            let port = db.port(port_id);
            if port.bus.is_some() {
                continue;
            }
            if self.options.verbose {
                log::info!("  importing port {}", port.name);
            }
            let wire = self.module.add_wire(&port.name, 1);
            import_attributes(
                &mut self.module.wire_mut(wire).attributes,
                &port.src,
                &port.attributes,
            );
            {
                let w = self.module.wire_mut(wire);
                w.port_id = index + 1;
                w.port_input = matches!(
                    port.dir,
                    crate::netlist::Direction::Input | crate::netlist::Direction::Inout
                );
                w.port_output = matches!(
                    port.dir,
                    crate::netlist::Direction::Output | crate::netlist::Direction::Inout
                );
            }
            if let Some(net) = port.net {
                let bit = SigBit::Wire(wire, 0);
                if !self.net_map.contains_key(&net) {
                    self.net_map.insert(net, bit);
                } else if self.module.wire(wire).port_input {
                    let mapped = self.resolve(net)?;
                    self.module.connect(mapped.into(), bit.into());
                } else {
                    let mapped = self.resolve(net)?;
                    self.module.connect(bit.into(), mapped.into());
                }
            }
        }

        for &bus_id in &nl.port_buses {
            let bus = db.port_bus(bus_id);
            if self.options.verbose {
                log::info!("  importing port bus {}", bus.name);
            }
            let wire = self.module.add_wire(&bus.name, bus.size());
            let start_offset = bus.left.min(bus.right);
            import_attributes(
                &mut self.module.wire_mut(wire).attributes,
                &bus.src,
                &bus.attributes,
            );
            {
                let w = self.module.wire_mut(wire);
                w.start_offset = start_offset;
                w.port_input = matches!(
                    bus.dir,
                    crate::netlist::Direction::Input | crate::netlist::Direction::Inout
                );
                w.port_output = matches!(
                    bus.dir,
                    crate::netlist::Direction::Output | crate::netlist::Direction::Inout
                );
            }
            let step: i64 = if bus.is_up() { 1 } else { -1 };
            let mut index = bus.left;
            loop {
                if let Some(port_id) = bus.port_at_index(index) {
                    if let Some(net) = db.port(port_id).net {
                        let bit = SigBit::Wire(wire, (index - start_offset) as usize);
                        if !self.net_map.contains_key(&net) {
                            self.net_map.insert(net, bit);
                        } else if self.module.wire(wire).port_input {
                            let mapped = self.resolve(net)?;
                            self.module.connect(mapped.into(), bit.into());
                        } else {
                            let mapped = self.resolve(net)?;
                            self.module.connect(bit.into(), mapped.into());
                        }
                    }
                }
                if index == bus.right {
                    break;
                }
                index += step;
            }
        }
        Ok(())
    }

    // State 2: NetsAndBuses. One wire per unmapped, non-RAM net; bus wires
    // only when at least one member is new. Initial-value and free-value
    // markings are recorded here and applied later.
    fn import_nets(&mut self) -> Result<NetMarks, ImportError> {
        let db = self.db;
        let nl = db.netlist(self.nl);
        let mut marks = NetMarks::default();

        for &net_id in &nl.nets {
            let net = db.net(net_id);
            if net.ram.is_some() {
                self.infer_memory(net_id)?;
                continue;
            }
            if let Some(value) = net.initial {
                marks.init.push((net_id, value));
            }
            if net.free_const {
                if marks.free_const.insert(net_id) {
                    marks.free_const_order.push(net_id);
                }
            } else if net.free_seq {
                if marks.free_seq.insert(net_id) {
                    marks.free_seq_order.push(net_id);
                }
            }
            if self.net_map.contains_key(&net_id) {
                if self.options.verbose {
                    log::info!("  skipping net {}", net.name);
                }
                continue;
            }
            if net.bus.is_some() {
                continue;
            }
            if self.options.verbose {
                log::info!("  importing net {}", net.name);
            }
            let wire_name = self.module.uniquify(&net.name);
            let wire = self.module.add_wire(&wire_name, 1);
            import_attributes(
                &mut self.module.wire_mut(wire).attributes,
                &net.src,
                &net.attributes,
            );
            self.net_map.insert(net_id, SigBit::Wire(wire, 0));
        }

        for &bus_id in &nl.net_buses {
            let bus = db.net_bus(bus_id);
            let found_new = bus.indices().iter().any(|&i| match bus.net_at_index(i) {
                Some(net) => !self.net_map.contains_key(&net),
                None => true,
            });
            if !found_new {
                if self.options.verbose {
                    log::info!("  skipping net bus {}", bus.name);
                }
                continue;
            }
            if self.options.verbose {
                log::info!("  importing net bus {}", bus.name);
            }
            let wire_name = self.module.uniquify(&bus.name);
            let wire = self.module.add_wire(&wire_name, bus.size());
            let start_offset = bus.left.min(bus.right);
            self.module.wire_mut(wire).start_offset = start_offset;
            import_attributes(
                &mut self.module.wire_mut(wire).attributes,
                &bus.src,
                &bus.attributes,
            );
            for index in bus.indices() {
                if let Some(net) = bus.net_at_index(index) {
                    let bit = SigBit::Wire(wire, (index - start_offset) as usize);
                    if !self.net_map.contains_key(&net) {
                        self.net_map.insert(net, bit);
                    } else {
                        let mapped = self.resolve(net)?;
                        self.module.connect(bit.into(), mapped.into());
                    }
                }
            }
        }
        Ok(marks)
    }

    // State 3: FreeDrivers. Initial values land on wire attributes; marked
    // nets get unconstrained driver cells, one multi-bit cell per
    // contiguous qualifying bus run, per-bit cells for the rest.
    fn import_free_drivers(&mut self, marks: &NetMarks) -> Result<(), ImportError> {
        for &(net_id, value) in &marks.init {
            let bit = self.resolve(net_id)?;
            if let SigBit::Wire(wire, offset) = bit {
                let width = self.module.wire(wire).width;
                let init = self
                    .wire_inits
                    .entry(wire)
                    .or_insert_with(|| vec![State::Sx; width]);
                init[offset] = if value { State::S1 } else { State::S0 };
            }
        }

        let mut consumed: HashSet<NetId> = HashSet::new();
        let bus_ids: Vec<NetBusId> = self.db.netlist(self.nl).net_buses.clone();
        for bus_id in bus_ids {
            self.emit_free_runs(bus_id, &marks.free_const, FreeKind::Constant, &mut consumed)?;
            self.emit_free_runs(bus_id, &marks.free_seq, FreeKind::Sequence, &mut consumed)?;
        }
        for &net_id in &marks.free_const_order {
            if !consumed.contains(&net_id) {
                let bit = self.resolve(net_id)?;
                let driver = self.module.add_anyconst(1);
                self.module.connect(bit.into(), driver);
            }
        }
        for &net_id in &marks.free_seq_order {
            if !consumed.contains(&net_id) {
                let bit = self.resolve(net_id)?;
                let driver = self.module.add_anyseq(1);
                self.module.connect(bit.into(), driver);
            }
        }
        Ok(())
    }

    fn emit_free_runs(
        &mut self,
        bus_id: NetBusId,
        set: &HashSet<NetId>,
        kind: FreeKind,
        consumed: &mut HashSet<NetId>,
    ) -> Result<(), ImportError> {
        let db = self.db;
        let bus = db.net_bus(bus_id);
        let min = bus.left.min(bus.right);
        let mut run: Vec<NetId> = Vec::new();
        // Walk wire-bit order (LSB upward) so a run maps to consecutive
        // bits of the bus wire.
        for k in 0..bus.size() as i64 {
            let member = bus.net_at_index(min + k);
            match member {
                Some(net) if set.contains(&net) => run.push(net),
                _ => self.flush_free_run(&mut run, kind, consumed)?,
            }
        }
        self.flush_free_run(&mut run, kind, consumed)
    }

    fn flush_free_run(
        &mut self,
        run: &mut Vec<NetId>,
        kind: FreeKind,
        consumed: &mut HashSet<NetId>,
    ) -> Result<(), ImportError> {
        if run.is_empty() {
            return Ok(());
        }
        let mut sig = SigSpec::new();
        for &net in run.iter() {
            sig.push(self.resolve(net)?);
        }
        let driver = match kind {
            FreeKind::Constant => self.module.add_anyconst(sig.len()),
            FreeKind::Sequence => self.module.add_anyseq(sig.len()),
        };
        self.module.connect(sig, driver);
        consumed.extend(run.drain(..));
        Ok(())
    }

    // State 4: Instances. Edge detectors are recorded first; everything
    // else either has fixed handling here, translates through the active
    // table, or becomes a sub-module/black-box cell.
    fn import_instances(&mut self) -> Result<(), ImportError> {
        let db = self.db;
        let nl = db.netlist(self.nl);

        for &inst_id in &nl.insts {
            let inst = db.inst(inst_id);
            if inst.kind == InstanceKind::EdgeDetect {
                let in_net = req(inst.get_input(), &inst.name, "input");
                let out_net = req(inst.get_output(), &inst.name, "output");
                self.posedge_map.insert(out_net, in_net);
            }
        }

        for &inst_id in &nl.insts {
            let inst = db.inst(inst_id);
            if inst.kind == InstanceKind::EdgeDetect {
                continue;
            }
            if self.options.verbose {
                log::info!("  importing cell {} ({})", inst.name, inst.kind.name());
            }

            match inst.kind {
                InstanceKind::PropertyAt => {
                    self.import_property_at(inst_id)?;
                    continue;
                }
                InstanceKind::ImmediateAssert | InstanceKind::Assert => {
                    let a = self.resolve(req(inst.get_input(), &inst.name, "input"))?;
                    let name = self.module.fresh_name();
                    self.module
                        .add_assert(name, a.into(), SigBit::Const(State::S1).into());
                    continue;
                }
                InstanceKind::ImmediateAssume | InstanceKind::Assume => {
                    let a = self.resolve(req(inst.get_input(), &inst.name, "input"))?;
                    let name = self.module.fresh_name();
                    self.module
                        .add_assume(name, a.into(), SigBit::Const(State::S1).into());
                    continue;
                }
                InstanceKind::ImmediateCover | InstanceKind::Cover => {
                    let a = self.resolve(req(inst.get_input(), &inst.name, "input"))?;
                    let name = self.module.fresh_name();
                    self.module
                        .add_cover(name, a.into(), SigBit::Const(State::S1).into());
                    continue;
                }
                InstanceKind::PowerConst => {
                    self.connect_const_driver(inst_id, State::S1)?;
                    continue;
                }
                InstanceKind::GroundConst => {
                    self.connect_const_driver(inst_id, State::S0)?;
                    continue;
                }
                InstanceKind::UnknownConst => {
                    self.connect_const_driver(inst_id, State::Sx)?;
                    continue;
                }
                InstanceKind::HighZConst => {
                    self.connect_const_driver(inst_id, State::Sz)?;
                    continue;
                }
                InstanceKind::Buf => {
                    let a = self.resolve(req(inst.get_input(), &inst.name, "input"))?;
                    let y = self.resolve(req(inst.get_output(), &inst.name, "output"))?;
                    self.module
                        .add_buf_gate(inst.name.clone(), a.into(), y.into());
                    continue;
                }
                InstanceKind::ReadPort => {
                    self.import_read_port(inst_id)?;
                    continue;
                }
                InstanceKind::WritePort | InstanceKind::ClockedWritePort => {
                    self.import_write_port(inst_id)?;
                    continue;
                }
                _ => {}
            }

            if !self.options.mode_gates {
                if self.translate_instance_cells(inst_id)? {
                    continue;
                }
                if inst.kind.is_operator() {
                    log::warn!(
                        "unsupported operator {} (falling back to its gate-level body)",
                        inst.kind.name()
                    );
                }
            } else if self.translate_instance_gates(inst_id)? {
                continue;
            }

            if inst.kind.is_primitive() {
                if !self.options.permissive {
                    return Err(ImportError::UnsupportedPrimitive {
                        instance: inst.name.clone(),
                        kind: inst.kind.name(),
                    });
                }
                log::warn!(
                    "unsupported {} primitive '{}'; adding black-box placeholder",
                    inst.kind.name(),
                    inst.name
                );
            }

            self.import_submodule(inst_id)?;
        }
        Ok(())
    }

    fn connect_const_driver(&mut self, inst_id: InstId, state: State) -> Result<(), ImportError> {
        let inst = self.db.inst(inst_id);
        let y = self.resolve(req(inst.get_output(), &inst.name, "output"))?;
        self.module
            .connect(y.into(), SigBit::Const(state).into());
        Ok(())
    }

    // Property-timing instance: an edge-triggered register of the detected
    // clock whose output wire starts initialized to 1.
    fn import_property_at(&mut self, inst_id: InstId) -> Result<(), ImportError> {
        let inst = self.db.inst(inst_id);
        let mut in1 = req(inst.get_input1(), &inst.name, "input1");
        let mut in2 = req(inst.get_input2(), &inst.name, "input2");
        let out = req(inst.get_output(), &inst.name, "output");

        if self.posedge_map.contains_key(&in2) {
            std::mem::swap(&mut in1, &mut in2);
        }
        let clk = match self.posedge_map.get(&in1) {
            Some(clk) => *clk,
            None => {
                return Err(ImportError::UnsupportedPattern {
                    instance: inst.name.clone(),
                    kind: inst.kind.name(),
                    reason: "neither input is the output of an edge detector".to_string(),
                })
            }
        };

        let outsig = self.resolve(out)?;
        if let SigBit::Wire(wire, offset) = outsig {
            let width = self.module.wire(wire).width;
            let init = self
                .wire_inits
                .entry(wire)
                .or_insert_with(|| vec![State::Sx; width]);
            init[offset] = State::S1;
        }
        let clk_sig = self.resolve(clk)?;
        let d = self.resolve(in2)?;
        let name = self.module.fresh_name();
        self.module
            .add_dff(name, clk_sig.into(), d.into(), outsig.into());
        Ok(())
    }

    // Sub-module, operator-body, or black-box placeholder cell; enqueues
    // the view netlist for recursive import.
    fn import_submodule(&mut self, inst_id: InstId) -> Result<(), ImportError> {
        let db = self.db;
        let inst = db.inst(inst_id);

        let module_name = match inst.view {
            Some(view) => {
                self.todo.push_back(view);
                derived_module_name(db, view)
            }
            None => {
                // Primitive without a body: placeholder black-box module.
                let name = format!("$blackbox${}", inst.kind.name());
                self.pending_blackboxes.push(name.clone());
                name
            }
        };

        let mut connections = Vec::new();
        if inst.view.is_some() && !inst.generic.is_empty() {
            // Group bus-member port references under the bus name, padding
            // gaps with fresh wires.
            let mut grouped: BTreeMap<String, Vec<Option<SigBit>>> = BTreeMap::new();
            for gc in &inst.generic {
                let port = db.port(gc.port);
                let (port_name, offset) = match port.bus {
                    Some((bus_id, pos)) => {
                        let bus = db.port_bus(bus_id);
                        let offset = if bus.is_up() { pos } else { bus.size() - 1 - pos };
                        (bus.name.clone(), offset)
                    }
                    None => (port.name.clone(), 0),
                };
                if self.options.verbose {
                    log::info!("    .{}[{}] <- {}", port_name, offset, db.net(gc.net).name);
                }
                let sigvec = grouped.entry(port_name).or_default();
                if sigvec.len() <= offset {
                    sigvec.resize(offset + 1, None);
                }
                sigvec[offset] = Some(self.resolve(gc.net)?);
            }
            for (port_name, sigvec) in grouped {
                let mut sig = SigSpec::new();
                for bit in sigvec {
                    match bit {
                        Some(bit) => sig.push(bit),
                        None => {
                            let wire = self.module.fresh_wire(1);
                            sig.push(SigBit::Wire(wire, 0));
                        }
                    }
                }
                connections.push((CellPort::Named(port_name), sig));
            }
        } else {
            // Role-connected primitive: synthesize a port schema from the
            // populated roles.
            let roles: [(&str, &[Option<NetId>]); 6] = [
                ("in", &inst.input),
                ("in1", &inst.input1),
                ("in2", &inst.input2),
                ("out", &inst.output),
                ("set", &inst.set),
                ("reset", &inst.reset),
            ];
            for (role_name, role) in roles {
                if role.iter().any(|n| n.is_some()) {
                    let sig = self.role_sigspec(role)?;
                    connections.push((CellPort::Named(role_name.to_string()), sig));
                }
            }
            for (role_name, net) in [
                ("control", inst.control),
                ("clock", inst.clock),
                ("cin", inst.cin),
                ("cout", inst.cout),
            ] {
                if let Some(net) = net {
                    let bit = self.resolve(net)?;
                    connections.push((CellPort::Named(role_name.to_string()), bit.into()));
                }
            }
        }

        let index = self.module.add_cell(
            inst.name.clone(),
            CellKind::Instance {
                module: module_name,
            },
            connections,
        );
        import_attributes(
            &mut self.module.cells[index].attributes,
            &inst.src,
            &inst.attributes,
        );
        Ok(())
    }

    fn apply_wire_inits(&mut self) {
        for (wire, bits) in std::mem::take(&mut self.wire_inits) {
            self.module
                .wire_mut(wire)
                .attributes
                .insert("init".to_string(), Const::Bits(bits));
        }
    }
}

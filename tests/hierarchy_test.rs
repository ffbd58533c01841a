// SPDX-License-Identifier: Apache-2.0

//! Sub-module instantiation, bus port grouping, black boxes, and
//! pre-import flattening.

use nl2ir::import::{ImportOptions, ImportSession};
use nl2ir::ir::{CellKind, CellPort, Design, SigBit};
use nl2ir::netlist::{ConnSlot, Direction, InstanceKind, NetlistDb, NetlistId};

fn import(db: &NetlistDb, top: NetlistId) -> Design {
    let mut design = Design::new();
    let mut session = ImportSession::new(db, &mut design, ImportOptions::default());
    session.enqueue(top);
    session.run().unwrap();
    design
}

// Bus-member port references group under the bus name; unconnected
// positions are padded with fresh wires.
#[test]
fn submodule_bus_ports_group_and_pad() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let child = db.add_netlist("child");
    // child has a descending 4-bit input bus d[3:0].
    let bus = db.add_port_bus(child, "d", Direction::Input, 3, 0);
    let bus_ports = db.port_bus(bus).ports.clone();

    let sub = db.add_instance(top, "u0", InstanceKind::SubModule, Some(child));
    // Connect only the left-bound member (declared index 3).
    let hi = db.add_net(top, "hi");
    db.connect_generic(sub, bus_ports[0], hi);

    let design = import(&db, top);
    let module = &design.modules["top"];
    let cell = &module.cells[0];
    assert!(matches!(&cell.kind, CellKind::Instance { module } if module == "child"));
    let sig = cell.port(&CellPort::Named("d".to_string())).unwrap();
    assert_eq!(sig.len(), 4);
    // Index 3 of a descending 4-bit bus is offset 3 from the low bound.
    let hi_wire = module.find_wire("hi").unwrap();
    assert_eq!(sig.bit(3), SigBit::Wire(hi_wire, 0));
    // The padded positions are fresh wires, not constants.
    for i in 0..3 {
        assert!(matches!(sig.bit(i), SigBit::Wire(_, _)));
    }
}

#[test]
fn black_box_view_imports_as_blackbox_module() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let bb = db.add_netlist("macro_cell");
    db.netlist_mut(bb).is_black_box = true;
    let a = db.add_net(bb, "a");
    let port = db.add_port(bb, "a", Direction::Input);
    db.connect_port(port, a);

    let ta = db.add_net(top, "a");
    let inst = db.add_instance(top, "u0", InstanceKind::SubModule, Some(bb));
    db.connect_generic(inst, port, ta);

    let design = import(&db, top);
    let module = &design.modules["macro_cell"];
    assert!(module.attributes.contains_key("blackbox"));
    // The black box still exposes its port wires.
    assert!(module.wire(module.find_wire("a").unwrap()).port_input);
}

#[test]
fn port_buses_preserve_offset_and_direction() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let bus = db.add_port_bus(top, "data", Direction::Output, 7, 4);
    let ports = db.port_bus(bus).ports.clone();
    for (pos, &port) in ports.iter().enumerate() {
        let net = db.add_net(top, &format!("d{}", pos));
        db.connect_port(port, net);
    }

    let design = import(&db, top);
    let module = &design.modules["top"];
    let wire = module.wire(module.find_wire("data").unwrap());
    assert_eq!(wire.width, 4);
    assert_eq!(wire.start_offset, 4);
    assert!(wire.port_output);
}

// Flattening first, importing second: the hierarchy disappears but the
// logic survives in the parent module.
#[test]
fn flatten_then_import_yields_single_module() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let child = db.add_netlist("child");

    let ca = db.add_net(child, "a");
    let cy = db.add_net(child, "y");
    let pa = db.add_port(child, "a", Direction::Input);
    let py = db.add_port(child, "y", Direction::Output);
    db.connect_port(pa, ca);
    db.connect_port(py, cy);
    let inv = db.add_instance(child, "inv0", InstanceKind::Inv, None);
    db.connect(inv, ConnSlot::Input(0), ca);
    db.connect(inv, ConnSlot::Output(0), cy);

    let ta = db.add_net(top, "a");
    let ty = db.add_net(top, "y");
    for (name, net, dir) in [
        ("a", ta, Direction::Input),
        ("y", ty, Direction::Output),
    ] {
        let port = db.add_port(top, name, dir);
        db.connect_port(port, net);
    }
    let sub = db.add_instance(top, "u0", InstanceKind::SubModule, Some(child));
    db.connect_generic(sub, pa, ta);
    db.connect_generic(sub, py, ty);

    db.flatten(top);
    let design = import(&db, top);
    assert_eq!(design.modules.len(), 1);
    let module = &design.modules["top"];
    assert_eq!(module.cells.len(), 1);
    assert!(matches!(module.cells[0].kind, CellKind::Not { .. }));
    assert_eq!(module.cells[0].name, "u0.inv0");
}

// A shared net seen through both a port and a net bus stays one wire with
// explicit connection edges.
#[test]
fn multiply_referenced_net_connects_instead_of_aliasing() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let shared = db.add_net(top, "shared");
    let other = db.add_net(top, "other");
    let port = db.add_port(top, "shared", Direction::Input);
    db.connect_port(port, shared);
    db.add_net_bus(top, "grp", 1, 0, vec![Some(other), Some(shared)]);

    let design = import(&db, top);
    let module = &design.modules["top"];
    // Port wire plus the bus wire (it has a new member).
    assert_eq!(module.wires.len(), 2);
    assert_eq!(module.connections.len(), 1);
    let (driven, driver) = &module.connections[0];
    let grp = module.find_wire("grp").unwrap();
    let shared_wire = module.find_wire("shared").unwrap();
    // The bus bit is driven by the already-mapped port wire.
    assert_eq!(driven.bit(0), SigBit::Wire(grp, 0));
    assert_eq!(driver.bit(0), SigBit::Wire(shared_wire, 0));
}

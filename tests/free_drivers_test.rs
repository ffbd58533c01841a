// SPDX-License-Identifier: Apache-2.0

//! Free-value driver emission and initial-value application.

use nl2ir::import::{ImportOptions, ImportSession};
use nl2ir::ir::{CellKind, Const, Design, State};
use nl2ir::netlist::{NetlistDb, NetlistId};

fn import(db: &NetlistDb, top: NetlistId) -> Design {
    let mut design = Design::new();
    let mut session = ImportSession::new(db, &mut design, ImportOptions::default());
    session.enqueue(top);
    session.run().unwrap();
    design
}

// Contiguous qualifying bus runs become one multi-bit driver each; the
// marked bit outside the run gets its own cell.
#[test]
fn contiguous_bus_runs_share_one_driver_cell() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let nets: Vec<_> = (0..4).map(|i| db.add_net(top, &format!("f{}", i))).collect();
    // Descending bus f[3:0]; members listed left (index 3) to right.
    db.add_net_bus(
        top,
        "f",
        3,
        0,
        vec![Some(nets[3]), Some(nets[2]), Some(nets[1]), Some(nets[0])],
    );
    // Indices 0 and 1 form a run; index 3 stands alone.
    db.net_mut(nets[0]).free_seq = true;
    db.net_mut(nets[1]).free_seq = true;
    db.net_mut(nets[3]).free_seq = true;

    let design = import(&db, top);
    let module = &design.modules["top"];
    let widths: Vec<usize> = module
        .cells
        .iter()
        .filter(|c| matches!(c.kind, CellKind::AnySeq))
        .map(|c| c.connections[0].1.len())
        .collect();
    assert_eq!(widths, vec![2, 1]);
}

#[test]
fn standalone_marked_nets_get_single_bit_drivers() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let c = db.add_net(top, "c");
    let s = db.add_net(top, "s");
    db.net_mut(c).free_const = true;
    db.net_mut(s).free_seq = true;

    let design = import(&db, top);
    let module = &design.modules["top"];
    let anyconst = module
        .cells
        .iter()
        .filter(|cell| matches!(cell.kind, CellKind::AnyConst))
        .count();
    let anyseq = module
        .cells
        .iter()
        .filter(|cell| matches!(cell.kind, CellKind::AnySeq))
        .count();
    assert_eq!((anyconst, anyseq), (1, 1));
    // Each driver output feeds the marked net's wire.
    assert_eq!(module.connections.len(), 2);
}

// The free-constant marking wins over the free-input marking when both
// are present.
#[test]
fn free_constant_marking_takes_precedence() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let n = db.add_net(top, "n");
    db.net_mut(n).free_const = true;
    db.net_mut(n).free_seq = true;

    let design = import(&db, top);
    let module = &design.modules["top"];
    assert!(module
        .cells
        .iter()
        .any(|c| matches!(c.kind, CellKind::AnyConst)));
    assert!(!module
        .cells
        .iter()
        .any(|c| matches!(c.kind, CellKind::AnySeq)));
}

#[test]
fn initial_values_land_on_wire_attributes() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let hi = db.add_net(top, "hi");
    let lo = db.add_net(top, "lo");
    db.net_mut(hi).initial = Some(true);
    db.net_mut(lo).initial = Some(false);

    let design = import(&db, top);
    let module = &design.modules["top"];
    for (name, expected) in [("hi", State::S1), ("lo", State::S0)] {
        let wire = module.wire(module.find_wire(name).unwrap());
        match wire.attributes.get("init") {
            Some(Const::Bits(bits)) => assert_eq!(bits[0], expected),
            other => panic!("expected init on {}, got {:?}", name, other),
        }
    }
}

// Bus-grouped initial values collect onto the shared bus wire.
#[test]
fn bus_initial_values_share_the_bus_wire_attribute() {
    let mut db = NetlistDb::new();
    let top = db.add_netlist("top");
    let b0 = db.add_net(top, "b0");
    let b1 = db.add_net(top, "b1");
    db.add_net_bus(top, "b", 1, 0, vec![Some(b1), Some(b0)]);
    db.net_mut(b0).initial = Some(true);

    let design = import(&db, top);
    let module = &design.modules["top"];
    let wire = module.wire(module.find_wire("b").unwrap());
    match wire.attributes.get("init") {
        Some(Const::Bits(bits)) => {
            assert_eq!(bits[0], State::S1);
            assert_eq!(bits[1], State::Sx);
        }
        other => panic!("expected init, got {:?}", other),
    }
}

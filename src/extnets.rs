// SPDX-License-Identifier: Apache-2.0

//! Pre-import pass that eliminates cross-netlist net sharing by
//! synthesizing ports and nets at intermediate hierarchy levels.
//!
//! Runs children before parents. For every reference to a net owned by
//! another netlist, the net is walked up one level at a time: the owning
//! netlist gets a new output port exposing it, the level above gets a new
//! net wired to that port on the already-placed instance, and the walk
//! repeats until the net is local. A netlist instantiated at more than one
//! site cannot safely grow a new port; its nets stay external and are
//! reported, not fixed. Substitutions are collected during the scan and
//! applied afterwards so the connection lists are never mutated while
//! being walked.

use std::collections::{HashMap, HashSet};

use crate::netlist::{ConnSlot, Direction, InstId, NetId, NetlistDb, NetlistId};

pub struct ExtNetResolver<'a> {
    db: &'a mut NetlistDb,
    verbose: bool,
    portname_cnt: usize,
    /// Per-net memo of the same net one level up the hierarchy.
    net_level_up: HashMap<NetId, NetId>,
    visited: HashSet<NetlistId>,
    /// References that stayed external because their owner has multiple
    /// instantiation sites.
    pub unresolved: usize,
}

impl<'a> ExtNetResolver<'a> {
    pub fn new(db: &'a mut NetlistDb, verbose: bool) -> Self {
        ExtNetResolver {
            db,
            verbose,
            portname_cnt: 0,
            net_level_up: HashMap::new(),
            visited: HashSet::new(),
            unresolved: 0,
        }
    }

    /// The same net one level up, synthesizing the port/net pair on first
    /// use. Returns the net unchanged when the owner is instantiated more
    /// than once.
    fn get_net_level_up(&mut self, net: NetId) -> NetId {
        if let Some(&up) = self.net_level_up.get(&net) {
            return up;
        }
        let owner = self.db.net(net).owner;
        if self.db.netlist(owner).refs.len() != 1 {
            return net;
        }
        let up_inst = self.db.netlist(owner).refs[0];
        let up_nl = self.db.inst(up_inst).owner;

        let name = format!("$extnet${}", self.portname_cnt);
        self.portname_cnt += 1;
        let new_port = self.db.add_port(owner, &name, Direction::Output);
        self.db.connect_port(new_port, net);

        let new_net = self.db.add_net(up_nl, &name);
        self.db.connect_generic(up_inst, new_port, new_net);

        self.net_level_up.insert(net, new_net);
        new_net
    }

    pub fn run(&mut self, nl: NetlistId) {
        if !self.visited.insert(nl) {
            return;
        }

        let views: Vec<NetlistId> = self
            .db
            .netlist(nl)
            .insts
            .iter()
            .filter_map(|&inst| self.db.inst(inst).view)
            .collect();
        for view in views {
            self.run(view);
        }

        let mut todo_connect: Vec<(InstId, ConnSlot, NetId)> = Vec::new();
        let insts: Vec<InstId> = self.db.netlist(nl).insts.clone();
        for inst in insts {
            for (slot, net) in self.db.inst(inst).conn_slots() {
                if !self.db.is_external(net, nl) {
                    continue;
                }
                if self.verbose {
                    log::info!(
                        "fixing external net reference on {}.{}",
                        self.db.full_name(nl),
                        self.db.inst(inst).name
                    );
                }
                let mut current = net;
                while self.db.is_external(current, nl) {
                    let up = self.get_net_level_up(current);
                    if up == current {
                        break;
                    }
                    current = up;
                }
                if self.db.is_external(current, nl) {
                    self.unresolved += 1;
                    log::warn!(
                        "net '{}.{}' stays external to '{}': its owner has multiple \
                         instantiation sites",
                        self.db.full_name(self.db.net(current).owner),
                        self.db.net(current).name,
                        self.db.full_name(nl)
                    );
                }
                todo_connect.push((inst, slot, current));
            }
        }

        for (inst, slot, net) in todo_connect {
            self.db.reconnect(inst, slot, net);
        }
    }
}

/// Resolves external net references below every requested top netlist.
/// Returns the number of references left external (multi-site owners), a
/// reported but non-fatal condition.
pub fn resolve_external_nets(db: &mut NetlistDb, tops: &[NetlistId], verbose: bool) -> usize {
    let mut resolver = ExtNetResolver::new(db, verbose);
    for &top in tops {
        resolver.run(top);
    }
    resolver.unresolved
}

#[cfg(test)]
mod tests {
    use super::resolve_external_nets;
    use crate::netlist::{ConnSlot, InstanceKind, NetlistDb};

    // Net owned two levels down, consumed at the top: resolution threads
    // it through a synthesized port at each level.
    #[test]
    fn resolves_reference_across_two_levels() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let mid = db.add_netlist("mid");
        let leaf = db.add_netlist("leaf");
        db.add_instance(top, "m0", InstanceKind::SubModule, Some(mid));
        db.add_instance(mid, "l0", InstanceKind::SubModule, Some(leaf));

        let deep = db.add_net(leaf, "deep");
        let y = db.add_net(top, "y");
        let buf = db.add_instance(top, "b0", InstanceKind::Buf, None);
        db.connect(buf, ConnSlot::Input(0), deep);
        db.connect(buf, ConnSlot::Output(0), y);

        let unresolved = resolve_external_nets(&mut db, &[top], false);
        assert_eq!(unresolved, 0);

        let routed = db.inst(buf).get_input().unwrap();
        assert_eq!(db.net(routed).owner, top);
        // Each intermediate level grew one synthesized port.
        assert_eq!(db.netlist(leaf).ports.len(), 1);
        assert_eq!(db.netlist(mid).ports.len(), 1);
        assert_eq!(db.net(db.port(db.netlist(leaf).ports[0]).net.unwrap()).name, "deep");
    }

    #[test]
    fn multi_site_owner_is_reported_not_fixed() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let leaf = db.add_netlist("leaf");
        db.add_instance(top, "l0", InstanceKind::SubModule, Some(leaf));
        db.add_instance(top, "l1", InstanceKind::SubModule, Some(leaf));

        let deep = db.add_net(leaf, "deep");
        let y = db.add_net(top, "y");
        let buf = db.add_instance(top, "b0", InstanceKind::Buf, None);
        db.connect(buf, ConnSlot::Input(0), deep);
        db.connect(buf, ConnSlot::Output(0), y);

        let unresolved = resolve_external_nets(&mut db, &[top], false);
        assert_eq!(unresolved, 1);
        // Connection unchanged, no port synthesized.
        assert_eq!(db.inst(buf).get_input(), Some(deep));
        assert!(db.netlist(leaf).ports.is_empty());
    }
}

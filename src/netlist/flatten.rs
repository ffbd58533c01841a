// SPDX-License-Identifier: Apache-2.0

//! Bulk hierarchy flattening: inline every sub-module instance below a top
//! netlist, remapping child nets into the parent. Black-box bodies are
//! left as instances.

use std::collections::HashMap;

use crate::netlist::{ConnSlot, InstId, InstanceKind, NetId, NetKind, NetlistDb, NetlistId};

impl NetlistDb {
    /// Flattens the hierarchy below `top` in place. Instances whose view
    /// is a black box survive; everything else is inlined until only
    /// primitives, operators, and black boxes remain.
    pub fn flatten(&mut self, top: NetlistId) {
        loop {
            let target = self.netlist(top).insts.iter().copied().find(|&inst| {
                let instance = self.inst(inst);
                instance.kind == InstanceKind::SubModule
                    && instance
                        .view
                        .map(|v| !self.netlist(v).is_black_box)
                        .unwrap_or(false)
            });
            match target {
                Some(inst) => self.inline_instance(top, inst),
                None => break,
            }
        }
    }

    fn inline_instance(&mut self, parent: NetlistId, inst_id: InstId) {
        let child = self.inst(inst_id).view.expect("instance has no view");
        let inst_name = self.inst(inst_id).name.clone();
        log::debug!(
            "inlining instance '{}' of '{}' into '{}'",
            inst_name,
            self.netlist(child).name,
            self.netlist(parent).name
        );

        // Nets attached to child ports take the net wired at the
        // instantiation site; a child net reached through several ports
        // aliases onto the first site net seen.
        let mut net_map: HashMap<NetId, NetId> = HashMap::new();
        let mut aliases: Vec<(NetId, NetId)> = Vec::new();
        for gc in self.inst(inst_id).generic.clone() {
            if let Some(port_net) = self.port(gc.port).net {
                match net_map.get(&port_net) {
                    None => {
                        net_map.insert(port_net, gc.net);
                    }
                    Some(&first) if first != gc.net => aliases.push((gc.net, first)),
                    Some(_) => {}
                }
            }
        }

        // Remaining child nets become fresh parent nets; ground and power
        // collapse onto the parent's.
        for net_id in self.netlist(child).nets.clone() {
            if net_map.contains_key(&net_id) {
                continue;
            }
            let mapped = match self.net(net_id).kind {
                NetKind::Ground => self.gnd(parent),
                NetKind::Power => self.pwr(parent),
                NetKind::Normal => {
                    let net = self.net(net_id).clone();
                    let name = format!("{}.{}", inst_name, net.name);
                    let new_net = self.add_wide_net(parent, &name, net.width);
                    {
                        let n = self.net_mut(new_net);
                        n.initial = net.initial;
                        n.free_const = net.free_const;
                        n.free_seq = net.free_seq;
                        n.ram = net.ram.clone();
                        n.attributes = net.attributes.clone();
                        n.src = net.src.clone();
                    }
                    new_net
                }
            };
            net_map.insert(net_id, mapped);
        }

        // Clone the child's net buses so bus grouping survives in the
        // parent.
        for bus_id in self.netlist(child).net_buses.clone() {
            let bus = self.net_bus(bus_id).clone();
            let members: Vec<Option<NetId>> = bus
                .nets
                .iter()
                .map(|n| n.and_then(|n| net_map.get(&n).copied()))
                .collect();
            self.add_net_bus(
                parent,
                &format!("{}.{}", inst_name, bus.name),
                bus.left,
                bus.right,
                members,
            );
        }

        // Clone the child's instances with remapped connections.
        for child_inst in self.netlist(child).insts.clone() {
            let template = self.inst(child_inst).clone();
            let clone = self.add_instance(
                parent,
                &format!("{}.{}", inst_name, template.name),
                template.kind,
                template.view,
            );
            for (slot, net) in template.conn_slots() {
                // Nets the child does not own (external references) pass
                // through unchanged; the resolver deals with them.
                let mapped = net_map.get(&net).copied().unwrap_or(net);
                match slot {
                    ConnSlot::Generic(i) => {
                        self.connect_generic(clone, template.generic[i].port, mapped)
                    }
                    _ => self.connect(clone, slot, mapped),
                }
            }
            self.inst_mut(clone).attributes = template.attributes.clone();
            self.inst_mut(clone).src = template.src.clone();
        }

        // Retire the inlined instance.
        self.disconnect_all(inst_id);
        self.netlist_mut(parent).insts.retain(|&i| i != inst_id);
        self.netlist_mut(child).refs.retain(|&i| i != inst_id);

        // Child nets reached through two ports: rewrite later site nets
        // onto the first.
        for (dup, keep) in aliases {
            let touched: Vec<(InstId, ConnSlot)> = self.net(dup).portrefs.clone();
            for (inst, slot) in touched {
                self.reconnect(inst, slot, keep);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::netlist::{ConnSlot, Direction, InstanceKind, NetlistDb};

    #[test]
    fn flatten_inlines_two_level_design() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let child = db.add_netlist("child");

        // child: y = not a
        let ca = db.add_net(child, "a");
        let cy = db.add_net(child, "y");
        let pa = db.add_port(child, "a", Direction::Input);
        let py = db.add_port(child, "y", Direction::Output);
        db.connect_port(pa, ca);
        db.connect_port(py, cy);
        let inv = db.add_instance(child, "inv0", InstanceKind::Inv, None);
        db.connect(inv, ConnSlot::Input(0), ca);
        db.connect(inv, ConnSlot::Output(0), cy);

        // top instantiates child.
        let ta = db.add_net(top, "a");
        let ty = db.add_net(top, "y");
        let sub = db.add_instance(top, "u0", InstanceKind::SubModule, Some(child));
        db.connect_generic(sub, pa, ta);
        db.connect_generic(sub, py, ty);

        db.flatten(top);

        let insts = &db.netlist(top).insts;
        assert_eq!(insts.len(), 1);
        let cloned = db.inst(insts[0]);
        assert_eq!(cloned.kind, InstanceKind::Inv);
        assert_eq!(cloned.name, "u0.inv0");
        // The inverter now reads and drives top's own nets.
        assert_eq!(cloned.get_input(), Some(ta));
        assert_eq!(cloned.get_output(), Some(ty));
        assert!(db.netlist(child).refs.is_empty());
    }
}

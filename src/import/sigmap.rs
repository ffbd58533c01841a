// SPDX-License-Identifier: Apache-2.0

//! Signal mapper and the shared signal-vector helpers the translation
//! tables build operands with.
//!
//! Role vectors arrive MSB-first (bit 0 is the most significant bit, the
//! elaborator's convention); the signal vectors produced here are LSB-first
//! like every [`SigSpec`].

use crate::error::ImportError;
use crate::import::ModuleImporter;
use crate::ir::{SigBit, SigSpec, State, WireId};
use crate::netlist::NetId;

impl ModuleImporter<'_> {
    /// Maps a net to its IR signal bit. Fails when the net is owned by a
    /// different netlist than the one under import; resolution is
    /// idempotent within one import pass.
    pub(crate) fn resolve(&self, net: NetId) -> Result<SigBit, ImportError> {
        if self.db.is_external(net, self.nl) {
            let n = self.db.net(net);
            return Err(ImportError::ExternalReference {
                net: n.name.clone(),
                owner: self.db.full_name(n.owner),
                netlist: self.db.full_name(self.nl),
            });
        }
        match self.net_map.get(&net) {
            Some(bit) => Ok(*bit),
            None => panic!(
                "net '{}' has no mapped signal in netlist '{}'",
                self.db.net(net).name,
                self.db.netlist(self.nl).name
            ),
        }
    }

    /// Builds the LSB-first operand vector for a role; holes become
    /// constant-Z bits.
    pub(crate) fn role_sigspec(&self, role: &[Option<NetId>]) -> Result<SigSpec, ImportError> {
        let mut sig = SigSpec::new();
        for net in role.iter().rev() {
            match net {
                Some(net) => sig.push(self.resolve(*net)?),
                None => sig.push(SigBit::Const(State::Sz)),
            }
        }
        Ok(sig)
    }

    /// Like [`Self::role_sigspec`] but maps ground and power nets straight
    /// to constant bits; used for wide set/reset inputs whose constant
    /// wiring selects the register kind.
    pub(crate) fn role_sigspec_const(
        &self,
        role: &[Option<NetId>],
    ) -> Result<SigSpec, ImportError> {
        let mut sig = SigSpec::new();
        for net in role.iter().rev() {
            match net {
                Some(net) if self.db.is_gnd(*net) => sig.push(SigBit::Const(State::S0)),
                Some(net) if self.db.is_pwr(*net) => sig.push(SigBit::Const(State::S1)),
                Some(net) => sig.push(self.resolve(*net)?),
                None => sig.push(SigBit::Const(State::Sz)),
            }
        }
        Ok(sig)
    }

    /// Result vector for an operator; missing output bits attach to fresh
    /// dummy wires, consecutive missing bits sharing one grown wire.
    pub(crate) fn operator_output(
        &mut self,
        role: &[Option<NetId>],
    ) -> Result<SigSpec, ImportError> {
        let mut sig = SigSpec::new();
        let mut dummy: Option<WireId> = None;
        for net in role.iter().rev() {
            match net {
                Some(net) => {
                    sig.push(self.resolve(*net)?);
                    dummy = None;
                }
                None => {
                    let wire = match dummy {
                        None => {
                            let wire = self.module.fresh_wire(1);
                            dummy = Some(wire);
                            wire
                        }
                        Some(wire) => {
                            self.module.wire_mut(wire).width += 1;
                            wire
                        }
                    };
                    let offset = self.module.wire(wire).width - 1;
                    sig.push(SigBit::Wire(wire, offset));
                }
            }
        }
        Ok(sig)
    }
}

#[cfg(test)]
mod tests {
    use crate::import::{ImportOptions, ImportSession};
    use crate::ir::Design;
    use crate::netlist::{ConnSlot, Direction, InstanceKind, NetlistDb};

    // A net reaching the importer through two sightings (port and plain
    // net list) resolves to one wire plus a connection, never a second
    // wire.
    #[test]
    fn resolve_is_idempotent_within_one_import() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let a = db.add_net(top, "a");
        let pa = db.add_port(top, "a", Direction::Input);
        let pb = db.add_port(top, "b", Direction::Input);
        db.connect_port(pa, a);
        db.connect_port(pb, a);

        let mut design = Design::new();
        let mut session = ImportSession::new(&db, &mut design, ImportOptions::default());
        session.enqueue(top);
        session.run().unwrap();

        let module = &design.modules["top"];
        assert_eq!(module.wires.len(), 2);
        // Second sighting became a driver/load edge.
        assert_eq!(module.connections.len(), 1);
    }

    #[test]
    fn external_reference_is_fatal() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let other = db.add_netlist("other");
        let foreign = db.add_net(other, "foreign");
        let y = db.add_net(top, "y");
        let inst = db.add_instance(top, "u1", InstanceKind::Buf, None);
        db.connect(inst, ConnSlot::Input(0), foreign);
        db.connect(inst, ConnSlot::Output(0), y);

        let mut design = Design::new();
        let mut session = ImportSession::new(&db, &mut design, ImportOptions::default());
        session.enqueue(top);
        let err = session.run().unwrap_err();
        assert!(matches!(
            err,
            crate::error::ImportError::ExternalReference { .. }
        ));
    }
}

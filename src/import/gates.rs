// SPDX-License-Identifier: Apache-2.0

//! Gate-mode translation table: bit-blasted boolean, arithmetic, and
//! sequential primitives. Translation is all-or-nothing; a `false` return
//! means the instance is unrecognized in this mode and escalates to the
//! caller's fallthrough handling.

use crate::error::ImportError;
use crate::import::{req, ModuleImporter};
use crate::ir::{SigBit, SigSpec, State};
use crate::netlist::{InstId, InstanceKind};

impl ModuleImporter<'_> {
    pub(crate) fn translate_instance_gates(
        &mut self,
        inst_id: InstId,
    ) -> Result<bool, ImportError> {
        let db = self.db;
        let inst = db.inst(inst_id);
        let name = inst.name.clone();

        match inst.kind {
            InstanceKind::And => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_and_gate(name, a.into(), b.into(), y.into());
            }

            InstanceKind::Nand => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                let tmp = self.module.fresh_wire(1);
                let tmp_sig: SigSpec = SigBit::Wire(tmp, 0).into();
                let fresh = self.module.fresh_name();
                self.module
                    .add_and_gate(fresh, a.into(), b.into(), tmp_sig.clone());
                self.module.add_not_gate(name, tmp_sig, y.into());
            }

            InstanceKind::Or => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_or_gate(name, a.into(), b.into(), y.into());
            }

            InstanceKind::Nor => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                let tmp = self.module.fresh_wire(1);
                let tmp_sig: SigSpec = SigBit::Wire(tmp, 0).into();
                let fresh = self.module.fresh_name();
                self.module
                    .add_or_gate(fresh, a.into(), b.into(), tmp_sig.clone());
                self.module.add_not_gate(name, tmp_sig, y.into());
            }

            InstanceKind::Xor => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_xor_gate(name, a.into(), b.into(), y.into());
            }

            InstanceKind::Xnor => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module
                    .add_xnor_gate(name, a.into(), b.into(), y.into());
            }

            InstanceKind::Buf => {
                let a = self.resolve(req(inst.get_input(), &name, "input"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_buf_gate(name, a.into(), y.into());
            }

            InstanceKind::Inv => {
                let a = self.resolve(req(inst.get_input(), &name, "input"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_not_gate(name, a.into(), y.into());
            }

            InstanceKind::Mux => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let s = self.resolve(req(inst.control, &name, "control"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module
                    .add_mux_gate(name, a.into(), b.into(), s.into(), y.into());
            }

            InstanceKind::Tri => {
                // Enable low floats the output.
                let a = self.resolve(req(inst.get_input(), &name, "input"))?;
                let s = self.resolve(req(inst.control, &name, "control"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_mux_gate(
                    name,
                    SigBit::Const(State::Sz).into(),
                    a.into(),
                    s.into(),
                    y.into(),
                );
            }

            InstanceKind::FullAdder => {
                let a: SigSpec = self
                    .resolve(req(inst.get_input1(), &name, "input1"))?
                    .into();
                let b: SigSpec = self
                    .resolve(req(inst.get_input2(), &name, "input2"))?
                    .into();
                let c: SigSpec = self.resolve(req(inst.cin, &name, "carry-in"))?.into();
                let x: SigSpec = match inst.cout {
                    Some(net) => self.resolve(net)?.into(),
                    None => SigBit::Wire(self.module.fresh_wire(1), 0).into(),
                };
                let y: SigSpec = match inst.get_output() {
                    Some(net) => self.resolve(net)?.into(),
                    None => SigBit::Wire(self.module.fresh_wire(1), 0).into(),
                };
                let tmp1: SigSpec = SigBit::Wire(self.module.fresh_wire(1), 0).into();
                let tmp2: SigSpec = SigBit::Wire(self.module.fresh_wire(1), 0).into();
                let tmp3: SigSpec = SigBit::Wire(self.module.fresh_wire(1), 0).into();
                let n1 = self.module.fresh_name();
                self.module
                    .add_xor_gate(n1, a.clone(), b.clone(), tmp1.clone());
                self.module
                    .add_xor_gate(name, tmp1.clone(), c.clone(), y);
                let n2 = self.module.fresh_name();
                self.module.add_and_gate(n2, tmp1, c, tmp2.clone());
                let n3 = self.module.fresh_name();
                self.module.add_and_gate(n3, a, b, tmp3.clone());
                let n4 = self.module.fresh_name();
                self.module.add_or_gate(n4, tmp2, tmp3, x);
            }

            InstanceKind::Dffrs => {
                let set = req(inst.get_set(), &name, "set");
                let reset = req(inst.get_reset(), &name, "reset");
                let clk: SigSpec = self.resolve(req(inst.clock, &name, "clock"))?.into();
                let d: SigSpec = self.resolve(req(inst.get_input(), &name, "input"))?.into();
                let q: SigSpec = self
                    .resolve(req(inst.get_output(), &name, "output"))?
                    .into();
                if db.is_gnd(set) && db.is_gnd(reset) {
                    self.module.add_dff_gate(name, clk, d, q);
                } else if db.is_gnd(set) {
                    let rst: SigSpec = self.resolve(reset)?.into();
                    self.module.add_adff_gate(name, clk, rst, d, q, false);
                } else if db.is_gnd(reset) {
                    let rst: SigSpec = self.resolve(set)?.into();
                    self.module.add_adff_gate(name, clk, rst, d, q, true);
                } else {
                    let set_sig: SigSpec = self.resolve(set)?.into();
                    let rst_sig: SigSpec = self.resolve(reset)?.into();
                    self.module.add_dffsr_gate(name, clk, set_sig, rst_sig, d, q);
                }
            }

            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::import::{ImportOptions, ImportSession};
    use crate::ir::{CellKind, Design};
    use crate::netlist::{ConnSlot, InstanceKind, NetlistDb, NetlistId};
    use test_case::test_case;

    fn import_gates(db: &NetlistDb, top: NetlistId) -> Design {
        let mut design = Design::new();
        let mut session = ImportSession::new(
            db,
            &mut design,
            ImportOptions {
                mode_gates: true,
                ..Default::default()
            },
        );
        session.enqueue(top);
        session.run().unwrap();
        design
    }

    // All four set/reset ground combinations map to the expected register
    // kind.
    #[test_case(true, true => "$_DFF_")]
    #[test_case(true, false => "$_ADFF_")]
    #[test_case(false, true => "$_ADFF_")]
    #[test_case(false, false => "$_DFFSR_")]
    fn flip_flop_reduction(set_gnd: bool, reset_gnd: bool) -> &'static str {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let clk = db.add_net(top, "clk");
        let d = db.add_net(top, "d");
        let q = db.add_net(top, "q");
        let set = if set_gnd {
            db.gnd(top)
        } else {
            db.add_net(top, "set")
        };
        let reset = if reset_gnd {
            db.gnd(top)
        } else {
            db.add_net(top, "reset")
        };
        let ff = db.add_instance(top, "ff0", InstanceKind::Dffrs, None);
        db.connect(ff, ConnSlot::Clock, clk);
        db.connect(ff, ConnSlot::Input(0), d);
        db.connect(ff, ConnSlot::Output(0), q);
        db.connect(ff, ConnSlot::Set(0), set);
        db.connect(ff, ConnSlot::Reset(0), reset);

        let design = import_gates(&db, top);
        let module = &design.modules["top"];
        assert_eq!(module.cells.len(), 1);
        module.cells[0].kind.name()
    }

    #[test]
    fn adff_polarity_tracks_which_side_is_grounded() {
        for (set_gnd, expected_preset) in [(true, false), (false, true)] {
            let mut db = NetlistDb::new();
            let top = db.add_netlist("top");
            let clk = db.add_net(top, "clk");
            let d = db.add_net(top, "d");
            let q = db.add_net(top, "q");
            let async_ctl = db.add_net(top, "ctl");
            let gnd = db.gnd(top);
            let ff = db.add_instance(top, "ff0", InstanceKind::Dffrs, None);
            db.connect(ff, ConnSlot::Clock, clk);
            db.connect(ff, ConnSlot::Input(0), d);
            db.connect(ff, ConnSlot::Output(0), q);
            if set_gnd {
                db.connect(ff, ConnSlot::Set(0), gnd);
                db.connect(ff, ConnSlot::Reset(0), async_ctl);
            } else {
                db.connect(ff, ConnSlot::Set(0), async_ctl);
                db.connect(ff, ConnSlot::Reset(0), gnd);
            }

            let design = import_gates(&db, top);
            let module = &design.modules["top"];
            match &module.cells[0].kind {
                CellKind::AdffGate { preset } => assert_eq!(*preset, expected_preset),
                other => panic!("expected ADFF gate, got {:?}", other),
            }
        }
    }

    #[test]
    fn nand_inserts_intermediate_inverter() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let a = db.add_net(top, "a");
        let b = db.add_net(top, "b");
        let y = db.add_net(top, "y");
        let g = db.add_instance(top, "g0", InstanceKind::Nand, None);
        db.connect(g, ConnSlot::Input1(0), a);
        db.connect(g, ConnSlot::Input2(0), b);
        db.connect(g, ConnSlot::Output(0), y);

        let design = import_gates(&db, top);
        let module = &design.modules["top"];
        let kinds: Vec<&str> = module.cells.iter().map(|c| c.kind.name()).collect();
        assert_eq!(kinds, vec!["$_AND_", "$_NOT_"]);
        // The source-named instance is the inverter feeding the output.
        assert_eq!(module.cells[1].name, "g0");
    }
}

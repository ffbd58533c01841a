// SPDX-License-Identifier: Apache-2.0

//! Cell-mode translation table: word-level, width/sign-parameterized
//! cells. Mirrors the gate-mode table for the bit-level primitives and
//! adds the operator set. Carry-in and set/reset wiring decide between
//! cell variants; the predicates here are structural requirements, not
//! heuristics.

use crate::error::ImportError;
use crate::import::{req, ModuleImporter};
use crate::ir::{SigBit, SigSpec, State};
use crate::netlist::{InstId, Instance, InstanceKind};

impl ModuleImporter<'_> {
    fn inst_signed(&self, inst: &Instance) -> bool {
        inst.view
            .map(|view| self.db.netlist(view).is_signed)
            .unwrap_or(false)
    }

    pub(crate) fn translate_instance_cells(
        &mut self,
        inst_id: InstId,
    ) -> Result<bool, ImportError> {
        let db = self.db;
        let inst = db.inst(inst_id);
        let name = inst.name.clone();
        let signed = self.inst_signed(inst);

        match inst.kind {
            InstanceKind::And => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module
                    .add_and(name, a.into(), b.into(), y.into(), false);
            }

            InstanceKind::Nand => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                let tmp = self.module.fresh_wire(1);
                let tmp_sig: SigSpec = SigBit::Wire(tmp, 0).into();
                let fresh = self.module.fresh_name();
                self.module
                    .add_and(fresh, a.into(), b.into(), tmp_sig.clone(), false);
                self.module.add_not(name, tmp_sig, y.into(), false);
            }

            InstanceKind::Or => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module
                    .add_or(name, a.into(), b.into(), y.into(), false);
            }

            InstanceKind::Nor => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                let tmp = self.module.fresh_wire(1);
                let tmp_sig: SigSpec = SigBit::Wire(tmp, 0).into();
                let fresh = self.module.fresh_name();
                self.module
                    .add_or(fresh, a.into(), b.into(), tmp_sig.clone(), false);
                self.module.add_not(name, tmp_sig, y.into(), false);
            }

            InstanceKind::Xor => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module
                    .add_xor(name, a.into(), b.into(), y.into(), false);
            }

            InstanceKind::Xnor => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module
                    .add_xnor(name, a.into(), b.into(), y.into(), false);
            }

            InstanceKind::Inv => {
                let a = self.resolve(req(inst.get_input(), &name, "input"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_not(name, a.into(), y.into(), false);
            }

            InstanceKind::Mux => {
                let a = self.resolve(req(inst.get_input1(), &name, "input1"))?;
                let b = self.resolve(req(inst.get_input2(), &name, "input2"))?;
                let s = self.resolve(req(inst.control, &name, "control"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module
                    .add_mux(name, a.into(), b.into(), s.into(), y.into());
            }

            InstanceKind::Tri => {
                let a = self.resolve(req(inst.get_input(), &name, "input"))?;
                let s = self.resolve(req(inst.control, &name, "control"))?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_mux(
                    name,
                    SigBit::Const(State::Sz).into(),
                    a.into(),
                    s.into(),
                    y.into(),
                );
            }

            InstanceKind::FullAdder => {
                // Sum plus carry-out expressed as a two-bit addition chain.
                let a: SigSpec = self
                    .resolve(req(inst.get_input1(), &name, "input1"))?
                    .into();
                let b: SigSpec = self
                    .resolve(req(inst.get_input2(), &name, "input2"))?
                    .into();
                let c: SigSpec = self.resolve(req(inst.cin, &name, "carry-in"))?.into();
                let a_plus_b_wire = self.module.fresh_wire(2);
                let a_plus_b = self.module.sig(a_plus_b_wire);
                let mut y: SigSpec = match inst.get_output() {
                    Some(net) => self.resolve(net)?.into(),
                    None => SigBit::Wire(self.module.fresh_wire(1), 0).into(),
                };
                if let Some(cout) = inst.cout {
                    y.push(self.resolve(cout)?);
                }
                let fresh = self.module.fresh_name();
                self.module.add_add(fresh, a, b, a_plus_b.clone(), false);
                self.module.add_add(name, a_plus_b, c, y, false);
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
                    self.module.add_dff(name, clk, d, q);
                } else if db.is_gnd(set) {
                    let rst: SigSpec = self.resolve(reset)?.into();
                    self.module.add_adff(name, clk, rst, d, q, State::S0);
                } else if db.is_gnd(reset) {
                    let rst: SigSpec = self.resolve(set)?.into();
                    self.module.add_adff(name, clk, rst, d, q, State::S1);
                } else {
                    let set_sig: SigSpec = self.resolve(set)?.into();
                    let rst_sig: SigSpec = self.resolve(reset)?.into();
                    self.module.add_dffsr(name, clk, set_sig, rst_sig, d, q);
                }
            }

            InstanceKind::Dlatchrs => {
                let set = req(inst.get_set(), &name, "set");
                let reset = req(inst.get_reset(), &name, "reset");
                let en: SigSpec = self.resolve(req(inst.control, &name, "control"))?.into();
                let d: SigSpec = self.resolve(req(inst.get_input(), &name, "input"))?.into();
                let q: SigSpec = self
                    .resolve(req(inst.get_output(), &name, "output"))?
                    .into();
                if db.is_gnd(set) && db.is_gnd(reset) {
                    self.module.add_dlatch(name, en, d, q);
                } else {
                    let set_sig: SigSpec = self.resolve(set)?.into();
                    let rst_sig: SigSpec = self.resolve(reset)?.into();
                    self.module.add_dlatchsr(name, en, set_sig, rst_sig, d, q);
                }
            }

            InstanceKind::Adder => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let mut out = self.operator_output(&inst.output)?;
                if let Some(cout) = inst.cout {
                    out.push(self.resolve(cout)?);
                }
                let cin_is_gnd = inst.cin.map(|net| db.is_gnd(net)).unwrap_or(true);
                if cin_is_gnd {
                    self.module.add_add(name, in1, in2, out, signed);
                } else {
                    // Nonzero carry-in: chain a second adder for it.
                    let cin: SigSpec = self.resolve(req(inst.cin, &name, "carry-in"))?.into();
                    let tmp_wire = self.module.fresh_wire(out.len());
                    let tmp = self.module.sig(tmp_wire);
                    let fresh = self.module.fresh_name();
                    self.module.add_add(fresh, in1, in2, tmp.clone(), signed);
                    self.module.add_add(name, tmp, cin, out, false);
                }
            }

            InstanceKind::Multiplier => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_mul(name, in1, in2, out, signed);
            }

            InstanceKind::Divider => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_div(name, in1, in2, out, signed);
            }

            InstanceKind::Modulo | InstanceKind::Remainder => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_mod(name, in1, in2, out, signed);
            }

            InstanceKind::ShiftLeft => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_shl(name, in1, in2, out, false);
            }

            InstanceKind::EnabledDecoder => {
                // Left-shift of the enable bit as a one-hot seed.
                let mut seed = SigSpec::new();
                seed.push(self.resolve(req(inst.control, &name, "control"))?);
                for _ in 1..inst.output.len() {
                    seed.push(SigBit::Const(State::S0));
                }
                let addr = self.role_sigspec(&inst.input)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_shl(name, seed, addr, out, false);
            }

            InstanceKind::Decoder => {
                let mut seed = SigSpec::new();
                seed.push(SigBit::Const(State::S1));
                for _ in 1..inst.output.len() {
                    seed.push(SigBit::Const(State::S0));
                }
                let addr = self.role_sigspec(&inst.input)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_shl(name, seed, addr, out, false);
            }

            InstanceKind::ShiftRight => {
                // The carry-in wiring selects the shift kind: constant-0 is
                // a logical shift, the MSB of operand 1 an arithmetic one.
                // Anything else has no defined meaning.
                let cin = inst.cin;
                let a_msb = inst.get_input1_bit(0);
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                let cin_is_gnd = cin.map(|net| db.is_gnd(net)).unwrap_or(true);
                if cin_is_gnd {
                    self.module.add_shr(name, in1, in2, out, false);
                } else if cin.is_some() && cin == a_msb {
                    self.module.add_sshr(name, in1, in2, out, true);
                } else {
                    return Err(ImportError::UnsupportedPattern {
                        instance: name,
                        kind: inst.kind.name(),
                        reason: "carry-in is neither 0 nor the msb of the left input".to_string(),
                    });
                }
            }

            InstanceKind::ReduceAnd => {
                let a = self.role_sigspec(&inst.input)?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_reduce_and(name, a, y.into(), signed);
            }

            InstanceKind::ReduceOr => {
                let a = self.role_sigspec(&inst.input)?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_reduce_or(name, a, y.into(), signed);
            }

            InstanceKind::ReduceXor => {
                let a = self.role_sigspec(&inst.input)?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_reduce_xor(name, a, y.into(), signed);
            }

            InstanceKind::ReduceXnor => {
                let a = self.role_sigspec(&inst.input)?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_reduce_xnor(name, a, y.into(), signed);
            }

            InstanceKind::LessThan => {
                // Carry-in 0 is strict less-than, carry-in 1 is
                // less-or-equal.
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                let cin = inst.cin;
                let cin_is_gnd = cin.map(|net| db.is_gnd(net)).unwrap_or(true);
                let cin_is_pwr = cin.map(|net| db.is_pwr(net)).unwrap_or(false);
                if cin_is_gnd {
                    self.module.add_lt(name, in1, in2, y.into(), signed);
                } else if cin_is_pwr {
                    self.module.add_le(name, in1, in2, y.into(), signed);
                } else {
                    return Err(ImportError::UnsupportedPattern {
                        instance: name,
                        kind: inst.kind.name(),
                        reason: "carry-in is neither 0 nor 1".to_string(),
                    });
                }
            }

            InstanceKind::WideAnd => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_and(name, in1, in2, out, signed);
            }

            InstanceKind::WideOr => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_or(name, in1, in2, out, signed);
            }

            InstanceKind::WideXor => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_xor(name, in1, in2, out, signed);
            }

            InstanceKind::WideXnor => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_xnor(name, in1, in2, out, signed);
            }

            InstanceKind::WideBuf => {
                let a = self.role_sigspec(&inst.input)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_pos(name, a, out, signed);
            }

            InstanceKind::WideInv => {
                let a = self.role_sigspec(&inst.input)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_not(name, a, out, signed);
            }

            InstanceKind::Minus => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_sub(name, in1, in2, out, signed);
            }

            InstanceKind::UnaryMinus => {
                let a = self.role_sigspec(&inst.input)?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_neg(name, a, out, signed);
            }

            InstanceKind::Equal => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_eq(name, in1, in2, y.into(), signed);
            }

            InstanceKind::NotEqual => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let y = self.resolve(req(inst.get_output(), &name, "output"))?;
                self.module.add_ne(name, in1, in2, y.into(), signed);
            }

            InstanceKind::WideMux => {
                let in1 = self.role_sigspec(&inst.input1)?;
                let in2 = self.role_sigspec(&inst.input2)?;
                let s = self.resolve(req(inst.control, &name, "control"))?;
                let out = self.operator_output(&inst.output)?;
                self.module.add_mux(name, in1, in2, s.into(), out);
            }

            InstanceKind::WideTri => {
                let a = self.role_sigspec(&inst.input)?;
                let s = self.resolve(req(inst.control, &name, "control"))?;
                let out = self.operator_output(&inst.output)?;
                let z = SigSpec::const_bits(State::Sz, inst.output.len());
                self.module.add_mux(name, z, a, s.into(), out);
            }

            InstanceKind::WideDffrs => {
                // The word-level reduction tests "all bits constant false"
                // instead of single-bit ground identity.
                let sig_set = self.role_sigspec_const(&inst.set)?;
                let sig_reset = self.role_sigspec_const(&inst.reset)?;
                let clk: SigSpec = self.resolve(req(inst.clock, &name, "clock"))?.into();
                let d = self.role_sigspec(&inst.input)?;
                let q = self.operator_output(&inst.output)?;
                if sig_set.is_fully_const()
                    && !sig_set.as_bool()
                    && sig_reset.is_fully_const()
                    && !sig_reset.as_bool()
                {
                    self.module.add_dff(name, clk, d, q);
                } else {
                    self.module.add_dffsr(name, clk, sig_set, sig_reset, d, q);
                }
            }

            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ImportError;
    use crate::import::{ImportOptions, ImportSession};
    use crate::ir::{CellKind, CellPort, Design, SigBit, State};
    use crate::netlist::{ConnSlot, InstanceKind, NetId, NetlistDb, NetlistId};

    fn import(db: &NetlistDb, top: NetlistId) -> Result<Design, ImportError> {
        let mut design = Design::new();
        let mut session = ImportSession::new(db, &mut design, ImportOptions::default());
        session.enqueue(top);
        session.run()?;
        Ok(design)
    }

    fn shift_right_fixture(arithmetic_cin: bool, bogus_cin: bool) -> (NetlistDb, NetlistId) {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let mut in1 = Vec::new();
        for i in 0..4 {
            in1.push(db.add_net(top, &format!("a{}", i)));
        }
        let sh = db.add_net(top, "sh");
        let mut outs = Vec::new();
        for i in 0..4 {
            outs.push(db.add_net(top, &format!("y{}", i)));
        }
        let cin: NetId = if bogus_cin {
            db.add_net(top, "stray")
        } else if arithmetic_cin {
            in1[0]
        } else {
            db.gnd(top)
        };
        let inst = db.add_instance(top, "shr0", InstanceKind::ShiftRight, None);
        for (i, net) in in1.iter().enumerate() {
            db.connect(inst, ConnSlot::Input1(i), *net);
        }
        db.connect(inst, ConnSlot::Input2(0), sh);
        for (i, net) in outs.iter().enumerate() {
            db.connect(inst, ConnSlot::Output(i), *net);
        }
        db.connect(inst, ConnSlot::CarryIn, cin);
        (db, top)
    }

    #[test]
    fn shift_right_logical_with_ground_carry() {
        let (db, top) = shift_right_fixture(false, false);
        let design = import(&db, top).unwrap();
        let module = &design.modules["top"];
        assert!(matches!(
            module.cells[0].kind,
            CellKind::Shr { signed: false }
        ));
    }

    #[test]
    fn shift_right_arithmetic_with_msb_carry() {
        let (db, top) = shift_right_fixture(true, false);
        let design = import(&db, top).unwrap();
        let module = &design.modules["top"];
        assert!(matches!(module.cells[0].kind, CellKind::Sshr { signed: true }));
    }

    #[test]
    fn shift_right_rejects_other_carry_wiring() {
        let (db, top) = shift_right_fixture(false, true);
        let err = import(&db, top).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedPattern { .. }));
    }

    fn lessthan_fixture(cin_kind: &str) -> (NetlistDb, NetlistId) {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let a = db.add_net(top, "a");
        let b = db.add_net(top, "b");
        let y = db.add_net(top, "y");
        let cin = match cin_kind {
            "gnd" => db.gnd(top),
            "pwr" => db.pwr(top),
            _ => db.add_net(top, "stray"),
        };
        let inst = db.add_instance(top, "lt0", InstanceKind::LessThan, None);
        db.connect(inst, ConnSlot::Input1(0), a);
        db.connect(inst, ConnSlot::Input2(0), b);
        db.connect(inst, ConnSlot::Output(0), y);
        db.connect(inst, ConnSlot::CarryIn, cin);
        (db, top)
    }

    #[test]
    fn comparison_carry_selects_strictness() {
        let (db, top) = lessthan_fixture("gnd");
        let design = import(&db, top).unwrap();
        assert!(matches!(
            design.modules["top"].cells[0].kind,
            CellKind::Lt { .. }
        ));

        let (db, top) = lessthan_fixture("pwr");
        let design = import(&db, top).unwrap();
        assert!(matches!(
            design.modules["top"].cells[0].kind,
            CellKind::Le { .. }
        ));

        let (db, top) = lessthan_fixture("stray");
        assert!(matches!(
            import(&db, top).unwrap_err(),
            ImportError::UnsupportedPattern { .. }
        ));
    }

    #[test]
    fn adder_with_ground_carry_appends_carry_out() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let mut mk = |prefix: &str, db: &mut NetlistDb| {
            (0..2)
                .map(|i| db.add_net(top, &format!("{}{}", prefix, i)))
                .collect::<Vec<_>>()
        };
        let a = mk("a", &mut db);
        let b = mk("b", &mut db);
        let y = mk("y", &mut db);
        let cout = db.add_net(top, "cout");
        let gnd = db.gnd(top);
        let inst = db.add_instance(top, "add0", InstanceKind::Adder, None);
        for i in 0..2 {
            db.connect(inst, ConnSlot::Input1(i), a[i]);
            db.connect(inst, ConnSlot::Input2(i), b[i]);
            db.connect(inst, ConnSlot::Output(i), y[i]);
        }
        db.connect(inst, ConnSlot::CarryIn, gnd);
        db.connect(inst, ConnSlot::CarryOut, cout);

        let design = import(&db, top).unwrap();
        let module = &design.modules["top"];
        assert_eq!(module.cells.len(), 1);
        let cell = &module.cells[0];
        assert!(matches!(cell.kind, CellKind::Add { .. }));
        // Result is the two output bits plus the appended carry-out.
        assert_eq!(cell.port(&CellPort::Y).unwrap().len(), 3);
    }

    #[test]
    fn adder_with_live_carry_chains_two_adders() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let a = db.add_net(top, "a");
        let b = db.add_net(top, "b");
        let y = db.add_net(top, "y");
        let cin = db.add_net(top, "cin");
        let inst = db.add_instance(top, "add0", InstanceKind::Adder, None);
        db.connect(inst, ConnSlot::Input1(0), a);
        db.connect(inst, ConnSlot::Input2(0), b);
        db.connect(inst, ConnSlot::Output(0), y);
        db.connect(inst, ConnSlot::CarryIn, cin);

        let design = import(&db, top).unwrap();
        let module = &design.modules["top"];
        let adds = module
            .cells
            .iter()
            .filter(|c| matches!(c.kind, CellKind::Add { .. }))
            .count();
        assert_eq!(adds, 2);
        // The source-named cell is the one absorbing the carry.
        assert_eq!(module.cells[1].name, "add0");
    }

    #[test]
    fn decoder_is_one_hot_shift() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let a0 = db.add_net(top, "a0");
        let a1 = db.add_net(top, "a1");
        let outs: Vec<_> = (0..4).map(|i| db.add_net(top, &format!("y{}", i))).collect();
        let inst = db.add_instance(top, "dec0", InstanceKind::Decoder, None);
        db.connect(inst, ConnSlot::Input(0), a1);
        db.connect(inst, ConnSlot::Input(1), a0);
        for (i, net) in outs.iter().enumerate() {
            db.connect(inst, ConnSlot::Output(i), *net);
        }

        let design = import(&db, top).unwrap();
        let cell = &design.modules["top"].cells[0];
        assert!(matches!(cell.kind, CellKind::Shl { .. }));
        let seed = cell.port(&CellPort::A).unwrap();
        assert_eq!(seed.bit(0), SigBit::Const(State::S1));
        assert!(seed
            .bits()
            .iter()
            .skip(1)
            .all(|b| *b == SigBit::Const(State::S0)));
    }

    #[test]
    fn dffrs_reduction_maps_all_ground_combinations() {
        let cases = [
            (true, true, "$dff"),
            (true, false, "$adff"),
            (false, true, "$adff"),
            (false, false, "$dffsr"),
        ];
        for (set_gnd, reset_gnd, expected) in cases {
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

            let design = import(&db, top).unwrap();
            let cell = &design.modules["top"].cells[0];
            assert_eq!(cell.kind.name(), expected);
            // An async-preset register records which value it loads.
            if set_gnd != reset_gnd {
                let want = if reset_gnd { State::S1 } else { State::S0 };
                match cell.kind {
                    CellKind::Adff { reset_value } => assert_eq!(reset_value, want),
                    _ => unreachable!(),
                }
            }
        }
    }

    #[test]
    fn dlatchrs_reduces_only_when_both_sides_grounded() {
        for grounded in [true, false] {
            let mut db = NetlistDb::new();
            let top = db.add_netlist("top");
            let en = db.add_net(top, "en");
            let d = db.add_net(top, "d");
            let q = db.add_net(top, "q");
            let gnd = db.gnd(top);
            let other = db.add_net(top, "set");
            let latch = db.add_instance(top, "l0", InstanceKind::Dlatchrs, None);
            db.connect(latch, ConnSlot::Control, en);
            db.connect(latch, ConnSlot::Input(0), d);
            db.connect(latch, ConnSlot::Output(0), q);
            db.connect(latch, ConnSlot::Set(0), if grounded { gnd } else { other });
            db.connect(latch, ConnSlot::Reset(0), gnd);

            let design = import(&db, top).unwrap();
            let cell = &design.modules["top"].cells[0];
            if grounded {
                assert!(matches!(cell.kind, CellKind::Dlatch));
            } else {
                assert!(matches!(cell.kind, CellKind::Dlatchsr));
            }
        }
    }

    #[test]
    fn wide_dffrs_reduces_on_all_constant_false() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let clk = db.add_net(top, "clk");
        let gnd = db.gnd(top);
        let d: Vec<_> = (0..2).map(|i| db.add_net(top, &format!("d{}", i))).collect();
        let q: Vec<_> = (0..2).map(|i| db.add_net(top, &format!("q{}", i))).collect();
        let inst = db.add_instance(top, "ff0", InstanceKind::WideDffrs, None);
        db.connect(inst, ConnSlot::Clock, clk);
        for i in 0..2 {
            db.connect(inst, ConnSlot::Input(i), d[i]);
            db.connect(inst, ConnSlot::Output(i), q[i]);
            db.connect(inst, ConnSlot::Set(i), gnd);
            db.connect(inst, ConnSlot::Reset(i), gnd);
        }

        let design = import(&db, top).unwrap();
        assert!(matches!(
            design.modules["top"].cells[0].kind,
            CellKind::Dff
        ));
    }

    #[test]
    fn wide_dffrs_with_live_set_keeps_full_register() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let clk = db.add_net(top, "clk");
        let gnd = db.gnd(top);
        let live = db.add_net(top, "set1");
        let d: Vec<_> = (0..2).map(|i| db.add_net(top, &format!("d{}", i))).collect();
        let q: Vec<_> = (0..2).map(|i| db.add_net(top, &format!("q{}", i))).collect();
        let inst = db.add_instance(top, "ff0", InstanceKind::WideDffrs, None);
        db.connect(inst, ConnSlot::Clock, clk);
        for i in 0..2 {
            db.connect(inst, ConnSlot::Input(i), d[i]);
            db.connect(inst, ConnSlot::Output(i), q[i]);
            db.connect(inst, ConnSlot::Reset(i), gnd);
        }
        db.connect(inst, ConnSlot::Set(0), gnd);
        db.connect(inst, ConnSlot::Set(1), live);

        let design = import(&db, top).unwrap();
        assert!(matches!(
            design.modules["top"].cells[0].kind,
            CellKind::Dffsr
        ));
    }
}

// SPDX-License-Identifier: Apache-2.0

//! The cell-based target IR produced by the importer.
//!
//! A [`Design`] is a name-keyed container of [`Module`]s. A module owns
//! wires, typed cells, memories, and direct connections. [`SigSpec`] is the
//! universal operand/result type: an ordered, LSB-first sequence of per-bit
//! signal references, each either a wire bit or a constant state.

use std::collections::BTreeMap;
use std::fmt;

/// Index into `Module::wires`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    S0,
    S1,
    Sx,
    Sz,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            State::S0 => '0',
            State::S1 => '1',
            State::Sx => 'x',
            State::Sz => 'z',
        };
        write!(f, "{}", c)
    }
}

/// One signal bit: a wire bit or a constant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigBit {
    Const(State),
    Wire(WireId, usize),
}

/// Ordered bit vector of signal references; index 0 is the LSB.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SigSpec(Vec<SigBit>);

impl SigSpec {
    pub fn new() -> Self {
        SigSpec(Vec::new())
    }

    pub fn from_bit(bit: SigBit) -> Self {
        SigSpec(vec![bit])
    }

    /// A constant vector of `width` copies of `state`.
    pub fn const_bits(state: State, width: usize) -> Self {
        SigSpec(vec![SigBit::Const(state); width])
    }

    pub fn push(&mut self, bit: SigBit) {
        self.0.push(bit);
    }

    /// Appends `other` on the MSB side.
    pub fn append(&mut self, other: &SigSpec) {
        self.0.extend_from_slice(&other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bits(&self) -> &[SigBit] {
        &self.0
    }

    pub fn bit(&self, i: usize) -> SigBit {
        self.0[i]
    }

    /// A single bit replicated `count` times.
    pub fn repeat(bit: SigBit, count: usize) -> Self {
        SigSpec(vec![bit; count])
    }

    pub fn is_fully_const(&self) -> bool {
        self.0.iter().all(|b| matches!(b, SigBit::Const(_)))
    }

    /// True when any bit is a constant one.
    pub fn as_bool(&self) -> bool {
        self.0.iter().any(|b| matches!(b, SigBit::Const(State::S1)))
    }
}

impl From<SigBit> for SigSpec {
    fn from(bit: SigBit) -> Self {
        SigSpec::from_bit(bit)
    }
}

impl FromIterator<SigBit> for SigSpec {
    fn from_iter<T: IntoIterator<Item = SigBit>>(iter: T) -> Self {
        SigSpec(iter.into_iter().collect())
    }
}

/// Attribute/constant value attached to IR objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Const {
    /// Bit vector, index 0 = LSB.
    Bits(Vec<State>),
    Str(String),
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Bits(bits) => {
                write!(f, "{}'", bits.len())?;
                for b in bits.iter().rev() {
                    write!(f, "{}", b)?;
                }
                Ok(())
            }
            Const::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Wire {
    pub name: String,
    pub width: usize,
    /// Declared low bound of the original bus indices.
    pub start_offset: i64,
    /// 1-based position in the module's port list; 0 while unassigned
    /// (see [`Module::fixup_ports`]).
    pub port_id: usize,
    pub port_input: bool,
    pub port_output: bool,
    pub attributes: BTreeMap<String, Const>,
}

impl Wire {
    pub fn is_port(&self) -> bool {
        self.port_input || self.port_output
    }
}

/// Port slot on a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellPort {
    A,
    B,
    S,
    Y,
    D,
    Q,
    Clk,
    En,
    Set,
    Rst,
    Addr,
    Data,
    Named(String),
}

/// Typed cell tags, parameters carried in the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellKind {
    // Bit-blasted gate cells.
    BufGate,
    NotGate,
    AndGate,
    OrGate,
    XorGate,
    XnorGate,
    MuxGate,
    DffGate,
    AdffGate { preset: bool },
    DffsrGate,
    // Word-level cells.
    Pos { signed: bool },
    Neg { signed: bool },
    Not { signed: bool },
    And { signed: bool },
    Or { signed: bool },
    Xor { signed: bool },
    Xnor { signed: bool },
    ReduceAnd { signed: bool },
    ReduceOr { signed: bool },
    ReduceXor { signed: bool },
    ReduceXnor { signed: bool },
    Add { signed: bool },
    Sub { signed: bool },
    Mul { signed: bool },
    Div { signed: bool },
    Mod { signed: bool },
    Shl { signed: bool },
    Shr { signed: bool },
    Sshr { signed: bool },
    Lt { signed: bool },
    Le { signed: bool },
    Eq { signed: bool },
    Ne { signed: bool },
    Mux,
    Dff,
    Adff { reset_value: State },
    Dffsr,
    Dlatch,
    Dlatchsr,
    // Free-value drivers.
    AnySeq,
    AnyConst,
    // Verification cells.
    Assert,
    Assume,
    Cover,
    // Memory access cells.
    MemRead {
        memid: String,
        clk_enable: bool,
        clk_polarity: bool,
        transparent: bool,
    },
    MemWrite {
        memid: String,
        clk_enable: bool,
        clk_polarity: bool,
        priority: u32,
    },
    /// Instantiation of another module (sub-module or black box).
    Instance { module: String },
}

impl CellKind {
    pub fn name(&self) -> &'static str {
        use CellKind::*;
        match self {
            BufGate => "$_BUF_",
            NotGate => "$_NOT_",
            AndGate => "$_AND_",
            OrGate => "$_OR_",
            XorGate => "$_XOR_",
            XnorGate => "$_XNOR_",
            MuxGate => "$_MUX_",
            DffGate => "$_DFF_",
            AdffGate { .. } => "$_ADFF_",
            DffsrGate => "$_DFFSR_",
            Pos { .. } => "$pos",
            Neg { .. } => "$neg",
            Not { .. } => "$not",
            And { .. } => "$and",
            Or { .. } => "$or",
            Xor { .. } => "$xor",
            Xnor { .. } => "$xnor",
            ReduceAnd { .. } => "$reduce_and",
            ReduceOr { .. } => "$reduce_or",
            ReduceXor { .. } => "$reduce_xor",
            ReduceXnor { .. } => "$reduce_xnor",
            Add { .. } => "$add",
            Sub { .. } => "$sub",
            Mul { .. } => "$mul",
            Div { .. } => "$div",
            Mod { .. } => "$mod",
            Shl { .. } => "$shl",
            Shr { .. } => "$shr",
            Sshr { .. } => "$sshr",
            Lt { .. } => "$lt",
            Le { .. } => "$le",
            Eq { .. } => "$eq",
            Ne { .. } => "$ne",
            Mux => "$mux",
            Dff => "$dff",
            Adff { .. } => "$adff",
            Dffsr => "$dffsr",
            Dlatch => "$dlatch",
            Dlatchsr => "$dlatchsr",
            AnySeq => "$anyseq",
            AnyConst => "$anyconst",
            Assert => "$assert",
            Assume => "$assume",
            Cover => "$cover",
            MemRead { .. } => "$memrd",
            MemWrite { .. } => "$memwr",
            Instance { .. } => "$instance",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub name: String,
    pub kind: CellKind,
    pub connections: Vec<(CellPort, SigSpec)>,
    pub attributes: BTreeMap<String, Const>,
}

impl Cell {
    pub fn port(&self, port: &CellPort) -> Option<&SigSpec> {
        self.connections
            .iter()
            .find(|(p, _)| p == port)
            .map(|(_, sig)| sig)
    }
}

/// Memory with derived geometry; initializer records are keyed by word
/// address, each value LSB-first.
#[derive(Debug, Clone)]
pub struct Memory {
    pub name: String,
    pub width: usize,
    pub size: usize,
    pub init: BTreeMap<usize, Vec<State>>,
}

#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub attributes: BTreeMap<String, Const>,
    pub wires: Vec<Wire>,
    pub cells: Vec<Cell>,
    pub memories: BTreeMap<String, Memory>,
    /// Direct driver/load edges: `(driven, driver)` pairs of equal width.
    pub connections: Vec<(SigSpec, SigSpec)>,
    next_auto: usize,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Module {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id.0]
    }

    pub fn wire_mut(&mut self, id: WireId) -> &mut Wire {
        &mut self.wires[id.0]
    }

    pub fn find_wire(&self, name: &str) -> Option<WireId> {
        self.wires.iter().position(|w| w.name == name).map(WireId)
    }

    /// Returns `name` if unused in this module, else `name$2`, `name$3`, ...
    pub fn uniquify(&self, name: &str) -> String {
        if self.find_wire(name).is_none() {
            return name.to_string();
        }
        let mut i = 2;
        loop {
            let candidate = format!("{}${}", name, i);
            if self.find_wire(&candidate).is_none() {
                return candidate;
            }
            i += 1;
        }
    }

    pub fn add_wire(&mut self, name: &str, width: usize) -> WireId {
        let id = WireId(self.wires.len());
        self.wires.push(Wire {
            name: name.to_string(),
            width,
            start_offset: 0,
            port_id: 0,
            port_input: false,
            port_output: false,
            attributes: BTreeMap::new(),
        });
        id
    }

    /// A generated name unique within this module.
    pub fn fresh_name(&mut self) -> String {
        self.next_auto += 1;
        format!("$auto${}", self.next_auto)
    }

    pub fn fresh_wire(&mut self, width: usize) -> WireId {
        let name = self.fresh_name();
        self.add_wire(&name, width)
    }

    /// The whole wire as a signal vector, LSB first.
    pub fn sig(&self, id: WireId) -> SigSpec {
        (0..self.wire(id).width)
            .map(|i| SigBit::Wire(id, i))
            .collect()
    }

    /// Records a driver/load edge; `driven` takes its value from `driver`.
    pub fn connect(&mut self, driven: SigSpec, driver: SigSpec) {
        assert_eq!(
            driven.len(),
            driver.len(),
            "connection width mismatch in module {}",
            self.name
        );
        self.connections.push((driven, driver));
    }

    /// Assigns 1-based port ids: wires with an explicit id first (in id
    /// order), then remaining port wires in creation order.
    pub fn fixup_ports(&mut self) {
        let mut ids: Vec<usize> = (0..self.wires.len())
            .filter(|&i| self.wires[i].is_port())
            .collect();
        ids.sort_by_key(|&i| {
            if self.wires[i].port_id == 0 {
                (1, self.wires[i].port_id, i)
            } else {
                (0, self.wires[i].port_id, i)
            }
        });
        for (n, &i) in ids.iter().enumerate() {
            self.wires[i].port_id = n + 1;
        }
    }

    pub fn add_cell(
        &mut self,
        name: String,
        kind: CellKind,
        connections: Vec<(CellPort, SigSpec)>,
    ) -> usize {
        self.cells.push(Cell {
            name,
            kind,
            connections,
            attributes: BTreeMap::new(),
        });
        self.cells.len() - 1
    }

    fn binop(
        &mut self,
        name: String,
        kind: CellKind,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
    ) -> usize {
        self.add_cell(
            name,
            kind,
            vec![(CellPort::A, a), (CellPort::B, b), (CellPort::Y, y)],
        )
    }

    fn unop(&mut self, name: String, kind: CellKind, a: SigSpec, y: SigSpec) -> usize {
        self.add_cell(name, kind, vec![(CellPort::A, a), (CellPort::Y, y)])
    }

    // Gate-level constructors.

    pub fn add_buf_gate(&mut self, name: String, a: SigSpec, y: SigSpec) -> usize {
        self.unop(name, CellKind::BufGate, a, y)
    }

    pub fn add_not_gate(&mut self, name: String, a: SigSpec, y: SigSpec) -> usize {
        self.unop(name, CellKind::NotGate, a, y)
    }

    pub fn add_and_gate(&mut self, name: String, a: SigSpec, b: SigSpec, y: SigSpec) -> usize {
        self.binop(name, CellKind::AndGate, a, b, y)
    }

    pub fn add_or_gate(&mut self, name: String, a: SigSpec, b: SigSpec, y: SigSpec) -> usize {
        self.binop(name, CellKind::OrGate, a, b, y)
    }

    pub fn add_xor_gate(&mut self, name: String, a: SigSpec, b: SigSpec, y: SigSpec) -> usize {
        self.binop(name, CellKind::XorGate, a, b, y)
    }

    pub fn add_xnor_gate(&mut self, name: String, a: SigSpec, b: SigSpec, y: SigSpec) -> usize {
        self.binop(name, CellKind::XnorGate, a, b, y)
    }

    pub fn add_mux_gate(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        s: SigSpec,
        y: SigSpec,
    ) -> usize {
        self.add_cell(
            name,
            CellKind::MuxGate,
            vec![
                (CellPort::A, a),
                (CellPort::B, b),
                (CellPort::S, s),
                (CellPort::Y, y),
            ],
        )
    }

    pub fn add_dff_gate(&mut self, name: String, clk: SigSpec, d: SigSpec, q: SigSpec) -> usize {
        self.add_cell(
            name,
            CellKind::DffGate,
            vec![(CellPort::Clk, clk), (CellPort::D, d), (CellPort::Q, q)],
        )
    }

    pub fn add_adff_gate(
        &mut self,
        name: String,
        clk: SigSpec,
        rst: SigSpec,
        d: SigSpec,
        q: SigSpec,
        preset: bool,
    ) -> usize {
        self.add_cell(
            name,
            CellKind::AdffGate { preset },
            vec![
                (CellPort::Clk, clk),
                (CellPort::Rst, rst),
                (CellPort::D, d),
                (CellPort::Q, q),
            ],
        )
    }

    pub fn add_dffsr_gate(
        &mut self,
        name: String,
        clk: SigSpec,
        set: SigSpec,
        rst: SigSpec,
        d: SigSpec,
        q: SigSpec,
    ) -> usize {
        self.add_cell(
            name,
            CellKind::DffsrGate,
            vec![
                (CellPort::Clk, clk),
                (CellPort::Set, set),
                (CellPort::Rst, rst),
                (CellPort::D, d),
                (CellPort::Q, q),
            ],
        )
    }

    // Word-level constructors.

    pub fn add_pos(&mut self, name: String, a: SigSpec, y: SigSpec, signed: bool) -> usize {
        self.unop(name, CellKind::Pos { signed }, a, y)
    }

    pub fn add_neg(&mut self, name: String, a: SigSpec, y: SigSpec, signed: bool) -> usize {
        self.unop(name, CellKind::Neg { signed }, a, y)
    }

    pub fn add_not(&mut self, name: String, a: SigSpec, y: SigSpec, signed: bool) -> usize {
        self.unop(name, CellKind::Not { signed }, a, y)
    }

    pub fn add_and(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::And { signed }, a, b, y)
    }

    pub fn add_or(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Or { signed }, a, b, y)
    }

    pub fn add_xor(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Xor { signed }, a, b, y)
    }

    pub fn add_xnor(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Xnor { signed }, a, b, y)
    }

    pub fn add_reduce_and(&mut self, name: String, a: SigSpec, y: SigSpec, signed: bool) -> usize {
        self.unop(name, CellKind::ReduceAnd { signed }, a, y)
    }

    pub fn add_reduce_or(&mut self, name: String, a: SigSpec, y: SigSpec, signed: bool) -> usize {
        self.unop(name, CellKind::ReduceOr { signed }, a, y)
    }

    pub fn add_reduce_xor(&mut self, name: String, a: SigSpec, y: SigSpec, signed: bool) -> usize {
        self.unop(name, CellKind::ReduceXor { signed }, a, y)
    }

    pub fn add_reduce_xnor(&mut self, name: String, a: SigSpec, y: SigSpec, signed: bool) -> usize {
        self.unop(name, CellKind::ReduceXnor { signed }, a, y)
    }

    pub fn add_add(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Add { signed }, a, b, y)
    }

    pub fn add_sub(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Sub { signed }, a, b, y)
    }

    pub fn add_mul(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Mul { signed }, a, b, y)
    }

    pub fn add_div(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Div { signed }, a, b, y)
    }

    pub fn add_mod(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Mod { signed }, a, b, y)
    }

    pub fn add_shl(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Shl { signed }, a, b, y)
    }

    pub fn add_shr(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Shr { signed }, a, b, y)
    }

    pub fn add_sshr(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Sshr { signed }, a, b, y)
    }

    pub fn add_lt(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Lt { signed }, a, b, y)
    }

    pub fn add_le(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Le { signed }, a, b, y)
    }

    pub fn add_eq(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Eq { signed }, a, b, y)
    }

    pub fn add_ne(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
        signed: bool,
    ) -> usize {
        self.binop(name, CellKind::Ne { signed }, a, b, y)
    }

    pub fn add_mux(
        &mut self,
        name: String,
        a: SigSpec,
        b: SigSpec,
        s: SigSpec,
        y: SigSpec,
    ) -> usize {
        self.add_cell(
            name,
            CellKind::Mux,
            vec![
                (CellPort::A, a),
                (CellPort::B, b),
                (CellPort::S, s),
                (CellPort::Y, y),
            ],
        )
    }

    pub fn add_dff(&mut self, name: String, clk: SigSpec, d: SigSpec, q: SigSpec) -> usize {
        self.add_cell(
            name,
            CellKind::Dff,
            vec![(CellPort::Clk, clk), (CellPort::D, d), (CellPort::Q, q)],
        )
    }

    pub fn add_adff(
        &mut self,
        name: String,
        clk: SigSpec,
        rst: SigSpec,
        d: SigSpec,
        q: SigSpec,
        reset_value: State,
    ) -> usize {
        self.add_cell(
            name,
            CellKind::Adff { reset_value },
            vec![
                (CellPort::Clk, clk),
                (CellPort::Rst, rst),
                (CellPort::D, d),
                (CellPort::Q, q),
            ],
        )
    }

    pub fn add_dffsr(
        &mut self,
        name: String,
        clk: SigSpec,
        set: SigSpec,
        rst: SigSpec,
        d: SigSpec,
        q: SigSpec,
    ) -> usize {
        self.add_cell(
            name,
            CellKind::Dffsr,
            vec![
                (CellPort::Clk, clk),
                (CellPort::Set, set),
                (CellPort::Rst, rst),
                (CellPort::D, d),
                (CellPort::Q, q),
            ],
        )
    }

    pub fn add_dlatch(&mut self, name: String, en: SigSpec, d: SigSpec, q: SigSpec) -> usize {
        self.add_cell(
            name,
            CellKind::Dlatch,
            vec![(CellPort::En, en), (CellPort::D, d), (CellPort::Q, q)],
        )
    }

    pub fn add_dlatchsr(
        &mut self,
        name: String,
        en: SigSpec,
        set: SigSpec,
        rst: SigSpec,
        d: SigSpec,
        q: SigSpec,
    ) -> usize {
        self.add_cell(
            name,
            CellKind::Dlatchsr,
            vec![
                (CellPort::En, en),
                (CellPort::Set, set),
                (CellPort::Rst, rst),
                (CellPort::D, d),
                (CellPort::Q, q),
            ],
        )
    }

    /// Fresh unconstrained-sequence driver; returns its output signal.
    pub fn add_anyseq(&mut self, width: usize) -> SigSpec {
        let wire = self.fresh_wire(width);
        let y = self.sig(wire);
        let name = self.fresh_name();
        self.add_cell(name, CellKind::AnySeq, vec![(CellPort::Y, y.clone())]);
        y
    }

    /// Fresh unconstrained-constant driver; returns its output signal.
    pub fn add_anyconst(&mut self, width: usize) -> SigSpec {
        let wire = self.fresh_wire(width);
        let y = self.sig(wire);
        let name = self.fresh_name();
        self.add_cell(name, CellKind::AnyConst, vec![(CellPort::Y, y.clone())]);
        y
    }

    pub fn add_assert(&mut self, name: String, a: SigSpec, en: SigSpec) -> usize {
        self.add_cell(
            name,
            CellKind::Assert,
            vec![(CellPort::A, a), (CellPort::En, en)],
        )
    }

    pub fn add_assume(&mut self, name: String, a: SigSpec, en: SigSpec) -> usize {
        self.add_cell(
            name,
            CellKind::Assume,
            vec![(CellPort::A, a), (CellPort::En, en)],
        )
    }

    pub fn add_cover(&mut self, name: String, a: SigSpec, en: SigSpec) -> usize {
        self.add_cell(
            name,
            CellKind::Cover,
            vec![(CellPort::A, a), (CellPort::En, en)],
        )
    }
}

/// The shared output container: one module per imported netlist, keyed by
/// derived name.
#[derive(Debug, Default)]
pub struct Design {
    pub modules: BTreeMap<String, Module>,
}

impl Design {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn add(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }
}

impl fmt::Display for CellPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellPort::A => write!(f, "A"),
            CellPort::B => write!(f, "B"),
            CellPort::S => write!(f, "S"),
            CellPort::Y => write!(f, "Y"),
            CellPort::D => write!(f, "D"),
            CellPort::Q => write!(f, "Q"),
            CellPort::Clk => write!(f, "CLK"),
            CellPort::En => write!(f, "EN"),
            CellPort::Set => write!(f, "SET"),
            CellPort::Rst => write!(f, "RST"),
            CellPort::Addr => write!(f, "ADDR"),
            CellPort::Data => write!(f, "DATA"),
            CellPort::Named(s) => write!(f, "{}", s),
        }
    }
}

fn fmt_sigspec(f: &mut fmt::Formatter<'_>, module: &Module, sig: &SigSpec) -> fmt::Result {
    // Whole-wire references print by name; everything else prints as a
    // MSB-first bit list.
    if sig.len() >= 1 {
        if let SigBit::Wire(id, 0) = sig.bit(0) {
            let wire = module.wire(id);
            if wire.width == sig.len()
                && sig
                    .bits()
                    .iter()
                    .enumerate()
                    .all(|(i, b)| *b == SigBit::Wire(id, i))
            {
                return write!(f, "{}", wire.name);
            }
        }
    }
    write!(f, "{{")?;
    for bit in sig.bits().iter().rev() {
        match bit {
            SigBit::Const(state) => write!(f, " 1'{}", state)?,
            SigBit::Wire(id, offset) => write!(f, " {} [{}]", module.wire(*id).name, offset)?,
        }
    }
    write!(f, " }}")
}

impl fmt::Display for Design {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for module in self.modules.values() {
            for (key, value) in &module.attributes {
                writeln!(f, "attribute {} {}", key, value)?;
            }
            writeln!(f, "module {}", module.name)?;
            for wire in &module.wires {
                for (key, value) in &wire.attributes {
                    writeln!(f, "  attribute {} {}", key, value)?;
                }
                write!(f, "  wire width {}", wire.width)?;
                if wire.start_offset != 0 {
                    write!(f, " offset {}", wire.start_offset)?;
                }
                if wire.port_input {
                    write!(f, " input {}", wire.port_id)?;
                } else if wire.port_output {
                    write!(f, " output {}", wire.port_id)?;
                }
                writeln!(f, " {}", wire.name)?;
            }
            for memory in module.memories.values() {
                writeln!(
                    f,
                    "  memory width {} size {} {}",
                    memory.width, memory.size, memory.name
                )?;
                for (addr, word) in &memory.init {
                    writeln!(f, "    init {} {}", addr, Const::Bits(word.clone()))?;
                }
            }
            for cell in &module.cells {
                for (key, value) in &cell.attributes {
                    writeln!(f, "  attribute {} {}", key, value)?;
                }
                let kind_name = match &cell.kind {
                    CellKind::Instance { module } => module.clone(),
                    other => other.name().to_string(),
                };
                writeln!(f, "  cell {} {}", kind_name, cell.name)?;
                for (port, sig) in &cell.connections {
                    write!(f, "    connect {} ", port)?;
                    fmt_sigspec(f, module, sig)?;
                    writeln!(f)?;
                }
            }
            for (driven, driver) in &module.connections {
                write!(f, "  connect ")?;
                fmt_sigspec(f, module, driven)?;
                write!(f, " ")?;
                fmt_sigspec(f, module, driver)?;
                writeln!(f)?;
            }
            writeln!(f, "end")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sig_of_wire_is_lsb_first() {
        let mut module = Module::new("m");
        let w = module.add_wire("w", 3);
        let sig = module.sig(w);
        assert_eq!(sig.bits()[0], SigBit::Wire(w, 0));
        assert_eq!(sig.bits()[2], SigBit::Wire(w, 2));
    }

    #[test]
    fn uniquify_appends_counter() {
        let mut module = Module::new("m");
        module.add_wire("a", 1);
        assert_eq!(module.uniquify("a"), "a$2");
        assert_eq!(module.uniquify("b"), "b");
    }

    #[test]
    fn fixup_ports_orders_explicit_ids_first() {
        let mut module = Module::new("m");
        let a = module.add_wire("a", 1);
        module.wire_mut(a).port_input = true;
        module.wire_mut(a).port_id = 2;
        let b = module.add_wire("b", 1);
        module.wire_mut(b).port_output = true;
        let c = module.add_wire("c", 1);
        module.wire_mut(c).port_input = true;
        module.wire_mut(c).port_id = 1;
        module.fixup_ports();
        assert_eq!(module.wire(c).port_id, 1);
        assert_eq!(module.wire(a).port_id, 2);
        assert_eq!(module.wire(b).port_id, 3);
    }

    #[test]
    fn fully_const_and_as_bool() {
        let mut sig = SigSpec::const_bits(State::S0, 2);
        sig.push(SigBit::Const(State::Sz));
        assert!(sig.is_fully_const());
        assert!(!sig.as_bool());
        sig.push(SigBit::Const(State::S1));
        assert!(sig.as_bool());
    }
}

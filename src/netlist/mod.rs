// SPDX-License-Identifier: Apache-2.0

//! Arena database for the elaborated netlist graph this crate imports.
//!
//! The elaboration engine itself is an external collaborator; this module
//! owns the boundary object model it hands us: netlists, single-bit nets,
//! typed instances, ports, and the bus groupings over them. The builder
//! methods on [`NetlistDb`] are the stand-in for the elaborator's output and
//! are what tests and the graph-dump reader use to construct designs.

pub mod dump;
pub mod flatten;

use std::collections::BTreeMap;

/// Index into `NetlistDb::netlists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetlistId(pub usize);

/// Index into `NetlistDb::nets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(pub usize);

/// Index into `NetlistDb::insts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub usize);

/// Index into `NetlistDb::ports`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub usize);

/// Index into `NetlistDb::port_buses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortBusId(pub usize);

/// Index into `NetlistDb::net_buses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetBusId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    Inout,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Inout => "inout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetKind {
    Normal,
    Ground,
    Power,
}

/// Closed enumeration of instance type tags the elaborator emits.
///
/// Bit-level primitives first, then word-level operators (whose connections
/// use the bus-indexed roles), then verification and memory-access kinds.
/// `SubModule` covers user-module instantiations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    // Bit-level primitives.
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Xnor,
    Buf,
    Inv,
    Mux,
    Tri,
    FullAdder,
    Dffrs,
    Dlatchrs,
    PowerConst,
    GroundConst,
    UnknownConst,
    HighZConst,
    Pullup,
    Pulldown,
    // Verification primitives.
    EdgeDetect,
    PropertyAt,
    ImmediateAssert,
    Assert,
    ImmediateAssume,
    Assume,
    ImmediateCover,
    Cover,
    // Word-level operators.
    Adder,
    Multiplier,
    Divider,
    Modulo,
    Remainder,
    ShiftLeft,
    ShiftRight,
    Decoder,
    EnabledDecoder,
    ReduceAnd,
    ReduceOr,
    ReduceXor,
    ReduceXnor,
    LessThan,
    WideAnd,
    WideOr,
    WideXor,
    WideXnor,
    WideBuf,
    WideInv,
    Minus,
    UnaryMinus,
    Equal,
    NotEqual,
    WideMux,
    WideTri,
    WideDffrs,
    // Memory access ports.
    ReadPort,
    WritePort,
    ClockedWritePort,
    // User module instantiation.
    SubModule,
}

impl InstanceKind {
    pub fn name(&self) -> &'static str {
        use InstanceKind::*;
        match self {
            And => "and",
            Nand => "nand",
            Or => "or",
            Nor => "nor",
            Xor => "xor",
            Xnor => "xnor",
            Buf => "buf",
            Inv => "inv",
            Mux => "mux",
            Tri => "tri",
            FullAdder => "fadd",
            Dffrs => "dffrs",
            Dlatchrs => "dlatchrs",
            PowerConst => "pwr",
            GroundConst => "gnd",
            UnknownConst => "x",
            HighZConst => "z",
            Pullup => "pullup",
            Pulldown => "pulldown",
            EdgeDetect => "edge-detect",
            PropertyAt => "property-at",
            ImmediateAssert => "immediate-assert",
            Assert => "assert",
            ImmediateAssume => "immediate-assume",
            Assume => "assume",
            ImmediateCover => "immediate-cover",
            Cover => "cover",
            Adder => "adder",
            Multiplier => "multiplier",
            Divider => "divider",
            Modulo => "modulo",
            Remainder => "remainder",
            ShiftLeft => "shift-left",
            ShiftRight => "shift-right",
            Decoder => "decoder",
            EnabledDecoder => "enabled-decoder",
            ReduceAnd => "reduce-and",
            ReduceOr => "reduce-or",
            ReduceXor => "reduce-xor",
            ReduceXnor => "reduce-xnor",
            LessThan => "less-than",
            WideAnd => "wide-and",
            WideOr => "wide-or",
            WideXor => "wide-xor",
            WideXnor => "wide-xnor",
            WideBuf => "wide-buf",
            WideInv => "wide-inv",
            Minus => "minus",
            UnaryMinus => "uminus",
            Equal => "equal",
            NotEqual => "nequal",
            WideMux => "wide-mux",
            WideTri => "wide-tri",
            WideDffrs => "wide-dffrs",
            ReadPort => "read-port",
            WritePort => "write-port",
            ClockedWritePort => "clocked-write-port",
            SubModule => "submodule",
        }
    }

    pub fn from_name(name: &str) -> Option<InstanceKind> {
        use InstanceKind::*;
        let all = [
            And,
            Nand,
            Or,
            Nor,
            Xor,
            Xnor,
            Buf,
            Inv,
            Mux,
            Tri,
            FullAdder,
            Dffrs,
            Dlatchrs,
            PowerConst,
            GroundConst,
            UnknownConst,
            HighZConst,
            Pullup,
            Pulldown,
            EdgeDetect,
            PropertyAt,
            ImmediateAssert,
            Assert,
            ImmediateAssume,
            Assume,
            ImmediateCover,
            Cover,
            Adder,
            Multiplier,
            Divider,
            Modulo,
            Remainder,
            ShiftLeft,
            ShiftRight,
            Decoder,
            EnabledDecoder,
            ReduceAnd,
            ReduceOr,
            ReduceXor,
            ReduceXnor,
            LessThan,
            WideAnd,
            WideOr,
            WideXor,
            WideXnor,
            WideBuf,
            WideInv,
            Minus,
            UnaryMinus,
            Equal,
            NotEqual,
            WideMux,
            WideTri,
            WideDffrs,
            ReadPort,
            WritePort,
            ClockedWritePort,
            SubModule,
        ];
        all.into_iter().find(|k| k.name() == name)
    }

    /// Word-level operator tags. Unsupported operators fall back to their
    /// gate-level view; unsupported primitives do not.
    pub fn is_operator(&self) -> bool {
        use InstanceKind::*;
        matches!(
            self,
            Adder
                | Multiplier
                | Divider
                | Modulo
                | Remainder
                | ShiftLeft
                | ShiftRight
                | Decoder
                | EnabledDecoder
                | ReduceAnd
                | ReduceOr
                | ReduceXor
                | ReduceXnor
                | LessThan
                | WideAnd
                | WideOr
                | WideXor
                | WideXnor
                | WideBuf
                | WideInv
                | Minus
                | UnaryMinus
                | Equal
                | NotEqual
                | WideMux
                | WideTri
                | WideDffrs
                | ReadPort
                | WritePort
                | ClockedWritePort
        )
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_operator() && *self != InstanceKind::SubModule
    }
}

/// Identifies one connection slot on an instance. Role slots index bit
/// positions with 0 = most significant bit, the elaborator's convention;
/// `Generic` indexes into the instance's generic connection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnSlot {
    Input(usize),
    Input1(usize),
    Input2(usize),
    Output(usize),
    Control,
    Clock,
    Set(usize),
    Reset(usize),
    CarryIn,
    CarryOut,
    Generic(usize),
}

/// Connection of an instance to a port of its view netlist, by port
/// identity. Used for sub-module instances whose port schema is not
/// role-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericConn {
    pub port: PortId,
    pub net: NetId,
}

/// RAM-backing marking on a net: the net's bits are memory storage, with an
/// optional packed initial-value string (`<width>'b<bits>`) and the declared
/// index range of the backing array (left, right).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RamInfo {
    pub init: Option<String>,
    pub range: Option<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub struct Net {
    pub name: String,
    pub owner: NetlistId,
    pub kind: NetKind,
    /// Bit width; 1 for ordinary nets, the total storage size for
    /// RAM-backing nets.
    pub width: usize,
    /// Owning bus and declared index within it, if bus-grouped.
    pub bus: Option<(NetBusId, i64)>,
    /// Explicit 0/1 initial value.
    pub initial: Option<bool>,
    /// Free-constant marking: driven by an unconstrained constant value.
    pub free_const: bool,
    /// Free-input marking: driven by an unconstrained sequence of values.
    pub free_seq: bool,
    pub ram: Option<RamInfo>,
    /// Instance connection slots attached to this net.
    pub portrefs: Vec<(InstId, ConnSlot)>,
    pub attributes: BTreeMap<String, String>,
    pub src: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    pub owner: NetlistId,
    pub dir: Direction,
    /// Net attached to this port inside its own netlist.
    pub net: Option<NetId>,
    /// Owning bus and position within it (0 = left bound), if bus-grouped.
    pub bus: Option<(PortBusId, usize)>,
    pub attributes: BTreeMap<String, String>,
    pub src: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PortBus {
    pub name: String,
    pub owner: NetlistId,
    pub dir: Direction,
    pub left: i64,
    pub right: i64,
    /// Member ports in position order (position 0 = left bound).
    pub ports: Vec<PortId>,
    pub attributes: BTreeMap<String, String>,
    pub src: Option<String>,
}

impl PortBus {
    pub fn size(&self) -> usize {
        (self.left - self.right).unsigned_abs() as usize + 1
    }

    /// Ascending index direction (left bound below right bound).
    pub fn is_up(&self) -> bool {
        self.left < self.right
    }

    /// Member port at a declared index, if the index is in range.
    pub fn port_at_index(&self, index: i64) -> Option<PortId> {
        let pos = (index - self.left).unsigned_abs() as usize;
        if (self.is_up() && (index < self.left || index > self.right))
            || (!self.is_up() && (index > self.left || index < self.right))
        {
            return None;
        }
        self.ports.get(pos).copied()
    }
}

#[derive(Debug, Clone)]
pub struct NetBus {
    pub name: String,
    pub owner: NetlistId,
    pub left: i64,
    pub right: i64,
    /// Member nets in position order (position 0 = left bound); holes are
    /// permitted.
    pub nets: Vec<Option<NetId>>,
    pub attributes: BTreeMap<String, String>,
    pub src: Option<String>,
}

impl NetBus {
    pub fn size(&self) -> usize {
        (self.left - self.right).unsigned_abs() as usize + 1
    }

    pub fn is_up(&self) -> bool {
        self.left < self.right
    }

    pub fn net_at_index(&self, index: i64) -> Option<NetId> {
        let pos = (index - self.left).unsigned_abs() as usize;
        self.nets.get(pos).copied().flatten()
    }

    /// Declared indices from the left bound to the right bound, inclusive.
    pub fn indices(&self) -> Vec<i64> {
        let step: i64 = if self.is_up() { 1 } else { -1 };
        let mut out = Vec::with_capacity(self.size());
        let mut i = self.left;
        loop {
            out.push(i);
            if i == self.right {
                break;
            }
            i += step;
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub name: String,
    pub owner: NetlistId,
    pub kind: InstanceKind,
    /// Netlist this instance is a placement of: the module body for
    /// `SubModule`, the synthesized gate-level body for operators (when the
    /// elaborator provides one), absent for plain primitives.
    pub view: Option<NetlistId>,
    pub input: Vec<Option<NetId>>,
    pub input1: Vec<Option<NetId>>,
    pub input2: Vec<Option<NetId>>,
    pub output: Vec<Option<NetId>>,
    pub control: Option<NetId>,
    pub clock: Option<NetId>,
    pub set: Vec<Option<NetId>>,
    pub reset: Vec<Option<NetId>>,
    pub cin: Option<NetId>,
    pub cout: Option<NetId>,
    pub generic: Vec<GenericConn>,
    pub attributes: BTreeMap<String, String>,
    pub src: Option<String>,
}

impl Instance {
    /// Single-bit accessor for a role expected to be scalar.
    pub fn get_input(&self) -> Option<NetId> {
        self.input.first().copied().flatten()
    }

    pub fn get_input1(&self) -> Option<NetId> {
        self.input1.first().copied().flatten()
    }

    pub fn get_input2(&self) -> Option<NetId> {
        self.input2.first().copied().flatten()
    }

    pub fn get_output(&self) -> Option<NetId> {
        self.output.first().copied().flatten()
    }

    /// Bit 0 of a role vector is the most significant bit.
    pub fn get_input1_bit(&self, i: usize) -> Option<NetId> {
        self.input1.get(i).copied().flatten()
    }

    pub fn get_set(&self) -> Option<NetId> {
        self.set.first().copied().flatten()
    }

    pub fn get_reset(&self) -> Option<NetId> {
        self.reset.first().copied().flatten()
    }

    /// All populated connection slots, role slots first, generic last.
    pub fn conn_slots(&self) -> Vec<(ConnSlot, NetId)> {
        let mut out = Vec::new();
        let vecs: [(&Vec<Option<NetId>>, fn(usize) -> ConnSlot); 6] = [
            (&self.input, ConnSlot::Input),
            (&self.input1, ConnSlot::Input1),
            (&self.input2, ConnSlot::Input2),
            (&self.output, ConnSlot::Output),
            (&self.set, ConnSlot::Set),
            (&self.reset, ConnSlot::Reset),
        ];
        for (vec, mk) in vecs {
            for (i, net) in vec.iter().enumerate() {
                if let Some(net) = net {
                    out.push((mk(i), *net));
                }
            }
        }
        for (slot, net) in [
            (ConnSlot::Control, self.control),
            (ConnSlot::Clock, self.clock),
            (ConnSlot::CarryIn, self.cin),
            (ConnSlot::CarryOut, self.cout),
        ] {
            if let Some(net) = net {
                out.push((slot, net));
            }
        }
        for (i, gc) in self.generic.iter().enumerate() {
            out.push((ConnSlot::Generic(i), gc.net));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Netlist {
    pub name: String,
    /// Synthesized word-level-operator body (derives a reserved IR name and
    /// deduplicates on import).
    pub is_operator: bool,
    pub is_black_box: bool,
    /// Signedness of the operator this netlist implements.
    pub is_signed: bool,
    pub ports: Vec<PortId>,
    pub port_buses: Vec<PortBusId>,
    pub nets: Vec<NetId>,
    pub net_buses: Vec<NetBusId>,
    pub insts: Vec<InstId>,
    /// Instantiation sites: instances (in other netlists) whose view is
    /// this netlist.
    pub refs: Vec<InstId>,
    pub attributes: BTreeMap<String, String>,
    pub src: Option<String>,
    gnd: Option<NetId>,
    pwr: Option<NetId>,
}

/// Owner of every graph object. All ids index into the arenas here; a net
/// or instance belongs to exactly one netlist via its `owner` field.
#[derive(Debug, Default)]
pub struct NetlistDb {
    pub netlists: Vec<Netlist>,
    pub nets: Vec<Net>,
    pub insts: Vec<Instance>,
    pub ports: Vec<Port>,
    pub port_buses: Vec<PortBus>,
    pub net_buses: Vec<NetBus>,
}

impl NetlistDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn netlist(&self, id: NetlistId) -> &Netlist {
        &self.netlists[id.0]
    }

    pub fn netlist_mut(&mut self, id: NetlistId) -> &mut Netlist {
        &mut self.netlists[id.0]
    }

    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.0]
    }

    pub fn net_mut(&mut self, id: NetId) -> &mut Net {
        &mut self.nets[id.0]
    }

    pub fn inst(&self, id: InstId) -> &Instance {
        &self.insts[id.0]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Instance {
        &mut self.insts[id.0]
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    pub fn port_bus(&self, id: PortBusId) -> &PortBus {
        &self.port_buses[id.0]
    }

    pub fn net_bus(&self, id: NetBusId) -> &NetBus {
        &self.net_buses[id.0]
    }

    pub fn find_netlist(&self, name: &str) -> Option<NetlistId> {
        self.netlists
            .iter()
            .position(|nl| nl.name == name)
            .map(NetlistId)
    }

    pub fn add_netlist(&mut self, name: &str) -> NetlistId {
        let id = NetlistId(self.netlists.len());
        self.netlists.push(Netlist {
            name: name.to_string(),
            is_operator: false,
            is_black_box: false,
            is_signed: false,
            ports: Vec::new(),
            port_buses: Vec::new(),
            nets: Vec::new(),
            net_buses: Vec::new(),
            insts: Vec::new(),
            refs: Vec::new(),
            attributes: BTreeMap::new(),
            src: None,
            gnd: None,
            pwr: None,
        });
        id
    }

    pub fn add_net(&mut self, owner: NetlistId, name: &str) -> NetId {
        self.add_net_with_kind(owner, name, NetKind::Normal, 1)
    }

    pub fn add_wide_net(&mut self, owner: NetlistId, name: &str, width: usize) -> NetId {
        self.add_net_with_kind(owner, name, NetKind::Normal, width)
    }

    fn add_net_with_kind(
        &mut self,
        owner: NetlistId,
        name: &str,
        kind: NetKind,
        width: usize,
    ) -> NetId {
        let id = NetId(self.nets.len());
        self.nets.push(Net {
            name: name.to_string(),
            owner,
            kind,
            width,
            bus: None,
            initial: None,
            free_const: false,
            free_seq: false,
            ram: None,
            portrefs: Vec::new(),
            attributes: BTreeMap::new(),
            src: None,
        });
        self.netlists[owner.0].nets.push(id);
        id
    }

    /// The netlist's ground net, created on first use.
    pub fn gnd(&mut self, owner: NetlistId) -> NetId {
        if let Some(id) = self.netlists[owner.0].gnd {
            return id;
        }
        let id = self.add_net_with_kind(owner, "gnd", NetKind::Ground, 1);
        self.netlists[owner.0].gnd = Some(id);
        id
    }

    /// The netlist's power net, created on first use.
    pub fn pwr(&mut self, owner: NetlistId) -> NetId {
        if let Some(id) = self.netlists[owner.0].pwr {
            return id;
        }
        let id = self.add_net_with_kind(owner, "pwr", NetKind::Power, 1);
        self.netlists[owner.0].pwr = Some(id);
        id
    }

    pub fn is_gnd(&self, net: NetId) -> bool {
        self.net(net).kind == NetKind::Ground
    }

    pub fn is_pwr(&self, net: NetId) -> bool {
        self.net(net).kind == NetKind::Power
    }

    /// A net is external to a netlist when it is owned elsewhere.
    pub fn is_external(&self, net: NetId, nl: NetlistId) -> bool {
        self.net(net).owner != nl
    }

    pub fn add_port(&mut self, owner: NetlistId, name: &str, dir: Direction) -> PortId {
        let id = PortId(self.ports.len());
        self.ports.push(Port {
            name: name.to_string(),
            owner,
            dir,
            net: None,
            bus: None,
            attributes: BTreeMap::new(),
            src: None,
        });
        self.netlists[owner.0].ports.push(id);
        id
    }

    pub fn connect_port(&mut self, port: PortId, net: NetId) {
        self.ports[port.0].net = Some(net);
    }

    pub fn find_port(&self, nl: NetlistId, name: &str) -> Option<PortId> {
        self.netlist(nl)
            .ports
            .iter()
            .copied()
            .find(|&p| self.port(p).name == name)
    }

    pub fn find_port_bus(&self, nl: NetlistId, name: &str) -> Option<PortBusId> {
        self.netlist(nl)
            .port_buses
            .iter()
            .copied()
            .find(|&b| self.port_bus(b).name == name)
    }

    pub fn find_net(&self, nl: NetlistId, name: &str) -> Option<NetId> {
        self.netlist(nl)
            .nets
            .iter()
            .copied()
            .find(|&n| self.net(n).name == name)
    }

    /// Creates a port bus plus its member ports (named `name[index]`).
    pub fn add_port_bus(
        &mut self,
        owner: NetlistId,
        name: &str,
        dir: Direction,
        left: i64,
        right: i64,
    ) -> PortBusId {
        let id = PortBusId(self.port_buses.len());
        let step: i64 = if left < right { 1 } else { -1 };
        let mut ports = Vec::new();
        let mut index = left;
        loop {
            let member = self.add_port(owner, &format!("{}[{}]", name, index), dir);
            self.ports[member.0].bus = Some((id, ports.len()));
            ports.push(member);
            if index == right {
                break;
            }
            index += step;
        }
        self.port_buses.push(PortBus {
            name: name.to_string(),
            owner,
            dir,
            left,
            right,
            ports,
            attributes: BTreeMap::new(),
            src: None,
        });
        self.netlists[owner.0].port_buses.push(id);
        id
    }

    /// Groups existing nets into a bus; `nets` is in position order
    /// (position 0 = left bound) and may contain holes.
    pub fn add_net_bus(
        &mut self,
        owner: NetlistId,
        name: &str,
        left: i64,
        right: i64,
        nets: Vec<Option<NetId>>,
    ) -> NetBusId {
        let id = NetBusId(self.net_buses.len());
        let step: i64 = if left < right { 1 } else { -1 };
        for (pos, net) in nets.iter().enumerate() {
            if let Some(net) = net {
                self.nets[net.0].bus = Some((id, left + step * pos as i64));
            }
        }
        self.net_buses.push(NetBus {
            name: name.to_string(),
            owner,
            left,
            right,
            nets,
            attributes: BTreeMap::new(),
            src: None,
        });
        self.netlists[owner.0].net_buses.push(id);
        id
    }

    pub fn add_instance(
        &mut self,
        owner: NetlistId,
        name: &str,
        kind: InstanceKind,
        view: Option<NetlistId>,
    ) -> InstId {
        let id = InstId(self.insts.len());
        self.insts.push(Instance {
            name: name.to_string(),
            owner,
            kind,
            view,
            input: Vec::new(),
            input1: Vec::new(),
            input2: Vec::new(),
            output: Vec::new(),
            control: None,
            clock: None,
            set: Vec::new(),
            reset: Vec::new(),
            cin: None,
            cout: None,
            generic: Vec::new(),
            attributes: BTreeMap::new(),
            src: None,
        });
        self.netlists[owner.0].insts.push(id);
        if let Some(view) = view {
            self.netlists[view.0].refs.push(id);
        }
        id
    }

    /// Connects a role slot of an instance, growing the role vector as
    /// needed. Bit 0 of a role vector is the most significant bit.
    pub fn connect(&mut self, inst: InstId, slot: ConnSlot, net: NetId) {
        {
            let instance = &mut self.insts[inst.0];
            match slot {
                ConnSlot::Input(i) => Self::set_role_bit(&mut instance.input, i, net),
                ConnSlot::Input1(i) => Self::set_role_bit(&mut instance.input1, i, net),
                ConnSlot::Input2(i) => Self::set_role_bit(&mut instance.input2, i, net),
                ConnSlot::Output(i) => Self::set_role_bit(&mut instance.output, i, net),
                ConnSlot::Set(i) => Self::set_role_bit(&mut instance.set, i, net),
                ConnSlot::Reset(i) => Self::set_role_bit(&mut instance.reset, i, net),
                ConnSlot::Control => instance.control = Some(net),
                ConnSlot::Clock => instance.clock = Some(net),
                ConnSlot::CarryIn => instance.cin = Some(net),
                ConnSlot::CarryOut => instance.cout = Some(net),
                ConnSlot::Generic(_) => panic!("use connect_generic for generic connections"),
            }
        }
        self.nets[net.0].portrefs.push((inst, slot));
    }

    fn set_role_bit(vec: &mut Vec<Option<NetId>>, i: usize, net: NetId) {
        if vec.len() <= i {
            vec.resize(i + 1, None);
        }
        vec[i] = Some(net);
    }

    /// Connects an instance to a port of its view netlist.
    pub fn connect_generic(&mut self, inst: InstId, port: PortId, net: NetId) {
        let slot = {
            let instance = &mut self.insts[inst.0];
            instance.generic.push(GenericConn { port, net });
            ConnSlot::Generic(instance.generic.len() - 1)
        };
        self.nets[net.0].portrefs.push((inst, slot));
    }

    /// Re-points an existing connection slot at a different net,
    /// maintaining both nets' portref lists.
    pub fn reconnect(&mut self, inst: InstId, slot: ConnSlot, net: NetId) {
        let old = {
            let instance = &mut self.insts[inst.0];
            match slot {
                ConnSlot::Generic(i) => {
                    let old = instance.generic[i].net;
                    instance.generic[i].net = net;
                    Some(old)
                }
                ConnSlot::Control => instance.control.replace(net),
                ConnSlot::Clock => instance.clock.replace(net),
                ConnSlot::CarryIn => instance.cin.replace(net),
                ConnSlot::CarryOut => instance.cout.replace(net),
                ConnSlot::Input(i) => instance.input[i].replace(net),
                ConnSlot::Input1(i) => instance.input1[i].replace(net),
                ConnSlot::Input2(i) => instance.input2[i].replace(net),
                ConnSlot::Output(i) => instance.output[i].replace(net),
                ConnSlot::Set(i) => instance.set[i].replace(net),
                ConnSlot::Reset(i) => instance.reset[i].replace(net),
            }
        };
        if let Some(old) = old {
            self.nets[old.0]
                .portrefs
                .retain(|&(i, s)| !(i == inst && s == slot));
        }
        self.nets[net.0].portrefs.push((inst, slot));
    }

    /// Removes every portref of an instance from the nets it touches.
    pub fn disconnect_all(&mut self, inst: InstId) {
        let slots = self.inst(inst).conn_slots();
        for (slot, net) in slots {
            self.nets[net.0]
                .portrefs
                .retain(|&(i, s)| !(i == inst && s == slot));
        }
    }

    /// Hierarchical name for diagnostics: follows the instantiation chain
    /// while sites are unique, else falls back to the netlist's own name.
    pub fn full_name(&self, nl: NetlistId) -> String {
        let netlist = self.netlist(nl);
        if netlist.refs.len() == 1 {
            let inst = self.inst(netlist.refs[0]);
            return format!("{}.{}", self.full_name(inst.owner), inst.name);
        }
        netlist.name.clone()
    }
}

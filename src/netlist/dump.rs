// SPDX-License-Identifier: Apache-2.0

//! Round-trip text dump of the netlist graph.
//!
//! The format is line-oriented and private to this crate: one `netlist`
//! block per netlist, containing its nets, buses, ports, and instances.
//! [`write_graph`] and [`parse_graph`] round-trip; the CLI uses the writer
//! for the pre-import debug dump and the reader to consume pre-elaborated
//! graphs from disk.

use std::collections::HashMap;
use std::io::{self, Write};

use thiserror::Error;

use crate::netlist::{
    ConnSlot, Direction, InstanceKind, NetId, NetKind, NetlistDb, NetlistId, RamInfo,
};

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s)
}

/// Writes the whole graph as text.
pub fn write_graph(db: &NetlistDb, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "# netlist graph dump")?;
    for nl in &db.netlists {
        write!(out, "netlist {}", quoted(&nl.name))?;
        if nl.is_operator {
            write!(out, " operator")?;
        }
        if nl.is_black_box {
            write!(out, " blackbox")?;
        }
        if nl.is_signed {
            write!(out, " signed")?;
        }
        writeln!(out)?;
        for (key, value) in &nl.attributes {
            writeln!(out, "  attr {} {}", quoted(key), quoted(value))?;
        }
        if let Some(src) = &nl.src {
            writeln!(out, "  src {}", quoted(src))?;
        }

        for &net_id in &nl.nets {
            let net = db.net(net_id);
            write!(out, "  net {}", quoted(&net.name))?;
            match net.kind {
                NetKind::Ground => write!(out, " ground")?,
                NetKind::Power => write!(out, " power")?,
                NetKind::Normal => {}
            }
            if net.width != 1 {
                write!(out, " width={}", net.width)?;
            }
            if let Some(value) = net.initial {
                write!(out, " init={}", if value { 1 } else { 0 })?;
            }
            if net.free_const {
                write!(out, " freeconst")?;
            }
            if net.free_seq {
                write!(out, " freeseq")?;
            }
            if let Some(ram) = &net.ram {
                write!(out, " ram")?;
                if let Some(init) = &ram.init {
                    write!(out, " raminit={}", quoted(init))?;
                }
                if let Some((left, right)) = ram.range {
                    write!(out, " range={}:{}", left, right)?;
                }
            }
            writeln!(out)?;
            for (key, value) in &net.attributes {
                writeln!(out, "  attr {} {}", quoted(key), quoted(value))?;
            }
            if let Some(src) = &net.src {
                writeln!(out, "  src {}", quoted(src))?;
            }
        }

        for &bus_id in &nl.net_buses {
            let bus = db.net_bus(bus_id);
            write!(
                out,
                "  netbus {} {} {} members",
                quoted(&bus.name),
                bus.left,
                bus.right
            )?;
            for member in &bus.nets {
                match member {
                    Some(net) => write!(out, " {}", quoted(&db.net(*net).name))?,
                    None => write!(out, " -")?,
                }
            }
            writeln!(out)?;
        }

        for &port_id in &nl.ports {
            let port = db.port(port_id);
            if port.bus.is_some() {
                continue;
            }
            write!(out, "  port {} {}", quoted(&port.name), port.dir.name())?;
            if let Some(net) = port.net {
                write!(out, " net={}", quoted(&db.net(net).name))?;
            }
            writeln!(out)?;
        }

        for &bus_id in &nl.port_buses {
            let bus = db.port_bus(bus_id);
            write!(
                out,
                "  portbus {} {} {} {} nets",
                quoted(&bus.name),
                bus.dir.name(),
                bus.left,
                bus.right
            )?;
            for &member in &bus.ports {
                match db.port(member).net {
                    Some(net) => write!(out, " {}", quoted(&db.net(net).name))?,
                    None => write!(out, " -")?,
                }
            }
            writeln!(out)?;
        }

        for &inst_id in &nl.insts {
            let inst = db.inst(inst_id);
            write!(out, "  inst {} {}", quoted(&inst.name), inst.kind.name())?;
            if let Some(view) = inst.view {
                write!(out, " view={}", quoted(&db.netlist(view).name))?;
            }
            writeln!(out)?;
            for (key, value) in &inst.attributes {
                writeln!(out, "  attr {} {}", quoted(key), quoted(value))?;
            }
            if let Some(src) = &inst.src {
                writeln!(out, "  src {}", quoted(src))?;
            }
            for (slot, net) in inst.conn_slots() {
                let net_obj = db.net(net);
                let owner_name = &db.netlist(net_obj.owner).name;
                match slot {
                    ConnSlot::Input(i) => write!(out, "    conn input {}", i)?,
                    ConnSlot::Input1(i) => write!(out, "    conn input1 {}", i)?,
                    ConnSlot::Input2(i) => write!(out, "    conn input2 {}", i)?,
                    ConnSlot::Output(i) => write!(out, "    conn output {}", i)?,
                    ConnSlot::Set(i) => write!(out, "    conn set {}", i)?,
                    ConnSlot::Reset(i) => write!(out, "    conn reset {}", i)?,
                    ConnSlot::Control => write!(out, "    conn control")?,
                    ConnSlot::Clock => write!(out, "    conn clock")?,
                    ConnSlot::CarryIn => write!(out, "    conn cin")?,
                    ConnSlot::CarryOut => write!(out, "    conn cout")?,
                    ConnSlot::Generic(i) => {
                        let port = db.port(inst.generic[i].port);
                        write!(out, "    conn generic {}", quoted(&port.name))?
                    }
                }
                writeln!(
                    out,
                    " {} {}",
                    quoted(owner_name),
                    quoted(&net_obj.name)
                )?;
            }
        }
        writeln!(out, "end")?;
    }
    Ok(())
}

/// Splits a line into tokens; a token is either a bare word or runs to the
/// closing quote once a `"` is seen (also inside `key="value"` forms).
fn tokenize(line: &str, lineno: usize) -> Result<Vec<String>, DumpError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(DumpError::Parse {
            line: lineno,
            message: "unterminated quote".to_string(),
        });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_err(line: usize, message: impl Into<String>) -> DumpError {
    DumpError::Parse {
        line,
        message: message.into(),
    }
}

#[derive(Debug)]
struct PendingConn {
    line: usize,
    slot_kind: String,
    index: Option<usize>,
    generic_port: Option<String>,
    net_owner: String,
    net_name: String,
}

#[derive(Debug)]
struct PendingInst {
    line: usize,
    owner: NetlistId,
    name: String,
    kind: InstanceKind,
    view_name: Option<String>,
    conns: Vec<PendingConn>,
    attrs: Vec<(String, String)>,
    src: Option<String>,
}

/// Parses text produced by [`write_graph`] back into a database. Multiple
/// dumps can be merged into one database by calling this repeatedly.
pub fn parse_graph(db: &mut NetlistDb, input: &str) -> Result<(), DumpError> {
    #[derive(Clone, Copy)]
    enum Target {
        Netlist(NetlistId),
        Net(NetId),
        Inst(usize),
        None,
    }

    let mut current: Option<NetlistId> = None;
    let mut target = Target::None;
    let mut pending_insts: Vec<PendingInst> = Vec::new();

    for (lineno, raw) in input.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens = tokenize(line, lineno)?;
        let keyword = tokens[0].as_str();

        match keyword {
            "netlist" => {
                let name = tokens
                    .get(1)
                    .ok_or_else(|| parse_err(lineno, "netlist needs a name"))?;
                let id = db.add_netlist(name);
                for flag in &tokens[2..] {
                    match flag.as_str() {
                        "operator" => db.netlist_mut(id).is_operator = true,
                        "blackbox" => db.netlist_mut(id).is_black_box = true,
                        "signed" => db.netlist_mut(id).is_signed = true,
                        other => return Err(parse_err(lineno, format!("unknown flag {}", other))),
                    }
                }
                current = Some(id);
                target = Target::Netlist(id);
            }
            "end" => {
                current = None;
                target = Target::None;
            }
            "attr" | "src" => {
                let apply = |attrs: &mut std::collections::BTreeMap<String, String>,
                             src: &mut Option<String>|
                 -> Result<(), DumpError> {
                    if keyword == "src" {
                        *src = Some(
                            tokens
                                .get(1)
                                .ok_or_else(|| parse_err(lineno, "src needs a value"))?
                                .clone(),
                        );
                    } else {
                        let key = tokens
                            .get(1)
                            .ok_or_else(|| parse_err(lineno, "attr needs a key"))?;
                        let value = tokens
                            .get(2)
                            .ok_or_else(|| parse_err(lineno, "attr needs a value"))?;
                        attrs.insert(key.clone(), value.clone());
                    }
                    Ok(())
                };
                match target {
                    Target::Netlist(id) => {
                        let nl = db.netlist_mut(id);
                        apply(&mut nl.attributes, &mut nl.src)?;
                    }
                    Target::Net(id) => {
                        let net = db.net_mut(id);
                        apply(&mut net.attributes, &mut net.src)?;
                    }
                    Target::Inst(i) => {
                        let inst = &mut pending_insts[i];
                        if keyword == "src" {
                            inst.src = Some(tokens[1].clone());
                        } else {
                            inst.attrs.push((tokens[1].clone(), tokens[2].clone()));
                        }
                    }
                    Target::None => {
                        return Err(parse_err(lineno, "attribute outside any object"))
                    }
                }
            }
            "net" => {
                let owner =
                    current.ok_or_else(|| parse_err(lineno, "net outside a netlist block"))?;
                let name = tokens
                    .get(1)
                    .ok_or_else(|| parse_err(lineno, "net needs a name"))?;
                let id = db.add_net(owner, name);
                let mut ram: Option<RamInfo> = None;
                for token in &tokens[2..] {
                    if token == "ground" {
                        db.net_mut(id).kind = NetKind::Ground;
                    } else if token == "power" {
                        db.net_mut(id).kind = NetKind::Power;
                    } else if token == "freeconst" {
                        db.net_mut(id).free_const = true;
                    } else if token == "freeseq" {
                        db.net_mut(id).free_seq = true;
                    } else if token == "ram" {
                        ram.get_or_insert_with(RamInfo::default);
                    } else if let Some((key, value)) = token.split_once('=') {
                        match key {
                            "width" => {
                                db.net_mut(id).width = value
                                    .parse()
                                    .map_err(|_| parse_err(lineno, "bad width"))?
                            }
                            "init" => db.net_mut(id).initial = Some(value == "1"),
                            "raminit" => {
                                ram.get_or_insert_with(RamInfo::default).init =
                                    Some(value.to_string())
                            }
                            "range" => {
                                let (left, right) = value
                                    .split_once(':')
                                    .ok_or_else(|| parse_err(lineno, "bad range"))?;
                                let left =
                                    left.parse().map_err(|_| parse_err(lineno, "bad range"))?;
                                let right =
                                    right.parse().map_err(|_| parse_err(lineno, "bad range"))?;
                                ram.get_or_insert_with(RamInfo::default).range =
                                    Some((left, right));
                            }
                            other => {
                                return Err(parse_err(
                                    lineno,
                                    format!("unknown net field {}", other),
                                ))
                            }
                        }
                    } else {
                        return Err(parse_err(lineno, format!("unknown net flag {}", token)));
                    }
                }
                db.net_mut(id).ram = ram;
                target = Target::Net(id);
            }
            "netbus" => {
                let owner =
                    current.ok_or_else(|| parse_err(lineno, "netbus outside a netlist block"))?;
                if tokens.len() < 5 || tokens[4] != "members" {
                    return Err(parse_err(lineno, "malformed netbus line"));
                }
                let left: i64 = tokens[2]
                    .parse()
                    .map_err(|_| parse_err(lineno, "bad bus bound"))?;
                let right: i64 = tokens[3]
                    .parse()
                    .map_err(|_| parse_err(lineno, "bad bus bound"))?;
                let mut members = Vec::new();
                for token in &tokens[5..] {
                    if token == "-" {
                        members.push(None);
                    } else {
                        let net = db.find_net(owner, token).ok_or_else(|| {
                            parse_err(lineno, format!("unknown net {}", token))
                        })?;
                        members.push(Some(net));
                    }
                }
                db.add_net_bus(owner, &tokens[1], left, right, members);
                target = Target::None;
            }
            "port" => {
                let owner =
                    current.ok_or_else(|| parse_err(lineno, "port outside a netlist block"))?;
                let dir = match tokens.get(2).map(String::as_str) {
                    Some("input") => Direction::Input,
                    Some("output") => Direction::Output,
                    Some("inout") => Direction::Inout,
                    _ => return Err(parse_err(lineno, "port needs a direction")),
                };
                let id = db.add_port(owner, &tokens[1], dir);
                for token in &tokens[3..] {
                    if let Some(("net", value)) = token.split_once('=').map(|(k, v)| (k, v)) {
                        let net = db
                            .find_net(owner, value)
                            .ok_or_else(|| parse_err(lineno, format!("unknown net {}", value)))?;
                        db.connect_port(id, net);
                    } else {
                        return Err(parse_err(lineno, format!("unknown port field {}", token)));
                    }
                }
                target = Target::None;
            }
            "portbus" => {
                let owner =
                    current.ok_or_else(|| parse_err(lineno, "portbus outside a netlist block"))?;
                if tokens.len() < 6 || tokens[5] != "nets" {
                    return Err(parse_err(lineno, "malformed portbus line"));
                }
                let dir = match tokens[2].as_str() {
                    "input" => Direction::Input,
                    "output" => Direction::Output,
                    "inout" => Direction::Inout,
                    other => {
                        return Err(parse_err(lineno, format!("bad direction {}", other)))
                    }
                };
                let left: i64 = tokens[3]
                    .parse()
                    .map_err(|_| parse_err(lineno, "bad bus bound"))?;
                let right: i64 = tokens[4]
                    .parse()
                    .map_err(|_| parse_err(lineno, "bad bus bound"))?;
                let bus = db.add_port_bus(owner, &tokens[1], dir, left, right);
                let member_ports = db.port_bus(bus).ports.clone();
                for (pos, token) in tokens[6..].iter().enumerate() {
                    if token == "-" {
                        continue;
                    }
                    let net = db
                        .find_net(owner, token)
                        .ok_or_else(|| parse_err(lineno, format!("unknown net {}", token)))?;
                    let port = *member_ports.get(pos).ok_or_else(|| {
                        parse_err(lineno, "more member nets than bus positions")
                    })?;
                    db.connect_port(port, net);
                }
                target = Target::None;
            }
            "inst" => {
                let owner =
                    current.ok_or_else(|| parse_err(lineno, "inst outside a netlist block"))?;
                let name = tokens
                    .get(1)
                    .ok_or_else(|| parse_err(lineno, "inst needs a name"))?;
                let kind_name = tokens
                    .get(2)
                    .ok_or_else(|| parse_err(lineno, "inst needs a kind"))?;
                let kind = InstanceKind::from_name(kind_name)
                    .ok_or_else(|| parse_err(lineno, format!("unknown kind {}", kind_name)))?;
                let mut view_name = None;
                for token in &tokens[3..] {
                    match token.split_once('=') {
                        Some(("view", value)) => view_name = Some(value.to_string()),
                        _ => {
                            return Err(parse_err(
                                lineno,
                                format!("unknown inst field {}", token),
                            ))
                        }
                    }
                }
                pending_insts.push(PendingInst {
                    line: lineno,
                    owner,
                    name: name.clone(),
                    kind,
                    view_name,
                    conns: Vec::new(),
                    attrs: Vec::new(),
                    src: None,
                });
                target = Target::Inst(pending_insts.len() - 1);
            }
            "conn" => {
                let inst = match target {
                    Target::Inst(i) => &mut pending_insts[i],
                    _ => return Err(parse_err(lineno, "conn outside an instance")),
                };
                let slot_kind = tokens
                    .get(1)
                    .ok_or_else(|| parse_err(lineno, "conn needs a slot"))?
                    .clone();
                let (index, generic_port, rest) = match slot_kind.as_str() {
                    "input" | "input1" | "input2" | "output" | "set" | "reset" => {
                        let index: usize = tokens
                            .get(2)
                            .and_then(|t| t.parse().ok())
                            .ok_or_else(|| parse_err(lineno, "conn needs a bit index"))?;
                        (Some(index), None, 3)
                    }
                    "control" | "clock" | "cin" | "cout" => (None, None, 2),
                    "generic" => {
                        let port = tokens
                            .get(2)
                            .ok_or_else(|| parse_err(lineno, "generic conn needs a port"))?;
                        (None, Some(port.clone()), 3)
                    }
                    other => return Err(parse_err(lineno, format!("unknown slot {}", other))),
                };
                let net_owner = tokens
                    .get(rest)
                    .ok_or_else(|| parse_err(lineno, "conn needs an owner netlist"))?;
                let net_name = tokens
                    .get(rest + 1)
                    .ok_or_else(|| parse_err(lineno, "conn needs a net"))?;
                inst.conns.push(PendingConn {
                    line: lineno,
                    slot_kind,
                    index,
                    generic_port,
                    net_owner: net_owner.clone(),
                    net_name: net_name.clone(),
                });
            }
            other => return Err(parse_err(lineno, format!("unknown keyword {}", other))),
        }
    }

    // Second pass: instances and their connections, now that every netlist
    // and net exists.
    let mut nets_by_name: HashMap<(String, String), NetId> = HashMap::new();
    for (idx, net) in db.nets.iter().enumerate() {
        let owner = db.netlist(net.owner).name.clone();
        nets_by_name.insert((owner, net.name.clone()), NetId(idx));
    }

    for pending in pending_insts {
        let view = match &pending.view_name {
            Some(name) => Some(db.find_netlist(name).ok_or_else(|| {
                parse_err(pending.line, format!("unknown view netlist {}", name))
            })?),
            None => None,
        };
        let inst = db.add_instance(pending.owner, &pending.name, pending.kind, view);
        for (key, value) in pending.attrs {
            db.inst_mut(inst).attributes.insert(key, value);
        }
        db.inst_mut(inst).src = pending.src;
        for conn in pending.conns {
            let net = *nets_by_name
                .get(&(conn.net_owner.clone(), conn.net_name.clone()))
                .ok_or_else(|| {
                    parse_err(
                        conn.line,
                        format!("unknown net {}.{}", conn.net_owner, conn.net_name),
                    )
                })?;
            match conn.slot_kind.as_str() {
                "input" => db.connect(inst, ConnSlot::Input(conn.index.unwrap()), net),
                "input1" => db.connect(inst, ConnSlot::Input1(conn.index.unwrap()), net),
                "input2" => db.connect(inst, ConnSlot::Input2(conn.index.unwrap()), net),
                "output" => db.connect(inst, ConnSlot::Output(conn.index.unwrap()), net),
                "set" => db.connect(inst, ConnSlot::Set(conn.index.unwrap()), net),
                "reset" => db.connect(inst, ConnSlot::Reset(conn.index.unwrap()), net),
                "control" => db.connect(inst, ConnSlot::Control, net),
                "clock" => db.connect(inst, ConnSlot::Clock, net),
                "cin" => db.connect(inst, ConnSlot::CarryIn, net),
                "cout" => db.connect(inst, ConnSlot::CarryOut, net),
                "generic" => {
                    let view = view.ok_or_else(|| {
                        parse_err(conn.line, "generic connection on an instance without a view")
                    })?;
                    let port_name = conn.generic_port.as_deref().unwrap();
                    let port = db.find_port(view, port_name).ok_or_else(|| {
                        parse_err(conn.line, format!("unknown view port {}", port_name))
                    })?;
                    db.connect_generic(inst, port, net);
                }
                _ => unreachable!("slot kinds validated in the first pass"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_graph, write_graph};
    use crate::netlist::{ConnSlot, Direction, InstanceKind, NetlistDb, RamInfo};

    fn round_trip(db: &NetlistDb) -> NetlistDb {
        let mut text = Vec::new();
        write_graph(db, &mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        let mut out = NetlistDb::new();
        parse_graph(&mut out, &text).unwrap();
        out
    }

    #[test]
    fn round_trips_nets_ports_and_instances() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let a = db.add_net(top, "a");
        let b = db.add_net(top, "b");
        let y = db.add_net(top, "y");
        let pa = db.add_port(top, "a", Direction::Input);
        db.connect_port(pa, a);
        let inst = db.add_instance(top, "u0", InstanceKind::And, None);
        db.connect(inst, ConnSlot::Input1(0), a);
        db.connect(inst, ConnSlot::Input2(0), b);
        db.connect(inst, ConnSlot::Output(0), y);

        let copy = round_trip(&db);
        let top2 = copy.find_netlist("top").unwrap();
        assert_eq!(copy.netlist(top2).nets.len(), 3);
        assert_eq!(copy.netlist(top2).ports.len(), 1);
        let inst2 = copy.netlist(top2).insts[0];
        assert_eq!(copy.inst(inst2).kind, InstanceKind::And);
        assert_eq!(
            copy.net(copy.inst(inst2).get_input1().unwrap()).name,
            "a"
        );
    }

    #[test]
    fn round_trips_ram_marking_and_buses() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let mem = db.add_wide_net(top, "mem", 64);
        db.net_mut(mem).ram = Some(RamInfo {
            init: Some("8'b00000001".to_string()),
            range: Some((7, 0)),
        });
        let d0 = db.add_net(top, "d0");
        let d1 = db.add_net(top, "d1");
        db.add_net_bus(top, "d", 1, 0, vec![Some(d1), Some(d0)]);

        let copy = round_trip(&db);
        let top2 = copy.find_netlist("top").unwrap();
        let mem2 = copy.find_net(top2, "mem").unwrap();
        assert_eq!(copy.net(mem2).width, 64);
        let ram = copy.net(mem2).ram.as_ref().unwrap();
        assert_eq!(ram.init.as_deref(), Some("8'b00000001"));
        assert_eq!(ram.range, Some((7, 0)));
        let bus = copy.net_bus(copy.netlist(top2).net_buses[0]);
        assert_eq!(bus.left, 1);
        assert_eq!(copy.net(bus.nets[1].unwrap()).name, "d0");
    }

    #[test]
    fn round_trips_cross_netlist_references() {
        let mut db = NetlistDb::new();
        let top = db.add_netlist("top");
        let leaf = db.add_netlist("leaf");
        db.add_instance(top, "l0", InstanceKind::SubModule, Some(leaf));
        let deep = db.add_net(leaf, "deep");
        let y = db.add_net(top, "y");
        let buf = db.add_instance(top, "b0", InstanceKind::Buf, None);
        db.connect(buf, ConnSlot::Input(0), deep);
        db.connect(buf, ConnSlot::Output(0), y);

        let copy = round_trip(&db);
        let top2 = copy.find_netlist("top").unwrap();
        let leaf2 = copy.find_netlist("leaf").unwrap();
        let buf2 = copy.netlist(top2).insts[1];
        let in_net = copy.inst(buf2).get_input().unwrap();
        assert_eq!(copy.net(in_net).owner, leaf2);
    }
}

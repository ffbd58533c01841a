// SPDX-License-Identifier: Apache-2.0

//! Memory inference: geometry is derived from the access ports attached to
//! a RAM-backing net, never declared. The packed initial-value string is
//! decoded into per-word initializer records.

use std::collections::BTreeMap;

use crate::error::ImportError;
use crate::import::{req, ModuleImporter};
use crate::ir::{CellKind, CellPort, Memory, SigBit, SigSpec, State};
use crate::netlist::{InstanceKind, NetId};

/// Decodes `<width>'b<bits>` strictly left to right in width-sized windows,
/// one per word. Windows containing no defined bit yield no record. The
/// word-to-address mapping reverses when the backing range is descending.
fn decode_memory_init(
    ascii: &str,
    width: usize,
    size: usize,
    ascending: bool,
) -> BTreeMap<usize, Vec<State>> {
    let mut records = BTreeMap::new();
    let mut chars = ascii.chars().peekable();

    // Skip the leading size marker up to and including the quote.
    while let Some(&c) = chars.peek() {
        chars.next();
        if c == '\'' {
            break;
        }
    }
    match chars.peek() {
        Some('b') => {
            chars.next();
        }
        Some(radix) => {
            log::warn!("unsupported radix '{}' in memory initializer", radix);
            return records;
        }
        None => return records,
    }

    for word_idx in 0..size {
        let mut word = vec![State::Sx; width];
        let mut valid = false;
        for bit_idx in (0..width).rev() {
            match chars.next() {
                None => break,
                Some('0') => {
                    word[bit_idx] = State::S0;
                    valid = true;
                }
                Some('1') => {
                    word[bit_idx] = State::S1;
                    valid = true;
                }
                Some(_) => {}
            }
        }
        if valid {
            let addr = if ascending {
                word_idx
            } else {
                size - word_idx - 1
            };
            records.insert(addr, word);
        }
    }
    records
}

impl ModuleImporter<'_> {
    /// Creates the memory backing `net_id`. Word width is the minimum over
    /// all attached access-port widths; any other attached instance kind is
    /// fatal.
    pub(crate) fn infer_memory(&mut self, net_id: NetId) -> Result<(), ImportError> {
        let db = self.db;
        let net = db.net(net_id);
        let ram = net.ram.as_ref().expect("net is not RAM-backing");
        assert!(
            !self.module.memories.contains_key(&net.name),
            "duplicate memory name '{}'",
            net.name
        );

        let number_of_bits = net.width;
        let mut bits_in_word = number_of_bits;
        for &(inst_id, _) in &net.portrefs {
            let inst = db.inst(inst_id);
            match inst.kind {
                InstanceKind::ReadPort => {
                    bits_in_word = bits_in_word.min(inst.output.len());
                }
                InstanceKind::WritePort | InstanceKind::ClockedWritePort => {
                    bits_in_word = bits_in_word.min(inst.input2.len());
                }
                _ => {
                    return Err(ImportError::MemoryPortKind {
                        net: net.name.clone(),
                        instance: inst.name.clone(),
                        kind: inst.kind.name(),
                    })
                }
            }
        }

        let size = number_of_bits / bits_in_word;
        let ascending = ram.range.map(|(left, right)| left < right).unwrap_or(true);
        let init = match &ram.init {
            Some(ascii) => decode_memory_init(ascii, bits_in_word, size, ascending),
            None => BTreeMap::new(),
        };

        self.module.memories.insert(
            net.name.clone(),
            Memory {
                name: net.name.clone(),
                width: bits_in_word,
                size,
                init,
            },
        );
        Ok(())
    }

    /// Read port: an unclocked read cell with clock and enable unbound.
    pub(crate) fn import_read_port(&mut self, inst_id: crate::netlist::InstId) -> Result<(), ImportError> {
        let db = self.db;
        let inst = db.inst(inst_id);
        let ram_net = req(inst.get_input(), &inst.name, "input");
        let mem_name = db.net(ram_net).name.clone();
        let mem_width = self
            .module
            .memories
            .get(&mem_name)
            .unwrap_or_else(|| panic!("no memory '{}' for read port '{}'", mem_name, inst.name))
            .width;
        if mem_width != inst.output.len() {
            return Err(ImportError::AsymmetricMemory {
                instance: inst.name.clone(),
                memory: mem_name,
                port_width: inst.output.len(),
                memory_width: mem_width,
            });
        }

        let addr = self.role_sigspec(&inst.input1)?;
        let data = self.operator_output(&inst.output)?;
        self.module.add_cell(
            inst.name.clone(),
            CellKind::MemRead {
                memid: mem_name,
                clk_enable: false,
                clk_polarity: true,
                transparent: false,
            },
            vec![
                (CellPort::Clk, SigBit::Const(State::Sx).into()),
                (CellPort::En, SigBit::Const(State::Sx).into()),
                (CellPort::Addr, addr),
                (CellPort::Data, data),
            ],
        );
        Ok(())
    }

    /// Write port: enable replicated over the data width; clocked writes
    /// bind the clock, unclocked writes tie it to constant-0.
    pub(crate) fn import_write_port(&mut self, inst_id: crate::netlist::InstId) -> Result<(), ImportError> {
        let db = self.db;
        let inst = db.inst(inst_id);
        let ram_net = req(inst.get_output(), &inst.name, "output");
        let mem_name = db.net(ram_net).name.clone();
        let mem_width = self
            .module
            .memories
            .get(&mem_name)
            .unwrap_or_else(|| panic!("no memory '{}' for write port '{}'", mem_name, inst.name))
            .width;
        if mem_width != inst.input2.len() {
            return Err(ImportError::AsymmetricMemory {
                instance: inst.name.clone(),
                memory: mem_name,
                port_width: inst.input2.len(),
                memory_width: mem_width,
            });
        }

        let addr = self.role_sigspec(&inst.input1)?;
        let data = self.role_sigspec(&inst.input2)?;
        let en_bit = self.resolve(req(inst.control, &inst.name, "control"))?;
        let en = SigSpec::repeat(en_bit, data.len());

        let clocked = inst.kind == InstanceKind::ClockedWritePort;
        let clk: SigSpec = if clocked {
            self.resolve(req(inst.clock, &inst.name, "clock"))?.into()
        } else {
            SigBit::Const(State::S0).into()
        };

        self.module.add_cell(
            inst.name.clone(),
            CellKind::MemWrite {
                memid: mem_name,
                clk_enable: clocked,
                clk_polarity: true,
                priority: 0,
            },
            vec![
                (CellPort::Clk, clk),
                (CellPort::En, en),
                (CellPort::Addr, addr),
                (CellPort::Data, data),
            ],
        );
        Ok(())
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Fatal conditions raised during import. Every variant aborts the whole
//! run; there is no local recovery. The input graph is assumed consistent
//! except for the patterns enumerated here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    /// A net referenced by an instance is not owned by the netlist under
    /// import. Pre-flattening or external-net resolution removes these.
    #[error(
        "found external reference to '{owner}.{net}' in netlist '{netlist}'; \
         use pre-flattening or external-net resolution"
    )]
    ExternalReference {
        net: String,
        owner: String,
        netlist: String,
    },

    /// A translated instance's structural precondition is violated (e.g.
    /// right-shift carry wiring, comparison carry encoding).
    #[error("cannot translate {kind} instance '{instance}': {reason}")]
    UnsupportedPattern {
        instance: String,
        kind: &'static str,
        reason: String,
    },

    /// An access port's width disagrees with the inferred common word width
    /// of its memory.
    #[error(
        "access port '{instance}' has width {port_width} but memory '{memory}' \
         has word width {memory_width}"
    )]
    AsymmetricMemory {
        instance: String,
        memory: String,
        port_width: usize,
        memory_width: usize,
    },

    /// A RAM-backing net is attached to something other than a read or
    /// write port.
    #[error("memory net '{net}' is connected to unsupported {kind} instance '{instance}'")]
    MemoryPortKind {
        net: String,
        instance: String,
        kind: &'static str,
    },

    /// Strict-mode failure for an instance neither translation table knows.
    /// Permissive mode degrades this to a warning plus a black-box
    /// placeholder.
    #[error("unsupported {kind} primitive '{instance}'")]
    UnsupportedPrimitive {
        instance: String,
        kind: &'static str,
    },

    /// A newly discovered user module collides with a previously imported
    /// non-operator module.
    #[error("re-definition of module '{module}'")]
    Redefinition { module: String },
}

//! Binding errors.
//!
//! A binding error is a programming error by default: callers outside the
//! router treat it as fatal. Inside the router's inner loops it is a signal
//! to back off and rip up; the error carries the names of both parties so
//! the rip-up path (and the final diagnostic) can name them.

/// Errors from Context mutation calls.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// A cell with this name already exists.
    #[error("cell already exists: {name}")]
    CellExists {
        /// The duplicated cell name.
        name: String,
    },

    /// A net with this name already exists.
    #[error("net already exists: {name}")]
    NetExists {
        /// The duplicated net name.
        name: String,
    },

    /// The referenced cell or net id is dead or unknown.
    #[error("unknown {kind}: {name}")]
    Unknown {
        /// "cell" or "net".
        kind: &'static str,
        /// The name or raw id.
        name: String,
    },

    /// The cell has no port with the given name.
    #[error("cell {cell} has no port {port}")]
    UnknownPort {
        /// The cell name.
        cell: String,
        /// The missing port name.
        port: String,
    },

    /// The port is already connected to a net.
    #[error("port {cell}.{port} is already connected to net {net}")]
    PortConnected {
        /// The cell name.
        cell: String,
        /// The port name.
        port: String,
        /// The net it is connected to.
        net: String,
    },

    /// A second driver was connected to a net.
    #[error("net {net} already driven by {existing}, cannot add driver {attempted}")]
    SecondDriver {
        /// The net name.
        net: String,
        /// The existing driver, as `cell.port`.
        existing: String,
        /// The rejected driver, as `cell.port`.
        attempted: String,
    },

    /// The bel is already bound to another cell.
    #[error("bel {bel} already bound to cell {cell}")]
    BelBound {
        /// The bel name.
        bel: String,
        /// The occupying cell name.
        cell: String,
    },

    /// The bel is not bound.
    #[error("bel {bel} is not bound")]
    BelNotBound {
        /// The bel name.
        bel: String,
    },

    /// The cell is already placed on another bel.
    #[error("cell {cell} already placed at {bel}")]
    CellPlaced {
        /// The cell name.
        cell: String,
        /// Its current bel name.
        bel: String,
    },

    /// The wire is already bound to another net.
    #[error("wire {wire} already bound to net {net}")]
    WireBound {
        /// The wire name.
        wire: String,
        /// The occupying net name.
        net: String,
    },

    /// The wire is not bound.
    #[error("wire {wire} is not bound")]
    WireNotBound {
        /// The wire name.
        wire: String,
    },

    /// The pip is already bound to another net.
    #[error("pip {pip} already bound to net {net}")]
    PipBound {
        /// The pip name.
        pip: String,
        /// The occupying net name.
        net: String,
    },

    /// The pip is not bound.
    #[error("pip {pip} is not bound")]
    PipNotBound {
        /// The pip name.
        pip: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_driver_names_both() {
        let err = BindError::SecondDriver {
            net: "data".into(),
            existing: "lut_0.O".into(),
            attempted: "lut_1.O".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lut_0.O"));
        assert!(msg.contains("lut_1.O"));
        assert!(msg.contains("data"));
    }

    #[test]
    fn wire_bound_message() {
        let err = BindError::WireBound {
            wire: "X0Y0/local_2".into(),
            net: "clk".into(),
        };
        assert_eq!(
            err.to_string(),
            "wire X0Y0/local_2 already bound to net clk"
        );
    }
}

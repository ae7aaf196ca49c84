//! The router: a pip tree for every net.
//!
//! Routing is negotiated congestion over real bindings: each net is routed
//! with A* through the pip graph, stealing occupied wires only at a penalty
//! that ratchets up as iterations pass; the victims are ripped up and
//! requeued. Convergence means every wire has a single owner — which the
//! binding discipline then guarantees structurally. After convergence the
//! crossbar fix-up normalizes redundant mux selections and the post-route
//! pass reifies route-throughs, applies LUT pin permutations, and prunes
//! dead branches.

#![warn(missing_docs)]

pub mod crossbar;
pub mod postroute;
pub mod router;

pub use router::{route, RouteError};

#[cfg(test)]
mod tests {
    use kestrel_arch::ScampArch;
    use kestrel_common::constids;
    use kestrel_context::{verify, CancelToken, Context};
    use kestrel_diagnostics::DiagnosticSink;
    use kestrel_netlist::PortDir;

    /// Full mini-flow: place and route a two-LUT design, then verify the
    /// §8 invariants and post-route reachability.
    #[test]
    fn place_and_route_two_luts() {
        let arch = ScampArch::new(4, 4);
        let mut ctx = Context::new(arch.build_chipdb());

        let a = ctx.create_cell(ctx.id("a"), constids::LUT4).unwrap();
        ctx.design.cells[a].add_port(constids::O, PortDir::Out);
        let b = ctx.create_cell(ctx.id("b"), constids::LUT4).unwrap();
        ctx.design.cells[b].add_port(constids::I0, PortDir::In);
        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::O, net).unwrap();
        ctx.connect(b, constids::I0, net).unwrap();

        let sink = DiagnosticSink::new();
        let cancel = CancelToken::new();
        kestrel_place::place(&mut ctx, &arch, 1, &cancel, &sink).unwrap();
        crate::route(&mut ctx, &arch, &cancel, &sink).unwrap();

        assert!(!ctx.design.nets[net].wires.is_empty());
        verify::assert_valid(&ctx);
        assert!(verify::check_routing(&ctx).is_empty());
    }
}

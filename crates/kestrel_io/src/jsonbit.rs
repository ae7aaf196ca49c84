//! JSON bitstream writer.
//!
//! Emits `{instances, nets, setup}`: one instance record per placed cell
//! (site, bel, parameters), one entry per routed net holding the sorted set
//! of traversed pip strings `"SRC_TILE:src_wire->DST_TILE:dst_wire"`, and a
//! setup header naming the device variant and the I/O banks in use.

use kestrel_context::Context;
use serde_json::{json, Map, Value};

/// Builds the JSON bitstream document for the current design.
pub fn write_json_bitstream(ctx: &Context) -> Value {
    let mut instances = Map::new();
    let mut iobanks: Vec<String> = Vec::new();

    let mut cell_ids: Vec<_> = ctx.design.cells.ids().collect();
    cell_ids.sort_unstable();
    for id in cell_ids {
        let cell = &ctx.design.cells[id];
        let Some(bel) = cell.bel else { continue };
        let tile = &ctx.chip().tiles[bel.tile_index()];
        let site = format!("X{}Y{}", tile.x, tile.y);

        let mut params = Map::new();
        let mut keys: Vec<_> = cell.params.keys().copied().collect();
        keys.sort_unstable();
        for key in keys {
            params.insert(
                ctx.str_of(key).to_string(),
                Value::String(cell.params[&key].to_string()),
            );
        }

        if ctx.chip().tile_type(bel.tile_index()).name == "IO" {
            let bank = if tile.y == 0 {
                "south"
            } else if tile.y == ctx.chip().height - 1 {
                "north"
            } else if tile.x == 0 {
                "west"
            } else {
                "east"
            };
            if !iobanks.iter().any(|b| b == bank) {
                iobanks.push(bank.to_string());
            }
        }

        instances.insert(
            ctx.cell_name(id),
            json!({
                "site": site,
                "bel": ctx.chip().bel_data(bel).name,
                "type": ctx.str_of(cell.kind),
                "params": Value::Object(params),
            }),
        );
    }

    let mut nets = Map::new();
    let mut net_ids: Vec<_> = ctx.design.nets.ids().collect();
    net_ids.sort_unstable();
    for id in net_ids {
        let net = &ctx.design.nets[id];
        let mut pips: Vec<String> = Vec::new();
        for binding in net.wires.values() {
            if let Some(pip) = binding.pip {
                let src = ctx.chip().pip_src_wire(pip);
                let dst = ctx.chip().pip_dst_wire(pip);
                pips.push(format!(
                    "{}->{}",
                    wire_endpoint(ctx, src),
                    wire_endpoint(ctx, dst)
                ));
            }
        }
        if pips.is_empty() {
            continue;
        }
        pips.sort();
        nets.insert(ctx.net_name(id), json!(pips));
    }

    iobanks.sort();
    json!({
        "instances": Value::Object(instances),
        "nets": Value::Object(nets),
        "setup": {
            "variant": ctx.chip().name,
            "iobanks": iobanks,
        },
    })
}

/// Formats a wire endpoint as `TILE:wire` using its representative member.
fn wire_endpoint(ctx: &Context, wire: kestrel_chipdb::WireId) -> String {
    // `X2Y3/sp_h_e_0` becomes `X2Y3:sp_h_e_0`.
    ctx.chip().wire_name(wire).replacen('/', ":", 1)
}

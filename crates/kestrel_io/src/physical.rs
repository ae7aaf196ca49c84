//! Physical-netlist writer.
//!
//! Emits one structured record per placed cell (site, two-level bel name,
//! pin map, strength), one per routed net (the source plus a recursive
//! branch tree of pip / bel-pin actions), and one instance record per
//! occupied site. The same records read back with
//! [`read_physical_netlist`]; structure and bindings survive the trip even
//! though internal ids do not.

use kestrel_context::Context;
use kestrel_netlist::{NetId, Strength};
use kestrel_chipdb::WireId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Errors from writing or reading physical netlists.
#[derive(Debug, thiserror::Error)]
pub enum PhysError {
    /// File I/O failed.
    #[error("physical netlist I/O failed at {path}: {source}")]
    Io {
        /// The file involved.
        path: std::path::PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The file is not a valid physical netlist.
    #[error("physical netlist parse failed at {path}: {reason}")]
    Parse {
        /// The file involved.
        path: std::path::PathBuf,
        /// What was wrong.
        reason: String,
    },
}

/// One placed cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCell {
    /// Cell name.
    pub name: String,
    /// Cell kind.
    pub kind: String,
    /// The site (tile) hosting the cell, e.g. `X2Y3`.
    pub site: String,
    /// Two-level bel name: `(site type, bel)`.
    pub bel: (String, String),
    /// Logical pin → bel pin assignments.
    pub pins: BTreeMap<String, String>,
    /// Binding strength, lowercased.
    pub strength: String,
}

/// One step of a routed net's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchAction {
    /// Enter the tree at a bel pin (the driver side).
    BelPin {
        /// Bel name.
        bel: String,
        /// Pin name.
        pin: String,
    },
    /// Traverse a pip.
    Pip {
        /// Device-local pip name.
        name: String,
    },
    /// Arrive at a site pin.
    SitePin {
        /// Site name.
        site: String,
        /// Pin name.
        pin: String,
    },
}

/// A recursive branch of a routed net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteBranch {
    /// The action taken at this step.
    pub action: BranchAction,
    /// Downstream branches.
    pub children: Vec<RouteBranch>,
}

/// One routed net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedNet {
    /// Net name.
    pub name: String,
    /// The net's source branches (one per root wire).
    pub sources: Vec<RouteBranch>,
}

/// One occupied site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInstance {
    /// Site name.
    pub site: String,
    /// Site (tile) type.
    pub site_type: String,
    /// Cells placed in this site.
    pub cells: Vec<String>,
}

/// A complete physical netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalNetlist {
    /// The device the design targets.
    pub device: String,
    /// Placed cells, in name order.
    pub cells: Vec<PlacedCell>,
    /// Routed nets, in name order.
    pub nets: Vec<RoutedNet>,
    /// Occupied sites, in name order.
    pub sites: Vec<SiteInstance>,
}

/// Builds the physical netlist records from the current design.
pub fn write_physical_netlist(ctx: &Context) -> PhysicalNetlist {
    let mut cells = Vec::new();
    let mut site_cells: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();

    for (id, cell) in ctx.design.cells.iter() {
        let Some(bel) = cell.bel else { continue };
        let tile = &ctx.chip().tiles[bel.tile_index()];
        let site = format!("X{}Y{}", tile.x, tile.y);
        let site_type = ctx.chip().tile_type(bel.tile_index()).name.clone();
        let bel_data = ctx.chip().bel_data(bel);

        let mut pins = BTreeMap::new();
        if let Some(map) = &cell.pin_map {
            for (&logical, &phys) in &map.pins {
                pins.insert(
                    ctx.str_of(logical).to_string(),
                    ctx.str_of(phys).to_string(),
                );
            }
        }

        let name = ctx.cell_name(id);
        site_cells
            .entry(site.clone())
            .or_insert_with(|| (site_type.clone(), Vec::new()))
            .1
            .push(name.clone());
        cells.push(PlacedCell {
            name,
            kind: ctx.str_of(cell.kind).to_string(),
            site,
            bel: (site_type, bel_data.name.clone()),
            pins,
            strength: strength_name(cell.bel_strength).to_string(),
        });
    }
    cells.sort_by(|a, b| a.name.cmp(&b.name));

    let mut nets = Vec::new();
    for (id, net) in ctx.design.nets.iter() {
        if net.wires.is_empty() {
            continue;
        }
        nets.push(RoutedNet {
            name: ctx.net_name(id),
            sources: net_branches(ctx, id),
        });
    }
    nets.sort_by(|a, b| a.name.cmp(&b.name));

    let sites = site_cells
        .into_iter()
        .map(|(site, (site_type, mut cells))| {
            cells.sort();
            SiteInstance {
                site,
                site_type,
                cells,
            }
        })
        .collect();

    PhysicalNetlist {
        device: ctx.chip().name.clone(),
        cells,
        nets,
        sites,
    }
}

fn strength_name(strength: Strength) -> &'static str {
    match strength {
        Strength::None => "none",
        Strength::Weak => "weak",
        Strength::Strong => "strong",
        Strength::Locked => "locked",
        Strength::User => "user",
        Strength::Fixed => "fixed",
    }
}

/// Builds the recursive branch tree of one net from its wire bindings.
fn net_branches(ctx: &Context, net: NetId) -> Vec<RouteBranch> {
    let n = &ctx.design.nets[net];

    // Downstream adjacency: src wire → (pip, dst wire).
    let mut children: HashMap<WireId, Vec<(kestrel_chipdb::PipId, WireId)>> = HashMap::new();
    for (&wire, binding) in &n.wires {
        if let Some(pip) = binding.pip {
            children
                .entry(ctx.chip().pip_src_wire(pip))
                .or_default()
                .push((pip, wire));
        }
    }
    for list in children.values_mut() {
        list.sort_unstable_by_key(|&(pip, _)| pip);
    }

    let Some(root) = n.root_wire() else {
        return Vec::new();
    };

    let driver_action = match n.driver {
        Some(d) => {
            let bel = ctx
                .design
                .cells
                .get(d.cell)
                .and_then(|c| c.bel)
                .map(|b| ctx.chip().bel_name(b))
                .unwrap_or_default();
            BranchAction::BelPin {
                bel,
                pin: ctx.str_of(d.port).to_string(),
            }
        }
        None => BranchAction::SitePin {
            site: String::new(),
            pin: String::new(),
        },
    };

    vec![RouteBranch {
        action: driver_action,
        children: branches_below(ctx, &children, root),
    }]
}

fn branches_below(
    ctx: &Context,
    children: &HashMap<WireId, Vec<(kestrel_chipdb::PipId, WireId)>>,
    wire: WireId,
) -> Vec<RouteBranch> {
    let Some(list) = children.get(&wire) else {
        return Vec::new();
    };
    list.iter()
        .map(|&(pip, dst)| RouteBranch {
            action: BranchAction::Pip {
                name: ctx.chip().pip_name(pip),
            },
            children: branches_below(ctx, children, dst),
        })
        .collect()
}

impl PhysicalNetlist {
    /// Serializes the records as pretty JSON to `path`.
    pub fn save(&self, path: &Path) -> Result<(), PhysError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| PhysError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|source| PhysError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Reads a physical netlist back from `path`.
pub fn read_physical_netlist(path: &Path) -> Result<PhysicalNetlist, PhysError> {
    let text = std::fs::read_to_string(path).map_err(|source| PhysError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| PhysError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_arch::ScampArch;
    use kestrel_chipdb::Loc;
    use kestrel_common::constids;
    use kestrel_netlist::PortDir;

    fn placed_routed_ctx() -> Context {
        let arch = ScampArch::new(4, 4);
        let mut ctx = Context::new(arch.build_chipdb());
        let a = ctx.create_cell(ctx.id("drv"), constids::LUT4).unwrap();
        ctx.design.cells[a].add_port(constids::O, PortDir::Out);
        let bel = ctx.chip().bel_at(Loc::new(1, 1, 0)).unwrap();
        ctx.bind_bel(bel, a, Strength::Strong).unwrap();

        let net = ctx.create_net(ctx.id("n")).unwrap();
        ctx.connect(a, constids::O, net).unwrap();
        // Root on the LUT output, one pip onto a local wire.
        let root = ctx.bel_pin_wire(bel, constids::O).unwrap();
        ctx.bind_wire(root, net, Strength::Strong).unwrap();
        let pip = ctx
            .chip()
            .pips_downhill(root)
            .find(|&p| ctx.check_pip_avail(p))
            .unwrap();
        ctx.bind_pip(pip, net, Strength::Strong).unwrap();
        ctx
    }

    #[test]
    fn records_cover_cells_nets_sites() {
        let ctx = placed_routed_ctx();
        let phys = write_physical_netlist(&ctx);
        assert_eq!(phys.device, "scamp4x4");
        assert_eq!(phys.cells.len(), 1);
        assert_eq!(phys.cells[0].site, "X1Y1");
        assert_eq!(phys.cells[0].bel.0, "LOGIC");
        assert_eq!(phys.cells[0].bel.1, "LC0");
        assert_eq!(phys.nets.len(), 1);
        assert_eq!(phys.sites.len(), 1);
        assert_eq!(phys.sites[0].cells, vec!["drv"]);

        // The net tree starts at the driver bel pin and traverses one pip.
        let source = &phys.nets[0].sources[0];
        assert!(matches!(&source.action, BranchAction::BelPin { pin, .. } if pin == "O"));
        assert_eq!(source.children.len(), 1);
        assert!(matches!(&source.children[0].action, BranchAction::Pip { .. }));
    }

    #[test]
    fn file_roundtrip_preserves_structure() {
        let ctx = placed_routed_ctx();
        let phys = write_physical_netlist(&ctx);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.phys.json");
        phys.save(&path).unwrap();
        let back = read_physical_netlist(&path).unwrap();
        assert_eq!(phys, back);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_physical_netlist(Path::new("/nonexistent/x.json")).unwrap_err();
        assert!(matches!(err, PhysError::Io { .. }));
    }
}

use crate::coords::CoordTable;
use crate::embed::Method;
use crate::vis_common::*;
use plotters::prelude::*;
use std::ops::Range;

const PANEL_PX: u32 = 500;
const TITLE_PX: u32 = 40;
const POINT_SIZE: i32 = 3;

/// One scatter panel: which table to draw, which scalar colors it, and
/// the colormap for that scalar.
struct Panel<'a> {
    title: &'a str,
    table: &'a CoordTable,
    color_column: &'a str,
    colormap: fn(f32) -> RGBColor,
}

///
/// Render one figure for a method: a scatter panel per coloring scheme
/// (time, cluster, and optionally the steady-state subset), all sharing
/// the axis ranges of the full population so the panels are directly
/// comparable. Saves a PNG at `out_file`.
///
pub fn render_figure(
    out_file: &str,
    method: Method,
    dim: usize,
    data_name: &str,
    coords: &CoordTable,
    ss_coords: Option<&CoordTable>,
) -> anyhow::Result<()> {
    let mut panels = vec![
        Panel {
            title: TIME_COLUMN,
            table: coords,
            color_column: TIME_COLUMN,
            colormap: viridis,
        },
        Panel {
            title: CLUSTER_COLUMN,
            table: coords,
            color_column: CLUSTER_COLUMN,
            colormap: spectral,
        },
    ];
    if let Some(ss) = ss_coords {
        panels.push(Panel {
            title: "Cells in Steady-States",
            table: ss,
            color_column: STEADY_STATE_COLUMN,
            colormap: jet,
        });
    }

    // axis limits come from the full population, not the subset
    let limits: Vec<Range<f32>> = (1..=dim)
        .map(|k| {
            let name = format!("{}{}", method.column_label(), k);
            let values = coords
                .column(&name)
                .ok_or_else(|| anyhow::anyhow!("no '{}' column in the coordinate table", name))?;
            Ok(padded_range(values))
        })
        .collect::<anyhow::Result<_>>()?;

    let suptitle = format!(
        "{}: Dimensional Reduction of Simulated Expression Data via {}-D {}",
        data_name,
        dim,
        method.display_name()
    );

    let n_panels = panels.len();
    let width = PANEL_PX * n_panels as u32;
    let root = BitMapBackend::new(out_file, (width, PANEL_PX + TITLE_PX)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&suptitle, ("sans-serif", 20))?;
    let areas = root.split_evenly((1, n_panels));

    for (panel, area) in panels.iter().zip(areas.iter()) {
        if dim == 3 {
            draw_panel_3d(area, panel, method, &limits)?;
        } else {
            draw_panel_2d(area, panel, method, &limits)?;
        }
    }

    root.present()?;
    info!("Saved {}", out_file);
    Ok(())
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, plotters::coord::Shift>;

fn panel_points<'a>(
    panel: &Panel<'a>,
    method: Method,
    dim: usize,
) -> anyhow::Result<(Vec<&'a [f32]>, &'a [f32])> {
    let axes: Vec<&[f32]> = (1..=dim)
        .map(|k| {
            let name = format!("{}{}", method.column_label(), k);
            panel
                .table
                .column(&name)
                .ok_or_else(|| anyhow::anyhow!("no '{}' column for panel '{}'", name, panel.title))
        })
        .collect::<anyhow::Result<_>>()?;
    let colors = panel
        .table
        .column(panel.color_column)
        .ok_or_else(|| anyhow::anyhow!("no '{}' column for panel '{}'", panel.color_column, panel.title))?;
    Ok((axes, colors))
}

fn draw_panel_2d(
    area: &Area<'_>,
    panel: &Panel<'_>,
    method: Method,
    limits: &[Range<f32>],
) -> anyhow::Result<()> {
    let (axes, colors) = panel_points(panel, method, 2)?;

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(limits[0].clone(), limits[1].clone())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(method.axis_label(1))
        .y_desc(method.axis_label(2))
        .draw()?;

    chart.draw_series(colors.iter().enumerate().map(|(i, &c)| {
        Circle::new(
            (axes[0][i], axes[1][i]),
            POINT_SIZE,
            (panel.colormap)(c).filled(),
        )
    }))?;
    Ok(())
}

fn draw_panel_3d(
    area: &Area<'_>,
    panel: &Panel<'_>,
    method: Method,
    limits: &[Range<f32>],
) -> anyhow::Result<()> {
    let (axes, colors) = panel_points(panel, method, 3)?;

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, ("sans-serif", 16))
        .margin(10)
        .build_cartesian_3d(limits[0].clone(), limits[1].clone(), limits[2].clone())?;

    chart.configure_axes().draw()?;

    chart.draw_series(colors.iter().enumerate().map(|(i, &c)| {
        Circle::new(
            (axes[0][i], axes[1][i], axes[2][i]),
            POINT_SIZE,
            (panel.colormap)(c).filled(),
        )
    }))?;
    Ok(())
}

/// Min/max of a coordinate column with 5% padding on both sides
fn padded_range(values: &[f32]) -> Range<f32> {
    let mut lb = f32::INFINITY;
    let mut ub = f32::NEG_INFINITY;
    for &v in values {
        lb = lb.min(v);
        ub = ub.max(v);
    }
    if !lb.is_finite() || !ub.is_finite() {
        return -1.0..1.0;
    }
    let span = ub - lb;
    if span <= 0.0 {
        return (lb - 0.5)..(ub + 0.5);
    }
    (lb - 0.05 * span)..(ub + 0.05 * span)
}

fn ramp(anchors: &[(f32, (u8, u8, u8))], t: f32) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    for pair in anchors.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            let mix = |a: u8, b: u8| -> u8 {
                (a as f32 + f * (b as f32 - a as f32)).round() as u8
            };
            return RGBColor(mix(c0.0, c1.0), mix(c0.1, c1.1), mix(c0.2, c1.2));
        }
    }
    let (_, c) = anchors[anchors.len() - 1];
    RGBColor(c.0, c.1, c.2)
}

/// matplotlib's viridis, down-sampled to five anchors
pub fn viridis(t: f32) -> RGBColor {
    ramp(
        &[
            (0.0, (68, 1, 84)),
            (0.25, (59, 82, 139)),
            (0.5, (33, 145, 140)),
            (0.75, (94, 201, 98)),
            (1.0, (253, 231, 37)),
        ],
        t,
    )
}

/// matplotlib's Spectral, down-sampled to five anchors
pub fn spectral(t: f32) -> RGBColor {
    ramp(
        &[
            (0.0, (158, 1, 66)),
            (0.25, (244, 109, 67)),
            (0.5, (255, 255, 191)),
            (0.75, (102, 194, 165)),
            (1.0, (94, 79, 162)),
        ],
        t,
    )
}

/// the classic jet ramp
pub fn jet(t: f32) -> RGBColor {
    ramp(
        &[
            (0.0, (0, 0, 128)),
            (0.125, (0, 0, 255)),
            (0.375, (0, 255, 255)),
            (0.625, (255, 255, 0)),
            (0.875, (255, 0, 0)),
            (1.0, (128, 0, 0)),
        ],
        t,
    )
}

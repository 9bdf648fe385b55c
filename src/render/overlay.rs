//! On-screen overlay layout.
//!
//! The interactive view is drawn by the host UI; this module works out what
//! it draws. For each slice it places grid lines, one row of column labels
//! above the content, one column of row labels to its left, and the
//! background image under that slice's effective zoom, pan and rotation.
//! Everything comes from the same geometry the export uses, computed at the
//! container's fit-to-screen scale.

use serde::Serialize;

use crate::geometry::{decode_column, project_cell_center, AxisLabel, HitTarget, SliceGeometry};
use crate::session::EditingSession;
use crate::types::{ImageDimensions, Offset, SliceId, ViewTransform};

/// Where the full source image sits relative to one slice's content box.
///
/// `left`/`top` place the unrotated image; `rotation` (degrees clockwise)
/// turns it about its own centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BackgroundPlacement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl BackgroundPlacement {
    /// Placement in unscaled slice-local pixels.
    pub fn for_slice(view: &ViewTransform, image: &ImageDimensions, slice_left: f64, slice_top: f64) -> Self {
        Self {
            left: view.pan.x - slice_left,
            top: view.pan.y - slice_top,
            width: image.width * view.zoom,
            height: image.height * view.zoom,
            rotation: view.rotation,
        }
    }

    pub fn scaled(self, scale: f64) -> Self {
        Self {
            left: self.left * scale,
            top: self.top * scale,
            width: self.width * scale,
            height: self.height * scale,
            rotation: self.rotation,
        }
    }

    pub fn center(&self) -> Offset {
        Offset::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Source image position shown at slice-local point `local`, in the
    /// units of `image`. Points off the image map outside `[0, size)`.
    pub fn source_point(&self, local: Offset, image: &ImageDimensions) -> Offset {
        let c = self.center();
        let (dx, dy) = (local.x - c.x, local.y - c.y);
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        // Undo a clockwise turn (y grows downwards)
        let ux = dx * cos + dy * sin;
        let uy = -dx * sin + dy * cos;
        let x = c.x + ux - self.left;
        let y = c.y + uy - self.top;
        Offset::new(
            x / self.width * image.width,
            y / self.height * image.height,
        )
    }
}

/// Layout of one slice box on screen. Positions inside the box are relative
/// to the slice's content origin; `origin` places that origin in the
/// container. All values are already multiplied by the plan's scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceOverlay {
    pub slice: SliceId,
    pub name: String,
    pub origin: Offset,
    pub geometry: SliceGeometry,
    pub vertical_lines: Vec<f64>,
    pub horizontal_lines: Vec<f64>,
    /// Drawn above the content, centred on `position` horizontally.
    pub column_labels: Vec<OverlayLabel>,
    /// Drawn left of the content, centred on `position` vertically.
    pub row_labels: Vec<OverlayLabel>,
    pub background: BackgroundPlacement,
    pub has_override: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayLabel {
    pub text: String,
    pub position: f64,
}

impl From<AxisLabel> for OverlayLabel {
    fn from(label: AxisLabel) -> Self {
        Self {
            text: label.text,
            position: label.position,
        }
    }
}

/// The coordinate badge drawn over the centre of the clicked or hovered cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterBadge {
    pub text: String,
    pub slice: SliceId,
    /// Container position of the cell centre.
    pub position: Offset,
}

/// Everything the host needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPlan {
    pub scale: f64,
    pub container_width: f64,
    pub container_height: f64,
    pub label_gutter: f64,
    pub slices: Vec<SliceOverlay>,
    pub center_badge: Option<CenterBadge>,
    pub scale_text: Option<String>,
}

impl OverlayPlan {
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn slice(&self, id: SliceId) -> Option<&SliceOverlay> {
        self.slices.iter().find(|s| s.slice == id)
    }
}

/// Lay out the overlay for the session at container scale `scale`.
///
/// Slices whose geometry cannot be computed are left out, so an invalid
/// cell size or split count yields an empty plan rather than an error.
pub fn plan_overlay(session: &EditingSession, scale: f64) -> OverlayPlan {
    let layout = session.layout;
    let mut plan = OverlayPlan {
        scale,
        container_width: 0.0,
        container_height: 0.0,
        label_gutter: layout.label_gutter * scale,
        slices: vec![],
        center_badge: None,
        scale_text: None,
    };

    let image = match session.image {
        Some(image) if image.is_valid() && scale.is_finite() && scale > 0.0 => image,
        _ => return plan,
    };
    let partition = session.partition();
    if !partition.is_valid() {
        return plan;
    }

    let (w, h) = layout.container_size(&image, partition);
    plan.container_width = w * scale;
    plan.container_height = h * scale;

    for id in partition.ids() {
        let Some(geometry) = session.geometry_scaled(id, scale) else {
            continue;
        };
        let view = session.effective_view(id);
        let origin = layout.content_origin(&image, partition, id);
        let background = BackgroundPlacement::for_slice(
            &view,
            &image,
            geometry.slice_left / scale,
            geometry.slice_top / scale,
        )
        .scaled(scale);

        plan.slices.push(SliceOverlay {
            slice: id,
            name: session.slice_name(id),
            origin: Offset::new(origin.x * scale, origin.y * scale),
            vertical_lines: geometry.column_lines(),
            horizontal_lines: geometry.row_lines(),
            column_labels: geometry.column_labels().into_iter().map(Into::into).collect(),
            row_labels: geometry.row_labels().into_iter().map(Into::into).collect(),
            background,
            has_override: session.slice_override(id).is_some(),
            geometry,
        });
    }

    if plan.slices.is_empty() {
        return plan;
    }

    if session.flags.show_center_coords {
        plan.center_badge = center_badge(session, &image, scale);
    }
    if session.flags.show_scale_bar {
        plan.scale_text = Some(session.config.scale_text());
    }
    plan
}

/// Find the first slice in which the active cell's centre is visible.
fn center_badge(session: &EditingSession, image: &ImageDimensions, scale: f64) -> Option<CenterBadge> {
    let coordinate = session.active_coordinate()?;
    let col = u32::try_from(decode_column(&coordinate.col)?).ok()?;
    let row = coordinate.row.checked_sub(1)?;

    let target = HitTarget {
        config: &session.config,
        image,
        partition: session.partition(),
        layout: session.layout,
    };
    session.partition().ids().find_map(|id| {
        let view = session.effective_view(id);
        project_cell_center(col, row, id, scale, &target, &view).map(|position| CenterBadge {
            text: coordinate.to_string(),
            slice: id,
            position,
        })
    })
}

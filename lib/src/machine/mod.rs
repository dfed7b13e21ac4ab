//! Build plate border computation.
//!
//! Branches must never leave the printable region, and platform adhesion
//! (skirt, brim, raft) claims a band of that region for itself. This
//! module builds one polygon set representing "outside the printable
//! area": a one-metre-thick ring around the adhesion-inset plate, with
//! the plate itself as the ring's hole. Unioned into every collision
//! layer, it behaves as a permanent obstacle.

use crate::clipper::{offset, OffsetJoinType};
use crate::geometry::{BoundingBox, ExPolygon, ExPolygons, Point, Polygon};
use crate::{scale, Coord, CoordF, Error, Result};
use serde::{Deserialize, Serialize};

/// Width of the obstacle ring around the printable area (1 m).
const BORDER_RING_WIDTH: Coord = 1_000_000_000;

/// Vertex count of the elliptic plate approximation.
const ELLIPSE_RESOLUTION: usize = 50;

/// Shape of the build plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildPlateShape {
    #[default]
    Rectangular,
    Elliptic,
}

impl BuildPlateShape {
    /// Parse a configuration name. Unrecognized names reduce to the
    /// rectangular default with a warning rather than failing the run.
    pub fn from_name(name: &str) -> Self {
        match name {
            "rectangular" => Self::Rectangular,
            "elliptic" => Self::Elliptic,
            other => {
                log::warn!("unknown buildplate shape {other:?}, assuming rectangular");
                Self::Rectangular
            }
        }
    }
}

/// Platform adhesion feature in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdhesionType {
    #[default]
    None,
    Skirt,
    Brim,
    Raft,
}

impl AdhesionType {
    /// Parse a configuration name. Unrecognized names reduce to no
    /// adhesion with a warning rather than failing the run.
    pub fn from_name(name: &str) -> Self {
        match name {
            "none" => Self::None,
            "skirt" => Self::Skirt,
            "brim" => Self::Brim,
            "raft" => Self::Raft,
            other => {
                log::warn!("unknown adhesion type {other:?}, assuming none");
                Self::None
            }
        }
    }
}

/// Scalars needed to size the adhesion inset.
///
/// `extra_skirt_line_width` is the extra width contributed by used
/// extruders other than the adhesion extruder (each adds one skirt line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdhesionParams {
    pub skirt_brim_line_width: Coord,
    pub initial_layer_line_width_factor: CoordF,
    pub brim_line_count: usize,
    pub skirt_line_count: usize,
    pub skirt_gap: Coord,
    pub raft_margin: Coord,
    pub extra_skirt_line_width: Coord,
}

impl Default for AdhesionParams {
    fn default() -> Self {
        Self {
            skirt_brim_line_width: scale(0.4),
            initial_layer_line_width_factor: 1.0,
            brim_line_count: 8,
            skirt_line_count: 1,
            skirt_gap: scale(3.0),
            raft_margin: scale(15.0),
            extra_skirt_line_width: 0,
        }
    }
}

impl AdhesionParams {
    /// Width of the band the adhesion feature claims around the print.
    pub fn size(&self, adhesion_type: AdhesionType) -> Coord {
        let first_layer_line =
            (self.skirt_brim_line_width as CoordF * self.initial_layer_line_width_factor) as Coord;
        match adhesion_type {
            AdhesionType::None => 0,
            AdhesionType::Brim => {
                first_layer_line * self.brim_line_count as Coord + self.extra_skirt_line_width
            }
            AdhesionType::Raft => self.raft_margin,
            AdhesionType::Skirt => {
                self.skirt_gap
                    + first_layer_line * self.skirt_line_count as Coord
                    + self.extra_skirt_line_width
            }
        }
    }
}

fn plate_outline(shape: BuildPlateShape, machine_size: &BoundingBox) -> Polygon {
    match shape {
        BuildPlateShape::Rectangular => Polygon::rectangle(machine_size.min, machine_size.max),
        BuildPlateShape::Elliptic => {
            let center = machine_size.center();
            let half_width = machine_size.width() as CoordF / 2.0;
            let half_depth = machine_size.height() as CoordF / 2.0;
            let mut points = Vec::with_capacity(ELLIPSE_RESOLUTION);
            for i in 0..ELLIPSE_RESOLUTION {
                let angle = std::f64::consts::PI * 2.0 * i as CoordF / ELLIPSE_RESOLUTION as CoordF;
                points.push(Point::new(
                    center.x + (angle.cos() * half_width).round() as Coord,
                    center.y + (angle.sin() * half_depth).round() as Coord,
                ));
            }
            Polygon::from_points(points)
        }
    }
}

/// Compute the machine border obstacle: a 1 m ring around the printable
/// region after the adhesion inset, carrying the printable region as its
/// hole. Computed once per run. Fails when the adhesion inset consumes
/// the entire plate, since no support could stand anywhere.
pub fn machine_border(
    shape: BuildPlateShape,
    adhesion_type: AdhesionType,
    adhesion: &AdhesionParams,
    machine_size: &BoundingBox,
) -> Result<ExPolygons> {
    let plate = ExPolygon::new(plate_outline(shape, machine_size));

    let adhesion_size = adhesion.size(adhesion_type);
    let printable = offset(&[plate], -adhesion_size, OffsetJoinType::Round);

    let Some(printable) = printable.into_iter().next() else {
        return Err(Error::Geometry(
            "adhesion inset leaves no printable area on the build plate".into(),
        ));
    };

    let outer = offset(&[printable.clone()], BORDER_RING_WIDTH, OffsetJoinType::Miter);
    let Some(outer) = outer.into_iter().next() else {
        return Err(Error::Geometry(
            "offsetting the printable area produced no border ring".into(),
        ));
    };

    let mut hole = printable.contour;
    hole.reverse();
    Ok(vec![ExPolygon::with_holes(outer.contour, vec![hole])])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::contains_point;

    fn plate_200() -> BoundingBox {
        BoundingBox::from_points_minmax(Point::zero(), Point::new_scale(200.0, 200.0))
    }

    #[test]
    fn test_rectangular_border() {
        let border = machine_border(
            BuildPlateShape::Rectangular,
            AdhesionType::None,
            &AdhesionParams::default(),
            &plate_200(),
        )
        .unwrap();

        // Centre of the plate is printable
        assert!(!contains_point(&border, &Point::new_scale(100.0, 100.0)));
        // Just outside the plate is border
        assert!(contains_point(&border, &Point::new_scale(-5.0, 100.0)));
        assert!(contains_point(&border, &Point::new_scale(100.0, 205.0)));
    }

    #[test]
    fn test_elliptic_border_excludes_corners() {
        let border = machine_border(
            BuildPlateShape::Elliptic,
            AdhesionType::None,
            &AdhesionParams::default(),
            &plate_200(),
        )
        .unwrap();

        // Plate centre printable, rectangle corner not
        assert!(!contains_point(&border, &Point::new_scale(100.0, 100.0)));
        assert!(contains_point(&border, &Point::new_scale(5.0, 5.0)));
    }

    #[test]
    fn test_adhesion_inset() {
        let adhesion = AdhesionParams {
            skirt_gap: scale(3.0),
            skirt_brim_line_width: scale(0.4),
            initial_layer_line_width_factor: 1.0,
            skirt_line_count: 5,
            ..Default::default()
        };
        // Skirt claims 3mm + 5 * 0.4mm = 5mm
        assert_eq!(adhesion.size(AdhesionType::Skirt), scale(5.0));

        let border = machine_border(
            BuildPlateShape::Rectangular,
            AdhesionType::Skirt,
            &adhesion,
            &plate_200(),
        )
        .unwrap();

        // 2mm inside the plate edge now belongs to the border band
        assert!(contains_point(&border, &Point::new_scale(2.0, 100.0)));
        assert!(!contains_point(&border, &Point::new_scale(10.0, 100.0)));
    }

    #[test]
    fn test_brim_size_includes_extra_skirt_lines() {
        let adhesion = AdhesionParams {
            skirt_brim_line_width: scale(0.4),
            initial_layer_line_width_factor: 1.0,
            brim_line_count: 10,
            extra_skirt_line_width: scale(0.4),
            ..Default::default()
        };
        assert_eq!(adhesion.size(AdhesionType::Brim), scale(4.4));
        assert_eq!(adhesion.size(AdhesionType::None), 0);
    }

    #[test]
    fn test_adhesion_consuming_plate_is_an_error() {
        let adhesion = AdhesionParams {
            raft_margin: scale(150.0),
            ..Default::default()
        };
        // A 150 mm raft margin swallows the whole 200 mm plate
        let result = machine_border(
            BuildPlateShape::Rectangular,
            AdhesionType::Raft,
            &adhesion,
            &plate_200(),
        );
        assert!(matches!(result, Err(Error::Geometry(_))));
    }

    #[test]
    fn test_unknown_names_fall_back() {
        assert_eq!(
            BuildPlateShape::from_name("dodecahedral"),
            BuildPlateShape::Rectangular
        );
        assert_eq!(AdhesionType::from_name("mucilage"), AdhesionType::None);
        assert_eq!(AdhesionType::from_name("raft"), AdhesionType::Raft);
    }
}

//! Two-stop gradient rasterization.

use bevy::color::{ColorToPacked, Mix};
use bevy::prelude::*;

use super::raster::Raster;
use super::TextureError;
use crate::design::{GradientKind, GradientSpec, parse_color};

/// Endpoints of the chord a linear gradient runs along on a `size`-pixel square.
///
/// The chord passes through the canvas centre at `angle_degrees`, with
/// endpoints at `center ± radius·(cos θ, sin θ)`. Y points down.
pub fn linear_endpoints(size: u32, angle_degrees: f32) -> (Vec2, Vec2) {
    let half = size as f32 * 0.5;
    let center = Vec2::splat(half);
    let theta = angle_degrees.to_radians();
    let offset = Vec2::new(theta.cos(), theta.sin()) * half;
    (center - offset, center + offset)
}

/// Rasterize `spec` onto a square canvas of `size` pixels.
pub fn rasterize_gradient(spec: &GradientSpec, size: u32) -> Result<Raster, TextureError> {
    if size == 0 {
        return Err(TextureError::InvalidSize { size });
    }
    if !spec.angle_degrees.is_finite() {
        return Err(TextureError::InvalidAngle {
            angle: spec.angle_degrees,
        });
    }
    let start = parse_color(&spec.start)?;
    let end = parse_color(&spec.end)?;

    let ramp = |t: f32| start.mix(&end, t.clamp(0.0, 1.0)).to_u8_array();
    let mut raster = Raster::new(size, size)?;

    match spec.kind {
        GradientKind::Linear => {
            let (from, to) = linear_endpoints(size, spec.angle_degrees);
            let axis = to - from;
            let length_sq = axis.length_squared();
            for y in 0..size {
                for x in 0..size {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let t = (p - from).dot(axis) / length_sq;
                    raster.set_pixel(x, y, ramp(t));
                }
            }
        }
        GradientKind::Radial => {
            let radius = size as f32 * 0.5;
            let center = Vec2::splat(radius);
            for y in 0..size {
                for x in 0..size {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    raster.set_pixel(x, y, ramp(p.distance(center) / radius));
                }
            }
        }
    }

    Ok(raster)
}

//! Colored map export
//!
//! Each county centroid is drawn as a small square in its owner's color on
//! an equirectangular projection of the atlas bounds.

use std::collections::BTreeSet;
use std::path::Path;

use image::{Rgb, RgbImage};

use crate::core::config::RenderConfig;
use crate::core::error::Result;
use crate::core::types::{CountyId, GeoPoint};
use crate::game::roster::TeamRoster;
use crate::history::snapshot::OwnershipSnapshot;
use crate::map::color::Color;
use crate::map::county::CountyAtlas;

const UNOWNED: Rgb<u8> = Rgb([150, 150, 150]);
const HIGHLIGHT: Rgb<u8> = Rgb([20, 20, 20]);

/// Maps lat/lon into pixel space
struct Projection {
    min: GeoPoint,
    max: GeoPoint,
    width: u32,
    height: u32,
}

impl Projection {
    fn new(bounds: (GeoPoint, GeoPoint), width: u32, height: u32) -> Self {
        let (lo, hi) = bounds;
        // 2% margin so edge counties are not clipped
        let pad_lat = ((hi.lat - lo.lat) * 0.02).max(0.01);
        let pad_lon = ((hi.lon - lo.lon) * 0.02).max(0.01);
        Self {
            min: lo.offset(-pad_lat, -pad_lon),
            max: hi.offset(pad_lat, pad_lon),
            width,
            height,
        }
    }

    fn project(&self, p: GeoPoint) -> (i64, i64) {
        let fx = (p.lon - self.min.lon) / (self.max.lon - self.min.lon);
        let fy = (self.max.lat - p.lat) / (self.max.lat - self.min.lat);
        (
            (fx * f64::from(self.width.saturating_sub(1))).round() as i64,
            (fy * f64::from(self.height.saturating_sub(1))).round() as i64,
        )
    }
}

fn draw_square(img: &mut RgbImage, (cx, cy): (i64, i64), radius: i64, color: Rgb<u8>) {
    let (w, h) = (i64::from(img.width()), i64::from(img.height()));
    for y in (cy - radius).max(0)..=(cy + radius).min(h - 1) {
        for x in (cx - radius).max(0)..=(cx + radius).min(w - 1) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Draw one ownership frame; `highlight` counties get a dark outline
pub fn render_snapshot(
    atlas: &CountyAtlas,
    roster: &TeamRoster,
    snapshot: &OwnershipSnapshot,
    highlight: Option<&BTreeSet<CountyId>>,
    config: &RenderConfig,
) -> Result<RgbImage> {
    let background: Color = config.background.parse()?;
    let mut img = RgbImage::from_pixel(config.width, config.height, Rgb(background.to_rgb()));

    let bounds = match atlas.bounds() {
        Some(bounds) => bounds,
        None => return Ok(img),
    };
    let projection = Projection::new(bounds, config.width, config.height);
    let radius = i64::from(config.marker_radius);

    for (county, centroid) in atlas.located() {
        let pixel = projection.project(centroid);
        let color = snapshot
            .owner(&county.id)
            .and_then(|team| roster.get(team))
            .map(|team| Rgb(team.color.to_rgb()))
            .unwrap_or(UNOWNED);

        if highlight.is_some_and(|set| set.contains(&county.id)) {
            draw_square(&mut img, pixel, radius + 1, HIGHLIGHT);
        }
        draw_square(&mut img, pixel, radius, color);
    }

    Ok(img)
}

pub fn export_png(
    atlas: &CountyAtlas,
    roster: &TeamRoster,
    snapshot: &OwnershipSnapshot,
    highlight: Option<&BTreeSet<CountyId>>,
    config: &RenderConfig,
    path: &Path,
) -> Result<()> {
    let img = render_snapshot(atlas, roster, snapshot, highlight, config)?;
    img.save(path)?;
    tracing::info!(path = %path.display(), "map exported");
    Ok(())
}

//! Single-band GeoTIFF elevation rasters.
//!
//! Georeferencing comes from the ModelPixelScale and ModelTiepoint tags;
//! rotated rasters (ModelTransformation) are not supported. Nodata is read
//! from the GDAL_NODATA ASCII tag when present.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::elevation::ElevationGrid;
use crate::error::{Error, Result};
use crate::projection::RasterCrs;

const GDAL_NODATA_TAG: u16 = 42113;

const GT_RASTER_TYPE_KEY: u16 = 1025;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

fn tiff_error(err: tiff::TiffError) -> Error {
    Error::ElevationUnavailable(format!("GeoTIFF decode failed: {err}"))
}

/// GeoKey directory entries stored inline: (key id, value).
fn geo_keys(directory: &[u16]) -> Vec<(u16, u16)> {
    directory
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(4)
        .filter(|entry| entry[1] == 0 && entry[2] == 1)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn crs_from_keys(keys: &[(u16, u16)]) -> Option<RasterCrs> {
    keys.iter()
        .find(|(key, _)| *key == PROJECTED_CS_TYPE_KEY)
        .or_else(|| keys.iter().find(|(key, _)| *key == GEOGRAPHIC_TYPE_KEY))
        .and_then(|(_, code)| RasterCrs::from_epsg(*code as u32))
}

fn samples_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    #[allow(unreachable_patterns)]
    let values = match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => {
            return Err(Error::ElevationUnavailable(
                "unsupported GeoTIFF sample format".to_string(),
            ))
        }
    };
    Ok(values)
}

/// Decode a GeoTIFF from any seekable reader.
///
/// `fallback_crs` applies when the file carries no usable EPSG GeoKey.
pub fn decode_geotiff<R: Read + Seek>(reader: R, fallback_crs: RasterCrs) -> Result<ElevationGrid> {
    let mut decoder = Decoder::new(reader).map_err(tiff_error)?;

    let (width, height) = decoder.dimensions().map_err(tiff_error)?;
    match decoder.colortype().map_err(tiff_error)? {
        ColorType::Gray(_) => {}
        other => {
            return Err(Error::ElevationUnavailable(format!(
                "GeoTIFF must have a single band, found {other:?}"
            )))
        }
    }

    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(tiff_error)?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(tiff_error)?;
    let (sx, sy) = match scale.as_slice() {
        [sx, sy, ..] => (*sx, *sy),
        _ => return Err(Error::ElevationUnavailable("malformed ModelPixelScale".to_string())),
    };
    let (i, j, x, y) = match tiepoint.as_slice() {
        [i, j, _, x, y, ..] => (*i, *j, *x, *y),
        _ => return Err(Error::ElevationUnavailable("malformed ModelTiepoint".to_string())),
    };
    if (sx - sy).abs() > sx.abs() * 1e-6 {
        return Err(Error::ElevationUnavailable(format!(
            "non-square GeoTIFF pixels ({sx} x {sy}) are not supported"
        )));
    }

    let keys = match decoder
        .find_tag(Tag::GeoKeyDirectoryTag)
        .map_err(tiff_error)?
    {
        Some(value) => geo_keys(&value.into_u16_vec().map_err(tiff_error)?),
        None => Vec::new(),
    };
    let crs = crs_from_keys(&keys).unwrap_or(fallback_crs);

    let nodata = match decoder
        .find_tag(Tag::from_u16_exhaustive(GDAL_NODATA_TAG))
        .map_err(tiff_error)?
    {
        Some(value) => value
            .into_string()
            .ok()
            .and_then(|text| text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse::<f64>().ok()),
        None => None,
    };

    let mut x_min = x - i * sx;
    let mut y_max = y + j * sy;
    if keys.contains(&(GT_RASTER_TYPE_KEY, RASTER_PIXEL_IS_POINT)) {
        x_min -= sx / 2.0;
        y_max += sy / 2.0;
    }

    let values = samples_to_f64(decoder.read_image().map_err(tiff_error)?)?;
    ElevationGrid::new(
        crs,
        width as usize,
        height as usize,
        x_min,
        y_max - height as f64 * sy,
        sx,
        nodata,
        values,
    )
}

/// Read a GeoTIFF DSM from disk.
pub fn read_geotiff(path: impl AsRef<Path>, fallback_crs: RasterCrs) -> Result<ElevationGrid> {
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file), fallback_crs)
}

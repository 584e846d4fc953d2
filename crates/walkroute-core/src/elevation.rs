//! Elevation surfaces and the providers that acquire them per path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::geotiff;
use crate::models::Coordinate;
use crate::projection::RasterCrs;

/// A queryable elevation surface in its own reference system.
pub trait ElevationSource: Send + Sync {
    /// Reference system expected by [`ElevationSource::sample`].
    fn crs(&self) -> RasterCrs;

    /// Elevation in meters at native (x, y), or `None` outside coverage.
    fn sample(&self, x: f64, y: f64) -> Option<f64>;
}

/// Acquires an elevation surface for the duration of one path's grading.
///
/// The returned surface is dropped once the path's slopes are computed.
#[async_trait]
pub trait ElevationProvider: Send + Sync {
    async fn open(&self, path: &[Coordinate]) -> Result<Box<dyn ElevationSource>>;
}

#[async_trait]
impl<T: ElevationProvider + ?Sized> ElevationProvider for Arc<T> {
    async fn open(&self, path: &[Coordinate]) -> Result<Box<dyn ElevationSource>> {
        (**self).open(path).await
    }
}

/// Header row/column counts must be positive whole numbers.
fn cell_count(key: &str, value: f64) -> Result<usize> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(Error::ElevationUnavailable(format!(
            "raster header {key} must be a positive integer, got {value}"
        )));
    }
    Ok(value as usize)
}

/// North-up raster held in memory, row 0 at the top edge.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    crs: RasterCrs,
    ncols: usize,
    nrows: usize,
    x_min: f64,
    y_max: f64,
    cell_size: f64,
    nodata: Option<f64>,
    values: Vec<f64>,
}

impl ElevationGrid {
    /// Build a grid from its lower-left corner and row-major values (top row first).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        crs: RasterCrs,
        ncols: usize,
        nrows: usize,
        x_min: f64,
        y_min: f64,
        cell_size: f64,
        nodata: Option<f64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if ncols == 0 || nrows == 0 {
            return Err(Error::ElevationUnavailable("raster has no cells".to_string()));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(Error::ElevationUnavailable(format!(
                "invalid raster cell size {cell_size}"
            )));
        }
        let cells = ncols.checked_mul(nrows).ok_or_else(|| {
            Error::ElevationUnavailable(format!("raster size {ncols}x{nrows} overflows"))
        })?;
        if values.len() != cells {
            return Err(Error::ElevationUnavailable(format!(
                "raster holds {} values, expected {}",
                values.len(),
                cells
            )));
        }
        Ok(Self {
            crs,
            ncols,
            nrows,
            x_min,
            y_max: y_min + nrows as f64 * cell_size,
            cell_size,
            nodata,
            values,
        })
    }

    /// Parse an ESRI ASCII grid (`.asc`).
    pub fn parse_ascii(text: &str, crs: RasterCrs) -> Result<Self> {
        let mut tokens = text.split_whitespace().peekable();

        let mut ncols = None;
        let mut nrows = None;
        let mut x_corner = None;
        let mut y_corner = None;
        let mut x_center = None;
        let mut y_center = None;
        let mut cell_size = None;
        let mut nodata = None;

        while let Some(key) = tokens.next_if(|token| {
            token
                .chars()
                .next()
                .is_some_and(|first| first.is_ascii_alphabetic())
        }) {
            let value = tokens
                .next()
                .and_then(|raw| raw.parse::<f64>().ok())
                .ok_or_else(|| {
                    Error::ElevationUnavailable(format!("raster header {key} has no numeric value"))
                })?;
            match key.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(cell_count(key, value)?),
                "nrows" => nrows = Some(cell_count(key, value)?),
                "xllcorner" => x_corner = Some(value),
                "yllcorner" => y_corner = Some(value),
                "xllcenter" => x_center = Some(value),
                "yllcenter" => y_center = Some(value),
                "cellsize" => cell_size = Some(value),
                "nodata_value" => nodata = Some(value),
                other => {
                    return Err(Error::ElevationUnavailable(format!(
                        "unknown raster header {other}"
                    )))
                }
            }
        }

        let missing = |name: &str| Error::ElevationUnavailable(format!("raster header missing {name}"));
        let ncols = ncols.ok_or_else(|| missing("ncols"))?;
        let nrows = nrows.ok_or_else(|| missing("nrows"))?;
        let cell_size = cell_size.ok_or_else(|| missing("cellsize"))?;
        let x_min = match (x_corner, x_center) {
            (Some(corner), _) => corner,
            (None, Some(center)) => center - cell_size / 2.0,
            (None, None) => return Err(missing("xllcorner")),
        };
        let y_min = match (y_corner, y_center) {
            (Some(corner), _) => corner,
            (None, Some(center)) => center - cell_size / 2.0,
            (None, None) => return Err(missing("yllcorner")),
        };

        let values = tokens
            .map(|raw| {
                raw.parse::<f64>().map_err(|_| {
                    Error::ElevationUnavailable(format!("raster value {raw:?} is not a number"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(crs, ncols, nrows, x_min, y_min, cell_size, nodata, values)
    }

    /// Read an ESRI ASCII grid from disk.
    pub fn open(path: impl AsRef<Path>, crs: RasterCrs) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse_ascii(&text, crs)
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.ncols, self.nrows)
    }
}

impl ElevationSource for ElevationGrid {
    fn crs(&self) -> RasterCrs {
        self.crs
    }

    fn sample(&self, x: f64, y: f64) -> Option<f64> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let col = ((x - self.x_min) / self.cell_size).floor();
        let row = ((self.y_max - y) / self.cell_size).floor();
        if col < 0.0 || row < 0.0 || col >= self.ncols as f64 || row >= self.nrows as f64 {
            return None;
        }
        let value = *self.values.get(row as usize * self.ncols + col as usize)?;
        if self.nodata == Some(value) || !value.is_finite() {
            return None;
        }
        Some(value)
    }
}

/// On-disk raster format of a DSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsmFormat {
    /// ESRI ASCII grid (`.asc`).
    AsciiGrid,
    /// Single-band GeoTIFF (`.tif`, `.tiff`).
    GeoTiff,
}

impl DsmFormat {
    /// Pick the reader from the file extension; anything unrecognised is read as an ASCII grid.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("tif") | Some("tiff") => DsmFormat::GeoTiff,
            _ => DsmFormat::AsciiGrid,
        }
    }
}

/// Digital surface model stored on disk as a GeoTIFF or an ESRI ASCII grid.
///
/// The file is read once per path, off the async workers; the grid lives
/// only as long as the returned surface.
#[derive(Debug, Clone)]
pub struct DsmFile {
    path: PathBuf,
    crs: RasterCrs,
}

impl DsmFile {
    /// `crs` is used when the file does not declare its own reference system.
    pub fn new(path: impl Into<PathBuf>, crs: RasterCrs) -> Self {
        Self {
            path: path.into(),
            crs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DsmFormat {
        DsmFormat::from_path(&self.path)
    }

    /// Blocking read and decode.
    pub fn read(&self) -> Result<ElevationGrid> {
        let grid = match self.format() {
            DsmFormat::GeoTiff => geotiff::read_geotiff(&self.path, self.crs),
            DsmFormat::AsciiGrid => ElevationGrid::open(&self.path, self.crs),
        };
        grid.map_err(|err| match err {
            Error::Io(io) => Error::ElevationUnavailable(format!(
                "cannot read {}: {}",
                self.path.display(),
                io
            )),
            other => other,
        })
    }
}

#[async_trait]
impl ElevationProvider for DsmFile {
    async fn open(&self, _path: &[Coordinate]) -> Result<Box<dyn ElevationSource>> {
        let dsm = self.clone();
        let grid = tokio::task::spawn_blocking(move || dsm.read())
            .await
            .map_err(|err| Error::ElevationUnavailable(format!("DSM reader failed: {err}")))??;
        tracing::debug!(
            "Opened DSM {} ({}x{} cells, {})",
            self.path.display(),
            grid.ncols,
            grid.nrows,
            grid.crs
        );
        Ok(Box::new(grid))
    }
}

//! Server configuration from environment.

use std::env;
use std::str::FromStr;

use walkroute_core::{ColorMode, ColorPolicy, RasterCrs, SlopeScale, DEFAULT_MAX_ATTEMPTS};
use walkroute_remote::{DEFAULT_ELEVATION_URL, DEFAULT_PROFILE};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub osrm_url: String,
    pub osrm_profile: String,
    /// ESRI ASCII DSM; when unset elevation comes from `elevation_url`.
    pub dsm_path: Option<String>,
    pub dsm_crs: RasterCrs,
    pub elevation_url: String,
    pub boundary_path: Option<String>,
    pub max_routes_per_request: u32,
    pub sample_max_attempts: u32,
    pub color_policy: ColorPolicy,
    pub request_timeout_s: u64,
    /// Write artifacts for each generated set below this directory.
    pub output_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            osrm_url: "http://localhost:5000".to_string(),
            osrm_profile: DEFAULT_PROFILE.to_string(),
            dsm_path: None,
            dsm_crs: RasterCrs::Geographic,
            elevation_url: DEFAULT_ELEVATION_URL.to_string(),
            boundary_path: None,
            max_routes_per_request: 10,
            sample_max_attempts: DEFAULT_MAX_ATTEMPTS,
            color_policy: ColorPolicy::default(),
            request_timeout_s: 30,
            output_dir: None,
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let color_policy = ColorPolicy {
            mode: parsed::<ColorMode>("WALKROUTE_COLOR_MODE", defaults.color_policy.mode),
            slope_min: parsed("WALKROUTE_SLOPE_MIN", defaults.color_policy.slope_min),
            slope_max: parsed("WALKROUTE_SLOPE_MAX", defaults.color_policy.slope_max),
            scale: parsed::<SlopeScale>("WALKROUTE_SLOPE_SCALE", defaults.color_policy.scale),
            ..defaults.color_policy
        };
        Self {
            server_port: parsed("WALKROUTE_PORT", defaults.server_port),
            osrm_url: optional("WALKROUTE_OSRM_URL").unwrap_or(defaults.osrm_url),
            osrm_profile: optional("WALKROUTE_OSRM_PROFILE").unwrap_or(defaults.osrm_profile),
            dsm_path: optional("WALKROUTE_DSM_PATH"),
            dsm_crs: parsed("WALKROUTE_DSM_CRS", defaults.dsm_crs),
            elevation_url: optional("WALKROUTE_ELEVATION_URL").unwrap_or(defaults.elevation_url),
            boundary_path: optional("WALKROUTE_BOUNDARY_PATH"),
            max_routes_per_request: parsed("WALKROUTE_MAX_ROUTES", defaults.max_routes_per_request),
            sample_max_attempts: parsed(
                "WALKROUTE_SAMPLE_MAX_ATTEMPTS",
                defaults.sample_max_attempts,
            ),
            color_policy,
            request_timeout_s: parsed("WALKROUTE_REQUEST_TIMEOUT_S", defaults.request_timeout_s),
            output_dir: optional("WALKROUTE_OUTPUT_DIR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_values_fall_back_to_default() {
        env::set_var("WALKROUTE_TEST_PARSED_PORT", "not-a-port");
        assert_eq!(parsed("WALKROUTE_TEST_PARSED_PORT", 3000u16), 3000);
        env::set_var("WALKROUTE_TEST_PARSED_PORT", " 8080 ");
        assert_eq!(parsed("WALKROUTE_TEST_PARSED_PORT", 3000u16), 8080);
        env::remove_var("WALKROUTE_TEST_PARSED_PORT");
    }

    #[test]
    fn blank_optional_is_none() {
        env::set_var("WALKROUTE_TEST_OPTIONAL", "   ");
        assert_eq!(optional("WALKROUTE_TEST_OPTIONAL"), None);
        env::remove_var("WALKROUTE_TEST_OPTIONAL");
    }

    #[test]
    fn crs_parses_from_env_style_strings() {
        env::set_var("WALKROUTE_TEST_CRS", "EPSG:32630");
        let crs = parsed("WALKROUTE_TEST_CRS", RasterCrs::Geographic);
        assert_eq!(crs.epsg(), 32630);
        env::remove_var("WALKROUTE_TEST_CRS");
    }
}

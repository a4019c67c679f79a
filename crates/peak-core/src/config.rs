//! Immutable pipeline configuration.
//!
//! [`PipelineConfig`] gathers every static table the pipeline consults: phase
//! rosters, weather-site ids, per-variable smoothing coefficients, the directed
//! nearby-station graph, the outlier-eligible station set, smoothing windows and
//! model hyperparameters. It is built once and passed by reference into each
//! stage, so several configurations can coexist in one process.
//!
//! The TOML form supports partial files; anything left out keeps the default,
//! which reproduces the competition setup.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::PeakResult;
use crate::StationId;

/// Unit code marking load values recorded in MW.
pub const MW_UNIT_CODE: i64 = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Clipping threshold in standard deviations.
    pub outlier_sigma: f64,

    /// Moving-average window applied to load when `smooth_input` is set.
    pub load_window: usize,

    /// Triangular window applied to national demand.
    pub national_window: usize,

    pub smooth_input: bool,

    pub mw_unit_code: i64,

    /// Calendar years of national demand to concatenate.
    pub national_years: Vec<i32>,

    /// Stations whose load goes through outlier clipping.
    pub outlier_stations: BTreeSet<StationId>,

    /// Station rosters keyed by phase number ("1", "2").
    pub phases: BTreeMap<String, Vec<StationId>>,

    /// Weather-site id for each station.
    pub weather_sites: BTreeMap<StationId, u32>,

    /// Weather variables in feature-column order.
    pub weather: Vec<WeatherVariable>,

    /// Directed nearby-station relation.
    pub nearby: NearbyGraph,

    pub gam: GamParams,

    pub terms: TermLayout,

    pub evaluation: EvaluationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let station = StationId::new;
        let mut phases = BTreeMap::new();
        phases.insert(
            "1".to_string(),
            vec![
                station("BOURNVILLE CB 7"),
                station("BRADLEY STOKE CB 8"),
                station("STRATTON CB 4041"),
            ],
        );
        // phase-2 stations have no known weather site yet
        phases.insert("2".to_string(), Vec::new());

        let weather_sites = [
            ("BOURNVILLE CB 7", 7),
            ("BRADLEY STOKE CB 8", 8),
            ("STRATTON CB 4041", 3),
        ]
        .into_iter()
        .map(|(name, site)| (station(name), site))
        .collect();

        let outlier_stations = [
            "BOURNVILLE CB 7",
            "BRIDPORT CB 306",
            "PORTISHEAD ASHLANDS CB 4",
        ]
        .into_iter()
        .map(station)
        .collect();

        Self {
            phases,
            weather_sites,
            weather: vec![
                WeatherVariable::new("temperature", 5e-2, true),
                WeatherVariable::new("solar_irradiance", 5e-1, false),
                WeatherVariable::new("windspeed_north", 5e-1, false),
                WeatherVariable::new("windspeed_east", 5e-1, false),
            ],
            nearby: NearbyGraph::default(),
            outlier_stations,
            outlier_sigma: 3.0,
            load_window: 7,
            national_window: 5,
            smooth_input: true,
            mw_unit_code: MW_UNIT_CODE,
            national_years: vec![2019, 2020, 2021],
            gam: GamParams::default(),
            terms: TermLayout::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load_from(path: &Path) -> PeakResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> PeakResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> PeakResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn phase_stations(&self, phase: u8) -> &[StationId] {
        self.phases
            .get(&phase.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_outlier_station(&self, station: &StationId) -> bool {
        self.outlier_stations.contains(station)
    }

    /// Map user-supplied station names onto the phase roster.
    ///
    /// A requested name matches the first roster entry that starts with it,
    /// compared in upper case, so `"bournville"` resolves to `BOURNVILLE CB 7`.
    /// An empty request selects the whole roster. Names matching nothing are
    /// reported and skipped.
    pub fn resolve_stations(
        &self,
        phase: u8,
        requested: &[String],
        diag: &mut Diagnostics,
    ) -> Vec<StationId> {
        let roster = self.phase_stations(phase);
        if requested.is_empty() {
            return roster.to_vec();
        }
        let mut resolved = Vec::new();
        for name in requested {
            let needle = name.trim().to_uppercase();
            match roster.iter().find(|s| s.as_str().starts_with(&needle)) {
                Some(station) if !resolved.contains(station) => resolved.push(station.clone()),
                Some(_) => {}
                None => diag.error_for(
                    "station",
                    &format!("invalid station name for phase {phase}"),
                    name,
                ),
            }
        }
        resolved
    }
}

/// Smoothing coefficient and transform for one weather variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherVariable {
    pub name: String,
    pub alpha: f64,
    /// Apply `v + v² + v³` before smoothing.
    #[serde(default)]
    pub cubic: bool,
}

impl WeatherVariable {
    pub fn new(name: impl Into<String>, alpha: f64, cubic: bool) -> Self {
        Self {
            name: name.into(),
            alpha,
            cubic,
        }
    }
}

/// Directed adjacency from a consuming station to the stations whose load it
/// uses as features.
///
/// The relation is kept exactly as configured: `PORTISHEAD ASHLANDS CB 4` lists
/// Bournville and Bradley Stoke, neither of which lists it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NearbyGraph(BTreeMap<StationId, Vec<StationId>>);

impl Default for NearbyGraph {
    fn default() -> Self {
        let station = StationId::new;
        let edges = [
            ("BOURNVILLE CB 7", vec!["BRADLEY STOKE CB 8"]),
            ("BRADLEY STOKE CB 8", vec!["BOURNVILLE CB 7"]),
            ("STRATTON CB 4041", vec![]),
            ("BRIDPORT CB 306", vec!["HEMYOCK CB 56_24"]),
            ("HEMYOCK CB 56_24", vec!["BRIDPORT CB 306"]),
            (
                "PORTISHEAD ASHLANDS CB 4",
                vec!["BOURNVILLE CB 7", "BRADLEY STOKE CB 8"],
            ),
        ];
        Self(
            edges
                .into_iter()
                .map(|(from, to)| (station(from), to.into_iter().map(station).collect()))
                .collect(),
        )
    }
}

impl NearbyGraph {
    /// Nearby stations of `station`, in configured order.
    pub fn neighbours(&self, station: &StationId) -> &[StationId] {
        self.0.get(station).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, station: &StationId) -> bool {
        self.0.contains_key(station)
    }

    /// Edges `a → b` for which `b → a` is not configured.
    pub fn one_way_edges(&self) -> Vec<(StationId, StationId)> {
        let mut edges = Vec::new();
        for (from, targets) in &self.0 {
            for to in targets {
                if !self.neighbours(to).contains(from) {
                    edges.push((from.clone(), to.clone()));
                }
            }
        }
        edges
    }
}

/// Hyperparameters handed to the model fitter, uniform across all terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamParams {
    /// Regularization strength.
    pub lam: f64,
    /// Spline count per tensor term.
    pub n_splines: usize,
}

impl Default for GamParams {
    fn default() -> Self {
        Self {
            lam: 0.1,
            n_splines: 10,
        }
    }
}

/// Feature groups used to assemble tensor terms, by column name.
///
/// The last entry of `fixed` is deferred until after the first round of
/// nearby pairings, and the last entry of `nearby` is applied after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermLayout {
    pub fixed: Vec<Vec<String>>,
    /// Partner features combined with each nearby-station column.
    pub nearby: Vec<Vec<String>>,
    /// Extra terms used only when the table has no nearby-station column.
    pub global: Vec<Vec<String>>,
}

impl Default for TermLayout {
    fn default() -> Self {
        let group = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        Self {
            fixed: vec![
                group(&["prev_2_mo", "month", "hour"]),
                group(&["month", "hour", "day"]),
                group(&["month", "windspeed_north", "windspeed_east"]),
            ],
            nearby: vec![group(&["month", "hour"]), group(&["doW_x", "doW_y"])],
            global: vec![
                group(&["prev_2_mo", "national"]),
                group(&["national", "doW_x", "doW_y"]),
            ],
        }
    }
}

/// Post-processing candidates and scoring options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Score absolute predictions.
    pub apply_abs: bool,
    /// Forecast days per station in solution and submission files.
    pub days_per_station: usize,
    pub candidates: Vec<CandidateMethod>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        let candidate = |method: &str, window: Option<usize>| CandidateMethod {
            method: method.to_string(),
            window,
        };
        Self {
            candidates: vec![
                candidate("daily_max", None),
                candidate("hourly_mean", None),
                candidate("hourly_max", None),
                candidate("averaged_smoothed_max", Some(9)),
                candidate("averaged_smoothed_max", Some(13)),
                candidate("averaged_smoothed_max", Some(17)),
                candidate("weighted_smoothed_max", Some(9)),
                candidate("weighted_smoothed_max", Some(13)),
                candidate("weighted_smoothed_max", Some(17)),
            ],
            apply_abs: true,
            days_per_station: 56,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMethod {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_tables() {
        let config = PipelineConfig::default();
        assert_eq!(config.phase_stations(1).len(), 3);
        assert_eq!(config.weather.len(), 4);
        assert!(config.weather[0].cubic);
        assert!(config.is_outlier_station(&StationId::new("BOURNVILLE CB 7")));
        assert!(!config.is_outlier_station(&StationId::new("STRATTON CB 4041")));
        assert_eq!(config.evaluation.candidates.len(), 9);
    }

    #[test]
    fn test_nearby_asymmetry_is_preserved() {
        let graph = NearbyGraph::default();
        let portishead = StationId::new("PORTISHEAD ASHLANDS CB 4");
        assert_eq!(graph.neighbours(&portishead).len(), 2);
        let one_way = graph.one_way_edges();
        assert_eq!(one_way.len(), 2);
        assert!(one_way.iter().all(|(from, _)| from == &portishead));
    }

    #[test]
    fn test_resolve_stations_by_prefix() {
        let config = PipelineConfig::default();
        let mut diag = Diagnostics::new();
        let resolved = config.resolve_stations(
            1,
            &["bournville".to_string(), "nowhere".to_string()],
            &mut diag,
        );
        assert_eq!(resolved, vec![StationId::new("BOURNVILLE CB 7")]);
        assert_eq!(diag.error_count(), 1);
    }

    #[test]
    fn test_resolve_empty_request_selects_roster() {
        let config = PipelineConfig::default();
        let mut diag = Diagnostics::new();
        assert_eq!(config.resolve_stations(1, &[], &mut diag).len(), 3);
        assert!(!diag.has_issues());
    }

    #[test]
    fn test_every_rostered_station_has_a_weather_site() {
        let config = PipelineConfig::default();
        for roster in config.phases.values() {
            for station in roster {
                assert!(
                    config.weather_sites.contains_key(station),
                    "{station} has no weather site"
                );
            }
        }
        assert!(config.phase_stations(2).is_empty());
    }

    #[test]
    fn test_partial_config_parsing() {
        let toml = r#"
            smooth_input = false
            national_years = [2021]

            [gam]
            lam = 0.5
        "#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert!(!config.smooth_input);
        assert_eq!(config.national_years, vec![2021]);
        assert_eq!(config.gam.lam, 0.5);
        assert_eq!(config.gam.n_splines, 10);
        assert_eq!(config.load_window, 7);
    }

    #[test]
    fn test_save_and_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = PipelineConfig::default();
        config.outlier_sigma = 2.5;
        config.save_to(file.path()).unwrap();

        let loaded = PipelineConfig::load_from(file.path()).unwrap();
        assert_eq!(loaded, config);
    }
}

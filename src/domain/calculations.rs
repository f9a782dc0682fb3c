//! Pure weather calculations
//!
//! Every function here is deterministic and total over its numeric inputs. Results carry an
//! `input` echo, a `result` object and an optional `formula`/`note` annotation, which is the
//! payload shape tools return to MCP clients.

use std::f64::consts::PI;

use serde::{ser::SerializeStruct, Serialize, Serializer};

const STANDARD_GRAVITY: f64 = 9.80665;
const AIR_MOLAR_MASS: f64 = 0.0289644;
const GAS_CONSTANT: f64 = 8.31432;
const KMH_TO_MPH: f64 = 0.621371;
const WIND_CHILL_MIN_KMH: f64 = 4.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculation<I, R> {
    pub input: I,
    pub result: R,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// Rounds to `places` decimal places, sending exact ties to the even neighbour.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelsiusInput {
    pub celsius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FahrenheitInput {
    pub fahrenheit: f64,
}

pub fn celsius_to_fahrenheit(celsius: f64) -> Calculation<CelsiusInput, FahrenheitInput> {
    Calculation {
        input: CelsiusInput { celsius },
        result: FahrenheitInput {
            fahrenheit: round_to(to_fahrenheit(celsius), 2),
        },
        formula: Some("°F = (°C × 9/5) + 32"),
        note: None,
    }
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> Calculation<FahrenheitInput, CelsiusInput> {
    Calculation {
        input: FahrenheitInput { fahrenheit },
        result: CelsiusInput {
            celsius: round_to(to_celsius(fahrenheit), 2),
        },
        formula: Some("°C = (°F - 32) × 5/9"),
        note: None,
    }
}

fn to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

fn to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatIndexInput {
    pub temperature_f: f64,
    pub humidity_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatIndexResult {
    pub heat_index_f: f64,
    pub risk_level: &'static str,
}

/// Heat index via the NWS Rothfusz regression.
///
/// Below 80°F the temperature is returned unchanged. At most one of the low- and high-humidity
/// adjustments applies.
pub fn calculate_heat_index(
    temperature_f: f64,
    humidity: f64,
) -> Calculation<HeatIndexInput, HeatIndexResult> {
    let t = temperature_f;
    let r = humidity;

    let heat_index = if t < 80.0 {
        t
    } else {
        let mut hi = -42.379 + 2.04901523 * t + 10.14333127 * r
            - 0.22475541 * t * r
            - 6.83783e-3 * t.powi(2)
            - 5.481717e-2 * r.powi(2)
            + 1.22874e-3 * t.powi(2) * r
            + 8.5282e-4 * t * r.powi(2)
            - 1.99e-6 * t.powi(2) * r.powi(2);

        if r < 13.0 && (80.0..=112.0).contains(&t) {
            hi -= ((13.0 - r) / 4.0) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
        } else if r > 85.0 && (80.0..=87.0).contains(&t) {
            hi += ((r - 85.0) / 10.0) * ((87.0 - t) / 5.0);
        }

        hi
    };

    let risk_level = match heat_index {
        value if value < 80.0 => "No risk",
        value if value < 90.0 => "Caution",
        value if value < 105.0 => "Extreme caution",
        value if value < 130.0 => "Danger",
        _ => "Extreme danger",
    };

    Calculation {
        input: HeatIndexInput {
            temperature_f,
            humidity_percent: humidity,
        },
        result: HeatIndexResult {
            heat_index_f: round_to(heat_index, 1),
            risk_level,
        },
        formula: Some("Rothfusz regression (NWS standard)"),
        note: None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindChillInput {
    pub temperature_f: f64,
    pub wind_speed_mph: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindChillResult {
    pub wind_chill_f: f64,
    pub applicable: bool,
    pub risk_level: &'static str,
}

/// NWS wind chill. Only applies when T ≤ 50°F and wind ≥ 3 mph.
pub fn calculate_wind_chill(
    temperature_f: f64,
    wind_speed_mph: f64,
) -> Calculation<WindChillInput, WindChillResult> {
    let t = temperature_f;
    let v = wind_speed_mph;

    let applicable = !(t > 50.0 || v < 3.0);
    let wind_chill = if applicable {
        let v_exp = v.powf(0.16);
        35.74 + 0.6215 * t - 35.75 * v_exp + 0.4275 * t * v_exp
    } else {
        t
    };

    let risk_level = if !applicable {
        "Not applicable"
    } else if wind_chill > 16.0 {
        "No risk"
    } else if wind_chill > -15.0 {
        "Uncomfortable"
    } else if wind_chill > -35.0 {
        "Risk of frostbite"
    } else {
        "Extreme risk"
    };

    Calculation {
        input: WindChillInput {
            temperature_f,
            wind_speed_mph,
        },
        result: WindChillResult {
            wind_chill_f: round_to(wind_chill, 1),
            applicable,
            risk_level,
        },
        formula: Some("NWS Wind Chill formula"),
        note: Some("Only applicable when T ≤ 50°F and wind ≥ 3 mph"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DewPointInput {
    pub temperature_c: f64,
    pub humidity_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DewPointResult {
    pub dew_point_c: f64,
    pub dew_point_f: f64,
    pub comfort_level: &'static str,
}

pub fn calculate_dew_point(
    temperature_c: f64,
    humidity: f64,
) -> Calculation<DewPointInput, DewPointResult> {
    const A: f64 = 17.27;
    const B: f64 = 237.7;

    let alpha = (A * temperature_c) / (B + temperature_c) + (humidity / 100.0).ln();
    let dew_point = (B * alpha) / (A - alpha);
    let dew_point_f = to_fahrenheit(dew_point);

    let comfort_level = match dew_point_f {
        value if value < 50.0 => "Very dry",
        value if value < 55.0 => "Comfortable",
        value if value < 60.0 => "Slightly humid",
        value if value < 65.0 => "Humid",
        value if value < 70.0 => "Very humid",
        _ => "Oppressive",
    };

    Calculation {
        input: DewPointInput {
            temperature_c,
            humidity_percent: humidity,
        },
        result: DewPointResult {
            dew_point_c: round_to(dew_point, 2),
            dew_point_f: round_to(dew_point_f, 2),
            comfort_level,
        },
        formula: Some("Magnus formula approximation"),
        note: None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeaLevelPressureInput {
    pub station_pressure_hpa: f64,
    pub altitude_m: f64,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeaLevelPressureResult {
    pub sea_level_pressure_hpa: f64,
    pub pressure_difference_hpa: f64,
}

pub fn pressure_altitude_to_sea_level(
    pressure_hpa: f64,
    altitude_m: f64,
    temperature_c: f64,
) -> Calculation<SeaLevelPressureInput, SeaLevelPressureResult> {
    let kelvin = temperature_c + 273.15;
    let sea_level = pressure_hpa
        * ((STANDARD_GRAVITY * AIR_MOLAR_MASS * altitude_m) / (GAS_CONSTANT * kelvin)).exp();

    Calculation {
        input: SeaLevelPressureInput {
            station_pressure_hpa: pressure_hpa,
            altitude_m,
            temperature_c,
        },
        result: SeaLevelPressureResult {
            sea_level_pressure_hpa: round_to(sea_level, 2),
            pressure_difference_hpa: round_to(sea_level - pressure_hpa, 2),
        },
        formula: Some("Barometric formula"),
        note: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeelsLikeMethod {
    HeatIndex,
    WindChill,
    ApparentTemperature,
}

impl FeelsLikeMethod {
    pub fn label(self) -> &'static str {
        match self {
            Self::HeatIndex => "Heat Index",
            Self::WindChill => "Wind Chill",
            Self::ApparentTemperature => "Apparent Temperature",
        }
    }
}

impl Serialize for FeelsLikeMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeelsLikeInput {
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeelsLikeResult {
    pub feels_like_c: f64,
    pub feels_like_f: f64,
    pub method_used: FeelsLikeMethod,
}

/// Apparent temperature, picking heat index, wind chill or the plain apparent-temperature
/// formula from the Fahrenheit equivalent of `temperature_c`.
pub fn calculate_feels_like(
    temperature_c: f64,
    humidity: f64,
    wind_speed_kmh: f64,
) -> Calculation<FeelsLikeInput, FeelsLikeResult> {
    let t = temperature_c;
    let t_f = to_fahrenheit(t);

    let (feels_like_f, method) = if t_f >= 80.0 {
        (
            calculate_heat_index(t_f, humidity).result.heat_index_f,
            FeelsLikeMethod::HeatIndex,
        )
    } else if t_f <= 50.0 && wind_speed_kmh >= WIND_CHILL_MIN_KMH {
        (
            calculate_wind_chill(t_f, wind_speed_kmh * KMH_TO_MPH)
                .result
                .wind_chill_f,
            FeelsLikeMethod::WindChill,
        )
    } else {
        let vapour = 0.33 * (humidity / 100.0) * 6.105 * (17.27 * t / (237.7 + t)).exp();
        (
            t_f + vapour - 0.7 * (wind_speed_kmh / 3.6) - 4.0,
            FeelsLikeMethod::ApparentTemperature,
        )
    };

    Calculation {
        input: FeelsLikeInput {
            temperature_c,
            humidity_percent: humidity,
            wind_speed_kmh,
        },
        result: FeelsLikeResult {
            feels_like_c: round_to(to_celsius(feels_like_f), 1),
            feels_like_f: round_to(feels_like_f, 1),
            method_used: method,
        },
        formula: None,
        note: Some("Automatically selects appropriate calculation method based on conditions"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Daylight {
    Normal { sunrise_utc: String, sunset_utc: String },
    PolarDay,
    PolarNight,
}

impl Daylight {
    pub fn condition(&self) -> &'static str {
        match self {
            Self::Normal { .. } => "normal",
            Self::PolarDay => "polar_day",
            Self::PolarNight => "polar_night",
        }
    }
}

/// Keeps the wire shape `{sunrise_utc, sunset_utc, condition}`; polar variants carry sentinel
/// strings in both time fields.
impl Serialize for Daylight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (sunrise, sunset) = match self {
            Self::Normal {
                sunrise_utc,
                sunset_utc,
            } => (sunrise_utc.as_str(), sunset_utc.as_str()),
            Self::PolarDay => ("No sunset (polar day)", "No sunset (polar day)"),
            Self::PolarNight => ("No sunrise (polar night)", "No sunrise (polar night)"),
        };

        let mut state = serializer.serialize_struct("Daylight", 3)?;
        state.serialize_field("sunrise_utc", sunrise)?;
        state.serialize_field("sunset_utc", sunset)?;
        state.serialize_field("condition", self.condition())?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunriseSunsetInput {
    pub latitude: f64,
    pub longitude: f64,
    pub day_of_year: i64,
}

pub fn sunrise_sunset_times(
    latitude: f64,
    longitude: f64,
    day_of_year: i64,
) -> Calculation<SunriseSunsetInput, Daylight> {
    let lat = latitude.to_radians();
    let declination = (0.39795 * (0.98563 * (day_of_year as f64 - 173.0) * PI / 180.0).cos()).asin();
    let argument = -lat.tan() * declination.tan();

    let daylight = if argument < -1.0 {
        Daylight::PolarDay
    } else if argument > 1.0 {
        Daylight::PolarNight
    } else {
        let hour_angle = 24.0 * argument.acos() / (2.0 * PI);
        Daylight::Normal {
            sunrise_utc: format_clock(12.0 - hour_angle - longitude / 15.0),
            sunset_utc: format_clock(12.0 + hour_angle - longitude / 15.0),
        }
    };

    Calculation {
        input: SunriseSunsetInput {
            latitude,
            longitude,
            day_of_year,
        },
        result: daylight,
        formula: None,
        note: Some("Times are in UTC. Add timezone offset for local time."),
    }
}

/// Formats decimal hours as `HH:MM`, wrapping into a single day and truncating minutes.
fn format_clock(decimal_hours: f64) -> String {
    let wrapped = decimal_hours.rem_euclid(24.0);
    let hours = wrapped.trunc() as u32 % 24;
    let minutes = (wrapped.fract() * 60.0).trunc() as u32;
    format!("{hours:02}:{minutes:02}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UvIndexInput {
    pub solar_elevation_degrees: f64,
    pub ozone_thickness_du: f64,
    pub cloud_cover_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UvIndexResult {
    pub uv_index: f64,
    pub risk_level: &'static str,
    pub protection_advice: &'static str,
}

pub const DEFAULT_OZONE_DU: f64 = 300.0;
pub const DEFAULT_CLOUD_COVER: f64 = 0.0;

pub fn uv_index_from_solar_elevation(
    solar_elevation_degrees: f64,
    ozone_thickness: f64,
    cloud_cover: f64,
) -> Calculation<UvIndexInput, UvIndexResult> {
    let uv_index = if solar_elevation_degrees <= 0.0 {
        0.0
    } else {
        let base = 11.0 * solar_elevation_degrees.to_radians().sin();
        let ozone_factor = 300.0 / ozone_thickness.max(100.0);
        let cloud_factor = 1.0 - (cloud_cover / 100.0) * 0.8;
        (base * ozone_factor * cloud_factor).clamp(0.0, 11.0)
    };

    let (risk_level, protection_advice) = match uv_index {
        value if value < 3.0 => ("Low", "Minimal protection required"),
        value if value < 6.0 => ("Moderate", "Seek shade during midday hours"),
        value if value < 8.0 => ("High", "Protection essential"),
        value if value < 11.0 => ("Very High", "Extra protection required"),
        _ => ("Extreme", "Avoid outdoor activities"),
    };

    Calculation {
        input: UvIndexInput {
            solar_elevation_degrees,
            ozone_thickness_du: ozone_thickness,
            cloud_cover_percent: cloud_cover,
        },
        result: UvIndexResult {
            uv_index: round_to(uv_index, 1),
            risk_level,
            protection_advice,
        },
        formula: None,
        note: Some("Simplified calculation for demonstration"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Water,
    Ice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureInput {
    pub temperature_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaporPressureResult {
    pub saturation_vapor_pressure_hpa: f64,
    pub saturation_vapor_pressure_pa: f64,
    pub saturation_vapor_pressure_mmhg: f64,
    pub phase: Phase,
}

/// Tetens formula, over water for T ≥ 0°C and over ice below.
pub fn saturation_vapor_pressure(
    temperature_c: f64,
) -> Calculation<TemperatureInput, VaporPressureResult> {
    let t = temperature_c;
    let (es, phase) = if t >= 0.0 {
        (6.1078 * ((17.27 * t) / (t + 237.3)).exp(), Phase::Water)
    } else {
        (6.1078 * ((21.875 * t) / (t + 265.5)).exp(), Phase::Ice)
    };

    Calculation {
        input: TemperatureInput { temperature_c },
        result: VaporPressureResult {
            saturation_vapor_pressure_hpa: round_to(es, 3),
            saturation_vapor_pressure_pa: round_to(es * 100.0, 1),
            saturation_vapor_pressure_mmhg: round_to(es * 0.750062, 3),
            phase,
        },
        formula: Some("Tetens formula"),
        note: Some("Calculation over water for T ≥ 0°C, over ice for T < 0°C"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_fixed_points() {
        assert_eq!(celsius_to_fahrenheit(0.0).result.fahrenheit, 32.0);
        assert_eq!(celsius_to_fahrenheit(25.0).result.fahrenheit, 77.0);
        assert_eq!(celsius_to_fahrenheit(100.0).result.fahrenheit, 212.0);
        assert_eq!(fahrenheit_to_celsius(32.0).result.celsius, 0.0);
        assert_eq!(fahrenheit_to_celsius(-40.0).result.celsius, -40.0);
    }

    #[test]
    fn temperature_conversion_round_trips_within_rounding() {
        for celsius in [-60.5, -17.78, 0.0, 12.34, 36.6, 58.0] {
            let fahrenheit = celsius_to_fahrenheit(celsius).result.fahrenheit;
            let back = fahrenheit_to_celsius(fahrenheit).result.celsius;
            assert!((back - celsius).abs() <= 0.01, "{celsius} -> {back}");
        }
    }

    #[test]
    fn heat_index_below_threshold_returns_temperature() {
        let calculation = calculate_heat_index(70.0, 50.0);
        assert_eq!(calculation.result.heat_index_f, 70.0);
        assert_eq!(calculation.result.risk_level, "No risk");
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(-2.5, 0), -2.0);
        assert_eq!(calculate_heat_index(70.25, 50.0).result.heat_index_f, 70.2);
    }

    #[test]
    fn heat_index_applies_regression_in_hot_humid_air() {
        let calculation = calculate_heat_index(90.0, 60.0);
        assert_eq!(calculation.result.heat_index_f, 99.7);
        assert_eq!(calculation.result.risk_level, "Extreme caution");
    }

    #[test]
    fn heat_index_low_humidity_adjustment_lowers_value() {
        let dry = calculate_heat_index(95.0, 10.0).result.heat_index_f;
        let t = 95.0_f64;
        let r = 10.0_f64;
        let raw = -42.379 + 2.04901523 * t + 10.14333127 * r
            - 0.22475541 * t * r
            - 6.83783e-3 * t.powi(2)
            - 5.481717e-2 * r.powi(2)
            + 1.22874e-3 * t.powi(2) * r
            + 8.5282e-4 * t * r.powi(2)
            - 1.99e-6 * t.powi(2) * r.powi(2);
        assert!(dry < round_to(raw, 1));
    }

    #[test]
    fn wind_chill_applies_in_cold_wind() {
        let calculation = calculate_wind_chill(30.0, 15.0);
        assert!(calculation.result.applicable);
        assert!(calculation.result.wind_chill_f < 30.0);
        assert_eq!(calculation.result.wind_chill_f, 19.0);
    }

    #[test]
    fn wind_chill_not_applicable_when_warm_or_calm() {
        let warm = calculate_wind_chill(60.0, 15.0);
        assert!(!warm.result.applicable);
        assert_eq!(warm.result.wind_chill_f, 60.0);
        assert_eq!(warm.result.risk_level, "Not applicable");

        let calm = calculate_wind_chill(20.0, 2.9);
        assert!(!calm.result.applicable);
        assert_eq!(calm.result.wind_chill_f, 20.0);
    }

    #[test]
    fn dew_point_equals_temperature_at_saturation() {
        let calculation = calculate_dew_point(20.0, 100.0);
        assert_eq!(calculation.result.dew_point_c, 20.0);
        assert_eq!(calculation.result.dew_point_f, 68.0);
        assert_eq!(calculation.result.comfort_level, "Very humid");
    }

    #[test]
    fn sea_level_pressure_is_unchanged_at_sea_level() {
        let calculation = pressure_altitude_to_sea_level(1013.25, 0.0, 15.0);
        assert_eq!(calculation.result.sea_level_pressure_hpa, 1013.25);
        assert_eq!(calculation.result.pressure_difference_hpa, 0.0);

        let raised = pressure_altitude_to_sea_level(900.0, 1000.0, 10.0);
        assert!(raised.result.sea_level_pressure_hpa > 900.0);
    }

    #[test]
    fn feels_like_selects_method_by_fahrenheit_threshold() {
        let hot = calculate_feels_like(30.0, 70.0, 10.0);
        assert_eq!(hot.result.method_used, FeelsLikeMethod::HeatIndex);
        assert_eq!(
            hot.result.feels_like_f,
            calculate_heat_index(86.0, 70.0).result.heat_index_f
        );

        let cold = calculate_feels_like(0.0, 50.0, 20.0);
        assert_eq!(cold.result.method_used, FeelsLikeMethod::WindChill);
        assert!(cold.result.feels_like_f < 32.0);

        let mild = calculate_feels_like(15.0, 50.0, 10.0);
        assert_eq!(mild.result.method_used, FeelsLikeMethod::ApparentTemperature);
    }

    #[test]
    fn feels_like_calm_cold_air_uses_apparent_temperature() {
        let calculation = calculate_feels_like(5.0, 50.0, 4.7);
        assert_eq!(
            calculation.result.method_used,
            FeelsLikeMethod::ApparentTemperature
        );
    }

    #[test]
    fn sunrise_sunset_on_equator_is_near_six() {
        let calculation = sunrise_sunset_times(0.0, 0.0, 80);
        match &calculation.result {
            Daylight::Normal {
                sunrise_utc,
                sunset_utc,
            } => {
                assert!(sunrise_utc.starts_with("05:") || sunrise_utc.starts_with("06:"));
                assert!(sunset_utc.starts_with("17:") || sunset_utc.starts_with("18:"));
            }
            other => panic!("expected normal daylight, got {other:?}"),
        }
    }

    #[test]
    fn sunrise_sunset_detects_polar_conditions() {
        assert_eq!(sunrise_sunset_times(80.0, 0.0, 172).result, Daylight::PolarDay);
        assert_eq!(sunrise_sunset_times(80.0, 0.0, 355).result, Daylight::PolarNight);
    }

    #[test]
    fn polar_daylight_serializes_sentinel_strings() {
        let value = serde_json::to_value(Daylight::PolarNight).expect("serialize");
        assert_eq!(
            value,
            json!({
                "sunrise_utc": "No sunrise (polar night)",
                "sunset_utc": "No sunrise (polar night)",
                "condition": "polar_night"
            })
        );
    }

    #[test]
    fn clock_wraps_into_a_single_day() {
        assert_eq!(format_clock(6.5), "06:30");
        assert_eq!(format_clock(-1.5), "22:30");
        assert_eq!(format_clock(25.25), "01:15");
    }

    #[test]
    fn uv_index_is_zero_without_sun() {
        for elevation in [0.0, -5.0, -90.0] {
            let calculation = uv_index_from_solar_elevation(elevation, 150.0, 0.0);
            assert_eq!(calculation.result.uv_index, 0.0);
            assert_eq!(calculation.result.risk_level, "Low");
        }
    }

    #[test]
    fn uv_index_is_clamped_to_eleven() {
        let calculation = uv_index_from_solar_elevation(90.0, 100.0, 0.0);
        assert_eq!(calculation.result.uv_index, 11.0);
        assert_eq!(calculation.result.risk_level, "Extreme");

        let cloudy = uv_index_from_solar_elevation(90.0, DEFAULT_OZONE_DU, 100.0);
        assert_eq!(cloudy.result.uv_index, 2.2);
    }

    #[test]
    fn saturation_vapor_pressure_switches_phase_at_zero() {
        let freezing = saturation_vapor_pressure(0.0);
        assert_eq!(freezing.result.phase, Phase::Water);
        assert_eq!(freezing.result.saturation_vapor_pressure_hpa, 6.108);

        let below = saturation_vapor_pressure(-0.1);
        assert_eq!(below.result.phase, Phase::Ice);
    }

    #[test]
    fn calculation_serializes_input_result_and_annotations() {
        let value = serde_json::to_value(saturation_vapor_pressure(20.0)).expect("serialize");
        assert_eq!(value["input"]["temperature_c"], json!(20.0));
        assert_eq!(value["result"]["phase"], json!("water"));
        assert_eq!(value["formula"], json!("Tetens formula"));
        assert!(value["note"].is_string());

        let without_note = serde_json::to_value(celsius_to_fahrenheit(1.0)).expect("serialize");
        assert!(without_note.get("note").is_none());
    }
}

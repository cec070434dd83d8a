// PyO3 bindings for gpsfields_core
use log::{debug, warn};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};
use std::fmt::Display;
use std::time::SystemTime;

use gpsfields_core as core;

use gpsfields_core::{Reading, SensorFields, CONFIG_CACHE, DEFAULT_BUFFER_CAPACITY};

// Parallel iterators for batch parsing
use rayon::prelude::*;

fn value_error(e: impl Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn reading_to_dict<'py>(py: Python<'py>, r: &Reading) -> PyResult<Bound<'py, PyDict>> {
    let d = PyDict::new(py);
    d.set_item("lat", &r.lat)?;
    d.set_item("lng", &r.lng)?;
    if let Some(h) = &r.humidity {
        d.set_item("humidity", h)?;
    }
    if let Some(t) = &r.temperature {
        d.set_item("temperature", t)?;
    }
    Ok(d)
}

/// Split `line` on `delimiter` into four fixed-capacity fields.
/// Returns `(count, [lat, lon, humidity, temperature])`; fields past `count`
/// are empty strings. Raises ValueError for a multi-byte delimiter or a
/// capacity outside `1..=MAX_BUFFER_CAPACITY`.
#[pyfunction]
#[pyo3(signature = (line, delimiter = ",", buffer_capacity = DEFAULT_BUFFER_CAPACITY))]
fn extract_fields(line: &str, delimiter: &str, buffer_capacity: usize) -> PyResult<(usize, Vec<String>)> {
    let delim = core::Delimiter::try_from(delimiter).map_err(value_error)?;
    core::check_capacity(buffer_capacity).map_err(value_error)?;
    let mut fields = SensorFields::with_capacity(buffer_capacity);
    let found = fields.extract(line.as_bytes(), delim.byte());
    let values = core::Field::ALL.iter().map(|&f| fields.get_str(f).into_owned()).collect();
    Ok((found, values))
}

/// Parse a reader line (optionally prefixed with `GPS_DATA:`) into a dict with
/// `lat`, `lng` and, when present, `humidity` and `temperature`. Values are
/// strings. Raises ValueError when the line is empty or lacks coordinates.
#[pyfunction]
#[pyo3(text_signature = "(line)")]
fn parse_reading(py: Python, line: &str) -> PyResult<Py<PyDict>> {
    let cfg = core::current_config();
    let reading = core::parse_reading(line, &cfg).map_err(value_error)?;
    Ok(reading_to_dict(py, &reading)?.unbind())
}

/// Parse a reader line using the config at the given path (cached by mtime).
#[pyfunction]
#[pyo3(text_signature = "(line, config_path)")]
fn parse_reading_with_config(py: Python, line: &str, config_path: &str) -> PyResult<Py<PyDict>> {
    core::ensure_config_loaded(config_path).map_err(value_error)?;
    parse_reading(py, line)
}

/// Parse a batch of reader lines in parallel. Lines that cannot be parsed
/// yield None instead of raising.
#[pyfunction]
#[pyo3(text_signature = "(lines)")]
fn parse_readings_batch(py: Python, lines: Vec<String>) -> PyResult<Vec<Option<Py<PyDict>>>> {
    let cfg = core::current_config();

    // One buffer set per rayon worker; no Python objects are touched here.
    let readings: Vec<Option<Reading>> = lines
        .par_iter()
        .map_init(
            || SensorFields::with_capacity(cfg.buffer_capacity),
            |fields, line| core::parse_reading_with(line, &cfg, fields).ok(),
        )
        .collect();

    let mut out: Vec<Option<Py<PyDict>>> = Vec::with_capacity(readings.len());
    for r in readings {
        match r {
            Some(reading) => out.push(Some(reading_to_dict(py, &reading)?.unbind())),
            None => out.push(None),
        }
    }
    Ok(out)
}

/// Parse every line of `input_path` and write one JSON reading per line to
/// `output_path`. Unparseable lines are skipped. Returns the number written.
#[pyfunction]
#[pyo3(text_signature = "(input_path, output_path)")]
fn parse_file_to_ndjson(input_path: &str, output_path: &str) -> PyResult<usize> {
    use std::io::{BufRead, BufReader, BufWriter, Write};
    let cfg = core::current_config();

    let infile = std::fs::File::open(input_path).map_err(value_error)?;
    let outfile = std::fs::File::create(output_path).map_err(value_error)?;
    let reader = BufReader::new(infile);
    let mut writer = BufWriter::new(outfile);
    let mut fields = SensorFields::with_capacity(cfg.buffer_capacity);

    let mut count: usize = 0;
    for (lineno, line_res) in reader.lines().enumerate() {
        let line = line_res.map_err(value_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let reading = match core::parse_reading_with(&line, &cfg, &mut fields) {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping line {} of {}: {}", lineno + 1, input_path, e);
                continue;
            }
        };
        serde_json::to_writer(&mut writer, &reading).map_err(value_error)?;
        writer.write_all(b"\n").map_err(value_error)?;
        count += 1;
    }
    writer.flush().map_err(value_error)?;
    Ok(count)
}

/// Load extractor config from a JSON file path. Returns True on success.
/// Raises ValueError if the file cannot be read, parsed or validated.
#[pyfunction]
#[pyo3(text_signature = "(config_path)")]
fn load_config(config_path: &str) -> PyResult<bool> {
    let loaded = core::load_config_internal(config_path).map_err(value_error)?;
    core::store_config(loaded);
    Ok(true)
}

/// Set extractor config from a JSON string. Returns True on success.
#[pyfunction]
#[pyo3(text_signature = "(config_json)")]
fn set_config_json(config_json: &str) -> PyResult<bool> {
    let loaded = core::LoadedConfig::from_json(config_json).map_err(value_error)?;
    core::store_config(loaded);
    Ok(true)
}

/// Return the active config and where it came from.
#[pyfunction]
#[pyo3(text_signature = "()")]
fn get_config_status(py: Python) -> PyResult<Py<PyDict>> {
    let guard = CONFIG_CACHE
        .read()
        .map_err(|_| PyRuntimeError::new_err("config cache lock poisoned"))?;
    let d = PyDict::new(py);
    match guard.as_ref() {
        Some(lc) => {
            d.set_item("loaded", true)?;
            d.set_item("path", lc.path.clone())?;
            d.set_item("source", if lc.path.is_some() { "file" } else { "json" })?;
            match lc.mtime.and_then(|mt| mt.duration_since(SystemTime::UNIX_EPOCH).ok()) {
                Some(dur) => {
                    let ms: i64 = (dur.as_secs() as i64) * 1000 + (dur.subsec_millis() as i64);
                    d.set_item("mtime_epoch_ms", ms)?;
                }
                None => d.set_item("mtime_epoch_ms", py.None())?,
            }
        }
        None => {
            d.set_item("loaded", false)?;
            d.set_item("path", py.None())?;
            d.set_item("source", py.None())?;
            d.set_item("mtime_epoch_ms", py.None())?;
        }
    }
    let cfg = guard.as_ref().map(|lc| lc.config.clone()).unwrap_or_default();
    d.set_item("delimiter", cfg.delimiter.to_string())?;
    d.set_item("buffer_capacity", cfg.buffer_capacity)?;
    d.set_item("record_prefix", cfg.record_prefix)?;
    Ok(d.unbind())
}

#[pymodule]
#[pyo3(module = "gpsfields_rs")]
fn gpsfields_rs(_py: Python, m: &Bound<PyModule>) -> PyResult<()> {
    m.add(
        "__doc__",
        "Fixed-arity tokenizer for delimited sensor records.\n\n\
        Splits lines such as '19.043,-98.194,60.5,25.1' into latitude,\n\
        longitude, humidity and temperature without interpreting the values.\n\n\
        Quick start:\n\
        >>> import gpsfields_rs as gf\n\
        >>> gf.extract_fields('20.001,-99.002')\n\
        (2, ['20.001', '-99.002', '', ''])\n\
        >>> gf.parse_reading('GPS_DATA:19.043,-98.194,60.5')\n\
        {'lat': '19.043', 'lng': '-98.194', 'humidity': '60.5'}",
    )?;
    m.add("MAX_FIELDS", core::MAX_FIELDS)?;
    m.add("DEFAULT_BUFFER_CAPACITY", DEFAULT_BUFFER_CAPACITY)?;
    m.add("MAX_BUFFER_CAPACITY", core::MAX_BUFFER_CAPACITY)?;

    // Tokenizer
    m.add_function(wrap_pyfunction!(extract_fields, m)?)?;

    // Reader lines
    m.add_function(wrap_pyfunction!(parse_reading, m)?)?;
    m.add_function(wrap_pyfunction!(parse_reading_with_config, m)?)?;
    m.add_function(wrap_pyfunction!(parse_readings_batch, m)?)?;
    m.add_function(wrap_pyfunction!(parse_file_to_ndjson, m)?)?;

    // Config
    m.add_function(wrap_pyfunction!(load_config, m)?)?;
    m.add_function(wrap_pyfunction!(set_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(get_config_status, m)?)?;

    // Optional: preload config from env var.
    if let Ok(path) = std::env::var("GPSFIELDS_CONFIG") {
        match core::load_config_internal(&path) {
            Ok(loaded) => core::store_config(loaded),
            Err(e) => warn!("ignoring GPSFIELDS_CONFIG: {}", e),
        }
    }

    Ok(())
}

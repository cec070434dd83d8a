// gpsfields_core: pure Rust library for fixed-arity delimited sensor records
// (lat, lon, humidity, temperature) written into caller-owned buffers.
pub mod config;
pub mod error;
pub mod extractor;
pub mod raw;
pub mod record;
pub mod tokenizer;

pub use config::{
    check_capacity, config_from_json, current_config, ensure_config_loaded, load_config_internal,
    store_config, Delimiter, ExtractorConfig, LoadedConfig, CONFIG_CACHE,
};
pub use error::{ConfigError, ExtractError, RecordError};
pub use extractor::{
    extract_fields, Field, SensorFields, DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY, MAX_FIELDS,
};
pub use raw::extract_fields_raw;
pub use record::{
    parse_reading, parse_reading_with, split_reading, strip_record_prefix, Reading,
    DEFAULT_RECORD_PREFIX, REQUIRED_FIELDS,
};
pub use tokenizer::{copy_token, terminated};

pub mod error;
pub mod validation;
pub mod formats;
pub mod fs;

pub use error::{ConverterError, ConverterResult};
pub use validation::{validate_config, validate_source};
pub use formats::{SourceFormat, base_name, file_name_of, format_kb, output_name};
pub use fs::{read_source, write_download};

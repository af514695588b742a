//! Infrastructure adapters for Trustgrant ports.

#![forbid(unsafe_code)]

mod file_output_sink;
mod stdout_output_sink;

pub use file_output_sink::FileOutputSink;
pub use stdout_output_sink::StdoutOutputSink;

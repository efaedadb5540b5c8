//! Ready-made transformers for [`StreamConnector::connect`](crate::StreamConnector::connect).

use crate::core::Result;
use crate::monitor::IoMonitor;
use serde_json::{Map, Value};
use std::io::{self, Read, Write};

/// Identity transform. Returns the number of bytes copied.
pub fn copy<R: Read, W: Write + ?Sized>(mut input: R, output: &mut W) -> Result<u64> {
    Ok(io::copy(&mut input, output)?)
}

/// Converts delimited text records to JSON Lines, one object per record.
///
/// Keys come from the header row, or are `column_{i}` without one. Fields
/// past the end of the header are named the same way.
#[derive(Clone)]
pub struct CsvToJsonLines {
    delimiter: u8,
    has_header: bool,
    monitor: Option<IoMonitor>,
}

impl Default for CsvToJsonLines {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvToJsonLines {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            monitor: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_monitor(mut self, monitor: IoMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Attaches a fresh monitor and returns a handle to it.
    pub fn monitor(&mut self) -> IoMonitor {
        let monitor = IoMonitor::new();
        self.monitor = Some(monitor.clone());
        monitor
    }

    /// Returns the number of records written.
    pub fn transform<R: Read, W: Write + ?Sized>(&self, input: R, output: &mut W) -> Result<u64> {
        if let Some(monitor) = &self.monitor {
            monitor.start();
        }
        let result = self.convert(input, output);
        if let Some(monitor) = &self.monitor {
            monitor.finish();
        }
        result
    }

    fn convert<R: Read, W: Write + ?Sized>(&self, input: R, output: &mut W) -> Result<u64> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .flexible(true)
            .from_reader(input);

        let headers: Vec<String> = if self.has_header {
            reader.headers()?.iter().map(|h| h.trim().to_string()).collect()
        } else {
            Vec::new()
        };

        let mut count = 0;
        let mut line = Vec::new();
        let mut record = csv::StringRecord::new();
        while reader.read_record(&mut record)? {
            // Reader position is just past the record that was read.
            if let Some(monitor) = &self.monitor {
                monitor.set_read(reader.position().byte());
            }

            let mut object = Map::with_capacity(record.len());
            for (i, value) in record.iter().enumerate() {
                let key = headers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", i));
                object.insert(key, Value::String(value.trim().to_string()));
            }

            line.clear();
            serde_json::to_writer(&mut line, &Value::Object(object))?;
            line.push(b'\n');
            output.write_all(&line)?;
            count += 1;
        }
        Ok(count)
    }
}

//! XML export in the BecqMoni `ResultDataFile` format.
//!
//! InterSpec and BecqMoni both import this layout. Output is fully
//! determined by its inputs: element order, indentation and number
//! formatting never vary.

use std::path::Path;
use tracing::info;

use crate::ble::advertising::DeviceInfo;
use crate::data::{Calibration, Spectrum};
use crate::error::{Error, Result};
use crate::session::Capture;

/// Sample name used when none is given.
pub const DEFAULT_SPECTRUM_NAME: &str = "spectrum dumped from radiacode";

const FORMAT_VERSION: &str = "120920";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A spectrum document ready to be serialized.
#[derive(Debug, Clone, Copy)]
pub struct SpectrumDocument<'a> {
    device: &'a DeviceInfo,
    calibration: &'a Calibration,
    spectrum: &'a Spectrum,
    name: &'a str,
}

impl<'a> SpectrumDocument<'a> {
    /// Assemble a document from its parts.
    pub fn new(device: &'a DeviceInfo, calibration: &'a Calibration, spectrum: &'a Spectrum) -> Self {
        Self {
            device,
            calibration,
            spectrum,
            name: DEFAULT_SPECTRUM_NAME,
        }
    }

    /// Assemble a document from a capture.
    pub fn from_capture(capture: &'a Capture) -> Self {
        Self::new(&capture.device, &capture.calibration, &capture.spectrum)
    }

    /// Set the sample/spectrum name.
    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = name;
        self
    }

    /// Serialize to an XML string.
    pub fn to_xml(&self) -> String {
        let mut xml = XmlWriter::new();

        xml.open_with(
            "ResultDataFile",
            &format!("xmlns:xsd=\"{}\" xmlns:xsi=\"{}\"", XSD_NAMESPACE, XSI_NAMESPACE),
        );
        xml.text("FormatVersion", FORMAT_VERSION);
        xml.open("ResultDataList");
        xml.open("ResultData");

        xml.open("DeviceConfigReference");
        xml.text("Name", &self.device.model);
        xml.close("DeviceConfigReference");

        xml.open("SampleInfo");
        xml.cdata("Name", self.name);
        xml.cdata("Note", "");
        xml.close("SampleInfo");

        // No background spectrum is recorded by the device.
        xml.cdata("BackgroundSpectrumFile", "");

        xml.text(
            "StartTime",
            &self.spectrum.start_time().format(TIME_FORMAT).to_string(),
        );
        xml.text(
            "EndTime",
            &self.spectrum.end_time().format(TIME_FORMAT).to_string(),
        );

        xml.open("EnergySpectrum");
        xml.text(
            "NumberOfChannels",
            &self.spectrum.channel_count().to_string(),
        );
        xml.text("ChannelPitch", "1");
        xml.cdata("SpectrumName", self.name);
        xml.empty("Comment");
        xml.text("SerialNumber", &self.device.serial_number);

        xml.open("EnergyCalibration");
        xml.text(
            "PolynomialOrder",
            &self.calibration.polynomial_order().to_string(),
        );
        xml.open("Coefficients");
        for &coefficient in self.calibration.coefficients() {
            xml.text("Coefficient", &format_coefficient(coefficient as f64));
        }
        xml.close("Coefficients");
        xml.close("EnergyCalibration");

        let duration = self.spectrum.duration_secs.to_string();
        xml.text("MeasurementTime", &duration);
        xml.text("LiveTime", &duration);

        xml.open("Spectrum");
        for count in &self.spectrum.counts {
            xml.text("DataPoint", &count.to_string());
        }
        xml.close("Spectrum");
        xml.close("EnergySpectrum");

        xml.text("Visible", "true");

        // Pulse data is not available over BLE; kept for importer compatibility.
        xml.open("PulseCollection");
        xml.text("Format", "Base64 encoded binary");
        xml.empty("Pulses");
        xml.close("PulseCollection");

        xml.close("ResultData");
        xml.close("ResultDataList");
        xml.close("ResultDataFile");

        xml.finish()
    }

    /// Write the document to `path`, creating or truncating the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteError`] if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let xml = self.to_xml();

        std::fs::write(path, xml.as_bytes()).map_err(|source| Error::WriteError {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Wrote {} bytes to {}", xml.len(), path.display());

        Ok(())
    }
}

/// Write a spectrum document with the default name to `path`.
pub fn export(
    path: impl AsRef<Path>,
    device: &DeviceInfo,
    calibration: &Calibration,
    spectrum: &Spectrum,
) -> Result<()> {
    SpectrumDocument::new(device, calibration, spectrum).write_to(path)
}

/// Format a coefficient as `d.dddddddE±XX`.
fn format_coefficient(value: f64) -> String {
    let formatted = format!("{:.7E}", value);
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}E{}{:02}", mantissa, sign, exponent.abs())
        }
        // NaN and infinities carry no exponent.
        None => formatted,
    }
}

/// Escape text content.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Indenting writer for a fixed element tree.
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            out: String::from("<?xml version='1.0' encoding='UTF-8'?>\n"),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn open(&mut self, tag: &str) {
        self.indent();
        self.out.push_str(&format!("<{}>\n", tag));
        self.depth += 1;
    }

    fn open_with(&mut self, tag: &str, attributes: &str) {
        self.indent();
        self.out.push_str(&format!("<{} {}>\n", tag, attributes));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.indent();
        self.out.push_str(&format!("</{}>\n", tag));
    }

    fn text(&mut self, tag: &str, value: &str) {
        self.indent();
        self.out
            .push_str(&format!("<{0}>{1}</{0}>\n", tag, escape_text(value)));
    }

    fn cdata(&mut self, tag: &str, value: &str) {
        self.indent();
        let value = value.replace("]]>", "]]]]><![CDATA[>");
        self.out
            .push_str(&format!("<{0}><![CDATA[{1}]]></{0}>\n", tag, value));
    }

    fn empty(&mut self, tag: &str) {
        self.indent();
        self.out.push_str(&format!("<{}/>\n", tag));
    }

    fn finish(self) -> String {
        self.out
    }
}

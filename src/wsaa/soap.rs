//! SOAP 1.1 framing for the `loginCms` operation.

// crates.io
use quick_xml::{Reader, escape, events::Event};
// self
use crate::{_prelude::*, error::TransportError};

/// Target namespace of the WSAA `LoginCms` service.
pub const WSAA_NAMESPACE: &str = "http://wsaa.view.sua.dvadac.desein.afip.gov";

/// Wraps a base64 CMS envelope in a `loginCms` SOAP request.
pub fn login_cms_request(cms: &str) -> String {
	format!(
		"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
		 <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
		 xmlns:wsaa=\"{WSAA_NAMESPACE}\">\
		 <soapenv:Header/>\
		 <soapenv:Body>\
		 <wsaa:loginCms><wsaa:in0>{}</wsaa:in0></wsaa:loginCms>\
		 </soapenv:Body>\
		 </soapenv:Envelope>",
		escape::escape(cms)
	)
}

#[derive(Debug, Default)]
struct Scan {
	login_return: Option<String>,
	fault_code: Option<String>,
	fault_string: Option<String>,
	saw_envelope: bool,
	saw_fault: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Capture {
	LoginReturn,
	FaultCode,
	FaultString,
}

/// Extracts the `loginCmsReturn` payload from a SOAP response body.
///
/// Faults are surfaced as [`TransportError::Fault`]; bodies that are not SOAP envelopes, or that
/// lack both a return value and a fault, are [`TransportError::MalformedEnvelope`].
pub fn parse_login_cms_response(body: &str) -> Result<String, TransportError> {
	let scan = scan_envelope(body)?;

	if !scan.saw_envelope {
		return Err(malformed("response is not a SOAP envelope"));
	}
	if scan.saw_fault {
		return Err(TransportError::Fault {
			code: scan.fault_code.unwrap_or_else(|| "unknown".into()),
			message: scan.fault_string.unwrap_or_default(),
		});
	}

	scan.login_return
		.filter(|value| !value.trim().is_empty())
		.ok_or_else(|| malformed("loginCmsReturn is missing or empty"))
}

fn scan_envelope(body: &str) -> Result<Scan, TransportError> {
	let mut reader = Reader::from_str(body);
	let mut scan = Scan::default();
	let mut capture = None;

	reader.config_mut().trim_text(true);

	loop {
		let event = reader.read_event().map_err(|e| malformed(e.to_string()))?;

		match event {
			Event::Start(start) => {
				match start.local_name().as_ref() {
					b"Envelope" => scan.saw_envelope = true,
					b"Fault" => scan.saw_fault = true,
					b"loginCmsReturn" => capture = Some(Capture::LoginReturn),
					b"faultcode" => capture = Some(Capture::FaultCode),
					b"faultstring" => capture = Some(Capture::FaultString),
					_ => {},
				}
			},
			Event::Empty(start) if start.local_name().as_ref() == b"Fault" => scan.saw_fault = true,
			Event::Text(text) =>
				if let Some(target) = capture {
					let value = text.unescape().map_err(|e| malformed(e.to_string()))?;

					append(&mut scan, target, &value);
				},
			Event::CData(data) =>
				if let Some(target) = capture {
					let bytes = data.into_inner();

					append(&mut scan, target, &String::from_utf8_lossy(&bytes));
				},
			Event::End(_) => capture = None,
			Event::Eof => break,
			_ => {},
		}
	}

	Ok(scan)
}

fn append(scan: &mut Scan, target: Capture, value: &str) {
	let slot = match target {
		Capture::LoginReturn => &mut scan.login_return,
		Capture::FaultCode => &mut scan.fault_code,
		Capture::FaultString => &mut scan.fault_string,
	};

	slot.get_or_insert_with(String::new).push_str(value);
}

fn malformed(message: impl Into<String>) -> TransportError {
	TransportError::MalformedEnvelope { message: message.into() }
}

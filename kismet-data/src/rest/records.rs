//! Record generator over Kismet's device summary endpoint.

use kismet_core::{
    ExtractError, FieldPath, FieldRole, FieldValue, Record, RecordSource, RestFilter,
    headers_with_extras,
};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::session::{Session, SessionState};
use super::transport::KismetTransport;

type Device = Map<String, Value>;

/// Request body naming the field paths to summarise.
#[derive(Debug, Serialize)]
struct DevicesQuery<'a> {
    fields: Vec<&'a str>,
}

/// Pulls located devices out of a validated [`Session`].
///
/// The device query is sent on the first pull; later pulls walk the decoded
/// array. After a fatal error the generator reports exhaustion.
#[derive(Debug)]
pub struct RestRecords<T> {
    session: Session<T>,
    filter: RestFilter,
    devices: Option<Vec<Device>>,
    cursor: usize,
    fused: bool,
}

impl<T: KismetTransport> RestRecords<T> {
    /// Pair a validated session with the filter to request.
    #[must_use]
    pub const fn new(session: Session<T>, filter: RestFilter) -> Self {
        Self {
            session,
            filter,
            devices: None,
            cursor: 0,
            fused: false,
        }
    }

    /// The session the generator queries through.
    #[must_use]
    pub const fn session(&self) -> &Session<T> {
        &self.session
    }

    /// The filter the generator requests.
    #[must_use]
    pub const fn filter(&self) -> &RestFilter {
        &self.filter
    }

    fn request_body(&self) -> Result<String, ExtractError> {
        let query = DevicesQuery {
            fields: self.filter.paths().collect(),
        };
        serde_json::to_string(&query).map_err(|err| invalid_json(&self.filter, &err.to_string()))
    }

    fn advance(&mut self) -> Result<Option<Record>, ExtractError> {
        if self.devices.is_none() {
            let body = self.request_body()?;
            let reply = self.session.query_devices(&body)?;
            let devices = decode_devices(&reply.body, &self.filter)?;
            debug!("Kismet returned {} devices", devices.len());
            self.devices = Some(devices);
        }
        let Some(device) = self
            .devices
            .as_ref()
            .and_then(|devices| devices.get(self.cursor))
        else {
            return Ok(None);
        };
        self.cursor += 1;
        normalise(device, &self.filter).map(Some)
    }
}

impl<T: KismetTransport> RecordSource for RestRecords<T> {
    fn headers(&self) -> Vec<String> {
        headers_with_extras(self.filter.extras().iter().map(FieldPath::key))
    }

    fn next_record(&mut self) -> Result<Option<Record>, ExtractError> {
        if self.session.state() == SessionState::Closed {
            return Err(ExtractError::SourceClosed);
        }
        if self.fused {
            return Ok(None);
        }
        let outcome = self.advance();
        if outcome.is_err() {
            self.fused = true;
        }
        outcome
    }

    fn finish(&mut self) -> Result<(), ExtractError> {
        if self.session.close() {
            self.devices = None;
            self.fused = true;
        }
        Ok(())
    }
}

fn invalid_json(filter: &RestFilter, message: &str) -> ExtractError {
    ExtractError::InvalidJson {
        filters: filter.paths().map(str::to_owned).collect(),
        message: message.to_owned(),
    }
}

/// Decode a device summary body into its objects.
fn decode_devices(body: &str, filter: &RestFilter) -> Result<Vec<Device>, ExtractError> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| invalid_json(filter, &err.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(invalid_json(
                filter,
                &format!("expected an array of devices, found {}", json_kind(&other)),
            ));
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(device) => Ok(device),
            other => Err(invalid_json(
                filter,
                &format!("device {index} is {}, not an object", json_kind(&other)),
            )),
        })
        .collect()
}

/// Find a field in a device object by its leaf key, falling back to the
/// suffix after the leaf's last dot.
fn lookup<'a>(device: &'a Device, field: &FieldPath) -> Option<&'a Value> {
    device
        .get(field.key())
        .or_else(|| field.short_key().and_then(|key| device.get(key)))
}

fn normalise(device: &Device, filter: &RestFilter) -> Result<Record, ExtractError> {
    let latitude = coordinate(device, filter.latitude(), FieldRole::Latitude)?;
    let longitude = coordinate(device, filter.longitude(), FieldRole::Longitude)?;
    let id = identifier(device, filter.identifier())?;
    let extras = filter
        .extras()
        .iter()
        .map(|field| extra(device, field))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Record::new(id, latitude, longitude).with_extras(extras))
}

fn coordinate(device: &Device, field: &FieldPath, role: FieldRole) -> Result<f64, ExtractError> {
    let value = lookup(device, field);
    value
        .and_then(Value::as_f64)
        .ok_or_else(|| mandatory(role, field, "a JSON number", value))
}

fn identifier(device: &Device, field: &FieldPath) -> Result<String, ExtractError> {
    match lookup(device, field) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) if number.is_i64() || number.is_u64() => {
            Ok(number.to_string())
        }
        other => Err(mandatory(
            FieldRole::Identifier,
            field,
            "a string or an integer",
            other,
        )),
    }
}

fn extra(device: &Device, field: &FieldPath) -> Result<FieldValue, ExtractError> {
    match lookup(device, field) {
        None | Some(Value::Null) => Ok(FieldValue::Null),
        Some(Value::Bool(flag)) => Ok(FieldValue::Boolean(*flag)),
        Some(Value::String(text)) => Ok(FieldValue::Text(text.clone())),
        Some(Value::Number(number)) => Ok(number_value(number)),
        Some(other) => Err(ExtractError::UnsupportedValue {
            name: field.key().to_owned(),
            kind: json_kind(other),
        }),
    }
}

fn number_value(number: &Number) -> FieldValue {
    number
        .as_i64()
        .map(FieldValue::Integer)
        .or_else(|| number.as_f64().map(FieldValue::Float))
        .unwrap_or(FieldValue::Null)
}

fn mandatory(
    role: FieldRole,
    field: &FieldPath,
    expected: &'static str,
    found: Option<&Value>,
) -> ExtractError {
    ExtractError::MandatoryField {
        role,
        name: field.key().to_owned(),
        expected,
        found: found.map_or_else(|| "nothing".to_owned(), Value::to_string),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Behavioural tests for the REST backend.
//!
//! Scenarios run against [`StubTransport`], apart from the unreachable
//! server, which points a real [`HttpTransport`] at a closed local port.

use std::{cell::RefCell, net::TcpListener, time::Duration};

use kismet_core::{ExtractError, FieldValue, Record, RecordSource, RestFilter};
use kismet_data::DataSource;
use kismet_data::rest::{
    Credentials, HttpTransport, HttpTransportConfig, KismetTransport, TransportReply,
    parse_base_url, test_support::StubTransport,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Map, Value, json};

/// Shared state for REST scenarios.
#[derive(Debug, Default)]
struct RestWorld {
    stub: RefCell<Option<StubTransport>>,
    unreachable: RefCell<Option<HttpTransport>>,
    records: RefCell<Vec<Record>>,
    error: RefCell<Option<ExtractError>>,
}

impl RestWorld {
    fn update_stub(&self, update: impl FnOnce(StubTransport) -> StubTransport) {
        let stub = self.stub.take().unwrap_or_default();
        self.stub.replace(Some(update(stub)));
    }

    fn record_outcome(&self, outcome: Result<Vec<Record>, ExtractError>) {
        match outcome {
            Ok(records) => {
                self.records.replace(records);
                self.error.replace(None);
            }
            Err(err) => {
                self.records.replace(Vec::new());
                self.error.replace(Some(err));
            }
        }
    }

    fn read(&self, spec: &str) {
        let filter = RestFilter::parse(spec).expect("filter should parse");
        let outcome = match self.unreachable.take() {
            Some(transport) => read_all(transport, filter),
            None => read_all(self.stub.take().unwrap_or_default(), filter),
        };
        self.record_outcome(outcome);
    }

    fn expect_error(&self) -> ExtractError {
        self.error
            .borrow()
            .clone()
            .expect("an error should be recorded")
    }
}

fn read_all<T: KismetTransport>(
    transport: T,
    filter: RestFilter,
) -> Result<Vec<Record>, ExtractError> {
    let credentials = Credentials::new("kismet", "secret")?;
    let mut source = DataSource::with_transport(transport, &credentials, filter)?;
    let records = source.records().collect::<Result<Vec<_>, _>>();
    source.finish()?;
    records
}

fn extra_key(index: usize) -> String {
    format!("extra{index}")
}

fn extra_value(device: usize, index: usize) -> i64 {
    i64::try_from(device * 100 + index).expect("small values fit in i64")
}

fn extras_filter(extras: usize) -> String {
    let mut tokens = vec![
        "kismet.device.base.location/kismet.common.location.lat".to_owned(),
        "kismet.device.base.location/kismet.common.location.lon".to_owned(),
        "kismet.device.base.macaddr".to_owned(),
    ];
    tokens.extend((0..extras).map(|index| format!("kismet.device.base/{}", extra_key(index))));
    tokens.join(" ")
}

#[fixture]
fn world() -> RestWorld {
    RestWorld::default()
}

#[given("a Kismet server issuing a session cookie")]
fn given_accepting_server(world: &RestWorld) {
    world.stub.replace(Some(StubTransport::accepting("abc123")));
}

#[given("the server lists {count} devices with {extras} extra fields")]
fn given_devices(world: &RestWorld, count: usize, extras: usize) {
    let devices: Vec<Value> = (0..count)
        .map(|device| {
            let mut object = Map::new();
            object.insert("kismet.common.location.lat".to_owned(), json!(device));
            object.insert("kismet.common.location.lon".to_owned(), json!(device));
            object.insert(
                "kismet.device.base.macaddr".to_owned(),
                json!(format!("dev-{device}")),
            );
            for index in 0..extras {
                object.insert(extra_key(index), json!(extra_value(device, index)));
            }
            Value::Object(object)
        })
        .collect();
    let body = Value::Array(devices).to_string();
    world.update_stub(|stub| stub.with_devices_body(body));
}

#[given("the server lists a device at {lat}, {lon} named {name}")]
fn given_single_device(world: &RestWorld, lat: f64, lon: f64, name: String) {
    let body = json!([{ "lat": lat, "lon": lon, "mac": name.trim_matches('"') }]).to_string();
    world.update_stub(|stub| stub.with_devices_body(body));
}

#[given("a Kismet server answering the login without a cookie")]
fn given_cookieless_server(world: &RestWorld) {
    world.stub.replace(Some(
        StubTransport::new().with_login(Ok(TransportReply::with_status(200))),
    ));
}

#[given("a Kismet server that cannot be reached")]
fn given_unreachable_server(world: &RestWorld) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let port = listener.local_addr().expect("local address").port();
    drop(listener);
    let url = parse_base_url(&format!("http://127.0.0.1:{port}")).expect("URL should parse");
    let transport =
        HttpTransport::with_config(HttpTransportConfig::new(url).with_timeout(Duration::from_secs(2)))
            .expect("transport should build");
    world.unreachable.replace(Some(transport));
}

#[when("I read every record with {extras} extra fields requested")]
fn when_read_with_extras(world: &RestWorld, extras: usize) {
    world.read(&extras_filter(extras));
}

#[when("I read every record with the filter {spec}")]
fn when_read_with_filter(world: &RestWorld, spec: String) {
    world.read(spec.trim_matches('"'));
}

#[when("I connect to the server")]
fn when_connect(world: &RestWorld) {
    world.read("a/lat a/lon a/macaddr");
}

#[then("{count} records are returned")]
fn then_record_count(world: &RestWorld, count: usize) {
    assert!(
        world.error.borrow().is_none(),
        "unexpected error {:?}",
        world.error.borrow()
    );
    assert_eq!(world.records.borrow().len(), count);
}

#[then("every record carries {extras} extras in request order")]
fn then_extras_in_order(world: &RestWorld, extras: usize) {
    for (device, record) in world.records.borrow().iter().enumerate() {
        assert_eq!(record.id, format!("dev-{device}"));
        let expected: Vec<FieldValue> = (0..extras)
            .map(|index| FieldValue::Integer(extra_value(device, index)))
            .collect();
        assert_eq!(record.extras, expected);
    }
}

#[then("the first record is at {lat}, {lon} named {name} without extras")]
fn then_first_record(world: &RestWorld, lat: f64, lon: f64, name: String) {
    let records = world.records.borrow();
    let record = records.first().expect("a record should be read");
    assert_eq!(*record, Record::new(name.trim_matches('"'), lat, lon));
    assert!(!record.has_extras());
}

#[then("the connection fails with an authentication error")]
fn then_authentication_error(world: &RestWorld) {
    let err = world.expect_error();
    assert!(
        matches!(err, ExtractError::Authentication { .. }),
        "expected an authentication error, got {err:?}"
    );
    assert!(!err.is_connectivity());
}

#[then("the connection fails with a connectivity error")]
fn then_connectivity_error(world: &RestWorld) {
    let err = world.expect_error();
    assert!(err.is_connectivity(), "expected a connectivity error, got {err:?}");
    assert!(!matches!(err, ExtractError::Authentication { .. }));
}

#[scenario(path = "tests/features/rest_records.feature", index = 0)]
fn devices_normalised(world: RestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/rest_records.feature", index = 1)]
fn dotted_leaf_fallback(world: RestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/rest_records.feature", index = 2)]
fn cookieless_login(world: RestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/rest_records.feature", index = 3)]
fn unreachable_server(world: RestWorld) {
    let _ = world;
}

//! Differentiation tests: the calculus identities from §4.8, checked both
//! symbolically at fixed points and numerically against finite differences
//! over randomly sampled inputs, plus the documented unsupported-operator
//! error cases.

use std::cell::Cell;
use std::sync::{Mutex, Once};

use rand::Rng;

use crate::bindings::Bindings;
use crate::{compile, differentiate, eval, CalcError};

fn central_difference(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-6;
    (f(x + h) - f(x - h)) / (2.0 * h)
}

#[test]
fn derivative_of_polynomial_matches_finite_difference() {
    let x = Cell::new(0.0);
    let bindings = Bindings::new().variable("x", &x);
    let f = compile("x^3 - 2*x^2 + 5", &bindings).expect("should compile");
    let df = differentiate(&f, &x).expect("should differentiate");

    let mut rng = rand::rng();
    for _ in 0..20 {
        let sample: f64 = rng.random_range(-5.0..5.0);
        x.set(sample);
        let symbolic = eval(&df);
        let numeric = central_difference(|v| v.powi(3) - 2.0 * v.powi(2) + 5.0, sample);
        assert!((symbolic - numeric).abs() < 1e-2, "mismatch at x={sample}: {symbolic} vs {numeric}");
    }
}

#[test]
fn derivative_of_sin_over_exp_matches_finite_difference() {
    let x = Cell::new(0.0);
    let bindings = Bindings::new().variable("x", &x);
    let f = compile("sin(x) / exp(x)", &bindings).expect("should compile");
    let df = differentiate(&f, &x).expect("should differentiate");

    let mut rng = rand::rng();
    for _ in 0..20 {
        let sample: f64 = rng.random_range(-3.0..3.0);
        x.set(sample);
        let symbolic = eval(&df);
        let numeric = central_difference(|v| v.sin() / v.exp(), sample);
        assert!((symbolic - numeric).abs() < 1e-2, "mismatch at x={sample}: {symbolic} vs {numeric}");
    }
}

#[test]
fn derivative_of_ln_of_cos_matches_finite_difference_away_from_poles() {
    let x = Cell::new(0.3);
    let bindings = Bindings::new().variable("x", &x);
    let f = compile("ln(cos(x))", &bindings).expect("should compile");
    let df = differentiate(&f, &x).expect("should differentiate");

    for sample in [-1.0, -0.5, 0.2, 0.5, 1.0] {
        x.set(sample);
        let symbolic = eval(&df);
        let numeric = central_difference(|v| v.cos().ln(), sample);
        assert!((symbolic - numeric).abs() < 1e-2, "mismatch at x={sample}: {symbolic} vs {numeric}");
    }
}

#[test]
fn factorial_and_min_max_are_not_differentiable() {
    let x = Cell::new(2.0);
    let bindings = Bindings::new().variable("x", &x);

    let fac_expr = compile("fac(x)", &bindings).expect("should compile");
    assert!(matches!(differentiate(&fac_expr, &x), Err(CalcError::Unsupported { .. })));

    let max_expr = compile("max(x, 1)", &bindings).expect("should compile");
    assert!(matches!(differentiate(&max_expr, &x), Err(CalcError::Unsupported { .. })));
}

struct RecordingLogger {
    messages: Mutex<Vec<String>>,
}

impl log::Log for RecordingLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            self.messages.lock().expect("logger mutex poisoned").push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static RECORDING_LOGGER: RecordingLogger = RecordingLogger { messages: Mutex::new(Vec::new()) };
static INIT_LOGGER: Once = Once::new();

fn install_recording_logger() {
    INIT_LOGGER.call_once(|| {
        log::set_logger(&RECORDING_LOGGER).expect("logger should install exactly once");
        log::set_max_level(log::LevelFilter::Warn);
    });
    RECORDING_LOGGER.messages.lock().expect("logger mutex poisoned").clear();
}

#[test]
fn unsupported_differentiation_logs_a_warning() {
    install_recording_logger();

    let x = Cell::new(1.0);
    let bindings = Bindings::new().variable("x", &x);
    let bitwise_expr = compile("x & 1", &bindings).expect("should compile");
    let result = differentiate(&bitwise_expr, &x);
    assert!(result.is_err());

    let messages = RECORDING_LOGGER.messages.lock().expect("logger mutex poisoned");
    assert!(messages.iter().any(|m| m.contains("unsupported")), "expected a warning to be logged, got: {messages:?}");
}

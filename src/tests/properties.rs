//! Property-based tests for the laws in the Testable Properties section:
//! round-trip, idempotent optimization, associativity, unary-folding
//! equivalence, purity-driven folding, and scoping.

use std::cell::Cell;

use quickcheck::{quickcheck, TestResult};

use crate::bindings::Bindings;
use crate::optimize::optimize;
use crate::options::CompileOptions;
use crate::{compile, compile_with_options, eval, interp};

#[test]
fn round_trip_literal_doubles() {
    let bindings = Bindings::new();
    for d in [0.0, 1.0, -1.0, 0.5, 3.141_592_653_589_793, 1e10, 1e-10, 123_456.789] {
        let formatted = format!("{d:e}");
        let result = interp(&formatted, &bindings).expect("should evaluate a round-trip-safe literal");
        assert_eq!(result, d, "round-trip failed for {formatted}");
    }
}

#[test]
fn idempotent_optimization_matches_source_evaluation() {
    let bindings = Bindings::new();
    for src in ["1 + 2 * 3", "sin(0) + cos(0)", "2^10", "(1+2)*(3-4)/5"] {
        let direct = interp(src, &bindings).expect("should evaluate");
        let compiled = compile(src, &bindings).expect("should compile");
        let twice_optimized = optimize(compiled);
        assert!((eval(&twice_optimized) - direct).abs() < 1e-9, "mismatch for {src}");
    }
}

#[test]
fn compiled_expression_with_bound_variable_matches_interpreting_source() {
    let x = Cell::new(4.0);
    let bindings = Bindings::new().variable("x", &x);
    let compiled = compile("x^2 + 1", &bindings).expect("should compile");
    let direct = interp("x^2 + 1", &bindings).expect("should evaluate");
    assert_eq!(eval(&compiled), direct);
}

quickcheck! {
    fn right_assoc_power_matches_nested_exponentiation(a: i8, b: i8, c: i8) -> TestResult {
        // Keep exponents small so f64 powf doesn't overflow/underflow into
        // territory where floating point comparison gets noisy.
        let (a, b, c) = (f64::from(a % 4 + 2), f64::from(b % 3), f64::from(c % 3));
        if a == 0.0 {
            return TestResult::discard();
        }
        let bindings = Bindings::new();
        let src = format!("{a}^{b}^{c}");
        let expected = a.powf(b.powf(c));
        let got = interp(&src, &bindings).expect("should evaluate");
        TestResult::from_bool((got - expected).abs() < 1e-6 || (got.is_nan() && expected.is_nan()))
    }

    fn left_assoc_power_matches_left_folded_exponentiation(a: i8, b: i8, c: i8) -> TestResult {
        let (a, b, c) = (f64::from(a % 4 + 2), f64::from(b % 3), f64::from(c % 3));
        if a == 0.0 {
            return TestResult::discard();
        }
        let bindings = Bindings::new();
        let opts = CompileOptions::new().exponent_left_assoc();
        let src = format!("{a}^{b}^{c}");
        let expected = a.powf(b).powf(c);
        let got = eval(&compile_with_options(&src, &bindings, opts).expect("should compile"));
        TestResult::from_bool((got - expected).abs() < 1e-6 || (got.is_nan() && expected.is_nan()))
    }

    fn unary_sign_run_matches_parity_of_minus_count(n: i32, k: u8) -> TestResult {
        let k = k % 7;
        let n = f64::from(n % 1000);
        let mut src = String::new();
        for _ in 0..k {
            src.push('-');
        }
        src.push_str(&n.to_string());
        let bindings = Bindings::new();
        let got = interp(&src, &bindings).expect("should evaluate");
        let expected = if k % 2 == 0 { n } else { -n };
        TestResult::from_bool((got - expected).abs() < 1e-9)
    }
}

#[test]
fn purity_driven_folding_collapses_to_a_single_constant() {
    let bindings = Bindings::new();
    let compiled = compile("2 + 3 * (4 - 1) / sin(1.0)", &bindings).expect("should compile");
    assert!(compiled.as_constant().is_some(), "expression with no variables should fold to one constant");
}

#[test]
fn leading_unary_minus_binds_looser_than_power_by_default() {
    // Right-assoc (the default): -2^2 == -(2^2) == -4, not (-2)^2 == 4.
    let bindings = Bindings::new();
    assert_eq!(interp("-2^2", &bindings).expect("should evaluate"), -4.0);
}

#[test]
fn leading_unary_minus_binds_tighter_than_power_under_left_assoc() {
    let bindings = Bindings::new();
    let opts = CompileOptions::new().exponent_left_assoc();
    let got = eval(&compile_with_options("-2^2", &bindings, opts).expect("should compile"));
    assert_eq!(got, 4.0);
}

#[test]
fn scoping_rebinding_a_variable_changes_eval_without_recompiling() {
    let x = Cell::new(1.0);
    let bindings = Bindings::new().variable("x", &x);
    let compiled = compile("x * 10", &bindings).expect("should compile");
    assert_eq!(eval(&compiled), 10.0);
    x.set(5.0);
    assert_eq!(eval(&compiled), 50.0);
}

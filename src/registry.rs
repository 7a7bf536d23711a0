//! The static table of builtin functions and constants.
//!
//! Builtins are resolved by binary search over a compile-time sorted array
//! (§4.1), rather than a runtime-built hash map: the table is fixed and
//! small, so a `const` array plus `binary_search_by_key` avoids any startup
//! initialization cost and any possibility of a name being registered
//! twice.

use crate::bindings::Purity;
use crate::math;

/// A builtin callable, tagged with its arity.
///
/// Mirrors [`crate::bindings::HostFunction`]'s per-arity shape so that
/// builtins and host functions share the exact same call convention inside
/// [`crate::ast::OpTag`].
#[derive(Clone, Copy)]
pub enum BuiltinFn {
    /// Arity 0 (e.g. `pi`, `e`).
    Fn0(fn() -> f64),
    /// Arity 1 (e.g. `sin`, `sqrt`).
    Fn1(fn(f64) -> f64),
    /// Arity 2 (e.g. `pow`, `atan2`).
    Fn2(fn(f64, f64) -> f64),
    /// Arity 3 (e.g. `clamp`).
    Fn3(fn(f64, f64, f64) -> f64),
}

impl BuiltinFn {
    /// Number of arguments this builtin accepts.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            BuiltinFn::Fn0(_) => 0,
            BuiltinFn::Fn1(_) => 1,
            BuiltinFn::Fn2(_) => 2,
            BuiltinFn::Fn3(_) => 3,
        }
    }

    /// Invoke the builtin.
    ///
    /// # Panics
    ///
    /// Panics if `args.len()` does not match [`BuiltinFn::arity`]; the
    /// parser only ever constructs calls with the correct arity.
    #[must_use]
    pub fn call(&self, args: &[f64]) -> f64 {
        match self {
            BuiltinFn::Fn0(f) => f(),
            BuiltinFn::Fn1(f) => f(args[0]),
            BuiltinFn::Fn2(f) => f(args[0], args[1]),
            BuiltinFn::Fn3(f) => f(args[0], args[1], args[2]),
        }
    }
}

/// One row of the builtin table.
pub struct BuiltinEntry {
    /// The name as it appears in source expressions.
    pub name: &'static str,
    /// The callable itself.
    pub func: BuiltinFn,
    /// Purity: every builtin here is a deterministic math function, so all
    /// are pure and eligible for constant folding.
    pub purity: Purity,
}

/// All builtins, **sorted by name** so [`lookup`] can binary-search.
///
/// Keeping this sorted is a correctness invariant, verified by a unit test
/// rather than relied on implicitly: an unsorted table silently breaks
/// binary search rather than producing an obvious error.
const BUILTINS: &[BuiltinEntry] = &[
    BuiltinEntry { name: "abs", func: BuiltinFn::Fn1(f64::abs), purity: Purity::Pure },
    BuiltinEntry { name: "acos", func: BuiltinFn::Fn1(f64::acos), purity: Purity::Pure },
    BuiltinEntry { name: "asin", func: BuiltinFn::Fn1(f64::asin), purity: Purity::Pure },
    BuiltinEntry { name: "atan", func: BuiltinFn::Fn1(f64::atan), purity: Purity::Pure },
    BuiltinEntry { name: "atan2", func: BuiltinFn::Fn2(f64::atan2), purity: Purity::Pure },
    BuiltinEntry { name: "cbrt", func: BuiltinFn::Fn1(f64::cbrt), purity: Purity::Pure },
    BuiltinEntry { name: "ceil", func: BuiltinFn::Fn1(f64::ceil), purity: Purity::Pure },
    BuiltinEntry { name: "clamp", func: BuiltinFn::Fn3(math::clamp), purity: Purity::Pure },
    BuiltinEntry { name: "cos", func: BuiltinFn::Fn1(f64::cos), purity: Purity::Pure },
    BuiltinEntry { name: "cosh", func: BuiltinFn::Fn1(f64::cosh), purity: Purity::Pure },
    BuiltinEntry { name: "e", func: BuiltinFn::Fn0(|| std::f64::consts::E), purity: Purity::Pure },
    BuiltinEntry { name: "exp", func: BuiltinFn::Fn1(f64::exp), purity: Purity::Pure },
    BuiltinEntry { name: "fac", func: BuiltinFn::Fn1(math::fac), purity: Purity::Pure },
    BuiltinEntry { name: "floor", func: BuiltinFn::Fn1(f64::floor), purity: Purity::Pure },
    BuiltinEntry { name: "gamma", func: BuiltinFn::Fn1(math::gamma), purity: Purity::Pure },
    BuiltinEntry { name: "gcd", func: BuiltinFn::Fn2(math::gcd), purity: Purity::Pure },
    BuiltinEntry { name: "ln", func: BuiltinFn::Fn1(f64::ln), purity: Purity::Pure },
    BuiltinEntry { name: "log", func: BuiltinFn::Fn1(f64::log10), purity: Purity::Pure },
    BuiltinEntry { name: "log10", func: BuiltinFn::Fn1(f64::log10), purity: Purity::Pure },
    BuiltinEntry { name: "log2", func: BuiltinFn::Fn1(f64::log2), purity: Purity::Pure },
    BuiltinEntry { name: "max", func: BuiltinFn::Fn2(f64::max), purity: Purity::Pure },
    BuiltinEntry { name: "min", func: BuiltinFn::Fn2(f64::min), purity: Purity::Pure },
    BuiltinEntry { name: "mod", func: BuiltinFn::Fn2(|a, b| a % b), purity: Purity::Pure },
    BuiltinEntry { name: "ncr", func: BuiltinFn::Fn2(math::ncr), purity: Purity::Pure },
    BuiltinEntry { name: "npr", func: BuiltinFn::Fn2(math::npr), purity: Purity::Pure },
    BuiltinEntry { name: "pi", func: BuiltinFn::Fn0(|| std::f64::consts::PI), purity: Purity::Pure },
    BuiltinEntry { name: "pow", func: BuiltinFn::Fn2(f64::powf), purity: Purity::Pure },
    BuiltinEntry { name: "sign", func: BuiltinFn::Fn1(math::sign), purity: Purity::Pure },
    BuiltinEntry { name: "sin", func: BuiltinFn::Fn1(f64::sin), purity: Purity::Pure },
    BuiltinEntry { name: "sinh", func: BuiltinFn::Fn1(f64::sinh), purity: Purity::Pure },
    BuiltinEntry { name: "sqrt", func: BuiltinFn::Fn1(f64::sqrt), purity: Purity::Pure },
    BuiltinEntry { name: "tan", func: BuiltinFn::Fn1(f64::tan), purity: Purity::Pure },
    BuiltinEntry { name: "tanh", func: BuiltinFn::Fn1(f64::tanh), purity: Purity::Pure },
    BuiltinEntry { name: "tgamma", func: BuiltinFn::Fn1(math::gamma), purity: Purity::Pure },
];

/// Look up a builtin by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static BuiltinEntry> {
    BUILTINS.binary_search_by_key(&name, |e| e.name).ok().map(|i| &BUILTINS[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_by_name() {
        for pair in BUILTINS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} should sort before {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn lookup_finds_known_builtins() {
        assert!(lookup("sin").is_some());
        assert!(lookup("pow").is_some());
        assert!(lookup("nonexistent").is_none());
    }

    #[test]
    fn arities_match_declared_signatures() {
        assert_eq!(lookup("pi").unwrap().func.arity(), 0);
        assert_eq!(lookup("sin").unwrap().func.arity(), 1);
        assert_eq!(lookup("pow").unwrap().func.arity(), 2);
        assert_eq!(lookup("clamp").unwrap().func.arity(), 3);
    }

    #[test]
    fn cbrt_gamma_tgamma_and_mod_are_registered() {
        assert_eq!(lookup("cbrt").unwrap().func.call(&[27.0]), 3.0);
        assert!((lookup("gamma").unwrap().func.call(&[5.0]) - 24.0).abs() < 1e-9);
        assert!((lookup("tgamma").unwrap().func.call(&[5.0]) - 24.0).abs() < 1e-9);
        assert_eq!(lookup("mod").unwrap().func.call(&[7.0, 3.0]), 1.0);
    }
}

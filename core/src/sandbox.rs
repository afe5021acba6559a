use crate::literal::{Evaluation, LitNode};
use deno_core::{v8, FastString, JsRuntime, RuntimeOptions};
use log::debug;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// Default wall-clock budget for a single evaluation.
pub const DEFAULT_EVAL_BUDGET: Duration = Duration::from_secs(10);

const MAX_LITERALISE_DEPTH: usize = 32;

// A bare runtime exposes only ECMA-262 intrinsics. The preamble adds the
// two encoding helpers obfuscators lean on and removes everything
// non-deterministic or host-facing that survives in a bare context: the
// `Deno` namespace, `console`, and the time/randomness sources.
const PREAMBLE: &str = r"
(() => {
  const ALPHABET = 'ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/';
  globalThis.atob = input => {
    const data = String(input).replace(/=+$/, '');
    let output = '';
    let buffer = 0;
    let bits = 0;
    for (const ch of data) {
      const index = ALPHABET.indexOf(ch);
      if (index < 0) {
        continue;
      }
      buffer = (buffer << 6) | index;
      bits += 6;
      if (bits >= 8) {
        bits -= 8;
        output += String.fromCharCode((buffer >> bits) & 0xff);
      }
    }
    return output;
  };
  globalThis.btoa = input => {
    const data = String(input);
    let output = '';
    for (let i = 0; i < data.length; i += 3) {
      const bytes = [data.charCodeAt(i), data.charCodeAt(i + 1), data.charCodeAt(i + 2)];
      const triplet = (bytes[0] << 16) | ((bytes[1] & 0xff) << 8) | (bytes[2] & 0xff);
      output += ALPHABET[(triplet >> 18) & 63];
      output += ALPHABET[(triplet >> 12) & 63];
      output += isNaN(bytes[1]) ? '=' : ALPHABET[(triplet >> 6) & 63];
      output += isNaN(bytes[2]) ? '=' : ALPHABET[triplet & 63];
    }
    return output;
  };
  delete globalThis.Deno;
  delete globalThis.console;
  delete globalThis.queueMicrotask;
  delete globalThis.Date;
  delete Math.random;
})();
";

/// An isolated evaluator over an embedded V8 runtime with no host
/// capabilities: no filesystem, network, timers, DOM, or console. The
/// runtime is created lazily on first use and may be shared across the
/// candidates of one pass. A timed-out runtime is discarded so the next
/// evaluation starts fresh.
pub struct Sandbox {
    runtime: Option<JsRuntime>,
    budget: Duration,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    #[must_use]
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_EVAL_BUDGET)
    }

    #[must_use]
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            runtime: None,
            budget,
        }
    }

    fn fresh_runtime() -> JsRuntime {
        let mut runtime = JsRuntime::new(RuntimeOptions::default());
        if let Err(error) = runtime.execute_script("<preamble>", PREAMBLE) {
            debug!("sandbox preamble failed: {error}");
        }
        runtime
    }

    /// Executes `source` and literalises its completion value. Any failure
    /// mode (exception, disallowed global, timeout, non-literalisable
    /// result) yields `BadValue`.
    pub fn eval(&mut self, source: &str) -> Evaluation {
        let budget = self.budget;
        let runtime = self.runtime.get_or_insert_with(Self::fresh_runtime);

        let isolate_handle = runtime.v8_isolate().thread_safe_handle();
        let finished = Arc::new(AtomicBool::new(false));
        let timed_out = Arc::new(AtomicBool::new(false));
        let watchdog = {
            let finished = finished.clone();
            let timed_out = timed_out.clone();
            thread::spawn(move || {
                let start = Instant::now();
                while !finished.load(Ordering::Relaxed) {
                    if start.elapsed() >= budget {
                        timed_out.store(true, Ordering::Relaxed);
                        isolate_handle.terminate_execution();
                        return;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
            })
        };

        let result = runtime.execute_script("<fragment>", FastString::from(source.to_owned()));
        finished.store(true, Ordering::Relaxed);
        let _ = watchdog.join();

        let evaluation = if timed_out.load(Ordering::Relaxed) {
            debug!("sandbox evaluation exceeded its {budget:?} budget");
            Evaluation::BadValue
        } else {
            match result {
                Ok(global) => {
                    let scope = &mut runtime.handle_scope();
                    let local = v8::Local::new(scope, global);
                    literalise(scope, local, 0).map_or(Evaluation::BadValue, Evaluation::Value)
                }
                Err(error) => {
                    debug!("sandbox evaluation failed: {error}");
                    Evaluation::BadValue
                }
            }
        };

        if timed_out.load(Ordering::Relaxed) {
            // A terminated isolate is not safe to reuse.
            self.runtime = None;
        }

        evaluation
    }
}

fn literalise(
    scope: &mut v8::HandleScope,
    value: v8::Local<v8::Value>,
    depth: usize,
) -> Option<LitNode> {
    if depth > MAX_LITERALISE_DEPTH {
        return None;
    }
    if value.is_undefined() {
        return Some(LitNode::Undefined);
    }
    if value.is_null() {
        return Some(LitNode::Null);
    }
    if value.is_boolean() {
        return Some(LitNode::Bool(value.boolean_value(scope)));
    }
    if value.is_string() {
        return Some(LitNode::Str(value.to_rust_string_lossy(scope)));
    }
    if value.is_number() {
        return value.number_value(scope).map(LitNode::from_number);
    }
    if value.is_big_int() {
        let text = value.to_string(scope)?.to_rust_string_lossy(scope);
        return Some(LitNode::BigInt(text));
    }
    if value.is_symbol() {
        let symbol = v8::Local::<v8::Symbol>::try_from(value).ok()?;
        let description = symbol.description(scope);
        return Some(LitNode::Symbol(if description.is_undefined() {
            None
        } else {
            Some(description.to_rust_string_lossy(scope))
        }));
    }
    if value.is_function() {
        return None;
    }
    if let Ok(regexp) = v8::Local::<v8::RegExp>::try_from(value) {
        let object: v8::Local<v8::Object> = regexp.into();
        return Some(LitNode::Regex {
            pattern: string_property(scope, object, "source")?,
            flags: string_property(scope, object, "flags")?,
        });
    }
    if let Ok(array) = v8::Local::<v8::Array>::try_from(value) {
        let mut elements = Vec::with_capacity(array.length() as usize);
        for index in 0..array.length() {
            let element = array.get_index(scope, index)?;
            elements.push(literalise(scope, element, depth + 1)?);
        }
        return Some(LitNode::Array(elements));
    }
    if value.is_object() {
        if value.is_date()
            || value.is_map()
            || value.is_set()
            || value.is_promise()
            || value.is_array_buffer()
            || value.is_array_buffer_view()
            || value.is_proxy()
        {
            return None;
        }
        let object = value.to_object(scope)?;
        let names = object.own_property_names(scope, v8::GetPropertyNamesArgs::default())?;
        let mut properties = Vec::with_capacity(names.length() as usize);
        for index in 0..names.length() {
            let key = names.get_index(scope, index)?;
            let entry = object.get(scope, key)?;
            // An object carrying methods is not a plain data object.
            if entry.is_function() {
                return None;
            }
            properties.push((
                key.to_rust_string_lossy(scope),
                literalise(scope, entry, depth + 1)?,
            ));
        }
        return Some(LitNode::Object(properties));
    }
    None
}

fn string_property(
    scope: &mut v8::HandleScope,
    object: v8::Local<v8::Object>,
    name: &str,
) -> Option<String> {
    let key = v8::String::new(scope, name)?;
    let value = object.get(scope, key.into())?;
    if value.is_string() {
        Some(value.to_rust_string_lossy(scope))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::Sandbox;
    use crate::literal::{Evaluation, LitNode};
    use std::time::Duration;

    fn eval(source: &str) -> Evaluation {
        Sandbox::new().eval(source)
    }

    #[test]
    fn primitives_literalise() {
        assert_eq!(eval("1 + 2"), Evaluation::Value(LitNode::Num(3.0)));
        assert_eq!(
            eval("'o' + 'k'"),
            Evaluation::Value(LitNode::Str("ok".to_owned()))
        );
        assert_eq!(eval("1 > 2"), Evaluation::Value(LitNode::Bool(false)));
        assert_eq!(eval("null"), Evaluation::Value(LitNode::Null));
        assert_eq!(eval("void 0"), Evaluation::Value(LitNode::Undefined));
        assert_eq!(
            eval("3 - 7"),
            Evaluation::Value(LitNode::Neg(Box::new(LitNode::Num(4.0))))
        );
        assert_eq!(eval("'o' - 'k'"), Evaluation::Value(LitNode::NaN));
        assert_eq!(eval("1 / 0"), Evaluation::Value(LitNode::Infinity));
    }

    #[test]
    fn negative_zero_keeps_its_sign() {
        assert_eq!(
            eval("-0"),
            Evaluation::Value(LitNode::Neg(Box::new(LitNode::Num(0.0))))
        );
    }

    #[test]
    fn composites_literalise() {
        assert_eq!(
            eval("[1, 'a', [true]]"),
            Evaluation::Value(LitNode::Array(vec![
                LitNode::Num(1.0),
                LitNode::Str("a".to_owned()),
                LitNode::Array(vec![LitNode::Bool(true)]),
            ]))
        );
        assert_eq!(
            eval("({k: 1})"),
            Evaluation::Value(LitNode::Object(vec![("k".to_owned(), LitNode::Num(1.0))]))
        );
    }

    #[test]
    fn impure_results_are_bad_values() {
        assert!(eval("(function () {})").is_bad());
        assert!(eval("({m: function () {}})").is_bad());
        assert!(eval("var a = {}; a.self = a; a").is_bad());
        assert!(eval("throw new Error('nope')").is_bad());
    }

    #[test]
    fn host_capabilities_are_unreachable() {
        assert!(eval("document.querySelector('div')").is_bad());
        assert!(eval("require('fs')").is_bad());
        assert!(eval("setTimeout(() => {}, 1)").is_bad());
        assert!(eval("console.log('x')").is_bad());
        assert!(eval("typeof Deno").value() == Some(&LitNode::Str("undefined".to_owned())));
    }

    #[test]
    fn time_and_randomness_are_unreachable() {
        assert!(eval("Date.now()").is_bad());
        assert!(eval("new Date().getTime()").is_bad());
        assert!(eval("Math.random()").is_bad());
        // The pure remainder of Math stays usable.
        assert_eq!(eval("Math.max(1, 2)"), Evaluation::Value(LitNode::Num(2.0)));
    }

    #[test]
    fn encoding_helpers_are_installed() {
        assert_eq!(
            eval("atob('c29sdmVkIQ==')"),
            Evaluation::Value(LitNode::Str("solved!".to_owned()))
        );
        assert_eq!(
            eval("btoa('solved!')"),
            Evaluation::Value(LitNode::Str("c29sdmVkIQ==".to_owned()))
        );
    }

    #[test]
    fn runaway_evaluation_times_out() {
        let mut sandbox = Sandbox::with_budget(Duration::from_millis(200));
        assert!(sandbox.eval("for (;;) {}").is_bad());
        // The replacement runtime still works.
        assert_eq!(sandbox.eval("2 + 2"), Evaluation::Value(LitNode::Num(4.0)));
    }

    #[test]
    fn a_shared_sandbox_keeps_its_globals_warm() {
        let mut sandbox = Sandbox::new();
        sandbox.eval("globalThis.counter = 41;");
        assert_eq!(
            sandbox.eval("counter + 1"),
            Evaluation::Value(LitNode::Num(42.0))
        );
    }
}

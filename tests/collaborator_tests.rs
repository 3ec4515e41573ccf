//! Scope tests driven the way collaborators use it: allocate, register,
//! bail out on the first error, hand the result back on success.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use unwind::{Scope, Slot, TraceSink};

/// Books every allocation and every release so leaks and double releases
/// show up as a non-zero balance or a failed assertion.
#[derive(Clone, Default)]
struct Ledger {
    live: Rc<Cell<i64>>,
    peak: Rc<Cell<i64>>,
    released: Rc<RefCell<Vec<String>>>,
}

#[derive(Debug, PartialEq)]
struct Res {
    name: String,
}

impl Ledger {
    fn alloc(&self, name: impl Into<String>) -> Res {
        self.live.set(self.live.get() + 1);
        self.peak.set(self.peak.get().max(self.live.get()));
        Res { name: name.into() }
    }

    fn disposer(&self) -> impl FnOnce(Res) + 'static {
        let ledger = self.clone();
        move |res: Res| ledger.release(res)
    }

    /// Give back a resource the caller took ownership of.
    fn release(&self, res: Res) {
        let mut released = self.released.borrow_mut();
        assert!(!released.contains(&res.name), "{} released twice", res.name);
        released.push(res.name);
        self.live.set(self.live.get() - 1);
    }

    fn live(&self) -> i64 {
        self.live.get()
    }

    fn released(&self) -> Vec<String> {
        self.released.borrow().clone()
    }
}

fn quiet() -> Scope {
    Scope::with_sink(TraceSink::disabled())
}

#[derive(Debug, PartialEq)]
enum ParseError {
    Malformed(usize),
}

/// `key=value` lines into a dictionary. The dictionary is the result; each
/// line's split buffers are temporaries.
fn parse_pairs(ledger: &Ledger, text: &str) -> Result<BTreeMap<String, Res>, ParseError> {
    let mut scope = quiet();
    let dict = scope.add_keep_on_success(BTreeMap::<String, Res>::new(), {
        let ledger = ledger.clone();
        move |d: BTreeMap<String, Res>| d.into_values().for_each(|r| ledger.release(r))
    });

    for (n, line) in text.lines().enumerate() {
        let mut iteration = scope.child();
        let raw = iteration.add_always(ledger.alloc(format!("line-{n}")), ledger.disposer());

        let Some((key, value)) = line.split_once('=') else {
            iteration.teardown_on_error();
            scope.teardown_on_error();
            return Err(ParseError::Malformed(n));
        };
        assert!(iteration.get(&raw).is_some());
        let value = ledger.alloc(value.trim());
        if let Some(d) = scope.get_mut(&dict) {
            d.insert(key.trim().to_string(), value);
        }
        iteration.teardown_on_success();
    }

    let mut kept = scope.teardown_on_success();
    Ok(kept.take(dict).unwrap_or_default())
}

/// First value whose key starts with `prefix`, copied into a new resource.
/// Finding nothing is a success with no result.
fn find_first(ledger: &Ledger, dict: &BTreeMap<String, Res>, prefix: &str) -> Option<Res> {
    let mut scope = quiet();
    let scratch = scope.add_always(ledger.alloc("scratch"), ledger.disposer());
    let candidate = scope.add_keep_on_success(ledger.alloc("candidate"), ledger.disposer());
    assert!(scope.get(&scratch).is_some());

    match dict.iter().find(|(k, _)| k.starts_with(prefix)) {
        Some((_, v)) => {
            if let Some(c) = scope.get_mut(&candidate) {
                c.name = format!("copy-of-{}", v.name);
            }
            scope.teardown_on_success().take(candidate)
        }
        None => {
            scope.teardown_discard_all_on_success();
            None
        }
    }
}

#[test]
fn test_parse_success_keeps_only_the_dictionary() {
    let ledger = Ledger::default();
    let dict = parse_pairs(&ledger, "a = 1\nb = 2\nc = 3").unwrap();

    assert_eq!(dict.len(), 3);
    assert_eq!(dict["b"].name, "2");
    // Three values live, every line buffer released.
    assert_eq!(ledger.live(), 3);
    assert_eq!(ledger.released(), vec!["line-0", "line-1", "line-2"]);

    for (_, v) in dict {
        ledger.release(v);
    }
    assert_eq!(ledger.live(), 0);
}

#[test]
fn test_parse_error_releases_partial_result() {
    let ledger = Ledger::default();
    let err = parse_pairs(&ledger, "a = 1\nb = 2\nbroken\nd = 4").unwrap_err();

    assert_eq!(err, ParseError::Malformed(2));
    assert_eq!(ledger.live(), 0);
    let released = ledger.released();
    assert!(released.contains(&"1".to_string()));
    assert!(released.contains(&"2".to_string()));
    assert!(released.contains(&"line-2".to_string()));
}

#[test]
fn test_per_iteration_children_bound_peak() {
    let ledger = Ledger::default();
    let text: String = (0..50).map(|i| format!("k{i}=v{i}\n")).collect();
    let dict = parse_pairs(&ledger, &text).unwrap();

    // At most the values so far plus one line buffer are ever live.
    assert_eq!(ledger.peak.get(), 51);
    for (_, v) in dict {
        ledger.release(v);
    }
    assert_eq!(ledger.live(), 0);
}

#[test]
fn test_search_hit_returns_result() {
    let ledger = Ledger::default();
    let mut dict = BTreeMap::new();
    dict.insert("apple".to_string(), ledger.alloc("red"));

    let found = find_first(&ledger, &dict, "app").unwrap();
    assert_eq!(found.name, "copy-of-red");
    assert_eq!(ledger.released(), vec!["scratch"]);

    ledger.release(found);
    for (_, v) in dict {
        ledger.release(v);
    }
    assert_eq!(ledger.live(), 0);
}

#[test]
fn test_search_miss_discards_everything() {
    let ledger = Ledger::default();
    let dict = BTreeMap::new();

    assert!(find_first(&ledger, &dict, "zzz").is_none());
    assert_eq!(ledger.live(), 0);
    assert_eq!(ledger.released(), vec!["candidate", "scratch"]);
}

/// A growable byte buffer in the style of a C array: it is grown by
/// replacing the backing allocation, so callers must track it through a slot.
fn fill(slot: &Slot<Vec<u8>>, chunks: &[&str]) -> Result<usize, String> {
    let mut scope = quiet();
    scope.add_keep_on_success_indirect(slot, drop);

    for chunk in chunks {
        if chunk.is_empty() {
            scope.teardown_on_error();
            return Err("empty chunk".into());
        }
        slot.relocate(|old| {
            let old = old.unwrap_or_default();
            let mut grown = Vec::with_capacity(old.len() + chunk.len());
            grown.extend_from_slice(&old);
            grown.extend_from_slice(chunk.as_bytes());
            grown
        });
    }

    let len = slot.borrow().as_ref().map_or(0, Vec::len);
    scope.teardown_on_success();
    Ok(len)
}

#[test]
fn test_growable_buffer_survives_success() {
    let slot = Slot::empty();
    assert_eq!(fill(&slot, &["ab", "cd", "e"]), Ok(5));
    assert_eq!(slot.get(), Some(b"abcde".to_vec()));
}

#[test]
fn test_growable_buffer_released_on_error() {
    let slot = Slot::empty();
    assert!(fill(&slot, &["ab", "", "e"]).is_err());
    assert!(slot.is_empty());
}

#[test]
fn test_relocated_value_is_what_gets_disposed() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let slot = Slot::new(vec![0u8; 1]);
    let mut scope = quiet();
    let log = Rc::clone(&seen);
    scope.add_always_indirect(&slot, move |v: Vec<u8>| log.borrow_mut().push(v.len()));

    let before = slot.replace(vec![0u8; 64]);
    assert_eq!(before.map(|v| v.len()), Some(1));
    scope.teardown_on_success();

    assert_eq!(*seen.borrow(), vec![64]);
}

fn step(ledger: &Ledger, scope: &mut Scope, name: &str, fail: bool) -> Result<(), String> {
    scope.add_always(ledger.alloc(name), ledger.disposer());
    if fail {
        return Err(format!("{name} failed"));
    }
    Ok(())
}

fn pipeline(ledger: &Ledger, fail_at: Option<usize>) -> Result<Res, String> {
    let mut scope = quiet();
    let out = scope.add_keep_on_success(ledger.alloc("output"), ledger.disposer());
    for i in 0..4 {
        // Early `?` return: the scope is dropped and takes the error path.
        step(ledger, &mut scope, &format!("stage-{i}"), fail_at == Some(i))?;
    }
    let (_, mut kept) = scope.finish(Ok::<_, String>(()))?;
    kept.take(out).ok_or_else(|| "output missing".to_string())
}

#[test]
fn test_question_mark_exit_releases_everything() {
    let ledger = Ledger::default();
    let err = pipeline(&ledger, Some(2)).unwrap_err();
    assert_eq!(err, "stage-2 failed");
    assert_eq!(ledger.live(), 0);
    assert_eq!(
        ledger.released(),
        vec!["stage-2", "stage-1", "stage-0", "output"]
    );
}

#[test]
fn test_finish_hands_back_output() {
    let ledger = Ledger::default();
    let out = pipeline(&ledger, None).unwrap();
    assert_eq!(out.name, "output");
    assert_eq!(ledger.live(), 1);
    ledger.release(out);
    assert_eq!(ledger.live(), 0);
}

use super::common::load;
use indoc::indoc;

#[test]
fn upvalues_capture_through_two_levels() {
  let mut script = load(indoc! {"
    fn main() {
      var make = fn(x) => fn(y) => x + y
      var add3 = make(3)
      return add3(4)
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(7.0));
}

#[test]
fn closures_from_one_site_are_independent() {
  let mut script = load(indoc! {"
    fn main() {
      var make = fn(x) => fn(y) => x + y
      var add3 = make(3)
      var add5 = make(5)
      return add3(1) + add5(1)
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(10.0));
}

#[test]
fn captured_mutation_is_visible_to_the_defining_scope() {
  let mut script = load(indoc! {"
    fn main() {
      var x = 1
      var set = fn(v) => x = v
      set(42)
      return x
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(42.0));
}

#[test]
fn captured_mutation_accumulates_across_calls() {
  let mut script = load(indoc! {"
    fn main() {
      var n = 0
      var inc = fn() => n = n + 1
      inc()
      inc()
      inc()
      return n
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(3.0));
}

#[test]
fn sibling_closures_share_their_capture() {
  let mut script = load(indoc! {"
    fn main() {
      var n = 10
      var get = fn() => n
      var set = fn(v) => n = v
      set(20)
      return get()
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(20.0));
}

#[test]
fn capture_of_an_outer_capture_is_transitive() {
  let mut script = load(indoc! {"
    fn main() {
      var a = 1
      var outer = fn() => fn() => a + 1
      var inner = outer()
      return inner()
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(2.0));
}
